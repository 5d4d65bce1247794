use std::collections::VecDeque;
use std::ops::Range;

/// A trimmed slice of the input together with its byte offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Segment<'a> {
    pub start: usize,
    pub text: &'a str,
}

/// Recursive character splitter.
///
/// Pieces are byte ranges into `root`, so every emitted segment is an exact slice of the input
/// and its offset is known without searching.
pub(crate) struct RecursiveSplitter<'a> {
    root: &'a str,
    chunk_size: usize,
    chunk_overlap: usize,
    separators: &'a [String],
}

impl<'a> RecursiveSplitter<'a> {
    pub fn new(
        root: &'a str,
        chunk_size: usize,
        chunk_overlap: usize,
        separators: &'a [String],
    ) -> Self {
        Self {
            root,
            chunk_size,
            chunk_overlap,
            separators,
        }
    }

    pub fn split(&self) -> Vec<Segment<'a>> {
        let mut out = Vec::new();
        self.split_range(0..self.root.len(), self.separators, &mut out);
        out
    }

    fn split_range(&self, range: Range<usize>, separators: &[String], out: &mut Vec<Segment<'a>>) {
        let text = &self.root[range.clone()];
        let (separator, finer) = pick_separator(text, separators);
        let pieces = split_keep_start(text, separator, range.start);

        let mut good: Vec<(Range<usize>, usize)> = Vec::new();
        for piece in pieces {
            let len = self.root[piece.clone()].chars().count();
            if len < self.chunk_size {
                good.push((piece, len));
                continue;
            }

            if !good.is_empty() {
                self.merge(&good, out);
                good.clear();
            }

            if finer.is_empty() {
                self.emit(piece, out);
            } else {
                self.split_range(piece, finer, out);
            }
        }

        if !good.is_empty() {
            self.merge(&good, out);
        }
    }

    /// Greedily packs consecutive pieces into chunks of at most `chunk_size` characters, carrying
    /// a tail of at most `chunk_overlap` characters into the next chunk.
    fn merge(&self, pieces: &[(Range<usize>, usize)], out: &mut Vec<Segment<'a>>) {
        let mut current: VecDeque<(Range<usize>, usize)> = VecDeque::new();
        let mut total = 0usize;

        for (piece, len) in pieces {
            if total + len > self.chunk_size {
                if total > self.chunk_size {
                    log::warn!(
                        "Created a chunk of size {total}, which is longer than the specified {}",
                        self.chunk_size
                    );
                }
                if !current.is_empty() {
                    self.emit_window(&current, out);
                    while total > self.chunk_overlap
                        || (total + len > self.chunk_size && total > 0)
                    {
                        let Some((_, dropped)) = current.pop_front() else {
                            break;
                        };
                        total -= dropped;
                    }
                }
            }
            current.push_back((piece.clone(), *len));
            total += len;
        }

        self.emit_window(&current, out);
    }

    fn emit_window(&self, window: &VecDeque<(Range<usize>, usize)>, out: &mut Vec<Segment<'a>>) {
        let (Some((first, _)), Some((last, _))) = (window.front(), window.back()) else {
            return;
        };
        self.emit(first.start..last.end, out);
    }

    fn emit(&self, range: Range<usize>, out: &mut Vec<Segment<'a>>) {
        let raw = &self.root[range.clone()];
        let trimmed_front = raw.trim_start();
        let text = trimmed_front.trim_end();
        if text.is_empty() {
            return;
        }
        let segment = Segment {
            start: range.start + (raw.len() - trimmed_front.len()),
            text,
        };

        // A window that only differs from the previous one by leading whitespace pieces trims
        // to the same start; keep the wider of the two so offsets stay strictly increasing.
        if let Some(last) = out.last_mut() {
            if last.start == segment.start {
                if segment.text.len() > last.text.len() {
                    *last = segment;
                }
                return;
            }
        }
        out.push(segment);
    }
}

/// Picks the first separator that occurs in `text`, returning it along with the finer ones.
fn pick_separator<'s>(text: &str, separators: &'s [String]) -> (&'s str, &'s [String]) {
    for (idx, separator) in separators.iter().enumerate() {
        if separator.is_empty() {
            return ("", &[]);
        }
        if text.contains(separator.as_str()) {
            return (separator.as_str(), &separators[idx + 1..]);
        }
    }
    (
        separators.last().map(String::as_str).unwrap_or_default(),
        &[],
    )
}

/// Splits `text` on `separator`, keeping each separator attached to the start of the piece that
/// follows it. Ranges are absolute (shifted by `base`). Empty pieces are dropped.
fn split_keep_start(text: &str, separator: &str, base: usize) -> Vec<Range<usize>> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(idx, ch)| base + idx..base + idx + ch.len_utf8())
            .collect();
    }

    let mut pieces = Vec::new();
    let mut cursor = 0usize;
    for (idx, _) in text.match_indices(separator) {
        if idx > cursor {
            pieces.push(base + cursor..base + idx);
        }
        cursor = idx;
    }
    if text.len() > cursor {
        pieces.push(base + cursor..base + text.len());
    }
    pieces
}
