use proptest::prelude::*;
use webqa_chunker::{Chunk, Chunker, ChunkerConfig};

fn assert_covers(text: &str, chunks: &[Chunk]) {
    let mut covered = vec![false; text.len()];
    for chunk in chunks {
        assert_eq!(&text[chunk.start..chunk.end()], chunk.text);
        for slot in &mut covered[chunk.start..chunk.end()] {
            *slot = true;
        }
    }
    for (idx, ch) in text.char_indices() {
        if !ch.is_whitespace() {
            assert!(covered[idx], "byte {idx} ({ch:?}) not covered by any chunk");
        }
    }
}

fn sentence_text(target_chars: usize) -> String {
    let words = [
        "harbor", "lantern", "granite", "meadow", "orbit", "copper", "willow", "signal",
    ];
    let mut out = String::new();
    let mut i = 0usize;
    while out.chars().count() < target_chars {
        out.push_str(&format!(
            "The {} near the {} {}. ",
            words[i % words.len()],
            words[(i + 3) % words.len()],
            i
        ));
        i += 1;
    }
    out.trim_end().to_string()
}

#[test]
fn scenario_size_500_overlap_80_on_1200_chars() {
    let chunker = Chunker::new(ChunkerConfig::with_size(500, 80)).unwrap();
    let text = sentence_text(1200);
    assert!(text.chars().count() >= 1200);

    let chunks = chunker
        .create_chunks(&text, "https://example.com/page", "Page")
        .unwrap();
    assert!(chunks.len() >= 3, "expected >= 3 chunks, got {}", chunks.len());

    // Splitting happens on "." and the separator stays on the following piece.
    let longest_piece = text
        .split('.')
        .map(|piece| piece.chars().count() + 1)
        .max()
        .unwrap();
    let min_overlap = 80 - longest_piece;

    for pair in chunks.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        assert!(next.start > prev.start, "chunks must advance");
        assert!(
            next.start < prev.end(),
            "adjacent chunks {} and {} should overlap",
            prev.chunk_id,
            next.chunk_id
        );
        let shared = &text[next.start..prev.end()];
        let overlap = shared.chars().count();
        assert!(
            (min_overlap..=80).contains(&overlap),
            "overlap of {overlap} chars between chunks {} and {} is outside {min_overlap}..=80",
            prev.chunk_id,
            next.chunk_id
        );
        assert!(prev.text.ends_with(shared));
        assert!(next.text.starts_with(shared));
    }
    assert_covers(&text, &chunks);
}

#[test]
fn chunk_ids_restart_at_zero_for_every_call() {
    let chunker = Chunker::new(ChunkerConfig::with_size(200, 20)).unwrap();
    let text = sentence_text(900);
    for _ in 0..2 {
        let ids: Vec<usize> = chunker
            .create_chunks(&text, "s", "t")
            .unwrap()
            .iter()
            .map(|c| c.chunk_id)
            .collect();
        let expected: Vec<usize> = (0..ids.len()).collect();
        assert_eq!(ids, expected);
    }
}

proptest! {
    #[test]
    fn chunks_are_bounded_ordered_and_cover_input(
        text in "[a-z]{1,12}([ .\n]{1,3}[a-zé]{1,12}){5,120}",
        chunk_size in 8usize..200,
        overlap_pct in 0usize..90,
    ) {
        let chunk_overlap = chunk_size * overlap_pct / 100;
        let config = ChunkerConfig {
            min_text_chars: 1,
            ..ChunkerConfig::with_size(chunk_size, chunk_overlap)
        };
        let chunker = Chunker::new(config).unwrap();
        let chunks = chunker.create_chunks(&text, "s", "t").unwrap();

        prop_assert!(!chunks.is_empty());
        for (idx, chunk) in chunks.iter().enumerate() {
            prop_assert_eq!(chunk.chunk_id, idx);
            prop_assert!(chunk.char_len() <= chunk_size);
            prop_assert!(!chunk.text.is_empty());
        }
        for pair in chunks.windows(2) {
            prop_assert!(pair[1].start > pair[0].start);
        }
        assert_covers(&text, &chunks);
    }
}
