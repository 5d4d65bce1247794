use std::fmt;
use std::sync::Arc;
use webqa_chunker::Chunk;

/// Lifecycle of a [`crate::VectorIndex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexPhase {
    Empty,
    Building,
    Built,
    Persisted,
    Loading,
    Loaded,
}

impl IndexPhase {
    /// A build or load is running; readers must wait for it to finish.
    #[must_use]
    pub const fn is_busy(self) -> bool {
        matches!(self, Self::Building | Self::Loading)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Building => "building",
            Self::Built => "built",
            Self::Persisted => "persisted",
            Self::Loading => "loading",
            Self::Loaded => "loaded",
        }
    }
}

impl fmt::Display for IndexPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Nearest neighbours of one query, ascending by squared distance.
///
/// `indices[i]` is a position in `records`; the records are shared with the
/// snapshot the search ran against, so they stay valid after a rebuild.
#[derive(Debug, Clone)]
pub struct SearchHits {
    pub indices: Vec<usize>,
    pub distances: Vec<f32>,
    records: Arc<[Chunk]>,
}

impl SearchHits {
    pub(crate) fn new(neighbours: Vec<(usize, f32)>, records: Arc<[Chunk]>) -> Self {
        let (indices, distances) = neighbours.into_iter().unzip();
        Self {
            indices,
            distances,
            records,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Chunk behind the `i`-th hit
    #[must_use]
    pub fn chunk(&self, i: usize) -> Option<&Chunk> {
        self.indices.get(i).and_then(|idx| self.records.get(*idx))
    }

    /// `(chunk, distance)` pairs in rank order
    pub fn iter(&self) -> impl Iterator<Item = (&Chunk, f32)> + '_ {
        self.indices
            .iter()
            .zip(&self.distances)
            .filter_map(|(idx, dist)| self.records.get(*idx).map(|chunk| (chunk, *dist)))
    }
}
