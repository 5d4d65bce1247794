use crate::embeddings::Embedder;
use crate::error::{Result, VectorStoreError};
use crate::flat_index::FlatIndex;
use crate::paths::IndexPaths;
use crate::persist;
use crate::types::{IndexPhase, SearchHits};
use std::sync::{Arc, PoisonError, RwLock};
use webqa_chunker::Chunk;

/// Texts sent to the embedder per call while building.
const EMBED_BATCH_SIZE: usize = 64;

/// Immutable vectors + records; replaced as a whole, never edited.
#[derive(Debug)]
struct IndexSnapshot {
    index: FlatIndex,
    records: Arc<[Chunk]>,
    model_id: String,
}

#[derive(Debug)]
struct IndexState {
    phase: IndexPhase,
    snapshot: Option<Arc<IndexSnapshot>>,
}

/// Embedded chunk collection with exact nearest-neighbour search.
///
/// Searches run concurrently against a shared snapshot. Writers (`build`, `load`,
/// `persist`, `rebuild`) are exclusive: a second writer fails instead of waiting.
pub struct VectorIndex {
    embedder: Arc<dyn Embedder>,
    paths: IndexPaths,
    state: RwLock<IndexState>,
    writer: tokio::sync::Mutex<()>,
}

/// Puts the previous phase back unless the operation committed.
struct PhaseGuard<'a> {
    state: &'a RwLock<IndexState>,
    previous: IndexPhase,
    armed: bool,
}

impl<'a> PhaseGuard<'a> {
    fn enter(state: &'a RwLock<IndexState>, phase: IndexPhase) -> Self {
        let mut guard = state.write().unwrap_or_else(PoisonError::into_inner);
        let previous = guard.phase;
        guard.phase = phase;
        Self {
            state,
            previous,
            armed: true,
        }
    }

    fn commit(mut self, phase: IndexPhase, snapshot: Arc<IndexSnapshot>) {
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        guard.phase = phase;
        guard.snapshot = Some(snapshot);
        self.armed = false;
    }
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
            guard.phase = self.previous;
        }
    }
}

impl VectorIndex {
    pub fn new(embedder: Arc<dyn Embedder>, paths: IndexPaths) -> Self {
        Self {
            embedder,
            paths,
            state: RwLock::new(IndexState {
                phase: IndexPhase::Empty,
                snapshot: None,
            }),
            writer: tokio::sync::Mutex::new(()),
        }
    }

    #[must_use]
    pub fn phase(&self) -> IndexPhase {
        self.read_state().phase
    }

    /// Number of indexed chunks (0 when nothing is built or loaded)
    #[must_use]
    pub fn len(&self) -> usize {
        self.read_state()
            .snapshot
            .as_ref()
            .map_or(0, |snapshot| snapshot.records.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Records of the current snapshot, in index order
    #[must_use]
    pub fn records(&self) -> Option<Arc<[Chunk]>> {
        self.read_state()
            .snapshot
            .as_ref()
            .map(|snapshot| Arc::clone(&snapshot.records))
    }

    #[must_use]
    pub fn paths(&self) -> &IndexPaths {
        &self.paths
    }

    #[must_use]
    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, IndexState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn current_snapshot(&self) -> Option<Arc<IndexSnapshot>> {
        self.read_state().snapshot.clone()
    }

    fn try_writer(&self, operation: &str) -> Result<tokio::sync::MutexGuard<'_, ()>> {
        self.writer.try_lock().map_err(|_| {
            VectorStoreError::InvalidState(format!(
                "cannot {operation}: another build, load or persist is running on this index"
            ))
        })
    }

    /// Embed `chunks` and replace the in-memory index. Nothing changes on failure.
    pub async fn build(&self, chunks: Vec<Chunk>) -> Result<usize> {
        let _writer = self.try_writer("build")?;
        let guard = PhaseGuard::enter(&self.state, IndexPhase::Building);

        let snapshot = self.embed_snapshot(chunks).await?;
        let count = snapshot.records.len();
        guard.commit(IndexPhase::Built, Arc::new(snapshot));
        log::info!("Built vector index with {count} chunks");
        Ok(count)
    }

    /// Write the current index to disk. Returns the generation digest.
    pub async fn persist(&self) -> Result<String> {
        let _writer = self.try_writer("persist")?;
        let snapshot = self.current_snapshot().ok_or_else(|| {
            VectorStoreError::InvalidState("nothing to persist: build an index first".to_string())
        })?;

        let generation = persist::write_pair(
            &self.paths,
            &snapshot.index,
            &snapshot.records,
            &snapshot.model_id,
        )
        .await?;
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .phase = IndexPhase::Persisted;
        Ok(generation)
    }

    /// Build and persist; the new index is only visible once both files are durable.
    pub async fn rebuild(&self, chunks: Vec<Chunk>) -> Result<usize> {
        let _writer = self.try_writer("rebuild")?;
        let guard = PhaseGuard::enter(&self.state, IndexPhase::Building);

        let snapshot = self.embed_snapshot(chunks).await?;
        persist::write_pair(
            &self.paths,
            &snapshot.index,
            &snapshot.records,
            &snapshot.model_id,
        )
        .await?;
        let count = snapshot.records.len();
        guard.commit(IndexPhase::Persisted, Arc::new(snapshot));
        log::info!("Rebuilt vector index with {count} chunks");
        Ok(count)
    }

    /// Replace the in-memory index with the persisted pair.
    pub async fn load(&self) -> Result<usize> {
        let _writer = self.try_writer("load")?;
        let guard = PhaseGuard::enter(&self.state, IndexPhase::Loading);

        let persisted = persist::read_pair(&self.paths).await?;
        let index_dimension = persisted.index.dimension();
        if let Some(embedder_dimension) = self.embedder.dimension() {
            if embedder_dimension != index_dimension {
                return Err(VectorStoreError::Incompatible {
                    index_model: persisted.model_id,
                    index_dimension,
                    embedder_model: self.embedder.model_id().to_string(),
                    embedder_dimension,
                });
            }
        }
        if persisted.model_id != self.embedder.model_id() {
            log::warn!(
                "Index was built with '{}', querying with '{}'",
                persisted.model_id,
                self.embedder.model_id()
            );
        }

        let count = persisted.records.len();
        let snapshot = IndexSnapshot {
            index: persisted.index,
            records: persisted.records.into(),
            model_id: persisted.model_id,
        };
        guard.commit(IndexPhase::Loaded, Arc::new(snapshot));
        log::info!(
            "Loaded vector index with {count} chunks from {}",
            self.paths.index.display()
        );
        Ok(count)
    }

    /// `min(top_k, len)` nearest chunks to `query`, ascending by squared distance.
    pub async fn search(&self, query: &str, top_k: usize) -> Result<SearchHits> {
        let snapshot = {
            let state = self.read_state();
            if state.phase.is_busy() {
                return Err(VectorStoreError::InvalidState(format!(
                    "index is {}; search is unavailable until it finishes",
                    state.phase
                )));
            }
            state.snapshot.clone().ok_or_else(|| {
                VectorStoreError::InvalidState(
                    "index has not been built or loaded".to_string(),
                )
            })?
        };

        let vector = self.embedder.embed(query).await?;
        let neighbours = snapshot.index.search(&vector, top_k)?;
        log::debug!(
            "Search returned {} of {} chunks (top_k {top_k})",
            neighbours.len(),
            snapshot.index.len()
        );
        Ok(SearchHits::new(neighbours, Arc::clone(&snapshot.records)))
    }

    async fn embed_snapshot(&self, chunks: Vec<Chunk>) -> Result<IndexSnapshot> {
        validate_chunks(&chunks)?;

        let mut rows: Vec<Vec<f32>> = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(EMBED_BATCH_SIZE) {
            let texts: Vec<&str> = batch.iter().map(|c| c.text.as_str()).collect();
            let vectors = self.embedder.embed_batch(&texts).await?;
            if vectors.len() != texts.len() {
                return Err(VectorStoreError::EmbeddingError(format!(
                    "embedder returned {} vectors for {} texts",
                    vectors.len(),
                    texts.len()
                )));
            }
            rows.extend(vectors);
            log::debug!("Embedded {}/{} chunks", rows.len(), chunks.len());
        }

        let dimension = rows.first().map_or(0, Vec::len);
        if let Some(bad) = rows.iter().find(|row| row.len() != dimension || row.is_empty()) {
            return Err(VectorStoreError::EmbeddingError(format!(
                "inconsistent embedding dimension: expected {dimension}, got {}",
                bad.len()
            )));
        }
        let index = FlatIndex::from_rows(&rows)?;

        if let Some(previous) = self.current_snapshot() {
            if previous.index.dimension() != index.dimension() {
                log::warn!(
                    "Embedding dimension changed from {} to {}; replacing the index",
                    previous.index.dimension(),
                    index.dimension()
                );
            }
        }

        Ok(IndexSnapshot {
            index,
            records: chunks.into(),
            model_id: self.embedder.model_id().to_string(),
        })
    }
}

fn validate_chunks(chunks: &[Chunk]) -> Result<()> {
    if chunks.is_empty() {
        return Err(VectorStoreError::InvalidInput(
            "cannot build an index from zero chunks".to_string(),
        ));
    }
    if let Some((pos, chunk)) = chunks
        .iter()
        .enumerate()
        .find(|(pos, chunk)| chunk.chunk_id != *pos)
    {
        return Err(VectorStoreError::InvalidInput(format!(
            "chunk ids must be dense and ordered: position {pos} has id {}",
            chunk.chunk_id
        )));
    }
    Ok(())
}
