//! On-disk format of the vector/metadata pair.
//!
//! Both files carry the same generation (a SHA-256 over the vectors and the
//! records), so a pair that was only half replaced is refused on load.
//!
//! Replacing a pair moves the live vector file aside to `index.bin.bak` first.
//! A failed metadata rename puts it back; a swap interrupted by a crash is
//! finished or rolled back by the next writer or reader, by comparing the
//! backup's generation with the metadata on disk.

use crate::error::{Result, VectorStoreError};
use crate::flat_index::FlatIndex;
use crate::paths::{sibling_with_suffix, IndexPaths};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use webqa_chunker::Chunk;

pub const INDEX_MAGIC: &[u8; 4] = b"WQV1";
pub const INDEX_FORMAT_VERSION: u32 = 1;
pub const METADATA_SCHEMA_VERSION: u32 = 1;

/// A pair read back from disk and checked for consistency.
#[derive(Debug)]
pub struct PersistedIndex {
    pub index: FlatIndex,
    pub records: Vec<Chunk>,
    pub model_id: String,
    pub generation: String,
}

#[derive(Serialize)]
struct MetadataOut<'a> {
    schema_version: u32,
    generation: &'a str,
    model_id: &'a str,
    records: &'a [Chunk],
}

#[derive(Deserialize)]
struct MetadataGeneration {
    generation: String,
}

#[derive(Deserialize)]
struct MetadataIn {
    schema_version: u32,
    generation: String,
    model_id: String,
    records: Vec<Chunk>,
}

struct IndexHeader {
    dimension: usize,
    count: usize,
    generation: String,
    model_id: String,
}

/// Content digest shared by both files of a pair.
pub fn generation(index: &FlatIndex, records: &[Chunk]) -> Result<String> {
    let records_json = serde_json::to_vec(records)?;
    let mut hasher = Sha256::new();
    hasher.update((index.dimension() as u64).to_le_bytes());
    for value in index.as_flat() {
        hasher.update(value.to_le_bytes());
    }
    hasher.update(&records_json);
    let digest = hasher.finalize();
    Ok(digest.iter().map(|b| format!("{b:02x}")).collect())
}

pub fn encode_index(index: &FlatIndex, generation: &str, model_id: &str) -> Vec<u8> {
    let flat = index.as_flat();
    let mut out = Vec::with_capacity(
        4 + 4 + 4 + 8 + 4 + generation.len() + 4 + model_id.len() + flat.len() * 4,
    );
    out.extend_from_slice(INDEX_MAGIC);
    out.extend_from_slice(&INDEX_FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&(index.dimension() as u32).to_le_bytes());
    out.extend_from_slice(&(index.len() as u64).to_le_bytes());
    put_str(&mut out, generation);
    put_str(&mut out, model_id);
    for value in flat {
        out.extend_from_slice(&value.to_le_bytes());
    }
    out
}

fn put_str(out: &mut Vec<u8>, value: &str) {
    out.extend_from_slice(&(value.len() as u32).to_le_bytes());
    out.extend_from_slice(value.as_bytes());
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| VectorStoreError::Corrupted("index file is truncated".to_string()))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(buf))
    }

    fn u64(&mut self) -> Result<u64> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(buf))
    }

    fn string(&mut self) -> Result<String> {
        let len = self.u32()? as usize;
        let raw = self.take(len)?;
        String::from_utf8(raw.to_vec())
            .map_err(|_| VectorStoreError::Corrupted("index header is not valid UTF-8".to_string()))
    }
}

fn decode_header(reader: &mut Reader<'_>) -> Result<IndexHeader> {
    if reader.take(4)? != INDEX_MAGIC {
        return Err(VectorStoreError::Corrupted(
            "index file has an unknown format (bad magic)".to_string(),
        ));
    }
    let version = reader.u32()?;
    if version != INDEX_FORMAT_VERSION {
        return Err(VectorStoreError::Corrupted(format!(
            "unsupported index format version {version}"
        )));
    }
    let dimension = reader.u32()? as usize;
    let count = usize::try_from(reader.u64()?)
        .map_err(|_| VectorStoreError::Corrupted("vector count out of range".to_string()))?;
    let generation = reader.string()?;
    let model_id = reader.string()?;
    Ok(IndexHeader {
        dimension,
        count,
        generation,
        model_id,
    })
}

/// Decode the vector file, without cross-checking it against metadata.
pub fn decode_index(bytes: &[u8]) -> Result<(FlatIndex, String, String)> {
    let mut reader = Reader { bytes, pos: 0 };
    let header = decode_header(&mut reader)?;
    if header.dimension == 0 {
        return Err(VectorStoreError::Corrupted(
            "index declares zero dimensions".to_string(),
        ));
    }
    let values = header
        .count
        .checked_mul(header.dimension)
        .ok_or_else(|| VectorStoreError::Corrupted("vector count out of range".to_string()))?;
    let body = reader.take(values.saturating_mul(4))?;
    if reader.pos != bytes.len() {
        return Err(VectorStoreError::Corrupted(
            "index file has trailing bytes".to_string(),
        ));
    }

    let flat = body
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    let index = FlatIndex::from_flat(header.dimension, flat)
        .map_err(|e| VectorStoreError::Corrupted(e.to_string()))?;
    Ok((index, header.generation, header.model_id))
}

/// Writes both files of the pair: temporaries first, then renames.
///
/// Holds the exclusive lock for the whole sequence. Returns the generation.
pub async fn write_pair(
    paths: &IndexPaths,
    index: &FlatIndex,
    records: &[Chunk],
    model_id: &str,
) -> Result<String> {
    if index.len() != records.len() {
        return Err(VectorStoreError::InvalidInput(format!(
            "refusing to persist {} vectors with {} records",
            index.len(),
            records.len()
        )));
    }
    let generation = generation(index, records)?;
    let index_bytes = encode_index(index, &generation, model_id);
    let metadata_bytes = serde_json::to_vec_pretty(&MetadataOut {
        schema_version: METADATA_SCHEMA_VERSION,
        generation: &generation,
        model_id,
        records,
    })?;

    for path in [&paths.index, &paths.metadata] {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    let _lock = IndexLock::acquire(paths.lock_path(), LockMode::Exclusive).await?;
    recover_interrupted_swap(paths).await?;

    let index_tmp = sibling_with_suffix(&paths.index, ".tmp");
    let metadata_tmp = sibling_with_suffix(&paths.metadata, ".tmp");
    let result = async {
        write_synced(&index_tmp, &index_bytes).await?;
        write_synced(&metadata_tmp, &metadata_bytes).await?;
        swap_in(paths, &index_tmp, &metadata_tmp).await
    }
    .await;

    if let Err(err) = result {
        let _ = tokio::fs::remove_file(&index_tmp).await;
        let _ = tokio::fs::remove_file(&metadata_tmp).await;
        return Err(err);
    }

    log::info!(
        "Persisted {} vectors to {} (generation {})",
        records.len(),
        paths.index.display(),
        &generation[..12]
    );
    Ok(generation)
}

fn backup_path(paths: &IndexPaths) -> PathBuf {
    sibling_with_suffix(&paths.index, ".bak")
}

/// Publishes the synced temporaries. On error the previous pair is back in place.
async fn swap_in(paths: &IndexPaths, index_tmp: &Path, metadata_tmp: &Path) -> Result<()> {
    let backup = backup_path(paths);
    let had_previous = tokio::fs::try_exists(&paths.index).await?;
    if had_previous {
        tokio::fs::rename(&paths.index, &backup).await?;
    }

    if let Err(err) = tokio::fs::rename(index_tmp, &paths.index).await {
        restore_previous(paths, &backup, had_previous).await;
        return Err(err.into());
    }
    if let Err(err) = tokio::fs::rename(metadata_tmp, &paths.metadata).await {
        restore_previous(paths, &backup, had_previous).await;
        return Err(err.into());
    }

    if had_previous {
        if let Err(err) = tokio::fs::remove_file(&backup).await {
            log::warn!("Failed to remove {}: {err}", backup.display());
        }
    }
    Ok(())
}

async fn restore_previous(paths: &IndexPaths, backup: &Path, had_previous: bool) {
    let restored = if had_previous {
        tokio::fs::rename(backup, &paths.index).await
    } else {
        match tokio::fs::remove_file(&paths.index).await {
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            other => other,
        }
    };
    match restored {
        Ok(()) => log::warn!(
            "Index swap failed; kept the previous pair at {}",
            paths.index.display()
        ),
        Err(err) => log::error!(
            "Index swap failed and {} could not be restored: {err}",
            paths.index.display()
        ),
    }
}

/// Finishes or rolls back a swap that stopped between its renames.
///
/// Must run under the exclusive lock.
async fn recover_interrupted_swap(paths: &IndexPaths) -> Result<()> {
    let backup = backup_path(paths);
    if !tokio::fs::try_exists(&backup).await? {
        return Ok(());
    }

    if !tokio::fs::try_exists(&paths.index).await? {
        log::warn!("Restoring {} from an interrupted swap", paths.index.display());
        tokio::fs::rename(&backup, &paths.index).await?;
        return Ok(());
    }

    let backup_generation = {
        let bytes = read_file(&backup).await?;
        decode_header(&mut Reader {
            bytes: &bytes,
            pos: 0,
        })
        .map(|header| header.generation)
        .ok()
    };
    let metadata_generation = match tokio::fs::read(&paths.metadata).await {
        Ok(bytes) => serde_json::from_slice::<MetadataGeneration>(&bytes)
            .map(|m| m.generation)
            .ok(),
        Err(err) if err.kind() == ErrorKind::NotFound => None,
        Err(err) => return Err(err.into()),
    };

    if backup_generation.is_some() && backup_generation == metadata_generation {
        // Metadata was never replaced: the backup is its partner.
        log::warn!("Rolling back an interrupted swap of {}", paths.index.display());
        tokio::fs::rename(&backup, &paths.index).await?;
    } else {
        log::debug!("Dropping stale backup {}", backup.display());
        tokio::fs::remove_file(&backup).await?;
    }
    Ok(())
}

async fn write_synced(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    Ok(())
}

/// Reads both files and checks that they belong to the same build.
pub async fn read_pair(paths: &IndexPaths) -> Result<PersistedIndex> {
    if tokio::fs::try_exists(backup_path(paths)).await? {
        let _lock = IndexLock::acquire(paths.lock_path(), LockMode::Exclusive).await?;
        recover_interrupted_swap(paths).await?;
    }

    for path in [&paths.index, &paths.metadata] {
        if !path.exists() {
            return Err(VectorStoreError::NotFound(format!(
                "{} (run `webqa index` first)",
                path.display()
            )));
        }
    }

    let (index_bytes, metadata_bytes) = {
        let _lock = IndexLock::acquire(paths.lock_path(), LockMode::Shared).await?;
        (read_file(&paths.index).await?, read_file(&paths.metadata).await?)
    };

    let (index, index_generation, model_id) = decode_index(&index_bytes)?;
    let metadata: MetadataIn = serde_json::from_slice(&metadata_bytes)
        .map_err(|e| VectorStoreError::Corrupted(format!("unreadable metadata: {e}")))?;

    if metadata.schema_version != METADATA_SCHEMA_VERSION {
        return Err(VectorStoreError::Corrupted(format!(
            "unsupported metadata schema version {}",
            metadata.schema_version
        )));
    }
    if metadata.records.len() != index.len() {
        return Err(VectorStoreError::Corrupted(format!(
            "index holds {} vectors but metadata has {} records",
            index.len(),
            metadata.records.len()
        )));
    }
    if metadata.generation != index_generation {
        return Err(VectorStoreError::Corrupted(
            "index and metadata come from different builds".to_string(),
        ));
    }
    if let Some((pos, record)) = metadata
        .records
        .iter()
        .enumerate()
        .find(|(pos, record)| record.chunk_id != *pos)
    {
        return Err(VectorStoreError::Corrupted(format!(
            "record at position {pos} has chunk_id {}",
            record.chunk_id
        )));
    }
    if metadata.model_id != model_id {
        return Err(VectorStoreError::Corrupted(format!(
            "index model '{model_id}' differs from metadata model '{}'",
            metadata.model_id
        )));
    }
    if generation(&index, &metadata.records)? != index_generation {
        return Err(VectorStoreError::Corrupted(
            "index content does not match its generation".to_string(),
        ));
    }

    Ok(PersistedIndex {
        index,
        records: metadata.records,
        model_id,
        generation: index_generation,
    })
}

async fn read_file(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path).await.map_err(|err| {
        if err.kind() == ErrorKind::NotFound {
            VectorStoreError::NotFound(path.display().to_string())
        } else {
            VectorStoreError::IoError(err)
        }
    })
}

#[derive(Clone, Copy)]
enum LockMode {
    Shared,
    Exclusive,
}

/// Advisory file lock; released on drop.
struct IndexLock {
    file: std::fs::File,
}

impl Drop for IndexLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

impl IndexLock {
    async fn acquire(path: PathBuf, mode: LockMode) -> Result<Self> {
        tokio::task::spawn_blocking(move || -> Result<Self> {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .read(true)
                .write(true)
                .truncate(false)
                .open(&path)?;
            match mode {
                LockMode::Shared => file.lock_shared()?,
                LockMode::Exclusive => file.lock_exclusive()?,
            }
            Ok(Self { file })
        })
        .await
        .map_err(|err| VectorStoreError::InvalidState(format!("join index lock task: {err}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn records(n: usize) -> Vec<Chunk> {
        (0..n)
            .map(|i| {
                Chunk::new(
                    format!("chunk number {i}"),
                    "https://example.com".to_string(),
                    "Example".to_string(),
                    i,
                    i * 20,
                )
            })
            .collect()
    }

    fn index(n: usize) -> FlatIndex {
        let rows: Vec<Vec<f32>> = (0..n).map(|i| vec![i as f32, 1.0, -0.5]).collect();
        FlatIndex::from_rows(&rows).unwrap()
    }

    #[tokio::test]
    async fn pair_roundtrip() {
        let dir = TempDir::new().unwrap();
        let paths = IndexPaths::in_dir(&dir.path().join("nested"));

        let generation = write_pair(&paths, &index(4), &records(4), "test-model")
            .await
            .unwrap();
        assert_eq!(generation.len(), 64);
        assert!(!sibling_with_suffix(&paths.index, ".tmp").exists());

        let loaded = read_pair(&paths).await.unwrap();
        assert_eq!(loaded.index, index(4));
        assert_eq!(loaded.records, records(4));
        assert_eq!(loaded.model_id, "test-model");
        assert_eq!(loaded.generation, generation);
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let paths = IndexPaths::in_dir(dir.path());
        let err = read_pair(&paths).await.unwrap_err();
        assert!(matches!(err, VectorStoreError::NotFound(_)), "{err}");

        write_pair(&paths, &index(2), &records(2), "m").await.unwrap();
        std::fs::remove_file(&paths.metadata).unwrap();
        let err = read_pair(&paths).await.unwrap_err();
        assert!(matches!(err, VectorStoreError::NotFound(_)), "{err}");
    }

    #[tokio::test]
    async fn count_mismatch_is_corruption() {
        let dir = TempDir::new().unwrap();
        let paths = IndexPaths::in_dir(dir.path());
        write_pair(&paths, &index(10), &records(10), "m").await.unwrap();

        // Metadata from an 8-record build next to the 10-vector file.
        let other = IndexPaths::in_dir(&dir.path().join("other"));
        write_pair(&other, &index(8), &records(8), "m").await.unwrap();
        std::fs::copy(&other.metadata, &paths.metadata).unwrap();

        let err = read_pair(&paths).await.unwrap_err();
        match err {
            VectorStoreError::Corrupted(msg) => assert!(msg.contains("10 vectors"), "{msg}"),
            other => panic!("expected corruption, got {other}"),
        }
    }

    #[tokio::test]
    async fn half_swapped_pair_is_corruption() {
        let dir = TempDir::new().unwrap();
        let paths = IndexPaths::in_dir(dir.path());
        write_pair(&paths, &index(3), &records(3), "m").await.unwrap();

        let other = IndexPaths::in_dir(&dir.path().join("other"));
        let mut changed = records(3);
        changed[1].text = "replaced text".to_string();
        write_pair(&other, &index(3), &changed, "m").await.unwrap();
        std::fs::copy(&other.metadata, &paths.metadata).unwrap();

        let err = read_pair(&paths).await.unwrap_err();
        assert!(matches!(err, VectorStoreError::Corrupted(_)), "{err}");
    }

    #[tokio::test]
    async fn failed_metadata_rename_keeps_previous_pair() {
        let dir = TempDir::new().unwrap();
        let paths = IndexPaths::in_dir(dir.path());
        let previous = write_pair(&paths, &index(3), &records(3), "m").await.unwrap();

        // A non-empty directory where the metadata should land makes its rename fail.
        let blocked_metadata = dir.path().join("blocked");
        std::fs::create_dir(&blocked_metadata).unwrap();
        std::fs::write(blocked_metadata.join("keep"), b"x").unwrap();
        let blocked = IndexPaths::new(paths.index.clone(), blocked_metadata);
        assert!(write_pair(&blocked, &index(5), &records(5), "m").await.is_err());

        assert!(!backup_path(&paths).exists());
        assert!(!sibling_with_suffix(&paths.index, ".tmp").exists());
        let loaded = read_pair(&paths).await.unwrap();
        assert_eq!(loaded.generation, previous);
        assert_eq!(loaded.records, records(3));
    }

    #[tokio::test]
    async fn crash_before_metadata_rename_rolls_back() {
        let dir = TempDir::new().unwrap();
        let paths = IndexPaths::in_dir(dir.path());
        write_pair(&paths, &index(3), &records(3), "m").await.unwrap();
        let other = IndexPaths::in_dir(&dir.path().join("other"));
        write_pair(&other, &index(5), &records(5), "m").await.unwrap();

        // Live vectors moved aside and the new ones renamed in, metadata untouched.
        std::fs::rename(&paths.index, backup_path(&paths)).unwrap();
        std::fs::copy(&other.index, &paths.index).unwrap();

        let loaded = read_pair(&paths).await.unwrap();
        assert_eq!(loaded.records, records(3));
        assert!(!backup_path(&paths).exists());
    }

    #[tokio::test]
    async fn crash_after_metadata_rename_keeps_new_pair() {
        let dir = TempDir::new().unwrap();
        let paths = IndexPaths::in_dir(dir.path());
        write_pair(&paths, &index(3), &records(3), "m").await.unwrap();
        let previous = std::fs::read(&paths.index).unwrap();

        // Both renames landed; only the backup cleanup was lost.
        let other = IndexPaths::in_dir(&dir.path().join("other"));
        write_pair(&other, &index(5), &records(5), "m").await.unwrap();
        std::fs::copy(&other.index, &paths.index).unwrap();
        std::fs::copy(&other.metadata, &paths.metadata).unwrap();
        std::fs::write(backup_path(&paths), previous).unwrap();

        let loaded = read_pair(&paths).await.unwrap();
        assert_eq!(loaded.records, records(5));
        assert!(!backup_path(&paths).exists());
    }

    #[test]
    fn bad_magic_and_truncation_are_corruption() {
        let bytes = encode_index(&index(2), "g", "m");
        let (decoded, generation, model) = decode_index(&bytes).unwrap();
        assert_eq!(decoded, index(2));
        assert_eq!((generation.as_str(), model.as_str()), ("g", "m"));

        let mut wrong = bytes.clone();
        wrong[0] = b'X';
        assert!(matches!(decode_index(&wrong), Err(VectorStoreError::Corrupted(_))));

        let truncated = &bytes[..bytes.len() - 3];
        assert!(matches!(decode_index(truncated), Err(VectorStoreError::Corrupted(_))));
    }

    #[tokio::test]
    async fn non_positional_chunk_ids_are_corruption() {
        let dir = TempDir::new().unwrap();
        let paths = IndexPaths::in_dir(dir.path());
        let mut recs = records(3);
        recs.swap(0, 1);
        write_pair(&paths, &index(3), &recs, "m").await.unwrap();

        let err = read_pair(&paths).await.unwrap_err();
        assert!(err.to_string().contains("chunk_id"), "{err}");
    }
}
