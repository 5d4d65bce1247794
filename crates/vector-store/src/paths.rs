use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_INDEX_DIR: &str = ".webqa";
pub const INDEX_FILE_NAME: &str = "index.bin";
pub const METADATA_FILE_NAME: &str = "metadata.json";

/// Locations of the persisted vector blob and its metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexPaths {
    pub index: PathBuf,
    pub metadata: PathBuf,
}

impl IndexPaths {
    #[must_use]
    pub fn new(index: impl Into<PathBuf>, metadata: impl Into<PathBuf>) -> Self {
        Self {
            index: index.into(),
            metadata: metadata.into(),
        }
    }

    /// `<dir>/index.bin` + `<dir>/metadata.json`
    #[must_use]
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(INDEX_FILE_NAME), dir.join(METADATA_FILE_NAME))
    }

    /// Advisory lock file serializing writers across processes.
    #[must_use]
    pub fn lock_path(&self) -> PathBuf {
        sibling_with_suffix(&self.index, ".lock")
    }

    #[must_use]
    pub fn exists(&self) -> bool {
        self.index.exists() && self.metadata.exists()
    }
}

impl Default for IndexPaths {
    fn default() -> Self {
        Self::in_dir(Path::new(DEFAULT_INDEX_DIR))
    }
}

pub(crate) fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}
