// src/fs/mock.rs

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::FileSystem;

/// In-memory filesystem holding sets of file and directory paths.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    files: Arc<Mutex<HashSet<PathBuf>>>,
    dirs: Arc<Mutex<HashSet<PathBuf>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: impl AsRef<Path>) {
        lock(&self.files).insert(path.as_ref().to_path_buf());
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        lock(&self.dirs).insert(path.as_ref().to_path_buf());
    }
}

fn lock(set: &Mutex<HashSet<PathBuf>>) -> MutexGuard<'_, HashSet<PathBuf>> {
    set.lock().unwrap_or_else(PoisonError::into_inner)
}

impl FileSystem for MockFileSystem {
    fn exists(&self, path: &Path) -> bool {
        self.is_file(path) || lock(&self.dirs).contains(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        lock(&self.files).contains(path)
    }
}
