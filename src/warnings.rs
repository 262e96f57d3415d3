// src/warnings.rs

//! Non-fatal diagnostics raised while building.

use std::fmt::Debug;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum WarningKind {
    /// A file retrieved from the cache could not be removed again after a
    /// co-target missed the cache.
    CacheCleanupError,
}

/// Destination for warnings.
pub trait WarningSink: Send + Sync + Debug {
    fn warn(&self, kind: WarningKind, message: &str);
}

/// Emits warnings through `tracing`.
#[derive(Debug, Clone, Default)]
pub struct LogWarnings;

impl WarningSink for LogWarnings {
    fn warn(&self, kind: WarningKind, message: &str) {
        warn!(?kind, "{message}");
    }
}

/// Keeps every warning in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingWarnings {
    issued: Arc<Mutex<Vec<(WarningKind, String)>>>,
}

impl RecordingWarnings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issued(&self) -> Vec<(WarningKind, String)> {
        self.issued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl WarningSink for RecordingWarnings {
    fn warn(&self, kind: WarningKind, message: &str) {
        self.issued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((kind, message.to_string()));
    }
}
