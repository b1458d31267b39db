use crate::{MediaProbe, ProbeError, Resolution};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// In-memory probe answering from a fixed table.
///
/// Unknown paths resolve to [`Resolution::Empty`]. Every call is recorded,
/// which lets callers check which files were actually probed.
#[derive(Debug, Default)]
pub struct MemoryProbe {
    answers: HashMap<PathBuf, Result<Resolution, String>>,
    calls: Mutex<Vec<PathBuf>>,
}

impl MemoryProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resolution(mut self, path: impl Into<PathBuf>, resolution: Resolution) -> Self {
        self.answers.insert(path.into(), Ok(resolution));
        self
    }

    /// Makes probing `path` fail with [`ProbeError::InvalidFile`].
    pub fn with_failure(mut self, path: impl Into<PathBuf>, detail: impl Into<String>) -> Self {
        self.answers.insert(path.into(), Err(detail.into()));
        self
    }

    /// Paths probed so far, in call order.
    pub fn calls(&self) -> Vec<PathBuf> {
        match self.calls.lock() {
            Ok(calls) => calls.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl MediaProbe for MemoryProbe {
    async fn probe(&self, path: &Path) -> Result<Resolution, ProbeError> {
        match self.calls.lock() {
            Ok(mut calls) => calls.push(path.to_path_buf()),
            Err(poisoned) => poisoned.into_inner().push(path.to_path_buf()),
        }

        match self.answers.get(path) {
            Some(Ok(resolution)) => Ok(*resolution),
            Some(Err(detail)) => Err(ProbeError::InvalidFile {
                path: path.display().to_string(),
                detail: detail.clone(),
            }),
            None => Ok(Resolution::Empty),
        }
    }
}
