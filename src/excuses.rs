//! The static list of excuses served by `/no`.

use rand::Rng;
use std::path::Path;
use tracing::info;

use crate::error::{Result, ServiceError};

/// Immutable, non-empty list of excuses loaded once at startup.
#[derive(Debug, Clone)]
pub struct ExcuseList {
    excuses: Vec<String>,
}

impl ExcuseList {
    /// Validate an in-memory list. Rejects an empty list and blank entries.
    pub fn new(excuses: Vec<String>) -> Result<Self> {
        if excuses.is_empty() {
            return Err(ServiceError::NoExcuses);
        }
        if let Some(index) = excuses.iter().position(|e| e.trim().is_empty()) {
            return Err(ServiceError::BlankExcuse(index));
        }

        Ok(Self { excuses })
    }

    /// Parse a JSON array of strings.
    pub fn from_json(raw: &str) -> Result<Self> {
        let excuses: Vec<String> = serde_json::from_str(raw)?;
        Self::new(excuses)
    }

    /// Read and parse the excuse file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ServiceError::ExcusesUnreadable {
            path: path.to_path_buf(),
            source,
        })?;

        let list = Self::from_json(&raw)?;
        info!(path = %path.display(), count = list.len(), "loaded excuses");
        Ok(list)
    }

    /// Pick an excuse uniformly at random.
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> &str {
        &self.excuses[rng.gen_range(0..self.excuses.len())]
    }

    pub fn len(&self) -> usize {
        self.excuses.len()
    }

    /// Always false for a constructed list.
    pub fn is_empty(&self) -> bool {
        self.excuses.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.excuses
    }
}
