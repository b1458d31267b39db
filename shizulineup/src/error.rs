//! Types d'erreurs pour shizulineup

use std::fmt;

/// Références (DJ ou promo) introuvables, regroupées par type
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MissingReferences {
    pub djs: Vec<String>,
    pub promos: Vec<String>,
}

impl MissingReferences {
    pub fn dj(name: impl Into<String>) -> Self {
        Self {
            djs: vec![name.into()],
            promos: Vec::new(),
        }
    }

    pub fn promo(name: impl Into<String>) -> Self {
        Self {
            djs: Vec::new(),
            promos: vec![name.into()],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.djs.is_empty() && self.promos.is_empty()
    }

    /// Nombre total de références manquantes
    pub fn len(&self) -> usize {
        self.djs.len() + self.promos.len()
    }
}

impl fmt::Display for MissingReferences {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if !self.djs.is_empty() {
            parts.push(format!("DJs: {}", self.djs.join(", ")));
        }
        if !self.promos.is_empty() {
            parts.push(format!("Promos: {}", self.promos.join(", ")));
        }
        write!(f, "Could not find {}", parts.join("; "))
    }
}

/// Erreurs de gestion du ledger et des lineups
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("{0}")]
    ReferenceNotFound(MissingReferences),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Media probe failed: {}", .0.join("; "))]
    MediaProbeFailed(Vec<String>),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error(transparent)]
    Config(#[from] anyhow::Error),
}

impl From<shizuutils::SandboxError> for Error {
    fn from(err: shizuutils::SandboxError) -> Self {
        Error::InvalidPath(err.to_string())
    }
}

/// Type Result spécialisé pour shizulineup
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_references_message_lists_everything() {
        let missing = MissingReferences {
            djs: vec!["Nova".into(), "Kite".into()],
            promos: vec!["Teaser".into()],
        };
        assert_eq!(missing.len(), 3);
        assert_eq!(
            Error::ReferenceNotFound(missing).to_string(),
            "Could not find DJs: Nova, Kite; Promos: Teaser"
        );
    }

    #[test]
    fn test_single_kind_message() {
        assert_eq!(
            MissingReferences::promo("Teaser").to_string(),
            "Could not find Promos: Teaser"
        );
        assert!(MissingReferences::default().is_empty());
    }
}
