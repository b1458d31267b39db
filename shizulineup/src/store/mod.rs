//! Persistance des documents JSON (ledger et lineups)
//!
//! Chaque document est lu et écrit en entier. Les écritures passent par un
//! fichier temporaire renommé ensuite, dans le même répertoire, pour qu'un
//! lecteur ne voie jamais un document à moitié écrit.

use crate::{Error, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

const DOCUMENT_EXTENSION: &str = "json";

/// Identifiant d'un document persistant
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DocumentId {
    Ledger,
    Lineup(String),
}

impl DocumentId {
    pub fn lineup(name: impl Into<String>) -> Self {
        DocumentId::Lineup(name.into())
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentId::Ledger => write!(f, "ledger"),
            DocumentId::Lineup(name) => write!(f, "lineup {}", name),
        }
    }
}

/// Stockage de documents entiers
pub trait DocumentStore: Send + Sync {
    /// Lit un document ; `None` s'il n'existe pas
    fn read(&self, id: &DocumentId) -> Result<Option<Vec<u8>>>;

    /// Remplace (ou crée) un document
    fn write(&self, id: &DocumentId, bytes: &[u8]) -> Result<()>;

    /// Supprime un document ; `false` s'il n'existait pas
    fn remove(&self, id: &DocumentId) -> Result<bool>;

    /// Noms de tous les lineups existants, triés
    fn list_lineups(&self) -> Result<Vec<String>>;

    fn exists(&self, id: &DocumentId) -> Result<bool> {
        Ok(self.read(id)?.is_some())
    }
}

/// Lit et désérialise un document JSON
pub fn load_json<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    id: &DocumentId,
) -> Result<Option<T>> {
    match store.read(id)? {
        Some(bytes) => serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| Error::Persistence(format!("Failed to parse {}: {}", id, e))),
        None => Ok(None),
    }
}

/// Sérialise et écrit un document JSON
pub fn save_json<T: Serialize>(
    store: &dyn DocumentStore,
    id: &DocumentId,
    value: &T,
) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)
        .map_err(|e| Error::Persistence(format!("Failed to serialize {}: {}", id, e)))?;
    store.write(id, &bytes)
}

/// Écrit `bytes` dans `path` via un fichier temporaire renommé
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    // Créer le répertoire parent si nécessaire
    fs::create_dir_all(parent).map_err(|e| {
        Error::Persistence(format!("Failed to create directory {}: {}", parent.display(), e))
    })?;

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| Error::Persistence(format!("Not a file path: {}", path.display())))?;
    let tmp_path = parent.join(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4()));

    let written = fs::File::create(&tmp_path).and_then(|mut file| {
        file.write_all(bytes)?;
        file.sync_all()
    });

    if let Err(e) = written.and_then(|_| fs::rename(&tmp_path, path)) {
        let _ = fs::remove_file(&tmp_path);
        return Err(Error::Persistence(format!(
            "Failed to write {}: {}",
            path.display(),
            e
        )));
    }

    tracing::trace!(path = %path.display(), size = bytes.len(), "Document written");
    Ok(())
}

/// Stockage sur disque : un fichier ledger et un répertoire de lineups
#[derive(Debug, Clone)]
pub struct JsonDocumentStore {
    ledger_path: PathBuf,
    lineups_dir: PathBuf,
}

impl JsonDocumentStore {
    pub fn new(ledger_path: impl Into<PathBuf>, lineups_dir: impl Into<PathBuf>) -> Self {
        Self {
            ledger_path: ledger_path.into(),
            lineups_dir: lineups_dir.into(),
        }
    }

    pub fn ledger_path(&self) -> &Path {
        &self.ledger_path
    }

    pub fn lineups_dir(&self) -> &Path {
        &self.lineups_dir
    }

    /// Chemin du fichier associé à un document
    pub fn path_of(&self, id: &DocumentId) -> Result<PathBuf> {
        match id {
            DocumentId::Ledger => Ok(self.ledger_path.clone()),
            DocumentId::Lineup(name) => {
                crate::lineup::validate_lineup_name(name)?;
                Ok(self
                    .lineups_dir
                    .join(format!("{}.{}", name, DOCUMENT_EXTENSION)))
            }
        }
    }
}

impl DocumentStore for JsonDocumentStore {
    fn read(&self, id: &DocumentId) -> Result<Option<Vec<u8>>> {
        let path = self.path_of(id)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Persistence(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn write(&self, id: &DocumentId, bytes: &[u8]) -> Result<()> {
        write_atomic(&self.path_of(id)?, bytes)
    }

    fn remove(&self, id: &DocumentId) -> Result<bool> {
        let path = self.path_of(id)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::Persistence(format!(
                "Failed to remove {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn list_lineups(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.lineups_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(Error::Persistence(format!(
                    "Failed to list {}: {}",
                    self.lineups_dir.display(),
                    e
                )));
            }
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry
                .map_err(|e| Error::Persistence(format!("Failed to read directory entry: {}", e)))?;
            let path = entry.path();
            let is_document =
                path.extension().and_then(|ext| ext.to_str()) == Some(DOCUMENT_EXTENSION);
            if !path.is_file() || !is_document {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            // Fichiers temporaires et cachés
            if stem.starts_with('.') {
                continue;
            }
            names.push(stem.to_string());
        }

        names.sort();
        Ok(names)
    }
}
