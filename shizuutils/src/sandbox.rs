//! Validation des chemins contre les répertoires autorisés
//!
//! La normalisation est purement lexicale : les liens symboliques ne sont
//! pas résolus et aucun accès au système de fichiers n'est effectué.

use serde::Serialize;
use std::path::{Component, Path, PathBuf};

/// Erreurs de validation de chemin
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error("Supplied {label} path is not permitted: {}", .path.display())]
    OutsideRoots { label: String, path: PathBuf },

    #[error("Unknown {label} directory: {id}")]
    UnknownRoot { label: String, id: String },

    #[error("No {label} directory given")]
    EmptySegments { label: String },

    #[error("Cannot determine working directory: {0}")]
    WorkingDir(#[from] std::io::Error),
}

/// Normalise un chemin de manière lexicale.
///
/// `.` est supprimé, `..` retire le composant précédent. Un chemin absolu ne
/// remonte jamais au-dessus de sa racine ; un chemin relatif conserve ses
/// `..` de tête.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();

    for component in path.components() {
        match component {
            Component::Prefix(prefix) => out.push(prefix.as_os_str()),
            Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            Component::Normal(name) => out.push(name),
        }
    }

    if out.as_os_str().is_empty() && !path.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Rend un chemin absolu par rapport à `base`, puis le normalise.
pub fn absolutize(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize(path)
    } else {
        normalize(&base.join(path))
    }
}

/// Vérifie que `candidate` est égal à, ou contenu dans, une des racines.
///
/// Les chemins relatifs sont résolus par rapport au répertoire courant.
/// Retourne `false` si celui-ci ne peut pas être déterminé.
pub fn validate<P: AsRef<Path>>(candidate: &Path, roots: &[P]) -> bool {
    match std::env::current_dir() {
        Ok(base) => validate_from(candidate, roots, &base),
        Err(e) => {
            tracing::warn!(error = %e, "Cannot read working directory, rejecting path");
            false
        }
    }
}

/// Variante de [`validate`] avec un répertoire de base explicite.
pub fn validate_from<P: AsRef<Path>>(candidate: &Path, roots: &[P], base: &Path) -> bool {
    if candidate.as_os_str().is_empty() {
        return false;
    }
    let candidate = absolutize(candidate, base);
    roots
        .iter()
        .map(|root| absolutize(root.as_ref(), base))
        .any(|root| candidate.starts_with(&root))
}

/// Description publique d'une racine (identifiant = nom de base)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RootDescriptor {
    pub id: String,
    pub path: PathBuf,
}

/// Ensemble ordonné de répertoires autorisés pour un usage donné
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermittedRoots {
    label: String,
    roots: Vec<PathBuf>,
}

impl PermittedRoots {
    /// Construit un ensemble de racines ; les racines relatives sont
    /// résolues par rapport à `base`.
    pub fn with_base<I, P>(label: &str, roots: I, base: &Path) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        Self {
            label: label.to_string(),
            roots: roots
                .into_iter()
                .map(|root| absolutize(root.as_ref(), base))
                .collect(),
        }
    }

    /// Libellé utilisé dans les messages d'erreur ("logo", "recording", ...)
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Vérifie l'appartenance d'un chemin (résolu depuis le répertoire courant)
    pub fn contains(&self, candidate: &Path) -> bool {
        validate(candidate, &self.roots)
    }

    pub fn contains_from(&self, candidate: &Path, base: &Path) -> bool {
        validate_from(candidate, &self.roots, base)
    }

    /// Retourne le chemin absolu normalisé, ou une erreur s'il sort des racines
    pub fn require(&self, candidate: &Path) -> Result<PathBuf, SandboxError> {
        let base = std::env::current_dir()?;
        self.require_from(candidate, &base)
    }

    pub fn require_from(&self, candidate: &Path, base: &Path) -> Result<PathBuf, SandboxError> {
        if self.contains_from(candidate, base) {
            Ok(absolutize(candidate, base))
        } else {
            tracing::debug!(
                label = %self.label,
                path = %candidate.display(),
                "Path rejected by sandbox"
            );
            Err(SandboxError::OutsideRoots {
                label: self.label.clone(),
                path: candidate.to_path_buf(),
            })
        }
    }

    /// Reconstruit un chemin depuis `[id_racine, sous-dossier, ..., fichier]`.
    ///
    /// Si plusieurs racines partagent le même nom de base, la dernière déclarée
    /// l'emporte.
    pub fn resolve_segments<S: AsRef<str>>(
        &self,
        segments: &[S],
    ) -> Result<PathBuf, SandboxError> {
        let Some((id, rest)) = segments.split_first() else {
            return Err(SandboxError::EmptySegments {
                label: self.label.clone(),
            });
        };
        let id = id.as_ref();

        let root = self
            .roots
            .iter()
            .rev()
            .find(|root| root_id(root) == id)
            .ok_or_else(|| SandboxError::UnknownRoot {
                label: self.label.clone(),
                id: id.to_string(),
            })?;

        let mut full = root.clone();
        for segment in rest {
            full.push(segment.as_ref());
        }
        let full = normalize(&full);

        if full.starts_with(root) {
            Ok(full)
        } else {
            Err(SandboxError::OutsideRoots {
                label: self.label.clone(),
                path: full,
            })
        }
    }

    /// Liste les racines avec leur identifiant public
    pub fn describe(&self) -> Vec<RootDescriptor> {
        self.roots
            .iter()
            .map(|root| RootDescriptor {
                id: root_id(root),
                path: root.clone(),
            })
            .collect()
    }
}

fn root_id(root: &Path) -> String {
    root.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
