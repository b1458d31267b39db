/// Utilitaires partagés entre les crates Shizu.
///
/// Ce crate regroupe la gestion des chemins fournis par l'utilisateur :
/// normalisation lexicale et validation contre les répertoires autorisés
/// par l'administrateur (logos, enregistrements, exports).
///
/// # Fonctions principales
///
/// - [`normalize`] : normalisation lexicale (`.` et `..`) sans accès disque
/// - [`validate`] : vérifie qu'un chemin se trouve sous une des racines
/// - [`PermittedRoots`] : ensemble de racines autorisées, identifiées par leur nom de base
///
/// # Examples
///
/// ```
/// use shizuutils::{PermittedRoots, normalize};
/// use std::path::Path;
///
/// let roots = PermittedRoots::with_base("logo", ["/srv/logos"], Path::new("/"));
/// assert!(roots.contains_from(Path::new("/srv/logos/dj/a.png"), Path::new("/")));
/// assert!(!roots.contains_from(Path::new("/srv/logos/../etc/passwd"), Path::new("/")));
/// assert_eq!(normalize(Path::new("/a/./b/../c")), Path::new("/a/c"));
/// ```
pub mod sandbox;

pub use sandbox::{
    PermittedRoots, RootDescriptor, SandboxError, absolutize, normalize, validate, validate_from,
};
