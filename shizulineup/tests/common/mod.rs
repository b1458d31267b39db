#![allow(dead_code)]

use shizulineup::{
    ExportSettings, JsonDocumentStore, LineupManager, Permissions, PromoAttrs, RosterAttrs,
};
use shizuprobe::{MediaProbe, MemoryProbe};
use shizuutils::PermittedRoots;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub const STREAM_DOMAIN: &str = "example.org";

/// Gestionnaire isolé dans un répertoire temporaire
///
/// Racines autorisées : `logos/`, `recordings/`, `export/`.
pub struct TestEnv {
    pub dir: TempDir,
    pub manager: LineupManager,
}

impl TestEnv {
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Chemin absolu sous la racine temporaire, en chaîne
    pub fn path(&self, relative: &str) -> String {
        self.root().join(relative).to_string_lossy().into_owned()
    }

    pub fn lineup_file(&self, name: &str) -> PathBuf {
        self.root().join("lineups").join(format!("{}.json", name))
    }

    /// Contenu brut d'un lineup sur disque
    pub fn lineup_bytes(&self, name: &str) -> Vec<u8> {
        std::fs::read(self.lineup_file(name)).unwrap()
    }

    pub fn export_dir(&self) -> PathBuf {
        self.root().join("export")
    }
}

pub fn create_test_env() -> (TestEnv, Arc<MemoryProbe>) {
    create_test_env_with(|_| MemoryProbe::new())
}

/// Environnement de test avec une sonde mémoire construite depuis la racine
pub fn create_test_env_with<F>(probe: F) -> (TestEnv, Arc<MemoryProbe>)
where
    F: FnOnce(&Path) -> MemoryProbe,
{
    let dir = tempfile::tempdir().unwrap();
    let probe = Arc::new(probe(dir.path()));
    let manager = manager_in(dir.path(), probe.clone(), Some(Duration::from_secs(5)));
    (TestEnv { dir, manager }, probe)
}

/// Gestionnaire sur `root` avec une sonde quelconque
pub fn manager_in(
    root: &Path,
    probe: Arc<dyn MediaProbe>,
    timeout: Option<Duration>,
) -> LineupManager {
    for sub in ["logos", "recordings", "export"] {
        std::fs::create_dir_all(root.join(sub)).unwrap();
    }

    let store = JsonDocumentStore::new(root.join("ledger.json"), root.join("lineups"));
    let permissions = Permissions {
        logos: PermittedRoots::with_base("logo", ["logos"], root),
        recordings: PermittedRoots::with_base("recording", ["recordings"], root),
        exports: PermittedRoots::with_base("export", ["export"], root),
    };
    let export = ExportSettings {
        probe_timeout: timeout,
        stream_domain: STREAM_DOMAIN.to_string(),
        ..ExportSettings::default()
    };

    LineupManager::new(Arc::new(store), permissions, probe, export)
}

pub async fn add_dj(env: &TestEnv, name: &str) {
    env.manager.add_roster(RosterAttrs::named(name)).await.unwrap();
}

pub async fn add_promo(env: &TestEnv, name: &str) {
    env.manager.add_promo(PromoAttrs::named(name)).await.unwrap();
}
