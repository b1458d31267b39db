//! Extension de shizuconfig pour le ledger et les lineups

use shizuutils::PermittedRoots;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_STREAM_DOMAIN: &str = "anisonhijack.com";
const DEFAULT_FFPROBE_BINARY: &str = "ffprobe";

/// Racines autorisées par usage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Permissions {
    pub logos: PermittedRoots,
    pub recordings: PermittedRoots,
    pub exports: PermittedRoots,
}

/// Usage d'un chemin : choisit le jeu de racines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootKind {
    Logo,
    Recording,
    Export,
}

impl Permissions {
    pub fn roots(&self, kind: RootKind) -> &PermittedRoots {
        match kind {
            RootKind::Logo => &self.logos,
            RootKind::Recording => &self.recordings,
            RootKind::Export => &self.exports,
        }
    }
}

/// Options de l'export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSettings {
    /// Limite par appel de sonde ; `None` désactive la limite
    pub probe_timeout: Option<Duration>,
    pub ffprobe_binary: PathBuf,
    /// Domaine des serveurs RTMP (`rtmp-<serveur>.<domaine>`)
    pub stream_domain: String,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            probe_timeout: Some(Duration::from_secs(60)),
            ffprobe_binary: PathBuf::from(DEFAULT_FFPROBE_BINARY),
            stream_domain: DEFAULT_STREAM_DOMAIN.to_string(),
        }
    }
}

/// Tout ce que le gestionnaire lit dans la configuration
#[derive(Debug, Clone)]
pub struct LineupSettings {
    pub ledger_path: PathBuf,
    pub lineups_dir: PathBuf,
    pub permissions: Permissions,
    pub export: ExportSettings,
}

/// Trait d'extension pour shizuconfig::Config
pub trait LineupConfigExt {
    /// Chemin du document ledger
    fn ledger_path(&self) -> anyhow::Result<PathBuf>;

    /// Répertoire des lineups (créé si nécessaire)
    fn lineups_dir(&self) -> anyhow::Result<PathBuf>;

    /// Racines autorisées ; les racines relatives le sont au répertoire de configuration
    fn permissions(&self) -> anyhow::Result<Permissions>;

    fn export_settings(&self) -> anyhow::Result<ExportSettings>;

    fn lineup_settings(&self) -> anyhow::Result<LineupSettings> {
        Ok(LineupSettings {
            ledger_path: self.ledger_path()?,
            lineups_dir: self.lineups_dir()?,
            permissions: self.permissions()?,
            export: self.export_settings()?,
        })
    }
}

impl LineupConfigExt for shizuconfig::Config {
    fn ledger_path(&self) -> anyhow::Result<PathBuf> {
        self.get_managed_file(&["ledger", "path"], "ledger.json")
    }

    fn lineups_dir(&self) -> anyhow::Result<PathBuf> {
        self.get_managed_dir(&["lineups", "directory"], "lineups")
    }

    fn permissions(&self) -> anyhow::Result<Permissions> {
        let base = self.dir();
        let roots = |key: &str, default: &str| -> anyhow::Result<Vec<String>> {
            self.get_string_list(&["permissions", key], &[default])
        };

        Ok(Permissions {
            logos: PermittedRoots::with_base("logo", roots("logo_dirs", "logos")?, base),
            recordings: PermittedRoots::with_base(
                "recording",
                roots("recording_dirs", "recordings")?,
                base,
            ),
            exports: PermittedRoots::with_base("export", roots("export_dirs", "export")?, base),
        })
    }

    fn export_settings(&self) -> anyhow::Result<ExportSettings> {
        let timeout_secs = self.get_probe_timeout_secs()?;
        let binary = self.get_string(&["export", "ffprobe_binary"], DEFAULT_FFPROBE_BINARY)?;

        Ok(ExportSettings {
            probe_timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
            ffprobe_binary: PathBuf::from(binary),
            stream_domain: self.get_string(&["export", "stream_domain"], DEFAULT_STREAM_DOMAIN)?,
        })
    }
}
