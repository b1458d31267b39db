//! Export d'un lineup vers un manifeste JSON prêt à diffuser
//!
//! L'export recoupe le lineup avec le ledger, interroge la sonde média pour
//! chaque fichier enregistré, puis écrit `<export_dir>/<lineup>.json`.
//! Rien n'est écrit si une référence manque ou si une sonde échoue.

use crate::error::MissingReferences;
use crate::ledger::{PromoEntry, RosterEntry, RtmpServer};
use crate::lineup::validate_lineup_name;
use crate::manager::LineupManager;
use crate::store::write_atomic;
use crate::{Error, Result};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use shizuprobe::{MediaProbe, ProbeError, Resolution};
use shizuutils::normalize;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Étapes de l'export, pour les traces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStage {
    Validating,
    Loading,
    Reconciling,
    Probing,
    Writing,
    Written,
    Failed,
}

impl fmt::Display for ExportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExportStage::Validating => "validating",
            ExportStage::Loading => "loading",
            ExportStage::Reconciling => "reconciling",
            ExportStage::Probing => "probing",
            ExportStage::Writing => "writing",
            ExportStage::Written => "written",
            ExportStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Entrée DJ du manifeste ; les champs absents valent `""`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DjManifestEntry {
    pub name: String,
    pub logo_path: String,
    pub recording_path: String,
    pub resolution: Resolution,
    pub url: String,
    pub vj: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromoManifestEntry {
    pub name: String,
    pub path: String,
    pub resolution: Resolution,
}

/// Manifeste écrit par l'export
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub djs: Vec<DjManifestEntry>,
    pub promos: Vec<PromoManifestEntry>,
}

/// Résumé d'un export réussi
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub path: PathBuf,
    pub djs: usize,
    pub promos: usize,
    /// Nombre de fichiers passés à la sonde
    pub probed: usize,
}

/// URL d'ingestion d'un DJ en direct
///
/// Vide si le serveur ou la clé de stream manque.
pub fn stream_url(server: Option<RtmpServer>, stream_key: Option<&str>, domain: &str) -> String {
    match (server, stream_key.filter(|key| !key.is_empty())) {
        (Some(server), Some(key)) => format!("rtmp://rtmp-{}.{}/live/{}", server, domain, key),
        _ => String::new(),
    }
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    Dj(usize),
    Promo(usize),
}

/// Fichier à sonder pour une entrée du manifeste
struct ProbeJob {
    slot: Slot,
    name: String,
    path: PathBuf,
}

impl ProbeJob {
    fn failure(&self, err: &ProbeError) -> String {
        match self.slot {
            Slot::Dj(_) => format!("DJ {}, {}", self.name, err),
            Slot::Promo(_) => format!("Promo {}, {}", self.name, err),
        }
    }
}

impl LineupManager {
    /// Exporte un lineup dans `export_dir`
    pub async fn export_lineup(
        &self,
        lineup_name: &str,
        export_dir: impl AsRef<Path>,
    ) -> Result<ExportSummary> {
        let stage = ExportStage::Validating;
        debug!(lineup = %lineup_name, %stage, "Export started");

        validate_lineup_name(lineup_name)?;
        let output = normalize(export_dir.as_ref()).join(format!("{}.json", lineup_name));
        let output = self.inner.permissions.exports.require(&output)?;

        let stage = ExportStage::Loading;
        debug!(lineup = %lineup_name, %stage, "Loading documents");
        let (ledger, lineup) = {
            let _guard = self.inner.gate.read().await;
            (self.load_ledger()?, self.load_lineup(lineup_name)?)
        };

        let stage = ExportStage::Reconciling;
        debug!(lineup = %lineup_name, %stage, "Reconciling lineup with ledger");
        let roster: HashMap<&str, &RosterEntry> =
            ledger.djs.iter().map(|dj| (dj.name.as_str(), dj)).collect();
        let promos: HashMap<&str, &PromoEntry> = ledger
            .promos
            .iter()
            .map(|promo| (promo.name.as_str(), promo))
            .collect();

        let missing = MissingReferences {
            djs: lineup
                .djs
                .iter()
                .filter(|slot| !roster.contains_key(slot.name.as_str()))
                .map(|slot| slot.name.clone())
                .collect(),
            promos: lineup
                .promos
                .iter()
                .filter(|name| !promos.contains_key(name.as_str()))
                .cloned()
                .collect(),
        };
        if !missing.is_empty() {
            warn!(lineup = %lineup_name, stage = %ExportStage::Failed, %missing, "Export aborted");
            return Err(Error::ReferenceNotFound(missing));
        }

        let mut manifest = Manifest::default();
        let mut jobs = Vec::new();

        for slot in &lineup.djs {
            let entry = roster[slot.name.as_str()];
            let recording_path = path_string(entry.recording_path.as_deref());
            let mut record = DjManifestEntry {
                name: entry.name.clone(),
                logo_path: path_string(entry.logo_path.as_deref()),
                recording_path: recording_path.clone(),
                resolution: Resolution::Empty,
                url: String::new(),
                vj: slot.vj.clone().unwrap_or_default(),
            };

            if slot.is_live {
                record.url = stream_url(
                    entry.rtmp_server,
                    entry.stream_key.as_deref(),
                    &self.inner.export.stream_domain,
                );
                if record.url.is_empty() {
                    warn!(dj = %entry.name, "Live DJ has no RTMP server or stream key");
                }
                record.resolution = entry.last_live_resolution.unwrap_or_default();
            } else if !recording_path.is_empty() {
                jobs.push(ProbeJob {
                    slot: Slot::Dj(manifest.djs.len()),
                    name: entry.name.clone(),
                    path: PathBuf::from(recording_path),
                });
            }
            manifest.djs.push(record);
        }

        for name in &lineup.promos {
            let entry = promos[name.as_str()];
            let path = path_string(entry.path.as_deref());
            if !path.is_empty() {
                jobs.push(ProbeJob {
                    slot: Slot::Promo(manifest.promos.len()),
                    name: entry.name.clone(),
                    path: PathBuf::from(&path),
                });
            }
            manifest.promos.push(PromoManifestEntry {
                name: entry.name.clone(),
                path,
                resolution: Resolution::Empty,
            });
        }

        let stage = ExportStage::Probing;
        debug!(lineup = %lineup_name, %stage, files = jobs.len(), "Probing media files");
        let probe = self.inner.probe.as_ref();
        let timeout = self.inner.export.probe_timeout;
        let results = join_all(
            jobs.iter()
                .map(|job| probe_with_timeout(probe, &job.path, timeout)),
        )
        .await;

        let mut failures = Vec::new();
        for (job, result) in jobs.iter().zip(results) {
            match result {
                Ok(resolution) => match job.slot {
                    Slot::Dj(i) => manifest.djs[i].resolution = resolution,
                    Slot::Promo(i) => manifest.promos[i].resolution = resolution,
                },
                Err(e) => failures.push(job.failure(&e)),
            }
        }
        if !failures.is_empty() {
            warn!(
                lineup = %lineup_name,
                stage = %ExportStage::Failed,
                failures = failures.len(),
                "Export aborted, media probe failed"
            );
            return Err(Error::MediaProbeFailed(failures));
        }

        let stage = ExportStage::Writing;
        debug!(lineup = %lineup_name, %stage, output = %output.display(), "Writing manifest");
        let bytes = serde_json::to_vec_pretty(&manifest)
            .map_err(|e| Error::Persistence(format!("Failed to serialize manifest: {}", e)))?;
        write_atomic(&output, &bytes)?;

        let summary = ExportSummary {
            path: output,
            djs: manifest.djs.len(),
            promos: manifest.promos.len(),
            probed: jobs.len(),
        };
        info!(
            lineup = %lineup_name,
            stage = %ExportStage::Written,
            output = %summary.path.display(),
            djs = summary.djs,
            promos = summary.promos,
            "Lineup exported"
        );
        Ok(summary)
    }
}

/// Chemin normalisé, ou `""` si absent
fn path_string(path: Option<&str>) -> String {
    match path.filter(|p| !p.is_empty()) {
        Some(path) => normalize(Path::new(path)).to_string_lossy().into_owned(),
        None => String::new(),
    }
}

async fn probe_with_timeout(
    probe: &dyn MediaProbe,
    path: &Path,
    timeout: Option<Duration>,
) -> std::result::Result<Resolution, ProbeError> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, probe.probe(path))
            .await
            .unwrap_or(Err(ProbeError::TimedOut(limit))),
        None => probe.probe(path).await,
    }
}
