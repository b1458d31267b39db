//! LineupManager : point d'entrée unique pour le ledger et les lineups
//!
//! Toutes les mutations passent par un verrou d'écriture commun : un cycle
//! lecture-modification-écriture (et la cascade qui le suit) ne peut pas
//! s'entrelacer avec un autre dans le même processus.

use crate::config_ext::{
    ExportSettings, LineupConfigExt, LineupSettings, Permissions, RootKind,
};
use crate::error::MissingReferences;
use crate::ledger::{
    Ledger, PromoAttrs, PromoEntry, PromoPatch, RosterAttrs, RosterEntry, RosterPatch, RtmpServer,
    non_empty,
};
use crate::lineup::{Lineup, LineupDj, reorder, validate_lineup_name};
use crate::store::{DocumentId, DocumentStore, JsonDocumentStore, load_json, save_json};
use crate::{Error, Result};
use once_cell::sync::OnceCell;
use shizuprobe::{FfprobeProbe, MediaProbe};
use shizuutils::PermittedRoots;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Singleton LineupManager
static LINEUP_MANAGER: OnceCell<LineupManager> = OnceCell::new();

/// Structure interne du manager
pub(crate) struct ManagerInner {
    pub(crate) store: Arc<dyn DocumentStore>,
    pub(crate) permissions: Permissions,
    pub(crate) probe: Arc<dyn MediaProbe>,
    pub(crate) export: ExportSettings,
    pub(crate) gate: RwLock<()>,
}

/// Résultat d'une suppression de lineup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

/// Gestionnaire central du ledger et des lineups
#[derive(Clone)]
pub struct LineupManager {
    pub(crate) inner: Arc<ManagerInner>,
}

impl LineupManager {
    /// Construit un gestionnaire à partir de ses collaborateurs
    pub fn new(
        store: Arc<dyn DocumentStore>,
        permissions: Permissions,
        probe: Arc<dyn MediaProbe>,
        export: ExportSettings,
    ) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                store,
                permissions,
                probe,
                export,
                gate: RwLock::new(()),
            }),
        }
    }

    /// Gestionnaire sur disque, avec la sonde fournie
    pub fn from_settings(settings: LineupSettings, probe: Arc<dyn MediaProbe>) -> Self {
        let store = JsonDocumentStore::new(settings.ledger_path, settings.lineups_dir);
        Self::new(Arc::new(store), settings.permissions, probe, settings.export)
    }

    /// Initialise avec la configuration de shizuconfig et ffprobe
    pub fn from_config(config: &shizuconfig::Config) -> Result<Self> {
        let settings = config.lineup_settings()?;
        let probe = Arc::new(FfprobeProbe::with_binary(&settings.export.ffprobe_binary));

        info!(
            ledger = %settings.ledger_path.display(),
            lineups = %settings.lineups_dir.display(),
            "Lineup manager initialized"
        );
        Ok(Self::from_settings(settings, probe))
    }

    /// Retourne le singleton (initialisé depuis la configuration globale)
    pub fn get() -> Result<&'static LineupManager> {
        LINEUP_MANAGER.get_or_try_init(|| {
            let config = shizuconfig::get_config()?;
            Self::from_config(&config)
        })
    }

    pub fn permissions(&self) -> &Permissions {
        &self.inner.permissions
    }

    pub fn export_settings(&self) -> &ExportSettings {
        &self.inner.export
    }

    /// Chemin complet depuis `[racine, sous-dossier, ..., fichier]`
    ///
    /// La racine est désignée par son nom de base ; le résultat reste dans
    /// cette racine.
    pub fn resolve_path<S: AsRef<str>>(&self, kind: RootKind, segments: &[S]) -> Result<PathBuf> {
        let path = self.inner.permissions.roots(kind).resolve_segments(segments)?;
        debug!(?kind, path = %path.display(), "Resolved media path");
        Ok(path)
    }

    // ------------------------------------------------------------------
    // Documents
    // ------------------------------------------------------------------

    /// Un ledger absent se lit comme un ledger vide
    pub(crate) fn load_ledger(&self) -> Result<Ledger> {
        Ok(load_json(self.inner.store.as_ref(), &DocumentId::Ledger)?.unwrap_or_default())
    }

    fn save_ledger(&self, ledger: &Ledger) -> Result<()> {
        save_json(self.inner.store.as_ref(), &DocumentId::Ledger, ledger)
    }

    pub(crate) fn load_lineup(&self, name: &str) -> Result<Lineup> {
        validate_lineup_name(name)?;
        load_json(self.inner.store.as_ref(), &DocumentId::lineup(name))?
            .ok_or_else(|| Error::NotFound(format!("Could not find lineup {}", name)))
    }

    fn save_lineup(&self, name: &str, lineup: &Lineup) -> Result<()> {
        save_json(self.inner.store.as_ref(), &DocumentId::lineup(name), lineup)
    }

    // ------------------------------------------------------------------
    // Ledger
    // ------------------------------------------------------------------

    /// Lit le ledger complet
    pub async fn ledger(&self) -> Result<Ledger> {
        let _guard = self.inner.gate.read().await;
        self.load_ledger()
    }

    /// Ajoute un DJ au roster
    pub async fn add_roster(&self, attrs: RosterAttrs) -> Result<Ledger> {
        let _guard = self.inner.gate.write().await;
        let mut ledger = self.load_ledger()?;

        let name = required_name(&attrs.name, "DJ")?;
        if ledger.has_dj(name) {
            return Err(Error::DuplicateEntry(format!("DJ {} already exists", name)));
        }

        let entry = RosterEntry {
            name: name.to_string(),
            logo_path: checked_path(&self.inner.permissions.logos, attrs.logo_path.as_deref())?,
            recording_path: checked_path(
                &self.inner.permissions.recordings,
                attrs.recording_path.as_deref(),
            )?,
            rtmp_server: parse_server(attrs.rtmp_server.as_deref())?,
            stream_key: non_empty(attrs.stream_key.as_deref()).map(str::to_string),
            last_live_resolution: None,
        };

        ledger.djs.push(entry);
        self.save_ledger(&ledger)?;

        info!(dj = %name, "DJ added to ledger");
        Ok(ledger)
    }

    /// Modifie partiellement le DJ à l'index donné
    ///
    /// Un renommage est enregistré dans le ledger avant d'être propagé aux
    /// lineups.
    pub async fn update_roster(&self, index: usize, patch: RosterPatch) -> Result<Ledger> {
        let _guard = self.inner.gate.write().await;
        let mut ledger = self.load_ledger()?;

        if index >= ledger.djs.len() {
            return Err(Error::NotFound(format!("No DJ entry at index {}", index)));
        }

        let new_name = non_empty(patch.name.as_deref());
        if let Some(new_name) = new_name {
            let taken = ledger
                .djs
                .iter()
                .enumerate()
                .any(|(i, dj)| i != index && dj.name == new_name);
            if taken {
                return Err(Error::DuplicateEntry(format!("DJ {} already exists", new_name)));
            }
        }

        let logo_path = checked_path(&self.inner.permissions.logos, patch.logo_path.as_deref())?;
        let recording_path = checked_path(
            &self.inner.permissions.recordings,
            patch.recording_path.as_deref(),
        )?;
        let rtmp_server = parse_server(patch.rtmp_server.as_deref())?;
        let stream_key = non_empty(patch.stream_key.as_deref());

        let entry = &mut ledger.djs[index];
        let old_name = entry.name.clone();
        if let Some(new_name) = new_name {
            entry.name = new_name.to_string();
        }
        if logo_path.is_some() {
            entry.logo_path = logo_path;
        }
        if recording_path.is_some() {
            entry.recording_path = recording_path;
        }
        if rtmp_server.is_some() {
            entry.rtmp_server = rtmp_server;
        }
        if let Some(key) = stream_key {
            entry.stream_key = Some(key.to_string());
        }
        if patch.last_live_resolution.is_some() {
            entry.last_live_resolution = patch.last_live_resolution;
        }

        self.save_ledger(&ledger)?;
        info!(dj = %old_name, index, "DJ updated");

        if let Some(new_name) = new_name.filter(|new_name| *new_name != old_name) {
            self.cascade_rename_dj(&old_name, new_name)?;
        }
        Ok(ledger)
    }

    /// Ajoute une promo au ledger
    pub async fn add_promo(&self, attrs: PromoAttrs) -> Result<Ledger> {
        let _guard = self.inner.gate.write().await;
        let mut ledger = self.load_ledger()?;

        let name = required_name(&attrs.name, "Promo")?;
        if ledger.has_promo(name) {
            return Err(Error::DuplicateEntry(format!("Promo {} already exists", name)));
        }

        ledger.promos.push(PromoEntry {
            name: name.to_string(),
            path: checked_path(&self.inner.permissions.recordings, attrs.path.as_deref())?,
        });
        self.save_ledger(&ledger)?;

        info!(promo = %name, "Promo added to ledger");
        Ok(ledger)
    }

    /// Modifie partiellement la promo à l'index donné
    pub async fn update_promo(&self, index: usize, patch: PromoPatch) -> Result<Ledger> {
        let _guard = self.inner.gate.write().await;
        let mut ledger = self.load_ledger()?;

        if index >= ledger.promos.len() {
            return Err(Error::NotFound(format!("No promo entry at index {}", index)));
        }

        let new_name = non_empty(patch.name.as_deref());
        if let Some(new_name) = new_name {
            let taken = ledger
                .promos
                .iter()
                .enumerate()
                .any(|(i, promo)| i != index && promo.name == new_name);
            if taken {
                return Err(Error::DuplicateEntry(format!(
                    "Promo {} already exists",
                    new_name
                )));
            }
        }
        let path = checked_path(&self.inner.permissions.recordings, patch.path.as_deref())?;

        let entry = &mut ledger.promos[index];
        let old_name = entry.name.clone();
        if let Some(new_name) = new_name {
            entry.name = new_name.to_string();
        }
        if path.is_some() {
            entry.path = path;
        }

        self.save_ledger(&ledger)?;
        info!(promo = %old_name, index, "Promo updated");

        if let Some(new_name) = new_name.filter(|new_name| *new_name != old_name) {
            self.cascade_rename_promo(&old_name, new_name)?;
        }
        Ok(ledger)
    }

    /// Supprime un DJ du roster et de tous les lineups
    pub async fn delete_roster(&self, index: usize) -> Result<Ledger> {
        let _guard = self.inner.gate.write().await;
        let mut ledger = self.load_ledger()?;

        if index >= ledger.djs.len() {
            return Err(Error::NotFound(format!("No DJ entry at index {}", index)));
        }

        let name = ledger.djs.remove(index).name;
        self.save_ledger(&ledger)?;
        self.cascade_strip_dj(&name)?;

        info!(dj = %name, "DJ deleted from ledger");
        Ok(ledger)
    }

    /// Supprime une promo du ledger et de tous les lineups
    pub async fn delete_promo(&self, index: usize) -> Result<Ledger> {
        let _guard = self.inner.gate.write().await;
        let mut ledger = self.load_ledger()?;

        if index >= ledger.promos.len() {
            return Err(Error::NotFound(format!("No promo entry at index {}", index)));
        }

        let name = ledger.promos.remove(index).name;
        self.save_ledger(&ledger)?;
        self.cascade_strip_promo(&name)?;

        info!(promo = %name, "Promo deleted from ledger");
        Ok(ledger)
    }

    // ------------------------------------------------------------------
    // Lineups
    // ------------------------------------------------------------------

    /// Lit un lineup (forme normalisée)
    pub async fn lineup(&self, name: &str) -> Result<Lineup> {
        let _guard = self.inner.gate.read().await;
        self.load_lineup(name)
    }

    /// Noms des lineups existants, triés
    pub async fn list_lineups(&self) -> Result<Vec<String>> {
        let _guard = self.inner.gate.read().await;
        self.inner.store.list_lineups()
    }

    /// Crée un lineup vide
    pub async fn create_lineup(&self, name: &str) -> Result<()> {
        validate_lineup_name(name)?;
        let _guard = self.inner.gate.write().await;

        if self.inner.store.exists(&DocumentId::lineup(name))? {
            return Err(Error::AlreadyExists(format!("Lineup {} already exists", name)));
        }

        self.save_lineup(name, &Lineup::default())?;
        info!(lineup = %name, "Lineup created");
        Ok(())
    }

    /// Remplace entièrement un lineup existant
    ///
    /// Toutes les références inconnues du ledger sont signalées ensemble.
    pub async fn replace_lineup(
        &self,
        name: &str,
        djs: Vec<LineupDj>,
        promos: Vec<String>,
    ) -> Result<()> {
        let _guard = self.inner.gate.write().await;
        self.load_lineup(name)?;

        if let Some(dj) = first_duplicate(djs.iter().map(|dj| dj.name.as_str())) {
            return Err(Error::DuplicateEntry(format!(
                "Lineup {} lists DJ {} more than once",
                name, dj
            )));
        }
        if let Some(promo) = first_duplicate(promos.iter().map(String::as_str)) {
            return Err(Error::DuplicateEntry(format!(
                "Lineup {} lists promo {} more than once",
                name, promo
            )));
        }

        let ledger = self.load_ledger()?;

        let missing = MissingReferences {
            djs: djs
                .iter()
                .filter(|dj| !ledger.has_dj(&dj.name))
                .map(|dj| dj.name.clone())
                .collect(),
            promos: promos
                .iter()
                .filter(|promo| !ledger.has_promo(promo))
                .cloned()
                .collect(),
        };
        if !missing.is_empty() {
            return Err(Error::ReferenceNotFound(missing));
        }

        self.save_lineup(name, &Lineup { djs, promos })?;
        info!(lineup = %name, "Lineup replaced");
        Ok(())
    }

    /// Supprime un lineup ; un lineup absent n'est pas une erreur
    pub async fn delete_lineup(&self, name: &str) -> Result<DeleteOutcome> {
        validate_lineup_name(name)?;
        let _guard = self.inner.gate.write().await;

        if self.inner.store.remove(&DocumentId::lineup(name))? {
            info!(lineup = %name, "Lineup deleted");
            Ok(DeleteOutcome::Deleted)
        } else {
            debug!(lineup = %name, "Lineup to delete does not exist");
            Ok(DeleteOutcome::NotFound)
        }
    }

    /// Ajoute un DJ du ledger en fin de lineup (en différé)
    pub async fn add_dj_to_lineup(&self, lineup_name: &str, dj: &str) -> Result<()> {
        let _guard = self.inner.gate.write().await;
        let mut lineup = self.load_lineup(lineup_name)?;

        if lineup.contains_dj(dj) {
            return Err(Error::DuplicateEntry(format!(
                "Lineup {} already contains DJ {}",
                lineup_name, dj
            )));
        }
        if !self.load_ledger()?.has_dj(dj) {
            return Err(Error::ReferenceNotFound(MissingReferences::dj(dj)));
        }

        lineup.djs.push(LineupDj::new(dj));
        self.save_lineup(lineup_name, &lineup)?;

        debug!(lineup = %lineup_name, dj, "DJ added to lineup");
        Ok(())
    }

    /// Ajoute une promo du ledger en fin de lineup
    pub async fn add_promo_to_lineup(&self, lineup_name: &str, promo: &str) -> Result<()> {
        let _guard = self.inner.gate.write().await;
        let mut lineup = self.load_lineup(lineup_name)?;

        if lineup.contains_promo(promo) {
            return Err(Error::DuplicateEntry(format!(
                "Lineup {} already contains promo {}",
                lineup_name, promo
            )));
        }
        if !self.load_ledger()?.has_promo(promo) {
            return Err(Error::ReferenceNotFound(MissingReferences::promo(promo)));
        }

        lineup.promos.push(promo.to_string());
        self.save_lineup(lineup_name, &lineup)?;

        debug!(lineup = %lineup_name, promo, "Promo added to lineup");
        Ok(())
    }

    pub async fn remove_dj_from_lineup(&self, lineup_name: &str, dj: &str) -> Result<()> {
        let _guard = self.inner.gate.write().await;
        let mut lineup = self.load_lineup(lineup_name)?;

        let position = lineup
            .dj_position(dj)
            .ok_or_else(|| Error::ReferenceNotFound(MissingReferences::dj(dj)))?;
        lineup.djs.remove(position);
        self.save_lineup(lineup_name, &lineup)?;

        debug!(lineup = %lineup_name, dj, "DJ removed from lineup");
        Ok(())
    }

    pub async fn remove_promo_from_lineup(&self, lineup_name: &str, promo: &str) -> Result<()> {
        let _guard = self.inner.gate.write().await;
        let mut lineup = self.load_lineup(lineup_name)?;

        let position = lineup
            .promo_position(promo)
            .ok_or_else(|| Error::ReferenceNotFound(MissingReferences::promo(promo)))?;
        lineup.promos.remove(position);
        self.save_lineup(lineup_name, &lineup)?;

        debug!(lineup = %lineup_name, promo, "Promo removed from lineup");
        Ok(())
    }

    /// Passe un créneau en direct ou en différé ; `vj` n'est modifié que s'il est fourni
    pub async fn set_lineup_dj_live(
        &self,
        lineup_name: &str,
        dj: &str,
        is_live: bool,
        vj: Option<&str>,
    ) -> Result<()> {
        let _guard = self.inner.gate.write().await;
        let mut lineup = self.load_lineup(lineup_name)?;

        let position = lineup
            .dj_position(dj)
            .ok_or_else(|| Error::ReferenceNotFound(MissingReferences::dj(dj)))?;
        let slot = &mut lineup.djs[position];
        slot.is_live = is_live;
        if let Some(vj) = vj {
            slot.vj = Some(vj.to_string());
        }
        self.save_lineup(lineup_name, &lineup)?;

        debug!(lineup = %lineup_name, dj, is_live, "DJ slot updated");
        Ok(())
    }

    pub async fn move_dj(&self, lineup_name: &str, from: usize, to: usize) -> Result<()> {
        let _guard = self.inner.gate.write().await;
        let mut lineup = self.load_lineup(lineup_name)?;

        reorder::move_entry(&mut lineup.djs, from, to)
            .map_err(|e| Error::InvalidRange(format!("{} (DJs of lineup {})", e, lineup_name)))?;
        if from != to {
            self.save_lineup(lineup_name, &lineup)?;
        }
        Ok(())
    }

    pub async fn move_promo(&self, lineup_name: &str, from: usize, to: usize) -> Result<()> {
        let _guard = self.inner.gate.write().await;
        let mut lineup = self.load_lineup(lineup_name)?;

        reorder::move_entry(&mut lineup.promos, from, to).map_err(|e| {
            Error::InvalidRange(format!("{} (promos of lineup {})", e, lineup_name))
        })?;
        if from != to {
            self.save_lineup(lineup_name, &lineup)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Cascades
    // ------------------------------------------------------------------

    /// Renomme un DJ dans tous les lineups ; retourne le nombre de lineups modifiés
    pub async fn rename_dj_references(&self, old: &str, new: &str) -> Result<usize> {
        let _guard = self.inner.gate.write().await;
        self.cascade_rename_dj(old, new)
    }

    pub async fn rename_promo_references(&self, old: &str, new: &str) -> Result<usize> {
        let _guard = self.inner.gate.write().await;
        self.cascade_rename_promo(old, new)
    }

    /// Retire un DJ de tous les lineups
    pub async fn strip_dj_references(&self, name: &str) -> Result<usize> {
        let _guard = self.inner.gate.write().await;
        self.cascade_strip_dj(name)
    }

    pub async fn strip_promo_references(&self, name: &str) -> Result<usize> {
        let _guard = self.inner.gate.write().await;
        self.cascade_strip_promo(name)
    }

    fn cascade_rename_dj(&self, old: &str, new: &str) -> Result<usize> {
        let touched = self.for_each_lineup(|lineup| lineup.rename_dj(old, new))?;
        debug!(old, new, touched, "DJ rename propagated to lineups");
        Ok(touched)
    }

    fn cascade_rename_promo(&self, old: &str, new: &str) -> Result<usize> {
        let touched = self.for_each_lineup(|lineup| lineup.rename_promo(old, new))?;
        debug!(old, new, touched, "Promo rename propagated to lineups");
        Ok(touched)
    }

    fn cascade_strip_dj(&self, name: &str) -> Result<usize> {
        let touched = self.for_each_lineup(|lineup| lineup.strip_dj(name))?;
        debug!(dj = name, touched, "DJ stripped from lineups");
        Ok(touched)
    }

    fn cascade_strip_promo(&self, name: &str) -> Result<usize> {
        let touched = self.for_each_lineup(|lineup| lineup.strip_promo(name))?;
        debug!(promo = name, touched, "Promo stripped from lineups");
        Ok(touched)
    }

    /// Applique `update` à chaque lineup et n'écrit que ceux qui ont changé
    fn for_each_lineup<F>(&self, mut update: F) -> Result<usize>
    where
        F: FnMut(&mut Lineup) -> bool,
    {
        let mut touched = 0;
        for name in self.inner.store.list_lineups()? {
            let Some(mut lineup) =
                load_json::<Lineup>(self.inner.store.as_ref(), &DocumentId::lineup(&name))?
            else {
                continue;
            };
            if update(&mut lineup) {
                self.save_lineup(&name, &lineup)?;
                touched += 1;
            }
        }
        Ok(touched)
    }
}

/// Premier nom répété d'une liste
fn first_duplicate<'a>(names: impl Iterator<Item = &'a str>) -> Option<&'a str> {
    let mut seen = HashSet::new();
    names.into_iter().find(|name| !seen.insert(*name))
}

/// Nom obligatoire et non vide
fn required_name<'a>(name: &'a str, kind: &str) -> Result<&'a str> {
    if name.trim().is_empty() {
        return Err(Error::InvalidValue(format!("{} name cannot be empty", kind)));
    }
    Ok(name)
}

/// Valide un chemin optionnel contre les racines autorisées
///
/// Retourne le chemin absolu normalisé, qui est celui enregistré.
fn checked_path(roots: &PermittedRoots, candidate: Option<&str>) -> Result<Option<String>> {
    match non_empty(candidate) {
        Some(candidate) => {
            let path = roots.require(Path::new(candidate))?;
            Ok(Some(path.to_string_lossy().into_owned()))
        }
        None => Ok(None),
    }
}

fn parse_server(raw: Option<&str>) -> Result<Option<RtmpServer>> {
    match non_empty(raw) {
        Some(raw) => raw.parse().map(Some).map_err(Error::InvalidValue),
        None => Ok(None),
    }
}
