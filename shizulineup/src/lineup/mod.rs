//! Lineup : ordre de passage des DJs et des promos d'un événement
//!
//! Un lineup ne référence les entrées du ledger que par leur nom.

pub mod reorder;

use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};

/// Créneau DJ d'un lineup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawLineupDj")]
pub struct LineupDj {
    pub name: String,
    pub is_live: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vj: Option<String>,
}

impl LineupDj {
    /// Nouveau créneau, en différé par défaut
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_live: false,
            vj: None,
        }
    }

    pub fn live(name: impl Into<String>) -> Self {
        Self {
            is_live: true,
            ..Self::new(name)
        }
    }
}

/// Forme lue sur disque, y compris les anciens créneaux `url` / `recording_path`
#[derive(Deserialize)]
struct RawLineupDj {
    name: String,
    #[serde(default)]
    is_live: Option<bool>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    recording_path: Option<String>,
    #[serde(default)]
    vj: Option<String>,
}

impl From<RawLineupDj> for LineupDj {
    fn from(raw: RawLineupDj) -> Self {
        let mut is_live = raw.is_live;
        if raw.url.as_deref().is_some_and(|url| !url.is_empty()) {
            is_live = Some(true);
        }
        // Un enregistrement l'emporte sur une URL
        if raw.recording_path.as_deref().is_some_and(|path| !path.is_empty()) {
            is_live = Some(false);
        }

        LineupDj {
            name: raw.name,
            is_live: is_live.unwrap_or(false),
            vj: raw.vj.filter(|vj| !vj.is_empty()),
        }
    }
}

/// Document lineup
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lineup {
    #[serde(default)]
    pub djs: Vec<LineupDj>,
    #[serde(default, deserialize_with = "promo_names")]
    pub promos: Vec<String>,
}

impl Lineup {
    pub fn dj_position(&self, name: &str) -> Option<usize> {
        self.djs.iter().position(|dj| dj.name == name)
    }

    pub fn promo_position(&self, name: &str) -> Option<usize> {
        self.promos.iter().position(|promo| promo == name)
    }

    pub fn contains_dj(&self, name: &str) -> bool {
        self.dj_position(name).is_some()
    }

    pub fn contains_promo(&self, name: &str) -> bool {
        self.promo_position(name).is_some()
    }

    /// Renomme les références DJ ; retourne `true` si le lineup a changé
    pub fn rename_dj(&mut self, old: &str, new: &str) -> bool {
        let mut changed = false;
        for dj in self.djs.iter_mut().filter(|dj| dj.name == old) {
            dj.name = new.to_string();
            changed = true;
        }
        changed
    }

    pub fn rename_promo(&mut self, old: &str, new: &str) -> bool {
        let mut changed = false;
        for promo in self.promos.iter_mut().filter(|promo| *promo == old) {
            *promo = new.to_string();
            changed = true;
        }
        changed
    }

    /// Retire toutes les références à un DJ
    pub fn strip_dj(&mut self, name: &str) -> bool {
        let before = self.djs.len();
        self.djs.retain(|dj| dj.name != name);
        self.djs.len() != before
    }

    pub fn strip_promo(&mut self, name: &str) -> bool {
        let before = self.promos.len();
        self.promos.retain(|promo| promo != name);
        self.promos.len() != before
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PromoRef {
    Name(String),
    Entry { name: String },
}

fn promo_names<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let refs = Vec::<PromoRef>::deserialize(deserializer)?;
    Ok(refs
        .into_iter()
        .map(|promo| match promo {
            PromoRef::Name(name) | PromoRef::Entry { name } => name,
        })
        .collect())
}

/// Vérifie qu'un nom de lineup désigne bien un fichier du répertoire des lineups
pub fn validate_lineup_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidValue("Lineup name cannot be empty".into()));
    }
    if name == "." || name == ".." || name.starts_with('.') {
        return Err(Error::InvalidValue(format!(
            "Lineup name {} cannot start with a dot",
            name
        )));
    }
    if name.contains(['/', '\\', '\0']) {
        return Err(Error::InvalidValue(format!(
            "Lineup name {} cannot contain path separators",
            name
        )));
    }
    Ok(())
}
