//! Ledger : registre des DJs (roster) et des promos
//!
//! Les anciens documents enregistraient `""` pour les champs absents ; ils
//! sont relus comme `None`.

use serde::{Deserialize, Deserializer, Serialize};
use shizuprobe::Resolution;
use std::fmt;
use std::str::FromStr;

/// Serveurs d'ingestion RTMP connus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RtmpServer {
    UsWest,
    UsEast,
    Jp,
    Europe,
}

impl RtmpServer {
    pub const ALL: [RtmpServer; 4] = [
        RtmpServer::UsWest,
        RtmpServer::UsEast,
        RtmpServer::Jp,
        RtmpServer::Europe,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RtmpServer::UsWest => "us-west",
            RtmpServer::UsEast => "us-east",
            RtmpServer::Jp => "jp",
            RtmpServer::Europe => "europe",
        }
    }
}

impl fmt::Display for RtmpServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RtmpServer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RtmpServer::ALL
            .into_iter()
            .find(|server| server.as_str() == s)
            .ok_or_else(|| {
                let known: Vec<_> = RtmpServer::ALL.iter().map(|s| s.as_str()).collect();
                format!("RTMP server {} is not one of {}", s, known.join(", "))
            })
    }
}

/// Entrée DJ du ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub name: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "empty_as_none"
    )]
    pub logo_path: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "empty_as_none"
    )]
    pub recording_path: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "server_or_none"
    )]
    pub rtmp_server: Option<RtmpServer>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "empty_as_none"
    )]
    pub stream_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_live_resolution: Option<Resolution>,
}

impl RosterEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            logo_path: None,
            recording_path: None,
            rtmp_server: None,
            stream_key: None,
            last_live_resolution: None,
        }
    }
}

/// Entrée promo du ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromoEntry {
    pub name: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "empty_as_none"
    )]
    pub path: Option<String>,
}

/// Document ledger complet
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    #[serde(default)]
    pub djs: Vec<RosterEntry>,
    #[serde(default)]
    pub promos: Vec<PromoEntry>,
}

impl Ledger {
    pub fn dj(&self, name: &str) -> Option<&RosterEntry> {
        self.djs.iter().find(|dj| dj.name == name)
    }

    pub fn promo(&self, name: &str) -> Option<&PromoEntry> {
        self.promos.iter().find(|promo| promo.name == name)
    }

    pub fn has_dj(&self, name: &str) -> bool {
        self.dj(name).is_some()
    }

    pub fn has_promo(&self, name: &str) -> bool {
        self.promo(name).is_some()
    }
}

/// Attributs d'un nouveau DJ
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterAttrs {
    pub name: String,
    pub logo_path: Option<String>,
    pub recording_path: Option<String>,
    pub rtmp_server: Option<String>,
    pub stream_key: Option<String>,
}

impl RosterAttrs {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Modification partielle d'un DJ ; `None` (ou `""`) laisse le champ intact
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RosterPatch {
    pub name: Option<String>,
    pub logo_path: Option<String>,
    pub recording_path: Option<String>,
    pub rtmp_server: Option<String>,
    pub stream_key: Option<String>,
    pub last_live_resolution: Option<Resolution>,
}

/// Attributs d'une nouvelle promo
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromoAttrs {
    pub name: String,
    pub path: Option<String>,
}

impl PromoAttrs {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
        }
    }
}

/// Modification partielle d'une promo
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromoPatch {
    pub name: Option<String>,
    pub path: Option<String>,
}

/// Une chaîne vide compte comme absente
pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

fn server_or_none<'de, D>(deserializer: D) -> Result<Option<RtmpServer>, D::Error>
where
    D: Deserializer<'de>,
{
    // Les anciens ledgers acceptaient n'importe quel serveur : une valeur
    // inconnue est ignorée à la lecture, seule l'écriture la refuse.
    match empty_as_none(deserializer)? {
        Some(raw) => match raw.parse() {
            Ok(server) => Ok(Some(server)),
            Err(reason) => {
                tracing::warn!(
                    server = %raw,
                    %reason,
                    "Ignoring unknown RTMP server in ledger"
                );
                Ok(None)
            }
        },
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_names() {
        assert_eq!("us-west".parse::<RtmpServer>().unwrap(), RtmpServer::UsWest);
        assert_eq!("jp".parse::<RtmpServer>().unwrap(), RtmpServer::Jp);
        assert!("mars".parse::<RtmpServer>().is_err());
        assert_eq!(
            serde_json::to_string(&RtmpServer::UsEast).unwrap(),
            "\"us-east\""
        );
    }

    #[test]
    fn test_legacy_empty_strings_read_as_absent() {
        let json = r#"{
            "djs": [{
                "name": "Nova",
                "logo_path": "",
                "recording_path": "/data/rec/nova.mp4",
                "rtmp_server": "",
                "stream_key": "",
                "last_live_resolution": ""
            }],
            "promos": [{"name": "Teaser", "path": ""}]
        }"#;
        let ledger: Ledger = serde_json::from_str(json).unwrap();

        let nova = ledger.dj("Nova").unwrap();
        assert_eq!(nova.logo_path, None);
        assert_eq!(nova.recording_path.as_deref(), Some("/data/rec/nova.mp4"));
        assert_eq!(nova.rtmp_server, None);
        assert_eq!(nova.stream_key, None);
        assert_eq!(ledger.promo("Teaser").unwrap().path, None);
    }

    #[test]
    fn test_unknown_server_reads_as_absent() {
        let json = r#"{"djs": [{"name": "Old", "rtmp_server": "asia", "stream_key": "k"}]}"#;
        let ledger: Ledger = serde_json::from_str(json).unwrap();

        let old = ledger.dj("Old").unwrap();
        assert_eq!(old.rtmp_server, None);
        assert_eq!(old.stream_key.as_deref(), Some("k"));
    }

    #[test]
    fn test_absent_fields_are_not_written() {
        let ledger = Ledger {
            djs: vec![RosterEntry::new("Nova")],
            promos: vec![],
        };
        assert_eq!(
            serde_json::to_string(&ledger).unwrap(),
            r#"{"djs":[{"name":"Nova"}],"promos":[]}"#
        );
    }

    #[test]
    fn test_missing_sections_default_to_empty() {
        let ledger: Ledger = serde_json::from_str("{}").unwrap();
        assert!(ledger.djs.is_empty());
        assert!(ledger.promos.is_empty());
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        let ledger = Ledger {
            djs: vec![RosterEntry::new("Nova")],
            promos: vec![],
        };
        assert!(ledger.has_dj("Nova"));
        assert!(!ledger.has_dj("nova"));
    }
}
