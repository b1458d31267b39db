//! # shizulineup - Ledger des DJs/promos et lineups d'événements
//!
//! Cette crate gère :
//! - Le ledger : roster des DJs et liste des promos (document unique)
//! - Les lineups : ordre de passage, un document par lineup, références par nom
//! - Les cascades : renommer ou supprimer une entrée du ledger met à jour les lineups
//! - L'export : manifeste JSON avec URLs RTMP et résolutions sondées
//!
//! # Architecture
//!
//! - **LineupManager** : point d'entrée central, sérialise les mutations
//! - **DocumentStore** : lecture/écriture de documents entiers (`JsonDocumentStore` sur disque)
//! - **MediaProbe** : sonde média (shizuprobe), `ffprobe` par défaut
//! - **PermittedRoots** : racines autorisées pour logos, enregistrements et exports
//!
//! # Exemple d'utilisation
//!
//! ```no_run
//! use shizulineup::{LineupManager, RosterAttrs};
//!
//! # #[tokio::main]
//! # async fn main() -> shizulineup::Result<()> {
//! // Obtenir le gestionnaire (init automatique avec shizuconfig)
//! let manager = LineupManager::get()?;
//!
//! manager.add_roster(RosterAttrs::named("DJ Nova")).await?;
//! manager.create_lineup("friday").await?;
//! manager.add_dj_to_lineup("friday", "DJ Nova").await?;
//!
//! let summary = manager.export_lineup("friday", "/srv/shizu/export").await?;
//! println!("Manifest written to {}", summary.path.display());
//! # Ok(())
//! # }
//! ```

mod config_ext;
mod error;
mod export;
pub mod ledger;
pub mod lineup;
mod manager;
pub mod store;

// Réexports publics
pub use config_ext::{
    ExportSettings, LineupConfigExt, LineupSettings, Permissions, RootKind,
};
pub use error::{Error, MissingReferences, Result};
pub use export::{
    DjManifestEntry, ExportStage, ExportSummary, Manifest, PromoManifestEntry, stream_url,
};
pub use ledger::{
    Ledger, PromoAttrs, PromoEntry, PromoPatch, RosterAttrs, RosterEntry, RosterPatch, RtmpServer,
};
pub use lineup::reorder::move_entry;
pub use lineup::{Lineup, LineupDj};
pub use manager::{DeleteOutcome, LineupManager};
pub use store::{DocumentId, DocumentStore, JsonDocumentStore};
