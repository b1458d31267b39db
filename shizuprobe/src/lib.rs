//! Media probing abstraction shared between Shizu crates.
//!
//! This crate provides a small async trait, [`MediaProbe`], used by the export
//! pipeline to read the frame dimensions of recordings and promo clips.
//!
//! # Features
//!
//! - **Async API**: probes run concurrently during an export
//! - **Three outcomes**: a `[width, height]` pair, an empty pair when the file has
//!   no video stream, or a [`ProbeError`]
//! - **Implementations**: [`FfprobeProbe`] shells out to `ffprobe`, [`MemoryProbe`]
//!   answers from a fixed table
//!
//! # Examples
//!
//! ```rust
//! use shizuprobe::{MediaProbe, MemoryProbe, Resolution};
//! use std::path::Path;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let probe = MemoryProbe::new().with_resolution("/rec/set.mkv", Resolution::new(1920, 1080));
//!
//! let resolution = probe.probe(Path::new("/rec/set.mkv")).await.unwrap();
//! assert_eq!(resolution, Resolution::new(1920, 1080));
//! assert_eq!(probe.calls().len(), 1);
//! # });
//! ```

mod ffprobe;
mod memory;
mod resolution;

pub use async_trait::async_trait;
pub use ffprobe::{FfprobeProbe, resolution_from_ffprobe_json};
pub use memory::MemoryProbe;
pub use resolution::Resolution;

use std::path::Path;

/// Errors that can occur while probing a media file.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// The probe binary could not be started.
    #[error("probe binary not available: {0}")]
    NotFound(std::io::Error),

    /// The probe rejected the file (missing, unreadable, not a media file).
    #[error("Invalid file selected for {path}.")]
    InvalidFile { path: String, detail: String },

    /// The probe output could not be parsed.
    #[error("failed to parse probe output: {0}")]
    Parse(String),

    /// The probe did not answer within the configured delay.
    #[error("probe timed out after {0:?}")]
    TimedOut(std::time::Duration),
}

/// Trait implemented by media probes.
///
/// Implementations must return:
/// - `Ok(Resolution::Frame { .. })` for the first video stream found
/// - `Ok(Resolution::Empty)` when the file has no video stream
/// - `Err(ProbeError)` when the file cannot be inspected
///
/// All implementations must be `Send + Sync` so that probes can be dispatched
/// concurrently from async contexts.
#[async_trait]
pub trait MediaProbe: Send + Sync {
    async fn probe(&self, path: &Path) -> Result<Resolution, ProbeError>;
}
