//! `ffprobe`-backed [`MediaProbe`] implementation.

use crate::{MediaProbe, ProbeError, Resolution};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};

const DEFAULT_FFPROBE_BINARY: &str = "ffprobe";

/// Top-level ffprobe JSON output (`-print_format json -show_streams`).
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

/// The subset of an ffprobe stream we care about.
#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

/// Probe that runs the `ffprobe` command line tool.
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    binary: PathBuf,
}

impl Default for FfprobeProbe {
    fn default() -> Self {
        Self {
            binary: PathBuf::from(DEFAULT_FFPROBE_BINARY),
        }
    }
}

impl FfprobeProbe {
    /// Uses the given executable instead of `ffprobe` from `PATH`.
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }
}

#[async_trait]
impl MediaProbe for FfprobeProbe {
    async fn probe(&self, path: &Path) -> Result<Resolution, ProbeError> {
        tracing::debug!(
            path = %path.display(),
            binary = %self.binary.display(),
            "Probing media file"
        );

        let output = tokio::process::Command::new(&self.binary)
            .args(["-v", "error", "-print_format", "json", "-show_streams"])
            .arg(path)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(ProbeError::NotFound)?;

        if !output.status.success() {
            let detail = String::from_utf8_lossy(&output.stderr).trim().to_string();
            tracing::warn!(
                path = %path.display(),
                code = ?output.status.code(),
                %detail,
                "ffprobe rejected file"
            );
            return Err(ProbeError::InvalidFile {
                path: path.display().to_string(),
                detail,
            });
        }

        resolution_from_ffprobe_json(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Extracts the first video stream dimensions from ffprobe JSON output.
///
/// Returns [`Resolution::Empty`] when no video stream carries both a width and
/// a height.
pub fn resolution_from_ffprobe_json(stdout: &str) -> Result<Resolution, ProbeError> {
    let parsed: FfprobeOutput =
        serde_json::from_str(stdout).map_err(|e| ProbeError::Parse(e.to_string()))?;

    let resolution = parsed
        .streams
        .iter()
        .find(|stream| stream.codec_type.as_deref() == Some("video"))
        .and_then(|stream| match (stream.width, stream.height) {
            (Some(width), Some(height)) => Some(Resolution::new(width, height)),
            _ => None,
        })
        .unwrap_or(Resolution::Empty);

    Ok(resolution)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_video_stream_wins() {
        let json = r#"{
            "streams": [
                {"index": 0, "codec_type": "audio", "sample_rate": "48000"},
                {"index": 1, "codec_type": "video", "width": 1920, "height": 1080},
                {"index": 2, "codec_type": "video", "width": 640, "height": 360}
            ]
        }"#;
        assert_eq!(
            resolution_from_ffprobe_json(json).unwrap(),
            Resolution::new(1920, 1080)
        );
    }

    #[test]
    fn test_audio_only_is_empty() {
        let json = r#"{"streams": [{"codec_type": "audio"}]}"#;
        assert_eq!(resolution_from_ffprobe_json(json).unwrap(), Resolution::Empty);
        assert_eq!(resolution_from_ffprobe_json("{}").unwrap(), Resolution::Empty);
    }

    #[test]
    fn test_garbage_is_parse_error() {
        assert!(matches!(
            resolution_from_ffprobe_json("not json"),
            Err(ProbeError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_binary_is_not_found() {
        let probe = FfprobeProbe::with_binary("/nonexistent/shizu-ffprobe");
        let err = probe.probe(Path::new("/tmp/a.mkv")).await.unwrap_err();
        assert!(matches!(err, ProbeError::NotFound(_)));
    }
}
