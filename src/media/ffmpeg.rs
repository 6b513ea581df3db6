//! ffprobe/ffmpeg media backend.
//!
//! Subprocess mode: `ffprobe` reports format and stream metadata as JSON,
//! `ffmpeg` writes a single frame for video covers.

use std::path::Path;
use std::process::{Command, Output, Stdio};

use serde::Deserialize;

use super::{MediaError, MediaInfo, MediaProbe};

/// Media probe backed by the ffmpeg command-line tools
#[derive(Debug, Clone)]
pub struct FfmpegProbe {
    ffprobe_path: String,
    ffmpeg_path: String,
}

impl Default for FfmpegProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegProbe {
    /// Use `ffprobe` and `ffmpeg` from `PATH`
    pub fn new() -> Self {
        Self::with_binary_paths("ffprobe", "ffmpeg")
    }

    /// Use custom binary paths
    pub fn with_binary_paths(ffprobe: impl Into<String>, ffmpeg: impl Into<String>) -> Self {
        Self {
            ffprobe_path: ffprobe.into(),
            ffmpeg_path: ffmpeg.into(),
        }
    }

    fn run(tool: &str, command: &mut Command) -> Result<Output, MediaError> {
        let output = command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|source| MediaError::Spawn {
                tool: tool.to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(MediaError::Failed {
                tool: tool.to_string(),
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(output)
    }
}

impl MediaProbe for FfmpegProbe {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    fn probe(&self, asset: &Path) -> Result<MediaInfo, MediaError> {
        let output = Self::run(
            &self.ffprobe_path,
            Command::new(&self.ffprobe_path)
                .args(["-v", "error", "-print_format", "json", "-show_format", "-show_streams"])
                .arg(asset),
        )?;

        parse_probe_output(&String::from_utf8_lossy(&output.stdout))
    }

    fn extract_frame(&self, video: &Path, out: &Path) -> Result<(), MediaError> {
        Self::run(
            &self.ffmpeg_path,
            Command::new(&self.ffmpeg_path)
                .args(["-nostdin", "-loglevel", "error", "-i"])
                .arg(video)
                .args(["-vframes", "1"])
                .arg(out),
        )?;

        if !out.exists() {
            return Err(MediaError::MissingOutput(out.display().to_string()));
        }
        Ok(())
    }
}

/// ffprobe JSON output structure
#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    format: ProbeFormat,
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    display_aspect_ratio: Option<String>,
}

/// Extract duration and the first video stream's aspect ratio
pub fn parse_probe_output(json: &str) -> Result<MediaInfo, MediaError> {
    let probe: ProbeOutput = serde_json::from_str(json)?;

    let duration_seconds = probe
        .format
        .duration
        .as_deref()
        .and_then(|d| d.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite())
        .ok_or(MediaError::MissingDuration)?;

    let aspect_ratio = probe
        .streams
        .into_iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .and_then(|s| s.display_aspect_ratio);

    Ok(MediaInfo {
        duration_seconds,
        aspect_ratio,
    })
}
