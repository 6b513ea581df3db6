//! Media inspection for audio and video blocks.
//!
//! The normalizer only depends on the [`MediaProbe`] trait; the shipped
//! implementation shells out to ffprobe/ffmpeg.

pub mod ffmpeg;

use std::path::Path;

use thiserror::Error;

pub use ffmpeg::FfmpegProbe;

/// Errors raised while inspecting media. All of them are fatal to a run.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Failed to run {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} exited with code {code}: {stderr}")]
    Failed {
        tool: String,
        code: i32,
        stderr: String,
    },

    #[error("Failed to parse probe output: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Probe output has no usable duration")]
    MissingDuration,

    #[error("Cover frame was not written to {0}")]
    MissingOutput(String),
}

/// Metadata extracted from a media asset
#[derive(Debug, Clone, PartialEq)]
pub struct MediaInfo {
    /// Duration in seconds
    pub duration_seconds: f64,

    /// Display aspect ratio of the first video stream (e.g. "16:9")
    pub aspect_ratio: Option<String>,
}

/// Trait for media inspection backends
pub trait MediaProbe {
    /// Human-readable backend name
    fn name(&self) -> &str;

    /// Inspect an asset for duration and aspect ratio
    fn probe(&self, asset: &Path) -> Result<MediaInfo, MediaError>;

    /// Write a single representative frame of `video` to `out`
    fn extract_frame(&self, video: &Path, out: &Path) -> Result<(), MediaError>;
}

impl<P: MediaProbe + ?Sized> MediaProbe for &P {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn probe(&self, asset: &Path) -> Result<MediaInfo, MediaError> {
        (**self).probe(asset)
    }

    fn extract_frame(&self, video: &Path, out: &Path) -> Result<(), MediaError> {
        (**self).extract_frame(video, out)
    }
}

/// Outcome of [`ensure_cover_frame`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverOutcome {
    /// A frame was extracted during this call
    Extracted,

    /// The cover already existed; nothing was run
    AlreadyPresent,
}

/// Extract a cover frame unless `out` already exists
pub fn ensure_cover_frame<P: MediaProbe + ?Sized>(
    probe: &P,
    video: &Path,
    out: &Path,
) -> Result<CoverOutcome, MediaError> {
    if out.exists() {
        return Ok(CoverOutcome::AlreadyPresent);
    }

    probe.extract_frame(video, out)?;
    Ok(CoverOutcome::Extracted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tempfile::TempDir;

    struct CountingProbe {
        extractions: Cell<usize>,
    }

    impl MediaProbe for CountingProbe {
        fn name(&self) -> &str {
            "counting"
        }

        fn probe(&self, _asset: &Path) -> Result<MediaInfo, MediaError> {
            Ok(MediaInfo {
                duration_seconds: 1.0,
                aspect_ratio: None,
            })
        }

        fn extract_frame(&self, _video: &Path, out: &Path) -> Result<(), MediaError> {
            self.extractions.set(self.extractions.get() + 1);
            std::fs::write(out, b"png").map_err(|source| MediaError::Spawn {
                tool: "test".to_string(),
                source,
            })
        }
    }

    #[test]
    fn test_cover_extraction_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let video = temp.path().join("clip.mp4");
        let cover = temp.path().join("clip.png");
        let probe = CountingProbe {
            extractions: Cell::new(0),
        };

        assert_eq!(
            ensure_cover_frame(&probe, &video, &cover).unwrap(),
            CoverOutcome::Extracted
        );
        assert_eq!(
            ensure_cover_frame(&probe, &video, &cover).unwrap(),
            CoverOutcome::AlreadyPresent
        );
        assert_eq!(probe.extractions.get(), 1);
    }

    #[test]
    fn test_existing_cover_skips_extraction() {
        let temp = TempDir::new().unwrap();
        let cover = temp.path().join("clip.png");
        std::fs::write(&cover, b"png").unwrap();
        let probe = CountingProbe {
            extractions: Cell::new(0),
        };

        let outcome = ensure_cover_frame(&probe, &temp.path().join("clip.mp4"), &cover).unwrap();
        assert_eq!(outcome, CoverOutcome::AlreadyPresent);
        assert_eq!(probe.extractions.get(), 0);
    }
}
