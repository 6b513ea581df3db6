//! Configuration for guidepack.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (GUIDEPACK_GUIDES_ROOT, GUIDEPACK_FFPROBE, GUIDEPACK_FFMPEG)
//! 2. Config file (.guidepack/config.yaml)
//! 3. Defaults
//!
//! Config file discovery:
//! - Searches current directory and parents for .guidepack/config.yaml
//! - Falls back to <user config dir>/guidepack/config.yaml

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::domain::UnknownBlockPolicy;
use crate::media::FfmpegProbe;
use crate::pipeline::{PackOptions, DEFAULT_GUIDES_ROOT};

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

pub const ENV_GUIDES_ROOT: &str = "GUIDEPACK_GUIDES_ROOT";
pub const ENV_FFPROBE: &str = "GUIDEPACK_FFPROBE";
pub const ENV_FFMPEG: &str = "GUIDEPACK_FFMPEG";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub media: Option<MediaConfig>,
    #[serde(default)]
    pub normalize: Option<NormalizeConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// Root of the asset namespace written into the store
    pub guides_root: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
    pub ffprobe: Option<String>,
    pub ffmpeg: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NormalizeConfig {
    pub unknown_blocks: Option<UnknownBlockPolicy>,
}

/// Resolved configuration
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub guides_root: String,
    pub ffprobe: String,
    pub ffmpeg: String,
    pub unknown_blocks: UnknownBlockPolicy,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            guides_root: DEFAULT_GUIDES_ROOT.to_string(),
            ffprobe: "ffprobe".to_string(),
            ffmpeg: "ffmpeg".to_string(),
            unknown_blocks: UnknownBlockPolicy::default(),
            config_file: None,
        }
    }
}

impl ResolvedConfig {
    /// Media probe using the configured binaries
    pub fn probe(&self) -> FfmpegProbe {
        FfmpegProbe::with_binary_paths(self.ffprobe.clone(), self.ffmpeg.clone())
    }

    /// Pipeline options seeded from this configuration
    pub fn pack_options(&self) -> PackOptions {
        PackOptions {
            guides_root: self.guides_root.clone(),
            unknown_blocks: self.unknown_blocks,
            ..PackOptions::default()
        }
    }

    fn apply_file(&mut self, config: ConfigFile) {
        if let Some(root) = config.paths.guides_root {
            self.guides_root = root;
        }
        if let Some(media) = config.media {
            if let Some(ffprobe) = media.ffprobe {
                self.ffprobe = ffprobe;
            }
            if let Some(ffmpeg) = media.ffmpeg {
                self.ffmpeg = ffmpeg;
            }
        }
        if let Some(policy) = config.normalize.and_then(|n| n.unknown_blocks) {
            self.unknown_blocks = policy;
        }
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(root) = var(ENV_GUIDES_ROOT) {
            self.guides_root = root;
        }
        if let Some(ffprobe) = var(ENV_FFPROBE) {
            self.ffprobe = ffprobe;
        }
        if let Some(ffmpeg) = var(ENV_FFMPEG) {
            self.ffmpeg = ffmpeg;
        }
    }
}

/// Find config file by searching `start` and its parents
fn find_config_file_from(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let config_path = current.join(".guidepack").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Find config file from the current directory, then the user config dir
fn find_config_file() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok();
    cwd.and_then(|dir| find_config_file_from(&dir)).or_else(|| {
        dirs::config_dir()
            .map(|dir| dir.join("guidepack").join("config.yaml"))
            .filter(|path| path.exists())
    })
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve configuration from an optional file and an env lookup
fn resolve(
    config_file: Option<PathBuf>,
    var: impl Fn(&str) -> Option<String>,
) -> Result<ResolvedConfig> {
    let mut resolved = ResolvedConfig::default();

    if let Some(ref path) = config_file {
        resolved.apply_file(load_config_file(path)?);
    }
    resolved.apply_env(var);
    resolved.config_file = config_file;

    Ok(resolved)
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    resolve(find_config_file(), |key| std::env::var(key).ok())
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| format!("{:#}", e)));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (bypasses the cache)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}
