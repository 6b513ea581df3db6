//! Asset path rewriting.
//!
//! The generator records asset paths relative to the staged guide directory
//! (`media/video/a.mp4`). The store records them under the namespace the
//! consuming app installs guides into: `<guides-root>/<guide>/<relative>`.

use std::path::{Path, PathBuf};

/// Target namespace for one guide's assets
#[derive(Debug, Clone)]
pub struct AssetNamespace {
    root: String,
    guide_name: String,
}

impl AssetNamespace {
    pub fn new(root: impl Into<String>, guide_name: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            guide_name: guide_name.into(),
        }
    }

    /// Rewrite a generator-relative path into the namespace
    pub fn rewrite(&self, relative: &str) -> String {
        let relative = normalize_relative(relative);
        let root = self.root.trim_end_matches('/');
        if root.is_empty() {
            format!("{}/{}", self.guide_name, relative)
        } else {
            format!("{}/{}/{}", root, self.guide_name, relative)
        }
    }
}

/// Relative path of the cover frame extracted for a video: same stem, `.png`
pub fn cover_path_for(video_source: &str) -> String {
    let normalized = normalize_relative(video_source);
    Path::new(&normalized)
        .with_extension("png")
        .to_string_lossy()
        .replace('\\', "/")
}

/// Local path of a generator-relative asset inside the staged guide directory
pub fn local_path(guide_dir: &Path, relative: &str) -> PathBuf {
    guide_dir.join(normalize_relative(relative))
}

fn normalize_relative(relative: &str) -> String {
    let unified = relative.replace('\\', "/");
    let mut trimmed = unified.as_str();
    while let Some(rest) = trimmed.strip_prefix("./") {
        trimmed = rest;
    }
    trimmed.trim_start_matches('/').to_string()
}
