//! Staged guide directory reader.
//!
//! Layout written by the generator:
//!
//! ```text
//! <guide_dir>/
//!   guide.json          optional manifest
//!   categories.json
//!   articles/*.json     one file per article
//!   bookmarks.json      optional
//! ```

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::domain::{ArticleInput, BookmarkInput, CategoryInput, GuideManifest};
use crate::error::{PackError, Result};

pub const MANIFEST_FILE: &str = "guide.json";
pub const CATEGORIES_FILE: &str = "categories.json";
pub const ARTICLES_DIR: &str = "articles";
pub const BOOKMARKS_FILE: &str = "bookmarks.json";

/// Read access to one staged guide directory
#[derive(Debug, Clone)]
pub struct GuideSource {
    root: PathBuf,
}

impl GuideSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory name, used as the fallback guide name
    pub fn dir_name(&self) -> Option<String> {
        self.root
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
    }

    /// Manifest, or `None` when the guide ships without one
    pub fn manifest(&self) -> Result<Option<GuideManifest>> {
        let path = self.root.join(MANIFEST_FILE);
        if !path.exists() {
            return Ok(None);
        }
        read_json(&path).map(Some)
    }

    pub fn categories(&self) -> Result<Vec<CategoryInput>> {
        read_json(&self.root.join(CATEGORIES_FILE))
    }

    /// Article files in sorted path order
    pub fn article_paths(&self) -> Result<Vec<PathBuf>> {
        let dir = self.root.join(ARTICLES_DIR);
        let pattern = format!(
            "{}/*.json",
            glob::Pattern::escape(&dir.to_string_lossy())
        );

        let mut paths = Vec::new();
        for entry in glob::glob(&pattern)? {
            let path = entry.map_err(|e| {
                let path = e.path().to_path_buf();
                PackError::io(path, e.into())
            })?;
            paths.push(path);
        }
        paths.sort();

        debug!(dir = %dir.display(), count = paths.len(), "Discovered article files");
        Ok(paths)
    }

    pub fn read_article(&self, path: &Path) -> Result<ArticleInput> {
        read_json(path)
    }

    /// Every article, in sorted path order
    pub fn articles(&self) -> Result<Vec<ArticleInput>> {
        self.article_paths()?
            .iter()
            .map(|path| self.read_article(path))
            .collect()
    }

    /// Bookmarks, empty when the file is absent
    pub fn bookmarks(&self) -> Result<Vec<BookmarkInput>> {
        let path = self.root.join(BOOKMARKS_FILE);
        if !path.exists() {
            return Ok(Vec::new());
        }
        read_json(&path)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|e| PackError::io(path, e))?;
    serde_json::from_str(&content).map_err(|source| PackError::Input {
        path: path.to_path_buf(),
        source,
    })
}
