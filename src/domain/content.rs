//! Input content tree written by the guide generator.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Guide manifest (`guide.json`)
///
/// Field names accept both the generator's `guide_`-prefixed keys and the
/// short forms.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GuideManifest {
    #[serde(alias = "guide_name")]
    pub name: Option<String>,

    #[serde(default, alias = "guide_format_version")]
    pub format_version: Option<String>,

    #[serde(default, alias = "guide_icon")]
    pub icon: Option<String>,

    #[serde(default, alias = "guide_title")]
    pub title: Option<String>,

    #[serde(default, alias = "guide_description")]
    pub description: Option<String>,

    /// `(language name, language code)`
    #[serde(default, alias = "guide_lang")]
    pub language: Option<(String, String)>,

    #[serde(default, alias = "guide_from_place")]
    pub from_place: Option<String>,

    #[serde(default, alias = "guide_to_place")]
    pub to_place: Option<String>,

    /// Presentation order of articles as `(name, title)` pairs
    #[serde(default, alias = "guide_content")]
    pub content: Vec<(String, String)>,
}

/// Entry of `categories.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryInput {
    pub name: String,

    #[serde(default)]
    pub icon: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,
}

/// One `articles/<name>.json` file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleInput {
    pub name: String,

    #[serde(default)]
    pub icon: Option<String>,

    pub title: String,

    pub synopsis: String,

    #[serde(default)]
    pub tags: Vec<String>,

    /// Kept unparsed until normalization
    #[serde(default)]
    pub content: Vec<Value>,
}

/// Entry of `bookmarks.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookmarkInput {
    pub article_name: String,

    #[serde(default)]
    pub article_title: Option<String>,

    pub created_at: String,
}

/// Names in `tags` with duplicates removed, first occurrence wins
pub fn distinct_tags(tags: &[String]) -> Vec<&str> {
    let mut seen = std::collections::HashSet::new();
    tags.iter()
        .map(String::as_str)
        .filter(|tag| seen.insert(*tag))
        .collect()
}
