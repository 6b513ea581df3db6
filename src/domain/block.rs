//! Article content blocks.
//!
//! `Block` is what the generator writes; `BlockRow` is what lands in the
//! per-type tables once references are resolved and media is probed.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{PackError, Result};

/// A content block as it appears in an article's raw content list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Subtitle {
        text: String,
    },
    Paragraph {
        text: String,
    },
    Image {
        source: String,
        #[serde(default)]
        caption: Option<String>,
    },
    Audio {
        source: String,
        #[serde(default)]
        caption: Option<String>,
    },
    Video {
        source: String,
        #[serde(default)]
        caption: Option<String>,
    },
}

impl Block {
    pub fn kind(&self) -> BlockKind {
        match self {
            Block::Subtitle { .. } => BlockKind::Subtitle,
            Block::Paragraph { .. } => BlockKind::Paragraph,
            Block::Image { .. } => BlockKind::Image,
            Block::Audio { .. } => BlockKind::Audio,
            Block::Video { .. } => BlockKind::Video,
        }
    }
}

/// Block discriminator, stored as `block_type` in the order and search tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Subtitle,
    Paragraph,
    Image,
    Audio,
    Video,
}

impl BlockKind {
    pub const ALL: [BlockKind; 5] = [
        BlockKind::Subtitle,
        BlockKind::Paragraph,
        BlockKind::Image,
        BlockKind::Audio,
        BlockKind::Video,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Subtitle => "subtitle",
            BlockKind::Paragraph => "paragraph",
            BlockKind::Image => "image",
            BlockKind::Audio => "audio",
            BlockKind::Video => "video",
        }
    }

    /// Name of the per-type table holding rows of this kind
    pub fn table(&self) -> &'static str {
        match self {
            BlockKind::Subtitle => "subtitle_blocks",
            BlockKind::Paragraph => "paragraph_blocks",
            BlockKind::Image => "image_blocks",
            BlockKind::Audio => "audio_blocks",
            BlockKind::Video => "video_blocks",
        }
    }

    /// Column searched by the full-text index
    pub fn text_column(&self) -> &'static str {
        match self {
            BlockKind::Subtitle => "subtitle_text",
            BlockKind::Paragraph => "paragraph_text",
            BlockKind::Image | BlockKind::Audio | BlockKind::Video => "caption_text",
        }
    }
}

impl std::fmt::Display for BlockKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BlockKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        BlockKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// A normalized block payload, ready for its per-type table
#[derive(Debug, Clone, PartialEq)]
pub enum BlockRow {
    Subtitle {
        text: String,
    },
    Paragraph {
        text: String,
    },
    Image {
        source: String,
        caption: Option<String>,
    },
    Audio {
        source: String,
        duration: f64,
        caption: Option<String>,
    },
    Video {
        source: String,
        duration: f64,
        aspect_ratio: String,
        cover_source: String,
        caption: Option<String>,
    },
}

impl BlockRow {
    pub fn kind(&self) -> BlockKind {
        match self {
            BlockRow::Subtitle { .. } => BlockKind::Subtitle,
            BlockRow::Paragraph { .. } => BlockKind::Paragraph,
            BlockRow::Image { .. } => BlockKind::Image,
            BlockRow::Audio { .. } => BlockKind::Audio,
            BlockRow::Video { .. } => BlockKind::Video,
        }
    }
}

/// What to do with a block whose `type` is not one of the five known kinds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownBlockPolicy {
    /// Drop the block; it gets no order slot
    #[default]
    Skip,

    /// Abort the run
    Reject,
}

/// Result of parsing one article's raw content list
#[derive(Debug, Default)]
pub struct ParsedContent {
    pub blocks: Vec<Block>,

    /// `type` values of blocks dropped under [`UnknownBlockPolicy::Skip`]
    pub skipped: Vec<String>,
}

/// Parse a raw content list into closed `Block`s.
///
/// Unknown discriminators are handled by `policy`; a known discriminator with
/// malformed fields is always an error.
pub fn parse_blocks(article: &str, raw: &[Value], policy: UnknownBlockPolicy) -> Result<ParsedContent> {
    let mut parsed = ParsedContent::default();

    for (index, value) in raw.iter().enumerate() {
        let block_type = value
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default();

        if block_type.parse::<BlockKind>().is_err() {
            match policy {
                UnknownBlockPolicy::Skip => {
                    parsed.skipped.push(block_type.to_string());
                    continue;
                }
                UnknownBlockPolicy::Reject => {
                    return Err(PackError::UnknownBlock {
                        article: article.to_string(),
                        block_type: block_type.to_string(),
                    });
                }
            }
        }

        let block = Block::deserialize(value).map_err(|source| PackError::MalformedBlock {
            article: article.to_string(),
            index,
            source,
        })?;
        parsed.blocks.push(block);
    }

    Ok(parsed)
}
