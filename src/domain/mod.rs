//! Domain types for the guide packager.
//!
//! This module contains the core data structures:
//! - Content: the generator's input tree
//! - Block: content blocks, raw and normalized
//! - Article: identifiers and the raw-to-finalized lifecycle

pub mod article;
pub mod block;
pub mod content;

// Re-export commonly used types
pub use article::{ArticleId, ArticleIndex, ArticleStub, RawArticle};
pub use block::{parse_blocks, Block, BlockKind, BlockRow, ParsedContent, UnknownBlockPolicy};
pub use content::{distinct_tags, ArticleInput, BookmarkInput, CategoryInput, GuideManifest};
