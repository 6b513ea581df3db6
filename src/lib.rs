//! guidepack - Guide content packager
//!
//! Turns a generated guide (categories, articles made of ordered content
//! blocks, bookmarks) into a normalized SQLite store with a full-text
//! search index.
//!
//! # Pipeline
//!
//! - Article stubs are stored first and every article gets a dense id
//! - Block content is normalized into per-type tables plus an order table,
//!   with `[ref=<name>]` markers rewritten to article ids
//! - The raw content column is dropped once every article is normalized
//! - The search index is built from the normalized tables
//! - Bookmarks are resolved against article names last
//!
//! # Modules
//!
//! - `domain`: Input tree, blocks, article lifecycle
//! - `store`: SQLite schema and primitives
//! - `pipeline`: Stage orchestration
//! - `media`: ffprobe/ffmpeg inspection
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Pack a staged guide directory
//! guidepack pack staging/lisbon
//!
//! # Query the result
//! guidepack search staging/lisbon/guide.db "harbour"
//! ```

pub mod assets;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod media;
pub mod pipeline;
pub mod source;
pub mod store;

// Re-export main types at crate root for convenience
pub use domain::{ArticleId, ArticleIndex, Block, BlockKind, BlockRow, UnknownBlockPolicy};
pub use error::{PackError, Result};
pub use media::{FfmpegProbe, MediaError, MediaInfo, MediaProbe};
pub use pipeline::{PackOptions, PackReport, Packager};
pub use store::ContentStore;
