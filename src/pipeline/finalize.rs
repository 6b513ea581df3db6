//! Schema finalization.
//!
//! Drops the raw content column from `articles`. After this the block tables
//! are the only copy of article content.

use tracing::info;

use crate::error::Result;
use crate::store::ContentStore;

use super::normalize::{NormalizeStats, NormalizedArticles};

/// Proof that the raw content column is gone. Required to build the search
/// index and load bookmarks.
#[derive(Debug)]
pub struct Finalized {
    stats: NormalizeStats,
}

impl Finalized {
    pub fn stats(&self) -> NormalizeStats {
        self.stats
    }
}

/// Drop the raw content column, consuming the normalization proof.
///
/// The store refuses independently if any article still holds raw content.
pub fn finalize(store: &mut ContentStore, normalized: NormalizedArticles) -> Result<Finalized> {
    store.drop_raw_content_column()?;
    info!("Raw article content dropped");
    Ok(Finalized {
        stats: normalized.stats(),
    })
}
