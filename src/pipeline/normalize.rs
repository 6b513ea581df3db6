//! Block normalization.
//!
//! Second phase of the pipeline. Each article's raw content is read once,
//! parsed into closed [`Block`]s and decomposed into per-type rows plus one
//! order row per block. Text goes through the reference resolver, media goes
//! through the probe, and asset paths are rewritten into the namespace.

use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::assets::{cover_path_for, local_path, AssetNamespace};
use crate::domain::{parse_blocks, ArticleIndex, Block, BlockRow, RawArticle, UnknownBlockPolicy};
use crate::error::{PackError, Result};
use crate::media::{ensure_cover_frame, CoverOutcome, MediaInfo, MediaProbe};
use crate::store::ContentStore;

use super::references::ReferenceResolver;

/// Counters collected while normalizing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeStats {
    pub articles: usize,
    pub blocks: usize,
    pub skipped_blocks: usize,
    pub covers_extracted: usize,
}

/// Proof that every article's raw content has been normalized.
///
/// Only [`BlockNormalizer::normalize_all`] creates one, and finalization
/// consumes it.
#[derive(Debug)]
pub struct NormalizedArticles {
    stats: NormalizeStats,
}

impl NormalizedArticles {
    pub fn stats(&self) -> NormalizeStats {
        self.stats
    }
}

/// Decomposes article content into the block tables
pub struct BlockNormalizer<'a, P: MediaProbe + ?Sized> {
    probe: &'a P,
    assets: &'a AssetNamespace,
    guide_dir: &'a Path,
    policy: UnknownBlockPolicy,
}

impl<'a, P: MediaProbe + ?Sized> BlockNormalizer<'a, P> {
    pub fn new(
        probe: &'a P,
        assets: &'a AssetNamespace,
        guide_dir: &'a Path,
        policy: UnknownBlockPolicy,
    ) -> Self {
        Self {
            probe,
            assets,
            guide_dir,
            policy,
        }
    }

    /// Normalize every article of a complete index, in id order
    #[instrument(skip_all, fields(articles = index.len()))]
    pub fn normalize_all(
        &self,
        store: &mut ContentStore,
        index: &ArticleIndex,
    ) -> Result<NormalizedArticles> {
        let resolver = ReferenceResolver::new(index)?;
        let mut stats = NormalizeStats::default();

        for id in index.ids() {
            let raw = store.take_raw_article(*id)?;
            self.normalize_article(store, raw, &resolver, &mut stats)?;
            stats.articles += 1;
        }

        info!(
            articles = stats.articles,
            blocks = stats.blocks,
            skipped = stats.skipped_blocks,
            covers = stats.covers_extracted,
            "Blocks normalized"
        );
        Ok(NormalizedArticles { stats })
    }

    fn normalize_article(
        &self,
        store: &mut ContentStore,
        raw: RawArticle,
        resolver: &ReferenceResolver<'_>,
        stats: &mut NormalizeStats,
    ) -> Result<()> {
        let (stub, content) = raw.into_parts();
        let parsed = parse_blocks(&stub.name, &content, self.policy)?;

        for block_type in &parsed.skipped {
            warn!(article = %stub.name, %block_type, "Skipping block of unknown type");
        }
        stats.skipped_blocks += parsed.skipped.len();

        // dense per article, unknown blocks never reach here
        for (order, block) in parsed.blocks.into_iter().enumerate() {
            let row = self.block_row(block, resolver, stats)?;
            let kind = row.kind();
            let block_id = store.insert_block(&row)?;
            store.insert_block_order(stub.id, block_id, order as i64, kind)?;
            stats.blocks += 1;
        }

        debug!(article = %stub.name, id = %stub.id, "Article normalized");
        Ok(())
    }

    fn block_row(
        &self,
        block: Block,
        resolver: &ReferenceResolver<'_>,
        stats: &mut NormalizeStats,
    ) -> Result<BlockRow> {
        let row = match block {
            Block::Subtitle { text } => BlockRow::Subtitle {
                text: resolver.rewrite(&text),
            },
            Block::Paragraph { text } => BlockRow::Paragraph {
                text: resolver.rewrite(&text),
            },
            Block::Image { source, caption } => BlockRow::Image {
                source: self.assets.rewrite(&source),
                caption: resolver.rewrite_opt(caption),
            },
            Block::Audio { source, caption } => {
                let info = self.probe_asset(&source)?;
                BlockRow::Audio {
                    source: self.assets.rewrite(&source),
                    duration: info.duration_seconds,
                    caption: resolver.rewrite_opt(caption),
                }
            }
            Block::Video { source, caption } => {
                let video = local_path(self.guide_dir, &source);
                let info = self.probe_asset(&source)?;
                let aspect_ratio = info
                    .aspect_ratio
                    .ok_or_else(|| PackError::MissingAspectRatio {
                        asset: video.clone(),
                    })?;

                let cover = cover_path_for(&source);
                let outcome = ensure_cover_frame(self.probe, &video, &local_path(self.guide_dir, &cover))
                    .map_err(|err| PackError::Media {
                        asset: video.clone(),
                        source: err,
                    })?;
                if outcome == CoverOutcome::Extracted {
                    stats.covers_extracted += 1;
                }

                BlockRow::Video {
                    source: self.assets.rewrite(&source),
                    duration: info.duration_seconds,
                    aspect_ratio,
                    cover_source: self.assets.rewrite(&cover),
                    caption: resolver.rewrite_opt(caption),
                }
            }
        };
        Ok(row)
    }

    fn probe_asset(&self, relative: &str) -> Result<MediaInfo> {
        let asset = local_path(self.guide_dir, relative);
        debug!(asset = %asset.display(), probe = self.probe.name(), "Probing media");
        self.probe
            .probe(&asset)
            .map_err(|source| PackError::Media { asset, source })
    }
}
