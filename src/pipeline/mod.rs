//! Packaging pipeline.
//!
//! Stages run strictly in this order, all inside one store transaction:
//!
//! 1. categories, then article stubs (assigns ids, yields the `ArticleIndex`)
//! 2. block normalization (consumes each article's raw content once)
//! 3. finalization (drops the raw content column)
//! 4. search index
//! 5. bookmarks
//!
//! The store is written to a staging file in the guide directory and only
//! persisted to the output path after the last stage commits. Any failure
//! removes the staging file, so no partial store is ever left behind.

pub mod bookmarks;
pub mod finalize;
pub mod ingest;
pub mod normalize;
pub mod references;
pub mod search;

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::Serialize;
use tracing::field::{display, Empty};
use tracing::{info, instrument, warn, Span};
use uuid::Uuid;

use crate::assets::AssetNamespace;
use crate::domain::{ArticleIndex, GuideManifest, UnknownBlockPolicy};
use crate::error::{PackError, Result};
use crate::media::MediaProbe;
use crate::source::GuideSource;
use crate::store::ContentStore;

use normalize::{BlockNormalizer, NormalizeStats};

/// Default output file name inside the guide directory
pub const DEFAULT_OUTPUT: &str = "guide.db";

/// Lock file held for the duration of a run
pub const LOCK_FILE: &str = ".guidepack.lock";

/// Default asset namespace root
pub const DEFAULT_GUIDES_ROOT: &str = "guides";

/// Options for a single packaging run
#[derive(Debug, Clone)]
pub struct PackOptions {
    /// Overrides the manifest and directory name
    pub guide_name: Option<String>,

    pub guides_root: String,

    /// Defaults to `<guide_dir>/guide.db`
    pub output: Option<PathBuf>,

    pub unknown_blocks: UnknownBlockPolicy,
}

impl Default for PackOptions {
    fn default() -> Self {
        Self {
            guide_name: None,
            guides_root: DEFAULT_GUIDES_ROOT.to_string(),
            output: None,
            unknown_blocks: UnknownBlockPolicy::default(),
        }
    }
}

/// Summary of a successful run
#[derive(Debug, Clone, Serialize)]
pub struct PackReport {
    pub run_id: Uuid,
    pub guide_name: String,
    pub output: PathBuf,
    pub categories: usize,
    pub tags: i64,
    pub articles: usize,
    pub blocks: usize,
    pub skipped_blocks: usize,
    pub covers_extracted: usize,
    pub bookmarks: usize,
    pub search_rows: usize,
}

struct StageCounts {
    categories: usize,
    tags: i64,
    stats: NormalizeStats,
    bookmarks: usize,
    search_rows: usize,
}

/// Runs the pipeline for one guide directory
pub struct Packager<P: MediaProbe> {
    probe: P,
    options: PackOptions,
}

impl<P: MediaProbe> Packager<P> {
    pub fn new(probe: P, options: PackOptions) -> Self {
        Self { probe, options }
    }

    /// Pack `guide_dir` into a finalized store
    #[instrument(skip_all, fields(run_id = Empty, guide_dir = %guide_dir.display()))]
    pub fn pack(&self, guide_dir: &Path) -> Result<PackReport> {
        let run_id = Uuid::new_v4();
        Span::current().record("run_id", display(run_id));
        let output = self
            .options
            .output
            .clone()
            .unwrap_or_else(|| guide_dir.join(DEFAULT_OUTPUT));

        if output.exists() {
            return Err(PackError::OutputExists(output));
        }

        let _lock = acquire_lock(guide_dir)?;

        let source = GuideSource::new(guide_dir);
        let manifest = source.manifest()?;
        let guide_name = self.resolve_guide_name(&source, manifest.as_ref());
        info!(guide = %guide_name, output = %output.display(), "Starting pack");

        let staging = tempfile::Builder::new()
            .prefix(".guidepack-")
            .suffix(".db")
            .tempfile_in(guide_dir)
            .map_err(|e| PackError::io(guide_dir, e))?;

        let counts = {
            let mut store = ContentStore::open(staging.path())?;
            store.begin()?;
            match self.run_stages(&mut store, &source, manifest.as_ref(), &guide_name) {
                Ok(counts) => {
                    store.commit()?;
                    counts
                }
                Err(e) => {
                    if let Err(rollback_err) = store.rollback() {
                        warn!(error = %rollback_err, "Rollback failed");
                    }
                    warn!(error = %e, "Pack failed, discarding staged store");
                    return Err(e);
                }
            }
        };

        staging
            .persist_noclobber(&output)
            .map_err(|e| match e.error.kind() {
                std::io::ErrorKind::AlreadyExists => PackError::OutputExists(output.clone()),
                _ => PackError::io(&output, e.error),
            })?;

        let report = PackReport {
            run_id,
            guide_name,
            output,
            categories: counts.categories,
            tags: counts.tags,
            articles: counts.stats.articles,
            blocks: counts.stats.blocks,
            skipped_blocks: counts.stats.skipped_blocks,
            covers_extracted: counts.stats.covers_extracted,
            bookmarks: counts.bookmarks,
            search_rows: counts.search_rows,
        };
        info!(
            articles = report.articles,
            blocks = report.blocks,
            search_rows = report.search_rows,
            "Pack completed"
        );
        Ok(report)
    }

    fn resolve_guide_name(&self, source: &GuideSource, manifest: Option<&GuideManifest>) -> String {
        self.options
            .guide_name
            .clone()
            .or_else(|| manifest.and_then(|m| m.name.clone()))
            .or_else(|| source.dir_name())
            .unwrap_or_else(|| "guide".to_string())
    }

    fn run_stages(
        &self,
        store: &mut ContentStore,
        source: &GuideSource,
        manifest: Option<&GuideManifest>,
        guide_name: &str,
    ) -> Result<StageCounts> {
        let assets = AssetNamespace::new(self.options.guides_root.clone(), guide_name);

        let categories = ingest::ingest_categories(store, &source.categories()?, &assets)?;
        let index = ingest::ingest_articles(store, source.articles()?, &assets)?;
        if let Some(manifest) = manifest {
            check_manifest(manifest, &index);
        }

        let normalizer = BlockNormalizer::new(
            &self.probe,
            &assets,
            source.root(),
            self.options.unknown_blocks,
        );
        let normalized = normalizer.normalize_all(store, &index)?;
        let finalized = finalize::finalize(store, normalized)?;

        let search_rows = search::build_search_index(store, &finalized)?;
        let bookmarks = bookmarks::load_bookmarks(store, &source.bookmarks()?, &finalized)?;

        Ok(StageCounts {
            categories,
            tags: store.count("tags")?,
            stats: finalized.stats(),
            bookmarks,
            search_rows,
        })
    }
}

/// Warn about manifest entries that name no ingested article
fn check_manifest(manifest: &GuideManifest, index: &ArticleIndex) {
    for (name, title) in &manifest.content {
        if index.get(name).is_none() {
            warn!(article = %name, %title, "Manifest lists an article that was not ingested");
        }
    }
}

/// Exclusive lock on the guide directory, released on drop
fn acquire_lock(guide_dir: &Path) -> Result<File> {
    let path = guide_dir.join(LOCK_FILE);
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(&path)
        .map_err(|e| PackError::io(&path, e))?;

    file.try_lock_exclusive()
        .map_err(|_| PackError::Locked(guide_dir.to_path_buf()))?;
    Ok(file)
}
