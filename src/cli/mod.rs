//! Command-line interface for guidepack.
//!
//! Provides commands for packing a staged guide directory, querying a
//! finalized store, and showing the resolved configuration.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::config;
use crate::domain::{ArticleId, UnknownBlockPolicy};
use crate::pipeline::{search, PackReport, Packager};
use crate::store::{ContentStore, SearchEntry};

/// guidepack - Normalize generated guide content into an indexed SQLite store
#[derive(Parser, Debug)]
#[command(name = "guidepack")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Pack a staged guide directory into a store
    Pack {
        /// Guide directory (guide.json, categories.json, articles/, bookmarks.json)
        guide_dir: PathBuf,

        /// Guide name used in asset paths (defaults to manifest, then directory name)
        #[arg(short, long)]
        name: Option<String>,

        /// Output store path (defaults to <GUIDE_DIR>/guide.db)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Root of the asset namespace
        #[arg(long)]
        guides_root: Option<String>,

        /// Fail on blocks of unknown type instead of skipping them
        #[arg(long)]
        reject_unknown_blocks: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Full-text search in a packed store
    Search {
        /// Store path
        db: PathBuf,

        /// Search query (FTS syntax)
        query: String,

        /// Maximum number of hits to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Show row counts of every table
    Inspect {
        /// Store path
        db: PathBuf,
    },

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        match self.command {
            Commands::Pack {
                guide_dir,
                name,
                output,
                guides_root,
                reject_unknown_blocks,
                json,
            } => pack_guide(
                &guide_dir,
                name,
                output,
                guides_root,
                reject_unknown_blocks,
                json,
            ),
            Commands::Search { db, query, limit } => search_store(&db, &query, limit),
            Commands::Inspect { db } => inspect_store(&db),
            Commands::Config => show_config(),
        }
    }
}

/// Run the packaging pipeline
fn pack_guide(
    guide_dir: &Path,
    name: Option<String>,
    output: Option<PathBuf>,
    guides_root: Option<String>,
    reject_unknown_blocks: bool,
    json: bool,
) -> Result<()> {
    let cfg = config::config()?;

    let mut options = cfg.pack_options();
    options.guide_name = name;
    options.output = output;
    if let Some(root) = guides_root {
        options.guides_root = root;
    }
    if reject_unknown_blocks {
        options.unknown_blocks = UnknownBlockPolicy::Reject;
    }

    let packager = Packager::new(cfg.probe(), options);
    let report = packager
        .pack(guide_dir)
        .with_context(|| format!("Failed to pack guide: {}", guide_dir.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

fn print_report(report: &PackReport) {
    println!("Packed guide '{}'", report.guide_name);
    println!("  Run ID:     {}", report.run_id);
    println!("  Output:     {}", report.output.display());
    println!();
    println!("  Categories: {}", report.categories);
    println!("  Tags:       {}", report.tags);
    println!("  Articles:   {}", report.articles);
    println!("  Blocks:     {}", report.blocks);
    if report.skipped_blocks > 0 {
        println!("  Skipped:    {} (unknown block type)", report.skipped_blocks);
    }
    println!("  Covers:     {} extracted", report.covers_extracted);
    println!("  Bookmarks:  {}", report.bookmarks);
    println!("  Search:     {} rows", report.search_rows);
}

/// Query the search index of a packed store
fn search_store(db: &Path, query: &str, limit: usize) -> Result<()> {
    let store = open_store(db)?;
    let hits = search::query(&store, query, limit)
        .with_context(|| format!("Search failed for: {}", query))?;

    if hits.is_empty() {
        println!("No results found for: {}", query);
        return Ok(());
    }

    let names = store
        .articles()?
        .into_iter()
        .map(|a| (a.id, a.name))
        .collect::<HashMap<ArticleId, String>>();

    println!("Found {} result(s) for \"{}\":\n", hits.len(), query);
    println!("{:<20} {:>6} {:<10} {:<50}", "ARTICLE", "ORDER", "TYPE", "TEXT");
    println!("{}", "-".repeat(90));

    for line in hit_rows(hits, &names) {
        println!("{}", line);
    }

    Ok(())
}

/// Table rows for search hits, grouped by article in reading order
fn hit_rows(hits: Vec<SearchEntry>, names: &HashMap<ArticleId, String>) -> Vec<String> {
    let mut rows = Vec::new();
    for (id, group) in search::group_by_article(hits) {
        let article = names.get(&id).cloned().unwrap_or_else(|| id.to_string());
        for hit in group {
            rows.push(format!(
                "{:<20} {:>6} {:<10} {:<50}",
                truncate(&article, 20),
                hit.order_key,
                hit.block_type,
                truncate(&hit.text, 50)
            ));
        }
    }
    rows
}

/// Print row counts of every table
fn inspect_store(db: &Path) -> Result<()> {
    let store = open_store(db)?;
    let counts = store.table_counts()?;

    println!("Store: {}", db.display());
    println!(
        "Finalized: {}",
        if store.has_raw_content_column()? { "no" } else { "yes" }
    );
    println!();
    println!("{:<24} {:>10}", "TABLE", "ROWS");
    println!("{}", "-".repeat(35));
    for (table, count) in counts {
        println!("{:<24} {:>10}", table, count);
    }

    Ok(())
}

/// Show resolved configuration
fn show_config() -> Result<()> {
    let cfg = config::config()?;

    println!("guidepack configuration");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Guides root: {}", cfg.guides_root);
    println!();
    println!("Media:");
    println!("  ffprobe: {}", cfg.ffprobe);
    println!("  ffmpeg:  {}", cfg.ffmpeg);
    println!();
    println!("Normalize:");
    println!("  Unknown blocks: {:?}", cfg.unknown_blocks);

    Ok(())
}

fn open_store(db: &Path) -> Result<ContentStore> {
    if !db.exists() {
        anyhow::bail!("Store not found: {}", db.display());
    }
    ContentStore::open_readonly(db).with_context(|| format!("Failed to open store: {}", db.display()))
}

/// Truncate to `max` characters, marking the cut with "..."
fn truncate(text: &str, max: usize) -> String {
    let flat = text.replace('\n', " ");
    if flat.chars().count() <= max {
        return flat;
    }
    let kept: String = flat.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept)
}
