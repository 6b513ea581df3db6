//! Pipeline Integration Tests
//!
//! Packs staged guide directories end to end with a fake media probe.

use std::cell::Cell;
use std::path::{Path, PathBuf};

use guidepack::domain::BlockKind;
use guidepack::store::TagOwner;
use guidepack::{
    ArticleId, BlockRow, ContentStore, MediaError, MediaInfo, MediaProbe, PackError, PackOptions,
    Packager, UnknownBlockPolicy,
};
use serde_json::json;
use tempfile::TempDir;

/// Probe that counts calls and writes a placeholder cover
#[derive(Default)]
struct CountingProbe {
    probes: Cell<usize>,
    extractions: Cell<usize>,
}

impl MediaProbe for CountingProbe {
    fn name(&self) -> &str {
        "counting"
    }

    fn probe(&self, _asset: &Path) -> Result<MediaInfo, MediaError> {
        self.probes.set(self.probes.get() + 1);
        Ok(MediaInfo {
            duration_seconds: 30.0,
            aspect_ratio: Some("16:9".to_string()),
        })
    }

    fn extract_frame(&self, _video: &Path, out: &Path) -> Result<(), MediaError> {
        self.extractions.set(self.extractions.get() + 1);
        std::fs::write(out, b"png").map_err(|source| MediaError::Spawn {
            tool: "counting".to_string(),
            source,
        })
    }
}

/// Probe whose cover extraction always fails
struct BrokenCoverProbe;

impl MediaProbe for BrokenCoverProbe {
    fn name(&self) -> &str {
        "broken-cover"
    }

    fn probe(&self, _asset: &Path) -> Result<MediaInfo, MediaError> {
        Ok(MediaInfo {
            duration_seconds: 12.0,
            aspect_ratio: Some("4:3".to_string()),
        })
    }

    fn extract_frame(&self, _video: &Path, _out: &Path) -> Result<(), MediaError> {
        Err(MediaError::Failed {
            tool: "ffmpeg".to_string(),
            code: 1,
            stderr: "moov atom not found".to_string(),
        })
    }
}

/// Staged guide directory under a temp root
struct GuideFixture {
    _temp: TempDir,
    dir: PathBuf,
}

impl GuideFixture {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("lisbon");
        std::fs::create_dir_all(dir.join("articles")).unwrap();
        std::fs::create_dir_all(dir.join("media")).unwrap();

        let fixture = Self { _temp: temp, dir };
        fixture.write(
            "categories.json",
            json!([
                {"name": "Food", "icon": "icons/food.png", "description": "Eat", "tags": ["food", "local"]},
                {"name": "Sights", "icon": "icons/sights.png", "description": "See", "tags": ["walks"]}
            ]),
        );
        fixture.article(
            "alpha",
            "Alpha Guide",
            &["food", "food", "walks"],
            json!([{"type": "paragraph", "text": "Continue with [ref=beta]"}]),
        );
        fixture.article(
            "beta",
            "Beta Guide",
            &["local"],
            json!([
                {"type": "subtitle", "text": "Olive groves"},
                {"type": "carousel", "items": [1, 2]},
                {"type": "image", "source": "media/grove.png", "caption": ""},
                {"type": "video", "source": "media/harbour.mp4", "caption": "Back to [ref=alpha], not [ref=gamma]"},
                {"type": "audio", "source": "media/waves.mp3"}
            ]),
        );
        fixture.write(
            "bookmarks.json",
            json!([{"article_name": "beta", "article_title": "Beta Guide", "created_at": "2024-03-01"}]),
        );
        fixture
    }

    fn write(&self, rel: &str, value: serde_json::Value) {
        std::fs::write(self.dir.join(rel), serde_json::to_string_pretty(&value).unwrap()).unwrap();
    }

    fn article(&self, name: &str, title: &str, tags: &[&str], content: serde_json::Value) {
        self.write(
            &format!("articles/{}.json", name),
            json!({
                "name": name,
                "icon": format!("icons/{}.png", name),
                "title": title,
                "synopsis": format!("All about {}", name),
                "tags": tags,
                "content": content
            }),
        );
    }

    fn output(&self) -> PathBuf {
        self.dir.join("guide.db")
    }

    fn staging_files(&self) -> Vec<PathBuf> {
        std::fs::read_dir(&self.dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .filter(|path| {
                path.file_name()
                    .map(|name| name.to_string_lossy().starts_with(".guidepack-"))
                    .unwrap_or(false)
            })
            .collect()
    }
}

fn pack(fixture: &GuideFixture, probe: &CountingProbe, options: PackOptions) -> guidepack::Result<guidepack::PackReport> {
    Packager::new(probe, options).pack(&fixture.dir)
}

#[test]
fn test_end_to_end_reference_and_search_order() {
    let fixture = GuideFixture::new();
    let probe = CountingProbe::default();

    let report = pack(&fixture, &probe, PackOptions::default()).unwrap();
    assert_eq!(report.guide_name, "lisbon");
    assert_eq!(report.articles, 2);
    assert_eq!(report.output, fixture.output());

    let store = ContentStore::open_readonly(&fixture.output()).unwrap();
    assert_eq!(store.article_id_by_name("alpha").unwrap(), Some(ArticleId(0)));
    assert_eq!(store.article_id_by_name("beta").unwrap(), Some(ArticleId(1)));

    let orders = store.block_orders(ArticleId(0)).unwrap();
    assert_eq!(orders.len(), 1);
    let paragraph = store.load_block(orders[0].kind, orders[0].block_id).unwrap();
    assert_eq!(
        paragraph,
        Some(BlockRow::Paragraph {
            text: "Continue with [ref=1]".to_string()
        })
    );

    let entries = store.search_entries(ArticleId(0)).unwrap();
    let keys: Vec<i64> = entries.iter().map(|e| e.order_key).collect();
    assert_eq!(keys, vec![-2, -1, 0]);
    assert_eq!(entries[0].text, "Alpha Guide");
    assert_eq!(entries[2].block_id, Some(orders[0].block_id));
    assert_eq!(entries[2].text, "Continue with [ref=1]");
}

#[test]
fn test_block_orders_are_dense() {
    let fixture = GuideFixture::new();
    let probe = CountingProbe::default();

    let report = pack(&fixture, &probe, PackOptions::default()).unwrap();
    assert_eq!(report.blocks, 5);
    assert_eq!(report.skipped_blocks, 1);

    let store = ContentStore::open_readonly(&fixture.output()).unwrap();
    let orders = store.block_orders(ArticleId(1)).unwrap();
    let values: Vec<i64> = orders.iter().map(|o| o.order).collect();
    let kinds: Vec<BlockKind> = orders.iter().map(|o| o.kind).collect();
    assert_eq!(values, vec![0, 1, 2, 3]);
    assert_eq!(
        kinds,
        vec![BlockKind::Subtitle, BlockKind::Image, BlockKind::Video, BlockKind::Audio]
    );
}

#[test]
fn test_media_blocks_and_asset_namespace() {
    let fixture = GuideFixture::new();
    let probe = CountingProbe::default();

    pack(&fixture, &probe, PackOptions::default()).unwrap();
    assert_eq!(probe.probes.get(), 2);
    assert_eq!(probe.extractions.get(), 1);

    let store = ContentStore::open_readonly(&fixture.output()).unwrap();
    let orders = store.block_orders(ArticleId(1)).unwrap();
    let video = store.load_block(orders[2].kind, orders[2].block_id).unwrap().unwrap();
    assert_eq!(
        video,
        BlockRow::Video {
            source: "guides/lisbon/media/harbour.mp4".to_string(),
            duration: 30.0,
            aspect_ratio: "16:9".to_string(),
            cover_source: "guides/lisbon/media/harbour.png".to_string(),
            caption: Some("Back to [ref=0], not [ref=]".to_string()),
        }
    );

    let articles = store.articles().unwrap();
    assert_eq!(articles[0].icon.as_deref(), Some("guides/lisbon/icons/alpha.png"));
}

#[test]
fn test_search_rows_skip_empty_text() {
    let fixture = GuideFixture::new();
    let probe = CountingProbe::default();

    let report = pack(&fixture, &probe, PackOptions::default()).unwrap();

    let store = ContentStore::open_readonly(&fixture.output()).unwrap();
    // beta: title, synopsis, subtitle, video caption; the image caption is empty
    // and the audio block has none
    let keys: Vec<i64> = store
        .search_entries(ArticleId(1))
        .unwrap()
        .iter()
        .map(|e| e.order_key)
        .collect();
    assert_eq!(keys, vec![-2, -1, 0, 2]);
    assert_eq!(report.search_rows, 3 + 4);

    let hits = store.search("olive", 10).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].article_id, ArticleId(1));
    assert_eq!(hits[0].block_type, "subtitle");
}

#[test]
fn test_tags_interned_once() {
    let fixture = GuideFixture::new();
    let probe = CountingProbe::default();

    let report = pack(&fixture, &probe, PackOptions::default()).unwrap();
    assert_eq!(report.tags, 3);

    let store = ContentStore::open_readonly(&fixture.output()).unwrap();
    assert_eq!(store.count("tags").unwrap(), 3);
    // food + local, walks
    assert_eq!(store.count("tags_categories").unwrap(), 3);
    // alpha: food (once), walks; beta: local
    assert_eq!(store.count("tags_articles").unwrap(), 3);
    assert_eq!(
        store.tags_for(TagOwner::Article(ArticleId(0))).unwrap(),
        vec!["food".to_string(), "walks".to_string()]
    );
}

#[test]
fn test_store_is_finalized() {
    let fixture = GuideFixture::new();
    let probe = CountingProbe::default();
    pack(&fixture, &probe, PackOptions::default()).unwrap();

    let mut store = ContentStore::open(&fixture.output()).unwrap();
    assert!(!store.has_raw_content_column().unwrap());
    assert!(matches!(
        store.take_raw_article(ArticleId(0)),
        Err(PackError::Lifecycle(_))
    ));
    assert!(matches!(
        store.build_search_index(),
        Err(PackError::Lifecycle(_))
    ));

    let bookmarks = store.bookmarks().unwrap();
    assert_eq!(bookmarks.len(), 1);
    assert_eq!(bookmarks[0].article_id, ArticleId(1));
}

#[test]
fn test_dangling_bookmark_discards_store() {
    let fixture = GuideFixture::new();
    fixture.write(
        "bookmarks.json",
        json!([{"article_name": "gamma", "created_at": "2024-03-01"}]),
    );
    let probe = CountingProbe::default();

    match pack(&fixture, &probe, PackOptions::default()) {
        Err(PackError::DanglingBookmark { article_name }) => assert_eq!(article_name, "gamma"),
        other => panic!("Expected DanglingBookmark, got {:?}", other),
    }
    assert!(!fixture.output().exists());
    assert!(fixture.staging_files().is_empty());
}

#[test]
fn test_reject_policy_fails_run() {
    let fixture = GuideFixture::new();
    let probe = CountingProbe::default();
    let options = PackOptions {
        unknown_blocks: UnknownBlockPolicy::Reject,
        ..PackOptions::default()
    };

    match pack(&fixture, &probe, options) {
        Err(PackError::UnknownBlock { article, block_type }) => {
            assert_eq!(article, "beta");
            assert_eq!(block_type, "carousel");
        }
        other => panic!("Expected UnknownBlock, got {:?}", other),
    }
    assert!(!fixture.output().exists());
}

#[test]
fn test_existing_output_is_not_overwritten() {
    let fixture = GuideFixture::new();
    let probe = CountingProbe::default();
    pack(&fixture, &probe, PackOptions::default()).unwrap();

    assert!(matches!(
        pack(&fixture, &probe, PackOptions::default()),
        Err(PackError::OutputExists(_))
    ));
}

#[test]
fn test_cover_extraction_runs_once_across_runs() {
    let fixture = GuideFixture::new();
    let probe = CountingProbe::default();

    pack(&fixture, &probe, PackOptions::default()).unwrap();
    assert!(fixture.dir.join("media/harbour.png").exists());

    let second = PackOptions {
        output: Some(fixture.dir.join("second.db")),
        guide_name: Some("porto".to_string()),
        ..PackOptions::default()
    };
    let report = pack(&fixture, &probe, second).unwrap();

    assert_eq!(probe.extractions.get(), 1);
    assert_eq!(report.covers_extracted, 0);
    assert_eq!(report.guide_name, "porto");
}

#[test]
fn test_cover_failure_discards_store() {
    let fixture = GuideFixture::new();

    let result = Packager::new(BrokenCoverProbe, PackOptions::default()).pack(&fixture.dir);
    match result {
        Err(PackError::Media { asset, source }) => {
            assert!(asset.ends_with("media/harbour.mp4"));
            assert!(matches!(source, MediaError::Failed { code: 1, .. }));
        }
        other => panic!("Expected Media error, got {:?}", other),
    }
    assert!(!fixture.output().exists());
    assert!(fixture.staging_files().is_empty());
    assert!(!fixture.dir.join("media/harbour.png").exists());
}
