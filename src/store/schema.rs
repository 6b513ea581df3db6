//! Store schema.
//!
//! Table and column names are the contract with the app-side importer.
//! `articles.content` holds raw content JSON until finalization drops it.

pub const SCHEMA: &str = r#"
-- categories table
CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY,
    name TEXT UNIQUE NOT NULL,
    icon TEXT,
    description TEXT
);

-- tags table
CREATE TABLE IF NOT EXISTS tags (
    id INTEGER PRIMARY KEY,
    name TEXT UNIQUE NOT NULL
);

CREATE TABLE IF NOT EXISTS tags_categories (
    tag_id INTEGER NOT NULL,
    category_id INTEGER NOT NULL,
    UNIQUE(tag_id, category_id)
);

-- articles table
CREATE TABLE IF NOT EXISTS articles (
    id INTEGER PRIMARY KEY,
    name TEXT UNIQUE NOT NULL,
    icon TEXT,
    title TEXT,
    synopsis TEXT,
    content TEXT
);

CREATE TABLE IF NOT EXISTS tags_articles (
    tag_id INTEGER NOT NULL,
    article_id INTEGER NOT NULL,
    UNIQUE(tag_id, article_id)
);

-- block order join relation
CREATE TABLE IF NOT EXISTS articles_blocks (
    article_id INTEGER NOT NULL,
    block_id INTEGER NOT NULL,
    block_order INTEGER NOT NULL,
    block_type TEXT NOT NULL,
    UNIQUE(article_id, block_order)
);

CREATE INDEX IF NOT EXISTS idx_articles_blocks_article ON articles_blocks(article_id, block_order);

-- per-type block tables
CREATE TABLE IF NOT EXISTS subtitle_blocks (
    id INTEGER PRIMARY KEY,
    subtitle_text TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS paragraph_blocks (
    id INTEGER PRIMARY KEY,
    paragraph_text TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS image_blocks (
    id INTEGER PRIMARY KEY,
    image_source TEXT NOT NULL,
    caption_text TEXT
);

CREATE TABLE IF NOT EXISTS audio_blocks (
    id INTEGER PRIMARY KEY,
    block_type TEXT NOT NULL DEFAULT 'audio',
    audio_source TEXT NOT NULL,
    audio_length REAL,
    caption_text TEXT
);

CREATE TABLE IF NOT EXISTS video_blocks (
    id INTEGER PRIMARY KEY,
    video_source TEXT NOT NULL,
    video_length REAL,
    video_aspect_ratio TEXT,
    video_cover_source TEXT,
    caption_text TEXT
);

-- bookmarks table
CREATE TABLE IF NOT EXISTS bookmarks (
    id INTEGER PRIMARY KEY,
    article_id INTEGER UNIQUE NOT NULL,
    created_at TEXT
);

-- full-text search over titles, synopses and block text
CREATE VIRTUAL TABLE IF NOT EXISTS article_block_search
    USING fts4(article_id, block_order, block_type, block_id, block_text);
"#;

/// Tables reported by `inspect`, in schema order
pub const TABLES: &[&str] = &[
    "categories",
    "tags",
    "tags_categories",
    "articles",
    "tags_articles",
    "articles_blocks",
    "subtitle_blocks",
    "paragraph_blocks",
    "image_blocks",
    "audio_blocks",
    "video_blocks",
    "bookmarks",
    "article_block_search",
];
