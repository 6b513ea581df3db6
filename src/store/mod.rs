//! SQLite content store.
//!
//! [`ContentStore`] owns every table of a guide database and exposes the raw
//! read/write primitives the pipeline stages are built from. It is the only
//! mutable resource of a run and expects exactly one writer.

pub mod schema;
pub mod tags;

use std::path::Path;

use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};
use serde::Serialize;
use serde_json::Value;

use crate::domain::{ArticleId, ArticleStub, BlockKind, BlockRow, RawArticle};
use crate::error::{PackError, Result};

use schema::{SCHEMA, TABLES};
pub use tags::{TagId, TagOwner, TagRegistry};

pub type BlockId = i64;

/// Row of the block order join relation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockOrder {
    pub article_id: ArticleId,
    pub block_id: BlockId,
    pub order: i64,
    pub kind: BlockKind,
}

/// Row of the full-text search index
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchEntry {
    pub article_id: ArticleId,

    /// -2 for the title, -1 for the synopsis, the block order otherwise
    pub order_key: i64,

    /// `title`, `synopsis` or a block kind
    pub block_type: String,

    pub block_id: Option<BlockId>,

    pub text: String,
}

/// Row of the bookmarks table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bookmark {
    pub id: i64,
    pub article_id: ArticleId,
    pub created_at: Option<String>,
}

/// Primary storage handle wrapping a SQLite connection
pub struct ContentStore {
    conn: Connection,
    tags: TagRegistry,
    readonly: bool,
}

impl ContentStore {
    /// Open or create a store at `path` and create every table
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Create a store in memory
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    /// Open a finalized store for queries only
    pub fn open_readonly(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        Ok(Self {
            conn,
            tags: TagRegistry::new(),
            readonly: true,
        })
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn,
            tags: TagRegistry::new(),
            readonly: false,
        })
    }

    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(PackError::Lifecycle("store is opened in read-only mode".into()));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Transactions
    // -----------------------------------------------------------------------

    /// Start the run's write transaction
    pub fn begin(&mut self) -> Result<()> {
        self.check_writable()?;
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(())
    }

    pub fn commit(&mut self) -> Result<()> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("COMMIT")?;
        }
        Ok(())
    }

    pub fn rollback(&mut self) -> Result<()> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("ROLLBACK")?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Categories and tags
    // -----------------------------------------------------------------------

    pub fn create_category(
        &mut self,
        name: &str,
        icon: Option<&str>,
        description: Option<&str>,
    ) -> Result<i64> {
        self.check_writable()?;
        self.conn.execute(
            "INSERT INTO categories (name, icon, description) VALUES (?1, ?2, ?3)",
            params![name, icon, description],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Return the id of the tag `name`, creating it on first use
    pub fn intern_tag(&mut self, name: &str) -> Result<TagId> {
        self.check_writable()?;
        Ok(self.tags.intern(&self.conn, name)?)
    }

    pub fn link_tag(&mut self, tag_id: TagId, owner: TagOwner) -> Result<()> {
        self.check_writable()?;
        self.tags.link(&self.conn, tag_id, owner)?;
        Ok(())
    }

    pub fn tags_for(&self, owner: TagOwner) -> Result<Vec<String>> {
        Ok(self.tags.names_for(&self.conn, owner)?)
    }

    // -----------------------------------------------------------------------
    // Articles
    // -----------------------------------------------------------------------

    /// Insert an article row with its raw content list
    pub fn create_article_stub(&mut self, stub: &ArticleStub, content: &[Value]) -> Result<()> {
        self.check_writable()?;
        let raw = serde_json::to_string(content).map_err(|source| PackError::CorruptRawContent {
            article: stub.name.clone(),
            source,
        })?;
        self.conn.execute(
            "INSERT INTO articles (id, name, icon, title, synopsis, content)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![stub.id.get(), stub.name, stub.icon, stub.title, stub.synopsis, raw],
        )?;
        Ok(())
    }

    /// Read an article's raw content and clear it; a second read fails
    pub fn take_raw_article(&mut self, id: ArticleId) -> Result<RawArticle> {
        self.check_writable()?;
        if !self.has_raw_content_column()? {
            return Err(PackError::Lifecycle(format!(
                "raw content of article {} was requested after finalization",
                id
            )));
        }

        let row = self
            .conn
            .query_row(
                "SELECT id, name, icon, title, synopsis, content FROM articles WHERE id = ?1",
                params![id.get()],
                |row| Ok((stub_from_row(row)?, row.get::<_, Option<String>>(5)?)),
            )
            .optional()?;

        let (stub, raw) = match row {
            Some((stub, Some(raw))) => (stub, raw),
            Some((stub, None)) => {
                return Err(PackError::Lifecycle(format!(
                    "raw content of article '{}' was already consumed",
                    stub.name
                )));
            }
            None => {
                return Err(PackError::Lifecycle(format!("article {} does not exist", id)));
            }
        };

        let content: Vec<Value> =
            serde_json::from_str(&raw).map_err(|source| PackError::CorruptRawContent {
                article: stub.name.clone(),
                source,
            })?;

        self.conn.execute(
            "UPDATE articles SET content = NULL WHERE id = ?1",
            params![id.get()],
        )?;

        Ok(RawArticle::new(stub, content))
    }

    pub fn article_id_by_name(&self, name: &str) -> Result<Option<ArticleId>> {
        let id = self
            .conn
            .query_row(
                "SELECT id FROM articles WHERE name = ?1",
                params![name],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(id.map(ArticleId))
    }

    /// All articles in id order
    pub fn articles(&self) -> Result<Vec<ArticleStub>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, icon, title, synopsis FROM articles ORDER BY id")?;
        let articles = stmt
            .query_map([], stub_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(articles)
    }

    /// Whether the articles table still carries the raw content column
    pub fn has_raw_content_column(&self) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM pragma_table_info('articles') WHERE name = 'content'",
            [],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Remove the raw content column. Refuses while any article still holds
    /// unconsumed raw content, since dropping it would lose that content.
    pub fn drop_raw_content_column(&mut self) -> Result<()> {
        self.check_writable()?;
        if !self.has_raw_content_column()? {
            return Err(PackError::Lifecycle("store is already finalized".into()));
        }

        let pending: Option<String> = self
            .conn
            .query_row(
                "SELECT name FROM articles WHERE content IS NOT NULL ORDER BY id LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(name) = pending {
            return Err(PackError::Lifecycle(format!(
                "article '{}' has not been normalized; finalizing would discard its content",
                name
            )));
        }

        self.conn
            .execute_batch("ALTER TABLE articles DROP COLUMN content")?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Blocks
    // -----------------------------------------------------------------------

    /// Insert a block into its per-type table
    pub fn insert_block(&mut self, row: &BlockRow) -> Result<BlockId> {
        self.check_writable()?;
        match row {
            BlockRow::Subtitle { text } => self.conn.execute(
                "INSERT INTO subtitle_blocks (subtitle_text) VALUES (?1)",
                params![text],
            )?,
            BlockRow::Paragraph { text } => self.conn.execute(
                "INSERT INTO paragraph_blocks (paragraph_text) VALUES (?1)",
                params![text],
            )?,
            BlockRow::Image { source, caption } => self.conn.execute(
                "INSERT INTO image_blocks (image_source, caption_text) VALUES (?1, ?2)",
                params![source, caption],
            )?,
            BlockRow::Audio {
                source,
                duration,
                caption,
            } => self.conn.execute(
                "INSERT INTO audio_blocks (audio_source, audio_length, caption_text)
                 VALUES (?1, ?2, ?3)",
                params![source, duration, caption],
            )?,
            BlockRow::Video {
                source,
                duration,
                aspect_ratio,
                cover_source,
                caption,
            } => self.conn.execute(
                "INSERT INTO video_blocks
                     (video_source, video_length, video_aspect_ratio, video_cover_source, caption_text)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![source, duration, aspect_ratio, cover_source, caption],
            )?,
        };
        Ok(self.conn.last_insert_rowid())
    }

    pub fn insert_block_order(
        &mut self,
        article_id: ArticleId,
        block_id: BlockId,
        order: i64,
        kind: BlockKind,
    ) -> Result<()> {
        self.check_writable()?;
        self.conn.execute(
            "INSERT INTO articles_blocks (article_id, block_id, block_order, block_type)
             VALUES (?1, ?2, ?3, ?4)",
            params![article_id.get(), block_id, order, kind.as_str()],
        )?;
        Ok(())
    }

    /// Block order rows of one article, by order
    pub fn block_orders(&self, article_id: ArticleId) -> Result<Vec<BlockOrder>> {
        let mut stmt = self.conn.prepare(
            "SELECT article_id, block_id, block_order, block_type FROM articles_blocks
             WHERE article_id = ?1 ORDER BY block_order",
        )?;
        let orders = stmt
            .query_map(params![article_id.get()], |row| {
                let block_type: String = row.get(3)?;
                let kind = block_type.parse::<BlockKind>().map_err(|_| {
                    rusqlite::Error::InvalidColumnType(
                        3,
                        "block_type".to_string(),
                        rusqlite::types::Type::Text,
                    )
                })?;
                Ok(BlockOrder {
                    article_id: ArticleId(row.get(0)?),
                    block_id: row.get(1)?,
                    order: row.get(2)?,
                    kind,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(orders)
    }

    /// Load a normalized block back from its per-type table
    pub fn load_block(&self, kind: BlockKind, id: BlockId) -> Result<Option<BlockRow>> {
        let row = match kind {
            BlockKind::Subtitle => self
                .conn
                .query_row(
                    "SELECT subtitle_text FROM subtitle_blocks WHERE id = ?1",
                    params![id],
                    |row| Ok(BlockRow::Subtitle { text: row.get(0)? }),
                )
                .optional()?,
            BlockKind::Paragraph => self
                .conn
                .query_row(
                    "SELECT paragraph_text FROM paragraph_blocks WHERE id = ?1",
                    params![id],
                    |row| Ok(BlockRow::Paragraph { text: row.get(0)? }),
                )
                .optional()?,
            BlockKind::Image => self
                .conn
                .query_row(
                    "SELECT image_source, caption_text FROM image_blocks WHERE id = ?1",
                    params![id],
                    |row| {
                        Ok(BlockRow::Image {
                            source: row.get(0)?,
                            caption: row.get(1)?,
                        })
                    },
                )
                .optional()?,
            BlockKind::Audio => self
                .conn
                .query_row(
                    "SELECT audio_source, audio_length, caption_text FROM audio_blocks WHERE id = ?1",
                    params![id],
                    |row| {
                        Ok(BlockRow::Audio {
                            source: row.get(0)?,
                            duration: row.get::<_, Option<f64>>(1)?.unwrap_or_default(),
                            caption: row.get(2)?,
                        })
                    },
                )
                .optional()?,
            BlockKind::Video => self
                .conn
                .query_row(
                    "SELECT video_source, video_length, video_aspect_ratio, video_cover_source, caption_text
                     FROM video_blocks WHERE id = ?1",
                    params![id],
                    |row| {
                        Ok(BlockRow::Video {
                            source: row.get(0)?,
                            duration: row.get::<_, Option<f64>>(1)?.unwrap_or_default(),
                            aspect_ratio: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                            cover_source: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                            caption: row.get(4)?,
                        })
                    },
                )
                .optional()?,
        };
        Ok(row)
    }

    // -----------------------------------------------------------------------
    // Bookmarks
    // -----------------------------------------------------------------------

    pub fn insert_bookmark(&mut self, article_id: ArticleId, created_at: &str) -> Result<i64> {
        self.check_writable()?;
        self.conn.execute(
            "INSERT INTO bookmarks (article_id, created_at) VALUES (?1, ?2)",
            params![article_id.get(), created_at],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn bookmarks(&self) -> Result<Vec<Bookmark>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, article_id, created_at FROM bookmarks ORDER BY id")?;
        let bookmarks = stmt
            .query_map([], |row| {
                Ok(Bookmark {
                    id: row.get(0)?,
                    article_id: ArticleId(row.get(1)?),
                    created_at: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(bookmarks)
    }

    // -----------------------------------------------------------------------
    // Search index
    // -----------------------------------------------------------------------

    /// Populate the search index from the normalized tables.
    ///
    /// Requires the raw content column to be gone and the index to be empty.
    /// Returns the number of indexed rows.
    pub fn build_search_index(&mut self) -> Result<usize> {
        self.check_writable()?;
        if self.has_raw_content_column()? {
            return Err(PackError::Lifecycle(
                "search index requested before finalization".into(),
            ));
        }
        if self.count("article_block_search")? > 0 {
            return Err(PackError::Lifecycle("search index is already built".into()));
        }

        self.conn.execute_batch(&search_index_sql())?;
        Ok(self.count("article_block_search")? as usize)
    }

    /// Index rows of one article, by order key
    pub fn search_entries(&self, article_id: ArticleId) -> Result<Vec<SearchEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT CAST(article_id AS INTEGER), CAST(block_order AS INTEGER), block_type,
                    CAST(block_id AS INTEGER), block_text
             FROM article_block_search
             WHERE CAST(article_id AS INTEGER) = ?1
             ORDER BY CAST(block_order AS INTEGER)",
        )?;
        let entries = stmt
            .query_map(params![article_id.get()], search_entry_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

    /// Full-text query over block text, ordered by `(article_id, order_key)`
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT CAST(article_id AS INTEGER), CAST(block_order AS INTEGER), block_type,
                    CAST(block_id AS INTEGER), block_text
             FROM article_block_search
             WHERE block_text MATCH ?1
             ORDER BY CAST(article_id AS INTEGER), CAST(block_order AS INTEGER)
             LIMIT ?2",
        )?;
        let entries = stmt
            .query_map(params![query, limit as i64], search_entry_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

    // -----------------------------------------------------------------------
    // Introspection
    // -----------------------------------------------------------------------

    /// Row count of a schema table
    pub fn count(&self, table: &str) -> Result<i64> {
        if !TABLES.contains(&table) {
            return Err(PackError::Lifecycle(format!("unknown table '{}'", table)));
        }
        let count = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
        Ok(count)
    }

    /// Row counts of every table, in schema order
    pub fn table_counts(&self) -> Result<Vec<(&'static str, i64)>> {
        TABLES
            .iter()
            .map(|table| -> Result<(&'static str, i64)> { Ok((*table, self.count(table)?)) })
            .collect()
    }
}

fn stub_from_row(row: &Row) -> rusqlite::Result<ArticleStub> {
    Ok(ArticleStub {
        id: ArticleId(row.get(0)?),
        name: row.get(1)?,
        icon: row.get(2)?,
        title: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        synopsis: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
    })
}

fn search_entry_from_row(row: &Row) -> rusqlite::Result<SearchEntry> {
    Ok(SearchEntry {
        article_id: ArticleId(row.get(0)?),
        order_key: row.get(1)?,
        block_type: row.get(2)?,
        block_id: row.get(3)?,
        text: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
    })
}

/// INSERT..SELECT filling the search index: title and synopsis rows for every
/// article, then one row per block with non-empty text
fn search_index_sql() -> String {
    let mut selects = vec![
        "SELECT id AS article_id, -2 AS block_order, 'title' AS block_type,
                NULL AS block_id, title AS block_text
         FROM articles"
            .to_string(),
        "SELECT id AS article_id, -1 AS block_order, 'synopsis' AS block_type,
                NULL AS block_id, synopsis AS block_text
         FROM articles"
            .to_string(),
    ];

    for kind in BlockKind::ALL {
        selects.push(format!(
            "SELECT ab.article_id, ab.block_order, ab.block_type, ab.block_id, b.{column} AS block_text
             FROM articles_blocks AS ab
             JOIN {table} AS b ON b.id = ab.block_id AND ab.block_type = '{kind}'
             WHERE b.{column} IS NOT NULL AND b.{column} <> ''",
            column = kind.text_column(),
            table = kind.table(),
            kind = kind.as_str(),
        ));
    }

    format!(
        "INSERT INTO article_block_search (article_id, block_order, block_type, block_id, block_text)
         SELECT article_id, block_order, block_type, block_id, block_text FROM (
         {}
         ) ORDER BY article_id, block_order;",
        selects.join("\n UNION ALL\n ")
    )
}
