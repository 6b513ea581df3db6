//! Tag interning.
//!
//! A tag name maps to exactly one `tags` row however many categories and
//! articles reference it. The name-to-id cache belongs to the store session.

use std::collections::HashMap;

use rusqlite::{params, Connection, OptionalExtension};

use crate::domain::ArticleId;

pub type TagId = i64;

/// Entity a tag is linked to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagOwner {
    Category(i64),
    Article(ArticleId),
}

impl TagOwner {
    fn link_sql(&self) -> &'static str {
        match self {
            TagOwner::Category(_) => {
                "INSERT OR IGNORE INTO tags_categories (tag_id, category_id) VALUES (?1, ?2)"
            }
            TagOwner::Article(_) => {
                "INSERT OR IGNORE INTO tags_articles (tag_id, article_id) VALUES (?1, ?2)"
            }
        }
    }

    fn names_sql(&self) -> &'static str {
        match self {
            TagOwner::Category(_) => {
                "SELECT t.name FROM tags AS t JOIN tags_categories AS l ON l.tag_id = t.id
                 WHERE l.category_id = ?1 ORDER BY t.name"
            }
            TagOwner::Article(_) => {
                "SELECT t.name FROM tags AS t JOIN tags_articles AS l ON l.tag_id = t.id
                 WHERE l.article_id = ?1 ORDER BY t.name"
            }
        }
    }

    fn owner_id(&self) -> i64 {
        match self {
            TagOwner::Category(id) => *id,
            TagOwner::Article(id) => id.get(),
        }
    }
}

/// Session-scoped tag interner
#[derive(Debug, Default)]
pub struct TagRegistry {
    cache: HashMap<String, TagId>,
}

impl TagRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the id of `name`, inserting the tag on first use.
    ///
    /// Compare-and-insert is only atomic under the single-writer assumption.
    pub fn intern(&mut self, conn: &Connection, name: &str) -> rusqlite::Result<TagId> {
        if let Some(id) = self.cache.get(name) {
            return Ok(*id);
        }

        let existing: Option<TagId> = conn
            .query_row("SELECT id FROM tags WHERE name = ?1", params![name], |row| row.get(0))
            .optional()?;

        let id = match existing {
            Some(id) => id,
            None => {
                conn.execute("INSERT INTO tags (name) VALUES (?1)", params![name])?;
                conn.last_insert_rowid()
            }
        };

        self.cache.insert(name.to_string(), id);
        Ok(id)
    }

    /// Link a tag to its owner. Returns false if the link already existed.
    pub fn link(&self, conn: &Connection, tag_id: TagId, owner: TagOwner) -> rusqlite::Result<bool> {
        let changed = conn.execute(owner.link_sql(), params![tag_id, owner.owner_id()])?;
        Ok(changed > 0)
    }

    /// Names of the tags linked to `owner`, sorted
    pub fn names_for(&self, conn: &Connection, owner: TagOwner) -> rusqlite::Result<Vec<String>> {
        let mut stmt = conn.prepare(owner.names_sql())?;
        let names = stmt
            .query_map(params![owner.owner_id()], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names)
    }

    /// Number of distinct tags interned in this session
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
