//! Bookmark loading.
//!
//! Bookmarks name their article; the name is resolved against the store at
//! insert time. Unlike block references, an unknown name is fatal.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate};
use tracing::{debug, info};

use crate::domain::BookmarkInput;
use crate::error::{PackError, Result};
use crate::store::ContentStore;

use super::finalize::Finalized;

/// Insert every bookmark. Returns the number inserted.
pub fn load_bookmarks(
    store: &mut ContentStore,
    bookmarks: &[BookmarkInput],
    _finalized: &Finalized,
) -> Result<usize> {
    let mut seen = HashSet::new();

    for bookmark in bookmarks {
        let name = bookmark.article_name.as_str();
        if !is_valid_date(&bookmark.created_at) {
            return Err(PackError::InvalidBookmarkDate {
                article_name: name.to_string(),
                value: bookmark.created_at.clone(),
            });
        }

        let article_id = store
            .article_id_by_name(name)?
            .ok_or_else(|| PackError::DanglingBookmark {
                article_name: name.to_string(),
            })?;

        if !seen.insert(article_id) {
            return Err(PackError::DuplicateBookmark {
                article_name: name.to_string(),
            });
        }

        store.insert_bookmark(article_id, &bookmark.created_at)?;
        debug!(article = %name, %article_id, "Stored bookmark");
    }

    info!(count = bookmarks.len(), "Bookmarks loaded");
    Ok(bookmarks.len())
}

/// `YYYY-MM-DD` or RFC 3339
fn is_valid_date(value: &str) -> bool {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok() || DateTime::parse_from_rfc3339(value).is_ok()
}
