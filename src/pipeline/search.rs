//! Search index construction and queries.

use std::collections::BTreeMap;

use tracing::info;

use crate::domain::ArticleId;
use crate::error::Result;
use crate::store::{ContentStore, SearchEntry};

use super::finalize::Finalized;

/// Populate the search index from the normalized tables. Returns the row count.
pub fn build_search_index(store: &mut ContentStore, _finalized: &Finalized) -> Result<usize> {
    let rows = store.build_search_index()?;
    info!(rows, "Search index built");
    Ok(rows)
}

/// Full-text query; a blank query matches nothing
pub fn query(store: &ContentStore, text: &str, limit: usize) -> Result<Vec<SearchEntry>> {
    let text = text.trim();
    if text.is_empty() || limit == 0 {
        return Ok(Vec::new());
    }
    store.search(text, limit)
}

/// Hits grouped by article, each group in order key order
pub fn group_by_article(entries: Vec<SearchEntry>) -> BTreeMap<ArticleId, Vec<SearchEntry>> {
    let mut groups: BTreeMap<ArticleId, Vec<SearchEntry>> = BTreeMap::new();
    for entry in entries {
        groups.entry(entry.article_id).or_default().push(entry);
    }
    for group in groups.values_mut() {
        group.sort_by_key(|e| e.order_key);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(article: i64, order_key: i64) -> SearchEntry {
        SearchEntry {
            article_id: ArticleId(article),
            order_key,
            block_type: "paragraph".to_string(),
            block_id: None,
            text: String::new(),
        }
    }

    #[test]
    fn test_blank_query_returns_nothing() {
        let store = ContentStore::open_in_memory().unwrap();
        assert!(query(&store, "   ", 10).unwrap().is_empty());
        assert!(query(&store, "olive", 0).unwrap().is_empty());
    }

    #[test]
    fn test_group_by_article_orders_keys() {
        let groups = group_by_article(vec![entry(1, 0), entry(0, 2), entry(1, -2), entry(0, -1)]);

        let keys: Vec<(i64, Vec<i64>)> = groups
            .iter()
            .map(|(id, group)| (id.get(), group.iter().map(|e| e.order_key).collect()))
            .collect();
        assert_eq!(keys, vec![(0, vec![-1, 2]), (1, vec![-2, 0])]);
    }
}
