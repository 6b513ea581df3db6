//! Article identity and lifecycle.
//!
//! An article enters the store as a [`RawArticle`] carrying its unparsed
//! content list. Normalization consumes it by value and leaves only an
//! [`ArticleStub`], which has no content field to read back.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Article identifier, dense from 0 in ingestion order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArticleId(pub i64);

impl ArticleId {
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for ArticleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Finalized article row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleStub {
    pub id: ArticleId,
    pub name: String,
    pub icon: Option<String>,
    pub title: String,
    pub synopsis: String,
}

/// Article row that still owns its raw content list
#[derive(Debug, Clone)]
pub struct RawArticle {
    pub stub: ArticleStub,
    content: Vec<Value>,
}

impl RawArticle {
    pub fn new(stub: ArticleStub, content: Vec<Value>) -> Self {
        Self { stub, content }
    }

    pub fn id(&self) -> ArticleId {
        self.stub.id
    }

    pub fn name(&self) -> &str {
        &self.stub.name
    }

    /// Split into the finalized shape and the content list, consuming the raw article
    pub fn into_parts(self) -> (ArticleStub, Vec<Value>) {
        (self.stub, self.content)
    }
}

/// Name to identifier map, complete once every article stub is stored.
///
/// This is the hand-off between assigning identifiers and resolving
/// references: nothing may rewrite a reference until it exists in full.
#[derive(Debug, Clone, Default)]
pub struct ArticleIndex {
    ids: HashMap<String, ArticleId>,
    order: Vec<ArticleId>,
}

impl ArticleIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign the next identifier to `name`, or `None` if the name is taken
    pub fn assign(&mut self, name: &str) -> Option<ArticleId> {
        if self.ids.contains_key(name) {
            return None;
        }
        let id = ArticleId(self.order.len() as i64);
        self.ids.insert(name.to_string(), id);
        self.order.push(id);
        Some(id)
    }

    pub fn get(&self, name: &str) -> Option<ArticleId> {
        self.ids.get(name).copied()
    }

    /// Identifiers in ingestion order
    pub fn ids(&self) -> &[ArticleId] {
        &self.order
    }

    pub fn names(&self) -> &HashMap<String, ArticleId> {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for ArticleIndex {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut index = Self::new();
        for name in iter {
            index.assign(name.as_ref());
        }
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_dense_in_assignment_order() {
        let index: ArticleIndex = ["alpha", "beta", "gamma"].into_iter().collect();

        assert_eq!(index.get("alpha"), Some(ArticleId(0)));
        assert_eq!(index.get("beta"), Some(ArticleId(1)));
        assert_eq!(index.get("gamma"), Some(ArticleId(2)));
        assert_eq!(index.ids(), &[ArticleId(0), ArticleId(1), ArticleId(2)]);
    }

    #[test]
    fn test_duplicate_name_is_not_reassigned() {
        let mut index = ArticleIndex::new();
        assert_eq!(index.assign("alpha"), Some(ArticleId(0)));
        assert_eq!(index.assign("alpha"), None);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_into_parts_yields_stub_and_content() {
        let stub = ArticleStub {
            id: ArticleId(3),
            name: "alpha".to_string(),
            icon: Some("guides/g/icons/a.png".to_string()),
            title: "Alpha Guide".to_string(),
            synopsis: "About alpha".to_string(),
        };
        let raw = RawArticle::new(stub.clone(), vec![serde_json::json!({"type": "paragraph", "text": "x"})]);

        assert_eq!(raw.id(), ArticleId(3));
        let (finalized, content) = raw.into_parts();
        assert_eq!(finalized, stub);
        assert_eq!(content.len(), 1);
    }
}
