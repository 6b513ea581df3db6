//! Category and article stub ingestion.
//!
//! Article ingestion is the first phase of the pipeline: it assigns every
//! article its id and returns the complete [`ArticleIndex`]. Nothing resolves
//! references until that index exists.

use tracing::{debug, info};

use crate::assets::AssetNamespace;
use crate::domain::{distinct_tags, ArticleIndex, ArticleInput, ArticleStub, CategoryInput};
use crate::error::{PackError, Result};
use crate::store::{ContentStore, TagOwner};

/// Store categories and link their tags. Returns the number stored.
pub fn ingest_categories(
    store: &mut ContentStore,
    categories: &[CategoryInput],
    assets: &AssetNamespace,
) -> Result<usize> {
    for category in categories {
        let icon = category.icon.as_deref().map(|icon| assets.rewrite(icon));
        let category_id =
            store.create_category(&category.name, icon.as_deref(), category.description.as_deref())?;

        for tag in distinct_tags(&category.tags) {
            let tag_id = store.intern_tag(tag)?;
            store.link_tag(tag_id, TagOwner::Category(category_id))?;
        }
        debug!(category = %category.name, tags = category.tags.len(), "Stored category");
    }

    info!(count = categories.len(), "Categories ingested");
    Ok(categories.len())
}

/// Store article stubs with their raw content and link their tags.
///
/// Ids are assigned densely from 0 in input order.
pub fn ingest_articles(
    store: &mut ContentStore,
    articles: Vec<ArticleInput>,
    assets: &AssetNamespace,
) -> Result<ArticleIndex> {
    let mut index = ArticleIndex::new();

    for article in articles {
        let id = index
            .assign(&article.name)
            .ok_or_else(|| PackError::DuplicateArticle {
                name: article.name.clone(),
            })?;

        let stub = ArticleStub {
            id,
            name: article.name,
            icon: article.icon.as_deref().map(|icon| assets.rewrite(icon)),
            title: article.title,
            synopsis: article.synopsis,
        };
        store.create_article_stub(&stub, &article.content)?;

        for tag in distinct_tags(&article.tags) {
            let tag_id = store.intern_tag(tag)?;
            store.link_tag(tag_id, TagOwner::Article(id))?;
        }
        debug!(article = %stub.name, %id, blocks = article.content.len(), "Stored article stub");
    }

    info!(count = index.len(), "Article ids assigned");
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ArticleId;

    fn article(name: &str, tags: &[&str]) -> ArticleInput {
        ArticleInput {
            name: name.to_string(),
            icon: Some(format!("icons/{}.png", name)),
            title: format!("{} title", name),
            synopsis: String::new(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            content: Vec::new(),
        }
    }

    #[test]
    fn test_tags_are_interned_across_owners() {
        let mut store = ContentStore::open_in_memory().unwrap();
        let assets = AssetNamespace::new("guides", "lisbon");
        let categories = vec![CategoryInput {
            name: "Food".to_string(),
            icon: None,
            description: None,
            tags: vec!["food".to_string(), "food".to_string(), "drink".to_string()],
        }];

        ingest_categories(&mut store, &categories, &assets).unwrap();
        ingest_articles(
            &mut store,
            vec![article("alpha", &["food"]), article("beta", &["food", "walks"])],
            &assets,
        )
        .unwrap();

        // the repeated tag inside one category links once
        assert_eq!(store.count("tags").unwrap(), 3);
        assert_eq!(store.count("tags_categories").unwrap(), 2);
        assert_eq!(store.count("tags_articles").unwrap(), 3);
    }

    #[test]
    fn test_article_ids_and_icons() {
        let mut store = ContentStore::open_in_memory().unwrap();
        let assets = AssetNamespace::new("guides", "lisbon");

        let index = ingest_articles(
            &mut store,
            vec![article("alpha", &[]), article("beta", &[])],
            &assets,
        )
        .unwrap();

        assert_eq!(index.get("beta"), Some(ArticleId(1)));
        let stored = store.articles().unwrap();
        assert_eq!(stored[1].id, ArticleId(1));
        assert_eq!(stored[0].icon.as_deref(), Some("guides/lisbon/icons/alpha.png"));
    }

    #[test]
    fn test_duplicate_article_name_is_rejected() {
        let mut store = ContentStore::open_in_memory().unwrap();
        let assets = AssetNamespace::new("guides", "lisbon");

        let result = ingest_articles(
            &mut store,
            vec![article("alpha", &[]), article("alpha", &[])],
            &assets,
        );
        assert!(matches!(result, Err(PackError::DuplicateArticle { name }) if name == "alpha"));
    }
}
