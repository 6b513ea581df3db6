//! Inline cross-article references.
//!
//! Block text may name another article with `[ref=<name>]`. Before storage
//! the name is replaced by the article's numeric id. A name that is not
//! registered becomes the empty reference `[ref=]`.
//!
//! Rewriting is not idempotent on its own output: a rewritten `[ref=1]` no
//! longer names an article and degrades to `[ref=]` if rewritten again. Each
//! text value must go through [`rewrite`] exactly once, after every article
//! has its id.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use tracing::debug;

use crate::domain::{ArticleId, ArticleIndex};
use crate::error::Result;

static REF_PATTERN: OnceLock<Regex> = OnceLock::new();

fn ref_pattern() -> Result<&'static Regex> {
    if let Some(pattern) = REF_PATTERN.get() {
        return Ok(pattern);
    }
    let pattern = Regex::new(r"\[ref=(.*?)\]")?;
    Ok(REF_PATTERN.get_or_init(|| pattern))
}

/// Rewrite every reference marker in `text` against a name to id map
pub fn rewrite(text: &str, ids: &HashMap<String, ArticleId>) -> Result<String> {
    Ok(rewrite_with(ref_pattern()?, text, ids))
}

fn rewrite_with(pattern: &Regex, text: &str, ids: &HashMap<String, ArticleId>) -> String {
    let rewritten = pattern.replace_all(text, |caps: &Captures| {
        let name = caps[1].trim();
        match ids.get(name) {
            Some(id) => format!("[ref={}]", id),
            None => {
                debug!(reference = %name, "Unresolved article reference");
                "[ref=]".to_string()
            }
        }
    });

    match rewritten {
        Cow::Borrowed(_) => text.to_string(),
        Cow::Owned(owned) => owned,
    }
}

/// Reference rewriter bound to a complete [`ArticleIndex`]
#[derive(Debug, Clone, Copy)]
pub struct ReferenceResolver<'a> {
    pattern: &'static Regex,
    ids: &'a HashMap<String, ArticleId>,
}

impl<'a> ReferenceResolver<'a> {
    pub fn new(index: &'a ArticleIndex) -> Result<Self> {
        Ok(Self {
            pattern: ref_pattern()?,
            ids: index.names(),
        })
    }

    pub fn rewrite(&self, text: &str) -> String {
        rewrite_with(self.pattern, text, self.ids)
    }

    pub fn rewrite_opt(&self, text: Option<String>) -> Option<String> {
        text.map(|t| self.rewrite(&t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> HashMap<String, ArticleId> {
        [("Alpha", 0), ("Beta", 1)]
            .into_iter()
            .map(|(name, id)| (name.to_string(), ArticleId(id)))
            .collect()
    }

    #[test]
    fn test_known_name_becomes_id() {
        assert_eq!(rewrite("[ref=Alpha]", &ids()).unwrap(), "[ref=0]");
        assert_eq!(
            rewrite("see [ref=Beta] and [ref=Alpha].", &ids()).unwrap(),
            "see [ref=1] and [ref=0]."
        );
    }

    #[test]
    fn test_unknown_name_becomes_empty_reference() {
        assert_eq!(rewrite("[ref=Gamma]", &ids()).unwrap(), "[ref=]");
        assert_eq!(rewrite("[ref=]", &ids()).unwrap(), "[ref=]");
    }

    #[test]
    fn test_names_are_trimmed() {
        assert_eq!(rewrite("[ref= Beta ]", &ids()).unwrap(), "[ref=1]");
    }

    #[test]
    fn test_text_without_markers_is_unchanged() {
        assert_eq!(rewrite("no references [here]", &ids()).unwrap(), "no references [here]");
    }

    #[test]
    fn test_second_rewrite_degrades_markers() {
        let once = rewrite("[ref=Beta]", &ids()).unwrap();
        assert_eq!(once, "[ref=1]");
        assert_eq!(rewrite(&once, &ids()).unwrap(), "[ref=]");
    }

    #[test]
    fn test_resolver_uses_index() {
        let index: ArticleIndex = ["alpha", "beta"].into_iter().collect();
        let resolver = ReferenceResolver::new(&index).unwrap();

        assert_eq!(resolver.rewrite("[ref=beta]"), "[ref=1]");
        assert_eq!(resolver.rewrite_opt(Some("[ref=alpha]".to_string())), Some("[ref=0]".to_string()));
        assert_eq!(resolver.rewrite_opt(None), None);
    }

    #[test]
    fn test_pattern_is_compiled_once() {
        let first = ref_pattern().unwrap();
        let second = ref_pattern().unwrap();
        assert!(std::ptr::eq(first, second));
    }
}
