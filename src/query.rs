//! Listing projections: filtering, category enumeration and name suggestions
//!
//! All projections are read-only and tolerate zero matches.

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::definition::Definition;
use crate::error::{DefinitionError, Result};

/// Listing filter. Absent and blank criteria both mean "all".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefinitionFilter {
    /// Exact category match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Case-insensitive substring over the kind's searchable attributes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    /// Exact match on the kind's type attribute (`layoutType`, `dataType`)
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind_type: Option<String>,
    /// Exact `collectionName` match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_name: Option<String>,
}

impl DefinitionFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn kind_type(mut self, kind_type: impl Into<String>) -> Self {
        self.kind_type = Some(kind_type.into());
        self
    }

    pub fn collection_name(mut self, name: impl Into<String>) -> Self {
        self.collection_name = Some(name.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        [&self.category, &self.search, &self.kind_type, &self.collection_name]
            .into_iter()
            .all(|c| given(c).is_none())
    }
}

fn given(criterion: &Option<String>) -> Option<&str> {
    criterion.as_deref().filter(|s| !s.trim().is_empty())
}

fn search_pattern(term: &str) -> Result<Regex> {
    RegexBuilder::new(&regex::escape(term))
        .case_insensitive(true)
        .build()
        .map_err(|e| DefinitionError::validation("search", e.to_string()))
}

/// Keep the definitions matching every supplied criterion, in input order.
///
/// A category filter on a kind without categories matches nothing.
pub fn filter_definitions<D, I>(defs: I, filter: &DefinitionFilter) -> Result<Vec<D>>
where
    D: Definition,
    I: IntoIterator<Item = D>,
{
    let pattern = given(&filter.search).map(search_pattern).transpose()?;
    let category = given(&filter.category);
    let kind_type = given(&filter.kind_type);
    let collection = given(&filter.collection_name);

    Ok(defs
        .into_iter()
        .filter(|def| category.map_or(true, |c| def.category() == Some(c)))
        .filter(|def| kind_type.map_or(true, |t| def.type_tag() == Some(t)))
        .filter(|def| collection.map_or(true, |c| def.collection_name() == Some(c)))
        .filter(|def| {
            pattern
                .as_ref()
                .map_or(true, |re| def.search_text().iter().any(|text| re.is_match(text)))
        })
        .collect())
}

/// Distinct categories for a kind, following that kind's own rules
pub fn category_enumeration<D: Definition>(defs: &[D]) -> Vec<String> {
    D::categories(defs)
}

/// Rank `names` by fuzzy similarity to `query`, best first
pub fn suggest_names<'a, I>(names: I, query: &str, limit: usize) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let matcher = SkimMatcherV2::default().ignore_case();
    let mut scored: Vec<(i64, &str)> = names
        .into_iter()
        .filter_map(|name| matcher.fuzzy_match(name, query).map(|score| (score, name)))
        .collect();

    scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));
    scored.into_iter().take(limit).map(|(_, name)| name.to_string()).collect()
}
