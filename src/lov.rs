//! List-of-values resolution
//!
//! A choice field gets its options in one of two ways:
//!
//! 1. **Inline**: the field carries literal options, returned unchanged.
//! 2. **Referenced**: the field carries a `customFieldId`. The Custom Field with
//!    that name is looked up and its LOV items are projected to
//!    `{value: code, label: shortName}` pairs, Active items only, in stored order.
//!
//! A reference to a Custom Field that no longer exists resolves to an empty list
//! flagged as dangling. It is never an error, so forms built against a deleted
//! field keep rendering.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::definition::CustomField;
use crate::error::Result;
use crate::field::{ChoiceAttrs, FieldDefinition, FieldSpec, OptionEntry, SelectOption};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LovStatus {
    #[default]
    Active,
    Inactive,
}

impl LovStatus {
    pub const NAMES: &'static [&'static str] = &["Active", "Inactive"];
}

/// Where a Custom Field's items come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LovType {
    /// Items are maintained in the registry
    UserDefined,
    /// Items are supplied by an external source at render time; stored items
    /// are only a fallback
    Api,
}

impl LovType {
    pub const NAMES: &'static [&'static str] = &["user-defined", "api"];
}

/// One managed value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LovItem {
    pub code: String,
    pub short_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seamless_mapping: Option<String>,
    #[serde(default)]
    pub status: LovStatus,
}

impl LovItem {
    pub fn new(code: impl Into<String>, short_name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            short_name: short_name.into(),
            description: None,
            seamless_mapping: None,
            status: LovStatus::Active,
        }
    }

    pub fn inactive(mut self) -> Self {
        self.status = LovStatus::Inactive;
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == LovStatus::Active
    }

    pub fn to_option(&self) -> OptionEntry {
        OptionEntry::Labeled(SelectOption {
            value: self.code.clone(),
            label: self.short_name.clone(),
        })
    }
}

/// Which LOV items are eligible for resolution
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    ActiveOnly,
    All,
}

impl StatusFilter {
    fn admits(&self, item: &LovItem) -> bool {
        match self {
            StatusFilter::ActiveOnly => item.is_active(),
            StatusFilter::All => true,
        }
    }
}

/// How a resolved option list was obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionSource {
    /// The field is not a choice field
    NotApplicable,
    Inline,
    Referenced {
        custom_field_id: String,
        lov_type: Option<LovType>,
    },
    /// The referenced Custom Field does not exist
    Dangling { custom_field_id: String },
}

/// Resolved options for one field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionList {
    pub source: OptionSource,
    pub options: Vec<OptionEntry>,
}

impl OptionList {
    fn empty(source: OptionSource) -> Self {
        Self {
            source,
            options: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// Whether the caller should surface a soft "missing list" warning
    pub fn is_dangling(&self) -> bool {
        matches!(self.source, OptionSource::Dangling { .. })
    }

    pub fn values(&self) -> Vec<&str> {
        self.options.iter().map(OptionEntry::value).collect()
    }
}

/// Looks up Custom Fields by `fieldName`
pub trait CustomFieldLookup {
    fn find_custom_field(&self, field_name: &str) -> Result<Option<CustomField>>;
}

impl<F> CustomFieldLookup for F
where
    F: Fn(&str) -> Option<CustomField>,
{
    fn find_custom_field(&self, field_name: &str) -> Result<Option<CustomField>> {
        Ok(self(field_name))
    }
}

/// Resolve a field's options, Active LOV items only
pub fn resolve_options<L>(field: &FieldDefinition, lookup: &L) -> Result<OptionList>
where
    L: CustomFieldLookup + ?Sized,
{
    resolve_options_with(field, lookup, StatusFilter::ActiveOnly)
}

/// Resolve a field's options with an explicit status filter
pub fn resolve_options_with<L>(field: &FieldDefinition, lookup: &L, filter: StatusFilter) -> Result<OptionList>
where
    L: CustomFieldLookup + ?Sized,
{
    match &field.spec {
        FieldSpec::Dropdown(choice) | FieldSpec::Radio(choice) | FieldSpec::Checkbox(choice) => {
            resolve_choice(&field.id, choice, lookup, filter)
        }
        FieldSpec::Text
        | FieldSpec::Number(_)
        | FieldSpec::Email
        | FieldSpec::Date(_)
        | FieldSpec::Heading(_)
        | FieldSpec::Divider
        | FieldSpec::Spacer
        | FieldSpec::Table(_) => Ok(OptionList::empty(OptionSource::NotApplicable)),
    }
}

fn resolve_choice<L>(field_id: &str, choice: &ChoiceAttrs, lookup: &L, filter: StatusFilter) -> Result<OptionList>
where
    L: CustomFieldLookup + ?Sized,
{
    let Some(reference) = choice.reference() else {
        return Ok(OptionList {
            source: OptionSource::Inline,
            options: choice.options.clone(),
        });
    };

    let Some(custom_field) = lookup.find_custom_field(reference)? else {
        warn!(field = %field_id, custom_field = %reference, "dangling LOV reference, resolving to no options");
        return Ok(OptionList::empty(OptionSource::Dangling {
            custom_field_id: reference.to_string(),
        }));
    };

    if custom_field.is_api_lov() {
        debug!(custom_field = %reference, "api LOV, stored items used as fallback");
    }

    let options = custom_field
        .lov_items
        .iter()
        .filter(|item| filter.admits(item))
        .map(LovItem::to_option)
        .collect();

    Ok(OptionList {
        source: OptionSource::Referenced {
            custom_field_id: reference.to_string(),
            lov_type: custom_field.lov_type,
        },
        options,
    })
}

/// Options resolved for one position in a field list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedField {
    /// Field id, or `table.column` for table columns
    pub path: String,
    pub options: OptionList,
}

/// Resolve every choice field in a list, including table columns
pub fn resolve_field_list<L>(fields: &[FieldDefinition], lookup: &L) -> Result<Vec<ResolvedField>>
where
    L: CustomFieldLookup + ?Sized,
{
    let mut resolved = Vec::new();
    for field in fields {
        if let Some(table) = field.table() {
            for column in &table.columns {
                if column.kind().is_choice() {
                    resolved.push(ResolvedField {
                        path: format!("{}.{}", field.id, column.id),
                        options: resolve_options(column, lookup)?,
                    });
                }
            }
        } else if field.kind().is_choice() {
            resolved.push(ResolvedField {
                path: field.id.clone(),
                options: resolve_options(field, lookup)?,
            });
        }
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{FieldKind, FieldSpec};
    use crate::table::TableAttrs;

    fn status_field() -> CustomField {
        CustomField::new("status", "Status", FieldKind::Dropdown).with_lov(
            LovType::UserDefined,
            vec![
                LovItem::new("A", "Alpha"),
                LovItem::new("B", "Beta").inactive(),
                LovItem::new("C", "Gamma"),
            ],
        )
    }

    fn lookup(name: &str) -> Option<CustomField> {
        (name == "status").then(status_field)
    }

    fn referencing(id: &str, custom_field_id: &str) -> FieldDefinition {
        FieldDefinition::new(id, "Status", FieldSpec::Dropdown(ChoiceAttrs::referenced(custom_field_id)))
    }

    #[test]
    fn test_inline_options_unchanged() {
        let field = FieldDefinition::new(
            "size",
            "Size",
            FieldSpec::Radio(ChoiceAttrs::inline(["S", "M", "L"])),
        );
        let resolved = resolve_options(&field, &lookup).unwrap();
        assert_eq!(resolved.source, OptionSource::Inline);
        assert_eq!(resolved.values(), vec!["S", "M", "L"]);
    }

    #[test]
    fn test_referenced_active_only_in_order() {
        let resolved = resolve_options(&referencing("s", "status"), &lookup).unwrap();
        assert_eq!(resolved.values(), vec!["A", "C"]);
        assert_eq!(resolved.options[1].label(), "Gamma");
    }

    #[test]
    fn test_include_inactive_on_request() {
        let resolved = resolve_options_with(&referencing("s", "status"), &lookup, StatusFilter::All).unwrap();
        assert_eq!(resolved.values(), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_reference_is_authoritative_over_snapshot() {
        let mut choice = ChoiceAttrs::referenced("status");
        choice.options = vec!["stale".into()];
        let field = FieldDefinition::new("s", "Status", FieldSpec::Dropdown(choice));
        let resolved = resolve_options(&field, &lookup).unwrap();
        assert_eq!(resolved.values(), vec!["A", "C"]);
    }

    #[test]
    fn test_dangling_reference_is_empty_not_error() {
        let resolved = resolve_options(&referencing("s", "deleted"), &lookup).unwrap();
        assert!(resolved.is_empty());
        assert!(resolved.is_dangling());
    }

    #[test]
    fn test_api_lov_uses_fallback_items() {
        let api = |_: &str| {
            Some(
                CustomField::new("country", "Country", FieldKind::Dropdown)
                    .with_lov(LovType::Api, vec![LovItem::new("NL", "Netherlands")]),
            )
        };
        let resolved = resolve_options(&referencing("c", "country"), &api).unwrap();
        assert_eq!(
            resolved.source,
            OptionSource::Referenced {
                custom_field_id: "country".into(),
                lov_type: Some(LovType::Api)
            }
        );
        assert_eq!(resolved.values(), vec!["NL"]);
    }

    #[test]
    fn test_non_choice_field() {
        let field = FieldDefinition::new("n", "Name", FieldSpec::Text);
        let resolved = resolve_options(&field, &lookup).unwrap();
        assert_eq!(resolved.source, OptionSource::NotApplicable);
    }

    #[test]
    fn test_resolve_table_columns() {
        let table = FieldDefinition::new(
            "rows",
            "Rows",
            FieldSpec::Table(TableAttrs::new(vec![
                referencing("state", "status"),
                FieldDefinition::new("note", "Note", FieldSpec::Text),
                referencing("gone", "missing"),
            ])),
        );
        let resolved = resolve_field_list(&[table], &lookup).unwrap();
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].path, "rows.state");
        assert_eq!(resolved[0].options.values(), vec!["A", "C"]);
        assert!(resolved[1].options.is_dangling());
    }
}
