//! Field definitions
//!
//! A [`FieldDefinition`] describes one form field. The same value type is
//! embedded by value in layouts, templates and forms. The kind-specific part
//! lives in [`FieldSpec`], a closed tagged union keyed by the JSON `type`
//! attribute, so every place that interprets a field matches exhaustively.
//!
//! ```text
//! {
//!   "id": "f1", "label": "Country", "type": "dropdown",
//!   "customFieldId": "country", "width": "half"
//! }
//! ```

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Number, Value};

use crate::error::{DefinitionError, Result};
use crate::table::TableAttrs;

/// The recognized field kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Number,
    Email,
    Date,
    Dropdown,
    Radio,
    Checkbox,
    Heading,
    Divider,
    Spacer,
    Table,
}

impl FieldKind {
    pub const ALL: [FieldKind; 11] = [
        FieldKind::Text,
        FieldKind::Number,
        FieldKind::Email,
        FieldKind::Date,
        FieldKind::Dropdown,
        FieldKind::Radio,
        FieldKind::Checkbox,
        FieldKind::Heading,
        FieldKind::Divider,
        FieldKind::Spacer,
        FieldKind::Table,
    ];

    /// Wire name of this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Number => "number",
            FieldKind::Email => "email",
            FieldKind::Date => "date",
            FieldKind::Dropdown => "dropdown",
            FieldKind::Radio => "radio",
            FieldKind::Checkbox => "checkbox",
            FieldKind::Heading => "heading",
            FieldKind::Divider => "divider",
            FieldKind::Spacer => "spacer",
            FieldKind::Table => "table",
        }
    }

    /// Wire names of every kind, in declaration order
    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|k| k.as_str()).collect()
    }

    /// Parse a wire name, reporting failures against `attr`
    pub fn parse_attr(value: &str, attr: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == value)
            .ok_or_else(|| DefinitionError::invalid_enum(attr, value, &Self::names()))
    }

    /// Kinds whose selectable options come from inline options or a LOV
    pub fn is_choice(&self) -> bool {
        matches!(self, FieldKind::Dropdown | FieldKind::Radio | FieldKind::Checkbox)
    }

    /// Kinds that are purely presentational and capture no value
    pub fn is_decorative(&self) -> bool {
        matches!(self, FieldKind::Heading | FieldKind::Divider | FieldKind::Spacer)
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldKind {
    type Err = DefinitionError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_attr(s, "type")
    }
}

/// Advisory width hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Width {
    Full,
    Half,
}

/// A selectable option with a distinct stored value and display label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: String,
    #[serde(default)]
    pub label: String,
}

/// An inline option as authored: either a bare string or a value/label pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionEntry {
    Plain(String),
    Labeled(SelectOption),
}

impl OptionEntry {
    pub fn value(&self) -> &str {
        match self {
            OptionEntry::Plain(s) => s,
            OptionEntry::Labeled(o) => &o.value,
        }
    }

    /// Display label; a bare string or an unlabeled pair shows its value
    pub fn label(&self) -> &str {
        match self {
            OptionEntry::Plain(s) => s,
            OptionEntry::Labeled(o) if o.label.is_empty() => &o.value,
            OptionEntry::Labeled(o) => &o.label,
        }
    }
}

impl From<&str> for OptionEntry {
    fn from(s: &str) -> Self {
        OptionEntry::Plain(s.to_string())
    }
}

/// `number` attributes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumberAttrs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
}

/// `date` attributes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateAttrs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

/// Option source for `dropdown`, `radio` and `checkbox`.
///
/// When `custom_field_id` is present it is authoritative and `options` is only
/// a cached snapshot of the referenced list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceAttrs {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_field_id: Option<String>,
}

impl ChoiceAttrs {
    pub fn inline<I, T>(options: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<OptionEntry>,
    {
        Self {
            options: options.into_iter().map(Into::into).collect(),
            custom_field_id: None,
        }
    }

    pub fn referenced(custom_field_id: impl Into<String>) -> Self {
        Self {
            options: Vec::new(),
            custom_field_id: Some(custom_field_id.into()),
        }
    }

    /// The LOV reference, ignoring blank values
    pub fn reference(&self) -> Option<&str> {
        self.custom_field_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeadingTag {
    H1,
    #[default]
    H2,
    H3,
    H4,
    H5,
    H6,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

/// `heading` attributes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadingAttrs {
    #[serde(default)]
    pub tag: HeadingTag,
    #[serde(default)]
    pub align: Align,
}

/// Kind-specific part of a field definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldSpec {
    Text,
    Number(NumberAttrs),
    Email,
    Date(DateAttrs),
    Dropdown(ChoiceAttrs),
    Radio(ChoiceAttrs),
    Checkbox(ChoiceAttrs),
    Heading(HeadingAttrs),
    Divider,
    Spacer,
    Table(TableAttrs),
}

impl FieldSpec {
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldSpec::Text => FieldKind::Text,
            FieldSpec::Number(_) => FieldKind::Number,
            FieldSpec::Email => FieldKind::Email,
            FieldSpec::Date(_) => FieldKind::Date,
            FieldSpec::Dropdown(_) => FieldKind::Dropdown,
            FieldSpec::Radio(_) => FieldKind::Radio,
            FieldSpec::Checkbox(_) => FieldKind::Checkbox,
            FieldSpec::Heading(_) => FieldKind::Heading,
            FieldSpec::Divider => FieldKind::Divider,
            FieldSpec::Spacer => FieldKind::Spacer,
            FieldSpec::Table(_) => FieldKind::Table,
        }
    }

    /// Option source, for the choice kinds
    pub fn choice(&self) -> Option<&ChoiceAttrs> {
        match self {
            FieldSpec::Dropdown(c) | FieldSpec::Radio(c) | FieldSpec::Checkbox(c) => Some(c),
            FieldSpec::Text
            | FieldSpec::Number(_)
            | FieldSpec::Email
            | FieldSpec::Date(_)
            | FieldSpec::Heading(_)
            | FieldSpec::Divider
            | FieldSpec::Spacer
            | FieldSpec::Table(_) => None,
        }
    }
}

/// A single form field description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    /// Stable identifier, unique within the containing field list
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub helper: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<Width>,
    /// Layout hints are carried as written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width_percent: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width_columns: Option<Number>,
    /// `Some(Value::Null)` is an explicit `"default": null`
    #[serde(
        rename = "default",
        default,
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub default_value: Option<Value>,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub readonly: bool,
    #[serde(flatten)]
    pub spec: FieldSpec,
}

impl FieldDefinition {
    /// Create a field with no optional attributes set
    pub fn new(id: impl Into<String>, label: impl Into<String>, spec: FieldSpec) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            placeholder: None,
            helper: None,
            required: false,
            width: None,
            width_percent: None,
            width_columns: None,
            default_value: None,
            disabled: false,
            readonly: false,
            spec,
        }
    }

    pub fn kind(&self) -> FieldKind {
        self.spec.kind()
    }

    /// LOV reference carried by a choice field
    pub fn custom_field_id(&self) -> Option<&str> {
        self.spec.choice().and_then(ChoiceAttrs::reference)
    }

    pub fn table(&self) -> Option<&TableAttrs> {
        match &self.spec {
            FieldSpec::Table(t) => Some(t),
            _ => None,
        }
    }

    /// Validate this field as a top-level definition
    pub fn validate(&self) -> Result<()> {
        self.validate_at("")
    }

    /// Validate with every reported attribute prefixed by `prefix`
    pub(crate) fn validate_at(&self, prefix: &str) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(DefinitionError::validation(attr(prefix, "id"), "must not be empty"));
        }

        let kind = self.kind();
        if !matches!(kind, FieldKind::Divider | FieldKind::Spacer) && self.label.trim().is_empty() {
            return Err(DefinitionError::validation(
                attr(prefix, "label"),
                format!("{} fields require a label", kind),
            ));
        }

        match &self.spec {
            FieldSpec::Number(n) => self.validate_number(n, prefix),
            FieldSpec::Date(d) => validate_date(d, prefix),
            FieldSpec::Dropdown(c) | FieldSpec::Radio(c) | FieldSpec::Checkbox(c) => validate_choice(c, kind, prefix),
            FieldSpec::Table(t) => t.validate_columns(prefix),
            FieldSpec::Text
            | FieldSpec::Email
            | FieldSpec::Heading(_)
            | FieldSpec::Divider
            | FieldSpec::Spacer => Ok(()),
        }
    }

    fn validate_number(&self, n: &NumberAttrs, prefix: &str) -> Result<()> {
        if let (Some(min), Some(max)) = (n.min, n.max) {
            if min > max {
                return Err(DefinitionError::validation(
                    attr(prefix, "min"),
                    format!("min {} is greater than max {}", min, max),
                ));
            }
        }
        if let Some(step) = n.step {
            if step <= 0.0 {
                return Err(DefinitionError::validation(attr(prefix, "step"), "must be positive"));
            }
        }
        match &self.default_value {
            Some(v) if !v.is_number() && !v.is_null() => Err(DefinitionError::validation(
                attr(prefix, "default"),
                "number fields take a numeric default",
            )),
            _ => Ok(()),
        }
    }
}

fn validate_date(d: &DateAttrs, prefix: &str) -> Result<()> {
    let parse = |s: &Option<String>| {
        s.as_deref()
            .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
    };
    // Bounds in other formats are interpreted by the renderer
    if let (Some(min), Some(max)) = (parse(&d.min_date), parse(&d.max_date)) {
        if min > max {
            return Err(DefinitionError::validation(
                attr(prefix, "minDate"),
                format!("minDate {} is after maxDate {}", min, max),
            ));
        }
    }
    Ok(())
}

fn validate_choice(c: &ChoiceAttrs, kind: FieldKind, prefix: &str) -> Result<()> {
    if c.custom_field_id.is_some() && c.reference().is_none() {
        return Err(DefinitionError::validation(
            attr(prefix, "customFieldId"),
            "must not be blank",
        ));
    }
    if c.options.is_empty() && c.reference().is_none() {
        return Err(DefinitionError::validation(
            attr(prefix, "options"),
            format!("{} fields require inline options or a customFieldId", kind),
        ));
    }
    Ok(())
}

// A present key, null included, decodes to `Some`; only a missing key is `None`.
fn present_value<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

pub(crate) fn attr(prefix: &str, name: &str) -> String {
    format!("{}{}", prefix, name)
}

/// Check the `type` tag of a raw field (and of table columns) before decoding,
/// so an unrecognized kind is reported as an enumeration violation rather than
/// an opaque decode error.
pub(crate) fn check_kind_tags(raw: &Value, prefix: &str) -> Result<()> {
    let obj = raw.as_object().ok_or_else(|| {
        DefinitionError::validation(
            if prefix.is_empty() { "field".to_string() } else { prefix.trim_end_matches('.').to_string() },
            "field definition must be an object",
        )
    })?;

    let kind = match obj.get("type") {
        Some(Value::String(s)) => FieldKind::parse_attr(s, &attr(prefix, "type"))?,
        Some(_) => return Err(DefinitionError::validation(attr(prefix, "type"), "must be a string")),
        None => return Err(DefinitionError::validation(attr(prefix, "type"), "is required")),
    };

    if kind == FieldKind::Table {
        match obj.get("columns") {
            Some(Value::Array(columns)) => {
                for (i, column) in columns.iter().enumerate() {
                    check_column_tag(column, &format!("{}columns[{}].", prefix, i))?;
                }
            }
            Some(Value::Null) | None => {}
            Some(_) => {
                return Err(DefinitionError::validation(attr(prefix, "columns"), "must be an array"))
            }
        }
    }
    Ok(())
}

// Columns are checked one level only; nested tables are rejected by typed validation.
fn check_column_tag(raw: &Value, prefix: &str) -> Result<()> {
    match raw.get("type") {
        Some(Value::String(s)) => FieldKind::parse_attr(s, &attr(prefix, "type")).map(|_| ()),
        _ => check_kind_tags(raw, prefix),
    }
}

/// Decode and validate a single raw field description
pub fn validate_field_definition(raw: &Value) -> Result<FieldDefinition> {
    check_kind_tags(raw, "")?;
    let field: FieldDefinition = serde_json::from_value(raw.clone()).map_err(|e| {
        DefinitionError::validation(crate::definition::serde_error_field(&e, "field"), e.to_string())
    })?;
    field.validate()?;
    Ok(field)
}

/// Decode and validate a raw field list stored under `attr_name`
pub fn parse_field_list(raw: &Value, attr_name: &str) -> Result<Vec<FieldDefinition>> {
    let items = match raw {
        Value::Null => return Ok(Vec::new()),
        Value::Array(items) => items,
        _ => return Err(DefinitionError::validation(attr_name, "must be an array")),
    };
    let mut fields = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let prefix = format!("{}[{}].", attr_name, i);
        check_kind_tags(item, &prefix)?;
        let field: FieldDefinition = serde_json::from_value(item.clone())
            .map_err(|e| DefinitionError::validation(prefix.trim_end_matches('.'), e.to_string()))?;
        fields.push(field);
    }
    validate_field_list(&fields, attr_name)?;
    Ok(fields)
}

/// Validate every field in a list and the uniqueness of their ids
pub fn validate_field_list(fields: &[FieldDefinition], attr_name: &str) -> Result<()> {
    for (i, field) in fields.iter().enumerate() {
        field.validate_at(&format!("{}[{}].", attr_name, i))?;
    }
    ensure_unique_ids(fields, attr_name)
}

pub(crate) fn ensure_unique_ids(fields: &[FieldDefinition], attr_name: &str) -> Result<()> {
    let mut seen = HashSet::new();
    for (i, field) in fields.iter().enumerate() {
        if !seen.insert(field.id.as_str()) {
            return Err(DefinitionError::validation(
                format!("{}[{}].id", attr_name, i),
                format!("duplicate field id '{}'", field.id),
            ));
        }
    }
    Ok(())
}
