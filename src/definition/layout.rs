//! Form layouts: named, typed arrangements of field definitions

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ulid::Ulid;

use super::{
    check_enum_attr, check_field_list_tags, decode_payload, expect_object, new_id, require_text, Definition,
    DefinitionKind,
};
use crate::error::{DefinitionError, Result};
use crate::field::{validate_field_list, FieldDefinition};

/// Layout type.
///
/// Only `form-group` and `box-layout` can be created. `grid-layout` appears in
/// older stored data and is still read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutType {
    FormGroup,
    BoxLayout,
    GridLayout,
}

impl LayoutType {
    pub const NAMES: &'static [&'static str] = &["form-group", "box-layout", "grid-layout"];
    pub const CREATABLE: &'static [&'static str] = &["form-group", "box-layout"];

    pub fn as_str(&self) -> &'static str {
        match self {
            LayoutType::FormGroup => "form-group",
            LayoutType::BoxLayout => "box-layout",
            LayoutType::GridLayout => "grid-layout",
        }
    }

    pub fn is_creatable(&self) -> bool {
        Self::CREATABLE.contains(&self.as_str())
    }
}

impl fmt::Display for LayoutType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormLayout {
    #[serde(default = "new_id")]
    pub id: Ulid,
    pub layout_name: String,
    pub layout_type: LayoutType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
    /// Renderer-specific arrangement settings, stored verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout_config: Option<Value>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl FormLayout {
    pub fn new(layout_name: impl Into<String>, layout_type: LayoutType) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            layout_name: layout_name.into(),
            layout_type,
            category: None,
            fields: Vec::new(),
            layout_config: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_fields(mut self, fields: Vec<FieldDefinition>) -> Self {
        self.fields = fields;
        self
    }
}

impl Definition for FormLayout {
    const KIND: DefinitionKind = DefinitionKind::FormLayout;

    fn id(&self) -> Ulid {
        self.id
    }

    fn key(&self) -> &str {
        &self.layout_name
    }

    fn decode(raw: &Value) -> Result<Self> {
        let obj = expect_object(raw, "formLayout")?;
        check_enum_attr(obj, "layoutType", LayoutType::NAMES)?;
        check_field_list_tags(obj.get("fields"), "fields")?;
        decode_payload(raw, "formLayout")
    }

    fn normalize(&mut self) {
        self.layout_name = Self::KIND.normalize_key(&self.layout_name);
    }

    fn validate(&self) -> Result<()> {
        require_text(&self.layout_name, "layoutName")?;
        validate_field_list(&self.fields, "fields")
    }

    fn validate_new(&self) -> Result<()> {
        if !self.layout_type.is_creatable() {
            return Err(DefinitionError::invalid_enum(
                "layoutType",
                self.layout_type.as_str(),
                LayoutType::CREATABLE,
            ));
        }
        Ok(())
    }

    fn stamp_created(&mut self, now: DateTime<Utc>) {
        self.id = new_id();
        self.created_at = now;
        self.updated_at = now;
    }

    fn stamp_updated(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    fn type_tag(&self) -> Option<&str> {
        Some(self.layout_type.as_str())
    }

    fn search_text(&self) -> Vec<&str> {
        vec![self.layout_name.as_str()]
    }

    fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    fn categories(defs: &[Self]) -> Vec<String> {
        defs.iter()
            .filter_map(|d| d.category.as_deref())
            .filter(|c| !c.trim().is_empty())
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_layout() {
        let layout = FormLayout::decode(&json!({
            "layoutName": "Address block",
            "layoutType": "box-layout",
            "category": "Contact",
            "fields": [
                {"id": "street", "label": "Street", "type": "text", "width": "full"},
                {"id": "zip", "label": "Postcode", "type": "text", "width": "half"}
            ],
            "layoutConfig": {"columns": 2}
        }))
        .unwrap();
        assert_eq!(layout.layout_type, LayoutType::BoxLayout);
        assert_eq!(layout.fields.len(), 2);
        layout.validate().unwrap();
        layout.validate_new().unwrap();
    }

    #[test]
    fn test_unknown_layout_type() {
        let err = FormLayout::decode(&json!({"layoutName": "x", "layoutType": "flex"})).unwrap_err();
        assert!(matches!(err, DefinitionError::InvalidEnum { .. }));
        assert_eq!(err.field(), Some("layoutType"));
    }

    #[test]
    fn test_legacy_grid_layout_reads_but_cannot_be_created() {
        let layout = FormLayout::decode(&json!({"layoutName": "old", "layoutType": "grid-layout"})).unwrap();
        assert_eq!(layout.layout_type, LayoutType::GridLayout);
        layout.validate().unwrap();
        let err = layout.validate_new().unwrap_err();
        assert!(matches!(err, DefinitionError::InvalidEnum { .. }));
    }

    #[test]
    fn test_categories_drop_empty() {
        let defs = vec![
            FormLayout::new("a", LayoutType::FormGroup).with_category("Contact"),
            FormLayout::new("b", LayoutType::FormGroup),
            FormLayout::new("c", LayoutType::FormGroup).with_category(""),
            FormLayout::new("d", LayoutType::BoxLayout).with_category("Billing"),
            FormLayout::new("e", LayoutType::BoxLayout).with_category("Contact"),
        ];
        assert_eq!(FormLayout::categories(&defs), vec!["Billing", "Contact"]);
    }
}
