//! Table (composite) fields
//!
//! A `table` field's schema is an ordered list of column field definitions.
//! Nesting is capped at one level: a column can never itself be a table.
//! `rows` is captured instance data keyed by column id and is carried as-is.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{DefinitionError, Result};
use crate::field::{ensure_unique_ids, FieldDefinition, FieldKind};

/// One captured row: column id to value
pub type TableRow = Map<String, Value>;

/// `table` attributes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableAttrs {
    #[serde(default)]
    pub columns: Vec<FieldDefinition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rows: Vec<TableRow>,
}

impl TableAttrs {
    pub fn new(columns: Vec<FieldDefinition>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn column(&self, id: &str) -> Option<&FieldDefinition> {
        self.columns.iter().find(|c| c.id == id)
    }

    /// Columns whose options come from a Custom Field
    pub fn lov_columns(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.columns.iter().filter(|c| c.custom_field_id().is_some())
    }

    pub(crate) fn validate_columns(&self, prefix: &str) -> Result<()> {
        if self.columns.is_empty() {
            return Err(DefinitionError::validation(
                format!("{}columns", prefix),
                "table fields require at least one column",
            ));
        }
        for (i, column) in self.columns.iter().enumerate() {
            let column_prefix = format!("{}columns[{}].", prefix, i);
            if column.kind() == FieldKind::Table {
                return Err(DefinitionError::validation(
                    format!("{}type", column_prefix),
                    "table columns cannot themselves be tables",
                ));
            }
            column.validate_at(&column_prefix)?;
        }
        ensure_unique_ids(&self.columns, &format!("{}columns", prefix))
    }
}
