//! Definition auditing
//!
//! Checks the reference hygiene of stored field lists. Deleting a Custom Field
//! never cascades, so stored forms, layouts and templates drift over time.
//!
//! ## Checks
//! 1. **DANGLING_REFERENCE** (warning): `customFieldId` names no Custom Field
//! 2. **STALE_OPTION_SNAPSHOT** (warning): cached inline options differ from the
//!    currently resolved Active options
//! 3. **API_LOV_WITHOUT_FALLBACK** (warning): reference to an `api` list with no
//!    stored items to fall back on
//! 4. **DUPLICATE_FIELD_ID** (error): an id repeated within one field list or
//!    one table's columns

use std::collections::HashSet;

use crate::definition::{Definition, Form, FormLayout, Template};
use crate::error::Result;
use crate::field::{ChoiceAttrs, FieldDefinition};
use crate::lov::CustomFieldLookup;
use crate::registry::DefinitionRegistry;
use crate::store::DefinitionStore;

/// Result of auditing one definition
#[derive(Debug, Default)]
pub struct AuditResult {
    /// `kind name`, e.g. `form CONTACT US`
    pub subject: String,
    pub errors: Vec<AuditFinding>,
    pub warnings: Vec<AuditFinding>,
}

impl AuditResult {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    fn warn(&mut self, code: &'static str, path: String, message: String) {
        self.warnings.push(AuditFinding { code, message, path });
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditFinding {
    pub code: &'static str,
    pub message: String,
    /// Field id, or `table.column`
    pub path: String,
}

/// Audits field lists against a Custom Field lookup
pub struct DefinitionAuditor<'a, L: ?Sized> {
    lookup: &'a L,
}

impl<'a, L> DefinitionAuditor<'a, L>
where
    L: CustomFieldLookup + ?Sized,
{
    pub fn new(lookup: &'a L) -> Self {
        Self { lookup }
    }

    pub fn audit_definition<D: Definition>(&self, def: &D) -> Result<AuditResult> {
        self.audit_fields(format!("{} {}", D::KIND, def.key()), def.fields())
    }

    pub fn audit_fields(&self, subject: String, fields: &[FieldDefinition]) -> Result<AuditResult> {
        let mut result = AuditResult {
            subject,
            ..Default::default()
        };

        check_duplicate_ids(fields, "", &mut result);
        for field in fields {
            if let Some(table) = field.table() {
                let prefix = format!("{}.", field.id);
                check_duplicate_ids(&table.columns, &prefix, &mut result);
                for column in &table.columns {
                    self.check_reference(column, format!("{}{}", prefix, column.id), &mut result)?;
                }
            } else {
                self.check_reference(field, field.id.clone(), &mut result)?;
            }
        }
        Ok(result)
    }

    fn check_reference(&self, field: &FieldDefinition, path: String, result: &mut AuditResult) -> Result<()> {
        let Some(choice) = field.spec.choice() else {
            return Ok(());
        };
        let Some(reference) = choice.reference() else {
            return Ok(());
        };

        let Some(custom_field) = self.lookup.find_custom_field(reference)? else {
            result.warn(
                "DANGLING_REFERENCE",
                path,
                format!("custom field '{}' does not exist", reference),
            );
            return Ok(());
        };

        if custom_field.is_api_lov() && custom_field.lov_items.is_empty() {
            result.warn(
                "API_LOV_WITHOUT_FALLBACK",
                path.clone(),
                format!("custom field '{}' is api-backed with no fallback items", reference),
            );
        }

        let current: Vec<&str> = custom_field.active_items().map(|item| item.code.as_str()).collect();
        if is_stale(choice, &current) {
            result.warn(
                "STALE_OPTION_SNAPSHOT",
                path,
                format!("cached options differ from custom field '{}': {:?}", reference, current),
            );
        }
        Ok(())
    }
}

/// A snapshot is stale when present and not equal to the active codes
fn is_stale(choice: &ChoiceAttrs, current: &[&str]) -> bool {
    if choice.options.is_empty() {
        return false;
    }
    let cached: Vec<&str> = choice.options.iter().map(|o| o.value()).collect();
    cached != current
}

fn check_duplicate_ids(fields: &[FieldDefinition], prefix: &str, result: &mut AuditResult) {
    let mut seen = HashSet::new();
    for field in fields {
        if !seen.insert(field.id.as_str()) {
            result.errors.push(AuditFinding {
                code: "DUPLICATE_FIELD_ID",
                message: format!("field id '{}' is used more than once", field.id),
                path: format!("{}{}", prefix, field.id),
            });
        }
    }
}

/// Audit every stored form, layout and template
pub fn audit_registry<S: DefinitionStore>(registry: &DefinitionRegistry<S>) -> Result<Vec<AuditResult>> {
    let auditor = DefinitionAuditor::new(registry);
    let mut results = Vec::new();
    for form in registry.list::<Form>()? {
        results.push(auditor.audit_definition(&form)?);
    }
    for layout in registry.list::<FormLayout>()? {
        results.push(auditor.audit_definition(&layout)?);
    }
    for template in registry.list::<Template>()? {
        results.push(auditor.audit_definition(&template)?);
    }
    Ok(results)
}
