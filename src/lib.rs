//! Form Definition Registry
//!
//! Stores the building blocks of data-entry forms and keeps them consistent:
//! polymorphic field definitions, list-of-values (LOV) backed choice fields,
//! table fields with nested columns, and five independently stored definition
//! kinds sharing one naming and categorization model.
//!
//! ## Features
//!
//! - **Closed Field Model**: eleven field kinds as one tagged union
//! - **LOV Resolution**: inline options or a weak reference to a Custom Field's
//!   managed item list, Active items only, dangling references tolerated
//! - **Identity Rules**: per-kind unique names, upper-cased form names, store
//!   duplicate-key rejections reported as `DuplicateName`
//! - **Per-kind Updates**: each kind merges only its own updatable keys
//! - **Listing**: category enumeration, substring search, type filters
//!
//! ## Architecture
//!
//! ```text
//! field ─┬─ table            (columns are fields, one level deep)
//!        └─ lov              (options from a Custom Field)
//! definition ── update       (per-kind patch policies)
//! registry ─┬─ store         (DefinitionStore, NamespaceProvisioner)
//!           ├─ query         (filters, categories, suggestions)
//!           └─ audit         (reference hygiene)
//! ```

pub mod audit;
pub mod checksum;
pub mod config;
pub mod definition;
pub mod error;
pub mod field;
pub mod lov;
pub mod query;
pub mod registry;
pub mod store;
pub mod table;
pub mod update;

pub use audit::{audit_registry, AuditFinding, AuditResult, DefinitionAuditor};
pub use checksum::Checksum;
pub use config::FormsConfig;
pub use definition::{
    Collection, CustomField, Definition, DefinitionKind, Form, FormJson, FormLayout, LayoutType, Submission, Template,
};
pub use error::{DefinitionError, Result};
pub use field::{
    parse_field_list, validate_field_definition, validate_field_list, FieldDefinition, FieldKind, FieldSpec,
    OptionEntry,
};
pub use lov::{resolve_field_list, resolve_options, CustomFieldLookup, LovItem, LovStatus, LovType, OptionList};
pub use query::{category_enumeration, filter_definitions, DefinitionFilter};
pub use registry::DefinitionRegistry;
pub use store::{DefinitionStore, FileStore, MemoryNamespaces, MemoryStore, NamespaceProvisioner, StoreError};
pub use table::TableAttrs;
pub use update::{apply_partial_update, merge_patch, update_policy, UpdatePolicy};
