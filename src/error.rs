//! Error types for the definition registry

use thiserror::Error;

use crate::definition::DefinitionKind;
use crate::store::StoreError;

/// Result type for definition operations
pub type Result<T> = std::result::Result<T, DefinitionError>;

/// Definition registry errors
#[derive(Error, Debug)]
pub enum DefinitionError {
    #[error("validation failed on '{field}': {message}")]
    Validation { field: String, message: String },

    #[error("invalid value '{value}' for '{field}', expected one of: {allowed}")]
    InvalidEnum {
        field: String,
        value: String,
        allowed: String,
    },

    #[error("{kind} already exists: {name}")]
    DuplicateName { kind: DefinitionKind, name: String },

    #[error("{kind} not found: {name}")]
    NotFound { kind: DefinitionKind, name: String },

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DefinitionError {
    pub(crate) fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub(crate) fn invalid_enum(field: impl Into<String>, value: impl Into<String>, allowed: &[&str]) -> Self {
        Self::InvalidEnum {
            field: field.into(),
            value: value.into(),
            allowed: allowed.join(", "),
        }
    }

    /// Whether this error belongs to the validation family (rejected before any write)
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. } | Self::InvalidEnum { .. })
    }

    /// The offending attribute, for validation errors
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Validation { field, .. } | Self::InvalidEnum { field, .. } => Some(field),
            _ => None,
        }
    }

    /// Map a storage failure for an operation on `kind`/`name`.
    ///
    /// A duplicate-key rejection from the store is the same condition as the
    /// registry's own pre-check.
    pub(crate) fn from_store(err: StoreError, kind: DefinitionKind, name: &str) -> Self {
        match err {
            StoreError::DuplicateKey { .. } => Self::DuplicateName {
                kind,
                name: name.to_string(),
            },
            StoreError::NotFound { .. } => Self::NotFound {
                kind,
                name: name.to_string(),
            },
            StoreError::Unavailable(msg) => Self::StorageUnavailable(msg),
        }
    }
}

impl From<StoreError> for DefinitionError {
    fn from(err: StoreError) -> Self {
        Self::StorageUnavailable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DefinitionError::DuplicateName {
            kind: DefinitionKind::CustomField,
            name: "status".into(),
        };
        assert_eq!(err.to_string(), "custom field already exists: status");
    }

    #[test]
    fn test_validation_family() {
        let err = DefinitionError::invalid_enum("layoutType", "grid", &["form-group", "box-layout"]);
        assert!(err.is_validation());
        assert_eq!(err.field(), Some("layoutType"));
        assert!(err.to_string().contains("form-group, box-layout"));

        let err = DefinitionError::StorageUnavailable("disk full".into());
        assert!(!err.is_validation());
        assert_eq!(err.field(), None);
    }

    #[test]
    fn test_duplicate_key_maps_to_duplicate_name() {
        let err = DefinitionError::from_store(
            StoreError::DuplicateKey { key: "STATUS".into() },
            DefinitionKind::Form,
            "STATUS",
        );
        assert!(matches!(err, DefinitionError::DuplicateName { kind: DefinitionKind::Form, .. }));
    }
}
