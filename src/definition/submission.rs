//! Submissions: captured answers against a form

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use ulid::Ulid;

use super::Form;

/// Captured data for one form.
///
/// `collection_name` and `form_name` are a snapshot taken at submission time and
/// are not re-resolved if the form is later renamed; `form_id` is the identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: Ulid,
    pub form_id: Ulid,
    pub collection_name: String,
    pub form_name: String,
    /// Answers keyed by field id; not checked against the form's fields
    #[serde(default)]
    pub data: Map<String, Value>,
    pub submitted_at: DateTime<Utc>,
}

impl Submission {
    pub fn for_form(form: &Form, data: Map<String, Value>) -> Self {
        Self {
            id: Ulid::new(),
            form_id: form.id,
            collection_name: form.collection_name.clone(),
            form_name: form.form_name.clone(),
            data,
            submitted_at: Utc::now(),
        }
    }
}
