//! Collections: named logical groupings mirrored as storage namespaces

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ulid::Ulid;

use super::{decode_payload, new_id, require_text, Definition, DefinitionKind};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    #[serde(default = "new_id")]
    pub id: Ulid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Collection {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            name: name.into(),
            description: description.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl Definition for Collection {
    const KIND: DefinitionKind = DefinitionKind::Collection;

    fn id(&self) -> Ulid {
        self.id
    }

    fn key(&self) -> &str {
        &self.name
    }

    fn decode(raw: &Value) -> Result<Self> {
        decode_payload(raw, "collection")
    }

    fn normalize(&mut self) {
        self.name = Self::KIND.normalize_key(&self.name);
    }

    fn validate(&self) -> Result<()> {
        require_text(&self.name, "name")
    }

    fn stamp_created(&mut self, now: DateTime<Utc>) {
        self.id = new_id();
        self.created_at = now;
        self.updated_at = now;
    }

    fn stamp_updated(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    fn search_text(&self) -> Vec<&str> {
        vec![self.name.as_str()]
    }
}
