use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::patch::OfferPatch;

/// Attribute names used by offer documents in the store.
pub mod fields {
    pub const PRICING_MODEL: &str = "pricingModel";
    pub const CURRENT_PARTICIPANTS: &str = "currentParticipants";
    pub const TOTAL_QUANTITY: &str = "totalQuantity";
    pub const TARGET_QUANTITY: &str = "targetQuantity";
    pub const PRICE_TIERS: &str = "priceTiers";
    pub const UPDATED_AT: &str = "updatedAt";
}

/// A raw offer document as held by the storage backend.
///
/// Attributes are kept untyped; validation into an offer record happens in
/// `groupbuy-core`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OfferDocument {
    pub id: String,
    pub data: Map<String, Value>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl OfferDocument {
    pub fn new(id: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            data,
            updated_at: None,
        }
    }

    /// Build a document from a JSON object literal. Non-object values yield
    /// an empty attribute map.
    pub fn from_json(id: impl Into<String>, value: Value) -> Self {
        let data = match value {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self::new(id, data)
    }

    /// Look up an attribute. `null` counts as absent.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data.get(name).filter(|v| !v.is_null())
    }

    /// Merge a patch into the document, leaving other attributes untouched.
    pub fn apply_patch(&mut self, patch: &OfferPatch, now: DateTime<Utc>) {
        for (key, value) in patch.stamped_fields(now) {
            self.data.insert(key, value);
        }
        self.updated_at = Some(now);
    }
}
