use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::document::fields;

/// Partial attributes written back to an offer document.
///
/// Unset fields are left untouched by the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OfferPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_participants: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_quantity: Option<u64>,
}

impl OfferPatch {
    pub fn is_empty(&self) -> bool {
        self.current_participants.is_none() && self.total_quantity.is_none()
    }

    pub fn to_fields(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    /// Attributes to merge into the stored document, including `updatedAt`.
    pub fn stamped_fields(&self, now: DateTime<Utc>) -> Map<String, Value> {
        let mut attrs = self.to_fields();
        attrs.insert(fields::UPDATED_AT.to_string(), Value::String(now.to_rfc3339()));
        attrs
    }
}
