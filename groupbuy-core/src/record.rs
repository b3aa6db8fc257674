use chrono::{DateTime, Utc};
use groupbuy_shared::{fields, OfferDocument};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// How an offer's unit price relates to the pledged quantity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PricingModel {
    /// Price does not vary with the pledged quantity.
    Fixed,
    /// Unit price depends on the cumulative pledged quantity.
    Tiered,
}

impl fmt::Display for PricingModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PricingModel::Fixed => write!(f, "fixed"),
            PricingModel::Tiered => write!(f, "tiered"),
        }
    }
}

impl FromStr for PricingModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fixed" => Ok(PricingModel::Fixed),
            "tiered" => Ok(PricingModel::Tiered),
            other => Err(format!("unknown pricing model '{}'", other)),
        }
    }
}

/// A single offer document failed validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid offer record {id}: field '{field}' {reason}")]
pub struct InvalidRecordError {
    pub id: String,
    pub field: String,
    pub reason: String,
}

impl InvalidRecordError {
    pub fn new(id: &str, field: &str, reason: impl Into<String>) -> Self {
        Self {
            id: id.to_string(),
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// The validated shape of an offer, as far as participation is concerned.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OfferRecord {
    pub id: String,
    pub pricing_model: PricingModel,
    /// Distinct participants after reconciliation. Overloaded on legacy records.
    pub current_participants: Option<u64>,
    /// Total pledged units. `None` marks a record that still needs reconciling.
    pub total_quantity: Option<u64>,
    pub target_quantity: Option<u64>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl OfferRecord {
    pub fn new(id: impl Into<String>, pricing_model: PricingModel) -> Self {
        Self {
            id: id.into(),
            pricing_model,
            current_participants: None,
            total_quantity: None,
            target_quantity: None,
            updated_at: None,
        }
    }

    pub fn with_participants(mut self, participants: u64) -> Self {
        self.current_participants = Some(participants);
        self
    }

    pub fn with_total_quantity(mut self, quantity: u64) -> Self {
        self.total_quantity = Some(quantity);
        self
    }

    pub fn with_target(mut self, target: u64) -> Self {
        self.target_quantity = Some(target);
        self
    }

    pub fn has_total_quantity(&self) -> bool {
        self.total_quantity.is_some()
    }
}

impl TryFrom<&OfferDocument> for OfferRecord {
    type Error = InvalidRecordError;

    fn try_from(doc: &OfferDocument) -> Result<Self, Self::Error> {
        // Offers written before tiered pricing existed carry no pricing model.
        let pricing_model = match doc.field(fields::PRICING_MODEL) {
            None => PricingModel::Fixed,
            Some(Value::String(s)) => s
                .parse()
                .map_err(|e: String| InvalidRecordError::new(&doc.id, fields::PRICING_MODEL, e))?,
            Some(other) => {
                return Err(InvalidRecordError::new(
                    &doc.id,
                    fields::PRICING_MODEL,
                    format!("expected a string, found {}", other),
                ))
            }
        };

        Ok(Self {
            id: doc.id.clone(),
            pricing_model,
            current_participants: read_count(doc, fields::CURRENT_PARTICIPANTS)?,
            total_quantity: read_count(doc, fields::TOTAL_QUANTITY)?,
            // The target never feeds reconciliation; a malformed one reads as unset.
            target_quantity: read_count(doc, fields::TARGET_QUANTITY).unwrap_or(None),
            updated_at: doc.updated_at,
        })
    }
}

fn read_count(doc: &OfferDocument, field: &str) -> Result<Option<u64>, InvalidRecordError> {
    match doc.field(field) {
        None => Ok(None),
        Some(value) => parse_count(value)
            .map(Some)
            .map_err(|reason| InvalidRecordError::new(&doc.id, field, reason)),
    }
}

/// Accepts non-negative integers, including integral doubles.
fn parse_count(value: &Value) -> Result<u64, String> {
    if let Some(n) = value.as_u64() {
        return Ok(n);
    }
    match value.as_f64() {
        Some(f) if f < 0.0 => Err(format!("is negative ({})", value)),
        Some(f) if f.fract() != 0.0 => Err(format!("is not a whole number ({})", value)),
        Some(f) if f >= u64::MAX as f64 => Err(format!("is out of range ({})", value)),
        Some(f) => Ok(f as u64),
        None => Err(format!("is not a number ({})", value)),
    }
}
