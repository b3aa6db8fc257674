use groupbuy_shared::{fields, OfferDocument};
use serde::{Deserialize, Serialize};

/// One step of a tiered price list.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PriceTier {
    /// Cumulative pledged quantity from which this price applies.
    pub min_quantity: u64,
    pub unit_price_cents: u64,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PricingError {
    #[error("Tier schedule has no tiers")]
    Empty,
    #[error("Two tiers start at quantity {0}")]
    DuplicateThreshold(u64),
    #[error("Unit price rises from {previous} to {next} cents at quantity {at}")]
    IncreasingPrice { previous: u64, next: u64, at: u64 },
    #[error("Malformed price tiers on offer {id}: {reason}")]
    Malformed { id: String, reason: String },
}

/// Validated tiered price list, ordered by threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierSchedule {
    tiers: Vec<PriceTier>,
}

impl TierSchedule {
    pub fn new(mut tiers: Vec<PriceTier>) -> Result<Self, PricingError> {
        if tiers.is_empty() {
            return Err(PricingError::Empty);
        }
        tiers.sort_by_key(|t| t.min_quantity);

        for pair in tiers.windows(2) {
            let (lower, upper) = (pair[0], pair[1]);
            if lower.min_quantity == upper.min_quantity {
                return Err(PricingError::DuplicateThreshold(upper.min_quantity));
            }
            if upper.unit_price_cents > lower.unit_price_cents {
                return Err(PricingError::IncreasingPrice {
                    previous: lower.unit_price_cents,
                    next: upper.unit_price_cents,
                    at: upper.min_quantity,
                });
            }
        }

        Ok(Self { tiers })
    }

    /// Read `priceTiers` from an offer document. `Ok(None)` when the offer has none.
    pub fn from_document(doc: &OfferDocument) -> Result<Option<Self>, PricingError> {
        let Some(raw) = doc.field(fields::PRICE_TIERS) else {
            return Ok(None);
        };
        let tiers: Vec<PriceTier> = serde_json::from_value(raw.clone()).map_err(|e| PricingError::Malformed {
            id: doc.id.clone(),
            reason: e.to_string(),
        })?;
        Self::new(tiers).map(Some)
    }

    /// Unit price once `total_quantity` units are pledged. Below the first
    /// threshold the first tier's price applies.
    pub fn unit_price_for(&self, total_quantity: u64) -> u64 {
        self.tiers
            .iter()
            .rev()
            .find(|t| total_quantity >= t.min_quantity)
            .unwrap_or(&self.tiers[0])
            .unit_price_cents
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tier(min_quantity: u64, unit_price_cents: u64) -> PriceTier {
        PriceTier { min_quantity, unit_price_cents }
    }

    #[test]
    fn test_unit_price_follows_quantity() {
        let schedule = TierSchedule::new(vec![tier(50, 800), tier(1, 1000), tier(100, 650)]).unwrap();

        assert_eq!(schedule.unit_price_for(0), 1000);
        assert_eq!(schedule.unit_price_for(49), 1000);
        assert_eq!(schedule.unit_price_for(50), 800);
        assert_eq!(schedule.unit_price_for(500), 650);
    }

    #[test]
    fn test_rejects_bad_schedules() {
        assert_eq!(TierSchedule::new(vec![]), Err(PricingError::Empty));
        assert_eq!(
            TierSchedule::new(vec![tier(10, 900), tier(10, 800)]),
            Err(PricingError::DuplicateThreshold(10))
        );
        assert_eq!(
            TierSchedule::new(vec![tier(1, 900), tier(20, 950)]),
            Err(PricingError::IncreasingPrice { previous: 900, next: 950, at: 20 })
        );
    }

    #[test]
    fn test_from_document() {
        let doc = OfferDocument::from_json(
            "rice",
            json!({ "priceTiers": [{ "minQuantity": 1, "unitPriceCents": 1200 }, { "minQuantity": 20, "unitPriceCents": 990 }] }),
        );
        let schedule = TierSchedule::from_document(&doc).unwrap().unwrap();
        assert_eq!(schedule.unit_price_for(25), 990);

        let plain = OfferDocument::from_json("plain", json!({ "pricingModel": "fixed" }));
        assert_eq!(TierSchedule::from_document(&plain), Ok(None));

        let broken = OfferDocument::from_json("broken", json!({ "priceTiers": "cheap" }));
        assert!(matches!(
            TierSchedule::from_document(&broken),
            Err(PricingError::Malformed { .. })
        ));
    }
}
