use groupbuy_core::OfferRecord;
use groupbuy_shared::OfferPatch;
use serde::{Deserialize, Serialize};

/// A participant's pledge against an offer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Pledge {
    pub participant_id: String,
    pub quantity: u64,
    /// Whether the participant has no earlier pledge on this offer.
    pub is_new_participant: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PledgeOutcome {
    pub current_participants: u64,
    pub total_quantity: u64,
    pub target_reached: bool,
    /// True only for the pledge that moved the offer onto or past its target.
    pub crossed_target: bool,
}

impl PledgeOutcome {
    pub fn to_patch(&self) -> OfferPatch {
        OfferPatch {
            current_participants: Some(self.current_participants),
            total_quantity: Some(self.total_quantity),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PledgeError {
    #[error("Pledge quantity must be at least 1")]
    EmptyPledge,
    #[error("Offer {0} has no total quantity yet; reconcile it before accepting pledges")]
    NotReconciled(String),
    #[error("Pledge would overflow the quantity counters of offer {0}")]
    QuantityOverflow(String),
}

/// Reconcile a pledge against the offer's counters and participation target.
///
/// Pledges past the target are accepted.
pub fn apply_pledge(record: &OfferRecord, pledge: &Pledge) -> Result<PledgeOutcome, PledgeError> {
    if pledge.quantity == 0 {
        return Err(PledgeError::EmptyPledge);
    }
    let total = record
        .total_quantity
        .ok_or_else(|| PledgeError::NotReconciled(record.id.clone()))?;
    let participants = record.current_participants.unwrap_or(0);

    let new_total = total
        .checked_add(pledge.quantity)
        .ok_or_else(|| PledgeError::QuantityOverflow(record.id.clone()))?;
    let new_participants = if pledge.is_new_participant {
        participants
            .checked_add(1)
            .ok_or_else(|| PledgeError::QuantityOverflow(record.id.clone()))?
    } else {
        participants
    };

    let reached = |quantity: u64| record.target_quantity.is_some_and(|target| quantity >= target);
    let target_reached = reached(new_total);

    Ok(PledgeOutcome {
        current_participants: new_participants,
        total_quantity: new_total,
        target_reached,
        crossed_target: target_reached && !reached(total),
    })
}

/// Percentage of the target already pledged, capped at 100.
pub fn progress_percent(record: &OfferRecord) -> Option<u8> {
    let target = record.target_quantity.filter(|t| *t > 0)?;
    let total = record.total_quantity.unwrap_or(0);
    let percent = (u128::from(total) * 100 / u128::from(target)).min(100);
    Some(percent as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use groupbuy_core::PricingModel;

    fn offer(participants: u64, total: u64, target: u64) -> OfferRecord {
        OfferRecord::new("o", PricingModel::Tiered)
            .with_participants(participants)
            .with_total_quantity(total)
            .with_target(target)
    }

    fn pledge(quantity: u64, is_new_participant: bool) -> Pledge {
        Pledge {
            participant_id: "user-1".to_string(),
            quantity,
            is_new_participant,
        }
    }

    #[test]
    fn test_new_participant_counts_once() {
        let outcome = apply_pledge(&offer(3, 9, 50), &pledge(4, true)).unwrap();
        assert_eq!(outcome.current_participants, 4);
        assert_eq!(outcome.total_quantity, 13);
        assert!(!outcome.target_reached);

        let outcome = apply_pledge(&offer(3, 9, 50), &pledge(4, false)).unwrap();
        assert_eq!(outcome.current_participants, 3);
        assert_eq!(outcome.total_quantity, 13);
        assert_eq!(
            outcome.to_patch(),
            OfferPatch {
                current_participants: Some(3),
                total_quantity: Some(13),
            }
        );
    }

    #[test]
    fn test_crossing_target() {
        let outcome = apply_pledge(&offer(5, 45, 50), &pledge(5, true)).unwrap();
        assert!(outcome.target_reached);
        assert!(outcome.crossed_target);

        // Already past the target: accepted, but does not cross again.
        let outcome = apply_pledge(&offer(6, 50, 50), &pledge(2, true)).unwrap();
        assert!(outcome.target_reached);
        assert!(!outcome.crossed_target);
        assert_eq!(outcome.total_quantity, 52);
    }

    #[test]
    fn test_rejects_empty_and_unreconciled() {
        assert_eq!(apply_pledge(&offer(1, 1, 5), &pledge(0, true)), Err(PledgeError::EmptyPledge));

        let legacy = OfferRecord::new("legacy", PricingModel::Fixed).with_participants(4);
        assert_eq!(
            apply_pledge(&legacy, &pledge(1, true)),
            Err(PledgeError::NotReconciled("legacy".to_string()))
        );
    }

    #[test]
    fn test_overflow_is_reported() {
        let full = offer(1, u64::MAX, 10);
        assert_eq!(
            apply_pledge(&full, &pledge(1, false)),
            Err(PledgeError::QuantityOverflow("o".to_string()))
        );
    }

    #[test]
    fn test_progress_percent() {
        assert_eq!(progress_percent(&offer(2, 25, 100)), Some(25));
        assert_eq!(progress_percent(&offer(2, 250, 100)), Some(100));
        assert_eq!(progress_percent(&OfferRecord::new("n", PricingModel::Fixed)), None);
    }
}
