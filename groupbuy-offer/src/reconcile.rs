use chrono::{DateTime, Utc};
use groupbuy_core::{InvalidRecordError, OfferRecord, PricingModel};
use groupbuy_shared::{fields, OfferDocument, OfferPatch};
use serde::{Deserialize, Serialize};

/// Tiered values above this are read as a quantity typed into the participant field.
pub const TIERED_QUANTITY_THRESHOLD: u64 = 10;

/// Which branch of the rule produced a reconciliation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileAction {
    AlreadyMigrated,
    FixedBackfill,
    TieredQuantityMoved,
    /// Low tiered value: one unit per participant is assumed. This is a guess
    /// and may be wrong for single participants pledging several units.
    TieredAmbiguous,
}

impl ReconcileAction {
    pub fn label(&self) -> &'static str {
        match self {
            ReconcileAction::AlreadyMigrated => "already migrated",
            ReconcileAction::FixedBackfill => "fixed: total copied from participants",
            ReconcileAction::TieredQuantityMoved => "tiered: value moved to total, one participant",
            ReconcileAction::TieredAmbiguous => "tiered: ambiguous, one unit per participant assumed",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reconciliation {
    pub current_participants: u64,
    pub total_quantity: u64,
    pub migrated: bool,
    pub action: ReconcileAction,
}

impl Reconciliation {
    pub fn action(&self) -> ReconcileAction {
        self.action
    }

    /// The attributes to persist. The store stamps `updated_at` on write.
    pub fn to_patch(&self) -> OfferPatch {
        OfferPatch {
            current_participants: Some(self.current_participants),
            total_quantity: Some(self.total_quantity),
        }
    }

    /// Apply the reconciled values to a record, as the store would.
    pub fn apply_to(&self, record: &OfferRecord, now: DateTime<Utc>) -> OfferRecord {
        if !self.migrated {
            return record.clone();
        }
        OfferRecord {
            current_participants: Some(self.current_participants),
            total_quantity: Some(self.total_quantity),
            updated_at: Some(now),
            ..record.clone()
        }
    }
}

/// Backfill `totalQuantity` on a legacy offer.
///
/// Legacy offers stored a single `currentParticipants` counter whose meaning
/// depended on the pricing model: fixed-price offers counted pledged units,
/// while tiered offers were sometimes filled with a quantity by mistake. This
/// splits it into a participant count and a total quantity.
pub fn reconcile(record: &OfferRecord) -> Reconciliation {
    let participants = record.current_participants.unwrap_or(0);

    if let Some(total) = record.total_quantity {
        return Reconciliation {
            current_participants: participants,
            total_quantity: total,
            migrated: false,
            action: ReconcileAction::AlreadyMigrated,
        };
    }

    match record.pricing_model {
        PricingModel::Fixed => Reconciliation {
            current_participants: participants,
            total_quantity: participants,
            migrated: true,
            action: ReconcileAction::FixedBackfill,
        },
        PricingModel::Tiered if participants > TIERED_QUANTITY_THRESHOLD => Reconciliation {
            current_participants: 1,
            total_quantity: participants,
            migrated: true,
            action: ReconcileAction::TieredQuantityMoved,
        },
        PricingModel::Tiered => Reconciliation {
            current_participants: participants,
            total_quantity: participants,
            migrated: true,
            action: ReconcileAction::TieredAmbiguous,
        },
    }
}

/// Result of reconciling a raw document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentReconciliation {
    /// `totalQuantity` is already present. No other attribute was read.
    AlreadyMigrated,
    Reconciled {
        record: OfferRecord,
        reconciliation: Reconciliation,
    },
}

/// Reconcile a raw document. Documents that already carry `totalQuantity`
/// are skipped before any validation; otherwise only the attributes the rule
/// reads can fail it.
pub fn reconcile_document(doc: &OfferDocument) -> Result<DocumentReconciliation, InvalidRecordError> {
    if doc.field(fields::TOTAL_QUANTITY).is_some() {
        return Ok(DocumentReconciliation::AlreadyMigrated);
    }
    let record = OfferRecord::try_from(doc)?;
    let reconciliation = reconcile(&record);
    Ok(DocumentReconciliation::Reconciled { record, reconciliation })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tiered(participants: u64) -> OfferRecord {
        OfferRecord::new("t", PricingModel::Tiered).with_participants(participants)
    }

    #[test]
    fn test_fixed_copies_participants_to_total() {
        let record = OfferRecord::new("f", PricingModel::Fixed).with_participants(17);
        let result = reconcile(&record);
        assert_eq!(result.current_participants, 17);
        assert_eq!(result.total_quantity, 17);
        assert!(result.migrated);
        assert_eq!(result.action(), ReconcileAction::FixedBackfill);
    }

    #[test]
    fn test_tiered_high_value_moves_to_total() {
        let result = reconcile(&tiered(25));
        assert_eq!((result.current_participants, result.total_quantity), (1, 25));
        assert!(result.migrated);
        assert_eq!(result.action(), ReconcileAction::TieredQuantityMoved);
    }

    #[test]
    fn test_tiered_low_value_assumes_one_unit_each() {
        let result = reconcile(&tiered(4));
        assert_eq!((result.current_participants, result.total_quantity), (4, 4));
        assert!(result.migrated);
        assert_eq!(result.action(), ReconcileAction::TieredAmbiguous);
    }

    #[test]
    fn test_tiered_threshold_boundary() {
        let at = reconcile(&tiered(10));
        assert_eq!((at.current_participants, at.total_quantity), (10, 10));

        let above = reconcile(&tiered(11));
        assert_eq!((above.current_participants, above.total_quantity), (1, 11));
    }

    #[test]
    fn test_already_migrated_is_skipped() {
        let record = tiered(2).with_total_quantity(10);
        let result = reconcile(&record);
        assert_eq!((result.current_participants, result.total_quantity), (2, 10));
        assert!(!result.migrated);
        assert_eq!(result.action(), ReconcileAction::AlreadyMigrated);
    }

    #[test]
    fn test_missing_participants_treated_as_zero() {
        for model in [PricingModel::Fixed, PricingModel::Tiered] {
            let result = reconcile(&OfferRecord::new("m", model));
            assert_eq!((result.current_participants, result.total_quantity), (0, 0));
            assert!(result.migrated);
        }
    }

    #[test]
    fn test_second_application_is_noop() {
        let now = Utc::now();
        for record in [
            tiered(3),
            tiered(10),
            tiered(42),
            OfferRecord::new("f", PricingModel::Fixed).with_participants(8),
            OfferRecord::new("e", PricingModel::Fixed),
        ] {
            let first = reconcile(&record);
            let migrated = first.apply_to(&record, now);
            let second = reconcile(&migrated);

            assert!(!second.migrated);
            assert_eq!(second.current_participants, first.current_participants);
            assert_eq!(second.total_quantity, first.total_quantity);
            assert_eq!(second.apply_to(&migrated, Utc::now()), migrated);
        }
    }

    #[test]
    fn test_reconcile_document_rejects_negative() {
        let doc = OfferDocument::from_json("bad", json!({ "pricingModel": "tiered", "currentParticipants": -1 }));
        let err = reconcile_document(&doc).unwrap_err();
        assert_eq!(err.id, "bad");
    }

    #[test]
    fn test_document_with_total_skipped_without_validation() {
        let doc = OfferDocument::from_json(
            "done",
            json!({ "pricingModel": "tiered", "currentParticipants": -2, "totalQuantity": 10 }),
        );
        assert_eq!(reconcile_document(&doc), Ok(DocumentReconciliation::AlreadyMigrated));
    }

    #[test]
    fn test_malformed_target_does_not_block_reconciliation() {
        let doc = OfferDocument::from_json(
            "t",
            json!({ "pricingModel": "tiered", "currentParticipants": 25, "targetQuantity": "50" }),
        );
        match reconcile_document(&doc).unwrap() {
            DocumentReconciliation::Reconciled { reconciliation, .. } => {
                assert_eq!((reconciliation.current_participants, reconciliation.total_quantity), (1, 25));
                assert!(reconciliation.migrated);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_patch_carries_both_counters() {
        let doc = OfferDocument::from_json("t", json!({ "pricingModel": "tiered", "currentParticipants": 30 }));
        let DocumentReconciliation::Reconciled { reconciliation: result, .. } = reconcile_document(&doc).unwrap() else {
            panic!("expected a reconciled document");
        };
        assert_eq!(
            result.to_patch(),
            OfferPatch {
                current_participants: Some(1),
                total_quantity: Some(30),
            }
        );
    }
}
