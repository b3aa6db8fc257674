use std::fmt;

use crate::pass::{PassSummary, RecordOutcome};

fn or_absent(value: Option<u64>) -> String {
    value.map_or_else(|| "absent".to_string(), |v| v.to_string())
}

impl fmt::Display for RecordOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordOutcome::Migrated {
                id,
                pricing_model,
                previous_participants,
                reconciliation,
                dry_run,
            } => write!(
                f,
                "{:<9} {} [{}] currentParticipants {} -> {}, totalQuantity absent -> {} ({})",
                if *dry_run { "would-fix" } else { "migrated" },
                id,
                pricing_model,
                or_absent(*previous_participants),
                reconciliation.current_participants,
                reconciliation.total_quantity,
                reconciliation.action().label(),
            ),
            RecordOutcome::Skipped { id } => write!(f, "{:<9} {} totalQuantity already set", "skipped", id),
            RecordOutcome::Invalid(err) => write!(f, "{:<9} {} {}", "invalid", err.id, err),
        }
    }
}

impl fmt::Display for PassSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Reconciled {} offers: {} migrated, {} skipped, {} invalid",
            self.total(),
            self.migrated,
            self.skipped,
            self.invalid
        )?;
        if self.ambiguous > 0 {
            write!(f, " ({} ambiguous tiered offers need review)", self.ambiguous)?;
        }
        if self.dry_run {
            write!(f, " [dry run, nothing written]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use groupbuy_core::{InvalidRecordError, PricingModel};
    use groupbuy_offer::{ReconcileAction, Reconciliation};

    #[test]
    fn test_migrated_line() {
        let outcome = RecordOutcome::Migrated {
            id: "offer-7".to_string(),
            pricing_model: PricingModel::Tiered,
            previous_participants: Some(25),
            reconciliation: Reconciliation {
                current_participants: 1,
                total_quantity: 25,
                migrated: true,
                action: ReconcileAction::TieredQuantityMoved,
            },
            dry_run: false,
        };
        let line = outcome.to_string();
        assert!(line.starts_with("migrated  offer-7 [tiered]"));
        assert!(line.contains("currentParticipants 25 -> 1, totalQuantity absent -> 25"));
    }

    #[test]
    fn test_skipped_line() {
        let outcome = RecordOutcome::Skipped { id: "offer-3".to_string() };
        assert_eq!(outcome.to_string(), "skipped   offer-3 totalQuantity already set");
    }

    #[test]
    fn test_invalid_line_names_field() {
        let outcome = RecordOutcome::Invalid(InvalidRecordError::new("offer-9", "currentParticipants", "is negative (-2)"));
        let line = outcome.to_string();
        assert!(line.starts_with("invalid   offer-9"));
        assert!(line.contains("currentParticipants"));
    }

    #[test]
    fn test_summary_line() {
        let summary = PassSummary {
            migrated: 3,
            skipped: 5,
            invalid: 1,
            ambiguous: 2,
            dry_run: true,
        };
        assert_eq!(
            summary.to_string(),
            "Reconciled 9 offers: 3 migrated, 5 skipped, 1 invalid (2 ambiguous tiered offers need review) [dry run, nothing written]"
        );
    }
}
