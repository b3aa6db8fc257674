pub mod reconcile;
pub mod participation;
pub mod pricing;

pub use reconcile::{
    reconcile, reconcile_document, DocumentReconciliation, ReconcileAction, Reconciliation, TIERED_QUANTITY_THRESHOLD,
};
pub use participation::{apply_pledge, progress_percent, Pledge, PledgeError, PledgeOutcome};
pub use pricing::{PriceTier, PricingError, TierSchedule};
