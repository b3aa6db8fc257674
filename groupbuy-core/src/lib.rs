pub mod record;
pub mod repository;

pub use record::{InvalidRecordError, OfferRecord, PricingModel};
pub use repository::{OfferStore, StoreError, StoreResult};
