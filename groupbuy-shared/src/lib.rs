pub mod models;
pub mod pii;

pub use models::document::{fields, OfferDocument};
pub use models::patch::OfferPatch;
pub use pii::Masked;
