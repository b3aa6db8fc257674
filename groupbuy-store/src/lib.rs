pub mod app_config;
pub mod database;
pub mod memory;
pub mod retry;
pub mod stream;

pub use app_config::{ConfigError, Settings};
pub use database::{DbClient, PostgresOfferStore};
pub use memory::InMemoryOfferStore;
pub use retry::{retry_with_backoff, RetryPolicy};
pub use stream::OfferScan;
