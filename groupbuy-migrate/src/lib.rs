pub mod cli;
pub mod error;
pub mod pass;
pub mod report;

pub use cli::Cli;
pub use error::PassError;
pub use pass::{PassOptions, PassSummary, ReconciliationPass, RecordOutcome};
