use groupbuy_core::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum PassError {
    #[error("Offer storage failed: {0}")]
    Storage(#[from] StoreError),
    #[error("Failed to write report: {0}")]
    Report(#[from] std::io::Error),
}
