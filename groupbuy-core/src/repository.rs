use async_trait::async_trait;
use groupbuy_shared::{OfferDocument, OfferPatch};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
    #[error("Document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },
    #[error("Invalid collection name: {0}")]
    InvalidCollection(String),
    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Whether retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Document-store access for offer collections.
#[async_trait]
pub trait OfferStore: Send + Sync {
    /// Fetch up to `limit` documents ordered by id, strictly after `after`.
    async fn fetch_page(
        &self,
        collection: &str,
        after: Option<&str>,
        limit: usize,
    ) -> StoreResult<Vec<OfferDocument>>;

    /// Merge `patch` into the stored document and stamp its update time.
    async fn update(&self, collection: &str, id: &str, patch: &OfferPatch) -> StoreResult<()>;
}
