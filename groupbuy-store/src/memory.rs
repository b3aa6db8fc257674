use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use groupbuy_core::{OfferStore, StoreError, StoreResult};
use groupbuy_shared::{OfferDocument, OfferPatch};
use tokio::sync::RwLock;

/// Process-local document store, ordered by id within each collection.
///
/// Used by tests; supports simulated outages.
#[derive(Default)]
pub struct InMemoryOfferStore {
    collections: RwLock<HashMap<String, BTreeMap<String, OfferDocument>>>,
    unavailable: AtomicBool,
    transient_fetch_failures: AtomicUsize,
    updates: AtomicUsize,
}

impl InMemoryOfferStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, collection: &str, doc: OfferDocument) {
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(doc.id.clone(), doc);
    }

    pub async fn get(&self, collection: &str, id: &str) -> Option<OfferDocument> {
        let collections = self.collections.read().await;
        collections.get(collection).and_then(|docs| docs.get(id)).cloned()
    }

    /// Fail every call with `StoreError::Unavailable` while set.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Fail the next `count` page fetches with a transient error.
    pub fn fail_next_fetches(&self, count: usize) {
        self.transient_fetch_failures.store(count, Ordering::SeqCst);
    }

    /// Number of successful updates so far.
    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("in-memory store is offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl OfferStore for InMemoryOfferStore {
    async fn fetch_page(
        &self,
        collection: &str,
        after: Option<&str>,
        limit: usize,
    ) -> StoreResult<Vec<OfferDocument>> {
        self.check_available()?;
        let pending = self
            .transient_fetch_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if pending.is_ok() {
            return Err(StoreError::Unavailable("simulated fetch timeout".to_string()));
        }

        let collections = self.collections.read().await;
        let Some(docs) = collections.get(collection) else {
            return Ok(Vec::new());
        };
        let page = match after {
            Some(after) => docs
                .range::<str, _>((std::ops::Bound::Excluded(after), std::ops::Bound::Unbounded))
                .take(limit)
                .map(|(_, doc)| doc.clone())
                .collect(),
            None => docs.values().take(limit).cloned().collect(),
        };
        Ok(page)
    }

    async fn update(&self, collection: &str, id: &str, patch: &OfferPatch) -> StoreResult<()> {
        self.check_available()?;
        let mut collections = self.collections.write().await;
        let doc = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;
        doc.apply_patch(patch, Utc::now());
        self.updates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
