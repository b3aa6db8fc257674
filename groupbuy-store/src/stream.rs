use futures_util::stream::{self, Stream, StreamExt, TryStreamExt};
use groupbuy_core::{OfferStore, StoreResult};
use groupbuy_shared::OfferDocument;
use tracing::debug;

use crate::retry::{retry_with_backoff, RetryPolicy};

/// A lazy scan over one offer collection, fetched page by page in id order.
///
/// Only one page is held at a time. Passing the last seen id as
/// `start_after` resumes an interrupted scan.
#[derive(Debug, Clone)]
pub struct OfferScan {
    pub collection: String,
    pub page_size: usize,
    pub start_after: Option<String>,
    pub retry: RetryPolicy,
}

struct Cursor {
    after: Option<String>,
    exhausted: bool,
}

impl OfferScan {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            page_size: 200,
            start_after: None,
            retry: RetryPolicy::none(),
        }
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn start_after(mut self, id: Option<String>) -> Self {
        self.start_after = id;
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn stream<'a, S>(&'a self, store: &'a S) -> impl Stream<Item = StoreResult<OfferDocument>> + Send + 'a
    where
        S: OfferStore + ?Sized,
    {
        let cursor = Cursor {
            after: self.start_after.clone(),
            exhausted: false,
        };

        stream::try_unfold(cursor, move |cursor| self.next_page(store, cursor))
            .map_ok(|page| stream::iter(page.into_iter().map(Ok)))
            .try_flatten()
            .boxed()
    }

    async fn next_page<S>(&self, store: &S, cursor: Cursor) -> StoreResult<Option<(Vec<OfferDocument>, Cursor)>>
    where
        S: OfferStore + ?Sized,
    {
        if cursor.exhausted {
            return Ok(None);
        }
        let page_size = self.page_size.max(1);
        let after = cursor.after.as_deref();

        let page = retry_with_backoff(&self.retry, "fetch_page", || {
            store.fetch_page(&self.collection, after, page_size)
        })
        .await?;

        debug!(
            "Fetched {} offers from {} after {:?}",
            page.len(),
            self.collection,
            after
        );

        let Some(last) = page.last() else {
            return Ok(None);
        };
        let next = Cursor {
            after: Some(last.id.clone()),
            exhausted: page.len() < page_size,
        };
        Ok(Some((page, next)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryOfferStore;
    use groupbuy_core::StoreError;
    use serde_json::json;
    use std::time::Duration;

    async fn store_with(count: usize) -> InMemoryOfferStore {
        let store = InMemoryOfferStore::new();
        for i in 0..count {
            let id = format!("offer-{:03}", i);
            store
                .insert("offers", OfferDocument::from_json(id, json!({ "currentParticipants": i })))
                .await;
        }
        store
    }

    async fn ids(scan: &OfferScan, store: &InMemoryOfferStore) -> StoreResult<Vec<String>> {
        scan.stream(store).map_ok(|doc| doc.id).try_collect().await
    }

    #[tokio::test]
    async fn test_scan_visits_every_document_once() {
        let store = store_with(7).await;
        let scan = OfferScan::new("offers").page_size(3);

        let seen = ids(&scan, &store).await.unwrap();
        assert_eq!(seen.len(), 7);
        assert_eq!(seen.first().map(String::as_str), Some("offer-000"));
        assert_eq!(seen.last().map(String::as_str), Some("offer-006"));
    }

    #[tokio::test]
    async fn test_exact_multiple_of_page_size() {
        let store = store_with(6).await;
        let scan = OfferScan::new("offers").page_size(3);
        assert_eq!(ids(&scan, &store).await.unwrap().len(), 6);
    }

    #[tokio::test]
    async fn test_scan_resumes_after_id() {
        let store = store_with(5).await;
        let scan = OfferScan::new("offers")
            .page_size(2)
            .start_after(Some("offer-002".to_string()));

        assert_eq!(ids(&scan, &store).await.unwrap(), ["offer-003", "offer-004"]);
    }

    #[tokio::test]
    async fn test_empty_collection() {
        let store = InMemoryOfferStore::new();
        let scan = OfferScan::new("offers");
        assert!(ids(&scan, &store).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_errors_surface() {
        let store = store_with(3).await;
        store.set_unavailable(true);
        let scan = OfferScan::new("offers");

        let err = ids(&scan, &store).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_transient_fetch_failure_retried() {
        let store = store_with(4).await;
        store.fail_next_fetches(2);
        let scan = OfferScan::new("offers").page_size(10).retry(RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        });

        assert_eq!(ids(&scan, &store).await.unwrap().len(), 4);
    }
}
