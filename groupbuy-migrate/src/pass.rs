use std::sync::Arc;

use futures_util::StreamExt;
use groupbuy_core::{InvalidRecordError, OfferStore, PricingModel, StoreError};
use groupbuy_offer::{reconcile_document, DocumentReconciliation, ReconcileAction, Reconciliation};
use groupbuy_shared::OfferDocument;
use groupbuy_store::{retry_with_backoff, OfferScan, RetryPolicy, Settings};
use tracing::{debug, info, warn};

use crate::error::PassError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassOptions {
    pub collection: String,
    pub page_size: usize,
    /// Records reconciled and written concurrently.
    pub concurrency: usize,
    pub start_after: Option<String>,
    pub dry_run: bool,
    pub retry: RetryPolicy,
}

impl Default for PassOptions {
    fn default() -> Self {
        Self {
            collection: "offers".to_string(),
            page_size: 200,
            concurrency: 4,
            start_after: None,
            dry_run: false,
            retry: RetryPolicy::none(),
        }
    }
}

impl PassOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            collection: settings.migration.collection.clone(),
            page_size: settings.migration.page_size,
            concurrency: settings.migration.concurrency,
            start_after: None,
            dry_run: false,
            retry: RetryPolicy::from(&settings.retry),
        }
    }
}

/// What happened to a single record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Migrated {
        id: String,
        pricing_model: PricingModel,
        previous_participants: Option<u64>,
        reconciliation: Reconciliation,
        /// Nothing was written.
        dry_run: bool,
    },
    /// The document already carries `totalQuantity`.
    Skipped { id: String },
    Invalid(InvalidRecordError),
}

impl RecordOutcome {
    pub fn id(&self) -> &str {
        match self {
            RecordOutcome::Migrated { id, .. } | RecordOutcome::Skipped { id, .. } => id,
            RecordOutcome::Invalid(err) => &err.id,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub migrated: usize,
    pub skipped: usize,
    pub invalid: usize,
    /// Migrated tiered records that took the low-value guess.
    pub ambiguous: usize,
    pub dry_run: bool,
}

impl PassSummary {
    fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            ..Self::default()
        }
    }

    fn record(&mut self, outcome: &RecordOutcome) {
        match outcome {
            RecordOutcome::Migrated { reconciliation, .. } => {
                self.migrated += 1;
                if reconciliation.action() == ReconcileAction::TieredAmbiguous {
                    self.ambiguous += 1;
                }
            }
            RecordOutcome::Skipped { .. } => self.skipped += 1,
            RecordOutcome::Invalid(_) => self.invalid += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.migrated + self.skipped + self.invalid
    }
}

/// One reconciliation pass over an offer collection.
///
/// Each record is reconciled and written independently, so a pass can be
/// interrupted at any point and simply run again: records that already carry
/// a total quantity are skipped.
pub struct ReconciliationPass<S: ?Sized> {
    store: Arc<S>,
    options: PassOptions,
}

impl<S> ReconciliationPass<S>
where
    S: OfferStore + ?Sized,
{
    pub fn new(store: Arc<S>, options: PassOptions) -> Self {
        Self { store, options }
    }

    /// Run the pass to completion, handing every outcome to `on_record` in
    /// completion order. Invalid records are reported and skipped; storage
    /// failures abort the pass.
    pub async fn run<F>(&self, mut on_record: F) -> Result<PassSummary, PassError>
    where
        F: FnMut(&RecordOutcome) -> std::io::Result<()>,
    {
        let options = &self.options;
        info!(
            "Starting reconciliation pass over '{}' (page size {}, concurrency {}, dry run {})",
            options.collection, options.page_size, options.concurrency, options.dry_run
        );

        let scan = OfferScan::new(options.collection.clone())
            .page_size(options.page_size)
            .start_after(options.start_after.clone())
            .retry(options.retry.clone());

        let mut outcomes = scan
            .stream(self.store.as_ref())
            .map(|doc| async move {
                match doc {
                    Ok(doc) => self.process(doc).await,
                    Err(err) => Err(err),
                }
            })
            .buffer_unordered(options.concurrency.max(1));

        let mut summary = PassSummary::new(options.dry_run);
        while let Some(outcome) = outcomes.next().await {
            let outcome = outcome?;
            summary.record(&outcome);
            on_record(&outcome)?;
        }

        info!(
            "Reconciliation pass finished: {} migrated, {} skipped, {} invalid",
            summary.migrated, summary.skipped, summary.invalid
        );
        if summary.ambiguous > 0 {
            warn!(
                "{} tiered offers assumed one unit per participant; review them for data quality",
                summary.ambiguous
            );
        }
        Ok(summary)
    }

    async fn process(&self, doc: OfferDocument) -> Result<RecordOutcome, StoreError> {
        let (record, reconciliation) = match reconcile_document(&doc) {
            Ok(DocumentReconciliation::Reconciled { record, reconciliation }) => (record, reconciliation),
            Ok(DocumentReconciliation::AlreadyMigrated) => {
                debug!("Offer {} already has a total quantity", doc.id);
                return Ok(RecordOutcome::Skipped { id: doc.id });
            }
            Err(err) => {
                warn!("Skipping offer {}: {}", doc.id, err);
                return Ok(RecordOutcome::Invalid(err));
            }
        };

        if !self.options.dry_run {
            let patch = reconciliation.to_patch();
            retry_with_backoff(&self.options.retry, "update", || {
                self.store.update(&self.options.collection, &record.id, &patch)
            })
            .await?;
        }

        Ok(RecordOutcome::Migrated {
            id: record.id,
            pricing_model: record.pricing_model,
            previous_participants: record.current_participants,
            reconciliation,
            dry_run: self.options.dry_run,
        })
    }
}
