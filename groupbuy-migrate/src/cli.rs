use clap::Parser;

use crate::pass::PassOptions;

/// Backfill `totalQuantity` on legacy group-buy offers.
///
/// With no arguments, runs one full pass with the configured settings.
#[derive(Parser, Debug, Default)]
#[command(name = "groupbuy-migrate", version)]
pub struct Cli {
    /// Reconcile and report without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Offer collection (table) to reconcile
    #[arg(long)]
    pub collection: Option<String>,

    /// Documents fetched per page
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub page_size: Option<u32>,

    /// Records processed concurrently
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub concurrency: Option<u32>,

    /// Resume after this offer id
    #[arg(long)]
    pub start_after: Option<String>,

    /// Extra attempts for transient storage failures
    #[arg(long)]
    pub retries: Option<u32>,
}

impl Cli {
    /// Layer command-line overrides over configured options.
    pub fn apply(&self, mut options: PassOptions) -> PassOptions {
        options.dry_run |= self.dry_run;
        if let Some(collection) = &self.collection {
            options.collection = collection.clone();
        }
        if let Some(page_size) = self.page_size {
            options.page_size = page_size as usize;
        }
        if let Some(concurrency) = self.concurrency {
            options.concurrency = concurrency as usize;
        }
        if self.start_after.is_some() {
            options.start_after = self.start_after.clone();
        }
        if let Some(retries) = self.retries {
            options.retry = options.retry.with_max_attempts(retries.saturating_add(1));
        }
        options
    }
}
