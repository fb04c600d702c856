use std::sync::Arc;

use rr_core::accounts::AccountService;
use rr_core::traits::{CatalogRepo, ReviewRepo};

use crate::metrics::Metrics;

/// Shared across all request handlers. Every field is a cheap handle.
#[derive(Clone)]
pub struct AppState {
    pub accounts: AccountService,
    pub catalog: Arc<dyn CatalogRepo>,
    pub reviews: Arc<dyn ReviewRepo>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(accounts: AccountService, catalog: Arc<dyn CatalogRepo>, reviews: Arc<dyn ReviewRepo>) -> Self {
        Self { accounts, catalog, reviews, metrics: Arc::new(Metrics::new()) }
    }
}
