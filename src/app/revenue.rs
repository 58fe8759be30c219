use crate::app::require_artist;
use crate::domain::model::{RevenueSummary, RevenueTransaction};
use crate::error::Result;
use crate::storage::Store;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema)]
pub struct RevenueReport {
    /// One entry per currency, sorted by currency code.
    pub totals: Vec<RevenueSummary>,
    /// Newest first.
    pub transactions: Vec<RevenueTransaction>,
}

pub struct RevenueService {
    store: Arc<dyn Store>,
}

impl RevenueService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn report(&self, user_id: Uuid) -> Result<RevenueReport> {
        let artist = require_artist(self.store.as_ref(), user_id).await?;
        let transactions = self.store.list_revenue(artist.id).await?;
        Ok(RevenueReport {
            totals: RevenueSummary::from_transactions(&transactions),
            transactions,
        })
    }
}
