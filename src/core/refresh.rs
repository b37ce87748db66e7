//! Time-based refresh of the rate table from an external supplier.

use crate::core::currency::{CurrencyCode, RateSupplier};
use crate::core::error::{BudgetError, Result};
use crate::core::rates::{CurrencyRate, RateTable};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

pub const DEFAULT_FRESHNESS_HOURS: i64 = 24;

/// A supplier row that was not stored, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRate {
    pub code: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshReport {
    pub refreshed_at: DateTime<Utc>,
    pub inserted: Vec<CurrencyCode>,
    pub updated: Vec<CurrencyCode>,
    pub rejected: Vec<RejectedRate>,
}

impl RefreshReport {
    pub fn applied(&self) -> usize {
        self.inserted.len() + self.updated.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The table was refreshed within the freshness window; the supplier was not called.
    AlreadyFresh { last_refreshed: DateTime<Utc> },
    Updated(RefreshReport),
}

/// Keeps a [`RateTable`] fresh.
///
/// Stale means the table is empty or its newest row is at least one freshness
/// window old. Staleness is evaluated lazily on every call; nothing polls.
pub struct RateRefreshPolicy {
    table: Arc<RateTable>,
    freshness_window: Duration,
}

impl RateRefreshPolicy {
    pub fn new(table: Arc<RateTable>) -> Self {
        Self::with_window(table, Duration::hours(DEFAULT_FRESHNESS_HOURS))
    }

    pub fn with_window(table: Arc<RateTable>, freshness_window: Duration) -> Self {
        Self {
            table,
            freshness_window,
        }
    }

    pub fn table(&self) -> &Arc<RateTable> {
        &self.table
    }

    pub fn freshness_window(&self) -> Duration {
        self.freshness_window
    }

    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        match self.table.last_refreshed() {
            None => true,
            Some(last) => now - last >= self.freshness_window,
        }
    }

    /// Refreshes the table if it is stale.
    ///
    /// Rows with a malformed code or a non-finite, zero or negative rate are
    /// skipped and listed in [`RefreshReport::rejected`]; the remaining rows are
    /// applied as one batch. A supplier failure leaves the table untouched.
    pub async fn refresh(
        &self,
        now: DateTime<Utc>,
        supplier: &(dyn RateSupplier + Send + Sync),
    ) -> Result<RefreshOutcome> {
        if !self.needs_refresh(now) {
            if let Some(last_refreshed) = self.table.last_refreshed() {
                info!("Exchange rates are already up to date (last refresh {last_refreshed})");
                return Ok(RefreshOutcome::AlreadyFresh { last_refreshed });
            }
        }
        self.force_refresh(now, supplier)
            .await
            .map(RefreshOutcome::Updated)
    }

    /// Fetches and merges a new batch regardless of freshness.
    #[instrument(name = "RateRefresh", skip(self, supplier), fields(base = %self.table.base_currency()))]
    pub async fn force_refresh(
        &self,
        now: DateTime<Utc>,
        supplier: &(dyn RateSupplier + Send + Sync),
    ) -> Result<RefreshReport> {
        let base = self.table.base_currency().clone();
        debug!("Fetching exchange rates for base currency {base}");

        let fetched = supplier
            .fetch_latest_rates(base.as_str())
            .await
            .map_err(|e| {
                warn!("Error fetching exchange rates for {base}: {e:#}");
                BudgetError::RefreshTransport {
                    base: base.to_string(),
                    reason: format!("{e:#}"),
                }
            })?;

        let mut fetched: Vec<(String, f64)> = fetched.into_iter().collect();
        fetched.sort_by(|a, b| a.0.cmp(&b.0));

        let before = self.table.snapshot();
        let mut rows = Vec::with_capacity(fetched.len());
        let mut inserted = Vec::new();
        let mut updated = Vec::new();
        let mut rejected = Vec::new();

        for (raw_code, value) in fetched {
            match self.parse_row(&raw_code, value, now) {
                Ok(row) => {
                    if before.contains(&row.code) {
                        updated.push(row.code.clone());
                    } else {
                        inserted.push(row.code.clone());
                    }
                    rows.push(row);
                }
                Err(e) => {
                    warn!("Rejected rate for {raw_code}: {e}");
                    rejected.push(RejectedRate {
                        code: raw_code,
                        reason: e.to_string(),
                    });
                }
            }
        }

        if rows.is_empty() {
            return Err(BudgetError::EmptyRateBatch {
                base: base.to_string(),
            });
        }

        self.table.upsert_batch(rows)?;
        info!(
            inserted = inserted.len(),
            updated = updated.len(),
            rejected = rejected.len(),
            "Exchange rates successfully updated"
        );

        Ok(RefreshReport {
            refreshed_at: now,
            inserted,
            updated,
            rejected,
        })
    }

    fn parse_row(&self, raw_code: &str, value: f64, now: DateTime<Utc>) -> Result<CurrencyRate> {
        let code = CurrencyCode::new(raw_code)?;
        let rate = Decimal::from_f64(value).ok_or_else(|| BudgetError::InvalidRate {
            code: code.to_string(),
            reason: format!("{value} is not a finite decimal number"),
        })?;
        let row = CurrencyRate::new(code, rate, now)?;
        self.table.validate(&row)?;
        Ok(row)
    }
}
