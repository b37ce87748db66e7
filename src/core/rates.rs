//! Exchange rates stored against a single base currency.
//!
//! Every row answers "1 unit of base = `rate` units of `code`". Cross rates are
//! never stored; see [`crate::core::converter::RateConverter`].

use crate::core::currency::CurrencyCode;
use crate::core::error::{BudgetError, Result};
use crate::store::RateStore;
use crate::store::memory::MemoryRateStore;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyRate {
    pub code: CurrencyCode,
    pub rate: Decimal,
    pub updated_at: DateTime<Utc>,
}

impl CurrencyRate {
    /// Builds a row, rejecting zero and negative rates.
    pub fn new(code: CurrencyCode, rate: Decimal, updated_at: DateTime<Utc>) -> Result<Self> {
        if rate <= Decimal::ZERO {
            return Err(BudgetError::InvalidRate {
                code: code.to_string(),
                reason: format!("rate must be positive, got {rate}"),
            });
        }
        Ok(Self {
            code,
            rate,
            updated_at,
        })
    }
}

/// Immutable view of the table at one point in time.
#[derive(Debug, Clone)]
pub struct RateSnapshot {
    base: CurrencyCode,
    rates: HashMap<CurrencyCode, CurrencyRate>,
    last_refreshed: Option<DateTime<Utc>>,
}

impl RateSnapshot {
    fn new(base: CurrencyCode, rates: HashMap<CurrencyCode, CurrencyRate>) -> Self {
        let last_refreshed = rates.values().map(|r| r.updated_at).max();
        Self {
            base,
            rates,
            last_refreshed,
        }
    }

    pub fn base_currency(&self) -> &CurrencyCode {
        &self.base
    }

    /// Rate of `code` against the base. The base itself is always 1.
    pub fn get(&self, code: &CurrencyCode) -> Option<Decimal> {
        if *code == self.base {
            return Some(Decimal::ONE);
        }
        self.rates.get(code).map(|row| row.rate)
    }

    pub fn last_refreshed(&self) -> Option<DateTime<Utc>> {
        self.last_refreshed
    }

    /// Whether a row is stored for `code`; the implicit base rate does not count.
    pub fn contains(&self, code: &CurrencyCode) -> bool {
        self.rates.contains_key(code)
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    /// All stored rows ordered by code.
    pub fn rows(&self) -> Vec<CurrencyRate> {
        let mut rows: Vec<CurrencyRate> = self.rates.values().cloned().collect();
        rows.sort_by(|a, b| a.code.cmp(&b.code));
        rows
    }
}

/// Shared rate table.
///
/// Writers are serialized and publish a fresh [`RateSnapshot`] only after the
/// batch is persisted, so readers see either the old or the new batch in full.
pub struct RateTable {
    base: CurrencyCode,
    store: Arc<dyn RateStore>,
    current: RwLock<Arc<RateSnapshot>>,
    writer: Mutex<()>,
}

impl RateTable {
    pub fn in_memory(base: CurrencyCode) -> Self {
        Self {
            current: RwLock::new(Arc::new(RateSnapshot::new(base.clone(), HashMap::new()))),
            base,
            store: Arc::new(MemoryRateStore::new()),
            writer: Mutex::new(()),
        }
    }

    /// Opens a table over `store`, loading whatever rows it already holds.
    pub fn open(base: CurrencyCode, store: Arc<dyn RateStore>) -> Result<Self> {
        let mut rates = HashMap::new();
        for row in store.load()? {
            if row.code == base && row.rate != Decimal::ONE {
                warn!(code = %row.code, rate = %row.rate, "Ignoring stored base rate other than 1");
                continue;
            }
            rates.insert(row.code.clone(), row);
        }
        debug!(base = %base, rows = rates.len(), "Opened rate table");

        Ok(Self {
            current: RwLock::new(Arc::new(RateSnapshot::new(base.clone(), rates))),
            base,
            store,
            writer: Mutex::new(()),
        })
    }

    pub fn base_currency(&self) -> &CurrencyCode {
        &self.base
    }

    pub fn snapshot(&self) -> Arc<RateSnapshot> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn get(&self, code: &CurrencyCode) -> Result<Decimal> {
        self.snapshot()
            .get(code)
            .ok_or_else(|| BudgetError::CurrencyUnavailable(vec![code.to_string()]))
    }

    pub fn last_refreshed(&self) -> Option<DateTime<Utc>> {
        self.snapshot().last_refreshed()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    pub fn rates(&self) -> Vec<CurrencyRate> {
        self.snapshot().rows()
    }

    /// Checks a row against the table's own rules on top of [`CurrencyRate::new`].
    pub fn validate(&self, row: &CurrencyRate) -> Result<()> {
        if row.rate <= Decimal::ZERO {
            return Err(BudgetError::InvalidRate {
                code: row.code.to_string(),
                reason: format!("rate must be positive, got {}", row.rate),
            });
        }
        if row.code == self.base && row.rate != Decimal::ONE {
            return Err(BudgetError::InvalidRate {
                code: row.code.to_string(),
                reason: format!("base currency rate must be 1, got {}", row.rate),
            });
        }
        Ok(())
    }

    pub fn upsert(&self, code: CurrencyCode, rate: Decimal, updated_at: DateTime<Utc>) -> Result<()> {
        let row = CurrencyRate::new(code, rate, updated_at)?;
        self.upsert_batch(vec![row]).map(|_| ())
    }

    /// Inserts or replaces every row as one unit. Any invalid row rejects the
    /// whole batch; nothing is stored in that case.
    pub fn upsert_batch(&self, rows: Vec<CurrencyRate>) -> Result<usize> {
        for row in &rows {
            self.validate(row)?;
        }

        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = self.snapshot().rates.clone();

        self.store.save_batch(&rows)?;

        let count = rows.len();
        for row in rows {
            next.insert(row.code.clone(), row);
        }
        let snapshot = Arc::new(RateSnapshot::new(self.base.clone(), next));
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = snapshot;

        debug!(count, "Applied rate batch");
        Ok(count)
    }
}
