use crate::core::currency::CurrencyCode;
use crate::core::error::Result;
use crate::core::rates::CurrencyRate;
use crate::store::RateStore;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use tracing::debug;

/// In-memory rate store, used for tests and for runs without a data directory
#[derive(Default)]
pub struct MemoryRateStore {
    inner: Mutex<HashMap<CurrencyCode, CurrencyRate>>,
}

impl MemoryRateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RateStore for MemoryRateStore {
    fn load(&self) -> Result<Vec<CurrencyRate>> {
        let rows = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        debug!("Memory store LOAD of {} rows", rows.len());
        Ok(rows.values().cloned().collect())
    }

    fn save_batch(&self, rows: &[CurrencyRate]) -> Result<()> {
        let mut stored = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        for row in rows {
            stored.insert(row.code.clone(), row.clone());
        }
        debug!("Memory store PUT of {} rows", rows.len());
        Ok(())
    }
}
