use crate::core::error::{BudgetError, Result};
use crate::core::rates::CurrencyRate;
use crate::store::RateStore;
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use std::path::Path;
use tracing::debug;

const RATES_PARTITION: &str = "exchange_rates";

fn store_error(e: impl std::fmt::Display) -> BudgetError {
    BudgetError::Store(e.to_string())
}

/// Rate store persisted in a fjall keyspace, one key per currency code.
pub struct DiskRateStore {
    keyspace: Keyspace,
    partition: PartitionHandle,
}

impl DiskRateStore {
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path).map_err(store_error)?;

        let keyspace = Config::new(path.join("rates")).open().map_err(store_error)?;
        let partition = keyspace
            .open_partition(RATES_PARTITION, PartitionCreateOptions::default())
            .map_err(store_error)?;
        debug!("Opened rate store at {}", path.display());

        Ok(Self {
            keyspace,
            partition,
        })
    }
}

impl RateStore for DiskRateStore {
    fn load(&self) -> Result<Vec<CurrencyRate>> {
        let mut rows = Vec::new();
        for item in self.partition.iter() {
            let (_code, value) = item.map_err(store_error)?;
            let row: CurrencyRate = serde_json::from_slice(&value).map_err(store_error)?;
            rows.push(row);
        }
        debug!("Disk store LOAD of {} rows", rows.len());
        Ok(rows)
    }

    fn save_batch(&self, rows: &[CurrencyRate]) -> Result<()> {
        let mut batch = self.keyspace.batch();
        for row in rows {
            let value = serde_json::to_vec(row).map_err(store_error)?;
            batch.insert(&self.partition, row.code.as_str(), value);
        }
        batch.commit().map_err(store_error)?;
        self.keyspace
            .persist(PersistMode::SyncAll)
            .map_err(store_error)?;
        debug!("Disk store PUT of {} rows", rows.len());
        Ok(())
    }
}
