pub mod disk;
pub mod memory;

use crate::core::error::Result;
use crate::core::rates::CurrencyRate;

/// Durable home of the rate table rows.
///
/// `save_batch` must apply all rows or none of them.
pub trait RateStore: Send + Sync {
    fn load(&self) -> Result<Vec<CurrencyRate>>;

    fn save_batch(&self, rows: &[CurrencyRate]) -> Result<()>;
}
