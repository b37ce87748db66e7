//! Core cost model: exchange rates, conversion, totals and chart data

pub mod aggregate;
pub mod catalog;
pub mod chart;
pub mod config;
pub mod converter;
pub mod currency;
pub mod error;
pub mod log;
pub mod model;
pub mod rates;
pub mod refresh;

// Re-export main types for cleaner imports
pub use aggregate::{CostAggregator, CostFilter};
pub use catalog::Catalog;
pub use chart::{ChartDataPipeline, ChartFilters, ChartRecord};
pub use converter::RateConverter;
pub use currency::{CurrencyCode, RateSupplier};
pub use error::BudgetError;
pub use model::{CostComponent, Participant, ParticipantKey, Trip};
pub use rates::{CurrencyRate, RateTable};
pub use refresh::{RateRefreshPolicy, RefreshOutcome};
