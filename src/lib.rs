pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::cli::chart::ChartArgs;
use crate::cli::summary::SummaryArgs;
use crate::core::config::AppConfig;
use crate::core::currency::CurrencyCode;
use crate::core::rates::RateTable;
use crate::core::refresh::RateRefreshPolicy;
use crate::providers::FxRatesApiProvider;
use crate::store::disk::DiskRateStore;
use anyhow::{Context, Result};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info};

pub enum AppCommand {
    RatesShow,
    RatesRefresh {
        force: bool,
    },
    RatesConvert {
        amount: Decimal,
        from: CurrencyCode,
        to: CurrencyCode,
    },
    Summary(SummaryArgs),
    Chart(ChartArgs),
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("tripcost starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let data_path = config.default_data_path()?;
    let store = DiskRateStore::open(&data_path)
        .with_context(|| format!("Failed to open rate store at {}", data_path.display()))?;
    let table = RateTable::open(config.rates.base_currency.clone(), Arc::new(store))
        .context("Failed to load stored exchange rates")?;
    let policy = RateRefreshPolicy::with_window(Arc::new(table), config.freshness_window()?);
    let supplier = FxRatesApiProvider::new(config.fxrates_base_url())?;

    match command {
        AppCommand::RatesShow => cli::rates::show(&policy),
        AppCommand::RatesRefresh { force } => cli::rates::refresh(&policy, &supplier, force).await,
        AppCommand::RatesConvert { amount, from, to } => {
            cli::rates::ensure_fresh(&policy, &supplier).await?;
            cli::rates::convert(&policy, amount, &from, &to)
        }
        AppCommand::Summary(args) => {
            cli::rates::ensure_fresh(&policy, &supplier).await?;
            cli::summary::run(&config, policy.table(), &args)
        }
        AppCommand::Chart(args) => {
            cli::rates::ensure_fresh(&policy, &supplier).await?;
            cli::chart::run(&config, policy.table(), &args)
        }
    }
}
