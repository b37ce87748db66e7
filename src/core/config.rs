use crate::core::catalog::{Catalog, CategorySpec, default_categories};
use crate::core::currency::CurrencyCode;
use crate::core::model::{CostComponent, Participant, Trip, TripId, UserId};
use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::{fs, path::PathBuf};
use tracing::debug;

pub const DEFAULT_FXRATES_URL: &str = "https://api.fxratesapi.com";

fn default_base_currency() -> CurrencyCode {
    CurrencyCode::new("PLN").unwrap_or_else(|_| unreachable!("PLN is a valid code"))
}

fn default_freshness_hours() -> i64 {
    crate::core::refresh::DEFAULT_FRESHNESS_HOURS
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct RatesConfig {
    /// Currency every stored rate is quoted against.
    #[serde(default = "default_base_currency")]
    pub base_currency: CurrencyCode,
    #[serde(default = "default_freshness_hours")]
    pub freshness_hours: i64,
}

impl Default for RatesConfig {
    fn default() -> Self {
        RatesConfig {
            base_currency: default_base_currency(),
            freshness_hours: default_freshness_hours(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct FxRatesProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ProvidersConfig {
    pub fxrates: Option<FxRatesProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            fxrates: Some(FxRatesProviderConfig {
                base_url: DEFAULT_FXRATES_URL.to_string(),
            }),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct TripSpec {
    pub id: TripId,
    #[serde(default)]
    pub owner_id: UserId,
    pub name: String,
    /// Falls back to the top-level `currency` when absent.
    pub currency: Option<CurrencyCode>,
    #[serde(default)]
    pub participants: Vec<Participant>,
    #[serde(default)]
    pub components: Vec<CostComponent>,
}

impl TripSpec {
    pub fn to_trip(&self, default_currency: &CurrencyCode) -> Result<Trip> {
        let currency = self.currency.clone().unwrap_or_else(|| default_currency.clone());
        Trip::new(
            self.id,
            self.owner_id,
            &self.name,
            currency,
            self.participants.clone(),
            self.components.clone(),
        )
        .with_context(|| format!("Invalid trip \"{}\" in config", self.name))
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// Preferred currency for trips that do not name one.
    pub currency: CurrencyCode,
    #[serde(default)]
    pub rates: RatesConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default = "default_categories")]
    pub categories: Vec<CategorySpec>,
    #[serde(default)]
    pub trips: Vec<TripSpec>,
    pub data_path: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("org", "tripcost", "tripcost")
            .context("Could not determine project directories")
    }

    pub fn default_config_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        Ok(Self::project_dirs()?.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        config.validate()?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.rates.freshness_hours <= 0 {
            bail!(
                "rates.freshness_hours must be positive, got {}",
                self.rates.freshness_hours
            );
        }
        self.freshness_window()?;
        let mut ids = HashSet::new();
        for trip in &self.trips {
            if !ids.insert(trip.id) {
                bail!("Duplicate trip id {} in config", trip.id);
            }
        }
        Ok(())
    }

    pub fn catalog(&self) -> Catalog {
        Catalog::new(&self.categories)
    }

    pub fn freshness_window(&self) -> Result<chrono::Duration> {
        chrono::Duration::try_hours(self.rates.freshness_hours).with_context(|| {
            format!(
                "rates.freshness_hours is too large, got {}",
                self.rates.freshness_hours
            )
        })
    }

    pub fn fxrates_base_url(&self) -> &str {
        self.providers
            .fxrates
            .as_ref()
            .map_or(DEFAULT_FXRATES_URL, |p| &p.base_url)
    }

    pub fn trips(&self) -> Result<Vec<Trip>> {
        self.trips.iter().map(|t| t.to_trip(&self.currency)).collect()
    }

    pub fn trip(&self, id: TripId) -> Result<Trip> {
        match self.trips.iter().find(|t| t.id == id) {
            Some(spec) => spec.to_trip(&self.currency),
            None => bail!("Trip {id} not found in config"),
        }
    }
}
