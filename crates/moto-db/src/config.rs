//! # Shop Configuration
//!
//! Settings loaded at startup.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`MOTO_*`)
//! 2. Defaults (this file)
//!
//! Configuration is read-only after startup. [`ShopConfig::book_settings`]
//! hands the business switches to moto-core, [`ShopConfig::db_config`]
//! builds the pool settings.

use moto_core::{
    BookSettings, DEFAULT_LOW_STOCK_THRESHOLD, DEFAULT_LOYALTY_POINT_VALUE,
    DEFAULT_OIL_CHANGE_INTERVAL_DAYS,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

use crate::pool::DbConfig;

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable is set but cannot be parsed.
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}

/// Shop configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ShopConfig {
    /// Path to the SQLite database file.
    /// Default: `./moto-shop.db`
    pub database_path: PathBuf,

    /// Displayed in reports and the KPI snapshot.
    pub shop_name: String,

    /// Branch used when a caller does not name one.
    pub default_branch: String,

    /// Let outbound postings take branch stock below zero.
    pub allow_negative_stock: bool,

    pub low_stock_threshold: i64,

    pub oil_change_interval_days: i64,

    /// Money spent per loyalty point.
    pub loyalty_point_value: i64,

    /// Maximum number of pooled connections.
    pub max_connections: u32,
}

impl Default for ShopConfig {
    fn default() -> Self {
        ShopConfig {
            database_path: PathBuf::from("./moto-shop.db"),
            shop_name: "Moto Shop".to_string(),
            default_branch: "HN".to_string(),
            allow_negative_stock: false,
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
            oil_change_interval_days: DEFAULT_OIL_CHANGE_INTERVAL_DAYS,
            loyalty_point_value: DEFAULT_LOYALTY_POINT_VALUE,
            max_connections: 5,
        }
    }
}

impl ShopConfig {
    /// Creates a ShopConfig from environment variables and defaults.
    ///
    /// ## Environment Variables
    /// - `MOTO_DB_PATH`: database file
    /// - `MOTO_SHOP_NAME`: shop name
    /// - `MOTO_DEFAULT_BRANCH`: default branch id
    /// - `MOTO_ALLOW_NEGATIVE_STOCK`: `true`/`false`
    /// - `MOTO_LOW_STOCK_THRESHOLD`: integer
    /// - `MOTO_OIL_CHANGE_INTERVAL_DAYS`: integer
    /// - `MOTO_LOYALTY_POINT_VALUE`: integer, money per point
    /// - `MOTO_DB_MAX_CONNECTIONS`: integer
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`ShopConfig::from_env`] with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = ShopConfig::default();

        if let Some(path) = lookup("MOTO_DB_PATH") {
            config.database_path = PathBuf::from(path);
        }
        if let Some(name) = lookup("MOTO_SHOP_NAME") {
            config.shop_name = name;
        }
        if let Some(branch) = lookup("MOTO_DEFAULT_BRANCH") {
            config.default_branch = branch;
        }
        if let Some(value) = parse_var(&lookup, "MOTO_ALLOW_NEGATIVE_STOCK")? {
            config.allow_negative_stock = value;
        }
        if let Some(value) = parse_var(&lookup, "MOTO_LOW_STOCK_THRESHOLD")? {
            config.low_stock_threshold = value;
        }
        if let Some(value) = parse_var(&lookup, "MOTO_OIL_CHANGE_INTERVAL_DAYS")? {
            config.oil_change_interval_days = positive(value, "MOTO_OIL_CHANGE_INTERVAL_DAYS")?;
        }
        if let Some(value) = parse_var(&lookup, "MOTO_LOYALTY_POINT_VALUE")? {
            config.loyalty_point_value = positive(value, "MOTO_LOYALTY_POINT_VALUE")?;
        }
        if let Some(value) = parse_var::<u32, _>(&lookup, "MOTO_DB_MAX_CONNECTIONS")? {
            if value == 0 {
                return Err(ConfigError::InvalidValue("MOTO_DB_MAX_CONNECTIONS".to_string()));
            }
            config.max_connections = value;
        }

        Ok(config)
    }

    /// Business switches for the ledger and reports.
    pub fn book_settings(&self) -> BookSettings {
        BookSettings {
            allow_negative_stock: self.allow_negative_stock,
            low_stock_threshold: self.low_stock_threshold,
            oil_change_interval_days: self.oil_change_interval_days,
            loyalty_point_value: self.loyalty_point_value,
        }
    }

    /// Pool settings for [`crate::Database::new`].
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database_path).max_connections(self.max_connections)
    }
}

fn parse_var<T, F>(lookup: &F, var: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(var.to_string())),
    }
}

fn positive(value: i64, var: &str) -> Result<i64, ConfigError> {
    if value > 0 {
        Ok(value)
    } else {
        Err(ConfigError::InvalidValue(var.to_string()))
    }
}
