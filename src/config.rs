use anyhow::{Context, Result};

use crate::application::LedgerService;
use crate::domain::Calendar;

/// Runtime settings resolved from command line flags and environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite database file
    pub database: String,
    /// Username whose ledger commands act on
    pub owner: String,
    /// Calendar used for day and month boundaries
    pub calendar: Calendar,
}

impl Config {
    pub fn new(
        database: impl Into<String>,
        owner: impl Into<String>,
        utc_offset: &str,
    ) -> Result<Self> {
        let calendar = Calendar::parse(utc_offset)
            .with_context(|| format!("Invalid --utc-offset '{}'", utc_offset))?;

        Ok(Self {
            database: database.into(),
            owner: owner.into(),
            calendar,
        })
    }

    /// Create (or upgrade) the database and return a service for it.
    pub async fn init_service(&self) -> Result<LedgerService> {
        let service = LedgerService::init(&self.database).await?;
        Ok(service.with_calendar(self.calendar))
    }

    /// Open the existing database and return a service for it.
    pub async fn open_service(&self) -> Result<LedgerService> {
        let service = LedgerService::connect(&self.database)
            .await
            .with_context(|| {
                format!(
                    "Could not open database '{}'. Run `moneta init` first",
                    self.database
                )
            })?;
        Ok(service.with_calendar(self.calendar))
    }
}
