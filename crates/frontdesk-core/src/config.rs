//! Front-desk configuration and logging setup.

use std::path::Path;

use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// Application-level constants
pub const APP_NAME: &str = "Front Desk";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default storage key for the record list.
pub const DEFAULT_RECORDS_KEY: &str = "ibne_records";
/// Default storage key for `{lastToken, date}`.
pub const DEFAULT_TOKEN_INFO_KEY: &str = "ibne_token_info";
/// Default ledger capacity.
pub const DEFAULT_MAX_RECORDS: usize = 1000;

/// Default log filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "frontdesk_core=info,frontdesk_triage=info"
}

/// Install the global tracing subscriber.
///
/// Returns `false` if a subscriber was already installed.
pub fn init_logging() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_log_filter())),
        )
        .try_init()
        .is_ok()
}

/// Which midnight starts a new token day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DayBoundary {
    /// Local wall-clock midnight
    #[default]
    Local,
    /// UTC midnight
    Utc,
}

impl DayBoundary {
    /// Current calendar day.
    pub fn today(&self) -> NaiveDate {
        self.now().date()
    }

    /// Current wall-clock time on this boundary's clock.
    pub fn now(&self) -> NaiveDateTime {
        match self {
            DayBoundary::Local => chrono::Local::now().naive_local(),
            DayBoundary::Utc => chrono::Utc::now().naive_utc(),
        }
    }
}

/// Front-desk configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontDeskConfig {
    /// Origin and path that shareable slip URLs point at
    pub share_base_url: String,
    /// Storage key for the record list
    pub records_key: String,
    /// Storage key for the token counter
    pub token_info_key: String,
    /// Most records the ledger retains
    pub max_records: usize,
    /// Day boundary for token resets and "today" statistics
    pub day_boundary: DayBoundary,
}

impl Default for FrontDeskConfig {
    fn default() -> Self {
        Self {
            share_base_url: "http://localhost/".into(),
            records_key: DEFAULT_RECORDS_KEY.into(),
            token_info_key: DEFAULT_TOKEN_INFO_KEY.into(),
            max_records: DEFAULT_MAX_RECORDS,
            day_boundary: DayBoundary::Local,
        }
    }
}

impl FrontDeskConfig {
    /// Parse a JSON config; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Load a JSON config file.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = Self::from_json(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the ledger cannot honour.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.max_records > 0, "max_records must be positive");
        Ok(())
    }
}
