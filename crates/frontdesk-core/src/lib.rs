//! Front-Desk Core Library
//!
//! Local-first clinic registration: daily queue tokens, a bounded patient
//! ledger, scannable slip payloads and history export.
//!
//! # Architecture
//!
//! ```text
//! Registration form ──(optional triage suggestion)──▶ compose record
//!                                                          │
//!                                             token = ledger preview
//!                                                          │
//!                                  ┌───────────────────────▼───────────────────────┐
//!                                  │                Ledger insert                  │
//!                                  │  dedupe by id · cap 1000 · persist list+token │
//!                                  └───────────────────────┬───────────────────────┘
//!                                                          │
//!                          ┌───────────────────────────────┼───────────────────────┐
//!                          │                               │                       │
//!                          ▼                               ▼                       ▼
//!                 Slip URL + QR code                 Dashboard stats          CSV export
//!                          │
//!                 scan on second device
//!                          │
//!                          ▼
//!                 Verification view
//! ```
//!
//! # Modules
//!
//! - [`db`]: SQLite-backed key-value store
//! - [`models`]: Patient records and the registration form
//! - [`ledger`]: Record list, daily token counter, search and stats
//! - [`codec`]: Shareable payloads, verification flow and QR rendering
//! - [`export`]: CSV history export
//! - [`config`]: Configuration and logging setup

pub mod codec;
pub mod config;
pub mod db;
pub mod export;
pub mod ledger;
pub mod models;

// Re-export commonly used types
pub use codec::{VerificationFlow, VerificationState};
pub use config::{DayBoundary, FrontDeskConfig};
pub use db::{Database, KeyValueStore};
pub use ledger::{DailyStats, InsertOutcome, Ledger};
pub use models::{
    Department, Gender, MaritalStatus, PatientRecord, PaymentStatus, RegistrationForm,
    TriagePriority,
};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::{Arc, Mutex};

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum FrontDeskError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Export error: {0}")]
    ExportError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<db::DbError> for FrontDeskError {
    fn from(e: db::DbError) -> Self {
        FrontDeskError::DatabaseError(e.to_string())
    }
}

impl From<models::ValidationError> for FrontDeskError {
    fn from(e: models::ValidationError) -> Self {
        FrontDeskError::InvalidInput(e.to_string())
    }
}

impl From<models::UnknownLabel> for FrontDeskError {
    fn from(e: models::UnknownLabel) -> Self {
        FrontDeskError::InvalidInput(e.to_string())
    }
}

impl From<codec::CodecError> for FrontDeskError {
    fn from(e: codec::CodecError) -> Self {
        FrontDeskError::SerializationError(e.to_string())
    }
}

impl From<export::ExportError> for FrontDeskError {
    fn from(e: export::ExportError) -> Self {
        FrontDeskError::ExportError(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for FrontDeskError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        FrontDeskError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Install the tracing subscriber. Returns false if one is already set.
#[uniffi::export]
pub fn setup_logging() -> bool {
    config::init_logging()
}

/// Open or create a front desk backed by the database at `path`.
///
/// `config_json` overrides the default configuration.
#[uniffi::export]
pub fn open_front_desk(
    path: String,
    config_json: Option<String>,
) -> Result<Arc<FrontDeskCore>, FrontDeskError> {
    let config = parse_config(config_json)?;
    let db = Database::open(&path)?;
    Ok(Arc::new(FrontDeskCore::new(db, config)))
}

/// Create an in-memory front desk (for testing).
#[uniffi::export]
pub fn open_front_desk_in_memory(
    config_json: Option<String>,
) -> Result<Arc<FrontDeskCore>, FrontDeskError> {
    let config = parse_config(config_json)?;
    let db = Database::open_in_memory()?;
    Ok(Arc::new(FrontDeskCore::new(db, config)))
}

fn parse_config(config_json: Option<String>) -> Result<FrontDeskConfig, FrontDeskError> {
    let config = match config_json {
        Some(json) => FrontDeskConfig::from_json(&json)
            .map_err(|e| FrontDeskError::ConfigError(e.to_string()))?,
        None => FrontDeskConfig::default(),
    };
    config
        .validate()
        .map_err(|e| FrontDeskError::ConfigError(e.to_string()))?;
    Ok(config)
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe front desk wrapper for FFI.
#[derive(uniffi::Object)]
pub struct FrontDeskCore {
    ledger: Arc<Mutex<Ledger<Database>>>,
    verification: Mutex<VerificationFlow>,
    config: FrontDeskConfig,
}

impl FrontDeskCore {
    fn new(db: Database, config: FrontDeskConfig) -> Self {
        Self {
            ledger: Arc::new(Mutex::new(Ledger::initialize(db, &config))),
            verification: Mutex::new(VerificationFlow::new()),
            config,
        }
    }
}

#[uniffi::export]
impl FrontDeskCore {
    // =========================================================================
    // Registration
    // =========================================================================

    /// Token the next registration will receive.
    pub fn next_token(&self) -> Result<String, FrontDeskError> {
        let ledger = self.ledger.lock()?;
        Ok(ledger.allocate_token())
    }

    /// Build a slip preview without saving it.
    pub fn preview_record(
        &self,
        form: FfiRegistrationForm,
    ) -> Result<FfiPatientRecord, FrontDeskError> {
        let form = RegistrationForm::try_from(form)?;
        let ledger = self.ledger.lock()?;
        Ok(ledger.compose(&form)?.into())
    }

    /// Validate, compose and save a registration.
    pub fn register(&self, form: FfiRegistrationForm) -> Result<FfiRegistration, FrontDeskError> {
        let form = RegistrationForm::try_from(form)?;
        let mut ledger = self.ledger.lock()?;
        let record = ledger.compose(&form)?;
        let outcome = ledger.insert(record.clone());
        Ok(FfiRegistration {
            record: record.into(),
            outcome: outcome.into(),
        })
    }

    /// Save a previously composed record.
    pub fn save_record(&self, record: FfiPatientRecord) -> Result<FfiInsertOutcome, FrontDeskError> {
        let record = PatientRecord::try_from(record)?;
        let mut ledger = self.ledger.lock()?;
        Ok(ledger.insert(record).into())
    }

    // =========================================================================
    // History & Dashboard
    // =========================================================================

    /// Search history by name, reference ID or token.
    pub fn search(&self, term: String) -> Result<Vec<FfiPatientRecord>, FrontDeskError> {
        let ledger = self.ledger.lock()?;
        Ok(ledger.query(&term).cloned().map(Into::into).collect())
    }

    /// Dashboard counters for today.
    pub fn today_stats(&self) -> Result<FfiDailyStats, FrontDeskError> {
        let ledger = self.ledger.lock()?;
        Ok(ledger.today_stats().into())
    }

    /// Export the full history as CSV.
    pub fn export_csv(&self) -> Result<String, FrontDeskError> {
        let ledger = self.ledger.lock()?;
        Ok(export::export_csv(ledger.records())?)
    }

    // =========================================================================
    // Slips & Verification
    // =========================================================================

    /// Shareable URL for a record's slip.
    pub fn share_url(&self, record: FfiPatientRecord) -> Result<String, FrontDeskError> {
        let record = PatientRecord::try_from(record)?;
        Ok(codec::shareable_url_or_id(
            &self.config.share_base_url,
            &record,
        ))
    }

    /// SVG QR code for a record's slip.
    pub fn slip_qr_svg(&self, record: FfiPatientRecord) -> Result<String, FrontDeskError> {
        let record = PatientRecord::try_from(record)?;
        let url = codec::share_url(&self.config.share_base_url, &record)?;
        Ok(codec::render_qr_svg(&url)?)
    }

    /// Handle a page load or hash change; returns the record to verify, if any.
    pub fn open_location(&self, url: String) -> Result<Option<FfiPatientRecord>, FrontDeskError> {
        let mut flow = self.verification.lock()?;
        flow.on_location(&url);
        Ok(flow.record().cloned().map(Into::into))
    }

    /// Close the verification view; returns the address to show instead.
    pub fn dismiss_verification(&self, url: String) -> Result<Option<String>, FrontDeskError> {
        let mut flow = self.verification.lock()?;
        Ok(flow.dismiss(&url))
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe patient record.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatientRecord {
    pub id: String,
    pub token_number: String,
    pub name: String,
    pub contact_number: String,
    pub age: String,
    pub gender: String,
    pub marital_status: String,
    pub department: String,
    pub reason_for_visit: String,
    pub timestamp: String,
    pub payment_status: String,
    pub triage_note: Option<String>,
    pub triage_priority: Option<String>,
    pub needs_ultrasound: bool,
}

impl From<PatientRecord> for FfiPatientRecord {
    fn from(record: PatientRecord) -> Self {
        Self {
            id: record.id,
            token_number: record.token_number,
            name: record.name,
            contact_number: record.contact_number,
            age: record.age,
            gender: record.gender.to_string(),
            marital_status: record.marital_status.to_string(),
            department: record.department.to_string(),
            reason_for_visit: record.reason_for_visit,
            timestamp: record.timestamp,
            payment_status: record.payment_status.to_string(),
            triage_note: record.triage_note,
            triage_priority: record.triage_priority.map(|p| p.to_string()),
            needs_ultrasound: record.needs_ultrasound,
        }
    }
}

impl TryFrom<FfiPatientRecord> for PatientRecord {
    type Error = FrontDeskError;

    fn try_from(record: FfiPatientRecord) -> Result<Self, Self::Error> {
        if record.id.trim().is_empty() {
            return Err(FrontDeskError::InvalidInput("Record id is required".into()));
        }
        Ok(PatientRecord {
            id: record.id,
            token_number: record.token_number,
            name: record.name,
            contact_number: record.contact_number,
            age: record.age,
            gender: record.gender.parse()?,
            marital_status: record.marital_status.parse()?,
            department: record.department.parse()?,
            reason_for_visit: record.reason_for_visit,
            timestamp: record.timestamp,
            payment_status: record.payment_status.parse()?,
            triage_note: record.triage_note,
            triage_priority: record
                .triage_priority
                .map(|p| p.parse())
                .transpose()?,
            needs_ultrasound: record.needs_ultrasound,
        })
    }
}

/// FFI-safe registration form.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiRegistrationForm {
    pub name: String,
    pub contact_number: String,
    pub age: String,
    pub gender: String,
    pub marital_status: String,
    pub department: String,
    pub reason: String,
    pub needs_ultrasound: bool,
    pub payment_status: String,
    pub triage_note: Option<String>,
    pub triage_priority: Option<String>,
}

impl TryFrom<FfiRegistrationForm> for RegistrationForm {
    type Error = FrontDeskError;

    fn try_from(form: FfiRegistrationForm) -> Result<Self, Self::Error> {
        Ok(RegistrationForm {
            name: form.name,
            contact_number: form.contact_number,
            age: form.age,
            gender: form.gender.parse()?,
            marital_status: form.marital_status.parse()?,
            department: form.department.parse()?,
            reason: form.reason,
            needs_ultrasound: form.needs_ultrasound,
            payment_status: form.payment_status.parse()?,
            triage_note: form.triage_note,
            triage_priority: form.triage_priority.map(|p| p.parse()).transpose()?,
        })
    }
}

/// FFI-safe result of saving a record.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct FfiInsertOutcome {
    /// False if a record with the same id was already saved
    pub inserted: bool,
    pub evicted: u32,
    /// False if the store write failed; the record is kept for this session
    pub persisted: bool,
}

impl From<InsertOutcome> for FfiInsertOutcome {
    fn from(outcome: InsertOutcome) -> Self {
        match outcome {
            InsertOutcome::Duplicate => Self {
                inserted: false,
                evicted: 0,
                persisted: true,
            },
            InsertOutcome::Inserted { evicted, persisted } => Self {
                inserted: true,
                evicted: evicted as u32,
                persisted,
            },
        }
    }
}

/// FFI-safe registration result.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiRegistration {
    pub record: FfiPatientRecord,
    pub outcome: FfiInsertOutcome,
}

/// FFI-safe dashboard counters.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDailyStats {
    pub total: u32,
    pub opd: u32,
    pub emergency: u32,
    pub paid: u32,
    pub unpaid: u32,
    pub ultrasound: u32,
}

impl From<DailyStats> for FfiDailyStats {
    fn from(stats: DailyStats) -> Self {
        Self {
            total: stats.total as u32,
            opd: stats.opd as u32,
            emergency: stats.emergency as u32,
            paid: stats.paid as u32,
            unpaid: stats.unpaid as u32,
            ultrasound: stats.ultrasound as u32,
        }
    }
}
