//! Patient ledger: the record list plus the daily token counter.
//!
//! The ledger is the only owner of both pieces of state. Every mutation goes
//! through [`Ledger::insert`], which also writes the record list and the
//! `{lastToken, date}` pair to the backing [`KeyValueStore`].
//!
//! Reads from the store never fail the ledger: corrupt data is reported as a
//! [`CorruptionError`] by the load functions, logged, and replaced by an
//! empty default. Failed writes are logged and the in-memory state remains
//! authoritative for the session.

mod token;
mod view;

pub use token::*;
pub use view::*;

use std::collections::VecDeque;

use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;

use crate::config::{DayBoundary, FrontDeskConfig};
use crate::db::KeyValueStore;
use crate::models::{
    format_timestamp, format_token, issue_record_id, PatientRecord, RegistrationForm,
    ValidationError,
};

/// Unreadable persisted state.
#[derive(Error, Debug)]
pub enum CorruptionError {
    #[error("Failed to read {key}: {reason}")]
    Unreadable { key: String, reason: String },

    #[error("Value under {key} is not valid JSON: {source}")]
    Json {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Value under {key} is not a sequence")]
    NotASequence { key: String },
}

/// Outcome of [`Ledger::insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A record with the same id already exists; nothing changed.
    Duplicate,
    /// The record is now the most recent entry.
    Inserted {
        /// Oldest records dropped to stay within capacity
        evicted: usize,
        /// Whether both store writes succeeded
        persisted: bool,
    },
}

/// Load the stored record list.
///
/// A missing key is an empty list. Elements that do not decode as records are
/// skipped; anything that is not a JSON array is corrupt.
pub fn load_records<S: KeyValueStore>(
    store: &S,
    key: &str,
) -> Result<Vec<PatientRecord>, CorruptionError> {
    let Some(raw) = read_key(store, key)? else {
        return Ok(Vec::new());
    };

    let value: serde_json::Value = serde_json::from_str(&raw).map_err(|source| {
        CorruptionError::Json {
            key: key.to_string(),
            source,
        }
    })?;

    let serde_json::Value::Array(items) = value else {
        return Err(CorruptionError::NotASequence {
            key: key.to_string(),
        });
    };

    let total = items.len();
    let records: Vec<PatientRecord> = items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value(item) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(index, error = %e, "Skipping unreadable stored record");
                None
            }
        })
        .collect();

    tracing::debug!(loaded = records.len(), total, "Loaded stored records");
    Ok(records)
}

/// Load the stored token counter state.
pub fn load_token_info<S: KeyValueStore>(
    store: &S,
    key: &str,
) -> Result<Option<TokenInfo>, CorruptionError> {
    let Some(raw) = read_key(store, key)? else {
        return Ok(None);
    };

    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|source| CorruptionError::Json {
            key: key.to_string(),
            source,
        })
}

fn read_key<S: KeyValueStore>(store: &S, key: &str) -> Result<Option<String>, CorruptionError> {
    store.get(key).map_err(|e| CorruptionError::Unreadable {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

/// In-memory ledger backed by a key-value store.
pub struct Ledger<S: KeyValueStore> {
    store: S,
    /// Most recent first
    records: VecDeque<PatientRecord>,
    next_token: u32,
    /// Day `next_token` counts for
    token_day: NaiveDate,
    max_records: usize,
    records_key: String,
    token_info_key: String,
    day_boundary: DayBoundary,
}

impl<S: KeyValueStore> Ledger<S> {
    /// Restore the ledger from `store` using the configured day boundary.
    pub fn initialize(store: S, config: &FrontDeskConfig) -> Self {
        let today = config.day_boundary.today();
        Self::initialize_on(store, config, today)
    }

    /// Restore the ledger from `store` as of `today`.
    pub fn initialize_on(store: S, config: &FrontDeskConfig, today: NaiveDate) -> Self {
        let mut records = load_records(&store, &config.records_key).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Discarding stored records");
            Vec::new()
        });

        if config.max_records == 0 {
            tracing::warn!("max_records is 0; keeping at most 1 record");
        }
        let max_records = config.max_records.max(1);
        if records.len() > max_records {
            tracing::warn!(
                stored = records.len(),
                max_records,
                "Stored records exceed capacity; dropping oldest"
            );
            records.truncate(max_records);
        }

        let next_token = match load_token_info(&store, &config.token_info_key) {
            Ok(Some(info)) => info.next_token_on(today),
            Ok(None) => 1,
            Err(e) => {
                tracing::warn!(error = %e, "Discarding stored token info");
                1
            }
        };

        tracing::info!(records = records.len(), next_token, "Ledger initialized");

        Self {
            store,
            records: records.into(),
            next_token,
            token_day: today,
            max_records,
            records_key: config.records_key.clone(),
            token_info_key: config.token_info_key.clone(),
            day_boundary: config.day_boundary,
        }
    }

    /// The token the next record will carry today, e.g. `"008"`.
    ///
    /// Pure read: calling it repeatedly never advances the counter.
    pub fn allocate_token(&self) -> String {
        self.allocate_token_on(self.day_boundary.today())
    }

    /// The token the next record created on `today` will carry.
    pub fn allocate_token_on(&self, today: NaiveDate) -> String {
        format_token(self.next_token_on(today))
    }

    /// Raw value of today's next token.
    pub fn next_token(&self) -> u32 {
        self.next_token_on(self.day_boundary.today())
    }

    /// Raw value of the next token on `today`. A day other than the one the
    /// counter was last used on starts again at 1.
    pub fn next_token_on(&self, today: NaiveDate) -> u32 {
        if today == self.token_day {
            self.next_token
        } else {
            1
        }
    }

    /// Build a record from a form without touching the ledger.
    pub fn compose(&self, form: &RegistrationForm) -> Result<PatientRecord, ValidationError> {
        let now = self.day_boundary.now();
        self.compose_at(form, now, chrono::Utc::now().timestamp_millis())
    }

    /// Build a record stamped with the given wall-clock time and epoch millis.
    pub fn compose_at(
        &self,
        form: &RegistrationForm,
        now: NaiveDateTime,
        now_millis: i64,
    ) -> Result<PatientRecord, ValidationError> {
        form.validate()?;
        let id = issue_record_id(now_millis, |id| self.contains(id));
        let token = self.allocate_token_on(now.date());
        Ok(form.to_record(id, token, format_timestamp(now)))
    }

    /// Insert a record as of the configured day.
    pub fn insert(&mut self, record: PatientRecord) -> InsertOutcome {
        let today = self.day_boundary.today();
        self.insert_on(record, today)
    }

    /// Insert a record, persisting the list and `{lastToken, date: today}`.
    pub fn insert_on(&mut self, record: PatientRecord, today: NaiveDate) -> InsertOutcome {
        if self.contains(&record.id) {
            tracing::debug!(id = %record.id, "Ignoring duplicate record");
            return InsertOutcome::Duplicate;
        }

        if today != self.token_day {
            tracing::info!(%today, "New day; restarting token sequence");
            self.token_day = today;
            self.next_token = 1;
        }

        let last_token = record.token_value().unwrap_or(self.next_token);
        tracing::info!(id = %record.id, token = %record.token_number, "Registering patient");

        self.records.push_front(record);
        let evicted = self.records.len().saturating_sub(self.max_records);
        self.records.truncate(self.max_records);
        self.next_token = self.next_token.saturating_add(1);

        let persisted = self.persist(last_token, today);
        InsertOutcome::Inserted { evicted, persisted }
    }

    fn persist(&self, last_token: u32, today: NaiveDate) -> bool {
        let records_ok = match serde_json::to_string(&self.records) {
            Ok(json) => self.write(&self.records_key, &json),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize records");
                false
            }
        };

        let token_ok = match serde_json::to_string(&TokenInfo::new(last_token, today)) {
            Ok(json) => self.write(&self.token_info_key, &json),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize token info");
                false
            }
        };

        records_ok && token_ok
    }

    fn write(&self, key: &str, value: &str) -> bool {
        match self.store.set(key, value) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(key, error = %e, "Store write failed; keeping in-memory state");
                false
            }
        }
    }

    /// Records matching a history search, most recent first.
    ///
    /// Name and id match case-insensitively, the token literally. An empty
    /// term matches everything.
    pub fn query<'a>(&'a self, term: &str) -> impl Iterator<Item = &'a PatientRecord> + 'a {
        let needle = term.to_lowercase();
        let literal = term.to_string();
        self.records
            .iter()
            .filter(move |r| matches_search(r, &needle, &literal))
    }

    /// Dashboard counters for `date`.
    pub fn daily_stats(&self, date: NaiveDate) -> DailyStats {
        DailyStats::from_records(&self.records, date)
    }

    /// Dashboard counters for the configured current day.
    pub fn today_stats(&self) -> DailyStats {
        self.daily_stats(self.day_boundary.today())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.iter().any(|r| r.id == id)
    }

    pub fn get(&self, id: &str) -> Option<&PatientRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// All records, most recent first.
    pub fn records(&self) -> impl Iterator<Item = &PatientRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::fixtures::record_on;
    use crate::models::Department;
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    fn yesterday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()
    }

    fn config() -> FrontDeskConfig {
        FrontDeskConfig::default()
    }

    fn empty_ledger() -> Ledger<Database> {
        Ledger::initialize_on(Database::open_in_memory().unwrap(), &config(), today())
    }

    /// Insert a record carrying the ledger's current token.
    fn insert_next(ledger: &mut Ledger<Database>, id: &str) -> InsertOutcome {
        let token = ledger.next_token_on(today());
        ledger.insert_on(record_on(id, token, "18 Oct 2026"), today())
    }

    #[derive(Debug, thiserror::Error)]
    #[error("disk full")]
    struct DiskFull;

    /// Store whose writes can be switched off.
    #[derive(Default)]
    struct FlakyStore {
        values: RefCell<HashMap<String, String>>,
        fail_writes: Cell<bool>,
    }

    impl KeyValueStore for FlakyStore {
        type Error = DiskFull;

        fn get(&self, key: &str) -> Result<Option<String>, DiskFull> {
            Ok(self.values.borrow().get(key).cloned())
        }

        fn set(&self, key: &str, value: &str) -> Result<(), DiskFull> {
            if self.fail_writes.get() {
                return Err(DiskFull);
            }
            self.values.borrow_mut().insert(key.into(), value.into());
            Ok(())
        }
    }

    #[test]
    fn test_fresh_ledger() {
        let ledger = empty_ledger();
        assert!(ledger.is_empty());
        assert_eq!(ledger.allocate_token_on(today()), "001");
    }

    #[test]
    fn test_allocate_token_is_pure() {
        let ledger = empty_ledger();
        assert_eq!(ledger.allocate_token_on(today()), "001");
        assert_eq!(ledger.allocate_token_on(today()), "001");
        assert_eq!(ledger.next_token_on(today()), 1);
    }

    #[test]
    fn test_insert_advances_token_and_persists() {
        let mut ledger = empty_ledger();

        let outcome = insert_next(&mut ledger, "IBN-000001");
        assert_eq!(
            outcome,
            InsertOutcome::Inserted {
                evicted: 0,
                persisted: true
            }
        );
        assert_eq!(ledger.allocate_token_on(today()), "002");

        let info = load_token_info(ledger.store(), "ibne_token_info")
            .unwrap()
            .unwrap();
        assert_eq!(info, TokenInfo::new(1, today()));

        let stored = load_records(ledger.store(), "ibne_records").unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, "IBN-000001");
    }

    #[test]
    fn test_insert_prepends() {
        let mut ledger = empty_ledger();
        insert_next(&mut ledger, "IBN-000001");
        insert_next(&mut ledger, "IBN-000002");

        let ids: Vec<&str> = ledger.records().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["IBN-000002", "IBN-000001"]);
    }

    #[test]
    fn test_duplicate_insert_is_noop() {
        let mut ledger = empty_ledger();
        insert_next(&mut ledger, "IBN-000001");
        let len = ledger.len();
        let token = ledger.next_token_on(today());

        let outcome = ledger.insert_on(record_on("IBN-000001", 9, "18 Oct 2026"), today());
        assert_eq!(outcome, InsertOutcome::Duplicate);
        assert_eq!(ledger.len(), len);
        assert_eq!(ledger.next_token_on(today()), token);

        let info = load_token_info(ledger.store(), "ibne_token_info")
            .unwrap()
            .unwrap();
        assert_eq!(info.last_token, Some(1));
    }

    #[test]
    fn test_restores_same_day_counter() {
        let db = Database::open_in_memory().unwrap();
        db.set_value("ibne_token_info", &serde_json::to_string(&TokenInfo::new(7, today())).unwrap())
            .unwrap();

        let ledger = Ledger::initialize_on(db, &config(), today());
        assert_eq!(ledger.allocate_token_on(today()), "008");
    }

    #[test]
    fn test_resets_counter_on_new_day() {
        let db = Database::open_in_memory().unwrap();
        db.set_value(
            "ibne_token_info",
            &serde_json::to_string(&TokenInfo::new(7, yesterday())).unwrap(),
        )
        .unwrap();

        let ledger = Ledger::initialize_on(db, &config(), today());
        assert_eq!(ledger.allocate_token_on(today()), "001");
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut ledger = empty_ledger();
        for i in 1..=1000 {
            insert_next(&mut ledger, &format!("IBN-{:06}", i));
        }
        assert_eq!(ledger.len(), 1000);

        let outcome = insert_next(&mut ledger, "IBN-001001");
        assert_eq!(
            outcome,
            InsertOutcome::Inserted {
                evicted: 1,
                persisted: true
            }
        );
        assert_eq!(ledger.len(), 1000);
        assert!(!ledger.contains("IBN-000001"));
        assert!(ledger.contains("IBN-000002"));
        assert!(ledger.contains("IBN-001001"));
    }

    #[test]
    fn test_capacity_from_config() {
        let mut small = config();
        small.max_records = 2;
        let mut ledger =
            Ledger::initialize_on(Database::open_in_memory().unwrap(), &small, today());

        insert_next(&mut ledger, "IBN-000001");
        insert_next(&mut ledger, "IBN-000002");
        insert_next(&mut ledger, "IBN-000003");

        let stored = load_records(ledger.store(), "ibne_records").unwrap();
        let ids: Vec<&str> = stored.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["IBN-000003", "IBN-000002"]);
    }

    #[test]
    fn test_corrupt_records_discarded() {
        let db = Database::open_in_memory().unwrap();
        db.set_value("ibne_records", "{not json").unwrap();
        db.set_value("ibne_token_info", "also broken").unwrap();

        assert!(matches!(
            load_records(&db, "ibne_records"),
            Err(CorruptionError::Json { .. })
        ));

        let ledger = Ledger::initialize_on(db, &config(), today());
        assert!(ledger.is_empty());
        assert_eq!(ledger.allocate_token_on(today()), "001");
    }

    #[test]
    fn test_non_sequence_records_discarded() {
        let db = Database::open_in_memory().unwrap();
        db.set_value("ibne_records", r#"{"id": "IBN-000001"}"#).unwrap();

        assert!(matches!(
            load_records(&db, "ibne_records"),
            Err(CorruptionError::NotASequence { .. })
        ));
        assert!(Ledger::initialize_on(db, &config(), today()).is_empty());
    }

    #[test]
    fn test_bad_elements_skipped() {
        let db = Database::open_in_memory().unwrap();
        let good = serde_json::to_value(record_on("IBN-000001", 1, "18 Oct 2026")).unwrap();
        let stored = serde_json::json!([good, {"id": 42}, "garbage"]);
        db.set_value("ibne_records", &stored.to_string()).unwrap();

        let ledger = Ledger::initialize_on(db, &config(), today());
        assert_eq!(ledger.len(), 1);
        assert!(ledger.contains("IBN-000001"));
    }

    #[test]
    fn test_write_failure_keeps_memory_state() {
        let store = FlakyStore::default();
        store.fail_writes.set(true);
        let mut ledger = Ledger::initialize_on(store, &config(), today());

        let outcome = ledger.insert_on(record_on("IBN-000001", 1, "18 Oct 2026"), today());
        assert_eq!(
            outcome,
            InsertOutcome::Inserted {
                evicted: 0,
                persisted: false
            }
        );
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.allocate_token_on(today()), "002");
        assert!(ledger.store().values.borrow().is_empty());
    }

    #[test]
    fn test_query() {
        let mut ledger = empty_ledger();
        // Ids carry letters only, so digit searches can match tokens alone
        for i in 1..=20u8 {
            insert_next(&mut ledger, &format!("IBN-{}", (b'a' + i) as char));
        }

        let tokens: Vec<&str> = ledger.query("7").map(|r| r.token_number.as_str()).collect();
        assert_eq!(tokens, vec!["017", "007"]);

        assert_eq!(ledger.query("").count(), 20);
        assert_eq!(ledger.query("ibn-c").count(), 1);
        assert_eq!(ledger.query("AYESHA").count(), 20);
    }

    #[test]
    fn test_query_matches_id() {
        let mut ledger = empty_ledger();
        ledger.insert_on(record_on("IBN-000077", 8, "18 Oct 2026"), today());
        ledger.insert_on(record_on("IBN-000123", 9, "18 Oct 2026"), today());

        let ids: Vec<&str> = ledger.query("77").map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["IBN-000077"]);
    }

    #[test]
    fn test_session_spanning_midnight_restarts_tokens() {
        let mut ledger = Ledger::initialize_on(Database::open_in_memory().unwrap(), &config(), yesterday());
        for i in 1..=3 {
            let token = ledger.next_token_on(yesterday());
            ledger.insert_on(record_on(&format!("IBN-40000{i}"), token, "17 Oct 2026"), yesterday());
        }
        assert_eq!(ledger.allocate_token_on(yesterday()), "004");

        // Preview after midnight already shows the new day's first token
        assert_eq!(ledger.allocate_token_on(today()), "001");

        let form = RegistrationForm {
            name: "Night Shift".into(),
            age: "50".into(),
            ..Default::default()
        };
        let mut issued = Vec::new();
        for minute in [5, 6] {
            let now = today().and_hms_opt(0, minute, 0).unwrap();
            let record = ledger
                .compose_at(&form, now, 1_760_745_600_000 + i64::from(minute))
                .unwrap();
            issued.push(record.token_number.clone());
            ledger.insert_on(record, today());
        }
        assert_eq!(issued, vec!["001", "002"]);

        let info = load_token_info(ledger.store(), "ibne_token_info")
            .unwrap()
            .unwrap();
        assert_eq!(info, TokenInfo::new(2, today()));
        assert_eq!(ledger.allocate_token_on(today()), "003");
    }

    #[test]
    fn test_oversized_stored_list_truncated() {
        let db = Database::open_in_memory().unwrap();
        let stored: Vec<PatientRecord> = (1..=5)
            .rev()
            .map(|i| record_on(&format!("IBN-50000{i}"), i, "18 Oct 2026"))
            .collect();
        db.set_value("ibne_records", &serde_json::to_string(&stored).unwrap())
            .unwrap();

        let mut small = config();
        small.max_records = 3;
        let ledger = Ledger::initialize_on(db, &small, today());

        let ids: Vec<&str> = ledger.records().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["IBN-500005", "IBN-500004", "IBN-500003"]);
    }

    #[test]
    fn test_daily_stats_excludes_other_days() {
        let mut ledger = empty_ledger();
        for i in 0..5 {
            let mut record = record_on(&format!("IBN-20000{i}"), i + 1, "18 Oct 2026");
            if i >= 3 {
                record.department = Department::Emergency;
            }
            ledger.insert_on(record, today());
        }
        for i in 0..5 {
            ledger.insert_on(record_on(&format!("IBN-30000{i}"), i + 1, "17 Oct 2026"), yesterday());
        }

        let stats = ledger.daily_stats(today());
        assert_eq!(stats.total, 5);
        assert_eq!(stats.opd, 3);
        assert_eq!(stats.emergency, 2);
    }

    #[test]
    fn test_compose_uses_preview_token() {
        let mut ledger = empty_ledger();
        insert_next(&mut ledger, "IBN-000001");

        let form = RegistrationForm {
            name: "Sana".into(),
            age: "29".into(),
            ..Default::default()
        };
        let now = today().and_hms_opt(9, 15, 0).unwrap();
        let record = ledger.compose_at(&form, now, 1_760_000_000_000).unwrap();

        assert_eq!(record.token_number, "002");
        assert_eq!(record.timestamp, "18 Oct 2026 at 09:15:00 AM");
        assert!(record.id.starts_with("IBN-"));
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.allocate_token_on(today()), "002");
    }

    #[test]
    fn test_compose_rejects_invalid_form() {
        let ledger = empty_ledger();
        let form = RegistrationForm {
            name: "Sana".into(),
            ..Default::default()
        };
        let now = today().and_hms_opt(9, 15, 0).unwrap();
        assert_eq!(
            ledger.compose_at(&form, now, 0),
            Err(ValidationError::MissingAge)
        );
    }
}
