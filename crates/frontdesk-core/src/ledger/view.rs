//! Derived reads over the ledger: search and daily statistics.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{Department, PatientRecord, PaymentStatus};

/// Whether a record matches a history search.
///
/// `needle` is the lowercased term and is compared against name and id;
/// `literal` is compared against the token as typed.
pub(crate) fn matches_search(record: &PatientRecord, needle: &str, literal: &str) -> bool {
    record.name.to_lowercase().contains(needle)
        || record.id.to_lowercase().contains(needle)
        || record.token_number.contains(literal)
}

/// Dashboard counters for one calendar day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyStats {
    pub total: usize,
    pub opd: usize,
    pub emergency: usize,
    pub paid: usize,
    pub unpaid: usize,
    pub ultrasound: usize,
}

impl DailyStats {
    /// Count the records created on `date`.
    pub fn from_records<'a>(
        records: impl IntoIterator<Item = &'a PatientRecord>,
        date: NaiveDate,
    ) -> Self {
        records
            .into_iter()
            .filter(|r| r.created_on(date))
            .fold(Self::default(), |mut stats, r| {
                stats.total += 1;
                match r.department {
                    Department::Opd => stats.opd += 1,
                    Department::Emergency => stats.emergency += 1,
                }
                match r.payment_status {
                    PaymentStatus::Paid => stats.paid += 1,
                    PaymentStatus::NotPaid => stats.unpaid += 1,
                }
                if r.needs_ultrasound {
                    stats.ultrasound += 1;
                }
                stats
            })
    }
}
