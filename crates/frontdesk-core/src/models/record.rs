//! Patient record models.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Clinic department a patient is queued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Department {
    #[default]
    #[serde(rename = "OPD")]
    Opd,
    #[serde(rename = "EMERGENCY")]
    Emergency,
}

impl Department {
    pub fn as_str(&self) -> &'static str {
        match self {
            Department::Opd => "OPD",
            Department::Emergency => "EMERGENCY",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Gender {
    #[default]
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum MaritalStatus {
    #[default]
    Single,
    Married,
    Divorced,
    Widowed,
}

impl MaritalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MaritalStatus::Single => "Single",
            MaritalStatus::Married => "Married",
            MaritalStatus::Divorced => "Divorced",
            MaritalStatus::Widowed => "Widowed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PaymentStatus {
    #[default]
    Paid,
    #[serde(rename = "Not Paid")]
    NotPaid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Paid => "Paid",
            PaymentStatus::NotPaid => "Not Paid",
        }
    }
}

/// Priority attached by triage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriagePriority {
    Low,
    Medium,
    High,
}

impl TriagePriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriagePriority::Low => "Low",
            TriagePriority::Medium => "Medium",
            TriagePriority::High => "High",
        }
    }
}

macro_rules! labelled_enum {
    ($($ty:ident => [$($variant:ident),*]),* $(,)?) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.as_str())
                }
            }

            impl FromStr for $ty {
                type Err = UnknownLabel;

                /// Parse the display label, ignoring ASCII case.
                fn from_str(s: &str) -> Result<Self, Self::Err> {
                    [$($ty::$variant),*]
                        .into_iter()
                        .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
                        .ok_or_else(|| UnknownLabel {
                            kind: stringify!($ty),
                            label: s.to_string(),
                        })
                }
            }
        )*
    };
}

/// A label that names no variant of the expected enum.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown {kind}: {label:?}")]
pub struct UnknownLabel {
    pub kind: &'static str,
    pub label: String,
}

labelled_enum!(
    Department => [Opd, Emergency],
    Gender => [Male, Female, Other],
    MaritalStatus => [Single, Married, Divorced, Widowed],
    PaymentStatus => [Paid, NotPaid],
    TriagePriority => [Low, Medium, High],
);

/// A registered patient visit.
///
/// Field names serialize in camelCase so stored ledgers and shared slip
/// payloads stay readable by every front-desk client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PatientRecord {
    /// Reference ID, unique per record (`IBN-123456`)
    pub id: String,
    /// Daily queue token (`001`, `002`, ...)
    pub token_number: String,
    pub name: String,
    #[serde(default)]
    pub contact_number: String,
    pub age: String,
    pub gender: Gender,
    pub marital_status: MaritalStatus,
    pub department: Department,
    #[serde(default)]
    pub reason_for_visit: String,
    /// Creation time, e.g. `18 Oct 2026 at 02:30:15 PM`
    pub timestamp: String,
    pub payment_status: PaymentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triage_note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triage_priority: Option<TriagePriority>,
    #[serde(default)]
    pub needs_ultrasound: bool,
}

impl PatientRecord {
    /// Numeric value of the token, if it is well formed.
    pub fn token_value(&self) -> Option<u32> {
        self.token_number.trim().parse().ok()
    }

    /// Whether the record was created on the given day.
    pub fn created_on(&self, date: NaiveDate) -> bool {
        self.timestamp.contains(&format_slip_date(date))
    }
}

/// Format a token counter value (`7` → `"007"`).
pub fn format_token(value: u32) -> String {
    format!("{:03}", value)
}

/// Date portion of a record timestamp (`18 Oct 2026`).
pub fn format_slip_date(date: NaiveDate) -> String {
    date.format("%d %b %Y").to_string()
}

/// Full record timestamp (`18 Oct 2026 at 02:30:15 PM`).
pub fn format_timestamp(at: NaiveDateTime) -> String {
    format!(
        "{} at {}",
        format_slip_date(at.date()),
        at.format("%I:%M:%S %p")
    )
}

static LAST_ID_MILLIS: AtomicI64 = AtomicI64::new(i64::MIN);

/// Issue a creation-time derived record ID.
///
/// IDs carry the last six digits of the epoch milliseconds. Successive calls
/// within a process use strictly increasing millisecond values, and values
/// whose ID is already `taken` are skipped.
pub fn issue_record_id(now_millis: i64, taken: impl Fn(&str) -> bool) -> String {
    loop {
        let mut last = LAST_ID_MILLIS.load(Ordering::SeqCst);
        let millis = loop {
            let candidate = now_millis.max(last.saturating_add(1));
            match LAST_ID_MILLIS.compare_exchange(last, candidate, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => break candidate,
                Err(actual) => last = actual,
            }
        };

        let id = format!("IBN-{:06}", millis.rem_euclid(1_000_000));
        if !taken(&id) {
            return id;
        }
    }
}
