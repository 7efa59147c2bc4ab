//! Scan-to-verify flow.
//!
//! ```text
//! Idle ──(URL with #view=)──▶ decode ──ok──▶ Verified ──dismiss──▶ Idle
//!                               │
//!                               └──err──▶ Rejected
//! ```
//!
//! A rejected payload does not replace a record that is already on screen.

use crate::models::PatientRecord;

use super::{decode, strip_location, view_fragment};

/// Verification view state.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum VerificationState {
    #[default]
    Idle,
    /// A scanned record is being shown
    Verified(PatientRecord),
    /// The last payload could not be decoded
    Rejected,
}

/// Drives the verification view from page-load and hash-change events.
#[derive(Debug, Default)]
pub struct VerificationFlow {
    state: VerificationState,
}

impl VerificationFlow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &VerificationState {
        &self.state
    }

    /// The record currently shown, if any.
    pub fn record(&self) -> Option<&PatientRecord> {
        match &self.state {
            VerificationState::Verified(record) => Some(record),
            _ => None,
        }
    }

    /// Handle a page load or hash change.
    pub fn on_location(&mut self, url: &str) -> &VerificationState {
        let Some(payload) = view_fragment(url) else {
            return &self.state;
        };

        match decode(payload) {
            Some(record) => {
                tracing::info!(id = %record.id, "Verified scanned record");
                self.state = VerificationState::Verified(record);
            }
            None => {
                if !matches!(self.state, VerificationState::Verified(_)) {
                    self.state = VerificationState::Rejected;
                }
            }
        }
        &self.state
    }

    /// Close the verification view.
    ///
    /// Returns the address to show in place of `url` so that reloading does
    /// not verify again. `None` if nothing was being shown.
    pub fn dismiss(&mut self, url: &str) -> Option<String> {
        match self.state {
            VerificationState::Verified(_) => {
                self.state = VerificationState::Idle;
                Some(strip_location(url).to_string())
            }
            _ => None,
        }
    }
}
