//! Triage suggestions for front-desk registration.
//!
//! A provider maps `{reason, age, gender}` to a suggested department, a
//! priority and a one-line note. Failures never block registration: callers
//! use [`suggest_or_none`] or a [`PendingTriage`] handle and carry on without
//! a suggestion.

pub mod pending;
pub mod prompts;
pub mod suggestion;

#[cfg(feature = "http")]
pub mod http;

pub use pending::*;
pub use prompts::*;
pub use suggestion::*;
