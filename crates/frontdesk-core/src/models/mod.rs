//! Domain models for the front-desk system.

mod record;
mod registration;

pub use record::*;
pub use registration::*;
