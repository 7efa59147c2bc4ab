//! Export functionality for visit history.

mod csv;

pub use csv::*;
