//! Daily token counter state.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Persisted `{lastToken, date}` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfo {
    /// Last token handed out on `date`
    #[serde(default)]
    pub last_token: Option<u32>,
    /// Calendar day as `YYYY-MM-DD`
    pub date: String,
}

impl TokenInfo {
    pub fn new(last_token: u32, date: NaiveDate) -> Self {
        Self {
            last_token: Some(last_token),
            date: date.format(DATE_FORMAT).to_string(),
        }
    }

    /// The stored day, if it is a canonical date.
    pub fn day(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.date, DATE_FORMAT).ok()
    }

    /// Next token to hand out on `today`.
    ///
    /// Any day other than the stored one (including an unparseable date)
    /// starts a fresh sequence at 1.
    pub fn next_token_on(&self, today: NaiveDate) -> u32 {
        if self.day() == Some(today) {
            self.last_token.unwrap_or(0).saturating_add(1)
        } else {
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_same_day_continues() {
        let info = TokenInfo::new(7, day(2026, 10, 18));
        assert_eq!(info.next_token_on(day(2026, 10, 18)), 8);
    }

    #[test]
    fn test_other_day_resets() {
        let info = TokenInfo::new(7, day(2026, 10, 17));
        assert_eq!(info.next_token_on(day(2026, 10, 18)), 1);
    }

    #[test]
    fn test_locale_date_string_resets() {
        let info: TokenInfo =
            serde_json::from_str(r#"{"lastToken": 7, "date": "10/18/2026"}"#).unwrap();
        assert_eq!(info.day(), None);
        assert_eq!(info.next_token_on(day(2026, 10, 18)), 1);
    }

    #[test]
    fn test_missing_last_token_counts_from_zero() {
        let info: TokenInfo = serde_json::from_str(r#"{"date": "2026-10-18"}"#).unwrap();
        assert_eq!(info.next_token_on(day(2026, 10, 18)), 1);
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_string(&TokenInfo::new(12, day(2026, 1, 2))).unwrap();
        assert_eq!(json, r#"{"lastToken":12,"date":"2026-01-02"}"#);
    }
}
