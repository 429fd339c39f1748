//! Human-readable order numbers.
//!
//! Order numbers have the form `YYMM-NNNN`: a month key from the year and
//! month the order was taken, and a zero-padded sequence that starts at 0001
//! and resets each month. Numbers are unique and immutable after creation.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::OrderError;

/// Highest sequence value that fits the `NNNN` segment.
const MAX_SEQ: u32 = 9999;

/// A monotonic, per-month order number in `YYMM-NNNN` format.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Returns the month key (`YYMM`) for a calendar date.
    pub fn month_key(date: NaiveDate) -> String {
        format!("{:02}{:02}", date.year() % 100, date.month())
    }

    /// Returns the first order number of a month (`<key>-0001`).
    pub fn first(month_key: &str) -> Self {
        Self(format!("{month_key}-0001"))
    }

    /// Parses a stored order number, validating the `YYMM-NNNN` shape.
    pub fn parse(value: &str) -> Result<Self, OrderError> {
        let malformed = || OrderError::MalformedOrderNumber {
            value: value.to_string(),
        };

        let (prefix, seq) = value.split_once('-').ok_or_else(malformed)?;
        if prefix.len() != 4 || !prefix.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        if seq.len() != 4 || !seq.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        if seq.parse::<u32>().unwrap_or(0) == 0 {
            return Err(malformed());
        }

        Ok(Self(value.to_string()))
    }

    /// Returns the next number in the same month.
    ///
    /// Fails with `SequenceExhausted` once the sequence reaches 9999; the
    /// sequence never wraps, so a collision cannot be produced here.
    pub fn next(&self) -> Result<Self, OrderError> {
        let seq = self.seq();
        if seq >= MAX_SEQ {
            return Err(OrderError::SequenceExhausted {
                month_key: self.month_prefix().to_string(),
            });
        }
        Ok(Self(format!("{}-{:04}", self.month_prefix(), seq + 1)))
    }

    /// Returns the `YYMM` month segment.
    pub fn month_prefix(&self) -> &str {
        &self.0[..4]
    }

    /// Returns the numeric sequence segment.
    pub fn seq(&self) -> u32 {
        self.0[5..].parse().unwrap_or(0)
    }

    /// Returns the order number as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for OrderNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_key_format() {
        let date = NaiveDate::from_ymd_opt(2026, 2, 14).unwrap();
        assert_eq!(OrderNumber::month_key(date), "2602");

        let date = NaiveDate::from_ymd_opt(2030, 11, 1).unwrap();
        assert_eq!(OrderNumber::month_key(date), "3011");
    }

    #[test]
    fn test_first_number_of_month() {
        let number = OrderNumber::first("2602");
        assert_eq!(number.as_str(), "2602-0001");
        assert_eq!(number.month_prefix(), "2602");
        assert_eq!(number.seq(), 1);
    }

    #[test]
    fn test_next_increments_sequence() {
        let number = OrderNumber::first("2602");
        let next = number.next().unwrap();
        assert_eq!(next.as_str(), "2602-0002");

        let later = OrderNumber::parse("2602-0042").unwrap();
        assert_eq!(later.next().unwrap().as_str(), "2602-0043");
    }

    #[test]
    fn test_sequence_exhausted_at_9999() {
        let last = OrderNumber::parse("2602-9999").unwrap();
        let result = last.next();
        assert!(matches!(
            result,
            Err(OrderError::SequenceExhausted { ref month_key }) if month_key == "2602"
        ));
    }

    #[test]
    fn test_parse_rejects_malformed_values() {
        for bad in ["", "2602", "2602-", "26020001", "2602-001", "2602-00001", "26a2-0001", "2602-00x1", "2602-0000"] {
            assert!(
                matches!(
                    OrderNumber::parse(bad),
                    Err(OrderError::MalformedOrderNumber { .. })
                ),
                "expected {bad:?} to be rejected"
            );
        }
    }

    #[test]
    fn test_string_ordering_matches_sequence_within_month() {
        let a = OrderNumber::parse("2602-0009").unwrap();
        let b = OrderNumber::parse("2602-0010").unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_serialization_is_transparent() {
        let number = OrderNumber::first("2602");
        let json = serde_json::to_string(&number).unwrap();
        assert_eq!(json, "\"2602-0001\"");

        let back: OrderNumber = serde_json::from_str(&json).unwrap();
        assert_eq!(back, number);
    }
}
