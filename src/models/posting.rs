//! Listing rows and stored postings.

use chrono::{DateTime, NaiveDateTime};

/// One row of a listing page, as scraped.
///
/// Rows without the expected cells (table headers, pinned notices) carry
/// empty fields so that row positions stay stable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingRow {
    /// Topic title
    pub title: String,

    /// Absolute URL of the topic
    pub link: String,

    /// Date exactly as rendered by the forum
    pub raw_date: String,
}

/// A relevant, new vacancy ready for storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    /// Topic title; unique in storage
    pub name: String,

    /// Vacancy description
    pub body: String,

    /// Absolute URL of the topic
    pub link: String,

    /// Forum wall-clock time of the last update
    pub published_at: NaiveDateTime,
}

/// Storage representation of a wall-clock timestamp.
///
/// The wall-clock value is encoded as if it were UTC, so the round trip
/// through [`from_millis`] is exact.
pub fn to_millis(timestamp: NaiveDateTime) -> i64 {
    timestamp.and_utc().timestamp_millis()
}

/// Inverse of [`to_millis`].
pub fn from_millis(millis: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp_millis(millis).map(|dt| dt.naive_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_millis_round_trip() {
        let ts = NaiveDate::from_ymd_opt(2024, 10, 18)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap();
        assert_eq!(from_millis(to_millis(ts)), Some(ts));
    }

    #[test]
    fn test_millis_preserve_order() {
        let earlier = NaiveDate::from_ymd_opt(2023, 12, 31)
            .unwrap()
            .and_hms_opt(23, 59, 0)
            .unwrap();
        let later = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert!(to_millis(earlier) < to_millis(later));
    }
}
