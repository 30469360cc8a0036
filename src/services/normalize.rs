//! Listing date normalization.
//!
//! The forum renders the two most recent days as words (`сегодня, 14:30`,
//! `вчера, 09:15`) and everything older as `DD MON YY, HH:MM` with a
//! localized three-letter month. Both shapes are rewritten to
//! `DD MM YY, HH:MM` and parsed with a fixed format. The wall-clock value is
//! kept as-is, without any timezone conversion.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;

use crate::models::LocaleConfig;

const DATE_FORMAT: &str = "%d %m %y";
const DATE_TIME_FORMAT: &str = "%d %m %y, %H:%M";

/// A listing date that could not be understood.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DateFormatError {
    #[error("empty date")]
    Empty,

    #[error("unrecognized date '{0}'")]
    Unrecognized(String),

    #[error("unknown month '{token}' in date '{raw}'")]
    UnknownMonth { raw: String, token: String },

    #[error("no day precedes {0}")]
    OutOfRange(NaiveDate),

    #[error("cannot parse date '{raw}' (read as '{normalized}'): {source}")]
    Malformed {
        raw: String,
        normalized: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// Converts forum dates into absolute timestamps.
#[derive(Debug, Clone)]
pub struct DateNormalizer {
    today_word: String,
    yesterday_word: String,
    months: HashMap<String, u32>,
}

impl DateNormalizer {
    /// Build a normalizer from the locale tables.
    pub fn new(locale: &LocaleConfig) -> Self {
        Self {
            today_word: locale.today.trim().to_lowercase(),
            yesterday_word: locale.yesterday.trim().to_lowercase(),
            months: locale
                .months
                .iter()
                .map(|(token, &month)| (token.trim().to_lowercase(), month))
                .collect(),
        }
    }

    /// Normalize `raw` relative to `today`.
    pub fn normalize(&self, raw: &str, today: NaiveDate) -> Result<NaiveDateTime, DateFormatError> {
        let tokens: Vec<&str> = raw.split_whitespace().collect();
        let [first, rest @ ..] = tokens.as_slice() else {
            return Err(DateFormatError::Empty);
        };

        let relative = first.strip_suffix(',').map(str::to_lowercase);
        let normalized = match relative {
            Some(word) if word == self.today_word => {
                format!("{}, {}", today.format(DATE_FORMAT), rest.join(" "))
            }
            Some(word) if word == self.yesterday_word => {
                let yesterday = today.pred_opt().ok_or(DateFormatError::OutOfRange(today))?;
                format!("{}, {}", yesterday.format(DATE_FORMAT), rest.join(" "))
            }
            _ => {
                let [token, tail @ ..] = rest else {
                    return Err(DateFormatError::Unrecognized(raw.to_string()));
                };
                let month = self.month_number(token).ok_or_else(|| {
                    DateFormatError::UnknownMonth {
                        raw: raw.to_string(),
                        token: token.to_string(),
                    }
                })?;
                format!("{first} {month:02} {}", tail.join(" "))
            }
        };

        NaiveDateTime::parse_from_str(&normalized, DATE_TIME_FORMAT).map_err(|source| {
            DateFormatError::Malformed {
                raw: raw.to_string(),
                normalized,
                source,
            }
        })
    }

    /// Month number for a locale abbreviation. Already numeric months pass
    /// through so normalized strings stay normalizable.
    fn month_number(&self, token: &str) -> Option<u32> {
        if let Some(&month) = self.months.get(&token.to_lowercase()) {
            return Some(month);
        }
        token
            .parse::<u32>()
            .ok()
            .filter(|month| (1..=12).contains(month))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> DateNormalizer {
        DateNormalizer::new(&LocaleConfig::default())
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        date(y, m, d).and_hms_opt(h, min, 0).unwrap()
    }

    #[test]
    fn test_today() {
        let result = normalizer().normalize("сегодня, 14:30", date(2024, 10, 18));
        assert_eq!(result, Ok(at(2024, 10, 18, 14, 30)));
    }

    #[test]
    fn test_yesterday() {
        let result = normalizer().normalize("вчера, 09:05", date(2024, 10, 18));
        assert_eq!(result, Ok(at(2024, 10, 17, 9, 5)));
    }

    #[test]
    fn test_yesterday_crosses_year() {
        let result = normalizer().normalize("вчера, 23:59", date(2024, 1, 1));
        assert_eq!(result, Ok(at(2023, 12, 31, 23, 59)));
    }

    #[test]
    fn test_absolute_dates() {
        let n = normalizer();
        let today = date(2024, 10, 18);
        assert_eq!(n.normalize("02 янв 24, 10:05", today), Ok(at(2024, 1, 2, 10, 5)));
        assert_eq!(n.normalize("15 май 23, 00:00", today), Ok(at(2023, 5, 15, 0, 0)));
        assert_eq!(n.normalize("31 дек 23, 23:59", today), Ok(at(2023, 12, 31, 23, 59)));
    }

    #[test]
    fn test_month_lookup_ignores_case() {
        let result = normalizer().normalize("15 Окт 24, 10:00", date(2024, 10, 18));
        assert_eq!(result, Ok(at(2024, 10, 15, 10, 0)));
    }

    #[test]
    fn test_relative_matches_substituted_form() {
        let n = normalizer();
        let today = date(2024, 10, 18);
        let substituted = format!("{}, 14:30", today.format(DATE_FORMAT));
        assert_eq!(
            n.normalize("сегодня, 14:30", today),
            n.normalize(&substituted, today)
        );
    }

    #[test]
    fn test_surrounding_whitespace() {
        let result = normalizer().normalize("  сегодня,\u{a0}14:30 ", date(2024, 10, 18));
        assert_eq!(result, Ok(at(2024, 10, 18, 14, 30)));
    }

    #[test]
    fn test_unknown_month() {
        let err = normalizer()
            .normalize("12 foo 24, 10:00", date(2024, 10, 18))
            .unwrap_err();
        assert!(matches!(err, DateFormatError::UnknownMonth { token, .. } if token == "foo"));
    }

    #[test]
    fn test_unknown_relative_word() {
        let err = normalizer()
            .normalize("позавчера, 10:00", date(2024, 10, 18))
            .unwrap_err();
        assert!(matches!(err, DateFormatError::UnknownMonth { .. }));
    }

    #[test]
    fn test_empty_and_truncated() {
        let n = normalizer();
        let today = date(2024, 10, 18);
        assert_eq!(n.normalize("   ", today), Err(DateFormatError::Empty));
        assert!(matches!(
            n.normalize("12", today),
            Err(DateFormatError::Unrecognized(_))
        ));
        assert!(matches!(
            n.normalize("12 окт 24", today),
            Err(DateFormatError::Malformed { .. })
        ));
    }

    #[test]
    fn test_custom_locale() {
        let mut locale = LocaleConfig::default();
        locale.today = "today".to_string();
        locale.yesterday = "yesterday".to_string();
        locale.months = [
            "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
        ]
        .into_iter()
        .zip(1..)
        .map(|(token, month)| (token.to_string(), month))
        .collect();
        let n = DateNormalizer::new(&locale);
        let today = date(2024, 10, 18);
        assert_eq!(n.normalize("Today, 08:00", today), Ok(at(2024, 10, 18, 8, 0)));
        assert_eq!(n.normalize("03 Mar 24, 08:00", today), Ok(at(2024, 3, 3, 8, 0)));
        assert!(n.normalize("03 мар 24, 08:00", today).is_err());
    }
}
