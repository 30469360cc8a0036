//! Topic relevance filter.

use std::borrow::Cow;

use regex::{Regex, RegexBuilder};

use crate::error::{AppError, Result};
use crate::models::FilterConfig;

/// Decides whether a topic title is about the configured keyword.
///
/// Near-miss phrases are blanked out first (replaced by a space so the
/// surrounding letters never merge into a match), then the keyword is
/// searched as a plain substring.
#[derive(Debug, Clone)]
pub struct RelevanceFilter {
    keyword: String,
    exclusions: Option<Regex>,
}

impl RelevanceFilter {
    /// Compile the filter from configuration.
    pub fn new(config: &FilterConfig) -> Result<Self> {
        let mut phrases: Vec<String> = config
            .exclusions
            .iter()
            .map(|phrase| phrase.trim().to_lowercase())
            .filter(|phrase| !phrase.is_empty())
            .collect();
        // longest first, so "java script" wins over a shorter overlapping phrase
        phrases.sort_by(|a, b| b.len().cmp(&a.len()));

        let exclusions = if phrases.is_empty() {
            None
        } else {
            let alternation = phrases
                .iter()
                .map(|phrase| regex::escape(phrase))
                .collect::<Vec<_>>()
                .join("|");
            let pattern = format!("(?:{alternation})");
            let regex = RegexBuilder::new(&pattern)
                .case_insensitive(true)
                .build()
                .map_err(|e| AppError::config(format!("filter.exclusions: {e}")))?;
            Some(regex)
        };

        Ok(Self {
            keyword: config.keyword.trim().to_lowercase(),
            exclusions,
        })
    }

    /// Whether `title` matches the topic.
    pub fn is_relevant(&self, title: &str) -> bool {
        let lowered = title.to_lowercase();
        let cleaned = match &self.exclusions {
            Some(regex) => regex.replace_all(&lowered, " "),
            None => Cow::Borrowed(lowered.as_str()),
        };
        cleaned.contains(&self.keyword)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> RelevanceFilter {
        RelevanceFilter::new(&FilterConfig::default()).unwrap()
    }

    #[test]
    fn test_rejects_javascript_variants() {
        let f = filter();
        assert!(!f.is_relevant("JavaScript Developer"));
        assert!(!f.is_relevant("Senior Java Script Engineer"));
        assert!(!f.is_relevant("java-script ninja"));
    }

    #[test]
    fn test_accepts_java() {
        let f = filter();
        assert!(f.is_relevant("Java Backend Developer"));
        assert!(f.is_relevant("Разработчик JAVA (Москва)"));
        assert!(f.is_relevant("Java-разработчик"));
    }

    #[test]
    fn test_rejects_other_topics() {
        assert!(!filter().is_relevant("C++ Developer"));
        assert!(!filter().is_relevant(""));
    }

    #[test]
    fn test_mixed_title_still_matches() {
        assert!(filter().is_relevant("JavaScript/Java fullstack"));
    }

    #[test]
    fn test_removal_does_not_merge_letters() {
        // "ja" + "javascript" + "va" would read "java" if the phrase were dropped
        assert!(!filter().is_relevant("jajavascriptva"));
    }

    #[test]
    fn test_custom_exclusions() {
        let config = FilterConfig {
            keyword: "rust".to_string(),
            exclusions: vec!["rustacean meetup".to_string(), "trust".to_string()],
        };
        let f = RelevanceFilter::new(&config).unwrap();
        assert!(f.is_relevant("Rust engineer"));
        assert!(!f.is_relevant("Trust & Safety analyst"));
        assert!(!f.is_relevant("Rustacean Meetup organizer"));
    }

    #[test]
    fn test_no_exclusions() {
        let config = FilterConfig {
            keyword: "java".to_string(),
            exclusions: Vec::new(),
        };
        assert!(RelevanceFilter::new(&config).unwrap().is_relevant("JavaScript Developer"));
    }
}
