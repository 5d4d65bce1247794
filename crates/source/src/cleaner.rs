use crate::error::{Result, SourceError};
use regex::{Regex, RegexSet};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Boilerplate found on most sites (matched case-insensitively).
pub const NOISE_PATTERNS: [&str; 10] = [
    r"cookie policy",
    r"accept cookies",
    r"privacy policy",
    r"terms of service",
    r"all rights reserved",
    r"subscribe",
    r"sign up",
    r"login",
    r"register",
    r"copyright \d{4}",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanerConfig {
    /// Lines shorter than this are treated as navigation noise
    pub min_line_chars: usize,
    /// Cleaned text shorter than this is rejected
    pub min_text_chars: usize,
    /// Extra regexes appended to [`NOISE_PATTERNS`]
    pub extra_noise_patterns: Vec<String>,
}

impl Default for CleanerConfig {
    fn default() -> Self {
        Self {
            min_line_chars: 30,
            min_text_chars: 200,
            extra_noise_patterns: Vec::new(),
        }
    }
}

/// Strips boilerplate lines and duplicates from extracted page text.
#[derive(Debug, Clone)]
pub struct TextCleaner {
    config: CleanerConfig,
    noise: RegexSet,
    line_split: Regex,
}

impl TextCleaner {
    pub fn new(config: CleanerConfig) -> Result<Self> {
        let patterns = NOISE_PATTERNS
            .iter()
            .map(|p| format!("(?i){p}"))
            .chain(config.extra_noise_patterns.iter().map(|p| format!("(?i){p}")));
        let noise = RegexSet::new(patterns)
            .map_err(|e| SourceError::InvalidInput(format!("invalid noise pattern: {e}")))?;
        let line_split = Regex::new(r"[.\n]")
            .map_err(|e| SourceError::InvalidInput(format!("invalid line pattern: {e}")))?;
        Ok(Self {
            config,
            noise,
            line_split,
        })
    }

    #[must_use]
    pub const fn config(&self) -> &CleanerConfig {
        &self.config
    }

    /// Split into sentences/lines, drop noise and repeats, re-join with `". "`.
    pub fn clean(&self, raw_text: &str) -> Result<String> {
        if raw_text.trim().is_empty() {
            return Err(SourceError::EmptyContent(
                "empty text received for cleaning".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        let mut kept = Vec::new();
        let mut dropped = 0usize;
        for line in self.line_split.split(raw_text) {
            let line = line.split_whitespace().collect::<Vec<_>>().join(" ");
            if line.chars().count() < self.config.min_line_chars || self.noise.is_match(&line) {
                dropped += 1;
                continue;
            }
            if seen.insert(line.to_lowercase()) {
                kept.push(line);
            } else {
                dropped += 1;
            }
        }

        let cleaned = kept.join(". ");
        log::debug!("Cleaner kept {} lines, dropped {dropped}", kept.len());

        let chars = cleaned.chars().count();
        if chars < self.config.min_text_chars {
            return Err(SourceError::EmptyContent(format!(
                "cleaned text is too short ({chars} characters); the page may not be meaningful"
            )));
        }
        Ok(cleaned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn cleaner() -> TextCleaner {
        TextCleaner::new(CleanerConfig {
            min_text_chars: 0,
            ..CleanerConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn drops_boilerplate_short_lines_and_duplicates() {
        let raw = "Home\nThe museum opens every day at nine in the morning.\n\
                   Accept cookies to continue browsing this website today\n\
                   Tickets can be bought online or at the front desk.\n\
                   the museum opens every day at nine in the morning.\n\
                   Copyright 2024 Museum of Things and Stuff Incorporated";
        let cleaned = cleaner().clean(raw).unwrap();
        assert_eq!(
            cleaned,
            "The museum opens every day at nine in the morning. \
             Tickets can be bought online or at the front desk"
        );
    }

    #[test]
    fn whitespace_is_collapsed() {
        let cleaned = cleaner()
            .clean("Rivers   carry\tsediment   downstream toward the sea")
            .unwrap();
        assert_eq!(cleaned, "Rivers carry sediment downstream toward the sea");
    }

    #[test]
    fn empty_and_short_results_are_rejected() {
        let strict = TextCleaner::new(CleanerConfig::default()).unwrap();
        assert!(matches!(strict.clean("   "), Err(SourceError::EmptyContent(_))));
        assert!(matches!(
            strict.clean("A single sentence that is long enough to keep."),
            Err(SourceError::EmptyContent(_))
        ));
    }

    #[test]
    fn extra_patterns_extend_the_defaults() {
        let cleaner = TextCleaner::new(CleanerConfig {
            min_text_chars: 0,
            extra_noise_patterns: vec!["share this article".to_string()],
            ..CleanerConfig::default()
        })
        .unwrap();
        let cleaned = cleaner
            .clean("Share this article with your friends on social media\nGlaciers carve deep valleys over thousands of years")
            .unwrap();
        assert_eq!(cleaned, "Glaciers carve deep valleys over thousands of years");

        let bad = TextCleaner::new(CleanerConfig {
            extra_noise_patterns: vec!["(".to_string()],
            ..CleanerConfig::default()
        });
        assert!(matches!(bad, Err(SourceError::InvalidInput(_))));
    }
}
