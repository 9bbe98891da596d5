use anyhow::{Context, Result};
use regex::Regex;

/// Whole-word, case-insensitive keyword filter compiled once at startup.
/// The word list is configuration; changing it never touches this code.
pub struct KeywordMatcher {
    // None when the configured list is empty: match nothing, not everything.
    pattern: Option<Regex>,
}

impl KeywordMatcher {
    pub fn new(keywords: &[String]) -> Result<Self> {
        let words: Vec<String> = keywords
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .map(regex::escape)
            .collect();
        if words.is_empty() {
            return Ok(Self { pattern: None });
        }
        let pattern = format!(r"(?i)\b(?:{})\b", words.join("|"));
        let pattern = Regex::new(&pattern)
            .with_context(|| format!("Failed to compile keyword pattern: {pattern}"))?;
        Ok(Self {
            pattern: Some(pattern),
        })
    }

    pub fn matches(&self, text: &str) -> bool {
        self.pattern.as_ref().is_some_and(|p| p.is_match(text))
    }
}
