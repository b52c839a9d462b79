use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::mode::LengthMode;

/// Metadata and categorized quotes for one public-domain book
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookRecord {
    pub book_id: String,
    pub source_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    pub title: String,
    pub author: String,
    pub language: String,
    pub license: String,
    pub release_date: DateTime<Utc>,
    #[serde(rename = "smallQuotes", alias = "shortQuotes", default)]
    pub short_quotes: Vec<String>,
    #[serde(default)]
    pub medium_quotes: Vec<String>,
    #[serde(rename = "largeQuotes", alias = "longQuotes", default)]
    pub large_quotes: Vec<String>,
}

pub fn gutenberg_url(source_id: u64) -> String {
    format!("https://www.gutenberg.org/cache/epub/{source_id}/pg{source_id}.txt")
}

impl BookRecord {
    pub fn quotes(&self, mode: LengthMode) -> &[String] {
        match mode {
            LengthMode::Short => &self.short_quotes,
            LengthMode::Medium => &self.medium_quotes,
            LengthMode::Long => &self.large_quotes,
        }
    }

    pub fn has_quotes(&self, mode: LengthMode) -> bool {
        !self.quotes(mode).is_empty()
    }

    /// A record with every bucket empty can never be offered for practice
    pub fn is_selectable(&self) -> bool {
        LengthMode::ALL.iter().any(|mode| self.has_quotes(*mode))
    }

    /// All quotes, short bucket first, then medium, then long
    pub fn all_quotes(&self) -> impl Iterator<Item = &String> {
        LengthMode::ALL
            .into_iter()
            .flat_map(move |mode| self.quotes(mode).iter())
    }

    pub fn first_non_empty_mode(&self) -> Option<LengthMode> {
        LengthMode::ALL
            .into_iter()
            .find(|mode| self.has_quotes(*mode))
    }

    pub fn resolved_source_url(&self) -> String {
        self.source_url
            .clone()
            .unwrap_or_else(|| gutenberg_url(self.source_id))
    }

    pub fn release_year(&self) -> i32 {
        use chrono::Datelike;
        self.release_date.year()
    }
}

/// Wire form of a record as the table returns it: quote entries may be null
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawBookRecord {
    book_id: String,
    source_id: u64,
    #[serde(default)]
    source_url: Option<String>,
    title: String,
    author: String,
    language: String,
    license: String,
    release_date: DateTime<Utc>,
    #[serde(rename = "smallQuotes", alias = "shortQuotes", default)]
    short_quotes: Option<Vec<Option<String>>>,
    #[serde(default)]
    medium_quotes: Option<Vec<Option<String>>>,
    #[serde(rename = "largeQuotes", alias = "longQuotes", default)]
    large_quotes: Option<Vec<Option<String>>>,
}

impl RawBookRecord {
    /// Strip null quote entries, returning the record and how many were dropped
    pub(crate) fn clean(self) -> (BookRecord, usize) {
        let mut dropped = 0;
        let mut strip = |quotes: Option<Vec<Option<String>>>| -> Vec<String> {
            let quotes = quotes.unwrap_or_default();
            let total = quotes.len();
            let kept: Vec<String> = quotes.into_iter().flatten().collect();
            dropped += total - kept.len();
            kept
        };

        let short_quotes = strip(self.short_quotes);
        let medium_quotes = strip(self.medium_quotes);
        let large_quotes = strip(self.large_quotes);

        let record = BookRecord {
            book_id: self.book_id,
            source_id: self.source_id,
            source_url: self.source_url,
            title: self.title,
            author: self.author,
            language: self.language,
            license: self.license,
            release_date: self.release_date,
            short_quotes,
            medium_quotes,
            large_quotes,
        };

        (record, dropped)
    }
}
