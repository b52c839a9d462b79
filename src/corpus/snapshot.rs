use include_dir::{include_dir, Dir};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::mode::LengthMode;
use super::record::{BookRecord, RawBookRecord};

static CORPUS_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/corpus/data");

const EMBEDDED_CORPUS: &str = "books.json";

#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("failed to read corpus at {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("corpus is not a list of book records: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("embedded corpus {0} is missing")]
    MissingEmbedded(&'static str),
}

/// Accepted document shapes: a bare array, or a list response wrapped in `data`/`items`
#[derive(Deserialize)]
#[serde(untagged)]
enum CorpusDocument {
    Records(Vec<Value>),
    Data { data: Vec<Value> },
    Items { items: Vec<Value> },
}

impl CorpusDocument {
    fn into_values(self) -> Vec<Value> {
        match self {
            CorpusDocument::Records(values)
            | CorpusDocument::Data { data: values }
            | CorpusDocument::Items { items: values } => values,
        }
    }
}

/// Immutable snapshot of the book records available for practice.
///
/// A snapshot is never merged with a later fetch; reloading produces a new
/// value. Records are already cleaned (no null quotes, no malformed entries,
/// no duplicate ids) by the time they land here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Corpus {
    books: Vec<BookRecord>,
}

impl Corpus {
    pub fn new(books: Vec<BookRecord>) -> Self {
        Self { books }
    }

    /// Small sample corpus shipped inside the binary
    pub fn embedded() -> Result<Self, CorpusError> {
        let file = CORPUS_DIR
            .get_file(EMBEDDED_CORPUS)
            .ok_or(CorpusError::MissingEmbedded(EMBEDDED_CORPUS))?;
        let contents = file
            .contents_utf8()
            .ok_or(CorpusError::MissingEmbedded(EMBEDDED_CORPUS))?;
        Self::from_json_str(contents)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, CorpusError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| CorpusError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let corpus = Self::from_json_str(&contents)?;
        info!(path = %path.display(), books = corpus.len(), "Loaded corpus");
        Ok(corpus)
    }

    /// Parse each record on its own so one malformed entry does not sink the snapshot
    pub fn from_json_str(contents: &str) -> Result<Self, CorpusError> {
        let document: CorpusDocument = serde_json::from_str(contents)?;

        let mut seen = HashSet::new();
        let mut books = Vec::new();
        let mut dropped_quotes = 0;

        for (idx, value) in document.into_values().into_iter().enumerate() {
            let raw = match serde_json::from_value::<RawBookRecord>(value) {
                Ok(raw) => raw,
                Err(err) => {
                    warn!(index = idx, "Skipping malformed book record: {err}");
                    continue;
                }
            };

            let (record, dropped) = raw.clean();
            dropped_quotes += dropped;

            if !seen.insert(record.book_id.clone()) {
                warn!(book_id = %record.book_id, "Skipping duplicate book record");
                continue;
            }
            books.push(record);
        }

        if dropped_quotes > 0 {
            debug!(dropped_quotes, "Stripped null quote entries from corpus");
        }

        Ok(Self { books })
    }

    pub fn books(&self) -> &[BookRecord] {
        &self.books
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    pub fn find(&self, book_id: &str) -> Option<&BookRecord> {
        self.books.iter().find(|book| book.book_id == book_id)
    }

    pub fn selectable_count(&self, mode: LengthMode) -> usize {
        self.books.iter().filter(|book| book.has_quotes(mode)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const TWO_BOOKS: &str = r#"[
        {
            "bookId": "a",
            "sourceId": 11,
            "title": "Alice's Adventures in Wonderland",
            "author": "Lewis Carroll",
            "releaseDate": "2008-06-27T00:00:00.000Z",
            "language": "English",
            "license": "Public Domain",
            "smallQuotes": ["Curiouser and curiouser!"],
            "mediumQuotes": [],
            "largeQuotes": []
        },
        {
            "bookId": "b",
            "sourceId": 84,
            "title": "Frankenstein",
            "author": "Mary Wollstonecraft Shelley",
            "releaseDate": "1993-10-01T00:00:00.000Z",
            "language": "English",
            "license": "Public Domain",
            "smallQuotes": [],
            "mediumQuotes": ["Beware; for I am fearless, and therefore powerful."],
            "largeQuotes": [null]
        }
    ]"#;

    #[test]
    fn test_embedded_corpus_loads() {
        let corpus = Corpus::embedded().unwrap();
        assert!(!corpus.is_empty());
        for mode in LengthMode::ALL {
            assert!(corpus.selectable_count(mode) > 0, "no {mode} quotes embedded");
        }
    }

    #[test]
    fn test_from_json_str_reads_records() {
        let corpus = Corpus::from_json_str(TWO_BOOKS).unwrap();
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.find("b").unwrap().title, "Frankenstein");
        assert!(corpus.find("b").unwrap().large_quotes.is_empty());
        assert_eq!(corpus.selectable_count(LengthMode::Short), 1);
        assert_eq!(corpus.selectable_count(LengthMode::Long), 0);
    }

    #[test]
    fn test_malformed_records_are_skipped() {
        let json = r#"[
            {"bookId": "broken"},
            {
                "bookId": "ok",
                "sourceId": 1,
                "title": "T",
                "author": "A",
                "releaseDate": "2000-01-01T00:00:00Z",
                "language": "English",
                "license": "Public Domain",
                "smallQuotes": ["q"],
                "mediumQuotes": [],
                "largeQuotes": []
            }
        ]"#;

        let corpus = Corpus::from_json_str(json).unwrap();
        assert_eq!(corpus.len(), 1);
        assert!(corpus.find("ok").is_some());
    }

    #[test]
    fn test_duplicate_ids_keep_first_record() {
        let values: Vec<Value> = serde_json::from_str(TWO_BOOKS).unwrap();
        let mut renamed = values[1].clone();
        renamed["title"] = Value::from("Frankenstein (copy)");
        let json = serde_json::to_string(&vec![values[1].clone(), renamed]).unwrap();

        let corpus = Corpus::from_json_str(&json).unwrap();
        assert_eq!(corpus.len(), 1);
        assert_eq!(corpus.books()[0].title, "Frankenstein");
    }

    #[test]
    fn test_wrapped_list_response_is_accepted() {
        let json = format!("{{\"data\": {TWO_BOOKS}}}");
        let corpus = Corpus::from_json_str(&json).unwrap();
        assert_eq!(corpus.len(), 2);
    }

    #[test]
    fn test_non_list_document_is_an_error() {
        assert_matches!(
            Corpus::from_json_str("{\"bookId\": 3}"),
            Err(CorpusError::Parse(_))
        );
    }

    #[test]
    fn test_from_path_reads_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(TWO_BOOKS.as_bytes()).unwrap();

        let corpus = Corpus::from_path(file.path()).unwrap();
        assert_eq!(corpus.len(), 2);
    }

    #[test]
    fn test_from_path_missing_file() {
        assert_matches!(
            Corpus::from_path("/definitely/not/here.json"),
            Err(CorpusError::Read { .. })
        );
    }
}
