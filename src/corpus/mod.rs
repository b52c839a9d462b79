pub mod filter;
pub mod mode;
pub mod record;
pub mod snapshot;

// Re-export the main types for convenience
pub use filter::{BookFilter, BookListPage};
pub use mode::LengthMode;
pub use record::{gutenberg_url, BookRecord};
pub use snapshot::{Corpus, CorpusError};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_corpus_filters_and_buckets_together() {
        let corpus = Corpus::embedded().unwrap();

        let languages = filter::available_languages(corpus.books());
        assert!(languages.contains(&"English".to_string()));

        let english = BookFilter {
            language: Some("english".to_string()),
            ..Default::default()
        };
        let subset = english.subset(corpus.books());
        assert!(!subset.is_empty());
        assert!(subset.iter().all(|book| book.language == "English"));
        assert!(corpus.books().iter().all(BookRecord::is_selectable));
    }
}
