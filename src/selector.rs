//! Book and quote selection over a corpus snapshot.
//!
//! Precedence is explicit book, then the current book, then a random book
//! from the working set. The selector holds no book state of its own: the
//! caller passes the current book in with every request.

use rand::rngs::ThreadRng;
use rand::Rng;
use tracing::debug;

use crate::corpus::{BookRecord, Corpus, LengthMode};

/// Inputs for one selection
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectionRequest<'a> {
    pub mode: LengthMode,
    /// Filtered subset; empty means no filter is active
    pub filtered: &'a [BookRecord],
    pub force_new_book: bool,
    pub current_book: Option<&'a BookRecord>,
    pub explicit_book: Option<&'a BookRecord>,
}

impl<'a> SelectionRequest<'a> {
    pub fn new(mode: LengthMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuoteSelection<'a> {
    pub book: &'a BookRecord,
    pub quote: &'a str,
    /// Bucket actually used, which differs from the request for explicit picks
    pub mode: LengthMode,
}

pub struct BookSelector<R: Rng> {
    rng: R,
}

impl Default for BookSelector<ThreadRng> {
    fn default() -> Self {
        Self::new(rand::thread_rng())
    }
}

impl<R: Rng> BookSelector<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    pub fn select<'a>(
        &mut self,
        corpus: &'a Corpus,
        request: &SelectionRequest<'a>,
    ) -> Option<QuoteSelection<'a>> {
        let mode = request.mode;

        if let Some(book) = request.explicit_book {
            return self.select_from_explicit(book, mode);
        }

        let working_set: &'a [BookRecord] = if request.filtered.is_empty() {
            corpus.books()
        } else {
            request.filtered
        };

        if !request.force_new_book {
            let current = request.current_book.and_then(|current| {
                working_set
                    .iter()
                    .find(|book| book.book_id == current.book_id)
            });
            if let Some(book) = current.filter(|book| book.has_quotes(mode)) {
                let quote = self.draw(book.quotes(mode))?;
                debug!(book_id = %book.book_id, %mode, "Kept current book");
                return Some(QuoteSelection { book, quote, mode });
            }
        }

        let candidates: Vec<&'a BookRecord> = working_set
            .iter()
            .filter(|book| book.has_quotes(mode))
            .collect();
        if candidates.is_empty() {
            debug!(%mode, working_set = working_set.len(), "No book has quotes for mode");
            return None;
        }

        let book = candidates[self.rng.gen_range(0..candidates.len())];
        let quote = self.draw(book.quotes(mode))?;
        debug!(
            book_id = %book.book_id,
            %mode,
            candidates = candidates.len(),
            "Selected random book"
        );
        Some(QuoteSelection { book, quote, mode })
    }

    fn select_from_explicit<'a>(
        &mut self,
        book: &'a BookRecord,
        mode: LengthMode,
    ) -> Option<QuoteSelection<'a>> {
        if book.has_quotes(mode) {
            let quote = self.draw(book.quotes(mode))?;
            return Some(QuoteSelection { book, quote, mode });
        }

        let effective = book.first_non_empty_mode()?;
        let pool: Vec<&'a String> = book.all_quotes().collect();
        let quote = pool[self.rng.gen_range(0..pool.len())];
        debug!(
            book_id = %book.book_id,
            requested = %mode,
            effective = %effective,
            "Explicit book has no quotes for mode, using all buckets"
        );
        Some(QuoteSelection {
            book,
            quote,
            mode: effective,
        })
    }

    fn draw<'a>(&mut self, quotes: &'a [String]) -> Option<&'a str> {
        if quotes.is_empty() {
            return None;
        }
        Some(quotes[self.rng.gen_range(0..quotes.len())].as_str())
    }
}
