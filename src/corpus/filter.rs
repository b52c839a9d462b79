use itertools::Itertools;

use super::record::BookRecord;

/// Maximum number of autocomplete suggestions offered per field
pub const SUGGESTION_LIMIT: usize = 6;

/// Number of books the browse list reveals per page
pub const PAGE_SIZE: usize = 6;

/// Title/author/language criteria narrowing the corpus
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookFilter {
    pub title: String,
    pub author: String,
    pub language: Option<String>,
}

impl BookFilter {
    pub fn is_empty(&self) -> bool {
        self.title.trim().is_empty() && self.author.trim().is_empty() && self.language.is_none()
    }

    pub fn matches(&self, book: &BookRecord) -> bool {
        let title = self.title.trim().to_lowercase();
        let author = self.author.trim().to_lowercase();

        (title.is_empty() || book.title.to_lowercase().contains(&title))
            && (author.is_empty() || book.author.to_lowercase().contains(&author))
            && self
                .language
                .as_ref()
                .map_or(true, |lang| book.language.to_lowercase() == lang.to_lowercase())
    }

    pub fn apply<'a>(&self, books: &'a [BookRecord]) -> Vec<&'a BookRecord> {
        books.iter().filter(|book| self.matches(book)).collect()
    }

    /// Owned copy of the matching records, as handed to the selector
    pub fn subset(&self, books: &[BookRecord]) -> Vec<BookRecord> {
        self.apply(books).into_iter().cloned().collect()
    }
}

pub fn available_languages(books: &[BookRecord]) -> Vec<String> {
    books
        .iter()
        .map(|book| book.language.clone())
        .unique()
        .sorted()
        .collect()
}

pub fn title_suggestions(books: &[BookRecord], input: &str) -> Vec<String> {
    prefix_suggestions(books.iter().map(|book| book.title.as_str()), input)
}

pub fn author_suggestions(books: &[BookRecord], input: &str) -> Vec<String> {
    prefix_suggestions(books.iter().map(|book| book.author.as_str()), input)
}

fn prefix_suggestions<'a>(values: impl Iterator<Item = &'a str>, input: &str) -> Vec<String> {
    if input.is_empty() {
        return Vec::new();
    }
    let prefix = input.to_lowercase();

    values
        .filter(|value| value.to_lowercase().starts_with(&prefix))
        .unique()
        .sorted()
        .take(SUGGESTION_LIMIT)
        .map(str::to_string)
        .collect()
}

/// How much of the filtered book list is revealed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookListPage {
    display_count: usize,
}

impl Default for BookListPage {
    fn default() -> Self {
        Self {
            display_count: PAGE_SIZE,
        }
    }
}

impl BookListPage {
    pub fn display_count(&self) -> usize {
        self.display_count
    }

    pub fn load_more(&mut self) {
        self.display_count += PAGE_SIZE;
    }

    pub fn reset(&mut self) {
        self.display_count = PAGE_SIZE;
    }

    pub fn visible<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        &items[..items.len().min(self.display_count)]
    }

    pub fn has_more(&self, total: usize) -> bool {
        self.display_count < total
    }
}
