use echotype::corpus::{BookFilter, Corpus, LengthMode};
use echotype::selector::{BookSelector, SelectionRequest};
use echotype::session::{SessionSignal, TypingSession};
use echotype::typing_policy::KeyPress;
use rand::rngs::mock::StepRng;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;
use std::time::{Duration, UNIX_EPOCH};

const NO_LONG_QUOTES: &str = r#"{"items": [
    {
        "bookId": "persuasion",
        "sourceId": 105,
        "title": "Persuasion",
        "author": "Jane Austen",
        "releaseDate": "1994-02-01T00:00:00.000Z",
        "language": "English",
        "license": "Public Domain",
        "smallQuotes": [],
        "mediumQuotes": ["You pierce my soul. I am half agony, half hope."],
        "largeQuotes": []
    },
    {
        "bookId": "emma",
        "sourceId": 158,
        "title": "Emma",
        "author": "Jane Austen",
        "releaseDate": "1994-08-01T00:00:00.000Z",
        "language": "English",
        "license": "Public Domain",
        "smallQuotes": ["I may have lost my heart, but not my self-control.", null],
        "mediumQuotes": [],
        "largeQuotes": [null]
    }
]}"#;

#[test]
fn long_mode_without_long_quotes_selects_nothing() {
    let corpus = Corpus::from_json_str(NO_LONG_QUOTES).unwrap();
    let mut selector = BookSelector::new(StepRng::new(0, 0));
    let request = SelectionRequest {
        force_new_book: true,
        ..SelectionRequest::new(LengthMode::Long)
    };

    assert!(selector.select(&corpus, &request).is_none());
}

#[test]
fn explicit_book_falls_back_to_medium_bucket() {
    let corpus = Corpus::from_json_str(NO_LONG_QUOTES).unwrap();
    let persuasion = corpus.find("persuasion").unwrap();
    let mut selector = BookSelector::new(StepRng::new(0, 0));
    let request = SelectionRequest {
        explicit_book: Some(persuasion),
        ..SelectionRequest::new(LengthMode::Short)
    };

    let selection = selector.select(&corpus, &request).unwrap();
    assert_eq!(selection.mode, LengthMode::Medium);
    assert_eq!(selection.quote, "You pierce my soul. I am half agony, half hope.");
}

#[test]
fn filtered_subset_narrows_random_draws() {
    let corpus = Corpus::embedded().unwrap();
    let spanish = BookFilter {
        language: Some("Spanish".into()),
        ..Default::default()
    }
    .subset(corpus.books());
    assert!(!spanish.is_empty());

    let mut selector = BookSelector::new(StdRng::seed_from_u64(42));
    let request = SelectionRequest {
        filtered: &spanish,
        force_new_book: true,
        ..SelectionRequest::new(LengthMode::Short)
    };
    for _ in 0..20 {
        let selection = selector.select(&corpus, &request).unwrap();
        assert_eq!(selection.book.language, "Spanish");
    }
}

#[test]
fn empty_filter_subset_means_whole_corpus() {
    let corpus = Corpus::embedded().unwrap();
    let nothing = BookFilter {
        title: "no such book".into(),
        ..Default::default()
    }
    .subset(corpus.books());
    assert!(nothing.is_empty());

    let mut selector = BookSelector::new(StdRng::seed_from_u64(9));
    let request = SelectionRequest {
        filtered: &nothing,
        ..SelectionRequest::new(LengthMode::Long)
    };
    assert!(selector.select(&corpus, &request).is_some());
}

#[test]
fn forced_draws_reach_every_eligible_book() {
    let corpus = Corpus::embedded().unwrap();
    let eligible = corpus.selectable_count(LengthMode::Short);
    let mut selector = BookSelector::new(StdRng::seed_from_u64(1));
    let request = SelectionRequest {
        force_new_book: true,
        ..SelectionRequest::new(LengthMode::Short)
    };

    let seen: HashSet<String> = (0..500)
        .filter_map(|_| selector.select(&corpus, &request))
        .map(|selection| selection.book.book_id.clone())
        .collect();
    assert_eq!(seen.len(), eligible);
}

#[test]
fn selected_quote_drives_a_full_session() {
    let corpus = Corpus::embedded().unwrap();
    let mut selector = BookSelector::new(StdRng::seed_from_u64(3));
    let selection = selector
        .select(&corpus, &SelectionRequest::new(LengthMode::Short))
        .unwrap();

    let mut session = TypingSession::new(selection.quote);
    let mut last = SessionSignal::Ignored;
    for (i, c) in selection.quote.chars().enumerate() {
        let at = UNIX_EPOCH + Duration::from_millis(200 * i as u64);
        last = session.key_press(&KeyPress::char(c), at);
    }

    match last {
        SessionSignal::Finished(result) => {
            assert_eq!(result.error_count, 0);
            assert_eq!(result.accuracy, 100);
            assert_eq!(result.characters_typed, selection.quote.chars().count());
        }
        other => panic!("expected a finished session, got {other:?}"),
    }
}
