use chrono::{Local, TimeZone};
use echotype::corpus::{Corpus, LengthMode};
use echotype::history::HistoryDb;
use echotype::session::{SessionResult, SessionSignal, TypingSession};
use echotype::typing_policy::KeyPress;
use std::time::{Duration, UNIX_EPOCH};
use tempfile::tempdir;

fn type_out(text: &str, with_typo: bool) -> SessionResult {
    let mut session = TypingSession::new(text);
    let mut at = UNIX_EPOCH;
    let mut step = |session: &mut TypingSession, press: KeyPress| {
        at += Duration::from_millis(150);
        session.key_press(&press, at)
    };

    // a typo on the first character is left uncorrected
    for (i, c) in text.chars().enumerate() {
        let c = if with_typo && i == 0 { '#' } else { c };
        if let SessionSignal::Finished(result) = step(&mut session, KeyPress::char(c)) {
            return result;
        }
    }
    panic!("session did not finish");
}

#[test]
fn history_survives_reopening_the_database() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("history.db");
    let corpus = Corpus::embedded().unwrap();
    let book = &corpus.books()[0];

    let clean = type_out("the quick brown fox", false);
    let sloppy = type_out("jumps over", true);
    {
        let mut db = HistoryDb::open(&path).unwrap();
        let morning = Local.with_ymd_and_hms(2024, 5, 2, 8, 0, 0).unwrap();
        let evening = Local.with_ymd_and_hms(2024, 5, 2, 20, 0, 0).unwrap();
        db.record(&clean, Some(book), LengthMode::Short, morning)
            .unwrap();
        db.record(&sloppy, None, LengthMode::Medium, evening)
            .unwrap();
    }

    let db = HistoryDb::open(&path).unwrap();
    assert_eq!(db.count().unwrap(), 2);

    let entries = db.recent(10).unwrap();
    assert_eq!(entries[0].mode, LengthMode::Medium);
    assert_eq!(entries[0].book_id, None);
    assert_eq!(entries[0].error_count, 1);
    assert!(entries[0].accuracy < 100);
    assert_eq!(entries[1].book_id.as_deref(), Some(book.book_id.as_str()));
    assert_eq!(entries[1].accuracy, 100);

    let samples = db.samples(entries[1].id).unwrap();
    assert_eq!(samples, clean.samples);

    assert_eq!(
        db.best_speed(LengthMode::Short).unwrap(),
        Some(clean.speed)
    );
    assert_eq!(db.best_speed(LengthMode::Long).unwrap(), None);
}

#[test]
fn export_lists_sessions_oldest_first() {
    let mut db = HistoryDb::open_in_memory().unwrap();
    let result = type_out("abc", false);
    for hour in [14, 9, 11] {
        let at = Local.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap();
        db.record(&result, None, LengthMode::Short, at).unwrap();
    }

    let mut out = Vec::new();
    assert_eq!(db.export_csv(&mut out).unwrap(), 3);

    let text = String::from_utf8(out).unwrap();
    let rows: Vec<&str> = text.lines().collect();
    assert_eq!(rows.len(), 4);
    assert!(rows[0].starts_with("id,finished_at,"));
    assert!(rows[1].contains("T09:00:00"));
    assert!(rows[2].contains("T11:00:00"));
    assert!(rows[3].contains("T14:00:00"));
}
