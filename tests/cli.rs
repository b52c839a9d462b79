use assert_cmd::Command;
use std::fs;
use std::path::Path;
use tempfile::{tempdir, TempDir};

fn echotype(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("echotype").unwrap();
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env("XDG_DATA_HOME", home.join(".local").join("share"))
        .env_remove("RUST_LOG");
    cmd
}

fn sandbox() -> TempDir {
    tempdir().unwrap()
}

fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.output().unwrap();
    assert!(output.status.success(), "{output:?}");
    String::from_utf8(output.stdout).unwrap()
}

#[test]
fn list_books_prints_the_embedded_corpus() {
    let home = sandbox();
    let stdout = stdout_of(echotype(home.path()).arg("--list-books"));

    assert!(stdout.contains("Pride and Prejudice by Jane Austen (English, 1998)"));
    assert!(stdout.trim_end().ends_with("6 of 6 books"));
}

#[test]
fn list_books_honours_the_language_filter() {
    let home = sandbox();
    let stdout = stdout_of(
        echotype(home.path()).args(["--list-books", "--language", "Spanish"]),
    );

    assert!(stdout.contains("Don Quijote by Miguel de Cervantes Saavedra"));
    assert!(!stdout.contains("Pride and Prejudice"));
    assert!(stdout.trim_end().ends_with("1 of 6 books"));
}

#[test]
fn feedback_with_consent_lands_in_the_outbox() {
    let home = sandbox();
    let stdout = stdout_of(
        echotype(home.path()).args(["--feedback", "  more Spanish books please  ", "--agree"]),
    );
    assert!(stdout.starts_with("Feedback "));

    let outbox = home
        .path()
        .join(".local")
        .join("state")
        .join("echotype")
        .join("feedback-outbox.jsonl");
    let contents = fs::read_to_string(outbox).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 1);

    let record: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(record["feedbackContent"], "more Spanish books please");
    assert_eq!(record["emailDestination"], "feedback@echotype.io");
}

#[test]
fn feedback_without_consent_is_rejected() {
    let home = sandbox();
    let output = echotype(home.path())
        .args(["--feedback", "hello"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("agreeing to its processing"));
    assert!(!home
        .path()
        .join(".local/state/echotype/feedback-outbox.jsonl")
        .exists());
}

#[test]
fn agree_requires_feedback() {
    let home = sandbox();
    echotype(home.path()).arg("--agree").assert().failure();
}

#[test]
fn history_on_a_fresh_install_is_empty() {
    let home = sandbox();
    let stdout = stdout_of(echotype(home.path()).arg("--history"));
    assert_eq!(stdout, "No sessions recorded yet.\n");
}

#[test]
fn export_of_an_empty_history_writes_a_file() {
    let home = sandbox();
    let out = home.path().join("sessions.csv");
    let stdout = stdout_of(
        echotype(home.path())
            .arg("--export-history")
            .arg(&out),
    );

    assert!(stdout.starts_with("Exported 0 sessions"));
    assert!(out.exists());
}

#[test]
fn unknown_corpus_path_fails() {
    let home = sandbox();
    echotype(home.path())
        .args(["--list-books", "--corpus"])
        .arg(home.path().join("missing.json"))
        .assert()
        .failure();
}
