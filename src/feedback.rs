use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

pub const DEFAULT_DESTINATION: &str = "feedback@echotype.io";

#[derive(Debug, Error)]
pub enum FeedbackError {
    #[error("feedback can only be sent after agreeing to its processing")]
    ConsentRequired,

    #[error("feedback is empty")]
    EmptyContent,

    #[error("failed to write feedback outbox: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode feedback: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// What the user typed into the feedback form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedbackDraft {
    pub content: String,
    pub agreed_to_processing: bool,
    pub user_id: Option<String>,
}

impl FeedbackDraft {
    pub fn new(content: impl Into<String>, agreed_to_processing: bool) -> Self {
        Self {
            content: content.into(),
            agreed_to_processing,
            user_id: None,
        }
    }

    /// Validate and stamp the draft into a submittable record
    pub fn into_record(
        self,
        destination: &str,
        now: DateTime<Utc>,
    ) -> Result<FeedbackRecord, FeedbackError> {
        if !self.agreed_to_processing {
            return Err(FeedbackError::ConsentRequired);
        }
        let content = self.content.trim();
        if content.is_empty() {
            return Err(FeedbackError::EmptyContent);
        }

        Ok(FeedbackRecord {
            feedback_id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            user_id: self.user_id,
            email_destination: destination.to_string(),
            feedback_content: content.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRecord {
    pub feedback_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user_id: Option<String>,
    pub email_destination: String,
    pub feedback_content: String,
}

/// Append-only JSON-lines file of feedback waiting to be delivered
#[derive(Debug, Clone)]
pub struct FeedbackOutbox {
    path: PathBuf,
}

impl FeedbackOutbox {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn submit(&self, record: &FeedbackRecord) -> Result<(), FeedbackError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;

        info!(feedback_id = %record.feedback_id, path = %self.path.display(), "Queued feedback");
        Ok(())
    }

    /// Records currently queued, oldest first; a missing outbox is empty
    pub fn pending(&self) -> Result<Vec<FeedbackRecord>, FeedbackError> {
        let file = match fs::File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut records = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            records.push(serde_json::from_str(&line)?);
        }
        Ok(records)
    }
}
