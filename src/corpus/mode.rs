use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Quote length bucket a user practices against
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LengthMode {
    #[default]
    Short,
    Medium,
    Long,
}

impl LengthMode {
    /// Bucket order used whenever the buckets are walked as one sequence
    pub const ALL: [LengthMode; 3] = [LengthMode::Short, LengthMode::Medium, LengthMode::Long];

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "short" | "small" => Some(LengthMode::Short),
            "medium" => Some(LengthMode::Medium),
            "long" | "large" => Some(LengthMode::Long),
            _ => None,
        }
    }

    pub fn next(self) -> Self {
        match self {
            LengthMode::Short => LengthMode::Medium,
            LengthMode::Medium => LengthMode::Long,
            LengthMode::Long => LengthMode::Short,
        }
    }

    pub fn previous(self) -> Self {
        match self {
            LengthMode::Short => LengthMode::Long,
            LengthMode::Medium => LengthMode::Short,
            LengthMode::Long => LengthMode::Medium,
        }
    }
}
