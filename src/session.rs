//! Keystroke state machine for one quote.
//!
//! A [`TypingSession`] owns the per-character state, the caret, the error
//! count and the metric sample log for exactly one quote. Loading a new quote
//! replaces all of it. Key events carry their own timestamp, so every
//! transition is a pure function of the session value and the event.

use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};
use tracing::debug;
use unicode_normalization::UnicodeNormalization;
use unicode_segmentation::UnicodeSegmentation;

use crate::metrics::{LiveMetrics, SessionMetricSample};
use crate::typing_policy::{classify, KeyAction, KeyPress};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CharState {
    Pending,
    Current,
    Correct,
    Incorrect,
}

impl CharState {
    pub fn is_resolved(self) -> bool {
        matches!(self, CharState::Correct | CharState::Incorrect)
    }
}

/// One user-perceived character (extended grapheme cluster) of the quote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedCharacter {
    pub grapheme: String,
    pub state: CharState,
}

impl TypedCharacter {
    /// Glyph used for rendering; spaces become non-breaking so they stay visible
    pub fn display(&self) -> &str {
        match self.grapheme.as_str() {
            " " => "\u{a0}",
            g => g,
        }
    }

    /// A single key matches when it is the grapheme itself or its composed form
    pub fn matches(&self, key: char) -> bool {
        let mut chars = self.grapheme.chars();
        if chars.next() == Some(key) && chars.next().is_none() {
            return true;
        }
        let mut composed = self.grapheme.nfc();
        composed.next() == Some(key) && composed.next().is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No quote loaded
    Idle,
    /// Quote loaded, nothing typed, timer not running
    Ready,
    InProgress,
    Finished,
}

/// Terminal summary of a completed session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResult {
    pub speed: u32,
    pub accuracy: u32,
    pub error_count: usize,
    pub elapsed_seconds: f64,
    pub characters_typed: usize,
    pub samples: Vec<SessionMetricSample>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Load(String),
    Key { press: KeyPress, at: SystemTime },
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionSignal {
    Ignored,
    Updated,
    /// Tab was pressed; the owner decides which quote comes next
    NextBookRequested,
    Finished(SessionResult),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypingSession {
    quote: String,
    characters: Vec<TypedCharacter>,
    caret: usize,
    error_count: usize,
    started_at: Option<SystemTime>,
    live: LiveMetrics,
    samples: Vec<SessionMetricSample>,
    result: Option<SessionResult>,
}

impl TypingSession {
    pub fn new(quote: impl Into<String>) -> Self {
        let mut session = Self::default();
        session.load(quote);
        session
    }

    /// Replace whatever was in progress with a fresh quote
    pub fn load(&mut self, quote: impl Into<String>) {
        let quote = quote.into();
        let characters = quote
            .graphemes(true)
            .enumerate()
            .map(|(idx, grapheme)| TypedCharacter {
                grapheme: grapheme.to_string(),
                state: if idx == 0 {
                    CharState::Current
                } else {
                    CharState::Pending
                },
            })
            .collect();

        *self = Self {
            quote,
            characters,
            ..Self::default()
        };
    }

    /// Pure transition: consume the session and an event, return the next session
    pub fn apply(mut self, event: SessionEvent) -> (Self, SessionSignal) {
        let signal = self.handle(event);
        (self, signal)
    }

    pub fn handle(&mut self, event: SessionEvent) -> SessionSignal {
        match event {
            SessionEvent::Load(quote) => {
                self.load(quote);
                SessionSignal::Updated
            }
            SessionEvent::Key { press, at } => self.key_press(&press, at),
        }
    }

    pub fn key_press(&mut self, press: &KeyPress, now: SystemTime) -> SessionSignal {
        if matches!(self.phase(), SessionPhase::Idle | SessionPhase::Finished) {
            return SessionSignal::Ignored;
        }

        let signal = match classify(press) {
            KeyAction::Ignore => SessionSignal::Ignored,
            KeyAction::NextBook => SessionSignal::NextBookRequested,
            KeyAction::Backspace => self.backspace(now),
            KeyAction::Type(c) => self.type_char(c, now),
        };

        debug_assert!(self.is_consistent(), "typing session invariant violated");
        signal
    }

    fn type_char(&mut self, c: char, now: SystemTime) -> SessionSignal {
        self.characters[self.caret].state = if self.characters[self.caret].matches(c) {
            CharState::Correct
        } else {
            self.error_count += 1;
            CharState::Incorrect
        };
        self.caret += 1;

        if self.caret == 1 && self.started_at.is_none() {
            self.started_at = Some(now);
        }

        if self.caret == self.characters.len() {
            return SessionSignal::Finished(self.finish(now));
        }

        self.characters[self.caret].state = CharState::Current;
        self.refresh(now);
        SessionSignal::Updated
    }

    fn backspace(&mut self, now: SystemTime) -> SessionSignal {
        if self.caret == 0 {
            return SessionSignal::Ignored;
        }

        if let Some(next) = self.characters.get_mut(self.caret) {
            next.state = CharState::Pending;
        }
        self.caret -= 1;
        if self.characters[self.caret].state == CharState::Incorrect {
            self.error_count -= 1;
        }
        self.characters[self.caret].state = CharState::Current;

        self.refresh(now);
        SessionSignal::Updated
    }

    /// Recompute live metrics and log a sample, once the timer runs
    fn refresh(&mut self, now: SystemTime) {
        if self.started_at.is_none() {
            return;
        }
        let elapsed = self.elapsed(now);
        self.live = LiveMetrics::compute(self.caret, self.error_count, elapsed);
        self.samples.push(SessionMetricSample {
            elapsed_seconds: elapsed.as_secs_f64(),
            speed: self.live.speed,
            accuracy: self.live.accuracy,
        });
    }

    fn finish(&mut self, now: SystemTime) -> SessionResult {
        let elapsed = self.elapsed(now);
        self.live = LiveMetrics::compute(self.caret, self.error_count, elapsed);

        let result = SessionResult {
            speed: self.live.speed,
            accuracy: self.live.accuracy,
            error_count: self.error_count,
            elapsed_seconds: elapsed.as_secs_f64(),
            characters_typed: self.caret,
            samples: self.samples.clone(),
        };
        debug!(
            speed = result.speed,
            accuracy = result.accuracy,
            errors = result.error_count,
            "Typing session finished"
        );
        self.result = Some(result.clone());
        result
    }

    /// Time since the first keystroke; zero before start or if the clock went backwards
    pub fn elapsed(&self, now: SystemTime) -> Duration {
        self.started_at
            .and_then(|start| now.duration_since(start).ok())
            .unwrap_or_default()
    }

    pub fn phase(&self) -> SessionPhase {
        if self.characters.is_empty() {
            SessionPhase::Idle
        } else if self.caret == self.characters.len() {
            SessionPhase::Finished
        } else if self.caret == 0 && self.started_at.is_none() {
            SessionPhase::Ready
        } else {
            SessionPhase::InProgress
        }
    }

    pub fn quote(&self) -> &str {
        &self.quote
    }

    pub fn characters(&self) -> &[TypedCharacter] {
        &self.characters
    }

    pub fn len(&self) -> usize {
        self.characters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }

    pub fn caret(&self) -> usize {
        self.caret
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn started_at(&self) -> Option<SystemTime> {
        self.started_at
    }

    pub fn has_started(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn is_finished(&self) -> bool {
        self.phase() == SessionPhase::Finished
    }

    pub fn live_metrics(&self) -> LiveMetrics {
        self.live
    }

    pub fn samples(&self) -> &[SessionMetricSample] {
        &self.samples
    }

    pub fn result(&self) -> Option<&SessionResult> {
        self.result.as_ref()
    }

    /// Resolved prefix, one current character at the caret (unless finished), pending tail
    pub fn is_consistent(&self) -> bool {
        if self.caret > self.characters.len() {
            return false;
        }
        let (typed, rest) = self.characters.split_at(self.caret);
        let errors = typed
            .iter()
            .filter(|c| c.state == CharState::Incorrect)
            .count();

        typed.iter().all(|c| c.state.is_resolved())
            && errors == self.error_count
            && match rest.split_first() {
                None => true,
                Some((current, pending)) => {
                    current.state == CharState::Current
                        && pending.iter().all(|c| c.state == CharState::Pending)
                }
            }
    }
}
