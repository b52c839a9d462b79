use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, SystemTime};

use crossterm::event::{self, Event as CtEvent, KeyEvent};

/// Unified event type consumed by the app runner
#[derive(Clone, Debug)]
pub enum EchoEvent {
    /// Key press stamped with the time it was read from the terminal
    Key { event: KeyEvent, at: SystemTime },
    Resize,
    Tick,
}

impl EchoEvent {
    pub fn key(event: KeyEvent) -> Self {
        EchoEvent::Key {
            event,
            at: SystemTime::now(),
        }
    }
}

/// Source of terminal events (keyboard, resize, etc.)
pub trait EchoEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    /// Returns Ok(event) if an event arrives before the timeout, or Err(Timeout) if it expires.
    fn recv_timeout(&self, timeout: Duration) -> Result<EchoEvent, RecvTimeoutError>;
}

/// Production event source using crossterm
pub struct CrosstermEventSource {
    rx: Receiver<EchoEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            let forwarded = match event::read() {
                Ok(CtEvent::Key(key)) => tx.send(EchoEvent::key(key)),
                Ok(CtEvent::Resize(_, _)) => tx.send(EchoEvent::Resize),
                Ok(_) => Ok(()),
                Err(_) => break,
            };
            if forwarded.is_err() {
                break;
            }
        });

        Self { rx }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl EchoEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<EchoEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Configurable ticker interface
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Channel-fed event source for headless runs
pub struct TestEventSource {
    rx: Receiver<EchoEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<EchoEvent>) -> Self {
        Self { rx }
    }
}

impl EchoEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<EchoEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Runner that advances the application one event/tick at a time
pub struct Runner<E: EchoEventSource, T: Ticker> {
    event_source: E,
    ticker: T,
}

impl<E: EchoEventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
        }
    }

    /// Blocks up to tick interval and returns the next event, or Tick on timeout
    pub fn step(&self) -> EchoEvent {
        match self.event_source.recv_timeout(self.ticker.interval()) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => EchoEvent::Tick,
        }
    }
}
