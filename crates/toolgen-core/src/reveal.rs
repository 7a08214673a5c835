//! Character-by-character reveal of a finished generation.
//!
//! The reveal is a plain stream of growing prefixes driven by a timer. It knows
//! nothing about rendering; consumers decide what to do with each prefix.

use futures_util::stream::{self, BoxStream, StreamExt};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Tracks how much of `full_text` has been revealed.
///
/// `position` is a byte offset that always sits on a char boundary.
#[derive(Debug, Clone)]
pub struct RevealCursor {
    full_text: String,
    position: usize,
    finished: bool,
}

impl RevealCursor {
    pub fn new(full_text: String) -> Self {
        Self {
            full_text,
            position: 0,
            finished: false,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Advance by one character and return the new prefix. Yields the full
    /// text exactly once, then `None`.
    pub fn advance(&mut self) -> Option<String> {
        if self.finished {
            return None;
        }

        if let Some(c) = self.full_text[self.position..].chars().next() {
            self.position += c.len_utf8();
        }
        if self.position == self.full_text.len() {
            self.finished = true;
        }

        Some(self.full_text[..self.position].to_string())
    }
}

pub type RevealStream = BoxStream<'static, String>;

/// Produces reveal streams, one per generation.
///
/// Starting a new reveal stops the previous one. Clones share the same slot,
/// so any clone can stop whatever reveal is currently running.
#[derive(Debug, Clone)]
pub struct ProgressiveRevealer {
    tick: Duration,
    current: Arc<Mutex<Option<CancellationToken>>>,
}

impl ProgressiveRevealer {
    pub fn new(tick: Duration) -> Self {
        Self {
            tick,
            current: Arc::new(Mutex::new(None)),
        }
    }

    /// Whether a reveal is registered and has not been stopped
    pub fn is_running(&self) -> bool {
        self.current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .as_ref()
            .is_some_and(|token| !token.is_cancelled())
    }

    /// Start revealing `full_text`, discarding any reveal still in flight
    pub fn start(&self, full_text: String) -> RevealStream {
        let token = CancellationToken::new();
        if let Some(previous) = self.swap(Some(token.clone())) {
            debug!("restarting reveal, previous cursor discarded");
            previous.cancel();
        }
        reveal(full_text, self.tick, token)
    }

    /// Stop the running reveal, if any. No prefix is emitted afterwards.
    pub fn stop(&self) {
        if let Some(token) = self.swap(None) {
            token.cancel();
        }
    }

    fn swap(&self, token: Option<CancellationToken>) -> Option<CancellationToken> {
        let mut slot = self
            .current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::replace(&mut *slot, token)
    }
}

/// Emit one growing prefix of `full_text` per `tick` until the whole text has
/// been emitted or `cancel` fires.
pub fn reveal(full_text: String, tick: Duration, cancel: CancellationToken) -> RevealStream {
    stream::unfold(
        (RevealCursor::new(full_text), cancel),
        move |(mut cursor, cancel)| async move {
            if cursor.is_finished() {
                return None;
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return None,
                _ = tokio::time::sleep(tick) => {}
            }
            if cancel.is_cancelled() {
                return None;
            }

            let prefix = cursor.advance()?;
            Some((prefix, (cursor, cancel)))
        },
    )
    .fuse()
    .boxed()
}
