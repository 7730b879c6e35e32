//! Per-`(source_scope, channel_scope)` durable FIFO with a flush timer.
//! Mirrors the producer's batching contract: flush at `BATCH_SIZE`
//! messages or after `BATCH_WINDOW_SECONDS` since the first buffered
//! message, whichever comes first. A flush atomically drains the buffer
//! under its own lock so a concurrent push can never observe a partially
//! dispatched batch.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use threadloom_core::RawMessage;
use tokio::sync::Mutex;

pub const BATCH_SIZE: usize = 50;
pub const BATCH_WINDOW_SECONDS: u64 = 300;

#[derive(Default)]
struct ChannelState {
    messages: Vec<RawMessage>,
    opened_at: Option<Instant>,
}

impl ChannelState {
    fn should_flush(&self) -> bool {
        if self.messages.is_empty() {
            return false;
        }
        self.messages.len() >= BATCH_SIZE
            || self
                .opened_at
                .is_some_and(|t| t.elapsed() >= Duration::from_secs(BATCH_WINDOW_SECONDS))
    }

    fn drain(&mut self) -> Vec<RawMessage> {
        self.opened_at = None;
        std::mem::take(&mut self.messages)
    }
}

fn channel_key(source_scope: &str, channel_scope: &str) -> String {
    format!("{source_scope}:{channel_scope}")
}

/// Buffers messages keyed by `(source_scope, channel_scope)` until a
/// batch threshold is reached.
#[derive(Default)]
pub struct StreamBuffer {
    channels: DashMap<String, Arc<Mutex<ChannelState>>>,
}

impl StreamBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `message` to its channel's buffer. Returns the drained
    /// batch if this push crossed the flush threshold.
    pub async fn push(
        &self,
        source_scope: &str,
        channel_scope: &str,
        message: RawMessage,
    ) -> Option<Vec<RawMessage>> {
        let key = channel_key(source_scope, channel_scope);
        let entry = self.channels.entry(key).or_insert_with(|| Arc::new(Mutex::new(ChannelState::default()))).clone();

        let mut state = entry.lock().await;
        if state.messages.is_empty() {
            state.opened_at = Some(Instant::now());
        }
        state.messages.push(message);

        if state.should_flush() {
            Some(state.drain())
        } else {
            None
        }
    }

    /// Sweeps every channel for a window-elapsed flush with no new
    /// arrivals since it opened. Intended to be polled by a background
    /// task so a slow trickle of messages still flushes within the
    /// window even without hitting `BATCH_SIZE`.
    pub async fn sweep_expired(&self) -> Vec<(String, Vec<RawMessage>)> {
        let mut flushed = Vec::new();
        for entry in self.channels.iter() {
            let mut state = entry.value().lock().await;
            if state.should_flush() {
                flushed.push((entry.key().clone(), state.drain()));
            }
        }
        flushed
    }
}
