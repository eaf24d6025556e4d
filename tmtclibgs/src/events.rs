//! Event notifications raised by the packet processors
//!
//! Events are the only channel through which recoverable conditions are
//! reported. Where they go is up to the host: the front-end logs them.

use std::fmt;
use std::sync::Mutex;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::types::{Apid, SeqCount};

/// Events raised while processing packets
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Event {
    /// A frame was shorter than the configured minimum and was dropped
    ShortPacket { observed: usize, required: usize },
    /// A sequence count did not follow the previous one for its APID
    SeqCountJump { apid: Apid, old_seq: SeqCount, new_seq: SeqCount },
}

impl Event {
    /// Event type name, as shown to operators
    pub fn name(&self) -> &'static str {
        match self {
            Event::ShortPacket { .. } => "SHORT_PACKET",
            Event::SeqCountJump { .. } => "SEQ_COUNT_JUMP",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::ShortPacket { observed, required } => write!(
                f,
                "Short packet received, length: {}; minimum required length is {} bytes.",
                observed, required
            ),
            Event::SeqCountJump { apid, old_seq, new_seq } => write!(
                f,
                "Sequence count jump for APID: {} old seq: {} newseq: {}",
                apid, old_seq, new_seq
            ),
        }
    }
}

/// Receiver of processor events
pub trait EventSink: Send + Sync {
    fn send(&self, source: &str, event: Event);
}

/// Event sink that writes every event to the log as a warning
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEventSink;

impl EventSink for LogEventSink {
    fn send(&self, source: &str, event: Event) {
        warn!("[{}] {}: {}", source, event.name(), event);
    }
}

/// Event sink that keeps every event in memory
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: Mutex<Vec<Event>>,
}

impl CollectingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events received so far
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn count(&self, name: &str) -> usize {
        self.events().iter().filter(|e| e.name() == name).count()
    }
}

impl EventSink for CollectingEventSink {
    fn send(&self, _source: &str, event: Event) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
