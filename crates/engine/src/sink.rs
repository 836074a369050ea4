use std::sync::{Arc, Mutex, PoisonError};

use lehra_domain::VisualEvent;
use tracing::debug;

/// Receiver of beat, cycle and status updates (the beat circle and labels).
pub trait VisualSink: Send {
    fn emit(&mut self, event: VisualEvent);
}

/// Logs every event at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl VisualSink for TracingSink {
    fn emit(&mut self, event: VisualEvent) {
        debug!(?event, "visual event");
    }
}

/// Keeps every event; clones share the same log.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<VisualEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<VisualEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn take(&self) -> Vec<VisualEvent> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn beat_indices(&self) -> Vec<u32> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                VisualEvent::BeatChanged { index } => Some(index),
                _ => None,
            })
            .collect()
    }
}

impl VisualSink for RecordingSink {
    fn emit(&mut self, event: VisualEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}
