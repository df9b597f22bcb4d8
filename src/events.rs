//! Outbound events consumed by view-layer collaborators.
//!
//! The engine is single-threaded and event-driven: every state transition
//! pushes zero or more events into the queue, and the host drains it once
//! per tick to refresh whatever UI it drives.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    TrackChanged {
        track_id: Option<u32>,
    },
    PlayStateChanged {
        is_playing: bool,
    },
    ProgressChanged {
        position_secs: f64,
        duration_secs: f64,
    },
    FavoriteChanged {
        track_id: u32,
        is_favorite: bool,
    },
    PlaylistChanged {
        playlist_id: String,
    },
    QueueChanged,
    PlaybackFailed {
        track_id: u32,
        reason: String,
    },
    /// A store write failed. The in-memory state is still authoritative
    /// for the session; this is surfaced for observability only.
    PersistenceWarning {
        detail: String,
    },
}

#[derive(Debug, Default)]
pub struct EventQueue {
    pending: Vec<Event>,
}

impl EventQueue {
    pub fn new() -> Self {
        EventQueue::default()
    }

    pub fn push(&mut self, event: Event) {
        self.pending.push(event);
    }

    /// Take everything queued so far, in delivery order.
    pub fn drain(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.pending)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    #[cfg(test)]
    pub fn pending(&self) -> &[Event] {
        &self.pending
    }
}
