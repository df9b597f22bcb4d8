//! Error taxonomy for the playback and collection engine.
//!
//! Every failure is scoped to the operation that raised it — nothing here
//! is fatal to the process. `Persistence` errors never escape
//! `CollectionStore` as an `Err`; they are downgraded to a logged warning
//! plus a `PersistenceWarning` event.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Caller supplied something unusable (empty playlist name, track id
    /// not in the catalog). Rejected synchronously with no state change.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Mutation attempt on a system-defined playlist.
    #[error("protected playlist: {0}")]
    ProtectedPlaylist(String),

    /// Operation on a missing playlist or track id.
    #[error("not found: {0}")]
    NotFound(String),

    /// The media backend could not start or resume playback.
    #[error("playback failed: {0}")]
    PlaybackFailed(String),

    /// A key-value store write or read failed. Non-fatal.
    #[error("persistence error: {0}")]
    Persistence(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
