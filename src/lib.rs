//! hymnflow — Core library for the hymn playback and collection engine.
//!
//! All playback, queue, favorites, and playlist logic lives here.
//! The CLI and future GUI shells consume this crate through `AppCore`.

pub mod app_core;
pub mod backend;
pub mod collection;
pub mod error;
pub mod events;
pub mod playback;
pub mod playlist;
pub mod queue;
pub mod storage;
pub mod sync;
pub mod track;
