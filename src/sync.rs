//! Favorites-mirror synchronization.
//!
//! The "Favorites" system playlist is a derived view of the favorites set:
//! one-way, favorites flow into the playlist, never back. `AppCore` invokes
//! the coordinator after every favorite change — explicit composition, so
//! the invariant `mirror == favorites` holds by construction.

use crate::collection::CollectionStore;
use crate::events::EventQueue;
use crate::playlist::FAVORITES_PLAYLIST_ID;

#[derive(Debug, Default)]
pub struct SyncCoordinator;

impl SyncCoordinator {
    pub fn new() -> Self {
        SyncCoordinator
    }

    /// Rewrite the mirror playlist to exactly the favorites set, in the
    /// set's insertion order.
    pub fn on_favorites_changed(&self, store: &mut CollectionStore, events: &mut EventQueue) {
        let track_ids = store.favorites().to_vec();
        store.set_system_playlist_tracks(FAVORITES_PLAYLIST_ID, track_ids, events);
    }
}
