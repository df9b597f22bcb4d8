//! Persistent collections: favorites, playlists, playback history.
//!
//! Owns the only handle to the key-value store. Every mutating operation
//! persists synchronously before returning; a failed write is downgraded to
//! a logged warning plus a `PersistenceWarning` event, and the in-memory
//! state stays authoritative for the session.

use crate::error::{EngineError, Result};
use crate::events::{Event, EventQueue};
use crate::playback::DEFAULT_VOLUME;
use crate::playlist::{
    Playlist, FAVORITES_PLAYLIST_ID, RECENTLY_PLAYED_CAP, RECENTLY_PLAYED_ID,
};
use crate::storage::{KeyValueStore, KEY_FAVORITES, KEY_PLAYLISTS, KEY_SETTINGS};
use crate::track::{Catalog, Track};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Settings blob shared with the host shell. Only the fields the engine
/// itself consults live here; theme and typography are view concerns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_auto_play")]
    pub auto_play_next: bool,
    #[serde(default = "default_volume")]
    pub volume: f32,
}

fn default_auto_play() -> bool {
    true
}

fn default_volume() -> f32 {
    DEFAULT_VOLUME
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            auto_play_next: true,
            volume: DEFAULT_VOLUME,
        }
    }
}

/// Outcome of adding a track to a playlist: an already-present track is a
/// reported no-op, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    AlreadyPresent,
}

pub struct CollectionStore {
    /// Favorited track ids in insertion order. The mirror playlist copies
    /// this order verbatim.
    favorites: Vec<u32>,
    playlists: Vec<Playlist>,
    store: Box<dyn KeyValueStore>,
}

impl CollectionStore {
    /// Load collections from the store, seeding the two system playlists
    /// on first run. Corrupt entries are discarded with a warning rather
    /// than failing startup, and the favorites mirror is rewritten to
    /// match the favorites set so the two cannot start a session apart.
    /// Write-back problems surface on `events`.
    pub fn load(store: Box<dyn KeyValueStore>, events: &mut EventQueue) -> Self {
        let favorites = match store.get(KEY_FAVORITES) {
            Some(bytes) => match serde_json::from_slice(&bytes) {
                Ok(favorites) => favorites,
                Err(e) => {
                    log::warn!("corrupt favorites entry, starting fresh: {}", e);
                    Vec::new()
                }
            },
            None => Vec::new(),
        };
        let mut playlists: Vec<Playlist> = match store.get(KEY_PLAYLISTS) {
            Some(bytes) => match serde_json::from_slice(&bytes) {
                Ok(playlists) => playlists,
                Err(e) => {
                    log::warn!("corrupt playlists entry, starting fresh: {}", e);
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        if !playlists.iter().any(|p| p.id == FAVORITES_PLAYLIST_ID) {
            playlists.insert(0, Playlist::favorites_mirror());
        }
        if !playlists.iter().any(|p| p.id == RECENTLY_PLAYED_ID) {
            playlists.insert(1, Playlist::recently_played());
        }

        let mut collections = CollectionStore {
            favorites,
            playlists,
            store,
        };

        // A discarded corrupt entry (or a hand-edited file) can leave the
        // mirror and the favorites set disagreeing; the mirror is derived
        // state, so the favorites set wins.
        let mut reconciled = false;
        if let Some(mirror) = collections
            .playlists
            .iter_mut()
            .find(|p| p.id == FAVORITES_PLAYLIST_ID)
        {
            if mirror.track_ids != collections.favorites {
                mirror.track_ids = collections.favorites.clone();
                mirror.touch();
                reconciled = true;
            }
        }
        collections.persist_playlists(events);
        if reconciled {
            events.push(Event::PlaylistChanged {
                playlist_id: FAVORITES_PLAYLIST_ID.to_string(),
            });
        }
        collections
    }

    // ── Favorites ───────────────────────────────────────────────────────

    pub fn favorites(&self) -> &[u32] {
        &self.favorites
    }

    pub fn is_favorite(&self, track_id: u32) -> bool {
        self.favorites.contains(&track_id)
    }

    /// Flip membership and report the new state. Calling twice returns the
    /// set to its original membership.
    pub fn toggle_favorite(
        &mut self,
        track_id: u32,
        catalog: &Catalog,
        events: &mut EventQueue,
    ) -> Result<bool> {
        if !catalog.contains(track_id) {
            return Err(EngineError::InvalidInput(format!(
                "track {} is not in the catalog",
                track_id
            )));
        }
        let is_favorite = match self.favorites.iter().position(|&id| id == track_id) {
            Some(pos) => {
                self.favorites.remove(pos);
                false
            }
            None => {
                self.favorites.push(track_id);
                true
            }
        };
        self.persist_favorites(events);
        events.push(Event::FavoriteChanged {
            track_id,
            is_favorite,
        });
        Ok(is_favorite)
    }

    /// Empty the favorites set. Returns how many entries were removed.
    pub fn clear_favorites(&mut self, events: &mut EventQueue) -> usize {
        let removed = std::mem::take(&mut self.favorites);
        if removed.is_empty() {
            return 0;
        }
        self.persist_favorites(events);
        for track_id in &removed {
            events.push(Event::FavoriteChanged {
                track_id: *track_id,
                is_favorite: false,
            });
        }
        removed.len()
    }

    // ── Playlists ───────────────────────────────────────────────────────

    pub fn playlists(&self) -> &[Playlist] {
        &self.playlists
    }

    pub fn user_playlists(&self) -> Vec<&Playlist> {
        self.playlists.iter().filter(|p| !p.is_system).collect()
    }

    pub fn playlist(&self, id: &str) -> Option<&Playlist> {
        self.playlists.iter().find(|p| p.id == id)
    }

    fn playlist_mut(&mut self, id: &str) -> Result<&mut Playlist> {
        self.playlists
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| EngineError::NotFound(format!("playlist '{}'", id)))
    }

    /// Tracks of a playlist in membership order, skipping ids that have
    /// left the catalog.
    pub fn playlist_tracks(&self, id: &str, catalog: &Catalog) -> Result<Vec<Track>> {
        let playlist = self
            .playlist(id)
            .ok_or_else(|| EngineError::NotFound(format!("playlist '{}'", id)))?;
        Ok(playlist
            .track_ids
            .iter()
            .filter_map(|&track_id| catalog.get(track_id).cloned())
            .collect())
    }

    /// Create a user playlist. The name must be non-empty after trimming.
    pub fn create_playlist(
        &mut self,
        name: &str,
        description: &str,
        color: &str,
        icon: &str,
        events: &mut EventQueue,
    ) -> Result<Playlist> {
        let name = name.trim();
        if name.is_empty() {
            return Err(EngineError::InvalidInput(
                "playlist name must not be empty".to_string(),
            ));
        }
        // Timestamp plus random suffix: collisions are negligible within
        // one device, which is all the contract asks for.
        let id = format!(
            "playlist_{}_{:08x}",
            Utc::now().timestamp_millis(),
            fastrand::u32(..)
        );
        let playlist = Playlist::new(
            id.clone(),
            name.to_string(),
            description.trim().to_string(),
            color.to_string(),
            icon.to_string(),
        );
        self.playlists.push(playlist.clone());
        self.persist_playlists(events);
        events.push(Event::PlaylistChanged { playlist_id: id });
        Ok(playlist)
    }

    pub fn delete_playlist(&mut self, id: &str, events: &mut EventQueue) -> Result<()> {
        let pos = self
            .playlists
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| EngineError::NotFound(format!("playlist '{}'", id)))?;
        if self.playlists[pos].is_system {
            return Err(EngineError::ProtectedPlaylist(format!(
                "'{}' is system-defined",
                self.playlists[pos].name
            )));
        }
        self.playlists.remove(pos);
        self.persist_playlists(events);
        events.push(Event::PlaylistChanged {
            playlist_id: id.to_string(),
        });
        Ok(())
    }

    /// Rename/redescribe/recolor a user playlist. `None` fields are left
    /// as they are.
    pub fn update_playlist(
        &mut self,
        id: &str,
        name: Option<&str>,
        description: Option<&str>,
        color: Option<&str>,
        icon: Option<&str>,
        events: &mut EventQueue,
    ) -> Result<()> {
        if let Some(name) = name {
            if name.trim().is_empty() {
                return Err(EngineError::InvalidInput(
                    "playlist name must not be empty".to_string(),
                ));
            }
        }
        let playlist = self.playlist_mut(id)?;
        if playlist.is_system {
            return Err(EngineError::ProtectedPlaylist(format!(
                "'{}' is system-defined",
                playlist.name
            )));
        }
        let mut changed = false;
        if let Some(name) = name {
            playlist.name = name.trim().to_string();
            changed = true;
        }
        if let Some(description) = description {
            playlist.description = description.trim().to_string();
            changed = true;
        }
        if let Some(color) = color {
            playlist.color = color.to_string();
            changed = true;
        }
        if let Some(icon) = icon {
            playlist.icon = icon.to_string();
            changed = true;
        }
        if changed {
            playlist.touch();
            self.persist_playlists(events);
            events.push(Event::PlaylistChanged {
                playlist_id: id.to_string(),
            });
        }
        Ok(())
    }

    pub fn add_track_to_playlist(
        &mut self,
        id: &str,
        track_id: u32,
        catalog: &Catalog,
        events: &mut EventQueue,
    ) -> Result<AddOutcome> {
        if !catalog.contains(track_id) {
            return Err(EngineError::InvalidInput(format!(
                "track {} is not in the catalog",
                track_id
            )));
        }
        let playlist = self.playlist_mut(id)?;
        if playlist.is_system {
            return Err(EngineError::ProtectedPlaylist(format!(
                "'{}' is system-defined",
                playlist.name
            )));
        }
        if !playlist.push_track(track_id) {
            return Ok(AddOutcome::AlreadyPresent);
        }
        self.persist_playlists(events);
        events.push(Event::PlaylistChanged {
            playlist_id: id.to_string(),
        });
        Ok(AddOutcome::Added)
    }

    pub fn remove_track_from_playlist(
        &mut self,
        id: &str,
        track_id: u32,
        events: &mut EventQueue,
    ) -> Result<()> {
        let playlist = self.playlist_mut(id)?;
        if playlist.is_system {
            return Err(EngineError::ProtectedPlaylist(format!(
                "'{}' is system-defined",
                playlist.name
            )));
        }
        if !playlist.pull_track(track_id) {
            return Err(EngineError::NotFound(format!(
                "track {} in playlist '{}'",
                track_id, id
            )));
        }
        self.persist_playlists(events);
        events.push(Event::PlaylistChanged {
            playlist_id: id.to_string(),
        });
        Ok(())
    }

    /// Remove every track from a user playlist.
    pub fn clear_playlist(&mut self, id: &str, events: &mut EventQueue) -> Result<usize> {
        let playlist = self.playlist_mut(id)?;
        if playlist.is_system {
            return Err(EngineError::ProtectedPlaylist(format!(
                "'{}' is system-defined",
                playlist.name
            )));
        }
        let removed = playlist.track_count();
        if removed == 0 {
            return Ok(0);
        }
        playlist.track_ids.clear();
        playlist.touch();
        self.persist_playlists(events);
        events.push(Event::PlaylistChanged {
            playlist_id: id.to_string(),
        });
        Ok(removed)
    }

    // ── History ─────────────────────────────────────────────────────────

    /// Record a play in Recently Played: move-to-front, capped at 50.
    pub fn record_played(&mut self, track_id: u32, events: &mut EventQueue) {
        let Some(history) = self
            .playlists
            .iter_mut()
            .find(|p| p.id == RECENTLY_PLAYED_ID)
        else {
            return;
        };
        history.unshift_capped(track_id, RECENTLY_PLAYED_CAP);
        self.persist_playlists(events);
        events.push(Event::PlaylistChanged {
            playlist_id: RECENTLY_PLAYED_ID.to_string(),
        });
    }

    pub fn recently_played_ids(&self) -> &[u32] {
        self.playlist(RECENTLY_PLAYED_ID)
            .map(|p| p.track_ids.as_slice())
            .unwrap_or(&[])
    }

    // ── System playlist rewrite (SyncCoordinator only) ──────────────────

    /// Replace a system playlist's membership wholesale. This bypasses the
    /// protected-playlist check and is reserved for derived-state writers.
    pub(crate) fn set_system_playlist_tracks(
        &mut self,
        id: &str,
        track_ids: Vec<u32>,
        events: &mut EventQueue,
    ) {
        let Some(playlist) = self
            .playlists
            .iter_mut()
            .find(|p| p.id == id && p.is_system)
        else {
            return;
        };
        playlist.track_ids = track_ids;
        playlist.touch();
        self.persist_playlists(events);
        events.push(Event::PlaylistChanged {
            playlist_id: id.to_string(),
        });
    }

    // ── Settings blob ───────────────────────────────────────────────────

    pub fn load_settings(&self) -> Settings {
        match self.store.get(KEY_SETTINGS) {
            Some(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                log::warn!("corrupt settings entry, using defaults: {}", e);
                Settings::default()
            }),
            None => Settings::default(),
        }
    }

    pub fn save_settings(&mut self, settings: &Settings, events: &mut EventQueue) {
        match serde_json::to_vec(settings) {
            Ok(bytes) => self.write(KEY_SETTINGS, &bytes, events),
            Err(e) => self.warn_persistence(format!("serialize settings: {}", e), events),
        }
    }

    // ── Persistence ─────────────────────────────────────────────────────

    fn persist_favorites(&mut self, events: &mut EventQueue) {
        match serde_json::to_vec(&self.favorites) {
            Ok(bytes) => self.write(KEY_FAVORITES, &bytes, events),
            Err(e) => self.warn_persistence(format!("serialize favorites: {}", e), events),
        }
    }

    fn persist_playlists(&mut self, events: &mut EventQueue) {
        match serde_json::to_vec(&self.playlists) {
            Ok(bytes) => self.write(KEY_PLAYLISTS, &bytes, events),
            Err(e) => self.warn_persistence(format!("serialize playlists: {}", e), events),
        }
    }

    fn write(&mut self, key: &str, bytes: &[u8], events: &mut EventQueue) {
        if let Err(e) = self.store.set(key, bytes) {
            self.warn_persistence(format!("write '{}': {}", key, e), events);
        }
    }

    fn warn_persistence(&self, detail: String, events: &mut EventQueue) {
        log::warn!("persistence warning: {}", detail);
        events.push(Event::PersistenceWarning { detail });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn make_catalog(count: u32) -> Catalog {
        Catalog::new(
            (1..=count)
                .map(|id| Track {
                    id,
                    number: id.to_string(),
                    title: format!("Hymn {}", id),
                    media_ref: format!("audio/{}.mp3", id),
                    duration_secs: 60.0,
                    lyrics: None,
                })
                .collect(),
        )
    }

    fn make_store() -> CollectionStore {
        CollectionStore::load(Box::new(MemoryStore::new()), &mut EventQueue::new())
    }

    /// Store whose writes always fail, for persistence-warning paths.
    struct FailingStore;

    impl KeyValueStore for FailingStore {
        fn get(&self, _key: &str) -> Option<Vec<u8>> {
            None
        }

        fn set(&mut self, key: &str, _value: &[u8]) -> std::result::Result<(), EngineError> {
            Err(EngineError::Persistence(format!("write '{}'", key)))
        }

        fn remove(&mut self, _key: &str) -> std::result::Result<(), EngineError> {
            Ok(())
        }

        fn clear_namespace(&mut self) -> std::result::Result<(), EngineError> {
            Ok(())
        }
    }

    #[test]
    fn first_run_seeds_system_playlists() {
        let store = make_store();
        assert!(store.playlist(FAVORITES_PLAYLIST_ID).unwrap().is_system);
        assert!(store.playlist(RECENTLY_PLAYED_ID).unwrap().is_system);
        assert_eq!(store.playlists().len(), 2);
        assert!(store.user_playlists().is_empty());
    }

    #[test]
    fn toggle_favorite_flips_and_double_toggle_restores() {
        let catalog = make_catalog(5);
        let mut store = make_store();
        let mut events = EventQueue::new();
        assert!(store.toggle_favorite(3, &catalog, &mut events).unwrap());
        assert!(store.is_favorite(3));
        assert!(!store.toggle_favorite(3, &catalog, &mut events).unwrap());
        assert!(!store.is_favorite(3));
        assert!(store.favorites().is_empty());
    }

    #[test]
    fn toggle_favorite_rejects_unknown_track() {
        let catalog = make_catalog(5);
        let mut store = make_store();
        let mut events = EventQueue::new();
        let err = store.toggle_favorite(99, &catalog, &mut events).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
        assert!(store.favorites().is_empty());
    }

    #[test]
    fn favorites_preserve_insertion_order() {
        let catalog = make_catalog(5);
        let mut store = make_store();
        let mut events = EventQueue::new();
        for id in [4, 1, 3] {
            store.toggle_favorite(id, &catalog, &mut events).unwrap();
        }
        assert_eq!(store.favorites(), &[4, 1, 3]);
    }

    #[test]
    fn create_playlist_rejects_blank_name() {
        let mut store = make_store();
        let mut events = EventQueue::new();
        let before = store.playlists().len();
        let err = store
            .create_playlist("   ", "", "#fff", "list", &mut events)
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
        assert_eq!(store.playlists().len(), before);
    }

    #[test]
    fn create_playlist_generates_unique_ids() {
        let mut store = make_store();
        let mut events = EventQueue::new();
        let a = store
            .create_playlist("A", "", "#fff", "list", &mut events)
            .unwrap();
        let b = store
            .create_playlist("B", "", "#fff", "list", &mut events)
            .unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(store.user_playlists().len(), 2);
    }

    #[test]
    fn delete_system_playlist_is_protected() {
        let mut store = make_store();
        let mut events = EventQueue::new();
        let err = store
            .delete_playlist(FAVORITES_PLAYLIST_ID, &mut events)
            .unwrap_err();
        assert!(matches!(err, EngineError::ProtectedPlaylist(_)));
        assert!(store.playlist(FAVORITES_PLAYLIST_ID).is_some());
    }

    #[test]
    fn delete_user_playlist_removes_it() {
        let mut store = make_store();
        let mut events = EventQueue::new();
        let playlist = store
            .create_playlist("Gone", "", "#fff", "list", &mut events)
            .unwrap();
        store.delete_playlist(&playlist.id, &mut events).unwrap();
        assert!(store.playlist(&playlist.id).is_none());
    }

    #[test]
    fn add_track_dedups_and_keeps_updated_at() {
        let catalog = make_catalog(5);
        let mut store = make_store();
        let mut events = EventQueue::new();
        let playlist = store
            .create_playlist("Mix", "", "#fff", "list", &mut events)
            .unwrap();
        assert_eq!(
            store
                .add_track_to_playlist(&playlist.id, 2, &catalog, &mut events)
                .unwrap(),
            AddOutcome::Added
        );
        let stamped = store.playlist(&playlist.id).unwrap().updated_at;
        assert_eq!(
            store
                .add_track_to_playlist(&playlist.id, 2, &catalog, &mut events)
                .unwrap(),
            AddOutcome::AlreadyPresent
        );
        let playlist = store.playlist(&playlist.id).unwrap();
        assert_eq!(playlist.track_ids, vec![2]);
        assert_eq!(playlist.updated_at, stamped);
    }

    #[test]
    fn add_track_rejects_unknown_track_and_playlist() {
        let catalog = make_catalog(5);
        let mut store = make_store();
        let mut events = EventQueue::new();
        let playlist = store
            .create_playlist("Mix", "", "#fff", "list", &mut events)
            .unwrap();
        assert!(matches!(
            store.add_track_to_playlist(&playlist.id, 99, &catalog, &mut events),
            Err(EngineError::InvalidInput(_))
        ));
        assert!(matches!(
            store.add_track_to_playlist("ghost", 1, &catalog, &mut events),
            Err(EngineError::NotFound(_))
        ));
    }

    #[test]
    fn direct_edit_of_mirror_is_protected() {
        let catalog = make_catalog(5);
        let mut store = make_store();
        let mut events = EventQueue::new();
        assert!(matches!(
            store.add_track_to_playlist(FAVORITES_PLAYLIST_ID, 1, &catalog, &mut events),
            Err(EngineError::ProtectedPlaylist(_))
        ));
        assert!(matches!(
            store.remove_track_from_playlist(FAVORITES_PLAYLIST_ID, 1, &mut events),
            Err(EngineError::ProtectedPlaylist(_))
        ));
        assert!(matches!(
            store.update_playlist(
                FAVORITES_PLAYLIST_ID,
                Some("Renamed"),
                None,
                None,
                None,
                &mut events
            ),
            Err(EngineError::ProtectedPlaylist(_))
        ));
    }

    #[test]
    fn remove_track_not_member_is_not_found() {
        let mut store = make_store();
        let mut events = EventQueue::new();
        let playlist = store
            .create_playlist("Mix", "", "#fff", "list", &mut events)
            .unwrap();
        assert!(matches!(
            store.remove_track_from_playlist(&playlist.id, 9, &mut events),
            Err(EngineError::NotFound(_))
        ));
    }

    #[test]
    fn history_caps_and_dedups() {
        let mut store = make_store();
        let mut events = EventQueue::new();
        for id in 0..60 {
            store.record_played(id, &mut events);
        }
        store.record_played(30, &mut events);
        let history = store.recently_played_ids();
        assert_eq!(history.len(), RECENTLY_PLAYED_CAP);
        assert_eq!(history[0], 30);
        let mut unique: Vec<u32> = history.to_vec();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), history.len());
    }

    #[test]
    fn collections_survive_reload() {
        let catalog = make_catalog(5);
        let mut events = EventQueue::new();

        let mut shared = MemoryStore::new();
        // Populate through one store instance, then reload from the bytes.
        let mut store = CollectionStore::load(Box::new(MemoryStore::new()), &mut events);
        store.toggle_favorite(2, &catalog, &mut events).unwrap();
        let playlist = store
            .create_playlist("Kept", "desc", "#abc", "star", &mut events)
            .unwrap();
        store
            .add_track_to_playlist(&playlist.id, 4, &catalog, &mut events)
            .unwrap();
        store.record_played(1, &mut events);
        shared
            .set(KEY_FAVORITES, &store.store.get(KEY_FAVORITES).unwrap())
            .unwrap();
        shared
            .set(KEY_PLAYLISTS, &store.store.get(KEY_PLAYLISTS).unwrap())
            .unwrap();

        let reloaded = CollectionStore::load(Box::new(shared), &mut events);
        assert_eq!(reloaded.favorites(), &[2]);
        assert_eq!(reloaded.playlist(&playlist.id).unwrap().track_ids, vec![4]);
        assert_eq!(reloaded.recently_played_ids(), &[1]);
    }

    #[test]
    fn load_rewrites_mirror_to_match_favorites() {
        // Favorites entry lost; the persisted mirror still holds old ids.
        let mut seed = MemoryStore::new();
        let mut mirror = Playlist::favorites_mirror();
        mirror.track_ids = vec![3, 1];
        let playlists = vec![mirror, Playlist::recently_played()];
        seed.set(KEY_PLAYLISTS, &serde_json::to_vec(&playlists).unwrap())
            .unwrap();

        let mut events = EventQueue::new();
        let store = CollectionStore::load(Box::new(seed), &mut events);
        assert!(store.favorites().is_empty());
        assert!(store
            .playlist(FAVORITES_PLAYLIST_ID)
            .unwrap()
            .track_ids
            .is_empty());
        assert!(events.pending().iter().any(
            |e| matches!(e, Event::PlaylistChanged { playlist_id } if playlist_id == FAVORITES_PLAYLIST_ID)
        ));
    }

    #[test]
    fn load_keeps_consistent_mirror_untouched() {
        let mut seed = MemoryStore::new();
        let mut mirror = Playlist::favorites_mirror();
        mirror.track_ids = vec![2, 5];
        let playlists = vec![mirror, Playlist::recently_played()];
        seed.set(KEY_PLAYLISTS, &serde_json::to_vec(&playlists).unwrap())
            .unwrap();
        seed.set(KEY_FAVORITES, &serde_json::to_vec(&vec![2u32, 5]).unwrap())
            .unwrap();

        let mut events = EventQueue::new();
        let store = CollectionStore::load(Box::new(seed), &mut events);
        assert_eq!(store.favorites(), &[2, 5]);
        assert_eq!(
            store.playlist(FAVORITES_PLAYLIST_ID).unwrap().track_ids,
            vec![2, 5]
        );
        assert!(!events
            .pending()
            .iter()
            .any(|e| matches!(e, Event::PlaylistChanged { .. })));
    }

    #[test]
    fn seed_write_failure_surfaces_on_callers_queue() {
        let mut events = EventQueue::new();
        let _store = CollectionStore::load(Box::new(FailingStore), &mut events);
        assert!(events
            .pending()
            .iter()
            .any(|e| matches!(e, Event::PersistenceWarning { .. })));
    }

    #[test]
    fn settings_round_trip_with_defaults() {
        let mut store = make_store();
        let mut events = EventQueue::new();
        assert_eq!(store.load_settings(), Settings::default());
        let settings = Settings {
            auto_play_next: false,
            volume: 0.5,
        };
        store.save_settings(&settings, &mut events);
        assert_eq!(store.load_settings(), settings);
    }

    #[test]
    fn clear_playlist_empties_user_playlist_only() {
        let catalog = make_catalog(5);
        let mut store = make_store();
        let mut events = EventQueue::new();
        let playlist = store
            .create_playlist("Mix", "", "#fff", "list", &mut events)
            .unwrap();
        store
            .add_track_to_playlist(&playlist.id, 1, &catalog, &mut events)
            .unwrap();
        assert_eq!(store.clear_playlist(&playlist.id, &mut events).unwrap(), 1);
        assert!(store.playlist(&playlist.id).unwrap().track_ids.is_empty());
        assert!(matches!(
            store.clear_playlist(RECENTLY_PLAYED_ID, &mut events),
            Err(EngineError::ProtectedPlaylist(_))
        ));
    }
}
