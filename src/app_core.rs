//! AppCore — central command dispatcher for hymnflow.
//!
//! Unified interface for all engine operations. The CLI and any future GUI
//! interact with the engine through AppCore methods, which keeps command
//! logic in one place: catalog validation, queue seeding, the natural-end
//! policy, and routing favorite changes through the SyncCoordinator.
//!
//! Everything runs on one logical thread. Commands and media-backend
//! completions are applied in delivery order, and outbound [`Event`]s
//! accumulate in a queue the host drains once per tick.

use crate::collection::{AddOutcome, CollectionStore, Settings};
use crate::error::{EngineError, Result};
use crate::events::{Event, EventQueue};
use crate::playback::{MediaBackend, MediaEvent, NaturalEnd, PlaybackEngine, RepeatMode};
use crate::playlist::Playlist;
use crate::queue::QueueResolver;
use crate::storage::KeyValueStore;
use crate::sync::SyncCoordinator;
use crate::track::{Catalog, Category};
use serde::Serialize;

/// What the user asked to play "all" of. A closed set — dispatch is a
/// single match, never a string-keyed lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceView {
    Library,
    Category(Category),
    Favorites,
    Playlist(String),
}

// ── Snapshot DTOs ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct TransportData {
    pub track_id: Option<u32>,
    pub number: Option<String>,
    pub title: Option<String>,
    pub is_playing: bool,
    pub position_secs: f64,
    pub duration_secs: f64,
    pub volume: f32,
    pub repeat_mode: RepeatMode,
    pub shuffle_enabled: bool,
    pub queue_len: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlaylistData {
    pub id: String,
    pub name: String,
    pub description: String,
    pub color: String,
    pub icon: String,
    pub is_system: bool,
    pub track_count: usize,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackData {
    pub id: u32,
    pub number: String,
    pub title: String,
    pub duration_display: String,
    pub is_favorite: bool,
}

// ── AppCore ─────────────────────────────────────────────────────────────────

pub struct AppCore {
    catalog: Catalog,
    pub playback: PlaybackEngine,
    pub queue: QueueResolver,
    pub collections: CollectionStore,
    sync: SyncCoordinator,
    settings: Settings,
    events: EventQueue,
}

impl AppCore {
    /// Wire the engine together: load collections and settings from the
    /// store, seed the queue with the catalog, hand the backend to the
    /// playback engine.
    pub fn new(
        catalog: Catalog,
        store: Box<dyn KeyValueStore>,
        backend: Box<dyn MediaBackend>,
    ) -> Self {
        let mut events = EventQueue::new();
        let collections = CollectionStore::load(store, &mut events);
        let settings = collections.load_settings();
        let mut queue = QueueResolver::new();
        queue.seed(catalog.ids());
        AppCore {
            playback: PlaybackEngine::new(backend, settings.volume),
            catalog,
            queue,
            collections,
            sync: SyncCoordinator::new(),
            settings,
            events,
        }
    }

    /// Fresh in-memory core with a scriptable backend. For testing.
    pub fn new_test(catalog: Catalog) -> (Self, crate::playback::ScriptedBackend) {
        let backend = crate::playback::ScriptedBackend::new();
        let handle = backend.handle();
        let core = AppCore::new(
            catalog,
            Box::new(crate::storage::MemoryStore::new()),
            Box::new(backend),
        );
        (core, handle)
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn settings(&self) -> Settings {
        self.settings
    }

    /// Take all outbound events accumulated since the last drain.
    pub fn drain_events(&mut self) -> Vec<Event> {
        self.events.drain()
    }

    // ── Transport ───────────────────────────────────────────────────────

    /// Select and start a track by id, recording it in Recently Played.
    pub fn play_track_id(&mut self, track_id: u32) -> Result<()> {
        let track = self
            .catalog
            .get(track_id)
            .cloned()
            .ok_or_else(|| {
                EngineError::InvalidInput(format!("track {} is not in the catalog", track_id))
            })?;
        self.playback.play_track(track, &mut self.events);
        self.collections.record_played(track_id, &mut self.events);
        Ok(())
    }

    /// Pause when playing, resume when paused. With nothing selected yet,
    /// starts the head of the queue.
    pub fn toggle_play_pause(&mut self) -> Result<()> {
        if self.playback.session.current_track.is_none() {
            return match self.queue.first() {
                Some(first) => self.play_track_id(first),
                None => Ok(()),
            };
        }
        if self.playback.session.is_playing {
            self.playback.pause(&mut self.events);
        } else {
            self.playback.resume(&mut self.events);
        }
        Ok(())
    }

    pub fn pause(&mut self) {
        self.playback.pause(&mut self.events);
    }

    pub fn resume(&mut self) {
        self.playback.resume(&mut self.events);
    }

    /// Manual skip forward. Always advances regardless of repeat mode.
    /// Returns false when the queue cannot resolve a next track.
    pub fn play_next(&mut self) -> bool {
        self.skip(1)
    }

    /// Manual skip backward. Same rules as [`play_next`](Self::play_next).
    pub fn play_previous(&mut self) -> bool {
        self.skip(-1)
    }

    fn skip(&mut self, direction: isize) -> bool {
        let Some(current) = self.playback.session.current_track_id() else {
            return false;
        };
        let target = if direction >= 0 {
            self.queue.resolve_next(current)
        } else {
            self.queue.resolve_previous(current)
        };
        match target {
            Some(next) => self.play_track_id(next).is_ok(),
            None => false,
        }
    }

    pub fn seek(&mut self, seconds: f64) {
        self.playback.seek(seconds, &mut self.events);
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.playback.set_volume(volume);
        self.settings.volume = self.playback.session.volume;
        self.collections.save_settings(&self.settings, &mut self.events);
    }

    pub fn toggle_mute(&mut self) {
        self.playback.toggle_mute();
        self.settings.volume = self.playback.session.volume;
        self.collections.save_settings(&self.settings, &mut self.events);
    }

    // ── Modes ───────────────────────────────────────────────────────────

    pub fn set_repeat_mode(&mut self, mode: RepeatMode) {
        self.playback.session.repeat_mode = mode;
    }

    /// none -> one -> all -> none. Returns the new mode.
    pub fn cycle_repeat_mode(&mut self) -> RepeatMode {
        let mode = self.playback.session.repeat_mode.cycled();
        self.playback.session.repeat_mode = mode;
        mode
    }

    /// Flip shuffle. Enabling rebuilds the queue as the current track
    /// followed by a random permutation of the rest of the catalog;
    /// disabling restores catalog order. Returns the new state.
    pub fn toggle_shuffle(&mut self) -> bool {
        let enabled = !self.playback.session.shuffle_enabled;
        self.playback.session.shuffle_enabled = enabled;
        if enabled {
            self.queue
                .enable_shuffle(&self.catalog, self.playback.session.current_track_id());
        } else {
            self.queue.disable_shuffle(&self.catalog);
        }
        self.events.push(Event::QueueChanged);
        enabled
    }

    pub fn set_auto_play_next(&mut self, enabled: bool) {
        self.settings.auto_play_next = enabled;
        self.collections.save_settings(&self.settings, &mut self.events);
    }

    // ── Collection playback ─────────────────────────────────────────────

    /// Resolve the track ids a source view denotes, in display order.
    pub fn source_track_ids(&self, view: &SourceView) -> Result<Vec<u32>> {
        match view {
            SourceView::Library => Ok(self.catalog.ids()),
            SourceView::Category(category) => Ok(self
                .catalog
                .by_category(*category)
                .iter()
                .map(|t| t.id)
                .collect()),
            SourceView::Favorites => Ok(self.collections.favorites().to_vec()),
            SourceView::Playlist(id) => {
                let playlist = self
                    .collections
                    .playlist(id)
                    .ok_or_else(|| EngineError::NotFound(format!("playlist '{}'", id)))?;
                Ok(playlist
                    .track_ids
                    .iter()
                    .copied()
                    .filter(|&track_id| self.catalog.contains(track_id))
                    .collect())
            }
        }
    }

    /// "Play all" on a collection: reseed the queue wholesale and start
    /// its first track. `shuffled` plays the collection in random order
    /// without flipping the session's shuffle setting.
    pub fn play_source(&mut self, view: &SourceView, shuffled: bool) -> Result<()> {
        let mut track_ids = self.source_track_ids(view)?;
        if track_ids.is_empty() {
            return Err(EngineError::InvalidInput(
                "nothing to play in this collection".to_string(),
            ));
        }
        if shuffled {
            crate::queue::shuffle(&mut track_ids);
        }
        let first = track_ids[0];
        self.queue.seed(track_ids);
        self.events.push(Event::QueueChanged);
        self.play_track_id(first)
    }

    // ── Favorites & playlists ───────────────────────────────────────────

    /// Flip a favorite and resync the mirror playlist. Returns the new
    /// membership state.
    pub fn toggle_favorite(&mut self, track_id: u32) -> Result<bool> {
        let is_favorite =
            self.collections
                .toggle_favorite(track_id, &self.catalog, &mut self.events)?;
        self.sync
            .on_favorites_changed(&mut self.collections, &mut self.events);
        Ok(is_favorite)
    }

    /// Empty the favorites set and its mirror. Returns how many favorites
    /// were removed.
    pub fn clear_favorites(&mut self) -> usize {
        let removed = self.collections.clear_favorites(&mut self.events);
        if removed > 0 {
            self.sync
                .on_favorites_changed(&mut self.collections, &mut self.events);
        }
        removed
    }

    pub fn is_favorite(&self, track_id: u32) -> bool {
        self.collections.is_favorite(track_id)
    }

    pub fn create_playlist(
        &mut self,
        name: &str,
        description: &str,
        color: &str,
        icon: &str,
    ) -> Result<Playlist> {
        self.collections
            .create_playlist(name, description, color, icon, &mut self.events)
    }

    pub fn delete_playlist(&mut self, id: &str) -> Result<()> {
        self.collections.delete_playlist(id, &mut self.events)
    }

    pub fn update_playlist(
        &mut self,
        id: &str,
        name: Option<&str>,
        description: Option<&str>,
        color: Option<&str>,
        icon: Option<&str>,
    ) -> Result<()> {
        self.collections
            .update_playlist(id, name, description, color, icon, &mut self.events)
    }

    pub fn add_track_to_playlist(&mut self, id: &str, track_id: u32) -> Result<AddOutcome> {
        self.collections
            .add_track_to_playlist(id, track_id, &self.catalog, &mut self.events)
    }

    pub fn remove_track_from_playlist(&mut self, id: &str, track_id: u32) -> Result<()> {
        self.collections
            .remove_track_from_playlist(id, track_id, &mut self.events)
    }

    pub fn clear_playlist(&mut self, id: &str) -> Result<usize> {
        self.collections.clear_playlist(id, &mut self.events)
    }

    // ── Media event intake ──────────────────────────────────────────────

    /// Poll the backend and apply whatever completions arrived. The host
    /// calls this once per tick.
    pub fn tick(&mut self) {
        for event in self.playback.poll_backend() {
            self.handle_media_event(event);
        }
    }

    /// Apply one media-backend completion, resolving the natural-end
    /// policy when a track finishes on its own.
    pub fn handle_media_event(&mut self, event: MediaEvent) {
        if let Some(NaturalEnd) = self.playback.on_media_event(event, &mut self.events) {
            self.on_natural_end();
        }
    }

    /// Repeat/advance policy. Repeat-one restarts the same track;
    /// repeat-all always advances; repeat-none advances only while
    /// auto-play is enabled, otherwise playback stops with the selection
    /// retained. Manual skips never pass through here.
    fn on_natural_end(&mut self) {
        match self.playback.session.repeat_mode {
            RepeatMode::One => self.playback.restart_current(&mut self.events),
            RepeatMode::All => {
                if !self.advance_after_end() {
                    self.playback.stop_at_end(&mut self.events);
                }
            }
            RepeatMode::None => {
                if !self.settings.auto_play_next || !self.advance_after_end() {
                    self.playback.stop_at_end(&mut self.events);
                }
            }
        }
    }

    fn advance_after_end(&mut self) -> bool {
        let Some(current) = self.playback.session.current_track_id() else {
            return false;
        };
        match self.queue.resolve_next(current) {
            Some(next) => self.play_track_id(next).is_ok(),
            None => false,
        }
    }

    // ── Snapshots ───────────────────────────────────────────────────────

    pub fn get_transport(&self) -> TransportData {
        let session = &self.playback.session;
        TransportData {
            track_id: session.current_track_id(),
            number: session.current_track.as_ref().map(|t| t.number.clone()),
            title: session.current_track.as_ref().map(|t| t.title.clone()),
            is_playing: session.is_playing,
            position_secs: session.position_secs,
            duration_secs: session.duration_secs,
            volume: session.volume,
            repeat_mode: session.repeat_mode,
            shuffle_enabled: session.shuffle_enabled,
            queue_len: self.queue.len(),
        }
    }

    pub fn get_playlists(&self) -> Vec<PlaylistData> {
        self.collections
            .playlists()
            .iter()
            .map(|p| PlaylistData {
                id: p.id.clone(),
                name: p.name.clone(),
                description: p.description.clone(),
                color: p.color.clone(),
                icon: p.icon.clone(),
                is_system: p.is_system,
                track_count: p.track_count(),
                updated_at: p.updated_at,
            })
            .collect()
    }

    /// The tracks a source view would display, with favorite markers.
    pub fn list_tracks(&self, view: &SourceView) -> Result<Vec<TrackData>> {
        Ok(self
            .source_track_ids(view)?
            .into_iter()
            .filter_map(|id| self.catalog.get(id))
            .map(|t| TrackData {
                id: t.id,
                number: t.number.clone(),
                title: t.title.clone(),
                duration_display: t.duration_display(),
                is_favorite: self.collections.is_favorite(t.id),
            })
            .collect())
    }
}
