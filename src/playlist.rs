use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Fixed id of the system playlist mirroring the favorites set.
pub const FAVORITES_PLAYLIST_ID: &str = "default_favorites";
/// Fixed id of the system playback-history playlist.
pub const RECENTLY_PLAYED_ID: &str = "recently_played";
/// Recently Played keeps at most this many entries.
pub const RECENTLY_PLAYED_CAP: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub color: String,
    /// System playlists (favorites mirror, recently played) cannot be
    /// renamed, recolored, deleted, or directly edited.
    #[serde(default)]
    pub is_system: bool,
    /// Ordered, de-duplicated membership.
    pub track_ids: Vec<u32>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Playlist {
    pub fn new(id: String, name: String, description: String, color: String, icon: String) -> Self {
        let now = Utc::now().timestamp_millis();
        Playlist {
            id,
            name,
            description,
            icon,
            color,
            is_system: false,
            track_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// The favorites mirror. Its membership is rewritten by the
    /// SyncCoordinator and never edited directly.
    pub fn favorites_mirror() -> Self {
        let now = Utc::now().timestamp_millis();
        Playlist {
            id: FAVORITES_PLAYLIST_ID.to_string(),
            name: "Favorites".to_string(),
            description: "Favorited hymns, kept in sync automatically".to_string(),
            icon: "heart".to_string(),
            color: "#f44336".to_string(),
            is_system: true,
            track_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// The playback-history playlist, most-recent-first, capped at
    /// [`RECENTLY_PLAYED_CAP`] entries.
    pub fn recently_played() -> Self {
        let now = Utc::now().timestamp_millis();
        Playlist {
            id: RECENTLY_PLAYED_ID.to_string(),
            name: "Recently Played".to_string(),
            description: "Playback history".to_string(),
            icon: "history".to_string(),
            color: "#2196F3".to_string(),
            is_system: true,
            track_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a track id, preserving order and uniqueness.
    /// Returns false (and leaves `updated_at` alone) if already present.
    pub fn push_track(&mut self, track_id: u32) -> bool {
        if self.track_ids.contains(&track_id) {
            return false;
        }
        self.track_ids.push(track_id);
        self.touch();
        true
    }

    /// Remove a track id. Returns false if it was not a member.
    pub fn pull_track(&mut self, track_id: u32) -> bool {
        match self.track_ids.iter().position(|&id| id == track_id) {
            Some(pos) => {
                self.track_ids.remove(pos);
                self.touch();
                true
            }
            None => false,
        }
    }

    /// Move-to-front insert with a cap. Used only by Recently Played.
    pub fn unshift_capped(&mut self, track_id: u32, cap: usize) {
        self.track_ids.retain(|&id| id != track_id);
        self.track_ids.insert(0, track_id);
        self.track_ids.truncate(cap);
        self.touch();
    }

    pub fn track_count(&self) -> usize {
        self.track_ids.len()
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now().timestamp_millis();
    }
}
