use serde::{Deserialize, Serialize};

/// A single hymn in the catalog. Immutable once loaded — the engine never
/// rewrites track records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub id: u32,
    /// Hymn number as printed in the hymnal ("1".."480"). Kept as a string
    /// because some editions use suffixed numbers.
    pub number: String,
    pub title: String,
    /// Reference handed to the media backend (a file path or URL).
    pub media_ref: String,
    pub duration_secs: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lyrics: Option<String>,
}

impl Track {
    /// Format duration as M:SS.
    pub fn duration_display(&self) -> String {
        let secs = self.duration_secs.max(0.0) as u64;
        format!("{}:{:02}", secs / 60, secs % 60)
    }
}

/// The full, filtered set of valid tracks loaded at startup.
///
/// Tracks with an empty or whitespace-only title never enter the catalog,
/// and duplicate ids are dropped (first occurrence wins).
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tracks: Vec<Track>,
}

impl Catalog {
    pub fn new(tracks: Vec<Track>) -> Self {
        let mut seen = std::collections::HashSet::new();
        let mut kept = Vec::with_capacity(tracks.len());
        for track in tracks {
            if track.title.trim().is_empty() {
                log::warn!("dropping track {} with blank title", track.id);
                continue;
            }
            if !seen.insert(track.id) {
                log::warn!("dropping duplicate track id {}", track.id);
                continue;
            }
            kept.push(track);
        }
        Catalog { tracks: kept }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get(&self, id: u32) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    pub fn contains(&self, id: u32) -> bool {
        self.get(id).is_some()
    }

    /// Ids in catalog order — the seed for an unshuffled queue.
    pub fn ids(&self) -> Vec<u32> {
        self.tracks.iter().map(|t| t.id).collect()
    }

    /// Tracks matching a category, in catalog order.
    pub fn by_category(&self, category: Category) -> Vec<&Track> {
        self.tracks
            .iter()
            .filter(|t| category.matches(t))
            .collect()
    }
}

/// Hymn numbers reserved for funeral services.
const FUNERAL_NUMBERS: [&str; 5] = ["426", "427", "428", "429", "430"];

/// Closed set of browsing categories. Membership is derived from the hymn
/// number, so categories need no persisted state of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    /// Every hymn except the funeral set.
    General,
    /// Hymns 1 through 430.
    OfficialService,
    /// Hymns 431 through 480.
    Youth,
    /// The funeral set (426–430).
    Funeral,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::General,
        Category::OfficialService,
        Category::Youth,
        Category::Funeral,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Category::General => "General",
            Category::OfficialService => "Official Service",
            Category::Youth => "Youth Meeting",
            Category::Funeral => "Funeral",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Category::General => "All hymns except the funeral set",
            Category::OfficialService => "Hymns 1 to 430",
            Category::Youth => "Hymns 431 to 480",
            Category::Funeral => "Hymns for funeral services",
        }
    }

    pub fn matches(&self, track: &Track) -> bool {
        let number: Option<u32> = track.number.parse().ok();
        match self {
            Category::General => !FUNERAL_NUMBERS.contains(&track.number.as_str()),
            Category::OfficialService => matches!(number, Some(n) if (1..=430).contains(&n)),
            Category::Youth => matches!(number, Some(n) if (431..=480).contains(&n)),
            Category::Funeral => FUNERAL_NUMBERS.contains(&track.number.as_str()),
        }
    }

    pub fn from_slug(slug: &str) -> Option<Category> {
        match slug {
            "general" => Some(Category::General),
            "official-service" => Some(Category::OfficialService),
            "youth" => Some(Category::Youth),
            "funeral" => Some(Category::Funeral),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_track(id: u32, number: &str, title: &str) -> Track {
        Track {
            id,
            number: number.to_string(),
            title: title.to_string(),
            media_ref: format!("audio/{}.mp3", number),
            duration_secs: 180.0,
            lyrics: None,
        }
    }

    #[test]
    fn duration_display_formats_correctly() {
        let mut track = make_track(1, "1", "Test");
        track.duration_secs = 185.0;
        assert_eq!(track.duration_display(), "3:05");
    }

    #[test]
    fn catalog_filters_blank_titles() {
        let catalog = Catalog::new(vec![
            make_track(1, "1", "Kept"),
            make_track(2, "2", "   "),
            make_track(3, "3", ""),
        ]);
        assert_eq!(catalog.len(), 1);
        assert!(catalog.contains(1));
        assert!(!catalog.contains(2));
    }

    #[test]
    fn catalog_drops_duplicate_ids_keeping_first() {
        let catalog = Catalog::new(vec![
            make_track(1, "1", "First"),
            make_track(1, "2", "Second"),
        ]);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get(1).unwrap().title, "First");
    }

    #[test]
    fn category_boundaries() {
        let official = make_track(10, "430", "A");
        let youth = make_track(11, "431", "B");
        let last_youth = make_track(12, "480", "C");
        assert!(Category::OfficialService.matches(&official));
        assert!(!Category::OfficialService.matches(&youth));
        assert!(Category::Youth.matches(&youth));
        assert!(Category::Youth.matches(&last_youth));
        assert!(!Category::Youth.matches(&official));
    }

    #[test]
    fn funeral_hymns_excluded_from_general() {
        let funeral = make_track(20, "428", "Funeral hymn");
        let regular = make_track(21, "100", "Regular hymn");
        assert!(Category::Funeral.matches(&funeral));
        assert!(!Category::General.matches(&funeral));
        assert!(Category::General.matches(&regular));
        // Funeral numbers sit inside the official-service range.
        assert!(Category::OfficialService.matches(&funeral));
    }

    #[test]
    fn category_slug_round_trip() {
        for cat in Category::ALL {
            let json = serde_json::to_string(&cat).unwrap();
            let slug = json.trim_matches('"');
            assert_eq!(Category::from_slug(slug), Some(cat));
        }
        assert_eq!(Category::from_slug("nope"), None);
    }
}
