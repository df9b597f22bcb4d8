//! Next/previous resolution over the active queue.
//!
//! The queue is an ordered list of track ids, reseeded wholesale whenever
//! the user plays a collection or toggles shuffle. Resolution is circular:
//! advancing past the last entry wraps to the first, and a one-track queue
//! self-loops by definition.

use crate::track::Catalog;

#[derive(Debug, Default)]
pub struct QueueResolver {
    queue: Vec<u32>,
}

impl QueueResolver {
    pub fn new() -> Self {
        QueueResolver::default()
    }

    /// Replace the queue wholesale. Used for "play all" on the library, a
    /// category, a playlist, or favorites. Duplicates are allowed when the
    /// caller queues them explicitly.
    pub fn seed(&mut self, track_ids: Vec<u32>) {
        self.queue = track_ids;
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }

    /// Rebuild the queue as `[current] + random permutation of the rest of
    /// the catalog`. With no current track the whole catalog is permuted.
    /// Fisher–Yates, so every permutation is equally likely.
    pub fn enable_shuffle(&mut self, catalog: &Catalog, current: Option<u32>) {
        let mut rest: Vec<u32> = match current {
            Some(id) if catalog.contains(id) => {
                catalog.ids().into_iter().filter(|&t| t != id).collect()
            }
            _ => catalog.ids(),
        };
        shuffle(&mut rest);
        let mut queue = Vec::with_capacity(rest.len() + 1);
        if let Some(id) = current {
            if catalog.contains(id) {
                queue.push(id);
            }
        }
        queue.extend(rest);
        self.queue = queue;
    }

    /// Reset the queue to catalog order.
    pub fn disable_shuffle(&mut self, catalog: &Catalog) {
        self.queue = catalog.ids();
    }

    /// The track after `current`, treating the queue as circular.
    /// `None` when the queue is empty or `current` is no longer in it
    /// (e.g. the queue was reseeded since playback started).
    pub fn resolve_next(&self, current: u32) -> Option<u32> {
        self.resolve_offset(current, 1)
    }

    /// The track before `current`, circular. Same absence rules as
    /// [`resolve_next`](Self::resolve_next).
    pub fn resolve_previous(&self, current: u32) -> Option<u32> {
        self.resolve_offset(current, -1)
    }

    fn resolve_offset(&self, current: u32, offset: isize) -> Option<u32> {
        if self.queue.is_empty() {
            return None;
        }
        let len = self.queue.len() as isize;
        let index = self.queue.iter().position(|&id| id == current)? as isize;
        let target = (index + offset).rem_euclid(len) as usize;
        Some(self.queue[target])
    }

    pub fn first(&self) -> Option<u32> {
        self.queue.first().copied()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn track_ids(&self) -> &[u32] {
        &self.queue
    }
}

/// Unbiased in-place Fisher–Yates shuffle. Shared by shuffle mode and
/// "play shuffled" on a collection.
pub(crate) fn shuffle(ids: &mut [u32]) {
    for i in (1..ids.len()).rev() {
        let j = fastrand::usize(..=i);
        ids.swap(i, j);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::Track;

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

    #[test]
    fn resolve_next_walks_forward_and_wraps() {
        let mut resolver = QueueResolver::new();
        resolver.seed(vec![1, 2, 3]);
        assert_eq!(resolver.resolve_next(1), Some(2));
        assert_eq!(resolver.resolve_next(2), Some(3));
        assert_eq!(resolver.resolve_next(3), Some(1));
    }

    #[test]
    fn resolve_previous_walks_backward_and_wraps() {
        let mut resolver = QueueResolver::new();
        resolver.seed(vec![1, 2, 3]);
        assert_eq!(resolver.resolve_previous(2), Some(1));
        assert_eq!(resolver.resolve_previous(1), Some(3));
    }

    #[test]
    fn next_then_previous_is_identity() {
        let mut resolver = QueueResolver::new();
        resolver.seed(vec![4, 8, 15, 16, 23, 42]);
        for &id in resolver.track_ids() {
            let next = resolver.resolve_next(id).unwrap();
            assert_eq!(resolver.resolve_previous(next), Some(id));
            let prev = resolver.resolve_previous(id).unwrap();
            assert_eq!(resolver.resolve_next(prev), Some(id));
        }
    }

    #[test]
    fn single_element_queue_self_loops() {
        let mut resolver = QueueResolver::new();
        resolver.seed(vec![7]);
        assert_eq!(resolver.resolve_next(7), Some(7));
        assert_eq!(resolver.resolve_previous(7), Some(7));
    }

    #[test]
    fn unknown_current_cannot_advance() {
        let mut resolver = QueueResolver::new();
        resolver.seed(vec![1, 2, 3]);
        assert_eq!(resolver.resolve_next(99), None);
        assert_eq!(resolver.resolve_previous(99), None);
    }

    #[test]
    fn empty_queue_cannot_advance() {
        let resolver = QueueResolver::new();
        assert_eq!(resolver.resolve_next(1), None);
        assert_eq!(resolver.resolve_previous(1), None);
    }

    #[test]
    fn shuffle_keeps_current_first_and_preserves_membership() {
        let catalog = make_catalog(20);
        let mut resolver = QueueResolver::new();
        resolver.seed(catalog.ids());
        resolver.enable_shuffle(&catalog, Some(5));
        assert_eq!(resolver.first(), Some(5));
        assert_eq!(resolver.len(), 20);
        let mut sorted: Vec<u32> = resolver.track_ids().to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, catalog.ids());
    }

    #[test]
    fn shuffle_without_current_permutes_whole_catalog() {
        let catalog = make_catalog(10);
        let mut resolver = QueueResolver::new();
        resolver.enable_shuffle(&catalog, None);
        assert_eq!(resolver.len(), 10);
    }

    #[test]
    fn disable_shuffle_restores_catalog_order() {
        let catalog = make_catalog(30);
        let mut resolver = QueueResolver::new();
        resolver.enable_shuffle(&catalog, Some(12));
        resolver.disable_shuffle(&catalog);
        assert_eq!(resolver.track_ids(), catalog.ids().as_slice());
    }

    #[test]
    fn duplicates_resolve_from_first_occurrence() {
        let mut resolver = QueueResolver::new();
        resolver.seed(vec![1, 2, 1, 3]);
        // Lookup finds the first occurrence of id 1.
        assert_eq!(resolver.resolve_next(1), Some(2));
        assert_eq!(resolver.resolve_previous(1), Some(3));
    }
}
