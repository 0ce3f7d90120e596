//! Matching a new list of markers against the overlays which are already on the map.

use std::collections::{HashMap, HashSet, hash_map::Entry};

use crate::{CoordKey, MarkerDescription, Position};

/// Anything pinned to a position.
pub trait Located {
    fn location(&self) -> Position;
}

/// How overlays are made, refreshed and disposed of during [`reconcile`].
pub trait OverlayLifecycle<O, C> {
    /// No existing overlay matched `description`.
    fn create(&mut self, description: MarkerDescription<C>) -> O;

    /// `overlay` matched a description and is kept. Its content should be replaced with
    /// `content` and it should be redrawn.
    fn reuse(&mut self, overlay: &mut O, content: C);

    /// `overlay` did not match any description.
    fn destroy(&mut self, overlay: O);
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub created: usize,
    pub reused: usize,
    pub destroyed: usize,
    /// Descriptions dropped because an earlier one in the same list had the same position.
    pub skipped: usize,
}

impl ReconcileStats {
    /// Nothing was created nor destroyed.
    pub fn is_stable(&self) -> bool {
        self.created == 0 && self.destroyed == 0
    }
}

/// Result of [`reconcile`].
#[derive(Debug)]
pub struct Reconciled<O> {
    /// Overlays in the order of the descriptions.
    pub overlays: Vec<O>,
    pub stats: ReconcileStats,
}

/// Match `descriptions` against `active` overlays by exact position.
///
/// Each description claims the overlay with the same position, if there is one, which is then
/// reused with the new content. Descriptions with no match get a fresh overlay, and overlays
/// which nobody claimed are destroyed. An overlay can be claimed only once, and positions stay
/// unique: a description repeating the position of an earlier one is skipped.
pub fn reconcile<O, C, L>(
    active: Vec<O>,
    descriptions: impl IntoIterator<Item = MarkerDescription<C>>,
    lifecycle: &mut L,
) -> Reconciled<O>
where
    O: Located,
    L: OverlayLifecycle<O, C>,
{
    let mut stats = ReconcileStats::default();

    // Overlays stay in their original slots, so that the unclaimed ones are destroyed in
    // a deterministic order.
    let mut slots: Vec<Option<O>> = Vec::with_capacity(active.len());
    let mut index = HashMap::with_capacity(active.len());

    for overlay in active {
        if let Some(key) = CoordKey::new(overlay.location())
            && let Entry::Vacant(entry) = index.entry(key)
        {
            entry.insert(slots.len());
        }
        slots.push(Some(overlay));
    }

    let descriptions = descriptions.into_iter();
    let mut overlays = Vec::with_capacity(descriptions.size_hint().0);
    let mut seen = HashSet::new();

    for description in descriptions {
        let key = CoordKey::new(description.location);

        if let Some(key) = key {
            if !seen.insert(key) {
                log::warn!(
                    "More than one marker at {:?}, keeping the first one.",
                    description.location
                );
                stats.skipped += 1;
                continue;
            }

            if let Some(mut overlay) = index.remove(&key).and_then(|slot| slots[slot].take()) {
                lifecycle.reuse(&mut overlay, description.content);
                overlays.push(overlay);
                stats.reused += 1;
                continue;
            }
        }

        overlays.push(lifecycle.create(description));
        stats.created += 1;
    }

    for overlay in slots.into_iter().flatten() {
        lifecycle.destroy(overlay);
        stats.destroyed += 1;
    }

    log::debug!("Markers reconciled: {stats:?}.");
    Reconciled { overlays, stats }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lat_lng;

    #[derive(Debug, PartialEq)]
    struct Overlay {
        id: usize,
        position: Position,
        content: &'static str,
        redraws: usize,
    }

    impl Located for Overlay {
        fn location(&self) -> Position {
            self.position
        }
    }

    #[derive(Default)]
    struct Recorder {
        next_id: usize,
        destroyed: Vec<usize>,
    }

    impl Recorder {
        fn overlay(&mut self, lat: f64, lng: f64, content: &'static str) -> Overlay {
            self.create(marker(lat, lng, content))
        }
    }

    impl OverlayLifecycle<Overlay, &'static str> for Recorder {
        fn create(&mut self, description: MarkerDescription<&'static str>) -> Overlay {
            self.next_id += 1;
            Overlay {
                id: self.next_id,
                position: description.location,
                content: description.content,
                redraws: 0,
            }
        }

        fn reuse(&mut self, overlay: &mut Overlay, content: &'static str) {
            overlay.content = content;
            overlay.redraws += 1;
        }

        fn destroy(&mut self, overlay: Overlay) {
            self.destroyed.push(overlay.id);
        }
    }

    fn marker(lat: f64, lng: f64, content: &'static str) -> MarkerDescription<&'static str> {
        MarkerDescription::new(lat_lng(lat, lng), content)
    }

    fn summary(overlays: &[Overlay]) -> Vec<(usize, f64, f64, &'static str)> {
        overlays
            .iter()
            .map(|o| (o.id, o.position.y(), o.position.x(), o.content))
            .collect()
    }

    #[test]
    fn keeps_matching_creates_new_destroys_rest() {
        let mut recorder = Recorder::default();
        let active = vec![recorder.overlay(1., 1., "A"), recorder.overlay(2., 2., "B")];

        let reconciled = reconcile(
            active,
            [marker(2., 2., "B2"), marker(3., 3., "C")],
            &mut recorder,
        );

        assert_eq!(
            vec![(2, 2., 2., "B2"), (3, 3., 3., "C")],
            summary(&reconciled.overlays)
        );
        assert_eq!(1, reconciled.overlays[0].redraws);
        assert_eq!(vec![1], recorder.destroyed);
        assert_eq!(
            ReconcileStats {
                created: 1,
                reused: 1,
                destroyed: 1,
                skipped: 0
            },
            reconciled.stats
        );
    }

    #[test]
    fn reconciling_same_list_is_stable() {
        let mut recorder = Recorder::default();
        let markers = || [marker(1., 1., "A"), marker(2., 2., "B")];

        let first = reconcile(Vec::new(), markers(), &mut recorder);
        let ids: Vec<usize> = first.overlays.iter().map(|o| o.id).collect();

        let second = reconcile(first.overlays, markers(), &mut recorder);
        assert!(second.stats.is_stable());

        let third = reconcile(second.overlays, markers(), &mut recorder);
        assert!(third.stats.is_stable());
        assert_eq!(ids, third.overlays.iter().map(|o| o.id).collect::<Vec<_>>());
        assert!(recorder.destroyed.is_empty());
    }

    #[test]
    fn order_follows_descriptions() {
        let mut recorder = Recorder::default();
        let active = vec![recorder.overlay(1., 1., "A"), recorder.overlay(2., 2., "B")];

        let reconciled = reconcile(
            active,
            [marker(2., 2., "B"), marker(1., 1., "A")],
            &mut recorder,
        );

        assert_eq!(
            vec![(2, 2., 2., "B"), (1, 1., 1., "A")],
            summary(&reconciled.overlays)
        );
        assert!(reconciled.stats.is_stable());
    }

    #[test]
    fn duplicate_position_is_skipped() {
        let mut recorder = Recorder::default();
        let active = vec![recorder.overlay(1., 1., "A")];

        let reconciled = reconcile(
            active,
            [marker(1., 1., "A1"), marker(1., 1., "A2")],
            &mut recorder,
        );

        assert_eq!(vec![(1, 1., 1., "A1")], summary(&reconciled.overlays));
        assert_eq!(1, reconciled.stats.skipped);
        assert_eq!(0, reconciled.stats.created);
    }

    #[test]
    fn positions_must_match_exactly() {
        let mut recorder = Recorder::default();
        let active = vec![recorder.overlay(1., 1., "A")];

        let reconciled = reconcile(active, [marker(1.000_000_1, 1., "A")], &mut recorder);

        assert_eq!(1, reconciled.stats.created);
        assert_eq!(vec![1], recorder.destroyed);
    }

    #[test]
    fn nan_never_matches() {
        let mut recorder = Recorder::default();
        let active = vec![recorder.overlay(f64::NAN, 1., "A")];

        let reconciled = reconcile(active, [marker(f64::NAN, 1., "A")], &mut recorder);

        assert_eq!(1, reconciled.stats.created);
        assert_eq!(1, reconciled.stats.destroyed);
        assert_eq!(vec![1], recorder.destroyed);
    }

    #[test]
    fn unclaimed_overlays_are_destroyed_in_their_order() {
        let mut recorder = Recorder::default();
        let active = vec![
            recorder.overlay(3., 3., "C"),
            recorder.overlay(1., 1., "A"),
            recorder.overlay(2., 2., "B"),
        ];

        let reconciled = reconcile(active, Vec::new(), &mut recorder);

        assert!(reconciled.overlays.is_empty());
        assert_eq!(vec![1, 2, 3], recorder.destroyed);
    }
}
