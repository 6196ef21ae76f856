//! Per-controller selection of commission ids and the observations typed
//! next to them.

use std::collections::BTreeMap;

/// Ids keep the order they were picked in; observations outlive a
/// deselect so re-ticking a row brings its note back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: Vec<i64>,
    observations: BTreeMap<i64, String>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(&mut self, id: i64) {
        if !self.ids.contains(&id) {
            self.ids.push(id);
        }
    }

    pub fn deselect(&mut self, id: i64) {
        self.ids.retain(|selected| *selected != id);
    }

    /// Flips `id` and reports whether it is now selected.
    pub fn toggle(&mut self, id: i64) -> bool {
        if self.contains(id) {
            self.deselect(id);
            false
        } else {
            self.select(id);
            true
        }
    }

    /// Replaces the selection with `ids`, skipping duplicates.
    pub fn select_only(&mut self, ids: impl IntoIterator<Item = i64>) {
        self.ids.clear();
        for id in ids {
            self.select(id);
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Drops ids and observations.
    pub fn reset(&mut self) {
        self.ids.clear();
        self.observations.clear();
    }

    pub fn contains(&self, id: i64) -> bool {
        self.ids.contains(&id)
    }

    pub fn ids(&self) -> &[i64] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Blank text removes the observation.
    pub fn observe(&mut self, id: i64, text: &str) {
        if text.trim().is_empty() {
            self.observations.remove(&id);
        } else {
            self.observations.insert(id, text.to_string());
        }
    }

    pub fn observation(&self, id: i64) -> Option<&str> {
        self.observations.get(&id).map(String::as_str)
    }

    pub fn observations(&self) -> &BTreeMap<i64, String> {
        &self.observations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_is_idempotent_and_ordered() {
        let mut selection = Selection::new();
        selection.select(7);
        selection.select(3);
        selection.select(7);

        assert_eq!(selection.ids(), &[7, 3]);
        assert_eq!(selection.len(), 2);
    }

    #[test]
    fn toggle_flips_membership() {
        let mut selection = Selection::new();
        assert!(selection.toggle(5));
        assert!(selection.contains(5));
        assert!(!selection.toggle(5));
        assert!(selection.is_empty());
    }

    #[test]
    fn select_only_replaces_and_dedupes() {
        let mut selection = Selection::new();
        selection.select(1);
        selection.select_only([4, 2, 4]);
        assert_eq!(selection.ids(), &[4, 2]);
    }

    #[test]
    fn observations_survive_deselect_but_not_reset() {
        let mut selection = Selection::new();
        selection.select(9);
        selection.observe(9, "conferir ITBI");
        selection.deselect(9);
        assert_eq!(selection.observation(9), Some("conferir ITBI"));

        selection.observe(9, "  ");
        assert_eq!(selection.observation(9), None);

        selection.observe(9, "de novo");
        selection.reset();
        assert!(selection.observations().is_empty());
        assert!(selection.is_empty());
    }
}
