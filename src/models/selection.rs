use std::collections::BTreeSet;

use serde::Serialize;

/// Rows checked in a listing view, plus the derived header checkbox.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    selected: BTreeSet<i32>,
    select_all: bool,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ids(&self) -> &BTreeSet<i32> {
        &self.selected
    }

    pub fn contains(&self, id: i32) -> bool {
        self.selected.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn select_all(&self) -> bool {
        self.select_all
    }

    /// Checking the header replaces the selection with the current page,
    /// unchecking it empties the selection.
    pub fn toggle_select_all(&mut self, on_page_ids: &[i32], checked: bool) {
        if checked {
            self.selected = on_page_ids.iter().copied().collect();
        } else {
            self.selected.clear();
        }
        self.recompute_select_all(on_page_ids);
    }

    /// Flips a single row. Ids can only be added while they are on the
    /// current page; returns false when an add was refused.
    pub fn toggle_one(&mut self, id: i32, on_page_ids: &[i32]) -> bool {
        let accepted = if self.selected.remove(&id) {
            true
        } else if on_page_ids.contains(&id) {
            self.selected.insert(id);
            true
        } else {
            false
        };

        self.recompute_select_all(on_page_ids);
        accepted
    }

    pub fn recompute_select_all(&mut self, on_page_ids: &[i32]) {
        self.select_all =
            !on_page_ids.is_empty() && on_page_ids.iter().all(|id| self.selected.contains(id));
    }

    pub fn reset(&mut self) {
        self.selected.clear();
        self.select_all = false;
    }

    /// Hands the selected ids to the caller and leaves the state reset.
    pub fn take(&mut self) -> BTreeSet<i32> {
        self.select_all = false;
        std::mem::take(&mut self.selected)
    }

    pub fn view(&self) -> SelectionView {
        SelectionView {
            ids: self.selected.iter().copied().collect(),
            select_all: self.select_all,
            count: self.selected.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectionView {
    pub ids: Vec<i32>,
    pub select_all: bool,
    pub count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_all_takes_exactly_the_page() {
        let mut selection = SelectionState::new();
        selection.toggle_one(9, &[9]);

        selection.toggle_select_all(&[1, 2, 3], true);

        assert_eq!(selection.ids(), &BTreeSet::from([1, 2, 3]));
        assert!(selection.select_all());
    }

    #[test]
    fn test_unselect_all_empties_selection() {
        let mut selection = SelectionState::new();
        selection.toggle_select_all(&[1, 2, 3], true);

        selection.toggle_select_all(&[1, 2, 3], false);

        assert!(selection.is_empty());
        assert!(!selection.select_all());
    }

    #[test]
    fn test_flag_follows_individual_toggles() {
        let page = [1, 2, 3];
        let mut selection = SelectionState::new();

        selection.toggle_one(1, &page);
        selection.toggle_one(2, &page);
        assert!(!selection.select_all());

        selection.toggle_one(3, &page);
        assert!(selection.select_all());

        selection.toggle_one(3, &page);
        assert!(!selection.select_all());
        assert_eq!(selection.len(), 2);
    }

    #[test]
    fn test_empty_page_never_sets_flag() {
        let mut selection = SelectionState::new();
        selection.toggle_select_all(&[1, 2], true);

        selection.toggle_select_all(&[], true);

        assert!(selection.is_empty());
        assert!(!selection.select_all());

        selection.toggle_select_all(&[1], true);
        selection.recompute_select_all(&[]);
        assert!(!selection.select_all());
    }

    #[test]
    fn test_ids_off_the_page_are_refused() {
        let mut selection = SelectionState::new();

        assert!(!selection.toggle_one(42, &[1, 2]));
        assert!(selection.is_empty());
    }

    #[test]
    fn test_selected_id_can_be_removed_from_another_page() {
        let mut selection = SelectionState::new();
        selection.toggle_select_all(&[1, 2], true);

        assert!(selection.toggle_one(1, &[11, 12]));
        assert_eq!(selection.ids(), &BTreeSet::from([2]));
    }

    #[test]
    fn test_superset_of_page_sets_flag() {
        let mut selection = SelectionState::new();
        selection.toggle_select_all(&[1, 2, 3], true);

        selection.recompute_select_all(&[2, 3]);

        assert!(selection.select_all());
    }

    #[test]
    fn test_take_resets_state() {
        let mut selection = SelectionState::new();
        selection.toggle_select_all(&[4, 5], true);

        let taken = selection.take();

        assert_eq!(taken, BTreeSet::from([4, 5]));
        assert!(selection.is_empty());
        assert!(!selection.select_all());
    }
}
