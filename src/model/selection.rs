//! Selection, highlight and hover sets.

use std::collections::BTreeSet;

use super::RegionId;

/// Which regions are selected, highlighted or hovered.
///
/// Highlight comes from other widgets; hover tracks the pointer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    selected: BTreeSet<RegionId>,
    highlighted: BTreeSet<RegionId>,
    hovered: Option<RegionId>,
}

impl Selection {
    pub fn is_selected(&self, id: RegionId) -> bool {
        self.selected.contains(&id)
    }

    pub fn is_highlighted(&self, id: RegionId) -> bool {
        self.highlighted.contains(&id) || self.hovered == Some(id)
    }

    pub fn selected(&self) -> impl Iterator<Item = RegionId> + '_ {
        self.selected.iter().copied()
    }

    pub fn highlighted(&self) -> impl Iterator<Item = RegionId> + '_ {
        self.highlighted.iter().copied()
    }

    pub fn hovered(&self) -> Option<RegionId> {
        self.hovered
    }

    /// Returns whether the id was newly selected.
    pub fn select(&mut self, id: RegionId) -> bool {
        self.selected.insert(id)
    }

    /// Returns whether the id was selected.
    pub fn unselect(&mut self, id: RegionId) -> bool {
        self.selected.remove(&id)
    }

    pub fn set_selected(&mut self, ids: impl IntoIterator<Item = RegionId>) {
        self.selected = ids.into_iter().collect();
    }

    pub fn set_highlighted(&mut self, ids: impl IntoIterator<Item = RegionId>) {
        self.highlighted = ids.into_iter().collect();
    }

    /// Returns whether the hovered region changed.
    pub fn set_hovered(&mut self, id: Option<RegionId>) -> bool {
        let changed = self.hovered != id;
        self.hovered = id;
        changed
    }

    /// Drop every reference to a region.
    pub fn forget(&mut self, id: RegionId) {
        self.selected.remove(&id);
        self.highlighted.remove(&id);
        if self.hovered == Some(id) {
            self.hovered = None;
        }
    }
}
