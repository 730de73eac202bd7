//! Region model: the store, selection state and the edited working copy.

mod edited;
mod region;
mod selection;

pub use edited::EditedElement;
pub use region::{Metadata, Region, RegionId, RegionStore};
pub use selection::Selection;

use callico_geometry::{Point, Polygon, PolygonRules};

use crate::error::AnnotatorError;

/// Regions of the displayed element plus who is selected or edited.
///
/// At most one region is edited at a time, and deleting a region drops it
/// from every other state.
#[derive(Debug, Clone, Default)]
pub struct RegionModel {
    store: RegionStore,
    selection: Selection,
    edited: Option<EditedElement>,
}

impl RegionModel {
    pub fn new(children: impl IntoIterator<Item = Option<Region>>, rules: PolygonRules) -> Self {
        Self {
            store: RegionStore::from_children(children, rules),
            ..Self::default()
        }
    }

    pub fn store(&self) -> &RegionStore {
        &self.store
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut Selection {
        &mut self.selection
    }

    pub fn edited(&self) -> Option<&EditedElement> {
        self.edited.as_ref()
    }

    pub fn edited_mut(&mut self) -> Option<&mut EditedElement> {
        self.edited.as_mut()
    }

    /// Id of the region being edited, if any.
    pub fn edited_id(&self) -> Option<RegionId> {
        self.edited.as_ref().and_then(EditedElement::id)
    }

    /// Replace every region, dropping selection and edit state.
    pub fn replace_children(&mut self, children: impl IntoIterator<Item = Option<Region>>) {
        *self = Self::new(children, *self.store.rules());
    }

    // ------------------------------------------------------------------
    // Store operations
    // ------------------------------------------------------------------

    pub fn create(&mut self, polygon: Polygon, metadata: Metadata) -> Result<Region, AnnotatorError> {
        self.store.create(polygon, metadata).cloned()
    }

    pub fn insert(&mut self, region: Region) -> Result<(), AnnotatorError> {
        self.store.insert(region)
    }

    /// Replace a region's polygon, refreshing an idle working copy of it.
    pub fn update_geometry(&mut self, id: RegionId, polygon: Polygon) -> Result<bool, AnnotatorError> {
        let changed = self.store.update_geometry(id, polygon)?;
        if changed && self.edited_id() == Some(id) {
            if let Some(region) = self.store.get(id) {
                self.edited = Some(EditedElement::committed(id, &region.polygon));
            }
        }
        Ok(changed)
    }

    /// Tombstone a region and forget it everywhere.
    pub fn delete(&mut self, id: RegionId) -> Result<Region, AnnotatorError> {
        let region = self
            .store
            .delete(id)
            .ok_or(AnnotatorError::UnknownRegion(id))?;
        self.selection.forget(id);
        if self.edited_id() == Some(id) {
            self.edited = None;
        }
        Ok(region)
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    /// Select a region, ending the edit of any other one.
    pub fn select(&mut self, id: RegionId) -> Result<bool, AnnotatorError> {
        if !self.store.contains(id) {
            return Err(AnnotatorError::UnknownRegion(id));
        }
        if self.edited_id().is_some_and(|edited| edited != id) {
            self.clear_edit();
        }
        Ok(self.selection.select(id))
    }

    pub fn unselect(&mut self, id: RegionId) -> bool {
        self.selection.unselect(id)
    }

    /// Replace the selection, ignoring unknown ids.
    pub fn set_selected(&mut self, ids: &[RegionId]) {
        let known: Vec<RegionId> = ids
            .iter()
            .copied()
            .filter(|id| self.store.contains(*id))
            .collect();
        let edited = self.edited_id();
        if edited.is_some_and(|edited| known.iter().any(|id| *id != edited)) {
            self.clear_edit();
        }
        self.selection.set_selected(known);
    }

    // ------------------------------------------------------------------
    // Edited element
    // ------------------------------------------------------------------

    /// Make a stored region the edited one.
    pub fn start_edit(&mut self, id: RegionId) -> Result<(), AnnotatorError> {
        if self.edited_id() == Some(id) {
            return Ok(());
        }
        let region = self.store.get(id).ok_or(AnnotatorError::UnknownRegion(id))?;
        self.edited = Some(EditedElement::committed(id, &region.polygon));
        log::debug!("Editing region {}", id);
        Ok(())
    }

    /// Start a new uncommitted shape, dropping any previous edit.
    pub fn start_drawing(&mut self, points: Vec<Point>) {
        self.edited = Some(EditedElement::Uncommitted { points });
    }

    /// Take the uncommitted shape out, leaving committed edits alone.
    pub fn take_drawing(&mut self) -> Option<Vec<Point>> {
        match self.edited.take() {
            Some(EditedElement::Uncommitted { points }) => Some(points),
            other => {
                self.edited = other;
                None
            }
        }
    }

    pub fn clear_edit(&mut self) {
        if let Some(id) = self.edited_id() {
            log::debug!("Stopped editing region {}", id);
        }
        self.edited = None;
    }
}
