//! Regions and the region store.

use std::collections::HashMap;

use callico_geometry::{GeometryError, Point, Polygon, PolygonRules, check_polygon_with};
use serde::{Deserialize, Serialize};

use crate::error::AnnotatorError;

/// Region identifier, unique within one editor session.
pub type RegionId = u32;

/// Free-form region attributes carried alongside the geometry.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// An annotated area of the element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub id: RegionId,
    pub polygon: Polygon,
    /// Host attributes such as `type`, flattened into the region object
    #[serde(flatten)]
    pub metadata: Metadata,
}

impl Region {
    pub fn new(id: RegionId, polygon: Polygon) -> Self {
        Self {
            id,
            polygon,
            metadata: Metadata::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// The `type` attribute, if it is a string.
    pub fn region_type(&self) -> Option<&str> {
        self.metadata.get("type").and_then(|v| v.as_str())
    }

    pub fn contains(&self, point: Point) -> bool {
        self.polygon.contains(&point)
    }
}

/// Regions of one element, indexed by id and kept in display order.
///
/// Deleted regions leave a tombstone. Ids are never reused: a new id is one
/// past the highest id ever seen, tombstones included. Every stored polygon
/// has passed [`check_polygon_with`] and is kept in normalized form.
#[derive(Debug, Clone, Default)]
pub struct RegionStore {
    slots: HashMap<RegionId, Option<Region>>,
    /// Display order, later entries are drawn on top
    order: Vec<RegionId>,
    highest_id: RegionId,
    rules: PolygonRules,
}

impl RegionStore {
    pub fn new(rules: PolygonRules) -> Self {
        Self {
            rules,
            ..Self::default()
        }
    }

    /// Build a store from a host-supplied list where `None` marks a deleted
    /// region.
    ///
    /// Each created region used to append one entry, so the list length is
    /// a lower bound on ids already handed out. Duplicate ids keep their
    /// first occurrence. A region with an invalid polygon becomes a
    /// tombstone, so its id is still never handed out again.
    pub fn from_children(
        children: impl IntoIterator<Item = Option<Region>>,
        rules: PolygonRules,
    ) -> Self {
        let mut store = Self::new(rules);
        let mut entries: RegionId = 0;
        for child in children {
            entries = entries.saturating_add(1);
            let Some(region) = child else {
                continue;
            };
            let id = region.id;
            match store.insert(region) {
                Ok(()) => {}
                Err(AnnotatorError::Geometry(e)) => {
                    log::warn!("Region {} from host has an invalid polygon: {}", id, e);
                    store.tombstone(id);
                }
                Err(e) => log::warn!("Skipping region from host: {}", e),
            }
        }
        store.highest_id = store.highest_id.max(entries);
        store
    }

    pub fn rules(&self) -> &PolygonRules {
        &self.rules
    }

    /// Id the next created region will get, `None` once ids run out.
    pub fn next_id(&self) -> Option<RegionId> {
        self.highest_id.checked_add(1)
    }

    fn normalize(&self, polygon: &Polygon) -> Result<Polygon, AnnotatorError> {
        check_polygon_with(polygon.points(), &self.rules)
            .map_err(|e| AnnotatorError::Geometry(GeometryError::from(e)))
    }

    fn tombstone(&mut self, id: RegionId) {
        if !self.slots.contains_key(&id) {
            self.order.push(id);
            self.slots.insert(id, None);
        }
        self.highest_id = self.highest_id.max(id);
    }

    /// Create a region with a fresh id.
    pub fn create(&mut self, polygon: Polygon, metadata: Metadata) -> Result<&Region, AnnotatorError> {
        let polygon = self.normalize(&polygon)?;
        let id = self.next_id().ok_or(AnnotatorError::IdsExhausted)?;
        self.highest_id = id;
        self.order.push(id);
        log::debug!("Created region {} with {} points", id, polygon.len());
        let region: &Region = self
            .slots
            .entry(id)
            .or_insert(None)
            .insert(Region::new(id, polygon).with_metadata(metadata));
        Ok(region)
    }

    /// Add a region that already has an id, as announced by another widget.
    pub fn insert(&mut self, mut region: Region) -> Result<(), AnnotatorError> {
        let id = region.id;
        if self.contains(id) {
            return Err(AnnotatorError::DuplicateRegion(id));
        }
        region.polygon = self.normalize(&region.polygon)?;
        if !self.slots.contains_key(&id) {
            self.order.push(id);
        }
        self.highest_id = self.highest_id.max(id);
        self.slots.insert(id, Some(region));
        Ok(())
    }

    /// Replace a region's polygon.
    ///
    /// Returns whether the geometry actually changed.
    pub fn update_geometry(&mut self, id: RegionId, polygon: Polygon) -> Result<bool, AnnotatorError> {
        if !self.contains(id) {
            return Err(AnnotatorError::UnknownRegion(id));
        }
        let polygon = self.normalize(&polygon)?;
        let region = self
            .get_mut(id)
            .ok_or(AnnotatorError::UnknownRegion(id))?;
        if region.polygon == polygon {
            return Ok(false);
        }
        region.polygon = polygon;
        log::debug!("Updated geometry of region {}", id);
        Ok(true)
    }

    /// Tombstone a region, returning it.
    pub fn delete(&mut self, id: RegionId) -> Option<Region> {
        let removed = self.slots.get_mut(&id).and_then(Option::take);
        if removed.is_some() {
            log::debug!("Deleted region {}", id);
        }
        removed
    }

    pub fn get(&self, id: RegionId) -> Option<&Region> {
        self.slots.get(&id).and_then(Option::as_ref)
    }

    fn get_mut(&mut self, id: RegionId) -> Option<&mut Region> {
        self.slots.get_mut(&id).and_then(Option::as_mut)
    }

    pub fn contains(&self, id: RegionId) -> bool {
        self.get(id).is_some()
    }

    /// Live regions in display order.
    pub fn iter(&self) -> impl Iterator<Item = &Region> {
        self.order.iter().filter_map(|id| self.get(*id))
    }

    /// All entries in display order, `None` for deleted regions.
    pub fn children(&self) -> Vec<Option<Region>> {
        self.order.iter().map(|id| self.get(*id).cloned()).collect()
    }

    /// Number of live regions.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Topmost live region containing `point`.
    pub fn hit_test(&self, point: Point) -> Option<RegionId> {
        self.order
            .iter()
            .rev()
            .filter_map(|id| self.get(*id))
            .find(|region| region.contains(point))
            .map(|region| region.id)
    }
}
