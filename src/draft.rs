//! Draft persistence.
//!
//! Regions drawn during a task are kept as a draft keyed by task and parent
//! element, so an interrupted session can pick them up again. Restored
//! regions are validated again before use: the rules may have changed since
//! the draft was written.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use callico_geometry::{
    BoundingBox, BoxBounds, Element, GeometryError, PolygonRules, bounding_box, check_polygon_with,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use web_time::Instant;

use crate::broadcast::{BroadcastEvent, EventBus, SubscriptionId, WidgetId};
use crate::model::{Region, RegionId};

/// Current draft format version.
pub const DRAFT_VERSION: u32 = 1;

/// Identifies the draft of one task on one parent element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DraftKey {
    pub task: String,
    pub parent: String,
}

impl DraftKey {
    pub fn new(task: impl Into<String>, parent: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            parent: parent.into(),
        }
    }

    /// Flat key usable as a storage item or file name.
    ///
    /// Distinct keys give distinct strings: each part is escaped so it
    /// only holds ASCII letters, digits, `-` and `_` escapes, and the parts
    /// are joined by `.`.
    pub fn storage_key(&self) -> String {
        format!(
            "callico-draft.{}.{}",
            escape_key_part(&self.task),
            escape_key_part(&self.parent)
        )
    }
}

/// Replace every byte other than an ASCII letter, digit or `-` by `_xx`.
fn escape_key_part(part: &str) -> String {
    let mut escaped = String::with_capacity(part.len());
    for byte in part.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            escaped.push(char::from(byte));
        } else {
            escaped.push_str(&format!("_{byte:02x}"));
        }
    }
    escaped
}

/// Saved region list, `None` entries are deleted regions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    pub version: u32,
    pub regions: Vec<Option<Region>>,
}

impl Draft {
    pub fn new(regions: Vec<Option<Region>>) -> Self {
        Self {
            version: DRAFT_VERSION,
            regions,
        }
    }

    pub fn to_json(&self) -> Result<String, DraftError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, DraftError> {
        let draft: Self = serde_json::from_str(json)?;
        if draft.version > DRAFT_VERSION {
            return Err(DraftError::VersionTooNew {
                found: draft.version,
                supported: DRAFT_VERSION,
            });
        }
        Ok(draft)
    }
}

/// Errors from draft storage.
#[derive(Error, Debug)]
pub enum DraftError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Draft version {found} is newer than supported version {supported}")]
    VersionTooNew { found: u32, supported: u32 },
}

/// Where drafts are kept.
pub trait DraftStore {
    fn load(&self, key: &DraftKey) -> Result<Option<Draft>, DraftError>;
    fn save(&mut self, key: &DraftKey, draft: &Draft) -> Result<(), DraftError>;
    fn remove(&mut self, key: &DraftKey) -> Result<(), DraftError>;
}

/// In-memory store holding serialized drafts, like browser storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryDraftStore {
    items: HashMap<String, String>,
}

impl MemoryDraftStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl DraftStore for MemoryDraftStore {
    fn load(&self, key: &DraftKey) -> Result<Option<Draft>, DraftError> {
        self.items
            .get(&key.storage_key())
            .map(|json| Draft::from_json(json))
            .transpose()
    }

    fn save(&mut self, key: &DraftKey, draft: &Draft) -> Result<(), DraftError> {
        self.items.insert(key.storage_key(), draft.to_json()?);
        Ok(())
    }

    fn remove(&mut self, key: &DraftKey) -> Result<(), DraftError> {
        self.items.remove(&key.storage_key());
        Ok(())
    }
}

/// One JSON file per draft in a directory.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone)]
pub struct FileDraftStore {
    dir: std::path::PathBuf,
}

#[cfg(not(target_arch = "wasm32"))]
impl FileDraftStore {
    pub fn new(dir: impl Into<std::path::PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, key: &DraftKey) -> std::path::PathBuf {
        self.dir.join(format!("{}.json", key.storage_key()))
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl DraftStore for FileDraftStore {
    fn load(&self, key: &DraftKey) -> Result<Option<Draft>, DraftError> {
        let path = self.path(key);
        match std::fs::read_to_string(&path) {
            Ok(json) => Draft::from_json(&json).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&mut self, key: &DraftKey, draft: &Draft) -> Result<(), DraftError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path(key);
        std::fs::write(&path, draft.to_json()?)?;
        log::debug!("Saved draft to {:?}", path);
        Ok(())
    }

    fn remove(&mut self, key: &DraftKey) -> Result<(), DraftError> {
        match std::fs::remove_file(self.path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// ============================================================================
// Restore
// ============================================================================

/// Draft regions that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct RestoredDraft {
    /// Regions in draft order, rejected ones turned into deleted entries
    pub children: Vec<Option<Region>>,
    pub discarded: usize,
}

/// Validate draft regions against the current element and rules.
///
/// A region is dropped when its polygon fails validation, leaves the
/// element box, or when `allowed_types` is given and its `type` is not
/// listed. Kept polygons are normalized.
pub fn restore_regions(
    draft: &Draft,
    element: &Element,
    allowed_types: Option<&[String]>,
    rules: &PolygonRules,
) -> Result<RestoredDraft, GeometryError> {
    let element_box = bounding_box(element, BoxBounds::ImageBounded)?;
    let mut discarded = 0;

    let children = draft
        .regions
        .iter()
        .map(|entry| {
            let region = entry.as_ref()?;
            let kept = restore_region(region, &element_box, allowed_types, rules);
            if kept.is_none() {
                discarded += 1;
            }
            kept
        })
        .collect();

    if discarded > 0 {
        log::warn!("Discarded {} invalid region(s) from draft", discarded);
    }
    Ok(RestoredDraft {
        children,
        discarded,
    })
}

fn restore_region(
    region: &Region,
    element_box: &BoundingBox,
    allowed_types: Option<&[String]>,
    rules: &PolygonRules,
) -> Option<Region> {
    if let Some(allowed) = allowed_types {
        let known = region
            .region_type()
            .is_some_and(|t| allowed.iter().any(|a| a == t));
        if !known {
            log::debug!("Draft region {} has an unknown type", region.id);
            return None;
        }
    }

    let polygon = match check_polygon_with(region.polygon.points(), rules) {
        Ok(polygon) => polygon,
        Err(e) => {
            log::debug!("Draft region {} is invalid: {}", region.id, e);
            return None;
        }
    };
    if !polygon.points().iter().all(|p| element_box.contains(p)) {
        log::debug!("Draft region {} leaves the element", region.id);
        return None;
    }

    Some(Region {
        polygon,
        ..region.clone()
    })
}

// ============================================================================
// Recorder
// ============================================================================

/// Mirrors region changes seen on the bus and writes them as a draft.
///
/// With a debounce delay, saves happen from [`DraftRecorder::tick`] once
/// changes have settled; without one, every change is saved immediately.
pub struct DraftRecorder {
    key: DraftKey,
    store: Box<dyn DraftStore>,
    children: Vec<Option<Region>>,
    debounce: Duration,
    last_change: Option<Instant>,
    dirty: bool,
}

impl std::fmt::Debug for DraftRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DraftRecorder")
            .field("key", &self.key)
            .field("regions", &self.children.len())
            .field("dirty", &self.dirty)
            .finish()
    }
}

impl DraftRecorder {
    pub fn new(key: DraftKey, store: Box<dyn DraftStore>, children: Vec<Option<Region>>) -> Self {
        Self {
            key,
            store,
            children,
            debounce: Duration::ZERO,
            last_change: None,
            dirty: false,
        }
    }

    pub fn with_debounce(mut self, delay: Duration) -> Self {
        self.debounce = delay;
        self
    }

    /// Listen on a bus as its own widget.
    pub fn connect(recorder: &Rc<RefCell<Self>>, bus: &EventBus) -> (WidgetId, SubscriptionId) {
        let owner = bus.register_widget();
        let weak = Rc::downgrade(recorder);
        let id = bus.subscribe(owner, move |event| {
            if let Some(recorder) = weak.upgrade() {
                recorder.borrow_mut().record(event);
            }
        });
        (owner, id)
    }

    pub fn key(&self) -> &DraftKey {
        &self.key
    }

    pub fn children(&self) -> &[Option<Region>] {
        &self.children
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Apply a region event to the mirrored list.
    pub fn record(&mut self, event: &BroadcastEvent) {
        let changed = match event {
            BroadcastEvent::CreateElement { region } => {
                self.children.push(Some(region.clone()));
                true
            }
            BroadcastEvent::UpdateElement { id, polygon } => match self.find_mut(*id) {
                Some(region) => {
                    region.polygon = polygon.clone();
                    true
                }
                None => false,
            },
            BroadcastEvent::DeleteElement { id } => {
                let slot = self
                    .children
                    .iter_mut()
                    .find(|slot| slot.as_ref().is_some_and(|r| r.id == *id));
                match slot {
                    Some(slot) => {
                        *slot = None;
                        true
                    }
                    None => false,
                }
            }
            BroadcastEvent::UpdateProps {
                element, children, ..
            } => {
                // New baseline from the host, nothing to save. A new element
                // starts from its own children, or none, under its own key.
                if let Some(element) = element {
                    if self.dirty {
                        self.save();
                    }
                    self.key.parent = element.id.clone();
                    self.children = children.clone().unwrap_or_default();
                    self.dirty = false;
                    self.last_change = None;
                } else if let Some(children) = children {
                    self.children = children.clone();
                    self.dirty = false;
                    self.last_change = None;
                }
                false
            }
            _ => false,
        };

        if changed {
            self.dirty = true;
            self.last_change = Some(Instant::now());
            log::trace!("Draft {} marked dirty", self.key.storage_key());
            if self.debounce.is_zero() {
                self.save();
            }
        }
    }

    fn find_mut(&mut self, id: RegionId) -> Option<&mut Region> {
        self.children.iter_mut().flatten().find(|r| r.id == id)
    }

    /// Save if the debounce delay passed since the last change.
    pub fn tick(&mut self, now: Instant) {
        let due = self
            .last_change
            .is_some_and(|changed| now.saturating_duration_since(changed) >= self.debounce);
        if self.dirty && due {
            self.save();
        }
    }

    /// Write the draft now. Failures are logged and retried on the next
    /// change or tick.
    pub fn save(&mut self) {
        let draft = Draft::new(self.children.clone());
        match self.store.save(&self.key, &draft) {
            Ok(()) => {
                self.dirty = false;
                self.last_change = None;
            }
            Err(e) => log::warn!("Failed to save draft {}: {}", self.key.storage_key(), e),
        }
    }

    /// Drop the stored draft, once the task is submitted.
    pub fn discard(&mut self) -> Result<(), DraftError> {
        self.dirty = false;
        self.last_change = None;
        self.store.remove(&self.key)
    }

    pub fn load(&self) -> Result<Option<Draft>, DraftError> {
        self.store.load(&self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use callico_geometry::{Image, Polygon};

    fn square(x: f64, size: f64) -> Polygon {
        Polygon::from(vec![
            [x, 0.0],
            [x, size],
            [x + size, size],
            [x + size, 0.0],
            [x, 0.0],
        ])
    }

    fn typed(id: RegionId, polygon: Polygon, kind: &str) -> Region {
        let mut region = Region::new(id, polygon);
        region
            .metadata
            .insert("type".to_string(), serde_json::Value::from(kind));
        region
    }

    fn element() -> Element {
        Element::new("page", Image::new(100, 100, "http://x/img"))
    }

    #[test]
    fn test_memory_store_roundtrip() {
        let key = DraftKey::new("task", "page");
        let mut store = MemoryDraftStore::new();
        assert!(store.load(&key).unwrap().is_none());

        let draft = Draft::new(vec![Some(Region::new(1, square(0.0, 10.0))), None]);
        store.save(&key, &draft).unwrap();
        assert_eq!(store.load(&key).unwrap(), Some(draft));

        store.remove(&key).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_storage_keys_do_not_collide() {
        let pairs = [
            DraftKey::new("a-b", "c"),
            DraftKey::new("a", "b-c"),
            DraftKey::new("a.b", "c"),
            DraftKey::new("a", "b.c"),
            DraftKey::new("task/1", "page"),
            DraftKey::new("task_1", "page"),
            DraftKey::new("task_2f1", "page"),
        ];
        let keys: std::collections::HashSet<String> =
            pairs.iter().map(DraftKey::storage_key).collect();
        assert_eq!(keys.len(), pairs.len());
        assert!(keys.iter().all(|k| !k.contains('/')));

        let mut store = MemoryDraftStore::new();
        store
            .save(&pairs[0], &Draft::new(vec![Some(Region::new(1, square(0.0, 10.0)))]))
            .unwrap();
        store.save(&pairs[1], &Draft::new(Vec::new())).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.load(&pairs[0]).unwrap().unwrap().regions.len(), 1);
    }

    #[test]
    fn test_newer_draft_rejected() {
        let err = Draft::from_json(r#"{"version": 7, "regions": []}"#).unwrap_err();
        assert!(matches!(err, DraftError::VersionTooNew { found: 7, .. }));
    }

    #[test]
    fn test_restore_drops_invalid_regions() {
        let draft = Draft::new(vec![
            Some(typed(1, square(0.0, 10.0), "line")),
            // Too small
            Some(typed(2, square(20.0, 1.0), "line")),
            // Outside the 100x100 image
            Some(typed(3, square(95.0, 10.0), "line")),
            // Unknown type
            Some(typed(4, square(40.0, 10.0), "paragraph")),
            None,
        ]);
        let allowed = vec!["line".to_string()];
        let restored =
            restore_regions(&draft, &element(), Some(allowed.as_slice()), &PolygonRules::default()).unwrap();

        assert_eq!(restored.discarded, 3);
        assert_eq!(restored.children.len(), 5);
        assert_eq!(restored.children[0].as_ref().map(|r| r.id), Some(1));
        assert!(restored.children[1..].iter().all(Option::is_none));
    }

    #[test]
    fn test_restore_without_type_filter() {
        let draft = Draft::new(vec![Some(Region::new(1, square(0.0, 10.0)))]);
        let restored = restore_regions(&draft, &element(), None, &PolygonRules::default()).unwrap();
        assert_eq!(restored.discarded, 0);
    }

    #[test]
    fn test_recorder_mirrors_bus_events() {
        let key = DraftKey::new("task", "page");
        let recorder = Rc::new(RefCell::new(DraftRecorder::new(
            key.clone(),
            Box::new(MemoryDraftStore::new()),
            Vec::new(),
        )));
        let bus = EventBus::new();
        let editor = bus.register_widget();
        DraftRecorder::connect(&recorder, &bus);

        bus.publish(
            editor,
            &BroadcastEvent::CreateElement {
                region: Region::new(1, square(0.0, 10.0)),
            },
        );
        bus.publish(
            editor,
            &BroadcastEvent::UpdateElement {
                id: 1,
                polygon: square(5.0, 10.0),
            },
        );
        bus.publish(
            editor,
            &BroadcastEvent::CreateElement {
                region: Region::new(2, square(30.0, 10.0)),
            },
        );
        bus.publish(editor, &BroadcastEvent::DeleteElement { id: 2 });

        let recorder = recorder.borrow();
        assert!(!recorder.is_dirty());
        let saved = recorder.load().unwrap().unwrap();
        assert_eq!(saved.regions.len(), 2);
        assert_eq!(saved.regions[0].as_ref().unwrap().polygon, square(5.0, 10.0));
        assert!(saved.regions[1].is_none());
    }

    #[test]
    fn test_recorder_follows_element_change() {
        let mut recorder = DraftRecorder::new(
            DraftKey::new("task", "page"),
            Box::new(MemoryDraftStore::new()),
            vec![Some(Region::new(1, square(0.0, 10.0)))],
        );
        recorder.record(&BroadcastEvent::UpdateProps {
            element: Some(Element::new("next", Image::new(50, 50, "http://x/next"))),
            children: None,
            mode: None,
        });
        assert!(recorder.children().is_empty());
        assert_eq!(recorder.key(), &DraftKey::new("task", "next"));
        assert!(!recorder.is_dirty());

        recorder.record(&BroadcastEvent::UpdateProps {
            element: None,
            children: Some(vec![None]),
            mode: None,
        });
        assert_eq!(recorder.children().len(), 1);
    }

    #[test]
    fn test_debounced_recorder_waits_for_tick() {
        let mut recorder = DraftRecorder::new(
            DraftKey::new("task", "page"),
            Box::new(MemoryDraftStore::new()),
            Vec::new(),
        )
        .with_debounce(Duration::from_secs(5));

        recorder.record(&BroadcastEvent::CreateElement {
            region: Region::new(1, square(0.0, 10.0)),
        });
        assert!(recorder.is_dirty());
        recorder.tick(Instant::now());
        assert!(recorder.is_dirty());

        recorder.tick(Instant::now() + Duration::from_secs(6));
        assert!(!recorder.is_dirty());
        assert!(recorder.load().unwrap().is_some());
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn test_file_store_roundtrip() {
        let dir = std::env::temp_dir().join(format!("callico-drafts-{}", std::process::id()));
        let mut store = FileDraftStore::new(&dir);
        let key = DraftKey::new("task/1", "page");
        assert!(store.load(&key).unwrap().is_none());

        let draft = Draft::new(vec![Some(Region::new(1, square(0.0, 10.0)))]);
        store.save(&key, &draft).unwrap();
        assert_eq!(store.load(&key).unwrap(), Some(draft));

        store.remove(&key).unwrap();
        assert!(store.load(&key).unwrap().is_none());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
