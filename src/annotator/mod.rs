//! The image annotator component.
//!
//! Ties the view transform, the gesture state machine and the region model
//! together for one displayed element, and talks to sibling widgets through
//! the page's [`EventBus`].

mod pointer;

use std::cell::RefCell;
use std::rc::Rc;

use callico_geometry::{
    BoundingBox, BoxBounds, Element, GeometryError, Polygon, PolygonRules, bounding_box,
    check_polygon_with, polygons_equal,
};
use web_time::Instant;

use crate::broadcast::{BroadcastEvent, EventBus, SubscriptionId, WidgetId};
use crate::config::EditorConfig;
use crate::error::AnnotatorError;
use crate::gesture::{Gesture, Mode, Tool};
use crate::model::{EditedElement, Metadata, Region, RegionId, RegionModel, RegionStore, Selection};
use crate::probe::{ImageProbe, Liveness, Notice, NoticeBoard};
use crate::view::{TransitionTicket, ViewTransform, ZoomDirection};

/// Interactive editor for the regions of one element.
#[derive(Debug)]
pub struct ImageAnnotator {
    widget_id: WidgetId,
    bus: Rc<EventBus>,
    subscription: Option<SubscriptionId>,

    config: EditorConfig,
    rules: PolygonRules,

    element: Element,
    /// Image-bounded box of the element, drawing never leaves it
    element_box: BoundingBox,

    mode: Mode,
    tool: Tool,
    /// Attributes given to every region created from now on
    creation_metadata: Metadata,

    model: RegionModel,
    view: ViewTransform,
    gesture: Gesture,

    /// Primary button went down inside the component and is not yet released
    pressed: bool,
    /// Swallow the next pointer up after an abort
    cancelled: bool,

    notices: NoticeBoard,
    liveness: Liveness,
}

impl ImageAnnotator {
    /// Create an annotator for an element and its existing regions.
    ///
    /// Fails when the element has no usable image.
    pub fn new(
        element: Element,
        children: Vec<Option<Region>>,
        config: EditorConfig,
        bus: Rc<EventBus>,
    ) -> Result<Self, AnnotatorError> {
        let element_box = bounding_box(&element, BoxBounds::ImageBounded)?;
        let view = ViewTransform::new(element_box, config.view_settings());
        let rules = config.polygon_rules();
        let widget_id = bus.register_widget();
        log::info!(
            "Annotator {} opened element {} with {} region(s)",
            widget_id,
            element.id,
            children.iter().flatten().count()
        );

        Ok(Self {
            widget_id,
            bus,
            subscription: None,
            rules,
            config,
            element,
            element_box,
            mode: Mode::default(),
            tool: Tool::default(),
            creation_metadata: Metadata::new(),
            model: RegionModel::new(children, rules),
            view,
            gesture: Gesture::Idle,
            pressed: false,
            cancelled: false,
            notices: NoticeBoard::default(),
            liveness: Liveness::new(),
        })
    }

    /// Subscribe a shared annotator to its bus.
    ///
    /// Events arriving while the annotator is already borrowed, such as an
    /// echo from a sibling during one of its own publishes, are dropped.
    pub fn connect(annotator: &Rc<RefCell<Self>>) -> SubscriptionId {
        let (bus, owner) = {
            let this = annotator.borrow();
            (Rc::clone(&this.bus), this.widget_id)
        };
        let weak = Rc::downgrade(annotator);
        let id = bus.subscribe(owner, move |event| {
            let Some(annotator) = weak.upgrade() else {
                return;
            };
            match annotator.try_borrow_mut() {
                Ok(mut this) => this.handle_broadcast(event),
                Err(_) => log::warn!("Annotator {} busy, dropping {}", owner, event.name()),
            }
        });
        annotator.borrow_mut().subscription = Some(id);
        id
    }

    /// Tear down: pending probes become stale and the bus forgets us.
    pub fn unmount(&mut self) {
        self.abort();
        self.liveness.revoke();
        if let Some(id) = self.subscription.take() {
            self.bus.unsubscribe(id);
        }
        log::info!("Annotator {} unmounted", self.widget_id);
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn widget_id(&self) -> WidgetId {
        self.widget_id
    }

    pub fn element(&self) -> &Element {
        &self.element
    }

    pub fn element_box(&self) -> BoundingBox {
        self.element_box
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn regions(&self) -> &RegionStore {
        self.model.store()
    }

    pub fn selection(&self) -> &Selection {
        self.model.selection()
    }

    pub fn edited(&self) -> Option<&EditedElement> {
        self.model.edited()
    }

    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    pub fn view(&self) -> &ViewTransform {
        &self.view
    }

    /// Whether a zoom transition is in flight.
    pub fn is_zooming(&self) -> bool {
        !self.view.zoom_state().applied
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.borrow().clone()
    }

    pub fn dismiss_notice(&mut self, index: usize) -> Option<Notice> {
        let mut notices = self.notices.borrow_mut();
        (index < notices.len()).then(|| notices.remove(index))
    }

    // ------------------------------------------------------------------
    // Settings
    // ------------------------------------------------------------------

    pub fn set_mode(&mut self, mode: Mode) {
        if mode == self.mode {
            return;
        }
        self.abort();
        self.model.clear_edit();
        log::debug!("Mode {:?} -> {:?}", self.mode, mode);
        self.mode = mode;
    }

    pub fn set_tool(&mut self, tool: Tool) {
        if tool == self.tool {
            return;
        }
        self.abort();
        if tool != Tool::Edit {
            self.model.clear_edit();
        }
        log::debug!("Tool set to {}", tool.name());
        self.tool = tool;
    }

    pub fn set_creation_metadata(&mut self, metadata: Metadata) {
        self.creation_metadata = metadata;
    }

    pub fn set_viewport(&mut self, width: f64, height: f64) {
        self.view.set_viewport(width, height);
    }

    /// Show another element, discarding gestures, view state and notices.
    pub fn set_element(
        &mut self,
        element: Element,
        children: Vec<Option<Region>>,
    ) -> Result<(), AnnotatorError> {
        let element_box = bounding_box(&element, BoxBounds::ImageBounded)?;
        self.abort();
        self.liveness.revoke();
        self.liveness = Liveness::new();
        self.notices.borrow_mut().clear();
        self.view.reset(element_box);
        self.model.replace_children(children);
        log::info!("Annotator {} switched to element {}", self.widget_id, element.id);
        self.element = element;
        self.element_box = element_box;
        Ok(())
    }

    /// Replace the regions of the current element.
    pub fn replace_children(&mut self, children: Vec<Option<Region>>) {
        self.abort();
        self.model.replace_children(children);
    }

    // ------------------------------------------------------------------
    // View
    // ------------------------------------------------------------------

    pub fn zoom_in(&mut self) -> Option<TransitionTicket> {
        self.view.zoom(None, ZoomDirection::In)
    }

    pub fn zoom_out(&mut self) -> Option<TransitionTicket> {
        self.view.zoom(None, ZoomDirection::Out)
    }

    pub fn rotate(&mut self, clockwise: bool) -> i32 {
        self.view.rotate(clockwise)
    }

    pub fn complete_transition(&mut self, ticket: TransitionTicket) -> Option<TransitionTicket> {
        self.view.complete_transition(ticket)
    }

    pub fn tick(&mut self, now: Instant) -> Option<TransitionTicket> {
        self.view.tick(now)
    }

    // ------------------------------------------------------------------
    // Regions
    // ------------------------------------------------------------------

    /// Make a region the edited one.
    pub fn edit_region(&mut self, id: RegionId) -> Result<(), AnnotatorError> {
        if self.model.edited_id() != Some(id) {
            self.abort();
        }
        self.model.start_edit(id)
    }

    /// Delete a region and tell the siblings.
    pub fn delete_region(&mut self, id: RegionId) -> Result<Region, AnnotatorError> {
        if self.model.edited_id() == Some(id) {
            self.abort();
        }
        let region = self.model.delete(id)?;
        log::info!("Deleted region {}", id);
        self.publish(BroadcastEvent::DeleteElement { id });
        Ok(region)
    }

    /// Start loading the element image to compare its size.
    pub fn probe_image(&self) -> Result<ImageProbe, GeometryError> {
        let image = self.element.valid_image()?;
        Ok(ImageProbe::new(
            image.url.clone(),
            (image.width, image.height),
            self.config.image_size_tolerance,
            self.liveness.clone(),
            &self.notices,
        ))
    }

    fn publish(&self, event: BroadcastEvent) {
        self.bus.publish(self.widget_id, &event);
    }

    // ------------------------------------------------------------------
    // Commits
    // ------------------------------------------------------------------

    /// Store the drawn shape if it validates, otherwise drop it.
    fn commit_drawing(&mut self) {
        self.gesture = Gesture::Idle;
        let Some(points) = self.model.take_drawing() else {
            return;
        };
        let polygon = match check_polygon_with(&points, &self.rules) {
            Ok(polygon) => polygon,
            Err(e) => {
                log::debug!("Discarding drawn polygon: {}", e);
                return;
            }
        };
        match self.model.create(polygon, self.creation_metadata.clone()) {
            Ok(region) => {
                log::info!("Created region {} ({} points)", region.id, region.polygon.len());
                self.publish(BroadcastEvent::CreateElement { region });
            }
            Err(e) => log::warn!("Discarding drawn polygon: {}", e),
        }
    }

    /// Store the edited copy if it validates and changed, otherwise revert.
    fn commit_edit(&mut self) {
        self.gesture = Gesture::Idle;
        let Some(EditedElement::Committed {
            id,
            points,
            original,
        }) = self.model.edited().cloned()
        else {
            return;
        };

        let polygon = match check_polygon_with(&points, &self.rules) {
            Ok(polygon) => polygon,
            Err(e) => {
                log::debug!("Reverting invalid edit of region {}: {}", id, e);
                self.revert_edit();
                return;
            }
        };

        if polygons_equal(polygon.points(), original.points(), &self.rules) {
            log::trace!("Region {} unchanged", id);
            self.revert_edit();
            return;
        }

        match self.model.update_geometry(id, polygon.clone()) {
            Ok(_) => {
                log::info!("Updated region {}", id);
                self.publish(BroadcastEvent::UpdateElement { id, polygon });
            }
            Err(e) => log::warn!("Could not store edit: {}", e),
        }
    }

    fn revert_edit(&mut self) {
        if let Some(edited) = self.model.edited_mut() {
            edited.revert();
        }
    }

    /// Cancel the running gesture.
    ///
    /// Drawings are discarded, drags reverted and pans dropped. A pointer
    /// release still pending is swallowed.
    pub fn abort(&mut self) {
        let gesture = std::mem::take(&mut self.gesture);
        match gesture {
            Gesture::Idle => {}
            Gesture::Panning { .. } => {
                self.view.cancel_pan();
                // A polygon being drawn survives the pan but not the abort
                self.model.take_drawing();
            }
            Gesture::DrawingRectangle { .. } | Gesture::DrawingPolygon => {
                self.model.take_drawing();
            }
            Gesture::DraggingVertex { .. } | Gesture::DraggingPolygon { .. } => self.revert_edit(),
        }
        if self.pressed {
            self.cancelled = true;
        }
        if !gesture.is_idle() {
            log::debug!("Aborted {}", gesture.name());
        }
    }

    // ------------------------------------------------------------------
    // Incoming broadcasts
    // ------------------------------------------------------------------

    fn accepts_selection(&self, force: bool) -> bool {
        force || self.mode == Mode::Select
    }

    /// Apply an event published by a sibling widget.
    pub fn handle_broadcast(&mut self, event: &BroadcastEvent) {
        log::trace!("Annotator {} received {}", self.widget_id, event.name());
        match event {
            BroadcastEvent::SelectElement { id, force } => {
                if self.accepts_selection(*force) {
                    if let Err(e) = self.model.select(*id) {
                        log::warn!("Cannot select: {}", e);
                    }
                }
            }
            BroadcastEvent::UnselectElement { id, force } => {
                if self.accepts_selection(*force) {
                    self.model.unselect(*id);
                }
            }
            BroadcastEvent::UpdateSelectedElements { ids, force } => {
                if self.accepts_selection(*force) {
                    self.model.set_selected(ids);
                }
            }
            BroadcastEvent::CarouselSelectElement { id } => self.model.set_selected(&[*id]),
            BroadcastEvent::UpdateHighlightedElements { ids, hover } => {
                let selection = self.model.selection_mut();
                if *hover {
                    selection.set_hovered(ids.first().copied());
                } else {
                    selection.set_highlighted(ids.iter().copied());
                }
            }
            BroadcastEvent::CreateElement { region } => {
                if let Err(e) = self.model.insert(region.clone()) {
                    log::warn!("Ignoring created region: {}", e);
                }
            }
            BroadcastEvent::UpdateElement { id, polygon } => self.apply_update(*id, polygon),
            BroadcastEvent::DeleteElement { id } => {
                if self.model.edited_id() == Some(*id) {
                    self.abort();
                }
                if let Err(e) = self.model.delete(*id) {
                    log::debug!("Ignoring deletion: {}", e);
                }
            }
            BroadcastEvent::UpdateProps {
                element,
                children,
                mode,
            } => {
                if let Some(element) = element {
                    let children = children.clone().unwrap_or_default();
                    if let Err(e) = self.set_element(element.clone(), children) {
                        log::warn!("Cannot show element {}: {}", element.id, e);
                    }
                } else if let Some(children) = children {
                    self.replace_children(children.clone());
                }
                if let Some(mode) = mode {
                    self.set_mode(*mode);
                }
            }
        }
    }

    fn apply_update(&mut self, id: RegionId, polygon: &Polygon) {
        if self.model.edited_id() == Some(id) && !self.gesture.is_idle() {
            self.abort();
        }
        if let Err(e) = self.model.update_geometry(id, polygon.clone()) {
            log::warn!("Ignoring update: {}", e);
        }
    }
}
