//! Pointer, wheel and keyboard handling.

use callico_geometry::Point;

use super::ImageAnnotator;
use crate::broadcast::BroadcastEvent;
use crate::constants::{CLICK_DISTANCE, MIN_CLOSING_VERTICES};
use crate::gesture::{
    Gesture, Mode, Tool, move_vertex, rectangle_points, translate_within, vertex_at,
};
use crate::input::{InputEvent, Key, MouseButton, PointerEvent};
use crate::model::EditedElement;
use crate::view::{TransitionTicket, ZoomDirection};

impl ImageAnnotator {
    /// Feed one input event.
    ///
    /// Returns the ticket of a transition the host must complete after its
    /// delay.
    pub fn handle_input(&mut self, event: InputEvent) -> Option<TransitionTicket> {
        match event {
            InputEvent::PointerDown(pointer) => {
                self.pointer_down(pointer);
                None
            }
            InputEvent::PointerMove(pointer) => {
                self.pointer_move(pointer);
                None
            }
            InputEvent::PointerUp(pointer) => self.pointer_up(pointer),
            InputEvent::Wheel { position, delta } => self.wheel(position, delta),
            InputEvent::DoubleClick { .. } => {
                self.double_click();
                None
            }
            InputEvent::KeyPressed { key, .. } => {
                self.key_pressed(key);
                None
            }
        }
    }

    /// Vertex hit radius in image pixels.
    fn handle_radius(&self) -> f64 {
        self.config.handle_hit_radius / self.view.scale()
    }

    fn clamp(&self, point: Point) -> Point {
        self.element_box.clamp(point)
    }

    fn set_edited_points(&mut self, points: Vec<Point>) {
        if let Some(edited) = self.model.edited_mut() {
            *edited.points_mut() = points;
        }
    }

    // ------------------------------------------------------------------
    // Press
    // ------------------------------------------------------------------

    fn pointer_down(&mut self, event: PointerEvent) {
        if event.button != Some(MouseButton::Left) || !event.is_primary_only() {
            log::debug!(
                "Ignoring press of {:?} with buttons {:#x}",
                event.button,
                event.buttons
            );
            return;
        }

        // A release we never saw
        if self.gesture.holds_pointer() {
            log::debug!("Dropping stale {} gesture", self.gesture.name());
            self.abort();
        }
        self.pressed = true;
        self.cancelled = false;

        if event.modifiers.shift || self.mode != Mode::Create {
            self.start_pan(event.position);
            return;
        }

        let position = self.view.to_image_space(event.position);
        match self.tool {
            Tool::Rectangle => {
                let anchor = self.clamp(position);
                self.model.start_drawing(rectangle_points(anchor, anchor));
                self.gesture = Gesture::DrawingRectangle { anchor };
            }
            // Vertices are placed on release
            Tool::Polygon => {}
            Tool::Edit => self.start_drag(position, event.position),
        }
    }

    fn start_pan(&mut self, screen: Point) {
        self.gesture = Gesture::Panning {
            origin: screen,
            last: screen,
            moved: false,
        };
    }

    /// Grab a vertex or the body of a region, or pan on empty space.
    fn start_drag(&mut self, position: Point, screen: Point) {
        let radius = self.handle_radius();

        if let Some(EditedElement::Committed { id, points, .. }) = self.model.edited() {
            if let Some(index) = vertex_at(points, position, radius) {
                log::debug!("Dragging vertex {} of region {}", index, id);
                self.gesture = Gesture::DraggingVertex {
                    index,
                    start: position,
                    vertex: points[index],
                };
                return;
            }
        }

        let Some(id) = self.model.store().hit_test(position) else {
            self.model.clear_edit();
            self.start_pan(screen);
            return;
        };
        if let Err(e) = self.model.start_edit(id) {
            log::warn!("Cannot edit: {}", e);
            return;
        }
        if let Some(edited) = self.model.edited() {
            log::debug!("Dragging region {}", id);
            self.gesture = Gesture::DraggingPolygon {
                start: position,
                base: edited.points().to_vec(),
            };
        }
    }

    // ------------------------------------------------------------------
    // Move
    // ------------------------------------------------------------------

    fn pointer_move(&mut self, event: PointerEvent) {
        if self.gesture.holds_pointer() && !event.is_primary_only() {
            log::trace!("Ignoring move without primary button during {}", self.gesture.name());
            return;
        }

        let position = self.view.to_image_space(event.position);
        self.gesture = match std::mem::take(&mut self.gesture) {
            Gesture::Idle => {
                self.update_hover(position);
                Gesture::Idle
            }
            Gesture::Panning {
                origin,
                last,
                moved,
            } => {
                self.view
                    .pan(event.position.x - last.x, event.position.y - last.y);
                Gesture::Panning {
                    origin,
                    last: event.position,
                    moved: moved || event.position.distance_to(&origin) > CLICK_DISTANCE,
                }
            }
            Gesture::DrawingRectangle { anchor } => {
                let corner = self.clamp(position);
                self.set_edited_points(rectangle_points(anchor, corner));
                Gesture::DrawingRectangle { anchor }
            }
            Gesture::DrawingPolygon => {
                let point = self.clamp(position);
                if let Some(last) = self
                    .model
                    .edited_mut()
                    .and_then(|edited| edited.points_mut().last_mut())
                {
                    *last = point;
                }
                Gesture::DrawingPolygon
            }
            Gesture::DraggingVertex {
                index,
                start,
                vertex,
            } => {
                let to = self.clamp(vertex.offset(position.x - start.x, position.y - start.y));
                if let Some(edited) = self.model.edited_mut() {
                    move_vertex(edited.points_mut(), index, to);
                }
                Gesture::DraggingVertex {
                    index,
                    start,
                    vertex,
                }
            }
            Gesture::DraggingPolygon { start, base } => {
                let (dx, dy) = (position.x - start.x, position.y - start.y);
                match translate_within(&base, dx, dy, &self.element_box) {
                    Some(moved) => self.set_edited_points(moved),
                    None => log::trace!("Translation would leave the element"),
                }
                Gesture::DraggingPolygon { start, base }
            }
        };
    }

    fn update_hover(&mut self, position: Point) {
        let hit = self.model.store().hit_test(position);
        if self.model.selection_mut().set_hovered(hit) {
            self.publish(BroadcastEvent::UpdateHighlightedElements {
                ids: hit.into_iter().collect(),
                hover: true,
            });
        }
    }

    // ------------------------------------------------------------------
    // Release
    // ------------------------------------------------------------------

    fn pointer_up(&mut self, event: PointerEvent) -> Option<TransitionTicket> {
        if event.button != Some(MouseButton::Left) {
            log::debug!("Ignoring release of {:?}", event.button);
            return None;
        }
        let was_pressed = std::mem::take(&mut self.pressed);
        if std::mem::take(&mut self.cancelled) {
            log::debug!("Swallowing release after abort");
            return None;
        }

        let position = self.view.to_image_space(event.position);
        match std::mem::take(&mut self.gesture) {
            Gesture::Panning { moved, .. } => {
                let ticket = self.view.end_pan();
                if !moved {
                    self.click(position);
                }
                if self.drawing_polygon() {
                    self.gesture = Gesture::DrawingPolygon;
                }
                ticket
            }
            Gesture::DrawingRectangle { anchor } => {
                let corner = self.clamp(position);
                self.set_edited_points(rectangle_points(anchor, corner));
                self.commit_drawing();
                None
            }
            Gesture::DraggingVertex { .. } | Gesture::DraggingPolygon { .. } => {
                self.commit_edit();
                None
            }
            gesture @ (Gesture::Idle | Gesture::DrawingPolygon) => {
                self.gesture = gesture;
                if was_pressed && self.mode == Mode::Create && self.tool == Tool::Polygon {
                    self.place_vertex(position);
                }
                None
            }
        }
    }

    fn drawing_polygon(&self) -> bool {
        self.mode == Mode::Create
            && self.tool == Tool::Polygon
            && self.model.edited().is_some_and(EditedElement::is_uncommitted)
    }

    /// Toggle the selection of the clicked region in select mode.
    fn click(&mut self, position: Point) {
        if self.mode != Mode::Select {
            return;
        }
        let Some(id) = self.model.store().hit_test(position) else {
            return;
        };
        if self.model.unselect(id) {
            self.publish(BroadcastEvent::UnselectElement { id, force: false });
        } else if self.model.select(id).is_ok() {
            self.publish(BroadcastEvent::SelectElement { id, force: false });
        }
    }

    /// Fix the floating polygon vertex, or close the polygon on its first
    /// vertex.
    fn place_vertex(&mut self, position: Point) {
        let point = self.clamp(position);
        let radius = self.handle_radius();

        let Some(edited) = self
            .model
            .edited_mut()
            .filter(|edited| edited.is_uncommitted())
        else {
            self.model.start_drawing(vec![point, point]);
            self.gesture = Gesture::DrawingPolygon;
            return;
        };

        let points = edited.points_mut();
        let Some(&first) = points.first() else {
            return;
        };
        // The last point is the floating one
        let closes =
            points.len() > MIN_CLOSING_VERTICES && first.distance_to(&point) <= radius;
        if let Some(last) = points.last_mut() {
            *last = if closes { first } else { point };
        }
        if closes {
            self.commit_drawing();
        } else {
            points.push(point);
            self.gesture = Gesture::DrawingPolygon;
        }
    }

    fn double_click(&mut self) {
        if self.gesture != Gesture::DrawingPolygon {
            return;
        }
        if let Some(edited) = self.model.edited_mut() {
            let points = edited.points_mut();
            if let Some(&first) = points.first() {
                if let Some(last) = points.last_mut() {
                    *last = first;
                }
            }
        }
        self.commit_drawing();
    }

    // ------------------------------------------------------------------
    // Wheel and keys
    // ------------------------------------------------------------------

    fn wheel(&mut self, position: Point, delta: f64) -> Option<TransitionTicket> {
        if delta == 0.0 || !delta.is_finite() {
            return None;
        }
        let direction = if delta < 0.0 {
            ZoomDirection::In
        } else {
            ZoomDirection::Out
        };
        self.view.zoom(Some(position), direction)
    }

    fn key_pressed(&mut self, key: Key) {
        match key {
            Key::Escape => {
                if self.gesture.is_idle() {
                    self.model.clear_edit();
                } else {
                    self.abort();
                }
            }
            Key::Delete | Key::Backspace => {
                if self.mode != Mode::Create || !self.gesture.is_idle() {
                    return;
                }
                if let Some(id) = self.model.edited_id() {
                    if let Err(e) = self.delete_region(id) {
                        log::warn!("Cannot delete: {}", e);
                    }
                }
            }
            _ => {}
        }
    }
}
