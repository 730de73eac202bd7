//! Coordinate and view transform.
//!
//! Maps screen coordinates into image space and holds the presentation
//! state: the committed view box, the zoom and position descriptors, and a
//! rotation restricted to quarter turns.
//!
//! Panning is two-phase. Pointer moves only accumulate a
//! [`PendingTranslation`] that the host renders as a cheap visual
//! translate; the view box itself is recomputed once, when the gesture
//! ends. Zoom and recenter are animated: the target box is committed when
//! the transition completes, and a transition superseded by a newer one
//! becomes stale and does nothing.

use std::time::Duration;

use callico_geometry::{Affine, BoundingBox, Point};
use web_time::Instant;

/// The visible window into image space.
pub type ViewBox = BoundingBox;

/// Zoom step direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomDirection {
    In,
    Out,
}

/// Zoom descriptor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomState {
    /// Image-space focus of the last zoom, `None` for the viewport center
    pub focus: Option<Point>,
    /// Index into the zoom factor table
    pub factor: usize,
    /// False while the zoom transition is in flight
    pub applied: bool,
    generation: u64,
}

/// Visual-only translation accumulated during a pan, in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PendingTranslation {
    pub x: f64,
    pub y: f64,
}

impl PendingTranslation {
    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

/// Position descriptor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionState {
    pub translation: PendingTranslation,
    /// False while a recenter transition is in flight
    pub applied: bool,
    /// Out-of-bounds panning must be corrected when the gesture ends
    pub recenter: bool,
    generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransitionKind {
    Zoom,
    Recenter,
}

/// Handle on a scheduled transition.
///
/// The host fires [`ViewTransform::complete_transition`] with it once
/// `delay` has elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionTicket {
    pub generation: u64,
    pub delay: Duration,
}

#[derive(Debug, Clone, Copy)]
struct Transition {
    ticket: TransitionTicket,
    kind: TransitionKind,
    target: ViewBox,
    deadline: Instant,
}

/// View transform settings taken from the editor configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewSettings {
    /// Zoom percentages, ascending, first entry shows the whole element
    pub zoom_factors: Vec<u32>,
    /// Allowed drift outside the viewport, in percent of the longest side
    pub navigation_margin_percent: f64,
    pub transition_duration: Duration,
}

/// Screen/image mapping and animated view state for one element.
#[derive(Debug, Clone)]
pub struct ViewTransform {
    settings: ViewSettings,
    /// Element box shown at the first zoom factor
    bounds: BoundingBox,
    viewport: (f64, f64),
    view_box: ViewBox,
    zoom: ZoomState,
    position: PositionState,
    rotation: i32,
    transition: Option<Transition>,
    next_generation: u64,
}

impl ViewTransform {
    /// Create a view showing the whole of `bounds`.
    pub fn new(bounds: BoundingBox, settings: ViewSettings) -> Self {
        Self {
            settings,
            bounds,
            viewport: (bounds.width, bounds.height),
            view_box: bounds,
            zoom: ZoomState {
                focus: None,
                factor: 0,
                applied: true,
                generation: 0,
            },
            position: PositionState {
                translation: PendingTranslation::default(),
                applied: true,
                recenter: false,
                generation: 0,
            },
            rotation: 0,
            transition: None,
            next_generation: 1,
        }
    }

    /// Show a new element box, dropping zoom, pan and pending transitions.
    ///
    /// Rotation and viewport survive.
    pub fn reset(&mut self, bounds: BoundingBox) {
        self.bounds = bounds;
        self.view_box = bounds;
        self.zoom = ZoomState {
            focus: None,
            factor: 0,
            applied: true,
            generation: self.bump(),
        };
        self.position = PositionState {
            translation: PendingTranslation::default(),
            applied: true,
            recenter: false,
            generation: self.bump(),
        };
        self.transition = None;
        log::debug!("View reset to {:?}", bounds);
    }

    fn bump(&mut self) -> u64 {
        let generation = self.next_generation;
        self.next_generation += 1;
        generation
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn view_box(&self) -> ViewBox {
        self.view_box
    }

    /// Where the view box is heading, the committed box when settled.
    pub fn target_view_box(&self) -> ViewBox {
        self.transition.map_or(self.view_box, |t| t.target)
    }

    pub fn bounds(&self) -> BoundingBox {
        self.bounds
    }

    pub fn zoom_state(&self) -> ZoomState {
        self.zoom
    }

    pub fn position(&self) -> PositionState {
        self.position
    }

    pub fn translation(&self) -> PendingTranslation {
        self.position.translation
    }

    pub fn rotation(&self) -> i32 {
        self.rotation
    }

    /// Current zoom percentage.
    pub fn zoom_percent(&self) -> u32 {
        self.settings
            .zoom_factors
            .get(self.zoom.factor)
            .copied()
            .unwrap_or(100)
    }

    /// Whether no transition is in flight.
    pub fn is_settled(&self) -> bool {
        self.transition.is_none()
    }

    pub fn set_viewport(&mut self, width: f64, height: f64) {
        self.viewport = (width, height);
    }

    // ------------------------------------------------------------------
    // Mapping
    // ------------------------------------------------------------------

    /// Screen pixels per image pixel.
    pub fn scale(&self) -> f64 {
        let (rw, rh) = self.view_box.rotated_size(self.rotation);
        let (vw, vh) = self.viewport;
        if vw <= 0.0 || vh <= 0.0 || rw <= 0.0 || rh <= 0.0 {
            return 1.0;
        }
        (vw / rw).min(vh / rh)
    }

    /// Image to screen matrix: scale, rotation, then translation.
    pub fn image_to_screen(&self) -> Affine {
        let center = self.view_box.center();
        let t = self.position.translation;
        Affine::translate(-center.x, -center.y)
            .then(&Affine::scale(self.scale()))
            .then(&Affine::rotate(self.rotation as f64))
            .then(&Affine::translate(
                self.viewport.0 / 2.0 + t.x,
                self.viewport.1 / 2.0 + t.y,
            ))
    }

    /// Map a screen point into image space.
    pub fn to_image_space(&self, screen: Point) -> Point {
        match self.image_to_screen().invert() {
            Some(inverse) => inverse.apply(screen),
            None => screen,
        }
    }

    pub fn to_screen_space(&self, image: Point) -> Point {
        self.image_to_screen().apply(image)
    }

    // ------------------------------------------------------------------
    // Zoom
    // ------------------------------------------------------------------

    /// Move one step along the zoom table around a screen focus point.
    ///
    /// The focus keeps its relative position inside the view box. Returns
    /// `None` when the table bound is already reached.
    pub fn zoom(&mut self, focus: Option<Point>, direction: ZoomDirection) -> Option<TransitionTicket> {
        let last = self.settings.zoom_factors.len().saturating_sub(1);
        let factor = match direction {
            ZoomDirection::In => (self.zoom.factor + 1).min(last),
            ZoomDirection::Out => self.zoom.factor.saturating_sub(1),
        };
        if factor == self.zoom.factor {
            log::debug!("Zoom already at table bound ({}%)", self.zoom_percent());
            return None;
        }

        // Restart from where a running transition was heading
        let current = self.target_view_box();
        let percent = self.settings.zoom_factors[factor] as f64;
        let width = self.bounds.width * 100.0 / percent;
        let height = self.bounds.height * 100.0 / percent;

        let focus_image = focus.map(|screen| self.to_image_space(screen));
        let anchor = focus_image.unwrap_or_else(|| current.center());
        let rel_x = if current.width > 0.0 {
            (anchor.x - current.x) / current.width
        } else {
            0.5
        };
        let rel_y = if current.height > 0.0 {
            (anchor.y - current.y) / current.height
        } else {
            0.5
        };
        let target = ViewBox::new(
            anchor.x - rel_x * width,
            anchor.y - rel_y * height,
            width,
            height,
        );

        let ticket = self.schedule(TransitionKind::Zoom, target);
        self.zoom = ZoomState {
            focus: focus_image,
            factor,
            applied: false,
            generation: ticket.generation,
        };
        log::debug!("Zoom to {}% around {:?}", self.zoom_percent(), anchor);
        Some(ticket)
    }

    fn schedule(&mut self, kind: TransitionKind, target: ViewBox) -> TransitionTicket {
        // The replaced transition will never complete, so its flags settle
        // here. Its target is where the new one starts from.
        match self.transition.map(|t| t.kind) {
            Some(TransitionKind::Recenter) if kind != TransitionKind::Recenter => {
                self.position.applied = true;
            }
            Some(TransitionKind::Zoom) if kind != TransitionKind::Zoom => {
                self.zoom.applied = true;
            }
            _ => {}
        }
        let ticket = TransitionTicket {
            generation: self.bump(),
            delay: self.settings.transition_duration,
        };
        self.transition = Some(Transition {
            ticket,
            kind,
            target,
            deadline: Instant::now() + ticket.delay,
        });
        ticket
    }

    /// Commit a transition once its delay has elapsed.
    ///
    /// Stale tickets are ignored. Completing a zoom may schedule a
    /// recenter, whose ticket is returned.
    pub fn complete_transition(&mut self, ticket: TransitionTicket) -> Option<TransitionTicket> {
        let transition = match self.transition {
            Some(t) if t.ticket == ticket => t,
            _ => {
                log::debug!("Ignoring stale transition {}", ticket.generation);
                return None;
            }
        };

        self.transition = None;
        self.view_box = transition.target;
        match transition.kind {
            TransitionKind::Zoom => {
                self.zoom.applied = true;
                self.recenter_after_gesture()
            }
            TransitionKind::Recenter => {
                self.position.applied = true;
                self.position.recenter = false;
                None
            }
        }
    }

    /// Complete the pending transition if its deadline has passed.
    pub fn tick(&mut self, now: Instant) -> Option<TransitionTicket> {
        let transition = self.transition?;
        if now < transition.deadline {
            return None;
        }
        self.complete_transition(transition.ticket)
    }

    /// Commit pending transitions immediately, following any recenter.
    pub fn settle(&mut self) {
        while let Some(transition) = self.transition {
            self.complete_transition(transition.ticket);
        }
    }

    // ------------------------------------------------------------------
    // Pan and recenter
    // ------------------------------------------------------------------

    /// Accumulate a screen-space pan delta without touching the view box.
    pub fn pan(&mut self, dx: f64, dy: f64) -> PendingTranslation {
        let t = &mut self.position.translation;
        t.x += dx;
        t.y += dy;
        self.position.recenter = true;
        log::trace!("Pan translation ({:.1}, {:.1})", t.x, t.y);
        *t
    }

    /// Fold the pending translation into the view box and recenter.
    pub fn end_pan(&mut self) -> Option<TransitionTicket> {
        let t = self.position.translation;
        if !t.is_zero() {
            let scale = self.scale();
            let (dx, dy) = Affine::rotate(-(self.rotation as f64)).apply_vector(t.x, t.y);
            let (dx, dy) = (dx / scale, dy / scale);
            self.view_box.x -= dx;
            self.view_box.y -= dy;
            if let Some(transition) = &mut self.transition {
                transition.target.x -= dx;
                transition.target.y -= dy;
            }
            self.position.translation = PendingTranslation::default();
            log::debug!("Pan folded into view box {:?}", self.view_box);
        }

        if self.position.recenter && self.transition.is_none() {
            return self.recenter_after_gesture();
        }
        None
    }

    /// Recenter, clearing the request when nothing needs to move and no
    /// pan is still running.
    fn recenter_after_gesture(&mut self) -> Option<TransitionTicket> {
        let ticket = self.recenter();
        if ticket.is_none() && self.position.translation.is_zero() {
            self.position.recenter = false;
        }
        ticket
    }

    /// Drop the pending translation without moving the view box.
    pub fn cancel_pan(&mut self) {
        self.position.translation = PendingTranslation::default();
        self.position.recenter = false;
    }

    /// Bring the view box back when the element drifted too far out.
    ///
    /// The view box may extend past the element by at most the navigation
    /// margin, a percentage of the element's longest rotated side.
    pub fn recenter(&mut self) -> Option<TransitionTicket> {
        let current = self.target_view_box();
        let (rw, rh) = self.bounds.rotated_size(self.rotation);
        let margin = rw.max(rh) * self.settings.navigation_margin_percent / 100.0;

        let target = ViewBox::new(
            clamp_axis(current.x, current.width, self.bounds.x, self.bounds.width, margin),
            clamp_axis(current.y, current.height, self.bounds.y, self.bounds.height, margin),
            current.width,
            current.height,
        );
        if target == current {
            return None;
        }

        let ticket = self.schedule(TransitionKind::Recenter, target);
        self.position.applied = false;
        self.position.generation = ticket.generation;
        log::debug!("Recenter view box to {:?}", target);
        Some(ticket)
    }

    // ------------------------------------------------------------------
    // Rotation
    // ------------------------------------------------------------------

    /// Rotate the presentation by a quarter turn.
    pub fn rotate(&mut self, clockwise: bool) -> i32 {
        let step = if clockwise { 90 } else { -90 };
        self.rotation = (self.rotation + step).rem_euclid(360);
        log::debug!("Rotation set to {}", self.rotation);
        self.rotation
    }
}

/// Clamp one axis of the view box, centering it when it is wider than the
/// allowed range.
fn clamp_axis(start: f64, size: f64, bound_start: f64, bound_size: f64, margin: f64) -> f64 {
    let low = bound_start - margin;
    let high = bound_start + bound_size + margin - size;
    if low <= high {
        start.clamp(low, high)
    } else {
        bound_start + bound_size / 2.0 - size / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-6;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < EPSILON
    }

    fn settings() -> ViewSettings {
        ViewSettings {
            zoom_factors: vec![100, 133, 166, 200, 250, 350, 400, 500],
            navigation_margin_percent: 20.0,
            transition_duration: Duration::from_millis(250),
        }
    }

    fn view() -> ViewTransform {
        ViewTransform::new(BoundingBox::new(0.0, 0.0, 100.0, 100.0), settings())
    }

    #[test]
    fn test_identity_mapping_at_full_view() {
        let v = view();
        let p = v.to_image_space(Point::new(25.0, 75.0));
        assert!(approx_eq(p.x, 25.0) && approx_eq(p.y, 75.0));
    }

    #[test]
    fn test_mapping_with_offset_bounds_and_viewport() {
        let mut v = ViewTransform::new(BoundingBox::new(10.0, 10.0, 50.0, 30.0), settings());
        v.set_viewport(100.0, 60.0);
        assert!(approx_eq(v.scale(), 2.0));
        let p = v.to_image_space(Point::new(0.0, 0.0));
        assert!(approx_eq(p.x, 10.0) && approx_eq(p.y, 10.0));
    }

    #[test]
    fn test_screen_roundtrip_with_rotation_and_pan() {
        let mut v = view();
        v.set_viewport(300.0, 200.0);
        v.rotate(true);
        v.pan(12.0, -7.0);
        let image = Point::new(33.0, 81.0);
        let back = v.to_image_space(v.to_screen_space(image));
        assert!(approx_eq(back.x, image.x) && approx_eq(back.y, image.y));
    }

    #[test]
    fn test_quarter_turn_mapping() {
        let mut v = view();
        v.rotate(true);
        // After a clockwise turn the image's top-left corner is at the top-right
        let corner = v.to_screen_space(Point::new(0.0, 0.0));
        assert!(approx_eq(corner.x, 100.0) && approx_eq(corner.y, 0.0));
    }

    #[test]
    fn test_zoom_in_at_center() {
        let mut v = view();
        let ticket = v.zoom(None, ZoomDirection::In).unwrap();
        assert!(!v.zoom_state().applied);
        assert_eq!(v.view_box(), BoundingBox::new(0.0, 0.0, 100.0, 100.0));

        v.complete_transition(ticket);
        let vb = v.view_box();
        assert!(v.zoom_state().applied);
        assert!(approx_eq(vb.width, 100.0 * 100.0 / 133.0));
        assert!(approx_eq(vb.center().x, 50.0) && approx_eq(vb.center().y, 50.0));
    }

    #[test]
    fn test_zoom_preserves_focus_position() {
        let mut v = view();
        let focus = Point::new(20.0, 30.0);
        let ticket = v.zoom(Some(focus), ZoomDirection::In).unwrap();
        v.complete_transition(ticket);
        let after = v.to_image_space(focus);
        assert!(approx_eq(after.x, 20.0) && approx_eq(after.y, 30.0));
    }

    #[test]
    fn test_zoom_clamps_to_table_bounds() {
        let mut v = view();
        assert!(v.zoom(None, ZoomDirection::Out).is_none());
        for _ in 0..20 {
            v.zoom(None, ZoomDirection::In);
        }
        v.settle();
        assert_eq!(v.zoom_state().factor, 7);
        assert_eq!(v.zoom_percent(), 500);
        assert!(v.zoom(None, ZoomDirection::In).is_none());
        assert!(approx_eq(v.view_box().width, 20.0));
    }

    #[test]
    fn test_stale_ticket_is_ignored() {
        let mut v = view();
        let first = v.zoom(None, ZoomDirection::In).unwrap();
        let second = v.zoom(None, ZoomDirection::In).unwrap();
        assert!(v.complete_transition(first).is_none());
        assert_eq!(v.view_box(), BoundingBox::new(0.0, 0.0, 100.0, 100.0));

        v.complete_transition(second);
        assert!(approx_eq(v.view_box().width, 100.0 * 100.0 / 166.0));
    }

    #[test]
    fn test_tick_waits_for_deadline() {
        let mut v = view();
        v.zoom(None, ZoomDirection::In).unwrap();
        v.tick(Instant::now());
        assert!(!v.is_settled());
        v.tick(Instant::now() + Duration::from_secs(1));
        assert!(v.is_settled());
    }

    #[test]
    fn test_pan_is_visual_until_folded() {
        let mut v = view();
        v.pan(10.0, 0.0);
        v.pan(5.0, 4.0);
        assert_eq!(v.view_box(), BoundingBox::new(0.0, 0.0, 100.0, 100.0));
        assert_eq!(v.translation(), PendingTranslation { x: 15.0, y: 4.0 });

        // Within the 20px margin, no recenter needed
        assert!(v.end_pan().is_none());
        assert!(v.translation().is_zero());
        assert!(approx_eq(v.view_box().x, -15.0));
        assert!(approx_eq(v.view_box().y, -4.0));
        assert!(!v.position().recenter);
    }

    #[test]
    fn test_fold_keeps_image_under_pointer() {
        let mut v = view();
        v.set_viewport(200.0, 200.0);
        v.rotate(true);
        let screen = Point::new(50.0, 60.0);
        v.pan(8.0, 3.0);
        let during = v.to_image_space(screen);
        v.end_pan();
        v.settle();
        let after = v.to_image_space(screen);
        assert!(approx_eq(during.x, after.x) && approx_eq(during.y, after.y));
    }

    #[test]
    fn test_pan_beyond_margin_recenters() {
        let mut v = view();
        v.pan(60.0, 0.0);
        let ticket = v.end_pan().unwrap();
        assert!(!v.position().applied);
        v.complete_transition(ticket);
        assert!(v.position().applied);
        assert!(!v.position().recenter);
        assert!(approx_eq(v.view_box().x, -20.0));
    }

    #[test]
    fn test_zoom_during_recenter_settles_position() {
        let mut v = view();
        v.pan(60.0, 0.0);
        v.end_pan().unwrap();
        v.zoom(None, ZoomDirection::In).unwrap();
        assert!(v.position().applied);
        assert!(!v.zoom_state().applied);

        v.settle();
        assert!(v.is_settled());
        assert!(v.zoom_state().applied);
        assert!(v.position().applied);
        assert!(!v.position().recenter);
    }

    #[test]
    fn test_recenter_during_zoom_settles_zoom() {
        let mut v = view();
        v.zoom(None, ZoomDirection::In).unwrap();
        v.pan(80.0, 0.0);
        // Folding while the zoom runs only moves the zoom target
        assert!(v.end_pan().is_none());
        let ticket = v.recenter().unwrap();
        assert!(v.zoom_state().applied);
        assert!(!v.position().applied);

        assert!(v.complete_transition(ticket).is_none());
        assert!(v.is_settled());
        assert!(v.position().applied);
        assert!(!v.position().recenter);
    }

    #[test]
    fn test_cancel_pan() {
        let mut v = view();
        v.pan(30.0, 30.0);
        v.cancel_pan();
        assert!(v.translation().is_zero());
        assert_eq!(v.view_box(), v.bounds());
    }

    #[test]
    fn test_reset_invalidates_tickets() {
        let mut v = view();
        let ticket = v.zoom(None, ZoomDirection::In).unwrap();
        v.reset(BoundingBox::new(0.0, 0.0, 40.0, 40.0));
        assert!(v.complete_transition(ticket).is_none());
        assert_eq!(v.view_box(), BoundingBox::new(0.0, 0.0, 40.0, 40.0));
        assert_eq!(v.zoom_state().factor, 0);
    }
}
