//! Default values for the annotation editor

/// Zoom percentages, the first entry shows the whole element
pub const DEFAULT_ZOOM_FACTORS: [u32; 8] = [100, 133, 166, 200, 250, 350, 400, 500];

/// Allowed drift of the element outside the viewport, in percent
pub const DEFAULT_NAVIGATION_MARGIN_PERCENT: f64 = 20.0;

/// Duration of zoom and recenter transitions, in milliseconds
pub const DEFAULT_TRANSITION_DURATION_MS: u64 = 250;

/// Pointer radius for vertex handles, in screen pixels
pub const DEFAULT_HANDLE_HIT_RADIUS: f64 = 8.0;

/// Pointer travel below which a press-release counts as a click, in screen pixels
pub const CLICK_DISTANCE: f64 = 3.0;

/// Minimum fixed vertices before a polygon can be closed on its first vertex
pub const MIN_CLOSING_VERTICES: usize = 3;
