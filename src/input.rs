//! Input events fed to the annotator by the host.

use callico_geometry::Point;

/// Mouse buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Other(u16),
}

/// Bitmask of held buttons, as reported with each pointer event.
pub mod buttons {
    pub const NONE: u16 = 0;
    pub const PRIMARY: u16 = 1;
    pub const SECONDARY: u16 = 2;
    pub const MIDDLE: u16 = 4;
}

/// Keyboard keys the annotator reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Escape,
    Backspace,
    Delete,
    Enter,
}

/// Keyboard modifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const SHIFT: Modifiers = Modifiers {
        shift: true,
        ctrl: false,
        alt: false,
        meta: false,
    };
}

/// A pointer event in screen coordinates relative to the viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub position: Point,
    /// Button whose state changed, `None` for moves
    pub button: Option<MouseButton>,
    /// Buttons held after the event
    pub buttons: u16,
    pub modifiers: Modifiers,
}

impl PointerEvent {
    /// Primary button pressed.
    pub fn press(x: f64, y: f64) -> Self {
        Self {
            position: Point::new(x, y),
            button: Some(MouseButton::Left),
            buttons: buttons::PRIMARY,
            modifiers: Modifiers::default(),
        }
    }

    /// Primary button released.
    pub fn release(x: f64, y: f64) -> Self {
        Self {
            position: Point::new(x, y),
            button: Some(MouseButton::Left),
            buttons: buttons::NONE,
            modifiers: Modifiers::default(),
        }
    }

    /// Move with the primary button held.
    pub fn drag(x: f64, y: f64) -> Self {
        Self {
            position: Point::new(x, y),
            button: None,
            buttons: buttons::PRIMARY,
            modifiers: Modifiers::default(),
        }
    }

    /// Move with no button held.
    pub fn hover(x: f64, y: f64) -> Self {
        Self {
            buttons: buttons::NONE,
            ..Self::drag(x, y)
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn with_button(mut self, button: MouseButton, held: u16) -> Self {
        self.button = Some(button);
        self.buttons = held;
        self
    }

    /// Only the primary button is held.
    pub fn is_primary_only(&self) -> bool {
        self.buttons == buttons::PRIMARY
    }
}

/// Events the annotator handles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    PointerDown(PointerEvent),
    PointerMove(PointerEvent),
    PointerUp(PointerEvent),
    /// Wheel scroll, negative delta zooms in
    Wheel { position: Point, delta: f64 },
    DoubleClick { position: Point },
    KeyPressed { key: Key, modifiers: Modifiers },
}
