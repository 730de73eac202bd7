//! Callico annotator - interactive image annotation engine
//!
//! Displays a document element image, lets the user pan, zoom and rotate it,
//! and draw, edit, select or delete polygonal regions on it. Changes are
//! shared with sibling widgets over a per-page [`EventBus`].
//!
//! Geometry primitives live in the `callico_geometry` crate and are
//! re-exported here.

mod annotator;
pub mod broadcast;
pub mod config;
mod constants;
pub mod draft;
mod error;
pub mod gesture;
pub mod input;
pub mod logging;
pub mod model;
pub mod probe;
pub mod view;

pub use annotator::ImageAnnotator;
pub use broadcast::{BroadcastEvent, EventBus, SubscriptionId, WidgetId};
pub use callico_geometry as geometry;
pub use config::{ConfigError, EditorConfig, LogLevel};
pub use error::AnnotatorError;
pub use gesture::{Gesture, Mode, Tool};
pub use input::{InputEvent, Key, Modifiers, MouseButton, PointerEvent};
pub use model::{EditedElement, Metadata, Region, RegionId};
pub use probe::{ImageProbe, Notice};
pub use view::{TransitionTicket, ViewTransform};
