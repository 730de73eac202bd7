//! Image probe: checks the served image against its declared size.
//!
//! The host loads the image URL and reports back through the probe. The
//! result only counts while the annotator still shows the element the probe
//! was made for.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use callico_geometry::{ImageSizeMismatch, check_image_size};

/// Passive message shown inline by the annotator.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Notice {
    #[error(transparent)]
    SizeMismatch(#[from] ImageSizeMismatch),

    #[error("Image {url} could not be loaded")]
    LoadFailed { url: String },
}

/// Notices shared between the annotator and its pending probes.
pub(crate) type NoticeBoard = Rc<RefCell<Vec<Notice>>>;

/// Liveness flag of the element currently displayed.
#[derive(Debug, Clone)]
pub(crate) struct Liveness(Rc<Cell<bool>>);

impl Liveness {
    pub(crate) fn new() -> Self {
        Self(Rc::new(Cell::new(true)))
    }

    /// Invalidate every probe created under this flag.
    pub(crate) fn revoke(&self) {
        self.0.set(false);
    }

    fn is_alive(&self) -> bool {
        self.0.get()
    }
}

/// A pending image load for one element.
#[derive(Debug)]
pub struct ImageProbe {
    url: String,
    expected: (u32, u32),
    tolerance: f64,
    liveness: Liveness,
    notices: Weak<RefCell<Vec<Notice>>>,
}

impl ImageProbe {
    pub(crate) fn new(
        url: String,
        expected: (u32, u32),
        tolerance: f64,
        liveness: Liveness,
        notices: &NoticeBoard,
    ) -> Self {
        Self {
            url,
            expected,
            tolerance,
            liveness,
            notices: Rc::downgrade(notices),
        }
    }

    /// URL the host should load.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Whether the annotator still shows the probed element.
    pub fn is_current(&self) -> bool {
        self.liveness.is_alive() && self.notices.strong_count() > 0
    }

    /// The image loaded with the given natural size.
    ///
    /// Returns the notice raised, if any.
    pub fn on_load(self, width: u32, height: u32) -> Option<Notice> {
        let mismatch = check_image_size((width, height), self.expected, &self.url, self.tolerance).err()?;
        self.post(Notice::SizeMismatch(mismatch))
    }

    /// The image failed to load.
    pub fn on_error(self) -> Option<Notice> {
        log::warn!("Failed to load image {}", self.url);
        let notice = Notice::LoadFailed {
            url: self.url.clone(),
        };
        self.post(notice)
    }

    fn post(&self, notice: Notice) -> Option<Notice> {
        if !self.liveness.is_alive() {
            log::debug!("Dropping probe result for {}, element no longer shown", self.url);
            return None;
        }
        let notices = self.notices.upgrade()?;
        notices.borrow_mut().push(notice.clone());
        Some(notice)
    }
}
