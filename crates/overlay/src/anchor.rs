//! Anchors: a locator plus the click position relative to the target box.
//!
//! The relative position is computed once, when the anchor is built:
//!
//! ```text
//! relativeX = (captureOffset.x - captureBox.left) / captureBox.width
//! relativeY = (captureOffset.y - captureBox.top)  / captureBox.height
//! ```
//!
//! and the pin is placed at the same fraction of the element's current box,
//! in document coordinates.

use core::fmt;
use std::error::Error;

use html::LayoutRect;
use overlay_protocol::{BoxRect, CommentId, CommentRecord, Point};
use serde_json::Value;
use url::Url;

use crate::locator::{Locator, ParseLocatorError};

#[derive(Clone, Debug, PartialEq)]
pub enum AnchorError {
    /// The capture box has a zero or non-finite width or height.
    DegenerateBox(BoxRect),
    /// The capture point has a non-finite coordinate.
    NonFiniteOffset(Point),
    /// The stored locator string could not be parsed.
    Locator(ParseLocatorError),
}

impl fmt::Display for AnchorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DegenerateBox(rect) => write!(
                f,
                "capture box {}x{} at ({}, {}) has no area",
                rect.width, rect.height, rect.left, rect.top
            ),
            Self::NonFiniteOffset(point) => {
                write!(f, "capture offset ({}, {}) is not finite", point.x, point.y)
            }
            Self::Locator(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AnchorError {}

impl From<ParseLocatorError> for AnchorError {
    fn from(err: ParseLocatorError) -> Self {
        Self::Locator(err)
    }
}

/// Position of the capture point as a fraction of the capture box.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RelativePoint {
    pub x: f64,
    pub y: f64,
}

impl RelativePoint {
    /// # Errors
    /// Returns an error if the box has no area or either input is not finite.
    pub fn from_capture(offset: Point, capture_box: BoxRect) -> Result<Self, AnchorError> {
        let usable = |length: f64| length.is_finite() && length > 0.0;
        if !usable(capture_box.width)
            || !usable(capture_box.height)
            || !capture_box.left.is_finite()
            || !capture_box.top.is_finite()
        {
            return Err(AnchorError::DegenerateBox(capture_box));
        }
        if !offset.x.is_finite() || !offset.y.is_finite() {
            return Err(AnchorError::NonFiniteOffset(offset));
        }
        Ok(Self {
            x: (offset.x - capture_box.left) / capture_box.width,
            y: (offset.y - capture_box.top) / capture_box.height,
        })
    }

    #[must_use]
    pub fn clamped(self) -> Self {
        Self {
            x: self.x.clamp(0.0, 1.0),
            y: self.y.clamp(0.0, 1.0),
        }
    }
}

/// Document-space pin position for an element whose client rect is `current`.
pub fn pin_position(
    relative: RelativePoint,
    current: LayoutRect,
    scroll_x: f64,
    scroll_y: f64,
) -> Point {
    let clamped = relative.clamped();
    Point::new(
        current.x + scroll_x + current.width * clamped.x,
        current.y + scroll_y + current.height * clamped.y,
    )
}

/// Client rect in wire form.
pub const fn box_rect(rect: LayoutRect) -> BoxRect {
    BoxRect::new(rect.x, rect.y, rect.width, rect.height)
}

/// A comment pinned to an element.
#[derive(Clone, Debug, PartialEq)]
pub struct Anchor {
    pub id: CommentId,
    pub locator: Locator,
    pub capture_offset: Point,
    pub capture_box: BoxRect,
    pub page_key: String,
    pub display_label: Value,
    /// `None` until the first reconciliation pass that sees this anchor.
    pub last_known_visible: Option<bool>,
    relative: RelativePoint,
}

impl Anchor {
    /// # Errors
    /// Returns an error if the capture geometry is degenerate.
    pub fn new(
        id: CommentId,
        locator: Locator,
        capture_offset: Point,
        capture_box: BoxRect,
        page_key: String,
    ) -> Result<Self, AnchorError> {
        let relative = RelativePoint::from_capture(capture_offset, capture_box)?;
        Ok(Self {
            id,
            locator,
            capture_offset,
            capture_box,
            page_key,
            display_label: Value::Null,
            last_known_visible: None,
            relative,
        })
    }

    /// Build an anchor from a host record.
    ///
    /// # Errors
    /// Returns an error if the locator is malformed or the geometry is degenerate.
    pub fn from_record(record: &CommentRecord) -> Result<Self, AnchorError> {
        let mut anchor = Self::new(
            record.id.clone(),
            record.locator.parse()?,
            record.capture_offset,
            record.capture_box,
            record.page_key.clone(),
        )?;
        anchor.display_label = record.display_label.clone();
        anchor.last_known_visible = record.last_known_visible;
        Ok(anchor)
    }

    pub const fn relative(&self) -> RelativePoint {
        self.relative
    }

    pub fn pin_position(&self, current: LayoutRect, scroll_x: f64, scroll_y: f64) -> Point {
        pin_position(self.relative, current, scroll_x, scroll_y)
    }

    /// Whether this anchor belongs to the page at `url`. The fragment is
    /// ignored and an empty page key matches every page.
    pub fn matches_page(&self, url: &Url) -> bool {
        if self.page_key.is_empty() {
            return true;
        }
        let mut current = url.clone();
        current.set_fragment(None);
        match Url::parse(&self.page_key) {
            Ok(mut key) => {
                key.set_fragment(None);
                key == current
            }
            Err(_) => {
                let bare = self.page_key.split('#').next().unwrap_or_default();
                bare == current.as_str()
            }
        }
    }
}
