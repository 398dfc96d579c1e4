//! Overlay pins: one absolutely positioned `annotation-pin` element per
//! visible anchor, appended to `body` and rebuilt on every pass.
//!
//! All writes here are expected to run with mutation observation paused.

use core::fmt;
use core::iter;
use std::collections::HashMap;
use std::error::Error;

use html::{DOM, DomError, LayoutRect, NodeKey, Viewport};
use log::{trace, warn};
use overlay_protocol::CommentId;

use crate::anchor::{RelativePoint, pin_position};

pub const PIN_TAG: &str = "annotation-pin";
pub const PIN_ATTRIBUTE: &str = "data-annotation-pin";

const PIN_COLOR: &str = "#2563eb";
const PIN_COLOR_HIGHLIGHTED: &str = "#f59e0b";
const PIN_SHADOW: &str = "0 1px 4px rgba(0, 0, 0, 0.35)";
const PIN_SHADOW_HIGHLIGHTED: &str =
    "0 0 0 4px rgba(245, 158, 11, 0.45), 0 4px 14px rgba(0, 0, 0, 0.55)";
const PIN_Z_INDEX: u32 = 2_147_483_000;
const PIN_Z_INDEX_HIGHLIGHTED: u32 = 2_147_483_001;

/// True for elements created by the renderer.
pub fn is_pin(dom: &DOM, key: NodeKey) -> bool {
    dom.get_attribute(key, PIN_ATTRIBUTE).is_some()
}

#[derive(Clone, Debug, PartialEq)]
pub enum PinError {
    /// The document has no `body` to append to.
    NoBody,
    /// The anchored element no longer exists.
    ElementGone,
    /// The computed position is not a finite number.
    NonFinite { x: f64, y: f64 },
    Dom(DomError),
}

impl fmt::Display for PinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoBody => f.write_str("document has no body"),
            Self::ElementGone => f.write_str("anchored element is gone"),
            Self::NonFinite { x, y } => write!(f, "pin position ({x}, {y}) is not finite"),
            Self::Dom(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PinError {}

impl From<DomError> for PinError {
    fn from(err: DomError) -> Self {
        Self::Dom(err)
    }
}

/// What to draw for one anchor.
#[derive(Clone, Debug, PartialEq)]
pub struct PinTarget {
    pub id: CommentId,
    pub element: Option<NodeKey>,
    pub relative: RelativePoint,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderReport {
    pub removed: usize,
    pub rendered: Vec<CommentId>,
    pub failed: Vec<(CommentId, PinError)>,
}

#[derive(Debug)]
pub struct PinRenderer {
    size: f64,
    highlighted_size: f64,
    pins: HashMap<NodeKey, CommentId>,
}

impl PinRenderer {
    pub fn new(size: f64, highlighted_size: f64) -> Self {
        Self {
            size,
            highlighted_size,
            pins: HashMap::new(),
        }
    }

    pub fn pin_count(&self) -> usize {
        self.pins.len()
    }

    /// Pin element currently drawn for `id`.
    pub fn pin_for(&self, id: &CommentId) -> Option<NodeKey> {
        self.pins
            .iter()
            .find_map(|(key, pin_id)| (pin_id == id).then_some(*key))
    }

    /// The comment whose pin is `target` or contains it.
    pub fn pin_at(&self, dom: &DOM, target: NodeKey) -> Option<CommentId> {
        iter::once(target)
            .chain(dom.ancestors(target))
            .find_map(|key| self.pins.get(&key).cloned())
    }

    /// Remove every pin in the document, including ones this renderer lost track of.
    pub fn clear(&mut self, dom: &mut DOM) -> usize {
        let mut doomed: Vec<NodeKey> = dom
            .descendants(dom.root())
            .into_iter()
            .filter(|key| is_pin(dom, *key))
            .collect();
        doomed.extend(self.pins.keys().copied().filter(|key| dom.contains(*key)));
        doomed.sort_unstable();
        doomed.dedup();
        self.pins.clear();

        let mut removed = 0;
        for key in doomed {
            // A pin nested in another pin goes away with its parent.
            if dom.contains(key) && dom.remove_node(key).is_ok() {
                removed += 1;
            }
        }
        removed
    }

    /// Replace all pins with one pin per target. A failing target is logged
    /// and reported; the remaining targets are still drawn.
    pub fn render(
        &mut self,
        dom: &mut DOM,
        viewport: &Viewport,
        targets: &[PinTarget],
        highlighted: Option<&CommentId>,
    ) -> RenderReport {
        let mut report = RenderReport {
            removed: self.clear(dom),
            ..RenderReport::default()
        };
        for target in targets {
            let is_highlighted = highlighted == Some(&target.id);
            match self.place(dom, viewport, target, is_highlighted) {
                Ok(pin) => {
                    trace!("pin {} drawn as {pin}", target.id);
                    self.pins.insert(pin, target.id.clone());
                    report.rendered.push(target.id.clone());
                }
                Err(err) => {
                    warn!("pin {} skipped: {err}", target.id);
                    report.failed.push((target.id.clone(), err));
                }
            }
        }
        report
    }

    fn place(
        &self,
        dom: &mut DOM,
        viewport: &Viewport,
        target: &PinTarget,
        highlighted: bool,
    ) -> Result<NodeKey, PinError> {
        let body = dom.body().ok_or(PinError::NoBody)?;
        let element = target
            .element
            .filter(|key| dom.is_connected(*key))
            .ok_or(PinError::ElementGone)?;
        let rect = dom.bounding_client_rect(element, viewport);
        let point = pin_position(target.relative, rect, viewport.scroll_x, viewport.scroll_y);
        if !point.x.is_finite() || !point.y.is_finite() {
            return Err(PinError::NonFinite {
                x: point.x,
                y: point.y,
            });
        }

        let size = if highlighted {
            self.highlighted_size
        } else {
            self.size
        };
        let left = point.x - size / 2.0;
        let top = point.y - size / 2.0;
        let pin = dom.create_element(PIN_TAG);
        dom.set_attribute(pin, PIN_ATTRIBUTE, &target.id.to_string())?;
        dom.set_attribute(pin, "role", "button")?;
        dom.set_attribute(pin, "aria-label", &format!("Comment {}", target.id))?;
        dom.set_attribute(pin, "style", &pin_style(left, top, size, highlighted))?;
        dom.append_child(body, pin)?;
        // No layout engine runs after us, so the pin gets its box here.
        dom.set_layout(pin, LayoutRect::new(left, top, size, size))?;
        Ok(pin)
    }
}

fn pin_style(left: f64, top: f64, size: f64, highlighted: bool) -> String {
    let (color, shadow, z_index) = if highlighted {
        (PIN_COLOR_HIGHLIGHTED, PIN_SHADOW_HIGHLIGHTED, PIN_Z_INDEX_HIGHLIGHTED)
    } else {
        (PIN_COLOR, PIN_SHADOW, PIN_Z_INDEX)
    };
    format!(
        "position: absolute; left: {left}px; top: {top}px; width: {size}px; height: {size}px; \
         border-radius: 50%; background: {color}; border: 2px solid #ffffff; \
         box-shadow: {shadow}; z-index: {z_index}; cursor: pointer; pointer-events: auto;"
    )
}
