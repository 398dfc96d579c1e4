//! Layout boxes and the CSSOM-View style metrics derived from them.
//!
//! Layout itself is out of scope for the page model: boxes are assigned by
//! whoever drives the page (tests, the harness, a platform binding). The
//! helpers here answer the questions the overlay asks about those boxes:
//! `offsetWidth`, `offsetParent`, `getBoundingClientRect` and hit testing.

use core::iter;

use crate::dom::{DOM, DomError, NodeKey};
use crate::style::{Display, Position, parse_px};

/// An axis-aligned rectangle in CSS pixels.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct LayoutRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl LayoutRect {
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[inline]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Half-open containment test.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    #[must_use]
    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }
}

/// The visible area of the document and its scroll offsets.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub scroll_x: f64,
    pub scroll_y: f64,
}

impl Viewport {
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            scroll_x: 0.0,
            scroll_y: 0.0,
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1024.0, 768.0)
    }
}

impl DOM {
    /// Assign a layout box to a node.
    ///
    /// # Errors
    /// Returns an error if the key is unknown.
    pub fn set_layout(&mut self, key: NodeKey, rect: LayoutRect) -> Result<(), DomError> {
        self.node_mut(key)?.layout = Some(rect);
        Ok(())
    }

    /// Drop a node's layout box.
    ///
    /// # Errors
    /// Returns an error if the key is unknown.
    pub fn clear_layout(&mut self, key: NodeKey) -> Result<(), DomError> {
        self.node_mut(key)?.layout = None;
        Ok(())
    }

    pub fn layout(&self, key: NodeKey) -> Option<LayoutRect> {
        self.node(key)?.layout
    }

    /// True if the element is connected and neither it nor an ancestor is
    /// `display: none`, i.e. it takes part in the render tree.
    pub fn is_rendered(&self, key: NodeKey) -> bool {
        if !self.is_element(key) || !self.is_connected(key) {
            return false;
        }
        if self.computed_style(key).display == Display::None {
            return false;
        }
        self.ancestors(key)
            .into_iter()
            .filter(|ancestor| self.is_element(*ancestor))
            .all(|ancestor| self.computed_style(ancestor).display != Display::None)
    }

    /// True if the element or one of its ancestors is `position: fixed`.
    pub fn is_fixed_positioned(&self, key: NodeKey) -> bool {
        iter::once(key)
            .chain(self.ancestors(key))
            .filter(|node| self.is_element(*node))
            .any(|node| self.computed_style(node).position == Position::Fixed)
    }

    fn rendered_box(&self, key: NodeKey) -> Option<LayoutRect> {
        if !self.is_rendered(key) {
            return None;
        }
        self.layout(key)
    }

    /// `offsetWidth`: zero for elements without a box.
    pub fn offset_width(&self, key: NodeKey) -> f64 {
        self.rendered_box(key).map_or(0.0, |rect| rect.width)
    }

    /// `offsetHeight`: zero for elements without a box.
    pub fn offset_height(&self, key: NodeKey) -> f64 {
        self.rendered_box(key).map_or(0.0, |rect| rect.height)
    }

    /// `offsetParent`: `None` for unrendered, fixed-position, `body` and
    /// `html` elements; otherwise the nearest positioned ancestor or `body`.
    pub fn offset_parent(&self, key: NodeKey) -> Option<NodeKey> {
        if !self.is_rendered(key) {
            return None;
        }
        if matches!(self.tag_name(key), Some("body" | "html")) {
            return None;
        }
        if self.computed_style(key).position == Position::Fixed {
            return None;
        }
        let body = self.body();
        for ancestor in self.ancestors(key) {
            if !self.is_element(ancestor) {
                break;
            }
            if Some(ancestor) == body
                || self.computed_style(ancestor).position != Position::Static
            {
                return Some(ancestor);
            }
        }
        None
    }

    /// `getBoundingClientRect`: the layout box in viewport coordinates, or a
    /// zero rect for elements without a box. Fixed subtrees ignore scroll.
    pub fn bounding_client_rect(&self, key: NodeKey, viewport: &Viewport) -> LayoutRect {
        let Some(rect) = self.rendered_box(key) else {
            return LayoutRect::default();
        };
        if self.is_fixed_positioned(key) {
            rect
        } else {
            rect.translate(-viewport.scroll_x, -viewport.scroll_y)
        }
    }

    /// Topmost rendered element whose client rect contains the point. Later
    /// elements in tree order paint above earlier ones.
    pub fn hit_test(&self, viewport: &Viewport, client_x: f64, client_y: f64) -> Option<NodeKey> {
        self.descendants(self.root())
            .into_iter()
            .rev()
            .filter(|key| self.is_element(*key))
            .find(|key| {
                let rect = self.bounding_client_rect(*key, viewport);
                rect.width > 0.0 && rect.height > 0.0 && rect.contains(client_x, client_y)
            })
    }

    /// Assign layout boxes from inline geometry (`left`, `top`, `width`,
    /// `height` in px). Offsets are relative to the parent's box, or to the
    /// viewport for `position: fixed`. A missing width takes the parent's
    /// width, a missing height is zero; `html` and `body` default to the
    /// viewport size. Unrendered elements lose their box.
    pub fn apply_inline_geometry(&mut self, viewport: &Viewport) {
        let order: Vec<NodeKey> = self
            .descendants(self.root())
            .into_iter()
            .filter(|key| self.is_element(*key))
            .collect();
        for key in order {
            let rect = self.inline_box(key, viewport);
            if let Ok(node) = self.node_mut(key) {
                node.layout = rect;
            }
        }
    }

    fn inline_box(&self, key: NodeKey, viewport: &Viewport) -> Option<LayoutRect> {
        if !self.is_rendered(key) {
            return None;
        }
        let px = |property: &str| {
            self.inline_style_property(key, property)
                .as_deref()
                .and_then(parse_px)
        };
        let is_root_box = matches!(self.tag_name(key), Some("body" | "html"));
        let parent_box = if self.computed_style(key).position == Position::Fixed {
            LayoutRect::new(0.0, 0.0, viewport.width, viewport.height)
        } else {
            self.parent_element(key)
                .and_then(|parent| self.layout(parent))
                .unwrap_or_else(|| LayoutRect::new(0.0, 0.0, viewport.width, viewport.height))
        };
        let default_height = if is_root_box { viewport.height } else { 0.0 };
        Some(LayoutRect::new(
            parent_box.x + px("left").unwrap_or(0.0),
            parent_box.y + px("top").unwrap_or(0.0),
            px("width").unwrap_or(parent_box.width).max(0.0),
            px("height").unwrap_or(default_height).max(0.0),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        dom: DOM,
        body: NodeKey,
    }

    fn fixture() -> Fixture {
        let mut dom = DOM::new();
        let html = dom.create_element("html");
        let body = dom.create_element("body");
        dom.append_child(NodeKey::ROOT, html).unwrap();
        dom.append_child(html, body).unwrap();
        dom.set_layout(html, LayoutRect::new(0.0, 0.0, 800.0, 2000.0)).unwrap();
        dom.set_layout(body, LayoutRect::new(0.0, 0.0, 800.0, 2000.0)).unwrap();
        Fixture { dom, body }
    }

    #[test]
    fn client_rect_follows_scroll_except_fixed() {
        let Fixture { mut dom, body } = fixture();
        let card = dom.create_element("div");
        let banner = dom.create_element("div");
        dom.append_child(body, card).unwrap();
        dom.append_child(body, banner).unwrap();
        dom.set_attribute(banner, "style", "position: fixed").unwrap();
        dom.set_layout(card, LayoutRect::new(10.0, 500.0, 100.0, 50.0)).unwrap();
        dom.set_layout(banner, LayoutRect::new(0.0, 0.0, 800.0, 40.0)).unwrap();

        let mut viewport = Viewport::new(800.0, 600.0);
        viewport.scroll_y = 300.0;
        assert_eq!(
            dom.bounding_client_rect(card, &viewport),
            LayoutRect::new(10.0, 200.0, 100.0, 50.0)
        );
        assert_eq!(
            dom.bounding_client_rect(banner, &viewport),
            LayoutRect::new(0.0, 0.0, 800.0, 40.0)
        );
    }

    #[test]
    fn offset_parent_rules() {
        let Fixture { mut dom, body } = fixture();
        let wrapper = dom.create_element("div");
        let item = dom.create_element("p");
        let modal = dom.create_element("div");
        dom.append_child(body, wrapper).unwrap();
        dom.append_child(wrapper, item).unwrap();
        dom.append_child(body, modal).unwrap();
        dom.set_attribute(modal, "style", "position: fixed").unwrap();

        assert_eq!(dom.offset_parent(item), Some(body));
        dom.set_attribute(wrapper, "style", "position: relative").unwrap();
        assert_eq!(dom.offset_parent(item), Some(wrapper));
        assert_eq!(dom.offset_parent(modal), None);
        assert_eq!(dom.offset_parent(body), None);

        dom.set_attribute(wrapper, "style", "display: none").unwrap();
        assert_eq!(dom.offset_parent(item), None);
    }

    #[test]
    fn display_none_ancestor_zeroes_offsets() {
        let Fixture { mut dom, body } = fixture();
        let wrapper = dom.create_element("div");
        let item = dom.create_element("p");
        dom.append_child(body, wrapper).unwrap();
        dom.append_child(wrapper, item).unwrap();
        dom.set_layout(item, LayoutRect::new(0.0, 0.0, 120.0, 20.0)).unwrap();
        assert!((dom.offset_width(item) - 120.0).abs() < f64::EPSILON);

        dom.set_attribute(wrapper, "hidden", "").unwrap();
        assert!(dom.offset_width(item).abs() < f64::EPSILON);
        assert!(dom.offset_height(item).abs() < f64::EPSILON);
    }

    #[test]
    fn hit_test_prefers_later_elements() {
        let Fixture { mut dom, body } = fixture();
        let under = dom.create_element("div");
        let over = dom.create_element("div");
        dom.append_child(body, under).unwrap();
        dom.append_child(body, over).unwrap();
        dom.set_layout(under, LayoutRect::new(0.0, 0.0, 200.0, 200.0)).unwrap();
        dom.set_layout(over, LayoutRect::new(50.0, 50.0, 20.0, 20.0)).unwrap();

        let viewport = Viewport::new(800.0, 600.0);
        assert_eq!(dom.hit_test(&viewport, 55.0, 55.0), Some(over));
        assert_eq!(dom.hit_test(&viewport, 10.0, 10.0), Some(under));
        assert_eq!(dom.hit_test(&viewport, 10.0, 300.0), Some(body));
    }

    #[test]
    fn inline_geometry_nests_offsets() {
        let Fixture { mut dom, body } = fixture();
        let panel = dom.create_element("div");
        let button = dom.create_element("button");
        dom.append_child(body, panel).unwrap();
        dom.append_child(panel, button).unwrap();
        dom.set_attribute(panel, "style", "left: 20px; top: 100px; width: 300px; height: 200px")
            .unwrap();
        dom.set_attribute(button, "style", "left: 10px; top: 10px; width: 80px; height: 30px")
            .unwrap();

        let viewport = Viewport::new(800.0, 600.0);
        dom.apply_inline_geometry(&viewport);
        assert_eq!(dom.layout(body), Some(LayoutRect::new(0.0, 0.0, 800.0, 600.0)));
        assert_eq!(dom.layout(panel), Some(LayoutRect::new(20.0, 100.0, 300.0, 200.0)));
        assert_eq!(dom.layout(button), Some(LayoutRect::new(30.0, 110.0, 80.0, 30.0)));
    }
}
