//! Visibility classification of resolved anchor targets.

use core::fmt;

use html::style::{Display, Position, Visibility as CssVisibility};
use html::{DOM, NodeKey};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum HiddenReason {
    /// The locator did not resolve, or the element left the document.
    Missing,
    /// The element or an ancestor is `display: none`.
    DisplayNone,
    /// `offsetWidth` and `offsetHeight` are both zero.
    NoBox,
    /// Computed `visibility` is `hidden` or `collapse`.
    VisibilityHidden,
    /// Computed `opacity` is zero.
    Transparent,
    /// No `offsetParent` although the element is neither fixed nor the root.
    OutOfFlow,
}

impl fmt::Display for HiddenReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Missing => "missing",
            Self::DisplayNone => "display none",
            Self::NoBox => "no box",
            Self::VisibilityHidden => "visibility hidden",
            Self::Transparent => "transparent",
            Self::OutOfFlow => "out of flow",
        })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Visibility {
    Visible,
    Hidden(HiddenReason),
}

impl Visibility {
    pub const fn is_visible(self) -> bool {
        matches!(self, Self::Visible)
    }
}

/// Classify a resolved element; `None` (an unresolved locator) is [`HiddenReason::Missing`].
pub fn classify(dom: &DOM, element: Option<NodeKey>) -> Visibility {
    let Some(element) = element.filter(|key| dom.is_element(*key) && dom.is_connected(*key)) else {
        return Visibility::Hidden(HiddenReason::Missing);
    };
    if !dom.is_rendered(element) {
        return Visibility::Hidden(HiddenReason::DisplayNone);
    }
    if dom.offset_width(element) <= 0.0 && dom.offset_height(element) <= 0.0 {
        return Visibility::Hidden(HiddenReason::NoBox);
    }

    let style = dom.computed_style(element);
    if style.display == Display::None {
        return Visibility::Hidden(HiddenReason::DisplayNone);
    }
    if matches!(style.visibility, CssVisibility::Hidden | CssVisibility::Collapse) {
        return Visibility::Hidden(HiddenReason::VisibilityHidden);
    }
    if style.opacity <= 0.0 {
        return Visibility::Hidden(HiddenReason::Transparent);
    }

    // body and html have no offsetParent by definition, fixed elements neither.
    let exempt = style.position == Position::Fixed
        || matches!(dom.tag_name(element), Some("body" | "html"));
    if !exempt && dom.offset_parent(element).is_none() {
        return Visibility::Hidden(HiddenReason::OutOfFlow);
    }
    Visibility::Visible
}

pub fn is_visible(dom: &DOM, element: Option<NodeKey>) -> bool {
    classify(dom, element).is_visible()
}

#[cfg(test)]
mod tests {
    use html::{LayoutRect, parse_html};

    use super::*;

    fn page(markup: &str) -> (DOM, NodeKey) {
        let mut dom = parse_html(markup).unwrap();
        for key in dom.descendants(dom.root()) {
            if dom.is_element(key) {
                dom.set_layout(key, LayoutRect::new(0.0, 0.0, 100.0, 20.0)).unwrap();
            }
        }
        let target = dom.get_element_by_id("t").unwrap();
        (dom, target)
    }

    #[test]
    fn plain_element_is_visible() {
        let (dom, target) = page(r#"<div id="t">x</div>"#);
        assert_eq!(classify(&dom, Some(target)), Visibility::Visible);
        assert!(is_visible(&dom, dom.body()));
    }

    #[test]
    fn reports_the_reason() {
        let cases = [
            (r#"<div style="display:none"><p id="t"></p></div>"#, HiddenReason::DisplayNone),
            (r#"<p id="t" style="visibility: hidden"></p>"#, HiddenReason::VisibilityHidden),
            (
                r#"<div style="visibility: collapse"><p id="t"></p></div>"#,
                HiddenReason::VisibilityHidden,
            ),
            (r#"<p id="t" style="opacity: 0"></p>"#, HiddenReason::Transparent),
            (r#"<p id="t" hidden></p>"#, HiddenReason::DisplayNone),
        ];
        for (markup, reason) in cases {
            let (dom, target) = page(markup);
            assert_eq!(classify(&dom, Some(target)), Visibility::Hidden(reason), "{markup}");
        }
    }

    #[test]
    fn zero_box_and_missing() {
        let (mut dom, target) = page(r#"<p id="t"></p>"#);
        dom.set_layout(target, LayoutRect::new(0.0, 0.0, 0.0, 0.0)).unwrap();
        assert_eq!(classify(&dom, Some(target)), Visibility::Hidden(HiddenReason::NoBox));

        dom.remove_node(target).unwrap();
        assert_eq!(classify(&dom, Some(target)), Visibility::Hidden(HiddenReason::Missing));
        assert_eq!(classify(&dom, None), Visibility::Hidden(HiddenReason::Missing));
    }

    #[test]
    fn fixed_elements_need_no_offset_parent() {
        let (dom, target) = page(r#"<div id="t" style="position: fixed"></div>"#);
        assert_eq!(dom.offset_parent(target), None);
        assert_eq!(classify(&dom, Some(target)), Visibility::Visible);
    }
}
