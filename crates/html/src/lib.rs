//! Page model for the annotation overlay.
//!
//! The overlay engine never talks to a browser directly. It works against the
//! types in this crate: an arena-backed [`dom::DOM`] with stable node keys and
//! mutation records, inline style resolution, per-element layout boxes, and a
//! [`page::Page`] that owns the viewport, location history and task queue.

#![allow(
    clippy::missing_docs_in_private_items,
    reason = "Internal implementation details don't need public documentation"
)]
#![allow(
    clippy::missing_inline_in_public_items,
    reason = "Inlining decisions left to compiler for this crate"
)]
#![allow(
    clippy::module_name_repetitions,
    reason = "DOMNode/DOMUpdate read better than Node/Update at call sites"
)]

pub mod dom;
pub mod page;
pub mod parser;
pub mod style;

pub use dom::{DOM, DOMNode, DOMUpdate, DomError, LayoutRect, NodeKey, NodeKind, Viewport};
pub use page::{History, NavigateCallback, NavigationSource, Page, PageEvent};
pub use parser::parse_html;
