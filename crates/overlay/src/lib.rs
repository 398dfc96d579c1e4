//! In-page annotation overlay.
//!
//! Comments are anchored to elements through structural [`locator`]s and a
//! capture point relative to the element's box. The [`engine::Overlay`]
//! keeps those anchors in sync with a live [`html::Page`]: it captures new
//! comments on click, re-resolves every anchor after the page settles, draws
//! pins for the visible ones and reports visibility changes to the embedding
//! host over an origin-checked [`channel`].

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
    reason = "OverlayConfig/OverlayRuntime are the names host code imports"
)]
#![allow(
    clippy::float_cmp,
    reason = "Geometry is compared exactly where values are copied, not computed"
)]

pub mod anchor;
pub mod channel;
pub mod config;
pub mod engine;
pub mod locator;
pub mod pins;
pub mod runtime;
pub mod snapshot;
pub mod visibility;
pub mod watcher;

pub use anchor::{Anchor, AnchorError, RelativePoint};
pub use channel::{HostPort, MessageChannel, PostedMessage, RecordingPort};
pub use config::OverlayConfig;
pub use engine::{AttachError, ClickOutcome, Overlay, PassReport};
pub use locator::{Locator, LocatorError, compute, resolve};
pub use pins::{PinRenderer, RenderReport};
pub use runtime::{OverlayRuntime, PumpReport};
pub use snapshot::dom_snapshot;
pub use visibility::{HiddenReason, Visibility, classify};
pub use watcher::{ChangeWatcher, Trigger, WatchState};
