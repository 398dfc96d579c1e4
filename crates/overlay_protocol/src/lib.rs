//! Wire protocol between the annotation overlay (inside the frame) and the
//! host application (the parent window).
//!
//! Every message is an envelope `{"type": <tag>, "payload": <object>}`. Each
//! direction is a closed enum: [`HostMessage`] for host to engine traffic and
//! [`EngineMessage`] for engine to host traffic. Inbound data is checked
//! against the [`HostOrigin`] before it is parsed at all.

#![allow(
    clippy::missing_docs_in_private_items,
    reason = "Internal implementation details don't need public documentation"
)]
#![allow(
    clippy::missing_inline_in_public_items,
    reason = "Inlining decisions left to compiler for this crate"
)]

mod error;
mod inbound;
mod origin;
mod outbound;
mod types;

pub use error::ProtocolError;
pub use inbound::{
    HighlightCommentPayload, HostMessage, LoadCommentsPayload, SetModePayload,
    HIGHLIGHT_COMMENT, LOAD_COMMENTS, REQUEST_DOM_SNAPSHOT, SET_MODE,
};
pub use origin::{DEFAULT_HOST_ORIGIN, HostOrigin};
pub use outbound::{
    CommentCapture, CommentSelected, DomSnapshot, EngineMessage, Empty, UrlChange,
    VisibilityDelta,
};
pub use types::{BoxRect, CommentId, CommentRecord, Mode, Point};
