//! Host to engine messages.
//!
//! Parsing is two-step: the envelope is read first, then the payload is
//! decoded against the shape its `type` requires. Anything that does not fit
//! is a [`ProtocolError`]; nothing is read from a payload optimistically.

use log::warn;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ProtocolError;
use crate::types::{CommentId, CommentRecord, Mode};

pub const SET_MODE: &str = "SET_MODE";
pub const LOAD_COMMENTS: &str = "LOAD_COMMENTS";
pub const HIGHLIGHT_COMMENT: &str = "HIGHLIGHT_COMMENT";
pub const REQUEST_DOM_SNAPSHOT: &str = "REQUEST_DOM_SNAPSHOT";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetModePayload {
    pub mode: Mode,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadCommentsPayload {
    pub comments: Vec<CommentRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlighted_id: Option<CommentId>,
    /// Records left out because they did not have the comment shape.
    #[serde(skip)]
    pub skipped: usize,
}

/// `LOAD_COMMENTS` as received: each record is decoded on its own so one bad
/// record does not take the rest of the set with it.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLoadComments {
    comments: Vec<Value>,
    #[serde(default)]
    highlighted_id: Option<CommentId>,
}

impl From<RawLoadComments> for LoadCommentsPayload {
    fn from(raw: RawLoadComments) -> Self {
        let mut comments = Vec::with_capacity(raw.comments.len());
        let mut skipped = 0;
        for (index, record) in raw.comments.into_iter().enumerate() {
            match serde_json::from_value::<CommentRecord>(record) {
                Ok(comment) => comments.push(comment),
                Err(err) => {
                    warn!("comment record {index} skipped: {err}");
                    skipped += 1;
                }
            }
        }
        Self {
            comments,
            highlighted_id: raw.highlighted_id,
            skipped,
        }
    }
}

/// `id: null` (or a missing id) clears the highlight.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightCommentPayload {
    pub id: Option<CommentId>,
}

/// A message sent by the host.
#[derive(Clone, Debug, PartialEq)]
pub enum HostMessage {
    SetMode(SetModePayload),
    LoadComments(LoadCommentsPayload),
    HighlightComment(HighlightCommentPayload),
    RequestDomSnapshot,
}

#[derive(Deserialize)]
struct RawEnvelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: Value,
}

fn decode<T: DeserializeOwned>(kind: &str, payload: Value) -> Result<T, ProtocolError> {
    serde_json::from_value(payload).map_err(|err| ProtocolError::Payload {
        kind: kind.to_owned(),
        reason: err.to_string(),
    })
}

fn envelope<T: Serialize>(kind: &str, payload: &T) -> Value {
    let mut object = Map::new();
    object.insert("type".to_owned(), Value::String(kind.to_owned()));
    object.insert(
        "payload".to_owned(),
        serde_json::to_value(payload).unwrap_or_else(|_| Value::Object(Map::new())),
    );
    Value::Object(object)
}

impl HostMessage {
    /// Parse a message from structured-clone data.
    ///
    /// # Errors
    /// Returns an error if the data is not an envelope, names an unknown
    /// type, or carries a payload of the wrong shape.
    pub fn from_value(value: Value) -> Result<Self, ProtocolError> {
        let raw: RawEnvelope =
            serde_json::from_value(value).map_err(|err| ProtocolError::Envelope(err.to_string()))?;
        match raw.kind.as_str() {
            SET_MODE => decode(SET_MODE, raw.payload).map(Self::SetMode),
            LOAD_COMMENTS => decode::<RawLoadComments>(LOAD_COMMENTS, raw.payload)
                .map(|comments| Self::LoadComments(comments.into())),
            HIGHLIGHT_COMMENT => {
                // A missing payload clears the highlight like `{"id": null}`.
                let payload = if raw.payload.is_null() {
                    Value::Object(Map::new())
                } else {
                    raw.payload
                };
                decode(HIGHLIGHT_COMMENT, payload).map(Self::HighlightComment)
            }
            REQUEST_DOM_SNAPSHOT => match raw.payload {
                Value::Null | Value::Object(_) => Ok(Self::RequestDomSnapshot),
                other => Err(ProtocolError::Payload {
                    kind: REQUEST_DOM_SNAPSHOT.to_owned(),
                    reason: format!("expected an object, got {other}"),
                }),
            },
            _ => Err(ProtocolError::UnknownType(raw.kind)),
        }
    }

    /// Parse a message from JSON text.
    ///
    /// # Errors
    /// Returns an error if the text is not JSON or [`Self::from_value`] rejects it.
    pub fn from_json(text: &str) -> Result<Self, ProtocolError> {
        let value: Value =
            serde_json::from_str(text).map_err(|err| ProtocolError::Envelope(err.to_string()))?;
        Self::from_value(value)
    }

    /// The wire tag of this message.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::SetMode(_) => SET_MODE,
            Self::LoadComments(_) => LOAD_COMMENTS,
            Self::HighlightComment(_) => HIGHLIGHT_COMMENT,
            Self::RequestDomSnapshot => REQUEST_DOM_SNAPSHOT,
        }
    }

    /// Encode as the host would post it.
    pub fn to_value(&self) -> Value {
        match self {
            Self::SetMode(payload) => envelope(SET_MODE, payload),
            Self::LoadComments(payload) => envelope(LOAD_COMMENTS, payload),
            Self::HighlightComment(payload) => envelope(HIGHLIGHT_COMMENT, payload),
            Self::RequestDomSnapshot => envelope(REQUEST_DOM_SNAPSHOT, &Map::new()),
        }
    }
}
