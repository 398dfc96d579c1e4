//! Engine to host messages.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{BoxRect, CommentId, Point};

/// The `{}` payload.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Empty {}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlChange {
    pub url: String,
}

/// A new comment the user placed in interactive mode.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentCapture {
    pub locator: String,
    pub page_url: String,
    pub capture_offset: Point,
    pub capture_box: BoxRect,
    pub was_visible_at_capture: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentSelected {
    pub id: CommentId,
}

/// Comments whose visibility changed during one reconciliation pass.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibilityDelta {
    pub became_visible: Vec<CommentId>,
    pub became_hidden: Vec<CommentId>,
}

impl VisibilityDelta {
    pub fn is_empty(&self) -> bool {
        self.became_visible.is_empty() && self.became_hidden.is_empty()
    }

    pub fn len(&self) -> usize {
        self.became_visible.len() + self.became_hidden.len()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomSnapshot {
    pub html: String,
}

/// A message sent to the host.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum EngineMessage {
    #[serde(rename = "iframe-ready")]
    IframeReady(Empty),
    #[serde(rename = "iframe-scroll")]
    IframeScroll(Point),
    #[serde(rename = "iframe-url-change")]
    IframeUrlChange(UrlChange),
    #[serde(rename = "new-comment-capture")]
    NewCommentCapture(CommentCapture),
    #[serde(rename = "comment-selected")]
    CommentSelected(CommentSelected),
    #[serde(rename = "visibility-delta")]
    VisibilityDelta(VisibilityDelta),
    #[serde(rename = "DOM_SNAPSHOT_DATA")]
    DomSnapshotData(DomSnapshot),
}

impl EngineMessage {
    /// The wire tag of this message.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::IframeReady(_) => "iframe-ready",
            Self::IframeScroll(_) => "iframe-scroll",
            Self::IframeUrlChange(_) => "iframe-url-change",
            Self::NewCommentCapture(_) => "new-comment-capture",
            Self::CommentSelected(_) => "comment-selected",
            Self::VisibilityDelta(_) => "visibility-delta",
            Self::DomSnapshotData(_) => "DOM_SNAPSHOT_DATA",
        }
    }

    /// Encode as structured-clone data.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn wire_shapes() {
        assert_eq!(
            EngineMessage::IframeReady(Empty {}).to_value(),
            json!({"type": "iframe-ready", "payload": {}})
        );
        assert_eq!(
            EngineMessage::IframeScroll(Point::new(0.0, 120.0)).to_value(),
            json!({"type": "iframe-scroll", "payload": {"x": 0.0, "y": 120.0}})
        );
        assert_eq!(
            EngineMessage::VisibilityDelta(VisibilityDelta {
                became_visible: vec![CommentId::Number(1)],
                became_hidden: vec![CommentId::from("b")],
            })
            .to_value(),
            json!({
                "type": "visibility-delta",
                "payload": {"becameVisible": [1], "becameHidden": ["b"]}
            })
        );
        let capture = EngineMessage::NewCommentCapture(CommentCapture {
            locator: "/html/body/p[1]".to_owned(),
            page_url: "https://site.test/".to_owned(),
            capture_offset: Point::new(5.0, 6.0),
            capture_box: BoxRect::new(0.0, 0.0, 10.0, 10.0),
            was_visible_at_capture: true,
        })
        .to_value();
        assert_eq!(capture["type"], "new-comment-capture");
        assert_eq!(capture["payload"]["pageUrl"], "https://site.test/");
        assert_eq!(capture["payload"]["wasVisibleAtCapture"], true);
        assert_eq!(capture["payload"]["captureBox"]["width"], 10.0);
    }

    #[test]
    fn decodes_what_it_encodes_for_hosts() {
        let value = json!({"type": "DOM_SNAPSHOT_DATA", "payload": {"html": "<html></html>"}});
        let message: EngineMessage = serde_json::from_value(value).unwrap();
        assert_eq!(message.kind(), "DOM_SNAPSHOT_DATA");
        assert_eq!(
            message,
            EngineMessage::DomSnapshotData(DomSnapshot {
                html: "<html></html>".to_owned()
            })
        );
    }
}
