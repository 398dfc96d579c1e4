//! Payloads in the shape the reference host application posts them.

use overlay_protocol::{
    BoxRect, CommentId, HostMessage, HostOrigin, Mode, Point, ProtocolError, SetModePayload,
};
use serde_json::json;

#[test]
fn load_comments_from_host_store() {
    let message = HostMessage::from_value(json!({
        "type": "LOAD_COMMENTS",
        "payload": {
            "comments": [
                {
                    "id": 1,
                    "locator": "//*[@id=\"contact\"]/form[1]/button[1]",
                    "captureOffset": {"x": 412, "y": 388.5},
                    "captureBox": {"left": 400, "top": 370, "width": 120, "height": 40},
                    "pageKey": "http://localhost:3000/#contact",
                    "displayLabel": {"author": "sam", "text": "Button looks off"},
                    "lastKnownVisible": true
                },
                {
                    "id": "draft-2",
                    "locator": "/html/body/div[1]/section[2]/h2[1]",
                    "captureOffset": {"x": 30, "y": 12},
                    "captureBox": {"left": 20, "top": 0, "width": 300, "height": 32},
                    "pageKey": ""
                }
            ],
            "highlightedId": "draft-2"
        }
    }))
    .unwrap();

    let HostMessage::LoadComments(payload) = message else {
        panic!("expected LOAD_COMMENTS");
    };
    assert_eq!(payload.highlighted_id, Some(CommentId::from("draft-2")));
    let [first, second] = payload.comments.as_slice() else {
        panic!("expected two comments");
    };
    assert_eq!(first.id, CommentId::Number(1));
    assert_eq!(first.capture_offset, Point::new(412.0, 388.5));
    assert_eq!(first.capture_box, BoxRect::new(400.0, 370.0, 120.0, 40.0));
    assert_eq!(first.display_label["author"], "sam");
    assert_eq!(first.last_known_visible, Some(true));
    assert_eq!(second.last_known_visible, None);
}

#[test]
fn one_bad_comment_is_skipped_and_the_rest_kept() {
    let message = HostMessage::from_value(json!({
        "type": "LOAD_COMMENTS",
        "payload": {"comments": [
            {"id": 1, "locator": "/html/body"},
            {
                "id": 2,
                "locator": "/html/body/main[1]",
                "captureOffset": {"x": 10, "y": 10},
                "captureBox": {"left": 0, "top": 0, "width": 50, "height": 50}
            }
        ]}
    }))
    .unwrap();
    let HostMessage::LoadComments(payload) = message else {
        panic!("expected LOAD_COMMENTS");
    };
    assert_eq!(payload.skipped, 1);
    let ids: Vec<&CommentId> = payload.comments.iter().map(|comment| &comment.id).collect();
    assert_eq!(ids, [&CommentId::Number(2)]);
}

#[test]
fn comments_that_are_not_a_list_reject_the_message() {
    let result = HostMessage::from_value(json!({
        "type": "LOAD_COMMENTS",
        "payload": {"comments": {"id": 1}}
    }));
    assert!(matches!(
        result,
        Err(ProtocolError::Payload { ref kind, .. }) if kind == "LOAD_COMMENTS"
    ));
}

#[test]
fn mode_switch_round_trips_through_the_host_encoder() {
    let origin = HostOrigin::default();
    let sent = HostMessage::SetMode(SetModePayload {
        mode: Mode::Interactive,
    });
    assert!(origin.allows("http://localhost:5173"));
    assert_eq!(HostMessage::from_value(sent.to_value()), Ok(sent));
}
