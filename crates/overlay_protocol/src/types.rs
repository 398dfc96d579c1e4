use core::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Host-assigned comment identifier. Hosts use either JSON integers or strings.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommentId {
    Number(i64),
    Text(String),
}

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(number) => write!(f, "{number}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

impl From<i64> for CommentId {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for CommentId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

/// Click interception mode.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Clicks reach the page untouched.
    #[default]
    Passive,
    /// Clicks create new comment captures.
    Interactive,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Passive => "passive",
            Self::Interactive => "interactive",
        })
    }
}

/// A point in viewport pixels.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An element box in viewport pixels, as `getBoundingClientRect` reports it.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BoxRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl BoxRect {
    pub const fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }
}

/// A comment as the host stores it and pushes it with `LOAD_COMMENTS`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentRecord {
    pub id: CommentId,
    /// Locator in wire form, e.g. `/html/body/div[2]/p[1]`.
    pub locator: String,
    pub capture_offset: Point,
    pub capture_box: BoxRect,
    /// Page URL at capture time. Empty matches every page.
    #[serde(default)]
    pub page_key: String,
    /// Opaque label the host attaches; carried through untouched.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub display_label: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_known_visible: Option<bool>,
}
