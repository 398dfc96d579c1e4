//! Inline style handling: `style="..."` parsing and the handful of computed
//! properties the overlay needs (display, visibility, opacity, position).
//!
//! See <https://www.w3.org/TR/css-style-attr/>

use std::collections::HashMap;

use crate::dom::{DOM, NodeKey};

/// A single CSS declaration parsed from a style attribute.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Declaration {
    /// Property name normalized to ASCII lowercase.
    pub property: String,
    /// Raw value trimmed of surrounding ASCII whitespace. May contain spaces.
    pub value: String,
}

/// Parse the value of a `style` attribute into a list of declarations.
///
/// Splits on `;`, then on the first `:`; trims ASCII whitespace, lowercases the
/// property and skips items with an empty property or value. `!important` is
/// stripped from the value.
pub fn parse_style_attribute(input: &str) -> Vec<Declaration> {
    if input.is_empty() {
        return Vec::new();
    }
    let mut out: Vec<Declaration> = Vec::new();
    for raw_item in input.split(';') {
        let item = raw_item.trim_matches(is_ascii_whitespace);
        if item.is_empty() {
            continue;
        }
        let Some((raw_prop, raw_value)) = item.split_once(':') else {
            continue;
        };
        let property_text = raw_prop.trim_matches(is_ascii_whitespace);
        let value_text = raw_value
            .trim_matches(is_ascii_whitespace)
            .trim_end_matches("!important")
            .trim_matches(is_ascii_whitespace);
        if property_text.is_empty() || value_text.is_empty() {
            continue;
        }
        out.push(Declaration {
            property: property_text.to_ascii_lowercase(),
            value: value_text.to_owned(),
        });
    }
    out
}

/// Parse into a map keyed by property name; the last duplicate wins.
pub fn parse_style_attribute_into_map(input: &str) -> HashMap<String, String> {
    let mut map: HashMap<String, String> = HashMap::new();
    for decl in parse_style_attribute(input) {
        map.insert(decl.property, decl.value);
    }
    map
}

/// Rewrite a style attribute with `property` set to `value`, keeping the other
/// declarations in their original order.
pub fn set_style_property(input: &str, property: &str, value: &str) -> String {
    let property_lc = property.to_ascii_lowercase();
    let mut declarations = parse_style_attribute(input);
    if let Some(existing) = declarations
        .iter_mut()
        .find(|decl| decl.property == property_lc)
    {
        value.clone_into(&mut existing.value);
    } else {
        declarations.push(Declaration {
            property: property_lc,
            value: value.to_owned(),
        });
    }
    join_declarations(&declarations)
}

/// Rewrite a style attribute without `property`.
pub fn remove_style_property(input: &str, property: &str) -> String {
    let property_lc = property.to_ascii_lowercase();
    let declarations: Vec<Declaration> = parse_style_attribute(input)
        .into_iter()
        .filter(|decl| decl.property != property_lc)
        .collect();
    join_declarations(&declarations)
}

fn join_declarations(declarations: &[Declaration]) -> String {
    let mut out = String::new();
    for decl in declarations {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(&decl.property);
        out.push_str(": ");
        out.push_str(&decl.value);
        out.push(';');
    }
    out
}

/// Parse a pixel length (`12px`, `12`, `-3.5px`).
pub fn parse_px(value: &str) -> Option<f64> {
    let trimmed = value.trim_matches(is_ascii_whitespace);
    let number = trimmed.strip_suffix("px").unwrap_or(trimmed);
    number.trim().parse::<f64>().ok().filter(|px| px.is_finite())
}

/// ASCII whitespace per CSS Syntax (TAB, LF, FF, CR, SPACE).
const fn is_ascii_whitespace(character: char) -> bool {
    matches!(
        character,
        '\u{0009}' | '\u{000A}' | '\u{000C}' | '\u{000D}' | '\u{0020}'
    )
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum Display {
    None,
    #[default]
    Block,
    Inline,
    Contents,
    Other,
}

impl Display {
    fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "none" => Self::None,
            "block" | "flex" | "grid" | "list-item" | "table" | "flow-root" => Self::Block,
            "inline" | "inline-block" | "inline-flex" | "inline-grid" => Self::Inline,
            "contents" => Self::Contents,
            _ => Self::Other,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Visible,
    Hidden,
    Collapse,
}

impl Visibility {
    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "visible" => Some(Self::Visible),
            "hidden" => Some(Self::Hidden),
            "collapse" => Some(Self::Collapse),
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum Position {
    #[default]
    Static,
    Relative,
    Absolute,
    Fixed,
    Sticky,
}

impl Position {
    fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "relative" => Self::Relative,
            "absolute" => Self::Absolute,
            "fixed" => Self::Fixed,
            "sticky" => Self::Sticky,
            _ => Self::Static,
        }
    }
}

/// The computed values the overlay reads (`getComputedStyle` subset).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ComputedStyle {
    pub display: Display,
    pub visibility: Visibility,
    pub opacity: f64,
    pub position: Position,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            display: Display::default(),
            visibility: Visibility::default(),
            opacity: 1.0,
            position: Position::default(),
        }
    }
}

/// Elements the user agent stylesheet hides.
const UA_HIDDEN: [&str; 9] = [
    "head", "script", "style", "meta", "link", "title", "template", "base", "noscript",
];

/// Elements the user agent stylesheet lays out inline.
const UA_INLINE: [&str; 12] = [
    "a", "span", "em", "strong", "b", "i", "img", "code", "small", "label", "button", "input",
];

impl DOM {
    /// Resolve the computed style subset for an element from the UA defaults,
    /// the `hidden` attribute and the inline `style` attribute. `visibility`
    /// inherits from the parent element.
    pub fn computed_style(&self, key: NodeKey) -> ComputedStyle {
        let Some(tag) = self.tag_name(key) else {
            return ComputedStyle::default();
        };
        let inherited = self
            .parent_element(key)
            .map_or(Visibility::Visible, |parent| self.computed_style(parent).visibility);

        let mut style = ComputedStyle {
            visibility: inherited,
            ..ComputedStyle::default()
        };
        if UA_HIDDEN.contains(&tag) || self.get_attribute(key, "hidden").is_some() {
            style.display = Display::None;
        } else if UA_INLINE.contains(&tag) {
            style.display = Display::Inline;
        }

        let declarations = self
            .get_attribute(key, "style")
            .map(parse_style_attribute_into_map)
            .unwrap_or_default();
        if let Some(value) = declarations.get("display") {
            style.display = Display::parse(value);
        }
        if let Some(value) = declarations.get("visibility").and_then(|raw| Visibility::parse(raw)) {
            style.visibility = value;
        }
        if let Some(value) = declarations.get("opacity") {
            style.opacity = parse_opacity(value).unwrap_or(style.opacity);
        }
        if let Some(value) = declarations.get("position") {
            style.position = Position::parse(value);
        }
        style
    }

    /// Value of one inline style property, if declared.
    pub fn inline_style_property(&self, key: NodeKey, property: &str) -> Option<String> {
        let style = self.get_attribute(key, "style")?;
        parse_style_attribute_into_map(style).remove(&property.to_ascii_lowercase())
    }
}

fn parse_opacity(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    let parsed = if let Some(percent) = trimmed.strip_suffix('%') {
        percent.trim().parse::<f64>().ok()? / 100.0
    } else {
        trimmed.parse::<f64>().ok()?
    };
    parsed.is_finite().then(|| parsed.clamp(0.0, 1.0))
}
