//! Structural element locators.
//!
//! A locator starts at an origin (the document body, or an element whose `id`
//! is unique in the document) and descends through `tag[index]` steps, where
//! the index counts earlier element siblings with the same tag name, starting
//! at 1. Overlay pins never count as siblings.
//!
//! Wire forms:
//! - `/html/body/div[2]/p[1]`
//! - `//*[@id="main"]`
//! - `//*[@id="main"]/ul[1]/li[3]`

use core::fmt;
use core::str::FromStr;
use std::error::Error;

use html::{DOM, NodeKey};

use crate::pins::is_pin;

/// Longest path [`compute`] will produce and [`Locator::from_str`] will accept.
pub const MAX_LOCATOR_DEPTH: usize = 256;

const BODY_PREFIX: &str = "/html/body";
const ID_PREFIX: &str = "//*[@id=\"";
const ID_SUFFIX: &str = "\"]";

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum LocatorOrigin {
    Body,
    Id(String),
}

/// One `tag[index]` step; `index` is 1-based.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Step {
    pub tag: String,
    pub index: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Locator {
    origin: LocatorOrigin,
    steps: Vec<Step>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LocatorError {
    /// The node is not an element.
    NotAnElement(NodeKey),
    /// The walk hit a missing parent before reaching `body` or an identified ancestor.
    Detached(NodeKey),
    /// The element sits deeper than [`MAX_LOCATOR_DEPTH`] below its origin.
    TooDeep,
}

impl fmt::Display for LocatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAnElement(key) => write!(f, "node {key} is not an element"),
            Self::Detached(key) => write!(f, "element {key} is not under body"),
            Self::TooDeep => write!(f, "element is more than {MAX_LOCATOR_DEPTH} levels deep"),
        }
    }
}

impl Error for LocatorError {}

/// A locator string that could not be parsed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseLocatorError(pub String);

impl fmt::Display for ParseLocatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed locator {:?}", self.0)
    }
}

impl Error for ParseLocatorError {}

impl Locator {
    pub const fn body() -> Self {
        Self {
            origin: LocatorOrigin::Body,
            steps: Vec::new(),
        }
    }

    pub fn id(id: &str) -> Self {
        Self {
            origin: LocatorOrigin::Id(id.to_owned()),
            steps: Vec::new(),
        }
    }

    #[must_use]
    pub fn child(mut self, tag: &str, index: usize) -> Self {
        self.steps.push(Step {
            tag: tag.to_ascii_lowercase(),
            index,
        });
        self
    }

    pub const fn origin(&self) -> &LocatorOrigin {
        &self.origin
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.origin {
            LocatorOrigin::Body => f.write_str(BODY_PREFIX)?,
            LocatorOrigin::Id(id) => write!(f, "{ID_PREFIX}{id}{ID_SUFFIX}")?,
        }
        for step in &self.steps {
            write!(f, "/{}[{}]", step.tag, step.index)?;
        }
        Ok(())
    }
}

fn parse_step(text: &str) -> Option<Step> {
    let (tag, rest) = text.split_once('[')?;
    let index = rest.strip_suffix(']')?.parse::<usize>().ok()?;
    let valid_tag = !tag.is_empty()
        && !tag
            .chars()
            .any(|character| matches!(character, '/' | '[' | ']') || character.is_whitespace());
    (valid_tag && index >= 1).then(|| Step {
        tag: tag.to_ascii_lowercase(),
        index,
    })
}

impl FromStr for Locator {
    type Err = ParseLocatorError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let malformed = || ParseLocatorError(input.to_owned());
        let (origin, rest) = if let Some(rest) = input.strip_prefix(BODY_PREFIX) {
            (LocatorOrigin::Body, rest)
        } else if let Some(quoted) = input.strip_prefix(ID_PREFIX) {
            let (id, rest) = quoted.split_once(ID_SUFFIX).ok_or_else(malformed)?;
            if id.is_empty() {
                return Err(malformed());
            }
            (LocatorOrigin::Id(id.to_owned()), rest)
        } else {
            return Err(malformed());
        };

        let steps = if rest.is_empty() {
            Vec::new()
        } else {
            rest.strip_prefix('/')
                .ok_or_else(malformed)?
                .split('/')
                .map(parse_step)
                .collect::<Option<Vec<_>>>()
                .ok_or_else(malformed)?
        };
        if steps.len() > MAX_LOCATOR_DEPTH {
            return Err(malformed());
        }
        Ok(Self { origin, steps })
    }
}

/// The element's `id` if it can serve as a locator origin: non-empty, free of
/// double quotes and carried by no other connected element.
fn unique_id(dom: &DOM, element: NodeKey) -> Option<&str> {
    let id = dom.get_attribute(element, "id")?;
    if id.is_empty() || id.contains('"') {
        return None;
    }
    (dom.elements_with_id(id) == [element]).then_some(id)
}

/// 1-based position among earlier element siblings with the same tag.
fn sibling_index(dom: &DOM, parent: NodeKey, element: NodeKey, tag: &str) -> usize {
    dom.element_children(parent)
        .into_iter()
        .filter(|sibling| !is_pin(dom, *sibling) && dom.tag_name(*sibling) == Some(tag))
        .take_while(|sibling| *sibling != element)
        .count()
        + 1
}

/// Compute the locator of an element as the tree stands now.
///
/// # Errors
/// Returns an error if the node is not an element, is not under `body` (and
/// has no identified ancestor), or sits too deep.
pub fn compute(dom: &DOM, element: NodeKey) -> Result<Locator, LocatorError> {
    if !dom.is_element(element) {
        return Err(LocatorError::NotAnElement(element));
    }
    let body = dom.body();
    let mut steps = Vec::new();
    let mut current = element;
    let origin = loop {
        if Some(current) == body {
            break LocatorOrigin::Body;
        }
        if let Some(id) = unique_id(dom, current) {
            break LocatorOrigin::Id(id.to_owned());
        }
        if steps.len() == MAX_LOCATOR_DEPTH {
            return Err(LocatorError::TooDeep);
        }
        let parent = dom
            .parent_element(current)
            .ok_or(LocatorError::Detached(element))?;
        let tag = dom.tag_name(current).unwrap_or_default();
        steps.push(Step {
            tag: tag.to_owned(),
            index: sibling_index(dom, parent, current, tag),
        });
        current = parent;
    };
    steps.reverse();
    Ok(Locator { origin, steps })
}

/// Find the element a locator points at, if it still exists.
///
/// Never mutates the tree and always terminates: each step descends one level.
pub fn resolve(dom: &DOM, locator: &Locator) -> Option<NodeKey> {
    let mut current = match &locator.origin {
        LocatorOrigin::Body => dom.body()?,
        LocatorOrigin::Id(id) => dom.get_element_by_id(id)?,
    };
    for step in &locator.steps {
        current = dom
            .element_children(current)
            .into_iter()
            .filter(|child| !is_pin(dom, *child) && dom.tag_name(*child) == Some(step.tag.as_str()))
            .nth(step.index.checked_sub(1)?)?;
    }
    Some(current)
}
