//! Session scripts: one JSON object per line, each a host message or a page
//! action. Blank lines and lines starting with `#` are skipped.
//!
//! ```text
//! {"step": "host", "message": {"type": "SET_MODE", "payload": {"mode": "interactive"}}}
//! {"step": "click", "id": "hero"}
//! {"step": "scroll", "x": 0, "y": 400}
//! ```

use anyhow::{Context as _, Result, bail};
use html::{NodeKey, Page};
use log::{debug, info};
use overlay::{HostPort, Locator, OverlayRuntime, resolve};
use serde::Deserialize;
use serde_json::Value;
use url::Url;

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case", deny_unknown_fields)]
pub enum Step {
    /// A `postMessage` from the host window, or from `origin` if given.
    Host {
        message: Value,
        #[serde(default)]
        origin: Option<String>,
    },
    Scroll { x: f64, y: f64 },
    Resize { width: f64, height: f64 },
    /// Click the centre of an element found by id or locator.
    Click {
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        locator: Option<String>,
    },
    /// Click at viewport coordinates.
    ClickAt { x: f64, y: f64 },
    Navigate {
        url: String,
        #[serde(default)]
        replace: bool,
    },
    Back,
    Forward,
    Load,
    SetAttribute { id: String, name: String, value: String },
    Remove { id: String },
}

/// Parse a whole script.
///
/// # Errors
/// Returns an error naming the first line that is not a valid step.
pub fn parse_script(text: &str) -> Result<Vec<Step>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| {
            let trimmed = line.trim();
            !trimmed.is_empty() && !trimmed.starts_with('#')
        })
        .map(|(index, line)| {
            serde_json::from_str(line).with_context(|| format!("session line {}", index + 1))
        })
        .collect()
}

fn element_by_id(page: &Page, id: &str) -> Result<NodeKey> {
    page.dom
        .get_element_by_id(id)
        .with_context(|| format!("no element with id {id:?}"))
}

fn parse_url(page: &Page, url: &str) -> Result<Url> {
    page.url()
        .join(url)
        .with_context(|| format!("invalid url {url:?}"))
}

impl Step {
    /// Perform the step against the runtime's page. Tasks it queues run on
    /// the next pump.
    ///
    /// # Errors
    /// Returns an error if the step names an element or URL that does not exist.
    pub fn apply<P: HostPort>(
        self,
        runtime: &mut OverlayRuntime<P>,
        host_origin: &str,
    ) -> Result<()> {
        debug!("step {self:?}");
        let page = runtime.page_mut();
        match self {
            Self::Host { message, origin } => {
                page.post_message(origin.as_deref().unwrap_or(host_origin), message);
            }
            Self::Scroll { x, y } => page.scroll_to(x, y),
            Self::Resize { width, height } => {
                page.resize(width, height);
                page.layout_from_inline_styles();
            }
            Self::Click { id, locator } => {
                let target = match (id, locator) {
                    (Some(id), None) => element_by_id(page, &id)?,
                    (None, Some(wire)) => {
                        let locator: Locator = wire
                            .parse()
                            .with_context(|| format!("bad locator {wire:?}"))?;
                        resolve(&page.dom, &locator)
                            .with_context(|| format!("{wire} does not resolve"))?
                    }
                    _ => bail!("click needs exactly one of `id` or `locator`"),
                };
                page.click(target);
            }
            Self::ClickAt { x, y } => {
                if page.click_at(x, y).is_none() {
                    bail!("nothing to click at ({x}, {y})");
                }
            }
            Self::Navigate { url, replace } => {
                let target = parse_url(page, &url)?;
                if replace {
                    page.history_mut().replace_state(target);
                } else {
                    page.history_mut().push_state(target);
                }
            }
            Self::Back => {
                if !page.history_mut().back() {
                    info!("history is already at its first entry");
                }
            }
            Self::Forward => {
                if !page.history_mut().forward() {
                    info!("history is already at its last entry");
                }
            }
            Self::Load => page.finish_load(),
            Self::SetAttribute { id, name, value } => {
                let element = element_by_id(page, &id)?;
                page.dom.set_attribute(element, &name, &value)?;
                page.layout_from_inline_styles();
            }
            Self::Remove { id } => {
                let element = element_by_id(page, &id)?;
                page.dom.remove_node(element)?;
                page.layout_from_inline_styles();
            }
        }
        Ok(())
    }
}
