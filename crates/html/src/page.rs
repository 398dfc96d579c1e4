//! The page surface the overlay is attached to: document, viewport, session
//! history and the task queue that carries page events to whoever drives it.

use core::fmt;

use anyhow::Error;
use log::debug;
use once_cell::unsync::OnceCell;
use serde_json::Value;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use url::Url;

use crate::dom::{DOM, LayoutRect, NodeKey, Viewport};
use crate::parser::parse_html;

/// Callback invoked with the new location after a same-document navigation.
pub type NavigateCallback = Box<dyn FnMut(&Url)>;

/// Something that reports same-document navigations.
pub trait NavigationSource {
    /// Register a callback run after every navigation.
    fn on_navigate(&mut self, callback: NavigateCallback);
}

/// Session history of one browsing context.
///
/// `push_state`, `replace_state`, `back` and `forward` all notify the
/// registered navigation callbacks.
pub struct History {
    entries: Vec<Url>,
    index: usize,
    listeners: Vec<NavigateCallback>,
}

impl History {
    pub fn new(initial: Url) -> Self {
        Self {
            entries: vec![initial],
            index: 0,
            listeners: Vec::new(),
        }
    }

    /// The current entry.
    pub fn current(&self) -> &Url {
        &self.entries[self.index]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add an entry after the current one, dropping any forward entries.
    pub fn push_state(&mut self, url: Url) {
        self.entries.truncate(self.index + 1);
        self.entries.push(url);
        self.index = self.entries.len() - 1;
        self.notify();
    }

    /// Replace the current entry.
    pub fn replace_state(&mut self, url: Url) {
        self.entries[self.index] = url;
        self.notify();
    }

    /// Go back one entry (`popstate`). Returns false at the first entry.
    pub fn back(&mut self) -> bool {
        if self.index == 0 {
            return false;
        }
        self.index -= 1;
        self.notify();
        true
    }

    /// Go forward one entry (`popstate`). Returns false at the last entry.
    pub fn forward(&mut self) -> bool {
        if self.index + 1 >= self.entries.len() {
            return false;
        }
        self.index += 1;
        self.notify();
        true
    }

    fn notify(&mut self) {
        let url = self.entries[self.index].clone();
        debug!("history: navigated to {url}");
        for listener in &mut self.listeners {
            listener(&url);
        }
    }
}

impl NavigationSource for History {
    fn on_navigate(&mut self, callback: NavigateCallback) {
        self.listeners.push(callback);
    }
}

impl fmt::Debug for History {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("History")
            .field("entries", &self.entries)
            .field("index", &self.index)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// A task queued by the page for the event loop.
#[derive(Clone, Debug, PartialEq)]
pub enum PageEvent {
    /// A cross-document message (`postMessage`) from `origin`.
    Message { origin: String, data: Value },
    /// The viewport scrolled.
    Scroll,
    /// The viewport was resized.
    Resize,
    /// The document finished loading.
    Load,
    /// A primary-button click dispatched at `target`.
    Click {
        target: NodeKey,
        client_x: f64,
        client_y: f64,
    },
    /// A same-document navigation happened.
    Navigated(Url),
}

/// One document loaded in a browsing context.
pub struct Page {
    /// The document. Exposed directly since nearly every engine call edits it.
    pub dom: DOM,
    viewport: Viewport,
    history: History,
    embedded: bool,
    attachment: OnceCell<()>,
    tasks: UnboundedSender<PageEvent>,
    receiver: Option<UnboundedReceiver<PageEvent>>,
}

impl Page {
    /// Create a top-level page for an already built document.
    pub fn new(dom: DOM, url: Url) -> Self {
        let (tasks, receiver) = unbounded_channel();
        Self {
            dom,
            viewport: Viewport::default(),
            history: History::new(url),
            embedded: false,
            attachment: OnceCell::new(),
            tasks,
            receiver: Some(receiver),
        }
    }

    /// Parse `html` and create a page for it.
    ///
    /// # Errors
    /// Returns an error if the document cannot be parsed.
    pub fn from_html(html: &str, url: Url) -> Result<Self, Error> {
        Ok(Self::new(parse_html(html)?, url))
    }

    /// Mark the page as living inside a frame (`window.self !== window.top`).
    #[must_use]
    pub fn embedded(mut self, embedded: bool) -> Self {
        self.embedded = embedded;
        self
    }

    #[must_use]
    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self
    }

    pub const fn is_embedded(&self) -> bool {
        self.embedded
    }

    pub const fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn url(&self) -> &Url {
        self.history.current()
    }

    pub const fn history(&self) -> &History {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut History {
        &mut self.history
    }

    /// Claim the page for a single overlay. Returns false if it was already claimed.
    pub fn claim_attachment(&self) -> bool {
        self.attachment.set(()).is_ok()
    }

    pub fn is_attached(&self) -> bool {
        self.attachment.get().is_some()
    }

    /// A sender for queueing tasks onto this page.
    pub fn task_sender(&self) -> UnboundedSender<PageEvent> {
        self.tasks.clone()
    }

    /// Hand the task queue to the event loop. Only the first call gets it.
    pub fn take_task_receiver(&mut self) -> Option<UnboundedReceiver<PageEvent>> {
        self.receiver.take()
    }

    fn queue(&self, event: PageEvent) {
        if self.tasks.send(event).is_err() {
            debug!("page task queue closed, dropping event");
        }
    }

    /// Scroll the viewport to the given offsets (clamped at zero) and queue a scroll task.
    pub fn scroll_to(&mut self, x: f64, y: f64) {
        self.viewport.scroll_x = x.max(0.0);
        self.viewport.scroll_y = y.max(0.0);
        self.queue(PageEvent::Scroll);
    }

    /// Resize the viewport and queue a resize task.
    pub fn resize(&mut self, width: f64, height: f64) {
        self.viewport.width = width.max(0.0);
        self.viewport.height = height.max(0.0);
        self.queue(PageEvent::Resize);
    }

    /// Queue the load task.
    pub fn finish_load(&self) {
        self.queue(PageEvent::Load);
    }

    /// Deliver a message from another window.
    pub fn post_message(&self, origin: &str, data: Value) {
        self.queue(PageEvent::Message {
            origin: origin.to_owned(),
            data,
        });
    }

    /// Click the centre of an element's client rect.
    pub fn click(&self, target: NodeKey) {
        let LayoutRect {
            x,
            y,
            width,
            height,
        } = self.dom.bounding_client_rect(target, &self.viewport);
        self.queue(PageEvent::Click {
            target,
            client_x: x + width / 2.0,
            client_y: y + height / 2.0,
        });
    }

    /// Click at viewport coordinates; the target is found by hit testing and
    /// falls back to the document element. Returns the target, if any.
    pub fn click_at(&self, client_x: f64, client_y: f64) -> Option<NodeKey> {
        let target = self
            .dom
            .hit_test(&self.viewport, client_x, client_y)
            .or_else(|| self.dom.document_element())?;
        self.queue(PageEvent::Click {
            target,
            client_x,
            client_y,
        });
        Some(target)
    }

    /// Assign layout boxes from inline geometry for the current viewport.
    pub fn layout_from_inline_styles(&mut self) {
        let viewport = self.viewport;
        self.dom.apply_inline_geometry(&viewport);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    fn url(path: &str) -> Url {
        Url::parse("https://site.test/").unwrap().join(path).unwrap()
    }

    #[test]
    fn history_notifies_every_navigation() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let mut history = History::new(url("/"));
        history.on_navigate(Box::new(move |location| {
            sink.borrow_mut().push(location.path().to_owned());
        }));

        history.push_state(url("/a"));
        history.push_state(url("/b"));
        history.replace_state(url("/c"));
        assert!(history.back());
        assert!(history.forward());
        assert!(!history.forward());

        assert_eq!(*seen.borrow(), ["/a", "/b", "/c", "/a", "/c"]);
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn push_state_drops_forward_entries() {
        let mut history = History::new(url("/"));
        history.push_state(url("/a"));
        history.push_state(url("/b"));
        history.back();
        history.back();
        history.push_state(url("/x"));
        assert_eq!(history.len(), 2);
        assert_eq!(history.current().path(), "/x");
        assert!(!history.forward());
    }

    #[test]
    fn attachment_claimed_once() {
        let page = Page::from_html("<p>hi</p>", url("/")).unwrap();
        assert!(!page.is_attached());
        assert!(page.claim_attachment());
        assert!(!page.claim_attachment());
        assert!(page.is_attached());
    }

    #[test]
    fn page_actions_queue_tasks_in_order() {
        let mut page = Page::from_html(
            r#"<body style="width: 800px; height: 2000px">
                 <div id="box" style="top: 100px; width: 200px; height: 50px"></div>
               </body>"#,
            url("/"),
        )
        .unwrap()
        .with_viewport(Viewport::new(800.0, 600.0));
        page.layout_from_inline_styles();
        let mut tasks = page.take_task_receiver().unwrap();
        assert!(page.take_task_receiver().is_none());

        page.scroll_to(0.0, 40.0);
        let target = page.dom.get_element_by_id("box").unwrap();
        page.click(target);
        assert_eq!(page.click_at(10.0, 70.0), Some(target));
        page.post_message("https://host.test", Value::Null);

        assert_eq!(tasks.try_recv().unwrap(), PageEvent::Scroll);
        assert_eq!(
            tasks.try_recv().unwrap(),
            PageEvent::Click {
                target,
                client_x: 100.0,
                client_y: 85.0,
            }
        );
        assert!(matches!(tasks.try_recv().unwrap(), PageEvent::Click { .. }));
        assert!(matches!(tasks.try_recv().unwrap(), PageEvent::Message { .. }));
        assert!(tasks.try_recv().is_err());
    }
}
