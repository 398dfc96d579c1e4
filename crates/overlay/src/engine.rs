//! The overlay engine: the working comment set plus the handlers the page's
//! task queue drives.

use core::fmt;
use std::collections::HashMap;
use std::error::Error;

use html::style::{remove_style_property, set_style_property};
use html::{DOM, DOMUpdate, NavigationSource as _, NodeKey, Page, PageEvent};
use log::{debug, info, trace, warn};
use overlay_protocol::{
    CommentCapture, CommentId, CommentSelected, DomSnapshot, Empty, EngineMessage, HostMessage,
    LoadCommentsPayload, Mode, Point, UrlChange, VisibilityDelta,
};
use serde_json::Value;
use tokio::time::Instant;
use url::Url;

use crate::anchor::{Anchor, RelativePoint, box_rect};
use crate::channel::{HostPort, MessageChannel};
use crate::config::OverlayConfig;
use crate::locator::{compute, resolve};
use crate::pins::{PinRenderer, PinTarget, RenderReport};
use crate::snapshot::dom_snapshot;
use crate::visibility::{Visibility, classify, is_visible};
use crate::watcher::{ChangeWatcher, Trigger, record_visibility};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttachError {
    /// The page is not inside a frame.
    NotEmbedded,
    /// An overlay is already attached to this page.
    AlreadyAttached,
}

impl fmt::Display for AttachError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotEmbedded => f.write_str("page is not embedded in a frame"),
            Self::AlreadyAttached => f.write_str("an overlay is already attached to this page"),
        }
    }
}

impl Error for AttachError {}

/// What happened to a click.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClickOutcome {
    /// Not ours: the page handles it as usual.
    PassThrough,
    /// A pin was clicked; the host was told and the page never sees the click.
    PinSelected(CommentId),
    /// A new comment capture was sent to the host.
    Captured,
    /// Interactive mode consumed the click but the target cannot be anchored.
    Rejected,
}

impl ClickOutcome {
    /// Whether the page's own handlers should be kept from seeing the click.
    pub const fn is_consumed(&self) -> bool {
        !matches!(self, Self::PassThrough)
    }
}

/// Summary of one reconciliation pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PassReport {
    pub delta: VisibilityDelta,
    pub visible: usize,
    pub hidden: usize,
    /// Anchors left out because they belong to another page.
    pub other_page: usize,
    pub render: RenderReport,
}

pub struct Overlay<P: HostPort> {
    channel: MessageChannel<P>,
    renderer: PinRenderer,
    watcher: ChangeWatcher,
    anchors: Vec<Anchor>,
    mode: Mode,
    highlighted: Option<CommentId>,
    require_embedded: bool,
    attached: bool,
}

impl<P: HostPort> Overlay<P> {
    pub fn new(config: &OverlayConfig, port: P) -> Self {
        Self {
            channel: MessageChannel::new(config.host_origin.clone(), port),
            renderer: PinRenderer::new(
                f64::from(config.pin_size),
                f64::from(config.pin_size_highlighted),
            ),
            watcher: ChangeWatcher::new(config.debounce()),
            anchors: Vec::new(),
            mode: Mode::Passive,
            highlighted: None,
            require_embedded: config.require_embedded,
            attached: false,
        }
    }

    pub const fn mode(&self) -> Mode {
        self.mode
    }

    pub const fn highlighted(&self) -> Option<&CommentId> {
        self.highlighted.as_ref()
    }

    /// The working comment set, in the order the host sent it.
    pub fn anchors(&self) -> &[Anchor] {
        &self.anchors
    }

    pub const fn watcher(&self) -> &ChangeWatcher {
        &self.watcher
    }

    pub const fn renderer(&self) -> &PinRenderer {
        &self.renderer
    }

    pub const fn channel(&self) -> &MessageChannel<P> {
        &self.channel
    }

    pub fn port_mut(&mut self) -> &mut P {
        self.channel.port_mut()
    }

    /// Hook the overlay into a page: claim it, listen for navigations,
    /// start observing mutations and greet the host.
    ///
    /// # Errors
    /// Returns an error if the page is not framed (unless the config allows
    /// it) or another overlay already claimed it.
    pub fn attach(&mut self, page: &mut Page) -> Result<(), AttachError> {
        if self.require_embedded && !page.is_embedded() {
            return Err(AttachError::NotEmbedded);
        }
        if !page.claim_attachment() {
            return Err(AttachError::AlreadyAttached);
        }

        let tasks = page.task_sender();
        page.history_mut().on_navigate(Box::new(move |url: &Url| {
            if tasks.send(PageEvent::Navigated(url.clone())).is_err() {
                debug!("page task queue closed, navigation to {url} not delivered");
            }
        }));
        page.dom.observe();
        self.attached = true;

        self.post_scroll(page);
        self.post_url(page.url());
        self.channel.send(EngineMessage::IframeReady(Empty {}));
        info!("annotation overlay attached to {}", page.url());
        Ok(())
    }

    pub const fn is_attached(&self) -> bool {
        self.attached
    }

    fn post_scroll(&mut self, page: &Page) {
        let viewport = page.viewport();
        self.channel.send(EngineMessage::IframeScroll(Point::new(
            viewport.scroll_x,
            viewport.scroll_y,
        )));
    }

    fn post_url(&mut self, url: &Url) {
        self.channel.send(EngineMessage::IframeUrlChange(UrlChange {
            url: url.to_string(),
        }));
    }

    /// Handle a `message` event. Untrusted or malformed data is dropped.
    pub fn handle_message(&mut self, page: &mut Page, origin: &str, data: Value, now: Instant) {
        let Some(message) = self.channel.receive(origin, data) else {
            return;
        };
        match message {
            HostMessage::SetMode(payload) => self.set_mode(&mut page.dom, payload.mode),
            HostMessage::LoadComments(payload) => self.load_comments(payload, now),
            HostMessage::HighlightComment(payload) => self.highlight(page, payload.id),
            HostMessage::RequestDomSnapshot => {
                let html = dom_snapshot(page);
                debug!("sending DOM snapshot ({} bytes)", html.len());
                self.channel
                    .send(EngineMessage::DomSnapshotData(DomSnapshot { html }));
            }
        }
    }

    fn set_mode(&mut self, dom: &mut DOM, mode: Mode) {
        info!("mode set to {mode}");
        self.mode = mode;
        let Some(body) = dom.body() else {
            return;
        };
        let mut paused = dom.pause_observer();
        let current = paused.get_attribute(body, "style").unwrap_or_default().to_owned();
        let updated = match mode {
            Mode::Interactive => set_style_property(&current, "cursor", "crosshair"),
            Mode::Passive => remove_style_property(&current, "cursor"),
        };
        let result = if updated.is_empty() {
            paused.remove_attribute(body, "style").map(|_| ())
        } else {
            paused.set_attribute(body, "style", &updated)
        };
        if let Err(err) = result {
            warn!("could not update body cursor: {err}");
        }
    }

    fn load_comments(&mut self, payload: LoadCommentsPayload, now: Instant) {
        let previous: HashMap<CommentId, Option<bool>> = self
            .anchors
            .drain(..)
            .map(|anchor| (anchor.id, anchor.last_known_visible))
            .collect();
        for record in &payload.comments {
            match Anchor::from_record(record) {
                Ok(mut anchor) => {
                    if anchor.last_known_visible.is_none() {
                        anchor.last_known_visible =
                            previous.get(&anchor.id).copied().flatten();
                    }
                    self.anchors.push(anchor);
                }
                Err(err) => warn!("comment {} dropped: {err}", record.id),
            }
        }
        self.highlighted = payload.highlighted_id;
        info!(
            "loaded {} of {} comments",
            self.anchors.len(),
            payload.comments.len() + payload.skipped
        );
        self.watcher.schedule(Trigger::CommentsLoaded, now);
    }

    /// Redraw right away with the last known visibility; no reclassification.
    fn highlight(&mut self, page: &mut Page, id: Option<CommentId>) {
        debug!(
            "highlight {}",
            id.as_ref().map_or_else(|| "cleared".to_owned(), ToString::to_string)
        );
        self.highlighted = id;
        let viewport = *page.viewport();
        let url = page.url().clone();
        let mut paused = page.dom.pause_observer();
        let targets: Vec<PinTarget> = self
            .anchors
            .iter()
            .filter(|anchor| anchor.last_known_visible == Some(true) && anchor.matches_page(&url))
            .map(|anchor| PinTarget {
                id: anchor.id.clone(),
                element: resolve(&paused, &anchor.locator),
                relative: anchor.relative(),
            })
            .collect();
        self.renderer
            .render(&mut paused, &viewport, &targets, self.highlighted.as_ref());
    }

    /// Handle a primary-button click at client coordinates.
    pub fn on_click(
        &mut self,
        page: &Page,
        target: NodeKey,
        client_x: f64,
        client_y: f64,
    ) -> ClickOutcome {
        if let Some(id) = self.renderer.pin_at(&page.dom, target) {
            debug!("pin {id} selected");
            self.channel
                .send(EngineMessage::CommentSelected(CommentSelected { id: id.clone() }));
            return ClickOutcome::PinSelected(id);
        }
        if self.mode == Mode::Passive {
            return ClickOutcome::PassThrough;
        }

        let rect = page.dom.bounding_client_rect(target, page.viewport());
        let offset = Point::new(client_x, client_y);
        let capture_box = box_rect(rect);
        if let Err(err) = RelativePoint::from_capture(offset, capture_box) {
            debug!("capture on {target} rejected: {err}");
            return ClickOutcome::Rejected;
        }
        let locator = match compute(&page.dom, target) {
            Ok(locator) => locator,
            Err(err) => {
                warn!("capture on {target} rejected: {err}");
                return ClickOutcome::Rejected;
            }
        };
        let was_visible = is_visible(&page.dom, Some(target));
        info!("captured new comment at {locator}");
        self.channel
            .send(EngineMessage::NewCommentCapture(CommentCapture {
                locator: locator.to_string(),
                page_url: page.url().to_string(),
                capture_offset: offset,
                capture_box,
                was_visible_at_capture: was_visible,
            }));
        ClickOutcome::Captured
    }

    pub fn on_scroll(&mut self, page: &Page, now: Instant) {
        self.post_scroll(page);
        self.watcher.schedule(Trigger::Scroll, now);
    }

    pub fn on_resize(&mut self, now: Instant) {
        self.watcher.schedule(Trigger::Resize, now);
    }

    pub fn on_load(&mut self, page: &Page, now: Instant) {
        self.post_url(page.url());
        self.watcher.schedule(Trigger::Load, now);
    }

    pub fn on_navigated(&mut self, url: &Url, now: Instant) {
        self.post_url(url);
        self.watcher.schedule(Trigger::Navigation, now);
    }

    pub fn on_mutations(&mut self, records: &[DOMUpdate], now: Instant) {
        self.watcher.on_mutations(records, now);
    }

    /// Run the pending pass if its deadline has passed.
    pub fn poll(&mut self, page: &mut Page, now: Instant) -> Option<PassReport> {
        self.watcher.is_due(now).then(|| self.reconcile(page))
    }

    /// One reconciliation pass: resolve and classify every anchor of the
    /// current page, redraw the pins and report what changed.
    pub fn reconcile(&mut self, page: &mut Page) -> PassReport {
        let coalesced = self.watcher.begin_pass();
        let viewport = *page.viewport();
        let url = page.url().clone();
        let mut report = PassReport::default();
        let mut targets = Vec::new();
        {
            let mut paused = page.dom.pause_observer();
            for anchor in &mut self.anchors {
                if !anchor.matches_page(&url) {
                    report.other_page += 1;
                    continue;
                }
                let element = resolve(&paused, &anchor.locator);
                let visibility = classify(&paused, element);
                trace!("comment {} at {}: {visibility:?}", anchor.id, anchor.locator);
                record_visibility(anchor, visibility.is_visible(), &mut report.delta);
                if visibility == Visibility::Visible {
                    report.visible += 1;
                    targets.push(PinTarget {
                        id: anchor.id.clone(),
                        element,
                        relative: anchor.relative(),
                    });
                } else {
                    report.hidden += 1;
                }
            }
            report.render = self.renderer.render(
                &mut paused,
                &viewport,
                &targets,
                self.highlighted.as_ref(),
            );
        }
        self.watcher.finish_pass();

        debug!(
            "pass {}: {} visible, {} hidden, {} pins, {} triggers coalesced",
            self.watcher.passes(),
            report.visible,
            report.hidden,
            report.render.rendered.len(),
            coalesced
        );
        if !report.delta.is_empty() {
            self.channel
                .send(EngineMessage::VisibilityDelta(report.delta.clone()));
        }
        report
    }

    /// Serialize the current document for the host.
    pub fn snapshot(&self, page: &Page) -> String {
        dom_snapshot(page)
    }
}
