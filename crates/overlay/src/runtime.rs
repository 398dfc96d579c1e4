//! Drives an [`Overlay`] from a page's task queue on a tokio runtime.

use anyhow::{Context as _, Result};
use html::{Page, PageEvent};
use log::trace;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{Instant, sleep_until};

use crate::channel::HostPort;
use crate::engine::{ClickOutcome, Overlay, PassReport};

/// What one or more pumps did.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PumpReport {
    /// Page tasks dispatched.
    pub handled: usize,
    pub clicks: Vec<ClickOutcome>,
    pub passes: Vec<PassReport>,
}

impl PumpReport {
    fn merge(&mut self, other: Self) {
        self.handled += other.handled;
        self.clicks.extend(other.clicks);
        self.passes.extend(other.passes);
    }
}

pub struct OverlayRuntime<P: HostPort> {
    page: Page,
    overlay: Overlay<P>,
    tasks: UnboundedReceiver<PageEvent>,
}

impl<P: HostPort> OverlayRuntime<P> {
    /// Take over the page's task queue and attach the overlay.
    ///
    /// # Errors
    /// Returns an error if the queue was already taken or attaching fails.
    pub fn new(mut page: Page, mut overlay: Overlay<P>) -> Result<Self> {
        let tasks = page
            .take_task_receiver()
            .context("page task queue is already driven elsewhere")?;
        overlay
            .attach(&mut page)
            .context("failed to attach the overlay")?;
        Ok(Self {
            page,
            overlay,
            tasks,
        })
    }

    pub const fn page(&self) -> &Page {
        &self.page
    }

    pub fn page_mut(&mut self) -> &mut Page {
        &mut self.page
    }

    pub const fn overlay(&self) -> &Overlay<P> {
        &self.overlay
    }

    pub fn overlay_mut(&mut self) -> &mut Overlay<P> {
        &mut self.overlay
    }

    /// Dispatch every queued task, deliver mutation records after each one
    /// and run the pending pass if it is due at `now`.
    pub fn pump(&mut self, now: Instant) -> PumpReport {
        let mut report = PumpReport::default();
        self.deliver_mutations(now);
        while let Ok(event) = self.tasks.try_recv() {
            report.handled += 1;
            if let Some(outcome) = self.dispatch(event, now) {
                report.clicks.push(outcome);
            }
            self.deliver_mutations(now);
        }
        report.passes.extend(self.overlay.poll(&mut self.page, now));
        report
    }

    fn deliver_mutations(&mut self, now: Instant) {
        let records = self.page.dom.take_records();
        self.overlay.on_mutations(&records, now);
    }

    fn dispatch(&mut self, event: PageEvent, now: Instant) -> Option<ClickOutcome> {
        trace!("dispatching {event:?}");
        match event {
            PageEvent::Message { origin, data } => {
                self.overlay
                    .handle_message(&mut self.page, &origin, data, now);
            }
            PageEvent::Scroll => self.overlay.on_scroll(&self.page, now),
            PageEvent::Resize => self.overlay.on_resize(now),
            PageEvent::Load => self.overlay.on_load(&self.page, now),
            PageEvent::Navigated(url) => self.overlay.on_navigated(&url, now),
            PageEvent::Click {
                target,
                client_x,
                client_y,
            } => {
                return Some(
                    self.overlay
                        .on_click(&self.page, target, client_x, client_y),
                );
            }
        }
        None
    }

    /// Pump until no tasks are queued and no pass is pending, sleeping until
    /// each pending deadline.
    pub async fn run_until_idle(&mut self) -> PumpReport {
        let mut total = PumpReport::default();
        loop {
            total.merge(self.pump(Instant::now()));
            match self.overlay.watcher().deadline() {
                Some(deadline) => sleep_until(deadline).await,
                None => return total,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use core::time::Duration;

    use html::Viewport;
    use overlay_protocol::{CommentId, EngineMessage, VisibilityDelta};
    use serde_json::json;
    use url::Url;

    use super::*;
    use crate::channel::RecordingPort;
    use crate::config::OverlayConfig;

    const HOST: &str = "http://localhost:5173";

    fn runtime() -> OverlayRuntime<RecordingPort> {
        let mut page = Page::from_html(
            r#"<body><div id="card" style="width: 200px; height: 100px">Card</div></body>"#,
            Url::parse("http://localhost:3000/").unwrap(),
        )
        .unwrap()
        .embedded(true)
        .with_viewport(Viewport::new(800.0, 600.0));
        page.layout_from_inline_styles();
        let overlay = Overlay::new(&OverlayConfig::default(), RecordingPort::default());
        let mut runtime = OverlayRuntime::new(page, overlay).unwrap();
        runtime.overlay_mut().port_mut().take();
        runtime
    }

    fn load_card_comment(runtime: &OverlayRuntime<RecordingPort>) {
        runtime.page().post_message(
            HOST,
            json!({"type": "LOAD_COMMENTS", "payload": {"comments": [{
                "id": 1,
                "locator": "//*[@id=\"card\"]",
                "captureOffset": {"x": 50.0, "y": 50.0},
                "captureBox": {"left": 0.0, "top": 0.0, "width": 200.0, "height": 100.0},
                "pageKey": "http://localhost:3000/"
            }]}}),
        );
    }

    #[tokio::test(start_paused = true)]
    async fn loading_comments_runs_one_debounced_pass() {
        let mut runtime = runtime();
        let start = Instant::now();
        load_card_comment(&runtime);

        let report = runtime.run_until_idle().await;
        assert_eq!(report.handled, 1);
        assert_eq!(report.passes.len(), 1);
        assert!(start.elapsed() >= Duration::from_millis(150));
        assert_eq!(
            runtime.overlay_mut().port_mut().take(),
            [EngineMessage::VisibilityDelta(VisibilityDelta {
                became_visible: vec![CommentId::Number(1)],
                became_hidden: Vec::new(),
            })]
        );
        assert_eq!(runtime.overlay().renderer().pin_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn page_mutations_trigger_a_pass_but_pins_do_not() {
        let mut runtime = runtime();
        load_card_comment(&runtime);
        runtime.run_until_idle().await;
        runtime.overlay_mut().port_mut().take();

        let idle = runtime.run_until_idle().await;
        assert!(idle.passes.is_empty());

        let card = runtime.page().dom.get_element_by_id("card").unwrap();
        runtime
            .page_mut()
            .dom
            .set_attribute(card, "style", "display: none")
            .unwrap();
        let report = runtime.run_until_idle().await;
        assert_eq!(report.passes.len(), 1);
        assert_eq!(
            runtime.overlay_mut().port_mut().take(),
            [EngineMessage::VisibilityDelta(VisibilityDelta {
                became_visible: Vec::new(),
                became_hidden: vec![CommentId::Number(1)],
            })]
        );
        assert_eq!(runtime.overlay().renderer().pin_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn navigation_reports_the_new_url() {
        let mut runtime = runtime();
        runtime
            .page_mut()
            .history_mut()
            .push_state(Url::parse("http://localhost:3000/work").unwrap());
        let report = runtime.run_until_idle().await;
        assert_eq!(report.passes.len(), 1);
        let messages = runtime.overlay_mut().port_mut().take();
        assert_eq!(messages[0].kind(), "iframe-url-change");
        assert_eq!(messages[0].to_value()["payload"]["url"], "http://localhost:3000/work");
    }

    #[tokio::test(start_paused = true)]
    async fn load_reports_the_url_and_runs_one_pass() {
        let mut runtime = runtime();
        load_card_comment(&runtime);
        runtime.run_until_idle().await;
        runtime.overlay_mut().port_mut().take();

        runtime.page_mut().finish_load();
        let report = runtime.run_until_idle().await;
        assert_eq!(report.handled, 1);
        assert_eq!(report.passes.len(), 1);
        let messages = runtime.overlay_mut().port_mut().take();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].kind(), "iframe-url-change");
        assert_eq!(messages[0].to_value()["payload"]["url"], "http://localhost:3000/");
        assert_eq!(runtime.overlay().renderer().pin_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn bursts_of_scrolls_coalesce() {
        let mut runtime = runtime();
        for offset in 1..=5 {
            runtime.page_mut().scroll_to(0.0, f64::from(offset) * 10.0);
        }
        let report = runtime.run_until_idle().await;
        assert_eq!(report.handled, 5);
        assert_eq!(report.passes.len(), 1);
        let scrolls = runtime
            .overlay_mut()
            .port_mut()
            .take()
            .iter()
            .filter(|message| message.kind() == "iframe-scroll")
            .count();
        assert_eq!(scrolls, 5);
    }
}
