//! Headless host for the annotation overlay.
//!
//! Loads an HTML file into the page model, attaches the overlay as if the
//! page were framed by the host application, replays a session script and
//! prints every message the overlay posts back as a JSON line on stdout.

#![allow(
    clippy::missing_docs_in_private_items,
    reason = "Internal implementation details don't need public documentation"
)]

mod port;
mod session;

use std::fs;
use std::io::{self, Read as _, Write};
use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{ArgAction, Parser};
use html::{Page, Viewport};
use log::info;
use overlay::{Overlay, OverlayConfig, OverlayRuntime};
use overlay_protocol::HostOrigin;
use tokio::runtime::Builder;
use url::Url;

use crate::port::JsonLinesPort;
use crate::session::parse_script;

#[derive(Parser, Debug)]
#[command(
    name = "overlay-harness",
    version,
    about = "Replay a host session against an HTML page with the annotation overlay attached"
)]
struct Cli {
    /// HTML file to load
    page: PathBuf,
    /// JSON-lines session script (stdin when omitted)
    script: Option<PathBuf>,
    /// Origin the overlay trusts; overrides OVERLAY_HOST_ORIGIN
    #[arg(long)]
    host_origin: Option<String>,
    /// Location the page is served from
    #[arg(long, default_value = "http://localhost:3000/")]
    url: String,
    #[arg(long, default_value_t = 1024.0)]
    width: f64,
    #[arg(long, default_value_t = 768.0)]
    height: f64,
    /// Debounce period in milliseconds; overrides OVERLAY_DEBOUNCE_MS
    #[arg(long)]
    debounce_ms: Option<u64>,
    /// Load the page as a top-level document instead of inside a frame
    #[arg(long, action = ArgAction::SetTrue)]
    top_level: bool,
}

impl Cli {
    fn config(&self) -> Result<OverlayConfig> {
        let mut config = OverlayConfig::from_env();
        if let Some(origin) = &self.host_origin {
            config.host_origin = HostOrigin::parse(origin)
                .with_context(|| format!("invalid host origin {origin:?}"))?;
        }
        if let Some(debounce_ms) = self.debounce_ms {
            config = config.with_debounce_ms(debounce_ms);
        }
        Ok(config)
    }

    fn load_page(&self) -> Result<Page> {
        let html = fs::read_to_string(&self.page)
            .with_context(|| format!("failed to read {}", self.page.display()))?;
        let url =
            Url::parse(&self.url).with_context(|| format!("invalid page url {:?}", self.url))?;
        let mut page = Page::from_html(&html, url)?
            .embedded(!self.top_level)
            .with_viewport(Viewport::new(self.width, self.height));
        page.layout_from_inline_styles();
        Ok(page)
    }

    fn read_script(&self) -> Result<String> {
        match &self.script {
            Some(path) => fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display())),
            None => {
                let mut text = String::new();
                io::stdin()
                    .read_to_string(&mut text)
                    .context("failed to read the session from stdin")?;
                Ok(text)
            }
        }
    }
}

/// Run a whole session, writing outbound messages to `out`.
async fn run<W: Write>(cli: &Cli, out: W) -> Result<()> {
    let config = cli.config()?;
    let steps = parse_script(&cli.read_script()?)?;
    let page = cli.load_page()?;
    let host_origin = config.host_origin.as_str().to_owned();

    let overlay = Overlay::new(&config, JsonLinesPort::new(out));
    let mut runtime = OverlayRuntime::new(page, overlay)?;
    runtime.run_until_idle().await;
    let total = steps.len();
    for (index, step) in steps.into_iter().enumerate() {
        step.apply(&mut runtime, &host_origin)
            .with_context(|| format!("step {} of {total} failed", index + 1))?;
        runtime.run_until_idle().await;
    }
    info!(
        "session finished: {total} steps, {} messages posted",
        runtime.overlay().channel().port().written()
    );
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let runtime = Builder::new_current_thread()
        .enable_time()
        .build()
        .context("failed to start the runtime")?;
    runtime.block_on(run(&cli, io::stdout().lock()))
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};
    use tempfile::TempDir;

    use super::*;

    const PAGE: &str = r#"<html><head><title>Work</title></head><body>
      <h1 id="hero" style="left: 40px; top: 40px; width: 400px; height: 80px">Work</h1>
    </body></html>"#;

    fn cli(dir: &TempDir, script: &str) -> Cli {
        let page = dir.path().join("index.html");
        fs::write(&page, PAGE).unwrap();
        let script_path = dir.path().join("session.jsonl");
        fs::write(&script_path, script).unwrap();
        Cli::parse_from([
            "overlay-harness",
            page.to_str().unwrap(),
            script_path.to_str().unwrap(),
            "--host-origin",
            "http://localhost:5173",
        ])
    }

    async fn replay(script: &str) -> Vec<Value> {
        let dir = TempDir::new().unwrap();
        let cli = cli(&dir, script);
        let mut out = Vec::new();
        run(&cli, &mut out).await.unwrap();
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    fn kinds(lines: &[Value]) -> Vec<&str> {
        lines
            .iter()
            .filter_map(|line| line["type"].as_str())
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn capture_session() {
        let lines = replay(
            r#"{"step": "host", "message": {"type": "SET_MODE", "payload": {"mode": "interactive"}}}
{"step": "click", "id": "hero"}"#,
        )
        .await;
        assert_eq!(
            kinds(&lines),
            ["iframe-scroll", "iframe-url-change", "iframe-ready", "new-comment-capture"]
        );
        let capture = &lines[3];
        assert_eq!(capture["targetOrigin"], "http://localhost:5173");
        assert_eq!(capture["payload"]["locator"], r#"//*[@id="hero"]"#);
        assert_eq!(capture["payload"]["captureOffset"]["x"], 240.0);
    }

    #[tokio::test(start_paused = true)]
    async fn comment_session_reports_visibility() {
        let lines = replay(
            r#"{"step": "host", "message": {"type": "LOAD_COMMENTS", "payload": {"comments": [{"id": 7, "locator": "//*[@id=\"hero\"]", "captureOffset": {"x": 140, "y": 60}, "captureBox": {"left": 40, "top": 40, "width": 400, "height": 80}}]}}}
{"step": "navigate", "url": "/about"}
{"step": "remove", "id": "hero"}"#,
        )
        .await;
        let deltas: Vec<&Value> = lines
            .iter()
            .filter(|line| line["type"] == "visibility-delta")
            .collect();
        assert_eq!(deltas.len(), 2);
        assert_eq!(deltas[0]["payload"]["becameVisible"], json!([7]));
        assert_eq!(deltas[1]["payload"]["becameHidden"], json!([7]));
        assert!(
            lines
                .iter()
                .any(|line| line["payload"]["url"] == "http://localhost:3000/about")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_elements_fail_the_step() {
        let dir = TempDir::new().unwrap();
        let cli = cli(&dir, r#"{"step": "click", "id": "missing"}"#);
        let err = run(&cli, Vec::new()).await.unwrap_err();
        assert_eq!(err.to_string(), "step 1 of 1 failed");
    }
}
