//! Writes every outbound message as one JSON line.

use std::io::{self, Write};

use log::warn;
use overlay::HostPort;
use overlay_protocol::EngineMessage;
use serde::Serialize;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Line<'msg> {
    target_origin: &'msg str,
    #[serde(flatten)]
    message: &'msg EngineMessage,
}

pub struct JsonLinesPort<W: Write> {
    out: W,
    written: usize,
}

impl<W: Write> JsonLinesPort<W> {
    pub const fn new(out: W) -> Self {
        Self { out, written: 0 }
    }

    pub const fn written(&self) -> usize {
        self.written
    }

    fn write_line(&mut self, line: &Line<'_>) -> Result<(), io::Error> {
        serde_json::to_writer(&mut self.out, line)?;
        self.out.write_all(b"\n")?;
        self.out.flush()
    }
}

impl<W: Write> HostPort for JsonLinesPort<W> {
    fn post(&mut self, message: EngineMessage, target_origin: &str) {
        let line = Line {
            target_origin,
            message: &message,
        };
        match self.write_line(&line) {
            Ok(()) => self.written += 1,
            Err(err) => warn!("could not write {}: {err}", message.kind()),
        }
    }
}

#[cfg(test)]
mod tests {
    use overlay_protocol::{Empty, Point};
    use serde_json::{Value, json};

    use super::*;

    #[test]
    fn one_line_per_message() {
        let mut out = Vec::new();
        let mut port = JsonLinesPort::new(&mut out);
        port.post(EngineMessage::IframeReady(Empty {}), "http://localhost:5173");
        port.post(EngineMessage::IframeScroll(Point::new(0.0, 12.5)), "http://localhost:5173");
        assert_eq!(port.written(), 2);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<Value> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(
            lines,
            [
                json!({
                    "targetOrigin": "http://localhost:5173",
                    "type": "iframe-ready",
                    "payload": {}
                }),
                json!({
                    "targetOrigin": "http://localhost:5173",
                    "type": "iframe-scroll",
                    "payload": {"x": 0.0, "y": 12.5}
                }),
            ]
        );
    }
}
