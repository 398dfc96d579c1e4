//! The origin-checked message channel to the host window.

use log::{trace, warn};
use overlay_protocol::{EngineMessage, HostMessage, HostOrigin};
use serde_json::Value;

/// Where outbound messages go (`window.parent.postMessage` in a browser).
pub trait HostPort {
    /// Deliver a message to the host; `target_origin` is never a wildcard.
    fn post(&mut self, message: EngineMessage, target_origin: &str);
}

#[derive(Clone, Debug, PartialEq)]
pub struct PostedMessage {
    pub target_origin: String,
    pub message: EngineMessage,
}

/// A port that keeps everything it is given, for tests and headless hosts.
#[derive(Clone, Debug, Default)]
pub struct RecordingPort {
    posted: Vec<PostedMessage>,
}

impl RecordingPort {
    pub fn posted(&self) -> &[PostedMessage] {
        &self.posted
    }

    /// Drain the recorded messages.
    pub fn take(&mut self) -> Vec<EngineMessage> {
        self.posted
            .drain(..)
            .map(|posted| posted.message)
            .collect()
    }
}

impl HostPort for RecordingPort {
    fn post(&mut self, message: EngineMessage, target_origin: &str) {
        self.posted.push(PostedMessage {
            target_origin: target_origin.to_owned(),
            message,
        });
    }
}

pub struct MessageChannel<P: HostPort> {
    origin: HostOrigin,
    port: P,
    dropped: u64,
    rejected: u64,
}

impl<P: HostPort> MessageChannel<P> {
    pub const fn new(origin: HostOrigin, port: P) -> Self {
        Self {
            origin,
            port,
            dropped: 0,
            rejected: 0,
        }
    }

    pub const fn origin(&self) -> &HostOrigin {
        &self.origin
    }

    pub const fn port(&self) -> &P {
        &self.port
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    /// Messages dropped because of their origin.
    pub const fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Messages from the host that failed to parse.
    pub const fn rejected(&self) -> u64 {
        self.rejected
    }

    pub fn send(&mut self, message: EngineMessage) {
        trace!("posting {} to {}", message.kind(), self.origin);
        self.port.post(message, self.origin.as_str());
    }

    /// Validate and parse an inbound message. The origin is checked before the
    /// data is looked at; failures are logged and yield `None`.
    pub fn receive(&mut self, origin: &str, data: Value) -> Option<HostMessage> {
        if !self.origin.allows(origin) {
            self.dropped = self.dropped.saturating_add(1);
            return None;
        }
        match HostMessage::from_value(data) {
            Ok(message) => {
                trace!("received {}", message.kind());
                Some(message)
            }
            Err(err) => {
                self.rejected = self.rejected.saturating_add(1);
                warn!("ignoring host message: {err}");
                None
            }
        }
    }
}
