//! Configuration settings for the annotation overlay.
//!
//! Configuration can be loaded from environment variables or constructed
//! programmatically.

use core::time::Duration;
use std::env;

use log::warn;
use overlay_protocol::HostOrigin;

/// Default quiet period before a reconciliation pass runs.
pub const DEFAULT_DEBOUNCE_MS: u64 = 150;
/// Default pin diameter in CSS pixels.
pub const DEFAULT_PIN_SIZE: u32 = 24;
/// Default diameter of the highlighted pin in CSS pixels.
pub const DEFAULT_PIN_SIZE_HIGHLIGHTED: u32 = 32;

/// Runtime configuration for the overlay engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OverlayConfig {
    /// The only origin messages are accepted from and posted to
    pub host_origin: HostOrigin,
    /// Debounce period for reconciliation passes in milliseconds
    pub debounce_ms: u64,
    /// Pin diameter in pixels
    pub pin_size: u32,
    /// Highlighted pin diameter in pixels
    pub pin_size_highlighted: u32,
    /// Whether attaching requires the page to be framed
    pub require_embedded: bool,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self::new(HostOrigin::default())
    }
}

impl OverlayConfig {
    /// Configuration with default settings for the given host origin.
    #[inline]
    #[must_use]
    pub const fn new(host_origin: HostOrigin) -> Self {
        Self {
            host_origin,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            pin_size: DEFAULT_PIN_SIZE,
            pin_size_highlighted: DEFAULT_PIN_SIZE_HIGHLIGHTED,
            require_embedded: true,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Reads the following environment variables:
    /// - `OVERLAY_HOST_ORIGIN`: host origin (default: `http://localhost:5173`)
    /// - `OVERLAY_DEBOUNCE_MS`: debounce period in milliseconds (default: 150, minimum 1)
    /// - `OVERLAY_PIN_SIZE`: pin diameter (default: 24)
    /// - `OVERLAY_PIN_SIZE_HIGHLIGHTED`: highlighted pin diameter (default: 32)
    /// - `OVERLAY_REQUIRE_EMBEDDED`: set to "0" to attach outside a frame
    #[inline]
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from `OVERLAY_*` settings supplied by `lookup`.
    /// Unset or unparsable values fall back to their defaults.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let host_origin = lookup("OVERLAY_HOST_ORIGIN")
            .and_then(|val| match HostOrigin::parse(&val) {
                Ok(origin) => Some(origin),
                Err(err) => {
                    warn!("OVERLAY_HOST_ORIGIN ignored: {err}");
                    None
                }
            })
            .unwrap_or_default();
        let debounce_ms = lookup("OVERLAY_DEBOUNCE_MS")
            .and_then(|val| val.parse::<u64>().ok())
            .unwrap_or(DEFAULT_DEBOUNCE_MS)
            .max(1);
        let pin_size = lookup("OVERLAY_PIN_SIZE")
            .and_then(|val| val.parse::<u32>().ok())
            .unwrap_or(DEFAULT_PIN_SIZE);
        let pin_size_highlighted = lookup("OVERLAY_PIN_SIZE_HIGHLIGHTED")
            .and_then(|val| val.parse::<u32>().ok())
            .unwrap_or(DEFAULT_PIN_SIZE_HIGHLIGHTED);
        let require_embedded = lookup("OVERLAY_REQUIRE_EMBEDDED").as_deref() != Some("0");
        Self {
            host_origin,
            debounce_ms,
            pin_size,
            pin_size_highlighted,
            require_embedded,
        }
    }

    #[must_use]
    pub fn with_debounce_ms(mut self, debounce_ms: u64) -> Self {
        self.debounce_ms = debounce_ms.max(1);
        self
    }

    #[must_use]
    pub fn with_require_embedded(mut self, require_embedded: bool) -> Self {
        self.require_embedded = require_embedded;
        self
    }

    /// The debounce period as a `Duration`.
    #[inline]
    #[must_use]
    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
