use core::fmt;
use core::str::FromStr;

use url::Url;

use crate::error::ProtocolError;

/// Origin of the reference host application.
pub const DEFAULT_HOST_ORIGIN: &str = "http://localhost:5173";

/// The single origin the overlay trusts, in ASCII serialization.
///
/// Inbound messages are accepted only if their origin string is exactly equal
/// to this value; outbound messages name it as their target.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct HostOrigin {
    serialized: String,
}

impl HostOrigin {
    /// Parse an origin (or any URL, whose origin is taken).
    ///
    /// # Errors
    /// Returns an error for unparsable input and for opaque origins
    /// (`file:`, `data:`, ...), which can never match a sender.
    pub fn parse(input: &str) -> Result<Self, ProtocolError> {
        let url = Url::parse(input.trim())
            .map_err(|_| ProtocolError::InvalidOrigin(input.to_owned()))?;
        let origin = url.origin();
        if !origin.is_tuple() {
            return Err(ProtocolError::InvalidOrigin(input.to_owned()));
        }
        Ok(Self {
            serialized: origin.ascii_serialization(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.serialized
    }

    /// Whether a message from `origin` may be processed.
    pub fn allows(&self, origin: &str) -> bool {
        let allowed = origin == self.serialized;
        if !allowed {
            log::debug!("dropping message from untrusted origin {origin:?}");
        }
        allowed
    }
}

impl Default for HostOrigin {
    fn default() -> Self {
        Self {
            serialized: DEFAULT_HOST_ORIGIN.to_owned(),
        }
    }
}

impl FromStr for HostOrigin {
    type Err = ProtocolError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        Self::parse(input)
    }
}

impl fmt::Display for HostOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_to_ascii_serialization() {
        let origin = HostOrigin::parse("HTTPS://Example.COM:443/some/path?q").unwrap();
        assert_eq!(origin.as_str(), "https://example.com");
        assert!(origin.allows("https://example.com"));
        assert!(!origin.allows("https://example.com/"));
        assert!(!origin.allows("https://evil.example.com"));
        assert!(!origin.allows("null"));
    }

    #[test]
    fn default_matches_reference_host() {
        let origin = HostOrigin::default();
        assert_eq!(origin, HostOrigin::parse(DEFAULT_HOST_ORIGIN).unwrap());
        assert!(origin.allows("http://localhost:5173"));
        assert!(!origin.allows("http://localhost:5174"));
    }

    #[test]
    fn rejects_opaque_and_garbage() {
        assert!(HostOrigin::parse("file:///tmp/page.html").is_err());
        assert!(HostOrigin::parse("not a url").is_err());
    }
}
