//! Client and surface configuration.

use crate::stroke::{BACKGROUND_COLOUR, StrokeStyle};
use serde::{Deserialize, Serialize};
use url::Url;

/// Default session server host.
pub const DEFAULT_HOST: &str = "localhost";

/// Default session server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Where the session server lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    /// Use `https`/`wss` instead of `http`/`ws`.
    pub secure: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            secure: false,
        }
    }
}

impl ClientConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            secure: false,
        }
    }

    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Parse `host:port`, `host`, or a full `http(s)://`/`ws(s)://` URL.
    ///
    /// A missing port falls back to the scheme default, or
    /// [`DEFAULT_PORT`] when no scheme was given.
    pub fn from_server(server: &str) -> Option<Self> {
        let server = server.trim();
        if server.is_empty() {
            return None;
        }
        if server.contains("://") {
            let url = Url::parse(server).ok()?;
            let secure = matches!(url.scheme(), "https" | "wss");
            let host = url.host_str()?.to_string();
            let port = url.port_or_known_default().unwrap_or(DEFAULT_PORT);
            return Some(Self { host, port, secure });
        }
        match server.rsplit_once(':') {
            Some((host, port)) if !host.is_empty() => Some(Self::new(host, port.parse().ok()?)),
            Some(_) => None,
            None => Some(Self::new(server, DEFAULT_PORT)),
        }
    }

    fn endpoint(&self, scheme: &str, segments: &[&str]) -> Result<Url, url::ParseError> {
        let mut url = Url::parse(&format!("{scheme}://{}:{}", self.host, self.port))?;
        url.path_segments_mut()
            .map_err(|()| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .clear()
            .extend(segments);
        Ok(url)
    }

    /// HTTP URL for the given path segments; segments are percent-encoded.
    pub fn http_url(&self, segments: &[&str]) -> Result<Url, url::ParseError> {
        self.endpoint(if self.secure { "https" } else { "http" }, segments)
    }

    /// WebSocket URL for the given path segments.
    pub fn ws_url(&self, segments: &[&str]) -> Result<Url, url::ParseError> {
        self.endpoint(if self.secure { "wss" } else { "ws" }, segments)
    }
}

/// Drawing surface defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    /// Canvas background, also the eraser colour.
    pub background: String,
    /// Style for new points until changed.
    pub style: StrokeStyle,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            background: BACKGROUND_COLOUR.to_string(),
            style: StrokeStyle::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_urls() {
        let config = ClientConfig::default();
        let url = config.http_url(&["session", "abc"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:3000/session/abc");
        let url = config.ws_url(&["session", "abc", "ws"]).unwrap();
        assert_eq!(url.as_str(), "ws://localhost:3000/session/abc/ws");
    }

    #[test]
    fn test_secure_urls() {
        let config = ClientConfig::new("draw.example.com", 8443).secure(true);
        let url = config.ws_url(&["session", "x", "ws"]).unwrap();
        assert_eq!(url.as_str(), "wss://draw.example.com:8443/session/x/ws");
    }

    #[test]
    fn test_segments_are_encoded() {
        let config = ClientConfig::default();
        let url = config.http_url(&["session", "a b/c"]).unwrap();
        assert_eq!(url.path(), "/session/a%20b%2Fc");
    }

    #[test]
    fn test_from_server() {
        assert_eq!(
            ClientConfig::from_server("localhost:3030"),
            Some(ClientConfig::new("localhost", 3030))
        );
        assert_eq!(
            ClientConfig::from_server("example.com"),
            Some(ClientConfig::new("example.com", DEFAULT_PORT))
        );
        assert_eq!(
            ClientConfig::from_server("https://example.com"),
            Some(ClientConfig::new("example.com", 443).secure(true))
        );
        assert_eq!(ClientConfig::from_server(":80"), None);
        assert_eq!(ClientConfig::from_server("host:notaport"), None);
        assert_eq!(ClientConfig::from_server(""), None);
    }

    #[test]
    fn test_config_deserialize_with_defaults() {
        let config: ClientConfig = serde_json::from_str(r#"{"host":"10.0.0.2"}"#).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert!(!config.secure);

        let surface: SurfaceConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(surface, SurfaceConfig::default());
    }
}
