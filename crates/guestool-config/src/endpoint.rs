use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use url::Url;

/// WebSocket URL of the management host the agent dials out to.
///
/// Only `ws` and `wss` URLs with a host component are accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEndpoint {
    url: Url,
}

impl HostEndpoint {
    /// Validates an already parsed URL.
    pub fn from_url(url: Url) -> Result<Self, HostEndpointParseError> {
        match url.scheme() {
            "ws" | "wss" => {}
            other => return Err(HostEndpointParseError::UnsupportedScheme(other.to_owned())),
        }
        if url.host_str().is_none_or(str::is_empty) {
            return Err(HostEndpointParseError::MissingHost(url.to_string()));
        }
        Ok(Self { url })
    }

    /// Returns the underlying URL.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// Returns the URL as text, suitable for handing to a WebSocket client.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    /// Whether the endpoint uses TLS.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.url.scheme() == "wss"
    }
}

impl fmt::Display for HostEndpoint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.url.as_str())
    }
}

impl FromStr for HostEndpoint {
    type Err = HostEndpointParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let url = Url::parse(input.trim())?;
        Self::from_url(url)
    }
}

impl Serialize for HostEndpoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.url.as_str())
    }
}

impl<'de> Deserialize<'de> for HostEndpoint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Errors encountered while parsing a [`HostEndpoint`] from text.
#[derive(Debug, Error)]
pub enum HostEndpointParseError {
    /// Scheme was not `ws` or `wss`.
    #[error("unsupported management host scheme '{0}', expected ws or wss")]
    UnsupportedScheme(String),
    /// Host name was missing.
    #[error("missing host in '{0}'")]
    MissingHost(String),
    /// URL failed to parse.
    #[error(transparent)]
    Url(#[from] url::ParseError),
}
