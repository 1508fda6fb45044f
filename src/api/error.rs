// Errors raised by the service client. Every variant keeps its underlying
// cause reachable through `source()` so callers can print the whole chain.

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CosmosError {
    #[error("invalid account endpoint '{endpoint}'")]
    InvalidEndpoint {
        endpoint: String,
        #[source]
        source: url::ParseError,
    },

    #[error("account key is not valid base64")]
    InvalidKey(#[source] base64::DecodeError),

    #[error("could not sign request")]
    Signing(#[source] hmac::digest::InvalidLength),

    #[error("failed to build HTTP client")]
    Client(#[source] reqwest::Error),

    #[error("invalid value for header {name}")]
    Header {
        name: &'static str,
        #[source]
        source: reqwest::header::InvalidHeaderValue,
    },

    #[error("request {method} {path} could not be sent")]
    Transport {
        method: String,
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{status} ({code}): {message}")]
    Service {
        status: StatusCode,
        code: String,
        message: String,
    },

    #[error("could not decode response from {path}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl CosmosError {
    /// HTTP status returned by the service, if the request got that far.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            CosmosError::Service { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }

    pub fn is_conflict(&self) -> bool {
        self.status() == Some(StatusCode::CONFLICT)
    }

    /// Build a service error from a non-success response body. The body is
    /// usually `{"code": "...", "message": "..."}` but gateways in front of
    /// the service sometimes answer with plain text.
    pub(crate) fn from_response(status: StatusCode, body: &str) -> Self {
        #[derive(Deserialize)]
        struct ErrorBody {
            #[serde(default)]
            code: String,
            #[serde(default)]
            message: String,
        }

        match serde_json::from_str::<ErrorBody>(body) {
            Ok(parsed) => CosmosError::Service {
                status,
                code: if parsed.code.is_empty() {
                    status.canonical_reason().unwrap_or("Unknown").to_string()
                } else {
                    parsed.code
                },
                message: first_line(&parsed.message),
            },
            Err(_) => CosmosError::Service {
                status,
                code: status.canonical_reason().unwrap_or("Unknown").to_string(),
                message: first_line(body),
            },
        }
    }
}

// Service messages embed activity ids and request URIs on following lines.
fn first_line(message: &str) -> String {
    message.lines().next().unwrap_or_default().trim().to_string()
}
