//! Error types for the API client.

/// Errors that can occur when making API requests.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// An HTTP request failed (network error, timeout, or unbuildable URL).
    #[error("Request failed")]
    RequestFailed,
    /// The API returned a non-success status with a body snippet.
    #[error("Request failed with status {status}")]
    HttpStatus { status: u16, body: String },
    /// The bearer token was missing, revoked, or lacks access (HTTP 401/403).
    #[error("Bearer token rejected (HTTP {status})")]
    Unauthorized { status: u16 },
    /// The endpoint's rate window is exhausted (HTTP 429). `reset` is the
    /// epoch second at which the window reopens, when the API sent one.
    #[error("Rate limited (HTTP 429)")]
    RateLimited { reset: Option<i64> },
    /// The response body was not the expected JSON shape.
    #[error("Failed to parse response: {0}")]
    Parse(String),
}
