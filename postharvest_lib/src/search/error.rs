use reqwest::StatusCode;

#[derive(thiserror::Error, Debug)]
pub enum SearchError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {status}")]
    HttpStatus { status: StatusCode },
    #[error("rate limited")]
    RateLimited,
    #[error("guest token activation failed: {0}")]
    GuestToken(String),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
