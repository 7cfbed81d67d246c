//! Model client error types.

use thiserror::Error;

/// Errors that can occur when calling the hosted generative model.
#[derive(Debug, Error)]
pub enum ModelError {
    /// No API key was configured.
    #[error("API key missing")]
    MissingApiKey,

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The model API returned a non-success status code.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code returned by the API.
        status: u16,
        /// Error message or response body.
        message: String,
    },

    /// The API returned 429 Too Many Requests.
    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited {
        /// Seconds to wait before retrying.
        retry_after_secs: u64,
    },

    /// The model produced no usable text (no candidates, or blocked).
    #[error("empty model response: {0}")]
    EmptyResponse(String),

    /// The model's text was not valid JSON.
    #[error("parse error: {0}")]
    Parse(String),
}
