//! Error types for fetch dispatch.

/// Errors surfaced by a stubbed fetch call.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// No route key is a substring of the requested URL.
    #[error("Unexpected fetch: {url} params: {options}")]
    NoMatchingRoute {
        /// Requested URL
        url: String,
        /// Request options serialized as JSON
        options: String,
    },

    /// The request body could not be read for a reason other than bad JSON syntax.
    #[error("Invalid body: {body}")]
    InvalidRequestBody {
        /// The raw body
        body: String,
    },

    /// A route mixes HTTP method keys with other keys.
    #[error("Can't mix HTTP methods w/ other handlers.")]
    MixedHandlerConfiguration,

    /// The route is a method table without an entry for the request method.
    #[error("No {method} handler for {url}")]
    MissingResponse { method: String, url: String },

    /// The GET entry of a method table is a callback, which has no JSON form.
    #[error("GET handler for {url} must be a fixture value, not a callback")]
    CallableFixture { url: String },

    /// Response body (de)serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The global `fetch` was called with nothing installed.
    #[error("No fetch stub installed")]
    NotInstalled,
}

/// Result alias for fetch operations.
pub type Result<T, E = FetchError> = std::result::Result<T, E>;
