//! Error types.

use thiserror::Error;

/// The error type returned by cob's infrastructure operations.
///
/// Application-level failures (404, 400, 500 from a panicking handler) are
/// written to the client as responses, not returned as `Error`s. This type
/// surfaces failures around the server: binding to a port, accepting a
/// connection, or producing an invalid header.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid socket address `{addr}`: {source}")]
    Addr {
        addr: String,
        #[source]
        source: std::net::AddrParseError,
    },

    #[error("invalid header value: {0}")]
    Header(#[from] http::header::InvalidHeaderValue),
}

/// Failure to bind a request body or query into a value.
///
/// Returned by [`Context::bind`](crate::Context::bind); the handler decides
/// whether to [`fail`](crate::Context::fail) or recover.
#[derive(Debug, Error)]
pub enum BindError {
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    /// A form value was missing or could not be decoded into its field.
    #[error("form: {field}: {message}")]
    Form { field: String, message: String },

    #[error("multipart: {0}")]
    Multipart(String),

    /// Any other failure reported while building the target value, such
    /// as a custom `Deserialize` impl rejecting its input.
    #[error("{0}")]
    Custom(String),
}
