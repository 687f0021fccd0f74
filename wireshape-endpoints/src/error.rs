//! Endpoint resolution errors.

/// Endpoint resolution failed.
#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    /// The configured or composed endpoint host is not a valid URI.
    #[error("endpoint host `{host}` is not a valid URI")]
    InvalidEndpoint {
        host: String,
        #[source]
        source: http::uri::InvalidUri,
    },
}
