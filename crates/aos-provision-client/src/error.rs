//! Error types for the HTTP client crate

use thiserror::Error;

use crate::http::RequestResponse;

/// Errors raised while building, signing, or executing a request
#[derive(Debug, Error)]
pub enum ClientError {
    /// The path could not be resolved into an absolute URL
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// A service name is required to derive the SigV4 signing scope
    #[error("service must be specified for AWS SigV4 signing")]
    MissingService,

    /// No region was configured and none could be read from the environment
    #[error("region is not specified and could not be determined from environment")]
    MissingRegion,

    /// STS did not return usable temporary credentials
    #[error("failed to get temporary credentials")]
    CredentialsUnavailable,

    /// The server answered with a status outside the 2xx range
    #[error("{} | {}", .0.status_code, .0.body)]
    Response(RequestResponse),

    /// SigV4 signing failed before the request was sent
    #[error("failed to sign request: {0}")]
    Signing(String),

    /// Transport-level failure (connect, TLS, timeout, body read)
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

impl ClientError {
    /// The raw response attached to a [`ClientError::Response`], if any.
    pub fn response(&self) -> Option<&RequestResponse> {
        match self {
            Self::Response(response) => Some(response),
            _ => None,
        }
    }
}
