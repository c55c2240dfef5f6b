//! HTTP clients for talking to Amazon OpenSearch Service domains.
//!
//! [`BasicHttpClient`] is a thin request/response abstraction over reqwest
//! with JSON bodies and typed status-code handling. [`AwsHttpClient`] layers
//! AWS SigV4 signing on top, assuming an IAM role via STS when configured and
//! caching the temporary credentials across requests.

pub mod aws;
pub mod error;
pub mod http;

pub use aws::{AwsHttpClient, AwsHttpClientOptions};
pub use error::ClientError;
pub use http::{
    BasicHttpClient, HttpClient, HttpClientOptions, HttpClientResponse, RequestBody,
    RequestOptions, RequestResponse,
};
