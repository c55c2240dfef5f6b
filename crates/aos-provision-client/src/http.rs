//! Generic HTTP request/response abstraction
//!
//! Builds requests from a base URL plus path, normalizes headers, serializes
//! JSON bodies, and parses JSON responses best-effort. Non-2xx responses fail
//! with a typed error unless the client is configured to pass them through.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use url::Url;

use crate::error::ClientError;

/// Default request timeout applied when the options do not override it.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration options for [`BasicHttpClient`].
#[derive(Debug, Clone)]
pub struct HttpClientOptions {
    /// Base URL resolved against every request path. When absent, each path
    /// must itself be an absolute URL.
    pub base_url: Option<String>,
    /// Request timeout.
    pub timeout: Duration,
    /// Headers included in every request; overridden by per-call headers.
    pub default_headers: HashMap<String, String>,
    /// Return non-2xx responses to the caller instead of failing with
    /// [`ClientError::Response`].
    pub pass_non_successful_status_codes: bool,
}

impl Default for HttpClientOptions {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
            default_headers: HashMap::new(),
            pass_non_successful_status_codes: false,
        }
    }
}

/// Per-request settings.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Additional headers; override the client's default headers.
    pub headers: HashMap<String, String>,
    /// Query parameters appended to the URL.
    pub params: Vec<(String, String)>,
}

/// Outgoing request payload.
#[derive(Debug, Clone)]
pub enum RequestBody {
    /// Serialized with serde_json; implies `content-type: application/json`
    /// unless the caller set one.
    Json(Value),
    /// Sent verbatim. The caller supplies its own content type.
    Raw(String),
}

/// Raw response, before status handling and JSON parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestResponse {
    pub status_code: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// Processed response with best-effort parsed data.
#[derive(Debug, Clone)]
pub struct HttpClientResponse {
    /// HTTP status code.
    pub status_code: u16,
    /// Response headers as (name, value) pairs.
    pub headers: Vec<(String, String)>,
    /// Response body as received.
    pub raw_body: String,
    /// Body parsed as JSON; the raw text as a JSON string when parsing fails.
    pub data: Value,
}

impl HttpClientResponse {
    /// Parse the response body as a typed value.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.raw_body)
    }

    /// Get a header value by name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        let name_lower = name.to_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| k.to_lowercase() == name_lower)
            .map(|(_, v)| v.as_str())
    }
}

/// A fully resolved request, ready to sign and send.
#[derive(Debug)]
pub(crate) struct PreparedRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

/// HTTP client capability consumed by the provisioning engine.
///
/// The convenience verbs delegate to [`HttpClient::request`], so implementors
/// only supply the one method.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Execute an HTTP request against a path resolved by the client.
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<RequestBody>,
        options: Option<RequestOptions>,
    ) -> Result<HttpClientResponse, ClientError>;

    /// Convenience method for GET requests
    async fn get(&self, path: &str) -> Result<HttpClientResponse, ClientError> {
        self.request(Method::GET, path, None, None).await
    }

    /// Convenience method for HEAD requests
    async fn head(&self, path: &str) -> Result<HttpClientResponse, ClientError> {
        self.request(Method::HEAD, path, None, None).await
    }

    /// Convenience method for DELETE requests
    async fn delete(&self, path: &str) -> Result<HttpClientResponse, ClientError> {
        self.request(Method::DELETE, path, None, None).await
    }

    /// Convenience method for POST requests
    async fn post(
        &self,
        path: &str,
        body: RequestBody,
        options: Option<RequestOptions>,
    ) -> Result<HttpClientResponse, ClientError> {
        self.request(Method::POST, path, Some(body), options).await
    }

    /// Convenience method for PUT requests
    async fn put(
        &self,
        path: &str,
        body: RequestBody,
        options: Option<RequestOptions>,
    ) -> Result<HttpClientResponse, ClientError> {
        self.request(Method::PUT, path, Some(body), options).await
    }

    /// Convenience method for PATCH requests
    async fn patch(
        &self,
        path: &str,
        body: RequestBody,
        options: Option<RequestOptions>,
    ) -> Result<HttpClientResponse, ClientError> {
        self.request(Method::PATCH, path, Some(body), options).await
    }
}

/// Plain reqwest-backed client with no authentication.
#[derive(Debug)]
pub struct BasicHttpClient {
    options: HttpClientOptions,
    client: reqwest::Client,
}

impl BasicHttpClient {
    /// Create a new client from options.
    pub fn new(options: HttpClientOptions) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(options.timeout)
            .build()?;

        Ok(Self { options, client })
    }

    /// Resolves a path against the configured base URL and appends query
    /// parameters.
    fn build_url(&self, path: &str, params: &[(String, String)]) -> Result<Url, ClientError> {
        let full = match &self.options.base_url {
            Some(base) => format!(
                "{}/{}",
                base.trim_end_matches('/'),
                path.trim_start_matches('/')
            ),
            None => path.to_string(),
        };

        let mut url = Url::parse(&full).map_err(|_| ClientError::InvalidUrl(full.clone()))?;
        if url.host_str().is_none() {
            return Err(ClientError::InvalidUrl(full));
        }

        if !params.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(params.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }

        Ok(url)
    }

    /// Builds the outgoing request: URL resolution, lowercase header merge,
    /// body serialization.
    pub(crate) fn prepare(
        &self,
        method: Method,
        path: &str,
        body: Option<RequestBody>,
        options: Option<RequestOptions>,
    ) -> Result<PreparedRequest, ClientError> {
        let options = options.unwrap_or_default();
        let url = self.build_url(path, &options.params)?;

        // Default headers first, per-call headers override. Keys are
        // lowercased so overrides match regardless of caller casing.
        let mut headers: HashMap<String, String> = HashMap::new();
        for (name, value) in &self.options.default_headers {
            headers.insert(name.to_lowercase(), value.clone());
        }
        for (name, value) in &options.headers {
            headers.insert(name.to_lowercase(), value.clone());
        }
        if let Some(host) = url.host_str() {
            headers.insert("host".to_string(), host.to_string());
        }

        let body = match body {
            Some(RequestBody::Json(value)) => {
                headers
                    .entry("content-type".to_string())
                    .or_insert_with(|| "application/json".to_string());
                Some(value.to_string())
            }
            Some(RequestBody::Raw(text)) => Some(text),
            None => None,
        };

        Ok(PreparedRequest {
            method,
            url,
            headers: headers.into_iter().collect(),
            body,
        })
    }

    /// Sends a prepared request and collects the raw response.
    pub(crate) async fn dispatch(
        &self,
        request: PreparedRequest,
    ) -> Result<RequestResponse, ClientError> {
        let mut builder = self.client.request(request.method, request.url);

        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;

        let status_code = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| (k.as_str().to_string(), v.to_str().unwrap_or("").to_string()))
            .collect();
        let body = response.text().await?;

        Ok(RequestResponse {
            status_code,
            headers,
            body,
        })
    }

    /// Applies the status-code policy and parses the body.
    pub(crate) fn finish(
        &self,
        response: RequestResponse,
    ) -> Result<HttpClientResponse, ClientError> {
        if !self.options.pass_non_successful_status_codes
            && !(200..300).contains(&response.status_code)
        {
            return Err(ClientError::Response(response));
        }

        // Parse the body as JSON where possible; otherwise hand back the raw
        // text without failing.
        let data = if response.body.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&response.body)
                .unwrap_or_else(|_| Value::String(response.body.clone()))
        };

        Ok(HttpClientResponse {
            status_code: response.status_code,
            headers: response.headers,
            raw_body: response.body,
            data,
        })
    }
}

#[async_trait]
impl HttpClient for BasicHttpClient {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<RequestBody>,
        options: Option<RequestOptions>,
    ) -> Result<HttpClientResponse, ClientError> {
        let prepared = self.prepare(method, path, body, options)?;
        let raw = self.dispatch(prepared).await?;
        self.finish(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client(options: HttpClientOptions) -> BasicHttpClient {
        BasicHttpClient::new(options).unwrap()
    }

    #[test]
    fn build_url_joins_base_and_path() {
        let client = client(HttpClientOptions {
            base_url: Some("https://example.com/".to_string()),
            ..Default::default()
        });

        let url = client.build_url("/_cluster/health", &[]).unwrap();
        assert_eq!(url.as_str(), "https://example.com/_cluster/health");
    }

    #[test]
    fn build_url_accepts_absolute_path_without_base() {
        let client = client(HttpClientOptions::default());

        let url = client.build_url("https://example.com/x", &[]).unwrap();
        assert_eq!(url.as_str(), "https://example.com/x");
    }

    #[test]
    fn build_url_rejects_relative_path_without_base() {
        let client = client(HttpClientOptions::default());

        assert!(matches!(
            client.build_url("/x", &[]),
            Err(ClientError::InvalidUrl(_))
        ));
    }

    #[test]
    fn build_url_appends_query_params() {
        let client = client(HttpClientOptions {
            base_url: Some("https://example.com".to_string()),
            ..Default::default()
        });

        let params = vec![
            ("if_seq_no".to_string(), "4".to_string()),
            ("if_primary_term".to_string(), "1".to_string()),
        ];
        let url = client.build_url("/_plugins/_ism/policies/logs", &params).unwrap();
        assert_eq!(url.query(), Some("if_seq_no=4&if_primary_term=1"));
    }

    #[test]
    fn prepare_lowercases_and_merges_headers() {
        let mut defaults = HashMap::new();
        defaults.insert("X-Default".to_string(), "base".to_string());
        defaults.insert("X-Override".to_string(), "base".to_string());
        let client = client(HttpClientOptions {
            base_url: Some("https://example.com".to_string()),
            default_headers: defaults,
            ..Default::default()
        });

        let mut headers = HashMap::new();
        headers.insert("X-OVERRIDE".to_string(), "call".to_string());
        let prepared = client
            .prepare(
                Method::GET,
                "/",
                None,
                Some(RequestOptions {
                    headers,
                    params: vec![],
                }),
            )
            .unwrap();

        let find = |name: &str| {
            prepared
                .headers
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(find("x-default"), Some("base"));
        assert_eq!(find("x-override"), Some("call"));
        assert_eq!(find("host"), Some("example.com"));
        assert!(find("X-Override").is_none());
    }

    #[test]
    fn prepare_sets_json_content_type() {
        let client = client(HttpClientOptions {
            base_url: Some("https://example.com".to_string()),
            ..Default::default()
        });

        let prepared = client
            .prepare(
                Method::PUT,
                "/idx",
                Some(RequestBody::Json(json!({"settings": {}}))),
                None,
            )
            .unwrap();

        assert!(prepared
            .headers
            .iter()
            .any(|(k, v)| k == "content-type" && v == "application/json"));
        assert_eq!(prepared.body.as_deref(), Some(r#"{"settings":{}}"#));
    }

    #[test]
    fn prepare_keeps_raw_body_verbatim() {
        let client = client(HttpClientOptions {
            base_url: Some("https://example.com".to_string()),
            ..Default::default()
        });

        let prepared = client
            .prepare(
                Method::POST,
                "/import",
                Some(RequestBody::Raw("--boundary\r\ncontent".to_string())),
                None,
            )
            .unwrap();

        assert_eq!(prepared.body.as_deref(), Some("--boundary\r\ncontent"));
        assert!(!prepared.headers.iter().any(|(k, _)| k == "content-type"));
    }

    #[test]
    fn finish_rejects_non_successful_status() {
        let client = client(HttpClientOptions::default());

        let error = client
            .finish(RequestResponse {
                status_code: 400,
                headers: vec![],
                body: "index already closed".to_string(),
            })
            .unwrap_err();

        assert!(error.to_string().contains("400"));
        assert_eq!(
            error.response().map(|r| r.body.as_str()),
            Some("index already closed")
        );
    }

    #[test]
    fn finish_passes_non_successful_status_when_configured() {
        let client = client(HttpClientOptions {
            pass_non_successful_status_codes: true,
            ..Default::default()
        });

        let response = client
            .finish(RequestResponse {
                status_code: 404,
                headers: vec![],
                body: String::new(),
            })
            .unwrap();

        assert_eq!(response.status_code, 404);
    }

    #[test]
    fn finish_parses_json_best_effort() {
        let client = client(HttpClientOptions::default());

        let parsed = client
            .finish(RequestResponse {
                status_code: 200,
                headers: vec![],
                body: r#"{"acknowledged":true}"#.to_string(),
            })
            .unwrap();
        assert_eq!(parsed.data["acknowledged"], json!(true));

        let unparsed = client
            .finish(RequestResponse {
                status_code: 200,
                headers: vec![],
                body: "plain text".to_string(),
            })
            .unwrap();
        assert_eq!(unparsed.data, json!("plain text"));
        assert_eq!(unparsed.raw_body, "plain text");
    }
}
