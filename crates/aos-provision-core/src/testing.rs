//! Test support: a scripted HTTP client that records every request.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;

use aos_provision_client::{
    ClientError, HttpClient, HttpClientResponse, RequestBody, RequestOptions, RequestResponse,
};

/// One request observed by the mock.
#[derive(Debug, Clone)]
pub(crate) struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub body: Option<RequestBody>,
    pub options: Option<RequestOptions>,
}

impl RecordedRequest {
    /// The JSON payload of the request, when one was sent.
    pub fn json_body(&self) -> Option<&Value> {
        match &self.body {
            Some(RequestBody::Json(value)) => Some(value),
            _ => None,
        }
    }

    /// The raw payload of the request, when one was sent.
    pub fn raw_body(&self) -> Option<&str> {
        match &self.body {
            Some(RequestBody::Raw(text)) => Some(text),
            _ => None,
        }
    }

    pub fn params(&self) -> &[(String, String)] {
        self.options.as_ref().map_or(&[], |o| o.params.as_slice())
    }
}

#[derive(Debug, Clone)]
struct StubbedResponse {
    status_code: u16,
    data: Value,
}

/// Scripted [`HttpClient`] for provisioner tests.
///
/// Responses are queued per (method, path); anything unscripted answers with
/// the default status and an empty body, mirroring a pass-through client.
pub(crate) struct MockHttpClient {
    responses: Mutex<HashMap<(String, String), VecDeque<StubbedResponse>>>,
    calls: Mutex<Vec<RecordedRequest>>,
    default_status: u16,
    fail: Mutex<bool>,
}

impl MockHttpClient {
    pub fn new() -> Self {
        Self::with_default_status(200)
    }

    pub fn with_default_status(default_status: u16) -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            default_status,
            fail: Mutex::new(false),
        }
    }

    /// Queues a response for the next request with this method and path.
    pub fn stub(&self, method: &str, path: &str, status_code: u16, data: Value) {
        self.responses
            .lock()
            .unwrap()
            .entry((method.to_string(), path.to_string()))
            .or_default()
            .push_back(StubbedResponse { status_code, data });
    }

    pub fn stub_status(&self, method: &str, path: &str, status_code: u16) {
        self.stub(method, path, status_code, Value::Null);
    }

    /// Makes every subsequent request fail with a transport-style error.
    pub fn fail_requests(&self) {
        *self.fail.lock().unwrap() = true;
    }

    pub fn calls(&self) -> Vec<RecordedRequest> {
        self.calls.lock().unwrap().clone()
    }

    /// Recorded requests that could have mutated the domain.
    pub fn mutating_calls(&self) -> Vec<RecordedRequest> {
        self.calls()
            .into_iter()
            .filter(|call| matches!(call.method.as_str(), "PUT" | "POST" | "DELETE" | "PATCH"))
            .collect()
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<RequestBody>,
        options: Option<RequestOptions>,
    ) -> Result<HttpClientResponse, ClientError> {
        self.calls.lock().unwrap().push(RecordedRequest {
            method: method.to_string(),
            path: path.to_string(),
            body,
            options,
        });

        if *self.fail.lock().unwrap() {
            return Err(ClientError::Response(RequestResponse {
                status_code: 0,
                headers: vec![],
                body: "connection refused".to_string(),
            }));
        }

        let stubbed = self
            .responses
            .lock()
            .unwrap()
            .get_mut(&(method.to_string(), path.to_string()))
            .and_then(|queue| queue.pop_front());

        let (status_code, data) = match stubbed {
            Some(response) => (response.status_code, response.data),
            None => (self.default_status, Value::Null),
        };

        Ok(HttpClientResponse {
            status_code,
            headers: vec![],
            raw_body: data.to_string(),
            data,
        })
    }
}
