//! AWS SigV4-authenticated HTTP client
//!
//! Signs every outgoing request with SigV4. When a role ARN is configured the
//! client assumes that role through STS and caches the temporary credentials,
//! re-assuming shortly before they expire; otherwise the default credential
//! chain (Lambda execution role, instance profile, environment) is used.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use aws_credential_types::provider::ProvideCredentials;
use aws_credential_types::Credentials;
use aws_sigv4::http_request::{sign, SignableBody, SignableRequest, SigningSettings};
use aws_sigv4::sign::v4;
use reqwest::Method;
use tracing::debug;

use crate::error::ClientError;
use crate::http::{
    BasicHttpClient, HttpClient, HttpClientOptions, HttpClientResponse, PreparedRequest,
    RequestBody, RequestOptions, DEFAULT_TIMEOUT,
};

/// Cached credentials are refreshed when they expire within this window.
const CREDENTIAL_REFRESH_WINDOW: Duration = Duration::from_secs(5 * 60);

/// STS session duration (the minimum AssumeRole allows).
const ASSUME_ROLE_DURATION_SECS: i32 = 900;

/// Configuration options for [`AwsHttpClient`].
#[derive(Debug, Clone)]
pub struct AwsHttpClientOptions {
    /// Signing service name (e.g. `es`). Required.
    pub service: String,
    /// Signing region; falls back to `AWS_REGION` from the environment.
    pub region: Option<String>,
    /// IAM role to assume for signing. When absent, the default credential
    /// chain is used per call.
    pub role_arn: Option<String>,
    /// Base URL resolved against every request path.
    pub base_url: Option<String>,
    /// Headers included in every request.
    pub default_headers: HashMap<String, String>,
    /// Request timeout.
    pub timeout: Duration,
    /// Return non-2xx responses instead of failing.
    pub pass_non_successful_status_codes: bool,
}

impl Default for AwsHttpClientOptions {
    fn default() -> Self {
        Self {
            service: String::new(),
            region: None,
            role_arn: None,
            base_url: None,
            default_headers: HashMap::new(),
            timeout: DEFAULT_TIMEOUT,
            pass_non_successful_status_codes: false,
        }
    }
}

/// Assumed-role credentials held between requests.
#[derive(Debug, Clone)]
struct CachedCredentials {
    credentials: Credentials,
    expiration: Option<SystemTime>,
}

impl CachedCredentials {
    /// Whether the cache must be refreshed before signing at `now`.
    fn needs_refresh(&self, now: SystemTime) -> bool {
        match self.expiration {
            Some(expiration) => match expiration.duration_since(now) {
                Ok(remaining) => remaining < CREDENTIAL_REFRESH_WINDOW,
                // Already expired
                Err(_) => true,
            },
            // Unknown expiration, assume stale
            None => true,
        }
    }
}

/// HTTP client that signs requests with AWS SigV4.
#[derive(Debug)]
pub struct AwsHttpClient {
    http: BasicHttpClient,
    service: String,
    region: Option<String>,
    role_arn: Option<String>,
    cached: Mutex<Option<CachedCredentials>>,
}

impl AwsHttpClient {
    /// Create a new client. Fails when no signing service is configured.
    pub fn new(options: AwsHttpClientOptions) -> Result<Self, ClientError> {
        if options.service.is_empty() {
            return Err(ClientError::MissingService);
        }

        let http = BasicHttpClient::new(HttpClientOptions {
            base_url: options.base_url,
            timeout: options.timeout,
            default_headers: options.default_headers,
            pass_non_successful_status_codes: options.pass_non_successful_status_codes,
        })?;

        Ok(Self {
            http,
            service: options.service,
            region: options.region,
            role_arn: options.role_arn,
            cached: Mutex::new(None),
        })
    }

    /// Signing region: explicit option first, then the Lambda environment.
    fn resolve_region(&self) -> Result<String, ClientError> {
        self.region
            .clone()
            .or_else(|| std::env::var("AWS_REGION").ok())
            .ok_or(ClientError::MissingRegion)
    }

    fn cached_if_fresh(&self, now: SystemTime) -> Option<Credentials> {
        self.cached
            .lock()
            .expect("credential cache lock poisoned")
            .as_ref()
            .filter(|cached| !cached.needs_refresh(now))
            .map(|cached| cached.credentials.clone())
    }

    fn store_cached(&self, credentials: Credentials, expiration: Option<SystemTime>) {
        *self.cached.lock().expect("credential cache lock poisoned") = Some(CachedCredentials {
            credentials,
            expiration,
        });
    }

    /// Credentials used to sign the next request.
    async fn signing_credentials(&self) -> Result<Credentials, ClientError> {
        match &self.role_arn {
            Some(role_arn) => self.assumed_credentials(role_arn).await,
            None => {
                let config =
                    aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
                let provider = config
                    .credentials_provider()
                    .ok_or(ClientError::CredentialsUnavailable)?;
                provider
                    .provide_credentials()
                    .await
                    .map_err(|_| ClientError::CredentialsUnavailable)
            }
        }
    }

    /// Returns cached role credentials, re-assuming the role when the cache
    /// is empty or expires within the refresh window.
    async fn assumed_credentials(&self, role_arn: &str) -> Result<Credentials, ClientError> {
        if let Some(credentials) = self.cached_if_fresh(SystemTime::now()) {
            return Ok(credentials);
        }

        debug!("Assuming role {} for request signing", role_arn);
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let sts = aws_sdk_sts::Client::new(&config);
        let response = sts
            .assume_role()
            .role_arn(role_arn)
            .role_session_name("AwsSigV4Request")
            .duration_seconds(ASSUME_ROLE_DURATION_SECS)
            .send()
            .await
            .map_err(|_| ClientError::CredentialsUnavailable)?;

        let granted = response
            .credentials()
            .ok_or(ClientError::CredentialsUnavailable)?;
        let expiration = UNIX_EPOCH
            .checked_add(Duration::from_secs(granted.expiration().secs().max(0) as u64));

        let credentials = Credentials::new(
            granted.access_key_id(),
            granted.secret_access_key(),
            Some(granted.session_token().to_string()),
            expiration,
            "AssumedRole",
        );
        self.store_cached(credentials.clone(), expiration);

        Ok(credentials)
    }

    /// Signs a prepared request in place, appending the SigV4 headers.
    fn sign_request(
        &self,
        request: &mut PreparedRequest,
        credentials: &Credentials,
        region: &str,
    ) -> Result<(), ClientError> {
        let signable_headers: Vec<(&str, &str)> = request
            .headers
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
            .collect();

        let signable_body = match &request.body {
            Some(body) => SignableBody::Bytes(body.as_bytes()),
            None => SignableBody::Bytes(&[]),
        };

        let signable_request = SignableRequest::new(
            request.method.as_str(),
            request.url.as_str(),
            signable_headers.into_iter(),
            signable_body,
        )
        .map_err(|e| ClientError::Signing(e.to_string()))?;

        let identity = credentials.clone().into();
        let signing_params = v4::SigningParams::builder()
            .identity(&identity)
            .region(region)
            .name(&self.service)
            .time(SystemTime::now())
            .settings(SigningSettings::default())
            .build()
            .map_err(|e| ClientError::Signing(e.to_string()))?
            .into();

        let (signing_instructions, _signature) = sign(signable_request, &signing_params)
            .map_err(|e| ClientError::Signing(e.to_string()))?
            .into_parts();

        for (name, value) in signing_instructions.headers() {
            request.headers.push((name.to_string(), value.to_string()));
        }

        Ok(())
    }
}

#[async_trait]
impl HttpClient for AwsHttpClient {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<RequestBody>,
        options: Option<RequestOptions>,
    ) -> Result<HttpClientResponse, ClientError> {
        let mut prepared = self.http.prepare(method, path, body, options)?;

        let region = self.resolve_region()?;
        let credentials = self.signing_credentials().await?;
        self.sign_request(&mut prepared, &credentials, &region)?;

        let raw = self.http.dispatch(prepared).await?;
        self.http.finish(raw)
    }
}
