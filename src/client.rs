//! HTTP client for the SELECT API.
//!
//! [`ApiClient`] turns models into JSON requests against
//! `{base_url}{endpoint}` and merges JSON responses back into models. The
//! wire itself sits behind [`ApiTransport`] so handlers can be exercised
//! against an in-memory transport.
//!
//! Status handling:
//!
//! | Status | Outcome |
//! |---|---|
//! | 200, 201 | [`ApiOutcome::Success`], body decoded into the destination |
//! | 204 | [`ApiOutcome::NoContent`] |
//! | 404 | [`ApiOutcome::NotFound`], a warning for the caller to act on |
//! | other | [`ProviderError::Api`] with the status and raw body |
//!
//! Failures before a status line is received are [`ProviderError::Transport`].

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, instrument, warn};

use crate::config::{ClientOptions, ProviderConfig};
use crate::convert::{json_type_name, ApiObject};
use crate::error::{ProviderError, TransportError};
use crate::schema::Diagnostic;
use crate::version::{EmptyBody, VersionCoordinator, VersionModel};

/// A fully built HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute URL.
    pub url: String,
    /// Header name/value pairs.
    pub headers: Vec<(String, String)>,
    /// Serialized JSON body.
    pub body: Option<Vec<u8>>,
}

impl ApiRequest {
    /// Look up a header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A raw HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body as text.
    pub body: String,
}

impl ApiResponse {
    /// Create a response with a text body.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Create a response with a JSON body.
    pub fn json(status: u16, body: &Value) -> Self {
        Self::new(status, body.to_string())
    }
}

/// Executes HTTP requests.
#[async_trait]
pub trait ApiTransport: Send + Sync {
    /// Send `request` and read the whole response body.
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, TransportError>;
}

/// [`ApiTransport`] backed by a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a transport with the given tuning.
    pub fn new(options: &ClientOptions) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(options.timeout)
            .pool_max_idle_per_host(options.pool_max_idle_per_host)
            .pool_idle_timeout(options.pool_idle_timeout)
            .user_agent(options.user_agent.as_str())
            .build()
            .map_err(|e| {
                ProviderError::configuration(
                    "HTTP Client Error",
                    format!("Failed to create HTTP client: {}", e),
                )
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ApiTransport for ReqwestTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let mut builder = self.client.request(request.method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| {
            TransportError::Request(format!("failed to read response body: {}", e))
        })?;
        Ok(ApiResponse { status, body })
    }
}

fn transport_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Request(err.to_string())
    }
}

/// How a request that received a response ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiOutcome {
    /// 200 or 201; the destination, if any, holds the response.
    Success,
    /// 204.
    NoContent,
    /// 404. The destination is untouched.
    NotFound {
        /// `METHOD endpoint`.
        operation: String,
        /// The endpoint that was requested.
        endpoint: String,
        /// The raw response body.
        body: String,
    },
}

impl ApiOutcome {
    /// Returns true for a 404.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// The not-found warning, if this is a 404.
    pub fn warning(&self) -> Option<Diagnostic> {
        match self {
            Self::NotFound { endpoint, .. } => {
                Some(ProviderError::NotFound(endpoint.clone()).to_diagnostic())
            },
            _ => None,
        }
    }

    /// Treat a 404 as an API error, for calls that must find their target.
    pub fn require_found(self) -> Result<(), ProviderError> {
        match self {
            Self::NotFound {
                operation, body, ..
            } => Err(ProviderError::Api {
                operation,
                status: 404,
                body,
            }),
            _ => Ok(()),
        }
    }
}

/// Client shared by every resource handler of one configured provider.
pub struct ApiClient {
    transport: Arc<dyn ApiTransport>,
    base_url: String,
    api_key: String,
    organization_id: String,
    versions: VersionCoordinator,
    cancel: CancellationToken,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("organization_id", &self.organization_id)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a client over an explicit transport.
    pub fn new(config: &ProviderConfig, transport: Arc<dyn ApiTransport>) -> Self {
        Self {
            transport,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            organization_id: config.organization_id.clone(),
            versions: VersionCoordinator::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Create a client over a [`ReqwestTransport`].
    pub fn with_options(
        config: &ProviderConfig,
        options: &ClientOptions,
    ) -> Result<Self, ProviderError> {
        let transport = ReqwestTransport::new(options)?;
        Ok(Self::new(config, Arc::new(transport)))
    }

    /// The organization every endpoint is scoped to.
    pub fn organization_id(&self) -> &str {
        &self.organization_id
    }

    /// The base URL, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL for an endpoint path.
    pub fn build_url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    /// Abort every in-flight and future request of this client.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Returns true once [`ApiClient::cancel`] was called.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// `GET endpoint`, decoding the response into `dest`.
    pub async fn get(
        &self,
        endpoint: &str,
        dest: &mut dyn ApiObject,
    ) -> Result<ApiOutcome, ProviderError> {
        self.request(Method::GET, endpoint, None, Some(dest)).await
    }

    /// `POST endpoint` with `body`, decoding the response into `dest`.
    pub async fn post(
        &self,
        endpoint: &str,
        body: &dyn ApiObject,
        dest: Option<&mut dyn ApiObject>,
    ) -> Result<ApiOutcome, ProviderError> {
        self.request(Method::POST, endpoint, Some(body), dest).await
    }

    /// `PUT endpoint` with `body`, decoding the response into `dest`.
    pub async fn put(
        &self,
        endpoint: &str,
        body: &dyn ApiObject,
        dest: Option<&mut dyn ApiObject>,
    ) -> Result<ApiOutcome, ProviderError> {
        self.request(Method::PUT, endpoint, Some(body), dest).await
    }

    /// `DELETE endpoint`.
    pub async fn delete(&self, endpoint: &str) -> Result<ApiOutcome, ProviderError> {
        self.request(Method::DELETE, endpoint, None, None).await
    }

    /// Send one JSON request.
    #[instrument(skip(self, body, dest))]
    pub async fn request(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&dyn ApiObject>,
        dest: Option<&mut dyn ApiObject>,
    ) -> Result<ApiOutcome, ProviderError> {
        let operation = format!("{} {}", method, endpoint);

        let body = match body {
            Some(model) => {
                let map = model
                    .encode_api()
                    .map_err(|e| ProviderError::json("marshal request", e))?;
                let bytes = serde_json::to_vec(&Value::Object(map))
                    .map_err(|e| ProviderError::json("marshal request", e))?;
                Some(bytes)
            },
            None => None,
        };

        let mut headers = vec![(
            "Authorization".to_string(),
            format!("Bearer {}", self.api_key),
        )];
        if body.is_some() {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
        }

        let request = ApiRequest {
            method,
            url: self.build_url(endpoint),
            headers,
            body,
        };

        debug!("Sending request");
        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(TransportError::Cancelled),
            result = self.transport.execute(request) => result,
        };
        let response = result.map_err(|source| {
            error!(error = %source, "Request failed");
            ProviderError::Transport {
                operation: operation.clone(),
                source,
            }
        })?;
        debug!(status = response.status, "Received response");

        match response.status {
            200 | 201 => {
                if let Some(dest) = dest {
                    if !response.body.is_empty() {
                        decode_into(dest, &response.body)?;
                    }
                }
                Ok(ApiOutcome::Success)
            },
            204 => Ok(ApiOutcome::NoContent),
            404 => {
                warn!(endpoint, "Resource not found");
                Ok(ApiOutcome::NotFound {
                    operation,
                    endpoint: endpoint.to_string(),
                    body: response.body,
                })
            },
            status => {
                error!(status, "API returned an error");
                Err(ProviderError::Api {
                    operation,
                    status,
                    body: response.body,
                })
            },
        }
    }

    /// The version token for `set_id`, created on first use.
    ///
    /// Every caller for the same set observes the outcome of a single
    /// `POST .../versions` call, including its failure.
    pub async fn get_or_create_version(&self, set_id: &str) -> Result<String, ProviderError> {
        self.versions
            .get_or_create(set_id, || self.create_version(set_id))
            .await
    }

    async fn create_version(&self, set_id: &str) -> Result<String, String> {
        let endpoint = format!(
            "/api/{}/usage-group-sets/{}/versions",
            self.organization_id, set_id
        );
        let mut version = VersionModel::default();
        match self.post(&endpoint, &EmptyBody, Some(&mut version)).await {
            Ok(ApiOutcome::NotFound { .. }) => {
                return Err(format!(
                    "failed to create version: Resource not found at {}",
                    endpoint
                ))
            },
            Ok(_) => {},
            Err(e) => return Err(format!("failed to create version: {}", e)),
        }

        match version.id.value() {
            Some(id) if !id.is_empty() => Ok(id.clone()),
            _ => Err("API returned empty version ID".to_string()),
        }
    }
}

fn decode_into(dest: &mut dyn ApiObject, body: &str) -> Result<(), ProviderError> {
    let parsed: Value =
        serde_json::from_str(body).map_err(|e| ProviderError::json("unmarshal response", e))?;
    match parsed {
        Value::Object(map) => {
            dest.decode_api(&map);
            Ok(())
        },
        other => Err(ProviderError::json(
            "unmarshal response",
            format!("expected a JSON object, got {}", json_type_name(&other)),
        )),
    }
}
