//! Test harnesses.
//!
//! [`MockTransport`] stands in for the HTTP wire: it serves scripted
//! responses per method and path and records every request it receives.
//! [`ProviderTester`] drives a [`ProviderService`] through whole resource
//! lifecycles without a runtime in front of it.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use select_provider::testing::{MockTransport, ProviderTester};
//! use select_provider::SelectProvider;
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let transport = Arc::new(MockTransport::new());
//! transport.respond("POST", "/api/org-1/usage-group-sets", 201, json!({"id": "s1"}));
//! transport.respond("GET", "/api/org-1/usage-group-sets/s1", 200, json!({"id": "s1", "name": "Finance"}));
//!
//! let tester = ProviderTester::new(SelectProvider::with_transport(transport.clone()));
//! tester
//!     .configure(json!({"api_key": "key", "organization_id": "org-1"}))
//!     .await
//!     .unwrap();
//!
//! let state = tester
//!     .lifecycle_create("select_usage_group_set", json!({"name": "Finance"}))
//!     .await
//!     .unwrap();
//! assert_eq!(state["id"], "s1");
//! # });
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::client::{ApiClient, ApiRequest, ApiResponse, ApiTransport};
use crate::config::ProviderConfig;
use crate::error::{ProviderError, TransportError};
use crate::schema::{Diagnostic, DiagnosticSeverity, ProviderSchema};
use crate::service::ProviderService;
use crate::types::{ImportedResource, PlanResult, ReadResult};

/// A request seen by [`MockTransport`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    /// HTTP method, upper case.
    pub method: String,
    /// Absolute URL.
    pub url: String,
    /// URL path.
    pub path: String,
    /// Header name/value pairs.
    pub headers: Vec<(String, String)>,
    /// Parsed JSON body, if any. A body that is not JSON is kept as a string.
    pub body: Option<Value>,
}

impl RecordedRequest {
    /// Look up a header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

type Route = (String, String);

/// In-memory [`ApiTransport`].
///
/// Scripted responses are sticky: every request to the same method and path
/// gets the same answer. Requests without a script get an empty 404.
#[derive(Debug, Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<Route, Result<ApiResponse, TransportError>>>,
    requests: Mutex<Vec<RecordedRequest>>,
    delay: Option<Duration>,
}

impl MockTransport {
    /// A transport with no scripted routes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every response by `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Answer `method path` with `status` and a JSON body.
    pub fn respond(&self, method: &str, path: &str, status: u16, body: Value) {
        self.script(method, path, Ok(ApiResponse::json(status, &body)));
    }

    /// Answer `method path` with `status` and a raw text body.
    pub fn respond_raw(&self, method: &str, path: &str, status: u16, body: &str) {
        self.script(method, path, Ok(ApiResponse::new(status, body)));
    }

    /// Fail `method path` before any response.
    pub fn fail(&self, method: &str, path: &str, error: TransportError) {
        self.script(method, path, Err(error));
    }

    fn script(&self, method: &str, path: &str, outcome: Result<ApiResponse, TransportError>) {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((method.to_ascii_uppercase(), path.to_string()), outcome);
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// How many times `method path` was requested.
    pub fn call_count(&self, method: &str, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|r| r.method.eq_ignore_ascii_case(method) && r.path == path)
            .count()
    }
}

#[async_trait]
impl ApiTransport for MockTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let path = reqwest::Url::parse(&request.url)
            .map(|url| url.path().to_string())
            .map_err(|e| TransportError::Request(format!("invalid URL {}: {}", request.url, e)))?;
        let method = request.method.as_str().to_string();
        let body = request.body.as_deref().map(|bytes| {
            serde_json::from_slice(bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
        });

        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedRequest {
                method: method.clone(),
                url: request.url.clone(),
                path: path.clone(),
                headers: request.headers.clone(),
                body,
            });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(method, path))
            .cloned()
            .unwrap_or_else(|| Ok(ApiResponse::new(404, "")))
    }
}

/// An [`ApiClient`] for organization `org-1` at `https://api.test`, backed
/// by `transport`.
pub fn client_for(transport: Arc<MockTransport>) -> Arc<ApiClient> {
    Arc::new(ApiClient::new(&test_config(), transport))
}

/// A fresh [`MockTransport`] and a client bound to it.
pub fn mock_client() -> (Arc<MockTransport>, Arc<ApiClient>) {
    let transport = Arc::new(MockTransport::new());
    let client = client_for(transport.clone());
    (transport, client)
}

fn test_config() -> ProviderConfig {
    ProviderConfig {
        api_key: "test-key".to_string(),
        organization_id: "org-1".to_string(),
        base_url: "https://api.test".to_string(),
    }
}

/// Drives a [`ProviderService`] the way the runtime would.
pub struct ProviderTester<P: ProviderService> {
    provider: P,
}

impl<P: ProviderService> ProviderTester<P> {
    /// Create a new tester for the given provider.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Get a reference to the underlying provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    // =========================================================================
    // Schema & Metadata
    // =========================================================================

    /// Get the provider's schema.
    pub fn schema(&self) -> ProviderSchema {
        self.provider.schema()
    }

    /// Get the list of resource type names.
    pub fn resource_types(&self) -> Vec<String> {
        self.provider.metadata().resources
    }

    // =========================================================================
    // Provider Lifecycle
    // =========================================================================

    /// Validate provider configuration, failing on error diagnostics.
    pub async fn validate_provider_config(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.validate_provider_config(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Configure the provider, failing on error diagnostics.
    pub async fn configure(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.configure(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Stop the provider.
    pub async fn stop(&self) -> Result<(), ProviderError> {
        self.provider.stop().await
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    /// Validate a resource configuration.
    pub async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        let diagnostics = self
            .provider
            .validate_resource_config(resource_type, config)
            .await?;
        check_diagnostics(diagnostics)
    }

    /// Plan a resource creation (no prior state).
    pub async fn plan_create(
        &self,
        resource_type: &str,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, None, proposed_state.clone(), proposed_state)
            .await
    }

    /// Plan a resource update.
    pub async fn plan_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(
                resource_type,
                Some(prior_state),
                proposed_state.clone(),
                proposed_state,
            )
            .await
    }

    /// Plan a resource deletion.
    pub async fn plan_delete(
        &self,
        resource_type: &str,
        prior_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, Some(prior_state), Value::Null, Value::Null)
            .await
    }

    /// Create a new resource.
    pub async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.create(resource_type, planned_state).await
    }

    /// Read the current state of a resource.
    pub async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<ReadResult, ProviderError> {
        self.provider.read(resource_type, current_state).await
    }

    /// Update an existing resource.
    pub async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .update(resource_type, prior_state, planned_state)
            .await
    }

    /// Delete a resource, returning its warnings.
    pub async fn delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        self.provider.delete(resource_type, current_state).await
    }

    /// Import an existing resource.
    pub async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        self.provider.import_resource(resource_type, id).await
    }

    // =========================================================================
    // Lifecycle Helpers
    // =========================================================================

    /// Run plan, create and read. Returns the state after read.
    pub async fn lifecycle_create(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let plan_result = self.plan_create(resource_type, config).await?;
        let created_state = self
            .create(resource_type, plan_result.planned_state)
            .await?;
        self.read_existing(resource_type, created_state).await
    }

    /// Run plan, update and read. Returns the state after read.
    pub async fn lifecycle_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        proposed_state: Value,
    ) -> Result<Value, ProviderError> {
        let plan_result = self
            .plan_update(resource_type, prior_state.clone(), proposed_state)
            .await?;
        let updated_state = self
            .update(resource_type, prior_state, plan_result.planned_state)
            .await?;
        self.read_existing(resource_type, updated_state).await
    }

    /// Run plan and delete. Returns the delete warnings.
    pub async fn lifecycle_delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let _ = self
            .plan_delete(resource_type, current_state.clone())
            .await?;
        self.delete(resource_type, current_state).await
    }

    /// Run create, update and delete. Returns the state after the update.
    pub async fn lifecycle_crud(
        &self,
        resource_type: &str,
        initial_config: Value,
        updated_config: Value,
    ) -> Result<Value, ProviderError> {
        let created_state = self.lifecycle_create(resource_type, initial_config).await?;
        let updated_state = self
            .lifecycle_update(resource_type, created_state, updated_config)
            .await?;
        self.lifecycle_delete(resource_type, updated_state.clone())
            .await?;
        Ok(updated_state)
    }

    // A read that drops the resource fails the lifecycle.
    async fn read_existing(
        &self,
        resource_type: &str,
        state: Value,
    ) -> Result<Value, ProviderError> {
        let result = self.read(resource_type, state).await?;
        match result.state {
            Some(state) => Ok(state),
            None => Err(ProviderError::Sdk(format!(
                "{} disappeared after apply",
                resource_type
            ))),
        }
    }
}

/// Error type for test operations that may fail with diagnostics.
#[derive(Debug)]
pub enum TestError {
    /// The operation failed with diagnostics.
    Diagnostics(Vec<Diagnostic>),
    /// The operation failed with a provider error.
    Provider(ProviderError),
}

impl std::fmt::Display for TestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestError::Diagnostics(diags) => {
                writeln!(f, "Operation failed with {} diagnostic(s):", diags.len())?;
                for diag in diags {
                    write!(f, "  [{:?}] {}", diag.severity, diag.summary)?;
                    if let Some(detail) = &diag.detail {
                        write!(f, ": {}", detail)?;
                    }
                    if let Some(attr) = &diag.attribute {
                        write!(f, " (at {})", attr)?;
                    }
                    writeln!(f)?;
                }
                Ok(())
            }
            TestError::Provider(e) => write!(f, "Provider error: {}", e),
        }
    }
}

impl std::error::Error for TestError {}

impl From<ProviderError> for TestError {
    fn from(e: ProviderError) -> Self {
        TestError::Provider(e)
    }
}

/// Check diagnostics and return an error if there are any errors.
fn check_diagnostics(diagnostics: Vec<Diagnostic>) -> Result<(), TestError> {
    let errors: Vec<_> = diagnostics
        .into_iter()
        .filter(|d| matches!(d.severity, DiagnosticSeverity::Error))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(TestError::Diagnostics(errors))
    }
}

// =========================================================================
// Assertion Helpers
// =========================================================================

/// Assert that a plan result indicates the resource will be created.
///
/// # Panics
///
/// Panics if the plan has no changes or requires replacement.
pub fn assert_plan_creates(plan: &PlanResult) {
    assert!(
        !plan.changes.is_empty(),
        "Expected plan to have changes for create, but got no changes"
    );
    assert!(
        !plan.requires_replace,
        "Expected plan to create, not replace"
    );
}

/// Assert that a plan result indicates no changes.
///
/// # Panics
///
/// Panics if the plan has any changes.
pub fn assert_plan_no_changes(plan: &PlanResult) {
    assert!(
        plan.changes.is_empty(),
        "Expected no changes, but got {} change(s): {:?}",
        plan.changes.len(),
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert that a plan result indicates changes are needed.
///
/// # Panics
///
/// Panics if the plan has no changes.
pub fn assert_plan_has_changes(plan: &PlanResult) {
    assert!(
        !plan.changes.is_empty(),
        "Expected plan to have changes, but got no changes"
    );
}

/// Assert that a plan requires resource replacement.
///
/// # Panics
///
/// Panics if the plan does not require replacement.
pub fn assert_plan_replaces(plan: &PlanResult) {
    assert!(
        plan.requires_replace,
        "Expected plan to require replacement, but it does not"
    );
}

/// Assert that a plan does not require resource replacement.
///
/// # Panics
///
/// Panics if the plan requires replacement.
pub fn assert_plan_updates_in_place(plan: &PlanResult) {
    assert!(
        !plan.requires_replace,
        "Expected plan to update in place, but it requires replacement"
    );
}

/// Assert that a plan has a change for a specific attribute path.
///
/// # Panics
///
/// Panics if the plan does not have a change for the given path.
pub fn assert_plan_changes_attribute(plan: &PlanResult, path: &str) {
    let has_change = plan.changes.iter().any(|c| c.path == path);
    assert!(
        has_change,
        "Expected plan to change attribute '{}', but it was not changed. Changed attributes: {:?}",
        path,
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert that a plan does not have a change for a specific attribute path.
///
/// # Panics
///
/// Panics if the plan has a change for the given path.
pub fn assert_plan_does_not_change_attribute(plan: &PlanResult, path: &str) {
    let has_change = plan.changes.iter().any(|c| c.path == path);
    assert!(
        !has_change,
        "Expected plan to not change attribute '{}', but it was changed",
        path
    );
}

/// Assert that diagnostics contain no errors.
///
/// # Panics
///
/// Panics if there are any error diagnostics.
pub fn assert_no_errors(diagnostics: &[Diagnostic]) {
    let errors: Vec<_> = diagnostics
        .iter()
        .filter(|d| matches!(d.severity, DiagnosticSeverity::Error))
        .collect();

    assert!(
        errors.is_empty(),
        "Expected no errors, but got {} error(s): {:?}",
        errors.len(),
        errors.iter().map(|d| &d.summary).collect::<Vec<_>>()
    );
}

/// Assert that diagnostics contain at least one error.
///
/// # Panics
///
/// Panics if there are no error diagnostics.
pub fn assert_has_errors(diagnostics: &[Diagnostic]) {
    let has_errors = diagnostics
        .iter()
        .any(|d| matches!(d.severity, DiagnosticSeverity::Error));

    assert!(has_errors, "Expected at least one error, but got none");
}

/// Assert that diagnostics contain an error with the given summary substring.
///
/// # Panics
///
/// Panics if no error diagnostic contains the given substring.
pub fn assert_error_contains(diagnostics: &[Diagnostic], substring: &str) {
    let has_matching_error = diagnostics
        .iter()
        .any(|d| matches!(d.severity, DiagnosticSeverity::Error) && d.summary.contains(substring));

    assert!(
        has_matching_error,
        "Expected an error containing '{}', but no matching error found. Errors: {:?}",
        substring,
        diagnostics
            .iter()
            .filter(|d| matches!(d.severity, DiagnosticSeverity::Error))
            .map(|d| &d.summary)
            .collect::<Vec<_>>()
    );
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::SelectProvider;
    use crate::types::AttributeChange;
    use serde_json::json;

    const SETS: &str = "/api/org-1/usage-group-sets";
    const SET: &str = "/api/org-1/usage-group-sets/s1";
    const VERSIONS: &str = "/api/org-1/usage-group-sets/s1/versions";

    fn request(method: reqwest::Method, url: &str, body: Option<&str>) -> ApiRequest {
        ApiRequest {
            method,
            url: url.to_string(),
            headers: vec![("Authorization".to_string(), "Bearer k".to_string())],
            body: body.map(|b| b.as_bytes().to_vec()),
        }
    }

    async fn configured_tester() -> (Arc<MockTransport>, ProviderTester<SelectProvider>) {
        let transport = Arc::new(MockTransport::new());
        let tester = ProviderTester::new(SelectProvider::with_transport(transport.clone()));
        tester
            .configure(json!({"api_key": "test-key", "organization_id": "org-1"}))
            .await
            .unwrap();
        (transport, tester)
    }

    #[tokio::test]
    async fn test_mock_unscripted_route_is_not_found() {
        let transport = MockTransport::new();
        let response = transport
            .execute(request(reqwest::Method::GET, "https://api.test/nothing", None))
            .await
            .unwrap();
        assert_eq!(response.status, 404);
        assert_eq!(transport.call_count("GET", "/nothing"), 1);
    }

    #[tokio::test]
    async fn test_mock_scripts_are_sticky_and_recorded() {
        let transport = MockTransport::new();
        transport.respond("post", "/a", 201, json!({"id": "1"}));

        for _ in 0..2 {
            let response = transport
                .execute(request(reqwest::Method::POST, "https://api.test/a?x=1", Some(r#"{"k":1}"#)))
                .await
                .unwrap();
            assert_eq!(response.status, 201);
            assert_eq!(response.body, r#"{"id":"1"}"#);
        }

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].path, "/a");
        assert_eq!(requests[0].body, Some(json!({"k": 1})));
        assert_eq!(requests[0].header("authorization"), Some("Bearer k"));
        assert_eq!(transport.call_count("POST", "/a"), 2);
    }

    #[tokio::test]
    async fn test_mock_failure_and_raw_body() {
        let transport = MockTransport::new();
        transport.fail("GET", "/down", TransportError::Timeout);
        transport.respond_raw("PUT", "/raw", 200, "not json");

        let err = transport
            .execute(request(reqwest::Method::GET, "https://api.test/down", None))
            .await
            .unwrap_err();
        assert_eq!(err, TransportError::Timeout);

        transport
            .execute(request(reqwest::Method::PUT, "https://api.test/raw", Some("plain")))
            .await
            .unwrap();
        assert_eq!(transport.requests()[1].body, Some(json!("plain")));
    }

    #[tokio::test]
    async fn test_tester_resource_types() {
        let tester = ProviderTester::new(SelectProvider::new());
        let mut types = tester.resource_types();
        types.sort();
        assert_eq!(types, vec!["select_usage_group", "select_usage_group_set"]);
        assert!(tester.schema().resources.contains_key("select_usage_group_set"));
    }

    #[tokio::test]
    async fn test_tester_configure_rejects_missing_key() {
        let tester = ProviderTester::new(SelectProvider::new());
        let err = tester
            .configure(json!({"organization_id": "org-1"}))
            .await
            .unwrap_err();
        match err {
            TestError::Diagnostics(diags) => assert_eq!(diags[0].summary, "Missing API Key"),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_tester_lifecycle_crud() {
        let (transport, tester) = configured_tester().await;
        transport.respond(
            "POST",
            SETS,
            201,
            json!({"id": "s1", "name": "Finance", "created_at": "t0", "updated_at": "t0"}),
        );
        transport.respond("GET", SET, 200, json!({"id": "s1"}));
        transport.respond("POST", VERSIONS, 201, json!({"id": "v-1"}));
        transport.respond(
            "PUT",
            SET,
            200,
            json!({"id": "s1", "name": "Platform", "updated_at": "t1"}),
        );
        transport.respond_raw("DELETE", SET, 204, "");

        let final_state = tester
            .lifecycle_crud(
                "select_usage_group_set",
                json!({"name": "Finance"}),
                json!({"name": "Platform"}),
            )
            .await
            .unwrap();

        assert_eq!(final_state["id"], "s1");
        assert_eq!(final_state["name"], "Platform");
        assert_eq!(final_state["created_at"], "t0");
        assert_eq!(final_state["updated_at"], "t1");
        assert_eq!(final_state["organization_id"], "org-1");
        assert_eq!(transport.call_count("POST", VERSIONS), 1);
        assert_eq!(transport.call_count("DELETE", SET), 1);
    }

    #[tokio::test]
    async fn test_tester_lifecycle_create_fails_when_resource_vanishes() {
        let (transport, tester) = configured_tester().await;
        transport.respond("POST", SETS, 201, json!({"id": "s1"}));

        let err = tester
            .lifecycle_create("select_usage_group_set", json!({"name": "Finance"}))
            .await
            .unwrap_err();
        assert_eq!(err.summary(), "Internal Error");
    }

    #[tokio::test]
    async fn test_tester_plan_update_replaces_on_scope_change() {
        let tester = ProviderTester::new(SelectProvider::new());
        let prior = json!({"id": "s1", "name": "Finance", "team_id": "t-1"});
        let plan = tester
            .plan_update(
                "select_usage_group_set",
                prior,
                json!({"name": "Finance", "team_id": "t-2"}),
            )
            .await
            .unwrap();

        assert_plan_has_changes(&plan);
        assert_plan_changes_attribute(&plan, "team_id");
        assert_plan_does_not_change_attribute(&plan, "name");
        assert_plan_replaces(&plan);
    }

    #[test]
    fn test_assert_plan_helpers() {
        let plan = PlanResult::with_changes(
            json!({"name": "x"}),
            vec![AttributeChange::added("name", json!("x"))],
            false,
        );
        assert_plan_creates(&plan);
        assert_plan_updates_in_place(&plan);
        assert_plan_no_changes(&PlanResult::no_change(json!({})));
    }

    #[test]
    fn test_assert_no_errors() {
        let diagnostics = vec![Diagnostic::warning("Resource Not Found")];
        assert_no_errors(&diagnostics);
    }

    #[test]
    #[should_panic(expected = "Expected no errors")]
    fn test_assert_no_errors_fails() {
        let diagnostics = vec![Diagnostic::error("API Error")];
        assert_no_errors(&diagnostics);
    }

    #[test]
    fn test_assert_error_contains() {
        let diagnostics = vec![Diagnostic::error("Missing Usage Group Set ID")];
        assert_has_errors(&diagnostics);
        assert_error_contains(&diagnostics, "Usage Group Set");
    }

    #[test]
    fn test_test_error_display() {
        let err = TestError::Diagnostics(vec![
            Diagnostic::error("Missing API Key").with_attribute("api_key"),
            Diagnostic::error("Empty Organization ID").with_detail("The organization_id cannot be empty."),
        ]);

        let display = format!("{}", err);
        assert!(display.contains("Missing API Key"));
        assert!(display.contains("api_key"));
        assert!(display.contains("cannot be empty"));
    }
}
