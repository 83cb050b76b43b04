//! The inbound contract.
//!
//! The runtime that drives a provider speaks in JSON values for
//! configuration, plan and state. [`ProviderService`] is that contract in
//! Rust types; [`crate::SelectProvider`] implements it and
//! [`crate::testing::ProviderTester`] drives it in tests.

use serde_json::Value;

use crate::error::ProviderError;
use crate::schema::{Diagnostic, ProviderSchema};
use crate::types::{ImportedResource, PlanResult, ProviderMetadata, ReadResult};
use crate::validation::validate;

/// Operations a provider serves.
///
/// Every `Err` becomes exactly one diagnostic at the caller. Operations on a
/// resource type the provider does not know fail with
/// [`ProviderError::UnknownResource`].
#[async_trait::async_trait]
pub trait ProviderService: Send + Sync + 'static {
    // =========================================================================
    // Schema & Metadata
    // =========================================================================

    /// Return the provider's schema including all resources.
    fn schema(&self) -> ProviderSchema;

    /// Return provider metadata. By default, this is derived from the schema.
    fn metadata(&self) -> ProviderMetadata {
        let mut resources: Vec<String> = self.schema().resources.keys().cloned().collect();
        resources.sort();
        ProviderMetadata {
            type_name: String::new(),
            resources,
        }
    }

    // =========================================================================
    // Provider Lifecycle
    // =========================================================================

    /// Validate the provider configuration before configuring.
    async fn validate_provider_config(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(validate(&self.schema().provider, &config))
    }

    /// Configure the provider with credentials and settings.
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError>;

    /// Stop the provider, cancelling in-flight work.
    async fn stop(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    /// Validate a resource's configuration before planning.
    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let schema = self.schema();
        let resource = schema
            .resources
            .get(resource_type)
            .ok_or_else(|| ProviderError::UnknownResource(resource_type.to_string()))?;
        Ok(validate(resource, &config))
    }

    /// Plan changes for a resource. A null `proposed_state` plans a delete.
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        config: Value,
    ) -> Result<PlanResult, ProviderError>;

    /// Create a new resource and return its state.
    async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError>;

    /// Refresh a resource. A resource that is gone yields no state.
    async fn read(&self, resource_type: &str, current_state: Value) -> Result<ReadResult, ProviderError>;

    /// Update an existing resource and return its new state.
    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError>;

    /// Delete a resource, returning warnings.
    async fn delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError>;

    /// Import existing infrastructure into management.
    async fn import_resource(
        &self,
        resource_type: &str,
        _id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        Err(ProviderError::Sdk(format!(
            "Import not supported for resource type: {}",
            resource_type
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attribute, Schema};
    use serde_json::json;

    struct Minimal;

    #[async_trait::async_trait]
    impl ProviderService for Minimal {
        fn schema(&self) -> ProviderSchema {
            ProviderSchema::new()
                .with_provider_config(Schema::v0().with_attribute("api_key", Attribute::required_string()))
                .with_resource("b_thing", Schema::v0().with_attribute("name", Attribute::required_string()))
                .with_resource("a_thing", Schema::v0())
        }

        async fn configure(&self, _config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
            Ok(vec![])
        }

        async fn plan(
            &self,
            _resource_type: &str,
            _prior_state: Option<Value>,
            proposed_state: Value,
            _config: Value,
        ) -> Result<PlanResult, ProviderError> {
            Ok(PlanResult::no_change(proposed_state))
        }

        async fn create(&self, _resource_type: &str, planned_state: Value) -> Result<Value, ProviderError> {
            Ok(planned_state)
        }

        async fn read(&self, _resource_type: &str, current_state: Value) -> Result<ReadResult, ProviderError> {
            Ok(ReadResult::found(current_state))
        }

        async fn update(
            &self,
            _resource_type: &str,
            _prior_state: Value,
            planned_state: Value,
        ) -> Result<Value, ProviderError> {
            Ok(planned_state)
        }

        async fn delete(
            &self,
            _resource_type: &str,
            _current_state: Value,
        ) -> Result<Vec<Diagnostic>, ProviderError> {
            Ok(vec![])
        }
    }

    #[test]
    fn test_metadata_is_sorted() {
        assert_eq!(Minimal.metadata().resources, vec!["a_thing", "b_thing"]);
    }

    #[tokio::test]
    async fn test_default_validation() {
        let diags = Minimal.validate_provider_config(json!({})).await.unwrap();
        assert_eq!(diags.len(), 1);

        let diags = Minimal
            .validate_resource_config("b_thing", json!({"name": "x"}))
            .await
            .unwrap();
        assert!(diags.is_empty());

        let err = Minimal
            .validate_resource_config("c_thing", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::UnknownResource(_)));
    }

    #[tokio::test]
    async fn test_import_unsupported_by_default() {
        let err = Minimal.import_resource("a_thing", "x").await.unwrap_err();
        assert!(err.detail().contains("a_thing"));
    }
}
