//! The `select_usage_group_set` resource.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, instrument};

use super::{
    applied_state, configured, is_path_segment, organization_id, usage_group_set_id,
    usage_group_set_path, usage_group_sets_path, ResourceHandler, Source,
};
use crate::client::ApiClient;
use crate::convert::{ApiModel, ModelSchema};
use crate::error::ProviderError;
use crate::field;
use crate::schema::{Attribute, Diagnostic, Schema};
use crate::types::ReadResult;
use crate::value::{Int64Value, StringValue};

/// Resource type name.
pub const TYPE_NAME: &str = "select_usage_group_set";

/// A usage group set as stored in state and exchanged with the API.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct UsageGroupSetModel {
    /// Server-assigned identifier.
    pub id: StringValue,
    /// Display name.
    pub name: StringValue,
    /// Display and evaluation order.
    pub order: Int64Value,
    /// Owning organization, taken from the provider configuration.
    pub organization_id: StringValue,
    /// Snowflake account scope.
    pub snowflake_account_uuid: StringValue,
    /// Snowflake organization scope.
    pub snowflake_organization_name: StringValue,
    /// Team scope.
    pub team_id: StringValue,
    /// Creation timestamp.
    pub created_at: StringValue,
    /// Last update timestamp.
    pub updated_at: StringValue,
}

impl ApiModel for UsageGroupSetModel {
    fn model_schema() -> &'static ModelSchema<Self> {
        static SCHEMA: OnceLock<ModelSchema<UsageGroupSetModel>> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            ModelSchema::build(
                "usage_group_set",
                vec![
                    field!(string, UsageGroupSetModel, id).tfsdk("id"),
                    field!(string, UsageGroupSetModel, name).tfsdk("name"),
                    field!(int64, UsageGroupSetModel, order).tfsdk("order"),
                    field!(string, UsageGroupSetModel, organization_id).tfsdk("organization_id"),
                    field!(string, UsageGroupSetModel, snowflake_account_uuid)
                        .tfsdk("snowflake_account_uuid"),
                    field!(string, UsageGroupSetModel, snowflake_organization_name)
                        .tfsdk("snowflake_organization_name"),
                    field!(string, UsageGroupSetModel, team_id).tfsdk("team_id"),
                    field!(string, UsageGroupSetModel, created_at).tfsdk("created_at"),
                    field!(string, UsageGroupSetModel, updated_at).tfsdk("updated_at"),
                ],
            )
        })
    }
}

impl UsageGroupSetModel {
    /// The create payload: user-settable fields only.
    fn create_request(&self) -> Self {
        Self {
            name: self.name.clone(),
            order: self.order.clone(),
            snowflake_account_uuid: self.snowflake_account_uuid.clone(),
            snowflake_organization_name: self.snowflake_organization_name.clone(),
            team_id: self.team_id.clone(),
            ..Default::default()
        }
    }

    /// The update payload. Scope fields are immutable after creation.
    fn update_request(&self) -> Self {
        Self {
            id: self.id.clone(),
            name: self.name.clone(),
            order: self.order.clone(),
            ..Default::default()
        }
    }
}

/// Schema of `select_usage_group_set`.
pub fn schema() -> Schema {
    Schema::v0()
        .with_description("A named collection of usage groups")
        .with_attribute(
            "id",
            Attribute::computed_string()
                .with_stable_state()
                .with_description("Identifier of the usage group set"),
        )
        .with_attribute(
            "name",
            Attribute::required_string().with_description("Display name"),
        )
        .with_attribute(
            "order",
            Attribute::optional_computed_int64().with_description("Display and evaluation order"),
        )
        .with_attribute(
            "organization_id",
            Attribute::computed_string().with_stable_state(),
        )
        .with_attribute(
            "snowflake_account_uuid",
            Attribute::optional_string()
                .with_force_new()
                .with_description("Scope the set to a Snowflake account"),
        )
        .with_attribute(
            "snowflake_organization_name",
            Attribute::optional_string()
                .with_force_new()
                .with_description("Scope the set to a Snowflake organization"),
        )
        .with_attribute(
            "team_id",
            Attribute::optional_string()
                .with_force_new()
                .with_description("Scope the set to a team"),
        )
        .with_attribute("created_at", Attribute::computed_string().with_stable_state())
        .with_attribute("updated_at", Attribute::computed_string())
}

/// Handler for `select_usage_group_set`.
#[derive(Debug, Clone, Default)]
pub struct UsageGroupSetResource {
    client: Option<Arc<ApiClient>>,
}

impl UsageGroupSetResource {
    /// An unconfigured handler.
    pub fn new() -> Self {
        Self::default()
    }

    /// A handler bound to `client`.
    pub fn with_client(client: Arc<ApiClient>) -> Self {
        Self {
            client: Some(client),
        }
    }

    fn client(&self) -> Result<&ApiClient, ProviderError> {
        configured(&self.client, TYPE_NAME)
    }
}

#[async_trait]
impl ResourceHandler for UsageGroupSetResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        schema()
    }

    #[instrument(skip(self, planned), fields(resource = TYPE_NAME))]
    async fn create(&self, planned: Value) -> Result<Value, ProviderError> {
        let client = self.client()?;
        let org = organization_id(client)?;
        let mut model = UsageGroupSetModel::from_state(&planned)?;

        let request = model.create_request();
        client
            .post(&usage_group_sets_path(org), &request, Some(&mut model))
            .await?
            .require_found()?;
        model.organization_id = StringValue::known(org.to_string());

        info!(id = model.id.value_str(), "Created usage group set");
        applied_state(&model)
    }

    #[instrument(skip(self, current), fields(resource = TYPE_NAME))]
    async fn read(&self, current: Value) -> Result<ReadResult, ProviderError> {
        let client = self.client()?;
        let org = organization_id(client)?;
        let mut model = UsageGroupSetModel::from_state(&current)?;
        let set_id = usage_group_set_id(&model.id, Source::State)?.to_string();

        let outcome = client
            .get(&usage_group_set_path(org, &set_id), &mut model)
            .await?;
        if let Some(warning) = outcome.warning() {
            return Ok(ReadResult::gone(warning));
        }
        model.organization_id = StringValue::known(org.to_string());

        Ok(ReadResult::found(applied_state(&model)?))
    }

    #[instrument(skip(self, prior, planned), fields(resource = TYPE_NAME))]
    async fn update(&self, prior: Value, planned: Value) -> Result<Value, ProviderError> {
        let client = self.client()?;
        let org = organization_id(client)?;
        let state = UsageGroupSetModel::from_state(&prior)?;
        let plan = UsageGroupSetModel::from_state(&planned)?;
        let set_id = usage_group_set_id(&plan.id, Source::Plan)?.to_string();

        client.get_or_create_version(&set_id).await?;

        let mut model = UsageGroupSetModel {
            name: plan.name,
            order: plan.order,
            ..state
        };
        let request = model.update_request();
        client
            .put(&usage_group_set_path(org, &set_id), &request, Some(&mut model))
            .await?
            .require_found()?;
        model.organization_id = StringValue::known(org.to_string());

        info!(id = %set_id, "Updated usage group set");
        applied_state(&model)
    }

    #[instrument(skip(self, current), fields(resource = TYPE_NAME))]
    async fn delete(&self, current: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let client = self.client()?;
        let org = organization_id(client)?;
        let model = UsageGroupSetModel::from_state(&current)?;
        let set_id = usage_group_set_id(&model.id, Source::State)?;

        client.get_or_create_version(set_id).await?;

        let outcome = client.delete(&usage_group_set_path(org, set_id)).await?;
        info!(id = set_id, "Deleted usage group set");
        Ok(outcome.warning().into_iter().collect())
    }

    async fn import(&self, id: &str) -> Result<Value, ProviderError> {
        if !is_path_segment(id) {
            return Err(ProviderError::InvalidImportId(format!(
                "Expected import ID in format 'usage_group_set_id', got: {}",
                id
            )));
        }
        let model = UsageGroupSetModel {
            id: StringValue::known(id.to_string()),
            ..Default::default()
        };
        Ok(model.to_state()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{mock_client, MockTransport};
    use serde_json::json;

    const SETS: &str = "/api/org-1/usage-group-sets";
    const SET: &str = "/api/org-1/usage-group-sets/s1";
    const VERSIONS: &str = "/api/org-1/usage-group-sets/s1/versions";

    fn handler() -> (Arc<MockTransport>, UsageGroupSetResource) {
        let (transport, client) = mock_client();
        (transport, UsageGroupSetResource::with_client(client))
    }

    fn prior_state() -> Value {
        json!({
            "id": "s1",
            "name": "Finance",
            "order": 1,
            "organization_id": "org-1",
            "snowflake_account_uuid": "acct-1",
            "snowflake_organization_name": null,
            "team_id": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    #[tokio::test]
    async fn test_create_sends_only_settable_fields() {
        let (transport, handler) = handler();
        transport.respond(
            "POST",
            SETS,
            201,
            json!({
                "id": "s1",
                "name": "Finance",
                "order": 3,
                "snowflake_account_uuid": "acct-1",
                "created_at": "2024-01-01T00:00:00Z",
                "updated_at": "2024-01-01T00:00:00Z"
            }),
        );

        let planned = json!({
            "id": crate::convert::UNKNOWN_SENTINEL,
            "name": "Finance",
            "order": crate::convert::UNKNOWN_SENTINEL,
            "organization_id": crate::convert::UNKNOWN_SENTINEL,
            "snowflake_account_uuid": "acct-1",
            "snowflake_organization_name": null,
            "team_id": null,
            "created_at": crate::convert::UNKNOWN_SENTINEL,
            "updated_at": crate::convert::UNKNOWN_SENTINEL
        });
        let state = handler.create(planned).await.unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].body,
            Some(json!({"name": "Finance", "snowflake_account_uuid": "acct-1"}))
        );

        assert_eq!(state["id"], "s1");
        assert_eq!(state["order"], 3);
        assert_eq!(state["organization_id"], "org-1");
        assert_eq!(state["created_at"], "2024-01-01T00:00:00Z");
        assert_eq!(transport.call_count("POST", VERSIONS), 0);
    }

    #[tokio::test]
    async fn test_create_resolves_missing_computed_values_to_null() {
        let (transport, handler) = handler();
        transport.respond("POST", SETS, 201, json!({"id": "s1", "name": "Finance"}));

        let planned = json!({
            "id": crate::convert::UNKNOWN_SENTINEL,
            "name": "Finance",
            "updated_at": crate::convert::UNKNOWN_SENTINEL
        });
        let state = handler.create(planned).await.unwrap();
        assert_eq!(state["updated_at"], Value::Null);
        assert_eq!(state["id"], "s1");
    }

    #[tokio::test]
    async fn test_create_not_found_is_an_error() {
        let (transport, handler) = handler();
        transport.respond("POST", SETS, 404, json!({"detail": "organization not found"}));

        let err = handler.create(json!({"name": "Finance"})).await.unwrap_err();
        assert!(err.to_diagnostic().is_error());
    }

    #[tokio::test]
    async fn test_read_refreshes_state() {
        let (transport, handler) = handler();
        transport.respond("GET", SET, 200, json!({"id": "s1", "name": "Renamed", "order": 2}));

        let result = handler.read(prior_state()).await.unwrap();
        let state = result.state.unwrap();
        assert!(result.diagnostics.is_empty());
        assert_eq!(state["name"], "Renamed");
        assert_eq!(state["order"], 2);
        assert_eq!(state["snowflake_account_uuid"], "acct-1");
    }

    #[tokio::test]
    async fn test_read_not_found_drops_state_with_warning() {
        let (transport, handler) = handler();
        transport.respond("GET", SET, 404, json!({"detail": "Not found."}));

        let result = handler.read(prior_state()).await.unwrap();
        assert!(result.state.is_none());
        assert_eq!(result.diagnostics.len(), 1);
        assert!(!result.diagnostics[0].is_error());
        assert_eq!(result.diagnostics[0].summary, "Resource Not Found");
    }

    #[tokio::test]
    async fn test_read_without_id_fails_before_request() {
        let (transport, handler) = handler();
        let err = handler.read(json!({"name": "Finance"})).await.unwrap_err();
        assert_eq!(err.summary(), "Missing Usage Group Set ID");
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_update_excludes_scope_fields() {
        let (transport, handler) = handler();
        transport.respond("POST", VERSIONS, 201, json!({"id": "v-1"}));
        transport.respond(
            "PUT",
            SET,
            200,
            json!({"id": "s1", "name": "Platform", "order": 5, "updated_at": "2024-02-01T00:00:00Z"}),
        );

        let mut planned = prior_state();
        planned["name"] = json!("Platform");
        planned["order"] = json!(5);
        planned["snowflake_account_uuid"] = json!("acct-2");
        planned["team_id"] = json!("team-9");
        planned["updated_at"] = json!(crate::convert::UNKNOWN_SENTINEL);

        let state = handler.update(prior_state(), planned).await.unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].path, VERSIONS);
        assert_eq!(requests[1].path, SET);
        assert_eq!(
            requests[1].body,
            Some(json!({"id": "s1", "name": "Platform", "order": 5}))
        );

        assert_eq!(state["name"], "Platform");
        assert_eq!(state["snowflake_account_uuid"], "acct-1");
        assert_eq!(state["updated_at"], "2024-02-01T00:00:00Z");
        assert_eq!(state["organization_id"], "org-1");
    }

    #[tokio::test]
    async fn test_update_stops_on_version_failure() {
        let (transport, handler) = handler();
        transport.respond_raw("POST", VERSIONS, 500, "version service down");

        let err = handler
            .update(prior_state(), prior_state())
            .await
            .unwrap_err();
        assert_eq!(err.summary(), "Version Creation Error");
        assert_eq!(transport.call_count("PUT", SET), 0);
    }

    #[tokio::test]
    async fn test_delete_requests_version_first() {
        let (transport, handler) = handler();
        transport.respond("POST", VERSIONS, 201, json!({"id": "v-1"}));
        transport.respond_raw("DELETE", SET, 204, "");

        let warnings = handler.delete(prior_state()).await.unwrap();
        assert!(warnings.is_empty());

        let paths: Vec<_> = transport.requests().into_iter().map(|r| r.path).collect();
        assert_eq!(paths, vec![VERSIONS.to_string(), SET.to_string()]);
    }

    #[tokio::test]
    async fn test_delete_not_found_is_a_warning() {
        let (transport, handler) = handler();
        transport.respond("POST", VERSIONS, 201, json!({"id": "v-1"}));
        transport.respond("DELETE", SET, 404, json!({}));

        let warnings = handler.delete(prior_state()).await.unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(!warnings[0].is_error());
    }

    #[tokio::test]
    async fn test_delete_without_id_is_an_error() {
        let (transport, handler) = handler();
        let err = handler.delete(json!({"name": "Finance"})).await.unwrap_err();
        assert_eq!(err.summary(), "Missing Usage Group Set ID");
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_unconfigured_handler() {
        let handler = UsageGroupSetResource::new();
        let err = handler.read(prior_state()).await.unwrap_err();
        assert_eq!(err.summary(), "Unconfigured Resource");
    }

    #[tokio::test]
    async fn test_import_sets_id() {
        let handler = UsageGroupSetResource::new();
        let state = handler.import("s1").await.unwrap();
        assert_eq!(state["id"], "s1");
        assert_eq!(state["name"], Value::Null);

        for bad in ["", "s1/other", "s1?x=1"] {
            let err = handler.import(bad).await.unwrap_err();
            assert_eq!(err.summary(), "Invalid Import ID Format");
            assert_eq!(
                err.detail(),
                format!("Expected import ID in format 'usage_group_set_id', got: {}", bad)
            );
        }
    }

    #[test]
    fn test_schema_flags() {
        let schema = schema();
        assert!(schema.attributes["team_id"].force_new);
        assert!(schema.attributes["id"].stable);
        assert!(!schema.attributes["updated_at"].stable);
        assert!(schema.attributes["name"].flags.required);
    }
}
