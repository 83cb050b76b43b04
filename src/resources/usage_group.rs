//! The `select_usage_group` resource.
//!
//! Usage groups live under a usage group set. Every mutation is grouped
//! under the set's version for the current apply, so create, update and
//! delete all resolve the version token before calling the API.
//!
//! Imports take a compound identifier, `<usage_group_set_id>/<usage_group_id>`.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, instrument};

use super::{
    applied_state, configured, is_path_segment, organization_id, usage_group_id,
    usage_group_path, usage_group_set_id, usage_groups_path, ResourceHandler, Source,
};
use crate::client::ApiClient;
use crate::convert::{ApiModel, ModelSchema};
use crate::error::ProviderError;
use crate::field;
use crate::schema::{Attribute, Diagnostic, Schema};
use crate::types::ReadResult;
use crate::value::{Float64Value, Int64Value, StringValue};

/// Resource type name.
pub const TYPE_NAME: &str = "select_usage_group";

/// A usage group as stored in state and exchanged with the API.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct UsageGroupModel {
    /// Server-assigned identifier.
    pub id: StringValue,
    /// Display name.
    pub name: StringValue,
    /// Evaluation order within the set.
    pub order: Int64Value,
    /// Budget amount.
    pub budget: Float64Value,
    /// Filter expression, as normalized JSON text.
    pub filter_expression_json: StringValue,
    /// Parent set.
    pub usage_group_set_id: StringValue,
    /// Parent set name, denormalized by the API.
    pub usage_group_set_name: StringValue,
    /// Owning organization.
    pub organization_id: StringValue,
    /// Creation timestamp.
    pub created_at: StringValue,
    /// Last update timestamp.
    pub updated_at: StringValue,
}

impl ApiModel for UsageGroupModel {
    fn model_schema() -> &'static ModelSchema<Self> {
        static SCHEMA: OnceLock<ModelSchema<UsageGroupModel>> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            ModelSchema::build(
                "usage_group",
                vec![
                    field!(string, UsageGroupModel, id).tfsdk("id"),
                    field!(string, UsageGroupModel, name).tfsdk("name"),
                    field!(int64, UsageGroupModel, order).tfsdk("order"),
                    field!(float64, UsageGroupModel, budget).tfsdk("budget"),
                    field!(string, UsageGroupModel, filter_expression_json)
                        .json("filter_expression_json,omitempty")
                        .tfsdk("filter_expression_json"),
                    field!(string, UsageGroupModel, usage_group_set_id).tfsdk("usage_group_set_id"),
                    field!(string, UsageGroupModel, usage_group_set_name)
                        .tfsdk("usage_group_set_name"),
                    field!(string, UsageGroupModel, organization_id).tfsdk("organization_id"),
                    field!(string, UsageGroupModel, created_at).tfsdk("created_at"),
                    field!(string, UsageGroupModel, updated_at).tfsdk("updated_at"),
                ],
            )
        })
    }
}

impl UsageGroupModel {
    // Computed fields stay out of the payload.
    fn create_request(&self) -> Self {
        Self {
            name: self.name.clone(),
            order: self.order.clone(),
            budget: self.budget.clone(),
            filter_expression_json: self.filter_expression_json.clone(),
            usage_group_set_id: self.usage_group_set_id.clone(),
            ..Default::default()
        }
    }

    // The parent set is part of the path and never sent.
    fn update_request(&self) -> Self {
        Self {
            id: self.id.clone(),
            name: self.name.clone(),
            order: self.order.clone(),
            budget: self.budget.clone(),
            filter_expression_json: self.filter_expression_json.clone(),
            ..Default::default()
        }
    }
}

/// Schema of `select_usage_group`.
pub fn schema() -> Schema {
    Schema::v0()
        .with_description("A named, ordered, optionally budgeted filter rule in a usage group set")
        .with_attribute("id", Attribute::computed_string().with_stable_state())
        .with_attribute("name", Attribute::required_string())
        .with_attribute("order", Attribute::optional_computed_int64())
        .with_attribute(
            "budget",
            Attribute::optional_float64().with_description("Budget for the usage group"),
        )
        .with_attribute(
            "filter_expression_json",
            Attribute::required_string()
                .with_description("Filter expression as a JSON document"),
        )
        .with_attribute(
            "usage_group_set_id",
            Attribute::required_string()
                .with_force_new()
                .with_description("The usage group set this group belongs to"),
        )
        .with_attribute("usage_group_set_name", Attribute::computed_string())
        .with_attribute("organization_id", Attribute::computed_string().with_stable_state())
        .with_attribute("created_at", Attribute::computed_string().with_stable_state())
        .with_attribute("updated_at", Attribute::computed_string())
}

/// Split an import identifier into set and group identifiers.
pub fn parse_import_id(id: &str) -> Result<(&str, &str), ProviderError> {
    let mut parts = id.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(set_id), Some(group_id), None)
            if is_path_segment(set_id) && is_path_segment(group_id) =>
        {
            Ok((set_id, group_id))
        },
        _ => Err(ProviderError::InvalidImportId(format!(
            "Expected import ID in format 'usage_group_set_id/usage_group_id', got: {}",
            id
        ))),
    }
}

/// Handler for `select_usage_group`.
#[derive(Debug, Clone, Default)]
pub struct UsageGroupResource {
    client: Option<Arc<ApiClient>>,
}

impl UsageGroupResource {
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
impl ResourceHandler for UsageGroupResource {
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
        let mut model = UsageGroupModel::from_state(&planned)?;
        let set_id = usage_group_set_id(&model.usage_group_set_id, Source::Configuration)?
            .to_string();

        client.get_or_create_version(&set_id).await?;

        let request = model.create_request();
        client
            .post(&usage_groups_path(org, &set_id), &request, Some(&mut model))
            .await?
            .require_found()?;
        model.organization_id = StringValue::known(org.to_string());

        info!(id = model.id.value_str(), set_id = %set_id, "Created usage group");
        applied_state(&model)
    }

    #[instrument(skip(self, current), fields(resource = TYPE_NAME))]
    async fn read(&self, current: Value) -> Result<ReadResult, ProviderError> {
        let client = self.client()?;
        let org = organization_id(client)?;
        let mut model = UsageGroupModel::from_state(&current)?;
        let set_id = usage_group_set_id(&model.usage_group_set_id, Source::State)?.to_string();
        let group_id = usage_group_id(&model.id, Source::State)?.to_string();

        let outcome = client
            .get(&usage_group_path(org, &set_id, &group_id), &mut model)
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
        let state = UsageGroupModel::from_state(&prior)?;
        let plan = UsageGroupModel::from_state(&planned)?;
        let set_id = usage_group_set_id(&plan.usage_group_set_id, Source::Plan)?.to_string();
        let group_id = usage_group_id(&plan.id, Source::Plan)?.to_string();

        client.get_or_create_version(&set_id).await?;

        let mut model = UsageGroupModel {
            name: plan.name,
            order: plan.order,
            budget: plan.budget,
            filter_expression_json: plan.filter_expression_json,
            ..state.clone()
        };
        let request = model.update_request();
        client
            .put(&usage_group_path(org, &set_id, &group_id), &request, Some(&mut model))
            .await?
            .require_found()?;
        model.organization_id = StringValue::known(org.to_string());
        model.usage_group_set_id = state.usage_group_set_id.clone();

        info!(id = %group_id, set_id = %set_id, "Updated usage group");
        applied_state(&model)
    }

    #[instrument(skip(self, current), fields(resource = TYPE_NAME))]
    async fn delete(&self, current: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let client = self.client()?;
        let org = organization_id(client)?;
        let model = UsageGroupModel::from_state(&current)?;
        let set_id = usage_group_set_id(&model.usage_group_set_id, Source::State)?;
        let group_id = usage_group_id(&model.id, Source::State)?;

        client.get_or_create_version(set_id).await?;

        let outcome = client
            .delete(&usage_group_path(org, set_id, group_id))
            .await?;
        info!(id = group_id, set_id, "Deleted usage group");
        Ok(outcome.warning().into_iter().collect())
    }

    async fn import(&self, id: &str) -> Result<Value, ProviderError> {
        let (set_id, group_id) = parse_import_id(id)?;
        let model = UsageGroupModel {
            id: StringValue::known(group_id.to_string()),
            usage_group_set_id: StringValue::known(set_id.to_string()),
            ..Default::default()
        };
        Ok(model.to_state()?)
    }
}
