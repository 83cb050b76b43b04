//! Resource handlers.
//!
//! Each handler owns one resource type: its model, its schema and the CRUD
//! calls against the API. Handlers are cheap to clone and hold the client
//! bound by `configure`, if any.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::client::ApiClient;
use crate::convert::{ApiModel, UNKNOWN_SENTINEL};
use crate::error::ProviderError;
use crate::schema::{Diagnostic, Schema};
use crate::types::ReadResult;
use crate::value::StringValue;

pub mod usage_group;
pub mod usage_group_set;

pub use usage_group::{UsageGroupModel, UsageGroupResource};
pub use usage_group_set::{UsageGroupSetModel, UsageGroupSetResource};

/// Operations of a single resource type.
///
/// State values are runtime JSON: `null` for null and
/// [`UNKNOWN_SENTINEL`] for unknown.
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    /// The full resource type name, e.g. `select_usage_group_set`.
    fn type_name(&self) -> &'static str;

    /// The resource schema.
    fn schema(&self) -> Schema;

    /// Create the resource described by `planned` and return its state.
    async fn create(&self, planned: Value) -> Result<Value, ProviderError>;

    /// Refresh `current` from the API.
    async fn read(&self, current: Value) -> Result<ReadResult, ProviderError>;

    /// Apply `planned` to the resource described by `prior`.
    async fn update(&self, prior: Value, planned: Value) -> Result<Value, ProviderError>;

    /// Delete the resource, returning warnings.
    async fn delete(&self, current: Value) -> Result<Vec<Diagnostic>, ProviderError>;

    /// Turn an import identifier into a partial state for a following read.
    async fn import(&self, id: &str) -> Result<Value, ProviderError>;
}

pub(crate) fn configured<'a>(
    client: &'a Option<Arc<ApiClient>>,
    type_name: &str,
) -> Result<&'a ApiClient, ProviderError> {
    client.as_deref().ok_or_else(|| {
        ProviderError::configuration(
            "Unconfigured Resource",
            format!(
                "The {} resource was used before the provider was configured.",
                type_name
            ),
        )
    })
}

/// Where a required identifier was looked up, for error details.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Source {
    Configuration,
    Plan,
    State,
}

impl Source {
    fn describe(self) -> &'static str {
        match self {
            Self::Configuration => "was not provided in the configuration",
            Self::Plan => "was not found in the plan",
            Self::State => "was not found in the state",
        }
    }
}

pub(crate) fn organization_id(client: &ApiClient) -> Result<&str, ProviderError> {
    match client.organization_id() {
        "" => Err(ProviderError::missing_id(
            "Missing Organization ID",
            "organization_id is required but was not configured.",
        )),
        org => Ok(org),
    }
}

pub(crate) fn usage_group_set_id(value: &StringValue, source: Source) -> Result<&str, ProviderError> {
    match value.value_str() {
        "" => Err(ProviderError::missing_id(
            "Missing Usage Group Set ID",
            format!("usage_group_set_id is required but {}.", source.describe()),
        )),
        id => Ok(id),
    }
}

pub(crate) fn usage_group_id(value: &StringValue, source: Source) -> Result<&str, ProviderError> {
    match value.value_str() {
        "" => Err(ProviderError::missing_id(
            "Missing Usage Group ID",
            format!("usage_group_id is required but {}.", source.describe()),
        )),
        id => Ok(id),
    }
}

/// True if `id` can be placed in an endpoint path as a single segment.
pub(crate) fn is_path_segment(id: &str) -> bool {
    !id.is_empty() && !id.contains(['/', '?', '#'])
}

pub(crate) fn usage_group_sets_path(org: &str) -> String {
    format!("/api/{}/usage-group-sets", org)
}

pub(crate) fn usage_group_set_path(org: &str, set_id: &str) -> String {
    format!("/api/{}/usage-group-sets/{}", org, set_id)
}

pub(crate) fn usage_groups_path(org: &str, set_id: &str) -> String {
    format!("/api/{}/usage-group-sets/{}/usage-groups", org, set_id)
}

pub(crate) fn usage_group_path(org: &str, set_id: &str, group_id: &str) -> String {
    format!("/api/{}/usage-group-sets/{}/usage-groups/{}", org, set_id, group_id)
}

/// Render a model as state after apply. Values the API did not return stay
/// unresolved in the model and are written as null.
pub(crate) fn applied_state<M: ApiModel>(model: &M) -> Result<Value, ProviderError> {
    let mut state = model.to_state()?;
    settle_unknowns(&mut state);
    Ok(state)
}

fn settle_unknowns(value: &mut Value) {
    if value.as_str() == Some(UNKNOWN_SENTINEL) {
        *value = Value::Null;
        return;
    }
    match value {
        Value::Object(map) => map.values_mut().for_each(settle_unknowns),
        Value::Array(items) => items.iter_mut().for_each(settle_unknowns),
        _ => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_paths() {
        assert_eq!(usage_group_sets_path("o"), "/api/o/usage-group-sets");
        assert_eq!(usage_group_set_path("o", "s"), "/api/o/usage-group-sets/s");
        assert_eq!(usage_groups_path("o", "s"), "/api/o/usage-group-sets/s/usage-groups");
        assert_eq!(
            usage_group_path("o", "s", "g"),
            "/api/o/usage-group-sets/s/usage-groups/g"
        );
    }

    #[test]
    fn test_missing_ids_are_errors() {
        let err = usage_group_set_id(&StringValue::null(), Source::State).unwrap_err();
        assert_eq!(err.summary(), "Missing Usage Group Set ID");
        assert_eq!(
            err.detail(),
            "usage_group_set_id is required but was not found in the state."
        );

        let err = usage_group_set_id(&StringValue::from(""), Source::Configuration).unwrap_err();
        assert_eq!(
            err.detail(),
            "usage_group_set_id is required but was not provided in the configuration."
        );

        let err = usage_group_id(&StringValue::unknown(), Source::Plan).unwrap_err();
        assert_eq!(err.summary(), "Missing Usage Group ID");
        assert_eq!(err.detail(), "usage_group_id is required but was not found in the plan.");

        assert_eq!(usage_group_id(&StringValue::from("g"), Source::State).unwrap(), "g");
    }

    #[test]
    fn test_is_path_segment() {
        assert!(is_path_segment("0b6f2c8e-set"));
        for bad in ["", "a/b", "x?y", "x#y"] {
            assert!(!is_path_segment(bad), "{} accepted", bad);
        }
    }

    #[test]
    fn test_settle_unknowns() {
        let mut value = json!({"a": UNKNOWN_SENTINEL, "b": {"c": UNKNOWN_SENTINEL}, "d": "x"});
        settle_unknowns(&mut value);
        assert_eq!(value, json!({"a": null, "b": {"c": null}, "d": "x"}));
    }
}
