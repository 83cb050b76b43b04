//! Provider configuration.

use std::fmt;
use std::sync::OnceLock;
use std::time::Duration;

use serde_json::Value;

use crate::convert::{ApiModel, ModelSchema};
use crate::error::ProviderError;
use crate::field;
use crate::schema::{Attribute, Schema};
use crate::value::StringValue;

/// The production API host, used when `select_api_url` is not set.
pub const DEFAULT_API_URL: &str = "https://api.select.dev";

/// The provider block as configured by the user.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ProviderConfigModel {
    /// API key for the Select API.
    pub api_key: StringValue,
    /// Organization that owns every managed object.
    pub organization_id: StringValue,
    /// Base URL override.
    pub select_api_url: StringValue,
}

impl ApiModel for ProviderConfigModel {
    fn model_schema() -> &'static ModelSchema<Self> {
        static SCHEMA: OnceLock<ModelSchema<ProviderConfigModel>> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            ModelSchema::build(
                "provider",
                vec![
                    field!(string, ProviderConfigModel, api_key).tfsdk("api_key"),
                    field!(string, ProviderConfigModel, organization_id).tfsdk("organization_id"),
                    field!(string, ProviderConfigModel, select_api_url).tfsdk("select_api_url"),
                ],
            )
        })
    }
}

/// Schema of the provider block.
pub fn provider_schema() -> Schema {
    Schema::v0()
        .with_description("Manage SELECT usage groups and usage group sets")
        .with_attribute(
            "api_key",
            Attribute::required_string()
                .sensitive()
                .with_description("API key for authentication with the Select API"),
        )
        .with_attribute(
            "organization_id",
            Attribute::required_string().with_description("Organization ID for the Select API"),
        )
        .with_attribute(
            "select_api_url",
            Attribute::optional_string().with_description("Base URL for the Select API"),
        )
}

/// Validated provider settings.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Bearer credential for every request.
    pub api_key: String,
    /// Scopes every endpoint path.
    pub organization_id: String,
    /// Base URL without a trailing slash.
    pub base_url: String,
}

impl ProviderConfig {
    /// Build settings from a configuration value.
    pub fn from_value(config: &Value) -> Result<Self, ProviderError> {
        let model = ProviderConfigModel::from_state(config)?;
        Self::from_model(&model)
    }

    /// Validate a decoded provider block.
    pub fn from_model(model: &ProviderConfigModel) -> Result<Self, ProviderError> {
        let api_key = required(
            &model.api_key,
            ("Missing API Key", "The provider requires an api_key to be configured."),
            ("Empty API Key", "The api_key cannot be empty."),
        )?;
        let organization_id = required(
            &model.organization_id,
            (
                "Missing Organization ID",
                "The provider requires an organization_id to be configured.",
            ),
            ("Empty Organization ID", "The organization_id cannot be empty."),
        )?;

        let base_url = match model.select_api_url.value_str() {
            "" => DEFAULT_API_URL,
            url => url,
        };

        Ok(Self {
            api_key,
            organization_id,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &"<redacted>")
            .field("organization_id", &self.organization_id)
            .field("base_url", &self.base_url)
            .finish()
    }
}

fn required(
    value: &StringValue,
    missing: (&str, &str),
    empty: (&str, &str),
) -> Result<String, ProviderError> {
    match value.value() {
        None => Err(ProviderError::configuration(missing.0, missing.1)),
        Some(s) if s.is_empty() => Err(ProviderError::configuration(empty.0, empty.1)),
        Some(s) => Ok(s.clone()),
    }
}

/// HTTP client tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// Timeout for a whole request, including reading the body.
    pub timeout: Duration,
    /// Idle connections kept per host. Above the runtime's default parallelism of 10.
    pub pool_max_idle_per_host: usize,
    /// How long an idle connection is kept.
    pub pool_idle_timeout: Duration,
    /// `User-Agent` header value.
    pub user_agent: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(90),
            pool_max_idle_per_host: 12,
            pool_idle_timeout: Duration::from_secs(90),
            user_agent: concat!("select-provider/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::UNKNOWN_SENTINEL;
    use serde_json::json;

    fn summary(err: ProviderError) -> String {
        err.summary().to_string()
    }

    #[test]
    fn test_defaults_base_url() {
        let config = ProviderConfig::from_value(&json!({
            "api_key": "secret",
            "organization_id": "org-1"
        }))
        .unwrap();

        assert_eq!(config.base_url, DEFAULT_API_URL);
        assert_eq!(config.organization_id, "org-1");
    }

    #[test]
    fn test_trims_trailing_slash() {
        let config = ProviderConfig::from_value(&json!({
            "api_key": "secret",
            "organization_id": "org-1",
            "select_api_url": "http://localhost:8080/"
        }))
        .unwrap();

        assert_eq!(config.base_url, "http://localhost:8080");
    }

    #[test]
    fn test_empty_url_uses_default() {
        let config = ProviderConfig::from_value(&json!({
            "api_key": "secret",
            "organization_id": "org-1",
            "select_api_url": ""
        }))
        .unwrap();

        assert_eq!(config.base_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_missing_and_empty_api_key() {
        let err = ProviderConfig::from_value(&json!({"organization_id": "org"})).unwrap_err();
        assert_eq!(summary(err), "Missing API Key");

        let err = ProviderConfig::from_value(&json!({
            "api_key": UNKNOWN_SENTINEL,
            "organization_id": "org"
        }))
        .unwrap_err();
        assert_eq!(summary(err), "Missing API Key");

        let err =
            ProviderConfig::from_value(&json!({"api_key": "", "organization_id": "org"})).unwrap_err();
        assert_eq!(summary(err), "Empty API Key");
    }

    #[test]
    fn test_missing_and_empty_organization() {
        let err = ProviderConfig::from_value(&json!({"api_key": "k"})).unwrap_err();
        assert_eq!(summary(err), "Missing Organization ID");

        let err =
            ProviderConfig::from_value(&json!({"api_key": "k", "organization_id": ""})).unwrap_err();
        assert_eq!(summary(err), "Empty Organization ID");
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = ProviderConfig {
            api_key: "super-secret".to_string(),
            organization_id: "org".to_string(),
            base_url: DEFAULT_API_URL.to_string(),
        };
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_schema_marks_api_key_sensitive() {
        let schema = provider_schema();
        assert!(schema.attributes["api_key"].flags.sensitive);
        assert!(schema.attributes["organization_id"].flags.required);
        assert!(schema.attributes["select_api_url"].flags.optional);
    }

    #[test]
    fn test_client_options_default() {
        let options = ClientOptions::default();
        assert_eq!(options.timeout, Duration::from_secs(90));
        assert!(options.pool_max_idle_per_host > 10);
        assert!(options.user_agent.starts_with("select-provider/"));
    }
}
