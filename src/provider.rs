//! The SELECT provider.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::client::{ApiClient, ApiTransport};
use crate::config::{provider_schema, ClientOptions, ProviderConfig};
use crate::error::ProviderError;
use crate::plan::plan;
use crate::resources::{ResourceHandler, UsageGroupResource, UsageGroupSetResource};
use crate::schema::{Diagnostic, ProviderSchema};
use crate::service::ProviderService;
use crate::types::{ImportedResource, PlanResult, ProviderMetadata, ReadResult};

/// Provider type name and resource type prefix.
pub const PROVIDER_TYPE_NAME: &str = "select";

type Handlers = HashMap<&'static str, Arc<dyn ResourceHandler>>;

#[derive(Default)]
struct Bound {
    client: Option<Arc<ApiClient>>,
    handlers: Handlers,
}

impl Bound {
    fn new(client: Option<Arc<ApiClient>>) -> Self {
        let (set, group) = match &client {
            Some(client) => (
                UsageGroupSetResource::with_client(client.clone()),
                UsageGroupResource::with_client(client.clone()),
            ),
            None => (UsageGroupSetResource::new(), UsageGroupResource::new()),
        };
        let handlers: [Arc<dyn ResourceHandler>; 2] = [Arc::new(set), Arc::new(group)];
        Self {
            client,
            handlers: handlers.into_iter().map(|h| (h.type_name(), h)).collect(),
        }
    }
}

/// Serves the `select_usage_group_set` and `select_usage_group` resources.
///
/// Handlers exist from construction but only work after
/// [`ProviderService::configure`] binds them to an [`ApiClient`].
/// Reconfiguring or stopping cancels the previous client's requests.
pub struct SelectProvider {
    options: ClientOptions,
    transport: Option<Arc<dyn ApiTransport>>,
    bound: RwLock<Bound>,
}

impl std::fmt::Debug for SelectProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectProvider")
            .field("options", &self.options)
            .field("client", &self.client())
            .finish_non_exhaustive()
    }
}

impl Default for SelectProvider {
    fn default() -> Self {
        Self::with_options(ClientOptions::default())
    }
}

impl SelectProvider {
    /// A provider that talks HTTP with the default client options.
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider that talks HTTP with the given client options.
    pub fn with_options(options: ClientOptions) -> Self {
        Self {
            options,
            transport: None,
            bound: RwLock::new(Bound::new(None)),
        }
    }

    /// A provider whose clients use `transport` instead of HTTP.
    pub fn with_transport(transport: Arc<dyn ApiTransport>) -> Self {
        Self {
            transport: Some(transport),
            ..Self::default()
        }
    }

    /// The client bound by the last successful configure.
    pub fn client(&self) -> Option<Arc<ApiClient>> {
        self.bound
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .client
            .clone()
    }

    fn handler(&self, resource_type: &str) -> Result<Arc<dyn ResourceHandler>, ProviderError> {
        self.bound
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .handlers
            .get(resource_type)
            .cloned()
            .ok_or_else(|| ProviderError::UnknownResource(resource_type.to_string()))
    }

    fn build_client(&self, config: &ProviderConfig) -> Result<ApiClient, ProviderError> {
        match &self.transport {
            Some(transport) => Ok(ApiClient::new(config, transport.clone())),
            None => ApiClient::with_options(config, &self.options),
        }
    }

    fn rebind(&self, client: Option<Arc<ApiClient>>) {
        let previous = {
            let mut bound = self.bound.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *bound, Bound::new(client))
        };
        if let Some(previous) = previous.client {
            previous.cancel();
        }
    }
}

#[async_trait::async_trait]
impl ProviderService for SelectProvider {
    fn schema(&self) -> ProviderSchema {
        let bound = self.bound.read().unwrap_or_else(PoisonError::into_inner);
        bound.handlers.values().fold(
            ProviderSchema::new().with_provider_config(provider_schema()),
            |schema, handler| schema.with_resource(handler.type_name(), handler.schema()),
        )
    }

    fn metadata(&self) -> ProviderMetadata {
        let mut resources: Vec<String> = self.schema().resources.into_keys().collect();
        resources.sort();
        ProviderMetadata {
            type_name: PROVIDER_TYPE_NAME.to_string(),
            resources,
        }
    }

    #[instrument(skip(self, config))]
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let settings = match ProviderConfig::from_value(&config) {
            Ok(settings) => settings,
            Err(err) => {
                warn!(error = %err, "Rejected provider configuration");
                return Ok(vec![err.to_diagnostic()]);
            },
        };
        let client = match self.build_client(&settings) {
            Ok(client) => client,
            Err(err) => return Ok(vec![err.to_diagnostic()]),
        };

        self.rebind(Some(Arc::new(client)));
        info!(
            organization_id = %settings.organization_id,
            base_url = %settings.base_url,
            "Configured provider"
        );
        Ok(vec![])
    }

    async fn stop(&self) -> Result<(), ProviderError> {
        if let Some(client) = self.client() {
            client.cancel();
            info!("Stopped provider, in-flight requests cancelled");
        }
        Ok(())
    }

    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        _config: Value,
    ) -> Result<PlanResult, ProviderError> {
        let handler = self.handler(resource_type)?;
        Ok(plan(&handler.schema(), prior_state.as_ref(), &proposed_state))
    }

    async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError> {
        self.handler(resource_type)?.create(planned_state).await
    }

    async fn read(&self, resource_type: &str, current_state: Value) -> Result<ReadResult, ProviderError> {
        self.handler(resource_type)?.read(current_state).await
    }

    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.handler(resource_type)?
            .update(prior_state, planned_state)
            .await
    }

    async fn delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        self.handler(resource_type)?.delete(current_state).await
    }

    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        let state = self.handler(resource_type)?.import(id).await?;
        Ok(vec![ImportedResource::new(resource_type, state)])
    }
}
