//! Per-apply version tokens.
//!
//! The API groups every mutation of a usage group set made during one apply
//! under a version. The first mutation of a set creates it; every later one,
//! concurrent or not, reuses the outcome of that single call. A failure is
//! memoized the same way and there is no retry within a client's lifetime.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use tracing::{debug, error, info};

use crate::convert::{ApiModel, ModelSchema};
use crate::error::ProviderError;
use crate::field;
use crate::value::StringValue;

/// Response of `POST /api/{org}/usage-group-sets/{set}/versions`.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct VersionModel {
    /// The version token.
    pub id: StringValue,
    /// Creation timestamp.
    pub created_at: StringValue,
    /// Who created the version.
    pub created_by: StringValue,
    /// The set the version belongs to.
    pub usage_group_set_id: StringValue,
}

impl ApiModel for VersionModel {
    fn model_schema() -> &'static ModelSchema<Self> {
        static SCHEMA: OnceLock<ModelSchema<VersionModel>> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            ModelSchema::build(
                "version",
                vec![
                    field!(string, VersionModel, id).json("id"),
                    field!(string, VersionModel, created_at).json("created_at"),
                    field!(string, VersionModel, created_by).json("created_by"),
                    field!(string, VersionModel, usage_group_set_id).json("usage_group_set_id"),
                ],
            )
        })
    }
}

/// A request body that encodes to `{}`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EmptyBody;

impl ApiModel for EmptyBody {
    fn model_schema() -> &'static ModelSchema<Self> {
        static SCHEMA: OnceLock<ModelSchema<EmptyBody>> = OnceLock::new();
        SCHEMA.get_or_init(|| ModelSchema::build("empty", Vec::new()))
    }
}

#[derive(Debug, Default)]
enum VersionState {
    #[default]
    NotStarted,
    Succeeded(String),
    Failed(String),
}

/// Execute-once cells for version tokens, one per usage group set.
///
/// Versions are created under a set's endpoint, so a token is only valid for
/// that set and one client may hold several.
#[derive(Debug, Default)]
pub struct VersionCoordinator {
    cells: Mutex<HashMap<String, Arc<tokio::sync::Mutex<VersionState>>>>,
}

impl VersionCoordinator {
    /// Create a coordinator with no versions.
    pub fn new() -> Self {
        Self::default()
    }

    fn cell(&self, set_id: &str) -> Arc<tokio::sync::Mutex<VersionState>> {
        let mut cells = self.cells.lock().unwrap_or_else(PoisonError::into_inner);
        cells.entry(set_id.to_string()).or_default().clone()
    }

    /// Return the token for `set_id`, running `create` if no caller has yet.
    ///
    /// Concurrent callers wait for the running `create` and observe its
    /// outcome. `create` reports failure as a message, which every caller
    /// receives as [`ProviderError::VersionCreation`]. If the caller running
    /// `create` is dropped before it finishes, the next caller runs it again.
    pub async fn get_or_create<F, Fut>(&self, set_id: &str, create: F) -> Result<String, ProviderError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, String>>,
    {
        let cell = self.cell(set_id);
        let mut state = cell.lock().await;

        match &*state {
            VersionState::Succeeded(token) => return Ok(token.clone()),
            VersionState::Failed(cause) => return Err(ProviderError::VersionCreation(cause.clone())),
            VersionState::NotStarted => {},
        }

        debug!(set_id, "Creating version");
        match create().await {
            Ok(token) => {
                info!(set_id, version = %token, "Created version");
                *state = VersionState::Succeeded(token.clone());
                Ok(token)
            },
            Err(cause) => {
                error!(set_id, error = %cause, "Version creation failed");
                *state = VersionState::Failed(cause.clone());
                Err(ProviderError::VersionCreation(cause))
            },
        }
    }

    /// The memoized token for `set_id`, if creation has succeeded.
    pub fn token(&self, set_id: &str) -> Option<String> {
        let cell = self
            .cells
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(set_id)
            .cloned()?;
        let state = cell.try_lock().ok()?;
        match &*state {
            VersionState::Succeeded(token) => Some(token.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::ApiObject;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_first_call_creates() {
        let coordinator = VersionCoordinator::new();
        let token = tokio_test::assert_ok!(
            coordinator
                .get_or_create("s1", || async { Ok("v-1".to_string()) })
                .await
        );
        assert_eq!(token, "v-1");
        assert_eq!(coordinator.token("s1"), Some("v-1".to_string()));
    }

    #[tokio::test]
    async fn test_later_calls_reuse_token() {
        let coordinator = VersionCoordinator::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let token = coordinator
                .get_or_create("s1", || async {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    Ok(format!("v-{}", n))
                })
                .await
                .unwrap();
            assert_eq!(token, "v-0");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_callers_make_one_call() {
        let coordinator = Arc::new(VersionCoordinator::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let coordinator = coordinator.clone();
                let calls = calls.clone();
                tokio::spawn(async move {
                    coordinator
                        .get_or_create("s1", || async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(25)).await;
                            Ok("v-shared".to_string())
                        })
                        .await
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "v-shared");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_is_memoized_for_every_caller() {
        let coordinator = Arc::new(VersionCoordinator::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let coordinator = coordinator.clone();
                let calls = calls.clone();
                tokio::spawn(async move {
                    coordinator
                        .get_or_create("s1", || async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(10)).await;
                            Err("failed to create version: boom".to_string())
                        })
                        .await
                })
            })
            .collect();

        for handle in handles {
            let err = handle.await.unwrap().unwrap_err();
            assert_eq!(err.summary(), "Version Creation Error");
            assert_eq!(err.detail(), "failed to create version: boom");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(coordinator.token("s1"), None);
    }

    #[tokio::test]
    async fn test_sets_are_independent() {
        let coordinator = VersionCoordinator::new();
        let a = coordinator
            .get_or_create("a", || async { Ok("v-a".to_string()) })
            .await
            .unwrap();
        let b = coordinator
            .get_or_create("b", || async { Ok("v-b".to_string()) })
            .await
            .unwrap();
        assert_eq!(a, "v-a");
        assert_eq!(b, "v-b");
    }

    #[tokio::test]
    async fn test_dropped_creator_does_not_poison() {
        let coordinator = Arc::new(VersionCoordinator::new());

        let pending = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move {
                coordinator
                    .get_or_create("s1", || async {
                        tokio::time::sleep(Duration::from_secs(60)).await;
                        Ok("never".to_string())
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        pending.abort();
        let _ = pending.await;

        let token = coordinator
            .get_or_create("s1", || async { Ok("v-2".to_string()) })
            .await
            .unwrap();
        assert_eq!(token, "v-2");
    }

    #[test]
    fn test_version_model_decodes_response() {
        let mut version = VersionModel::default();
        let body = json!({
            "id": "v-1",
            "created_at": "2024-01-01T00:00:00Z",
            "created_by": "user@example.com",
            "usage_group_set_id": "s1"
        });
        version.decode_api(body.as_object().unwrap());
        assert_eq!(version.id, StringValue::from("v-1"));
        assert_eq!(version.usage_group_set_id, StringValue::from("s1"));
    }

    #[test]
    fn test_empty_body_encodes_to_empty_object() {
        let encoded = EmptyBody.encode_api().unwrap();
        assert!(encoded.is_empty());
    }
}
