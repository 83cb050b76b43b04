//! SELECT Provider
//!
//! This crate implements the core of a Terraform provider for the SELECT
//! usage-group API: usage group sets and the usage groups inside them.
//!
//! # Overview
//!
//! - **Tri-state values** ([`value`]): null, unknown or known, for every field
//!   the runtime hands over
//! - **Model conversion** ([`convert`]): one descriptor per model drives both
//!   the API payload and the runtime state
//! - **HTTP client** ([`client`]): bearer-authenticated JSON requests with the
//!   API's status semantics, behind a swappable transport
//! - **Versions** ([`version`]): every mutation of a set during one apply is
//!   grouped under a single version token
//! - **Resources** ([`resources`]): `select_usage_group_set` and
//!   `select_usage_group`
//! - **Provider** ([`SelectProvider`]): configuration, planning and dispatch
//!   through the [`ProviderService`] contract
//!
//! # Quick Start
//!
//! ```no_run
//! use select_provider::{ProviderService, SelectProvider};
//! use serde_json::json;
//!
//! # async fn run() -> Result<(), select_provider::ProviderError> {
//! select_provider::init_logging();
//!
//! let provider = SelectProvider::new();
//! let diagnostics = provider
//!     .configure(json!({"api_key": "sk-...", "organization_id": "my-org"}))
//!     .await?;
//! assert!(diagnostics.is_empty());
//!
//! let plan = provider
//!     .plan("select_usage_group_set", None, json!({"name": "Finance"}), json!({"name": "Finance"}))
//!     .await?;
//! let state = provider
//!     .create("select_usage_group_set", plan.planned_state)
//!     .await?;
//! println!("created {}", state["id"]);
//! # Ok(())
//! # }
//! ```
//!
//! # Unknown values
//!
//! Configuration, plan and state are `serde_json::Value`s. A value that is
//! not known until apply is the string [`convert::UNKNOWN_SENTINEL`]; `null`
//! or a missing key is null.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod convert;
pub mod error;
pub mod logging;
pub mod normalize;
pub mod plan;
pub mod provider;
pub mod resources;
pub mod schema;
pub mod service;
pub mod testing;
pub mod types;
pub mod validation;
pub mod value;
pub mod version;

// Re-export main types at crate root
pub use client::{ApiClient, ApiOutcome, ApiTransport, ReqwestTransport};
pub use config::{ClientOptions, ProviderConfig};
pub use error::{ProviderError, TransportError};
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use provider::SelectProvider;
pub use schema::ProviderSchema;
pub use service::ProviderService;
pub use types::{AttributeChange, ImportedResource, PlanResult, ProviderMetadata, ReadResult};
pub use validation::{is_valid, validate, validate_result};
pub use value::{BoolValue, Float64Value, Int64Value, StringValue, TriState};

// Re-export async_trait for convenience
pub use async_trait::async_trait;

// Re-export commonly used external types
pub use serde_json;
pub use tracing;
