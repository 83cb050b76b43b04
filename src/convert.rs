//! Conversion between tri-state models and plain JSON.
//!
//! Every model describes its fields once through a [`ModelSchema`]: the Rust
//! field name, an optional `json` tag, an optional `tfsdk` tag and a typed
//! accessor pair. Two JSON shapes are derived from that descriptor:
//!
//! - The **API shape** ([`ModelSchema::encode`] / [`ModelSchema::decode`]),
//!   keyed by wire name. Null and unknown values are omitted so a partially
//!   known plan never overwrites server data; decoding only touches keys that
//!   are present so responses can be merged into an existing model.
//! - The **state shape** ([`ModelSchema::to_state`] /
//!   [`ModelSchema::apply_state`]), keyed by the `tfsdk` name, which is what
//!   the runtime hands us for configuration, plan and state. Null is `null`
//!   and unknown is [`UNKNOWN_SENTINEL`].
//!
//! # Wire name resolution
//!
//! The `json` tag wins, then the `tfsdk` tag, then the field name. A tag of
//! `""` or `"-"` is ignored. Anything after the first `,` in the winning tag
//! (such as `omitempty`) is stripped before the name is used as a key.
//!
//! # Example
//!
//! ```
//! use std::sync::OnceLock;
//! use select_provider::convert::{ApiModel, ModelSchema};
//! use select_provider::field;
//! use select_provider::value::{Int64Value, StringValue};
//!
//! #[derive(Debug, Default)]
//! struct Team {
//!     name: StringValue,
//!     size: Int64Value,
//! }
//!
//! impl ApiModel for Team {
//!     fn model_schema() -> &'static ModelSchema<Self> {
//!         static SCHEMA: OnceLock<ModelSchema<Team>> = OnceLock::new();
//!         SCHEMA.get_or_init(|| {
//!             ModelSchema::build(
//!                 "team",
//!                 vec![
//!                     field!(string, Team, name).json("name,omitempty"),
//!                     field!(int64, Team, size).tfsdk("team_size"),
//!                 ],
//!             )
//!         })
//!     }
//! }
//!
//! let team = Team { name: "data".into(), size: Int64Value::unknown() };
//! let encoded = Team::model_schema().encode(&team).unwrap();
//! assert_eq!(serde_json::Value::Object(encoded), serde_json::json!({"name": "data"}));
//! ```

use std::collections::HashSet;

use serde_json::{Map, Value as Json};
use thiserror::Error;

use crate::normalize::normalize_json_lossy;
use crate::value::{BoolValue, Float64Value, Int64Value, StringValue, TriState};

/// Marker the runtime uses for values that are not known until apply.
pub const UNKNOWN_SENTINEL: &str = "74D93920-ED26-11E3-AC10-0800200C9A66";

/// Wire names whose string values hold JSON text and are normalized on decode.
pub const JSON_TEXT_FIELDS: &[&str] = &["filter_expression_json"];

/// Errors raised while converting a model at runtime.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConvertError {
    /// A float attribute holds NaN or an infinity, which JSON cannot carry.
    #[error("attribute '{field}' holds a non-finite float")]
    NonFiniteFloat {
        /// The attribute name.
        field: String,
    },
    /// A state value does not have the type the attribute requires.
    #[error("attribute '{field}' expected {expected}, got {actual}")]
    TypeMismatch {
        /// The attribute name.
        field: String,
        /// The type the attribute requires.
        expected: &'static str,
        /// The JSON type that was found.
        actual: &'static str,
    },
    /// A model was decoded from something that is not an object.
    #[error("expected an object, got {0}")]
    NotAnObject(&'static str),
}

/// Errors in a model descriptor. These are programming errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// A field's tags resolve to an empty key.
    #[error("field '{0}' resolves to an empty wire name")]
    EmptyWireName(&'static str),
    /// Two fields resolve to the same key.
    #[error("name '{0}' is used by more than one field")]
    DuplicateName(String),
}

/// A scalar payload type usable inside a [`TriState`].
pub trait Scalar: Clone + Send + Sync + 'static {
    /// Name used in error messages.
    const TYPE_NAME: &'static str;

    /// Convert to JSON, or `None` if the value has no JSON representation.
    fn to_json(&self) -> Option<Json>;

    /// Coerce a non-null JSON value, or `None` if the type does not match.
    fn from_json(value: &Json) -> Option<Self>;
}

impl Scalar for String {
    const TYPE_NAME: &'static str = "string";

    fn to_json(&self) -> Option<Json> {
        Some(Json::String(self.clone()))
    }

    fn from_json(value: &Json) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

impl Scalar for i64 {
    const TYPE_NAME: &'static str = "int64";

    fn to_json(&self) -> Option<Json> {
        Some(Json::from(*self))
    }

    // Fractional numbers truncate toward zero.
    fn from_json(value: &Json) -> Option<Self> {
        value
            .as_i64()
            .or_else(|| value.as_f64().map(|f| f as i64))
    }
}

impl Scalar for bool {
    const TYPE_NAME: &'static str = "bool";

    fn to_json(&self) -> Option<Json> {
        Some(Json::Bool(*self))
    }

    fn from_json(value: &Json) -> Option<Self> {
        value.as_bool()
    }
}

impl Scalar for f64 {
    const TYPE_NAME: &'static str = "float64";

    fn to_json(&self) -> Option<Json> {
        serde_json::Number::from_f64(*self).map(Json::Number)
    }

    fn from_json(value: &Json) -> Option<Self> {
        value.as_f64()
    }
}

/// Object-safe view of a model, used for nested fields and request bodies.
pub trait ApiObject: Send + Sync {
    /// Encode into the API shape.
    fn encode_api(&self) -> Result<Map<String, Json>, ConvertError>;

    /// Merge an API response into this object.
    fn decode_api(&mut self, source: &Map<String, Json>);

    /// Encode into the state shape.
    fn encode_state(&self) -> Result<Json, ConvertError>;

    /// Replace this object's fields from a state value.
    fn decode_state(&mut self, state: &Json) -> Result<(), ConvertError>;
}

/// A model with a static field descriptor.
pub trait ApiModel: Default + Send + Sync + 'static {
    /// The descriptor, built once on first use.
    fn model_schema() -> &'static ModelSchema<Self>;

    /// Build a model from a runtime state value.
    fn from_state(state: &Json) -> Result<Self, ConvertError> {
        let mut model = Self::default();
        Self::model_schema().apply_state(&mut model, state)?;
        Ok(model)
    }

    /// Render this model as a runtime state value.
    fn to_state(&self) -> Result<Json, ConvertError> {
        Self::model_schema().to_state(self)
    }
}

impl<M: ApiModel> ApiObject for M {
    fn encode_api(&self) -> Result<Map<String, Json>, ConvertError> {
        M::model_schema().encode(self)
    }

    fn decode_api(&mut self, source: &Map<String, Json>) {
        M::model_schema().decode(self, source)
    }

    fn encode_state(&self) -> Result<Json, ConvertError> {
        M::model_schema().to_state(self)
    }

    fn decode_state(&mut self, state: &Json) -> Result<(), ConvertError> {
        M::model_schema().apply_state(self, state)
    }
}

/// Build a [`Field`] whose accessors point at `model.field`.
///
/// `kind` is one of `string`, `int64`, `bool`, `float64` or `object`.
#[macro_export]
macro_rules! field {
    ($kind:ident, $model:ty, $field:ident) => {
        $crate::convert::Field::<$model>::$kind(
            stringify!($field),
            |m| &m.$field,
            |m| &mut m.$field,
        )
    };
}

struct Accessor<M, T> {
    get: fn(&M) -> &TriState<T>,
    get_mut: fn(&mut M) -> &mut TriState<T>,
}

struct ObjectAccessor<M> {
    get: fn(&M) -> &dyn ApiObject,
    get_mut: fn(&mut M) -> &mut dyn ApiObject,
}

enum Access<M> {
    String(Accessor<M, String>),
    Int64(Accessor<M, i64>),
    Bool(Accessor<M, bool>),
    Float64(Accessor<M, f64>),
    Object(ObjectAccessor<M>),
}

/// One field of a model descriptor.
pub struct Field<M> {
    name: &'static str,
    json: Option<&'static str>,
    tfsdk: Option<&'static str>,
    access: Access<M>,
}

impl<M> Field<M> {
    fn new(name: &'static str, access: Access<M>) -> Self {
        Self {
            name,
            json: None,
            tfsdk: None,
            access,
        }
    }

    /// A string field.
    pub fn string(
        name: &'static str,
        get: fn(&M) -> &StringValue,
        get_mut: fn(&mut M) -> &mut StringValue,
    ) -> Self {
        Self::new(name, Access::String(Accessor { get, get_mut }))
    }

    /// An int64 field.
    pub fn int64(
        name: &'static str,
        get: fn(&M) -> &Int64Value,
        get_mut: fn(&mut M) -> &mut Int64Value,
    ) -> Self {
        Self::new(name, Access::Int64(Accessor { get, get_mut }))
    }

    /// A bool field.
    pub fn bool(
        name: &'static str,
        get: fn(&M) -> &BoolValue,
        get_mut: fn(&mut M) -> &mut BoolValue,
    ) -> Self {
        Self::new(name, Access::Bool(Accessor { get, get_mut }))
    }

    /// A float64 field.
    pub fn float64(
        name: &'static str,
        get: fn(&M) -> &Float64Value,
        get_mut: fn(&mut M) -> &mut Float64Value,
    ) -> Self {
        Self::new(name, Access::Float64(Accessor { get, get_mut }))
    }

    /// A nested object field.
    pub fn object(
        name: &'static str,
        get: fn(&M) -> &dyn ApiObject,
        get_mut: fn(&mut M) -> &mut dyn ApiObject,
    ) -> Self {
        Self::new(name, Access::Object(ObjectAccessor { get, get_mut }))
    }

    /// Set the `json` tag.
    pub fn json(mut self, tag: &'static str) -> Self {
        self.json = Some(tag);
        self
    }

    /// Set the `tfsdk` tag.
    pub fn tfsdk(mut self, tag: &'static str) -> Self {
        self.tfsdk = Some(tag);
        self
    }

    /// The Rust field name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The key used in API payloads.
    pub fn wire_name(&self) -> &'static str {
        let tag = usable_tag(self.json)
            .or_else(|| usable_tag(self.tfsdk))
            .unwrap_or(self.name);
        strip_modifiers(tag)
    }

    /// The key used in runtime state values.
    pub fn state_name(&self) -> &'static str {
        strip_modifiers(usable_tag(self.tfsdk).unwrap_or(self.name))
    }
}

fn usable_tag(tag: Option<&'static str>) -> Option<&'static str> {
    tag.filter(|t| !t.is_empty() && *t != "-")
}

fn strip_modifiers(tag: &'static str) -> &'static str {
    match tag.find(',') {
        Some(idx) => &tag[..idx],
        None => tag,
    }
}

/// The descriptor of a model: its fields and their resolved names.
pub struct ModelSchema<M> {
    model: &'static str,
    fields: Vec<Field<M>>,
}

impl<M> ModelSchema<M> {
    /// Create a descriptor, checking that every field resolves to a distinct,
    /// non-empty wire name and state name.
    pub fn new(model: &'static str, fields: Vec<Field<M>>) -> Result<Self, SchemaError> {
        let mut wire_names = HashSet::new();
        let mut state_names = HashSet::new();
        for field in &fields {
            let wire = field.wire_name();
            let state = field.state_name();
            if wire.is_empty() || state.is_empty() {
                return Err(SchemaError::EmptyWireName(field.name));
            }
            if !wire_names.insert(wire) {
                return Err(SchemaError::DuplicateName(wire.to_string()));
            }
            if !state_names.insert(state) {
                return Err(SchemaError::DuplicateName(state.to_string()));
            }
        }
        Ok(Self { model, fields })
    }

    /// Like [`ModelSchema::new`], for descriptors built at startup.
    ///
    /// # Panics
    ///
    /// Panics if the descriptor is malformed.
    pub fn build(model: &'static str, fields: Vec<Field<M>>) -> Self {
        Self::new(model, fields)
            .unwrap_or_else(|e| panic!("invalid descriptor for model '{}': {}", model, e))
    }

    /// The model name.
    pub fn model(&self) -> &'static str {
        self.model
    }

    /// The fields in declaration order.
    pub fn fields(&self) -> &[Field<M>] {
        &self.fields
    }

    /// Encode `model` into the API shape. Null and unknown values are omitted.
    pub fn encode(&self, model: &M) -> Result<Map<String, Json>, ConvertError> {
        let mut out = Map::new();
        for field in &self.fields {
            let key = field.wire_name();
            let value = match &field.access {
                Access::String(a) => encode_scalar(key, (a.get)(model))?,
                Access::Int64(a) => encode_scalar(key, (a.get)(model))?,
                Access::Bool(a) => encode_scalar(key, (a.get)(model))?,
                Access::Float64(a) => encode_scalar(key, (a.get)(model))?,
                Access::Object(a) => Some(Json::Object((a.get)(model).encode_api()?)),
            };
            if let Some(value) = value {
                out.insert(key.to_string(), value);
            }
        }
        Ok(out)
    }

    /// Merge an API payload into `model`.
    ///
    /// Absent keys leave the field untouched, `null` sets it null, values of
    /// the wrong JSON type are ignored.
    pub fn decode(&self, model: &mut M, source: &Map<String, Json>) {
        for field in &self.fields {
            let key = field.wire_name();
            let Some(value) = source.get(key) else {
                continue;
            };
            match &field.access {
                Access::String(a) => {
                    let decoded = decode_scalar::<String>(value).map(|tri| match tri {
                        TriState::Known(text) if JSON_TEXT_FIELDS.contains(&key) => {
                            TriState::Known(normalize_json_lossy(&text))
                        },
                        other => other,
                    });
                    assign(key, (a.get_mut)(model), decoded);
                },
                Access::Int64(a) => assign(key, (a.get_mut)(model), decode_scalar(value)),
                Access::Bool(a) => assign(key, (a.get_mut)(model), decode_scalar(value)),
                Access::Float64(a) => assign(key, (a.get_mut)(model), decode_scalar(value)),
                Access::Object(a) => match value {
                    Json::Object(map) => (a.get_mut)(model).decode_api(map),
                    Json::Null => {
                        // Null never fails to decode.
                        let _ = (a.get_mut)(model).decode_state(&Json::Null);
                    },
                    other => {
                        tracing::trace!(field = key, got = json_type_name(other), "Ignoring non-object value");
                    },
                },
            }
        }
    }

    /// Render `model` in the state shape.
    pub fn to_state(&self, model: &M) -> Result<Json, ConvertError> {
        let mut out = Map::new();
        for field in &self.fields {
            let key = field.state_name();
            let value = match &field.access {
                Access::String(a) => scalar_state(key, (a.get)(model))?,
                Access::Int64(a) => scalar_state(key, (a.get)(model))?,
                Access::Bool(a) => scalar_state(key, (a.get)(model))?,
                Access::Float64(a) => scalar_state(key, (a.get)(model))?,
                Access::Object(a) => (a.get)(model).encode_state()?,
            };
            out.insert(key.to_string(), value);
        }
        Ok(Json::Object(out))
    }

    /// Replace every field of `model` from a state value.
    ///
    /// A `null` state nulls every field and the unknown marker makes every
    /// field unknown.
    pub fn apply_state(&self, model: &mut M, state: &Json) -> Result<(), ConvertError> {
        let empty = Map::new();
        let null = Json::Null;
        let (source, whole) = match state {
            Json::Object(map) => (map, None),
            Json::Null => (&empty, Some(&null)),
            Json::String(s) if s == UNKNOWN_SENTINEL => (&empty, Some(state)),
            other => return Err(ConvertError::NotAnObject(json_type_name(other))),
        };
        for field in &self.fields {
            let key = field.state_name();
            let value = whole.or_else(|| source.get(key)).unwrap_or(&null);
            match &field.access {
                Access::String(a) => *(a.get_mut)(model) = scalar_from_state(key, value)?,
                Access::Int64(a) => *(a.get_mut)(model) = scalar_from_state(key, value)?,
                Access::Bool(a) => *(a.get_mut)(model) = scalar_from_state(key, value)?,
                Access::Float64(a) => *(a.get_mut)(model) = scalar_from_state(key, value)?,
                Access::Object(a) => (a.get_mut)(model).decode_state(value)?,
            }
        }
        Ok(())
    }
}

fn encode_scalar<T: Scalar>(key: &str, value: &TriState<T>) -> Result<Option<Json>, ConvertError> {
    match value {
        TriState::Null | TriState::Unknown => Ok(None),
        TriState::Known(v) => v.to_json().map(Some).ok_or_else(|| ConvertError::NonFiniteFloat {
            field: key.to_string(),
        }),
    }
}

fn decode_scalar<T: Scalar>(value: &Json) -> Option<TriState<T>> {
    match value {
        Json::Null => Some(TriState::Null),
        other => T::from_json(other).map(TriState::Known),
    }
}

fn assign<T: Scalar>(key: &str, slot: &mut TriState<T>, decoded: Option<TriState<T>>) {
    match decoded {
        Some(value) => *slot = value,
        None => tracing::trace!(field = key, expected = T::TYPE_NAME, "Ignoring mistyped value"),
    }
}

fn scalar_state<T: Scalar>(key: &str, value: &TriState<T>) -> Result<Json, ConvertError> {
    match value {
        TriState::Null => Ok(Json::Null),
        TriState::Unknown => Ok(Json::String(UNKNOWN_SENTINEL.to_string())),
        TriState::Known(v) => v.to_json().ok_or_else(|| ConvertError::NonFiniteFloat {
            field: key.to_string(),
        }),
    }
}

fn scalar_from_state<T: Scalar>(key: &str, value: &Json) -> Result<TriState<T>, ConvertError> {
    match value {
        Json::Null => Ok(TriState::Null),
        Json::String(s) if s == UNKNOWN_SENTINEL => Ok(TriState::Unknown),
        other => T::from_json(other)
            .map(TriState::Known)
            .ok_or_else(|| ConvertError::TypeMismatch {
                field: key.to_string(),
                expected: T::TYPE_NAME,
                actual: json_type_name(other),
            }),
    }
}

/// The JSON type name of a value, for messages.
pub(crate) fn json_type_name(value: &Json) -> &'static str {
    match value {
        Json::Null => "null",
        Json::Bool(_) => "bool",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "list",
        Json::Object(_) => "object",
    }
}
