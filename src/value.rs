//! Tri-state attribute values.
//!
//! Every scalar attribute of a resource model is in exactly one of three
//! states: explicitly absent ([`TriState::Null`]), not yet resolved by the
//! planning phase ([`TriState::Unknown`]), or known ([`TriState::Known`]).
//!
//! ```
//! use select_provider::value::{Int64Value, StringValue};
//!
//! let name = StringValue::known("finance".to_string());
//! assert_eq!(name.value().map(String::as_str), Some("finance"));
//!
//! let order = Int64Value::unknown();
//! assert!(order.is_unknown());
//! assert_eq!(order.value(), None);
//! ```

/// The state of a single attribute value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TriState<T> {
    /// The value is explicitly absent.
    #[default]
    Null,
    /// The value will only be known after apply.
    Unknown,
    /// The value is known.
    Known(T),
}

/// A tri-state string attribute.
pub type StringValue = TriState<String>;
/// A tri-state 64-bit integer attribute.
pub type Int64Value = TriState<i64>;
/// A tri-state boolean attribute.
pub type BoolValue = TriState<bool>;
/// A tri-state 64-bit float attribute.
pub type Float64Value = TriState<f64>;

impl<T> TriState<T> {
    /// Create a null value.
    pub fn null() -> Self {
        Self::Null
    }

    /// Create an unknown value.
    pub fn unknown() -> Self {
        Self::Unknown
    }

    /// Create a known value.
    pub fn known(value: T) -> Self {
        Self::Known(value)
    }

    /// Returns true if the value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns true if the value is unknown.
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// Returns true if the value is known.
    pub fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }

    /// The typed payload, only present for known values.
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Known(value) => Some(value),
            Self::Null | Self::Unknown => None,
        }
    }

    /// Consume the value, returning the payload if it is known.
    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Known(value) => Some(value),
            Self::Null | Self::Unknown => None,
        }
    }
}

impl StringValue {
    /// The string payload, or `""` when the value is null or unknown.
    pub fn value_str(&self) -> &str {
        self.value().map(String::as_str).unwrap_or_default()
    }
}

impl<T> From<T> for TriState<T> {
    fn from(value: T) -> Self {
        Self::Known(value)
    }
}

impl<T> From<Option<T>> for TriState<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Self::Known)
    }
}

impl From<&str> for StringValue {
    fn from(value: &str) -> Self {
        Self::Known(value.to_string())
    }
}
