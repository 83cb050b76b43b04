//! Planning helper.
//!
//! Computes the planned state for a resource from its schema. This is not a
//! diff engine: it compares top-level attributes only and leaves anything the
//! schema does not describe as proposed.

use serde_json::{Map, Value};
use tracing::debug;

use crate::convert::{JSON_TEXT_FIELDS, UNKNOWN_SENTINEL};
use crate::normalize::normalize_json_lossy;
use crate::schema::Schema;
use crate::types::{AttributeChange, PlanResult};

/// Plan a create, update or delete.
///
/// - `prior` absent or null: a create. Computed attributes the proposal
///   leaves null become unknown.
/// - `proposed` null: a delete.
/// - otherwise an update. Configurable attributes that differ from `prior`
///   are changes and a change to a force-new attribute requires
///   replacement. Computed attributes the proposal leaves null take their
///   prior value when nothing changed. When something changed only stable
///   attributes keep it and the rest become unknown. A replacement makes
///   every one of them unknown.
pub fn plan(schema: &Schema, prior: Option<&Value>, proposed: &Value) -> PlanResult {
    let prior = prior.filter(|p| !p.is_null());

    match (prior, proposed) {
        (Some(prior), Value::Null) => plan_delete(prior),
        (None, proposed) => plan_create(schema, proposed),
        (Some(prior), proposed) => plan_update(schema, prior, proposed),
    }
}

fn object(value: &Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    }
}

fn unknown() -> Value {
    Value::String(UNKNOWN_SENTINEL.to_string())
}

fn plan_create(schema: &Schema, proposed: &Value) -> PlanResult {
    let mut planned = object(proposed);

    for (name, attr) in &schema.attributes {
        let unset = planned.get(name).map_or(true, Value::is_null);
        if attr.flags.computed && unset {
            planned.insert(name.clone(), unknown());
        }
    }

    let changes: Vec<_> = planned
        .iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(name, value)| AttributeChange::added(name.clone(), value.clone()))
        .collect();

    debug!(changes = changes.len(), "Planned create");
    PlanResult::with_changes(Value::Object(planned), changes, false)
}

fn plan_update(schema: &Schema, prior: &Value, proposed: &Value) -> PlanResult {
    let prior = object(prior);
    let mut planned = object(proposed);
    let mut changes = Vec::new();
    let mut requires_replace = false;

    for (name, attr) in &schema.attributes {
        if attr.is_computed_only() {
            continue;
        }
        let before = prior.get(name).unwrap_or(&Value::Null);
        let after = planned.get(name).unwrap_or(&Value::Null);
        // Optional+computed left unset follows the computed rules below.
        if attr.flags.computed && after.is_null() {
            continue;
        }
        if equivalent_json_text(name, before, after) {
            // Equivalent JSON keeps the stored text.
            let before = before.clone();
            planned.insert(name.clone(), before);
            continue;
        }
        if before != after {
            changes.push(AttributeChange::modified(name.clone(), before.clone(), after.clone()));
            requires_replace |= attr.force_new;
        }
    }

    for (name, attr) in &schema.attributes {
        if !attr.flags.computed || !planned.get(name).map_or(true, Value::is_null) {
            continue;
        }
        let carried = match prior.get(name) {
            Some(value) if changes.is_empty() => value.clone(),
            Some(value) if attr.stable && !requires_replace => value.clone(),
            _ if changes.is_empty() => Value::Null,
            _ => unknown(),
        };
        planned.insert(name.clone(), carried);
    }

    debug!(changes = changes.len(), requires_replace, "Planned update");
    if changes.is_empty() {
        PlanResult::no_change(Value::Object(planned))
    } else {
        PlanResult::with_changes(Value::Object(planned), changes, requires_replace)
    }
}

// JSON text fields that differ only in formatting or key order.
fn equivalent_json_text(name: &str, before: &Value, after: &Value) -> bool {
    match (before, after) {
        (Value::String(a), Value::String(b)) if a != b && JSON_TEXT_FIELDS.contains(&name) => {
            normalize_json_lossy(a) == normalize_json_lossy(b)
        },
        _ => false,
    }
}

fn plan_delete(prior: &Value) -> PlanResult {
    let changes = object(prior)
        .into_iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(name, value)| AttributeChange::removed(name, value))
        .collect();
    PlanResult::with_changes(Value::Null, changes, false)
}
