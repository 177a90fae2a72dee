//! `Cookie` — the worked example record class used throughout the spec's
//! end-to-end scenarios (`Cookie/set`, `Cookie/get`).

use serde_json::Value;

use crate::engine::context::RequestContext;
use crate::engine::record::{Hooks, Property, PropertyKind, RecordClass};

fn default_delicious() -> Value {
    Value::String("yes".to_string())
}

fn validate_type(value: &Value) -> Result<(), String> {
    match value.as_str() {
        Some("chocolate") | Some("oatmeal") | Some("sugar") | Some("gingerbread") => Ok(()),
        _ => Err("type must be one of chocolate, oatmeal, sugar, gingerbread".to_string()),
    }
}

const PROPERTIES: &[Property] = &[
    Property {
        name: "type",
        kind: PropertyKind::String,
        is_optional: false,
        client_may_init: true,
        client_may_update: true,
        immutable: false,
        is_virtual: false,
        default: None,
        validate: Some(validate_type),
    },
    Property {
        name: "delicious",
        kind: PropertyKind::String,
        is_optional: true,
        client_may_init: true,
        client_may_update: true,
        immutable: false,
        is_virtual: false,
        default: Some(default_delicious),
        validate: None,
    },
    Property {
        name: "batchLabel",
        kind: PropertyKind::CiString,
        is_optional: true,
        client_may_init: true,
        client_may_update: false,
        immutable: true,
        is_virtual: false,
        default: None,
        validate: None,
    },
];

fn on_created(ctx: &mut RequestContext, row: &serde_json::Map<String, Value>) {
    let _ = ctx;
    tracing::debug!(id = ?row.get("id"), "cookie baked");
}

static HOOKS: Hooks = Hooks {
    ix_set_check: None,
    ix_create_check: None,
    ix_create_error: None,
    ix_created: Some(on_created),
    ix_update_check: None,
    ix_updated: None,
    ix_destroy_check: None,
    ix_destroyed: None,
    ix_postprocess_create: None,
    ix_postprocess_update: None,
    ix_postprocess_destroy: None,
};

/// The jar of cookies: one per account, unique on `(type, batchLabel)` so a
/// destroyed batch's label can be reused (§4.6, invariant 6).
pub struct Cookie;

impl RecordClass for Cookie {
    fn type_key(&self) -> &'static str {
        "Cookie"
    }

    fn account_type(&self) -> &'static str {
        "generic"
    }

    fn properties(&self) -> &[Property] {
        PROPERTIES
    }

    fn unique_constraints(&self) -> &[&[&'static str]] {
        &[&["type", "batchLabel"]]
    }

    fn hooks(&self) -> &Hooks {
        &HOOKS
    }
}

pub static COOKIE: Cookie = Cookie;
