//! The record-class declaration contract (§3 Property, §4.5, §6).
//!
//! Grounded on `extensions/mod.rs`'s `JmapExtension` trait: the same
//! "declare the shape once, look it up by name at runtime" idea,
//! generalised from the teacher's hand-routed extension endpoints to
//! record-class CRUD verbs. Per the design notes in spec.md §9, hooks are
//! a fixed-shape record of optional function pointers rather than virtual
//! methods.

use serde_json::{Map, Value};

use crate::engine::context::RequestContext;
use crate::engine::error::{DispatchError, SetPhaseError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    String,
    /// Case-insensitive string: compared/indexed case-insensitively but
    /// stored and returned with the client's original casing.
    CiString,
    Timestamp,
    StringArray,
    Boolean,
    Integer,
    Id,
}

/// One declared property of a record class (§3).
#[derive(Debug, Clone, Copy)]
pub struct Property {
    pub name: &'static str,
    pub kind: PropertyKind,
    pub is_optional: bool,
    pub client_may_init: bool,
    pub client_may_update: bool,
    pub immutable: bool,
    pub is_virtual: bool,
    pub default: Option<fn() -> Value>,
    pub validate: Option<fn(&Value) -> Result<(), String>>,
}

impl Property {
    /// `{p : p.client_may_init && !p.virtual} ∪ (escalated if is_system)` (§4.5).
    pub fn may_client_init(&self, is_system: bool) -> bool {
        if self.is_virtual {
            return false;
        }
        (self.client_may_init) || (is_system && !self.immutable)
    }

    /// `{p : p.client_may_update && !p.virtual && !p.immutable} ∪ (escalated if is_system)` (§4.5).
    pub fn may_client_update(&self, is_system: bool) -> bool {
        if self.is_virtual || self.immutable {
            return false;
        }
        self.client_may_update || is_system
    }
}

/// One declared filter operator for `K/query` (§4.5, §6).
pub struct QueryFilter {
    pub name: &'static str,
    /// Builds an in-memory predicate over a record's JSON row from the
    /// filter argument's value.
    pub cond_builder: fn(&Value, &Map<String, Value>) -> bool,
    /// Whether a change to this record could flip `cond_builder`'s
    /// result, for `queryChanges` invalidation.
    pub differ: fn(&Map<String, Value>, &Map<String, Value>) -> bool,
}

/// One declared sort key for `K/query` (§4.5, §6).
pub struct QuerySort {
    pub name: &'static str,
    pub sort_by: fn(&Map<String, Value>) -> Value,
}

/// The `/set` hook chain (§4.5). Each hook is optional; check hooks can
/// short-circuit the call or one record within it.
#[derive(Default)]
pub struct Hooks {
    pub ix_set_check: Option<fn(&mut RequestContext, &Value) -> Result<(), DispatchError>>,
    pub ix_create_check:
        Option<fn(&mut RequestContext, &Map<String, Value>) -> Result<(), SetPhaseError>>,
    pub ix_create_error: Option<
        fn(
            &mut RequestContext,
            SetPhaseError,
        ) -> (Option<Map<String, Value>>, Option<SetPhaseError>),
    >,
    pub ix_created: Option<fn(&mut RequestContext, &Map<String, Value>)>,
    pub ix_update_check: Option<
        fn(&mut RequestContext, &Map<String, Value>, &Map<String, Value>) -> Result<(), SetPhaseError>,
    >,
    pub ix_updated: Option<
        fn(&mut RequestContext, &Map<String, Value>, &Map<String, Value>, &Map<String, Value>),
    >,
    pub ix_destroy_check:
        Option<fn(&mut RequestContext, &Map<String, Value>) -> Result<(), SetPhaseError>>,
    pub ix_destroyed: Option<fn(&mut RequestContext, &Map<String, Value>)>,
    /// Run once the enclosing store transaction has committed, not
    /// in-transaction like `ix_created`/`ix_updated`/`ix_destroyed`
    /// above — the right place for external side effects that must
    /// never fire on a rolled-back phase.
    pub ix_postprocess_create: Option<fn(&RequestContext, &Map<String, Value>)>,
    pub ix_postprocess_update: Option<fn(&RequestContext, &Map<String, Value>)>,
    pub ix_postprocess_destroy: Option<fn(&RequestContext, &Map<String, Value>)>,
}

/// The declarative description of one entity table plus its hooks
/// (§6 "Record-class declaration contract").
pub trait RecordClass: Send + Sync {
    /// The JMAP type name, e.g. `"Cookie"`.
    fn type_key(&self) -> &'static str;
    /// The logical account family this type's state rows are shared
    /// under.
    fn account_type(&self) -> &'static str;
    /// Whether creating this record creates an account (seeds `states`
    /// rows for every type in the family).
    fn is_account_base(&self) -> bool {
        false
    }
    fn properties(&self) -> &[Property];
    /// Unique constraints over non-mandatory columns, each rewritten by
    /// the engine to prefix `isActive` (§4.6).
    fn unique_constraints(&self) -> &[&[&'static str]] {
        &[]
    }
    fn query_enabled(&self) -> bool {
        false
    }
    fn query_filter_map(&self) -> &[QueryFilter] {
        &[]
    }
    fn query_sort_map(&self) -> &[QuerySort] {
        &[]
    }
    fn hooks(&self) -> &Hooks;

    fn property(&self, name: &str) -> Option<&Property> {
        self.properties().iter().find(|p| p.name == name)
    }
}
