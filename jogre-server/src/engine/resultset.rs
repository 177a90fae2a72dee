//! The five resultset operators (§4.5): `ix_get`, `ix_set`, `ix_changes`,
//! `ix_query`, `ix_query_changes`. Each is parameterised purely by a
//! `RecordClass` plus the raw JSON arguments already resolved by the
//! dispatcher; none of them know about the wire `Arguments`/`Invocation`
//! types, keeping the same untyped-JSON boundary the teacher's extension
//! endpoints used to cross.

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::engine::context::{PostprocessItem, PostprocessStage, RequestContext};
use crate::engine::error::{DispatchError, SetPhaseError};
use crate::engine::record::RecordClass;
use crate::engine::state::StateComparison;
use crate::engine::storage::{unique_tuple_key, StorageError, StoreTransaction};

fn arg_str<'a>(args: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    args.get(key).and_then(Value::as_str)
}

fn arg_str_array(args: &Map<String, Value>, key: &str) -> Option<Vec<String>> {
    args.get(key)?.as_array().map(|items| {
        items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect()
    })
}

fn parse_state(raw: &str) -> Result<u64, DispatchError> {
    raw.parse()
        .map_err(|_| DispatchError::InvalidArguments(format!("malformed state string {raw:?}")))
}

fn project(row: &Map<String, Value>, properties: Option<&[String]>) -> Value {
    let Some(properties) = properties else {
        return Value::Object(row.clone());
    };

    let mut out = Map::with_capacity(properties.len() + 1);
    out.insert("id".to_string(), row.get("id").cloned().unwrap_or(Value::Null));
    for property in properties {
        if let Some(value) = row.get(property) {
            out.insert(property.clone(), value.clone());
        }
    }
    Value::Object(out)
}

fn storage_err(err: StorageError) -> DispatchError {
    match err {
        StorageError::Conflict => DispatchError::TryAgain,
        other => DispatchError::Internal(other.to_string()),
    }
}

/// `K/get(ids?, properties?)` → `(accountId, state, list, notFound)` (§4.5).
pub fn ix_get(
    record_class: &dyn RecordClass,
    txn: &StoreTransaction<'_>,
    ctx: &RequestContext,
    account_id: &str,
    args: &Map<String, Value>,
) -> Result<Value, DispatchError> {
    let properties = arg_str_array(args, "properties");
    let requested_ids = arg_str_array(args, "ids");

    let rows = txn
        .scan_records(record_class.type_key(), account_id)
        .map_err(storage_err)?;

    let mut list = Vec::new();
    let mut not_found = Vec::new();
    let mut seen = std::collections::HashSet::new();

    match requested_ids {
        Some(ids) => {
            for id in ids {
                if !seen.insert(id.clone()) {
                    continue;
                }
                match rows
                    .iter()
                    .find(|row| row.get("id").and_then(Value::as_str) == Some(id.as_str())
                        && row.get("isActive").and_then(Value::as_bool) == Some(true))
                {
                    Some(row) => list.push(project(row, properties.as_deref())),
                    None => not_found.push(Value::String(id)),
                }
            }
        }
        None => {
            for row in &rows {
                if row.get("isActive").and_then(Value::as_bool) == Some(true) {
                    list.push(project(row, properties.as_deref()));
                }
            }
        }
    }

    let state = ctx.account_state.state_for(account_id, record_class.type_key());

    Ok(serde_json::json!({
        "accountId": account_id,
        "state": state.to_string(),
        "list": list,
        "notFound": not_found,
    }))
}

struct SetOutcome {
    created: Map<String, Value>,
    updated: Map<String, Value>,
    destroyed: Vec<Value>,
    not_created: Map<String, Value>,
    not_updated: Map<String, Value>,
    not_destroyed: Map<String, Value>,
}

fn set_error_value(error: &SetPhaseError) -> Value {
    let mut map = Map::new();
    map.insert("type".to_string(), Value::String(error.type_tag().to_string()));
    if let Some(description) = error.description() {
        map.insert("description".to_string(), Value::String(description.to_string()));
    }
    if !error.properties().is_empty() {
        map.insert(
            "properties".to_string(),
            Value::Array(error.properties().iter().cloned().map(Value::String).collect()),
        );
    }
    Value::Object(map)
}

/// Checks the client-supplied create/update object against the record
/// class's declared properties (§4.5 "Client-permissions rules" and
/// "Validation order"). Returns the subset of properties to persist, or
/// the list of property names that were rejected.
fn validate_properties(
    record_class: &dyn RecordClass,
    supplied: &Map<String, Value>,
    is_system: bool,
    is_update: bool,
) -> Result<Map<String, Value>, (Vec<String>, String)> {
    let mut accepted = Map::new();
    let mut bad_properties = Vec::new();
    let mut first_message = None;

    for (name, value) in supplied {
        let Some(property) = record_class.property(name) else {
            bad_properties.push(name.clone());
            first_message.get_or_insert_with(|| format!("unknown property {name:?}"));
            continue;
        };

        let allowed = if is_update {
            property.may_client_update(is_system)
        } else {
            property.may_client_init(is_system)
        };
        if !allowed {
            bad_properties.push(name.clone());
            first_message.get_or_insert_with(|| format!("property {name:?} is not client-settable"));
            continue;
        }

        if let Some(validate) = property.validate {
            if let Err(message) = validate(value) {
                bad_properties.push(name.clone());
                first_message.get_or_insert_with(|| message.clone());
                continue;
            }
        }

        accepted.insert(name.clone(), value.clone());
    }

    if !is_update {
        for property in record_class.properties() {
            if property.is_virtual || property.is_optional || accepted.contains_key(property.name) {
                continue;
            }
            match property.default {
                Some(default) => {
                    accepted.insert(property.name.to_string(), default());
                }
                None => {
                    bad_properties.push(property.name.to_string());
                    first_message
                        .get_or_insert_with(|| format!("missing required property {:?}", property.name));
                }
            }
        }
    }

    if bad_properties.is_empty() {
        Ok(accepted)
    } else {
        Err((bad_properties, first_message.unwrap_or_default()))
    }
}

/// Why a create/update was aborted: either a per-record `SetError`
/// (phase continues with other records), or a call-level failure that
/// aborts the whole `/set` (e.g. a dangling/duplicate creation-id
/// reference, §3).
#[derive(Debug)]
enum PhaseOutcome {
    Phase(SetPhaseError),
    Fatal(DispatchError),
}

impl From<SetPhaseError> for PhaseOutcome {
    fn from(value: SetPhaseError) -> Self {
        PhaseOutcome::Phase(value)
    }
}

/// Substitutes any property value of the form `"#creationId"` with the
/// id that creation id resolved to earlier in this request (RFC 8620
/// §5.3). A reference to a creation id marked `DUPLICATE` aborts the
/// whole call with `duplicateCreationId` rather than just this record
/// (§3, §7) — distinct from the dispatcher's `#foo` argument-level
/// back-references, which only ever affect the one call using them.
fn resolve_creation_id_values(
    ctx: &RequestContext,
    row: &mut Map<String, Value>,
) -> Result<(), DispatchError> {
    for value in row.values_mut() {
        let Value::String(s) = value else { continue };
        let Some(creation_id) = s.strip_prefix('#') else {
            continue;
        };

        if ctx.creation_ids.is_duplicate(creation_id) {
            return Err(DispatchError::DuplicateCreationId);
        }

        match ctx.creation_ids.resolve(creation_id) {
            Some(id) => *value = Value::String(id.to_string()),
            None => {
                return Err(DispatchError::InvalidArguments(format!(
                    "unknown creation id {creation_id:?}"
                )))
            }
        }
    }
    Ok(())
}

fn unique_tuples<'a>(
    record_class: &dyn RecordClass,
    row: &'a Map<String, Value>,
) -> Vec<(usize, Vec<&'a Value>)> {
    record_class
        .unique_constraints()
        .iter()
        .enumerate()
        .map(|(index, columns)| {
            let values = columns
                .iter()
                .map(|column| row.get(*column).unwrap_or(&Value::Null))
                .collect();
            (index, values)
        })
        .collect()
}

fn run_create(
    record_class: &dyn RecordClass,
    txn: &mut StoreTransaction<'_>,
    ctx: &mut RequestContext,
    account_id: &str,
    creation_id: &str,
    supplied: &Map<String, Value>,
) -> Result<Map<String, Value>, PhaseOutcome> {
    let hooks = record_class.hooks();

    let mut row = validate_properties(record_class, supplied, ctx.is_system, false)
        .map_err(|(properties, message)| SetPhaseError::InvalidProperties(properties, message))?;

    resolve_creation_id_values(ctx, &mut row).map_err(PhaseOutcome::Fatal)?;

    if let Some(check) = hooks.ix_create_check {
        check(ctx, &row)?;
    }

    let id = Uuid::new_v4().to_string();
    let next_state = ctx.account_state.ensure_state_bumped(account_id, record_class.type_key());

    row.insert("id".to_string(), Value::String(id.clone()));
    row.insert("accountId".to_string(), Value::String(account_id.to_string()));
    row.insert("modSeqCreated".to_string(), Value::from(next_state));
    row.insert("modSeqChanged".to_string(), Value::from(next_state));
    row.insert("dateDestroyed".to_string(), Value::Null);
    row.insert("isActive".to_string(), Value::Bool(true));
    row.insert(
        "created".to_string(),
        Value::String(chrono::Utc::now().to_rfc3339()),
    );

    for (index, values) in unique_tuples(record_class, &row) {
        let key = unique_tuple_key(&values);
        let reserved = txn
            .reserve_unique(record_class.type_key(), index, &key, &id)
            .map_err(|err| PhaseOutcome::Fatal(storage_err(err)))?;
        if !reserved {
            return Err(SetPhaseError::InvalidProperties(
                Vec::new(),
                "duplicate value for a unique property".to_string(),
            )
            .into());
        }
    }

    txn.put_record(record_class.type_key(), &id, &row)
        .map_err(|err| PhaseOutcome::Fatal(storage_err(err)))?;

    if record_class.query_enabled() {
        txn.log_query_change(record_class.type_key(), next_state, account_id, &id)
            .map_err(|err| PhaseOutcome::Fatal(storage_err(err)))?;
    }

    ctx.creation_ids.record(creation_id, id);

    if let Some(created) = hooks.ix_created {
        created(ctx, &row);
    }

    if hooks.ix_postprocess_create.is_some() {
        ctx.postprocess_queue.push(PostprocessItem {
            type_key: record_class.type_key(),
            stage: PostprocessStage::Create,
            row: row.clone(),
        });
    }

    Ok(row)
}

fn run_update(
    record_class: &dyn RecordClass,
    txn: &mut StoreTransaction<'_>,
    ctx: &mut RequestContext,
    account_id: &str,
    id: &str,
    patch: &Map<String, Value>,
) -> Result<Map<String, Value>, PhaseOutcome> {
    let hooks = record_class.hooks();

    let Some(old_row) = txn.get_record(record_class.type_key(), id).ok().flatten() else {
        return Err(SetPhaseError::NotFound.into());
    };
    if old_row.get("accountId").and_then(Value::as_str) != Some(account_id)
        || old_row.get("isActive").and_then(Value::as_bool) != Some(true)
    {
        return Err(SetPhaseError::NotFound.into());
    }

    let mut accepted = validate_properties(record_class, patch, ctx.is_system, true)
        .map_err(|(properties, message)| SetPhaseError::InvalidProperties(properties, message))?;

    resolve_creation_id_values(ctx, &mut accepted).map_err(PhaseOutcome::Fatal)?;

    if let Some(check) = hooks.ix_update_check {
        check(ctx, &old_row, &accepted)?;
    }

    let mut new_row = old_row.clone();
    for (key, value) in &accepted {
        new_row.insert(key.clone(), value.clone());
    }

    let next_state = ctx.account_state.ensure_state_bumped(account_id, record_class.type_key());
    new_row.insert("modSeqChanged".to_string(), Value::from(next_state));

    txn.put_record(record_class.type_key(), id, &new_row)
        .map_err(|err| PhaseOutcome::Fatal(storage_err(err)))?;

    if record_class.query_enabled() {
        let filters = record_class.query_filter_map();
        let filter_relevant =
            filters.is_empty() || filters.iter().any(|f| (f.differ)(&old_row, &new_row));
        if filter_relevant {
            txn.log_query_change(record_class.type_key(), next_state, account_id, id)
                .map_err(|err| PhaseOutcome::Fatal(storage_err(err)))?;
        }
    }

    if let Some(updated) = hooks.ix_updated {
        updated(ctx, &old_row, &new_row, &accepted);
    }

    if hooks.ix_postprocess_update.is_some() {
        ctx.postprocess_queue.push(PostprocessItem {
            type_key: record_class.type_key(),
            stage: PostprocessStage::Update,
            row: new_row.clone(),
        });
    }

    Ok(new_row)
}

fn run_destroy(
    record_class: &dyn RecordClass,
    txn: &mut StoreTransaction<'_>,
    ctx: &mut RequestContext,
    account_id: &str,
    id: &str,
) -> Result<(), PhaseOutcome> {
    let hooks = record_class.hooks();

    let Some(row) = txn.get_record(record_class.type_key(), id).ok().flatten() else {
        return Err(SetPhaseError::NotFound.into());
    };
    if row.get("accountId").and_then(Value::as_str) != Some(account_id)
        || row.get("isActive").and_then(Value::as_bool) != Some(true)
    {
        return Err(SetPhaseError::NotFound.into());
    }

    if let Some(check) = hooks.ix_destroy_check {
        check(ctx, &row)?;
    }

    for (index, values) in unique_tuples(record_class, &row) {
        let key = unique_tuple_key(&values);
        let _ = txn.release_unique(record_class.type_key(), index, &key);
    }

    let next_state = ctx.account_state.ensure_state_bumped(account_id, record_class.type_key());

    let mut new_row = row.clone();
    new_row.insert("isActive".to_string(), Value::Null);
    new_row.insert(
        "dateDestroyed".to_string(),
        Value::String(chrono::Utc::now().to_rfc3339()),
    );
    new_row.insert("modSeqChanged".to_string(), Value::from(next_state));

    txn.put_record(record_class.type_key(), id, &new_row)
        .map_err(|err| PhaseOutcome::Fatal(storage_err(err)))?;

    if record_class.query_enabled() {
        txn.log_query_change(record_class.type_key(), next_state, account_id, id)
            .map_err(|err| PhaseOutcome::Fatal(storage_err(err)))?;
    }

    if let Some(destroyed) = hooks.ix_destroyed {
        destroyed(ctx, &new_row);
    }

    if hooks.ix_postprocess_destroy.is_some() {
        ctx.postprocess_queue.push(PostprocessItem {
            type_key: record_class.type_key(),
            stage: PostprocessStage::Destroy,
            row: new_row.clone(),
        });
    }

    Ok(())
}

/// `K/set(create?, update?, destroy?, ifInState?)` (§4.5, §4.7). One
/// outer savepoint per phase (create, then update, then destroy): a
/// failure inside a phase rolls back only that phase, per the documented
/// open-question decision on `/set` atomicity (spec.md §9, DESIGN.md).
pub fn ix_set(
    record_class: &dyn RecordClass,
    txn: &mut StoreTransaction<'_>,
    ctx: &mut RequestContext,
    account_id: &str,
    args: &Map<String, Value>,
) -> Result<Value, DispatchError> {
    let hooks = record_class.hooks();
    if let Some(check) = hooks.ix_set_check {
        check(ctx, &Value::Object(args.clone()))?;
    }

    let old_state = ctx.account_state.state_for(account_id, record_class.type_key());

    if let Some(if_in_state) = arg_str(args, "ifInState") {
        if parse_state(if_in_state)? != old_state {
            return Err(DispatchError::StateMismatch);
        }
    }

    let mut outcome = SetOutcome {
        created: Map::new(),
        updated: Map::new(),
        destroyed: Vec::new(),
        not_created: Map::new(),
        not_updated: Map::new(),
        not_destroyed: Map::new(),
    };

    if let Some(Value::Object(creates)) = args.get("create") {
        let guard = ctx.enter_nested();
        txn.save_point();
        let mut failed = false;
        for (creation_id, value) in creates {
            let Value::Object(supplied) = value else {
                outcome.not_created.insert(
                    creation_id.clone(),
                    set_error_value(&SetPhaseError::InvalidProperties(
                        Vec::new(),
                        "create value must be an object".to_string(),
                    )),
                );
                failed = true;
                continue;
            };
            match run_create(record_class, txn, ctx, account_id, creation_id, supplied) {
                Ok(row) => {
                    outcome.created.insert(creation_id.clone(), Value::Object(row));
                }
                Err(PhaseOutcome::Phase(err)) => match hooks.ix_create_error {
                    Some(on_error) => {
                        let (override_row, override_err) = on_error(ctx, err);
                        if let Some(row) = override_row {
                            outcome.created.insert(creation_id.clone(), Value::Object(row));
                        } else if let Some(err) = override_err {
                            outcome.not_created.insert(creation_id.clone(), set_error_value(&err));
                            failed = true;
                        }
                    }
                    None => {
                        outcome.not_created.insert(creation_id.clone(), set_error_value(&err));
                        failed = true;
                    }
                },
                Err(PhaseOutcome::Fatal(err)) => {
                    let _ = txn.rollback_to_save_point();
                    ctx.exit_nested_rollback(guard);
                    return Err(err);
                }
            }
        }
        if failed && outcome.created.is_empty() {
            let _ = txn.rollback_to_save_point();
            ctx.exit_nested_rollback(guard);
        } else {
            ctx.exit_nested_commit(guard);
        }
    }

    if let Some(Value::Object(updates)) = args.get("update") {
        let guard = ctx.enter_nested();
        txn.save_point();
        let mut failed = false;
        for (id, patch) in updates {
            let Value::Object(patch) = patch else {
                outcome.not_updated.insert(
                    id.clone(),
                    set_error_value(&SetPhaseError::InvalidPatch("patch must be an object".to_string())),
                );
                failed = true;
                continue;
            };
            match run_update(record_class, txn, ctx, account_id, id, patch) {
                Ok(row) => {
                    outcome.updated.insert(id.clone(), Value::Object(row));
                }
                Err(PhaseOutcome::Phase(err)) => {
                    outcome.not_updated.insert(id.clone(), set_error_value(&err));
                    failed = true;
                }
                Err(PhaseOutcome::Fatal(err)) => {
                    let _ = txn.rollback_to_save_point();
                    ctx.exit_nested_rollback(guard);
                    return Err(err);
                }
            }
        }
        if failed && outcome.updated.is_empty() {
            let _ = txn.rollback_to_save_point();
            ctx.exit_nested_rollback(guard);
        } else {
            ctx.exit_nested_commit(guard);
        }
    }

    if let Some(Value::Array(destroys)) = args.get("destroy") {
        let guard = ctx.enter_nested();
        txn.save_point();
        let mut failed = false;
        for id in destroys {
            let Some(id) = id.as_str() else { continue };
            match run_destroy(record_class, txn, ctx, account_id, id) {
                Ok(()) => outcome.destroyed.push(Value::String(id.to_string())),
                Err(PhaseOutcome::Phase(err)) => {
                    outcome.not_destroyed.insert(id.to_string(), set_error_value(&err));
                    failed = true;
                }
                Err(PhaseOutcome::Fatal(err)) => {
                    let _ = txn.rollback_to_save_point();
                    ctx.exit_nested_rollback(guard);
                    return Err(err);
                }
            }
        }
        if failed && outcome.destroyed.is_empty() {
            let _ = txn.rollback_to_save_point();
            ctx.exit_nested_rollback(guard);
        } else {
            ctx.exit_nested_commit(guard);
        }
    }

    let new_state = ctx.account_state.state_for(account_id, record_class.type_key());

    Ok(serde_json::json!({
        "accountId": account_id,
        "oldState": old_state.to_string(),
        "newState": new_state.to_string(),
        "created": outcome.created,
        "updated": outcome.updated,
        "destroyed": outcome.destroyed,
        "notCreated": outcome.not_created,
        "notUpdated": outcome.not_updated,
        "notDestroyed": outcome.not_destroyed,
    }))
}

/// `K/changes(sinceState, maxChanges?)` (§4.5).
pub fn ix_changes(
    record_class: &dyn RecordClass,
    txn: &StoreTransaction<'_>,
    ctx: &RequestContext,
    account_id: &str,
    args: &Map<String, Value>,
) -> Result<Value, DispatchError> {
    let since_raw = arg_str(args, "sinceState")
        .ok_or_else(|| DispatchError::InvalidArguments("missing sinceState".to_string()))?;
    let since = parse_state(since_raw)?;
    let max_changes = args.get("maxChanges").and_then(Value::as_u64).map(|v| v as usize);

    let comparison = ctx
        .account_state
        .try_compare(account_id, record_class.type_key(), since)?;

    let new_state = ctx.account_state.state_for(account_id, record_class.type_key());

    if comparison == StateComparison::InSync {
        return Ok(serde_json::json!({
            "accountId": account_id,
            "oldState": since_raw,
            "newState": new_state.to_string(),
            "hasMoreChanges": false,
            "created": [],
            "updated": [],
            "destroyed": [],
        }));
    }

    let rows = txn
        .scan_records(record_class.type_key(), account_id)
        .map_err(storage_err)?;

    let mut created = Vec::new();
    let mut updated = Vec::new();
    let mut destroyed = Vec::new();

    for row in &rows {
        let mod_created = row.get("modSeqCreated").and_then(Value::as_u64).unwrap_or(0);
        let mod_changed = row.get("modSeqChanged").and_then(Value::as_u64).unwrap_or(0);
        if mod_changed <= since {
            continue;
        }
        let id = row.get("id").and_then(Value::as_str).unwrap_or_default().to_string();
        let is_active = row.get("isActive").and_then(Value::as_bool).unwrap_or(false);

        if !is_active {
            destroyed.push(Value::String(id));
        } else if mod_created > since {
            created.push(Value::String(id));
        } else {
            updated.push(Value::String(id));
        }
    }

    let mut has_more = false;
    if let Some(max) = max_changes {
        let total = created.len() + updated.len() + destroyed.len();
        if total > max {
            has_more = true;
            created.truncate(max);
            let remaining = max.saturating_sub(created.len());
            updated.truncate(remaining);
            let remaining = remaining.saturating_sub(updated.len());
            destroyed.truncate(remaining);
        }
    }

    Ok(serde_json::json!({
        "accountId": account_id,
        "oldState": since_raw,
        "newState": new_state.to_string(),
        "hasMoreChanges": has_more,
        "created": created,
        "updated": updated,
        "destroyed": destroyed,
    }))
}

/// Evaluates every clause of `args["filter"]` against one row (§4.5,
/// §6). Shared between `ix_query`'s full scan and `ix_query_changes`'s
/// per-id re-evaluation so the two operators can never disagree on what
/// "matches" means.
fn row_matches_filter(
    record_class: &dyn RecordClass,
    row: &Map<String, Value>,
    args: &Map<String, Value>,
) -> Result<bool, DispatchError> {
    let Some(Value::Object(filter)) = args.get("filter") else {
        return Ok(true);
    };
    for (name, filter_arg) in filter {
        let Some(query_filter) = record_class.query_filter_map().iter().find(|f| f.name == name)
        else {
            return Err(DispatchError::InvalidArguments(format!("unknown filter {name:?}")));
        };
        if !(query_filter.cond_builder)(filter_arg, row) {
            return Ok(false);
        }
    }
    Ok(true)
}

/// `K/query(filter?, sort?, position?, limit?, calculateTotal?)` (§4.5, §6),
/// driven by the record class's declared `query_filter_map`/`query_sort_map`.
pub fn ix_query(
    record_class: &dyn RecordClass,
    txn: &StoreTransaction<'_>,
    ctx: &RequestContext,
    account_id: &str,
    args: &Map<String, Value>,
) -> Result<Value, DispatchError> {
    if !record_class.query_enabled() {
        return Err(DispatchError::UnknownMethod);
    }

    let rows = txn
        .scan_records(record_class.type_key(), account_id)
        .map_err(storage_err)?;

    let mut matching: Vec<&Map<String, Value>> = rows
        .iter()
        .filter(|row| row.get("isActive").and_then(Value::as_bool) == Some(true))
        .collect();

    if args.get("filter").is_some() {
        let mut filtered = Vec::with_capacity(matching.len());
        for row in matching {
            if row_matches_filter(record_class, row, args)? {
                filtered.push(row);
            }
        }
        matching = filtered;
    }

    if let Some(Value::Array(sort)) = args.get("sort") {
        for entry in sort.iter().rev() {
            let Some(property) = entry.get("property").and_then(Value::as_str) else {
                continue;
            };
            let Some(query_sort) = record_class.query_sort_map().iter().find(|s| s.name == property)
            else {
                return Err(DispatchError::InvalidArguments(format!("unknown sort key {property:?}")));
            };
            let descending = entry.get("isAscending").and_then(Value::as_bool) == Some(false);
            matching.sort_by(|a, b| {
                let ordering = (query_sort.sort_by)(a)
                    .to_string()
                    .cmp(&(query_sort.sort_by)(b).to_string());
                if descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
        }
    }

    let total = matching.len();
    let position = args.get("position").and_then(Value::as_u64).unwrap_or(0) as usize;
    let limit = args.get("limit").and_then(Value::as_u64).map(|v| v as usize);
    let calculate_total = args.get("calculateTotal").and_then(Value::as_bool).unwrap_or(false);

    let page: Vec<Value> = matching
        .into_iter()
        .skip(position)
        .take(limit.unwrap_or(usize::MAX))
        .filter_map(|row| row.get("id").cloned())
        .collect();

    let state = ctx.account_state.state_for(account_id, record_class.type_key());

    let mut response = serde_json::json!({
        "accountId": account_id,
        "queryState": state.to_string(),
        "canCalculateChanges": true,
        "position": position,
        "ids": page,
    });
    if calculate_total {
        response["total"] = Value::from(total);
    }
    Ok(response)
}

/// `K/queryChanges(sinceQueryState, filter?, sort?, upToId?, maxChanges?)`
/// (§4.5). Driven by the `{type}_query_log` written at every create,
/// destroy, and `differ`-flagged update (`engine::storage`): only ids
/// logged since `sinceQueryState` are re-examined, each re-classified as
/// `added` or `removed` by re-evaluating the current filter against the
/// row as it stands now. A created-then-destroyed id inside the window
/// is dropped entirely — the client never saw it, so it's neither an
/// addition nor a removal.
pub fn ix_query_changes(
    record_class: &dyn RecordClass,
    txn: &StoreTransaction<'_>,
    ctx: &RequestContext,
    account_id: &str,
    args: &Map<String, Value>,
) -> Result<Value, DispatchError> {
    if !record_class.query_enabled() {
        return Err(DispatchError::UnknownMethod);
    }

    let since_raw = arg_str(args, "sinceQueryState")
        .ok_or_else(|| DispatchError::InvalidArguments("missing sinceQueryState".to_string()))?;
    let since = parse_state(since_raw)?;

    let comparison = ctx
        .account_state
        .try_compare(account_id, record_class.type_key(), since)?;
    let new_state = ctx.account_state.state_for(account_id, record_class.type_key());

    if comparison == StateComparison::InSync {
        return Ok(serde_json::json!({
            "accountId": account_id,
            "oldQueryState": since_raw,
            "newQueryState": new_state.to_string(),
            "total": Value::Null,
            "removed": [],
            "added": [],
        }));
    }

    let changed_ids = txn
        .scan_query_log(record_class.type_key(), account_id, since)
        .map_err(storage_err)?;

    let mut removed = Vec::new();
    let mut added = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for id in changed_ids {
        if !seen.insert(id.clone()) {
            continue;
        }
        let Some(row) = txn.get_record(record_class.type_key(), &id).map_err(storage_err)? else {
            continue;
        };

        let mod_created = row.get("modSeqCreated").and_then(Value::as_u64).unwrap_or(0);
        let is_active = row.get("isActive").and_then(Value::as_bool).unwrap_or(false);

        if !is_active && mod_created > since {
            continue;
        }

        if is_active && row_matches_filter(record_class, &row, args)? {
            added.push(Value::String(id));
        } else {
            removed.push(Value::String(id));
        }
    }

    let total = if args.get("calculateTotal").and_then(Value::as_bool).unwrap_or(false) {
        ix_query(record_class, txn, ctx, account_id, args)?
            .get("total")
            .cloned()
            .unwrap_or(Value::Null)
    } else {
        Value::Null
    };

    Ok(serde_json::json!({
        "accountId": account_id,
        "oldQueryState": since_raw,
        "newQueryState": new_state.to_string(),
        "total": total,
        "removed": removed,
        "added": added,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::record::{Hooks, Property, PropertyKind};
    use crate::engine::storage::{Config, RecordStore};

    const GADGET_PROPERTIES: &[Property] = &[Property {
        name: "color",
        kind: PropertyKind::String,
        is_optional: false,
        client_may_init: true,
        client_may_update: true,
        immutable: false,
        is_virtual: false,
        default: None,
        validate: None,
    }];

    fn gadget_create_check(
        _ctx: &mut RequestContext,
        row: &Map<String, Value>,
    ) -> Result<(), SetPhaseError> {
        if row.get("color").and_then(Value::as_str) == Some("forbidden") {
            Err(SetPhaseError::Forbidden)
        } else {
            Ok(())
        }
    }

    fn gadget_create_error(
        _ctx: &mut RequestContext,
        err: SetPhaseError,
    ) -> (Option<Map<String, Value>>, Option<SetPhaseError>) {
        match err {
            SetPhaseError::Forbidden => {
                let mut row = Map::new();
                row.insert("id".to_string(), Value::String("fallback".to_string()));
                row.insert("color".to_string(), Value::String("beige".to_string()));
                (Some(row), None)
            }
            other => (None, Some(other)),
        }
    }

    static GADGET_HOOKS: Hooks = Hooks {
        ix_set_check: None,
        ix_create_check: Some(gadget_create_check),
        ix_create_error: Some(gadget_create_error),
        ix_created: None,
        ix_update_check: None,
        ix_updated: None,
        ix_destroy_check: None,
        ix_destroyed: None,
        ix_postprocess_create: Some(|_ctx, _row| {}),
        ix_postprocess_update: None,
        ix_postprocess_destroy: None,
    };

    struct Gadget;

    impl RecordClass for Gadget {
        fn type_key(&self) -> &'static str {
            "Gadget"
        }

        fn account_type(&self) -> &'static str {
            "generic"
        }

        fn properties(&self) -> &[Property] {
            GADGET_PROPERTIES
        }

        fn hooks(&self) -> &Hooks {
            &GADGET_HOOKS
        }
    }

    static GADGET: Gadget = Gadget;

    fn new_gadget_store() -> (tempfile::TempDir, RecordStore) {
        let dir = tempfile::tempdir().unwrap();
        let config: Config = toml::from_str(&format!("path = {:?}", dir.path())).unwrap();
        let store = RecordStore::new(config, &[&GADGET]).unwrap();
        (dir, store)
    }

    #[test]
    fn storage_err_maps_conflict_to_try_again_and_others_to_internal() {
        assert!(matches!(storage_err(StorageError::Conflict), DispatchError::TryAgain));
        assert!(matches!(
            storage_err(StorageError::Backend("boom".to_string())),
            DispatchError::Internal(_)
        ));
    }

    #[test]
    fn ix_create_error_hook_rewrites_a_forbidden_create() {
        let (_dir, store) = new_gadget_store();
        let mut ctx = RequestContext::new(false);

        let mut supplied = Map::new();
        supplied.insert("color".to_string(), Value::String("forbidden".to_string()));
        let mut create = Map::new();
        create.insert("c1".to_string(), Value::Object(supplied));
        let mut args = Map::new();
        args.insert("create".to_string(), Value::Object(create));

        let outcome = store
            .with_transaction(|txn| Ok(ix_set(&GADGET, txn, &mut ctx, "account1", &args)))
            .unwrap()
            .unwrap();

        assert!(outcome["notCreated"].as_object().unwrap().is_empty());
        assert_eq!(outcome["created"]["c1"]["id"], "fallback");
        assert_eq!(outcome["created"]["c1"]["color"], "beige");
    }

    #[test]
    fn postprocess_queue_is_truncated_when_its_phase_rolls_back() {
        let (_dir, store) = new_gadget_store();
        let mut ctx = RequestContext::new(false);

        store
            .with_transaction(|txn| {
                let (lowest, highest) = txn.load_state("account1", GADGET.type_key())?;
                ctx.account_state.load("account1", GADGET.type_key(), lowest, highest);

                let guard = ctx.enter_nested();
                txn.save_point();

                let mut ok_row = Map::new();
                ok_row.insert("color".to_string(), Value::String("blue".to_string()));
                run_create(&GADGET, txn, &mut ctx, "account1", "c1", &ok_row).unwrap();
                assert_eq!(ctx.postprocess_queue.len(), 1);

                let mut bad_row = Map::new();
                bad_row.insert("color".to_string(), Value::String("#missing".to_string()));
                let err = run_create(&GADGET, txn, &mut ctx, "account1", "c2", &bad_row).unwrap_err();
                assert!(matches!(err, PhaseOutcome::Fatal(_)));

                txn.rollback_to_save_point()?;
                ctx.exit_nested_rollback(guard);
                assert!(ctx.postprocess_queue.is_empty());

                Ok(())
            })
            .unwrap();
    }
}
