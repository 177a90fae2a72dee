//! End-to-end scenarios against the request engine, run directly against
//! `Cookie` without going through HTTP (the wire-level `ResultReference`
//! type requires `path`, so a malformed back-reference like scenario S4
//! can't even deserialize as a `Request` — it has to be built as a raw
//! `Call::Method` to exercise the dispatcher's own validation).

use serde_json::{Map, Value};

use jogre_server::engine::context::RequestContext;
use jogre_server::engine::dispatcher::{self, Call, CallTriple, RecordClassRegistry};
use jogre_server::engine::error::DispatchError;
use jogre_server::engine::record::{Hooks, Property, PropertyKind, QueryFilter, RecordClass};
use jogre_server::engine::resultset::ix_changes;
use jogre_server::engine::storage::{Config, RecordStore};
use jogre_server::records;

fn new_store() -> (tempfile::TempDir, RecordStore) {
    let dir = tempfile::tempdir().unwrap();
    let config: Config = toml::from_str(&format!("path = {:?}", dir.path())).unwrap();
    let store = RecordStore::new(config, &records::all()).unwrap();
    (dir, store)
}

fn call(method: &str, arguments: serde_json::Value, client_id: &str) -> Call {
    let serde_json::Value::Object(arguments) = arguments else {
        panic!("call arguments must be a JSON object");
    };
    Call::Method(CallTriple {
        method: method.to_string(),
        arguments,
        client_id: client_id.to_string(),
    })
}

fn dispatch_all(
    store: &RecordStore,
    ctx: &mut RequestContext,
    account_id: &str,
    calls: Vec<Call>,
) -> Vec<dispatcher::Sentence> {
    let registry = RecordClassRegistry::new(records::all());
    store
        .with_transaction(|txn| {
            for record_class in registry.classes() {
                let (lowest, highest) = txn.load_state(account_id, record_class.type_key())?;
                ctx.account_state.load(account_id, record_class.type_key(), lowest, highest);
            }
            let sentences = dispatcher::dispatch(&registry, txn, ctx, account_id, calls)
                .map_err(|_| jogre_server::engine::storage::StorageError::Backend("too many calls".into()))?;
            for (account_id, type_name, new_highest) in ctx.account_state.commit() {
                txn.bump_state(&account_id, &type_name, new_highest)?;
            }
            Ok(sentences)
        })
        .unwrap()
}

/// S1: a `Cookie/set` create followed by a `Cookie/get` back-referencing
/// the newly created id resolves the reference and returns the baked row.
#[test]
fn s1_create_then_get_via_back_reference() {
    let (_dir, store) = new_store();
    let mut ctx = RequestContext::new(false);

    let calls = vec![
        call(
            "Cookie/set",
            serde_json::json!({
                "create": {
                    "c1": {"type": "chocolate"}
                }
            }),
            "call1",
        ),
        call(
            "Cookie/get",
            serde_json::json!({
                "#ids": {"resultOf": "call1", "name": "Cookie/set", "path": "/created/c1/id"}
            }),
            "call2",
        ),
    ];

    let sentences = dispatch_all(&store, &mut ctx, "account1", calls);
    assert_eq!(sentences.len(), 2);

    assert_eq!(sentences[0].name, "Cookie/set");
    let created = &sentences[0].arguments["created"]["c1"];
    assert_eq!(created["type"], "chocolate");
    assert_eq!(created["delicious"], "yes");
    let id = created["id"].as_str().unwrap().to_string();

    assert_eq!(sentences[1].name, "Cookie/get");
    let list = sentences[1].arguments["list"].as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["id"], id);
    assert!(sentences[1].arguments["notFound"].as_array().unwrap().is_empty());
}

/// S2: reusing the same creation id for two creates in the same `/set`
/// flips it to `duplicateCreationId` for anything that tries to resolve
/// it later, but both underlying creates still happen.
#[test]
fn s2_duplicate_creation_id_blocks_later_reference() {
    let (_dir, store) = new_store();
    let mut ctx = RequestContext::new(false);

    let calls = vec![
        call(
            "Cookie/set",
            serde_json::json!({
                "create": {
                    "c1": {"type": "oatmeal", "batchLabel": "morning"}
                }
            }),
            "call1",
        ),
        call(
            "Cookie/set",
            serde_json::json!({
                "create": {
                    "c1": {"type": "sugar", "batchLabel": "evening"}
                }
            }),
            "call2",
        ),
    ];

    dispatch_all(&store, &mut ctx, "account1", calls);
    assert!(ctx.creation_ids.is_duplicate("c1"));
    assert_eq!(ctx.creation_ids.resolve("c1"), None);
}

/// S3: an unrecognised method name produces an `unknownMethod` error
/// sentence rather than aborting the whole batch.
#[test]
fn s3_unknown_method_produces_error_sentence() {
    let (_dir, store) = new_store();
    let mut ctx = RequestContext::new(false);

    let calls = vec![call("Cookie/bake", serde_json::json!({}), "call1")];

    let sentences = dispatch_all(&store, &mut ctx, "account1", calls);
    assert_eq!(sentences.len(), 1);
    assert_eq!(sentences[0].name, "error");
    assert_eq!(sentences[0].arguments["type"], "unknownMethod");
}

/// S4: a back-reference object missing `path`/`name`/`resultOf` fails
/// with the bespoke `resultReference` type and carries the literal
/// description text.
#[test]
fn s4_malformed_back_reference_reports_result_reference_error() {
    let (_dir, store) = new_store();
    let mut ctx = RequestContext::new(false);

    let calls = vec![call(
        "Cookie/get",
        serde_json::json!({
            "#ids": {"resultOf": "call1"}
        }),
        "call1",
    )];

    let sentences = dispatch_all(&store, &mut ctx, "account1", calls);
    assert_eq!(sentences.len(), 1);
    assert_eq!(sentences[0].name, "error");
    assert_eq!(sentences[0].arguments["type"], "resultReference");
    assert_eq!(sentences[0].arguments["description"], "malformed ResultReference");
}

/// S5: given a retained range of `(low=100, high=200)` for `Cookie`, a
/// `sinceState` of `50` is older than anything still retained and
/// reports `cannotCalculateChanges` rather than a diff. Exercised against
/// `ix_changes` directly (rather than through a sequence of real
/// creates) since nothing in this engine ever prunes `lowestModSeq` back
/// above zero through the public dispatch path.
#[test]
fn s5_changes_resync_reports_cannot_calculate_changes() {
    let (_dir, store) = new_store();
    let mut ctx = RequestContext::new(false);
    ctx.account_state.load("account1", "Cookie", 100, 200);

    let mut args = serde_json::Map::new();
    args.insert("sinceState".to_string(), serde_json::Value::String("50".to_string()));

    let outcome = store
        .with_transaction(|txn| Ok(ix_changes(&records::cookie::COOKIE, txn, &ctx, "account1", &args)))
        .unwrap();

    assert!(matches!(outcome, Err(DispatchError::CannotCalculateChanges)));
}

/// S6: `ifInState` on a `/set` call that no longer matches the account's
/// current state for that type is rejected with `stateMismatch` and no
/// writes happen.
#[test]
fn s6_if_in_state_mismatch_rejects_the_set() {
    let (_dir, store) = new_store();
    let mut ctx = RequestContext::new(false);

    dispatch_all(
        &store,
        &mut ctx,
        "account1",
        vec![call(
            "Cookie/set",
            serde_json::json!({"create": {"c1": {"type": "chocolate"}}}),
            "call1",
        )],
    );

    let mut ctx2 = RequestContext::new(false);
    let sentences = dispatch_all(
        &store,
        &mut ctx2,
        "account1",
        vec![call(
            "Cookie/set",
            serde_json::json!({
                "ifInState": "999",
                "create": {"c2": {"type": "oatmeal"}}
            }),
            "call1",
        )],
    );

    assert_eq!(sentences.len(), 1);
    assert_eq!(sentences[0].name, "error");
    assert_eq!(sentences[0].arguments["type"], "stateMismatch");
}

/// A second, query-enabled record class used only by the scenarios below
/// (`Cookie` never sets `query_enabled`, so it can't exercise `/query` or
/// `/queryChanges`).
fn widget_is_red(filter_arg: &Value, row: &Map<String, Value>) -> bool {
    filter_arg.as_bool() == Some(true) && row.get("color").and_then(Value::as_str) == Some("red")
}

fn widget_color_differs(old_row: &Map<String, Value>, new_row: &Map<String, Value>) -> bool {
    old_row.get("color") != new_row.get("color")
}

const WIDGET_PROPERTIES: &[Property] = &[
    Property {
        name: "color",
        kind: PropertyKind::String,
        is_optional: false,
        client_may_init: true,
        client_may_update: true,
        immutable: false,
        is_virtual: false,
        default: None,
        validate: None,
    },
    Property {
        name: "label",
        kind: PropertyKind::String,
        is_optional: true,
        client_may_init: true,
        client_may_update: true,
        immutable: false,
        is_virtual: false,
        default: None,
        validate: None,
    },
];

const WIDGET_FILTERS: &[QueryFilter] = &[QueryFilter {
    name: "isRed",
    cond_builder: widget_is_red,
    differ: widget_color_differs,
}];

fn on_widget_postprocess_create(_ctx: &RequestContext, row: &Map<String, Value>) {
    tracing::debug!(id = ?row.get("id"), "widget postprocess create fired");
}

static WIDGET_HOOKS: Hooks = Hooks {
    ix_set_check: None,
    ix_create_check: None,
    ix_create_error: None,
    ix_created: None,
    ix_update_check: None,
    ix_updated: None,
    ix_destroy_check: None,
    ix_destroyed: None,
    ix_postprocess_create: Some(on_widget_postprocess_create),
    ix_postprocess_update: None,
    ix_postprocess_destroy: None,
};

struct Widget;

impl RecordClass for Widget {
    fn type_key(&self) -> &'static str {
        "Widget"
    }

    fn account_type(&self) -> &'static str {
        "generic"
    }

    fn properties(&self) -> &[Property] {
        WIDGET_PROPERTIES
    }

    fn query_enabled(&self) -> bool {
        true
    }

    fn query_filter_map(&self) -> &[QueryFilter] {
        WIDGET_FILTERS
    }

    fn hooks(&self) -> &Hooks {
        &WIDGET_HOOKS
    }
}

static WIDGET: Widget = Widget;

fn new_widget_store() -> (tempfile::TempDir, RecordStore) {
    let dir = tempfile::tempdir().unwrap();
    let config: Config = toml::from_str(&format!("path = {:?}", dir.path())).unwrap();
    let store = RecordStore::new(config, &[&WIDGET]).unwrap();
    (dir, store)
}

fn dispatch_widget(
    store: &RecordStore,
    ctx: &mut RequestContext,
    account_id: &str,
    calls: Vec<Call>,
) -> Vec<dispatcher::Sentence> {
    let registry = RecordClassRegistry::new(vec![&WIDGET]);
    store
        .with_transaction(|txn| {
            for record_class in registry.classes() {
                let (lowest, highest) = txn.load_state(account_id, record_class.type_key())?;
                ctx.account_state.load(account_id, record_class.type_key(), lowest, highest);
            }
            let sentences = dispatcher::dispatch(&registry, txn, ctx, account_id, calls)
                .map_err(|_| jogre_server::engine::storage::StorageError::Backend("too many calls".into()))?;
            for (account_id, type_name, new_highest) in ctx.account_state.commit() {
                txn.bump_state(&account_id, &type_name, new_highest)?;
            }
            Ok(sentences)
        })
        .unwrap()
}

/// S7: a successful `Widget/set` create with a declared
/// `ix_postprocess_create` hook queues the row rather than invoking the
/// hook in-transaction; a later create that fails fatally in the same
/// phase rolls the queue back to what it held before that phase started,
/// taking the phase's own successful queue entries down with it.
#[test]
fn s7_postprocess_queue_rolls_back_with_its_phase() {
    let (_dir, store) = new_widget_store();
    let mut ctx = RequestContext::new(false);

    dispatch_widget(
        &store,
        &mut ctx,
        "account1",
        vec![call(
            "Widget/set",
            serde_json::json!({"create": {"w1": {"color": "red"}}}),
            "call1",
        )],
    );

    assert_eq!(ctx.postprocess_queue.len(), 1);
    assert_eq!(ctx.postprocess_queue[0].row["color"], "red");

    let sentences = dispatch_widget(
        &store,
        &mut ctx,
        "account1",
        vec![call(
            "Widget/set",
            serde_json::json!({
                "create": {
                    "w2": {"color": "blue"},
                    "w3": {"color": "#doesNotExist"}
                }
            }),
            "call2",
        )],
    );

    assert_eq!(sentences.len(), 1);
    assert_eq!(sentences[0].name, "error");
    assert_eq!(sentences[0].arguments["type"], "invalidArguments");
    assert_eq!(ctx.postprocess_queue.len(), 1);
}

/// S8: `Widget/queryChanges` reports ids whose `differ`-flagged change
/// landed the `{type}_query_log` since `sinceQueryState`, reclassified as
/// added/removed by re-evaluating the filter against the row as it
/// stands now; an update that only touches a property `differ` ignores
/// advances the account's state but leaves no trace for `queryChanges`
/// to find.
#[test]
fn s8_query_changes_reports_a_differ_driven_delta() {
    let (_dir, store) = new_widget_store();

    let mut ctx = RequestContext::new(false);
    let created = dispatch_widget(
        &store,
        &mut ctx,
        "account1",
        vec![call(
            "Widget/set",
            serde_json::json!({"create": {"w1": {"color": "red", "label": "first"}}}),
            "call1",
        )],
    );
    let created_args = &created[0].arguments;
    let widget_id = created_args["created"]["w1"]["id"].as_str().unwrap().to_string();
    let state_after_create = created_args["newState"].as_str().unwrap().to_string();

    let mut ctx = RequestContext::new(false);
    let since_zero = dispatch_widget(
        &store,
        &mut ctx,
        "account1",
        vec![call(
            "Widget/queryChanges",
            serde_json::json!({"sinceQueryState": "0", "filter": {"isRed": true}}),
            "call1",
        )],
    );
    let added: Vec<&str> = since_zero[0].arguments["added"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    assert_eq!(added, vec![widget_id.as_str()]);
    assert!(since_zero[0].arguments["removed"].as_array().unwrap().is_empty());

    let mut ctx = RequestContext::new(false);
    let label_only_update = dispatch_widget(
        &store,
        &mut ctx,
        "account1",
        vec![call(
            "Widget/set",
            serde_json::json!({"update": {widget_id.clone(): {"label": "second"}}}),
            "call1",
        )],
    );
    let state_after_label_update = label_only_update[0].arguments["newState"].as_str().unwrap().to_string();

    let mut ctx = RequestContext::new(false);
    let unaffected = dispatch_widget(
        &store,
        &mut ctx,
        "account1",
        vec![call(
            "Widget/queryChanges",
            serde_json::json!({"sinceQueryState": state_after_create, "filter": {"isRed": true}}),
            "call1",
        )],
    );
    assert!(unaffected[0].arguments["added"].as_array().unwrap().is_empty());
    assert!(unaffected[0].arguments["removed"].as_array().unwrap().is_empty());

    let mut ctx = RequestContext::new(false);
    dispatch_widget(
        &store,
        &mut ctx,
        "account1",
        vec![call(
            "Widget/set",
            serde_json::json!({"update": {widget_id.clone(): {"color": "blue"}}}),
            "call1",
        )],
    );

    let mut ctx = RequestContext::new(false);
    let after_color_change = dispatch_widget(
        &store,
        &mut ctx,
        "account1",
        vec![call(
            "Widget/queryChanges",
            serde_json::json!({"sinceQueryState": state_after_label_update, "filter": {"isRed": true}}),
            "call1",
        )],
    );
    assert!(after_color_change[0].arguments["added"].as_array().unwrap().is_empty());
    let removed: Vec<&str> = after_color_change[0].arguments["removed"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    assert_eq!(removed, vec![widget_id.as_str()]);
}
