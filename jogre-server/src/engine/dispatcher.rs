//! The request dispatcher (§4.1, §4.2).
//!
//! Grounded on `methods/api/mod.rs`'s `handle`/`resolve_arguments`: the
//! `for invocation_request in payload.method_calls { ... // TODO: call
//! handler ... }` loop in that file is exactly the per-call loop this
//! module completes, generalised to own back-reference resolution,
//! handler lookup, and the multicall/error-ordering rules the stub never
//! got to.

use std::time::Instant;

use serde_json::{Map, Value};

use crate::engine::context::{CallTiming, RequestContext};
use crate::engine::error::DispatchError;
use crate::engine::pointer;
use crate::engine::record::RecordClass;
use crate::engine::resultset::{ix_changes, ix_get, ix_query, ix_query_changes, ix_set};
use crate::engine::storage::StoreTransaction;

/// A parsed `[method, arguments, clientId]` call triple (§3).
#[derive(Debug, Clone)]
pub struct CallTriple {
    pub method: String,
    pub arguments: Map<String, Value>,
    pub client_id: String,
}

/// One `(name, arguments, clientId)` result sentence (§3).
#[derive(Debug, Clone)]
pub struct Sentence {
    pub name: String,
    pub arguments: Value,
    pub client_id: String,
}

/// An opaque call-coalescing optimisation (§4.2): carries its own
/// pre-computed results and an `execute` that yields them, so the
/// dispatcher never needs to know how a multicall was built.
pub trait MulticallCall {
    /// Name used for logging in the context's call-info log.
    fn call_ident(&self) -> &str;
    fn execute(self: Box<Self>, ctx: &mut RequestContext) -> Vec<Sentence>;
}

/// The trivial multicall: already has its results, nothing to coalesce.
pub struct Done {
    pub call_ident: String,
    pub sentences: Vec<Sentence>,
}

impl MulticallCall for Done {
    fn call_ident(&self) -> &str {
        &self.call_ident
    }

    fn execute(self: Box<Self>, _ctx: &mut RequestContext) -> Vec<Sentence> {
        self.sentences
    }
}

pub enum Call {
    Method(CallTriple),
    Multicall(Box<dyn MulticallCall>),
}

/// The batch-level (non-per-call) failure mode: a request with more
/// than 5,000 calls never reaches the per-call loop at all (§4.1).
#[derive(Debug, Clone, Copy)]
pub struct TooManyCalls;

/// The dispatcher's fixed fatal ceiling (§4.1). `Config::limits` is
/// cross-checked against this at `Context::new` rather than the other way
/// round: a deployment may tighten the cap, never loosen it.
pub const MAX_CALLS_PER_REQUEST: usize = 5_000;

/// The process-wide, immutable map from JMAP type name to record class
/// (§5 "process-wide caches ... built at startup and immutable
/// thereafter"), generalising the old per-extension router registry from
/// a fixed set of hand-routed extension endpoints to any declared record
/// class.
pub struct RecordClassRegistry {
    classes: Vec<&'static dyn RecordClass>,
}

impl RecordClassRegistry {
    pub fn new(classes: Vec<&'static dyn RecordClass>) -> Self {
        Self { classes }
    }

    pub fn lookup(&self, type_key: &str) -> Option<&'static dyn RecordClass> {
        self.classes.iter().find(|rc| rc.type_key() == type_key).copied()
    }

    pub fn classes(&self) -> &[&'static dyn RecordClass] {
        &self.classes
    }
}

fn error_sentence(error_type: &str, description: Option<&str>, client_id: &str) -> Sentence {
    let mut arguments = Map::with_capacity(2);
    arguments.insert("type".to_string(), Value::String(error_type.to_string()));
    if let Some(description) = description {
        arguments.insert("description".to_string(), Value::String(description.to_string()));
    }
    Sentence {
        name: "error".to_string(),
        arguments: Value::Object(arguments),
        client_id: client_id.to_string(),
    }
}

fn dispatch_error_sentence(error: &DispatchError, client_id: &str) -> Sentence {
    error_sentence(error.type_tag(), error.description(), client_id)
}

/// Expands `#foo` back-reference keys against the sentences accumulated
/// so far (§3, §4.1 step 4, §4.3).
fn resolve_back_references(
    args: &Map<String, Value>,
    sentences: &[Sentence],
) -> Result<Map<String, Value>, DispatchError> {
    let mut resolved = Map::with_capacity(args.len());

    for (key, value) in args {
        let Some(plain) = key.strip_prefix('#') else {
            resolved.insert(key.clone(), value.clone());
            continue;
        };

        if args.contains_key(plain) {
            return Err(DispatchError::InvalidArguments(format!(
                "argument {plain:?} present both as itself and as a back-reference"
            )));
        }

        let Value::Object(refer) = value else {
            return Err(DispatchError::ResultReference("malformed ResultReference".to_string()));
        };

        let (Some(result_of), Some(name), Some(path)) = (
            refer.get("resultOf").and_then(Value::as_str),
            refer.get("name").and_then(Value::as_str),
            refer.get("path").and_then(Value::as_str),
        ) else {
            return Err(DispatchError::ResultReference("malformed ResultReference".to_string()));
        };

        let source = sentences
            .iter()
            .find(|s| s.client_id == result_of && s.name == name)
            .ok_or_else(|| DispatchError::ResultReference("dangling ResultReference".to_string()))?;

        let resolved_value = pointer::resolve(&source.arguments, path).map_err(|_| {
            DispatchError::ResultReference("ResultReference path did not resolve".to_string())
        })?;
        resolved.insert(plain.to_string(), resolved_value);
    }

    Ok(resolved)
}

/// Looks up and invokes the handler for one resolved call, returning the
/// sentence(s) it produced. A thrown `DispatchError` becomes an `error`
/// sentence; the ordering rule (drop siblings after an error) is
/// enforced by the caller.
fn invoke_handler(
    registry: &RecordClassRegistry,
    store: &mut StoreTransaction<'_>,
    ctx: &mut RequestContext,
    account_id: &str,
    method: &str,
    args: &Map<String, Value>,
    client_id: &str,
) -> Vec<Sentence> {
    let Some((type_key, verb)) = method.split_once('/') else {
        return vec![error_sentence(DispatchError::UnknownMethod.type_tag(), None, client_id)];
    };

    let Some(record_class) = registry.lookup(type_key) else {
        return vec![error_sentence(DispatchError::UnknownMethod.type_tag(), None, client_id)];
    };

    let outcome: Result<(String, Value), DispatchError> = match verb {
        "get" => ix_get(record_class, store, ctx, account_id, args)
            .map(|value| (format!("{type_key}/get"), value)),
        "set" => ix_set(record_class, store, ctx, account_id, args)
            .map(|value| (format!("{type_key}/set"), value)),
        "changes" => ix_changes(record_class, store, ctx, account_id, args)
            .map(|value| (format!("{type_key}/changes"), value)),
        "query" if record_class.query_enabled() => ix_query(record_class, store, ctx, account_id, args)
            .map(|value| (format!("{type_key}/query"), value)),
        "queryChanges" if record_class.query_enabled() => {
            ix_query_changes(record_class, store, ctx, account_id, args)
                .map(|value| (format!("{type_key}/queryChanges"), value))
        }
        _ => Err(DispatchError::UnknownMethod),
    };

    match outcome {
        Ok((name, arguments)) => vec![Sentence {
            name,
            arguments,
            client_id: client_id.to_string(),
        }],
        Err(error) => match error {
            // A per-record-class state error carries a bespoke method
            // type not reachable through `method_error()`; `type_tag`
            // already accounts for this.
            other => vec![dispatch_error_sentence(&other, client_id)],
        },
    }
}

/// Runs the whole per-call loop of §4.1 over `calls`, returning the
/// accumulated sentence collection or the batch-level `TooManyCalls`
/// failure.
pub fn dispatch(
    registry: &RecordClassRegistry,
    store: &mut StoreTransaction<'_>,
    ctx: &mut RequestContext,
    account_id: &str,
    calls: Vec<Call>,
) -> Result<Vec<Sentence>, TooManyCalls> {
    if calls.len() > MAX_CALLS_PER_REQUEST {
        return Err(TooManyCalls);
    }

    let mut sentences: Vec<Sentence> = Vec::with_capacity(calls.len());

    for call in calls {
        let start = Instant::now();

        match call {
            Call::Multicall(multicall) => {
                let ident = multicall.call_ident().to_string();
                let results = multicall.execute(ctx);
                sentences.extend(results);
                ctx.call_info.push(CallTiming {
                    method: ident,
                    elapsed: start.elapsed(),
                });
            }
            Call::Method(triple) => {
                let span = tracing::info_span!("jmap_call", method = %triple.method, client_id = %triple.client_id);
                let _enter = span.enter();

                let resolved_args = match resolve_back_references(&triple.arguments, &sentences) {
                    Ok(args) => args,
                    Err(err) => {
                        sentences.push(dispatch_error_sentence(&err, &triple.client_id));
                        ctx.call_info.push(CallTiming {
                            method: triple.method.clone(),
                            elapsed: start.elapsed(),
                        });
                        continue;
                    }
                };

                if !ctx.may_call(&triple.method) {
                    sentences.push(dispatch_error_sentence(&DispatchError::Forbidden, &triple.client_id));
                    ctx.call_info.push(CallTiming {
                        method: triple.method.clone(),
                        elapsed: start.elapsed(),
                    });
                    continue;
                }

                let results = invoke_handler(
                    registry,
                    store,
                    ctx,
                    account_id,
                    &triple.method,
                    &resolved_args,
                    &triple.client_id,
                );

                let mut saw_error = false;
                for sentence in results {
                    if saw_error {
                        ctx.file_exception_report(
                            "dispatcher",
                            &"dropped a sentence emitted after an error result",
                        );
                        continue;
                    }
                    if sentence.name == "error" {
                        saw_error = true;
                    }
                    sentences.push(sentence);
                }

                let elapsed = start.elapsed();
                tracing::debug!(elapsed_ms = elapsed.as_millis(), "jmap call dispatched");
                ctx.call_info.push(CallTiming {
                    method: triple.method,
                    elapsed,
                });
            }
        }
    }

    Ok(sentences)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_method_produces_error_sentence() {
        let registry = RecordClassRegistry::new(Vec::new());
        let mut ctx = RequestContext::new(true);

        // `invoke_handler` doesn't need a live transaction for this
        // path since it fails before touching storage; exercised via
        // the public `dispatch` entry point would require a RecordStore,
        // so this unit test targets the handler-lookup failure directly
        // through the sentence shape contract instead.
        let sentence = error_sentence(DispatchError::UnknownMethod.type_tag(), None, "a");
        assert_eq!(sentence.name, "error");
        assert_eq!(sentence.client_id, "a");
        assert_eq!(sentence.arguments["type"], "unknownMethod");
        let _ = (&registry, &mut ctx);
    }

    #[test]
    fn resolve_back_references_rejects_coexisting_plain_and_hash_keys() {
        let mut args = Map::new();
        args.insert("ids".to_string(), Value::String("x".to_string()));
        args.insert(
            "#ids".to_string(),
            serde_json::json!({"resultOf": "a", "name": "Cookie/set", "path": "/created/c1/id"}),
        );

        let err = resolve_back_references(&args, &[]).unwrap_err();
        assert!(matches!(err, DispatchError::InvalidArguments(_)));
    }

    #[test]
    fn resolve_back_references_errors_on_dangling_reference() {
        let mut args = Map::new();
        args.insert(
            "#ids".to_string(),
            serde_json::json!({"resultOf": "x", "name": "Cookie/set", "path": "/created/c1/id"}),
        );

        let err = resolve_back_references(&args, &[]).unwrap_err();
        assert!(matches!(err, DispatchError::ResultReference(_)));
    }

    #[test]
    fn resolve_back_references_finds_first_matching_sentence() {
        let sentences = vec![
            Sentence {
                name: "Cookie/set".to_string(),
                arguments: serde_json::json!({"created": {"c1": {"id": "first"}}}),
                client_id: "a".to_string(),
            },
            Sentence {
                name: "Cookie/set".to_string(),
                arguments: serde_json::json!({"created": {"c1": {"id": "second"}}}),
                client_id: "a".to_string(),
            },
        ];

        let mut args = Map::new();
        args.insert(
            "#ids".to_string(),
            serde_json::json!({"resultOf": "a", "name": "Cookie/set", "path": "/created/c1/id"}),
        );

        let resolved = resolve_back_references(&args, &sentences).unwrap();
        assert_eq!(resolved["ids"], "first");
    }
}
