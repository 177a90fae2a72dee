//! The `/api` transport adapter (§6): decode the JSON body into a call
//! list, hand it to the engine dispatcher, encode the resulting sentence
//! collection back into a JMAP `Response`.

use std::{borrow::Cow, collections::HashMap, sync::Arc};

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response as AxumResponse},
    Extension,
};
use jmap_proto::{
    common::{Id, SessionState},
    endpoints::{Argument, Arguments, Invocation, Request, Response},
};
use oxide_auth::primitives::grant::Grant;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{
    context::Context,
    engine::{
        context::{PostprocessStage, RequestContext},
        dispatcher::{self, Call, CallTriple},
        storage::StorageError,
    },
    store::{AccountProvider, UserProvider},
};

pub async fn handle(
    State(context): State<Arc<Context>>,
    Extension(grant): Extension<Grant>,
    body: Bytes,
) -> AxumResponse {
    let transaction_id = Uuid::new_v4();

    let payload: Request<'_> = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(_) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                serde_json::json!({"error": "could not decode request"}),
            )
        }
    };

    if payload.method_calls.len() > context.limits.max_calls_in_request as usize {
        return error_response(
            StatusCode::BAD_REQUEST,
            serde_json::json!({"error": "tooManyMethods"}),
        );
    }

    let username = grant.owner_id;

    let user = match context.store.get_by_username(&username).await {
        Ok(Some(user)) => user,
        _ => return internal_error_response(transaction_id, "looking up user"),
    };

    let accounts = match context.store.get_accounts_for_user(user.id).await {
        Ok(accounts) => accounts,
        Err(_) => return internal_error_response(transaction_id, "loading accounts"),
    };

    // Picking which account a call applies to is out of this engine's
    // scope ("does not attempt consistency across accounts within a
    // single request"); the whole batch runs against the caller's
    // primary account.
    let Some(account) = accounts.iter().find(|a| a.is_personal).or_else(|| accounts.first())
    else {
        return internal_error_response(transaction_id, "no account for user");
    };
    let account_id = account.id.to_string();

    let session_state = match context.store.fetch_seq_number_for_user(user.id).await {
        Ok(seq) => seq,
        Err(_) => return internal_error_response(transaction_id, "loading session state"),
    };

    let mut ctx = RequestContext::new(false);
    if let Some(created_ids) = &payload.created_ids {
        for (creation_id, id) in created_ids {
            ctx.creation_ids.seed(creation_id.0.as_ref(), id.0.to_string());
        }
    }

    let calls: Vec<Call> = payload
        .method_calls
        .into_iter()
        .map(|invocation| {
            Call::Method(CallTriple {
                method: invocation.name.into_owned(),
                arguments: arguments_to_json(invocation.arguments),
                client_id: invocation.request_id.into_owned(),
            })
        })
        .collect();

    let registry = &context.record_classes;
    let record_classes = registry.classes();

    let dispatch_result = context.record_store.with_transaction(|txn| {
        for record_class in record_classes {
            let (lowest, highest) = txn.load_state(&account_id, record_class.type_key())?;
            ctx.account_state.load(&account_id, record_class.type_key(), lowest, highest);
        }

        let sentences = dispatcher::dispatch(registry, txn, &mut ctx, &account_id, calls)
            .map_err(|_| StorageError::Backend("too many calls in request".to_string()))?;

        for (account_id, type_name, new_highest) in ctx.account_state.commit() {
            txn.bump_state(&account_id, &type_name, new_highest)?;
        }

        Ok(sentences)
    });

    let sentences = match dispatch_result {
        Ok(sentences) => sentences,
        Err(err) => return internal_error_response(transaction_id, &err.to_string()),
    };

    // Only reachable once the transaction above has actually committed
    // (§4.5): these hooks carry external, irreversible side effects, so
    // they must never fire on a rolled-back `/set` phase.
    for item in ctx.postprocess_queue.drain(..) {
        let Some(record_class) = registry.lookup(item.type_key) else {
            continue;
        };
        let hook = match item.stage {
            PostprocessStage::Create => record_class.hooks().ix_postprocess_create,
            PostprocessStage::Update => record_class.hooks().ix_postprocess_update,
            PostprocessStage::Destroy => record_class.hooks().ix_postprocess_destroy,
        };
        if let Some(hook) = hook {
            hook(&ctx, &item.row);
        }
    }

    let method_responses = sentences
        .into_iter()
        .map(|sentence| {
            Invocation::new(
                Cow::Owned(sentence.name),
                json_to_arguments(sentence.arguments),
                Cow::Owned(sentence.client_id),
            )
        })
        .collect();

    let created_ids: HashMap<Id, Id> = ctx
        .creation_ids
        .resolved_entries()
        .map(|(creation_id, id)| {
            (
                Id(Cow::Owned(creation_id.to_string())),
                Id(Cow::Owned(id.to_string())),
            )
        })
        .collect();

    let response = Response {
        method_responses,
        created_ids: if created_ids.is_empty() { None } else { Some(created_ids) },
        session_state: SessionState(session_state.to_string().into()),
    };

    success_response(transaction_id, &response)
}

/// `Arguments` already splits wire `#foo` keys into `Argument::Reference`
/// (the `#` prefix stripped from the map key); the engine's
/// back-reference resolver expects the `#` back on the key and the
/// reference JSON-encoded as the value, so this re-wraps into that
/// shape.
fn arguments_to_json(args: Arguments<'_>) -> Map<String, Value> {
    let mut map = Map::with_capacity(args.0.len());
    for (key, value) in args.0 {
        match value {
            Argument::Absolute(value) => {
                map.insert(key.into_owned(), value);
            }
            Argument::Reference(refer) => {
                map.insert(
                    format!("#{key}"),
                    serde_json::json!({
                        "resultOf": refer.result_of,
                        "name": refer.name,
                        "path": refer.path,
                    }),
                );
            }
        }
    }
    map
}

fn json_to_arguments(value: Value) -> Arguments<'static> {
    let mut map = HashMap::new();
    if let Value::Object(object) = value {
        for (key, value) in object {
            map.insert(Cow::Owned(key), Argument::Absolute(value));
        }
    }
    Arguments(map)
}

fn error_response(status: StatusCode, body: Value) -> AxumResponse {
    (status, axum::Json(body)).into_response()
}

fn internal_error_response(guid: Uuid, what: &str) -> AxumResponse {
    tracing::error!(report_id = %guid, %what, "internal api failure");
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        serde_json::json!({"error": "internal", "guid": guid.to_string()}),
    )
}

fn success_response(transaction_id: Uuid, response: &Response<'_>) -> AxumResponse {
    let body = serde_json::to_vec(response).unwrap();

    let mut headers = HeaderMap::new();
    headers.insert(header::VARY, HeaderValue::from_static("Origin"));
    headers.insert(
        "Ix-Transaction-ID",
        HeaderValue::from_str(&transaction_id.to_string()).unwrap(),
    );
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json; charset=utf-8"),
    );

    (StatusCode::OK, headers, body).into_response()
}
