//! Per-request context bag (§3 Account-state session, §5 shared-resource
//! policy).
//!
//! Grounded on `jogre-server/src/context.rs`'s server-wide `Context`
//! (a plain struct of handles built once and shared), scaled down here
//! to the lifetime of a single HTTP request.

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::engine::creation_ids::CreationIdTable;
use crate::engine::state::{AccountState, NestedSnapshot};

/// Which `ix_postprocess_*` hook a queued item is destined for (§4.5).
#[derive(Debug, Clone, Copy)]
pub enum PostprocessStage {
    Create,
    Update,
    Destroy,
}

/// A row queued by a `/set` phase for its record class's post-commit
/// hook. These carry external, irreversible side effects (§4.5), so they
/// must only run once the enclosing store transaction has actually
/// committed — queuing here rather than calling the hook in-transaction
/// is what keeps that true.
pub struct PostprocessItem {
    pub type_key: &'static str,
    pub stage: PostprocessStage,
    pub row: Map<String, Value>,
}

/// Elapsed time recorded for one call, keyed by method name (or
/// `call_ident` for a multicall) (§4.1 step 8).
#[derive(Debug, Clone)]
pub struct CallTiming {
    pub method: String,
    pub elapsed: std::time::Duration,
}

/// The mutable bag threaded through one request's dispatch loop:
/// account-state bookkeeper, creation-id table, exception-report guids,
/// call timings, and the `is_system` / `may_call` authorisation surface
/// (§3's "out of scope, surfaces only as a boolean flag and predicate").
pub struct RequestContext {
    pub account_state: AccountState,
    pub creation_ids: CreationIdTable,
    pub is_system: bool,
    pub call_info: Vec<CallTiming>,
    pub exception_guids: Vec<Uuid>,
    pub postprocess_queue: Vec<PostprocessItem>,
    nested_depth: u32,
}

impl RequestContext {
    pub fn new(is_system: bool) -> Self {
        Self {
            account_state: AccountState::new(),
            creation_ids: CreationIdTable::new(),
            is_system,
            call_info: Vec::new(),
            exception_guids: Vec::new(),
            postprocess_queue: Vec::new(),
            nested_depth: 0,
        }
    }

    /// Default `may_call`: the out-of-scope authorisation predicate.
    /// Non-system callers are allowed by default; a server wiring this
    /// engine in front of a real ACL should replace this with its own
    /// predicate before dispatch.
    pub fn may_call(&self, _method: &str) -> bool {
        true
    }

    /// Records an out-of-band exception report, returning the
    /// correlation guid to surface to the client (§4.1, §7). Grounded on
    /// `layers/logger.rs`'s `tracing::error!` shape for request
    /// failures — this sink does not invent a new reporting channel.
    pub fn file_exception_report(&mut self, context: &str, error: &dyn std::fmt::Display) -> Uuid {
        let guid = Uuid::new_v4();
        tracing::error!(report_id = %guid, %context, %error, "internal engine failure");
        self.exception_guids.push(guid);
        guid
    }

    pub fn enter_nested(&mut self) -> NestedGuard {
        self.nested_depth += 1;
        NestedGuard {
            account_state_snapshot: self.account_state.enter_nested(),
            postprocess_len: self.postprocess_queue.len(),
        }
    }

    pub fn exit_nested_commit(&mut self, _guard: NestedGuard) {
        self.nested_depth -= 1;
    }

    /// Rolls back a nested `/set` phase: both the pending state bumps
    /// and any postprocess items queued by records that are being
    /// rolled back with it.
    pub fn exit_nested_rollback(&mut self, guard: NestedGuard) {
        self.nested_depth -= 1;
        self.account_state.exit_nested_rollback(guard.account_state_snapshot);
        self.postprocess_queue.truncate(guard.postprocess_len);
    }

    pub fn nested_depth(&self) -> u32 {
        self.nested_depth
    }
}

/// Opaque token returned by `enter_nested`, carrying the state snapshot
/// needed to roll a nested scope back.
pub struct NestedGuard {
    account_state_snapshot: NestedSnapshot,
    postprocess_len: usize,
}
