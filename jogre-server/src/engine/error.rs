//! Error taxonomy for the engine, layered under the wire-facing
//! `jmap_proto::errors::MethodError`.

use jmap_proto::errors::MethodError;

/// An error raised while dispatching a single call (§4.1, §7).
#[derive(Debug, Clone)]
pub enum DispatchError {
    UnknownMethod,
    /// Malformed ref, dangling ref, or pointer path error (§7). Wire tag
    /// is the bespoke `resultReference`, distinct from `MethodError`'s
    /// own `invalidResultReference`.
    ResultReference(String),
    Forbidden,
    AccountNotFound,
    AccountNotSupportedByMethod,
    AccountReadOnly,
    DuplicateCreationId,
    InvalidArguments(String),
    StateMismatch,
    CannotCalculateChanges,
    TryAgain,
    Internal(String),
}

impl DispatchError {
    /// The `MethodError` tag used on the wire for generic (non-method-
    /// specific) failures. `StateMismatch`/`CannotCalculateChanges`/
    /// `TryAgain` are method-specific JMAP error types that do not have a
    /// `MethodError` counterpart; callers building a response for those
    /// must emit the bespoke `type` string directly.
    pub fn method_error(&self) -> Option<MethodError> {
        match self {
            DispatchError::UnknownMethod => Some(MethodError::UnknownMethod),
            DispatchError::Forbidden => Some(MethodError::Forbidden),
            DispatchError::AccountNotFound => Some(MethodError::AccountNotFound),
            DispatchError::AccountNotSupportedByMethod => {
                Some(MethodError::AccountNotSupportedByMethod)
            }
            DispatchError::AccountReadOnly => Some(MethodError::AccountReadOnly),
            DispatchError::InvalidArguments(_) => Some(MethodError::InvalidArguments),
            DispatchError::ResultReference(_)
            | DispatchError::DuplicateCreationId
            | DispatchError::StateMismatch
            | DispatchError::CannotCalculateChanges
            | DispatchError::TryAgain => None,
            DispatchError::Internal(_) => Some(MethodError::ServerFail),
        }
    }

    /// The wire `type` tag (§7). `resultReference`/`duplicateCreationId`/
    /// `stateMismatch`/`cannotCalculateChanges`/`tryAgain` are
    /// method-specific JMAP error types with no `MethodError`
    /// counterpart, so they're named directly rather than through
    /// `method_error()`.
    pub fn type_tag(&self) -> &'static str {
        match self {
            DispatchError::ResultReference(_) => "resultReference",
            DispatchError::DuplicateCreationId => "duplicateCreationId",
            DispatchError::StateMismatch => "stateMismatch",
            DispatchError::CannotCalculateChanges => "cannotCalculateChanges",
            DispatchError::TryAgain => "tryAgain",
            other => other.method_error().expect("non-bespoke variant").type_tag(),
        }
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            DispatchError::InvalidArguments(msg)
            | DispatchError::Internal(msg)
            | DispatchError::ResultReference(msg) => Some(msg),
            _ => None,
        }
    }
}

impl std::fmt::Display for DispatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.type_tag())?;
        if let Some(description) = self.description() {
            write!(f, ": {description}")?;
        }
        Ok(())
    }
}

impl std::error::Error for DispatchError {}

/// An error raised applying one create/update/destroy inside a `/set`
/// phase (§4.7). Carries enough to build a `SetError` on the wire.
#[derive(Debug, Clone)]
pub enum SetPhaseError {
    Forbidden,
    NotFound,
    InvalidPatch(String),
    WillDestroy,
    InvalidProperties(Vec<String>, String),
    Singleton,
}

impl SetPhaseError {
    pub fn type_tag(&self) -> &'static str {
        match self {
            SetPhaseError::Forbidden => "forbidden",
            SetPhaseError::NotFound => "notFound",
            SetPhaseError::InvalidPatch(_) => "invalidPatch",
            SetPhaseError::WillDestroy => "willDestroy",
            SetPhaseError::InvalidProperties(_, _) => "invalidProperties",
            SetPhaseError::Singleton => "singleton",
        }
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            SetPhaseError::InvalidPatch(msg) | SetPhaseError::InvalidProperties(_, msg) => {
                Some(msg)
            }
            _ => None,
        }
    }

    pub fn properties(&self) -> &[String] {
        match self {
            SetPhaseError::InvalidProperties(props, _) => props,
            _ => &[],
        }
    }
}

/// Raised by `engine::state` when a client-supplied state string cannot
/// be honoured (§4.4, four-valued comparator).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateError {
    /// The since-state predates the account's retained history; the
    /// client must resynchronise from scratch.
    Resync,
    /// The since-state is not a state this account has ever held.
    Bogus,
}

impl From<StateError> for DispatchError {
    fn from(value: StateError) -> Self {
        match value {
            StateError::Resync => DispatchError::CannotCalculateChanges,
            StateError::Bogus => DispatchError::InvalidArguments("unknown state string".into()),
        }
    }
}
