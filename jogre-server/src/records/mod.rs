//! Concrete record-class declarations (§6's "record-class declaration
//! contract") built on top of `engine::record`.

pub mod cookie;

use crate::engine::record::RecordClass;

/// All record classes registered with the engine at startup (§5
/// "process-wide caches ... built at startup and immutable thereafter").
pub fn all() -> Vec<&'static dyn RecordClass> {
    vec![&cookie::COOKIE]
}
