pub mod common;
pub mod endpoints;
pub mod errors;
pub mod events;
pub mod extensions;
pub(crate) mod util;

pub use serde_json::Value;
