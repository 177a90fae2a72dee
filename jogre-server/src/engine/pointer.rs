//! Modified JSON-Pointer resolver (RFC 6901 plus the JMAP `*`-over-array
//! extension used to resolve back-references, see RFC 8620 §3.7).

use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointerErrorKind {
    /// The pointer did not begin with `/` (and was not empty).
    Malformed,
    /// A token walked off the end of the document.
    NotFound,
    /// A `*` token was applied to something other than an array.
    NotAnArray,
    /// A non-`*`, non-array-index token was applied to something other
    /// than an object.
    NotAnObject,
    /// The `-` token, which RFC 6901 allows but JMAP back-references do
    /// not.
    DashRejected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointerError {
    /// The pointer path accumulated up to the point of failure.
    pub path: String,
    /// Array indices walked through while resolving a `*` token, outermost
    /// last.
    pub indices: Vec<usize>,
    pub kind: PointerErrorKind,
}

impl std::fmt::Display for PointerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            PointerErrorKind::Malformed => write!(f, "malformed pointer {:?}", self.path),
            PointerErrorKind::NotFound => write!(f, "no value at {:?}", self.path),
            PointerErrorKind::NotAnArray => write!(f, "{:?} is not an array", self.path),
            PointerErrorKind::NotAnObject => write!(f, "{:?} is not an object", self.path),
            PointerErrorKind::DashRejected => write!(f, "'-' token not supported at {:?}", self.path),
        }?;
        if !self.indices.is_empty() {
            write!(f, " (indices {:?})", self.indices)?;
        }
        Ok(())
    }
}

impl std::error::Error for PointerError {}

/// Resolves `pointer` against `value`, following the modified RFC 6901
/// grammar described in the method generator's `*`-expansion rules.
pub fn resolve(value: &Value, pointer: &str) -> Result<Value, PointerError> {
    if pointer.is_empty() {
        return Ok(value.clone());
    }

    if !pointer.starts_with('/') {
        return Err(PointerError {
            path: pointer.to_string(),
            indices: Vec::new(),
            kind: PointerErrorKind::Malformed,
        });
    }

    let tokens: Vec<&str> = pointer[1..].split('/').collect();
    let mut indices = Vec::new();
    let resolved = resolve_tokens(value, &tokens, "", &mut indices)?;
    indices.reverse();
    Ok(resolved)
}

fn unescape(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

fn resolve_tokens(
    value: &Value,
    tokens: &[&str],
    path_so_far: &str,
    indices: &mut Vec<usize>,
) -> Result<Value, PointerError> {
    let Some((&raw, rest)) = tokens.split_first() else {
        return Ok(value.clone());
    };

    if raw == "-" {
        return Err(PointerError {
            path: format!("{path_so_far}/-"),
            indices: indices.clone(),
            kind: PointerErrorKind::DashRejected,
        });
    }

    if raw == "*" {
        let path = format!("{path_so_far}/*");
        let Value::Array(items) = value else {
            return Err(PointerError {
                path,
                indices: indices.clone(),
                kind: PointerErrorKind::NotAnArray,
            });
        };

        let mut out = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            indices.push(index);
            let resolved = resolve_tokens(item, rest, &path, indices)?;
            indices.pop();
            match resolved {
                Value::Array(flattened) => out.extend(flattened),
                other => out.push(other),
            }
        }
        return Ok(Value::Array(out));
    }

    let token = unescape(raw);
    let path = format!("{path_so_far}/{token}");

    match value {
        Value::Object(map) => {
            let next = map.get(&token).ok_or_else(|| PointerError {
                path: path.clone(),
                indices: indices.clone(),
                kind: PointerErrorKind::NotFound,
            })?;
            resolve_tokens(next, rest, &path, indices)
        }
        Value::Array(items) => {
            let index: usize = token.parse().map_err(|_| PointerError {
                path: path.clone(),
                indices: indices.clone(),
                kind: PointerErrorKind::Malformed,
            })?;
            let next = items.get(index).ok_or_else(|| PointerError {
                path: path.clone(),
                indices: indices.clone(),
                kind: PointerErrorKind::NotFound,
            })?;
            resolve_tokens(next, rest, &path, indices)
        }
        _ => Err(PointerError {
            path: path_so_far.to_string(),
            indices: indices.clone(),
            kind: PointerErrorKind::NotAnObject,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_pointer_without_leading_slash() {
        let err = resolve(&json!({"a": 1}), "a").unwrap_err();
        assert_eq!(err.kind, PointerErrorKind::Malformed);
    }

    #[test]
    fn rejects_dash_token() {
        let err = resolve(&json!({"list": [1, 2]}), "/list/-").unwrap_err();
        assert_eq!(err.kind, PointerErrorKind::DashRejected);
    }

    #[test]
    fn star_maps_over_array_and_flattens_one_level() {
        let doc = json!({"list": [{"id": "a"}, {"id": "b"}]});
        let resolved = resolve(&doc, "/list/*/id").unwrap();
        assert_eq!(resolved, json!(["a", "b"]));
    }

    #[test]
    fn star_flattens_nested_arrays_one_level() {
        let doc = json!({"list": [{"tags": ["x", "y"]}, {"tags": ["z"]}]});
        let resolved = resolve(&doc, "/list/*/tags").unwrap();
        assert_eq!(resolved, json!(["x", "y", "z"]));
    }

    #[test]
    fn escapes_tilde_and_slash() {
        let doc = json!({"a/b": {"c~d": 42}});
        let resolved = resolve(&doc, "/a~1b/c~0d").unwrap();
        assert_eq!(resolved, json!(42));
    }

    #[test]
    fn round_trips_non_star_pointers() {
        let doc = json!({"created": {"c1": {"id": "abc123"}}});
        let resolved = resolve(&doc, "/created/c1/id").unwrap();
        assert_eq!(resolved, json!("abc123"));
    }

    #[test]
    fn missing_path_is_not_found() {
        let err = resolve(&json!({"a": 1}), "/b").unwrap_err();
        assert_eq!(err.kind, PointerErrorKind::NotFound);
        assert_eq!(err.path, "/b");
    }
}
