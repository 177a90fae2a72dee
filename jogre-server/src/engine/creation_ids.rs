//! Per-request creation-id table (§3, §4.5).
//!
//! Keyed purely by the client-supplied creation id, matching the wire
//! contract in `jmap_proto::endpoints::Request::created_ids`
//! (`HashMap<Id, Id>`, type-agnostic).

use std::collections::HashMap;

#[derive(Debug, Clone)]
pub enum CreationIdEntry {
    /// The creation id resolved to exactly one server-assigned id.
    Id(String),
    /// The creation id was used by more than one `create` in this
    /// request (or a prior one, if the table is seeded from the
    /// request's `createdIds`). Preserves the source behaviour: both
    /// underlying creates still happen, but any reference resolution
    /// against this creation id now fails with `duplicateCreationId`.
    Duplicate,
}

#[derive(Debug, Clone, Default)]
pub struct CreationIdTable {
    entries: HashMap<String, CreationIdEntry>,
}

impl CreationIdTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the table from a request's own `createdIds`, as required so
    /// that a client can reference ids created in an earlier API request
    /// via the same creation id.
    pub fn seed(&mut self, creation_id: impl Into<String>, id: impl Into<String>) {
        self.entries
            .insert(creation_id.into(), CreationIdEntry::Id(id.into()));
    }

    /// Records a successful create against `creation_id`. If the id was
    /// already claimed (by this request or a seed), flips the entry to
    /// `Duplicate` rather than overwriting it.
    pub fn record(&mut self, creation_id: impl Into<String>, id: impl Into<String>) {
        let creation_id = creation_id.into();
        match self.entries.get(&creation_id) {
            Some(_) => {
                self.entries.insert(creation_id, CreationIdEntry::Duplicate);
            }
            None => {
                self.entries.insert(creation_id, CreationIdEntry::Id(id.into()));
            }
        }
    }

    /// Resolves `creation_id` to a concrete server-assigned id, if it
    /// uniquely identifies one.
    pub fn resolve(&self, creation_id: &str) -> Option<&str> {
        match self.entries.get(creation_id) {
            Some(CreationIdEntry::Id(id)) => Some(id.as_str()),
            Some(CreationIdEntry::Duplicate) | None => None,
        }
    }

    pub fn is_duplicate(&self, creation_id: &str) -> bool {
        matches!(self.entries.get(creation_id), Some(CreationIdEntry::Duplicate))
    }

    /// The ids to echo back on the `Response`'s own `createdIds`: every
    /// creation id that resolved to a single id (duplicates are omitted,
    /// matching the "MUST include all creation ids ... as well as any
    /// additional ones" wire contract read together with the duplicate
    /// policy, which has no resolvable id to report).
    pub fn resolved_entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().filter_map(|(k, v)| match v {
            CreationIdEntry::Id(id) => Some((k.as_str(), id.as_str())),
            CreationIdEntry::Duplicate => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_create_resolves() {
        let mut table = CreationIdTable::new();
        table.record("c1", "abc123");
        assert_eq!(table.resolve("c1"), Some("abc123"));
        assert!(!table.is_duplicate("c1"));
    }

    #[test]
    fn second_create_with_same_id_flips_to_duplicate() {
        let mut table = CreationIdTable::new();
        table.record("c1", "abc123");
        table.record("c1", "def456");
        assert_eq!(table.resolve("c1"), None);
        assert!(table.is_duplicate("c1"));
    }

    #[test]
    fn seeded_id_can_be_referenced_without_a_create_in_this_request() {
        let mut table = CreationIdTable::new();
        table.seed("c1", "abc123");
        assert_eq!(table.resolve("c1"), Some("abc123"));
    }
}
