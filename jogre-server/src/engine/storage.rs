//! Soft-delete / change-tracking storage protocol (§4.6) over rocksdb.
//!
//! Grounded on `store/rocksdb.rs`'s column-family-per-entity layout and
//! its `OptimisticTransactionDB`-shaped merge-operator counter; replaces
//! the out-of-scope "physical SQL dialect" with the crate's actual
//! storage engine. Column families: `{type}_by_id` (the record row,
//! JSON-encoded), `{type}_unique_{index}` (one per declared unique
//! constraint, storing only currently-active tuples so a destroyed row
//! frees its slot — the rocksdb-native equivalent of the relational
//! "isActive is the leading column, NULL != NULL" trick described in
//! §4.6), a shared `states` column family keyed by `accountId\x1ftype`,
//! and — for query-enabled types — a `{type}_query_log` column family
//! recording which ids a `queryChanges` call must consider, keyed by
//! `modSeqChanged\x1faccountId\x1fid` (§4.5).

use std::path::PathBuf;

use rocksdb::{OptimisticTransactionDB, Options};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::engine::record::RecordClass;

const STATES_CF: &str = "states";
const SEPARATOR: u8 = 0x1f;

#[derive(Debug)]
pub enum StorageError {
    Conflict,
    Backend(String),
    Encoding(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Conflict => write!(f, "write conflict"),
            StorageError::Backend(msg) => write!(f, "storage backend error: {msg}"),
            StorageError::Encoding(msg) => write!(f, "storage encoding error: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<rocksdb::Error> for StorageError {
    fn from(value: rocksdb::Error) -> Self {
        StorageError::Backend(value.to_string())
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    path: PathBuf,
}

fn by_id_cf(type_key: &str) -> String {
    format!("{type_key}_by_id")
}

fn unique_cf(type_key: &str, index: usize) -> String {
    format!("{type_key}_unique_{index}")
}

fn query_log_cf(type_key: &str) -> String {
    format!("{type_key}_query_log")
}

fn state_key(account_id: &str, type_name: &str) -> Vec<u8> {
    let mut key = account_id.as_bytes().to_vec();
    key.push(SEPARATOR);
    key.extend_from_slice(type_name.as_bytes());
    key
}

/// Joins a unique constraint's column values into one index key. Values
/// are taken as their JSON string form (case-sensitive; case-insensitive
/// properties are expected to have been lower-cased by the caller before
/// the tuple is built).
pub fn unique_tuple_key(values: &[&Value]) -> Vec<u8> {
    let mut key = Vec::new();
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            key.push(SEPARATOR);
        }
        key.extend_from_slice(value.to_string().as_bytes());
    }
    key
}

/// The rocksdb-backed store for record rows and account-state rows.
/// Opens one `_by_id` and one `_unique_*` column family per registered
/// record class up front (process-wide immutable layout, per §5).
pub struct RecordStore {
    db: OptimisticTransactionDB,
}

impl RecordStore {
    pub fn new(config: Config, record_classes: &[&dyn RecordClass]) -> Result<Self, StorageError> {
        let mut cf_names = vec![STATES_CF.to_string()];
        for record_class in record_classes {
            cf_names.push(by_id_cf(record_class.type_key()));
            for index in 0..record_class.unique_constraints().len() {
                cf_names.push(unique_cf(record_class.type_key(), index));
            }
            if record_class.query_enabled() {
                cf_names.push(query_log_cf(record_class.type_key()));
            }
        }

        let mut options = Options::default();
        options.create_if_missing(true);
        options.create_missing_column_families(true);

        let db = OptimisticTransactionDB::open_cf(&options, config.path, cf_names)?;
        Ok(Self { db })
    }

    /// Runs `work` inside one rocksdb transaction, committing if it
    /// returns `Ok` and rolling back otherwise. This is the storage half
    /// of `context.txn_do` (§4.4, §5): one connection/transaction for
    /// the lifetime of the call.
    pub fn with_transaction<T>(
        &self,
        work: impl FnOnce(&mut StoreTransaction<'_>) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        let txn = self.db.transaction();
        let mut store_txn = StoreTransaction { db: &self.db, txn };

        match work(&mut store_txn) {
            Ok(value) => {
                store_txn.txn.commit()?;
                Ok(value)
            }
            Err(err) => {
                store_txn.txn.rollback()?;
                Err(err)
            }
        }
    }
}

/// One open rocksdb transaction, scoped to a single top-level call.
/// Nested `/set` phases use `save_point`/`rollback_to_save_point`
/// (§4.4's localised pending-state map has its rocksdb-level
/// counterpart here).
pub struct StoreTransaction<'db> {
    db: &'db OptimisticTransactionDB,
    txn: rocksdb::Transaction<'db, OptimisticTransactionDB>,
}

impl<'db> StoreTransaction<'db> {
    pub fn get_record(
        &self,
        type_key: &str,
        id: &str,
    ) -> Result<Option<Map<String, Value>>, StorageError> {
        let cf = self
            .db
            .cf_handle(&by_id_cf(type_key))
            .ok_or_else(|| StorageError::Backend(format!("unknown type {type_key}")))?;

        let Some(bytes) = self.txn.get_cf(cf, id.as_bytes())? else {
            return Ok(None);
        };

        let value: Value = serde_json::from_slice(&bytes)
            .map_err(|err| StorageError::Encoding(err.to_string()))?;
        match value {
            Value::Object(map) => Ok(Some(map)),
            _ => Err(StorageError::Encoding("record row was not a JSON object".into())),
        }
    }

    pub fn put_record(
        &self,
        type_key: &str,
        id: &str,
        row: &Map<String, Value>,
    ) -> Result<(), StorageError> {
        let cf = self
            .db
            .cf_handle(&by_id_cf(type_key))
            .ok_or_else(|| StorageError::Backend(format!("unknown type {type_key}")))?;

        let bytes =
            serde_json::to_vec(row).map_err(|err| StorageError::Encoding(err.to_string()))?;
        self.txn.put_cf(cf, id.as_bytes(), bytes)?;
        Ok(())
    }

    /// All active and destroyed rows of `type_key` for `account_id`.
    /// Used by `/changes` and `/query`, both of which need a full
    /// in-memory scan to evaluate declared filters.
    pub fn scan_records(
        &self,
        type_key: &str,
        account_id: &str,
    ) -> Result<Vec<Map<String, Value>>, StorageError> {
        let cf = self
            .db
            .cf_handle(&by_id_cf(type_key))
            .ok_or_else(|| StorageError::Backend(format!("unknown type {type_key}")))?;

        let mut rows = Vec::new();
        let iter = self.txn.iterator_cf(cf, rocksdb::IteratorMode::Start);
        for item in iter {
            let (_, bytes) = item?;
            let value: Value = serde_json::from_slice(&bytes)
                .map_err(|err| StorageError::Encoding(err.to_string()))?;
            let Value::Object(map) = value else {
                return Err(StorageError::Encoding("record row was not a JSON object".into()));
            };
            if map.get("accountId").and_then(Value::as_str) == Some(account_id) {
                rows.push(map);
            }
        }
        Ok(rows)
    }

    /// Claims a unique-constraint slot for a newly created active row.
    /// Returns `Ok(false)` without writing if the tuple is already
    /// claimed by another active row.
    pub fn reserve_unique(
        &self,
        type_key: &str,
        constraint_index: usize,
        tuple_key: &[u8],
        id: &str,
    ) -> Result<bool, StorageError> {
        let cf = self
            .db
            .cf_handle(&unique_cf(type_key, constraint_index))
            .ok_or_else(|| StorageError::Backend(format!("unknown unique index {constraint_index} on {type_key}")))?;

        if self.txn.get_for_update_cf(cf, tuple_key, true)?.is_some() {
            return Ok(false);
        }

        self.txn.put_cf(cf, tuple_key, id.as_bytes())?;
        Ok(true)
    }

    /// Frees a unique-constraint slot when a row is destroyed, letting a
    /// future create reuse the same tuple (§4.6, invariant 6).
    pub fn release_unique(
        &self,
        type_key: &str,
        constraint_index: usize,
        tuple_key: &[u8],
    ) -> Result<(), StorageError> {
        let cf = self
            .db
            .cf_handle(&unique_cf(type_key, constraint_index))
            .ok_or_else(|| StorageError::Backend(format!("unknown unique index {constraint_index} on {type_key}")))?;
        self.txn.delete_cf(cf, tuple_key)?;
        Ok(())
    }

    /// Records that `id` changed at `modseq` in a way that could affect a
    /// `queryChanges` result (§4.5). Called on every create/destroy and
    /// on updates the record class's declared `differ` predicates flag
    /// as filter-relevant.
    pub fn log_query_change(
        &self,
        type_key: &str,
        modseq: u64,
        account_id: &str,
        id: &str,
    ) -> Result<(), StorageError> {
        let cf = self
            .db
            .cf_handle(&query_log_cf(type_key))
            .ok_or_else(|| StorageError::Backend(format!("unknown type {type_key}")))?;

        let mut key = modseq.to_be_bytes().to_vec();
        key.push(SEPARATOR);
        key.extend_from_slice(account_id.as_bytes());
        key.push(SEPARATOR);
        key.extend_from_slice(id.as_bytes());

        self.txn.put_cf(cf, key, [])?;
        Ok(())
    }

    /// Every id logged for `account_id` at a modseq greater than `since`,
    /// in no particular order (the caller re-evaluates current row state
    /// to decide added/removed).
    pub fn scan_query_log(
        &self,
        type_key: &str,
        account_id: &str,
        since: u64,
    ) -> Result<Vec<String>, StorageError> {
        let cf = self
            .db
            .cf_handle(&query_log_cf(type_key))
            .ok_or_else(|| StorageError::Backend(format!("unknown type {type_key}")))?;

        let mut ids = Vec::new();
        let iter = self.txn.iterator_cf(cf, rocksdb::IteratorMode::Start);
        for item in iter {
            let (key, _) = item?;
            if key.len() < 9 {
                continue;
            }
            let modseq = u64::from_be_bytes(key[..8].try_into().unwrap());
            if modseq <= since {
                continue;
            }
            let rest = &key[9..];
            let Some(sep) = rest.iter().position(|&b| b == SEPARATOR) else {
                continue;
            };
            if &rest[..sep] != account_id.as_bytes() {
                continue;
            }
            if let Ok(id) = std::str::from_utf8(&rest[sep + 1..]) {
                ids.push(id.to_string());
            }
        }
        Ok(ids)
    }

    pub fn load_state(&self, account_id: &str, type_name: &str) -> Result<(u64, u64), StorageError> {
        let cf = self
            .db
            .cf_handle(STATES_CF)
            .ok_or_else(|| StorageError::Backend("missing states column family".into()))?;

        let Some(bytes) = self.txn.get_cf(cf, state_key(account_id, type_name))? else {
            return Ok((0, 0));
        };

        if bytes.len() != 16 {
            return Err(StorageError::Encoding("malformed state row".into()));
        }
        let lowest = u64::from_be_bytes(bytes[..8].try_into().unwrap());
        let highest = u64::from_be_bytes(bytes[8..].try_into().unwrap());
        Ok((lowest, highest))
    }

    /// Writes `highestModSeq := new_highest` for `(account_id, type_name)`,
    /// preserving `lowestModSeq` (0 if the row is new). A conflicting
    /// concurrent writer surfaces as a rocksdb write-conflict at
    /// `commit()`, which the dispatcher maps to `tryAgain` (§4.4).
    pub fn bump_state(
        &self,
        account_id: &str,
        type_name: &str,
        new_highest: u64,
    ) -> Result<(), StorageError> {
        let cf = self
            .db
            .cf_handle(STATES_CF)
            .ok_or_else(|| StorageError::Backend("missing states column family".into()))?;

        let key = state_key(account_id, type_name);
        let lowest = self.load_state(account_id, type_name)?.0;

        let mut bytes = Vec::with_capacity(16);
        bytes.extend_from_slice(&lowest.to_be_bytes());
        bytes.extend_from_slice(&new_highest.to_be_bytes());

        self.txn.put_cf(cf, key, bytes)?;
        Ok(())
    }

    pub fn save_point(&mut self) {
        self.txn.set_savepoint();
    }

    pub fn rollback_to_save_point(&mut self) -> Result<(), StorageError> {
        self.txn.rollback_to_savepoint()?;
        Ok(())
    }
}
