//! Secondary index machinery shared by the store backends.
//!
//! An index is a map function run over every JSON document; each emitted key
//! becomes a row `(document key, emitted key)`. Rows are kept sorted by JSON
//! collation, then by document key.
//!
//! Each index keeps the snapshot built by its last fresh query. A stale
//! query answers from that snapshot and only builds one if none exists yet.

use super::Document;
use crate::types::StoreError;
use serde_json::{Number, Value};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// Emits zero or more index keys for one `(key, document)` pair.
pub type IndexMapFn = fn(&str, &Document) -> Vec<Document>;

/// A named index and its map function.
#[derive(Clone)]
pub struct IndexDefinition {
    pub name: String,
    pub map: IndexMapFn,
}

impl IndexDefinition {
    #[must_use]
    pub fn new(name: impl Into<String>, map: IndexMapFn) -> Self {
        Self {
            name: name.into(),
            map,
        }
    }
}

impl fmt::Debug for IndexDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexDefinition")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Which rows a query returns, by emitted key.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyRange {
    All,
    Exact(Document),
    /// Inclusive on both ends.
    Between { start: Document, end: Document },
}

impl KeyRange {
    #[must_use]
    pub fn contains(&self, key: &Document) -> bool {
        match self {
            Self::All => true,
            Self::Exact(wanted) => collate(key, wanted) == Ordering::Equal,
            Self::Between { start, end } => {
                collate(key, start) != Ordering::Less && collate(key, end) != Ordering::Greater
            }
        }
    }
}

/// Whether a query may answer from the last built snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Consistency {
    /// Rebuild before answering.
    #[default]
    Fresh,
    /// Answer from the last snapshot.
    Stale,
}

/// One query result.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexRow {
    /// Key of the document that emitted this row.
    pub id: String,
    /// The emitted key.
    pub key: Document,
}

/// Total order on JSON values: null < bool < number < string < array < object.
#[must_use]
pub fn collate(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => x
            .iter()
            .zip(y)
            .map(|(l, r)| collate(l, r))
            .find(|o| o.is_ne())
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        (Value::Object(x), Value::Object(y)) => x
            .iter()
            .zip(y)
            .map(|((lk, lv), (rk, rv))| lk.cmp(rk).then_with(|| collate(lv, rv)))
            .find(|o| o.is_ne())
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        _ => rank(a).cmp(&rank(b)),
    }
}

fn compare_numbers(x: &Number, y: &Number) -> Ordering {
    if let (Some(a), Some(b)) = (x.as_i64(), y.as_i64()) {
        return a.cmp(&b);
    }
    if let (Some(a), Some(b)) = (x.as_u64(), y.as_u64()) {
        return a.cmp(&b);
    }
    match (x.as_f64(), y.as_f64()) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        _ => Ordering::Equal,
    }
}

fn build_rows(map: IndexMapFn, documents: Vec<(String, Document)>) -> Vec<IndexRow> {
    let mut rows: Vec<IndexRow> = documents
        .iter()
        .flat_map(|(id, doc)| {
            map(id, doc).into_iter().map(|key| IndexRow {
                id: id.clone(),
                key,
            })
        })
        .collect();
    rows.sort_by(|a, b| collate(&a.key, &b.key).then_with(|| a.id.cmp(&b.id)));
    rows
}

/// Registered index definitions plus their last built snapshots.
#[derive(Debug, Default)]
pub struct IndexCatalog {
    definitions: BTreeMap<String, IndexDefinition>,
    snapshots: BTreeMap<String, Vec<IndexRow>>,
}

impl IndexCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a definition unless the name is taken.
    pub fn register(&mut self, definition: &IndexDefinition) -> bool {
        if self.definitions.contains_key(&definition.name) {
            return false;
        }
        self.definitions
            .insert(definition.name.clone(), definition.clone());
        true
    }

    /// Answer a query, calling `scan` for the full document set when the
    /// index has to be (re)built.
    pub fn query<F>(
        &mut self,
        name: &str,
        range: &KeyRange,
        consistency: Consistency,
        scan: F,
    ) -> Result<Vec<IndexRow>, StoreError>
    where
        F: FnOnce() -> Result<Vec<(String, Document)>, StoreError>,
    {
        let map = self
            .definitions
            .get(name)
            .map(|definition| definition.map)
            .ok_or_else(|| StoreError::IndexNotReady(name.to_string()))?;

        if consistency == Consistency::Fresh || !self.snapshots.contains_key(name) {
            let rows = build_rows(map, scan()?);
            self.snapshots.insert(name.to_string(), rows);
        }

        Ok(self
            .snapshots
            .get(name)
            .map(|rows| {
                rows.iter()
                    .filter(|row| range.contains(&row.key))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
