//! Column-set builders: insert, sparse update and null-preserving update policies.

use super::{Entity, FieldKind};
use crate::error::DataError;
use crate::sql::SqlValue;
use serde::{Deserialize, Serialize};

/// `(name, value)` pair; also used for lookup conditions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColumnPair {
    #[serde(rename = "Key", alias = "key")]
    pub key: String,
    #[serde(rename = "Value", alias = "value", default)]
    pub value: SqlValue,
}

impl ColumnPair {
    pub fn new(key: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        ColumnPair {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Ordered column list, serialized as `[{"Key": .., "Value": ..}, ...]`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnSet(pub Vec<ColumnPair>);

impl ColumnSet {
    pub fn to_json(&self) -> String {
        // Vec of plain pairs cannot fail to serialize.
        serde_json::to_string(&self.0).unwrap_or_else(|_| "[]".into())
    }

    pub fn from_json(s: &str) -> Result<Self, DataError> {
        serde_json::from_str(s).map_err(DataError::Decode)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnPair> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&SqlValue> {
        self.0.iter().find(|p| p.key == key).map(|p| &p.value)
    }
}

impl FromIterator<ColumnPair> for ColumnSet {
    fn from_iter<I: IntoIterator<Item = ColumnPair>>(iter: I) -> Self {
        ColumnSet(iter.into_iter().collect())
    }
}

/// Every field, starting at the key only when the key is text (caller-assigned).
/// Other key kinds are generated by the database and left out.
pub fn insert_columns<T: Entity>(entity: &T) -> ColumnSet {
    let start = match T::FIELDS.first() {
        Some(key) if key.kind == FieldKind::Text => 0,
        _ => 1,
    };
    T::FIELDS
        .iter()
        .skip(start)
        .map(|f| ColumnPair::new(f.name, (f.read)(entity)))
        .collect()
}

/// Non-key fields that are set and not an empty collection: a partial update.
pub fn update_columns<T: Entity>(entity: &T) -> ColumnSet {
    T::FIELDS
        .iter()
        .skip(1)
        .map(|f| (f.name, (f.read)(entity)))
        .filter(|(_, v)| !v.is_null() && !v.is_empty_list())
        .map(|(name, v)| ColumnPair::new(name, v))
        .collect()
}

/// Non-key fields that are set, empty collections included, so a list can be cleared.
pub fn update_columns_keep_empty<T: Entity>(entity: &T) -> ColumnSet {
    T::FIELDS
        .iter()
        .skip(1)
        .map(|f| (f.name, (f.read)(entity)))
        .filter(|(_, v)| !v.is_null())
        .map(|(name, v)| ColumnPair::new(name, v))
        .collect()
}
