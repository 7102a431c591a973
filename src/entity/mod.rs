//! Entity metadata: ordered field descriptors declared at compile time.

mod columns;

pub use columns::*;

use crate::error::DataError;
use crate::sql::SqlValue;
use serde::de::DeserializeOwned;

/// Storage kind of a field. Decides insert-key inclusion, SQL casts and value coercion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    Float,
    Boolean,
    /// Lists stored as a JSON document.
    Json,
}

impl FieldKind {
    /// PostgreSQL type a bound text parameter is cast to.
    pub fn pg_cast(self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Integer => "int8",
            FieldKind::Float => "float8",
            FieldKind::Boolean => "bool",
            FieldKind::Json => "jsonb",
        }
    }

    /// Best-effort conversion of a loosely typed value (e.g. from a query string) to this kind.
    pub fn coerce(self, v: &SqlValue) -> SqlValue {
        match (self, v) {
            (_, SqlValue::Null) => SqlValue::Null,
            (FieldKind::Integer, SqlValue::Text(s)) => s
                .trim()
                .parse::<i64>()
                .map(SqlValue::Int)
                .unwrap_or_else(|_| v.clone()),
            (FieldKind::Integer, SqlValue::Float(f)) if f.fract() == 0.0 => SqlValue::Int(*f as i64),
            (FieldKind::Float, SqlValue::Int(n)) => SqlValue::Float(*n as f64),
            (FieldKind::Float, SqlValue::Text(s)) => s
                .trim()
                .parse::<f64>()
                .map(SqlValue::Float)
                .unwrap_or_else(|_| v.clone()),
            (FieldKind::Boolean, SqlValue::Text(s)) if s.eq_ignore_ascii_case("true") => SqlValue::Bool(true),
            (FieldKind::Boolean, SqlValue::Text(s)) if s.eq_ignore_ascii_case("false") => SqlValue::Bool(false),
            (FieldKind::Text, SqlValue::Int(n)) => SqlValue::Text(n.to_string()),
            (FieldKind::Text, SqlValue::Bool(b)) => SqlValue::Text(b.to_string()),
            (FieldKind::Json, SqlValue::Text(s)) => serde_json::from_str::<serde_json::Value>(s)
                .map(|j| SqlValue::from_json(&j))
                .unwrap_or_else(|_| v.clone()),
            _ => v.clone(),
        }
    }
}

/// One declared field: column name, kind and accessor.
pub struct Field<T> {
    pub name: &'static str,
    pub kind: FieldKind,
    pub read: fn(&T) -> SqlValue,
}

/// A record type stored in one table. The first field is the primary key.
///
/// ```ignore
/// impl Entity for Status {
///     const TABLE: &'static str = "status";
///     const FIELDS: &'static [Field<Self>] = &[
///         Field { name: "status_id", kind: FieldKind::Text, read: |s| s.status_id.as_str().into() },
///         Field { name: "status_name", kind: FieldKind::Text, read: |s| s.status_name.as_str().into() },
///     ];
/// }
/// ```
pub trait Entity: DeserializeOwned + Send + Sync + 'static {
    const TABLE: &'static str;
    const FIELDS: &'static [Field<Self>];
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnMeta {
    pub name: &'static str,
    pub kind: FieldKind,
}

/// Runtime view of an entity's table: name plus ordered columns. Identifiers used in SQL come only from here.
#[derive(Clone, Debug)]
pub struct TableSchema {
    pub table: String,
    pub columns: Vec<ColumnMeta>,
}

impl TableSchema {
    pub fn with_table<T: Entity>(table: &str) -> Self {
        TableSchema {
            table: table.to_string(),
            columns: T::FIELDS
                .iter()
                .map(|f| ColumnMeta {
                    name: f.name,
                    kind: f.kind,
                })
                .collect(),
        }
    }

    pub fn key(&self) -> Result<&ColumnMeta, DataError> {
        self.columns
            .first()
            .ok_or_else(|| DataError::MissingKey(self.table.clone()))
    }

    pub fn column(&self, name: &str) -> Result<&ColumnMeta, DataError> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| DataError::UnknownColumn {
                table: self.table.clone(),
                column: name.to_string(),
            })
    }

    pub fn text_columns(&self) -> impl Iterator<Item = &ColumnMeta> {
        self.columns.iter().filter(|c| c.kind == FieldKind::Text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerce_query_strings_to_column_kind() {
        assert_eq!(FieldKind::Integer.coerce(&"12".into()), SqlValue::Int(12));
        assert_eq!(FieldKind::Integer.coerce(&"abc".into()), SqlValue::Text("abc".into()));
        assert_eq!(FieldKind::Boolean.coerce(&"TRUE".into()), SqlValue::Bool(true));
        assert_eq!(FieldKind::Text.coerce(&SqlValue::Int(3)), SqlValue::Text("3".into()));
        assert_eq!(
            FieldKind::Json.coerce(&r#"["a"]"#.into()),
            SqlValue::List(vec!["a".into()])
        );
        assert_eq!(FieldKind::Float.coerce(&SqlValue::Null), SqlValue::Null);
    }
}
