//! Tagged column values and their PostgreSQL binding.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::encode::{Encode, IsNull};
use sqlx::postgres::{PgTypeInfo, Postgres};
use sqlx::Database;

/// A value carried in a column list, condition, id list or filter.
///
/// Serialized untagged so a `ColumnSet` round-trips through `[{"Key": .., "Value": ..}]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum SqlValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<SqlValue>),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Empty collection, either as a list or as an already serialized `[]`.
    pub fn is_empty_list(&self) -> bool {
        match self {
            SqlValue::List(items) => items.is_empty(),
            SqlValue::Text(s) => s.trim() == "[]",
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Int(n) => Some(*n),
            SqlValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn from_json(v: &Value) -> Self {
        match v {
            Value::Null => SqlValue::Null,
            Value::Bool(b) => SqlValue::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    SqlValue::Int(i)
                } else {
                    n.as_f64().map(SqlValue::Float).unwrap_or(SqlValue::Null)
                }
            }
            Value::String(s) => SqlValue::Text(s.clone()),
            Value::Array(items) => SqlValue::List(items.iter().map(SqlValue::from_json).collect()),
            // No object variant; nested objects travel as their JSON text.
            Value::Object(_) => SqlValue::Text(v.to_string()),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            SqlValue::Null => Value::Null,
            SqlValue::Bool(b) => Value::Bool(*b),
            SqlValue::Int(n) => Value::Number((*n).into()),
            SqlValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            SqlValue::Text(s) => Value::String(s.clone()),
            SqlValue::List(items) => Value::Array(items.iter().map(SqlValue::to_json).collect()),
        }
    }

    /// Text form sent to PostgreSQL; the statement casts it to the column type.
    pub fn to_text(&self) -> Option<String> {
        match self {
            SqlValue::Null => None,
            SqlValue::Bool(b) => Some(b.to_string()),
            SqlValue::Int(n) => Some(n.to_string()),
            SqlValue::Float(f) => Some(f.to_string()),
            SqlValue::Text(s) => Some(s.clone()),
            SqlValue::List(_) => Some(self.to_json().to_string()),
        }
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Int(v.into())
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Float(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

impl<T: Into<SqlValue>> From<Vec<T>> for SqlValue {
    fn from(v: Vec<T>) -> Self {
        SqlValue::List(v.into_iter().map(Into::into).collect())
    }
}

impl<'q> Encode<'q, Postgres> for SqlValue {
    fn encode_by_ref(
        &self,
        buf: &mut <Postgres as Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, Box<dyn std::error::Error + Send + Sync>> {
        match self.to_text() {
            None => Ok(IsNull::Yes),
            Some(s) => <&str as Encode<Postgres>>::encode_by_ref(&s.as_str(), buf),
        }
    }
}

impl sqlx::Type<Postgres> for SqlValue {
    fn type_info() -> PgTypeInfo {
        <str as sqlx::Type<Postgres>>::type_info()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn untagged_json_keeps_int_and_float_apart() {
        let v: Vec<SqlValue> = serde_json::from_value(json!([1, 1.5, "x", null, true, [2]])).unwrap();
        assert_eq!(
            v,
            vec![
                SqlValue::Int(1),
                SqlValue::Float(1.5),
                SqlValue::Text("x".into()),
                SqlValue::Null,
                SqlValue::Bool(true),
                SqlValue::List(vec![SqlValue::Int(2)]),
            ]
        );
    }

    #[test]
    fn empty_list_sentinel() {
        assert!(SqlValue::List(vec![]).is_empty_list());
        assert!(SqlValue::Text("[]".into()).is_empty_list());
        assert!(!SqlValue::Text("[1]".into()).is_empty_list());
        assert!(!SqlValue::Null.is_empty_list());
    }

    #[test]
    fn text_form_for_binding() {
        assert_eq!(SqlValue::Null.to_text(), None);
        assert_eq!(SqlValue::Int(7).to_text().as_deref(), Some("7"));
        assert_eq!(SqlValue::Bool(false).to_text().as_deref(), Some("false"));
        assert_eq!(
            SqlValue::from(vec!["a", "b"]).to_text().as_deref(),
            Some(r#"["a","b"]"#)
        );
    }

    #[test]
    fn option_and_text_ids() {
        assert_eq!(SqlValue::from(None::<i64>), SqlValue::Null);
        assert_eq!(SqlValue::Text(" 42 ".into()).as_i64(), Some(42));
    }

    #[test]
    fn binds_as_builtin_text() {
        assert_eq!(
            <SqlValue as sqlx::Type<Postgres>>::type_info(),
            <String as sqlx::Type<Postgres>>::type_info()
        );
    }
}
