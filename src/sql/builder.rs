//! Renders procedure operations as parameterized PostgreSQL statements.
//! Identifiers come only from the entity schema; values are always bound.

use crate::entity::{ColumnMeta, ColumnSet, TableSchema};
use crate::error::DataError;
use crate::repository::{Filter, MatchMode};
use crate::sql::SqlValue;

/// Quote identifier for PostgreSQL.
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

fn select_column_list(schema: &TableSchema) -> String {
    schema
        .columns
        .iter()
        .map(|c| quoted(c.name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Escapes LIKE wildcards so keywords match literally.
fn like_pattern(keywords: &str) -> String {
    let escaped = keywords
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[derive(Debug, Default)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf::default()
    }

    fn push_param(&mut self, v: SqlValue) -> u32 {
        let n = self.params.len() as u32 + 1;
        self.params.push(v);
        n
    }

    /// `$n::type` for a value destined for `column`.
    fn placeholder(&mut self, column: &ColumnMeta, v: SqlValue) -> String {
        let n = self.push_param(v);
        format!("${}::{}", n, column.kind.pg_cast())
    }

    fn equals(&mut self, column: &ColumnMeta, v: SqlValue) -> String {
        let ph = self.placeholder(column, v);
        format!("{} = {}", quoted(column.name), ph)
    }
}

/// Bound replacement for the old `AND col = N'value'` fragments: one ` AND "col" = $n::type` per filter.
pub fn filter_predicate(schema: &TableSchema, filters: &[Filter], q: &mut QueryBuf) -> Result<String, DataError> {
    let mut out = String::new();
    for f in filters {
        let col = schema.column(&f.column)?;
        out.push_str(" AND ");
        out.push_str(&q.equals(col, f.value.clone()));
    }
    Ok(out)
}

/// ` AND (text columns ILIKE %kw%)`, empty when there are no keywords or no text columns.
fn keyword_predicate(schema: &TableSchema, keywords: &str, q: &mut QueryBuf) -> String {
    let keywords = keywords.trim();
    let cols: Vec<&ColumnMeta> = schema.text_columns().collect();
    if keywords.is_empty() || cols.is_empty() {
        return String::new();
    }
    let n = q.push_param(SqlValue::Text(like_pattern(keywords)));
    let ors = cols
        .iter()
        .map(|c| format!("{} ILIKE ${}::text", quoted(c.name), n))
        .collect::<Vec<_>>()
        .join(" OR ");
    format!(" AND ({})", ors)
}

fn condition_clause(
    schema: &TableSchema,
    conditions: &ColumnSet,
    mode: MatchMode,
    q: &mut QueryBuf,
) -> Result<String, DataError> {
    if conditions.is_empty() {
        return Ok(match mode {
            MatchMode::All => String::new(),
            MatchMode::Any => " WHERE FALSE".into(),
        });
    }
    let mut parts = Vec::with_capacity(conditions.len());
    for pair in conditions.iter() {
        let col = schema.column(&pair.key)?;
        parts.push(q.equals(col, pair.value.clone()));
    }
    let joiner = match mode {
        MatchMode::All => " AND ",
        MatchMode::Any => " OR ",
    };
    Ok(format!(" WHERE {}", parts.join(joiner)))
}

pub fn select_all(schema: &TableSchema) -> Result<QueryBuf, DataError> {
    let mut q = QueryBuf::new();
    let key = schema.key()?;
    q.sql = format!(
        "SELECT {} FROM {} ORDER BY {}",
        select_column_list(schema),
        quoted(&schema.table),
        quoted(key.name)
    );
    Ok(q)
}

fn page_where(schema: &TableSchema, keywords: &str, filters: &[Filter], q: &mut QueryBuf) -> Result<String, DataError> {
    let kw = keyword_predicate(schema, keywords, q);
    let f = filter_predicate(schema, filters, q)?;
    Ok(format!(" WHERE TRUE{}{}", kw, f))
}

/// COUNT(*) over the whole matching set of a paging query.
pub fn count_page(schema: &TableSchema, keywords: &str, filters: &[Filter]) -> Result<QueryBuf, DataError> {
    let mut q = QueryBuf::new();
    let where_clause = page_where(schema, keywords, filters, &mut q)?;
    q.sql = format!("SELECT COUNT(*) FROM {}{}", quoted(&schema.table), where_clause);
    Ok(q)
}

pub fn select_page(
    schema: &TableSchema,
    keywords: &str,
    filters: &[Filter],
    limit: i64,
    offset: i64,
) -> Result<QueryBuf, DataError> {
    let mut q = QueryBuf::new();
    let key = schema.key()?;
    let where_clause = page_where(schema, keywords, filters, &mut q)?;
    q.sql = format!(
        "SELECT {} FROM {}{} ORDER BY {} LIMIT {} OFFSET {}",
        select_column_list(schema),
        quoted(&schema.table),
        where_clause,
        quoted(key.name),
        limit.max(0),
        offset.max(0)
    );
    Ok(q)
}

/// INSERT of exactly the given columns.
pub fn insert(schema: &TableSchema, columns: &ColumnSet) -> Result<QueryBuf, DataError> {
    let mut q = QueryBuf::new();
    let table = quoted(&schema.table);
    if columns.is_empty() {
        q.sql = format!("INSERT INTO {} DEFAULT VALUES", table);
        return Ok(q);
    }
    let mut cols = Vec::with_capacity(columns.len());
    let mut placeholders = Vec::with_capacity(columns.len());
    for pair in columns.iter() {
        let col = schema.column(&pair.key)?;
        cols.push(quoted(col.name));
        placeholders.push(q.placeholder(col, pair.value.clone()));
    }
    q.sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        cols.join(", "),
        placeholders.join(", ")
    );
    Ok(q)
}

/// UPDATE ... SET given columns WHERE `key_column` = value. `None` when there is nothing to set.
pub fn update(
    schema: &TableSchema,
    key_column: &str,
    key_value: &SqlValue,
    columns: &ColumnSet,
) -> Result<Option<QueryBuf>, DataError> {
    let key = schema.column(key_column)?;
    if columns.is_empty() {
        return Ok(None);
    }
    let mut q = QueryBuf::new();
    let mut sets = Vec::with_capacity(columns.len());
    for pair in columns.iter() {
        let col = schema.column(&pair.key)?;
        sets.push(q.equals(col, pair.value.clone()));
    }
    let cond = q.equals(key, key_value.clone());
    q.sql = format!(
        "UPDATE {} SET {} WHERE {}",
        quoted(&schema.table),
        sets.join(", "),
        cond
    );
    Ok(Some(q))
}

fn in_list(column: &ColumnMeta, values: &[SqlValue], q: &mut QueryBuf) -> String {
    let placeholders: Vec<String> = values
        .iter()
        .map(|v| q.placeholder(column, v.clone()))
        .collect();
    format!("{} IN ({})", quoted(column.name), placeholders.join(", "))
}

/// SELECT rows whose `column` is one of `values`, ordered by key.
pub fn select_in(schema: &TableSchema, column: &str, values: &[SqlValue]) -> Result<QueryBuf, DataError> {
    let mut q = QueryBuf::new();
    let col = schema.column(column)?;
    let key = schema.key()?;
    let cols = select_column_list(schema);
    let table = quoted(&schema.table);
    if values.is_empty() {
        q.sql = format!("SELECT {} FROM {} WHERE 1 = 0", cols, table);
        return Ok(q);
    }
    let cond = in_list(col, values, &mut q);
    q.sql = format!("SELECT {} FROM {} WHERE {} ORDER BY {}", cols, table, cond, quoted(key.name));
    Ok(q)
}

/// DELETE rows whose `column` is one of `values`. `None` for an empty list.
pub fn delete_in(schema: &TableSchema, column: &str, values: &[SqlValue]) -> Result<Option<QueryBuf>, DataError> {
    let col = schema.column(column)?;
    if values.is_empty() {
        return Ok(None);
    }
    let mut q = QueryBuf::new();
    let cond = in_list(col, values, &mut q);
    q.sql = format!("DELETE FROM {} WHERE {}", quoted(&schema.table), cond);
    Ok(Some(q))
}

pub fn select_where(
    schema: &TableSchema,
    conditions: &ColumnSet,
    mode: MatchMode,
    limit: Option<u32>,
) -> Result<QueryBuf, DataError> {
    let mut q = QueryBuf::new();
    let key = schema.key()?;
    let where_clause = condition_clause(schema, conditions, mode, &mut q)?;
    let limit_clause = limit.map(|n| format!(" LIMIT {}", n)).unwrap_or_default();
    q.sql = format!(
        "SELECT {} FROM {}{} ORDER BY {}{}",
        select_column_list(schema),
        quoted(&schema.table),
        where_clause,
        quoted(key.name),
        limit_clause
    );
    Ok(q)
}

pub fn exists(schema: &TableSchema, conditions: &ColumnSet) -> Result<QueryBuf, DataError> {
    let mut q = QueryBuf::new();
    let where_clause = condition_clause(schema, conditions, MatchMode::All, &mut q)?;
    q.sql = format!("SELECT EXISTS(SELECT 1 FROM {}{})", quoted(&schema.table), where_clause);
    Ok(q)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{ColumnPair, FieldKind};

    fn schema() -> TableSchema {
        TableSchema {
            table: "task".into(),
            columns: vec![
                ColumnMeta { name: "task_id", kind: FieldKind::Integer },
                ColumnMeta { name: "Status", kind: FieldKind::Text },
                ColumnMeta { name: "task_name", kind: FieldKind::Text },
                ColumnMeta { name: "deleted", kind: FieldKind::Boolean },
            ],
        }
    }

    #[test]
    fn filter_values_are_bound_not_spliced() {
        let mut q = QueryBuf::new();
        let frag = filter_predicate(&schema(), &[Filter::new("Status", "Open")], &mut q).unwrap();
        assert_eq!(frag, r#" AND "Status" = $1::text"#);
        assert_eq!(q.params, vec![SqlValue::Text("Open".into())]);

        let mut q = QueryBuf::new();
        let hostile = Filter::new("Status", "x'; DROP TABLE task; --");
        let frag = filter_predicate(&schema(), &[hostile], &mut q).unwrap();
        assert!(!frag.contains("DROP"));
    }

    #[test]
    fn unknown_filter_column_is_rejected() {
        let mut q = QueryBuf::new();
        let err = filter_predicate(&schema(), &[Filter::new("1=1 OR Status", "x")], &mut q).unwrap_err();
        assert!(matches!(err, DataError::UnknownColumn { .. }));
    }

    #[test]
    fn page_query_with_keywords_and_filter() {
        let q = select_page(&schema(), "50%", &[Filter::new("Status", "Open")], 10, 10).unwrap();
        assert_eq!(
            q.sql,
            r#"SELECT "task_id", "Status", "task_name", "deleted" FROM "task" WHERE TRUE AND ("Status" ILIKE $1::text OR "task_name" ILIKE $1::text) AND "Status" = $2::text ORDER BY "task_id" LIMIT 10 OFFSET 10"#
        );
        assert_eq!(q.params[0], SqlValue::Text("%50\\%%".into()));

        let count = count_page(&schema(), "", &[]).unwrap();
        assert_eq!(count.sql, r#"SELECT COUNT(*) FROM "task" WHERE TRUE"#);
    }

    #[test]
    fn insert_and_update_cast_per_column() {
        let cols = ColumnSet(vec![ColumnPair::new("task_name", "a"), ColumnPair::new("deleted", false)]);
        let q = insert(&schema(), &cols).unwrap();
        assert_eq!(q.sql, r#"INSERT INTO "task" ("task_name", "deleted") VALUES ($1::text, $2::bool)"#);

        let q = update(&schema(), "task_id", &SqlValue::Int(3), &cols).unwrap().unwrap();
        assert_eq!(
            q.sql,
            r#"UPDATE "task" SET "task_name" = $1::text, "deleted" = $2::bool WHERE "task_id" = $3::int8"#
        );
        assert_eq!(q.params.len(), 3);
        assert!(update(&schema(), "task_id", &SqlValue::Int(3), &ColumnSet::default()).unwrap().is_none());
    }

    #[test]
    fn id_lists_and_conditions() {
        let ids = [SqlValue::Int(1), SqlValue::Int(2)];
        let q = delete_in(&schema(), "task_id", &ids).unwrap().unwrap();
        assert_eq!(q.sql, r#"DELETE FROM "task" WHERE "task_id" IN ($1::int8, $2::int8)"#);
        assert!(delete_in(&schema(), "task_id", &[]).unwrap().is_none());
        assert!(select_in(&schema(), "task_id", &[]).unwrap().sql.ends_with("WHERE 1 = 0"));

        let conds = ColumnSet(vec![ColumnPair::new("Status", "Open"), ColumnPair::new("deleted", false)]);
        let any = select_where(&schema(), &conds, MatchMode::Any, None).unwrap();
        assert!(any.sql.contains(r#"WHERE "Status" = $1::text OR "deleted" = $2::bool"#));
        let all = select_where(&schema(), &conds, MatchMode::All, Some(1)).unwrap();
        assert!(all.sql.ends_with(r#"WHERE "Status" = $1::text AND "deleted" = $2::bool ORDER BY "task_id" LIMIT 1"#));

        let q = exists(&schema(), &ColumnSet(vec![ColumnPair::new("task_name", "a")])).unwrap();
        assert_eq!(q.sql, r#"SELECT EXISTS(SELECT 1 FROM "task" WHERE "task_name" = $1::text)"#);
    }
}
