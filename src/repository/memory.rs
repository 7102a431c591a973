//! In-memory backend implementing the procedure contract. Used by `memory://` and by tests.
//! Tracks open connections and can fail the next call of a given procedure on demand.

use super::connection::{ConnectionProvider, ProcedureConnection};
use super::paging::{normalize_page, page_offset, Filter};
use super::procedure::{MatchMode, Param, Procedure, ProcedureCall, ProcedureOutput, TASK_GROUP_COLUMN};
use crate::entity::{ColumnMeta, ColumnSet, FieldKind, TableSchema};
use crate::error::DataError;
use crate::sql::SqlValue;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, MutexGuard};

type Row = Map<String, Value>;

#[derive(Default)]
struct MemoryInner {
    tables: Mutex<HashMap<String, Vec<Row>>>,
    open: AtomicUsize,
    opened_total: AtomicUsize,
    faults: Mutex<Vec<Procedure>>,
    mode: MatchMode,
}

#[derive(Clone, Default)]
pub struct MemoryProvider {
    inner: Arc<MemoryInner>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

impl MemoryProvider {
    pub fn new(mode: MatchMode) -> Self {
        MemoryProvider {
            inner: Arc::new(MemoryInner {
                mode,
                ..MemoryInner::default()
            }),
        }
    }

    /// Connections currently held by an operation.
    pub fn open_connections(&self) -> usize {
        self.inner.open.load(AtomicOrdering::SeqCst)
    }

    pub fn opened_total(&self) -> usize {
        self.inner.opened_total.load(AtomicOrdering::SeqCst)
    }

    /// The next call of `procedure` fails with a driver error.
    pub fn inject_fault(&self, procedure: Procedure) {
        lock(&self.inner.faults).push(procedure);
    }

    /// Raw rows of `table` in insertion order.
    pub fn rows(&self, table: &str) -> Vec<Value> {
        lock(&self.inner.tables)
            .get(table)
            .map(|rows| rows.iter().cloned().map(Value::Object).collect())
            .unwrap_or_default()
    }

    /// Appends rows as given, bypassing key generation. Non-object values are ignored.
    pub fn seed(&self, table: &str, rows: impl IntoIterator<Item = Value>) {
        let mut tables = lock(&self.inner.tables);
        let target = tables.entry(table.to_string()).or_default();
        for row in rows {
            if let Value::Object(map) = row {
                target.push(map);
            }
        }
    }
}

#[async_trait]
impl ConnectionProvider for MemoryProvider {
    type Connection = MemoryConnection;

    async fn open(&self) -> Result<MemoryConnection, DataError> {
        self.inner.open.fetch_add(1, AtomicOrdering::SeqCst);
        self.inner.opened_total.fetch_add(1, AtomicOrdering::SeqCst);
        Ok(MemoryConnection {
            inner: self.inner.clone(),
        })
    }
}

pub struct MemoryConnection {
    inner: Arc<MemoryInner>,
}

impl Drop for MemoryConnection {
    fn drop(&mut self) {
        self.inner.open.fetch_sub(1, AtomicOrdering::SeqCst);
    }
}

#[async_trait]
impl ProcedureConnection for MemoryConnection {
    async fn call(&mut self, call: &ProcedureCall) -> Result<ProcedureOutput, DataError> {
        self.take_fault(call.procedure)?;
        let schema = call.schema.as_ref();
        let key = schema.key()?;
        let mut tables = lock(&self.inner.tables);
        let rows = tables.entry(schema.table.clone()).or_default();
        tracing::debug!(procedure = call.procedure.name(), table = %schema.table, rows = rows.len(), "memory call");

        let out = match call.procedure {
            Procedure::GetAllData => ProcedureOutput::Rows(project(schema, sorted(key, rows.iter()))),
            Procedure::GetPagingData => {
                let (page_index, page_size) = normalize_page(call.int(Param::PageIndex)?, call.int(Param::PageSize)?);
                let filters = call.filters()?;
                let keywords = call.keywords().trim().to_lowercase();
                let mut hits = Vec::new();
                for row in rows.iter() {
                    if keyword_match(schema, row, &keywords) && filters_match(schema, row, &filters)? {
                        hits.push(row);
                    }
                }
                let total_row = hits.len() as i64;
                let page = sorted(key, hits.into_iter())
                    .into_iter()
                    .skip(usize::try_from(page_offset(page_index, page_size)).unwrap_or(usize::MAX))
                    .take(usize::try_from(page_size).unwrap_or(usize::MAX));
                ProcedureOutput::Page {
                    rows: project(schema, page),
                    total_row,
                }
            }
            Procedure::InsertData => {
                let row = build_insert(schema, key, rows, &call.column_set()?)?;
                rows.push(row);
                ProcedureOutput::Affected(1)
            }
            Procedure::UpdateData => {
                let n = apply_update(schema, rows, key, call.require(Param::Id)?, &call.column_set()?)?;
                ProcedureOutput::Affected(n)
            }
            Procedure::UpdateDataByKey => {
                let column = schema.column(call.text(Param::KeyUpdate)?)?;
                let n = apply_update(schema, rows, column, call.require(Param::ValueUpdate)?, &call.column_set()?)?;
                ProcedureOutput::Affected(n)
            }
            Procedure::GetDataById => {
                let ids = call.id_list()?;
                let hits = rows.iter().filter(|r| in_list(r, key, &ids));
                ProcedureOutput::Rows(project(schema, sorted(key, hits)))
            }
            Procedure::GetSingleData => {
                let hits = select(schema, rows, &call.column_set()?, MatchMode::All)?;
                ProcedureOutput::Rows(project(schema, sorted(key, hits.into_iter()).into_iter().take(1)))
            }
            Procedure::GetMultiData => {
                let hits = select(schema, rows, &call.column_set()?, self.inner.mode)?;
                ProcedureOutput::Rows(project(schema, sorted(key, hits.into_iter())))
            }
            Procedure::GetMultiDataAnd => {
                let hits = select(schema, rows, &call.column_set()?, MatchMode::All)?;
                ProcedureOutput::Rows(project(schema, sorted(key, hits.into_iter())))
            }
            Procedure::DeleteDataById => ProcedureOutput::Affected(remove_in(rows, key, &call.id_list()?)),
            Procedure::DeleteDataByTaskId => {
                let column = schema.column(TASK_GROUP_COLUMN)?;
                ProcedureOutput::Affected(remove_in(rows, column, &call.id_list()?))
            }
            Procedure::CheckValid => {
                let hits = select(schema, rows, &call.column_set()?, MatchMode::All)?;
                ProcedureOutput::Flag(!hits.is_empty())
            }
        };
        Ok(out)
    }
}

impl MemoryConnection {
    fn take_fault(&self, procedure: Procedure) -> Result<(), DataError> {
        let mut faults = lock(&self.inner.faults);
        if let Some(pos) = faults.iter().position(|p| *p == procedure) {
            faults.remove(pos);
            return Err(DataError::Db(sqlx::Error::Protocol(format!(
                "injected fault in {}",
                procedure.name()
            ))));
        }
        Ok(())
    }
}

fn cell<'a>(row: &'a Row, name: &str) -> &'a Value {
    row.get(name).unwrap_or(&Value::Null)
}

/// SQL equality: NULL never matches.
fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::String(s), Value::String(t)) => s == t,
        (Value::Number(n), Value::Number(m)) => match (n.as_i64(), m.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => n.as_f64() == m.as_f64(),
        },
        _ => a == b,
    }
}

fn compare(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(n), Value::Number(m)) => match (n.as_i64(), m.as_i64()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => n.as_f64().partial_cmp(&m.as_f64()).unwrap_or(Ordering::Equal),
        },
        (Value::String(s), Value::String(t)) => s.cmp(t),
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,
        _ => a.to_string().cmp(&b.to_string()),
    }
}

fn stored(column: &ColumnMeta, v: &SqlValue) -> Value {
    column.kind.coerce(v).to_json()
}

fn column_eq(row: &Row, column: &ColumnMeta, v: &SqlValue) -> bool {
    value_eq(cell(row, column.name), &stored(column, v))
}

fn in_list(row: &Row, column: &ColumnMeta, values: &[SqlValue]) -> bool {
    values.iter().any(|v| column_eq(row, column, v))
}

fn sorted<'a>(key: &ColumnMeta, rows: impl Iterator<Item = &'a Row>) -> Vec<&'a Row> {
    let mut out: Vec<&Row> = rows.collect();
    out.sort_by(|a, b| compare(cell(a, key.name), cell(b, key.name)));
    out
}

/// Rows restricted to the schema's columns, missing ones as null.
fn project<'a>(schema: &TableSchema, rows: impl IntoIterator<Item = &'a Row>) -> Vec<Value> {
    rows.into_iter()
        .map(|row| {
            let map: Row = schema
                .columns
                .iter()
                .map(|c| (c.name.to_string(), cell(row, c.name).clone()))
                .collect();
            Value::Object(map)
        })
        .collect()
}

fn select<'a>(
    schema: &TableSchema,
    rows: &'a [Row],
    conditions: &ColumnSet,
    mode: MatchMode,
) -> Result<Vec<&'a Row>, DataError> {
    let mut columns = Vec::with_capacity(conditions.len());
    for pair in conditions.iter() {
        columns.push((schema.column(&pair.key)?, &pair.value));
    }
    if columns.is_empty() {
        return Ok(match mode {
            MatchMode::All => rows.iter().collect(),
            MatchMode::Any => Vec::new(),
        });
    }
    Ok(rows
        .iter()
        .filter(|row| match mode {
            MatchMode::All => columns.iter().all(|(c, v)| column_eq(row, c, v)),
            MatchMode::Any => columns.iter().any(|(c, v)| column_eq(row, c, v)),
        })
        .collect())
}

fn keyword_match(schema: &TableSchema, row: &Row, keywords: &str) -> bool {
    if keywords.is_empty() {
        return true;
    }
    schema.text_columns().any(|c| {
        cell(row, c.name)
            .as_str()
            .map(|s| s.to_lowercase().contains(keywords))
            .unwrap_or(false)
    })
}

fn filters_match(schema: &TableSchema, row: &Row, filters: &[Filter]) -> Result<bool, DataError> {
    for f in filters {
        if !column_eq(row, schema.column(&f.column)?, &f.value) {
            return Ok(false);
        }
    }
    Ok(true)
}

fn build_insert(schema: &TableSchema, key: &ColumnMeta, rows: &[Row], columns: &ColumnSet) -> Result<Row, DataError> {
    let mut row: Row = schema
        .columns
        .iter()
        .map(|c| (c.name.to_string(), Value::Null))
        .collect();
    for pair in columns.iter() {
        let column = schema.column(&pair.key)?;
        row.insert(column.name.to_string(), stored(column, &pair.value));
    }
    let key_value = cell(&row, key.name).clone();
    if key_value.is_null() {
        if key.kind == FieldKind::Text {
            return Err(constraint(format!("null value in key column {} of {}", key.name, schema.table)));
        }
        let next = rows
            .iter()
            .filter_map(|r| cell(r, key.name).as_i64())
            .max()
            .unwrap_or(0)
            + 1;
        row.insert(key.name.to_string(), Value::Number(next.into()));
    } else if rows.iter().any(|r| value_eq(cell(r, key.name), &key_value)) {
        return Err(constraint(format!("duplicate key {}={} in {}", key.name, key_value, schema.table)));
    }
    Ok(row)
}

fn apply_update(
    schema: &TableSchema,
    rows: &mut [Row],
    column: &ColumnMeta,
    value: &SqlValue,
    columns: &ColumnSet,
) -> Result<u64, DataError> {
    let mut sets = Vec::with_capacity(columns.len());
    for pair in columns.iter() {
        let c = schema.column(&pair.key)?;
        sets.push((c.name, stored(c, &pair.value)));
    }
    if sets.is_empty() {
        return Ok(0);
    }
    let mut n = 0;
    for row in rows.iter_mut().filter(|r| column_eq(r, column, value)) {
        for (name, v) in &sets {
            row.insert(name.to_string(), v.clone());
        }
        n += 1;
    }
    Ok(n)
}

fn remove_in(rows: &mut Vec<Row>, column: &ColumnMeta, values: &[SqlValue]) -> u64 {
    let before = rows.len();
    rows.retain(|r| !in_list(r, column, values));
    (before - rows.len()) as u64
}

fn constraint(message: String) -> DataError {
    DataError::Db(sqlx::Error::Protocol(message))
}
