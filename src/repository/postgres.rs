//! PostgreSQL backend: renders each procedure through the safe SQL builder and runs it on a pooled connection.

use super::connection::{ConnectionProvider, ProcedureConnection};
use super::paging::{normalize_page, page_offset};
use super::procedure::{MatchMode, Param, Procedure, ProcedureCall, ProcedureOutput, TASK_GROUP_COLUMN};
use crate::entity::{FieldKind, TableSchema};
use crate::error::DataError;
use crate::sql::{builder, QueryBuf};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres};

#[derive(Clone)]
pub struct PgProvider {
    pool: PgPool,
    mode: MatchMode,
}

impl PgProvider {
    pub fn new(pool: PgPool, mode: MatchMode) -> Self {
        PgProvider { pool, mode }
    }

    /// Pool that connects on first use, so construction never touches the network.
    pub fn connect_lazy(database_url: &str, max_connections: u32, mode: MatchMode) -> Result<Self, DataError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_lazy(database_url)?;
        Ok(Self::new(pool, mode))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ConnectionProvider for PgProvider {
    type Connection = PgProcedureConnection;

    async fn open(&self) -> Result<PgProcedureConnection, DataError> {
        let conn = self.pool.acquire().await?;
        Ok(PgProcedureConnection { conn, mode: self.mode })
    }
}

/// Returned to the pool when dropped.
pub struct PgProcedureConnection {
    conn: PoolConnection<Postgres>,
    mode: MatchMode,
}

impl PgProcedureConnection {
    async fn fetch_rows(&mut self, schema: &TableSchema, q: QueryBuf) -> Result<Vec<Value>, DataError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in q.params {
            query = query.bind(p);
        }
        let rows = query.fetch_all(&mut *self.conn).await?;
        Ok(rows.iter().map(|r| row_to_json(r, schema)).collect())
    }

    async fn execute(&mut self, q: Option<QueryBuf>) -> Result<u64, DataError> {
        let Some(q) = q else {
            return Ok(0);
        };
        tracing::debug!(sql = %q.sql, params = ?q.params, "execute");
        let mut query = sqlx::query(&q.sql);
        for p in q.params {
            query = query.bind(p);
        }
        let done = query.execute(&mut *self.conn).await?;
        Ok(done.rows_affected())
    }

    async fn count(&mut self, q: QueryBuf) -> Result<i64, DataError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "count");
        let mut query = sqlx::query_scalar::<_, i64>(&q.sql);
        for p in q.params {
            query = query.bind(p);
        }
        Ok(query.fetch_one(&mut *self.conn).await?)
    }

    async fn exists(&mut self, q: QueryBuf) -> Result<bool, DataError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "exists");
        let mut query = sqlx::query_scalar::<_, bool>(&q.sql);
        for p in q.params {
            query = query.bind(p);
        }
        Ok(query.fetch_one(&mut *self.conn).await?)
    }
}

#[async_trait]
impl ProcedureConnection for PgProcedureConnection {
    async fn call(&mut self, call: &ProcedureCall) -> Result<ProcedureOutput, DataError> {
        let schema = call.schema.as_ref();
        let key = schema.key()?.name;
        let out = match call.procedure {
            Procedure::GetAllData => ProcedureOutput::Rows(self.fetch_rows(schema, builder::select_all(schema)?).await?),
            Procedure::GetPagingData => {
                let (page_index, page_size) = normalize_page(call.int(Param::PageIndex)?, call.int(Param::PageSize)?);
                let filters = call.filters()?;
                let keywords = call.keywords();
                let total_row = self.count(builder::count_page(schema, keywords, &filters)?).await?;
                let q = builder::select_page(
                    schema,
                    keywords,
                    &filters,
                    page_size,
                    page_offset(page_index, page_size),
                )?;
                let rows = self.fetch_rows(schema, q).await?;
                ProcedureOutput::Page { rows, total_row }
            }
            Procedure::InsertData => {
                let q = builder::insert(schema, &call.column_set()?)?;
                ProcedureOutput::Affected(self.execute(Some(q)).await?)
            }
            Procedure::UpdateData => {
                let q = builder::update(schema, key, call.require(Param::Id)?, &call.column_set()?)?;
                ProcedureOutput::Affected(self.execute(q).await?)
            }
            Procedure::UpdateDataByKey => {
                let q = builder::update(
                    schema,
                    call.text(Param::KeyUpdate)?,
                    call.require(Param::ValueUpdate)?,
                    &call.column_set()?,
                )?;
                ProcedureOutput::Affected(self.execute(q).await?)
            }
            Procedure::GetDataById => {
                let q = builder::select_in(schema, key, &call.id_list()?)?;
                ProcedureOutput::Rows(self.fetch_rows(schema, q).await?)
            }
            Procedure::GetSingleData => {
                let q = builder::select_where(schema, &call.column_set()?, MatchMode::All, Some(1))?;
                ProcedureOutput::Rows(self.fetch_rows(schema, q).await?)
            }
            Procedure::GetMultiData => {
                let q = builder::select_where(schema, &call.column_set()?, self.mode, None)?;
                ProcedureOutput::Rows(self.fetch_rows(schema, q).await?)
            }
            Procedure::GetMultiDataAnd => {
                let q = builder::select_where(schema, &call.column_set()?, MatchMode::All, None)?;
                ProcedureOutput::Rows(self.fetch_rows(schema, q).await?)
            }
            Procedure::DeleteDataById => {
                let q = builder::delete_in(schema, key, &call.id_list()?)?;
                ProcedureOutput::Affected(self.execute(q).await?)
            }
            Procedure::DeleteDataByTaskId => {
                let q = builder::delete_in(schema, TASK_GROUP_COLUMN, &call.id_list()?)?;
                ProcedureOutput::Affected(self.execute(q).await?)
            }
            Procedure::CheckValid => {
                let q = builder::exists(schema, &call.column_set()?)?;
                ProcedureOutput::Flag(self.exists(q).await?)
            }
        };
        Ok(out)
    }
}

fn row_to_json(row: &PgRow, schema: &TableSchema) -> Value {
    use sqlx::{Column, Row};
    let mut map = serde_json::Map::new();
    for col in row.columns() {
        let name = col.name();
        let kind = schema.column(name).map(|c| c.kind).ok();
        map.insert(name.to_string(), cell_to_value(row, name, kind));
    }
    Value::Object(map)
}

/// Decodes by declared kind first, then falls back through the common column types.
fn cell_to_value(row: &PgRow, name: &str, kind: Option<FieldKind>) -> Value {
    use sqlx::Row;
    match kind {
        Some(FieldKind::Integer) => {
            if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
                return Value::Number(n.into());
            }
            if let Ok(Some(n)) = row.try_get::<Option<i32>, _>(name) {
                return Value::Number(n.into());
            }
        }
        Some(FieldKind::Float) => {
            if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(name) {
                if let Some(n) = serde_json::Number::from_f64(n) {
                    return Value::Number(n);
                }
            }
        }
        Some(FieldKind::Boolean) => {
            if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
                return Value::Bool(b);
            }
        }
        Some(FieldKind::Json) => {
            if let Ok(Some(j)) = row.try_get::<Option<Value>, _>(name) {
                return j;
            }
        }
        Some(FieldKind::Text) => {
            if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
                return Value::String(s);
            }
        }
        None => {}
    }
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
        return Value::Bool(b);
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
        return Value::String(d.to_rfc3339());
    }
    if let Ok(Some(u)) = row.try_get::<Option<uuid::Uuid>, _>(name) {
        return Value::String(u.to_string());
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    Value::Null
}
