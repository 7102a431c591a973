//! Generic repository: one procedure call per operation over a scoped connection.

mod connection;
pub mod memory;
mod paging;
pub mod postgres;
mod procedure;

pub use connection::{ConnectionProvider, ProcedureConnection};
pub use memory::MemoryProvider;
pub use paging::{normalize_page, page_offset, Filter, PagingResult, MAX_PAGE_SIZE};
pub use postgres::PgProvider;
pub use procedure::{MatchMode, Param, Procedure, ProcedureCall, ProcedureOutput, TASK_GROUP_COLUMN};

use crate::entity::{
    insert_columns, update_columns, update_columns_keep_empty, ColumnPair, ColumnSet, Entity, TableSchema,
};
use crate::error::DataError;
use crate::sql::SqlValue;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;

/// Data access for entity `T` bound to one table.
pub struct Repository<T, P> {
    provider: P,
    schema: Arc<TableSchema>,
    _entity: PhantomData<fn() -> T>,
}

impl<T, P: Clone> Clone for Repository<T, P> {
    fn clone(&self) -> Self {
        Repository {
            provider: self.provider.clone(),
            schema: self.schema.clone(),
            _entity: PhantomData,
        }
    }
}

fn id_list<I, V>(ids: I) -> String
where
    I: IntoIterator<Item = V>,
    V: Into<SqlValue>,
{
    SqlValue::List(ids.into_iter().map(Into::into).collect())
        .to_json()
        .to_string()
}

fn decode_rows<T: Entity>(rows: Vec<Value>) -> Result<Vec<T>, DataError> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(DataError::Decode))
        .collect()
}

impl<T: Entity, P: ConnectionProvider> Repository<T, P> {
    pub fn new(provider: P) -> Self {
        Self::with_table(provider, T::TABLE)
    }

    pub fn with_table(provider: P, table: &str) -> Self {
        Repository {
            provider,
            schema: Arc::new(TableSchema::with_table::<T>(table)),
            _entity: PhantomData,
        }
    }

    pub fn table(&self) -> &str {
        &self.schema.table
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    fn call(&self, procedure: Procedure) -> ProcedureCall {
        ProcedureCall::new(procedure, self.schema.clone())
    }

    async fn run(&self, call: ProcedureCall) -> Result<ProcedureOutput, DataError> {
        let mut conn = self.provider.open().await?;
        tracing::debug!(procedure = call.procedure.name(), table = %self.schema.table, "call");
        conn.call(&call).await
    }

    async fn rows(&self, call: ProcedureCall) -> Result<Vec<T>, DataError> {
        let name = call.procedure.name();
        match self.run(call).await? {
            ProcedureOutput::Rows(rows) => decode_rows(rows),
            _ => Err(DataError::UnexpectedOutput(name)),
        }
    }

    async fn first(&self, call: ProcedureCall) -> Result<Option<T>, DataError> {
        Ok(self.rows(call).await?.into_iter().next())
    }

    async fn affected(&self, call: ProcedureCall) -> Result<u64, DataError> {
        let name = call.procedure.name();
        match self.run(call).await? {
            ProcedureOutput::Affected(n) => Ok(n),
            _ => Err(DataError::UnexpectedOutput(name)),
        }
    }

    fn condition_call(&self, procedure: Procedure, conditions: Vec<ColumnPair>) -> ProcedureCall {
        self.call(procedure)
            .with(Param::ListColumn, ColumnSet(conditions).to_json())
    }

    pub async fn get_all(&self) -> Result<Vec<T>, DataError> {
        self.rows(self.call(Procedure::GetAllData)).await
    }

    /// One page of rows matching `keywords` and every filter, with the total matching count.
    pub async fn get_paging(
        &self,
        page_index: i64,
        page_size: i64,
        keywords: &str,
        filters: &[Filter],
    ) -> Result<PagingResult<T>, DataError> {
        let (page_index, page_size) = normalize_page(page_index, page_size);
        let call = self
            .call(Procedure::GetPagingData)
            .with(Param::PageIndex, page_index)
            .with(Param::PageSize, page_size)
            .with(Param::Keywords, keywords)
            .with(Param::Filter, Filter::list_to_json(filters));
        let name = call.procedure.name();
        match self.run(call).await? {
            ProcedureOutput::Page { rows, total_row } => Ok(PagingResult {
                items: decode_rows(rows)?,
                page_index,
                page_size,
                keywords: keywords.to_string(),
                total_row,
            }),
            _ => Err(DataError::UnexpectedOutput(name)),
        }
    }

    /// Inserts and hands back the entity as given; generated keys are not read back.
    pub async fn insert(&self, entity: T) -> Result<T, DataError> {
        let columns = insert_columns(&entity);
        let call = self.call(Procedure::InsertData).with(Param::ListColumn, columns.to_json());
        self.affected(call).await?;
        Ok(entity)
    }

    /// Sparse update of the row whose key equals `id`.
    pub async fn update(&self, id: impl Into<SqlValue>, entity: T) -> Result<T, DataError> {
        let columns = update_columns(&entity);
        let call = self
            .call(Procedure::UpdateData)
            .with(Param::Id, id)
            .with(Param::ListColumn, columns.to_json());
        self.affected(call).await?;
        Ok(entity)
    }

    /// Sparse update of rows where column `key` equals `value`.
    pub async fn update_by_key(&self, key: &str, value: impl Into<SqlValue>, entity: T) -> Result<T, DataError> {
        let columns = update_columns(&entity);
        let call = self
            .call(Procedure::UpdateDataByKey)
            .with(Param::KeyUpdate, key)
            .with(Param::ValueUpdate, value)
            .with(Param::ListColumn, columns.to_json());
        self.affected(call).await?;
        Ok(entity)
    }

    pub async fn update_by_condition(
        &self,
        key_column: &str,
        key_value: impl Into<SqlValue>,
        entity: T,
    ) -> Result<T, DataError> {
        self.update_by_key(key_column, key_value, entity).await
    }

    /// Like `update`, but empty collections are written so a list can be cleared.
    pub async fn update_has_array_null(&self, id: impl Into<SqlValue>, entity: T) -> Result<T, DataError> {
        let columns = update_columns_keep_empty(&entity);
        let call = self
            .call(Procedure::UpdateData)
            .with(Param::Id, id)
            .with(Param::ListColumn, columns.to_json());
        self.affected(call).await?;
        Ok(entity)
    }

    pub async fn get_multi_by_id<I, V>(&self, ids: I) -> Result<Vec<T>, DataError>
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        let call = self.call(Procedure::GetDataById).with(Param::ListId, id_list(ids));
        self.rows(call).await
    }

    pub async fn get_single_by_list_id<I, V>(&self, ids: I) -> Result<Option<T>, DataError>
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        let call = self.call(Procedure::GetDataById).with(Param::ListId, id_list(ids));
        self.first(call).await
    }

    pub async fn get_single_by_id(&self, id: impl Into<SqlValue>) -> Result<Option<T>, DataError> {
        let id: SqlValue = id.into();
        self.get_single_by_list_id([id]).await
    }

    pub async fn get_single_by_condition(
        &self,
        column: &str,
        value: impl Into<SqlValue>,
    ) -> Result<Option<T>, DataError> {
        let call = self.condition_call(Procedure::GetSingleData, vec![ColumnPair::new(column, value)]);
        self.first(call).await
    }

    pub async fn get_multi_by_condition(&self, column: &str, value: impl Into<SqlValue>) -> Result<Vec<T>, DataError> {
        let call = self.condition_call(Procedure::GetMultiData, vec![ColumnPair::new(column, value)]);
        self.rows(call).await
    }

    pub async fn get_single_by_list_condition(&self, conditions: &[ColumnPair]) -> Result<Option<T>, DataError> {
        let call = self.condition_call(Procedure::GetSingleData, conditions.to_vec());
        self.first(call).await
    }

    /// Conditions combined per the backend's `MatchMode`.
    pub async fn get_multi_by_list_condition(&self, conditions: &[ColumnPair]) -> Result<Vec<T>, DataError> {
        let call = self.condition_call(Procedure::GetMultiData, conditions.to_vec());
        self.rows(call).await
    }

    /// Rows matching every condition.
    pub async fn get_multi_by_list_condition_and(&self, conditions: &[ColumnPair]) -> Result<Vec<T>, DataError> {
        let call = self.condition_call(Procedure::GetMultiDataAnd, conditions.to_vec());
        self.rows(call).await
    }

    /// Returns the number of rows actually removed.
    pub async fn delete_by_id<I, V>(&self, ids: I) -> Result<u64, DataError>
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        let call = self.call(Procedure::DeleteDataById).with(Param::ListId, id_list(ids));
        self.affected(call).await
    }

    /// Removes rows whose `task_id` is in `ids`.
    pub async fn delete_by_task_id<I, V>(&self, ids: I) -> Result<u64, DataError>
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        let call = self.call(Procedure::DeleteDataByTaskId).with(Param::ListId, id_list(ids));
        self.affected(call).await
    }

    pub async fn check_valid_by_condition(&self, column: &str, value: impl Into<SqlValue>) -> Result<bool, DataError> {
        let call = self.condition_call(Procedure::CheckValid, vec![ColumnPair::new(column, value)]);
        let name = call.procedure.name();
        match self.run(call).await? {
            ProcedureOutput::Flag(found) => Ok(found),
            _ => Err(DataError::UnexpectedOutput(name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Field, FieldKind};
    use async_trait::async_trait;
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Ticket {
        id: i64,
        title: Option<String>,
    }

    impl Entity for Ticket {
        const TABLE: &'static str = "ticket";
        const FIELDS: &'static [Field<Self>] = &[
            Field { name: "id", kind: FieldKind::Integer, read: |t| t.id.into() },
            Field { name: "title", kind: FieldKind::Text, read: |t| t.title.clone().into() },
        ];
    }

    /// Records every call and answers with a canned output.
    #[derive(Clone)]
    struct Recorder {
        calls: Arc<Mutex<Vec<ProcedureCall>>>,
        output: ProcedureOutput,
    }

    struct RecorderConn(Recorder);

    #[async_trait]
    impl ConnectionProvider for Recorder {
        type Connection = RecorderConn;

        async fn open(&self) -> Result<RecorderConn, DataError> {
            Ok(RecorderConn(self.clone()))
        }
    }

    #[async_trait]
    impl ProcedureConnection for RecorderConn {
        async fn call(&mut self, call: &ProcedureCall) -> Result<ProcedureOutput, DataError> {
            self.0.calls.lock().unwrap().push(call.clone());
            Ok(self.0.output.clone())
        }
    }

    fn recorder(output: ProcedureOutput) -> Recorder {
        Recorder {
            calls: Arc::new(Mutex::new(Vec::new())),
            output,
        }
    }

    #[tokio::test]
    async fn insert_sends_column_list_and_returns_input() {
        let rec = recorder(ProcedureOutput::Affected(1));
        let repo: Repository<Ticket, _> = Repository::new(rec.clone());
        let given = Ticket { id: 0, title: Some("crash".into()) };
        let back = repo.insert(given).await.unwrap();
        assert_eq!(back, Ticket { id: 0, title: Some("crash".into()) });

        let calls = rec.calls.lock().unwrap();
        let call = &calls[0];
        assert_eq!(call.procedure.name(), "INSERT_DATA");
        assert_eq!(call.param(Param::TableName), Some(&SqlValue::Text("ticket".into())));
        assert_eq!(call.text(Param::ListColumn).unwrap(), r#"[{"Key":"title","Value":"crash"}]"#);
    }

    #[tokio::test]
    async fn id_lists_travel_as_json_arrays() {
        let rec = recorder(ProcedureOutput::Affected(2));
        let repo: Repository<Ticket, _> = Repository::new(rec.clone());
        assert_eq!(repo.delete_by_id(vec![1, 2, 3]).await.unwrap(), 2);
        let calls = rec.calls.lock().unwrap();
        assert_eq!(calls[0].text(Param::ListId).unwrap(), "[1,2,3]");
        assert_eq!(calls[0].id_list().unwrap(), vec![SqlValue::Int(1), SqlValue::Int(2), SqlValue::Int(3)]);
    }

    #[tokio::test]
    async fn rows_decode_into_entities() {
        let rec = recorder(ProcedureOutput::Rows(vec![json!({"id": 4, "title": null})]));
        let repo: Repository<Ticket, _> = Repository::with_table(rec.clone(), "archived_ticket");
        let got = repo.get_single_by_condition("title", SqlValue::Null).await.unwrap();
        assert_eq!(got, Some(Ticket { id: 4, title: None }));
        assert_eq!(rec.calls.lock().unwrap()[0].schema.table, "archived_ticket");
    }

    #[tokio::test]
    async fn wrong_output_shape_is_an_error() {
        let rec = recorder(ProcedureOutput::Affected(1));
        let repo: Repository<Ticket, _> = Repository::new(rec);
        let err = repo.check_valid_by_condition("title", "x").await.unwrap_err();
        assert!(matches!(err, DataError::UnexpectedOutput("CHECK_VALID")));
    }

    #[tokio::test]
    async fn paging_normalizes_and_forwards_filters() {
        let rec = recorder(ProcedureOutput::Page { rows: vec![], total_row: 31 });
        let repo: Repository<Ticket, _> = Repository::new(rec.clone());
        let page = repo
            .get_paging(0, 10, "", &[Filter::new("title", "Open")])
            .await
            .unwrap();
        assert_eq!((page.page_index, page.page_size, page.total_row), (1, 10, 31));
        let calls = rec.calls.lock().unwrap();
        assert_eq!(calls[0].filters().unwrap(), vec![Filter::new("title", "Open")]);
    }
}
