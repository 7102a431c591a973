//! Procedure contract: names, parameters and result shapes shared by every backend.

use crate::entity::{ColumnSet, TableSchema};
use crate::error::DataError;
use crate::repository::paging::Filter;
use crate::sql::SqlValue;
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;

/// Grouping column used by `DELETE_DATA_BY_TASK_ID`.
pub const TASK_GROUP_COLUMN: &str = "task_id";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Procedure {
    GetAllData,
    GetPagingData,
    InsertData,
    UpdateData,
    UpdateDataByKey,
    GetDataById,
    GetSingleData,
    GetMultiData,
    GetMultiDataAnd,
    DeleteDataById,
    DeleteDataByTaskId,
    CheckValid,
}

impl Procedure {
    pub fn name(self) -> &'static str {
        match self {
            Procedure::GetAllData => "GET_ALL_DATA",
            Procedure::GetPagingData => "GET_PAGING_DATA",
            Procedure::InsertData => "INSERT_DATA",
            Procedure::UpdateData => "UPDATE_DATA",
            Procedure::UpdateDataByKey => "UPDATE_DATA_BY_KEY",
            Procedure::GetDataById => "GET_DATA_BY_ID",
            Procedure::GetSingleData => "GET_SINGLE_DATA",
            Procedure::GetMultiData => "GET_MULTI_DATA",
            Procedure::GetMultiDataAnd => "GET_MULTI_DATA_AND",
            Procedure::DeleteDataById => "DELETE_DATA_BY_ID",
            Procedure::DeleteDataByTaskId => "DELETE_DATA_BY_TASK_ID",
            Procedure::CheckValid => "CHECK_VALID",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Param {
    TableName,
    ListColumn,
    ListId,
    Id,
    KeyUpdate,
    ValueUpdate,
    PageIndex,
    PageSize,
    Keywords,
    Filter,
}

impl Param {
    pub fn name(self) -> &'static str {
        match self {
            Param::TableName => "@tableName",
            Param::ListColumn => "@listColumn",
            Param::ListId => "@listId",
            Param::Id => "@id",
            Param::KeyUpdate => "@keyUpdate",
            Param::ValueUpdate => "@valueUpdate",
            Param::PageIndex => "@pageIndex",
            Param::PageSize => "@pageSize",
            Param::Keywords => "@keywords",
            Param::Filter => "@filter",
        }
    }
}

/// How `GET_MULTI_DATA` combines several conditions. `GET_MULTI_DATA_AND` always uses `All`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MatchMode {
    #[default]
    Any,
    All,
}

impl FromStr for MatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "any" | "or" => Ok(MatchMode::Any),
            "all" | "and" => Ok(MatchMode::All),
            other => Err(format!("expected any or all, got {}", other)),
        }
    }
}

/// One procedure invocation: name, bound table and named parameters in call order.
#[derive(Clone, Debug)]
pub struct ProcedureCall {
    pub procedure: Procedure,
    pub schema: Arc<TableSchema>,
    pub params: Vec<(Param, SqlValue)>,
}

impl ProcedureCall {
    pub fn new(procedure: Procedure, schema: Arc<TableSchema>) -> Self {
        let table = SqlValue::Text(schema.table.clone());
        ProcedureCall {
            procedure,
            schema,
            params: vec![(Param::TableName, table)],
        }
    }

    pub fn with(mut self, param: Param, value: impl Into<SqlValue>) -> Self {
        self.params.push((param, value.into()));
        self
    }

    pub fn param(&self, param: Param) -> Option<&SqlValue> {
        self.params.iter().find(|(p, _)| *p == param).map(|(_, v)| v)
    }

    pub fn require(&self, param: Param) -> Result<&SqlValue, DataError> {
        self.param(param).ok_or(DataError::MissingParam {
            procedure: self.procedure.name(),
            param: param.name(),
        })
    }

    pub fn text(&self, param: Param) -> Result<&str, DataError> {
        self.require(param)?.as_str().ok_or(DataError::MissingParam {
            procedure: self.procedure.name(),
            param: param.name(),
        })
    }

    pub fn int(&self, param: Param) -> Result<i64, DataError> {
        self.require(param)?.as_i64().ok_or(DataError::MissingParam {
            procedure: self.procedure.name(),
            param: param.name(),
        })
    }

    /// `@listColumn` decoded back into ordered pairs.
    pub fn column_set(&self) -> Result<ColumnSet, DataError> {
        ColumnSet::from_json(self.text(Param::ListColumn)?)
    }

    /// `@listId` decoded from its JSON array.
    pub fn id_list(&self) -> Result<Vec<SqlValue>, DataError> {
        serde_json::from_str(self.text(Param::ListId)?).map_err(DataError::Decode)
    }

    pub fn filters(&self) -> Result<Vec<Filter>, DataError> {
        match self.param(Param::Filter) {
            Some(SqlValue::Text(s)) => Filter::parse_list(s),
            _ => Ok(Vec::new()),
        }
    }

    pub fn keywords(&self) -> &str {
        self.param(Param::Keywords).and_then(SqlValue::as_str).unwrap_or("")
    }
}

/// Result shape of a procedure.
#[derive(Clone, Debug, PartialEq)]
pub enum ProcedureOutput {
    Rows(Vec<Value>),
    Page { rows: Vec<Value>, total_row: i64 },
    Affected(u64),
    Flag(bool),
}
