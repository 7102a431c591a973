//! Project/task handlers: extract token and validated body, forward to the service.

use crate::error::AppError;
use crate::extractors::{BearerToken, ValidatedJson};
use crate::models::{
    ProjectInsert, TaskEdit, TaskInsert, TaskUserRequest, TimeTrackingUpdate, UpdateDescription, UpdateEstimate,
    UpdatePriority, UpdateStatus, UserProject,
};
use crate::repository::Filter;
use crate::response::ResponseEntity;
use crate::state::AppState;
use axum::extract::{Query, State};
use serde::Deserialize;

type HandlerResult = Result<ResponseEntity, AppError>;

#[derive(Debug, Deserialize)]
pub struct IdQuery {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskIdQuery {
    pub task_id: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct KeywordQuery {
    #[serde(default)]
    pub keyword: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagingQuery {
    #[serde(default = "default_page_index")]
    pub page_index: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
    #[serde(default)]
    pub keywords: String,
    /// JSON list `[{"Column": .., "Value": ..}]`.
    #[serde(default)]
    pub filter: String,
}

fn default_page_index() -> i64 {
    1
}

fn default_page_size() -> i64 {
    10
}

/// Anonymous create: the project has no creator.
pub async fn create_project(
    State(state): State<AppState>,
    token: Option<BearerToken>,
    ValidatedJson(model): ValidatedJson<ProjectInsert>,
) -> HandlerResult {
    state.service.create_project(model, token.map(|t| t.0)).await
}

pub async fn create_project_authorize(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
    ValidatedJson(model): ValidatedJson<ProjectInsert>,
) -> HandlerResult {
    state.service.create_project(model, Some(token)).await
}

pub async fn get_project_detail(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
    Query(q): Query<IdQuery>,
) -> HandlerResult {
    state.service.get_project_detail(q.id, &token).await
}

pub async fn get_all_project(State(state): State<AppState>, Query(q): Query<KeywordQuery>) -> HandlerResult {
    state.service.get_all_project(&q.keyword).await
}

pub async fn get_project_paging(State(state): State<AppState>, Query(q): Query<PagingQuery>) -> HandlerResult {
    let filters = Filter::parse_list(&q.filter).map_err(|e| AppError::validation("filter", e.to_string()))?;
    state
        .service
        .get_project_paging(q.page_index, q.page_size, &q.keywords, filters)
        .await
}

pub async fn assign_user_project(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
    ValidatedJson(model): ValidatedJson<UserProject>,
) -> HandlerResult {
    state.service.assign_user_project(model, &token).await
}

pub async fn remove_user_from_project(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
    ValidatedJson(model): ValidatedJson<UserProject>,
) -> HandlerResult {
    state.service.remove_user_from_project(model, &token).await
}

pub async fn assign_user_task(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
    ValidatedJson(model): ValidatedJson<TaskUserRequest>,
) -> HandlerResult {
    state.service.assign_user_task(model, &token).await
}

pub async fn remove_user_from_task(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
    ValidatedJson(model): ValidatedJson<TaskUserRequest>,
) -> HandlerResult {
    state.service.remove_user_from_task(model, &token).await
}

pub async fn update_status(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
    ValidatedJson(model): ValidatedJson<UpdateStatus>,
) -> HandlerResult {
    state.service.update_status(model, &token).await
}

pub async fn update_priority(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
    ValidatedJson(model): ValidatedJson<UpdatePriority>,
) -> HandlerResult {
    state.service.update_priority(model, &token).await
}

pub async fn update_description(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
    ValidatedJson(model): ValidatedJson<UpdateDescription>,
) -> HandlerResult {
    state.service.update_description(model, &token).await
}

pub async fn update_time_tracking(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
    ValidatedJson(model): ValidatedJson<TimeTrackingUpdate>,
) -> HandlerResult {
    state.service.update_time_tracking(model, &token).await
}

pub async fn update_estimate(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
    ValidatedJson(model): ValidatedJson<UpdateEstimate>,
) -> HandlerResult {
    state.service.update_estimate(model, &token).await
}

pub async fn create_task(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
    ValidatedJson(model): ValidatedJson<TaskInsert>,
) -> HandlerResult {
    state.service.create_task(model, &token).await
}

pub async fn update_task(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
    ValidatedJson(model): ValidatedJson<TaskEdit>,
) -> HandlerResult {
    state.service.update_task(model, &token).await
}

pub async fn remove_task(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
    Query(q): Query<TaskIdQuery>,
) -> HandlerResult {
    state.service.remove_task(q.task_id, &token).await
}

pub async fn get_task_detail(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
    Query(q): Query<TaskIdQuery>,
) -> HandlerResult {
    state.service.get_task_detail(q.task_id, &token).await
}
