//! Project/task service: the trait handlers talk to and its repository-backed implementation.

mod project;

pub use project::ProjectManager;

use crate::error::AppError;
use crate::models::{
    ProjectInsert, TaskEdit, TaskInsert, TaskUserRequest, TimeTrackingUpdate, UpdateDescription, UpdateEstimate,
    UpdatePriority, UpdateStatus, UserProject,
};
use crate::repository::Filter;
use crate::response::ResponseEntity;
use async_trait::async_trait;

pub type ServiceResult = Result<ResponseEntity, AppError>;

/// Operations behind `/api/project`. `token` is the bearer token exactly as sent by the client.
#[async_trait]
pub trait ProjectService: Send + Sync {
    /// Succeeds when the data store hands out a connection.
    async fn ready(&self) -> Result<(), AppError>;

    async fn create_project(&self, model: ProjectInsert, token: Option<String>) -> ServiceResult;
    async fn get_project_detail(&self, id: i64, token: &str) -> ServiceResult;
    async fn get_all_project(&self, keyword: &str) -> ServiceResult;
    async fn get_project_paging(
        &self,
        page_index: i64,
        page_size: i64,
        keywords: &str,
        filters: Vec<Filter>,
    ) -> ServiceResult;

    async fn assign_user_project(&self, model: UserProject, token: &str) -> ServiceResult;
    async fn remove_user_from_project(&self, model: UserProject, token: &str) -> ServiceResult;
    async fn assign_user_task(&self, model: TaskUserRequest, token: &str) -> ServiceResult;
    async fn remove_user_from_task(&self, model: TaskUserRequest, token: &str) -> ServiceResult;

    async fn update_status(&self, model: UpdateStatus, token: &str) -> ServiceResult;
    async fn update_priority(&self, model: UpdatePriority, token: &str) -> ServiceResult;
    async fn update_description(&self, model: UpdateDescription, token: &str) -> ServiceResult;
    async fn update_time_tracking(&self, model: TimeTrackingUpdate, token: &str) -> ServiceResult;
    async fn update_estimate(&self, model: UpdateEstimate, token: &str) -> ServiceResult;

    async fn create_task(&self, model: TaskInsert, token: &str) -> ServiceResult;
    async fn update_task(&self, model: TaskEdit, token: &str) -> ServiceResult;
    async fn remove_task(&self, task_id: i64, token: &str) -> ServiceResult;
    async fn get_task_detail(&self, task_id: i64, token: &str) -> ServiceResult;
}
