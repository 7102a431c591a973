//! `/api/project` routes. Method per endpoint follows the public API.

use crate::handlers::project::{
    assign_user_project, assign_user_task, create_project, create_project_authorize, create_task, get_all_project,
    get_project_detail, get_project_paging, get_task_detail, remove_task, remove_user_from_project,
    remove_user_from_task, update_description, update_estimate, update_priority, update_status,
    update_time_tracking, update_task,
};
use crate::state::AppState;
use axum::{
    routing::{delete, get, post, put},
    Router,
};

pub fn project_routes(state: AppState) -> Router {
    Router::new()
        .route("/createProject", post(create_project))
        .route("/createProjectAuthorize", post(create_project_authorize))
        .route("/getProjectDetail", get(get_project_detail))
        .route("/getAllProject", get(get_all_project))
        .route("/getProjectPaging", get(get_project_paging))
        .route("/assignUserProject", post(assign_user_project))
        .route("/removeUserFromProject", post(remove_user_from_project))
        .route("/assignUserTask", post(assign_user_task))
        .route("/removeUserFromTask", post(remove_user_from_task))
        .route("/updateStatus", put(update_status))
        .route("/updatePriority", put(update_priority))
        .route("/updateDescription", put(update_description))
        .route("/updateTimeTracking", put(update_time_tracking))
        .route("/updateEstimate", put(update_estimate))
        .route("/createTask", post(create_task))
        .route("/updateTask", post(update_task))
        .route("/removeTask", delete(remove_task))
        .route("/getTaskDetail", get(get_task_detail))
        .with_state(state)
}
