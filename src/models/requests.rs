//! Request bodies and response views of the project API (camelCase on the wire).

use crate::models::{Priority, Project, Status, Task, User};
use garde::Validate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInsert {
    #[garde(length(min = 1, max = 255))]
    pub project_name: String,
    #[garde(length(max = 10000))]
    pub description: Option<String>,
    #[garde(range(min = 1))]
    pub category_id: i64,
    #[garde(length(max = 255))]
    pub alias: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UserProject {
    #[garde(range(min = 1))]
    pub project_id: i64,
    #[garde(range(min = 1))]
    pub user_id: i64,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TaskUserRequest {
    #[garde(range(min = 1))]
    pub task_id: i64,
    #[garde(range(min = 1))]
    pub user_id: i64,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatus {
    #[garde(range(min = 1))]
    pub task_id: i64,
    #[garde(length(min = 1, max = 50))]
    pub status_id: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePriority {
    #[garde(range(min = 1))]
    pub task_id: i64,
    #[garde(range(min = 1))]
    pub priority_id: i64,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDescription {
    #[garde(range(min = 1))]
    pub task_id: i64,
    #[garde(length(max = 10000))]
    pub description: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TimeTrackingUpdate {
    #[garde(range(min = 1))]
    pub task_id: i64,
    #[garde(range(min = 0))]
    pub time_tracking_spent: i64,
    #[garde(range(min = 0))]
    pub time_tracking_remaining: i64,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEstimate {
    #[garde(range(min = 1))]
    pub task_id: i64,
    #[garde(range(min = 0))]
    pub original_estimate: i64,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TaskInsert {
    #[garde(skip)]
    #[serde(default)]
    pub list_user_asign: Vec<i64>,
    #[garde(length(min = 1, max = 255))]
    pub task_name: String,
    #[garde(length(max = 10000))]
    pub description: Option<String>,
    #[garde(length(min = 1, max = 50))]
    pub status_id: String,
    #[garde(range(min = 0))]
    #[serde(default)]
    pub original_estimate: i64,
    #[garde(range(min = 0))]
    #[serde(default)]
    pub time_tracking_spent: i64,
    #[garde(range(min = 0))]
    #[serde(default)]
    pub time_tracking_remaining: i64,
    #[garde(range(min = 1))]
    pub project_id: i64,
    #[garde(range(min = 1))]
    pub type_id: i64,
    #[garde(range(min = 1))]
    pub priority_id: i64,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TaskEdit {
    #[garde(range(min = 1))]
    pub task_id: i64,
    #[garde(skip)]
    #[serde(default)]
    pub list_user_asign: Vec<i64>,
    #[garde(length(min = 1, max = 255))]
    pub task_name: String,
    #[garde(length(max = 10000))]
    pub description: Option<String>,
    #[garde(length(min = 1, max = 50))]
    pub status_id: String,
    #[garde(range(min = 0))]
    #[serde(default)]
    pub original_estimate: i64,
    #[garde(range(min = 0))]
    #[serde(default)]
    pub time_tracking_spent: i64,
    #[garde(range(min = 0))]
    #[serde(default)]
    pub time_tracking_remaining: i64,
    #[garde(range(min = 1))]
    pub project_id: i64,
    #[garde(range(min = 1))]
    pub type_id: i64,
    #[garde(range(min = 1))]
    pub priority_id: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberView {
    pub user_id: i64,
    pub name: String,
    pub avatar: Option<String>,
}

impl From<&User> for MemberView {
    fn from(u: &User) -> Self {
        MemberView {
            user_id: u.id,
            name: u.name.clone(),
            avatar: u.avatar.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub id: i64,
    pub project_name: String,
    pub description: Option<String>,
    pub category_id: i64,
    pub alias: String,
    pub creator: Option<MemberView>,
    pub members: Vec<MemberView>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    pub task_id: i64,
    pub task_name: String,
    pub description: Option<String>,
    pub status_id: String,
    pub priority: Option<Priority>,
    pub type_id: i64,
    pub project_id: i64,
    pub reporter_id: Option<i64>,
    pub original_estimate: i64,
    pub time_tracking_spent: i64,
    pub time_tracking_remaining: i64,
    pub assigness: Vec<MemberView>,
}

impl TaskView {
    pub fn new(task: Task, priority: Option<Priority>, assigness: Vec<MemberView>) -> Self {
        TaskView {
            task_id: task.task_id,
            task_name: task.task_name,
            description: task.description,
            status_id: task.status_id,
            priority,
            type_id: task.type_id,
            project_id: task.project_id,
            reporter_id: task.reporter_id,
            original_estimate: task.original_estimate,
            time_tracking_spent: task.time_tracking_spent,
            time_tracking_remaining: task.time_tracking_remaining,
            assigness,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusColumn {
    pub status_id: String,
    pub status_name: String,
    pub list_task_detail: Vec<TaskView>,
}

impl StatusColumn {
    pub fn empty(status: Status) -> Self {
        StatusColumn {
            status_id: status.status_id,
            status_name: status.status_name,
            list_task_detail: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDetail {
    pub id: i64,
    pub project_name: String,
    pub description: Option<String>,
    pub category_id: i64,
    pub alias: String,
    pub creator: Option<MemberView>,
    pub members: Vec<MemberView>,
    pub lst_task: Vec<StatusColumn>,
}

impl ProjectDetail {
    pub fn new(project: Project, creator: Option<MemberView>, members: Vec<MemberView>, lst_task: Vec<StatusColumn>) -> Self {
        ProjectDetail {
            id: project.id,
            project_name: project.project_name,
            description: project.description,
            category_id: project.category_id,
            alias: project.alias,
            creator,
            members,
            lst_task,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn task_insert_reads_camel_case_and_validates() {
        let body: TaskInsert = serde_json::from_value(json!({
            "listUserAsign": [2, 3],
            "taskName": "",
            "statusId": "1",
            "projectId": 1,
            "typeId": 1,
            "priorityId": 0
        }))
        .unwrap();
        assert_eq!(body.list_user_asign, vec![2, 3]);
        let report = body.validate().unwrap_err();
        let fields: Vec<String> = report.iter().map(|(path, _)| path.to_string()).collect();
        assert!(fields.contains(&"task_name".to_string()));
        assert!(fields.contains(&"priority_id".to_string()));
    }
}
