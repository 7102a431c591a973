//! Table rows. Field order matches the column order; the first field is the key.

use crate::entity::{Entity, Field, FieldKind};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub avatar: Option<String>,
    pub phone_number: Option<String>,
    pub access_token: Option<String>,
}

impl Entity for User {
    const TABLE: &'static str = "users";
    const FIELDS: &'static [Field<Self>] = &[
        Field { name: "id", kind: FieldKind::Integer, read: |u| u.id.into() },
        Field { name: "email", kind: FieldKind::Text, read: |u| u.email.as_str().into() },
        Field { name: "name", kind: FieldKind::Text, read: |u| u.name.as_str().into() },
        Field { name: "avatar", kind: FieldKind::Text, read: |u| u.avatar.clone().into() },
        Field { name: "phone_number", kind: FieldKind::Text, read: |u| u.phone_number.clone().into() },
        Field { name: "access_token", kind: FieldKind::Text, read: |u| u.access_token.clone().into() },
    ];
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProjectCategory {
    pub id: i64,
    pub project_category_name: String,
}

impl Entity for ProjectCategory {
    const TABLE: &'static str = "project_category";
    const FIELDS: &'static [Field<Self>] = &[
        Field { name: "id", kind: FieldKind::Integer, read: |c| c.id.into() },
        Field { name: "project_category_name", kind: FieldKind::Text, read: |c| c.project_category_name.as_str().into() },
    ];
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub project_name: String,
    pub description: Option<String>,
    pub category_id: i64,
    pub alias: String,
    pub creator: Option<i64>,
    pub deleted: bool,
}

impl Entity for Project {
    const TABLE: &'static str = "project";
    const FIELDS: &'static [Field<Self>] = &[
        Field { name: "id", kind: FieldKind::Integer, read: |p| p.id.into() },
        Field { name: "project_name", kind: FieldKind::Text, read: |p| p.project_name.as_str().into() },
        Field { name: "description", kind: FieldKind::Text, read: |p| p.description.clone().into() },
        Field { name: "category_id", kind: FieldKind::Integer, read: |p| p.category_id.into() },
        Field { name: "alias", kind: FieldKind::Text, read: |p| p.alias.as_str().into() },
        Field { name: "creator", kind: FieldKind::Integer, read: |p| p.creator.into() },
        Field { name: "deleted", kind: FieldKind::Boolean, read: |p| p.deleted.into() },
    ];
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProjectUser {
    pub id: i64,
    pub project_id: i64,
    pub user_id: i64,
}

impl Entity for ProjectUser {
    const TABLE: &'static str = "project_user";
    const FIELDS: &'static [Field<Self>] = &[
        Field { name: "id", kind: FieldKind::Integer, read: |m| m.id.into() },
        Field { name: "project_id", kind: FieldKind::Integer, read: |m| m.project_id.into() },
        Field { name: "user_id", kind: FieldKind::Integer, read: |m| m.user_id.into() },
    ];
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Task {
    pub task_id: i64,
    pub task_name: String,
    pub description: Option<String>,
    pub status_id: String,
    pub priority_id: i64,
    pub type_id: i64,
    pub project_id: i64,
    pub reporter_id: Option<i64>,
    pub original_estimate: i64,
    pub time_tracking_spent: i64,
    pub time_tracking_remaining: i64,
    pub deleted: bool,
}

impl Entity for Task {
    const TABLE: &'static str = "task";
    const FIELDS: &'static [Field<Self>] = &[
        Field { name: "task_id", kind: FieldKind::Integer, read: |t| t.task_id.into() },
        Field { name: "task_name", kind: FieldKind::Text, read: |t| t.task_name.as_str().into() },
        Field { name: "description", kind: FieldKind::Text, read: |t| t.description.clone().into() },
        Field { name: "status_id", kind: FieldKind::Text, read: |t| t.status_id.as_str().into() },
        Field { name: "priority_id", kind: FieldKind::Integer, read: |t| t.priority_id.into() },
        Field { name: "type_id", kind: FieldKind::Integer, read: |t| t.type_id.into() },
        Field { name: "project_id", kind: FieldKind::Integer, read: |t| t.project_id.into() },
        Field { name: "reporter_id", kind: FieldKind::Integer, read: |t| t.reporter_id.into() },
        Field { name: "original_estimate", kind: FieldKind::Integer, read: |t| t.original_estimate.into() },
        Field { name: "time_tracking_spent", kind: FieldKind::Integer, read: |t| t.time_tracking_spent.into() },
        Field { name: "time_tracking_remaining", kind: FieldKind::Integer, read: |t| t.time_tracking_remaining.into() },
        Field { name: "deleted", kind: FieldKind::Boolean, read: |t| t.deleted.into() },
    ];
}

/// Sparse view of `task`: unset fields are left alone by `update`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TaskPatch {
    pub task_id: i64,
    pub task_name: Option<String>,
    pub description: Option<String>,
    pub status_id: Option<String>,
    pub priority_id: Option<i64>,
    pub type_id: Option<i64>,
    pub original_estimate: Option<i64>,
    pub time_tracking_spent: Option<i64>,
    pub time_tracking_remaining: Option<i64>,
    pub deleted: Option<bool>,
}

impl Entity for TaskPatch {
    const TABLE: &'static str = "task";
    const FIELDS: &'static [Field<Self>] = &[
        Field { name: "task_id", kind: FieldKind::Integer, read: |t| t.task_id.into() },
        Field { name: "task_name", kind: FieldKind::Text, read: |t| t.task_name.clone().into() },
        Field { name: "description", kind: FieldKind::Text, read: |t| t.description.clone().into() },
        Field { name: "status_id", kind: FieldKind::Text, read: |t| t.status_id.clone().into() },
        Field { name: "priority_id", kind: FieldKind::Integer, read: |t| t.priority_id.into() },
        Field { name: "type_id", kind: FieldKind::Integer, read: |t| t.type_id.into() },
        Field { name: "original_estimate", kind: FieldKind::Integer, read: |t| t.original_estimate.into() },
        Field { name: "time_tracking_spent", kind: FieldKind::Integer, read: |t| t.time_tracking_spent.into() },
        Field { name: "time_tracking_remaining", kind: FieldKind::Integer, read: |t| t.time_tracking_remaining.into() },
        Field { name: "deleted", kind: FieldKind::Boolean, read: |t| t.deleted.into() },
    ];
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskUser {
    pub id: i64,
    pub task_id: i64,
    pub user_id: i64,
}

impl Entity for TaskUser {
    const TABLE: &'static str = "task_user";
    const FIELDS: &'static [Field<Self>] = &[
        Field { name: "id", kind: FieldKind::Integer, read: |a| a.id.into() },
        Field { name: "task_id", kind: FieldKind::Integer, read: |a| a.task_id.into() },
        Field { name: "user_id", kind: FieldKind::Integer, read: |a| a.user_id.into() },
    ];
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskType {
    pub id: i64,
    pub task_type: String,
}

impl Entity for TaskType {
    const TABLE: &'static str = "task_type";
    const FIELDS: &'static [Field<Self>] = &[
        Field { name: "id", kind: FieldKind::Integer, read: |t| t.id.into() },
        Field { name: "task_type", kind: FieldKind::Text, read: |t| t.task_type.as_str().into() },
    ];
}

/// Caller-keyed: `status_id` is text and inserted as given.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Status {
    pub status_id: String,
    pub status_name: String,
}

impl Entity for Status {
    const TABLE: &'static str = "status";
    const FIELDS: &'static [Field<Self>] = &[
        Field { name: "status_id", kind: FieldKind::Text, read: |s| s.status_id.as_str().into() },
        Field { name: "status_name", kind: FieldKind::Text, read: |s| s.status_name.as_str().into() },
    ];
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Priority {
    pub priority_id: i64,
    pub priority: String,
    pub description: Option<String>,
}

impl Entity for Priority {
    const TABLE: &'static str = "priority";
    const FIELDS: &'static [Field<Self>] = &[
        Field { name: "priority_id", kind: FieldKind::Integer, read: |p| p.priority_id.into() },
        Field { name: "priority", kind: FieldKind::Text, read: |p| p.priority.as_str().into() },
        Field { name: "description", kind: FieldKind::Text, read: |p| p.description.clone().into() },
    ];
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{insert_columns, update_columns};

    #[test]
    fn patch_writes_only_supplied_fields() {
        let patch = TaskPatch {
            task_id: 3,
            status_id: Some("2".into()),
            ..TaskPatch::default()
        };
        let cols = update_columns(&patch);
        assert_eq!(cols.len(), 1);
        assert!(cols.get("status_id").is_some());
    }

    #[test]
    fn status_key_is_inserted() {
        let cols = insert_columns(&Status {
            status_id: "1".into(),
            status_name: "BACKLOG".into(),
        });
        assert_eq!(cols.iter().next().map(|p| p.key.as_str()), Some("status_id"));
    }
}
