//! `ProjectService` over repositories. Every lookup is a single repository call; no transactions span calls.

use super::{ProjectService, ServiceResult};
use crate::entity::ColumnPair;
use crate::error::{AppError, FieldErrors};
use crate::models::{
    MemberView, Priority, Project, ProjectCategory, ProjectDetail, ProjectInsert, ProjectSummary, ProjectUser, Status,
    StatusColumn, Task, TaskEdit, TaskInsert, TaskPatch, TaskType, TaskUser, TaskUserRequest, TaskView,
    TimeTrackingUpdate, UpdateDescription, UpdateEstimate, UpdatePriority, UpdateStatus, User, UserProject,
};
use crate::repository::{ConnectionProvider, Filter, PagingResult, Repository, MAX_PAGE_SIZE};
use crate::response::ResponseEntity;
use async_trait::async_trait;
use regex::Regex;
use serde_json::json;
use std::sync::OnceLock;

pub struct ProjectManager<P> {
    provider: P,
    users: Repository<User, P>,
    categories: Repository<ProjectCategory, P>,
    projects: Repository<Project, P>,
    members: Repository<ProjectUser, P>,
    tasks: Repository<Task, P>,
    task_patches: Repository<TaskPatch, P>,
    assignees: Repository<TaskUser, P>,
    task_types: Repository<TaskType, P>,
    statuses: Repository<Status, P>,
    priorities: Repository<Priority, P>,
}

fn slug_separator() -> Result<&'static Regex, AppError> {
    static SEPARATOR: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    SEPARATOR
        .get_or_init(|| Regex::new(r"[^a-z0-9]+"))
        .as_ref()
        .map_err(|e| AppError::Internal(format!("alias pattern: {}", e)))
}

/// Lowercase ASCII slug: runs of anything else become one `-`.
fn slugify(name: &str) -> Result<String, AppError> {
    let re = slug_separator()?;
    let lower = name.to_lowercase();
    Ok(re.replace_all(&lower, "-").trim_matches('-').to_string())
}

fn push_error(errors: &mut FieldErrors, field: &str, message: String) {
    errors.entry(field.to_string()).or_default().push(message);
}

impl<P: ConnectionProvider + Clone> ProjectManager<P> {
    pub fn new(provider: P) -> Self {
        ProjectManager {
            users: Repository::new(provider.clone()),
            categories: Repository::new(provider.clone()),
            projects: Repository::new(provider.clone()),
            members: Repository::new(provider.clone()),
            tasks: Repository::new(provider.clone()),
            task_patches: Repository::new(provider.clone()),
            assignees: Repository::new(provider.clone()),
            task_types: Repository::new(provider.clone()),
            statuses: Repository::new(provider.clone()),
            priorities: Repository::new(provider.clone()),
            provider,
        }
    }

    async fn authenticate(&self, token: &str) -> Result<User, AppError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AppError::Unauthorized("missing access token".into()));
        }
        self.users
            .get_single_by_condition("access_token", token)
            .await?
            .ok_or_else(|| AppError::Unauthorized("invalid access token".into()))
    }

    async fn live_project(&self, id: i64) -> Result<Project, AppError> {
        self.projects
            .get_single_by_id(id)
            .await?
            .filter(|p| !p.deleted)
            .ok_or_else(|| AppError::NotFound(format!("project {}", id)))
    }

    async fn live_task(&self, id: i64) -> Result<Task, AppError> {
        self.tasks
            .get_single_by_id(id)
            .await?
            .filter(|t| !t.deleted)
            .ok_or_else(|| AppError::NotFound(format!("task {}", id)))
    }

    async fn memberships(&self, project_id: i64, user_id: i64) -> Result<Vec<ProjectUser>, AppError> {
        let conditions = [
            ColumnPair::new("project_id", project_id),
            ColumnPair::new("user_id", user_id),
        ];
        Ok(self.members.get_multi_by_list_condition_and(&conditions).await?)
    }

    async fn is_member(&self, project: &Project, user_id: i64) -> Result<bool, AppError> {
        if project.creator == Some(user_id) {
            return Ok(true);
        }
        Ok(!self.memberships(project.id, user_id).await?.is_empty())
    }

    fn require_creator(project: &Project, user: &User) -> Result<(), AppError> {
        if project.creator == Some(user.id) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!("only the creator of project {} can do this", project.id)))
        }
    }

    async fn require_member(&self, project: &Project, user: &User) -> Result<(), AppError> {
        if self.is_member(project, user.id).await? {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!("user {} is not a member of project {}", user.id, project.id)))
        }
    }

    /// Caller, task and owning project, with the caller checked as a member.
    async fn task_for_member(&self, task_id: i64, token: &str) -> Result<(User, Task, Project), AppError> {
        let user = self.authenticate(token).await?;
        let task = self.live_task(task_id).await?;
        let project = self.live_project(task.project_id).await?;
        self.require_member(&project, &user).await?;
        Ok((user, task, project))
    }

    async fn member_views(&self, user_ids: Vec<i64>) -> Result<Vec<MemberView>, AppError> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }
        let users = self.users.get_multi_by_id(user_ids).await?;
        Ok(users.iter().map(MemberView::from).collect())
    }

    async fn creator_view(&self, project: &Project) -> Result<Option<MemberView>, AppError> {
        match project.creator {
            Some(id) => Ok(self.users.get_single_by_id(id).await?.as_ref().map(MemberView::from)),
            None => Ok(None),
        }
    }

    async fn project_members(&self, project_id: i64) -> Result<Vec<MemberView>, AppError> {
        let rows = self.members.get_multi_by_condition("project_id", project_id).await?;
        self.member_views(rows.into_iter().map(|m| m.user_id).collect()).await
    }

    async fn summary(&self, project: Project) -> Result<ProjectSummary, AppError> {
        let creator = self.creator_view(&project).await?;
        let members = self.project_members(project.id).await?;
        Ok(ProjectSummary {
            id: project.id,
            project_name: project.project_name,
            description: project.description,
            category_id: project.category_id,
            alias: project.alias,
            creator,
            members,
        })
    }

    async fn summaries(&self, page: PagingResult<Project>) -> Result<PagingResult<ProjectSummary>, AppError> {
        let mut items = Vec::with_capacity(page.items.len());
        for project in page.items {
            items.push(self.summary(project).await?);
        }
        Ok(PagingResult {
            items,
            page_index: page.page_index,
            page_size: page.page_size,
            keywords: page.keywords,
            total_row: page.total_row,
        })
    }

    async fn task_view(&self, task: Task) -> Result<TaskView, AppError> {
        let priority = self.priorities.get_single_by_id(task.priority_id).await?;
        let rows = self.assignees.get_multi_by_condition("task_id", task.task_id).await?;
        let assigness = self.member_views(rows.into_iter().map(|a| a.user_id).collect()).await?;
        Ok(TaskView::new(task, priority, assigness))
    }

    async fn check_task_refs(&self, status_id: &str, priority_id: i64, type_id: i64) -> Result<(), AppError> {
        let mut errors = FieldErrors::new();
        if !self.statuses.check_valid_by_condition("status_id", status_id).await? {
            push_error(&mut errors, "statusId", format!("status {} does not exist", status_id));
        }
        if !self.priorities.check_valid_by_condition("priority_id", priority_id).await? {
            push_error(&mut errors, "priorityId", format!("priority {} does not exist", priority_id));
        }
        if !self.task_types.check_valid_by_condition("id", type_id).await? {
            push_error(&mut errors, "typeId", format!("task type {} does not exist", type_id));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(errors))
        }
    }

    /// Deduplicated assignee ids, each required to belong to `project`.
    async fn check_assignees(&self, project: &Project, user_ids: &[i64]) -> Result<Vec<i64>, AppError> {
        let mut ids = user_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();
        let mut errors = FieldErrors::new();
        for id in &ids {
            if !self.is_member(project, *id).await? {
                push_error(
                    &mut errors,
                    "listUserAsign",
                    format!("user {} is not a member of project {}", id, project.id),
                );
            }
        }
        if errors.is_empty() {
            Ok(ids)
        } else {
            Err(AppError::Validation(errors))
        }
    }

    async fn task_name_taken(&self, project_id: i64, task_name: &str) -> Result<Option<Task>, AppError> {
        let conditions = [
            ColumnPair::new("project_id", project_id),
            ColumnPair::new("task_name", task_name),
            ColumnPair::new("deleted", false),
        ];
        Ok(self.tasks.get_single_by_list_condition(&conditions).await?)
    }

    async fn assign(&self, task_id: i64, user_ids: &[i64]) -> Result<(), AppError> {
        for user_id in user_ids {
            self.assignees
                .insert(TaskUser {
                    id: 0,
                    task_id,
                    user_id: *user_id,
                })
                .await?;
        }
        Ok(())
    }

    async fn patch_task(&self, patch: TaskPatch, message: &str) -> ServiceResult {
        let task_id = patch.task_id;
        self.task_patches.update(task_id, patch).await?;
        let task = self.live_task(task_id).await?;
        Ok(ResponseEntity::ok(self.task_view(task).await?, message))
    }

    fn validate_filters(&self, filters: &[Filter]) -> Result<(), AppError> {
        let mut errors = FieldErrors::new();
        for f in filters {
            if self.projects.schema().column(&f.column).is_err() {
                push_error(&mut errors, "filter", format!("unknown column {}", f.column));
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(errors))
        }
    }
}

#[async_trait]
impl<P> ProjectService for ProjectManager<P>
where
    P: ConnectionProvider + Clone + 'static,
{
    async fn ready(&self) -> Result<(), AppError> {
        self.provider.open().await?;
        Ok(())
    }

    async fn create_project(&self, model: ProjectInsert, token: Option<String>) -> ServiceResult {
        let creator = match token.as_deref() {
            Some(token) => Some(self.authenticate(token).await?.id),
            None => None,
        };
        let project_name = model.project_name.trim().to_string();
        let mut errors = FieldErrors::new();
        if project_name.is_empty() {
            push_error(&mut errors, "projectName", "project name is required".into());
        } else if self.projects.check_valid_by_condition("project_name", project_name.as_str()).await? {
            push_error(&mut errors, "projectName", "project name already exists".into());
        }
        if !self.categories.check_valid_by_condition("id", model.category_id).await? {
            push_error(&mut errors, "categoryId", format!("category {} does not exist", model.category_id));
        }
        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }

        let alias = match model.alias.as_deref().map(str::trim).filter(|a| !a.is_empty()) {
            Some(alias) => alias.to_string(),
            None => slugify(&project_name)?,
        };
        self.projects
            .insert(Project {
                id: 0,
                project_name: project_name.clone(),
                description: model.description,
                category_id: model.category_id,
                alias,
                creator,
                deleted: false,
            })
            .await?;
        // insert hands back the input; read the row again for its generated id
        let conditions = [
            ColumnPair::new("project_name", project_name.as_str()),
            ColumnPair::new("deleted", false),
        ];
        let project = self
            .projects
            .get_single_by_list_condition(&conditions)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("project {}", project_name)))?;
        tracing::info!(project_id = project.id, creator = ?creator, "project created");
        Ok(ResponseEntity::ok(self.summary(project).await?, "Project created"))
    }

    async fn get_project_detail(&self, id: i64, token: &str) -> ServiceResult {
        self.authenticate(token).await?;
        let project = self.live_project(id).await?;
        let conditions = [ColumnPair::new("project_id", id), ColumnPair::new("deleted", false)];
        let tasks = self.tasks.get_multi_by_list_condition_and(&conditions).await?;

        let mut columns: Vec<StatusColumn> = self
            .statuses
            .get_all()
            .await?
            .into_iter()
            .map(StatusColumn::empty)
            .collect();
        for task in tasks {
            let view = self.task_view(task).await?;
            if let Some(column) = columns.iter_mut().find(|c| c.status_id == view.status_id) {
                column.list_task_detail.push(view);
            }
        }
        let creator = self.creator_view(&project).await?;
        let members = self.project_members(project.id).await?;
        Ok(ResponseEntity::ok(
            ProjectDetail::new(project, creator, members, columns),
            "Project detail",
        ))
    }

    async fn get_all_project(&self, keyword: &str) -> ServiceResult {
        let filters = [Filter::new("deleted", false)];
        let mut projects = Vec::new();
        let mut page_index = 1;
        // walk every page; a single page is capped at MAX_PAGE_SIZE rows
        loop {
            let page = self
                .projects
                .get_paging(page_index, MAX_PAGE_SIZE, keyword, &filters)
                .await?;
            let fetched = page.items.len();
            projects.extend(page.items);
            if fetched == 0 || projects.len() as i64 >= page.total_row {
                break;
            }
            page_index += 1;
        }
        let mut items = Vec::with_capacity(projects.len());
        for project in projects {
            items.push(self.summary(project).await?);
        }
        Ok(ResponseEntity::ok(items, "Projects"))
    }

    async fn get_project_paging(
        &self,
        page_index: i64,
        page_size: i64,
        keywords: &str,
        mut filters: Vec<Filter>,
    ) -> ServiceResult {
        self.validate_filters(&filters)?;
        filters.push(Filter::new("deleted", false));
        let page = self
            .projects
            .get_paging(page_index, page_size, keywords, &filters)
            .await?;
        Ok(ResponseEntity::ok(self.summaries(page).await?, "Projects"))
    }

    async fn assign_user_project(&self, model: UserProject, token: &str) -> ServiceResult {
        let user = self.authenticate(token).await?;
        let project = self.live_project(model.project_id).await?;
        Self::require_creator(&project, &user)?;
        let target = self
            .users
            .get_single_by_id(model.user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {}", model.user_id)))?;
        if self.memberships(project.id, target.id).await?.is_empty() {
            self.members
                .insert(ProjectUser {
                    id: 0,
                    project_id: project.id,
                    user_id: target.id,
                })
                .await?;
        }
        Ok(ResponseEntity::ok(MemberView::from(&target), "User added to project"))
    }

    async fn remove_user_from_project(&self, model: UserProject, token: &str) -> ServiceResult {
        let user = self.authenticate(token).await?;
        let project = self.live_project(model.project_id).await?;
        Self::require_creator(&project, &user)?;
        let rows = self.memberships(project.id, model.user_id).await?;
        if rows.is_empty() {
            return Err(AppError::NotFound(format!(
                "user {} in project {}",
                model.user_id, project.id
            )));
        }
        let removed = self.members.delete_by_id(rows.iter().map(|m| m.id)).await?;

        // drop the user's assignments on this project's tasks as well
        let task_ids: Vec<i64> = self
            .tasks
            .get_multi_by_condition("project_id", project.id)
            .await?
            .into_iter()
            .map(|t| t.task_id)
            .collect();
        let assignment_ids: Vec<i64> = self
            .assignees
            .get_multi_by_condition("user_id", model.user_id)
            .await?
            .into_iter()
            .filter(|a| task_ids.contains(&a.task_id))
            .map(|a| a.id)
            .collect();
        if !assignment_ids.is_empty() {
            self.assignees.delete_by_id(assignment_ids).await?;
        }
        Ok(ResponseEntity::ok(json!({ "removed": removed }), "User removed from project"))
    }

    async fn assign_user_task(&self, model: TaskUserRequest, token: &str) -> ServiceResult {
        let (_, task, project) = self.task_for_member(model.task_id, token).await?;
        let ids = self.check_assignees(&project, &[model.user_id]).await?;
        let conditions = [
            ColumnPair::new("task_id", task.task_id),
            ColumnPair::new("user_id", model.user_id),
        ];
        if self.assignees.get_single_by_list_condition(&conditions).await?.is_none() {
            self.assign(task.task_id, &ids).await?;
        }
        Ok(ResponseEntity::ok(self.task_view(task).await?, "User assigned to task"))
    }

    async fn remove_user_from_task(&self, model: TaskUserRequest, token: &str) -> ServiceResult {
        let (_, task, _) = self.task_for_member(model.task_id, token).await?;
        let conditions = [
            ColumnPair::new("task_id", task.task_id),
            ColumnPair::new("user_id", model.user_id),
        ];
        let rows = self.assignees.get_multi_by_list_condition_and(&conditions).await?;
        if rows.is_empty() {
            return Err(AppError::NotFound(format!(
                "user {} on task {}",
                model.user_id, task.task_id
            )));
        }
        self.assignees.delete_by_id(rows.iter().map(|a| a.id)).await?;
        Ok(ResponseEntity::ok(self.task_view(task).await?, "User removed from task"))
    }

    async fn update_status(&self, model: UpdateStatus, token: &str) -> ServiceResult {
        self.task_for_member(model.task_id, token).await?;
        if !self.statuses.check_valid_by_condition("status_id", model.status_id.as_str()).await? {
            return Err(AppError::validation("statusId", format!("status {} does not exist", model.status_id)));
        }
        let patch = TaskPatch {
            task_id: model.task_id,
            status_id: Some(model.status_id),
            ..TaskPatch::default()
        };
        self.patch_task(patch, "Status updated").await
    }

    async fn update_priority(&self, model: UpdatePriority, token: &str) -> ServiceResult {
        self.task_for_member(model.task_id, token).await?;
        if !self.priorities.check_valid_by_condition("priority_id", model.priority_id).await? {
            return Err(AppError::validation(
                "priorityId",
                format!("priority {} does not exist", model.priority_id),
            ));
        }
        let patch = TaskPatch {
            task_id: model.task_id,
            priority_id: Some(model.priority_id),
            ..TaskPatch::default()
        };
        self.patch_task(patch, "Priority updated").await
    }

    async fn update_description(&self, model: UpdateDescription, token: &str) -> ServiceResult {
        self.task_for_member(model.task_id, token).await?;
        let patch = TaskPatch {
            task_id: model.task_id,
            description: Some(model.description),
            ..TaskPatch::default()
        };
        self.patch_task(patch, "Description updated").await
    }

    async fn update_time_tracking(&self, model: TimeTrackingUpdate, token: &str) -> ServiceResult {
        self.task_for_member(model.task_id, token).await?;
        let patch = TaskPatch {
            task_id: model.task_id,
            time_tracking_spent: Some(model.time_tracking_spent),
            time_tracking_remaining: Some(model.time_tracking_remaining),
            ..TaskPatch::default()
        };
        self.patch_task(patch, "Time tracking updated").await
    }

    async fn update_estimate(&self, model: UpdateEstimate, token: &str) -> ServiceResult {
        self.task_for_member(model.task_id, token).await?;
        let patch = TaskPatch {
            task_id: model.task_id,
            original_estimate: Some(model.original_estimate),
            ..TaskPatch::default()
        };
        self.patch_task(patch, "Estimate updated").await
    }

    async fn create_task(&self, model: TaskInsert, token: &str) -> ServiceResult {
        let user = self.authenticate(token).await?;
        let project = self.live_project(model.project_id).await?;
        self.require_member(&project, &user).await?;
        self.check_task_refs(&model.status_id, model.priority_id, model.type_id)
            .await?;
        let task_name = model.task_name.trim().to_string();
        if self.task_name_taken(project.id, &task_name).await?.is_some() {
            return Err(AppError::validation("taskName", "task name already exists in this project"));
        }
        let assignees = self.check_assignees(&project, &model.list_user_asign).await?;

        self.tasks
            .insert(Task {
                task_id: 0,
                task_name: task_name.clone(),
                description: model.description,
                status_id: model.status_id,
                priority_id: model.priority_id,
                type_id: model.type_id,
                project_id: project.id,
                reporter_id: Some(user.id),
                original_estimate: model.original_estimate,
                time_tracking_spent: model.time_tracking_spent,
                time_tracking_remaining: model.time_tracking_remaining,
                deleted: false,
            })
            .await?;
        let task = self
            .task_name_taken(project.id, &task_name)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("task {}", task_name)))?;
        self.assign(task.task_id, &assignees).await?;
        tracing::info!(task_id = task.task_id, project_id = project.id, "task created");
        Ok(ResponseEntity::ok(self.task_view(task).await?, "Task created"))
    }

    async fn update_task(&self, model: TaskEdit, token: &str) -> ServiceResult {
        let (_, task, project) = self.task_for_member(model.task_id, token).await?;
        if model.project_id != task.project_id {
            return Err(AppError::validation(
                "projectId",
                format!("task {} does not belong to project {}", task.task_id, model.project_id),
            ));
        }
        self.check_task_refs(&model.status_id, model.priority_id, model.type_id)
            .await?;
        let task_name = model.task_name.trim().to_string();
        if let Some(other) = self.task_name_taken(project.id, &task_name).await? {
            if other.task_id != task.task_id {
                return Err(AppError::validation("taskName", "task name already exists in this project"));
            }
        }
        let assignees = self.check_assignees(&project, &model.list_user_asign).await?;

        self.task_patches
            .update(
                task.task_id,
                TaskPatch {
                    task_id: task.task_id,
                    task_name: Some(task_name),
                    description: model.description,
                    status_id: Some(model.status_id),
                    priority_id: Some(model.priority_id),
                    type_id: Some(model.type_id),
                    original_estimate: Some(model.original_estimate),
                    time_tracking_spent: Some(model.time_tracking_spent),
                    time_tracking_remaining: Some(model.time_tracking_remaining),
                    deleted: None,
                },
            )
            .await?;
        self.assignees.delete_by_task_id([task.task_id]).await?;
        self.assign(task.task_id, &assignees).await?;

        let task = self.live_task(task.task_id).await?;
        Ok(ResponseEntity::ok(self.task_view(task).await?, "Task updated"))
    }

    async fn remove_task(&self, task_id: i64, token: &str) -> ServiceResult {
        let user = self.authenticate(token).await?;
        let task = self.live_task(task_id).await?;
        let project = self.live_project(task.project_id).await?;
        if task.reporter_id != Some(user.id) && project.creator != Some(user.id) {
            return Err(AppError::Forbidden(format!(
                "only the reporter or the project creator can remove task {}",
                task_id
            )));
        }
        let unassigned = self.assignees.delete_by_task_id([task_id]).await?;
        let removed = self.tasks.delete_by_id([task_id]).await?;
        tracing::info!(task_id, removed, unassigned, "task removed");
        Ok(ResponseEntity::ok(
            json!({ "taskId": task_id, "removed": removed }),
            "Task removed",
        ))
    }

    async fn get_task_detail(&self, task_id: i64, token: &str) -> ServiceResult {
        let (_, task, _) = self.task_for_member(task_id, token).await?;
        Ok(ResponseEntity::ok(self.task_view(task).await?, "Task detail"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_from_project_name() {
        assert_eq!(slugify("  Jira Clone: v2!  ").unwrap(), "jira-clone-v2");
        assert_eq!(slugify("CyberBugs").unwrap(), "cyberbugs");
    }

    #[test]
    fn slug_pattern_is_compiled_once() {
        let first = slug_separator().unwrap();
        let second = slug_separator().unwrap();
        assert!(std::ptr::eq(first, second));
    }
}
