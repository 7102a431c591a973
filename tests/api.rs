//! End-to-end requests through the router over the in-memory backend.

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use projectbase::{app, seed_reference_data, AppState, MemoryProvider, ProjectManager};
use serde_json::{json, Value};
use tower::ServiceExt;

const OWNER: &str = "owner-token";
const MEMBER: &str = "member-token";
const OUTSIDER: &str = "outsider-token";

async fn setup() -> (Router, MemoryProvider) {
    let provider = MemoryProvider::default();
    seed_reference_data(&provider).await.unwrap();
    provider.seed(
        "users",
        [
            json!({"id": 1, "email": "owner@example.com", "name": "Owner", "avatar": null, "phone_number": null, "access_token": OWNER}),
            json!({"id": 2, "email": "member@example.com", "name": "Member", "avatar": null, "phone_number": null, "access_token": MEMBER}),
            json!({"id": 3, "email": "outsider@example.com", "name": "Outsider", "avatar": null, "phone_number": null, "access_token": OUTSIDER}),
        ],
    );
    let router = app(AppState::new(ProjectManager::new(provider.clone())), 1024 * 1024);
    (router, provider)
}

async fn send(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(t) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {}", t));
    }
    let req = match body {
        Some(b) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn create_project(app: &Router, name: &str, category_id: i64) -> Value {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/project/createProjectAuthorize",
        Some(OWNER),
        Some(json!({"projectName": name, "categoryId": category_id, "description": "tracker"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["content"].clone()
}

fn task_body(project_id: i64, name: &str, assignees: &[i64]) -> Value {
    json!({
        "listUserAsign": assignees,
        "taskName": name,
        "description": "build it",
        "statusId": "1",
        "originalEstimate": 8,
        "timeTrackingSpent": 0,
        "timeTrackingRemaining": 8,
        "projectId": project_id,
        "typeId": 1,
        "priorityId": 1
    })
}

#[tokio::test]
async fn invalid_body_yields_field_errors() {
    let (app, _) = setup().await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/project/createProject",
        None,
        Some(json!({"projectName": "", "categoryId": 0})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["statusCode"], 400);
    assert_eq!(body["message"], "Input data is invalid!");
    assert!(body["content"]["projectName"].is_array());
    assert!(body["content"]["categoryId"].is_array());
    assert!(body["dateTime"].is_string());

    let (status, body) = send(&app, Method::POST, "/api/project/createProject", None, Some(json!([1]))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["content"]["body"].is_array());
}

#[tokio::test]
async fn protected_routes_need_a_known_token() {
    let (app, _) = setup().await;
    let (status, body) = send(&app, Method::GET, "/api/project/getProjectDetail?id=1", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["statusCode"], 401);

    let (status, _) = send(&app, Method::GET, "/api/project/getProjectDetail?id=1", Some("nope"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_project_and_read_detail() {
    let (app, _) = setup().await;
    let project = create_project(&app, "Jira Clone", 1).await;
    assert_eq!(project["id"], 1);
    assert_eq!(project["alias"], "jira-clone");
    assert_eq!(project["creator"]["userId"], 1);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/project/createProjectAuthorize",
        Some(OWNER),
        Some(json!({"projectName": "Jira Clone", "categoryId": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["content"]["projectName"].is_array());

    let (status, body) = send(&app, Method::GET, "/api/project/getProjectDetail?id=1", Some(MEMBER), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"]["projectName"], "Jira Clone");
    assert_eq!(body["content"]["lstTask"].as_array().map(Vec::len), Some(4));

    let (status, _) = send(&app, Method::GET, "/api/project/getProjectDetail?id=99", Some(OWNER), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn anonymous_project_has_no_creator_and_unknown_category_is_rejected() {
    let (app, _) = setup().await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/project/createProject",
        None,
        Some(json!({"projectName": "Open Board", "categoryId": 2, "alias": "board"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["content"]["creator"].is_null());
    assert_eq!(body["content"]["alias"], "board");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/project/createProject",
        None,
        Some(json!({"projectName": "Other", "categoryId": 42})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["content"]["categoryId"].is_array());
}

#[tokio::test]
async fn membership_is_managed_by_the_creator() {
    let (app, provider) = setup().await;
    create_project(&app, "Jira Clone", 1).await;

    let assign = json!({"projectId": 1, "userId": 2});
    let (status, _) = send(&app, Method::POST, "/api/project/assignUserProject", Some(OUTSIDER), Some(assign.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, Method::POST, "/api/project/assignUserProject", Some(OWNER), Some(assign.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"]["userId"], 2);
    // assigning twice keeps a single membership
    send(&app, Method::POST, "/api/project/assignUserProject", Some(OWNER), Some(assign.clone())).await;
    assert_eq!(provider.rows("project_user").len(), 1);

    let (status, _) = send(&app, Method::POST, "/api/project/removeUserFromProject", Some(OWNER), Some(assign.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert!(provider.rows("project_user").is_empty());

    let (status, _) = send(&app, Method::POST, "/api/project/removeUserFromProject", Some(OWNER), Some(assign)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn task_lifecycle() {
    let (app, provider) = setup().await;
    create_project(&app, "Jira Clone", 1).await;
    send(
        &app,
        Method::POST,
        "/api/project/assignUserProject",
        Some(OWNER),
        Some(json!({"projectId": 1, "userId": 2})),
    )
    .await;

    let (status, _) = send(&app, Method::POST, "/api/project/createTask", Some(OUTSIDER), Some(task_body(1, "Login", &[]))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, Method::POST, "/api/project/createTask", Some(MEMBER), Some(task_body(1, "Login", &[3]))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["content"]["listUserAsign"].is_array());

    let (status, body) = send(&app, Method::POST, "/api/project/createTask", Some(MEMBER), Some(task_body(1, "Login", &[2]))).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let task = &body["content"];
    assert_eq!(task["taskId"], 1);
    assert_eq!(task["reporterId"], 2);
    assert_eq!(task["priority"]["priority"], "High");
    assert_eq!(task["assigness"][0]["userId"], 2);

    let (status, body) = send(
        &app,
        Method::PUT,
        "/api/project/updateStatus",
        Some(OWNER),
        Some(json!({"taskId": 1, "statusId": "3"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"]["statusId"], "3");
    assert_eq!(body["content"]["originalEstimate"], 8);
    assert_eq!(body["content"]["description"], "build it");

    let (status, _) = send(
        &app,
        Method::PUT,
        "/api/project/updateStatus",
        Some(OWNER),
        Some(json!({"taskId": 1, "statusId": "9"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = send(
        &app,
        Method::PUT,
        "/api/project/updateTimeTracking",
        Some(MEMBER),
        Some(json!({"taskId": 1, "timeTrackingSpent": 3, "timeTrackingRemaining": 5})),
    )
    .await;
    assert_eq!(body["content"]["timeTrackingSpent"], 3);
    assert_eq!(body["content"]["statusId"], "3");

    let (_, body) = send(&app, Method::GET, "/api/project/getProjectDetail?id=1", Some(OWNER), None).await;
    let columns = body["content"]["lstTask"].as_array().cloned().unwrap_or_default();
    assert_eq!(columns[2]["statusId"], "3");
    assert_eq!(columns[2]["listTaskDetail"].as_array().map(Vec::len), Some(1));
    assert_eq!(columns[0]["listTaskDetail"].as_array().map(Vec::len), Some(0));

    let mut edit = task_body(1, "Login page", &[]);
    edit["taskId"] = json!(1);
    let (status, body) = send(&app, Method::POST, "/api/project/updateTask", Some(MEMBER), Some(edit)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"]["taskName"], "Login page");
    assert_eq!(body["content"]["assigness"].as_array().map(Vec::len), Some(0));
    assert!(provider.rows("task_user").is_empty());

    let (status, _) = send(&app, Method::DELETE, "/api/project/removeTask?taskId=1", Some(OUTSIDER), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = send(&app, Method::DELETE, "/api/project/removeTask?taskId=1", Some(MEMBER), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"]["removed"], 1);

    let (status, _) = send(&app, Method::GET, "/api/project/getTaskDetail?taskId=1", Some(OWNER), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(provider.open_connections(), 0);
}

#[tokio::test]
async fn task_assignment_endpoints() {
    let (app, provider) = setup().await;
    create_project(&app, "Jira Clone", 1).await;
    send(&app, Method::POST, "/api/project/createTask", Some(OWNER), Some(task_body(1, "Login", &[]))).await;

    let pair = json!({"taskId": 1, "userId": 2});
    let (status, _) = send(&app, Method::POST, "/api/project/assignUserTask", Some(OWNER), Some(pair.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    send(
        &app,
        Method::POST,
        "/api/project/assignUserProject",
        Some(OWNER),
        Some(json!({"projectId": 1, "userId": 2})),
    )
    .await;
    let (status, body) = send(&app, Method::POST, "/api/project/assignUserTask", Some(OWNER), Some(pair.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"]["assigness"][0]["userId"], 2);
    assert_eq!(provider.rows("task_user").len(), 1);

    let (status, body) = send(&app, Method::POST, "/api/project/removeUserFromTask", Some(MEMBER), Some(pair)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"]["assigness"].as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn listing_and_paging_projects() {
    let (app, _) = setup().await;
    create_project(&app, "Jira Clone", 1).await;
    create_project(&app, "Mobile Banking", 3).await;

    let (status, body) = send(&app, Method::GET, "/api/project/getAllProject?keyword=jira", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"].as_array().map(Vec::len), Some(1));

    let (_, body) = send(&app, Method::GET, "/api/project/getAllProject", None, None).await;
    assert_eq!(body["content"].as_array().map(Vec::len), Some(2));

    let (_, body) = send(&app, Method::GET, "/api/project/getProjectPaging?pageIndex=2&pageSize=1", None, None).await;
    assert_eq!(body["content"]["totalRow"], 2);
    assert_eq!(body["content"]["items"][0]["projectName"], "Mobile Banking");

    // filter=[{"Column":"category_id","Value":3}]
    let uri = "/api/project/getProjectPaging?filter=%5B%7B%22Column%22%3A%22category_id%22%2C%22Value%22%3A3%7D%5D";
    let (_, body) = send(&app, Method::GET, uri, None, None).await;
    assert_eq!(body["content"]["totalRow"], 1);

    let uri = "/api/project/getProjectPaging?filter=%5B%7B%22Column%22%3A%22nope%22%2C%22Value%22%3A3%7D%5D";
    let (status, body) = send(&app, Method::GET, uri, None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["content"]["filter"].is_array());
}

#[tokio::test]
async fn all_projects_spans_every_page() {
    let (app, provider) = setup().await;
    let total = 1005;
    provider.seed(
        "project",
        (1..=total).map(|id| {
            json!({
                "id": id, "project_name": format!("Project {id}"), "description": null, "category_id": 1,
                "alias": format!("project-{id}"), "creator": null, "deleted": id == total
            })
        }),
    );

    let (status, body) = send(&app, Method::GET, "/api/project/getAllProject", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let items = body["content"].as_array().cloned().unwrap_or_default();
    assert_eq!(items.len(), total as usize - 1);
    assert_eq!(items.last().map(|p| p["id"].clone()), Some(json!(total - 1)));
}

#[tokio::test]
async fn huge_page_index_is_an_empty_page() {
    let (app, _) = setup().await;
    create_project(&app, "Jira Clone", 1).await;
    let uri = format!("/api/project/getProjectPaging?pageIndex={}&pageSize=10", i64::MAX);
    let (status, body) = send(&app, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"]["totalRow"], 1);
    assert_eq!(body["content"]["items"].as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn health_ready_version() {
    let (app, _) = setup().await;
    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!((status, body["status"].as_str()), (StatusCode::OK, Some("ok")));
    let (status, _) = send(&app, Method::GET, "/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = send(&app, Method::GET, "/version", None, None).await;
    assert_eq!(body["name"], "projectbase");
}
