//! End-to-end tests against the full router and an in-memory store.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use cairn_core::auth::hash_password;
use cairn_core::config::Config;
use cairn_core::model::{NewUser, Role};
use cairn_core::store::{InMemoryStore, UserStore};
use cairn_server::{AppState, router};
use serde_json::{Value, json};
use tower::ServiceExt;

struct TestApp {
    router: Router,
    state: AppState,
    store: Arc<InMemoryStore>,
}

impl TestApp {
    fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let state = AppState::new(store.clone(), &Config::default());
        let router = router(state.clone());
        Self { router, state, store }
    }

    async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(token), None).await
    }

    async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    async fn put(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, Some(token), Some(body)).await
    }

    async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, Some(token), None).await
    }

    /// Registers a user through the API and returns (token, user id).
    async fn signup(&self, email: &str, name: &str) -> (String, String) {
        let (status, _) = self
            .request(
                Method::POST,
                "/auth/register",
                None,
                Some(json!({"email": email, "name": name, "password": "correct-horse"})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        self.login(email).await
    }

    /// Seeds an admin directly in the store (registration never grants the
    /// role) and returns (token, user id).
    async fn seed_admin(&self, email: &str) -> (String, String) {
        self.store
            .insert_user(NewUser {
                email: email.to_string(),
                name: "Admin".to_string(),
                password_hash: hash_password("correct-horse").unwrap(),
                role: Role::Admin,
            })
            .unwrap();
        self.login(email).await
    }

    async fn login(&self, email: &str) -> (String, String) {
        let (status, body) = self
            .request(
                Method::POST,
                "/auth/login",
                None,
                Some(json!({"email": email, "password": "correct-horse"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        let token = body["data"]["token"].as_str().unwrap().to_string();
        let user_id = body["data"]["user"]["id"].as_str().unwrap().to_string();
        (token, user_id)
    }

    async fn create_project(&self, token: &str, name: &str) -> String {
        let (status, body) = self.post("/projects", token, json!({"name": name})).await;
        assert_eq!(status, StatusCode::CREATED);
        body["data"]["id"].as_str().unwrap().to_string()
    }

    async fn create_task(&self, token: &str, project: &str, title: &str) -> String {
        let (status, body) = self
            .post("/tasks", token, json!({"title": title, "project": project}))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["data"]["id"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn test_health_is_enveloped_and_open() {
    let app = TestApp::new();
    let (status, body) = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "ok");
}

#[tokio::test]
async fn test_register_hides_password_hash() {
    let app = TestApp::new();
    let (status, body) = app
        .request(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({"email": "a@x.dev", "name": "A", "password": "correct-horse"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["role"], "user");
    assert!(body["data"].get("passwordHash").is_none());
    assert!(body["data"].get("password").is_none());
}

#[tokio::test]
async fn test_login_failures_are_uniform() {
    let app = TestApp::new();
    app.signup("a@x.dev", "A").await;

    let (status, unknown) = app
        .request(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({"email": "nobody@x.dev", "password": "correct-horse"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, wrong) = app
        .request(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({"email": "a@x.dev", "password": "wrong-password"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Unknown email and bad password must be indistinguishable.
    assert_eq!(unknown["message"], wrong["message"]);
    assert_eq!(unknown["success"], false);
}

#[tokio::test]
async fn test_missing_and_garbage_tokens_are_401() {
    let app = TestApp::new();
    let (status, body) = app.request(Method::GET, "/projects", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, _) = app.get("/projects", "not-a-jwt").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_duplicate_email_is_validation_error() {
    let app = TestApp::new();
    app.signup("a@x.dev", "A").await;
    let (status, body) = app
        .request(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({"email": "A@X.DEV", "name": "B", "password": "correct-horse"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_project_creator_is_manager_and_sole_member() {
    let app = TestApp::new();
    let (token, user_id) = app.signup("m@x.dev", "Mgr").await;
    let (status, body) = app.post("/projects", &token, json!({"name": "Apollo"})).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["manager"], user_id.as_str());
    assert_eq!(body["data"]["members"], json!([user_id]));
    assert_eq!(body["data"]["status"], "active");
}

#[tokio::test]
async fn test_project_detail_includes_task_stats() {
    let app = TestApp::new();
    let (token, _) = app.signup("m@x.dev", "Mgr").await;
    let project = app.create_project(&token, "Apollo").await;
    let t1 = app.create_task(&token, &project, "one").await;
    app.create_task(&token, &project, "two").await;
    let (status, _) = app
        .put(&format!("/tasks/{t1}"), &token, json!({"status": "review"}))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.get(&format!("/projects/{project}"), &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["project"]["id"], project.as_str());
    assert_eq!(body["data"]["taskStats"]["todo"], 1);
    assert_eq!(body["data"]["taskStats"]["review"], 1);
}

#[tokio::test]
async fn test_project_scope_excludes_outsiders_and_admins() {
    let app = TestApp::new();
    let (manager, _) = app.signup("m@x.dev", "Mgr").await;
    let (outsider, _) = app.signup("o@x.dev", "Out").await;
    let (admin, _) = app.seed_admin("root@x.dev").await;
    let project = app.create_project(&manager, "Apollo").await;

    let (status, body) = app.get(&format!("/projects/{project}"), &outsider).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);

    // Admin role grants privileged mutations, not read scope.
    let (status, _) = app.get(&format!("/projects/{project}"), &admin).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_project_update_is_privileged() {
    let app = TestApp::new();
    let (manager, _) = app.signup("m@x.dev", "Mgr").await;
    let (member, member_id) = app.signup("w@x.dev", "Member").await;
    let (admin, _) = app.seed_admin("root@x.dev").await;
    let project = app.create_project(&manager, "Apollo").await;
    app.post(
        &format!("/projects/{project}/members"),
        &manager,
        json!({"memberId": member_id}),
    )
    .await;

    // A plain member may read but not reshape the project.
    let (status, _) = app
        .put(&format!("/projects/{project}"), &member, json!({"name": "Hijack"}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .put(&format!("/projects/{project}"), &manager, json!({"name": "Artemis"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Artemis");

    // Admin passes the privileged gate without being in the project.
    let (status, _) = app
        .put(&format!("/projects/{project}"), &admin, json!({"status": "on-hold"}))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_member_management_rules() {
    let app = TestApp::new();
    let (manager, _) = app.signup("m@x.dev", "Mgr").await;
    let (_, member_id) = app.signup("w@x.dev", "Member").await;
    let project = app.create_project(&manager, "Apollo").await;
    let members_uri = format!("/projects/{project}/members");

    let (status, body) = app
        .post(&members_uri, &manager, json!({"memberId": member_id}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["members"].as_array().unwrap().len(), 2);

    // Adding twice is a validation error, not a silent no-op.
    let (status, _) = app
        .post(&members_uri, &manager, json!({"memberId": member_id}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Removing someone who is not a member succeeds anyway.
    let stranger = uuid::Uuid::new_v4();
    let (status, _) = app
        .request(
            Method::DELETE,
            &members_uri,
            Some(&manager),
            Some(json!({"memberId": stranger})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_task_update_open_to_members_delete_is_not() {
    let app = TestApp::new();
    let (manager, _) = app.signup("m@x.dev", "Mgr").await;
    let (member, member_id) = app.signup("w@x.dev", "Member").await;
    let project = app.create_project(&manager, "Apollo").await;
    app.post(
        &format!("/projects/{project}/members"),
        &manager,
        json!({"memberId": member_id}),
    )
    .await;
    let task = app.create_task(&manager, &project, "wire it").await;

    // Members coordinate by editing tasks.
    let (status, body) = app
        .put(&format!("/tasks/{task}"), &member, json!({"status": "in-progress"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "in-progress");

    // But only the manager (or an admin) may delete one.
    let (status, _) = app.delete(&format!("/tasks/{task}"), &member).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.delete(&format!("/tasks/{task}"), &manager).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get(&format!("/tasks/{task}"), &manager).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_null_assignee_unassigns_absent_leaves_alone() {
    let app = TestApp::new();
    let (manager, manager_id) = app.signup("m@x.dev", "Mgr").await;
    let project = app.create_project(&manager, "Apollo").await;
    let (status, body) = app
        .post(
            "/tasks",
            &manager,
            json!({"title": "wire it", "project": project, "assignedTo": manager_id}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let task = body["data"]["id"].as_str().unwrap().to_string();

    // An unrelated patch leaves the assignment alone.
    let (_, body) = app
        .put(&format!("/tasks/{task}"), &manager, json!({"priority": "high"}))
        .await;
    assert_eq!(body["data"]["assignedTo"], manager_id.as_str());

    // An explicit null unassigns.
    let (_, body) = app
        .put(&format!("/tasks/{task}"), &manager, json!({"assignedTo": null}))
        .await;
    assert_eq!(body["data"]["assignedTo"], Value::Null);
}

#[tokio::test]
async fn test_task_patch_rejects_unknown_and_immutable_fields() {
    let app = TestApp::new();
    let (manager, _) = app.signup("m@x.dev", "Mgr").await;
    let project = app.create_project(&manager, "Apollo").await;
    let task = app.create_task(&manager, &project, "wire it").await;

    let (status, _) = app
        .put(
            &format!("/tasks/{task}"),
            &manager,
            json!({"project": uuid::Uuid::new_v4()}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .put(&format!("/tasks/{task}"), &manager, json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unscoped_task_list_spans_projects() {
    let app = TestApp::new();
    let (alice, _) = app.signup("a@x.dev", "Alice").await;
    let (bob, _) = app.signup("b@x.dev", "Bob").await;
    let pa = app.create_project(&alice, "Alpha").await;
    let pb = app.create_project(&bob, "Beta").await;
    app.create_task(&alice, &pa, "alpha work").await;
    app.create_task(&bob, &pb, "beta work").await;

    // Without a projectId filter the listing is not narrowed to the caller.
    let (status, body) = app.get("/tasks", &alice).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], 2);

    // With one, scope applies.
    let (status, _) = app.get(&format!("/tasks?project={pb}"), &alice).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = app.get(&format!("/tasks?project={pb}"), &bob).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], 1);
}

#[tokio::test]
async fn test_pagination_math_and_beyond_end_page() {
    let app = TestApp::new();
    let (token, _) = app.signup("m@x.dev", "Mgr").await;
    let project = app.create_project(&token, "Apollo").await;
    for i in 0..5 {
        app.create_task(&token, &project, &format!("task {i}")).await;
    }

    let (status, body) = app
        .get(&format!("/tasks?project={project}&limit=2"), &token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert_eq!(body["pagination"]["total"], 5);
    assert_eq!(body["pagination"]["pages"], 3);

    // A page beyond the end is an empty success, not an error.
    let (status, body) = app
        .get(&format!("/tasks?project={project}&limit=2&page=9"), &token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(body["data"].as_array().unwrap().is_empty());
    assert_eq!(body["pagination"]["pages"], 3);
}

#[tokio::test]
async fn test_comment_mutation_follows_authorship() {
    let app = TestApp::new();
    let (manager, _) = app.signup("m@x.dev", "Mgr").await;
    let (member, member_id) = app.signup("w@x.dev", "Member").await;
    let (admin, _) = app.seed_admin("root@x.dev").await;
    let project = app.create_project(&manager, "Apollo").await;
    app.post(
        &format!("/projects/{project}/members"),
        &manager,
        json!({"memberId": member_id}),
    )
    .await;
    let task = app.create_task(&manager, &project, "wire it").await;

    let (status, body) = app
        .post("/comments", &member, json!({"content": "on it", "task": task}))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let comment = body["data"]["id"].as_str().unwrap().to_string();

    // Managing the project does not grant edit rights over the comment.
    let (status, _) = app
        .put(&format!("/comments/{comment}"), &manager, json!({"content": "edited"}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // The author and a global admin may edit.
    let (status, body) = app
        .put(&format!("/comments/{comment}"), &member, json!({"content": "done"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["content"], "done");

    let (status, _) = app.delete(&format!("/comments/{comment}"), &admin).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_comment_mutation_needs_no_project_scope() {
    let app = TestApp::new();
    let (manager, _) = app.signup("m@x.dev", "Mgr").await;
    let (member, member_id) = app.signup("w@x.dev", "Member").await;
    let (admin, _) = app.seed_admin("root@x.dev").await;
    let project = app.create_project(&manager, "Apollo").await;
    app.post(
        &format!("/projects/{project}/members"),
        &manager,
        json!({"memberId": member_id}),
    )
    .await;
    let task = app.create_task(&manager, &project, "wire it").await;
    let (_, body) = app
        .post("/comments", &member, json!({"content": "on it", "task": task}))
        .await;
    let comment = body["data"]["id"].as_str().unwrap().to_string();

    // An admin outside the project's membership passes the authorship
    // gate; authorship-or-admin is the whole check.
    let (status, body) = app
        .put(&format!("/comments/{comment}"), &admin, json!({"content": "moderated"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["content"], "moderated");

    // The author keeps edit rights even after leaving the project.
    app.request(
        Method::DELETE,
        &format!("/projects/{project}/members"),
        Some(&manager),
        Some(json!({"memberId": member_id})),
    )
    .await;
    let (status, _) = app.delete(&format!("/comments/{comment}"), &member).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_project_delete_cascades_tasks_but_not_comments() {
    let app = TestApp::new();
    let (manager, _) = app.signup("m@x.dev", "Mgr").await;
    let project = app.create_project(&manager, "Apollo").await;
    let task = app.create_task(&manager, &project, "wire it").await;
    let (_, body) = app
        .post("/comments", &manager, json!({"content": "note", "task": task}))
        .await;
    let comment = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = app.delete(&format!("/projects/{project}"), &manager).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get(&format!("/tasks/{task}"), &manager).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The comment survives as an orphan; its author can still delete it.
    let (status, _) = app.delete(&format!("/comments/{comment}"), &manager).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_every_mutation_appends_one_activity_record() {
    let app = TestApp::new();
    let (manager, _) = app.signup("m@x.dev", "Mgr").await;
    let project = app.create_project(&manager, "Apollo").await;
    let task = app.create_task(&manager, &project, "wire it").await;
    app.put(&format!("/tasks/{task}"), &manager, json!({"status": "review"}))
        .await;
    app.put(
        &format!("/tasks/{task}"),
        &manager,
        json!({"description": "notes"}),
    )
    .await;
    app.post("/comments", &manager, json!({"content": "note", "task": task}))
        .await;

    app.state.recorder.flush().await;

    let (status, body) = app
        .get(&format!("/activity/project/{project}?limit=50"), &manager)
        .await;
    assert_eq!(status, StatusCode::OK);
    let records = body["data"].as_array().unwrap();
    assert_eq!(records.len(), 5);

    // Default sort is newest first, so the feed reads back in reverse
    // mutation order.
    let actions: Vec<&str> = records
        .iter()
        .map(|r| r["action"].as_str().unwrap())
        .collect();
    assert_eq!(
        actions,
        vec!["comment", "update", "status-change", "create", "create"]
    );

    let timestamps: Vec<&str> = records
        .iter()
        .map(|r| r["createdAt"].as_str().unwrap())
        .collect();
    let mut sorted = timestamps.clone();
    sorted.sort_by(|a, b| b.cmp(a));
    assert_eq!(timestamps, sorted);
}

#[tokio::test]
async fn test_status_change_record_carries_snapshots() {
    let app = TestApp::new();
    let (manager, _) = app.signup("m@x.dev", "Mgr").await;
    let project = app.create_project(&manager, "Apollo").await;
    let task = app.create_task(&manager, &project, "wire it").await;
    app.put(&format!("/tasks/{task}"), &manager, json!({"status": "review"}))
        .await;
    app.state.recorder.flush().await;

    let (_, body) = app
        .get(&format!("/activity/project/{project}?limit=50"), &manager)
        .await;
    let record = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["action"] == "status-change")
        .unwrap();
    assert_eq!(record["oldValues"]["status"], "todo");
    assert_eq!(record["newValues"]["status"], "review");
    assert_eq!(record["entityType"], "task");
}

#[tokio::test]
async fn test_activity_feed_is_scope_checked() {
    let app = TestApp::new();
    let (manager, _) = app.signup("m@x.dev", "Mgr").await;
    let (outsider, _) = app.signup("o@x.dev", "Out").await;
    let project = app.create_project(&manager, "Apollo").await;

    let (status, _) = app
        .get(&format!("/activity/project/{project}"), &outsider)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .get(&format!("/activity?projectId={project}"), &outsider)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_malformed_path_id_is_400_not_404() {
    let app = TestApp::new();
    let (token, _) = app.signup("m@x.dev", "Mgr").await;
    let (status, body) = app.get("/projects/not-a-uuid", &token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_missing_resource_is_404_with_entity_name() {
    let app = TestApp::new();
    let (token, _) = app.signup("m@x.dev", "Mgr").await;
    let missing = uuid::Uuid::new_v4();
    let (status, body) = app.get(&format!("/projects/{missing}"), &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "project not found");
}
