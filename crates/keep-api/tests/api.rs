use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use keep_api::auth::{AppStateInner, create_token, hash_password};
use keep_db::Database;
use keep_reminders::push::PushHub;
use keep_types::models::{Role, User};

const SECRET: &str = "test-secret";

struct TestApp {
    app: Router,
    db: Arc<Database>,
}

impl TestApp {
    fn new() -> Self {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let state = Arc::new(AppStateInner {
            db: db.clone(),
            jwt_secret: SECRET.into(),
            push: PushHub::new(),
        });
        Self {
            app: keep_api::router(state),
            db,
        }
    }

    /// Creates an account and returns a bearer token for it.
    fn user(&self, username: &str, role: Role) -> (Uuid, String) {
        let id = Uuid::new_v4();
        self.db.create_user(id, username, "unused", role).unwrap();
        let user = User {
            id,
            username: username.into(),
            role,
            created_at: Utc::now(),
        };
        (id, create_token(SECRET, &user).unwrap())
    }

    async fn call(&self, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let req = match body {
            Some(body) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };

        let resp = self.app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }
}

#[tokio::test]
async fn missing_or_bad_token_is_unauthenticated() {
    let t = TestApp::new();

    let (status, _) = t.call("GET", "/notes", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = t.call("GET", "/notes", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn note_lifecycle_over_http() {
    let t = TestApp::new();
    let (_, token) = t.user("u1", Role::User);
    let tok = Some(token.as_str());

    let (status, note) = t
        .call("POST", "/notes", tok, Some(json!({ "title": "Milk" })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(note["state"], "active");
    assert_eq!(note["color"], "#ffffff");
    let id = note["id"].as_i64().unwrap();

    let (status, _) = t.call("DELETE", &format!("/notes/{id}"), tok, None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, trashed) = t.call("POST", &format!("/notes/{id}/trash"), tok, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(trashed["state"], "trashed");

    let (_, trash) = t.call("GET", "/notes?filter=trash", tok, None).await;
    assert_eq!(trash.as_array().unwrap().len(), 1);
    let (_, default) = t.call("GET", "/notes", tok, None).await;
    assert!(default.as_array().unwrap().is_empty());

    let (status, _) = t.call("DELETE", &format!("/notes/{id}"), tok, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = t.call("GET", &format!("/notes/{id}"), tok, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not found");
}

#[tokio::test]
async fn empty_note_is_rejected() {
    let t = TestApp::new();
    let (_, token) = t.user("u1", Role::User);

    let (status, body) = t
        .call("POST", "/notes", Some(&token), Some(json!({ "color": "#fff475" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("title or content"));
}

#[tokio::test]
async fn other_users_notes_are_invisible() {
    let t = TestApp::new();
    let (_, owner) = t.user("owner", Role::User);
    let (_, admin) = t.user("boss", Role::Admin);

    let (_, note) = t
        .call("POST", "/notes", Some(&owner), Some(json!({ "title": "secret" })))
        .await;
    let id = note["id"].as_i64().unwrap();

    for (method, path) in [
        ("GET", format!("/notes/{id}")),
        ("POST", format!("/notes/{id}/archive")),
        ("POST", format!("/notes/{id}/trash")),
        ("DELETE", format!("/notes/{id}")),
    ] {
        let (status, _) = t.call(method, &path, Some(&admin), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{method} {path}");
    }

    let (status, _) = t
        .call("PUT", &format!("/notes/{id}"), Some(&admin), Some(json!({ "title": "mine" })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, fetched) = t.call("GET", &format!("/notes/{id}"), Some(&owner), None).await;
    assert_eq!(fetched["title"], "secret");
}

#[tokio::test]
async fn title_only_update_keeps_reminder_until_cleared() {
    let t = TestApp::new();
    let (_, token) = t.user("u1", Role::User);
    let tok = Some(token.as_str());
    let reminder = Utc::now() + Duration::hours(3);

    let (_, note) = t
        .call(
            "POST",
            "/notes",
            tok,
            Some(json!({
                "title": "Old",
                "content": "body",
                "color": "#aecbfa",
                "reminder_at": reminder,
            })),
        )
        .await;
    let id = note["id"].as_i64().unwrap();

    let (_, listed) = t.call("GET", "/notes?filter=reminders", tok, None).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, updated) = t
        .call(
            "PUT",
            &format!("/notes/{id}"),
            tok,
            Some(json!({ "title": "New" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "New");
    assert_eq!(updated["content"], "body");
    assert_eq!(updated["color"], "#aecbfa");
    assert_eq!(updated["reminder_at"], note["reminder_at"]);

    let (_, cleared) = t
        .call("PUT", &format!("/notes/{id}"), tok, Some(json!({ "reminder_at": null })))
        .await;
    assert_eq!(cleared["title"], "New");
    assert_eq!(cleared["reminder_at"], Value::Null);

    let (_, listed) = t.call("GET", "/notes?filter=reminders", tok, None).await;
    assert!(listed.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn archive_twice_conflicts() {
    let t = TestApp::new();
    let (_, token) = t.user("u1", Role::User);
    let tok = Some(token.as_str());

    let (_, note) = t.call("POST", "/notes", tok, Some(json!({ "content": "x" }))).await;
    let id = note["id"].as_i64().unwrap();

    let (status, _) = t.call("POST", &format!("/notes/{id}/archive"), tok, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = t.call("POST", &format!("/notes/{id}/archive"), tok, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "cannot archive a note that is archived");

    let (_, archived) = t.call("GET", "/notes?filter=archived", tok, None).await;
    assert_eq!(archived.as_array().unwrap().len(), 1);

    let (status, back) = t.call("POST", &format!("/notes/{id}/unarchive"), tok, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(back["state"], "active");
}

#[tokio::test]
async fn unknown_filter_falls_back_to_default() {
    let t = TestApp::new();
    let (_, token) = t.user("u1", Role::User);

    t.call("POST", "/notes", Some(&token), Some(json!({ "title": "a" }))).await;
    let (status, listed) = t.call("GET", "/notes?filter=everything", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn account_management_requires_admin() {
    let t = TestApp::new();
    let (user_id, user) = t.user("plain", Role::User);
    let (_, admin) = t.user("root", Role::Admin);

    let (status, _) = t.call("GET", "/users", Some(&user), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, users) = t.call("GET", "/users", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(users.as_array().unwrap().len(), 2);

    let (status, _) = t
        .call("POST", "/users", Some(&admin), Some(json!({ "username": "plain", "password": "secret1" })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = t
        .call("POST", "/users", Some(&admin), Some(json!({ "username": "x", "password": "secret1" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let other = Uuid::new_v4();
    let (status, _) = t
        .call("PUT", &format!("/users/{other}/password"), Some(&user), Some(json!({ "password": "secret1" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = t.call("DELETE", &format!("/users/{user_id}"), Some(&admin), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn login_issues_working_token() {
    let t = TestApp::new();
    let hash = hash_password("admin123").unwrap();
    t.db.create_user(Uuid::new_v4(), "admin", &hash, Role::Admin).unwrap();

    let (status, _) = t
        .call("POST", "/auth/login", None, Some(json!({ "username": "admin", "password": "nope" })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = t
        .call("POST", "/auth/login", None, Some(json!({ "username": "ghost", "password": "admin123" })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = t
        .call("POST", "/auth/login", None, Some(json!({ "username": "admin", "password": "admin123" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["role"], "admin");

    let token = body["token"].as_str().unwrap();
    let (status, _) = t.call("GET", "/users", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn notifications_stream_requires_token() {
    let t = TestApp::new();
    let (_, token) = t.user("u1", Role::User);

    let (status, body) = t.call("GET", "/notifications", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, _) = t.call("GET", "/notifications?token=garbage", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Authenticated, but not a WebSocket handshake
    let (status, _) = t
        .call("GET", &format!("/notifications?token={token}"), None, None)
        .await;
    assert!(status.is_client_error());
    assert_ne!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn deleted_account_cannot_create_notes() {
    let t = TestApp::new();
    let (id, token) = t.user("gone", Role::User);
    t.db.delete_user(id).unwrap();

    let (status, _) = t
        .call("POST", "/notes", Some(&token), Some(json!({ "title": "orphan" })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
