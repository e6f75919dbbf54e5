//! In-process mock of the checklist backend.
//!
//! Serves the achievement, progress, auth and admin endpoints from memory
//! on an ephemeral port, and records every batch request so tests can
//! assert on what the client actually sent.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use tidemark_client::api::ChecklistApi;
use tidemark_core::achievement::{Achievement, ProgressRecord};

pub const ADMIN_KEY: &str = "admin-secret";

/// One recorded `POST /api/user-progress/batch`.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedBatch {
    pub nickname: String,
    pub bearer: Option<String>,
    pub updates: Vec<Value>,
}

#[derive(Debug, Clone)]
struct Account {
    id: i64,
    password: Option<String>,
}

#[derive(Default)]
pub struct MockState {
    achievements: Mutex<Vec<Achievement>>,
    progress: Mutex<HashMap<String, Vec<ProgressRecord>>>,
    accounts: Mutex<HashMap<String, Account>>,
    batches: Mutex<Vec<RecordedBatch>>,
    fail_batches: AtomicBool,
}

impl MockState {
    pub fn batches(&self) -> Vec<RecordedBatch> {
        self.batches.lock().unwrap().clone()
    }

    pub fn progress_of(&self, nickname: &str) -> Vec<ProgressRecord> {
        self.progress
            .lock()
            .unwrap()
            .get(nickname)
            .cloned()
            .unwrap_or_default()
    }

    pub fn set_fail_batches(&self, fail: bool) {
        self.fail_batches.store(fail, Ordering::SeqCst);
    }

    /// Nickname-only account from before passwords existed.
    pub fn add_legacy_account(&self, nickname: &str) {
        let mut accounts = self.accounts.lock().unwrap();
        let id = accounts.len() as i64 + 1;
        accounts.insert(nickname.to_string(), Account { id, password: None });
    }
}

pub struct MockBackend {
    pub url: String,
    pub state: Arc<MockState>,
}

impl MockBackend {
    pub fn api(&self) -> ChecklistApi {
        ChecklistApi::with_client(reqwest::Client::new(), self.url.clone())
    }
}

/// Three achievements, the last one legacy.
pub fn sample_achievements() -> Vec<Achievement> {
    vec![
        achievement(1, "Sunken Bell", 20, false),
        achievement(2, "Ghost Lantern", 30, false),
        achievement(3, "Old Compass", 10, true),
    ]
}

pub fn achievement(id: i64, name: &str, point: i32, is_legacy: bool) -> Achievement {
    Achievement {
        id,
        name: name.to_string(),
        content: format!("Find the {name}"),
        point,
        discord_url: None,
        is_legacy,
    }
}

/// Start the mock on `127.0.0.1:0` seeded with [`sample_achievements`].
pub async fn spawn_backend() -> MockBackend {
    let state = Arc::new(MockState::default());
    *state.achievements.lock().unwrap() = sample_achievements();

    let app = Router::new()
        .route("/api/achievements", get(list_achievements))
        .route("/api/user-progress", get(get_progress))
        .route("/api/user-progress/batch", post(batch_update))
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/set-password", post(set_password))
        .route("/api/auth/me", get(me))
        .route("/api/admin/verify", post(admin_verify))
        .route("/api/admin/achievements", post(admin_create))
        .route(
            "/api/admin/achievements/{id}",
            patch(admin_update).delete(admin_delete),
        )
        .with_state(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("mock backend");
    });

    MockBackend {
        url: format!("http://{addr}"),
        state,
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

type Shared = State<Arc<MockState>>;

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

fn token_for(nickname: &str) -> String {
    format!("token-{nickname}")
}

async fn list_achievements(State(state): Shared) -> Json<Vec<Achievement>> {
    Json(state.achievements.lock().unwrap().clone())
}

async fn get_progress(
    State(state): Shared,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Vec<ProgressRecord>> {
    let nickname = query.get("nickname").cloned().unwrap_or_default();
    Json(state.progress_of(&nickname))
}

async fn batch_update(State(state): Shared, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let nickname = body["nickname"].as_str().unwrap_or_default().to_string();
    let updates = body["updates"].as_array().cloned().unwrap_or_default();
    state.batches.lock().unwrap().push(RecordedBatch {
        nickname: nickname.clone(),
        bearer: bearer(&headers),
        updates: updates.clone(),
    });

    if state.fail_batches.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "database unavailable").into_response();
    }

    let mut progress = state.progress.lock().unwrap();
    let rows = progress.entry(nickname).or_default();
    for update in &updates {
        let achievement_id = update["achievementId"].as_i64().unwrap_or_default();
        let is_completed = update["isCompleted"].as_bool().unwrap_or_default();
        match rows.iter_mut().find(|r| r.achievement_id == achievement_id) {
            Some(row) => row.is_completed = is_completed,
            None => {
                let id = Some(100 + rows.len() as i64);
                rows.push(ProgressRecord {
                    id,
                    achievement_id,
                    is_completed,
                });
            }
        }
    }

    Json(json!({ "result": { "updated": updates.len() } })).into_response()
}

#[derive(Deserialize)]
struct CredentialsBody {
    nickname: String,
    password: String,
}

fn grant(nickname: &str, id: i64) -> Response {
    Json(json!({
        "success": true,
        "result": {
            "token": token_for(nickname),
            "user": { "id": id, "nickname": nickname },
        },
    }))
    .into_response()
}

fn reject(status: StatusCode, code: &str, message: &str) -> Response {
    (
        status,
        Json(json!({ "success": false, "error": code, "message": message })),
    )
        .into_response()
}

async fn register(State(state): Shared, Json(body): Json<CredentialsBody>) -> Response {
    let mut accounts = state.accounts.lock().unwrap();
    if accounts.contains_key(&body.nickname) {
        return reject(StatusCode::CONFLICT, "NICKNAME_TAKEN", "Nickname is already in use");
    }
    let id = accounts.len() as i64 + 1;
    accounts.insert(
        body.nickname.clone(),
        Account {
            id,
            password: Some(body.password),
        },
    );
    grant(&body.nickname, id)
}

async fn login(State(state): Shared, Json(body): Json<CredentialsBody>) -> Response {
    let accounts = state.accounts.lock().unwrap();
    match accounts.get(&body.nickname) {
        None => reject(StatusCode::NOT_FOUND, "NICKNAME_NOT_FOUND", "No such nickname"),
        Some(Account { password: None, .. }) => {
            reject(StatusCode::BAD_REQUEST, "PASSWORD_NOT_SET", "Set a password first")
        }
        Some(Account {
            password: Some(password),
            ..
        }) if *password != body.password => {
            reject(StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS", "Wrong password")
        }
        Some(account) => grant(&body.nickname, account.id),
    }
}

async fn set_password(State(state): Shared, Json(body): Json<CredentialsBody>) -> Response {
    let mut accounts = state.accounts.lock().unwrap();
    match accounts.get_mut(&body.nickname) {
        None => reject(StatusCode::NOT_FOUND, "NICKNAME_NOT_FOUND", "No such nickname"),
        Some(Account {
            password: Some(_), ..
        }) => reject(
            StatusCode::BAD_REQUEST,
            "PASSWORD_ALREADY_SET",
            "Password already set",
        ),
        Some(account) => {
            account.password = Some(body.password);
            grant(&body.nickname, account.id)
        }
    }
}

async fn me(State(state): Shared, headers: HeaderMap) -> Response {
    let accounts = state.accounts.lock().unwrap();
    let found = bearer(&headers).and_then(|token| {
        accounts
            .iter()
            .find(|(nickname, _)| token_for(nickname) == token)
            .map(|(nickname, account)| (nickname.clone(), account.id))
    });
    match found {
        Some((nickname, id)) => Json(json!({
            "success": true,
            "result": { "user": { "id": id, "nickname": nickname } },
        }))
        .into_response(),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "success": false, "message": "Invalid token" })),
        )
            .into_response(),
    }
}

fn admin_guard(headers: &HeaderMap) -> Result<(), Response> {
    if bearer(headers).as_deref() == Some(ADMIN_KEY) {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, Json(json!({ "error": "Unauthorized" }))).into_response())
    }
}

async fn admin_verify(headers: HeaderMap) -> Response {
    match admin_guard(&headers) {
        Ok(()) => Json(json!({ "valid": true })).into_response(),
        Err(response) => response,
    }
}

async fn admin_create(State(state): Shared, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if let Err(response) = admin_guard(&headers) {
        return response;
    }
    let mut achievements = state.achievements.lock().unwrap();
    let id = achievements.iter().map(|a| a.id).max().unwrap_or(0) + 1;
    let created = Achievement {
        id,
        name: body["name"].as_str().unwrap_or_default().to_string(),
        content: body["content"].as_str().unwrap_or_default().to_string(),
        point: body["point"].as_i64().unwrap_or(20) as i32,
        discord_url: body["discord_url"].as_str().map(str::to_string),
        is_legacy: body["is_legacy"].as_bool().unwrap_or(false),
    };
    achievements.push(created.clone());
    (StatusCode::CREATED, Json(created)).into_response()
}

async fn admin_update(
    State(state): Shared,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(response) = admin_guard(&headers) {
        return response;
    }
    let mut achievements = state.achievements.lock().unwrap();
    let Some(existing) = achievements.iter_mut().find(|a| a.id == id) else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Achievement not found" })),
        )
            .into_response();
    };
    if let Some(name) = body["name"].as_str() {
        existing.name = name.to_string();
    }
    if let Some(content) = body["content"].as_str() {
        existing.content = content.to_string();
    }
    if let Some(point) = body["point"].as_i64() {
        existing.point = point as i32;
    }
    if let Some(url) = body.get("discord_url") {
        existing.discord_url = url.as_str().map(str::to_string);
    }
    if let Some(is_legacy) = body["is_legacy"].as_bool() {
        existing.is_legacy = is_legacy;
    }
    Json(existing.clone()).into_response()
}

async fn admin_delete(State(state): Shared, Path(id): Path<i64>, headers: HeaderMap) -> Response {
    if let Err(response) = admin_guard(&headers) {
        return response;
    }
    let mut achievements = state.achievements.lock().unwrap();
    let before = achievements.len();
    achievements.retain(|a| a.id != id);
    if achievements.len() == before {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Achievement not found" })),
        )
            .into_response();
    }
    Json(json!({ "success": true })).into_response()
}
