//! In-process stand-in for the remote API, served on an ephemeral port.

use crate::types::{
    AuthResponse, CreateBoardRequest, CreateWorkspaceRequest, GoogleLoginRequest, InviteRequest,
    LoginRequest, RegisterRequest, RemoteBoard, RemoteWorkspace, UserProfile,
};
use axum::{
    extract::{Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

pub const TOKEN: &str = "tok-123";
pub const PASSWORD: &str = "secret";
pub const OTP: &str = "123456";

#[derive(Debug)]
pub struct FakeApi {
    pub workspaces: Mutex<Vec<RemoteWorkspace>>,
    pub boards: Mutex<Vec<RemoteBoard>>,
    pub invites: Mutex<Vec<InviteRequest>>,
    /// Make every create answer 500.
    pub fail_writes: AtomicBool,
    next_id: AtomicI64,
}

impl Default for FakeApi {
    fn default() -> Self {
        Self {
            workspaces: Mutex::default(),
            boards: Mutex::default(),
            invites: Mutex::default(),
            fail_writes: AtomicBool::new(false),
            next_id: AtomicI64::new(100),
        }
    }
}

impl FakeApi {
    fn id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    pub fn add_workspace(&self, name: &str) -> RemoteWorkspace {
        let ws = RemoteWorkspace {
            id: self.id(),
            name: name.to_string(),
        };
        self.workspaces.lock().unwrap().push(ws.clone());
        ws
    }

    fn has_workspace(&self, id: i64) -> bool {
        self.workspaces.lock().unwrap().iter().any(|w| w.id == id)
    }
}

/// Start the fake API, returning its base URL (ending in `/api`).
pub async fn spawn() -> (String, Arc<FakeApi>) {
    let api = Arc::new(FakeApi::default());
    let app = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/register", post(register))
        .route("/api/auth/send-otp", post(send_otp))
        .route("/api/auth/verify-otp", post(verify_otp))
        .route("/api/auth/google", post(google))
        .route("/api/users/me", get(me))
        .route("/api/workspaces", post(create_workspace).get(list_workspaces))
        .route("/api/workspaces/invite", post(invite))
        .route("/api/workspaces/{id}", delete(delete_workspace))
        .route("/api/boards", post(create_board))
        .route("/api/boards/{workspace_id}", get(list_boards))
        .with_state(Arc::clone(&api));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}/api"), api)
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {TOKEN}"))
}

fn text(status: StatusCode, body: &str) -> Response {
    (status, body.to_string()).into_response()
}

async fn login(Json(req): Json<LoginRequest>) -> Response {
    if req.password == PASSWORD {
        Json(AuthResponse {
            token: Some(TOKEN.into()),
        })
        .into_response()
    } else {
        text(StatusCode::UNAUTHORIZED, "Invalid email or password")
    }
}

async fn register(Json(req): Json<RegisterRequest>) -> Response {
    if req.username.is_empty() {
        return text(StatusCode::BAD_REQUEST, "Username is required");
    }
    text(StatusCode::OK, "User registered. Check your email for the OTP.")
}

async fn send_otp(Query(params): Query<HashMap<String, String>>) -> Response {
    match params.get("email") {
        Some(email) => text(StatusCode::OK, &format!("OTP sent to {email}")),
        None => text(StatusCode::BAD_REQUEST, "Missing email"),
    }
}

async fn verify_otp(Query(params): Query<HashMap<String, String>>) -> Response {
    if params.get("otp").map(String::as_str) == Some(OTP) {
        text(StatusCode::OK, "Account verified successfully.")
    } else {
        text(StatusCode::BAD_REQUEST, "Invalid OTP")
    }
}

async fn google(Json(req): Json<GoogleLoginRequest>) -> Response {
    let token = (!req.token.is_empty()).then(|| TOKEN.to_string());
    Json(AuthResponse { token }).into_response()
}

async fn me(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return text(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    Json(UserProfile {
        username: "ada".into(),
        email: "ada@example.com".into(),
    })
    .into_response()
}

async fn create_workspace(
    State(api): State<Arc<FakeApi>>,
    headers: HeaderMap,
    Json(req): Json<CreateWorkspaceRequest>,
) -> Response {
    if !authorized(&headers) {
        return text(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    if api.fail_writes.load(Ordering::SeqCst) {
        return text(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error");
    }
    (StatusCode::CREATED, Json(api.add_workspace(&req.name))).into_response()
}

async fn list_workspaces(State(api): State<Arc<FakeApi>>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return text(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    let workspaces = api.workspaces.lock().unwrap().clone();
    Json(workspaces).into_response()
}

async fn delete_workspace(
    State(api): State<Arc<FakeApi>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    if !authorized(&headers) {
        return text(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    api.workspaces.lock().unwrap().retain(|w| w.id != id);
    StatusCode::NO_CONTENT.into_response()
}

async fn invite(
    State(api): State<Arc<FakeApi>>,
    headers: HeaderMap,
    Json(req): Json<InviteRequest>,
) -> Response {
    if !authorized(&headers) {
        return text(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    if !api.has_workspace(req.workspace_id) {
        return text(StatusCode::NOT_FOUND, "Workspace not found");
    }
    api.invites.lock().unwrap().push(req);
    text(StatusCode::OK, "Invitation sent")
}

async fn create_board(
    State(api): State<Arc<FakeApi>>,
    headers: HeaderMap,
    Json(req): Json<CreateBoardRequest>,
) -> Response {
    if !authorized(&headers) {
        return text(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    if api.fail_writes.load(Ordering::SeqCst) {
        return text(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error");
    }
    if !api.has_workspace(req.workspace_id) {
        return text(StatusCode::BAD_REQUEST, "Error: Workspace not found");
    }
    let board = RemoteBoard {
        id: api.id(),
        title: req.title,
        workspace_id: Some(req.workspace_id),
    };
    api.boards.lock().unwrap().push(board.clone());
    (StatusCode::CREATED, Json(board)).into_response()
}

async fn list_boards(
    State(api): State<Arc<FakeApi>>,
    headers: HeaderMap,
    Path(workspace_id): Path<i64>,
) -> Response {
    if !authorized(&headers) {
        return text(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    let boards: Vec<RemoteBoard> = api
        .boards
        .lock()
        .unwrap()
        .iter()
        .filter(|b| b.workspace_id == Some(workspace_id))
        .cloned()
        .collect();
    Json(boards).into_response()
}
