//! Request handlers.
//!
//! Core calls block on SQLite and the filesystem, so every handler hops onto
//! the blocking pool through [`blocking`].

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};
use chrono::{DateTime, Utc};
use fab_sdk::{Fab, SdkResult, User, View, Visibility};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::auth::Authenticated;
use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

const RAW_CONTENT_TYPE: &str = "application/octet-stream";

/// Run a core call on the blocking pool.
async fn blocking<T, F>(fab: &Arc<Fab>, f: F) -> ServerResult<T>
where
    T: Send + 'static,
    F: FnOnce(&Fab) -> SdkResult<T> + Send + 'static,
{
    let fab = Arc::clone(fab);
    tokio::task::spawn_blocking(move || f(&fab))
        .await
        .map_err(|e| ServerError::Internal(format!("blocking task failed: {e}")))?
        .map_err(ServerError::from)
}

/// `?view=` on content and document reads.
#[derive(Debug, Default, Deserialize)]
pub struct ViewQuery {
    pub view: Option<String>,
}

impl ViewQuery {
    /// `None` when no body view was asked for.
    fn parse(&self) -> ServerResult<Option<View>> {
        match self.view.as_deref() {
            None => Ok(None),
            Some("raw") => Ok(Some(View::Raw)),
            Some("rendered") => Ok(Some(View::Rendered)),
            Some(other) => Err(ServerError::BadRequest(format!(
                "unknown view {other:?}, expected \"raw\" or \"rendered\""
            ))),
        }
    }
}

fn body_response(fab: &Fab, view: View, bytes: Vec<u8>) -> Response {
    let content_type = match view {
        View::Raw => RAW_CONTENT_TYPE,
        View::Rendered => fab.rendered_content_type(),
    };
    ([(header::CONTENT_TYPE, content_type)], bytes).into_response()
}

fn redirect_with(location: String, body: serde_json::Value) -> Response {
    (
        StatusCode::MOVED_PERMANENTLY,
        [(header::LOCATION, location)],
        Json(body),
    )
        .into_response()
}

/// User fields safe to show their owner.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            username: user.username.to_string(),
            email: user.email,
            created_at: user.created_at,
        }
    }
}

// ---- Service ----

pub async fn index() -> &'static str {
    "Hello World!"
}

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

// ---- Users and sessions ----

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// `POST /users`
pub async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ServerResult<(StatusCode, Json<UserResponse>)> {
    let user = blocking(&state.fab, move |fab| {
        fab.register(&req.username, &req.email, &req.password)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// `POST /sessions`: redirect to the new session.
pub async fn create_session(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> ServerResult<Response> {
    let token = blocking(&state.fab, move |fab| fab.login(&form.username, &form.password)).await?;
    Ok(redirect_with(
        format!("/sessions/{token}"),
        json!({ "token": token }),
    ))
}

/// `GET /sessions/:token`
pub async fn get_session(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> ServerResult<Json<serde_json::Value>> {
    let username = blocking(&state.fab, move |fab| fab.session_user(&token)).await?;
    Ok(Json(json!({ "username": username })))
}

// ---- Anonymous content ----

/// `POST /content`: store the body, redirect to its key.
pub async fn post_content(State(state): State<AppState>, body: Bytes) -> ServerResult<Response> {
    let key = blocking(&state.fab, move |fab| fab.post_anonymous(&body)).await?;
    Ok(redirect_with(
        format!("/content/{key}"),
        json!({ "key": key }),
    ))
}

/// `GET /content/:key`
pub async fn get_content(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<ViewQuery>,
) -> ServerResult<Response> {
    let view = query.parse()?.unwrap_or_default();
    let bytes = blocking(&state.fab, move |fab| fab.fetch(&key, view)).await?;
    Ok(body_response(&state.fab, view, bytes))
}

// ---- Profiles ----

/// `GET /:profile`
pub async fn get_profile(
    State(state): State<AppState>,
    Authenticated(requester): Authenticated,
    Path(profile): Path<String>,
) -> ServerResult<Response> {
    let profile = blocking(&state.fab, move |fab| fab.profile(&requester, &profile)).await?;
    Ok(Json(profile).into_response())
}

#[derive(Debug, Deserialize)]
pub struct EmailForm {
    pub email: String,
}

/// `PUT /:profile`
pub async fn update_profile(
    State(state): State<AppState>,
    Authenticated(requester): Authenticated,
    Path(profile): Path<String>,
    Form(form): Form<EmailForm>,
) -> ServerResult<Json<UserResponse>> {
    let user = blocking(&state.fab, move |fab| {
        fab.update_email(&requester, &profile, &form.email)
    })
    .await?;
    Ok(Json(user.into()))
}

// ---- Documents ----

/// `GET /:profile/*document`: the record, or its body with `?view=`.
pub async fn get_document(
    State(state): State<AppState>,
    Authenticated(requester): Authenticated,
    Path((profile, document)): Path<(String, String)>,
    Query(query): Query<ViewQuery>,
) -> ServerResult<Response> {
    match query.parse()? {
        None => {
            let doc = blocking(&state.fab, move |fab| {
                fab.document(&requester, &profile, &document)
            })
            .await?;
            Ok(Json(doc).into_response())
        }
        Some(view) => {
            let bytes = blocking(&state.fab, move |fab| {
                fab.read(&requester, &profile, &document, view)
            })
            .await?;
            Ok(body_response(&state.fab, view, bytes))
        }
    }
}

#[derive(Deserialize)]
pub struct DataForm {
    pub data: String,
}

/// `PUT /:profile/*document`: 201 when created, 200 when updated.
pub async fn put_document(
    State(state): State<AppState>,
    Authenticated(requester): Authenticated,
    Path((profile, document)): Path<(String, String)>,
    Form(form): Form<DataForm>,
) -> ServerResult<Response> {
    let upserted = blocking(&state.fab, move |fab| {
        fab.publish(&requester, &profile, &document, form.data.as_bytes())
    })
    .await?;
    let status = if upserted.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(upserted.document)).into_response())
}

#[derive(Debug, Deserialize)]
pub struct VisibilityRequest {
    pub visibility: Visibility,
}

/// `PATCH /:profile/*document`
pub async fn patch_document(
    State(state): State<AppState>,
    Authenticated(requester): Authenticated,
    Path((profile, document)): Path<(String, String)>,
    Json(req): Json<VisibilityRequest>,
) -> ServerResult<Response> {
    let doc = blocking(&state.fab, move |fab| {
        fab.set_visibility(&requester, &profile, &document, req.visibility)
    })
    .await?;
    Ok(Json(doc).into_response())
}

#[derive(Debug, Deserialize)]
pub struct ForkRequest {
    pub owner: String,
    pub slug: String,
    pub new_slug: Option<String>,
}

/// `POST /forks`
pub async fn create_fork(
    State(state): State<AppState>,
    Authenticated(requester): Authenticated,
    Json(req): Json<ForkRequest>,
) -> ServerResult<Response> {
    let doc = blocking(&state.fab, move |fab| {
        fab.fork(&requester, &req.owner, &req.slug, req.new_slug.as_deref())
    })
    .await?;
    Ok((StatusCode::CREATED, Json(doc)).into_response())
}
