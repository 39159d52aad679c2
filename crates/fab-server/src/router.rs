use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handler;
use crate::state::AppState;

/// Build the axum router with all fab endpoints.
///
/// Static routes take precedence over the `/:profile` catch-alls; the
/// static names are reserved usernames, so no profile is ever shadowed.
pub fn build_router(state: AppState) -> Router {
    // Form encoding can triple a payload; the content store enforces the
    // exact ceiling.
    let body_limit = state
        .fab
        .content()
        .max_blob_size()
        .saturating_mul(3)
        .saturating_add(64 * 1024);

    Router::new()
        .route("/", get(handler::index))
        .route("/health", get(handler::health))
        .route("/users", post(handler::create_user))
        .route("/sessions", post(handler::create_session))
        .route("/sessions/:token", get(handler::get_session))
        .route("/content", post(handler::post_content))
        .route("/content/:key", get(handler::get_content))
        .route("/forks", post(handler::create_fork))
        .route(
            "/:profile",
            get(handler::get_profile).put(handler::update_profile),
        )
        .route(
            "/:profile/*document",
            get(handler::get_document)
                .put(handler::put_document)
                .patch(handler::patch_document),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
