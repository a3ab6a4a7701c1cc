//! Route table.

use axum::Router;
use axum::routing::{get, post, put};

use crate::handlers;
use crate::state::AppState;

/// Builds the full application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/me", get(handlers::auth::me))
        .route(
            "/projects",
            get(handlers::projects::list).post(handlers::projects::create),
        )
        .route(
            "/projects/{id}",
            get(handlers::projects::detail)
                .put(handlers::projects::update)
                .delete(handlers::projects::remove),
        )
        .route(
            "/projects/{id}/members",
            post(handlers::projects::add_member).delete(handlers::projects::remove_member),
        )
        .route(
            "/tasks",
            get(handlers::tasks::list).post(handlers::tasks::create),
        )
        .route(
            "/tasks/{id}",
            get(handlers::tasks::detail)
                .put(handlers::tasks::update)
                .delete(handlers::tasks::remove),
        )
        .route("/comments", post(handlers::comments::create))
        .route(
            "/comments/task/{id}",
            get(handlers::comments::list_for_task),
        )
        .route(
            "/comments/{id}",
            put(handlers::comments::update).delete(handlers::comments::remove),
        )
        .route("/activity", get(handlers::activity::list))
        .route(
            "/activity/project/{id}",
            get(handlers::activity::list_for_project),
        )
        .with_state(state)
}
