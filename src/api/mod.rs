pub mod auth;
mod case_studies;
mod error;
mod system;
mod uploads;
mod users;
mod validation;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // OAuth entry points (public)
    let oauth_routes = Router::new()
        .route("/login", get(auth::oauth_login))
        .route("/callback", get(auth::oauth_callback));

    let auth_routes = Router::new()
        .route("/me", get(auth::me))
        .route("/logout", post(auth::logout));

    // Authentication is enforced per-handler via the User extractor, so the
    // read-only case-study routes stay public while mutations require a session.
    let case_study_routes = Router::new()
        .route("/case-studies", get(case_studies::list_case_studies))
        .route("/case-studies", post(case_studies::create_case_study))
        .route("/case-studies/:id", get(case_studies::get_case_study))
        .route("/case-studies/:id", put(case_studies::update_case_study))
        .route("/case-studies/:id", delete(case_studies::delete_case_study))
        .route("/case-studies/:id/favorite", post(case_studies::toggle_favorite))
        .route("/favorites", get(case_studies::list_favorites))
        .route("/uploads", post(uploads::upload_image));

    let admin_routes = Router::new()
        .route("/users", get(users::list_all_users))
        .route("/users/:id/role", put(users::change_user_role))
        .route("/users/:id/reassign", post(users::reassign_user_case_studies))
        .route("/users/:id", delete(users::remove_user))
        .route("/notify-owner", post(system::notify_owner))
        .route("/notifications", get(system::list_owner_notifications));

    Router::new()
        .route("/health", get(system::health))
        .nest("/api/oauth", oauth_routes)
        .nest("/api/auth", auth_routes)
        .nest("/api", case_study_routes)
        .nest("/api/admin", admin_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
