pub mod error;
pub mod extractors;
pub mod routes;
pub mod state;

use axum::{
    Router,
    http::HeaderValue,
    routing::{delete, get, patch, post, put},
};
use state::AppState;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

/// An empty origin list means a wide-open dev setup.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(
            origins
                .iter()
                .filter_map(|origin| origin.parse::<HeaderValue>().ok()),
        )
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.settings.app.cors_origins);

    // Auth routes (no workspace prefix)
    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh))
        .route("/me", get(routes::auth::me))
        .route("/me", put(routes::auth::update_me));

    // Workspace routes
    let workspace_routes = Router::new()
        .route("/", get(routes::workspace::list))
        .route("/", post(routes::workspace::create))
        .route("/join", post(routes::workspace::join))
        .route("/{workspace_id}", get(routes::workspace::get))
        .route("/{workspace_id}", delete(routes::workspace::delete))
        .route("/{workspace_id}/summary", get(routes::workspace::summary))
        .route(
            "/{workspace_id}/transfer-ownership",
            post(routes::workspace::transfer_ownership),
        );

    // Member routes (under workspace)
    let member_routes = Router::new()
        .route("/", get(routes::member::list))
        .route("/leave", post(routes::member::leave))
        .route("/{user_id}", patch(routes::member::change_role))
        .route("/{user_id}", delete(routes::member::remove));

    // Attendance routes (under workspace)
    let attendance_routes = Router::new()
        .route("/", get(routes::attendance::list))
        .route("/mark", post(routes::attendance::mark))
        .route("/attempts", get(routes::attendance::attempts));

    // Project routes (under workspace)
    let project_routes = Router::new()
        .route("/", get(routes::project::list))
        .route("/", post(routes::project::create))
        .route("/{project_id}", delete(routes::project::delete));

    // Task routes (under workspace)
    let task_routes = Router::new()
        .route("/", get(routes::task::list))
        .route("/", post(routes::task::create))
        .route("/{task_id}", put(routes::task::update))
        .route("/{task_id}", delete(routes::task::delete));

    // Activity log routes (under workspace)
    let activity_routes = Router::new().route("/", get(routes::activity::list));

    // Compose API
    let api = Router::new()
        .nest("/auth", auth_routes)
        .nest("/workspace", workspace_routes)
        .nest("/workspace/{workspace_id}/member", member_routes)
        .nest("/workspace/{workspace_id}/attendance", attendance_routes)
        .nest("/workspace/{workspace_id}/project", project_routes)
        .nest("/workspace/{workspace_id}/task", task_routes)
        .nest("/workspace/{workspace_id}/activity", activity_routes);

    // Health check
    let health = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api)
        .merge(health)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
