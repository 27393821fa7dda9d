use axum::{
    Json, Router,
    extract::State,
    http::{HeaderName, HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::get,
};
use serde_json::{Value, json};
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::{
    infra::{app_state::AppState, config::CorsConfig},
    users::{
        create_user, destroy_user, list_users, partial_update_user, retrieve_user, update_user,
    },
};

/// Routes for the users resource. Each path answers with and without the
/// trailing slash.
pub fn users_router() -> Router<AppState> {
    let collection = || get(list_users).post(create_user);
    let detail = || {
        get(retrieve_user)
            .put(update_user)
            .patch(partial_update_user)
            .delete(destroy_user)
    };

    Router::new()
        .route("/users/", collection())
        .route("/users", collection())
        .route("/users/{id}/", detail())
        .route("/users/{id}", detail())
}

pub fn create_app(state: AppState) -> Router {
    let cors_layer = if state.config().dev_mode {
        CorsLayer::permissive()
    } else {
        build_cors_layer(&state.config().cors)
    };

    Router::new()
        .route("/ping", get(ping_handler))
        .route("/health", get(health_handler))
        .merge(users_router())
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn build_cors_layer(cors: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = cors
        .allowed_origins
        .iter()
        .filter_map(|s| HeaderValue::from_str(s).ok())
        .collect();
    let any_origin = origins.is_empty() || cors.is_wildcard_included();
    let allow_origin = if any_origin {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins)
    };

    // Methods and headers were validated by the config loader.
    let methods: Vec<Method> = cors
        .allowed_methods
        .iter()
        .filter_map(|m| Method::from_bytes(m.as_bytes()).ok())
        .collect();
    let headers: Vec<HeaderName> = cors
        .allowed_headers
        .iter()
        .filter_map(|h| HeaderName::from_bytes(h.as_bytes()).ok())
        .collect();

    let mut layer = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(AllowMethods::list(methods))
        .allow_headers(AllowHeaders::list(headers));

    // Credentials are never combined with a wildcard origin.
    if cors.allow_credentials && !any_origin {
        layer = layer.allow_credentials(true);
    }

    layer
}

async fn ping_handler() -> Json<Value> {
    info!("Ping endpoint called");
    Json(json!({
        "status": "ok",
        "message": "Users service is running",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let mut health_status = json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
        "checks": {}
    });

    let backend = state.config().storage.backend.as_str();
    let mut is_unhealthy = false;

    match state.users.health_check().await {
        Ok(()) => {
            health_status["checks"]["storage"] = json!({
                "status": "healthy",
                "backend": backend
            });
        }
        Err(e) => {
            warn!(error = %e, backend, "storage health check failed");
            health_status["checks"]["storage"] = json!({
                "status": "unhealthy",
                "backend": backend,
                "error": "storage unavailable"
            });
            is_unhealthy = true;
        }
    }

    if let Some(postgres) = state.postgres.as_ref() {
        let stats = postgres.pool_stats();
        health_status["checks"]["pool"] = json!({
            "size": stats.size,
            "idle": stats.idle,
            "max_size": stats.max_size
        });
    }

    if is_unhealthy {
        health_status["status"] = json!("unhealthy");
        (StatusCode::SERVICE_UNAVAILABLE, Json(health_status))
    } else {
        (StatusCode::OK, Json(health_status))
    }
}
