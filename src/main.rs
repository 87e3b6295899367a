use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post, put};
use axum::Router;
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

mod auth;
mod config;
mod database;
mod error;
mod handlers;
mod middleware;
mod services;
mod state;

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    let config = crate::config::config();
    tracing::info!("Starting TinyMagiq API in {:?} mode", config.environment);

    let pool = database::connect_pool(config)
        .unwrap_or_else(|e| panic!("failed to build database pool: {}", e));

    let app = app(AppState { pool });

    // Allow tests or deployments to override port via env
    let port = std::env::var("MAGIQ_API_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    tracing::info!("TinyMagiq API listening on http://{}", bind_addr);

    axum::serve(listener, app).await.expect("server");
}

fn app(state: AppState) -> Router {
    // Everything under /api except login sits behind the JWT middleware
    let protected = protected_routes()
        .layer(axum::middleware::from_fn(middleware::auth::jwt_auth_middleware));

    let mut app = Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/auth/login", post(handlers::auth::login))
        .merge(protected);

    if config::config().security.enable_cors {
        app = app.layer(CorsLayer::permissive());
    }

    app.layer(TraceLayer::new_for_http()).with_state(state)
}

fn protected_routes() -> Router<AppState> {
    use handlers::{
        auth, batch_concepts, batches, concepts, mentors, organizations, pod_mentors, pod_users,
        pods, roles, users,
    };

    Router::new()
        // Session introspection
        .route("/api/auth/whoami", get(auth::whoami))
        // Organizations
        .route(
            "/api/organizations",
            get(organizations::list).post(organizations::create),
        )
        // Batches
        .route("/api/batches", get(batches::list).post(batches::create))
        .route("/api/batches/:batch_id", put(batches::update))
        // Pods and their memberships
        .route("/api/pods", get(pods::list).post(pods::create))
        .route("/api/pods/:pod_id", put(pods::update))
        .route("/api/pods/:pod_id/users", get(pod_users::list))
        .route("/api/pods/:pod_id/mentors", get(pod_mentors::list))
        .route("/api/pods/:pod_id/concepts", get(batch_concepts::list_for_pod))
        // Mentors
        .route("/api/mentors", get(mentors::list).post(mentors::create))
        .route(
            "/api/mentors/:mentor_id",
            put(mentors::update).delete(mentors::delete),
        )
        // Concepts
        .route("/api/concepts", get(concepts::list).post(concepts::create))
        .route("/api/concepts/:concept_id", put(concepts::update))
        // Roles and accounts
        .route("/api/roles", get(roles::list))
        .route("/api/superadmin", post(users::create_superadmin))
        .route("/api/orgadmin", post(users::create_orgadmin))
        .route("/api/orguser", post(users::create_orguser))
        .route("/api/orgusers/:email", get(users::orguser_details))
        // Assignments
        .route(
            "/api/pod-users",
            post(pod_users::assign).delete(pod_users::remove),
        )
        .route(
            "/api/pod-mentors",
            post(pod_mentors::assign).delete(pod_mentors::remove),
        )
        .route(
            "/api/batch-concepts",
            post(batch_concepts::assign).delete(batch_concepts::remove),
        )
}

async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "name": "TinyMagiq API (Rust)",
        "version": version,
        "description": "Educational program administration backend built with Rust (Axum)",
        "endpoints": {
            "health": "GET /health (public)",
            "auth": "POST /api/auth/login (public), GET /api/auth/whoami",
            "organizations": "GET|POST /api/organizations",
            "batches": "GET|POST /api/batches, PUT /api/batches/:batch_id",
            "pods": "GET|POST /api/pods, PUT /api/pods/:pod_id",
            "mentors": "GET|POST /api/mentors, PUT|DELETE /api/mentors/:mentor_id",
            "concepts": "GET|POST /api/concepts, PUT /api/concepts/:concept_id",
            "roles": "GET /api/roles",
            "accounts": "POST /api/superadmin, POST /api/orgadmin, POST /api/orguser, GET /api/orgusers/:email",
            "assignments": "POST|DELETE /api/pod-users, POST|DELETE /api/pod-mentors, POST|DELETE /api/batch-concepts",
            "memberships": "GET /api/pods/:pod_id/{users,mentors,concepts}",
        },
    }))
}

async fn health(State(state): State<AppState>) -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    match sqlx::query("SELECT 1").execute(&state.pool).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "timestamp": now,
                "database": "ok"
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "degraded",
                "timestamp": now,
                "database_error": e.to_string()
            })),
        ),
    }
}
