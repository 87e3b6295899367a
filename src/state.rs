use sqlx::PgPool;

/// Shared application state injected into every handler. The pool is the
/// single store handle; connections are acquired per request and
/// released on drop.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
}
