use axum::{
    http::{HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::JwtKeys;
use crate::config::AppConfig;
use crate::database::{
    DatabaseError, DatabaseManager, MemberStore, MySqlMemberStore, PostgresMemberStore, PostgresRoleStore,
    RoleStore,
};
use crate::handlers;
use crate::middleware::jwt_auth_middleware;
use crate::services::{RoleService, SyncService};

/// Handles shared by every request. Built once per process and cloned
/// into handlers; there are no global client singletons.
#[derive(Clone)]
pub struct AppState {
    pub keys: JwtKeys,
    pub primary: Arc<dyn MemberStore>,
    pub secondary: Arc<dyn MemberStore>,
    pub sync: Arc<SyncService>,
    pub roles: Arc<RoleService>,
}

impl AppState {
    pub fn new(
        keys: JwtKeys,
        primary: Arc<dyn MemberStore>,
        secondary: Arc<dyn MemberStore>,
        role_store: Arc<dyn RoleStore>,
        batch_size: usize,
    ) -> Self {
        let sync = SyncService::new(primary.clone(), secondary.clone(), role_store.clone(), batch_size);
        Self {
            keys,
            primary,
            secondary,
            sync: Arc::new(sync),
            roles: Arc::new(RoleService::new(role_store)),
        }
    }

    /// Wire the real PostgreSQL and MySQL stores from configuration
    pub fn from_config(config: &AppConfig) -> Result<Self, DatabaseError> {
        let primary_pool = DatabaseManager::primary_pool(&config.database)?;
        let secondary_pool = DatabaseManager::secondary_pool(&config.database)?;

        Ok(Self::new(
            JwtKeys::from_config(&config.security),
            Arc::new(PostgresMemberStore::new(primary_pool.clone())),
            Arc::new(MySqlMemberStore::new(secondary_pool)),
            Arc::new(PostgresRoleStore::new(primary_pool)),
            config.sync.batch_size,
        ))
    }
}

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/auth/whoami", get(handlers::auth::whoami))
        .route("/api/auth/can", post(handlers::auth::can))
        .route("/api/sync", post(handlers::sync::sync_post))
        .route(
            "/api/roles/:user_id",
            get(handlers::roles::roles_get).put(handlers::roles::roles_put),
        )
        .route("/api/roles/:user_id/:role", delete(handlers::roles::roles_delete))
        .route_layer(from_fn_with_state(state.clone(), jwt_auth_middleware));

    Router::new()
        // Public
        .route("/", get(handlers::root::root))
        .route("/health", get(handlers::root::health))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS for the admin frontend origins
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any)
}
