//! REST API Routes Module
//!
//! Route tree:
//! - `/api/registry/*` - registry discovery and admin mutations
//! - `/api/chat` - role-gated chat dispatch
//! - `/health/*` - probes
//! - `/metrics`, `/openapi.json`, `/swagger-ui`

use std::time::Duration;

use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware::from_fn,
    routing::get,
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

use crate::auth::{AdminConfig, ADMIN_KEY_HEADER};
use crate::config::{is_production_environment, ApiConfig};
use crate::error::ApiResult;
use crate::middleware::{AGENT_ID_HEADER, AGENT_ROLES_HEADER};
use crate::state::AppState;
use crate::telemetry::{metrics_handler, observability_middleware};

pub mod chat;
pub mod health;
pub mod registry;

pub use chat::create_router as chat_router;
pub use health::create_router as health_router;
pub use registry::create_router as registry_router;

// ============================================================================
// OPENAPI ENDPOINTS
// ============================================================================

/// Handler for /openapi.json endpoint.
#[cfg(all(feature = "openapi", not(feature = "swagger-ui")))]
async fn openapi_json() -> impl axum::response::IntoResponse {
    use utoipa::OpenApi;
    axum::Json(crate::openapi::ApiDoc::openapi())
}

// ============================================================================
// SECURE ROUTER BUILDER
// ============================================================================

/// Builder that validates configuration before assembling the router.
///
/// Admin checks live on the mutation handlers as extractors, so every
/// registry write is guarded regardless of how the router is mounted.
pub struct SecureRouterBuilder {
    state: AppState,
    api_config: ApiConfig,
}

impl SecureRouterBuilder {
    /// In production environments, refuses the default admin key and an
    /// empty CORS origin list.
    pub fn new(state: AppState, api_config: ApiConfig, admin_config: &AdminConfig) -> ApiResult<Self> {
        if is_production_environment() {
            admin_config.validate_for_production()?;
            api_config.validate_for_production()?;
        }
        Ok(Self { state, api_config })
    }

    /// Build the complete router.
    ///
    /// # Middleware Order (outer to inner)
    /// 1. CORS (outermost) - handles preflight requests
    /// 2. Observability - tracing and metrics
    pub fn build(self) -> Router {
        let api_routes = Router::new()
            .nest("/registry", registry::create_router())
            .merge(chat::create_router());

        #[allow(unused_mut)]
        let mut router = Router::new()
            .nest("/api", api_routes)
            .nest("/health", health::create_router())
            .route("/metrics", get(metrics_handler));

        // SwaggerUi serves /openapi.json itself when enabled.
        #[cfg(all(feature = "openapi", not(feature = "swagger-ui")))]
        {
            router = router.route("/openapi.json", get(openapi_json));
        }

        #[cfg(feature = "swagger-ui")]
        {
            use utoipa::OpenApi;
            use utoipa_swagger_ui::SwaggerUi;
            router = router.merge(
                SwaggerUi::new("/swagger-ui").url("/openapi.json", crate::openapi::ApiDoc::openapi()),
            );
        }

        let cors = build_cors_layer(&self.api_config);

        router
            .layer(
                ServiceBuilder::new()
                    .layer(cors)
                    .layer(from_fn(observability_middleware)),
            )
            .with_state(self.state)
    }
}

// ============================================================================
// CORS LAYER
// ============================================================================

/// Build the CORS layer from ApiConfig.
///
/// In development mode (empty origins), allows all origins.
/// In production mode, only allows configured origins.
pub fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static(ADMIN_KEY_HEADER),
            HeaderName::from_static(AGENT_ID_HEADER),
            HeaderName::from_static(AGENT_ROLES_HEADER),
        ])
        .max_age(Duration::from_secs(config.cors_max_age_secs));

    if config.cors_origins.is_empty() {
        tracing::info!("CORS: Development mode - allowing all origins");
        cors.allow_origin(Any)
    } else {
        tracing::info!(
            "CORS: Production mode - allowing origins: {:?}",
            config.cors_origins
        );
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();

        if config.cors_allow_credentials {
            cors.allow_origin(origins).allow_credentials(true)
        } else {
            cors.allow_origin(origins)
        }
    }
}

/// Create the complete API router.
///
/// - Registry routes under /api/registry/* (mutations require `x-admin-key`)
/// - Chat at /api/chat (identity from `x-agent-appid`)
/// - Health checks at /health/* (public)
/// - Metrics at /metrics (public)
/// - OpenAPI document at /openapi.json
/// - Swagger UI at /swagger-ui (when swagger-ui feature is enabled)
pub fn create_api_router(
    state: AppState,
    api_config: ApiConfig,
    admin_config: &AdminConfig,
) -> ApiResult<Router> {
    Ok(SecureRouterBuilder::new(state, api_config, admin_config)?.build())
}
