//! EduOps API Library
//!
//! Back-office service for an education provider: school requests, fee
//! quotes, instructor assignments and payments, plus the public endpoints
//! the website posts to.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod health;
pub mod middleware_helpers;
pub mod openapi;
pub mod services;
pub mod tracing;

use axum::{
    extract::State, http::HeaderValue, response::Json, routing::get, Extension, Router,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
};
use utoipa::ToSchema;

use crate::auth::AuthService;
use crate::db::DbPool;
use crate::events::EventSender;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbPool>,
    pub config: config::AppConfig,
    pub event_sender: Arc<EventSender>,
    pub services: handlers::AppServices,
}

impl AppState {
    /// Wires the service container over an existing pool and event channel.
    pub fn new(
        db: Arc<DbPool>,
        config: config::AppConfig,
        event_sender: Arc<EventSender>,
    ) -> Result<Self, errors::ServiceError> {
        let services = handlers::AppServices::new(db.clone(), event_sender.clone(), &config)?;
        Ok(Self {
            db,
            config,
            event_sender,
            services,
        })
    }
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn validation_errors(errors: Vec<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some("Validation failed".to_string()),
            errors: Some(errors),
            meta: Some(ResponseMeta::capture()),
        }
    }
}


/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// Versioned API: public website endpoints plus the back office.
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .route("/status", get(api_status))
        .route("/health", get(health::health_check))
        .route("/health/live", get(health::liveness_check))
        .nest("/public", handlers::public::public_routes())
        .nest("/schools", handlers::schools::school_routes())
        .nest("/programs", handlers::programs::program_routes())
        .nest("/instructors", handlers::instructors::instructor_routes())
        .nest("/notices", handlers::notices::notice_routes())
        .nest(
            "/school-requests",
            handlers::school_requests::school_request_routes(),
        )
        .nest("/quotes", handlers::quotes::quote_routes())
        .nest("/quotations", handlers::quotations::quotation_routes())
        .nest("/assignments", handlers::assignments::assignment_routes())
        .nest("/payments", handlers::payments::payment_routes())
        .nest(
            "/notifications",
            handlers::notifications::notification_routes(),
        )
}

/// Builds the CORS layer from `cors_allowed_origins`, falling back to a
/// permissive policy where the configuration allows it.
pub fn cors_layer(cfg: &config::AppConfig) -> Result<CorsLayer, errors::ServiceError> {
    let configured_origins: Option<Vec<HeaderValue>> = cfg
        .cors_allowed_origins
        .as_ref()
        .map(|raw| {
            raw.split(',')
                .filter_map(|origin| {
                    let trimmed = origin.trim();
                    if trimmed.is_empty() {
                        None
                    } else {
                        HeaderValue::from_str(trimmed).ok()
                    }
                })
                .collect::<Vec<_>>()
        })
        .filter(|origins| !origins.is_empty());

    if let Some(origins) = configured_origins {
        Ok(CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any))
    } else if cfg.should_allow_permissive_cors() {
        ::tracing::info!(
            development = cfg.is_development(),
            "using permissive CORS because explicit origins were not configured"
        );
        Ok(CorsLayer::permissive())
    } else {
        Err(errors::ServiceError::InternalError(
            "missing CORS configuration: set APP__CORS_ALLOWED_ORIGINS or APP__CORS_ALLOW_ANY_ORIGIN=true"
                .to_string(),
        ))
    }
}

/// Full application router with middleware applied; shared by the server
/// binary and the integration tests.
pub fn build_router(
    state: AppState,
    auth_service: Arc<AuthService>,
) -> Result<Router, errors::ServiceError> {
    let cors = cors_layer(&state.config)?;

    let app = Router::new()
        .route("/", get(|| async { "eduops-api up" }))
        .nest("/api/v1", api_v1_routes())
        .with_state(state)
        .merge(openapi::swagger_ui())
        // Role guards read the verifier from request extensions
        .layer(Extension(auth_service))
        .layer(crate::tracing::configure_http_tracing())
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ));

    Ok(app)
}

async fn api_status(State(state): State<AppState>) -> ApiResult<Value> {
    let database = if db::check_connection(&state.db).await {
        "healthy"
    } else {
        "unhealthy"
    };

    Ok(Json(ApiResponse::success(json!({
        "service": "eduops-api",
        "version": env!("CARGO_PKG_VERSION"),
        "environment": state.config.environment,
        "database": database,
        "payment_transition_policy": state.services.payments.policy(),
        "timestamp": Utc::now().to_rfc3339(),
    }))))
}
