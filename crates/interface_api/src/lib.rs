//! HTTP API Layer
//!
//! REST surface of the warranty engine using Axum. Handlers translate JSON
//! into [`WarrantyService`] calls; every decision is made by the engine.
//!
//! # Architecture
//!
//! - **Handlers**: Request handlers for claims, approvals and workflow queries
//! - **Middleware**: JWT authentication and audit logging
//! - **DTOs**: Request/Response data transfer objects, validated with `validator`
//! - **Error Handling**: `WorkflowError` mapped onto HTTP statuses
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::create_router;
//!
//! let app = create_router(service, config);
//! axum::serve(listener, app).await?;
//! ```

pub mod config;
pub mod error;
pub mod middleware;
pub mod handlers;
pub mod dto;
pub mod auth;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
    middleware as axum_middleware,
};
use tower_http::trace::TraceLayer;
use tower_http::cors::{CorsLayer, Any};

use domain_warranty::WarrantyService;

use crate::config::ApiConfig;
use crate::middleware::{auth_middleware, audit_middleware};
use crate::handlers::{approvals, claims, health, workflow};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<dyn WarrantyService>,
    pub config: Arc<ApiConfig>,
}

/// Creates the main API router
pub fn create_router(service: Arc<dyn WarrantyService>, config: ApiConfig) -> Router {
    let state = AppState {
        service,
        config: Arc::new(config),
    };

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let claims_routes = Router::new()
        .route("/", post(claims::submit_claim).get(claims::list_claims))
        .route("/:id", get(claims::get_claim).patch(claims::update_claim))
        .route("/:id/status", put(claims::update_status))
        .route("/:id/history", get(claims::status_history))
        .route(
            "/:id/approvals",
            post(approvals::initialize_approvals).get(approvals::list_approvals),
        );

    let approval_routes = Router::new()
        .route("/:id/decision", post(approvals::process_decision))
        .route("/:id/approver", put(approvals::assign_approver));

    // Protected API routes
    let api_routes = Router::new()
        .nest("/claims", claims_routes)
        .nest("/approvals", approval_routes)
        .route("/transitions", get(workflow::available_transitions))
        .route("/statistics", get(workflow::statistics))
        .layer(axum_middleware::from_fn(audit_middleware))
        .layer(axum_middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
