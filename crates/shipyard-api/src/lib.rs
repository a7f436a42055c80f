//! shipyard-api — REST API for the Shipyard control plane.
//!
//! Provides axum route handlers for deploying applications and driving
//! their blue/green lifecycle. All routes except `/healthz` require an
//! `Authorization: Bearer` token scoped to a tenant namespace.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | POST | `/apps/deploy` | Deploy or update an application's stable version |
//! | POST | `/apps/bluegreen/prepare` | Provision a preview of a new version |
//! | POST | `/apps/bluegreen/promote` | Cut production traffic over to the preview |
//! | POST | `/apps/bluegreen/rollback` | Restore the previous stable version |
//! | GET | `/apps/status` | Status listing (`?ns=` honored for platform admins) |
//! | POST | `/apps/scale` | Change an application's replica count |
//! | POST | `/apps/delete` | Destroy an application |
//! | GET | `/healthz` | Daemon liveness, unauthenticated |

pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};

use shipyard_bluegreen::BlueGreenController;
use shipyard_probe::PreviewMonitor;

use crate::auth::TokenVerifier;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub controller: BlueGreenController,
    pub monitor: Arc<PreviewMonitor>,
    pub verifier: TokenVerifier,
}

/// Build the complete API router.
pub fn build_router(state: ApiState) -> Router {
    let app_routes = Router::new()
        .route("/deploy", post(handlers::deploy_app))
        .route("/status", get(handlers::app_status))
        .route("/scale", post(handlers::scale_app))
        .route("/delete", post(handlers::delete_app))
        .route("/bluegreen/prepare", post(handlers::prepare_preview))
        .route("/bluegreen/promote", post(handlers::promote_preview))
        .route("/bluegreen/rollback", post(handlers::rollback_app))
        .with_state(state);

    Router::new()
        .nest("/apps", app_routes)
        .route("/healthz", get(handlers::healthz))
}
