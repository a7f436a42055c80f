//! REST API handlers for the blue/green control plane.
//!
//! Every handler authenticates the bearer token, resolves the tenant
//! namespace from its claims, and delegates to the controller. Mutating
//! endpoints take the namespace from the token only; the status listing
//! additionally honors an explicit `?ns=` for platform admins.

use axum::Json;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};

use shipyard_bluegreen::{BlueGreenError, PrepareSpec};
use shipyard_state::app_key;

use crate::ApiState;
use crate::auth::Claims;

/// Response wrapper for consistent API format.
#[derive(serde::Serialize)]
struct ApiResponse<T: serde::Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: serde::Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

fn error_response(msg: &str, status: StatusCode) -> impl IntoResponse {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
}

fn status_for(err: &BlueGreenError) -> StatusCode {
    match err {
        // Bad input or an illegal transition attempt.
        BlueGreenError::Validation(_) | BlueGreenError::NotReady(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        BlueGreenError::Conflict(_) => StatusCode::CONFLICT,
        BlueGreenError::NotFound(_) => StatusCode::NOT_FOUND,
        BlueGreenError::Provision(_) => StatusCode::BAD_GATEWAY,
        BlueGreenError::Registry(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn controller_error(err: &BlueGreenError) -> Response {
    error_response(&err.to_string(), status_for(err)).into_response()
}

fn authenticate(state: &ApiState, headers: &HeaderMap) -> Result<Claims, Response> {
    state
        .verifier
        .authorize(headers)
        .map_err(|e| error_response(&e.to_string(), StatusCode::UNAUTHORIZED).into_response())
}

/// Request body naming one application.
#[derive(serde::Deserialize)]
pub struct AppTarget {
    pub name: String,
}

/// Request body for scaling.
#[derive(serde::Deserialize)]
pub struct ScaleRequest {
    pub name: String,
    pub replicas: u32,
}

/// Query parameters for the status listing.
#[derive(serde::Deserialize)]
pub struct StatusQuery {
    pub ns: Option<String>,
}

// ── Deploy / Scale / Delete ────────────────────────────────────

/// POST /apps/deploy
pub async fn deploy_app(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(spec): Json<PrepareSpec>,
) -> Response {
    let claims = match authenticate(&state, &headers) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let ns = claims.resolve_namespace(None);

    match state.controller.deploy(ns, &spec) {
        Ok(record) => (StatusCode::CREATED, ApiResponse::ok(record)).into_response(),
        Err(e) => controller_error(&e),
    }
}

/// POST /apps/scale
pub async fn scale_app(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(req): Json<ScaleRequest>,
) -> Response {
    let claims = match authenticate(&state, &headers) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let ns = claims.resolve_namespace(None);

    match state.controller.scale(ns, &req.name, req.replicas) {
        Ok(record) => ApiResponse::ok(record).into_response(),
        Err(e) => controller_error(&e),
    }
}

/// POST /apps/delete
pub async fn delete_app(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(req): Json<AppTarget>,
) -> Response {
    let claims = match authenticate(&state, &headers) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let ns = claims.resolve_namespace(None);

    // Stop probing before the workloads go away.
    state.monitor.stop(&app_key(ns, &req.name)).await;

    match state.controller.delete(ns, &req.name) {
        Ok(()) => ApiResponse::ok(serde_json::json!({
            "name": req.name,
            "status": "deleted"
        }))
        .into_response(),
        Err(e) => controller_error(&e),
    }
}

// ── Blue/green lifecycle ───────────────────────────────────────

/// POST /apps/bluegreen/prepare
pub async fn prepare_preview(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(spec): Json<PrepareSpec>,
) -> Response {
    let claims = match authenticate(&state, &headers) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let ns = claims.resolve_namespace(None);

    match state.controller.prepare(ns, &spec) {
        Ok(handle) => {
            state
                .monitor
                .start(&app_key(ns, &spec.name), &handle.address, &spec.readiness_path)
                .await;
            ApiResponse::ok(handle).into_response()
        }
        Err(e) => controller_error(&e),
    }
}

/// POST /apps/bluegreen/promote
pub async fn promote_preview(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(req): Json<AppTarget>,
) -> Response {
    let claims = match authenticate(&state, &headers) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let ns = claims.resolve_namespace(None);

    match state.controller.promote(ns, &req.name) {
        Ok(()) => {
            // The preview is production now; its probe loop is done.
            state.monitor.stop(&app_key(ns, &req.name)).await;
            ApiResponse::ok(serde_json::json!({
                "name": req.name,
                "status": "promoted"
            }))
            .into_response()
        }
        Err(e) => controller_error(&e),
    }
}

/// POST /apps/bluegreen/rollback
pub async fn rollback_app(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(req): Json<AppTarget>,
) -> Response {
    let claims = match authenticate(&state, &headers) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let ns = claims.resolve_namespace(None);

    match state.controller.rollback(ns, &req.name) {
        Ok(()) => {
            // Rollback discards any prepared preview with it.
            state.monitor.stop(&app_key(ns, &req.name)).await;
            ApiResponse::ok(serde_json::json!({
                "name": req.name,
                "status": "rolled_back"
            }))
            .into_response()
        }
        Err(e) => controller_error(&e),
    }
}

// ── Status ─────────────────────────────────────────────────────

/// GET /apps/status
pub async fn app_status(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Query(query): Query<StatusQuery>,
) -> Response {
    let claims = match authenticate(&state, &headers) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let ns = claims.resolve_namespace(query.ns.as_deref());

    match state.controller.status(ns) {
        // The listing is wrapped as `{items: [...]}` inside the envelope.
        Ok(items) => ApiResponse::ok(serde_json::json!({ "items": items })).into_response(),
        Err(e) => controller_error(&e),
    }
}

// ── Health ─────────────────────────────────────────────────────

/// GET /healthz — unauthenticated liveness probe for the daemon itself.
pub async fn healthz() -> impl IntoResponse {
    ApiResponse::ok("ok")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::http::HeaderValue;
    use axum::http::header::AUTHORIZATION;

    use shipyard_bluegreen::{BlueGreenController, LocalProvisioner};
    use shipyard_probe::{PreviewMonitor, ReadinessBoard};
    use shipyard_state::RegistryStore;
    use shipyard_traffic::TrafficRouter;

    use crate::auth::{ROLE_PLATFORM_ADMIN, TokenVerifier, issue_token};

    const SECRET: &str = "handler-test-secret";

    fn test_state() -> ApiState {
        let store = RegistryStore::open_in_memory().unwrap();
        let board = ReadinessBoard::new();
        let provisioner = Arc::new(LocalProvisioner::new(store.clone()));
        let controller = BlueGreenController::new(
            store,
            TrafficRouter::new(),
            board.clone(),
            provisioner,
        );
        ApiState {
            controller,
            monitor: Arc::new(PreviewMonitor::new(board, Duration::from_secs(60))),
            verifier: TokenVerifier::new(SECRET),
        }
    }

    fn bearer(ns: &str, role: &str) -> HeaderMap {
        let token = issue_token(SECRET, "tester", ns, role, 3600).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        headers
    }

    fn test_spec(name: &str, tag: &str) -> PrepareSpec {
        serde_json::from_value(serde_json::json!({
            "name": name,
            "image": "org/api",
            "tag": tag,
            "port": 18080,
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn deploy_requires_token() {
        let state = test_state();
        let resp = deploy_app(
            State(state),
            HeaderMap::new(),
            Json(test_spec("api", "v1")),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn deploy_creates_app_in_token_namespace() {
        let state = test_state();
        let resp = deploy_app(
            State(state.clone()),
            bearer("acme", "tenant"),
            Json(test_spec("api", "v1")),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let record = state.controller.get_app("acme", "api").unwrap().unwrap();
        assert_eq!(record.stable.tag, "v1");
    }

    #[tokio::test]
    async fn invalid_name_is_unprocessable() {
        let state = test_state();
        let resp = deploy_app(
            State(state),
            bearer("acme", "tenant"),
            Json(test_spec("Not_Valid", "v1")),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn prepare_starts_readiness_monitor() {
        let state = test_state();
        deploy_app(
            State(state.clone()),
            bearer("acme", "tenant"),
            Json(test_spec("api", "v1")),
        )
        .await;

        let resp = prepare_preview(
            State(state.clone()),
            bearer("acme", "tenant"),
            Json(test_spec("api", "v2")),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(state.monitor.is_probing("acme/api").await);
    }

    #[tokio::test]
    async fn prepare_missing_app_is_not_found() {
        let state = test_state();
        let resp = prepare_preview(
            State(state),
            bearer("acme", "tenant"),
            Json(test_spec("api", "v2")),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn promote_unready_preview_is_unprocessable() {
        let state = test_state();
        deploy_app(
            State(state.clone()),
            bearer("acme", "tenant"),
            Json(test_spec("api", "v1")),
        )
        .await;
        prepare_preview(
            State(state.clone()),
            bearer("acme", "tenant"),
            Json(test_spec("api", "v2")),
        )
        .await;

        let resp = promote_preview(
            State(state),
            bearer("acme", "tenant"),
            Json(AppTarget {
                name: "api".to_string(),
            }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn promote_without_preview_conflicts() {
        let state = test_state();
        deploy_app(
            State(state.clone()),
            bearer("acme", "tenant"),
            Json(test_spec("api", "v1")),
        )
        .await;

        let resp = promote_preview(
            State(state),
            bearer("acme", "tenant"),
            Json(AppTarget {
                name: "api".to_string(),
            }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn promote_ready_preview_stops_monitor() {
        let state = test_state();
        deploy_app(
            State(state.clone()),
            bearer("acme", "tenant"),
            Json(test_spec("api", "v1")),
        )
        .await;
        prepare_preview(
            State(state.clone()),
            bearer("acme", "tenant"),
            Json(test_spec("api", "v2")),
        )
        .await;

        // Simulate the probe loop reaching a passing verdict.
        state.controller.board().set("acme/api", true);

        let resp = promote_preview(
            State(state.clone()),
            bearer("acme", "tenant"),
            Json(AppTarget {
                name: "api".to_string(),
            }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(!state.monitor.is_probing("acme/api").await);

        let record = state.controller.get_app("acme", "api").unwrap().unwrap();
        assert_eq!(record.stable.tag, "v2");
    }

    #[tokio::test]
    async fn rollback_without_history_is_not_found() {
        let state = test_state();
        deploy_app(
            State(state.clone()),
            bearer("acme", "tenant"),
            Json(test_spec("api", "v1")),
        )
        .await;

        let resp = rollback_app(
            State(state),
            bearer("acme", "tenant"),
            Json(AppTarget {
                name: "api".to_string(),
            }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn status_is_scoped_to_token_namespace() {
        let state = test_state();
        deploy_app(
            State(state.clone()),
            bearer("acme", "tenant"),
            Json(test_spec("api", "v1")),
        )
        .await;
        deploy_app(
            State(state.clone()),
            bearer("globex", "tenant"),
            Json(test_spec("web", "v1")),
        )
        .await;

        // A tenant asking for another namespace still gets its own.
        let resp = app_status(
            State(state),
            bearer("acme", "tenant"),
            Query(StatusQuery {
                ns: Some("globex".to_string()),
            }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        let items = json["data"]["items"].as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["name"], "api");
        assert_eq!(items[0]["namespace"], "acme");
    }

    #[tokio::test]
    async fn status_body_wraps_listing_in_items() {
        let state = test_state();
        deploy_app(
            State(state.clone()),
            bearer("acme", "tenant"),
            Json(test_spec("api", "v1")),
        )
        .await;

        let resp = app_status(
            State(state),
            bearer("acme", "tenant"),
            Query(StatusQuery { ns: None }),
        )
        .await;
        let body = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

        // The dashboard reads `data.items`, not a bare array.
        assert_eq!(json["success"], true);
        assert!(json["data"]["items"].is_array());
        assert_eq!(json["data"]["items"][0]["name"], "api");
    }

    #[tokio::test]
    async fn platform_admin_reads_any_namespace() {
        let state = test_state();
        deploy_app(
            State(state.clone()),
            bearer("globex", "tenant"),
            Json(test_spec("web", "v1")),
        )
        .await;

        let resp = app_status(
            State(state),
            bearer("platform", ROLE_PLATFORM_ADMIN),
            Query(StatusQuery {
                ns: Some("globex".to_string()),
            }),
        )
        .await;
        let body = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["data"]["items"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_stops_monitor_and_removes_app() {
        let state = test_state();
        deploy_app(
            State(state.clone()),
            bearer("acme", "tenant"),
            Json(test_spec("api", "v1")),
        )
        .await;
        prepare_preview(
            State(state.clone()),
            bearer("acme", "tenant"),
            Json(test_spec("api", "v2")),
        )
        .await;

        let resp = delete_app(
            State(state.clone()),
            bearer("acme", "tenant"),
            Json(AppTarget {
                name: "api".to_string(),
            }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(!state.monitor.is_probing("acme/api").await);
        assert!(state.controller.get_app("acme", "api").unwrap().is_none());
    }

    #[tokio::test]
    async fn scale_updates_replicas() {
        let state = test_state();
        deploy_app(
            State(state.clone()),
            bearer("acme", "tenant"),
            Json(test_spec("api", "v1")),
        )
        .await;

        let resp = scale_app(
            State(state.clone()),
            bearer("acme", "tenant"),
            Json(ScaleRequest {
                name: "api".to_string(),
                replicas: 4,
            }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let record = state.controller.get_app("acme", "api").unwrap().unwrap();
        assert_eq!(record.stable.replicas, 4);
    }
}
