use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::batch::BatchRunner;
use crate::config::{AccountTier, RequestLimits, SimulationParameters, SimulationRequest, TierTable};
use crate::stats::{summarize, Summary};

/// Shared state for the HTTP handlers
pub struct AppState {
    pub tiers: TierTable,
    pub limits: RequestLimits,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            tiers: TierTable::default(),
            limits: RequestLimits::default(),
        }
    }
}

/// Response for a finished batch
#[derive(Serialize)]
pub struct SimulateResponse {
    pub tier: String,
    pub parameters: SimulationParameters,
    pub summary: Summary,
}

/// Response for tiers list
#[derive(Serialize)]
pub struct TiersResponse<'a> {
    pub tiers: Vec<&'a AccountTier>,
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/tiers", get(get_tiers))
        .route("/api/simulate", post(simulate))
        .layer(cors)
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

/// GET /api/tiers - Account tiers available for simulation
async fn get_tiers(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!(TiersResponse {
        tiers: state.tiers.iter().collect(),
    }))
}

/// POST /api/simulate - Run one batch and return its summary
async fn simulate(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SimulationRequest>,
) -> impl IntoResponse {
    let (params, n) = match request.resolve(&state.tiers, &state.limits) {
        Ok(resolved) => resolved,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"error": e.to_string()})),
            );
        }
    };

    info!("Simulating {} attempts on {} tier", n, request.tier);

    // CPU-bound; keep it off the async workers
    let runner = BatchRunner::new().seeded(request.seed);
    let result = tokio::task::spawn_blocking(move || {
        runner
            .run(&params, n)
            .map(|outcomes| (params, summarize(&outcomes)))
    })
    .await;

    match result {
        Ok(Ok((parameters, summary))) => (
            StatusCode::OK,
            Json(serde_json::json!(SimulateResponse {
                tier: request.tier,
                parameters,
                summary,
            })),
        ),
        Ok(Err(e)) => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": e.to_string()})),
        ),
        Err(e) => {
            error!("Simulation task failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "simulation failed"})),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request},
    };
    use tower::ServiceExt;

    fn app() -> Router {
        router(Arc::new(AppState::default()))
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_responds_ok() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn tiers_lists_defaults() {
        let response = app()
            .oneshot(Request::get("/api/tiers").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        let tiers = body["tiers"].as_array().unwrap();
        assert_eq!(tiers.len(), 3);
        assert_eq!(tiers[0]["name"], "50K");
        assert_eq!(tiers[2]["profit_target"], 9000.0);
    }

    #[tokio::test]
    async fn simulate_returns_summary() {
        let request = serde_json::json!({
            "tier": "100K",
            "simulations": 200,
            "seed": 11,
        });

        let response = app().oneshot(post_json("/api/simulate", request)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["tier"], "100K");
        assert_eq!(body["parameters"]["profit_target"], 6000.0);
        assert_eq!(body["summary"]["simulations"], 200);
    }

    #[tokio::test]
    async fn seeded_simulations_match() {
        let request = serde_json::json!({"simulations": 300, "seed": 5});

        let first = json_body(
            app()
                .oneshot(post_json("/api/simulate", request.clone()))
                .await
                .unwrap(),
        )
        .await;
        let second = json_body(
            app()
                .oneshot(post_json("/api/simulate", request))
                .await
                .unwrap(),
        )
        .await;

        assert_eq!(first["summary"], second["summary"]);
    }

    #[tokio::test]
    async fn simulate_rejects_out_of_range() {
        let request = serde_json::json!({"win_rate_pct": 90.0});

        let response = app().oneshot(post_json("/api/simulate", request)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert!(body["error"].as_str().unwrap().contains("win_rate_pct"));
    }

    #[tokio::test]
    async fn simulate_rejects_unknown_tier() {
        let request = serde_json::json!({"tier": "1M"});

        let response = app().oneshot(post_json("/api/simulate", request)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"], "unknown account tier `1M`");
    }
}
