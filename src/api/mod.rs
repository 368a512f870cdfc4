pub mod error;
pub mod health;
pub mod smart_charging;

use std::time::Duration;

use axum::{
    http::StatusCode,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::{config::Config, controller::AppState};

pub fn router(state: AppState, cfg: &Config) -> Router {
    let v1 = Router::new()
        .route(
            "/tenants/:tenant/site-areas/:site_area_id/smart-charging",
            post(smart_charging::trigger_smart_charging),
        )
        .route("/optimizer/check", get(smart_charging::check_optimizer))
        .with_state(state);

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/v1", v1)
        .layer(
            ServiceBuilder::new()
                .layer(axum::extract::DefaultBodyLimit::max(1024 * 1024))
                .layer(request_timeout(Duration::from_secs(cfg.server.request_timeout_secs))),
        )
        .layer(TraceLayer::new_for_http())
}

fn request_timeout(timeout: Duration) -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::config::{
        ControllerConfig, OptimizerConfig, ServerConfig, SmartChargingConfig, StorageConfig,
    };
    use crate::controller::SmartChargingController;
    use crate::domain::Tenant;
    use crate::optimizer::{MockOptimizerGateway, OptimizerError, OptimizerResponse, PlannedCar};
    use crate::repo::{InMemoryRepository, RepositorySeed, TenantSeed};
    use crate::smart_charging::SmartChargingEngine;
    use crate::smart_charging::test_support::{ac_connector, active_session, snapshot, station};

    fn config() -> Config {
        Config {
            server: ServerConfig {
                host: "127.0.0.1".into(),
                port: 0,
                request_timeout_secs: 5,
            },
            optimizer: OptimizerConfig::default(),
            smart_charging: SmartChargingConfig::default(),
            controller: ControllerConfig {
                reoptimize_every_minutes: 0,
            },
            storage: StorageConfig {
                snapshot_path: "unused.json".into(),
            },
        }
    }

    fn app(gateway: MockOptimizerGateway) -> Router {
        let mut connector = ac_connector(1, 96.0, 3);
        connector.current_transaction_id = Some(5);
        let mut snap = snapshot(vec![station("CS1", vec![connector])]);
        snap.sessions = vec![active_session(5, "CS1", 1)];
        let repo = Arc::new(InMemoryRepository::new(RepositorySeed {
            tenants: vec![TenantSeed {
                tenant: Tenant {
                    id: "T1".into(),
                    subdomain: "acme".into(),
                },
                site_areas: vec![snap],
            }],
        }));
        let engine = SmartChargingEngine::new(
            Arc::new(gateway),
            repo.clone(),
            SmartChargingConfig::default(),
        );
        let controller = Arc::new(SmartChargingController::new(engine, repo));
        let cfg = config();
        router(AppState::with_controller(cfg.clone(), controller), &cfg)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post(uri: &str) -> Request<Body> {
        Request::builder().method("POST").uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_slow_request_times_out() {
        let slow = Router::new()
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    "late"
                }),
            )
            .layer(request_timeout(Duration::from_millis(10)));
        let response = slow
            .oneshot(Request::get("/slow").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    }

    #[tokio::test]
    async fn test_health() {
        let response = app(MockOptimizerGateway::new())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "healthy");
    }

    #[tokio::test]
    async fn test_trigger_returns_new_profiles() {
        let mut gateway = MockOptimizerGateway::new();
        gateway.expect_optimize().returning(|_| {
            Ok(OptimizerResponse {
                cars: vec![PlannedCar {
                    id: None,
                    name: "CS1~1".into(),
                    current_plan: vec![16.0],
                }],
            })
        });
        let response = app(gateway)
            .oneshot(post("/api/v1/tenants/acme/site-areas/SA1/smart-charging"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["siteAreaId"], "SA1");
        assert_eq!(body["profiles"][0]["chargingStationId"], "CS1");
        let schedule = &body["profiles"][0]["profile"]["chargingSchedule"];
        assert_eq!(schedule["chargingSchedulePeriod"][0]["limit"], 48.0);
        assert_eq!(body["unchanged"], 0);
    }

    #[tokio::test]
    async fn test_unknown_site_area_is_404() {
        let response = app(MockOptimizerGateway::new())
            .oneshot(post("/api/v1/tenants/T1/site-areas/SA9/smart-charging"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"], "NotFound");
    }

    #[tokio::test]
    async fn test_unknown_tenant_is_404() {
        let response = app(MockOptimizerGateway::new())
            .oneshot(post("/api/v1/tenants/nobody/site-areas/SA1/smart-charging"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_solver_outage_is_503() {
        let mut gateway = MockOptimizerGateway::new();
        gateway.expect_optimize().returning(|_| {
            Err(OptimizerError::Status {
                status: 500,
                body: "down".into(),
            })
        });
        let response = app(gateway)
            .oneshot(post("/api/v1/tenants/T1/site-areas/SA1/smart-charging"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_optimizer_check() {
        let mut gateway = MockOptimizerGateway::new();
        gateway.expect_check_connection().returning(|| Ok(()));
        let response = app(gateway)
            .oneshot(Request::get("/api/v1/optimizer/check").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }
}
