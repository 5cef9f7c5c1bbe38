use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{compression::CompressionLayer, trace::TraceLayer};
use tracing::info;

use crate::{
    api::handler::{
        get_final_confirmations, get_payment_history, get_unpaid, health_check, manual_pay,
        trigger_reconcile, AppState,
    },
    middleware::create_cors_layer,
};

pub async fn create_app(state: AppState, cors_origins: &[String]) -> Router {
    info!("⚙️ Setting up HTTP routes...");

    let app = Router::new()
        .route("/health", get(health_check))
        .nest(
            "/api/v1",
            Router::new()
                // Cross-region settlement view
                .route("/final-confirmations", post(get_final_confirmations))
                .route("/unpaid", post(get_unpaid))
                // Single-region lookups and writes
                .route("/payment-history", post(get_payment_history))
                .route("/manual-pay", post(manual_pay))
                // Scheduled job trigger
                .route("/jobs/reconcile", post(trigger_reconcile)),
        )
        .layer(CompressionLayer::new())
        .layer(create_cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!("✓ HTTP routes configured");
    app
}

pub async fn run_server(app: Router, bind_address: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_address).await?;
    info!("🌐 Server listening on: {}", bind_address);

    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lease::cache::InMemoryLeaseCache;
    use crate::lease::ExecutionLeaseGuard;
    use crate::reconcile::test_support::*;
    use crate::reconcile::{ManualPayService, ReconcileOptions, Reconciler, UnpaidAudit};
    use crate::region::memory::{MemoryRegionGateway, Table};
    use crate::region::models::{RegionId, SubmissionStatus};
    use crate::region::registry::{RegionRegistry, RegionStore};
    use crate::settlement::ReconcileJob;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn app() -> (Router, Arc<MemoryRegionGateway>) {
        let korea = Arc::new(MemoryRegionGateway::new());
        korea.add_submission(submission("S1", "U1", "C1", minutes_ago(30))).await;
        korea.add_application(application("A1", "U1", "C1", Some("Jane"))).await;
        korea.add_campaign(reward_campaign("C1", 200)).await;

        let mut approved = submission("S2", "U2", "C1", minutes_ago(60 * 48));
        approved.status = SubmissionStatus::Approved;
        approved.approved_at = Some(minutes_ago(60 * 24));
        korea.add_submission(approved).await;
        korea.add_profile(profile("U2", "Kim")).await;

        let mut registry = RegionRegistry::new();
        registry.register(RegionId::new("korea"), RegionStore::new(korea.clone()));
        registry.register_unconfigured(RegionId::new("japan"));

        let reconciler = Arc::new(Reconciler::new(registry.clone(), ReconcileOptions::default()));
        let guard = ExecutionLeaseGuard::new(
            Arc::new(InMemoryLeaseCache::new()),
            None,
            chrono::Duration::minutes(5),
        );
        let state = AppState {
            reconciler: reconciler.clone(),
            manual_pay: Arc::new(ManualPayService::new(registry.clone())),
            unpaid: Arc::new(UnpaidAudit::new(registry, ReconcileOptions::default())),
            reconcile_job: Arc::new(ReconcileJob::new(reconciler, Arc::new(guard))),
        };

        (create_app(state, &["http://localhost:3000".to_string()]).await, korea)
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(body) => {
                request = request.header("content-type", "application/json");
                Body::from(body.to_string())
            }
            None => Body::empty(),
        };

        let response = app.clone().oneshot(request.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    #[tokio::test]
    async fn test_health_lists_regions() {
        let (app, _) = app().await;
        let (status, body) = send(&app, "GET", "/health", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["regions"][0], json!({"id": "korea", "configured": true}));
        assert_eq!(body["regions"][1], json!({"id": "japan", "configured": false}));
    }

    #[tokio::test]
    async fn test_final_confirmations_payload_is_camel_case() {
        let (app, _) = app().await;
        let (status, body) = send(&app, "POST", "/api/v1/final-confirmations", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["confirmed"], json!([]));
        let first = &body["pending"][0];
        assert_eq!(first["id"], "S1");
        assert_eq!(first["region"], "korea");
        assert_eq!(first["creatorName"], "Jane");
        assert_eq!(first["pointAmount"], 200);
        assert_eq!(first["isPaid"], false);
        assert_eq!(first["finalConfirmedAt"], Value::Null);
    }

    #[tokio::test]
    async fn test_manual_pay_then_history() {
        let (app, korea) = app().await;
        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/manual-pay",
            Some(json!({
                "region": "korea",
                "userId": "U2",
                "campaignId": "C1",
                "amount": 200,
                "submissionId": "S2"
            })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["finalConfirmedBackfilled"], true);
        assert_eq!(body["entry"]["transactionType"], "campaign_payment");
        assert!(korea.submission("S2").await.unwrap().final_confirmed_at.is_some());

        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/payment-history",
            Some(json!({"region": "korea", "userId": "U2"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["transactions"].as_array().map(Vec::len), Some(1));
        assert_eq!(body["transactions"][0]["amount"], 200);
        assert_eq!(body["history"], json!([]));
    }

    #[tokio::test]
    async fn test_payment_history_survives_missing_history_table() {
        let (app, korea) = app().await;
        korea
            .add_history_entry(ledger("H1", "U1", Some("C1"), 150, minutes_ago(20)))
            .await;
        korea
            .add_ledger_entry(ledger("L1", "U1", Some("C1"), 150, minutes_ago(20)))
            .await;
        let request = json!({"region": "korea", "userId": "U1"});

        let (_, body) = send(&app, "POST", "/api/v1/payment-history", Some(request.clone())).await;
        assert_eq!(body["history"][0]["id"], "H1");
        assert_eq!(body["transactions"][0]["id"], "L1");

        korea.fail_table(Table::History);
        let (status, body) = send(&app, "POST", "/api/v1/payment-history", Some(request)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["history"], json!([]));
        assert_eq!(body["transactions"][0]["id"], "L1");
    }

    #[tokio::test]
    async fn test_manual_pay_rejects_bad_input() {
        let (app, korea) = app().await;

        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/manual-pay",
            Some(json!({"region": "korea", "userId": "", "campaignId": "C1", "amount": 10})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);

        let (status, _) = send(
            &app,
            "POST",
            "/api/v1/manual-pay",
            Some(json!({"region": "korea", "userId": "U1", "campaignId": "C1", "amount": 0})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            "POST",
            "/api/v1/manual-pay",
            Some(json!({"region": "japan", "userId": "U1", "campaignId": "C1", "amount": 10})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        assert_eq!(korea.ledger_len().await, 0);
    }

    #[tokio::test]
    async fn test_unpaid_lists_approved_pairs() {
        let (app, _) = app().await;
        let (status, body) = send(&app, "POST", "/api/v1/unpaid", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 1);
        assert_eq!(body["unpaidItems"][0]["id"], "S2");
        assert_eq!(body["unpaidItems"][0]["type"], "submission");
        assert_eq!(body["unpaidItems"][0]["daysSinceApproval"], 1);
        assert_eq!(body["unpaidItems"][0]["reasons"][0]["kind"], "unknown");
        assert_eq!(body["summary"]["byRegion"]["korea"], 1);
    }

    #[tokio::test]
    async fn test_job_trigger_skips_duplicates_unless_manual() {
        let (app, _) = app().await;

        let (_, first) = send(&app, "POST", "/api/v1/jobs/reconcile", None).await;
        assert_eq!(first["skipped"], false);
        assert_eq!(first["pending"], 2);

        let (status, second) = send(&app, "POST", "/api/v1/jobs/reconcile", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(second["success"], true);
        assert_eq!(second["skipped"], true);
        assert!(second["reason"].as_str().is_some());

        let (_, manual) = send(&app, "POST", "/api/v1/jobs/reconcile?manual=true", None).await;
        assert_eq!(manual["skipped"], false);
        let (_, test) = send(&app, "POST", "/api/v1/jobs/reconcile?test=true", None).await;
        assert_eq!(test["skipped"], false);
    }
}
