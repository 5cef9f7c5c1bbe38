use axum::{
    extract::{Query, State},
    Json,
};
use std::sync::Arc;
use tracing::info;

use super::models::*;
use crate::{
    error::AppResult,
    middleware::ValidatedJson,
    reconcile::{or_empty, ManualPayService, ManualPayment, Reconciler, UnpaidAudit},
    region::models::{LedgerEntry, RegionId},
    settlement::{JobOutcome, ReconcileJob},
};

/// Newest ledger entries returned by the payment history lookup
pub const PAYMENT_HISTORY_LIMIT: i64 = 50;

#[derive(Clone)]
pub struct AppState {
    pub reconciler: Arc<Reconciler>,
    pub manual_pay: Arc<ManualPayService>,
    pub unpaid: Arc<UnpaidAudit>,
    pub reconcile_job: Arc<ReconcileJob>,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let regions: Vec<RegionHealth> = state
        .reconciler
        .registry()
        .regions()
        .iter()
        .map(|r| RegionHealth {
            id: r.id.clone(),
            configured: r.is_configured(),
        })
        .collect();

    let status = if regions.iter().all(|r| r.configured) {
        "healthy"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status: status.to_string(),
        regions,
    })
}

/// POST /api/v1/final-confirmations
pub async fn get_final_confirmations(
    State(state): State<AppState>,
) -> Json<FinalConfirmationsResponse> {
    let report = state.reconciler.reconcile().await;
    Json(FinalConfirmationsResponse {
        success: true,
        confirmed: report.confirmed,
        pending: report.pending,
    })
}

/// POST /api/v1/payment-history
pub async fn get_payment_history(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<PaymentHistoryRequest>,
) -> AppResult<Json<PaymentHistoryResponse>> {
    let region = RegionId::new(&request.region);
    let store = state.reconciler.registry().store(&region)?;

    // Not every region keeps the history table; the ledger is authoritative
    let history: Vec<LedgerEntry> = or_empty(
        &region,
        "point_history",
        store
            .gateway
            .fetch_point_history(&request.user_id, PAYMENT_HISTORY_LIMIT)
            .await,
    );
    let transactions: Vec<LedgerEntry> = store
        .gateway
        .fetch_user_ledger(&request.user_id, PAYMENT_HISTORY_LIMIT)
        .await?;

    Ok(Json(PaymentHistoryResponse {
        success: true,
        history,
        transactions,
    }))
}

/// POST /api/v1/manual-pay
pub async fn manual_pay(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<ManualPayRequest>,
) -> AppResult<Json<ManualPayResponse>> {
    info!(
        "Manual pay requested: region={}, user={}, campaign={}",
        request.region, request.user_id, request.campaign_id
    );

    let receipt = state
        .manual_pay
        .pay(ManualPayment {
            region: RegionId::new(&request.region),
            user_id: request.user_id,
            campaign_id: request.campaign_id,
            amount: request.amount,
            description: request.description,
            submission_id: request.submission_id,
        })
        .await?;

    Ok(Json(ManualPayResponse {
        success: true,
        receipt,
    }))
}

/// POST /api/v1/unpaid
pub async fn get_unpaid(State(state): State<AppState>) -> Json<UnpaidResponse> {
    let report = state.unpaid.audit().await;
    Json(UnpaidResponse {
        success: true,
        count: report.items.len(),
        unpaid_items: report.items,
        summary: report.summary,
    })
}

/// POST /api/v1/jobs/reconcile
pub async fn trigger_reconcile(
    State(state): State<AppState>,
    Query(query): Query<JobTriggerQuery>,
) -> Json<JobOutcome> {
    Json(state.reconcile_job.run(query.is_manual_override()).await)
}
