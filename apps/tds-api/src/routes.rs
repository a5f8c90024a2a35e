//! # HTTP Routes
//!
//! axum router for the TDS API. Handlers are thin: parse the request, call
//! a service, wrap the result in `Json`.
//!
//! ## Endpoints
//! ```text
//! GET  /health
//! GET  /api/tds/retailers/{retailer_id}?fiscalYear=2025-2026
//! GET  /api/tds/retailers/{retailer_id}/history
//! POST /api/tds/retailers/{retailer_id}/campaign-amounts
//! POST /api/tds/retailers/{retailer_id}/recalculate
//! POST /api/tds/retailers/{retailer_id}/rate
//! GET  /api/tds/records/{record_id}
//! GET  /api/tds/summary?fiscalYear=2025-2026
//! GET  /api/tds/near-threshold?fiscalYear=2025-2026&threshold=10000000
//! ```
//!
//! Amounts on the wire are integer paise.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tds_core::{
    CampaignAmount, CampaignAmountChange, FiscalYear, FiscalYearSummary, LedgerRecord, Money,
    RetailerHistory,
};
use tds_db::migrations::migration_status;

use crate::error::ApiResult;
use crate::services::{
    CampaignAmountResponse, LedgerService, NearThresholdResponse, RateUpdateResponse, ReportService,
};
use crate::AppState;

/// Builds the application router.
pub fn router(state: Arc<AppState>) -> Router {
    let tds = Router::new()
        .route("/retailers/{retailer_id}", get(get_by_retailer))
        .route("/retailers/{retailer_id}/history", get(get_history))
        .route("/retailers/{retailer_id}/campaign-amounts", post(apply_campaign_amount))
        .route("/retailers/{retailer_id}/recalculate", post(recalculate))
        .route("/retailers/{retailer_id}/rate", post(update_rate))
        .route("/records/{record_id}", get(get_by_id))
        .route("/summary", get(get_summary))
        .route("/near-threshold", get(get_near_threshold));

    Router::new()
        .route("/health", get(health))
        .nest("/api/tds", tds)
        .with_state(state)
}

// =============================================================================
// Request Types
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FiscalYearQuery {
    pub fiscal_year: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearThresholdQuery {
    pub fiscal_year: Option<String>,
    /// Threshold override in paise.
    pub threshold: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignAmountRequest {
    pub campaign_id: String,
    pub campaign_name: String,
    pub new_amount: Money,
    #[serde(default)]
    pub previous_amount: Money,
    pub fiscal_year: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecalculateRequest {
    pub fiscal_year: Option<String>,
    /// Full snapshot; the stored campaign budget is used when absent.
    pub campaigns: Option<Vec<CampaignAmount>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateRequest {
    pub fiscal_year: Option<String>,
}

/// Parses an optional fiscal-year parameter into a validation error
/// rather than an extractor rejection.
fn parse_fiscal_year(raw: Option<&str>) -> ApiResult<Option<FiscalYear>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => Ok(Some(s.parse()?)),
        None => Ok(None),
    }
}

// =============================================================================
// Health
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: bool,
    pub migrations_applied: usize,
    pub migrations_total: usize,
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let database = state.db.health_check().await;
    let (total, applied) = migration_status(state.db.pool()).await.unwrap_or((0, 0));

    Json(HealthResponse {
        status: if database && applied == total { "ok" } else { "degraded" },
        database,
        migrations_applied: applied,
        migrations_total: total,
    })
}

// =============================================================================
// Reporting Handlers
// =============================================================================

async fn get_by_retailer(
    State(state): State<Arc<AppState>>,
    Path(retailer_id): Path<String>,
    query: Result<Query<FiscalYearQuery>, QueryRejection>,
) -> ApiResult<Json<LedgerRecord>> {
    let Query(query) = query?;
    let fiscal_year = parse_fiscal_year(query.fiscal_year.as_deref())?;
    let record = ReportService::new(state)
        .get_by_retailer_year(&retailer_id, fiscal_year)
        .await?;
    Ok(Json(record))
}

async fn get_history(
    State(state): State<Arc<AppState>>,
    Path(retailer_id): Path<String>,
) -> ApiResult<Json<RetailerHistory>> {
    Ok(Json(ReportService::new(state).history(&retailer_id).await?))
}

async fn get_by_id(
    State(state): State<Arc<AppState>>,
    Path(record_id): Path<String>,
) -> ApiResult<Json<LedgerRecord>> {
    Ok(Json(ReportService::new(state).get_by_id(&record_id).await?))
}

async fn get_summary(
    State(state): State<Arc<AppState>>,
    query: Result<Query<FiscalYearQuery>, QueryRejection>,
) -> ApiResult<Json<FiscalYearSummary>> {
    let Query(query) = query?;
    let fiscal_year = parse_fiscal_year(query.fiscal_year.as_deref())?;
    Ok(Json(ReportService::new(state).fiscal_year_summary(fiscal_year).await?))
}

async fn get_near_threshold(
    State(state): State<Arc<AppState>>,
    query: Result<Query<NearThresholdQuery>, QueryRejection>,
) -> ApiResult<Json<NearThresholdResponse>> {
    let Query(query) = query?;
    let fiscal_year = parse_fiscal_year(query.fiscal_year.as_deref())?;
    let threshold = query.threshold.map(Money::from_paise);
    Ok(Json(
        ReportService::new(state).near_threshold(fiscal_year, threshold).await?,
    ))
}

// =============================================================================
// Ledger Handlers
// =============================================================================

async fn apply_campaign_amount(
    State(state): State<Arc<AppState>>,
    Path(retailer_id): Path<String>,
    body: Result<Json<CampaignAmountRequest>, JsonRejection>,
) -> ApiResult<Json<CampaignAmountResponse>> {
    let Json(request) = body?;
    let fiscal_year = parse_fiscal_year(request.fiscal_year.as_deref())?;
    let change = CampaignAmountChange {
        campaign_id: request.campaign_id,
        campaign_name: request.campaign_name,
        new_amount: request.new_amount,
        previous_amount: request.previous_amount,
    };

    let response = LedgerService::new(state)
        .apply_campaign_amount(&retailer_id, fiscal_year, &change)
        .await?;
    Ok(Json(response))
}

async fn recalculate(
    State(state): State<Arc<AppState>>,
    Path(retailer_id): Path<String>,
    body: Result<Json<RecalculateRequest>, JsonRejection>,
) -> ApiResult<Json<LedgerRecord>> {
    let Json(request) = body?;
    let fiscal_year = parse_fiscal_year(request.fiscal_year.as_deref())?;
    let record = LedgerService::new(state)
        .recalculate(&retailer_id, fiscal_year, request.campaigns)
        .await?;
    Ok(Json(record))
}

async fn update_rate(
    State(state): State<Arc<AppState>>,
    Path(retailer_id): Path<String>,
    body: Result<Json<RateRequest>, JsonRejection>,
) -> ApiResult<Json<RateUpdateResponse>> {
    let Json(request) = body?;
    let fiscal_year = parse_fiscal_year(request.fiscal_year.as_deref())?;
    let response = LedgerService::new(state)
        .update_rate(&retailer_id, fiscal_year)
        .await?;
    Ok(Json(response))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ledger_service::tests::{new_id, seed_retailer, test_state};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn send(state: &Arc<AppState>, request: Request<Body>) -> (StatusCode, Value) {
        let response = router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap_or(Value::Null)
        };
        (status, json)
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_req(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let state = test_state().await;
        let (status, json) = send(&state, get_req("/health")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["database"], true);
    }

    #[tokio::test]
    async fn test_campaign_amount_then_lookup() {
        let state = test_state().await;
        let retailer = seed_retailer(&state, Some("Sole Proprietorship"), Some("ABCDE1234F"), None).await;

        let (status, json) = send(
            &state,
            post_req(
                &format!("/api/tds/retailers/{}/campaign-amounts", retailer.id),
                json!({
                    "campaignId": "c1",
                    "campaignName": "Diwali",
                    "newAmount": 3_500_000,
                    "fiscalYear": "2025-2026"
                }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["outcome"]["kind"], "individual");
        assert_eq!(json["outcome"]["withholding"], 35_000);
        assert_eq!(json["record"]["applicableRate"], 1);
        assert_eq!(json["record"]["totalIndividualAmount"], 35_000);
        assert_eq!(json["record"]["totalAmount"], 35_000);
        assert_eq!(json["record"]["fiscalYear"], "2025-2026");

        let record_id = json["record"]["id"].as_str().unwrap().to_string();

        let (status, json) = send(
            &state,
            get_req(&format!("/api/tds/retailers/{}?fiscalYear=2025-2026", retailer.id)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["id"], record_id.as_str());

        let (status, json) = send(&state, get_req(&format!("/api/tds/records/{}", record_id))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["totalCommitted"], 3_500_000);
    }

    #[tokio::test]
    async fn test_recalculate_then_history_and_summary() {
        let state = test_state().await;
        let retailer = seed_retailer(&state, None, Some("ABCDE1234F"), Some("Kerala")).await;

        let (status, json) = send(
            &state,
            post_req(
                &format!("/api/tds/retailers/{}/recalculate", retailer.id),
                json!({
                    "fiscalYear": "2025-2026",
                    "campaigns": [
                        { "campaignId": "c1", "campaignName": "Summer", "amount": 6_000_000 },
                        { "campaignId": "c2", "campaignName": "Monsoon", "amount": 5_000_000 }
                    ]
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["thresholdCrossed"], true);
        assert_eq!(json["cumulativeEntry"]["basis"], 11_000_000);

        let (status, json) = send(
            &state,
            get_req(&format!("/api/tds/retailers/{}/history", retailer.id)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["summary"]["totalYears"], 1);
        assert_eq!(json["summary"]["thresholdCrossedYears"], json!(["2025-2026"]));

        let (status, json) = send(&state, get_req("/api/tds/summary?fiscalYear=2025-2026")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["byState"][0]["state"], "Kerala");
        assert_eq!(json["byState"][0]["retailerCount"], 1);
        assert_eq!(json["totals"]["thresholdCrossedCount"], 1);
    }

    #[tokio::test]
    async fn test_near_threshold_endpoint() {
        let state = test_state().await;
        let retailer = seed_retailer(&state, None, Some("ABCDE1234F"), None).await;
        send(
            &state,
            post_req(
                &format!("/api/tds/retailers/{}/recalculate", retailer.id),
                json!({
                    "fiscalYear": "2025-2026",
                    "campaigns": [{ "campaignId": "c1", "campaignName": "Summer", "amount": 9_500_000 }]
                }),
            ),
        )
        .await;

        let (status, json) = send(&state, get_req("/api/tds/near-threshold?fiscalYear=2025-2026")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["warningLine"], 9_000_000);
        assert_eq!(json["alerts"][0]["remaining"], 500_000);
        assert_eq!(json["alerts"][0]["percentage"], 95.0);

        let (_, json) = send(
            &state,
            get_req("/api/tds/near-threshold?fiscalYear=2025-2026&threshold=20000000"),
        )
        .await;
        assert_eq!(json["alerts"], json!([]));
    }

    #[tokio::test]
    async fn test_rate_endpoint_requires_record() {
        let state = test_state().await;
        let retailer = seed_retailer(&state, None, Some("ABCDE1234F"), None).await;

        let (status, json) = send(
            &state,
            post_req(
                &format!("/api/tds/retailers/{}/rate", retailer.id),
                json!({ "fiscalYear": "2025-2026" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_error_statuses() {
        let state = test_state().await;

        let (status, json) = send(&state, get_req("/api/tds/retailers/not-a-uuid")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "VALIDATION_ERROR");

        let (status, _) = send(
            &state,
            get_req(&format!("/api/tds/retailers/{}?fiscalYear=2025-2027", new_id())),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, json) = send(&state, get_req(&format!("/api/tds/records/{}", new_id()))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["code"], "NOT_FOUND");

        let retailer = seed_retailer(&state, None, Some("ABCDE1234F"), None).await;
        let (status, json) = send(
            &state,
            post_req(
                &format!("/api/tds/retailers/{}/campaign-amounts", retailer.id),
                json!({ "campaignId": "c1", "campaignName": "Summer", "newAmount": -1 }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_malformed_bodies_are_validation_errors() {
        let state = test_state().await;
        let retailer = seed_retailer(&state, None, Some("ABCDE1234F"), None).await;
        let uri = format!("/api/tds/retailers/{}/recalculate", retailer.id);

        let (status, json) = send(
            &state,
            post_req(&uri, json!({ "campaigns": [{ "campaignId": "c1", "amount": 100 }] })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "VALIDATION_ERROR");
        assert!(json["message"].as_str().unwrap().contains("campaignName"));

        let request = Request::builder()
            .method("POST")
            .uri(&uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{ not json"))
            .unwrap();
        let (status, json) = send(&state, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "VALIDATION_ERROR");

        let (status, json) = send(&state, get_req("/api/tds/near-threshold?threshold=lots")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "VALIDATION_ERROR");
    }

    #[test]
    fn test_parse_fiscal_year() {
        assert_eq!(parse_fiscal_year(None).unwrap(), None);
        assert_eq!(parse_fiscal_year(Some(" ")).unwrap(), None);
        assert_eq!(
            parse_fiscal_year(Some("2025-2026")).unwrap(),
            Some("2025-2026".parse().unwrap())
        );
        assert!(parse_fiscal_year(Some("2025")).is_err());
    }
}
