use std::{str::FromStr, sync::Arc};

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use flagtree_core::{
    DeleteReport, FlaggedTransaction, NewTransaction, SearchReport, StoreError, TransactionStore,
};

use crate::docs;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TransactionStore>,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(store: Arc<dyn TransactionStore>, metrics: Option<PrometheusHandle>) -> Self {
        Self { store, metrics }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/flagged-transactions", post(insert).get(list))
        .route("/api/flagged-transactions/search", get(search))
        .route("/api/flagged-transactions/size", get(size))
        .route("/api/flagged-transactions/:transaction_id", delete(remove))
        .route("/api/docs/bst-explanation", get(docs::bst_explanation))
        .route("/health", get(health))
        .route("/metrics", get(render_metrics))
        .with_state(state)
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Store(StoreError::InvalidTransaction(_)) => StatusCode::BAD_REQUEST,
            ApiError::Store(StoreError::DuplicateTransaction(_)) => StatusCode::CONFLICT,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }
        (status, Json(ErrorBody {
            success: false,
            message: self.to_string(),
        }))
            .into_response()
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct InsertRequest {
    pub transaction_id: Option<String>,
    pub amount: Option<Value>,
    pub reason: Option<String>,
}

impl InsertRequest {
    /// Boundary validation: trims the id, requires a numeric amount.
    pub fn into_new_transaction(self) -> Result<NewTransaction, ApiError> {
        let transaction_id = self
            .transaction_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ApiError::BadRequest("transactionId is required".to_string()))?;

        let amount = match self.amount {
            None | Some(Value::Null) => return Err(ApiError::BadRequest("amount is required".to_string())),
            Some(Value::Number(n)) => parse_amount(&n.to_string())?,
            Some(Value::String(s)) => parse_amount(s.trim())?,
            Some(_) => return Err(ApiError::BadRequest("amount must be numeric".to_string())),
        };

        Ok(NewTransaction {
            transaction_id,
            amount,
            reason: self.reason.map(|r| r.trim().to_string()),
        })
    }
}

fn parse_amount(raw: &str) -> Result<Decimal, ApiError> {
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map_err(|_| ApiError::BadRequest(format!("amount must be numeric, got '{}'", raw)))
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct InsertResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub async fn insert(
    State(state): State<AppState>,
    payload: Result<Json<InsertRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<InsertResponse>), ApiError> {
    let Json(request) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let transaction = request.into_new_transaction().map_err(|e| {
        metrics::counter!("flagtree_inserts_total", 1, "outcome" => "invalid");
        e
    })?;

    let report = match state.store.insert(transaction) {
        Ok(report) => report,
        Err(e) => {
            let outcome = if matches!(e, StoreError::DuplicateTransaction(_)) { "conflict" } else { "invalid" };
            metrics::counter!("flagtree_inserts_total", 1, "outcome" => outcome);
            return Err(e.into());
        }
    };

    let (outcome, message) = if report.replaced {
        ("replaced", "Flagged transaction replaced in BST.")
    } else {
        ("created", "Flagged transaction added to BST.")
    };
    metrics::counter!("flagtree_inserts_total", 1, "outcome" => outcome);
    metrics::gauge!("flagtree_records", report.size as f64);

    let status = if report.replaced { StatusCode::OK } else { StatusCode::CREATED };
    Ok((status, Json(InsertResponse {
        success: true,
        size: Some(report.size),
        message: Some(message.to_string()),
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub transaction_id: Option<String>,
}

pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchReport>, ApiError> {
    let transaction_id = params
        .transaction_id
        .map(|id| id.trim().to_string())
        .ok_or_else(|| ApiError::BadRequest("transactionId query parameter is required".to_string()))?;

    let report = state.store.search(&transaction_id)?;
    metrics::counter!("flagtree_searches_total", 1, "found" => if report.found { "true" } else { "false" });
    metrics::histogram!("flagtree_bst_comparisons", report.bst_comparisons as f64);
    metrics::histogram!("flagtree_list_comparisons", report.list_comparisons as f64);
    Ok(Json(report))
}

pub async fn remove(
    State(state): State<AppState>,
    Path(transaction_id): Path<String>,
) -> Result<Json<DeleteReport>, ApiError> {
    let report = state.store.delete(transaction_id.trim())?;
    let node_type = report.node_type.map(|t| t.as_str()).unwrap_or("absent");
    metrics::counter!("flagtree_deletes_total", 1, "node_type" => node_type);
    metrics::gauge!("flagtree_records", report.size as f64);
    Ok(Json(report))
}

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Arc<FlaggedTransaction>>>, ApiError> {
    Ok(Json(state.store.list()?))
}

pub async fn size(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    Ok(Json(json!({ "size": state.store.size()? })))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "UP" }))
}

pub async fn render_metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use flagtree_core::NodeType;
    use flagtree_memory::InMemoryStore;
    use rust_decimal_macros::dec;

    use super::*;

    fn state() -> AppState {
        AppState::new(Arc::new(InMemoryStore::new()), None)
    }

    fn request(id: &str, amount: Value) -> Result<Json<InsertRequest>, JsonRejection> {
        Ok(Json(InsertRequest {
            transaction_id: Some(id.to_string()),
            amount: Some(amount),
            reason: Some("suspicious".to_string()),
        }))
    }

    #[test]
    fn router_builds() {
        let _ = router(state());
    }

    #[test]
    fn accepts_numbers_and_numeric_strings() {
        let tx = InsertRequest {
            transaction_id: Some("  TX1 ".into()),
            amount: Some(json!(250.5)),
            reason: None,
        }
        .into_new_transaction()
        .unwrap();
        assert_eq!(tx.transaction_id, "TX1");
        assert_eq!(tx.amount, dec!(250.5));

        let tx = InsertRequest {
            transaction_id: Some("TX2".into()),
            amount: Some(json!("19.99")),
            reason: None,
        }
        .into_new_transaction()
        .unwrap();
        assert_eq!(tx.amount, dec!(19.99));
    }

    #[test]
    fn high_precision_amounts_are_exact() {
        let raw = r#"{"transactionId":"TX1","amount":1234567890123456789.123456789}"#;
        let request: InsertRequest = serde_json::from_str(raw).unwrap();
        let tx = request.into_new_transaction().unwrap();
        assert_eq!(tx.amount, dec!(1234567890123456789.123456789));

        let request: InsertRequest = serde_json::from_str(r#"{"transactionId":"TX2","amount":1.5e3}"#).unwrap();
        assert_eq!(request.into_new_transaction().unwrap().amount, dec!(1500));
    }

    #[test]
    fn rejects_missing_or_non_numeric_fields() {
        let missing_id = InsertRequest { amount: Some(json!(1)), ..Default::default() };
        assert!(matches!(missing_id.into_new_transaction(), Err(ApiError::BadRequest(_))));

        let missing_amount = InsertRequest { transaction_id: Some("TX1".into()), ..Default::default() };
        assert!(matches!(missing_amount.into_new_transaction(), Err(ApiError::BadRequest(_))));

        for amount in [json!("abc"), json!(true), json!([1])] {
            let req = InsertRequest {
                transaction_id: Some("TX1".into()),
                amount: Some(amount),
                reason: None,
            };
            let err = req.into_new_transaction().unwrap_err();
            assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn insert_then_conflict() {
        let state = state();
        let (status, Json(body)) = insert(State(state.clone()), request("TX1007", json!(250.00))).await.unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body.size, Some(1));
        assert!(body.success);

        let err = insert(State(state.clone()), request("TX1007", json!(1))).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn search_and_delete_round_trip() {
        let state = state();
        for id in ["TX1007", "TX1003", "TX1010"] {
            let (status, _) = insert(State(state.clone()), request(id, json!(10))).await.unwrap();
            assert_eq!(status, StatusCode::CREATED);
        }

        let Json(report) = search(
            State(state.clone()),
            Query(SearchParams { transaction_id: Some("TX1010".into()) }),
        )
        .await
        .unwrap();
        assert!(report.found);
        assert_eq!(report.bst_comparisons, 2);
        assert_eq!(report.list_comparisons, 3);

        let Json(deleted) = remove(State(state.clone()), Path("TX1007".into())).await.unwrap();
        assert_eq!(deleted.node_type, Some(NodeType::TwoChildren));
        assert_eq!(deleted.promoted_key.as_deref(), Some("TX1010"));

        let Json(again) = remove(State(state.clone()), Path("TX1007".into())).await.unwrap();
        assert!(!again.deleted);

        let Json(listing) = list(State(state)).await.unwrap();
        let ids: Vec<&str> = listing.iter().map(|t| t.transaction_id()).collect();
        assert_eq!(ids, vec!["TX1003", "TX1010"]);
    }

    #[tokio::test]
    async fn search_requires_id() {
        let err = search(State(state()), Query(SearchParams { transaction_id: None })).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err = search(State(state()), Query(SearchParams { transaction_id: Some("   ".into()) }))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn metrics_absent_without_recorder() {
        assert_eq!(render_metrics(State(state())).await.status(), StatusCode::NOT_FOUND);
    }
}
