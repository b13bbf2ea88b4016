//! Loan lifecycle endpoints
//!
//! Every response uses the `{code, message, data}` envelope. Errors add the machine
//! readable `error` code and `stateChanged`, which is only true when funding was
//! persisted but some agreement letters were not delivered.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use lending_core::prelude::*;
use lending_engine::engine::InvestmentOutcome;
use rust_decimal::Decimal;
use serde::Serialize;

use super::AppState;

/// Success envelope
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T> {
    /// HTTP status code
    pub code: u16,
    /// Human readable outcome
    pub message: String,
    /// Payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    fn new(status: StatusCode, message: &str, data: T) -> (StatusCode, Json<Self>) {
        (
            status,
            Json(Self {
                code: status.as_u16(),
                message: message.to_string(),
                data: Some(data),
            }),
        )
    }
}

/// Error envelope
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    /// HTTP status code
    pub code: u16,
    /// Human readable reason
    pub message: String,
    /// Stable error code
    pub error: String,
    /// Whether persisted state changed despite the error
    pub state_changed: bool,
    /// Investors that were not notified
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<NotificationFailure>,
}

/// Handler error mapped onto an HTTP status
#[derive(Debug)]
pub enum ApiError {
    /// Malformed body or path
    BadRequest(String),
    /// Error reported by the engine
    Lending(LendingError),
}

impl From<LendingError> for ApiError {
    fn from(err: LendingError) -> Self {
        ApiError::Lending(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// HTTP status for an engine error
pub fn status_for(err: &LendingError) -> StatusCode {
    match err {
        LendingError::Validation(_) => StatusCode::BAD_REQUEST,
        LendingError::NotFound { .. } => StatusCode::NOT_FOUND,
        LendingError::StateConflict { .. }
        | LendingError::Overfunding { .. }
        | LendingError::Reconciliation { .. } => StatusCode::CONFLICT,
        LendingError::Dependency(_) => StatusCode::SERVICE_UNAVAILABLE,
        LendingError::PartialNotification { .. } => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: StatusCode::BAD_REQUEST.as_u16(),
                    message,
                    error: "validation_error".to_string(),
                    state_changed: false,
                    failures: Vec::new(),
                },
            ),
            ApiError::Lending(err) => {
                let status = status_for(&err);
                let state_changed = err.state_changed();
                let error = err.code().to_string();
                let message = err.to_string();
                let failures = match err {
                    LendingError::PartialNotification { failures, .. } => failures,
                    _ => Vec::new(),
                };
                (
                    status,
                    ErrorBody {
                        code: status.as_u16(),
                        message,
                        error,
                        state_changed,
                        failures,
                    },
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

/// Result of an accepted investment
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentResponse {
    /// Stored investment
    pub investment: Investment,
    /// Loan after the investment
    pub loan: Loan,
    /// Running total including this investment
    pub running_total: Decimal,
    /// Capacity left, zero once funded
    pub remaining: Decimal,
    /// Whether this investment completed funding
    pub funding_completed: bool,
    /// Investors that received the agreement letter
    pub notified: Vec<InvestorId>,
}

impl From<InvestmentOutcome> for InvestmentResponse {
    fn from(outcome: InvestmentOutcome) -> Self {
        let remaining = match outcome.funding {
            FundingCheck::Under { remaining } => remaining,
            _ => Decimal::ZERO,
        };
        Self {
            funding_completed: outcome.completed_funding(),
            investment: outcome.investment,
            loan: outcome.loan,
            running_total: outcome.running_total,
            remaining,
            notified: outcome.notified,
        }
    }
}

/// Build the loan routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/loans", post(create_loan))
        .route("/api/v1/loans/{id}", get(get_loan))
        .route("/api/v1/loans/approve", post(approve_loan))
        .route("/api/v1/loans/invest", post(invest_loan))
        .route("/api/v1/loans/disburse", post(disburse_loan))
}

/// POST /api/v1/loans
async fn create_loan(
    State(state): State<AppState>,
    body: Result<Json<CreateLoanRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = body?;
    let loan = state.engine.create_loan(request).await?;
    Ok(ApiResponse::new(StatusCode::CREATED, "create loan success", loan))
}

/// GET /api/v1/loans/{id}
async fn get_loan(
    State(state): State<AppState>,
    id: Result<Path<LoanId>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(id) = id?;
    let detail = state.engine.loan_detail(id).await?;
    Ok(ApiResponse::new(StatusCode::OK, "success get loan data", detail))
}

/// POST /api/v1/loans/approve
async fn approve_loan(
    State(state): State<AppState>,
    body: Result<Json<ApproveLoanRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = body?;
    let loan = state.engine.approve_loan(request).await?;
    Ok(ApiResponse::new(StatusCode::OK, "success approve loan", loan))
}

/// POST /api/v1/loans/invest
async fn invest_loan(
    State(state): State<AppState>,
    body: Result<Json<InvestLoanRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = body?;
    let outcome = state.engine.invest_loan(request).await?;
    Ok(ApiResponse::new(
        StatusCode::OK,
        "success invested",
        InvestmentResponse::from(outcome),
    ))
}

/// POST /api/v1/loans/disburse
async fn disburse_loan(
    State(state): State<AppState>,
    body: Result<Json<DisburseLoanRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = body?;
    let loan = state.engine.disburse_loan(request).await?;
    Ok(ApiResponse::new(StatusCode::OK, "success disburse loan", loan))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::routes::test_state;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn router() -> Router {
        routes().with_state(test_state(ServerConfig {
            notifier_enabled: false,
            ..Default::default()
        }))
    }

    async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(match body {
                Some(body) => Body::from(body.to_string()),
                None => Body::empty(),
            })
            .unwrap();
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_create_loan_returns_201() {
        let router = router();
        let (status, json) = send(
            &router,
            "POST",
            "/api/v1/loans",
            Some(json!({"borrower_id": 1, "principal_amount": "1000000", "rate": "5", "term_months": 12})),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["code"], 201);
        assert_eq!(json["message"], "create loan success");
        assert_eq!(json["data"]["id"], 1);
        assert_eq!(json["data"]["status"], "proposed");
        let interest: Decimal = json["data"]["total_interest"].as_str().unwrap().parse().unwrap();
        assert_eq!(interest, Decimal::from(50_000));
    }

    #[tokio::test]
    async fn test_validation_error_is_400() {
        let router = router();
        let (status, json) = send(
            &router,
            "POST",
            "/api/v1/loans",
            Some(json!({"borrower_id": 1, "principal_amount": "0", "rate": "5", "term_months": 12})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "validation_error");
        assert_eq!(json["stateChanged"], false);
        assert!(json.get("data").is_none());
    }

    #[tokio::test]
    async fn test_malformed_body_is_400() {
        let router = router();
        let (status, json) = send(&router, "POST", "/api/v1/loans/invest", Some(json!({"loan_id": "x"}))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], 400);
    }

    #[tokio::test]
    async fn test_non_numeric_path_is_400() {
        let router = router();
        let (status, _) = send(&router, "GET", "/api/v1/loans/abc", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_loan_is_404() {
        let router = router();
        let (status, json) = send(
            &router,
            "POST",
            "/api/v1/loans/approve",
            Some(json!({"loan_id": 42, "field_validator_id": 8})),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "not_found");
    }

    #[tokio::test]
    async fn test_state_conflict_is_409() {
        let router = router();
        send(
            &router,
            "POST",
            "/api/v1/loans",
            Some(json!({"borrower_id": 1, "principal_amount": "1000", "rate": "5", "term_months": 3})),
        )
        .await;

        let (status, json) = send(
            &router,
            "POST",
            "/api/v1/loans/invest",
            Some(json!({"loan_id": 1, "investor_id": 2, "amount": "100"})),
        )
        .await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["error"], "state_conflict");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&LendingError::validation("bad")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&LendingError::Reconciliation {
                loan_id: 1,
                principal: Decimal::from(10),
                invested: Decimal::from(9),
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_for(&LendingError::Dependency(DependencyError::ledger("down"))),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_for(&LendingError::PartialNotification {
                loan_id: 1,
                failures: vec![],
            }),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_partial_notification_body() {
        let err = ApiError::from(LendingError::PartialNotification {
            loan_id: 3,
            failures: vec![NotificationFailure {
                investor_id: 7,
                reason: "notifier call failed: bounced".to_string(),
            }],
        });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
