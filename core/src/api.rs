use std::sync::Arc;

use axum::{
    extract::{Json, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::{IntoParams, OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

use crate::allowance::AllowanceRecord;
use crate::errors::SaleError;
use crate::flow::FlowOutcome;
use crate::purchase::PurchaseRequest;
use crate::session::{SaleSession, SessionState};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EstimateQuery {
    /// USDT amount
    amount: String,
}

#[derive(Serialize, ToSchema)]
pub struct EstimateResponse {
    #[schema(example = "30")]
    amount: String,
    #[schema(example = "1000.00")]
    estimate: String,
}

#[derive(Serialize, ToSchema)]
pub struct AllowanceResponse {
    #[schema(value_type = Object)]
    allowance: AllowanceRecord,
    permits_purchase: bool,
}

#[derive(Serialize, ToSchema)]
pub struct ActionResponse {
    #[schema(example = "Transaction completed!")]
    message: String,
    #[schema(value_type = Object)]
    outcome: FlowOutcome,
}

impl IntoResponse for ActionResponse {
    fn into_response(self) -> Response {
        let status = self
            .outcome
            .error
            .as_ref()
            .map_or(StatusCode::OK, |failure| failure.status);
        (status, Json(self)).into_response()
    }
}

#[utoipa::path(
    get,
    path = "/estimate",
    params(EstimateQuery),
    responses(
        (status = 200, description = "Estimated SEL for a USDT amount", body = EstimateResponse),
        (status = 400, description = "Amount is not a number")
    ),
    tag = "Sale"
)]
async fn estimate(
    State(session): State<Arc<SaleSession>>,
    Query(query): Query<EstimateQuery>,
) -> Result<Json<EstimateResponse>, SaleError> {
    let estimate = session.estimate(&query.amount)?;
    Ok(Json(EstimateResponse {
        amount: query.amount,
        estimate,
    }))
}

#[utoipa::path(
    get,
    path = "/allowance",
    responses(
        (status = 200, description = "Allowance read from the token contract", body = AllowanceResponse),
        (status = 502, description = "Wallet or node unavailable")
    ),
    tag = "Sale"
)]
async fn allowance(
    State(session): State<Arc<SaleSession>>,
) -> Result<Json<AllowanceResponse>, SaleError> {
    let allowance = session.refresh_allowance().await?;
    Ok(Json(AllowanceResponse {
        allowance,
        permits_purchase: allowance.permits_purchase(),
    }))
}

#[utoipa::path(
    get,
    path = "/state",
    responses((status = 200, description = "Cached allowance and next action", body = SessionState)),
    tag = "Sale"
)]
async fn state(State(session): State<Arc<SaleSession>>) -> Json<SessionState> {
    Json(session.state().await)
}

#[utoipa::path(
    post,
    path = "/approve",
    responses(
        (status = 200, description = "Approval mined", body = ActionResponse),
        (status = 502, description = "Approval rejected or reverted", body = ActionResponse)
    ),
    tag = "Sale"
)]
async fn approve(State(session): State<Arc<SaleSession>>) -> ActionResponse {
    let outcome = session.approve().await;
    ActionResponse {
        message: SaleSession::message(&outcome),
        outcome,
    }
}

#[utoipa::path(
    post,
    path = "/order",
    request_body = PurchaseRequest,
    responses(
        (status = 200, description = "Order mined and transfer submitted", body = ActionResponse),
        (status = 400, description = "Invalid amount or address", body = ActionResponse),
        (status = 502, description = "Order or transfer failed", body = ActionResponse)
    ),
    tag = "Sale"
)]
async fn order(
    State(session): State<Arc<SaleSession>>,
    Json(request): Json<PurchaseRequest>,
) -> ActionResponse {
    tracing::info!(amount = %request.amount, dest = %request.address, "order requested");
    let outcome = session.handle_order(&request).await;
    ActionResponse {
        message: SaleSession::message(&outcome),
        outcome,
    }
}

#[utoipa::path(
    post,
    path = "/disconnect",
    responses(
        (status = 200, description = "Wallet connection closed", body = SessionState),
        (status = 502, description = "Relay could not close the session")
    ),
    tag = "Sale"
)]
async fn disconnect(
    State(session): State<Arc<SaleSession>>,
) -> Result<Json<SessionState>, SaleError> {
    session.disconnect().await?;
    Ok(Json(session.state().await))
}

#[derive(OpenApi)]
#[openapi(
    paths(estimate, allowance, state, approve, order, disconnect),
    components(schemas(
        PurchaseRequest,
        EstimateResponse,
        AllowanceResponse,
        SessionState,
        crate::flow::FlowAction,
        ActionResponse
    )),
    tags((name = "Sale", description = "Token sale approve and order actions")),
    info(
        title = "Token Sale API",
        version = "0.1.0",
        description = "Approve, order and cross-chain payout for the SEL token sale"
    )
)]
pub struct ApiDoc;

async fn health_check() -> &'static str {
    "OK"
}

pub fn router(session: Arc<SaleSession>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(health_check))
        .route("/estimate", get(estimate))
        .route("/allowance", get(allowance))
        .route("/state", get(state))
        .route("/approve", post(approve))
        .route("/order", post(order))
        .route("/disconnect", post(disconnect))
        .with_state(session)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
