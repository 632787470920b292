use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use tokio::sync::{mpsc, oneshot};
use tower_http::trace::TraceLayer;

use super::deposits::DepositServiceRequest;
use super::webhooks::{DepositSettlement, WebhookServiceRequest};
use super::withdrawals::WithdrawalServiceRequest;
use super::ServiceError;
use crate::models::deposits::NewDeposit;
use crate::models::withdrawals::NewWithdrawal;
use crate::settings::Settings;
use crate::webhooks::payload::{self, EventReference};
use crate::webhooks::signature;

mod auth;

#[derive(Clone)]
struct AppState {
    webhook_channel: mpsc::Sender<WebhookServiceRequest>,
    deposit_channel: mpsc::Sender<DepositServiceRequest>,
    withdrawal_channel: mpsc::Sender<WithdrawalServiceRequest>,
    webhook_secret: String,
    allow_unsigned: bool,
    admin_token: String,
    auth: auth::AuthState,
}

#[derive(Deserialize)]
struct WithdrawalDecisionRequest {
    #[serde(alias = "withdrawalId")]
    withdrawal_id: String,
}

/// Provider callback for deposit status changes. The signature is checked
/// over the raw bytes before anything is parsed; non-deposit references and
/// non-approved statuses are acknowledged so the provider stops retrying.
async fn deposit_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature_header = headers
        .get("x-signature")
        .or_else(|| headers.get("signature"))
        .and_then(|value| value.to_str().ok());

    match signature_header {
        Some(signature_header) => {
            if !signature::verify(&body, signature_header, &state.webhook_secret) {
                log::warn!("Rejected provider webhook with bad signature.");
                return error_response(&ServiceError::Unauthorized).into_response();
            }
        }
        None => {
            if !state.allow_unsigned {
                log::warn!("Rejected unsigned provider webhook.");
                return error_response(&ServiceError::Unauthorized).into_response();
            }
            log::warn!("Accepting unsigned provider webhook (reduced-trust mode).");
        }
    }

    let value: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(_) => {
            return error_response(&ServiceError::Validation(
                "body is not valid JSON".to_string(),
            ))
            .into_response()
        }
    };

    let event = match payload::normalize(&value) {
        Ok(event) => event,
        Err(e) => return error_response(&ServiceError::Validation(e.to_string())).into_response(),
    };

    let deposit_id = match EventReference::parse(&event.reference) {
        EventReference::Deposit { deposit_id } => deposit_id,
        _ => return (StatusCode::OK, "ok").into_response(),
    };

    if !event.is_approved() {
        return (StatusCode::OK, "ok").into_response();
    }

    let (webhook_tx, webhook_rx) = oneshot::channel();
    let send_result = state
        .webhook_channel
        .send(WebhookServiceRequest::DepositApproved {
            deposit_id,
            event_ref: event.reference.clone(),
            reported_amount: event.amount,
            response: webhook_tx,
        })
        .await;

    if let Err(e) = send_result {
        return error_response(&ServiceError::Communication(
            "Http => Webhook".to_string(),
            e.to_string(),
        ))
        .into_response();
    }

    match webhook_rx.await {
        Ok(Ok(DepositSettlement::Credited {
            deposit_id,
            transaction_id,
            net_amount,
        })) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "depositId": deposit_id,
                "transactionId": transaction_id,
                "netAmount": net_amount
            })),
        )
            .into_response(),
        Ok(Ok(DepositSettlement::AlreadyProcessed)) => (
            StatusCode::OK,
            Json(json!({ "success": true, "alreadyProcessed": true })),
        )
            .into_response(),
        // Provider contract: a reference that looks like a deposit but does
        // not match one answers 400, not 404.
        Ok(Err(ServiceError::NotFound(_))) => {
            error_response(&ServiceError::Validation("unknown deposit".to_string()))
                .into_response()
        }
        Ok(Err(e)) => error_response(&e).into_response(),
        Err(e) => error_response(&ServiceError::Communication(
            "Webhook => Http".to_string(),
            e.to_string(),
        ))
        .into_response(),
    }
}

async fn create_deposit(
    State(state): State<AppState>,
    Extension(identity): Extension<auth::ApiIdentity>,
    Json(req): Json<NewDeposit>,
) -> Response {
    let (deposit_tx, deposit_rx) = oneshot::channel();

    let send_result = state
        .deposit_channel
        .send(DepositServiceRequest::NewDeposit {
            user_id: identity.user_id,
            amount: req.amount,
            response: deposit_tx,
        })
        .await;

    if let Err(e) = send_result {
        return error_response(&ServiceError::Communication(
            "Http => Deposit".to_string(),
            e.to_string(),
        ))
        .into_response();
    }

    match deposit_rx.await {
        Ok(Ok(deposit)) => (
            StatusCode::CREATED,
            Json(json!({
                "success": true,
                "deposit": {
                    "id": deposit.id,
                    "amount": deposit.amount,
                    "status": deposit.status,
                    "qr_code": deposit.qr_code
                }
            })),
        )
            .into_response(),
        Ok(Err(e)) => error_response(&e).into_response(),
        Err(e) => error_response(&ServiceError::Communication(
            "Deposit => Http".to_string(),
            e.to_string(),
        ))
        .into_response(),
    }
}

async fn create_withdrawal(
    State(state): State<AppState>,
    Extension(identity): Extension<auth::ApiIdentity>,
    Json(req): Json<NewWithdrawal>,
) -> Response {
    let (withdrawal_tx, withdrawal_rx) = oneshot::channel();

    let send_result = state
        .withdrawal_channel
        .send(WithdrawalServiceRequest::NewWithdrawal {
            user_id: identity.user_id,
            amount: req.amount,
            pix_key_type: req.pix_key_type,
            pix_key: req.pix_key,
            response: withdrawal_tx,
        })
        .await;

    if let Err(e) = send_result {
        return error_response(&ServiceError::Communication(
            "Http => Withdrawal".to_string(),
            e.to_string(),
        ))
        .into_response();
    }

    match withdrawal_rx.await {
        Ok(Ok(withdrawal)) => (
            StatusCode::CREATED,
            Json(json!({
                "success": true,
                "withdrawal": {
                    "id": withdrawal.id,
                    "amount": withdrawal.amount,
                    "status": withdrawal.status,
                    "pix_key_type": withdrawal.pix_key_type,
                    "pix_key": withdrawal.pix_key
                }
            })),
        )
            .into_response(),
        Ok(Err(e)) => error_response(&e).into_response(),
        Err(e) => error_response(&ServiceError::Communication(
            "Withdrawal => Http".to_string(),
            e.to_string(),
        ))
        .into_response(),
    }
}

async fn approve_withdrawal(
    State(state): State<AppState>,
    Json(req): Json<WithdrawalDecisionRequest>,
) -> Response {
    decide_withdrawal(&state, req.withdrawal_id, true).await
}

async fn reject_withdrawal(
    State(state): State<AppState>,
    Json(req): Json<WithdrawalDecisionRequest>,
) -> Response {
    decide_withdrawal(&state, req.withdrawal_id, false).await
}

async fn decide_withdrawal(state: &AppState, withdrawal_id: String, approve: bool) -> Response {
    let (decision_tx, decision_rx) = oneshot::channel();

    let request = if approve {
        WithdrawalServiceRequest::Approve {
            withdrawal_id,
            response: decision_tx,
        }
    } else {
        WithdrawalServiceRequest::Reject {
            withdrawal_id,
            response: decision_tx,
        }
    };

    if let Err(e) = state.withdrawal_channel.send(request).await {
        return error_response(&ServiceError::Communication(
            "Http => Withdrawal".to_string(),
            e.to_string(),
        ))
        .into_response();
    }

    match decision_rx.await {
        Ok(Ok(decision)) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "withdrawal_id": decision.withdrawal.id
            })),
        )
            .into_response(),
        Ok(Err(e)) => error_response(&e).into_response(),
        Err(e) => error_response(&ServiceError::Communication(
            "Withdrawal => Http".to_string(),
            e.to_string(),
        ))
        .into_response(),
    }
}

fn error_response(error: &ServiceError) -> (StatusCode, Json<serde_json::Value>) {
    let status = match error {
        ServiceError::Unauthorized => StatusCode::UNAUTHORIZED,
        ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
        ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        ServiceError::Conflict(_) => StatusCode::CONFLICT,
        ServiceError::InsufficientBalance => StatusCode::BAD_REQUEST,
        ServiceError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        ServiceError::Database(_)
        | ServiceError::Communication(_, _)
        | ServiceError::ExternalService(_, _, _) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    // Internal detail stays in the logs, not in responses.
    let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
        log::error!("Request failed: {}", error);
        "internal server error".to_string()
    } else {
        error.to_string()
    };

    (status, Json(json!({ "error": message })))
}

pub async fn start_http_server(
    pool: PgPool,
    settings: Settings,
    webhook_channel: mpsc::Sender<WebhookServiceRequest>,
    deposit_channel: mpsc::Sender<DepositServiceRequest>,
    withdrawal_channel: mpsc::Sender<WithdrawalServiceRequest>,
) -> Result<(), anyhow::Error> {
    let app_state = AppState {
        webhook_channel,
        deposit_channel,
        withdrawal_channel,
        webhook_secret: settings.provider.webhook_secret.clone(),
        allow_unsigned: settings.provider.allow_unsigned,
        admin_token: settings.server.admin_token.clone(),
        auth: auth::AuthState::new(pool, &settings.rate_limit),
    };

    let merchant_api = Router::new()
        .route("/api/deposits", post(create_deposit))
        .route("/api/withdrawals", post(create_withdrawal))
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            auth::require_api_key,
        ));

    let operator_api = Router::new()
        .route("/api/withdrawals/approve", post(approve_withdrawal))
        .route("/api/withdrawals/reject", post(reject_withdrawal))
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            auth::require_operator,
        ));

    let app = Router::new()
        .route("/api/webhooks/deposit", post(deposit_webhook))
        .route("/health", get(|| async { "OK" }))
        .merge(merchant_api)
        .merge(operator_api)
        .with_state(app_state)
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&settings.server.listen).await?;
    log::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
