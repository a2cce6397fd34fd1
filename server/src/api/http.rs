use axum::{
    body::Bytes,
    extract::State as AxumState,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use lootcase_execution::{drop_rates, ActionError, Backend};
use lootcase_types::{api::CaseSummary, ActionRequest};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

use crate::Server;

#[derive(Serialize)]
struct HealthzResponse {
    ok: bool,
}

pub(super) async fn healthz() -> Response {
    Json(HealthzResponse { ok: true }).into_response()
}

fn error_response(err: &ActionError) -> Response {
    let status = StatusCode::from_u16(err.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(err.body())).into_response()
}

/// `POST /api/cases`: decode the action and run it to completion.
///
/// Execution is detached from the request so a client that disconnects after its debit
/// cannot cancel the delivery or refund that follows.
pub(super) async fn action<B: Backend + 'static>(
    AxumState(server): AxumState<Arc<Server<B>>>,
    body: Bytes,
) -> Response {
    let request: ActionRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(err) => {
            server.http_metrics().inc_reject_malformed();
            tracing::debug!(%err, "malformed action body");
            return error_response(&ActionError::InvalidRequest);
        }
    };

    let action = request.name();
    let start = Instant::now();
    let task = {
        let server = server.clone();
        tokio::spawn(async move { server.layer().execute(request).await })
    };
    let response = match task.await {
        Ok(Ok(body)) => Json(body).into_response(),
        Ok(Err(err)) => {
            if err.status() >= 500 {
                tracing::warn!(action, error = %err, "action failed");
            }
            error_response(&err)
        }
        Err(err) => {
            tracing::error!(action, ?err, "action task aborted");
            error_response(&ActionError::Internal(err.into()))
        }
    };

    server.http_metrics().record_action(action, start.elapsed());
    response
}

/// `GET /cases`: the catalog with published drop rates.
pub(super) async fn cases<B: Backend + 'static>(
    AxumState(server): AxumState<Arc<Server<B>>>,
) -> Response {
    let cases = server
        .layer()
        .catalog()
        .cases()
        .iter()
        .map(|case| CaseSummary {
            id: case.id.clone(),
            name: case.name.clone(),
            price: case.price,
            drop_rates: drop_rates(case),
        })
        .collect::<Vec<_>>();
    Json(cases).into_response()
}

pub(super) async fn http_metrics<B: Backend + 'static>(
    headers: HeaderMap,
    AxumState(server): AxumState<Arc<Server<B>>>,
) -> Response {
    if let Some(status) = metrics_auth_error(server.config().metrics_auth_token.as_deref(), &headers) {
        return status.into_response();
    }
    Json(server.metrics_snapshot()).into_response()
}

fn metrics_auth_error(token: Option<&str>, headers: &HeaderMap) -> Option<StatusCode> {
    let token = token.unwrap_or_default();
    if token.is_empty() {
        return None;
    }
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));
    let header_token = headers
        .get("x-metrics-token")
        .and_then(|value| value.to_str().ok());
    if bearer == Some(token) || header_token == Some(token) {
        None
    } else {
        Some(StatusCode::UNAUTHORIZED)
    }
}
