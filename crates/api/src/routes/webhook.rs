//! The provider webhook endpoint.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use fulfillment::{FulfillmentOutcome, NotificationPort};
use serde::Serialize;
use store::FulfillmentStore;

use crate::AppState;
use crate::error::ApiError;

/// Acknowledgement body returned to the provider.
///
/// Every business outcome acknowledges with 200 — duplicates and
/// stock-outs must not trigger provider-side retries.
#[derive(Serialize)]
pub struct WebhookAck {
    pub received: bool,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
}

impl From<FulfillmentOutcome> for WebhookAck {
    fn from(outcome: FulfillmentOutcome) -> Self {
        match outcome {
            FulfillmentOutcome::Ignored { .. } => Self {
                received: true,
                status: "ignored",
                order_id: None,
            },
            FulfillmentOutcome::Duplicate { .. } => Self {
                received: true,
                status: "duplicate",
                order_id: None,
            },
            FulfillmentOutcome::Fulfilled { order_id, .. } => Self {
                received: true,
                status: "fulfilled",
                order_id: Some(order_id.to_string()),
            },
            FulfillmentOutcome::Backordered { order_id } => Self {
                received: true,
                status: "backordered",
                order_id: Some(order_id.to_string()),
            },
        }
    }
}

/// POST /webhooks/payment — process one provider notification.
///
/// Takes the raw body so the signature is verified over exactly the bytes
/// the provider signed.
#[tracing::instrument(skip(state, headers, body))]
pub async fn receive<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ApiError>
where
    S: FulfillmentStore + 'static,
    N: NotificationPort + 'static,
{
    let signature = headers
        .get(webhook::SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    let outcome = state.orchestrator.process(&body, signature).await?;
    Ok(Json(WebhookAck::from(outcome)))
}
