//! Operator endpoints for the inventory pool.
//!
//! Restock, stock levels, the manual TTL sweep trigger, and manual
//! release. These are the out-of-band maintenance operations; nothing
//! here touches the webhook hot path.

use std::str::FromStr;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::Utc;
use common::ItemId;
use domain::{Category, NewInventoryItem};
use fulfillment::NotificationPort;
use serde::{Deserialize, Serialize};
use store::FulfillmentStore;

use crate::AppState;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct RestockRequest {
    pub items: Vec<RestockItem>,
}

#[derive(Deserialize)]
pub struct RestockItem {
    pub category: String,
    pub login: String,
    pub password: String,
    #[serde(default)]
    pub notes: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
pub struct RestockResponse {
    pub item_ids: Vec<String>,
}

#[derive(Serialize)]
pub struct StockLevel {
    pub category: String,
    pub available: u64,
}

#[derive(Serialize)]
pub struct SweepResponse {
    pub expired: u64,
}

#[derive(Serialize)]
pub struct ReleaseResponse {
    pub released: bool,
}

// -- Handlers --

/// POST /admin/inventory — add fresh credentials to the pool.
#[tracing::instrument(skip(state, req))]
pub async fn restock<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
    Json(req): Json<RestockRequest>,
) -> Result<(StatusCode, Json<RestockResponse>), ApiError>
where
    S: FulfillmentStore + 'static,
    N: NotificationPort + 'static,
{
    let mut items = Vec::with_capacity(req.items.len());
    for item in req.items {
        let category = Category::from_str(&item.category)
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        items.push(NewInventoryItem {
            category,
            login: item.login,
            password: item.password,
            notes: item.notes,
        });
    }

    let ids = state.store.restock(items, Utc::now()).await?;
    tracing::info!(count = ids.len(), "inventory restocked");

    Ok((
        StatusCode::CREATED,
        Json(RestockResponse {
            item_ids: ids.iter().map(ItemId::to_string).collect(),
        }),
    ))
}

/// GET /admin/inventory — available item counts per category.
#[tracing::instrument(skip(state))]
pub async fn levels<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
) -> Result<Json<Vec<StockLevel>>, ApiError>
where
    S: FulfillmentStore + 'static,
    N: NotificationPort + 'static,
{
    let mut levels = Vec::with_capacity(Category::ALL.len());
    for category in Category::ALL {
        levels.push(StockLevel {
            category: category.as_str().to_string(),
            available: state.store.available_count(category).await?,
        });
    }
    Ok(Json(levels))
}

/// POST /admin/inventory/sweep — expire elapsed assignments now.
#[tracing::instrument(skip(state))]
pub async fn sweep<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
) -> Result<Json<SweepResponse>, ApiError>
where
    S: FulfillmentStore + 'static,
    N: NotificationPort + 'static,
{
    let expired = state.store.sweep_expired(Utc::now()).await?;
    if expired > 0 {
        metrics::counter!("inventory_swept_total").increment(expired);
        tracing::info!(expired, "manual sweep expired assignments");
    }
    Ok(Json(SweepResponse { expired }))
}

/// POST /admin/inventory/{id}/release — manually expire one assignment.
#[tracing::instrument(skip(state))]
pub async fn release<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
    Path(id): Path<String>,
) -> Result<Json<ReleaseResponse>, ApiError>
where
    S: FulfillmentStore + 'static,
    N: NotificationPort + 'static,
{
    let uuid = uuid::Uuid::parse_str(&id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid item id: {e}")))?;

    let released = state.store.release_item(ItemId::from_uuid(uuid)).await?;
    if !released {
        return Err(ApiError::NotFound(format!(
            "No assigned inventory item {id}"
        )));
    }
    Ok(Json(ReleaseResponse { released }))
}
