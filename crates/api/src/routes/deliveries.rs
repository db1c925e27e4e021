//! Delivery CRUD and tracking endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use coordinator::DeliveryCoordinator;
use delivery_cache::CacheBackend;
use delivery_store::{Delivery, DeliveryStore, ShippingAddress, TrackedDelivery};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S, B> {
    pub coordinator: DeliveryCoordinator<S, B>,
}

impl<S, B> AppState<S, B> {
    pub fn new(coordinator: DeliveryCoordinator<S, B>) -> Self {
        Self { coordinator }
    }
}

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct CreateDeliveryRequest {
    #[serde(default)]
    pub order_id: String,
    #[serde(default)]
    pub shipping_address: ShippingAddress,
}

#[derive(Debug, Deserialize)]
pub struct UpdateDeliveryRequest {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub order_id: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

// -- Response types --

#[derive(Serialize)]
pub struct ListDeliveriesResponse {
    pub deliveries: Vec<Delivery>,
    pub total: u64,
}

// -- Handlers --

/// POST /deliveries: Create a pending delivery.
#[tracing::instrument(skip(state, req))]
pub async fn create<S, B>(
    State(state): State<Arc<AppState<S, B>>>,
    Json(req): Json<CreateDeliveryRequest>,
) -> Result<(StatusCode, Json<Delivery>), ApiError>
where
    S: DeliveryStore + 'static,
    B: CacheBackend + 'static,
{
    let delivery = state
        .coordinator
        .create(&req.order_id, &req.shipping_address)
        .await?;
    Ok((StatusCode::CREATED, Json(delivery)))
}

/// GET /deliveries/{id}: Load a delivery by id.
#[tracing::instrument(skip(state))]
pub async fn get<S, B>(
    State(state): State<Arc<AppState<S, B>>>,
    Path(id): Path<String>,
) -> Result<Json<Delivery>, ApiError>
where
    S: DeliveryStore + 'static,
    B: CacheBackend + 'static,
{
    state
        .coordinator
        .get(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Delivery {id} not found")))
}

/// PUT /deliveries/{id}: Record a status change.
#[tracing::instrument(skip(state, req))]
pub async fn update<S, B>(
    State(state): State<Arc<AppState<S, B>>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateDeliveryRequest>,
) -> Result<Json<Delivery>, ApiError>
where
    S: DeliveryStore + 'static,
    B: CacheBackend + 'static,
{
    let delivery = state
        .coordinator
        .update(&id, &req.status, &req.location, &req.description)
        .await?;
    Ok(Json(delivery))
}

/// GET /deliveries: List deliveries, optionally for one order.
#[tracing::instrument(skip(state))]
pub async fn list<S, B>(
    State(state): State<Arc<AppState<S, B>>>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListDeliveriesResponse>, ApiError>
where
    S: DeliveryStore + 'static,
    B: CacheBackend + 'static,
{
    let page = state
        .coordinator
        .list(
            params.order_id.as_deref().unwrap_or_default(),
            params.page.unwrap_or(1),
            params.page_size.unwrap_or(0),
        )
        .await?;
    Ok(Json(ListDeliveriesResponse {
        deliveries: page.deliveries,
        total: page.total,
    }))
}

/// GET /track/{tracking_number}: Delivery and its event history.
#[tracing::instrument(skip(state))]
pub async fn track<S, B>(
    State(state): State<Arc<AppState<S, B>>>,
    Path(tracking_number): Path<String>,
) -> Result<Json<TrackedDelivery>, ApiError>
where
    S: DeliveryStore + 'static,
    B: CacheBackend + 'static,
{
    state
        .coordinator
        .track(&tracking_number)
        .await?
        .map(Json)
        .ok_or_else(|| {
            ApiError::NotFound(format!("Tracking number {tracking_number} not found"))
        })
}
