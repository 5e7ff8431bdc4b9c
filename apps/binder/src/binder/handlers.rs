use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::binder::expansion::{ExpansionAction, ExpansionOption};
use crate::binder::models::CardEntry;
use crate::binder::placement::{AddOutcome, CardMove, ClearOutcome, MoveOutcome};
use crate::binder::reverse_holo::SetEstimate;
use crate::binder::service::{
    AddCardsRequest, AddSetRequest, CreateBinderRequest, Outcome, UpdateBinderRequest,
};
use crate::binder::view::{BinderSummary, PageView};
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct MoveRequest {
    pub moves: Vec<CardMove>,
}

#[derive(Deserialize)]
pub struct ClearRequest {
    pub reason: String,
}

#[derive(Deserialize)]
pub struct NeededSlotsQuery {
    pub needed: usize,
}

#[derive(Deserialize)]
pub struct SetEstimateQuery {
    #[serde(default)]
    pub reverse_holo: bool,
    #[serde(default)]
    pub replace: bool,
}

#[derive(Deserialize)]
pub struct MissingToggle {
    pub missing: bool,
}

/// POST /api/v1/binders
pub async fn handle_create_binder(
    State(state): State<AppState>,
    Json(req): Json<CreateBinderRequest>,
) -> Result<(StatusCode, Json<BinderSummary>), AppError> {
    let summary = state.binders.create_binder(req).await?;
    Ok((StatusCode::CREATED, Json(summary)))
}

/// GET /api/v1/binders/:id
pub async fn handle_get_binder(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BinderSummary>, AppError> {
    Ok(Json(state.binders.summary(id).await?))
}

/// PATCH /api/v1/binders/:id
pub async fn handle_update_binder(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateBinderRequest>,
) -> Result<Json<Outcome<BinderSummary>>, AppError> {
    Ok(Json(state.binders.update_settings(id, req).await?))
}

/// GET /api/v1/binders/:id/pages/:index
pub async fn handle_get_page(
    State(state): State<AppState>,
    Path((id, index)): Path<(Uuid, usize)>,
) -> Result<Json<PageView>, AppError> {
    Ok(Json(state.binders.page_view(id, index).await?))
}

/// POST /api/v1/binders/:id/cards
pub async fn handle_add_cards(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<AddCardsRequest>,
) -> Result<Json<Outcome<AddOutcome>>, AppError> {
    Ok(Json(state.binders.add_cards(id, req).await?))
}

/// POST /api/v1/binders/:id/cards/move
pub async fn handle_move_cards(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<MoveRequest>,
) -> Result<Json<Outcome<MoveOutcome>>, AppError> {
    Ok(Json(state.binders.move_cards(id, &req.moves).await?))
}

/// DELETE /api/v1/binders/:id/cards/:position
pub async fn handle_remove_card(
    State(state): State<AppState>,
    Path((id, position)): Path<(Uuid, usize)>,
) -> Result<Json<Outcome<CardEntry>>, AppError> {
    Ok(Json(state.binders.remove_card(id, position).await?))
}

/// POST /api/v1/binders/:id/clear
pub async fn handle_clear(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ClearRequest>,
) -> Result<Json<Outcome<ClearOutcome>>, AppError> {
    Ok(Json(state.binders.clear(id, &req.reason).await?))
}

/// POST /api/v1/binders/:id/sets
pub async fn handle_add_set(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<AddSetRequest>,
) -> Result<Json<Outcome<AddOutcome>>, AppError> {
    Ok(Json(state.binders.add_set(id, req).await?))
}

/// GET /api/v1/binders/:id/sets/:set_id/estimate
pub async fn handle_estimate_set(
    State(state): State<AppState>,
    Path((id, set_id)): Path<(Uuid, String)>,
    Query(params): Query<SetEstimateQuery>,
) -> Result<Json<SetEstimate>, AppError> {
    let estimate = state
        .binders
        .estimate_set(id, &set_id, params.reverse_holo, params.replace)
        .await?;
    Ok(Json(estimate))
}

/// GET /api/v1/binders/:id/expansion-options?needed=N
pub async fn handle_expansion_options(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<NeededSlotsQuery>,
) -> Result<Json<Vec<ExpansionOption>>, AppError> {
    Ok(Json(state.binders.expansion_options(id, params.needed).await?))
}

/// POST /api/v1/binders/:id/expansion
pub async fn handle_apply_expansion(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(action): Json<ExpansionAction>,
) -> Result<Json<Outcome<BinderSummary>>, AppError> {
    Ok(Json(state.binders.apply_expansion(id, &action).await?))
}

/// PUT /api/v1/binders/:id/missing/:instance_id
pub async fn handle_set_missing(
    State(state): State<AppState>,
    Path((id, instance_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<MissingToggle>,
) -> Result<Json<Outcome<bool>>, AppError> {
    Ok(Json(
        state
            .binders
            .set_missing(id, instance_id, req.missing)
            .await?,
    ))
}
