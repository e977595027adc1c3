use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::state::AppState;
use crate::error::{AppError, Result};
use crate::models::card::{CardStatusFilter, CardWithMember};

#[derive(Debug, Deserialize)]
pub struct ListCardsQuery {
    pub status: Option<CardStatusFilter>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterCardRequest {
    #[serde(alias = "uid_code", alias = "rfid_uid")]
    pub card_uid: String,
    #[serde(default)]
    pub member_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct PairCardRequest {
    /// `null` unpairs the card
    pub member_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct CardStatusRequest {
    pub is_active: bool,
}

#[derive(Debug, Serialize)]
pub struct CardListResponse {
    pub count: usize,
    pub data: Vec<CardWithMember>,
}

async fn card_with_member(state: &AppState, card_id: Uuid) -> Result<CardWithMember> {
    state
        .identity
        .find_card(card_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Card".to_string()))
}

async fn list_cards(
    State(state): State<AppState>,
    Query(query): Query<ListCardsQuery>,
) -> Result<Json<CardListResponse>> {
    let data = state.identity.list_cards(query.status).await?;

    Ok(Json(CardListResponse {
        count: data.len(),
        data,
    }))
}

async fn get_card(
    State(state): State<AppState>,
    Path(card_id): Path<Uuid>,
) -> Result<Json<CardWithMember>> {
    Ok(Json(card_with_member(&state, card_id).await?))
}

async fn register_card(
    State(state): State<AppState>,
    Json(req): Json<RegisterCardRequest>,
) -> Result<(StatusCode, Json<CardWithMember>)> {
    let card = state
        .identity
        .register_card(&req.card_uid, req.member_id)
        .await?;

    tracing::info!(card_id = %card.id, uid_code = %card.uid_code, "Card registered");

    Ok((StatusCode::CREATED, Json(card_with_member(&state, card.id).await?)))
}

async fn pair_card(
    State(state): State<AppState>,
    Path(card_id): Path<Uuid>,
    Json(req): Json<PairCardRequest>,
) -> Result<Json<CardWithMember>> {
    let card = state.identity.pair_card(card_id, req.member_id).await?;

    tracing::info!(card_id = %card.id, member_id = ?card.member_id, "Card pairing changed");

    Ok(Json(card_with_member(&state, card.id).await?))
}

async fn set_card_status(
    State(state): State<AppState>,
    Path(card_id): Path<Uuid>,
    Json(req): Json<CardStatusRequest>,
) -> Result<Json<CardWithMember>> {
    let card = state
        .identity
        .set_card_active(card_id, req.is_active)
        .await?;

    tracing::info!(card_id = %card.id, is_active = card.is_active, "Card status changed");

    Ok(Json(card_with_member(&state, card.id).await?))
}

async fn delete_card(
    State(state): State<AppState>,
    Path(card_id): Path<Uuid>,
) -> Result<StatusCode> {
    state.identity.delete_card(card_id).await?;

    tracing::info!(card_id = %card_id, "Card deleted");

    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/cards", get(list_cards).post(register_card))
        .route("/api/cards/:id", get(get_card).delete(delete_card))
        .route("/api/cards/:id/pair", put(pair_card))
        .route("/api/cards/:id/status", put(set_card_status))
}
