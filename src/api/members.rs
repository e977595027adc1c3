use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

use crate::api::state::AppState;
use crate::error::{AppError, Result};
use crate::models::{
    card::RfidCard,
    member::{CreateMemberData, Member, MemberFilter, UpdateMemberData},
};

#[derive(Debug, Serialize)]
pub struct MemberListResponse {
    pub count: usize,
    pub data: Vec<Member>,
}

#[derive(Debug, Serialize)]
pub struct MemberDetail {
    #[serde(flatten)]
    pub member: Member,
    pub cards: Vec<RfidCard>,
}

async fn list_members(
    State(state): State<AppState>,
    Query(filter): Query<MemberFilter>,
) -> Result<Json<MemberListResponse>> {
    let data = state.identity.list_members(&filter).await?;

    Ok(Json(MemberListResponse {
        count: data.len(),
        data,
    }))
}

async fn list_groups(State(state): State<AppState>) -> Result<Json<Vec<String>>> {
    Ok(Json(state.identity.list_groups().await?))
}

async fn get_member(
    State(state): State<AppState>,
    Path(member_id): Path<Uuid>,
) -> Result<Json<MemberDetail>> {
    let member = state
        .identity
        .find_member(member_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Member".to_string()))?;
    let cards = state.identity.list_member_cards(member_id).await?;

    Ok(Json(MemberDetail { member, cards }))
}

async fn create_member(
    State(state): State<AppState>,
    Json(data): Json<CreateMemberData>,
) -> Result<(StatusCode, Json<Member>)> {
    let member = state.identity.create_member(&data).await?;

    tracing::info!(member_id = %member.id, roll_no = %member.roll_no, "Member created");

    Ok((StatusCode::CREATED, Json(member)))
}

async fn update_member(
    State(state): State<AppState>,
    Path(member_id): Path<Uuid>,
    Json(data): Json<UpdateMemberData>,
) -> Result<Json<Member>> {
    let member = state.identity.update_member(member_id, &data).await?;

    tracing::info!(member_id = %member.id, "Member updated");

    Ok(Json(member))
}

async fn delete_member(
    State(state): State<AppState>,
    Path(member_id): Path<Uuid>,
) -> Result<StatusCode> {
    state.identity.delete_member(member_id).await?;

    tracing::info!(member_id = %member_id, "Member deleted with cards and attendance");

    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/members", get(list_members).post(create_member))
        .route("/api/members/groups", get(list_groups))
        .route(
            "/api/members/:id",
            get(get_member).put(update_member).delete(delete_member),
        )
}
