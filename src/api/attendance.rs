use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::state::AppState;
use crate::error::{AppError, Result};
use crate::models::attendance::{AttendanceEntry, Classification, RecordFilter};
use crate::services::reports::{
    self, AttendancePage, AttendanceSnapshot, MemberHistory, Pagination,
};

const DEFAULT_FEED_LIMIT: i64 = 10;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub member_id: Option<Uuid>,
    pub member_name: Option<String>,
    pub status: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl ListQuery {
    fn filter(&self) -> RecordFilter {
        RecordFilter {
            start_date: self.start_date,
            end_date: self.end_date,
            member_id: self.member_id,
            member_name: self
                .member_name
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string),
            // unknown status values are ignored rather than rejected
            classification: self
                .status
                .as_deref()
                .and_then(|s| s.parse::<Classification>().ok()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct FeedResponse {
    pub date: NaiveDate,
    pub count: usize,
    pub data: Vec<AttendanceEntry>,
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub date: Option<NaiveDate>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub month: Option<u32>,
    pub year: Option<i32>,
}

/// Filtered, paginated attendance listing
async fn list_records(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<AttendancePage>> {
    if let (Some(start), Some(end)) = (query.start_date, query.end_date) {
        if start > end {
            return Err(AppError::Validation(
                "start_date must not be after end_date".to_string(),
            ));
        }
    }

    let pagination = Pagination::new(query.page, query.limit);
    let page = reports::list_page(state.reports.as_ref(), &query.filter(), pagination).await?;

    Ok(Json(page))
}

/// Today's live feed, newest clock-in first
async fn today_feed(
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<FeedResponse>> {
    let (today, _) = state.clock().today_and_time();
    let limit = query
        .limit
        .unwrap_or(DEFAULT_FEED_LIMIT)
        .clamp(1, reports::MAX_PAGE_SIZE);

    let data = state.reports.list_recent(today, limit).await?;

    Ok(Json(FeedResponse {
        date: today,
        count: data.len(),
        data,
    }))
}

/// Snapshot counts for a day (default today) or an explicit range
async fn stats(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<AttendanceSnapshot>> {
    let (today, _) = state.clock().today_and_time();

    let (start, end) = match (query.start_date, query.end_date) {
        (Some(start), Some(end)) => (start, end),
        (Some(start), None) => (start, start),
        (None, Some(end)) => (end, end),
        (None, None) => {
            let day = query.date.unwrap_or(today);
            (day, day)
        }
    };

    if start > end {
        return Err(AppError::Validation(
            "start_date must not be after end_date".to_string(),
        ));
    }

    let snapshot = reports::snapshot(state.reports.as_ref(), start, end).await?;

    Ok(Json(snapshot))
}

/// A member's history, optionally for one month
async fn member_history(
    State(state): State<AppState>,
    Path(member_id): Path<Uuid>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<MemberHistory>> {
    state
        .identity
        .find_member(member_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Member".to_string()))?;

    let month = match (query.year, query.month) {
        (Some(year), Some(month)) => Some(reports::month_bounds(year, month).ok_or_else(|| {
            AppError::Validation(format!("Invalid month {}-{}", year, month))
        })?),
        _ => None,
    };

    let history = reports::member_history(state.reports.as_ref(), member_id, month).await?;

    Ok(Json(history))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/attendance", get(list_records))
        .route("/api/attendance/today", get(today_feed))
        .route("/api/attendance/stats", get(stats))
        .route("/api/attendance/member/:member_id", get(member_history))
}
