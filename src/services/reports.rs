use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use uuid::Uuid;

use crate::models::attendance::{
    AttendanceCounts, AttendanceEntry, AttendanceRecord, Classification, RecordFilter,
};
use crate::store::{AttendanceReports, StoreError};

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 200;
/// Highest page whose offset still fits in an i64
pub const MAX_PAGE: i64 = i64::MAX / MAX_PAGE_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
}

impl Pagination {
    /// Page numbers are clamped to `1..=MAX_PAGE`; the limit to `1..=MAX_PAGE_SIZE`
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).clamp(1, MAX_PAGE),
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn total_pages(&self, count: i64) -> i64 {
        (count + self.limit - 1) / self.limit
    }
}

#[derive(Debug, Serialize)]
pub struct AttendancePage {
    pub count: i64,
    pub page: i64,
    pub total_pages: i64,
    pub data: Vec<AttendanceEntry>,
}

/// Attendance snapshot over an inclusive date range
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttendanceSnapshot {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_members: i64,
    pub present: i64,
    pub on_time: i64,
    pub late: i64,
    pub clocked_out: i64,
    pub absent: i64,
}

impl AttendanceSnapshot {
    pub fn new(
        start_date: NaiveDate,
        end_date: NaiveDate,
        total_members: i64,
        counts: AttendanceCounts,
    ) -> Self {
        Self {
            start_date,
            end_date,
            total_members,
            present: counts.total,
            on_time: counts.on_time,
            late: counts.late,
            clocked_out: counts.clocked_out,
            absent: (total_members - counts.total).max(0),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HistoryTotals {
    pub total: usize,
    pub on_time: usize,
    pub late: usize,
}

#[derive(Debug, Serialize)]
pub struct MemberHistory {
    pub member_id: Uuid,
    pub stats: HistoryTotals,
    pub data: Vec<AttendanceRecord>,
}

impl MemberHistory {
    pub fn new(member_id: Uuid, records: Vec<AttendanceRecord>) -> Self {
        let on_time = records
            .iter()
            .filter(|r| r.classification == Classification::OnTime)
            .count();

        Self {
            member_id,
            stats: HistoryTotals {
                total: records.len(),
                on_time,
                late: records.len() - on_time,
            },
            data: records,
        }
    }
}

/// First and last day of a calendar month
pub fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next_month = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    let last = next_month.pred_opt()?;

    debug_assert_eq!(last.month(), month);
    Some((first, last))
}

pub async fn snapshot(
    reports: &dyn AttendanceReports,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<AttendanceSnapshot, StoreError> {
    let total_members = reports.count_members().await?;
    let counts = reports.counts_between(start_date, end_date).await?;

    Ok(AttendanceSnapshot::new(start_date, end_date, total_members, counts))
}

pub async fn list_page(
    reports: &dyn AttendanceReports,
    filter: &RecordFilter,
    pagination: Pagination,
) -> Result<AttendancePage, StoreError> {
    let count = reports.count_entries(filter).await?;
    let data = reports
        .list_entries(filter, pagination.limit, pagination.offset())
        .await?;

    Ok(AttendancePage {
        count,
        page: pagination.page,
        total_pages: pagination.total_pages(count),
        data,
    })
}

/// A member's records, optionally restricted to one month
pub async fn member_history(
    reports: &dyn AttendanceReports,
    member_id: Uuid,
    month: Option<(NaiveDate, NaiveDate)>,
) -> Result<MemberHistory, StoreError> {
    let (start, end) = match month {
        Some((start, end)) => (Some(start), Some(end)),
        None => (None, None),
    };
    let records = reports.member_records(member_id, start, end).await?;

    Ok(MemberHistory::new(member_id, records))
}
