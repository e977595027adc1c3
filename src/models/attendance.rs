use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{
    error::BoxDynError,
    postgres::{PgTypeInfo, PgValueRef},
    Decode, FromRow, PgPool, Postgres, Type,
};
use std::{fmt, str::FromStr};
use uuid::Uuid;

use super::member::MemberSummary;

/// On-time/late tag fixed when a day's cycle is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
    OnTime,
    Late,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::OnTime => "ON_TIME",
            Classification::Late => "LATE",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown classification: {0}")]
pub struct UnknownClassification(String);

impl FromStr for Classification {
    type Err = UnknownClassification;

    /// Case-insensitive; accepts the legacy `ONTIME` spelling
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ON_TIME" | "ONTIME" => Ok(Classification::OnTime),
            "LATE" => Ok(Classification::Late),
            _ => Err(UnknownClassification(s.to_string())),
        }
    }
}

// Stored as VARCHAR with a CHECK constraint rather than a Postgres enum type
impl Type<Postgres> for Classification {
    fn type_info() -> PgTypeInfo {
        <String as Type<Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        <String as Type<Postgres>>::compatible(ty)
    }
}

impl<'r> Decode<'r, Postgres> for Classification {
    fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
        let raw = <&str as Decode<'r, Postgres>>::decode(value)?;
        Ok(raw.parse()?)
    }
}

/// One member's attendance cycle for one day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct AttendanceRecord {
    pub id: Uuid,
    pub member_id: Uuid,
    pub date: NaiveDate,
    pub clock_in: NaiveTime,
    pub clock_out: Option<NaiveTime>,
    pub classification: Classification,
    pub created_at: DateTime<Utc>,
}

impl AttendanceRecord {
    pub fn is_closed(&self) -> bool {
        self.clock_out.is_some()
    }
}

/// Attendance record joined with the member it belongs to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceEntry {
    #[serde(flatten)]
    pub record: AttendanceRecord,
    pub member: MemberSummary,
}

/// Filters for the attendance listing. All bounds are inclusive.
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub member_id: Option<Uuid>,
    /// Case-insensitive substring of the member name
    pub member_name: Option<String>,
    pub classification: Option<Classification>,
}

impl RecordFilter {
    pub fn matches(&self, entry: &AttendanceEntry) -> bool {
        let record = &entry.record;

        self.start_date.map_or(true, |d| record.date >= d)
            && self.end_date.map_or(true, |d| record.date <= d)
            && self.member_id.map_or(true, |id| record.member_id == id)
            && self.classification.map_or(true, |c| record.classification == c)
            && self.member_name.as_deref().map_or(true, |name| {
                entry
                    .member
                    .name
                    .to_lowercase()
                    .contains(&name.to_lowercase())
            })
    }
}

/// Raw counts over a date range
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, FromRow)]
pub struct AttendanceCounts {
    pub total: i64,
    pub on_time: i64,
    pub late: i64,
    pub clocked_out: i64,
}

#[derive(Debug, FromRow)]
struct EntryRow {
    id: Uuid,
    member_id: Uuid,
    date: NaiveDate,
    clock_in: NaiveTime,
    clock_out: Option<NaiveTime>,
    classification: Classification,
    created_at: DateTime<Utc>,
    member_roll_no: String,
    member_name: String,
    member_group_name: Option<String>,
    member_photo_path: Option<String>,
}

impl From<EntryRow> for AttendanceEntry {
    fn from(row: EntryRow) -> Self {
        Self {
            member: MemberSummary {
                id: row.member_id,
                roll_no: row.member_roll_no,
                name: row.member_name,
                group_name: row.member_group_name,
                photo_path: row.member_photo_path,
            },
            record: AttendanceRecord {
                id: row.id,
                member_id: row.member_id,
                date: row.date,
                clock_in: row.clock_in,
                clock_out: row.clock_out,
                classification: row.classification,
                created_at: row.created_at,
            },
        }
    }
}

const ENTRY_SELECT: &str = r#"
    SELECT
        a.id, a.member_id, a.date, a.clock_in, a.clock_out, a.classification, a.created_at,
        m.roll_no AS member_roll_no,
        m.name AS member_name,
        m.group_name AS member_group_name,
        m.photo_path AS member_photo_path
    FROM attendance_records a
    JOIN members m ON m.id = a.member_id
"#;

const ENTRY_FILTER: &str = r#"
    WHERE ($1::date IS NULL OR a.date >= $1)
      AND ($2::date IS NULL OR a.date <= $2)
      AND ($3::uuid IS NULL OR a.member_id = $3)
      AND ($4::text IS NULL OR m.name ILIKE '%' || $4 || '%')
      AND ($5::text IS NULL OR a.classification = $5)
"#;

impl AttendanceRecord {
    pub async fn find_by_member_and_date(
        pool: &PgPool,
        member_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<Self>, sqlx::Error> {
        let record = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM attendance_records
            WHERE member_id = $1 AND date = $2
            "#,
        )
        .bind(member_id)
        .bind(date)
        .fetch_optional(pool)
        .await?;

        Ok(record)
    }

    /// Inserts the day's record. Returns `None` if one already exists;
    /// the unique (member_id, date) constraint decides between racing callers.
    pub async fn insert_if_absent(
        pool: &PgPool,
        member_id: Uuid,
        date: NaiveDate,
        clock_in: NaiveTime,
        classification: Classification,
    ) -> Result<Option<Self>, sqlx::Error> {
        let record = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO attendance_records (member_id, date, clock_in, classification)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (member_id, date) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(member_id)
        .bind(date)
        .bind(clock_in)
        .bind(classification.as_str())
        .fetch_optional(pool)
        .await?;

        Ok(record)
    }

    /// Sets clock_out only while it is still NULL. Returns `None` if the
    /// record is already closed or gone.
    pub async fn close_if_open(
        pool: &PgPool,
        id: Uuid,
        clock_out: NaiveTime,
    ) -> Result<Option<Self>, sqlx::Error> {
        let record = sqlx::query_as::<_, Self>(
            r#"
            UPDATE attendance_records
            SET clock_out = $2
            WHERE id = $1 AND clock_out IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(clock_out)
        .fetch_optional(pool)
        .await?;

        Ok(record)
    }

    pub async fn counts_between(
        pool: &PgPool,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<AttendanceCounts, sqlx::Error> {
        sqlx::query_as::<_, AttendanceCounts>(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE classification = 'ON_TIME') AS on_time,
                COUNT(*) FILTER (WHERE classification = 'LATE') AS late,
                COUNT(clock_out) AS clocked_out
            FROM attendance_records
            WHERE date BETWEEN $1 AND $2
            "#,
        )
        .bind(start_date)
        .bind(end_date)
        .fetch_one(pool)
        .await
    }

    /// Filtered page of entries, newest day first
    pub async fn list_entries(
        pool: &PgPool,
        filter: &RecordFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AttendanceEntry>, sqlx::Error> {
        let query = format!(
            "{} {} ORDER BY a.date DESC, a.clock_in DESC LIMIT $6 OFFSET $7",
            ENTRY_SELECT, ENTRY_FILTER
        );

        let rows = sqlx::query_as::<_, EntryRow>(&query)
            .bind(filter.start_date)
            .bind(filter.end_date)
            .bind(filter.member_id)
            .bind(filter.member_name.as_deref())
            .bind(filter.classification.map(|c| c.as_str()))
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await?;

        Ok(rows.into_iter().map(AttendanceEntry::from).collect())
    }

    pub async fn count_entries(pool: &PgPool, filter: &RecordFilter) -> Result<i64, sqlx::Error> {
        let query = format!(
            "SELECT COUNT(*) FROM attendance_records a JOIN members m ON m.id = a.member_id {}",
            ENTRY_FILTER
        );

        sqlx::query_scalar::<_, i64>(&query)
            .bind(filter.start_date)
            .bind(filter.end_date)
            .bind(filter.member_id)
            .bind(filter.member_name.as_deref())
            .bind(filter.classification.map(|c| c.as_str()))
            .fetch_one(pool)
            .await
    }

    /// Most recently opened cycles of a day
    pub async fn list_recent(
        pool: &PgPool,
        date: NaiveDate,
        limit: i64,
    ) -> Result<Vec<AttendanceEntry>, sqlx::Error> {
        let query = format!(
            "{} WHERE a.date = $1 ORDER BY a.created_at DESC LIMIT $2",
            ENTRY_SELECT
        );

        let rows = sqlx::query_as::<_, EntryRow>(&query)
            .bind(date)
            .bind(limit)
            .fetch_all(pool)
            .await?;

        Ok(rows.into_iter().map(AttendanceEntry::from).collect())
    }

    pub async fn list_by_member(
        pool: &PgPool,
        member_id: Uuid,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let records = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM attendance_records
            WHERE member_id = $1
              AND ($2::date IS NULL OR date >= $2)
              AND ($3::date IS NULL OR date <= $3)
            ORDER BY date DESC
            "#,
        )
        .bind(member_id)
        .bind(start_date)
        .bind(end_date)
        .fetch_all(pool)
        .await?;

        Ok(records)
    }
}
