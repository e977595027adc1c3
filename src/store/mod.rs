// Store module - storage seams between the attendance core and its backends

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use uuid::Uuid;

use crate::models::{
    attendance::{AttendanceCounts, AttendanceEntry, AttendanceRecord, Classification, RecordFilter},
    card::{CardStatusFilter, CardWithMember, RfidCard},
    member::{CreateMemberData, Member, MemberFilter, UpdateMemberData},
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),

    #[error("{0}")]
    Duplicate(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Invalid(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        use sqlx::error::ErrorKind;

        if let sqlx::Error::Database(db_err) = &e {
            match db_err.kind() {
                ErrorKind::UniqueViolation => {
                    let message = match db_err.constraint() {
                        Some("rfid_cards_uid_code_key") => "Card UID already registered",
                        Some("members_roll_no_key") => "Roll number already registered",
                        _ => "Record already exists",
                    };
                    return StoreError::Duplicate(message.to_string());
                }
                ErrorKind::ForeignKeyViolation => return StoreError::NotFound("Member".to_string()),
                ErrorKind::CheckViolation | ErrorKind::NotNullViolation => {
                    return StoreError::Invalid(db_err.message().to_string())
                }
                _ => {}
            }
        }

        StoreError::Database(e)
    }
}

/// Conflicts reported by the ledger's conditional writes
#[derive(thiserror::Error, Debug)]
pub enum LedgerError {
    #[error("Attendance cycle already exists for member {member_id} on {date}")]
    DuplicateCycle { member_id: Uuid, date: NaiveDate },

    #[error("Attendance cycle {record_id} is already closed")]
    AlreadyClosed { record_id: Uuid },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        LedgerError::Store(e.into())
    }
}

/// Card and member registry.
///
/// Card UIDs are normalized (trimmed, upper-cased) on every read and write,
/// so lookups are case-insensitive.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Finds a card by UID along with its owning member, if paired
    async fn resolve(&self, uid_code: &str) -> Result<Option<CardWithMember>, StoreError>;

    async fn register_card(
        &self,
        uid_code: &str,
        member_id: Option<Uuid>,
    ) -> Result<RfidCard, StoreError>;

    /// `None` unpairs the card
    async fn pair_card(&self, card_id: Uuid, member_id: Option<Uuid>)
        -> Result<RfidCard, StoreError>;

    async fn set_card_active(&self, card_id: Uuid, is_active: bool) -> Result<RfidCard, StoreError>;

    async fn delete_card(&self, card_id: Uuid) -> Result<(), StoreError>;

    async fn find_card(&self, card_id: Uuid) -> Result<Option<CardWithMember>, StoreError>;

    async fn list_cards(
        &self,
        status: Option<CardStatusFilter>,
    ) -> Result<Vec<CardWithMember>, StoreError>;

    async fn create_member(&self, data: &CreateMemberData) -> Result<Member, StoreError>;

    async fn update_member(&self, id: Uuid, data: &UpdateMemberData) -> Result<Member, StoreError>;

    /// Removes the member together with its cards and attendance records
    async fn delete_member(&self, id: Uuid) -> Result<(), StoreError>;

    async fn find_member(&self, id: Uuid) -> Result<Option<Member>, StoreError>;

    async fn list_members(&self, filter: &MemberFilter) -> Result<Vec<Member>, StoreError>;

    async fn list_member_cards(&self, member_id: Uuid) -> Result<Vec<RfidCard>, StoreError>;

    async fn list_groups(&self) -> Result<Vec<String>, StoreError>;
}

/// Per-member-per-day attendance cycles.
///
/// Both transitions are conditional commits: `open_cycle` succeeds only if no
/// record exists for (member, date), `close_cycle` only if clock_out is unset.
/// Implementations must make each check-and-write atomic.
#[async_trait]
pub trait AttendanceLedger: Send + Sync {
    async fn find_cycle(
        &self,
        member_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, StoreError>;

    async fn open_cycle(
        &self,
        member_id: Uuid,
        date: NaiveDate,
        clock_in: NaiveTime,
        classification: Classification,
    ) -> Result<AttendanceRecord, LedgerError>;

    async fn close_cycle(
        &self,
        record_id: Uuid,
        clock_out: NaiveTime,
    ) -> Result<AttendanceRecord, LedgerError>;
}

/// Read-only queries backing the reporting projections
#[async_trait]
pub trait AttendanceReports: Send + Sync {
    async fn count_members(&self) -> Result<i64, StoreError>;

    async fn counts_between(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<AttendanceCounts, StoreError>;

    async fn list_entries(
        &self,
        filter: &RecordFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AttendanceEntry>, StoreError>;

    async fn count_entries(&self, filter: &RecordFilter) -> Result<i64, StoreError>;

    async fn list_recent(
        &self,
        date: NaiveDate,
        limit: i64,
    ) -> Result<Vec<AttendanceEntry>, StoreError>;

    async fn member_records(
        &self,
        member_id: Uuid,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<AttendanceRecord>, StoreError>;

    /// Connectivity check for health reporting
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Trims member fields and rejects empty roll numbers or names
pub(crate) fn validate_new_member(data: &CreateMemberData) -> Result<CreateMemberData, StoreError> {
    let roll_no = data.roll_no.trim();
    let name = data.name.trim();

    if roll_no.is_empty() {
        return Err(StoreError::Invalid("Roll number is required".to_string()));
    }
    if name.is_empty() {
        return Err(StoreError::Invalid("Name is required".to_string()));
    }

    Ok(CreateMemberData {
        roll_no: roll_no.to_string(),
        name: name.to_string(),
        group_name: non_blank(data.group_name.as_deref()),
        photo_path: non_blank(data.photo_path.as_deref()),
    })
}

pub(crate) fn validate_member_update(data: &UpdateMemberData) -> Result<UpdateMemberData, StoreError> {
    let roll_no = data.roll_no.as_deref().map(str::trim);
    let name = data.name.as_deref().map(str::trim);

    if roll_no == Some("") {
        return Err(StoreError::Invalid("Roll number cannot be empty".to_string()));
    }
    if name == Some("") {
        return Err(StoreError::Invalid("Name cannot be empty".to_string()));
    }

    Ok(UpdateMemberData {
        roll_no: roll_no.map(str::to_string),
        name: name.map(str::to_string),
        group_name: data.group_name.as_ref().map(|g| non_blank(g.as_deref())),
        photo_path: data.photo_path.as_ref().map(|p| non_blank(p.as_deref())),
    })
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
