use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use sqlx::PgPool;
use uuid::Uuid;

use super::{
    validate_member_update, validate_new_member, AttendanceLedger, AttendanceReports,
    IdentityStore, LedgerError, StoreError,
};
use crate::models::{
    attendance::{AttendanceCounts, AttendanceEntry, AttendanceRecord, Classification, RecordFilter},
    card::{normalize_uid, CardStatusFilter, CardWithMember, RfidCard},
    member::{CreateMemberData, Member, MemberFilter, UpdateMemberData},
};

/// PostgreSQL-backed store. Uniqueness and cascades are enforced by the schema.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn card_not_found() -> StoreError {
    StoreError::NotFound("Card".to_string())
}

fn member_not_found() -> StoreError {
    StoreError::NotFound("Member".to_string())
}

#[async_trait]
impl IdentityStore for PgStore {
    async fn resolve(&self, uid_code: &str) -> Result<Option<CardWithMember>, StoreError> {
        let Some(uid_code) = normalize_uid(uid_code) else {
            return Ok(None);
        };

        Ok(RfidCard::find_by_uid(&self.pool, &uid_code).await?)
    }

    async fn register_card(
        &self,
        uid_code: &str,
        member_id: Option<Uuid>,
    ) -> Result<RfidCard, StoreError> {
        let uid_code = normalize_uid(uid_code)
            .ok_or_else(|| StoreError::Invalid("Card UID is required".to_string()))?;

        Ok(RfidCard::create(&self.pool, &uid_code, member_id).await?)
    }

    async fn pair_card(
        &self,
        card_id: Uuid,
        member_id: Option<Uuid>,
    ) -> Result<RfidCard, StoreError> {
        RfidCard::set_member(&self.pool, card_id, member_id)
            .await?
            .ok_or_else(card_not_found)
    }

    async fn set_card_active(&self, card_id: Uuid, is_active: bool) -> Result<RfidCard, StoreError> {
        RfidCard::set_active(&self.pool, card_id, is_active)
            .await?
            .ok_or_else(card_not_found)
    }

    async fn delete_card(&self, card_id: Uuid) -> Result<(), StoreError> {
        if RfidCard::delete(&self.pool, card_id).await? {
            Ok(())
        } else {
            Err(card_not_found())
        }
    }

    async fn find_card(&self, card_id: Uuid) -> Result<Option<CardWithMember>, StoreError> {
        Ok(RfidCard::find_by_id(&self.pool, card_id).await?)
    }

    async fn list_cards(
        &self,
        status: Option<CardStatusFilter>,
    ) -> Result<Vec<CardWithMember>, StoreError> {
        Ok(RfidCard::list(&self.pool, status).await?)
    }

    async fn create_member(&self, data: &CreateMemberData) -> Result<Member, StoreError> {
        let data = validate_new_member(data)?;
        Ok(Member::create(&self.pool, &data).await?)
    }

    async fn update_member(&self, id: Uuid, data: &UpdateMemberData) -> Result<Member, StoreError> {
        let data = validate_member_update(data)?;
        Member::update(&self.pool, id, &data)
            .await?
            .ok_or_else(member_not_found)
    }

    async fn delete_member(&self, id: Uuid) -> Result<(), StoreError> {
        if Member::delete(&self.pool, id).await? {
            Ok(())
        } else {
            Err(member_not_found())
        }
    }

    async fn find_member(&self, id: Uuid) -> Result<Option<Member>, StoreError> {
        Ok(Member::find_by_id(&self.pool, id).await?)
    }

    async fn list_members(&self, filter: &MemberFilter) -> Result<Vec<Member>, StoreError> {
        Ok(Member::list(&self.pool, filter).await?)
    }

    async fn list_member_cards(&self, member_id: Uuid) -> Result<Vec<RfidCard>, StoreError> {
        Ok(RfidCard::list_by_member(&self.pool, member_id).await?)
    }

    async fn list_groups(&self) -> Result<Vec<String>, StoreError> {
        Ok(Member::list_groups(&self.pool).await?)
    }
}

#[async_trait]
impl AttendanceLedger for PgStore {
    async fn find_cycle(
        &self,
        member_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        Ok(AttendanceRecord::find_by_member_and_date(&self.pool, member_id, date).await?)
    }

    async fn open_cycle(
        &self,
        member_id: Uuid,
        date: NaiveDate,
        clock_in: NaiveTime,
        classification: Classification,
    ) -> Result<AttendanceRecord, LedgerError> {
        AttendanceRecord::insert_if_absent(&self.pool, member_id, date, clock_in, classification)
            .await?
            .ok_or(LedgerError::DuplicateCycle { member_id, date })
    }

    async fn close_cycle(
        &self,
        record_id: Uuid,
        clock_out: NaiveTime,
    ) -> Result<AttendanceRecord, LedgerError> {
        AttendanceRecord::close_if_open(&self.pool, record_id, clock_out)
            .await?
            .ok_or(LedgerError::AlreadyClosed { record_id })
    }
}

#[async_trait]
impl AttendanceReports for PgStore {
    async fn count_members(&self) -> Result<i64, StoreError> {
        Ok(Member::count(&self.pool).await?)
    }

    async fn counts_between(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<AttendanceCounts, StoreError> {
        Ok(AttendanceRecord::counts_between(&self.pool, start_date, end_date).await?)
    }

    async fn list_entries(
        &self,
        filter: &RecordFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AttendanceEntry>, StoreError> {
        Ok(AttendanceRecord::list_entries(&self.pool, filter, limit, offset).await?)
    }

    async fn count_entries(&self, filter: &RecordFilter) -> Result<i64, StoreError> {
        Ok(AttendanceRecord::count_entries(&self.pool, filter).await?)
    }

    async fn list_recent(
        &self,
        date: NaiveDate,
        limit: i64,
    ) -> Result<Vec<AttendanceEntry>, StoreError> {
        Ok(AttendanceRecord::list_recent(&self.pool, date, limit).await?)
    }

    async fn member_records(
        &self,
        member_id: Uuid,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        Ok(AttendanceRecord::list_by_member(&self.pool, member_id, start_date, end_date).await?)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}
