use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, Utc};
use std::collections::{BTreeSet, HashMap};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    validate_member_update, validate_new_member, AttendanceLedger, AttendanceReports,
    IdentityStore, LedgerError, StoreError,
};
use crate::models::{
    attendance::{AttendanceCounts, AttendanceEntry, AttendanceRecord, Classification, RecordFilter},
    card::{normalize_uid, CardStatusFilter, CardWithMember, RfidCard},
    member::{CreateMemberData, Member, MemberFilter, MemberSummary, UpdateMemberData},
};

/// In-process store with the same uniqueness and cascade rules as the
/// Postgres schema. Every conditional write runs under one write lock.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    members: HashMap<Uuid, Member>,
    // insertion order, oldest first
    cards: Vec<RfidCard>,
    records: Vec<AttendanceRecord>,
    // (member_id, date) uniqueness
    cycles: HashMap<(Uuid, NaiveDate), Uuid>,
}

impl MemoryState {
    fn card_with_member(&self, card: &RfidCard) -> CardWithMember {
        CardWithMember {
            card: card.clone(),
            member: card
                .member_id
                .and_then(|id| self.members.get(&id))
                .map(MemberSummary::from),
        }
    }

    fn entry(&self, record: &AttendanceRecord) -> Option<AttendanceEntry> {
        self.members.get(&record.member_id).map(|member| AttendanceEntry {
            record: record.clone(),
            member: MemberSummary::from(member),
        })
    }

    fn card_mut(&mut self, card_id: Uuid) -> Result<&mut RfidCard, StoreError> {
        self.cards
            .iter_mut()
            .find(|c| c.id == card_id)
            .ok_or_else(|| StoreError::NotFound("Card".to_string()))
    }

    fn ensure_member(&self, member_id: Option<Uuid>) -> Result<(), StoreError> {
        match member_id {
            Some(id) if !self.members.contains_key(&id) => {
                Err(StoreError::NotFound("Member".to_string()))
            }
            _ => Ok(()),
        }
    }

    fn roll_no_taken(&self, roll_no: &str, except: Option<Uuid>) -> bool {
        self.members
            .values()
            .any(|m| m.roll_no == roll_no && Some(m.id) != except)
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityStore for MemoryStore {
    async fn resolve(&self, uid_code: &str) -> Result<Option<CardWithMember>, StoreError> {
        let Some(uid_code) = normalize_uid(uid_code) else {
            return Ok(None);
        };

        let state = self.state.read().await;
        Ok(state
            .cards
            .iter()
            .find(|c| c.uid_code == uid_code)
            .map(|c| state.card_with_member(c)))
    }

    async fn register_card(
        &self,
        uid_code: &str,
        member_id: Option<Uuid>,
    ) -> Result<RfidCard, StoreError> {
        let uid_code = normalize_uid(uid_code)
            .ok_or_else(|| StoreError::Invalid("Card UID is required".to_string()))?;

        let mut state = self.state.write().await;
        if state.cards.iter().any(|c| c.uid_code == uid_code) {
            return Err(StoreError::Duplicate("Card UID already registered".to_string()));
        }
        state.ensure_member(member_id)?;

        let card = RfidCard {
            id: Uuid::new_v4(),
            uid_code,
            member_id,
            is_active: true,
            created_at: Utc::now(),
        };
        state.cards.push(card.clone());

        Ok(card)
    }

    async fn pair_card(
        &self,
        card_id: Uuid,
        member_id: Option<Uuid>,
    ) -> Result<RfidCard, StoreError> {
        let mut state = self.state.write().await;
        state.ensure_member(member_id)?;

        let card = state.card_mut(card_id)?;
        card.member_id = member_id;
        Ok(card.clone())
    }

    async fn set_card_active(&self, card_id: Uuid, is_active: bool) -> Result<RfidCard, StoreError> {
        let mut state = self.state.write().await;
        let card = state.card_mut(card_id)?;
        card.is_active = is_active;
        Ok(card.clone())
    }

    async fn delete_card(&self, card_id: Uuid) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let before = state.cards.len();
        state.cards.retain(|c| c.id != card_id);

        if state.cards.len() == before {
            return Err(StoreError::NotFound("Card".to_string()));
        }
        Ok(())
    }

    async fn find_card(&self, card_id: Uuid) -> Result<Option<CardWithMember>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .cards
            .iter()
            .find(|c| c.id == card_id)
            .map(|c| state.card_with_member(c)))
    }

    async fn list_cards(
        &self,
        status: Option<CardStatusFilter>,
    ) -> Result<Vec<CardWithMember>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .cards
            .iter()
            .rev()
            .filter(|c| status.map_or(true, |s| s.matches(c)))
            .map(|c| state.card_with_member(c))
            .collect())
    }

    async fn create_member(&self, data: &CreateMemberData) -> Result<Member, StoreError> {
        let data = validate_new_member(data)?;

        let mut state = self.state.write().await;
        if state.roll_no_taken(&data.roll_no, None) {
            return Err(StoreError::Duplicate("Roll number already registered".to_string()));
        }

        let now = Utc::now();
        let member = Member {
            id: Uuid::new_v4(),
            roll_no: data.roll_no,
            name: data.name,
            group_name: data.group_name,
            photo_path: data.photo_path,
            created_at: now,
            updated_at: now,
        };
        state.members.insert(member.id, member.clone());

        Ok(member)
    }

    async fn update_member(&self, id: Uuid, data: &UpdateMemberData) -> Result<Member, StoreError> {
        let data = validate_member_update(data)?;

        let mut state = self.state.write().await;
        if let Some(roll_no) = &data.roll_no {
            if state.roll_no_taken(roll_no, Some(id)) {
                return Err(StoreError::Duplicate("Roll number already registered".to_string()));
            }
        }

        let member = state
            .members
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound("Member".to_string()))?;

        if let Some(roll_no) = data.roll_no {
            member.roll_no = roll_no;
        }
        if let Some(name) = data.name {
            member.name = name;
        }
        if let Some(group_name) = data.group_name {
            member.group_name = group_name;
        }
        if let Some(photo_path) = data.photo_path {
            member.photo_path = photo_path;
        }
        member.updated_at = Utc::now();

        Ok(member.clone())
    }

    async fn delete_member(&self, id: Uuid) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if state.members.remove(&id).is_none() {
            return Err(StoreError::NotFound("Member".to_string()));
        }

        state.cards.retain(|c| c.member_id != Some(id));
        state.records.retain(|r| r.member_id != id);
        state.cycles.retain(|(member_id, _), _| *member_id != id);

        Ok(())
    }

    async fn find_member(&self, id: Uuid) -> Result<Option<Member>, StoreError> {
        Ok(self.state.read().await.members.get(&id).cloned())
    }

    async fn list_members(&self, filter: &MemberFilter) -> Result<Vec<Member>, StoreError> {
        let search = filter.search.as_deref().map(str::to_lowercase);
        let state = self.state.read().await;

        let mut members: Vec<Member> = state
            .members
            .values()
            .filter(|m| {
                search.as_deref().map_or(true, |s| {
                    m.name.to_lowercase().contains(s) || m.roll_no.to_lowercase().contains(s)
                })
            })
            .filter(|m| {
                filter
                    .group
                    .as_deref()
                    .map_or(true, |g| m.group_name.as_deref() == Some(g))
            })
            .cloned()
            .collect();
        members.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(members)
    }

    async fn list_member_cards(&self, member_id: Uuid) -> Result<Vec<RfidCard>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .cards
            .iter()
            .rev()
            .filter(|c| c.member_id == Some(member_id))
            .cloned()
            .collect())
    }

    async fn list_groups(&self) -> Result<Vec<String>, StoreError> {
        let state = self.state.read().await;
        let groups: BTreeSet<String> = state
            .members
            .values()
            .filter_map(|m| m.group_name.clone())
            .filter(|g| !g.is_empty())
            .collect();

        Ok(groups.into_iter().collect())
    }
}

#[async_trait]
impl AttendanceLedger for MemoryStore {
    async fn find_cycle(
        &self,
        member_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .cycles
            .get(&(member_id, date))
            .and_then(|id| state.records.iter().find(|r| r.id == *id))
            .cloned())
    }

    async fn open_cycle(
        &self,
        member_id: Uuid,
        date: NaiveDate,
        clock_in: NaiveTime,
        classification: Classification,
    ) -> Result<AttendanceRecord, LedgerError> {
        let mut state = self.state.write().await;
        if state.cycles.contains_key(&(member_id, date)) {
            return Err(LedgerError::DuplicateCycle { member_id, date });
        }
        state.ensure_member(Some(member_id))?;

        let record = AttendanceRecord {
            id: Uuid::new_v4(),
            member_id,
            date,
            clock_in,
            clock_out: None,
            classification,
            created_at: Utc::now(),
        };
        state.cycles.insert((member_id, date), record.id);
        state.records.push(record.clone());

        Ok(record)
    }

    async fn close_cycle(
        &self,
        record_id: Uuid,
        clock_out: NaiveTime,
    ) -> Result<AttendanceRecord, LedgerError> {
        let mut state = self.state.write().await;
        let record = state
            .records
            .iter_mut()
            .find(|r| r.id == record_id && r.clock_out.is_none())
            .ok_or(LedgerError::AlreadyClosed { record_id })?;

        record.clock_out = Some(clock_out);
        Ok(record.clone())
    }
}

#[async_trait]
impl AttendanceReports for MemoryStore {
    async fn count_members(&self) -> Result<i64, StoreError> {
        Ok(self.state.read().await.members.len() as i64)
    }

    async fn counts_between(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<AttendanceCounts, StoreError> {
        let state = self.state.read().await;

        Ok(state
            .records
            .iter()
            .filter(|r| r.date >= start_date && r.date <= end_date)
            .fold(AttendanceCounts::default(), |mut counts, r| {
                counts.total += 1;
                match r.classification {
                    Classification::OnTime => counts.on_time += 1,
                    Classification::Late => counts.late += 1,
                }
                if r.is_closed() {
                    counts.clocked_out += 1;
                }
                counts
            }))
    }

    async fn list_entries(
        &self,
        filter: &RecordFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AttendanceEntry>, StoreError> {
        let state = self.state.read().await;

        let mut entries: Vec<AttendanceEntry> = state
            .records
            .iter()
            .filter_map(|r| state.entry(r))
            .filter(|e| filter.matches(e))
            .collect();
        entries.sort_by(|a, b| {
            b.record
                .date
                .cmp(&a.record.date)
                .then(b.record.clock_in.cmp(&a.record.clock_in))
        });

        Ok(entries
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn count_entries(&self, filter: &RecordFilter) -> Result<i64, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .records
            .iter()
            .filter_map(|r| state.entry(r))
            .filter(|e| filter.matches(e))
            .count() as i64)
    }

    async fn list_recent(
        &self,
        date: NaiveDate,
        limit: i64,
    ) -> Result<Vec<AttendanceEntry>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .records
            .iter()
            .rev()
            .filter(|r| r.date == date)
            .filter_map(|r| state.entry(r))
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn member_records(
        &self,
        member_id: Uuid,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let state = self.state.read().await;

        let mut records: Vec<AttendanceRecord> = state
            .records
            .iter()
            .filter(|r| r.member_id == member_id)
            .filter(|r| start_date.map_or(true, |d| r.date >= d))
            .filter(|r| end_date.map_or(true, |d| r.date <= d))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.date.cmp(&a.date));

        Ok(records)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
