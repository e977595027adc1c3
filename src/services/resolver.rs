use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use std::{future::Future, sync::Arc};
use uuid::Uuid;

use crate::config::AttendancePolicy;
use crate::models::{
    attendance::{AttendanceRecord, Classification},
    card::normalize_uid,
    member::MemberSummary,
};
use crate::services::clock::Clock;
use crate::store::{AttendanceLedger, IdentityStore, LedgerError, StoreError};

#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Storage call `{operation}` timed out")]
    Timeout { operation: &'static str },

    #[error("Attendance record for member {member_id} on {date} disappeared during a scan")]
    Inconsistent { member_id: Uuid, date: NaiveDate },
}

/// Every way a scan can end, short of an infrastructure failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "code", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScanOutcome {
    ClockedIn {
        member: MemberSummary,
        time: NaiveTime,
        classification: Classification,
    },
    ClockedOut {
        member: MemberSummary,
        open_time: NaiveTime,
        close_time: NaiveTime,
    },
    AlreadyCompleted {
        member: MemberSummary,
        open_time: NaiveTime,
        close_time: NaiveTime,
    },
    CardNotFound {
        card_uid: String,
    },
    CardInactive {
        card_uid: String,
    },
    CardNotPaired {
        card_uid: String,
    },
    InvalidRequest {
        reason: String,
    },
}

impl ScanOutcome {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            ScanOutcome::ClockedIn { .. } => "CLOCKED_IN",
            ScanOutcome::ClockedOut { .. } => "CLOCKED_OUT",
            ScanOutcome::AlreadyCompleted { .. } => "ALREADY_COMPLETED",
            ScanOutcome::CardNotFound { .. } => "CARD_NOT_FOUND",
            ScanOutcome::CardInactive { .. } => "CARD_INACTIVE",
            ScanOutcome::CardNotPaired { .. } => "CARD_NOT_PAIRED",
            ScanOutcome::InvalidRequest { .. } => "INVALID_REQUEST",
        }
    }

    /// True for the two transitions that wrote to the ledger
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            ScanOutcome::ClockedIn { .. } | ScanOutcome::ClockedOut { .. }
        )
    }

    pub fn message(&self) -> String {
        match self {
            ScanOutcome::ClockedIn { member, .. } => format!("Welcome, {}!", member.name),
            ScanOutcome::ClockedOut { member, .. } => format!("Goodbye, {}!", member.name),
            ScanOutcome::AlreadyCompleted { .. } => {
                "Attendance for today is already complete (in and out)".to_string()
            }
            ScanOutcome::CardNotFound { .. } => "Card is not registered".to_string(),
            ScanOutcome::CardInactive { .. } => "Card has been deactivated".to_string(),
            ScanOutcome::CardNotPaired { .. } => "Card is not paired with a member".to_string(),
            ScanOutcome::InvalidRequest { reason } => reason.clone(),
        }
    }
}

/// Classifies the opening of a cycle against the late threshold.
/// Only the time-of-day matters, the date is never consulted.
pub fn classify(time: NaiveTime, policy: &AttendancePolicy) -> Classification {
    let late = if policy.late_at_threshold {
        time >= policy.late_threshold
    } else {
        time > policy.late_threshold
    };

    if late {
        Classification::Late
    } else {
        Classification::OnTime
    }
}

/// Turns card scans into clock-in / clock-out transitions on the ledger.
///
/// Per (member, date) the ledger moves `NO_CYCLE -> OPEN -> CLOSED`. The
/// resolver holds no state of its own and takes no locks; concurrent scans are
/// arbitrated by the ledger's conditional writes. A lost race is resolved by
/// re-reading the record and classifying the request against what won.
pub struct AttendanceResolver {
    identity: Arc<dyn IdentityStore>,
    ledger: Arc<dyn AttendanceLedger>,
    clock: Arc<dyn Clock>,
    policy: AttendancePolicy,
}

impl AttendanceResolver {
    pub fn new(
        identity: Arc<dyn IdentityStore>,
        ledger: Arc<dyn AttendanceLedger>,
        clock: Arc<dyn Clock>,
        policy: AttendancePolicy,
    ) -> Self {
        Self {
            identity,
            ledger,
            clock,
            policy,
        }
    }

    pub fn policy(&self) -> &AttendancePolicy {
        &self.policy
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    #[tracing::instrument(skip(self, device_id), fields(device = device_id.unwrap_or("unknown")))]
    pub async fn scan(
        &self,
        card_uid: &str,
        device_id: Option<&str>,
    ) -> Result<ScanOutcome, ScanError> {
        let Some(card_uid) = normalize_uid(card_uid) else {
            tracing::info!("Rejected scan without card UID");
            return Ok(ScanOutcome::InvalidRequest {
                reason: "card_uid is required".to_string(),
            });
        };

        let resolved = self
            .bounded("resolve_card", self.identity.resolve(&card_uid))
            .await?;

        let Some(resolved) = resolved else {
            tracing::info!(card_uid = %card_uid, "Card not found");
            return Ok(ScanOutcome::CardNotFound { card_uid });
        };

        if !resolved.card.is_active {
            tracing::info!(card_uid = %card_uid, "Card inactive");
            return Ok(ScanOutcome::CardInactive { card_uid });
        }

        let Some(member) = resolved.member else {
            tracing::info!(card_uid = %card_uid, "Card not paired");
            return Ok(ScanOutcome::CardNotPaired { card_uid });
        };

        let (today, now) = self.clock.today_and_time();

        let existing = self
            .bounded("find_cycle", self.ledger.find_cycle(member.id, today))
            .await?;

        let record = match existing {
            Some(record) => record,
            None => match self.open(&member, today, now).await? {
                Opened::Fresh(outcome) => return Ok(outcome),
                Opened::LostRace(record) => record,
            },
        };

        if record.is_closed() {
            return Ok(already_completed(member, &record));
        }

        self.close(member, record, now).await
    }

    async fn open(
        &self,
        member: &MemberSummary,
        today: NaiveDate,
        now: NaiveTime,
    ) -> Result<Opened, ScanError> {
        let classification = classify(now, &self.policy);

        let result = self
            .bounded_ledger(
                "open_cycle",
                self.ledger.open_cycle(member.id, today, now, classification),
            )
            .await?;

        match result {
            Ok(record) => {
                tracing::info!(
                    member_id = %member.id,
                    time = %record.clock_in,
                    classification = %record.classification,
                    "Clocked in"
                );
                Ok(Opened::Fresh(ScanOutcome::ClockedIn {
                    member: member.clone(),
                    time: record.clock_in,
                    classification: record.classification,
                }))
            }
            Err(LedgerError::DuplicateCycle { .. }) => {
                tracing::debug!(member_id = %member.id, "Lost clock-in race, re-reading cycle");
                let record = self.reread(member.id, today).await?;
                Ok(Opened::LostRace(record))
            }
            Err(LedgerError::AlreadyClosed { .. }) => Err(ScanError::Inconsistent {
                member_id: member.id,
                date: today,
            }),
            Err(LedgerError::Store(e)) => Err(e.into()),
        }
    }

    async fn close(
        &self,
        member: MemberSummary,
        record: AttendanceRecord,
        now: NaiveTime,
    ) -> Result<ScanOutcome, ScanError> {
        let result = self
            .bounded_ledger("close_cycle", self.ledger.close_cycle(record.id, now))
            .await?;

        match result {
            Ok(closed) => {
                tracing::info!(
                    member_id = %member.id,
                    clock_in = %closed.clock_in,
                    clock_out = ?closed.clock_out,
                    "Clocked out"
                );
                Ok(ScanOutcome::ClockedOut {
                    member,
                    open_time: closed.clock_in,
                    close_time: closed.clock_out.unwrap_or(now),
                })
            }
            Err(LedgerError::AlreadyClosed { .. }) => {
                tracing::debug!(member_id = %member.id, "Lost clock-out race, re-reading cycle");
                let current = self.reread(member.id, record.date).await?;
                Ok(already_completed(member, &current))
            }
            Err(LedgerError::DuplicateCycle { .. }) => Err(ScanError::Inconsistent {
                member_id: member.id,
                date: record.date,
            }),
            Err(LedgerError::Store(e)) => Err(e.into()),
        }
    }

    async fn reread(&self, member_id: Uuid, date: NaiveDate) -> Result<AttendanceRecord, ScanError> {
        self.bounded("find_cycle", self.ledger.find_cycle(member_id, date))
            .await?
            .ok_or(ScanError::Inconsistent { member_id, date })
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, ScanError> {
        match tokio::time::timeout(self.policy.call_timeout(), call).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(ScanError::Timeout { operation }),
        }
    }

    /// Like `bounded`, but hands ledger conflicts back to the caller
    async fn bounded_ledger<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, LedgerError>>,
    ) -> Result<Result<T, LedgerError>, ScanError> {
        tokio::time::timeout(self.policy.call_timeout(), call)
            .await
            .map_err(|_| ScanError::Timeout { operation })
    }
}

enum Opened {
    Fresh(ScanOutcome),
    LostRace(AttendanceRecord),
}

fn already_completed(member: MemberSummary, record: &AttendanceRecord) -> ScanOutcome {
    tracing::info!(member_id = %member.id, "Attendance already completed");
    ScanOutcome::AlreadyCompleted {
        member,
        open_time: record.clock_in,
        close_time: record.clock_out.unwrap_or(record.clock_in),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDateTime;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use crate::models::member::CreateMemberData;
    use crate::services::clock::ManualClock;
    use crate::store::{AttendanceReports, MemoryStore};

    fn at(date: &str, time: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(&format!("{} {}", date, time), "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn hms(time: &str) -> NaiveTime {
        NaiveTime::parse_from_str(time, "%H:%M:%S").unwrap()
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        clock: Arc<ManualClock>,
        resolver: AttendanceResolver,
        member_id: Uuid,
    }

    async fn fixture(policy: AttendancePolicy) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(at("2025-03-10", "07:00:00")));

        let member = store
            .create_member(&CreateMemberData {
                roll_no: "1001".to_string(),
                name: "Alya".to_string(),
                group_name: Some("XII-A".to_string()),
                photo_path: None,
            })
            .await
            .unwrap();
        store.register_card("A1B2C3", Some(member.id)).await.unwrap();

        let resolver = AttendanceResolver::new(store.clone(), store.clone(), clock.clone(), policy);

        Fixture {
            store,
            clock,
            resolver,
            member_id: member.id,
        }
    }

    #[test]
    fn test_classify_boundary_is_on_time_by_default() {
        let policy = AttendancePolicy::default();

        assert_eq!(classify(hms("07:59:59"), &policy), Classification::OnTime);
        assert_eq!(classify(hms("08:00:00"), &policy), Classification::OnTime);
        assert_eq!(classify(hms("08:00:01"), &policy), Classification::Late);
    }

    #[test]
    fn test_classify_boundary_is_late_when_inclusive() {
        let policy = AttendancePolicy {
            late_at_threshold: true,
            ..Default::default()
        };

        assert_eq!(classify(hms("07:59:59"), &policy), Classification::OnTime);
        assert_eq!(classify(hms("08:00:00"), &policy), Classification::Late);
    }

    #[tokio::test]
    async fn test_full_day_cycle() {
        let f = fixture(AttendancePolicy::default()).await;

        f.clock.set(at("2025-03-10", "07:45:00"));
        let outcome = f.resolver.scan("A1B2C3", Some("GATE1")).await.unwrap();
        match outcome {
            ScanOutcome::ClockedIn {
                member,
                time,
                classification,
            } => {
                assert_eq!(member.roll_no, "1001");
                assert_eq!(time, hms("07:45:00"));
                assert_eq!(classification, Classification::OnTime);
            }
            other => panic!("expected CLOCKED_IN, got {:?}", other),
        }

        f.clock.set(at("2025-03-10", "16:00:00"));
        let outcome = f.resolver.scan("A1B2C3", None).await.unwrap();
        match outcome {
            ScanOutcome::ClockedOut {
                open_time,
                close_time,
                ..
            } => {
                assert_eq!(open_time, hms("07:45:00"));
                assert_eq!(close_time, hms("16:00:00"));
            }
            other => panic!("expected CLOCKED_OUT, got {:?}", other),
        }

        f.clock.set(at("2025-03-10", "16:05:00"));
        let outcome = f.resolver.scan("A1B2C3", None).await.unwrap();
        match outcome {
            ScanOutcome::AlreadyCompleted {
                open_time,
                close_time,
                ..
            } => {
                assert_eq!(open_time, hms("07:45:00"));
                assert_eq!(close_time, hms("16:00:00"));
            }
            other => panic!("expected ALREADY_COMPLETED, got {:?}", other),
        }

        let record = f
            .store
            .find_cycle(f.member_id, at("2025-03-10", "00:00:00").date())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.clock_in, hms("07:45:00"));
        assert_eq!(record.clock_out, Some(hms("16:00:00")));
        assert_eq!(record.classification, Classification::OnTime);
    }

    #[tokio::test]
    async fn test_late_classification_survives_clock_out() {
        let f = fixture(AttendancePolicy::default()).await;

        f.clock.set(at("2025-03-10", "08:30:00"));
        let outcome = f.resolver.scan("A1B2C3", None).await.unwrap();
        assert!(matches!(
            outcome,
            ScanOutcome::ClockedIn {
                classification: Classification::Late,
                ..
            }
        ));

        f.clock.set(at("2025-03-10", "15:00:00"));
        f.resolver.scan("A1B2C3", None).await.unwrap();

        let record = f
            .store
            .find_cycle(f.member_id, at("2025-03-10", "00:00:00").date())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.classification, Classification::Late);
    }

    #[tokio::test]
    async fn test_each_day_is_classified_independently() {
        let f = fixture(AttendancePolicy::default()).await;

        f.clock.set(at("2025-03-10", "07:30:00"));
        let first = f.resolver.scan("A1B2C3", None).await.unwrap();
        f.clock.set(at("2025-03-11", "09:00:00"));
        let second = f.resolver.scan("A1B2C3", None).await.unwrap();

        assert!(matches!(
            first,
            ScanOutcome::ClockedIn {
                classification: Classification::OnTime,
                ..
            }
        ));
        assert!(matches!(
            second,
            ScanOutcome::ClockedIn {
                classification: Classification::Late,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_lowercase_uid_resolves() {
        let f = fixture(AttendancePolicy::default()).await;
        let outcome = f.resolver.scan("  a1b2c3 ", None).await.unwrap();
        assert_eq!(outcome.code(), "CLOCKED_IN");
    }

    #[tokio::test]
    async fn test_empty_uid_is_invalid_request() {
        let f = fixture(AttendancePolicy::default()).await;
        let outcome = f.resolver.scan("   ", None).await.unwrap();
        assert_eq!(outcome.code(), "INVALID_REQUEST");
    }

    #[tokio::test]
    async fn test_unknown_card_creates_no_record() {
        let f = fixture(AttendancePolicy::default()).await;

        let outcome = f.resolver.scan("FFFFFF", None).await.unwrap();
        assert_eq!(
            outcome,
            ScanOutcome::CardNotFound {
                card_uid: "FFFFFF".to_string()
            }
        );
        assert!(f
            .store
            .find_cycle(f.member_id, at("2025-03-10", "00:00:00").date())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_deactivated_card_is_rejected_after_prior_use() {
        let f = fixture(AttendancePolicy::default()).await;
        f.resolver.scan("A1B2C3", None).await.unwrap();

        let card = f.store.resolve("A1B2C3").await.unwrap().unwrap().card;
        f.store.set_card_active(card.id, false).await.unwrap();

        f.clock.set(at("2025-03-11", "07:00:00"));
        let outcome = f.resolver.scan("A1B2C3", None).await.unwrap();
        assert_eq!(outcome.code(), "CARD_INACTIVE");
    }

    #[tokio::test]
    async fn test_unpaired_card() {
        let f = fixture(AttendancePolicy::default()).await;
        f.store.register_card("0F0F0F", None).await.unwrap();

        let outcome = f.resolver.scan("0f0f0f", None).await.unwrap();
        assert_eq!(outcome.code(), "CARD_NOT_PAIRED");
    }

    #[tokio::test]
    async fn test_concurrent_scans_open_one_cycle() {
        let f = fixture(AttendancePolicy::default()).await;
        let resolver = Arc::new(f.resolver);

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let resolver = resolver.clone();
                tokio::spawn(async move { resolver.scan("A1B2C3", None).await })
            })
            .collect();

        let mut codes = Vec::new();
        for handle in handles {
            codes.push(handle.await.unwrap().unwrap().code());
        }
        codes.sort();

        assert_eq!(codes, vec!["CLOCKED_IN", "CLOCKED_OUT"]);
        assert_eq!(
            f.store
                .member_records(f.member_id, None, None)
                .await
                .unwrap()
                .len(),
            1
        );
    }

    /// Ledger whose first `find_cycle` reports no record even though a
    /// competing scan already opened one; writes go straight through.
    struct RacingLedger {
        inner: Arc<MemoryStore>,
        hide_first_read: AtomicBool,
    }

    #[async_trait]
    impl AttendanceLedger for RacingLedger {
        async fn find_cycle(
            &self,
            member_id: Uuid,
            date: NaiveDate,
        ) -> Result<Option<AttendanceRecord>, StoreError> {
            if self.hide_first_read.swap(false, Ordering::SeqCst) {
                return Ok(None);
            }
            self.inner.find_cycle(member_id, date).await
        }

        async fn open_cycle(
            &self,
            member_id: Uuid,
            date: NaiveDate,
            clock_in: NaiveTime,
            classification: Classification,
        ) -> Result<AttendanceRecord, LedgerError> {
            self.inner
                .open_cycle(member_id, date, clock_in, classification)
                .await
        }

        async fn close_cycle(
            &self,
            record_id: Uuid,
            clock_out: NaiveTime,
        ) -> Result<AttendanceRecord, LedgerError> {
            self.inner.close_cycle(record_id, clock_out).await
        }
    }

    #[tokio::test]
    async fn test_lost_open_race_falls_through_to_close() {
        let f = fixture(AttendancePolicy::default()).await;
        let date = at("2025-03-10", "00:00:00").date();

        // a competing scan already opened the cycle
        f.store
            .open_cycle(f.member_id, date, hms("06:59:00"), Classification::OnTime)
            .await
            .unwrap();

        let ledger = Arc::new(RacingLedger {
            inner: f.store.clone(),
            hide_first_read: AtomicBool::new(true),
        });
        let resolver = AttendanceResolver::new(
            f.store.clone(),
            ledger,
            f.clock.clone(),
            AttendancePolicy::default(),
        );

        let outcome = resolver.scan("A1B2C3", None).await.unwrap();
        match outcome {
            ScanOutcome::ClockedOut { open_time, .. } => assert_eq!(open_time, hms("06:59:00")),
            other => panic!("expected CLOCKED_OUT, got {:?}", other),
        }
        assert_eq!(
            f.store.member_records(f.member_id, None, None).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_lost_close_race_reports_completed() {
        let f = fixture(AttendancePolicy::default()).await;
        let date = at("2025-03-10", "00:00:00").date();

        let record = f
            .store
            .open_cycle(f.member_id, date, hms("07:00:00"), Classification::OnTime)
            .await
            .unwrap();

        // the ledger hands out the open record, then a competing close lands first
        struct StaleLedger {
            inner: Arc<MemoryStore>,
            stale: AttendanceRecord,
            served: AtomicBool,
        }

        #[async_trait]
        impl AttendanceLedger for StaleLedger {
            async fn find_cycle(
                &self,
                member_id: Uuid,
                date: NaiveDate,
            ) -> Result<Option<AttendanceRecord>, StoreError> {
                if !self.served.swap(true, Ordering::SeqCst) {
                    return Ok(Some(self.stale.clone()));
                }
                self.inner.find_cycle(member_id, date).await
            }

            async fn open_cycle(
                &self,
                member_id: Uuid,
                date: NaiveDate,
                clock_in: NaiveTime,
                classification: Classification,
            ) -> Result<AttendanceRecord, LedgerError> {
                self.inner
                    .open_cycle(member_id, date, clock_in, classification)
                    .await
            }

            async fn close_cycle(
                &self,
                record_id: Uuid,
                clock_out: NaiveTime,
            ) -> Result<AttendanceRecord, LedgerError> {
                self.inner.close_cycle(record_id, clock_out).await
            }
        }

        f.store.close_cycle(record.id, hms("12:00:00")).await.unwrap();

        let ledger = Arc::new(StaleLedger {
            inner: f.store.clone(),
            stale: record,
            served: AtomicBool::new(false),
        });
        let resolver = AttendanceResolver::new(
            f.store.clone(),
            ledger,
            f.clock.clone(),
            AttendancePolicy::default(),
        );

        f.clock.set(at("2025-03-10", "12:00:01"));
        let outcome = resolver.scan("A1B2C3", None).await.unwrap();
        match outcome {
            ScanOutcome::AlreadyCompleted { close_time, .. } => {
                assert_eq!(close_time, hms("12:00:00"))
            }
            other => panic!("expected ALREADY_COMPLETED, got {:?}", other),
        }
    }

    struct StalledLedger;

    #[async_trait]
    impl AttendanceLedger for StalledLedger {
        async fn find_cycle(
            &self,
            _member_id: Uuid,
            _date: NaiveDate,
        ) -> Result<Option<AttendanceRecord>, StoreError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(None)
        }

        async fn open_cycle(
            &self,
            _member_id: Uuid,
            _date: NaiveDate,
            _clock_in: NaiveTime,
            _classification: Classification,
        ) -> Result<AttendanceRecord, LedgerError> {
            unreachable!("find_cycle never returns")
        }

        async fn close_cycle(
            &self,
            _record_id: Uuid,
            _clock_out: NaiveTime,
        ) -> Result<AttendanceRecord, LedgerError> {
            unreachable!("find_cycle never returns")
        }
    }

    #[tokio::test]
    async fn test_storage_timeout_surfaces_as_error() {
        let f = fixture(AttendancePolicy::default()).await;
        let resolver = AttendanceResolver::new(
            f.store.clone(),
            Arc::new(StalledLedger),
            f.clock.clone(),
            AttendancePolicy {
                storage_timeout: Duration::from_millis(20),
                ..Default::default()
            },
        );

        let err = resolver.scan("A1B2C3", None).await.unwrap_err();
        assert!(matches!(err, ScanError::Timeout { operation: "find_cycle" }));
        assert!(f
            .store
            .member_records(f.member_id, None, None)
            .await
            .unwrap()
            .is_empty());
    }

    /// Ledger whose reads finish after `storage_timeout` but before the
    /// client-side ceiling
    struct SlowReadLedger {
        inner: Arc<MemoryStore>,
        delay: Duration,
    }

    #[async_trait]
    impl AttendanceLedger for SlowReadLedger {
        async fn find_cycle(
            &self,
            member_id: Uuid,
            date: NaiveDate,
        ) -> Result<Option<AttendanceRecord>, StoreError> {
            tokio::time::sleep(self.delay).await;
            self.inner.find_cycle(member_id, date).await
        }

        async fn open_cycle(
            &self,
            member_id: Uuid,
            date: NaiveDate,
            clock_in: NaiveTime,
            classification: Classification,
        ) -> Result<AttendanceRecord, LedgerError> {
            self.inner
                .open_cycle(member_id, date, clock_in, classification)
                .await
        }

        async fn close_cycle(
            &self,
            record_id: Uuid,
            clock_out: NaiveTime,
        ) -> Result<AttendanceRecord, LedgerError> {
            self.inner.close_cycle(record_id, clock_out).await
        }
    }

    #[tokio::test]
    async fn test_client_ceiling_outlasts_storage_timeout() {
        let f = fixture(AttendancePolicy::default()).await;
        let policy = AttendancePolicy {
            storage_timeout: Duration::from_millis(20),
            ..Default::default()
        };
        let resolver = AttendanceResolver::new(
            f.store.clone(),
            Arc::new(SlowReadLedger {
                inner: f.store.clone(),
                delay: Duration::from_millis(120),
            }),
            f.clock.clone(),
            policy,
        );
        assert!(policy.call_timeout() > Duration::from_millis(120));

        f.clock.set(at("2025-03-10", "07:45:00"));
        let outcome = resolver.scan("A1B2C3", None).await.unwrap();
        assert_eq!(outcome.code(), "CLOCKED_IN");
    }

    #[test]
    fn test_outcome_serializes_with_code() {
        let outcome = ScanOutcome::ClockedIn {
            member: MemberSummary {
                id: Uuid::nil(),
                roll_no: "1001".to_string(),
                name: "Alya".to_string(),
                group_name: Some("XII-A".to_string()),
                photo_path: None,
            },
            time: hms("07:45:00"),
            classification: Classification::OnTime,
        };

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["code"], "CLOCKED_IN");
        assert_eq!(json["time"], "07:45:00");
        assert_eq!(json["classification"], "ON_TIME");
        assert_eq!(json["member"]["group"], "XII-A");
    }
}
