//! # Flower Reward Service
//!
//! Leaders reward check-ins with flowers, capped by a per-day quota;
//! the service also snapshots daily leaderboards and issues the
//! end-of-event certificates.
//!
//! ## Responsibilities
//!
//! - **Gives**: one flower bundle per check-in, giver-side quota
//!   enforced atomically in the store.
//! - **Daily stats**: per-date totals plus a ranked leaderboard,
//!   regenerable without duplication.
//! - **Certificates**: top-3 flower ranks and completion honors,
//!   each issued at most once per (event, member, kind).
//!
//! Ranking is deterministic: flowers descending, then member ID
//! ascending, so regenerated snapshots and re-run finalizations agree
//! with earlier ones.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info};
use uuid::Uuid;

use crate::clock::Clock;
use crate::config::AppConfig;
use crate::db::models::{
    ActivityStatus, CertificateKind, CertificateRecord, DailyStatRecord, EnrollmentKind,
    EnrollmentRecord, EnrollmentStatus, FlowerRecord, LeaderboardEntry,
};
use crate::error::{ClubError, ClubResult};
use crate::models::{GiveFlowerRequest, GiveFlowerResponse, QuotaStatusResponse, UserRef};
use crate::notify::{DomainEvent, Notifier};
use crate::services::leader;
use crate::store::ClubStore;

/// How many flower-rank certificates an event hands out.
const FLOWER_RANK_PLACES: usize = 3;

#[derive(Clone)]
pub struct FlowerService {
    store: Arc<dyn ClubStore>,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
    config: AppConfig,
}

impl FlowerService {
    pub fn new(
        store: Arc<dyn ClubStore>,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
        config: AppConfig,
    ) -> Self {
        Self {
            store,
            clock,
            notifier,
            config,
        }
    }

    /// Give flowers to a check-in.
    ///
    /// Open to the slot's leader inside the give window and to the
    /// overall leader at any time. Each check-in can be rewarded
    /// once; the giver's daily quota is consumed in the same store
    /// transaction that records the flower, so a failed give leaves
    /// the quota untouched.
    pub async fn give(
        &self,
        giver: &UserRef,
        request: GiveFlowerRequest,
    ) -> ClubResult<GiveFlowerResponse> {
        if request.amount < 1 {
            return Err(ClubError::validation("amount", "flower amount must be at least 1"));
        }

        let check_in = self
            .store
            .get_check_in(request.check_in_id)
            .await?
            .ok_or(ClubError::NotFound("Check-in"))?;
        let slot = self
            .store
            .get_slot(check_in.slot_id)
            .await?
            .ok_or(ClubError::NotFound("Slot"))?;
        let event = self
            .store
            .get_event(check_in.event_id)
            .await?
            .ok_or(ClubError::NotFound("Event"))?;

        if event.activity_status != ActivityStatus::InProgress {
            return Err(ClubError::conflict("event is not in progress"));
        }
        if check_in.user_id == giver.id {
            return Err(ClubError::validation("checkInId", "cannot reward your own check-in"));
        }

        let today = self.clock.today();
        let grace = self.config.flower_grace_days;
        if !leader::can_give(&event, &slot, giver.id, today, grace) {
            let window = leader::give_window(slot.slot_date, grace);
            return Err(ClubError::PermissionDenied(format!(
                "flowers for day {} may only be given by its leader between {} and {}",
                slot.day_number, window.opens, window.closes
            )));
        }

        let flower = FlowerRecord {
            id: Uuid::new_v4(),
            event_id: event.id,
            slot_id: slot.id,
            check_in_id: check_in.id,
            giver_id: giver.id,
            recipient_id: check_in.user_id,
            amount: request.amount,
            comment: request.comment,
            anonymous: request.anonymous,
            given_on: today,
            created_at: self.clock.now(),
        };
        let quota = self
            .store
            .record_flower(&flower, self.config.daily_flower_quota)
            .await?;

        info!(
            "Flower given: event={} slot={} recipient={} amount={} quota={}/{}",
            event.id, slot.id, flower.recipient_id, flower.amount, quota.used, quota.max
        );
        self.notifier.publish(DomainEvent::FlowerReceived {
            event_id: event.id,
            recipient_id: flower.recipient_id,
            giver_id: (!flower.anonymous).then_some(giver.id),
            amount: flower.amount,
        });

        Ok(GiveFlowerResponse {
            flower_id: flower.id,
            recipient_id: flower.recipient_id,
            amount: flower.amount,
            quota: QuotaStatusResponse {
                quota_date: quota.quota_date,
                used: quota.used,
                max: quota.max,
                remaining: (quota.max - quota.used).max(0),
            },
        })
    }

    /// A giver's remaining allowance for today.
    ///
    /// A missing quota row reads as a fresh allowance at the
    /// configured default.
    pub async fn remaining_quota(
        &self,
        user_id: Uuid,
        event_id: Uuid,
    ) -> ClubResult<QuotaStatusResponse> {
        let today = self.clock.today();
        let (used, max) = match self.store.get_flower_quota(user_id, event_id, today).await? {
            Some(quota) => (quota.used, quota.max),
            None => (0, self.config.daily_flower_quota),
        };
        Ok(QuotaStatusResponse {
            quota_date: today,
            used,
            max,
            remaining: (max - used).max(0),
        })
    }

    /// Build (or rebuild) the leaderboard snapshot for one date.
    ///
    /// Keyed by (event, date); a rerun overwrites the earlier
    /// snapshot in place instead of duplicating it.
    pub async fn generate_daily_stat(
        &self,
        event_id: Uuid,
        date: NaiveDate,
    ) -> ClubResult<DailyStatRecord> {
        self.store
            .get_event(event_id)
            .await?
            .ok_or(ClubError::NotFound("Event"))?;

        let flowers = self.store.list_flowers_on(event_id, date).await?;
        let total_flowers: i32 = flowers.iter().map(|f| f.amount).sum();
        let total_check_ins = self.store.count_check_ins_on(event_id, date).await? as i32;

        let names: HashMap<Uuid, String> = self
            .store
            .list_enrollments(event_id)
            .await?
            .into_iter()
            .map(|e| (e.user_id, e.display_name))
            .collect();
        let entries = build_leaderboard(&flowers, &names);
        let leaderboard = serde_json::to_value(&entries).unwrap_or(serde_json::Value::Null);

        let stat = DailyStatRecord {
            id: Uuid::new_v4(),
            event_id,
            stat_date: date,
            total_flowers,
            total_check_ins,
            leaderboard,
            generated_at: self.clock.now(),
        };
        let stored = self.store.upsert_daily_stat(&stat).await?;

        debug!(
            "Daily stat generated: event={} date={} flowers={} check_ins={}",
            event_id, date, total_flowers, total_check_ins
        );
        self.notifier.publish(DomainEvent::DailyStatReady {
            event_id,
            stat_date: date,
            total_flowers,
            total_check_ins,
        });

        Ok(stored)
    }

    /// The stored snapshot for one date, if generated.
    pub async fn leaderboard(
        &self,
        event_id: Uuid,
        date: NaiveDate,
    ) -> ClubResult<Option<DailyStatRecord>> {
        self.store.get_daily_stat(event_id, date).await
    }

    /// Issue the event's certificates.
    ///
    /// Top-3 members by flowers received earn flower-rank
    /// certificates; members whose final settlement met the standard
    /// earn completion certificates. Idempotent: members already
    /// holding a certificate of a kind are skipped, so a rerun issues
    /// nothing new. Returns only the certificates issued by this
    /// call.
    pub async fn finalize_certificates(
        &self,
        event_id: Uuid,
    ) -> ClubResult<Vec<CertificateRecord>> {
        let event = self
            .store
            .get_event(event_id)
            .await?
            .ok_or(ClubError::NotFound("Event"))?;
        if event.activity_status != ActivityStatus::Completed {
            return Err(ClubError::conflict("certificates are issued after completion"));
        }

        let mut existing_rank = HashSet::new();
        let mut existing_completion = HashSet::new();
        for certificate in self.store.list_certificates(event_id).await? {
            match certificate.kind {
                CertificateKind::FlowerRank => existing_rank.insert(certificate.user_id),
                CertificateKind::Completion => existing_completion.insert(certificate.user_id),
            };
        }

        let enrollments = self.store.list_enrollments(event_id).await?;
        let mut issued = Vec::new();

        for (rank, (user_id, _flowers)) in top_flower_ranks(&enrollments).into_iter().enumerate() {
            if existing_rank.contains(&user_id) {
                continue;
            }
            let certificate = self
                .issue(event_id, user_id, CertificateKind::FlowerRank, |c| {
                    c.rank = Some(rank as i32 + 1);
                })
                .await?;
            issued.extend(certificate);
        }

        for enrollment in enrollments
            .iter()
            .filter(|e| e.status == EnrollmentStatus::Completed)
        {
            if existing_completion.contains(&enrollment.user_id) {
                continue;
            }
            let rate = enrollment.completion_rate;
            let certificate = self
                .issue(event_id, enrollment.user_id, CertificateKind::Completion, |c| {
                    c.completion_rate = rate;
                })
                .await?;
            issued.extend(certificate);
        }

        info!(
            "Certificates finalized: event={} issued={}",
            event_id,
            issued.len()
        );
        Ok(issued)
    }

    /// Certificates issued for an event, oldest first.
    pub async fn certificates(&self, event_id: Uuid) -> ClubResult<Vec<CertificateRecord>> {
        self.store.list_certificates(event_id).await
    }

    async fn issue(
        &self,
        event_id: Uuid,
        user_id: Uuid,
        kind: CertificateKind,
        fill: impl FnOnce(&mut CertificateRecord),
    ) -> ClubResult<Option<CertificateRecord>> {
        let sequence = self.store.next_certificate_serial().await?;
        let mut certificate = CertificateRecord {
            id: Uuid::new_v4(),
            event_id,
            user_id,
            kind,
            serial: format!("{}-{:06}", self.config.certificate_prefix, sequence),
            rank: None,
            completion_rate: None,
            issued_at: self.clock.now(),
        };
        fill(&mut certificate);

        let stored = self.store.insert_certificate(&certificate).await?;
        if let Some(stored) = &stored {
            self.notifier.publish(DomainEvent::CertificateIssued {
                event_id,
                user_id,
                certificate_kind: stored.kind,
                serial: stored.serial.clone(),
            });
        }
        Ok(stored)
    }
}

/// Rank a date's flowers: totals per recipient, flowers descending,
/// member ID ascending on ties.
fn build_leaderboard(
    flowers: &[FlowerRecord],
    names: &HashMap<Uuid, String>,
) -> Vec<LeaderboardEntry> {
    let mut totals: HashMap<Uuid, i32> = HashMap::new();
    for flower in flowers {
        *totals.entry(flower.recipient_id).or_default() += flower.amount;
    }

    let mut ranked: Vec<(Uuid, i32)> = totals.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    ranked
        .into_iter()
        .enumerate()
        .map(|(index, (user_id, flowers))| LeaderboardEntry {
            rank: index as i32 + 1,
            user_id,
            display_name: names.get(&user_id).cloned().unwrap_or_default(),
            flowers,
        })
        .collect()
}

/// Top-3 participants by flowers received across the whole event.
/// Cancelled enrollments and zero-flower members never place.
fn top_flower_ranks(enrollments: &[EnrollmentRecord]) -> Vec<(Uuid, i32)> {
    let mut candidates: Vec<(Uuid, i32)> = enrollments
        .iter()
        .filter(|e| {
            e.kind == EnrollmentKind::Participant
                && e.status != EnrollmentStatus::Cancelled
                && e.flowers_received > 0
        })
        .map(|e| (e.user_id, e.flowers_received))
        .collect();
    candidates.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    candidates.truncate(FLOWER_RANK_PLACES);
    candidates
}
