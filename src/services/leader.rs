//! # Leader Assignment Engine
//!
//! Fills schedule slots with daily leaders and answers who may act on
//! a slot when.
//!
//! ## Strategies
//!
//! | Strategy | Behavior |
//! |----------|----------|
//! | `voluntary` | Members claim open slots themselves, capped per member |
//! | `random` | Seeded shuffle of participants dealt round-robin |
//! | `rotation` | Fixed rotating order, no repeats on adjacent days |
//! | `balanced` | Fewest leader-days first, seeded tie-break |
//! | `disabled` | No leaders at all |
//!
//! Automatic planning is pure and seeded (`StdRng`), so a plan for a
//! given participant list is reproducible. The plan is then applied
//! slot by slot through the store's conditional assignment, which
//! skips any slot claimed or filled in the meantime.
//!
//! ## Permission Windows
//!
//! ```text
//! slot date D, grace G
//!
//! content-publish   [D-1 ──────── D]
//! flower-give              [D ──────── D+G]
//! ```
//!
//! Both windows are closed date intervals. The event's overall leader
//! bypasses them entirely; the backup permission stands at any time.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::config::AppConfig;
use crate::db::models::{
    ActivityStatus, EnrollmentKind, EnrollmentStatus, EventRecord, LeaderAuditRecord,
    LeaderStrategy, ScheduleSlotRecord,
};
use crate::error::{ClubError, ClubResult};
use crate::models::{BackupCandidate, BackupReason, ReassignLeaderRequest, UserRef};
use crate::notify::{DomainEvent, Notifier};
use crate::store::ClubStore;

// ==========================================
// PERMISSION WINDOWS
// ==========================================

/// A closed calendar-date interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionWindow {
    pub opens: NaiveDate,
    pub closes: NaiveDate,
}

impl PermissionWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.opens <= date && date <= self.closes
    }
}

/// When a slot's leader may publish content: the day before and the
/// day itself.
pub fn content_window(slot_date: NaiveDate) -> PermissionWindow {
    PermissionWindow {
        opens: slot_date - Duration::days(1),
        closes: slot_date,
    }
}

/// When a slot's leader may give flowers: the day itself through the
/// grace period.
pub fn give_window(slot_date: NaiveDate, grace_days: i64) -> PermissionWindow {
    PermissionWindow {
        opens: slot_date,
        closes: slot_date + Duration::days(grace_days),
    }
}

/// Whether `user_id` may publish content for `slot` today.
pub fn can_publish(
    event: &EventRecord,
    slot: &ScheduleSlotRecord,
    user_id: Uuid,
    today: NaiveDate,
) -> bool {
    if event.overall_leader_id == Some(user_id) {
        return true;
    }
    slot.leader_id == Some(user_id) && content_window(slot.slot_date).contains(today)
}

/// Whether `user_id` may give flowers for `slot` today.
pub fn can_give(
    event: &EventRecord,
    slot: &ScheduleSlotRecord,
    user_id: Uuid,
    today: NaiveDate,
    grace_days: i64,
) -> bool {
    if event.overall_leader_id == Some(user_id) {
        return true;
    }
    slot.leader_id == Some(user_id) && give_window(slot.slot_date, grace_days).contains(today)
}

// ==========================================
// ASSIGNMENT PLANNERS
// ==========================================

/// Seed derived from the event ID so unscripted assignment is still
/// reproducible per event.
fn default_seed(event_id: Uuid) -> u64 {
    let mut eight = [0u8; 8];
    eight.copy_from_slice(&event_id.as_bytes()[..8]);
    u64::from_le_bytes(eight)
}

/// Shuffled participants dealt round-robin across open slots.
fn plan_random(
    open: &[ScheduleSlotRecord],
    participants: &[Uuid],
    seed: u64,
) -> Vec<(Uuid, Uuid)> {
    if participants.is_empty() {
        return Vec::new();
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let mut order = participants.to_vec();
    order.shuffle(&mut rng);

    open.iter()
        .enumerate()
        .map(|(index, slot)| (slot.id, order[index % order.len()]))
        .collect()
}

/// Rotating order over the participant list, skipping any pick that
/// would repeat the leader of an adjacent day.
///
/// Takes the whole schedule (assigned slots included) so rotation
/// around already-claimed or reassigned slots stays repeat-free.
fn plan_rotation(slots: &[ScheduleSlotRecord], participants: &[Uuid]) -> Vec<(Uuid, Uuid)> {
    if participants.is_empty() {
        return Vec::new();
    }

    let mut leader_by_day: HashMap<i32, Uuid> = slots
        .iter()
        .filter_map(|s| s.leader_id.map(|leader| (s.day_number, leader)))
        .collect();

    let mut plan = Vec::new();
    let mut cursor = 0usize;
    for slot in slots.iter().filter(|s| s.leader_id.is_none()) {
        let neighbors = [
            leader_by_day.get(&(slot.day_number - 1)).copied(),
            leader_by_day.get(&(slot.day_number + 1)).copied(),
        ];

        let mut candidate = participants[cursor % participants.len()];
        if participants.len() > 1 {
            // Bounded scan; with two distinct pre-assigned neighbors
            // and two participants no candidate fits, so give up and
            // take the current one rather than spin.
            let mut skipped = 0;
            while neighbors.contains(&Some(candidate)) && skipped < participants.len() {
                cursor += 1;
                candidate = participants[cursor % participants.len()];
                skipped += 1;
            }
        }

        plan.push((slot.id, candidate));
        leader_by_day.insert(slot.day_number, candidate);
        cursor += 1;
    }
    plan
}

/// Fewest assignments first, ties broken by the seeded RNG.
fn plan_balanced(
    open: &[ScheduleSlotRecord],
    participants: &[(Uuid, i32)],
    seed: u64,
) -> Vec<(Uuid, Uuid)> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut counts = participants.to_vec();
    let mut plan = Vec::with_capacity(open.len());

    for slot in open {
        let Some(least) = counts.iter().map(|(_, count)| *count).min() else {
            break;
        };
        let tied: Vec<usize> = counts
            .iter()
            .enumerate()
            .filter(|(_, (_, count))| *count == least)
            .map(|(index, _)| index)
            .collect();
        let chosen = tied[rng.gen_range(0..tied.len())];

        plan.push((slot.id, counts[chosen].0));
        counts[chosen].1 += 1;
    }
    plan
}

// ==========================================
// SERVICE
// ==========================================

/// Assigns, replaces and audits slot leaders.
#[derive(Clone)]
pub struct LeaderService {
    store: Arc<dyn ClubStore>,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
    config: AppConfig,
}

impl LeaderService {
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

    /// Voluntarily claim an open slot.
    ///
    /// Only meaningful under the `voluntary` strategy. The per-member
    /// claim cap comes from configuration (`LEADER_CLAIM_CAP`, 0 for
    /// unlimited). The open-check, cap-check and assignment happen
    /// atomically in the store, so two racing claimants resolve to
    /// one winner and one `DuplicateAssignment`.
    pub async fn claim(&self, user: &UserRef, slot_id: Uuid) -> ClubResult<ScheduleSlotRecord> {
        let slot = self
            .store
            .get_slot(slot_id)
            .await?
            .ok_or(ClubError::NotFound("Slot"))?;
        let event = self
            .store
            .get_event(slot.event_id)
            .await?
            .ok_or(ClubError::NotFound("Event"))?;

        if event.leader_strategy != LeaderStrategy::Voluntary {
            return Err(ClubError::conflict(format!(
                "slots cannot be claimed under the {} strategy",
                event.leader_strategy
            )));
        }
        if event.activity_status == ActivityStatus::Completed {
            return Err(ClubError::conflict("event already completed"));
        }

        let claimed = self
            .store
            .claim_slot(slot_id, user.id, self.config.claim_cap())
            .await?;

        info!(
            "Slot claimed: event={} slot={} day={} leader={}",
            event.id, slot_id, claimed.day_number, user.id
        );
        self.notifier.publish(DomainEvent::LeaderAssigned {
            event_id: event.id,
            slot_id,
            leader_id: user.id,
            day_number: claimed.day_number,
        });

        Ok(claimed)
    }

    /// Fill every open slot per the event's strategy.
    ///
    /// No-op for `voluntary` and `disabled`. Returns how many slots
    /// were filled. Safe to re-run; a second invocation finds nothing
    /// open. Pass a seed for scripted runs, `None` derives one from
    /// the event ID.
    pub async fn auto_assign(&self, event_id: Uuid, seed: Option<u64>) -> ClubResult<u64> {
        let event = self
            .store
            .get_event(event_id)
            .await?
            .ok_or(ClubError::NotFound("Event"))?;

        match event.leader_strategy {
            LeaderStrategy::Voluntary | LeaderStrategy::Disabled => return Ok(0),
            LeaderStrategy::Random | LeaderStrategy::Rotation | LeaderStrategy::Balanced => {}
        }

        let slots = self.store.list_slots(event_id).await?;
        let open: Vec<ScheduleSlotRecord> = slots
            .iter()
            .filter(|s| s.leader_id.is_none())
            .cloned()
            .collect();
        if open.is_empty() {
            debug!("No open slots to assign: event={}", event_id);
            return Ok(0);
        }

        let enrollments = self.store.list_enrollments(event_id).await?;
        let participants: Vec<Uuid> = enrollments
            .iter()
            .filter(|e| {
                e.kind == EnrollmentKind::Participant && e.status == EnrollmentStatus::Enrolled
            })
            .map(|e| e.user_id)
            .collect();
        if participants.is_empty() {
            warn!("No enrolled participants to assign: event={}", event_id);
            return Ok(0);
        }

        let seed = seed.unwrap_or_else(|| default_seed(event_id));
        let plan = match event.leader_strategy {
            LeaderStrategy::Random => plan_random(&open, &participants, seed),
            LeaderStrategy::Rotation => plan_rotation(&slots, &participants),
            LeaderStrategy::Balanced => {
                let counts: Vec<(Uuid, i32)> = enrollments
                    .iter()
                    .filter(|e| {
                        e.kind == EnrollmentKind::Participant
                            && e.status == EnrollmentStatus::Enrolled
                    })
                    .map(|e| (e.user_id, e.leader_days))
                    .collect();
                plan_balanced(&open, &counts, seed)
            }
            LeaderStrategy::Voluntary | LeaderStrategy::Disabled => Vec::new(),
        };

        let day_numbers: HashMap<Uuid, i32> = slots.iter().map(|s| (s.id, s.day_number)).collect();
        let mut assigned = 0u64;
        for (slot_id, leader_id) in plan {
            // Skips slots filled since planning (claims, other runs).
            if self.store.assign_open_slot(slot_id, leader_id).await? {
                assigned += 1;
                self.notifier.publish(DomainEvent::LeaderAssigned {
                    event_id,
                    slot_id,
                    leader_id,
                    day_number: day_numbers.get(&slot_id).copied().unwrap_or_default(),
                });
            }
        }

        info!(
            "Leaders assigned: event={} strategy={} filled={}",
            event_id, event.leader_strategy, assigned
        );
        Ok(assigned)
    }

    /// Replace a slot's leader.
    ///
    /// Permitted to the organizer, the overall leader, or an admin.
    /// Re-applying the current leader is a no-op. Every effective
    /// replacement lands in the audit log.
    pub async fn reassign(
        &self,
        actor: &UserRef,
        request: ReassignLeaderRequest,
    ) -> ClubResult<ScheduleSlotRecord> {
        let slot = self
            .store
            .get_slot(request.slot_id)
            .await?
            .ok_or(ClubError::NotFound("Slot"))?;
        let event = self
            .store
            .get_event(slot.event_id)
            .await?
            .ok_or(ClubError::NotFound("Event"))?;

        let permitted = actor.is_admin
            || event.organizer_id == actor.id
            || event.overall_leader_id == Some(actor.id);
        if !permitted {
            return Err(ClubError::PermissionDenied(
                "only the organizer, the overall leader or an admin may reassign".to_string(),
            ));
        }
        if event.activity_status == ActivityStatus::Completed {
            return Err(ClubError::conflict("event already completed"));
        }

        let prior = self
            .store
            .reassign_slot_leader(request.slot_id, request.new_leader_id, actor.id, self.clock.now())
            .await?;

        if prior != Some(request.new_leader_id) {
            info!(
                "Slot leader replaced: event={} slot={} prior={:?} new={}",
                event.id, request.slot_id, prior, request.new_leader_id
            );
            self.notifier.publish(DomainEvent::LeaderReassigned {
                event_id: event.id,
                slot_id: request.slot_id,
                prior_leader_id: prior,
                new_leader_id: request.new_leader_id,
            });
        }

        self.store
            .get_slot(request.slot_id)
            .await?
            .ok_or(ClubError::NotFound("Slot"))
    }

    /// Set or clear the event's overall leader.
    ///
    /// The overall leader holds the standing backup permission over
    /// every slot. Organizer or admin only; the designee must be an
    /// enrolled participant.
    pub async fn designate_overall_leader(
        &self,
        event_id: Uuid,
        actor: &UserRef,
        leader_id: Option<Uuid>,
    ) -> ClubResult<()> {
        let event = self
            .store
            .get_event(event_id)
            .await?
            .ok_or(ClubError::NotFound("Event"))?;
        if !actor.is_admin && event.organizer_id != actor.id {
            return Err(ClubError::PermissionDenied(
                "only the organizer or an admin may designate the overall leader".to_string(),
            ));
        }

        if let Some(designee) = leader_id {
            let enrollment = self.store.get_enrollment(event_id, designee).await?;
            let eligible = enrollment.is_some_and(|e| {
                e.kind == EnrollmentKind::Participant && e.status == EnrollmentStatus::Enrolled
            });
            if !eligible {
                return Err(ClubError::PermissionDenied(
                    "overall leader must be an enrolled participant".to_string(),
                ));
            }
        }

        if !self.store.set_overall_leader(event_id, leader_id).await? {
            return Err(ClubError::NotFound("Event"));
        }
        info!(
            "Overall leader designated: event={} leader={:?}",
            event_id, leader_id
        );
        Ok(())
    }

    /// Slots around today that need someone to step in.
    ///
    /// Scans `window` (default `[today-1, today+1]`) and reports, per
    /// slot, the first matching condition: no leader assigned, the
    /// day arrived without published content, or check-ins waiting
    /// with no flower given.
    pub async fn find_slots_needing_backup(
        &self,
        event_id: Uuid,
        window: Option<(NaiveDate, NaiveDate)>,
    ) -> ClubResult<Vec<BackupCandidate>> {
        // Confirms the event exists before scanning.
        self.store
            .get_event(event_id)
            .await?
            .ok_or(ClubError::NotFound("Event"))?;

        let today = self.clock.today();
        let (from, to) =
            window.unwrap_or((today - Duration::days(1), today + Duration::days(1)));

        let slots = self.store.list_slots(event_id).await?;
        let rewarded_slots: HashSet<Uuid> = self
            .store
            .list_flowers_for_event(event_id)
            .await?
            .into_iter()
            .map(|f| f.slot_id)
            .collect();

        let mut candidates = Vec::new();
        for slot in slots
            .into_iter()
            .filter(|s| from <= s.slot_date && s.slot_date <= to)
        {
            if slot.leader_id.is_none() {
                candidates.push(BackupCandidate {
                    slot,
                    reason: BackupReason::Unassigned,
                });
                continue;
            }
            if today < slot.slot_date {
                // Day not arrived; the leader still has time.
                continue;
            }
            if slot.content_published_at.is_none() {
                candidates.push(BackupCandidate {
                    slot,
                    reason: BackupReason::ContentMissing,
                });
                continue;
            }
            if !rewarded_slots.contains(&slot.id) {
                let check_ins = self.store.list_check_ins_for_slot(slot.id).await?;
                if !check_ins.is_empty() {
                    candidates.push(BackupCandidate {
                        slot,
                        reason: BackupReason::FlowersMissing,
                    });
                }
            }
        }
        Ok(candidates)
    }

    /// Leader replacement history for an event.
    pub async fn audit_trail(&self, event_id: Uuid) -> ClubResult<Vec<LeaderAuditRecord>> {
        self.store.list_leader_audits(event_id).await
    }
}
