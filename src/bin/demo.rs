//! # In-Memory Season Demo
//!
//! Scripted end-to-end run of one reading season against `MemStore`,
//! with a manually advanced clock standing in for the calendar:
//!
//! 1. Create, submit and approve a five-day event
//! 2. Fill it to capacity (one join bounces, one cancel frees a seat)
//! 3. Start it: schedule generation plus rotation leader assignment
//! 4. Walk every reading day: publish, check in, give flowers, stats
//! 5. Complete it: settlement, refunds and certificates
//!
//! Run with `cargo run --bin demo`. No external services needed.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use bookclub_backend::db::models::{
    ActivityMode, EnrollmentKind, FeeKind, LeaderStrategy,
};
use bookclub_backend::models::{
    CheckInRequest, CreateEventRequest, GiveFlowerRequest, JoinEventRequest,
    PublishContentRequest, ReassignLeaderRequest,
};
use bookclub_backend::{
    AppConfig, ClubError, ClubResult, FixedClock, LoggingNotifier, MemStore, Services, UserRef,
};

#[tokio::main]
async fn main() -> ClubResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // =========================================
    // STEP 1: Wiring and Cast
    // =========================================
    let clock = Arc::new(FixedClock::at_date(2025, 1, 2));
    let services = Services::new(
        Arc::new(MemStore::new()),
        clock.clone(),
        Arc::new(LoggingNotifier),
        AppConfig::default(),
    );

    let organizer = UserRef::new(Uuid::new_v4(), "priya");
    let admin = UserRef {
        id: Uuid::new_v4(),
        display_name: "maya".to_string(),
        is_admin: true,
    };
    let aiko = UserRef::new(Uuid::new_v4(), "aiko");
    let ben = UserRef::new(Uuid::new_v4(), "ben");
    let carmen = UserRef::new(Uuid::new_v4(), "carmen");
    let dana = UserRef::new(Uuid::new_v4(), "dana");
    let elena = UserRef::new(Uuid::new_v4(), "elena");
    let odell = UserRef::new(Uuid::new_v4(), "odell");

    // =========================================
    // STEP 2: Create, Submit, Approve
    // =========================================
    let start = NaiveDate::from_ymd_opt(2025, 1, 6).expect("valid date");
    let end = NaiveDate::from_ymd_opt(2025, 1, 10).expect("valid date");
    let event = services
        .lifecycle
        .create_event(
            &organizer,
            CreateEventRequest {
                title: "January Mornings".to_string(),
                book_title: "The Overstory".to_string(),
                book_author: Some("Richard Powers".to_string()),
                start_date: start,
                end_date: end,
                enroll_deadline: start - Duration::days(1),
                min_participants: 2,
                max_participants: 4,
                fee_kind: FeeKind::Deposit,
                fee_amount: 5000,
                leader_reward_percent: 10,
                completion_standard: 80,
                activity_mode: ActivityMode::NoteCheckIn,
                leader_strategy: LeaderStrategy::Rotation,
                weekend_rest: true,
            },
        )
        .await?;
    info!("📖 Event created: {} ({})", event.title, event.id);

    services.lifecycle.submit_for_approval(&organizer, event.id).await?;
    services.lifecycle.approve(&admin, event.id).await?;
    info!("✅ Approved by {}", admin.display_name);

    // =========================================
    // STEP 3: Enrollment (capacity 4)
    // =========================================
    let participant = JoinEventRequest {
        kind: EnrollmentKind::Participant,
    };
    for reader in [&aiko, &ben, &carmen, &dana] {
        services.enrollment.join(event.id, reader, participant.clone()).await?;
        info!("🙋 {} joined", reader.display_name);
    }

    // Fifth participant bounces off the cap.
    match services.enrollment.join(event.id, &elena, participant.clone()).await {
        Err(ClubError::CapacityExceeded { capacity }) => {
            warn!("🚪 {} bounced: event full at {}", elena.display_name, capacity)
        }
        other => panic!("expected CapacityExceeded, got {other:?}"),
    }

    // A cancellation frees the seat.
    let cancelled = services.enrollment.cancel(event.id, &dana).await?;
    info!(
        "↩️  {} cancelled (refund {}¢ {})",
        dana.display_name, cancelled.refund_amount, cancelled.refund_status
    );
    services.enrollment.join(event.id, &elena, participant).await?;
    info!("🙋 {} joined the freed seat", elena.display_name);

    services
        .enrollment
        .join(
            event.id,
            &odell,
            JoinEventRequest {
                kind: EnrollmentKind::Observer,
            },
        )
        .await?;
    info!("👀 {} joined as observer", odell.display_name);

    // =========================================
    // STEP 4: Start (slots + rotation leaders)
    // =========================================
    clock.set_date(start);
    services.lifecycle.start(&organizer, event.id).await?;

    services
        .leaders
        .designate_overall_leader(event.id, &organizer, Some(aiko.id))
        .await?;
    info!("⭐ {} designated overall leader", aiko.display_name);

    let readers = [&aiko, &ben, &carmen, &elena];
    let names: HashMap<Uuid, &UserRef> =
        readers.iter().map(|reader| (reader.id, *reader)).collect();

    let detail = services.lifecycle.event_detail(event.id).await?;
    for slot in &detail.slots {
        let leader = slot.leader_id.and_then(|id| names.get(&id));
        info!(
            "🗓️  Day {} ({}) leader: {}",
            slot.day_number,
            slot.slot_date,
            leader.map_or("-", |user| user.display_name.as_str())
        );
    }

    // The organizer swaps day 2 before the season begins; the change
    // lands in the audit trail.
    let day_two = detail
        .slots
        .iter()
        .find(|slot| slot.day_number == 2)
        .expect("five-day schedule has a day 2");
    services
        .leaders
        .reassign(
            &organizer,
            ReassignLeaderRequest {
                slot_id: day_two.id,
                new_leader_id: elena.id,
            },
        )
        .await?;
    info!("🔁 Day 2 reassigned to {}", elena.display_name);

    // =========================================
    // STEP 5: The Reading Days
    // =========================================
    let detail = services.lifecycle.event_detail(event.id).await?;
    for slot in &detail.slots {
        clock.set_date(slot.slot_date);
        let leader_id = slot.leader_id.expect("rotation fills every slot");
        let leader = names[&leader_id];

        services
            .participation
            .publish_content(
                leader,
                PublishContentRequest {
                    slot_id: slot.id,
                    title: format!("Day {} discussion", slot.day_number),
                    body: format!("Chapters for {}", slot.slot_date),
                },
            )
            .await?;

        for reader in readers {
            services
                .participation
                .check_in(
                    reader,
                    CheckInRequest {
                        slot_id: slot.id,
                        note: Some(format!("{} finished day {}", reader.display_name, slot.day_number)),
                    },
                )
                .await?;
        }

        // The day's leader rewards the first note that is not their own.
        let notes = services.participation.slot_check_ins(slot.id).await?;
        if let Some(target) = notes.iter().find(|c| c.user_id != leader_id) {
            let given = services
                .flowers
                .give(
                    leader,
                    GiveFlowerRequest {
                        check_in_id: target.id,
                        amount: 1,
                        comment: Some("Lovely note".to_string()),
                        anonymous: false,
                    },
                )
                .await?;
            info!(
                "💐 {} → {} (quota {}/{})",
                leader.display_name,
                names[&given.recipient_id].display_name,
                given.quota.used,
                given.quota.max
            );
        }

        let stat = services
            .flowers
            .generate_daily_stat(event.id, slot.slot_date)
            .await?;
        info!(
            "📊 Day {}: {} check-ins, {} flowers",
            slot.day_number, stat.total_check_ins, stat.total_flowers
        );
    }

    let backups = services.leaders.find_slots_needing_backup(event.id, None).await?;
    info!("🛟 Slots needing backup: {}", backups.len());

    // =========================================
    // STEP 6: Complete, Settle, Honor
    // =========================================
    for reader in readers {
        let progress = services.enrollment.member_progress(event.id, reader.id).await?;
        info!(
            "📈 {}: {:.2}% of {} days (meets standard: {})",
            reader.display_name, progress.completion_rate, progress.eligible_days, progress.meets_standard
        );
    }

    clock.set_date(end + Duration::days(1));
    services.lifecycle.complete(&organizer, event.id).await?;

    for enrollment in services.enrollment.roster(event.id, None, None).await? {
        info!(
            "🧾 {} [{}] status={} refund={}¢ ({})",
            enrollment.display_name,
            enrollment.kind,
            enrollment.status,
            enrollment.refund_amount,
            enrollment.refund_status
        );
    }

    for certificate in services.flowers.certificates(event.id).await? {
        let holder = names
            .get(&certificate.user_id)
            .map_or("-", |user| user.display_name.as_str());
        info!("🏅 {} {} for {}", certificate.serial, certificate.kind, holder);
    }

    for audit in services.leaders.audit_trail(event.id).await? {
        info!(
            "📝 Leader change on slot {}: {:?} → {} by {}",
            audit.slot_id, audit.prior_leader_id, audit.new_leader_id, audit.actor_id
        );
    }

    info!("🎉 Season finished");
    Ok(())
}
