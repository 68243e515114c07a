//! Flower gives: the permission window, the daily quota, and the
//! one-flower-per-check-in rule.

mod common;

use common::*;

use bookclub_backend::db::models::{CheckInRecord, EventRecord, LeaderStrategy, ScheduleSlotRecord};
use bookclub_backend::models::{CheckInRequest, GiveFlowerRequest, UserRef};
use bookclub_backend::{ClubError, ClubStore, DomainEvent};
use uuid::Uuid;

/// A started one-day season on 2025-01-10 with `leader` holding the
/// only slot and every reader enrolled.
async fn one_day_season(
    h: &Harness,
    organizer: &UserRef,
    leader: &UserRef,
    readers: &[&UserRef],
) -> (EventRecord, ScheduleSlotRecord) {
    let mut request = season_request(d(2025, 1, 10), d(2025, 1, 10));
    request.leader_strategy = LeaderStrategy::Voluntary;
    let event = h.approved_event(organizer, request).await;

    h.services
        .enrollment
        .join(event.id, leader, join_as_participant())
        .await
        .unwrap();
    for user in readers {
        h.services
            .enrollment
            .join(event.id, user, join_as_participant())
            .await
            .unwrap();
    }

    h.clock.set_date(d(2025, 1, 10));
    h.services.lifecycle.start(organizer, event.id).await.unwrap();
    let detail = h.services.lifecycle.event_detail(event.id).await.unwrap();
    let slot = detail.slots[0].clone();
    h.services.leaders.claim(leader, slot.id).await.unwrap();
    (event, slot)
}

async fn check_in_as(h: &Harness, user: &UserRef, slot_id: Uuid) -> CheckInRecord {
    h.services
        .participation
        .check_in(
            user,
            CheckInRequest {
                slot_id,
                note: None,
            },
        )
        .await
        .unwrap()
}

fn one_flower(check_in_id: Uuid) -> GiveFlowerRequest {
    GiveFlowerRequest {
        check_in_id,
        amount: 1,
        comment: None,
        anonymous: false,
    }
}

#[tokio::test]
async fn test_give_window_opens_on_day_and_closes_after_grace() {
    let h = Harness::at_date(2025, 1, 2);
    let organizer = reader("priya");
    let aiko = reader("aiko");
    let ben = reader("ben");
    let carmen = reader("carmen");
    let (_, slot) = one_day_season(&h, &organizer, &aiko, &[&ben, &carmen]).await;

    let ben_check_in = check_in_as(&h, &ben, slot.id).await;
    let carmen_check_in = check_in_as(&h, &carmen, slot.id).await;

    // The day before: the window has not opened.
    h.clock.set_date(d(2025, 1, 9));
    let err = h
        .services
        .flowers
        .give(&aiko, one_flower(ben_check_in.id))
        .await
        .unwrap_err();
    match err {
        ClubError::PermissionDenied(reason) => assert!(
            reason.contains("2025-01-10 and 2025-01-11"),
            "got: {reason}"
        ),
        other => panic!("expected PermissionDenied, got {other}"),
    }

    // One day past the grace day: closed again.
    h.clock.set_date(d(2025, 1, 12));
    let err = h
        .services
        .flowers
        .give(&aiko, one_flower(ben_check_in.id))
        .await
        .unwrap_err();
    assert!(matches!(err, ClubError::PermissionDenied(_)));

    // On the day and on the grace day the give lands.
    h.clock.set_date(d(2025, 1, 10));
    let response = h
        .services
        .flowers
        .give(&aiko, one_flower(ben_check_in.id))
        .await
        .unwrap();
    assert_eq!(response.recipient_id, ben.id);
    assert_eq!(response.amount, 1);

    h.clock.set_date(d(2025, 1, 11));
    h.services
        .flowers
        .give(&aiko, one_flower(carmen_check_in.id))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_overall_leader_gives_outside_window() {
    let h = Harness::at_date(2025, 1, 2);
    let organizer = reader("priya");
    let aiko = reader("aiko");
    let ben = reader("ben");
    let carmen = reader("carmen");
    let zoe = reader("zoe");
    let (event, slot) = one_day_season(&h, &organizer, &aiko, &[&ben, &carmen, &zoe]).await;

    h.services
        .leaders
        .designate_overall_leader(event.id, &organizer, Some(zoe.id))
        .await
        .unwrap();

    let ben_check_in = check_in_as(&h, &ben, slot.id).await;
    let carmen_check_in = check_in_as(&h, &carmen, slot.id).await;

    // Before the window and long after it, the overall leader still gives.
    h.clock.set_date(d(2025, 1, 9));
    h.services
        .flowers
        .give(&zoe, one_flower(ben_check_in.id))
        .await
        .unwrap();

    h.clock.set_date(d(2025, 1, 14));
    h.services
        .flowers
        .give(&zoe, one_flower(carmen_check_in.id))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_quota_exhaustion_leaves_no_partial_state() {
    let h = Harness::at_date(2025, 1, 2);
    let organizer = reader("priya");
    let aiko = reader("aiko");
    let ben = reader("ben");
    let carmen = reader("carmen");
    let dana = reader("dana");
    let elena = reader("elena");
    let (event, slot) =
        one_day_season(&h, &organizer, &aiko, &[&ben, &carmen, &dana, &elena]).await;

    let mut check_ins = Vec::new();
    for user in [&ben, &carmen, &dana, &elena] {
        check_ins.push(check_in_as(&h, user, slot.id).await);
    }

    // Default quota is three per day.
    for check_in in &check_ins[..3] {
        h.services
            .flowers
            .give(&aiko, one_flower(check_in.id))
            .await
            .unwrap();
    }

    let err = h
        .services
        .flowers
        .give(&aiko, one_flower(check_ins[3].id))
        .await
        .unwrap_err();
    match err {
        ClubError::QuotaExceeded { used, max } => {
            assert_eq!(used, 3);
            assert_eq!(max, 3);
        }
        other => panic!("expected QuotaExceeded, got {other}"),
    }

    // The failed give left nothing behind: no fourth flower, no quota
    // movement, no credit to the would-be recipient.
    let quota = h
        .services
        .flowers
        .remaining_quota(aiko.id, event.id)
        .await
        .unwrap();
    assert_eq!(quota.used, 3);
    assert_eq!(quota.remaining, 0);

    let flowers = h.store.list_flowers_on(event.id, d(2025, 1, 10)).await.unwrap();
    assert_eq!(flowers.len(), 3);

    let roster = h.services.enrollment.roster(event.id, None, None).await.unwrap();
    let elena_row = roster.iter().find(|e| e.user_id == elena.id).unwrap();
    assert_eq!(elena_row.flowers_received, 0);
}

#[tokio::test]
async fn test_duplicate_flower_reported_before_quota() {
    let h = Harness::at_date(2025, 1, 2);
    let organizer = reader("priya");
    let aiko = reader("aiko");
    let ben = reader("ben");
    let carmen = reader("carmen");
    let dana = reader("dana");
    let (_, slot) = one_day_season(&h, &organizer, &aiko, &[&ben, &carmen, &dana]).await;

    let mut check_ins = Vec::new();
    for user in [&ben, &carmen, &dana] {
        check_ins.push(check_in_as(&h, user, slot.id).await);
    }
    for check_in in &check_ins {
        h.services
            .flowers
            .give(&aiko, one_flower(check_in.id))
            .await
            .unwrap();
    }

    // Quota is spent AND the check-in was already rewarded; the
    // duplicate wins so the giver learns the real problem.
    let err = h
        .services
        .flowers
        .give(&aiko, one_flower(check_ins[0].id))
        .await
        .unwrap_err();
    assert!(matches!(err, ClubError::DuplicateFlower));
}

#[tokio::test]
async fn test_give_validation_rejects_self_and_zero_amount() {
    let h = Harness::at_date(2025, 1, 2);
    let organizer = reader("priya");
    let aiko = reader("aiko");
    let ben = reader("ben");
    let (_, slot) = one_day_season(&h, &organizer, &aiko, &[&ben]).await;

    let own_check_in = check_in_as(&h, &aiko, slot.id).await;
    let err = h
        .services
        .flowers
        .give(&aiko, one_flower(own_check_in.id))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ClubError::Validation {
            field: "checkInId",
            ..
        }
    ));

    let ben_check_in = check_in_as(&h, &ben, slot.id).await;
    let mut request = one_flower(ben_check_in.id);
    request.amount = 0;
    let err = h.services.flowers.give(&aiko, request).await.unwrap_err();
    assert!(matches!(err, ClubError::Validation { field: "amount", .. }));
}

#[tokio::test]
async fn test_multi_flower_amount_consumes_quota() {
    let h = Harness::at_date(2025, 1, 2);
    let organizer = reader("priya");
    let aiko = reader("aiko");
    let ben = reader("ben");
    let carmen = reader("carmen");
    let (event, slot) = one_day_season(&h, &organizer, &aiko, &[&ben, &carmen]).await;

    let ben_check_in = check_in_as(&h, &ben, slot.id).await;
    let carmen_check_in = check_in_as(&h, &carmen, slot.id).await;

    let mut request = one_flower(ben_check_in.id);
    request.amount = 2;
    let response = h.services.flowers.give(&aiko, request).await.unwrap();
    assert_eq!(response.quota.used, 2);
    assert_eq!(response.quota.remaining, 1);

    let roster = h.services.enrollment.roster(event.id, None, None).await.unwrap();
    let ben_row = roster.iter().find(|e| e.user_id == ben.id).unwrap();
    assert_eq!(ben_row.flowers_received, 2);

    // Two more would overdraw the single remaining flower.
    let mut request = one_flower(carmen_check_in.id);
    request.amount = 2;
    let err = h.services.flowers.give(&aiko, request).await.unwrap_err();
    match err {
        ClubError::QuotaExceeded { used, max } => {
            assert_eq!(used, 2);
            assert_eq!(max, 3);
        }
        other => panic!("expected QuotaExceeded, got {other}"),
    }

    h.services
        .flowers
        .give(&aiko, one_flower(carmen_check_in.id))
        .await
        .unwrap();
    let quota = h
        .services
        .flowers
        .remaining_quota(aiko.id, event.id)
        .await
        .unwrap();
    assert_eq!(quota.remaining, 0);
}

#[tokio::test]
async fn test_oversized_amount_rejected_without_quota_movement() {
    let h = Harness::at_date(2025, 1, 2);
    let organizer = reader("priya");
    let aiko = reader("aiko");
    let ben = reader("ben");
    let carmen = reader("carmen");
    let (event, slot) = one_day_season(&h, &organizer, &aiko, &[&ben, &carmen]).await;

    let ben_check_in = check_in_as(&h, &ben, slot.id).await;
    let carmen_check_in = check_in_as(&h, &carmen, slot.id).await;

    h.services
        .flowers
        .give(&aiko, one_flower(ben_check_in.id))
        .await
        .unwrap();

    // An absurd amount overdraws like a modest one, even where
    // `used + amount` no longer fits in i32.
    let mut request = one_flower(carmen_check_in.id);
    request.amount = i32::MAX;
    let err = h.services.flowers.give(&aiko, request).await.unwrap_err();
    match err {
        ClubError::QuotaExceeded { used, max } => {
            assert_eq!(used, 1);
            assert_eq!(max, 3);
        }
        other => panic!("expected QuotaExceeded, got {other}"),
    }

    let quota = h
        .services
        .flowers
        .remaining_quota(aiko.id, event.id)
        .await
        .unwrap();
    assert_eq!(quota.used, 1);
    assert_eq!(quota.remaining, 2);

    let flowers = h.store.list_flowers_on(event.id, d(2025, 1, 10)).await.unwrap();
    assert_eq!(flowers.len(), 1);

    let roster = h.services.enrollment.roster(event.id, None, None).await.unwrap();
    let carmen_row = roster.iter().find(|e| e.user_id == carmen.id).unwrap();
    assert_eq!(carmen_row.flowers_received, 0);
}

#[tokio::test]
async fn test_anonymous_give_hides_giver_in_notification() {
    let h = Harness::at_date(2025, 1, 2);
    let organizer = reader("priya");
    let aiko = reader("aiko");
    let ben = reader("ben");
    let (event, slot) = one_day_season(&h, &organizer, &aiko, &[&ben]).await;

    let ben_check_in = check_in_as(&h, &ben, slot.id).await;
    let mut request = one_flower(ben_check_in.id);
    request.anonymous = true;
    h.services.flowers.give(&aiko, request).await.unwrap();

    assert!(h.notifier.recorded().contains(&DomainEvent::FlowerReceived {
        event_id: event.id,
        recipient_id: ben.id,
        giver_id: None,
        amount: 1,
    }));
}
