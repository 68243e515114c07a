//! Daily participation: the same-day check-in rule, its uniqueness
//! guarantee, and the leader's content-publish window.

mod common;

use common::*;

use bookclub_backend::db::models::{EventRecord, LeaderStrategy, ScheduleSlotRecord};
use bookclub_backend::models::{CheckInRequest, PublishContentRequest, UserRef};
use bookclub_backend::ClubError;
use uuid::Uuid;

/// A started five-day season over 2025-01-06..2025-01-10 with every
/// reader enrolled as a participant and the clock on day one.
async fn started_season(
    h: &Harness,
    organizer: &UserRef,
    strategy: LeaderStrategy,
    readers: &[&UserRef],
) -> (EventRecord, Vec<ScheduleSlotRecord>) {
    let mut request = season_request(d(2025, 1, 6), d(2025, 1, 10));
    request.leader_strategy = strategy;
    let event = h.approved_event(organizer, request).await;

    for user in readers {
        h.services
            .enrollment
            .join(event.id, user, join_as_participant())
            .await
            .unwrap();
    }

    h.clock.set_date(d(2025, 1, 6));
    h.services.lifecycle.start(organizer, event.id).await.unwrap();
    let detail = h.services.lifecycle.event_detail(event.id).await.unwrap();
    (event, detail.slots)
}

fn note_for(slot_id: Uuid, note: &str) -> CheckInRequest {
    CheckInRequest {
        slot_id,
        note: Some(note.to_string()),
    }
}

#[tokio::test]
async fn test_check_in_accepted_only_on_the_slots_day() {
    let h = Harness::at_date(2025, 1, 2);
    let organizer = reader("priya");
    let aiko = reader("aiko");
    let (_, slots) = started_season(&h, &organizer, LeaderStrategy::Disabled, &[&aiko]).await;

    // Jan 6: day two is still tomorrow.
    let err = h
        .services
        .participation
        .check_in(&aiko, note_for(slots[1].id, "read ahead"))
        .await
        .unwrap_err();
    match err {
        ClubError::PermissionDenied(reason) => assert!(
            reason.contains("only accepted on 2025-01-07"),
            "got: {reason}"
        ),
        other => panic!("expected PermissionDenied, got {other}"),
    }

    // Jan 8: day two has passed, and there is no back-filling.
    h.clock.set_date(d(2025, 1, 8));
    let err = h
        .services
        .participation
        .check_in(&aiko, note_for(slots[1].id, "catching up"))
        .await
        .unwrap_err();
    assert!(matches!(err, ClubError::PermissionDenied(_)));

    // On its own day the same slot takes the check-in.
    h.clock.set_date(d(2025, 1, 7));
    let check_in = h
        .services
        .participation
        .check_in(&aiko, note_for(slots[1].id, "chapter two"))
        .await
        .unwrap();
    assert_eq!(check_in.checked_on, d(2025, 1, 7));
}

#[tokio::test]
async fn test_second_check_in_for_a_slot_is_rejected() {
    let h = Harness::at_date(2025, 1, 2);
    let organizer = reader("priya");
    let aiko = reader("aiko");
    let ben = reader("ben");
    let (event, slots) =
        started_season(&h, &organizer, LeaderStrategy::Disabled, &[&aiko, &ben]).await;

    h.services
        .participation
        .check_in(&aiko, note_for(slots[0].id, "chapter one"))
        .await
        .unwrap();

    let err = h
        .services
        .participation
        .check_in(&aiko, note_for(slots[0].id, "chapter one, again"))
        .await
        .unwrap_err();
    assert!(matches!(err, ClubError::DuplicateCheckIn));

    // The duplicate neither doubled the counter nor stored a row.
    let roster = h.services.enrollment.roster(event.id, None, None).await.unwrap();
    let aiko_row = roster.iter().find(|e| e.user_id == aiko.id).unwrap();
    assert_eq!(aiko_row.check_ins, 1);
    let notes = h
        .services
        .participation
        .slot_check_ins(slots[0].id)
        .await
        .unwrap();
    assert_eq!(notes.len(), 1);

    // A different member still checks in freely.
    h.services
        .participation
        .check_in(&ben, note_for(slots[0].id, "chapter one"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_publish_window_is_the_eve_and_the_day_itself() {
    let h = Harness::at_date(2025, 1, 2);
    let organizer = reader("priya");
    let aiko = reader("aiko");
    let ben = reader("ben");
    let zoe = reader("zoe");
    let (event, slots) =
        started_season(&h, &organizer, LeaderStrategy::Voluntary, &[&aiko, &ben, &zoe]).await;

    // aiko leads day three (Jan 8).
    let slot = slots[2].clone();
    h.services.leaders.claim(&aiko, slot.id).await.unwrap();

    let post = |title: &str| PublishContentRequest {
        slot_id: slot.id,
        title: title.to_string(),
        body: "Chapters five and six".to_string(),
    };

    // Two days ahead is too early, even for the slot's own leader.
    let err = h
        .services
        .participation
        .publish_content(&aiko, post("Early draft"))
        .await
        .unwrap_err();
    match err {
        ClubError::PermissionDenied(reason) => assert!(
            reason.contains("2025-01-07 and 2025-01-08"),
            "got: {reason}"
        ),
        other => panic!("expected PermissionDenied, got {other}"),
    }

    // The eve of the slot's day is inside the window.
    h.clock.set_date(d(2025, 1, 7));
    let published = h
        .services
        .participation
        .publish_content(&aiko, post("Day three reading"))
        .await
        .unwrap();
    assert_eq!(published.content_title.as_deref(), Some("Day three reading"));

    // Enrolled but not the slot's leader: the window never applies.
    h.clock.set_date(d(2025, 1, 8));
    let err = h
        .services
        .participation
        .publish_content(&ben, post("Not my slot"))
        .await
        .unwrap_err();
    assert!(matches!(err, ClubError::PermissionDenied(_)));

    // The day after the slot, the window has closed for its leader.
    h.clock.set_date(d(2025, 1, 9));
    let err = h
        .services
        .participation
        .publish_content(&aiko, post("Late edit"))
        .await
        .unwrap_err();
    assert!(matches!(err, ClubError::PermissionDenied(_)));

    // The overall leader is not bound by the window.
    h.services
        .leaders
        .designate_overall_leader(event.id, &organizer, Some(zoe.id))
        .await
        .unwrap();
    let published = h
        .services
        .participation
        .publish_content(&zoe, post("Backup notes"))
        .await
        .unwrap();
    assert_eq!(published.content_title.as_deref(), Some("Backup notes"));
}
