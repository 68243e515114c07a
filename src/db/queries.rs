//! # Database Queries
//!
//! This module contains the single-statement SQL queries for the club
//! tables. Each function performs one database operation.
//!
//! ## Query Organization
//!
//! Queries are grouped by the table they operate on:
//! - `event_*` / `get_event` - Event table operations
//! - `*_slot*` - Schedule slot operations
//! - `*_enrollment*` - Enrollment operations
//! - `*_check_in*` / `*_flower*` - Participation operations
//! - `*_stat*` / `*_certificate*` - Derived artifact operations
//!
//! Multi-statement invariant-carrying transactions (admission, quota
//! consumption, slot claims) live in the Postgres store, not here.
//!
//! ## Error Handling
//!
//! All queries return `Result<T, DatabaseError>`. Common errors:
//! - `NotFound` - Record doesn't exist
//! - `QueryError` - SQL execution failed
//! - `InvalidRow` - A stored status string no longer decodes

use chrono::{DateTime, NaiveDate, Utc};
use deadpool_postgres::Pool;
use tokio_postgres::Row;
use tracing::{debug, info};
use uuid::Uuid;

use super::models::*;
use super::DatabaseError;

// ============================================
// ROW MAPPERS
// ============================================

fn decode<T>(
    raw: String,
    what: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<T, DatabaseError> {
    parse(&raw).ok_or_else(|| DatabaseError::InvalidRow(format!("unknown {}: {}", what, raw)))
}

/// Convert a database row to an EventRecord.
pub fn row_to_event(row: &Row) -> Result<EventRecord, DatabaseError> {
    Ok(EventRecord {
        id: row.get("id"),
        title: row.get("title"),
        book_title: row.get("book_title"),
        book_author: row.get("book_author"),
        organizer_id: row.get("organizer_id"),
        overall_leader_id: row.get("overall_leader_id"),
        start_date: row.get("start_date"),
        end_date: row.get("end_date"),
        enroll_deadline: row.get("enroll_deadline"),
        min_participants: row.get("min_participants"),
        max_participants: row.get("max_participants"),
        fee_kind: decode(row.get("fee_kind"), "fee kind", FeeKind::parse)?,
        fee_amount: row.get("fee_amount"),
        leader_reward_percent: row.get("leader_reward_percent"),
        completion_standard: row.get("completion_standard"),
        activity_mode: decode(row.get("activity_mode"), "activity mode", ActivityMode::parse)?,
        leader_strategy: decode(
            row.get("leader_strategy"),
            "leader strategy",
            LeaderStrategy::parse,
        )?,
        weekend_rest: row.get("weekend_rest"),
        approval_status: decode(
            row.get("approval_status"),
            "approval status",
            ApprovalStatus::parse,
        )?,
        activity_status: decode(
            row.get("activity_status"),
            "activity status",
            ActivityStatus::parse,
        )?,
        reject_reason: row.get("reject_reason"),
        submitted_at: row.get("submitted_at"),
        approved_at: row.get("approved_at"),
        started_at: row.get("started_at"),
        completed_at: row.get("completed_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

/// Convert a database row to a ScheduleSlotRecord.
pub fn row_to_slot(row: &Row) -> Result<ScheduleSlotRecord, DatabaseError> {
    Ok(ScheduleSlotRecord {
        id: row.get("id"),
        event_id: row.get("event_id"),
        day_number: row.get("day_number"),
        slot_date: row.get("slot_date"),
        leader_id: row.get("leader_id"),
        content_title: row.get("content_title"),
        content_body: row.get("content_body"),
        content_published_at: row.get("content_published_at"),
        created_at: row.get("created_at"),
    })
}

/// Convert a database row to an EnrollmentRecord.
pub fn row_to_enrollment(row: &Row) -> Result<EnrollmentRecord, DatabaseError> {
    Ok(EnrollmentRecord {
        id: row.get("id"),
        event_id: row.get("event_id"),
        user_id: row.get("user_id"),
        display_name: row.get("display_name"),
        kind: decode(row.get("kind"), "enrollment kind", EnrollmentKind::parse)?,
        status: decode(
            row.get("status"),
            "enrollment status",
            EnrollmentStatus::parse,
        )?,
        check_ins: row.get("check_ins"),
        leader_days: row.get("leader_days"),
        flowers_received: row.get("flowers_received"),
        completion_rate: row.get("completion_rate"),
        paid_amount: row.get("paid_amount"),
        refund_amount: row.get("refund_amount"),
        refund_status: decode(row.get("refund_status"), "refund status", RefundStatus::parse)?,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

/// Convert a database row to a CheckInRecord.
pub fn row_to_check_in(row: &Row) -> Result<CheckInRecord, DatabaseError> {
    Ok(CheckInRecord {
        id: row.get("id"),
        event_id: row.get("event_id"),
        slot_id: row.get("slot_id"),
        user_id: row.get("user_id"),
        note: row.get("note"),
        checked_on: row.get("checked_on"),
        created_at: row.get("created_at"),
    })
}

/// Convert a database row to a FlowerRecord.
pub fn row_to_flower(row: &Row) -> Result<FlowerRecord, DatabaseError> {
    Ok(FlowerRecord {
        id: row.get("id"),
        event_id: row.get("event_id"),
        slot_id: row.get("slot_id"),
        check_in_id: row.get("check_in_id"),
        giver_id: row.get("giver_id"),
        recipient_id: row.get("recipient_id"),
        amount: row.get("amount"),
        comment: row.get("comment"),
        anonymous: row.get("anonymous"),
        given_on: row.get("given_on"),
        created_at: row.get("created_at"),
    })
}

/// Convert a database row to a FlowerQuotaRecord.
pub fn row_to_quota(row: &Row) -> Result<FlowerQuotaRecord, DatabaseError> {
    Ok(FlowerQuotaRecord {
        user_id: row.get("user_id"),
        event_id: row.get("event_id"),
        quota_date: row.get("quota_date"),
        used: row.get("used_count"),
        max: row.get("max_count"),
    })
}

/// Convert a database row to a DailyStatRecord.
pub fn row_to_stat(row: &Row) -> Result<DailyStatRecord, DatabaseError> {
    Ok(DailyStatRecord {
        id: row.get("id"),
        event_id: row.get("event_id"),
        stat_date: row.get("stat_date"),
        total_flowers: row.get("total_flowers"),
        total_check_ins: row.get("total_check_ins"),
        leaderboard: row.get("leaderboard"),
        generated_at: row.get("generated_at"),
    })
}

/// Convert a database row to a CertificateRecord.
pub fn row_to_certificate(row: &Row) -> Result<CertificateRecord, DatabaseError> {
    Ok(CertificateRecord {
        id: row.get("id"),
        event_id: row.get("event_id"),
        user_id: row.get("user_id"),
        kind: decode(row.get("kind"), "certificate kind", CertificateKind::parse)?,
        serial: row.get("serial"),
        rank: row.get("rank"),
        completion_rate: row.get("completion_rate"),
        issued_at: row.get("issued_at"),
    })
}

/// Convert a database row to a LeaderAuditRecord.
pub fn row_to_audit(row: &Row) -> Result<LeaderAuditRecord, DatabaseError> {
    Ok(LeaderAuditRecord {
        id: row.get("id"),
        event_id: row.get("event_id"),
        slot_id: row.get("slot_id"),
        prior_leader_id: row.get("prior_leader_id"),
        new_leader_id: row.get("new_leader_id"),
        actor_id: row.get("actor_id"),
        changed_at: row.get("changed_at"),
    })
}

async fn get_client(pool: &Pool) -> Result<deadpool_postgres::Object, DatabaseError> {
    pool.get()
        .await
        .map_err(|e| DatabaseError::ConnectionError(e.to_string()))
}

// ============================================
// EVENT QUERIES
// ============================================

pub(crate) const EVENT_COLUMNS: &str = r#"
    id, title, book_title, book_author, organizer_id, overall_leader_id,
    start_date, end_date, enroll_deadline,
    min_participants, max_participants,
    fee_kind, fee_amount, leader_reward_percent, completion_standard,
    activity_mode, leader_strategy, weekend_rest,
    approval_status, activity_status, reject_reason,
    submitted_at, approved_at, started_at, completed_at,
    created_at, updated_at
"#;

/// Insert a freshly created event.
pub async fn insert_event(pool: &Pool, event: &EventRecord) -> Result<(), DatabaseError> {
    debug!("Inserting event: {}", event.id);

    let client = get_client(pool).await?;

    let fee_kind = event.fee_kind.as_str();
    let activity_mode = event.activity_mode.as_str();
    let leader_strategy = event.leader_strategy.as_str();
    let approval_status = event.approval_status.as_str();
    let activity_status = event.activity_status.as_str();

    client
        .execute(
            r#"
            INSERT INTO events (
                id, title, book_title, book_author, organizer_id, overall_leader_id,
                start_date, end_date, enroll_deadline,
                min_participants, max_participants,
                fee_kind, fee_amount, leader_reward_percent, completion_standard,
                activity_mode, leader_strategy, weekend_rest,
                approval_status, activity_status, reject_reason,
                submitted_at, approved_at, started_at, completed_at,
                created_at, updated_at
            )
            VALUES (
                $1, $2, $3, $4, $5, $6,
                $7, $8, $9,
                $10, $11,
                $12, $13, $14, $15,
                $16, $17, $18,
                $19, $20, $21,
                $22, $23, $24, $25,
                $26, $27
            )
            "#,
            &[
                &event.id,
                &event.title,
                &event.book_title,
                &event.book_author,
                &event.organizer_id,
                &event.overall_leader_id,
                &event.start_date,
                &event.end_date,
                &event.enroll_deadline,
                &event.min_participants,
                &event.max_participants,
                &fee_kind,
                &event.fee_amount,
                &event.leader_reward_percent,
                &event.completion_standard,
                &activity_mode,
                &leader_strategy,
                &event.weekend_rest,
                &approval_status,
                &activity_status,
                &event.reject_reason,
                &event.submitted_at,
                &event.approved_at,
                &event.started_at,
                &event.completed_at,
                &event.created_at,
                &event.updated_at,
            ],
        )
        .await?;

    info!("Event created: {} ({})", event.title, event.id);
    Ok(())
}

/// Get an event by ID.
pub async fn get_event(pool: &Pool, event_id: Uuid) -> Result<Option<EventRecord>, DatabaseError> {
    debug!("Fetching event: {}", event_id);

    let client = get_client(pool).await?;

    let rows = client
        .query(
            &format!("SELECT {} FROM events WHERE id = $1", EVENT_COLUMNS),
            &[&event_id],
        )
        .await?;

    if rows.is_empty() {
        Ok(None)
    } else {
        Ok(Some(row_to_event(&rows[0])?))
    }
}

/// List events currently in the given activity status.
pub async fn list_events_by_activity(
    pool: &Pool,
    status: ActivityStatus,
) -> Result<Vec<EventRecord>, DatabaseError> {
    debug!("Fetching events with activity status: {}", status);

    let client = get_client(pool).await?;
    let status_str = status.as_str();

    let rows = client
        .query(
            &format!(
                "SELECT {} FROM events WHERE activity_status = $1 ORDER BY start_date",
                EVENT_COLUMNS
            ),
            &[&status_str],
        )
        .await?;

    let mut events = Vec::new();
    for row in rows {
        events.push(row_to_event(&row)?);
    }

    Ok(events)
}

/// Overwrite an event's amendable fields.
///
/// Succeeds only while the event has not been approved; once a draft
/// is approved (or awaiting review) its parameters are frozen.
pub async fn update_event_details(pool: &Pool, event: &EventRecord) -> Result<u64, DatabaseError> {
    debug!("Updating event details: {}", event.id);

    let client = get_client(pool).await?;

    let fee_kind = event.fee_kind.as_str();
    let activity_mode = event.activity_mode.as_str();
    let leader_strategy = event.leader_strategy.as_str();

    let rows = client
        .execute(
            r#"
            UPDATE events
            SET
                title = $2,
                book_title = $3,
                book_author = $4,
                start_date = $5,
                end_date = $6,
                enroll_deadline = $7,
                min_participants = $8,
                max_participants = $9,
                fee_kind = $10,
                fee_amount = $11,
                leader_reward_percent = $12,
                completion_standard = $13,
                activity_mode = $14,
                leader_strategy = $15,
                weekend_rest = $16,
                updated_at = NOW()
            WHERE id = $1 AND approval_status IN ('draft', 'rejected')
            "#,
            &[
                &event.id,
                &event.title,
                &event.book_title,
                &event.book_author,
                &event.start_date,
                &event.end_date,
                &event.enroll_deadline,
                &event.min_participants,
                &event.max_participants,
                &fee_kind,
                &event.fee_amount,
                &event.leader_reward_percent,
                &event.completion_standard,
                &activity_mode,
                &leader_strategy,
                &event.weekend_rest,
            ],
        )
        .await?;

    Ok(rows)
}

/// Move the approval state machine with a compare-and-set update.
///
/// Returns the number of rows changed; `0` means the event was not in
/// any of the expected states (somebody else moved it first).
pub async fn transition_approval(
    pool: &Pool,
    event_id: Uuid,
    expected: &[ApprovalStatus],
    next: ApprovalStatus,
    reject_reason: Option<&str>,
    at: DateTime<Utc>,
) -> Result<u64, DatabaseError> {
    debug!("Approval transition for {}: -> {}", event_id, next);

    let client = get_client(pool).await?;
    let expected: Vec<&str> = expected.iter().map(|s| s.as_str()).collect();

    let rows = match next {
        ApprovalStatus::Pending => {
            client
                .execute(
                    r#"
                    UPDATE events
                    SET approval_status = 'pending', submitted_at = $2,
                        reject_reason = NULL, updated_at = NOW()
                    WHERE id = $1 AND approval_status = ANY($3)
                    "#,
                    &[&event_id, &at, &expected],
                )
                .await?
        }
        ApprovalStatus::Approved => {
            client
                .execute(
                    r#"
                    UPDATE events
                    SET approval_status = 'approved', approved_at = $2, updated_at = NOW()
                    WHERE id = $1 AND approval_status = ANY($3)
                    "#,
                    &[&event_id, &at, &expected],
                )
                .await?
        }
        ApprovalStatus::Rejected => {
            client
                .execute(
                    r#"
                    UPDATE events
                    SET approval_status = 'rejected', reject_reason = $2, updated_at = NOW()
                    WHERE id = $1 AND approval_status = ANY($3)
                    "#,
                    &[&event_id, &reject_reason, &expected],
                )
                .await?
        }
        // Nothing ever transitions back into draft.
        ApprovalStatus::Draft => 0,
    };

    if rows > 0 {
        info!("Event {} approval moved to {}", event_id, next);
    }
    Ok(rows)
}

/// Move the activity state machine with a compare-and-set update.
///
/// Encodes the only legal advances; anything else changes `0` rows.
/// Starting additionally requires prior approval.
pub async fn transition_activity(
    pool: &Pool,
    event_id: Uuid,
    expected: ActivityStatus,
    next: ActivityStatus,
    at: DateTime<Utc>,
) -> Result<u64, DatabaseError> {
    debug!("Activity transition for {}: {} -> {}", event_id, expected, next);

    let client = get_client(pool).await?;

    let rows = match (expected, next) {
        (ActivityStatus::Enrolling, ActivityStatus::InProgress) => {
            client
                .execute(
                    r#"
                    UPDATE events
                    SET activity_status = 'in_progress', started_at = $2, updated_at = NOW()
                    WHERE id = $1
                      AND activity_status = 'enrolling'
                      AND approval_status = 'approved'
                    "#,
                    &[&event_id, &at],
                )
                .await?
        }
        (ActivityStatus::InProgress, ActivityStatus::Completed) => {
            client
                .execute(
                    r#"
                    UPDATE events
                    SET activity_status = 'completed', completed_at = $2, updated_at = NOW()
                    WHERE id = $1 AND activity_status = 'in_progress'
                    "#,
                    &[&event_id, &at],
                )
                .await?
        }
        _ => 0,
    };

    if rows > 0 {
        info!("Event {} activity moved to {}", event_id, next);
    }
    Ok(rows)
}

/// Set or clear the event's overall leader.
pub async fn set_overall_leader(
    pool: &Pool,
    event_id: Uuid,
    leader_id: Option<Uuid>,
) -> Result<u64, DatabaseError> {
    debug!("Setting overall leader for {}: {:?}", event_id, leader_id);

    let client = get_client(pool).await?;

    let rows = client
        .execute(
            "UPDATE events SET overall_leader_id = $2, updated_at = NOW() WHERE id = $1",
            &[&event_id, &leader_id],
        )
        .await?;

    Ok(rows)
}

// ============================================
// SCHEDULE SLOT QUERIES
// ============================================

pub(crate) const SLOT_COLUMNS: &str = r#"
    id, event_id, day_number, slot_date, leader_id,
    content_title, content_body, content_published_at, created_at
"#;

/// Get a schedule slot by ID.
pub async fn get_slot(
    pool: &Pool,
    slot_id: Uuid,
) -> Result<Option<ScheduleSlotRecord>, DatabaseError> {
    debug!("Fetching slot: {}", slot_id);

    let client = get_client(pool).await?;

    let rows = client
        .query(
            &format!("SELECT {} FROM schedule_slots WHERE id = $1", SLOT_COLUMNS),
            &[&slot_id],
        )
        .await?;

    if rows.is_empty() {
        Ok(None)
    } else {
        Ok(Some(row_to_slot(&rows[0])?))
    }
}

/// List an event's slots ordered by day number.
pub async fn list_slots_for_event(
    pool: &Pool,
    event_id: Uuid,
) -> Result<Vec<ScheduleSlotRecord>, DatabaseError> {
    debug!("Fetching slots for event: {}", event_id);

    let client = get_client(pool).await?;

    let rows = client
        .query(
            &format!(
                "SELECT {} FROM schedule_slots WHERE event_id = $1 ORDER BY day_number",
                SLOT_COLUMNS
            ),
            &[&event_id],
        )
        .await?;

    let mut slots = Vec::new();
    for row in rows {
        slots.push(row_to_slot(&row)?);
    }

    Ok(slots)
}

/// Store published content on a slot.
pub async fn publish_slot_content(
    pool: &Pool,
    slot_id: Uuid,
    title: &str,
    body: &str,
    at: DateTime<Utc>,
) -> Result<u64, DatabaseError> {
    debug!("Publishing content for slot: {}", slot_id);

    let client = get_client(pool).await?;

    let rows = client
        .execute(
            r#"
            UPDATE schedule_slots
            SET content_title = $2, content_body = $3, content_published_at = $4
            WHERE id = $1
            "#,
            &[&slot_id, &title, &body, &at],
        )
        .await?;

    if rows > 0 {
        info!("Content published for slot {}", slot_id);
    }
    Ok(rows)
}

// ============================================
// ENROLLMENT QUERIES
// ============================================

pub(crate) const ENROLLMENT_COLUMNS: &str = r#"
    id, event_id, user_id, display_name, kind, status,
    check_ins, leader_days, flowers_received, completion_rate,
    paid_amount, refund_amount, refund_status,
    created_at, updated_at
"#;

/// Get one user's enrollment in an event.
pub async fn get_enrollment(
    pool: &Pool,
    event_id: Uuid,
    user_id: Uuid,
) -> Result<Option<EnrollmentRecord>, DatabaseError> {
    debug!("Fetching enrollment: event={} user={}", event_id, user_id);

    let client = get_client(pool).await?;

    let rows = client
        .query(
            &format!(
                "SELECT {} FROM enrollments WHERE event_id = $1 AND user_id = $2",
                ENROLLMENT_COLUMNS
            ),
            &[&event_id, &user_id],
        )
        .await?;

    if rows.is_empty() {
        Ok(None)
    } else {
        Ok(Some(row_to_enrollment(&rows[0])?))
    }
}

/// List all enrollments for an event, oldest first.
pub async fn list_enrollments_for_event(
    pool: &Pool,
    event_id: Uuid,
) -> Result<Vec<EnrollmentRecord>, DatabaseError> {
    debug!("Fetching enrollments for event: {}", event_id);

    let client = get_client(pool).await?;

    let rows = client
        .query(
            &format!(
                "SELECT {} FROM enrollments WHERE event_id = $1 ORDER BY created_at, id",
                ENROLLMENT_COLUMNS
            ),
            &[&event_id],
        )
        .await?;

    let mut enrollments = Vec::new();
    for row in rows {
        enrollments.push(row_to_enrollment(&row)?);
    }

    Ok(enrollments)
}

/// Count enrolled participant-type members (the capacity number).
pub async fn count_active_participants(
    pool: &Pool,
    event_id: Uuid,
) -> Result<i64, DatabaseError> {
    let client = get_client(pool).await?;

    let row = client
        .query_one(
            r#"
            SELECT COUNT(*) FROM enrollments
            WHERE event_id = $1 AND kind = 'participant' AND status = 'enrolled'
            "#,
            &[&event_id],
        )
        .await?;

    Ok(row.get(0))
}

/// Cancel an active enrollment while its event is still enrolling.
///
/// The event-status guard sits inside the statement so a concurrent
/// `start` cannot slip a cancellation through after the fact.
pub async fn cancel_enrollment(
    pool: &Pool,
    event_id: Uuid,
    user_id: Uuid,
    refund_amount: i64,
) -> Result<u64, DatabaseError> {
    debug!("Cancelling enrollment: event={} user={}", event_id, user_id);

    let client = get_client(pool).await?;

    let rows = client
        .execute(
            r#"
            UPDATE enrollments
            SET status = 'cancelled',
                refund_amount = $3,
                refund_status = CASE WHEN $3 > 0 THEN 'pending' ELSE 'none' END,
                updated_at = NOW()
            WHERE event_id = $1 AND user_id = $2 AND status = 'enrolled'
              AND EXISTS (
                  SELECT 1 FROM events e
                  WHERE e.id = $1 AND e.activity_status = 'enrolling'
              )
            "#,
            &[&event_id, &user_id, &refund_amount],
        )
        .await?;

    if rows > 0 {
        info!("Enrollment cancelled: event={} user={}", event_id, user_id);
    }
    Ok(rows)
}

/// Record an enrollment's final completion outcome.
///
/// Flips `enrolled` to `completed` when the standard was met and
/// books any refund; safe to re-run.
pub async fn settle_enrollment(
    pool: &Pool,
    enrollment_id: Uuid,
    completion_rate: f64,
    met_standard: bool,
    refund_amount: i64,
) -> Result<u64, DatabaseError> {
    debug!("Settling enrollment: {}", enrollment_id);

    let client = get_client(pool).await?;

    let rows = client
        .execute(
            r#"
            UPDATE enrollments
            SET completion_rate = $2,
                status = CASE WHEN $3 AND status = 'enrolled' THEN 'completed' ELSE status END,
                refund_amount = $4,
                refund_status = CASE WHEN $4 > 0 THEN 'pending' ELSE refund_status END,
                updated_at = NOW()
            WHERE id = $1
            "#,
            &[&enrollment_id, &completion_rate, &met_standard, &refund_amount],
        )
        .await?;

    Ok(rows)
}

// ============================================
// CHECK-IN QUERIES
// ============================================

const CHECK_IN_COLUMNS: &str = r#"
    id, event_id, slot_id, user_id, note, checked_on, created_at
"#;

/// Get a check-in by ID.
pub async fn get_check_in(
    pool: &Pool,
    check_in_id: Uuid,
) -> Result<Option<CheckInRecord>, DatabaseError> {
    debug!("Fetching check-in: {}", check_in_id);

    let client = get_client(pool).await?;

    let rows = client
        .query(
            &format!("SELECT {} FROM check_ins WHERE id = $1", CHECK_IN_COLUMNS),
            &[&check_in_id],
        )
        .await?;

    if rows.is_empty() {
        Ok(None)
    } else {
        Ok(Some(row_to_check_in(&rows[0])?))
    }
}

/// List check-ins for one slot, oldest first.
pub async fn list_check_ins_for_slot(
    pool: &Pool,
    slot_id: Uuid,
) -> Result<Vec<CheckInRecord>, DatabaseError> {
    let client = get_client(pool).await?;

    let rows = client
        .query(
            &format!(
                "SELECT {} FROM check_ins WHERE slot_id = $1 ORDER BY created_at, id",
                CHECK_IN_COLUMNS
            ),
            &[&slot_id],
        )
        .await?;

    let mut check_ins = Vec::new();
    for row in rows {
        check_ins.push(row_to_check_in(&row)?);
    }

    Ok(check_ins)
}

/// Count check-ins recorded for an event on one calendar date.
pub async fn count_check_ins_on(
    pool: &Pool,
    event_id: Uuid,
    date: NaiveDate,
) -> Result<i64, DatabaseError> {
    let client = get_client(pool).await?;

    let row = client
        .query_one(
            "SELECT COUNT(*) FROM check_ins WHERE event_id = $1 AND checked_on = $2",
            &[&event_id, &date],
        )
        .await?;

    Ok(row.get(0))
}

// ============================================
// FLOWER QUERIES
// ============================================

const FLOWER_COLUMNS: &str = r#"
    id, event_id, slot_id, check_in_id, giver_id, recipient_id,
    amount, comment, anonymous, given_on, created_at
"#;

/// Get a user's flower quota row for one (event, date), if it exists.
pub async fn get_flower_quota(
    pool: &Pool,
    user_id: Uuid,
    event_id: Uuid,
    date: NaiveDate,
) -> Result<Option<FlowerQuotaRecord>, DatabaseError> {
    let client = get_client(pool).await?;

    let rows = client
        .query(
            r#"
            SELECT user_id, event_id, quota_date, used_count, max_count
            FROM flower_quotas
            WHERE user_id = $1 AND event_id = $2 AND quota_date = $3
            "#,
            &[&user_id, &event_id, &date],
        )
        .await?;

    if rows.is_empty() {
        Ok(None)
    } else {
        Ok(Some(row_to_quota(&rows[0])?))
    }
}

/// List flowers given for an event on one calendar date.
pub async fn list_flowers_on(
    pool: &Pool,
    event_id: Uuid,
    date: NaiveDate,
) -> Result<Vec<FlowerRecord>, DatabaseError> {
    let client = get_client(pool).await?;

    let rows = client
        .query(
            &format!(
                "SELECT {} FROM flowers WHERE event_id = $1 AND given_on = $2 ORDER BY created_at, id",
                FLOWER_COLUMNS
            ),
            &[&event_id, &date],
        )
        .await?;

    let mut flowers = Vec::new();
    for row in rows {
        flowers.push(row_to_flower(&row)?);
    }

    Ok(flowers)
}

/// List every flower given across an event.
pub async fn list_flowers_for_event(
    pool: &Pool,
    event_id: Uuid,
) -> Result<Vec<FlowerRecord>, DatabaseError> {
    let client = get_client(pool).await?;

    let rows = client
        .query(
            &format!(
                "SELECT {} FROM flowers WHERE event_id = $1 ORDER BY created_at, id",
                FLOWER_COLUMNS
            ),
            &[&event_id],
        )
        .await?;

    let mut flowers = Vec::new();
    for row in rows {
        flowers.push(row_to_flower(&row)?);
    }

    Ok(flowers)
}

// ============================================
// STAT & CERTIFICATE QUERIES
// ============================================

/// Get the leaderboard snapshot for one (event, date).
pub async fn get_daily_stat(
    pool: &Pool,
    event_id: Uuid,
    date: NaiveDate,
) -> Result<Option<DailyStatRecord>, DatabaseError> {
    let client = get_client(pool).await?;

    let rows = client
        .query(
            r#"
            SELECT id, event_id, stat_date, total_flowers, total_check_ins,
                   leaderboard, generated_at
            FROM daily_flower_stats
            WHERE event_id = $1 AND stat_date = $2
            "#,
            &[&event_id, &date],
        )
        .await?;

    if rows.is_empty() {
        Ok(None)
    } else {
        Ok(Some(row_to_stat(&rows[0])?))
    }
}

/// Store the leaderboard snapshot for one (event, date).
///
/// The (event, date) key is unique; regeneration overwrites the
/// existing snapshot in place and keeps its original row ID, so
/// re-runs never create duplicates.
pub async fn upsert_daily_stat(
    pool: &Pool,
    stat: &DailyStatRecord,
) -> Result<DailyStatRecord, DatabaseError> {
    debug!(
        "Upserting daily stat: event={} date={}",
        stat.event_id, stat.stat_date
    );

    let client = get_client(pool).await?;

    let row = client
        .query_one(
            r#"
            INSERT INTO daily_flower_stats (
                id, event_id, stat_date, total_flowers, total_check_ins,
                leaderboard, generated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (event_id, stat_date) DO UPDATE SET
                total_flowers = EXCLUDED.total_flowers,
                total_check_ins = EXCLUDED.total_check_ins,
                leaderboard = EXCLUDED.leaderboard,
                generated_at = EXCLUDED.generated_at
            RETURNING id, event_id, stat_date, total_flowers, total_check_ins,
                      leaderboard, generated_at
            "#,
            &[
                &stat.id,
                &stat.event_id,
                &stat.stat_date,
                &stat.total_flowers,
                &stat.total_check_ins,
                &stat.leaderboard,
                &stat.generated_at,
            ],
        )
        .await?;

    row_to_stat(&row)
}

/// Draw the next certificate serial number.
pub async fn next_certificate_serial(pool: &Pool) -> Result<i64, DatabaseError> {
    let client = get_client(pool).await?;

    let row = client
        .query_one("SELECT nextval('certificate_serials')", &[])
        .await?;

    Ok(row.get(0))
}

/// List certificates issued for an event.
pub async fn list_certificates_for_event(
    pool: &Pool,
    event_id: Uuid,
) -> Result<Vec<CertificateRecord>, DatabaseError> {
    let client = get_client(pool).await?;

    let rows = client
        .query(
            r#"
            SELECT id, event_id, user_id, kind, serial, rank, completion_rate, issued_at
            FROM certificates
            WHERE event_id = $1
            ORDER BY issued_at, id
            "#,
            &[&event_id],
        )
        .await?;

    let mut certificates = Vec::new();
    for row in rows {
        certificates.push(row_to_certificate(&row)?);
    }

    Ok(certificates)
}

// ============================================
// LEADER AUDIT QUERIES
// ============================================

/// List leader replacement audits for an event, oldest first.
pub async fn list_leader_audits(
    pool: &Pool,
    event_id: Uuid,
) -> Result<Vec<LeaderAuditRecord>, DatabaseError> {
    let client = get_client(pool).await?;

    let rows = client
        .query(
            r#"
            SELECT id, event_id, slot_id, prior_leader_id, new_leader_id, actor_id, changed_at
            FROM leader_audits
            WHERE event_id = $1
            ORDER BY changed_at, id
            "#,
            &[&event_id],
        )
        .await?;

    let mut audits = Vec::new();
    for row in rows {
        audits.push(row_to_audit(&row)?);
    }

    Ok(audits)
}
