//! # PostgreSQL Store
//!
//! Production [`ClubStore`] implementation. Single-statement reads and
//! writes delegate to [`crate::db::queries`]; the invariant-carrying
//! operations run here as short multi-statement transactions.
//!
//! ## Transaction Choreography
//!
//! ```text
//! admit_enrollment      claim_slot              record_flower
//! ─────────────────     ─────────────────       ──────────────────
//! lock event row        lock slot row           upsert quota row
//! verify enrolling      verify slot open        lock quota row
//! count participants    bump leader counter     verify used+n <= max
//! verify count < cap      (guards cap + role)   consume quota
//! insert enrollment     assign slot             insert flower (unique)
//! commit                commit                  bump recipient counter
//!                                               commit
//! ```
//!
//! Any early return drops the transaction, which rolls it back; a
//! losing caller never leaves partial state behind. Unique-constraint
//! violations are translated to their typed domain errors by
//! constraint name.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio_postgres::error::SqlState;
use uuid::Uuid;

use crate::db::models::*;
use crate::db::queries::{self, ENROLLMENT_COLUMNS, SLOT_COLUMNS};
use crate::db::{Database, DatabaseError};
use crate::error::{ClubError, ClubResult};

use super::ClubStore;

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgStore {
    db: Database,
}

impl PgStore {
    /// Wrap a connected [`Database`].
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    async fn client(&self) -> ClubResult<deadpool_postgres::Object> {
        self.db
            .pool()
            .get()
            .await
            .map_err(|e| ClubError::Database(DatabaseError::ConnectionError(e.to_string())))
    }
}

fn db_err(e: tokio_postgres::Error) -> ClubError {
    ClubError::Database(DatabaseError::QueryError(e))
}

/// Translate unique-constraint violations into domain errors.
///
/// Constraint names match `migrations/001_initial_schema.sql`.
fn unique_err(e: tokio_postgres::Error) -> ClubError {
    if let Some(db_error) = e.as_db_error() {
        if db_error.code() == &SqlState::UNIQUE_VIOLATION {
            match db_error.constraint() {
                Some("uq_enrollments_event_user") => return ClubError::AlreadyEnrolled,
                Some("uq_check_ins_slot_user") => return ClubError::DuplicateCheckIn,
                Some("uq_flowers_check_in") => return ClubError::DuplicateFlower,
                _ => {}
            }
        }
    }
    db_err(e)
}

#[async_trait]
impl ClubStore for PgStore {
    // ==========================================
    // EVENTS
    // ==========================================

    async fn insert_event(&self, event: &EventRecord) -> ClubResult<()> {
        queries::insert_event(self.db.pool(), event).await?;
        Ok(())
    }

    async fn get_event(&self, event_id: Uuid) -> ClubResult<Option<EventRecord>> {
        Ok(queries::get_event(self.db.pool(), event_id).await?)
    }

    async fn list_events_by_activity(
        &self,
        status: ActivityStatus,
    ) -> ClubResult<Vec<EventRecord>> {
        Ok(queries::list_events_by_activity(self.db.pool(), status).await?)
    }

    async fn update_event_details(&self, event: &EventRecord) -> ClubResult<bool> {
        Ok(queries::update_event_details(self.db.pool(), event).await? > 0)
    }

    async fn transition_approval(
        &self,
        event_id: Uuid,
        expected: &[ApprovalStatus],
        next: ApprovalStatus,
        reject_reason: Option<&str>,
        at: DateTime<Utc>,
    ) -> ClubResult<bool> {
        let rows = queries::transition_approval(
            self.db.pool(),
            event_id,
            expected,
            next,
            reject_reason,
            at,
        )
        .await?;
        Ok(rows > 0)
    }

    async fn transition_activity(
        &self,
        event_id: Uuid,
        expected: ActivityStatus,
        next: ActivityStatus,
        at: DateTime<Utc>,
    ) -> ClubResult<bool> {
        let rows =
            queries::transition_activity(self.db.pool(), event_id, expected, next, at).await?;
        Ok(rows > 0)
    }

    async fn set_overall_leader(
        &self,
        event_id: Uuid,
        leader_id: Option<Uuid>,
    ) -> ClubResult<bool> {
        Ok(queries::set_overall_leader(self.db.pool(), event_id, leader_id).await? > 0)
    }

    // ==========================================
    // SCHEDULE SLOTS
    // ==========================================

    async fn insert_slots(&self, slots: &[ScheduleSlotRecord]) -> ClubResult<u64> {
        let mut client = self.client().await?;
        let tx = client.transaction().await.map_err(db_err)?;

        let mut inserted = 0u64;
        for slot in slots {
            inserted += tx
                .execute(
                    r#"
                    INSERT INTO schedule_slots (
                        id, event_id, day_number, slot_date, leader_id,
                        content_title, content_body, content_published_at, created_at
                    )
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                    ON CONFLICT (event_id, day_number) DO NOTHING
                    "#,
                    &[
                        &slot.id,
                        &slot.event_id,
                        &slot.day_number,
                        &slot.slot_date,
                        &slot.leader_id,
                        &slot.content_title,
                        &slot.content_body,
                        &slot.content_published_at,
                        &slot.created_at,
                    ],
                )
                .await
                .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)?;
        Ok(inserted)
    }

    async fn get_slot(&self, slot_id: Uuid) -> ClubResult<Option<ScheduleSlotRecord>> {
        Ok(queries::get_slot(self.db.pool(), slot_id).await?)
    }

    async fn list_slots(&self, event_id: Uuid) -> ClubResult<Vec<ScheduleSlotRecord>> {
        Ok(queries::list_slots_for_event(self.db.pool(), event_id).await?)
    }

    async fn claim_slot(
        &self,
        slot_id: Uuid,
        user_id: Uuid,
        cap: Option<i32>,
    ) -> ClubResult<ScheduleSlotRecord> {
        let mut client = self.client().await?;
        let tx = client.transaction().await.map_err(db_err)?;

        // Lock the slot row; concurrent claimants queue here.
        let rows = tx
            .query(
                &format!(
                    "SELECT {} FROM schedule_slots WHERE id = $1 FOR UPDATE",
                    SLOT_COLUMNS
                ),
                &[&slot_id],
            )
            .await
            .map_err(db_err)?;
        let mut slot = match rows.first() {
            Some(row) => queries::row_to_slot(row)?,
            None => return Err(ClubError::NotFound("Slot")),
        };

        if slot.leader_id.is_some() {
            return Err(ClubError::DuplicateAssignment);
        }

        // One conditional update guards both the enrolled-participant
        // requirement and the per-member cap.
        let updated = tx
            .execute(
                r#"
                UPDATE enrollments
                SET leader_days = leader_days + 1, updated_at = NOW()
                WHERE event_id = $1 AND user_id = $2
                  AND kind = 'participant' AND status = 'enrolled'
                  AND ($3::INT IS NULL OR leader_days < $3)
                "#,
                &[&slot.event_id, &user_id, &cap],
            )
            .await
            .map_err(db_err)?;

        if updated == 0 {
            let enrolled = tx
                .query(
                    r#"
                    SELECT 1 FROM enrollments
                    WHERE event_id = $1 AND user_id = $2
                      AND kind = 'participant' AND status = 'enrolled'
                    "#,
                    &[&slot.event_id, &user_id],
                )
                .await
                .map_err(db_err)?;

            return Err(if enrolled.is_empty() {
                ClubError::PermissionDenied(
                    "only enrolled participants can lead a slot".to_string(),
                )
            } else {
                ClubError::PermissionDenied(format!(
                    "leadership cap of {} slots reached",
                    cap.unwrap_or(0)
                ))
            });
        }

        tx.execute(
            "UPDATE schedule_slots SET leader_id = $2 WHERE id = $1",
            &[&slot_id, &user_id],
        )
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;

        slot.leader_id = Some(user_id);
        Ok(slot)
    }

    async fn assign_open_slot(&self, slot_id: Uuid, leader_id: Uuid) -> ClubResult<bool> {
        let mut client = self.client().await?;
        let tx = client.transaction().await.map_err(db_err)?;

        let rows = tx
            .query(
                r#"
                UPDATE schedule_slots SET leader_id = $2
                WHERE id = $1 AND leader_id IS NULL
                RETURNING event_id
                "#,
                &[&slot_id, &leader_id],
            )
            .await
            .map_err(db_err)?;

        let event_id: Uuid = match rows.first() {
            Some(row) => row.get(0),
            None => return Ok(false),
        };

        let updated = tx
            .execute(
                r#"
                UPDATE enrollments
                SET leader_days = leader_days + 1, updated_at = NOW()
                WHERE event_id = $1 AND user_id = $2
                  AND kind = 'participant' AND status = 'enrolled'
                "#,
                &[&event_id, &leader_id],
            )
            .await
            .map_err(db_err)?;

        if updated == 0 {
            // Candidate stopped being an enrolled participant; drop
            // the transaction and let the planner move on.
            return Ok(false);
        }

        tx.commit().await.map_err(db_err)?;
        Ok(true)
    }

    async fn reassign_slot_leader(
        &self,
        slot_id: Uuid,
        new_leader_id: Uuid,
        actor_id: Uuid,
        at: DateTime<Utc>,
    ) -> ClubResult<Option<Uuid>> {
        let mut client = self.client().await?;
        let tx = client.transaction().await.map_err(db_err)?;

        let rows = tx
            .query(
                &format!(
                    "SELECT {} FROM schedule_slots WHERE id = $1 FOR UPDATE",
                    SLOT_COLUMNS
                ),
                &[&slot_id],
            )
            .await
            .map_err(db_err)?;
        let slot = match rows.first() {
            Some(row) => queries::row_to_slot(row)?,
            None => return Err(ClubError::NotFound("Slot")),
        };

        // Re-applying the same leader is a no-op, not an error.
        if slot.leader_id == Some(new_leader_id) {
            return Ok(slot.leader_id);
        }

        let updated = tx
            .execute(
                r#"
                UPDATE enrollments
                SET leader_days = leader_days + 1, updated_at = NOW()
                WHERE event_id = $1 AND user_id = $2
                  AND kind = 'participant' AND status = 'enrolled'
                "#,
                &[&slot.event_id, &new_leader_id],
            )
            .await
            .map_err(db_err)?;
        if updated == 0 {
            return Err(ClubError::PermissionDenied(
                "replacement leader must be an enrolled participant".to_string(),
            ));
        }

        if let Some(prior) = slot.leader_id {
            tx.execute(
                r#"
                UPDATE enrollments
                SET leader_days = GREATEST(leader_days - 1, 0), updated_at = NOW()
                WHERE event_id = $1 AND user_id = $2
                "#,
                &[&slot.event_id, &prior],
            )
            .await
            .map_err(db_err)?;
        }

        tx.execute(
            "UPDATE schedule_slots SET leader_id = $2 WHERE id = $1",
            &[&slot_id, &new_leader_id],
        )
        .await
        .map_err(db_err)?;

        tx.execute(
            r#"
            INSERT INTO leader_audits (
                id, event_id, slot_id, prior_leader_id, new_leader_id, actor_id, changed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
            &[
                &Uuid::new_v4(),
                &slot.event_id,
                &slot_id,
                &slot.leader_id,
                &new_leader_id,
                &actor_id,
                &at,
            ],
        )
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(slot.leader_id)
    }

    async fn publish_slot_content(
        &self,
        slot_id: Uuid,
        title: &str,
        body: &str,
        at: DateTime<Utc>,
    ) -> ClubResult<()> {
        let rows = queries::publish_slot_content(self.db.pool(), slot_id, title, body, at).await?;
        if rows == 0 {
            return Err(ClubError::NotFound("Slot"));
        }
        Ok(())
    }

    async fn list_leader_audits(&self, event_id: Uuid) -> ClubResult<Vec<LeaderAuditRecord>> {
        Ok(queries::list_leader_audits(self.db.pool(), event_id).await?)
    }

    // ==========================================
    // ENROLLMENTS
    // ==========================================

    async fn admit_enrollment(
        &self,
        enrollment: &EnrollmentRecord,
        capacity: Option<i32>,
    ) -> ClubResult<EnrollmentRecord> {
        let mut client = self.client().await?;
        let tx = client.transaction().await.map_err(db_err)?;

        // Serialize admissions per event; the capacity count below is
        // stable for as long as we hold this lock.
        let rows = tx
            .query(
                "SELECT activity_status FROM events WHERE id = $1 FOR UPDATE",
                &[&enrollment.event_id],
            )
            .await
            .map_err(db_err)?;
        let status: String = match rows.first() {
            Some(row) => row.get(0),
            None => return Err(ClubError::NotFound("Event")),
        };
        if status != ActivityStatus::Enrolling.as_str() {
            return Err(ClubError::conflict("event is no longer accepting enrollments"));
        }

        let existing = tx
            .query(
                &format!(
                    "SELECT {} FROM enrollments WHERE event_id = $1 AND user_id = $2",
                    ENROLLMENT_COLUMNS
                ),
                &[&enrollment.event_id, &enrollment.user_id],
            )
            .await
            .map_err(db_err)?;

        let needs_capacity = enrollment.kind == EnrollmentKind::Participant && capacity.is_some();
        let check_capacity = |count: i64| -> ClubResult<()> {
            if let Some(cap) = capacity {
                if count >= cap as i64 {
                    return Err(ClubError::CapacityExceeded { capacity: cap });
                }
            }
            Ok(())
        };

        if let Some(row) = existing.first() {
            let current = queries::row_to_enrollment(row)?;
            if current.status != EnrollmentStatus::Cancelled {
                return Err(ClubError::AlreadyEnrolled);
            }

            if needs_capacity {
                let count: i64 = tx
                    .query_one(
                        r#"
                        SELECT COUNT(*) FROM enrollments
                        WHERE event_id = $1 AND kind = 'participant' AND status = 'enrolled'
                        "#,
                        &[&enrollment.event_id],
                    )
                    .await
                    .map_err(db_err)?
                    .get(0);
                check_capacity(count)?;
            }

            // The (event, user) key is unique, so a re-join after a
            // cancellation re-activates the old row. Earned counters
            // survive; the fee is charged afresh.
            let kind = enrollment.kind.as_str();
            let row = tx
                .query_one(
                    &format!(
                        r#"
                        UPDATE enrollments
                        SET status = 'enrolled', kind = $2, display_name = $3,
                            paid_amount = $4, refund_amount = 0, refund_status = 'none',
                            updated_at = $5
                        WHERE id = $1
                        RETURNING {}
                        "#,
                        ENROLLMENT_COLUMNS
                    ),
                    &[
                        &current.id,
                        &kind,
                        &enrollment.display_name,
                        &enrollment.paid_amount,
                        &enrollment.updated_at,
                    ],
                )
                .await
                .map_err(db_err)?;
            let readmitted = queries::row_to_enrollment(&row)?;

            tx.commit().await.map_err(db_err)?;
            return Ok(readmitted);
        }

        if needs_capacity {
            let count: i64 = tx
                .query_one(
                    r#"
                    SELECT COUNT(*) FROM enrollments
                    WHERE event_id = $1 AND kind = 'participant' AND status = 'enrolled'
                    "#,
                    &[&enrollment.event_id],
                )
                .await
                .map_err(db_err)?
                .get(0);
            check_capacity(count)?;
        }

        let kind = enrollment.kind.as_str();
        let enrollment_status = enrollment.status.as_str();
        let refund_status = enrollment.refund_status.as_str();
        tx.execute(
            r#"
            INSERT INTO enrollments (
                id, event_id, user_id, display_name, kind, status,
                check_ins, leader_days, flowers_received, completion_rate,
                paid_amount, refund_amount, refund_status,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
            &[
                &enrollment.id,
                &enrollment.event_id,
                &enrollment.user_id,
                &enrollment.display_name,
                &kind,
                &enrollment_status,
                &enrollment.check_ins,
                &enrollment.leader_days,
                &enrollment.flowers_received,
                &enrollment.completion_rate,
                &enrollment.paid_amount,
                &enrollment.refund_amount,
                &refund_status,
                &enrollment.created_at,
                &enrollment.updated_at,
            ],
        )
        .await
        .map_err(unique_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(enrollment.clone())
    }

    async fn get_enrollment(
        &self,
        event_id: Uuid,
        user_id: Uuid,
    ) -> ClubResult<Option<EnrollmentRecord>> {
        Ok(queries::get_enrollment(self.db.pool(), event_id, user_id).await?)
    }

    async fn list_enrollments(&self, event_id: Uuid) -> ClubResult<Vec<EnrollmentRecord>> {
        Ok(queries::list_enrollments_for_event(self.db.pool(), event_id).await?)
    }

    async fn count_active_participants(&self, event_id: Uuid) -> ClubResult<i64> {
        Ok(queries::count_active_participants(self.db.pool(), event_id).await?)
    }

    async fn cancel_enrollment(
        &self,
        event_id: Uuid,
        user_id: Uuid,
        refund_amount: i64,
    ) -> ClubResult<bool> {
        let rows =
            queries::cancel_enrollment(self.db.pool(), event_id, user_id, refund_amount).await?;
        Ok(rows > 0)
    }

    async fn settle_enrollment(
        &self,
        enrollment_id: Uuid,
        completion_rate: f64,
        met_standard: bool,
        refund_amount: i64,
    ) -> ClubResult<()> {
        let rows = queries::settle_enrollment(
            self.db.pool(),
            enrollment_id,
            completion_rate,
            met_standard,
            refund_amount,
        )
        .await?;
        if rows == 0 {
            return Err(ClubError::NotFound("Enrollment"));
        }
        Ok(())
    }

    // ==========================================
    // CHECK-INS
    // ==========================================

    async fn record_check_in(&self, check_in: &CheckInRecord) -> ClubResult<()> {
        let mut client = self.client().await?;
        let tx = client.transaction().await.map_err(db_err)?;

        tx.execute(
            r#"
            INSERT INTO check_ins (
                id, event_id, slot_id, user_id, note, checked_on, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
            &[
                &check_in.id,
                &check_in.event_id,
                &check_in.slot_id,
                &check_in.user_id,
                &check_in.note,
                &check_in.checked_on,
                &check_in.created_at,
            ],
        )
        .await
        .map_err(unique_err)?;

        let updated = tx
            .execute(
                r#"
                UPDATE enrollments
                SET check_ins = check_ins + 1, updated_at = NOW()
                WHERE event_id = $1 AND user_id = $2
                  AND kind = 'participant' AND status = 'enrolled'
                "#,
                &[&check_in.event_id, &check_in.user_id],
            )
            .await
            .map_err(db_err)?;

        if updated == 0 {
            return Err(ClubError::PermissionDenied(
                "only enrolled participants can check in".to_string(),
            ));
        }

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn get_check_in(&self, check_in_id: Uuid) -> ClubResult<Option<CheckInRecord>> {
        Ok(queries::get_check_in(self.db.pool(), check_in_id).await?)
    }

    async fn list_check_ins_for_slot(&self, slot_id: Uuid) -> ClubResult<Vec<CheckInRecord>> {
        Ok(queries::list_check_ins_for_slot(self.db.pool(), slot_id).await?)
    }

    async fn count_check_ins_on(&self, event_id: Uuid, date: NaiveDate) -> ClubResult<i64> {
        Ok(queries::count_check_ins_on(self.db.pool(), event_id, date).await?)
    }

    // ==========================================
    // FLOWERS & QUOTAS
    // ==========================================

    async fn record_flower(
        &self,
        flower: &FlowerRecord,
        default_quota: i32,
    ) -> ClubResult<FlowerQuotaRecord> {
        let mut client = self.client().await?;
        let tx = client.transaction().await.map_err(db_err)?;

        // Duplicate gives must surface as such even when the day's
        // quota is already spent, so the flower row goes in first. A
        // quota failure below rolls it back.
        tx.execute(
            r#"
            INSERT INTO flowers (
                id, event_id, slot_id, check_in_id, giver_id, recipient_id,
                amount, comment, anonymous, given_on, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
            &[
                &flower.id,
                &flower.event_id,
                &flower.slot_id,
                &flower.check_in_id,
                &flower.giver_id,
                &flower.recipient_id,
                &flower.amount,
                &flower.comment,
                &flower.anonymous,
                &flower.given_on,
                &flower.created_at,
            ],
        )
        .await
        .map_err(unique_err)?;

        // First give of the day creates the quota row; the stamped
        // maximum stays fixed for that date afterwards.
        tx.execute(
            r#"
            INSERT INTO flower_quotas (user_id, event_id, quota_date, used_count, max_count)
            VALUES ($1, $2, $3, 0, $4)
            ON CONFLICT (user_id, event_id, quota_date) DO NOTHING
            "#,
            &[
                &flower.giver_id,
                &flower.event_id,
                &flower.given_on,
                &default_quota,
            ],
        )
        .await
        .map_err(db_err)?;

        let row = tx
            .query_one(
                r#"
                SELECT used_count, max_count FROM flower_quotas
                WHERE user_id = $1 AND event_id = $2 AND quota_date = $3
                FOR UPDATE
                "#,
                &[&flower.giver_id, &flower.event_id, &flower.given_on],
            )
            .await
            .map_err(db_err)?;
        let used: i32 = row.get(0);
        let max: i32 = row.get(1);

        if used as i64 + flower.amount as i64 > max as i64 {
            return Err(ClubError::QuotaExceeded { used, max });
        }

        tx.execute(
            r#"
            UPDATE flower_quotas SET used_count = used_count + $4
            WHERE user_id = $1 AND event_id = $2 AND quota_date = $3
            "#,
            &[
                &flower.giver_id,
                &flower.event_id,
                &flower.given_on,
                &flower.amount,
            ],
        )
        .await
        .map_err(db_err)?;

        // Recipient counter rides in the same transaction so the
        // denormalized count can never drift from the flower rows.
        tx.execute(
            r#"
            UPDATE enrollments
            SET flowers_received = flowers_received + $3, updated_at = NOW()
            WHERE event_id = $1 AND user_id = $2
            "#,
            &[&flower.event_id, &flower.recipient_id, &flower.amount],
        )
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;

        Ok(FlowerQuotaRecord {
            user_id: flower.giver_id,
            event_id: flower.event_id,
            quota_date: flower.given_on,
            used: used + flower.amount,
            max,
        })
    }

    async fn get_flower_quota(
        &self,
        user_id: Uuid,
        event_id: Uuid,
        date: NaiveDate,
    ) -> ClubResult<Option<FlowerQuotaRecord>> {
        Ok(queries::get_flower_quota(self.db.pool(), user_id, event_id, date).await?)
    }

    async fn list_flowers_on(
        &self,
        event_id: Uuid,
        date: NaiveDate,
    ) -> ClubResult<Vec<FlowerRecord>> {
        Ok(queries::list_flowers_on(self.db.pool(), event_id, date).await?)
    }

    async fn list_flowers_for_event(&self, event_id: Uuid) -> ClubResult<Vec<FlowerRecord>> {
        Ok(queries::list_flowers_for_event(self.db.pool(), event_id).await?)
    }

    // ==========================================
    // STATS & CERTIFICATES
    // ==========================================

    async fn upsert_daily_stat(&self, stat: &DailyStatRecord) -> ClubResult<DailyStatRecord> {
        Ok(queries::upsert_daily_stat(self.db.pool(), stat).await?)
    }

    async fn get_daily_stat(
        &self,
        event_id: Uuid,
        date: NaiveDate,
    ) -> ClubResult<Option<DailyStatRecord>> {
        Ok(queries::get_daily_stat(self.db.pool(), event_id, date).await?)
    }

    async fn next_certificate_serial(&self) -> ClubResult<i64> {
        Ok(queries::next_certificate_serial(self.db.pool()).await?)
    }

    async fn insert_certificate(
        &self,
        certificate: &CertificateRecord,
    ) -> ClubResult<Option<CertificateRecord>> {
        let client = self.client().await?;

        let kind = certificate.kind.as_str();
        let rows = client
            .query(
                r#"
                INSERT INTO certificates (
                    id, event_id, user_id, kind, serial, rank, completion_rate, issued_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ON CONFLICT (event_id, user_id, kind) DO NOTHING
                RETURNING id, event_id, user_id, kind, serial, rank, completion_rate, issued_at
                "#,
                &[
                    &certificate.id,
                    &certificate.event_id,
                    &certificate.user_id,
                    &kind,
                    &certificate.serial,
                    &certificate.rank,
                    &certificate.completion_rate,
                    &certificate.issued_at,
                ],
            )
            .await
            .map_err(db_err)?;

        match rows.first() {
            Some(row) => Ok(Some(queries::row_to_certificate(row)?)),
            None => Ok(None),
        }
    }

    async fn list_certificates(&self, event_id: Uuid) -> ClubResult<Vec<CertificateRecord>> {
        Ok(queries::list_certificates_for_event(self.db.pool(), event_id).await?)
    }
}
