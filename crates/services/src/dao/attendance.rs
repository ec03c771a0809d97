use bson::{doc, oid::ObjectId};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use crewdesk_db::models::{AttendanceRecord, AttendanceStatus, RectificationEntry};
use mongodb::Database;
use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info};

use super::base::{map_write_error, BaseDao, DaoError, DaoResult};

#[derive(Debug, Error)]
pub enum AttendanceError {
    #[error("Invalid status '{status}' for user {user_id}")]
    InvalidStatus { user_id: ObjectId, status: String },
    #[error("Monthly rectification limit reached, {remaining} attempts remaining")]
    LimitExceeded { remaining: i64 },
    #[error(transparent)]
    Dao(#[from] DaoError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarkAssignment {
    pub user_id: ObjectId,
    pub status: String,
}

#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub applied: usize,
    pub rectifications: usize,
    pub remaining: i64,
}

/// Truncates a calendar date to its canonical UTC start-of-day instant.
pub fn canonical_day(date: NaiveDate) -> bson::DateTime {
    let start = date.and_hms_opt(0, 0, 0).expect("midnight always exists");
    bson::DateTime::from_chrono(start.and_utc())
}

/// A date is "past" iff it is strictly before the start of today (UTC).
pub fn is_past(date: NaiveDate, now: DateTime<Utc>) -> bool {
    date < now.date_naive()
}

/// Whether writing `requested` over `existing` constitutes a rectification
/// of a past date. A missing record reads as the implicit default
/// `Absent`, so writing `Absent` where nothing exists is not an edit.
pub fn is_rectification(
    existing: Option<AttendanceStatus>,
    requested: AttendanceStatus,
) -> bool {
    match existing {
        Some(current) => current != requested,
        None => requested != AttendanceStatus::Absent,
    }
}

/// Counts the assignments in a batch that rectify history. Zero for any
/// batch targeting today or the future.
pub fn count_rectifications(
    existing: &HashMap<ObjectId, AttendanceStatus>,
    assignments: &[(ObjectId, AttendanceStatus)],
    past: bool,
) -> usize {
    if !past {
        return 0;
    }
    assignments
        .iter()
        .filter(|(user_id, requested)| {
            is_rectification(existing.get(user_id).copied(), *requested)
        })
        .count()
}

pub fn remaining_from_count(used: i64) -> i64 {
    (RectificationEntry::MONTHLY_LIMIT - used).max(0)
}

pub struct AttendanceDao {
    pub records: BaseDao<AttendanceRecord>,
    pub ledger: BaseDao<RectificationEntry>,
}

impl AttendanceDao {
    pub fn new(db: &Database) -> Self {
        Self {
            records: BaseDao::new(db, AttendanceRecord::COLLECTION),
            ledger: BaseDao::new(db, RectificationEntry::COLLECTION),
        }
    }

    fn ledger_key(workspace_id: ObjectId, user_id: ObjectId, now: DateTime<Utc>) -> bson::Document {
        doc! {
            "workspace_id": workspace_id,
            "user_id": user_id,
            "month": now.month0() as i32,
            "year": now.year(),
        }
    }

    /// Rectification attempts left for this admin in the current calendar
    /// month (the month the edit is performed in, not the month being
    /// edited).
    pub async fn remaining_attempts(
        &self,
        workspace_id: ObjectId,
        user_id: ObjectId,
        now: DateTime<Utc>,
    ) -> DaoResult<i64> {
        let used = self
            .ledger
            .find_one(Self::ledger_key(workspace_id, user_id, now))
            .await?
            .map(|entry| entry.count)
            .unwrap_or(0);
        Ok(remaining_from_count(used))
    }

    /// Atomically reserves `needed` rectifications from the monthly cap.
    ///
    /// Materializes the ledger entry if absent, then performs a single
    /// conditional increment guarded by `count <= cap - needed`. Two
    /// concurrent batches can both read the same `remaining`, but only
    /// one conditional increment can win, so the cap is never jointly
    /// exceeded. Returns `Err(remaining)` without incrementing when the
    /// reservation does not fit.
    pub async fn try_consume(
        &self,
        workspace_id: ObjectId,
        user_id: ObjectId,
        needed: i64,
        now: DateTime<Utc>,
    ) -> DaoResult<Result<(), i64>> {
        let key = Self::ledger_key(workspace_id, user_id, now);
        let bson_now = bson::DateTime::now();

        // Two concurrent first upserts for the same month can both miss the
        // existing document and collide on the unique ledger index. The
        // loser's duplicate key means the entry exists, which is all this
        // step is for.
        if let Err(e) = self
            .ledger
            .collection()
            .update_one(
                key.clone(),
                doc! {
                    "$setOnInsert": {
                        "count": 0_i64,
                        "created_at": bson_now,
                        "updated_at": bson_now,
                    }
                },
            )
            .upsert(true)
            .await
        {
            match map_write_error(e) {
                DaoError::DuplicateKey(_) => {}
                other => return Err(other),
            }
        }

        let mut guarded = key.clone();
        guarded.insert(
            "count",
            doc! { "$lte": RectificationEntry::MONTHLY_LIMIT - needed },
        );

        let result = self
            .ledger
            .collection()
            .update_one(
                guarded,
                doc! {
                    "$inc": { "count": needed },
                    "$set": { "updated_at": bson::DateTime::now() },
                },
            )
            .await?;

        if result.modified_count == 0 {
            let remaining = self.remaining_attempts(workspace_id, user_id, now).await?;
            return Ok(Err(remaining));
        }

        debug!(%workspace_id, %user_id, needed, "Rectification attempts consumed");
        Ok(Ok(()))
    }

    /// Applies one day's attendance assignments as a unit.
    ///
    /// Validation is fail-fast with zero writes; a batch touching a past
    /// date reserves its whole rectification count from the ledger before
    /// any record is written, and a failed reservation leaves both the
    /// ledger and the records untouched. The writes themselves are
    /// idempotent upserts keyed `(workspace, user, date)`.
    pub async fn mark_batch(
        &self,
        workspace_id: ObjectId,
        marked_by: ObjectId,
        date: NaiveDate,
        assignments: &[MarkAssignment],
        now: DateTime<Utc>,
    ) -> Result<BatchOutcome, AttendanceError> {
        let mut parsed = Vec::with_capacity(assignments.len());
        for assignment in assignments {
            let status = AttendanceStatus::parse(&assignment.status).ok_or_else(|| {
                AttendanceError::InvalidStatus {
                    user_id: assignment.user_id,
                    status: assignment.status.clone(),
                }
            })?;
            parsed.push((assignment.user_id, status));
        }

        let day = canonical_day(date);
        let past = is_past(date, now);

        let user_ids: Vec<ObjectId> = parsed.iter().map(|(user_id, _)| *user_id).collect();
        let existing: HashMap<ObjectId, AttendanceStatus> = self
            .records
            .find_many(
                doc! {
                    "workspace_id": workspace_id,
                    "user_id": { "$in": user_ids },
                    "date": day,
                },
                None,
            )
            .await?
            .into_iter()
            .map(|record| (record.user_id, record.status))
            .collect();

        let rectifications = count_rectifications(&existing, &parsed, past);

        if rectifications > 0 {
            match self
                .try_consume(workspace_id, marked_by, rectifications as i64, now)
                .await?
            {
                Ok(()) => {}
                Err(remaining) => {
                    return Err(AttendanceError::LimitExceeded { remaining });
                }
            }
        }

        for (user_id, status) in &parsed {
            self.records
                .upsert_one(
                    doc! {
                        "workspace_id": workspace_id,
                        "user_id": *user_id,
                        "date": day,
                    },
                    doc! {
                        "$set": {
                            "status": status.as_str(),
                            "marked_by": marked_by,
                        },
                        "$setOnInsert": { "created_at": bson::DateTime::now() },
                    },
                )
                .await?;
        }

        let remaining = self
            .remaining_attempts(workspace_id, marked_by, now)
            .await?;

        info!(
            %workspace_id,
            %marked_by,
            %date,
            applied = parsed.len(),
            rectifications,
            "Attendance batch applied"
        );

        Ok(BatchOutcome {
            applied: parsed.len(),
            rectifications,
            remaining,
        })
    }

    pub async fn list_for_user(
        &self,
        workspace_id: ObjectId,
        user_id: ObjectId,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> DaoResult<Vec<AttendanceRecord>> {
        let mut filter = doc! { "workspace_id": workspace_id, "user_id": user_id };
        let mut range = doc! {};
        if let Some(from) = from {
            range.insert("$gte", canonical_day(from));
        }
        if let Some(to) = to {
            range.insert("$lte", canonical_day(to));
        }
        if !range.is_empty() {
            filter.insert("date", range);
        }
        self.records
            .find_many(filter, Some(doc! { "date": -1 }))
            .await
    }

    pub async fn list_for_date(
        &self,
        workspace_id: ObjectId,
        date: NaiveDate,
    ) -> DaoResult<Vec<AttendanceRecord>> {
        self.records
            .find_many(
                doc! { "workspace_id": workspace_id, "date": canonical_day(date) },
                Some(doc! { "user_id": 1 }),
            )
            .await
    }
}
