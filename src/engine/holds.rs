//! Hold lifecycle: manual extension and the expiry sweep.
//!
//! Sweeping is conditional writing, not scheduled deletion: a candidate
//! collected from a racy read scan is only cancelled after the write lock
//! re-proves it is still a Pending reservation with a lapsed hold. Running
//! the sweep twice for the same instant cancels nothing the second time.

use ulid::Ulid;

use crate::model::*;
use crate::observability;

use super::{Engine, LedgerError};

impl Engine {
    /// Push a pending reservation's hold deadline out, e.g. by staff while
    /// a customer sorts out their transfer. Holds only ever move forward;
    /// a deadline earlier than the current one leaves it unchanged.
    ///
    /// Returns the effective deadline.
    pub async fn extend_hold(&self, id: Ulid, deadline: Ms) -> Result<Ms, LedgerError> {
        let (resource_id, mut guard) = self.resolve_entity_write(&id).await?;
        let row = guard.reservation(&id).ok_or(LedgerError::NotFound(id))?;
        if row.status != ReservationStatus::Pending {
            return Err(LedgerError::InvalidTransition { from: row.status });
        }

        self.persist_and_apply(
            &mut guard,
            vec![Event::HoldExtended {
                id,
                resource_id,
                deadline,
                at: now_ms(),
            }],
        )
        .await?;

        let row = guard.reservation(&id).ok_or(LedgerError::NotFound(id))?;
        row.hold
            .deadline()
            .ok_or(LedgerError::InvalidTransition { from: row.status })
    }

    /// Cancel every pending reservation whose hold lapsed at or before
    /// `now`. Returns how many were cancelled. Per-reservation failures are
    /// logged and skipped; the next sweep retries them.
    pub async fn sweep_expired(&self, now: Ms) -> usize {
        let mut cancelled = 0usize;
        for (resource_id, reservation_id) in self.collect_lapsed_holds(now) {
            match self.expire_one(resource_id, reservation_id, now).await {
                Ok(true) => cancelled += 1,
                Ok(false) => {} // lost the race to a payment or extension
                Err(e) => {
                    tracing::warn!(reservation = %reservation_id, error = %e, "sweep skip");
                }
            }
        }
        if cancelled > 0 {
            metrics::counter!(observability::SWEEP_CANCELLED_TOTAL).increment(cancelled as u64);
            tracing::info!(cancelled, "expired reservations swept");
        }
        cancelled
    }

    /// Racy candidate scan. `try_read` so the sweep never stalls behind a
    /// busy resource; whatever it misses is caught next tick.
    fn collect_lapsed_holds(&self, now: Ms) -> Vec<(Ulid, Ulid)> {
        let mut out = Vec::new();
        for entry in self.state.iter() {
            let Ok(guard) = entry.value().try_read() else { continue };
            for r in &guard.reservations {
                if r.status == ReservationStatus::Pending && r.hold.lapsed(now) {
                    out.push((guard.id, r.id));
                }
            }
        }
        out
    }

    /// Re-check under the write lock, then cancel. `Ok(false)` means the
    /// candidate no longer qualifies.
    async fn expire_one(
        &self,
        resource_id: Ulid,
        reservation_id: Ulid,
        now: Ms,
    ) -> Result<bool, LedgerError> {
        let rs = self
            .get_resource(&resource_id)
            .ok_or(LedgerError::NotFound(resource_id))?;
        let mut guard = rs.write_owned().await;

        let still_lapsed = guard
            .reservation(&reservation_id)
            .is_some_and(|r| r.status == ReservationStatus::Pending && r.hold.lapsed(now));
        if !still_lapsed {
            return Ok(false);
        }

        self.persist_and_apply(
            &mut guard,
            vec![Event::ReservationCancelled {
                id: reservation_id,
                resource_id,
                expired: true,
                at: now,
            }],
        )
        .await?;
        Ok(true)
    }
}
