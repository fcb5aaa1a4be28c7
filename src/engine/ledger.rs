//! Reservation lifecycle mutations. Every mutation follows the same shape:
//! validate, WAL-commit, apply, all inside one per-resource write lock.

use rust_decimal::Decimal;
use ulid::Ulid;

use crate::customer::{CustomerDetails, CustomerDirectory};
use crate::limits::*;
use crate::model::*;
use crate::observability;

use super::{overlap, Engine, LedgerError};

impl Engine {
    /// Register a bookable resource under a caller-chosen id, so catalog
    /// loads are idempotent per id.
    pub async fn register_resource(
        &self,
        id: Ulid,
        kind: ResourceKind,
        capacity: u32,
        price: Decimal,
    ) -> Result<(), LedgerError> {
        if self.state.contains_key(&id) {
            return Err(LedgerError::AlreadyExists(id));
        }
        if self.state.len() >= MAX_RESOURCES {
            return Err(LedgerError::LimitExceeded("resource count"));
        }

        self.wal_append(vec![Event::ResourceRegistered {
            id,
            kind,
            capacity,
            catalog_status: CatalogStatus::Available,
            price,
        }])
        .await?;
        let rs = ResourceState::new(id, kind, capacity, CatalogStatus::Available, price);
        self.state
            .insert(id, std::sync::Arc::new(tokio::sync::RwLock::new(rs)));

        tracing::info!(resource = %id, ?kind, capacity, "resource registered");
        Ok(())
    }

    /// Flip a resource's catalog status. Existing reservations are left
    /// alone; only new bookings are gated.
    pub async fn set_resource_status(
        &self,
        id: Ulid,
        catalog_status: CatalogStatus,
    ) -> Result<(), LedgerError> {
        let rs = self.get_resource(&id).ok_or(LedgerError::NotFound(id))?;
        let mut guard = rs.write_owned().await;
        self.persist_and_apply(
            &mut guard,
            vec![Event::ResourceStatusSet { id, catalog_status }],
        )
        .await?;
        tracing::info!(resource = %id, ?catalog_status, "catalog status set");
        Ok(())
    }

    /// Book a window on a resource. The customer is resolved before the
    /// resource lock is taken; the availability check runs under the write
    /// lock, so a free answer here cannot be invalidated mid-booking.
    ///
    /// The new reservation starts Pending with the kind's initial hold.
    pub async fn create_reservation(
        &self,
        resource_id: Ulid,
        window: BookingWindow,
        details: &CustomerDetails,
        directory: &dyn CustomerDirectory,
    ) -> Result<ReservationInfo, LedgerError> {
        // External call first. Never await a collaborator under the lock.
        let customer = directory.resolve(details).await?;

        let rs = self
            .get_resource(&resource_id)
            .ok_or(LedgerError::NotFound(resource_id))?;
        let mut guard = rs.write_owned().await;

        if guard.kind != window.kind() {
            return Err(LedgerError::KindMismatch {
                expected: window.kind(),
                got: guard.kind,
            });
        }
        if guard.catalog_status != CatalogStatus::Available {
            return Err(LedgerError::ResourceUnavailable(guard.catalog_status));
        }
        if guard.reservations.len() >= MAX_RESERVATIONS_PER_RESOURCE {
            return Err(LedgerError::LimitExceeded("reservations per resource"));
        }

        let span = window.span();
        let blocking = self.policy.blocking_for(guard.kind);
        if let Err(e) = overlap::check_slot_free(&guard, &span, blocking) {
            metrics::counter!(observability::SLOT_CONFLICTS_TOTAL).increment(1);
            return Err(e);
        }

        let id = Ulid::new();
        let code = self.mint_unique_code(&id)?;
        let at = now_ms();
        let hold_minutes = self.policy.for_kind(guard.kind).initial_hold_minutes;
        let expires_at = at + hold_minutes * 60_000;

        let persisted = self
            .persist_and_apply(
                &mut guard,
                vec![Event::ReservationCreated {
                    id,
                    resource_id,
                    code: code.clone(),
                    window,
                    customer,
                    status: ReservationStatus::Pending,
                    expires_at: Some(expires_at),
                    at,
                }],
            )
            .await;
        if let Err(e) = persisted {
            self.codes.remove(&code);
            return Err(e);
        }

        metrics::counter!(observability::RESERVATIONS_CREATED_TOTAL, "kind" => guard.kind.label())
            .increment(1);
        tracing::info!(reservation = %id, resource = %resource_id, code, "reservation created");

        let row = guard
            .reservation(&id)
            .ok_or(LedgerError::NotFound(id))?;
        Ok(ReservationInfo::from_row(row))
    }

    /// Mint a code not already in use, claiming it in the code index so a
    /// concurrent booking on another resource cannot mint the same one.
    fn mint_unique_code(&self, reservation_id: &Ulid) -> Result<String, LedgerError> {
        for _ in 0..MAX_CODE_MINT_ATTEMPTS {
            let code = ReservationCode::mint();
            let normalized = ReservationCode::normalize(code.as_str());
            let entry = self.codes.entry(normalized.clone());
            if let dashmap::mapref::entry::Entry::Vacant(slot) = entry {
                slot.insert(*reservation_id);
                return Ok(normalized);
            }
        }
        Err(LedgerError::LimitExceeded("code mint attempts"))
    }

    /// Manual cancellation, by staff or the customer. Releases the slot.
    pub async fn cancel_reservation(&self, id: Ulid) -> Result<(), LedgerError> {
        let (resource_id, mut guard) = self.resolve_entity_write(&id).await?;
        let row = guard.reservation(&id).ok_or(LedgerError::NotFound(id))?;
        match row.status {
            ReservationStatus::Pending | ReservationStatus::Confirmed => {}
            from => return Err(LedgerError::InvalidTransition { from }),
        }

        self.persist_and_apply(
            &mut guard,
            vec![Event::ReservationCancelled {
                id,
                resource_id,
                expired: false,
                at: now_ms(),
            }],
        )
        .await?;
        tracing::info!(reservation = %id, "reservation cancelled");
        Ok(())
    }

    /// Room arrival. Only a confirmed room reservation can check in.
    pub async fn check_in(&self, id: Ulid) -> Result<(), LedgerError> {
        let (resource_id, mut guard) = self.resolve_entity_write(&id).await?;
        let row = guard.reservation(&id).ok_or(LedgerError::NotFound(id))?;
        if row.kind != ResourceKind::Room {
            return Err(LedgerError::KindMismatch {
                expected: ResourceKind::Room,
                got: row.kind,
            });
        }
        if row.status != ReservationStatus::Confirmed {
            return Err(LedgerError::InvalidTransition { from: row.status });
        }

        self.persist_and_apply(
            &mut guard,
            vec![Event::CheckedIn {
                id,
                resource_id,
                at: now_ms(),
            }],
        )
        .await?;
        tracing::info!(reservation = %id, "checked in");
        Ok(())
    }

    /// Room departure. Frees the span for rebooking (CheckedOut never
    /// blocks).
    pub async fn check_out(&self, id: Ulid) -> Result<(), LedgerError> {
        let (resource_id, mut guard) = self.resolve_entity_write(&id).await?;
        let row = guard.reservation(&id).ok_or(LedgerError::NotFound(id))?;
        if row.status != ReservationStatus::CheckedIn {
            return Err(LedgerError::InvalidTransition { from: row.status });
        }

        self.persist_and_apply(
            &mut guard,
            vec![Event::CheckedOut {
                id,
                resource_id,
                at: now_ms(),
            }],
        )
        .await?;
        tracing::info!(reservation = %id, "checked out");
        Ok(())
    }
}
