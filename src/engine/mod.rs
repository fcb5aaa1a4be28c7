mod availability;
mod error;
mod holds;
mod ledger;
mod overlap;
mod payments;
mod queries;

pub use availability::FreeFilter;
pub use error::LedgerError;
pub use overlap::find_blocking_conflict;
pub use payments::SlipOutcome;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{mpsc, oneshot, RwLock};
use ulid::Ulid;

use crate::config::Policy;
use crate::model::*;
use crate::wal::Wal;

pub type SharedResourceState = Arc<RwLock<ResourceState>>;

// ── Group-commit WAL channel ─────────────────────────────────────

pub(super) enum WalCommand {
    /// One logical mutation. All events land in the same flush, in order,
    /// so a crash can only ever drop a suffix of the mutation.
    Append {
        events: Vec<Event>,
        response: oneshot::Sender<io::Result<()>>,
    },
    Compact {
        events: Vec<Event>,
        /// Append count observed before the snapshot was taken. The writer
        /// refuses the swap if any append committed since: that record
        /// would be missing from the compact file and the rename would
        /// drop it.
        expected_appends: u64,
        response: oneshot::Sender<io::Result<()>>,
    },
    AppendsSinceCompact {
        response: oneshot::Sender<u64>,
    },
}

/// Background task owning the WAL. Batches whatever appends are already
/// queued behind the first one into a single fsync (group commit), then
/// answers every sender at once.
async fn wal_writer_loop(mut wal: Wal, mut rx: mpsc::Receiver<WalCommand>) {
    while let Some(cmd) = rx.recv().await {
        let WalCommand::Append { events, response } = cmd else {
            handle_non_append(&mut wal, cmd);
            continue;
        };

        let mut batch = vec![(events, response)];
        let mut deferred = None;
        while let Ok(next) = rx.try_recv() {
            match next {
                WalCommand::Append { events, response } => batch.push((events, response)),
                other => {
                    // Commit what we have, then run the non-append command.
                    deferred = Some(other);
                    break;
                }
            }
        }

        commit_batch(&mut wal, batch);
        if let Some(cmd) = deferred {
            handle_non_append(&mut wal, cmd);
        }
    }
}

fn commit_batch(wal: &mut Wal, mut batch: Vec<(Vec<Event>, oneshot::Sender<io::Result<()>>)>) {
    let event_count: usize = batch.iter().map(|(events, _)| events.len()).sum();
    metrics::histogram!(crate::observability::WAL_FLUSH_BATCH_SIZE).record(event_count as f64);

    let flush_start = std::time::Instant::now();
    let mut result = Ok(());
    'append: for (events, _) in &batch {
        for event in events {
            if let Err(e) = wal.append_buffered(event) {
                result = Err(e);
                break 'append;
            }
        }
    }
    // Always flush — even after an append error — so partially buffered
    // bytes don't leak into the next batch (these callers get an Err).
    let flush_result = wal.flush_sync();
    if result.is_ok() {
        result = flush_result;
    }
    metrics::histogram!(crate::observability::WAL_FLUSH_DURATION_SECONDS)
        .record(flush_start.elapsed().as_secs_f64());

    for (_, tx) in batch.drain(..) {
        let r = match &result {
            Ok(()) => Ok(()),
            Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
        };
        let _ = tx.send(r);
    }
}

fn handle_non_append(wal: &mut Wal, cmd: WalCommand) {
    match cmd {
        WalCommand::Compact {
            events,
            expected_appends,
            response,
        } => {
            let result = if wal.appends_since_compact() != expected_appends {
                // An acknowledged append landed after the snapshot; the
                // compact file does not contain it. Next tick retries.
                Err(io::Error::other("WAL advanced during compaction snapshot"))
            } else {
                Wal::write_compact_file(wal.path(), &events)
                    .and_then(|()| wal.swap_compact_file())
            };
            let _ = response.send(result);
        }
        WalCommand::AppendsSinceCompact { response } => {
            let _ = response.send(wal.appends_since_compact());
        }
        WalCommand::Append { .. } => unreachable!(),
    }
}

/// The reservation engine: the single writer of reservation and payment
/// state. Every mutation runs under one per-resource write lock bracketing
/// its read-validate-write cycle, and is WAL-committed before it is applied
/// — that lock is the transactional boundary for invariants I1–I4.
pub struct Engine {
    pub(super) state: DashMap<Ulid, SharedResourceState>,
    pub(super) wal_tx: mpsc::Sender<WalCommand>,
    /// Reverse lookup: reservation or payment id → resource id.
    pub(super) entity_to_resource: DashMap<Ulid, Ulid>,
    /// Normalized reservation code → reservation id.
    pub(super) codes: DashMap<String, Ulid>,
    pub(super) policy: Policy,
}

/// Apply an event to a ResourceState. No locking — the caller holds the
/// write lock (or sole ownership during replay). Events were validated
/// before they were appended, so application is infallible; an event that
/// no longer matches anything is skipped.
fn apply_to_resource(
    rs: &mut ResourceState,
    event: &Event,
    entities: &DashMap<Ulid, Ulid>,
    codes: &DashMap<String, Ulid>,
) {
    match event {
        Event::ReservationCreated {
            id,
            resource_id,
            code,
            window,
            customer,
            status,
            expires_at,
            at,
        } => {
            rs.insert_reservation(Reservation {
                id: *id,
                code: code.clone().into(),
                resource_id: *resource_id,
                kind: window.kind(),
                window: *window,
                span: window.span(),
                customer: customer.clone(),
                status: *status,
                hold: match expires_at {
                    Some(t) => Hold::Active(*t),
                    None => Hold::None,
                },
                created_at: *at,
                updated_at: *at,
                payments: Vec::new(),
            });
            entities.insert(*id, *resource_id);
            codes.insert(code.clone(), *id);
        }
        Event::HoldExtended { id, deadline, at, .. } => {
            if let Some(r) = rs.reservation_mut(id) {
                r.extend_hold(*deadline, *at);
            }
        }
        Event::ReservationCancelled { id, at, .. } => {
            if let Some(r) = rs.reservation_mut(id) {
                r.cancel(*at);
            }
        }
        Event::CheckedIn { id, at, .. } => {
            if let Some(r) = rs.reservation_mut(id) {
                r.status = ReservationStatus::CheckedIn;
                r.updated_at = *at;
            }
        }
        Event::CheckedOut { id, at, .. } => {
            if let Some(r) = rs.reservation_mut(id) {
                r.status = ReservationStatus::CheckedOut;
                r.updated_at = *at;
            }
        }
        Event::PaymentRecorded {
            id,
            reservation_id,
            resource_id,
            method,
            amount,
            status,
            slip_ref,
            paid_at,
            metadata_json,
            extend_hold_to,
            at,
        } => {
            if let Some(r) = rs.reservation_mut(reservation_id) {
                r.payments.push(Payment {
                    id: *id,
                    method: *method,
                    amount: *amount,
                    status: *status,
                    slip_ref: slip_ref.clone(),
                    paid_at: *paid_at,
                    metadata: serde_json::from_str(metadata_json)
                        .unwrap_or(serde_json::Value::Null),
                });
                if let Some(deadline) = extend_hold_to
                    && r.status == ReservationStatus::Pending {
                        r.extend_hold(*deadline, *at);
                    }
                r.updated_at = *at;
                entities.insert(*id, *resource_id);
            }
        }
        Event::PaymentConfirmed {
            id,
            reservation_id,
            paid_at,
            at,
            ..
        } => {
            if let Some(r) = rs.reservation_mut(reservation_id) {
                // One record, three effects: winner confirmed, the rest of
                // the pending payments superseded, reservation confirmed.
                for p in r.payments.iter_mut() {
                    if p.id == *id {
                        p.status = PaymentStatus::Confirmed;
                        p.paid_at = *paid_at;
                    } else if p.status == PaymentStatus::Pending {
                        p.status = PaymentStatus::Rejected;
                    }
                }
                r.confirm(*at);
            }
        }
        Event::PaymentRejected {
            id,
            reservation_id,
            cancel_reservation,
            at,
            ..
        } => {
            if let Some(r) = rs.reservation_mut(reservation_id) {
                if let Some(p) = r.payment_mut(id) {
                    p.status = PaymentStatus::Rejected;
                }
                if *cancel_reservation && r.status == ReservationStatus::Pending {
                    r.cancel(*at);
                } else {
                    r.updated_at = *at;
                }
            }
        }
        // Resource registration/status is handled at the DashMap level.
        Event::ResourceRegistered { .. } => {}
        Event::ResourceStatusSet { catalog_status, .. } => {
            rs.catalog_status = *catalog_status;
        }
    }
}

impl Engine {
    pub fn new(wal_path: PathBuf, policy: Policy) -> io::Result<Self> {
        let events = Wal::replay(&wal_path)?;
        let wal = Wal::open(&wal_path)?;
        let (wal_tx, wal_rx) = mpsc::channel(4096);
        tokio::spawn(wal_writer_loop(wal, wal_rx));

        let engine = Self {
            state: DashMap::new(),
            wal_tx,
            entity_to_resource: DashMap::new(),
            codes: DashMap::new(),
            policy,
        };

        // Replay into plain state first; locks are wrapped around each
        // resource only once its history is fully applied.
        let mut replayed: std::collections::HashMap<Ulid, ResourceState> =
            std::collections::HashMap::new();
        for event in &events {
            match event {
                Event::ResourceRegistered {
                    id,
                    kind,
                    capacity,
                    catalog_status,
                    price,
                } => {
                    replayed.insert(
                        *id,
                        ResourceState::new(*id, *kind, *capacity, *catalog_status, *price),
                    );
                }
                other => {
                    if let Some(resource_id) = event_resource_id(other)
                        && let Some(rs) = replayed.get_mut(&resource_id)
                    {
                        apply_to_resource(rs, other, &engine.entity_to_resource, &engine.codes);
                    }
                }
            }
        }
        for (id, rs) in replayed {
            engine.state.insert(id, Arc::new(RwLock::new(rs)));
        }

        Ok(engine)
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Commit one logical mutation to the WAL via the group-commit writer.
    pub(super) async fn wal_append(&self, events: Vec<Event>) -> Result<(), LedgerError> {
        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Append { events, response: tx })
            .await
            .map_err(|_| LedgerError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| LedgerError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| LedgerError::WalError(e.to_string()))
    }

    pub(super) fn get_resource(&self, id: &Ulid) -> Option<SharedResourceState> {
        self.state.get(id).map(|e| e.value().clone())
    }

    pub(super) fn resource_for_entity(&self, entity_id: &Ulid) -> Option<Ulid> {
        self.entity_to_resource.get(entity_id).map(|e| *e.value())
    }

    /// WAL-commit then apply, in order, under the caller's write lock.
    pub(super) async fn persist_and_apply(
        &self,
        rs: &mut ResourceState,
        events: Vec<Event>,
    ) -> Result<(), LedgerError> {
        self.wal_append(events.clone()).await?;
        for event in &events {
            apply_to_resource(rs, event, &self.entity_to_resource, &self.codes);
        }
        Ok(())
    }

    /// Lookup entity → resource, then acquire the resource write lock.
    pub(super) async fn resolve_entity_write(
        &self,
        entity_id: &Ulid,
    ) -> Result<(Ulid, tokio::sync::OwnedRwLockWriteGuard<ResourceState>), LedgerError> {
        let resource_id = self
            .resource_for_entity(entity_id)
            .ok_or(LedgerError::NotFound(*entity_id))?;
        let rs = self
            .get_resource(&resource_id)
            .ok_or(LedgerError::NotFound(resource_id))?;
        let guard = rs.write_owned().await;
        Ok((resource_id, guard))
    }

    /// Rewrite the WAL with the minimal event set recreating current state.
    ///
    /// The snapshot is taken resource by resource under briefly-held read
    /// locks, so mutations can land while it is being built. The append
    /// count captured here lets the writer detect that and refuse the
    /// swap instead of discarding an acknowledged record; the compactor
    /// loop retries on its next tick.
    pub async fn compact_wal(&self) -> Result<(), LedgerError> {
        let expected_appends = self.wal_appends_since_compact().await;
        let mut events = Vec::new();
        let resource_ids: Vec<Ulid> = self.state.iter().map(|e| *e.key()).collect();

        for id in resource_ids {
            let Some(rs) = self.get_resource(&id) else { continue };
            let guard = rs.read().await;

            events.push(Event::ResourceRegistered {
                id: guard.id,
                kind: guard.kind,
                capacity: guard.capacity,
                catalog_status: guard.catalog_status,
                price: guard.price,
            });
            for r in &guard.reservations {
                events.push(Event::ReservationCreated {
                    id: r.id,
                    resource_id: guard.id,
                    code: r.code.as_str().to_string(),
                    window: r.window,
                    customer: r.customer.clone(),
                    status: r.status,
                    expires_at: r.hold.deadline(),
                    at: r.created_at,
                });
                for p in &r.payments {
                    events.push(Event::PaymentRecorded {
                        id: p.id,
                        reservation_id: r.id,
                        resource_id: guard.id,
                        method: p.method,
                        amount: p.amount,
                        status: p.status,
                        slip_ref: p.slip_ref.clone(),
                        paid_at: p.paid_at,
                        metadata_json: p.metadata.to_string(),
                        extend_hold_to: None,
                        at: r.updated_at,
                    });
                }
            }
        }

        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Compact {
                events,
                expected_appends,
                response: tx,
            })
            .await
            .map_err(|_| LedgerError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| LedgerError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| LedgerError::WalError(e.to_string()))
    }

    pub async fn wal_appends_since_compact(&self) -> u64 {
        let (tx, rx) = oneshot::channel();
        if self
            .wal_tx
            .send(WalCommand::AppendsSinceCompact { response: tx })
            .await
            .is_err()
        {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}

/// Extract the resource id from a non-registration event.
fn event_resource_id(event: &Event) -> Option<Ulid> {
    match event {
        Event::ReservationCreated { resource_id, .. }
        | Event::HoldExtended { resource_id, .. }
        | Event::ReservationCancelled { resource_id, .. }
        | Event::CheckedIn { resource_id, .. }
        | Event::CheckedOut { resource_id, .. }
        | Event::PaymentRecorded { resource_id, .. }
        | Event::PaymentConfirmed { resource_id, .. }
        | Event::PaymentRejected { resource_id, .. } => Some(*resource_id),
        Event::ResourceStatusSet { id, .. } => Some(*id),
        Event::ResourceRegistered { .. } => None,
    }
}
