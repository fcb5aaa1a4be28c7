//! Payment verification coordinator.
//!
//! The external verifier is called with no lock held; only after its
//! answer is in does the write path take the resource lock and re-check
//! that the reservation is still Pending. A slip that passes matching is
//! recorded and confirmed in one WAL commit, so replay can never observe
//! the payment without its cascade.

use rust_decimal::Decimal;
use tokio::time::timeout;
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;
use crate::observability;
use crate::verifier::{MatchReport, SlipVerifier, VerifierError};

use super::{Engine, LedgerError};

/// What a submitted slip turned into.
#[derive(Debug, Clone)]
pub enum SlipOutcome {
    /// Matched the expected transfer; the reservation is now confirmed and
    /// every other pending payment on it was superseded.
    Confirmed {
        payment: PaymentInfo,
        report: MatchReport,
    },
    /// Recorded for human review. The hold was pushed out so the
    /// reservation survives until someone looks. `report` is `None` when
    /// the verifier could not parse the image at all.
    PendingReview {
        payment: PaymentInfo,
        report: Option<MatchReport>,
    },
}

impl Engine {
    /// Submit a transfer slip against a reservation code.
    ///
    /// Errors that leave no trace: `UnknownCode`, `DuplicateSlip`,
    /// `VerificationUnavailable` (timeout or transport), and losing the
    /// pending-status race. Everything else records a payment.
    pub async fn submit_slip(
        &self,
        code: &str,
        claimed_amount: Decimal,
        image: &[u8],
        slip_ref: Option<String>,
        verifier: &dyn SlipVerifier,
    ) -> Result<SlipOutcome, LedgerError> {
        if image.len() > MAX_SLIP_BYTES {
            return Err(LedgerError::LimitExceeded("slip image size"));
        }

        let normalized = ReservationCode::normalize(code);
        let reservation_id = *self
            .codes
            .get(&normalized)
            .ok_or_else(|| LedgerError::UnknownCode(normalized.clone()))?
            .value();

        // Cheap pre-check so an already-resolved reservation doesn't cost a
        // verifier round trip. The authoritative check runs under the write
        // lock after verification.
        self.require_pending(&reservation_id).await?;

        let verdict = match timeout(
            self.policy.verifier_timeout,
            verifier.verify(image, claimed_amount),
        )
        .await
        {
            Ok(v) => v,
            Err(_) => {
                metrics::counter!(observability::VERIFIER_UNAVAILABLE_TOTAL).increment(1);
                return Err(LedgerError::VerificationUnavailable("timeout".into()));
            }
        };

        match verdict {
            Ok(transfer) => {
                let report = MatchReport::evaluate(&transfer, claimed_amount, &self.policy.matching);
                if report.passes(self.policy.matching.strict_name_match) {
                    self.confirm_slip(reservation_id, claimed_amount, slip_ref, &transfer, report)
                        .await
                } else {
                    tracing::info!(reservation = %reservation_id, ?report, "slip mismatch, held for review");
                    self.record_for_review(
                        reservation_id,
                        claimed_amount,
                        slip_ref,
                        Some(transfer.transaction_at),
                        serde_json::json!({ "report": report }),
                        Some(report),
                    )
                    .await
                }
            }
            Err(VerifierError::Duplicate) => {
                metrics::counter!(observability::DUPLICATE_SLIPS_TOTAL).increment(1);
                Err(LedgerError::DuplicateSlip)
            }
            Err(VerifierError::Transport(msg)) => {
                metrics::counter!(observability::VERIFIER_UNAVAILABLE_TOTAL).increment(1);
                Err(LedgerError::VerificationUnavailable(msg))
            }
            Err(e @ (VerifierError::NotASlip | VerifierError::Other(_))) => {
                tracing::info!(reservation = %reservation_id, error = %e, "unreadable slip, held for review");
                self.record_for_review(
                    reservation_id,
                    claimed_amount,
                    slip_ref,
                    None,
                    serde_json::json!({ "verifier_error": e.to_string() }),
                    None,
                )
                .await
            }
        }
    }

    async fn require_pending(&self, reservation_id: &Ulid) -> Result<(), LedgerError> {
        let resource_id = self
            .resource_for_entity(reservation_id)
            .ok_or(LedgerError::NotFound(*reservation_id))?;
        let rs = self
            .get_resource(&resource_id)
            .ok_or(LedgerError::NotFound(resource_id))?;
        let guard = rs.read().await;
        let row = guard
            .reservation(reservation_id)
            .ok_or(LedgerError::NotFound(*reservation_id))?;
        if row.status != ReservationStatus::Pending {
            return Err(LedgerError::InvalidTransition { from: row.status });
        }
        if row.payments.len() >= MAX_PAYMENTS_PER_RESERVATION {
            return Err(LedgerError::LimitExceeded("payments per reservation"));
        }
        Ok(())
    }

    /// Matched slip: record + confirm + supersede, one WAL commit.
    async fn confirm_slip(
        &self,
        reservation_id: Ulid,
        claimed_amount: Decimal,
        slip_ref: Option<String>,
        transfer: &crate::verifier::VerifiedTransfer,
        report: MatchReport,
    ) -> Result<SlipOutcome, LedgerError> {
        let (resource_id, mut guard) = self.resolve_entity_write(&reservation_id).await?;
        self.check_still_pending(&guard, &reservation_id)?;

        let payment_id = Ulid::new();
        let at = now_ms();
        let paid_at = Some(transfer.transaction_at);
        let metadata = serde_json::json!({
            "report": report,
            "bank": transfer.receiving_bank,
            "account": transfer.receiver_account_masked,
        });

        self.persist_and_apply(
            &mut guard,
            vec![
                Event::PaymentRecorded {
                    id: payment_id,
                    reservation_id,
                    resource_id,
                    method: PaymentMethod::BankTransfer,
                    amount: claimed_amount,
                    status: PaymentStatus::Pending,
                    slip_ref,
                    paid_at,
                    metadata_json: metadata.to_string(),
                    extend_hold_to: None,
                    at,
                },
                Event::PaymentConfirmed {
                    id: payment_id,
                    reservation_id,
                    resource_id,
                    paid_at,
                    at,
                },
            ],
        )
        .await?;

        metrics::counter!(observability::PAYMENTS_CONFIRMED_TOTAL, "path" => "auto").increment(1);
        tracing::info!(reservation = %reservation_id, payment = %payment_id, "slip matched, reservation confirmed");

        let payment = self.payment_info(&guard, &reservation_id, &payment_id)?;
        Ok(SlipOutcome::Confirmed { payment, report })
    }

    /// Unmatched or unreadable slip: record it pending and push the hold
    /// out so the reservation survives until review.
    async fn record_for_review(
        &self,
        reservation_id: Ulid,
        claimed_amount: Decimal,
        slip_ref: Option<String>,
        paid_at: Option<Ms>,
        metadata: serde_json::Value,
        report: Option<MatchReport>,
    ) -> Result<SlipOutcome, LedgerError> {
        let (resource_id, mut guard) = self.resolve_entity_write(&reservation_id).await?;
        self.check_still_pending(&guard, &reservation_id)?;

        let kind = guard
            .reservation(&reservation_id)
            .map(|r| r.kind)
            .ok_or(LedgerError::NotFound(reservation_id))?;
        let payment_id = Ulid::new();
        let at = now_ms();
        let review_hold = at + self.policy.for_kind(kind).post_slip_hold_minutes * 60_000;

        self.persist_and_apply(
            &mut guard,
            vec![Event::PaymentRecorded {
                id: payment_id,
                reservation_id,
                resource_id,
                method: PaymentMethod::BankTransfer,
                amount: claimed_amount,
                status: PaymentStatus::Pending,
                slip_ref,
                paid_at,
                metadata_json: metadata.to_string(),
                extend_hold_to: Some(review_hold),
                at,
            }],
        )
        .await?;

        let payment = self.payment_info(&guard, &reservation_id, &payment_id)?;
        Ok(SlipOutcome::PendingReview { payment, report })
    }

    /// Record a payment by hand, e.g. cash at the front desk. Starts
    /// pending; staff confirm or reject it later. Extends the hold like a
    /// slip under review does.
    pub async fn record_manual_payment(
        &self,
        reservation_id: Ulid,
        method: PaymentMethod,
        amount: Decimal,
    ) -> Result<PaymentInfo, LedgerError> {
        let (resource_id, mut guard) = self.resolve_entity_write(&reservation_id).await?;
        self.check_still_pending(&guard, &reservation_id)?;

        let kind = guard
            .reservation(&reservation_id)
            .map(|r| r.kind)
            .ok_or(LedgerError::NotFound(reservation_id))?;
        let payment_id = Ulid::new();
        let at = now_ms();
        let review_hold = at + self.policy.for_kind(kind).post_slip_hold_minutes * 60_000;

        self.persist_and_apply(
            &mut guard,
            vec![Event::PaymentRecorded {
                id: payment_id,
                reservation_id,
                resource_id,
                method,
                amount,
                status: PaymentStatus::Pending,
                slip_ref: None,
                paid_at: None,
                metadata_json: serde_json::Value::Null.to_string(),
                extend_hold_to: Some(review_hold),
                at,
            }],
        )
        .await?;

        self.payment_info(&guard, &reservation_id, &payment_id)
    }

    /// Staff confirmation of a reviewed payment. Runs the same cascade a
    /// matched slip does. Confirming an already-confirmed payment is a
    /// no-op.
    pub async fn confirm_payment(&self, payment_id: Ulid) -> Result<(), LedgerError> {
        let (resource_id, mut guard) = self.resolve_entity_write(&payment_id).await?;
        let row = guard
            .reservation_for_payment_mut(&payment_id)
            .ok_or(LedgerError::NotFound(payment_id))?;
        let reservation_id = row.id;
        let reservation_status = row.status;
        let payment = row
            .payment(&payment_id)
            .ok_or(LedgerError::NotFound(payment_id))?;

        match payment.status {
            PaymentStatus::Confirmed => return Ok(()),
            PaymentStatus::Rejected => {
                return Err(LedgerError::InvalidTransition {
                    from: reservation_status,
                })
            }
            PaymentStatus::Pending => {}
        }
        if reservation_status != ReservationStatus::Pending {
            return Err(LedgerError::InvalidTransition {
                from: reservation_status,
            });
        }
        let paid_at = payment.paid_at;

        self.persist_and_apply(
            &mut guard,
            vec![Event::PaymentConfirmed {
                id: payment_id,
                reservation_id,
                resource_id,
                paid_at,
                at: now_ms(),
            }],
        )
        .await?;

        metrics::counter!(observability::PAYMENTS_CONFIRMED_TOTAL, "path" => "manual").increment(1);
        tracing::info!(reservation = %reservation_id, payment = %payment_id, "payment confirmed by staff");
        Ok(())
    }

    /// Staff rejection of a reviewed payment. Rejecting the last pending
    /// payment on a still-pending reservation cancels the reservation in
    /// the same commit. Rejecting twice is a no-op.
    pub async fn reject_payment(&self, payment_id: Ulid) -> Result<(), LedgerError> {
        let (resource_id, mut guard) = self.resolve_entity_write(&payment_id).await?;
        let row = guard
            .reservation_for_payment_mut(&payment_id)
            .ok_or(LedgerError::NotFound(payment_id))?;
        let reservation_id = row.id;
        let reservation_status = row.status;
        let payment = row
            .payment(&payment_id)
            .ok_or(LedgerError::NotFound(payment_id))?;

        match payment.status {
            PaymentStatus::Rejected => return Ok(()),
            PaymentStatus::Confirmed => {
                return Err(LedgerError::InvalidTransition {
                    from: reservation_status,
                })
            }
            PaymentStatus::Pending => {}
        }

        let last_pending = row
            .pending_payments()
            .filter(|p| p.id != payment_id)
            .count()
            == 0;
        let cancel_reservation = last_pending && reservation_status == ReservationStatus::Pending;

        self.persist_and_apply(
            &mut guard,
            vec![Event::PaymentRejected {
                id: payment_id,
                reservation_id,
                resource_id,
                cancel_reservation,
                at: now_ms(),
            }],
        )
        .await?;

        metrics::counter!(observability::PAYMENTS_REJECTED_TOTAL, "path" => "manual").increment(1);
        tracing::info!(
            reservation = %reservation_id,
            payment = %payment_id,
            cancel_reservation,
            "payment rejected"
        );
        Ok(())
    }

    fn check_still_pending(
        &self,
        guard: &ResourceState,
        reservation_id: &Ulid,
    ) -> Result<(), LedgerError> {
        let row = guard
            .reservation(reservation_id)
            .ok_or(LedgerError::NotFound(*reservation_id))?;
        if row.status != ReservationStatus::Pending {
            return Err(LedgerError::InvalidTransition { from: row.status });
        }
        if row.payments.len() >= MAX_PAYMENTS_PER_RESERVATION {
            return Err(LedgerError::LimitExceeded("payments per reservation"));
        }
        Ok(())
    }

    fn payment_info(
        &self,
        guard: &ResourceState,
        reservation_id: &Ulid,
        payment_id: &Ulid,
    ) -> Result<PaymentInfo, LedgerError> {
        let row = guard
            .reservation(reservation_id)
            .ok_or(LedgerError::NotFound(*reservation_id))?;
        let payment = row
            .payment(payment_id)
            .ok_or(LedgerError::NotFound(*payment_id))?;
        Ok(PaymentInfo::from_row(*reservation_id, payment))
    }
}
