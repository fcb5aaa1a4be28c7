use ulid::Ulid;

use crate::model::{CatalogStatus, ReservationStatus, ResourceKind};

#[derive(Debug, Clone, PartialEq)]
pub enum LedgerError {
    /// Malformed or inverted interval input — rejected before touching
    /// storage.
    InvalidInterval(&'static str),
    InvalidFilter(&'static str),
    /// The slot is taken by a blocking reservation. An expected,
    /// user-facing outcome, not a defect.
    SlotUnavailable { conflicting: Ulid },
    /// The resource exists but its catalog status forbids new bookings.
    ResourceUnavailable(CatalogStatus),
    NotFound(Ulid),
    UnknownCode(String),
    AlreadyExists(Ulid),
    KindMismatch {
        expected: ResourceKind,
        got: ResourceKind,
    },
    /// State change not allowed from the current status — a caller bug,
    /// or a race that lost.
    InvalidTransition { from: ReservationStatus },
    /// The verifier reported this slip image was already used. Reservation
    /// state is untouched.
    DuplicateSlip,
    /// Verifier timeout or transport failure. Retryable; no state written.
    VerificationUnavailable(String),
    CustomerUnresolved(String),
    LimitExceeded(&'static str),
    WalError(String),
}

impl LedgerError {
    /// Expected business outcomes, to keep them distinguishable from
    /// genuine defects in logs and metrics.
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            Self::SlotUnavailable { .. } | Self::ResourceUnavailable(_) | Self::DuplicateSlip
        )
    }

    /// Worth retrying with the same input.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::VerificationUnavailable(_) | Self::WalError(_))
    }
}

impl std::fmt::Display for LedgerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerError::InvalidInterval(msg) => write!(f, "invalid interval: {msg}"),
            LedgerError::InvalidFilter(msg) => write!(f, "invalid filter: {msg}"),
            LedgerError::SlotUnavailable { conflicting } => {
                write!(f, "slot unavailable: conflicts with reservation {conflicting}")
            }
            LedgerError::ResourceUnavailable(status) => {
                write!(f, "resource not bookable: catalog status {status:?}")
            }
            LedgerError::NotFound(id) => write!(f, "not found: {id}"),
            LedgerError::UnknownCode(code) => write!(f, "unknown reservation code: {code}"),
            LedgerError::AlreadyExists(id) => write!(f, "already exists: {id}"),
            LedgerError::KindMismatch { expected, got } => {
                write!(f, "window books a {expected:?} but resource is a {got:?}")
            }
            LedgerError::InvalidTransition { from } => {
                write!(f, "transition not allowed from status {from:?}")
            }
            LedgerError::DuplicateSlip => write!(f, "slip already used"),
            LedgerError::VerificationUnavailable(msg) => {
                write!(f, "slip verification unavailable: {msg}")
            }
            LedgerError::CustomerUnresolved(msg) => {
                write!(f, "customer resolution failed: {msg}")
            }
            LedgerError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            LedgerError::WalError(e) => write!(f, "WAL error: {e}"),
        }
    }
}

impl std::error::Error for LedgerError {}
