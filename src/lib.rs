//! bookd — reservation allocation and payment confirmation for rooms and
//! banquet halls.
//!
//! An in-memory, WAL-backed engine: resources carry sorted reservation
//! lists, bookings are admitted under a per-resource write lock after an
//! interval-overlap check, pending reservations expire through a
//! background sweep, and confirmation happens by verifying bank-transfer
//! slips against a matching policy. Every mutation is WAL-committed
//! before it is applied, so a restart replays to exactly the state the
//! last caller saw acknowledged.
//!
//! The crate is transport-agnostic: embed [`engine::Engine`] behind
//! whatever API surface the deployment needs, hand it a
//! [`verifier::SlipVerifier`] and a [`customer::CustomerDirectory`], and
//! spawn [`sweeper::run_sweeper`] next to it.

pub mod config;
pub mod customer;
pub mod engine;
pub mod limits;
pub mod model;
pub mod observability;
pub mod sweeper;
pub mod verifier;
pub mod wal;

pub use config::Policy;
pub use engine::{Engine, LedgerError, SlipOutcome};
