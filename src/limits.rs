//! Hard caps. Breaching any of these is a `LimitExceeded` error, never a
//! silent truncation.

/// Max bookable resources held by one engine.
pub const MAX_RESOURCES: usize = 100_000;

/// Max reservations (any status) kept on a single resource.
pub const MAX_RESERVATIONS_PER_RESOURCE: usize = 50_000;

/// Max payments recorded against a single reservation.
pub const MAX_PAYMENTS_PER_RESERVATION: usize = 64;

/// Longest allowed room stay, in nights.
pub const MAX_NIGHTS: i64 = 365;

/// Upper bound for `PageRequest::limit`.
pub const MAX_PAGE_SIZE: usize = 500;

/// Reservation code length. 31^8 values keeps collision retries rare.
pub const CODE_LENGTH: usize = 8;

/// Mint attempts before giving up on a collision-free code.
pub const MAX_CODE_MINT_ATTEMPTS: usize = 16;

/// Largest slip image accepted for verification.
pub const MAX_SLIP_BYTES: usize = 10 * 1024 * 1024;
