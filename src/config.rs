//! Engine policy, passed in at construction. Business logic never reads
//! ambient/global state; whoever builds the engine decides these values.

use std::time::Duration;

use rust_decimal::Decimal;

use crate::model::{ResourceKind, ReservationStatus};

/// Per-kind hold and blocking policy.
#[derive(Debug, Clone)]
pub struct KindPolicy {
    /// Hold granted when a reservation is created.
    pub initial_hold_minutes: i64,
    /// Hold granted when a slip lands and a human may need to review it.
    pub post_slip_hold_minutes: i64,
    /// Statuses that count toward the no-overlap invariant for this kind.
    pub blocking: Vec<ReservationStatus>,
}

/// Slip matching policy for the automated verification path.
#[derive(Debug, Clone)]
pub struct MatchingPolicy {
    /// Claimed vs parsed amount tolerance.
    pub amount_epsilon: Decimal,
    pub expected_bank: String,
    /// Last four digits of the receiving account. `None` skips the check;
    /// when set it is always enforced.
    pub expected_account_last4: Option<String>,
    /// Known spellings of the account holder's name.
    pub holder_aliases: Vec<String>,
    /// When false (the default), a name mismatch is reported but does not
    /// block confirmation.
    pub strict_name_match: bool,
}

#[derive(Debug, Clone)]
pub struct Policy {
    pub rooms: KindPolicy,
    pub halls: KindPolicy,
    pub matching: MatchingPolicy,
    pub verifier_timeout: Duration,
    pub sweep_interval: Duration,
    /// WAL appends between automatic compactions.
    pub compact_threshold: u64,
}

impl Policy {
    pub fn for_kind(&self, kind: ResourceKind) -> &KindPolicy {
        match kind {
            ResourceKind::Room => &self.rooms,
            ResourceKind::BanquetHall => &self.halls,
        }
    }

    pub fn blocking_for(&self, kind: ResourceKind) -> &[ReservationStatus] {
        &self.for_kind(kind).blocking
    }
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            rooms: KindPolicy {
                initial_hold_minutes: 30,
                post_slip_hold_minutes: 24 * 60,
                blocking: vec![
                    ReservationStatus::Pending,
                    ReservationStatus::Confirmed,
                    ReservationStatus::CheckedIn,
                ],
            },
            halls: KindPolicy {
                initial_hold_minutes: 30,
                post_slip_hold_minutes: 24 * 60,
                blocking: vec![ReservationStatus::Pending, ReservationStatus::Confirmed],
            },
            matching: MatchingPolicy {
                amount_epsilon: Decimal::new(1, 2), // 0.01
                expected_bank: String::new(),
                expected_account_last4: None,
                holder_aliases: Vec::new(),
                strict_name_match: false,
            },
            verifier_timeout: Duration::from_secs(15),
            sweep_interval: Duration::from_secs(60),
            compact_threshold: 1000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_blocking_sets_differ_per_kind() {
        let p = Policy::default();
        assert!(p
            .blocking_for(ResourceKind::Room)
            .contains(&ReservationStatus::CheckedIn));
        assert!(!p
            .blocking_for(ResourceKind::BanquetHall)
            .contains(&ReservationStatus::CheckedIn));
        // Cancelled never blocks.
        for kind in [ResourceKind::Room, ResourceKind::BanquetHall] {
            assert!(!p.blocking_for(kind).contains(&ReservationStatus::Cancelled));
        }
    }

    #[test]
    fn default_name_matching_is_lenient() {
        let p = Policy::default();
        assert!(!p.matching.strict_name_match);
        assert!(p.matching.expected_account_last4.is_none());
    }
}
