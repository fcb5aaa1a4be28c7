use crate::model::*;

use super::LedgerError;

/// First blocking reservation whose interval overlaps `span`, if any.
///
/// Pure read over the sorted reservation list; only statuses in the
/// kind's blocking set count toward the no-overlap invariant.
pub fn find_blocking_conflict<'a>(
    rs: &'a ResourceState,
    span: &Span,
    blocking: &[ReservationStatus],
) -> Option<&'a Reservation> {
    rs.overlapping(span).find(|r| blocking.contains(&r.status))
}

/// `Err(SlotUnavailable)` when the span is taken. Used both by the
/// read-only availability path and by the write-side re-check inside
/// `create_reservation` — same blocking-set definition by construction.
pub(super) fn check_slot_free(
    rs: &ResourceState,
    span: &Span,
    blocking: &[ReservationStatus],
) -> Result<(), LedgerError> {
    match find_blocking_conflict(rs, span, blocking) {
        Some(conflict) => Err(LedgerError::SlotUnavailable {
            conflicting: conflict.id,
        }),
        None => Ok(()),
    }
}
