use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::engine::LedgerError;
use crate::limits::*;

/// Unix milliseconds — the only time type inside the engine.
pub type Ms = i64;

pub(crate) fn now_ms() -> Ms {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as Ms)
        .unwrap_or(0)
}

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: Ms,
    pub end: Ms,
}

impl Span {
    pub fn new(start: Ms, end: Ms) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    /// `a < d && b > c` — an interval ending exactly when another starts
    /// does not conflict.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn duration_ms(&self) -> Ms {
        self.end - self.start
    }
}

/// The two resource families the engine allocates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Room,
    BanquetHall,
}

impl ResourceKind {
    /// Metric label value.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Room => "room",
            Self::BanquetHall => "banquet_hall",
        }
    }
}

/// Catalog flag, independent of reservations. The engine only reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CatalogStatus {
    Available,
    Occupied,
    Maintenance,
}

/// The booked interval, in the caller's calendar vocabulary.
///
/// Opaque on purpose: the only way to obtain one is through the
/// validating `nights`/`hall_slot` constructors, so `span()` never sees
/// an inverted or overlong window. All day boundaries are computed at
/// UTC midnight so that date-only arithmetic can never shift by a day
/// under local-time offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingWindow(Window);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum Window {
    /// Room stay: `[check_in, check_out)` nights, checkout exclusive.
    Nights {
        check_in: NaiveDate,
        check_out: NaiveDate,
    },
    /// Banquet hall slot: one calendar day plus `[start, end)` time of day.
    HallSlot {
        day: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
    },
}

impl BookingWindow {
    pub fn nights(check_in: NaiveDate, check_out: NaiveDate) -> Result<Self, LedgerError> {
        if check_out <= check_in {
            return Err(LedgerError::InvalidInterval("check-out must be after check-in"));
        }
        if (check_out - check_in).num_days() > MAX_NIGHTS {
            return Err(LedgerError::LimitExceeded("stay too long"));
        }
        Ok(Self(Window::Nights { check_in, check_out }))
    }

    pub fn hall_slot(day: NaiveDate, start: NaiveTime, end: NaiveTime) -> Result<Self, LedgerError> {
        if end <= start {
            return Err(LedgerError::InvalidInterval("slot end must be after start"));
        }
        Ok(Self(Window::HallSlot { day, start, end }))
    }

    /// Which resource family this window can book.
    pub fn kind(&self) -> ResourceKind {
        match self.0 {
            Window::Nights { .. } => ResourceKind::Room,
            Window::HallSlot { .. } => ResourceKind::BanquetHall,
        }
    }

    /// Absolute instant form used for every overlap comparison. Always a
    /// non-empty forward span, by construction.
    pub fn span(&self) -> Span {
        match self.0 {
            Window::Nights { check_in, check_out } => {
                Span::new(utc_midnight_ms(check_in), utc_midnight_ms(check_out))
            }
            Window::HallSlot { day, start, end } => Span::new(
                day.and_time(start).and_utc().timestamp_millis(),
                day.and_time(end).and_utc().timestamp_millis(),
            ),
        }
    }
}

fn utc_midnight_ms(day: NaiveDate) -> Ms {
    day.and_time(NaiveTime::MIN).and_utc().timestamp_millis()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    CheckedIn,
    CheckedOut,
    Cancelled,
}

/// Pending-hold state, modeled as an explicit variant rather than a
/// nullable timestamp acting as a flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Hold {
    None,
    Active(Ms),
}

impl Hold {
    pub fn deadline(&self) -> Option<Ms> {
        match self {
            Self::None => None,
            Self::Active(t) => Some(*t),
        }
    }

    pub fn lapsed(&self, now: Ms) -> bool {
        matches!(self, Self::Active(t) if *t < now)
    }
}

/// Opaque, URL-safe, human-copyable reservation code. Stored uppercase;
/// lookups normalize, so customers can relay it in either case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReservationCode(String);

/// Crockford-style alphabet without 0/O/1/I/L so codes survive being
/// read out loud.
const CODE_ALPHABET: &[u8] = b"23456789ABCDEFGHJKMNPQRSTUVWXYZ";

impl ReservationCode {
    pub fn mint() -> Self {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        let code: String = (0..CODE_LENGTH)
            .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
            .collect();
        Self(code)
    }

    pub fn normalize(raw: &str) -> String {
        raw.trim().to_ascii_uppercase()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ReservationCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ReservationCode {
    fn from(code: String) -> Self {
        Self(code)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    BankTransfer,
    Cash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    Pending,
    Confirmed,
    Rejected,
}

/// Stable identifier minted by the customer collaborator.
pub type CustomerId = String;

#[derive(Debug, Clone, PartialEq)]
pub struct Payment {
    pub id: Ulid,
    pub method: PaymentMethod,
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub slip_ref: Option<String>,
    pub paid_at: Option<Ms>,
    /// Opaque verifier/gateway metadata, kept for audit.
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct Reservation {
    pub id: Ulid,
    pub code: ReservationCode,
    pub resource_id: Ulid,
    pub kind: ResourceKind,
    pub window: BookingWindow,
    pub span: Span,
    pub customer: CustomerId,
    pub status: ReservationStatus,
    pub hold: Hold,
    pub created_at: Ms,
    pub updated_at: Ms,
    pub payments: Vec<Payment>,
}

impl Reservation {
    /// Hold is active only while pending — cleared the instant the status
    /// leaves pending.
    pub fn confirm(&mut self, at: Ms) {
        self.status = ReservationStatus::Confirmed;
        self.hold = Hold::None;
        self.updated_at = at;
    }

    pub fn cancel(&mut self, at: Ms) {
        self.status = ReservationStatus::Cancelled;
        self.hold = Hold::None;
        self.updated_at = at;
    }

    /// Never shortens an existing deadline.
    pub fn extend_hold(&mut self, deadline: Ms, at: Ms) -> Ms {
        let effective = match self.hold {
            Hold::Active(current) => current.max(deadline),
            Hold::None => deadline,
        };
        self.hold = Hold::Active(effective);
        self.updated_at = at;
        effective
    }

    pub fn payment(&self, payment_id: &Ulid) -> Option<&Payment> {
        self.payments.iter().find(|p| p.id == *payment_id)
    }

    pub fn payment_mut(&mut self, payment_id: &Ulid) -> Option<&mut Payment> {
        self.payments.iter_mut().find(|p| p.id == *payment_id)
    }

    pub fn pending_payments(&self) -> impl Iterator<Item = &Payment> {
        self.payments
            .iter()
            .filter(|p| p.status == PaymentStatus::Pending)
    }
}

/// One bookable unit plus every reservation taken on it, sorted by
/// `span.start` so overlap scans can binary-search.
#[derive(Debug, Clone)]
pub struct ResourceState {
    pub id: Ulid,
    pub kind: ResourceKind,
    pub capacity: u32,
    pub catalog_status: CatalogStatus,
    pub price: Decimal,
    pub reservations: Vec<Reservation>,
}

impl ResourceState {
    pub fn new(
        id: Ulid,
        kind: ResourceKind,
        capacity: u32,
        catalog_status: CatalogStatus,
        price: Decimal,
    ) -> Self {
        Self {
            id,
            kind,
            capacity,
            catalog_status,
            price,
            reservations: Vec::new(),
        }
    }

    /// Insert maintaining sort order by span.start.
    pub fn insert_reservation(&mut self, reservation: Reservation) {
        let pos = self
            .reservations
            .binary_search_by_key(&reservation.span.start, |r| r.span.start)
            .unwrap_or_else(|e| e);
        self.reservations.insert(pos, reservation);
    }

    pub fn reservation(&self, id: &Ulid) -> Option<&Reservation> {
        self.reservations.iter().find(|r| r.id == *id)
    }

    pub fn reservation_mut(&mut self, id: &Ulid) -> Option<&mut Reservation> {
        self.reservations.iter_mut().find(|r| r.id == *id)
    }

    /// Reservation owning the given payment, if any.
    pub fn reservation_for_payment_mut(&mut self, payment_id: &Ulid) -> Option<&mut Reservation> {
        self.reservations
            .iter_mut()
            .find(|r| r.payments.iter().any(|p| p.id == *payment_id))
    }

    /// Only reservations whose span overlaps the query window. Skips
    /// everything starting at or after `query.end` via binary search.
    pub fn overlapping(&self, query: &Span) -> impl Iterator<Item = &Reservation> {
        let right_bound = self
            .reservations
            .partition_point(|r| r.span.start < query.end);
        self.reservations[..right_bound]
            .iter()
            .filter(move |r| r.span.end > query.start)
    }
}

// ── WAL record format ────────────────────────────────────────────
//
// Flat, no nesting. Payment metadata travels as JSON text because
// bincode cannot replay a self-describing `serde_json::Value`.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    ResourceRegistered {
        id: Ulid,
        kind: ResourceKind,
        capacity: u32,
        catalog_status: CatalogStatus,
        price: Decimal,
    },
    ResourceStatusSet {
        id: Ulid,
        catalog_status: CatalogStatus,
    },
    ReservationCreated {
        id: Ulid,
        resource_id: Ulid,
        code: String,
        window: BookingWindow,
        customer: CustomerId,
        status: ReservationStatus,
        expires_at: Option<Ms>,
        at: Ms,
    },
    HoldExtended {
        id: Ulid,
        resource_id: Ulid,
        deadline: Ms,
        at: Ms,
    },
    ReservationCancelled {
        id: Ulid,
        resource_id: Ulid,
        /// True only when the expiry sweep did the cancelling.
        expired: bool,
        at: Ms,
    },
    CheckedIn {
        id: Ulid,
        resource_id: Ulid,
        at: Ms,
    },
    CheckedOut {
        id: Ulid,
        resource_id: Ulid,
        at: Ms,
    },
    PaymentRecorded {
        id: Ulid,
        reservation_id: Ulid,
        resource_id: Ulid,
        method: PaymentMethod,
        amount: Decimal,
        status: PaymentStatus,
        slip_ref: Option<String>,
        paid_at: Option<Ms>,
        metadata_json: String,
        /// Post-slip hold extension, applied monotonically.
        extend_hold_to: Option<Ms>,
        at: Ms,
    },
    /// Confirms the payment AND, in the same applied record: rejects every
    /// other pending payment on the reservation, confirms the reservation,
    /// clears the hold.
    PaymentConfirmed {
        id: Ulid,
        reservation_id: Ulid,
        resource_id: Ulid,
        paid_at: Option<Ms>,
        at: Ms,
    },
    PaymentRejected {
        id: Ulid,
        reservation_id: Ulid,
        resource_id: Ulid,
        /// Staff rejected the last pending payment — cancel the
        /// reservation in the same applied record.
        cancel_reservation: bool,
        at: Ms,
    },
}

// ── Query result types ───────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceInfo {
    pub id: Ulid,
    pub kind: ResourceKind,
    pub capacity: u32,
    pub catalog_status: CatalogStatus,
    pub price: Decimal,
}

impl ResourceInfo {
    pub(crate) fn from_state(rs: &ResourceState) -> Self {
        Self {
            id: rs.id,
            kind: rs.kind,
            capacity: rs.capacity,
            catalog_status: rs.catalog_status,
            price: rs.price,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReservationInfo {
    pub id: Ulid,
    pub code: String,
    pub resource_id: Ulid,
    pub kind: ResourceKind,
    pub window: BookingWindow,
    pub span: Span,
    pub customer: CustomerId,
    pub status: ReservationStatus,
    pub expires_at: Option<Ms>,
    pub created_at: Ms,
    pub updated_at: Ms,
}

impl ReservationInfo {
    pub(crate) fn from_row(r: &Reservation) -> Self {
        Self {
            id: r.id,
            code: r.code.as_str().to_string(),
            resource_id: r.resource_id,
            kind: r.kind,
            window: r.window,
            span: r.span,
            customer: r.customer.clone(),
            status: r.status,
            expires_at: r.hold.deadline(),
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentInfo {
    pub id: Ulid,
    pub reservation_id: Ulid,
    pub method: PaymentMethod,
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub slip_ref: Option<String>,
    pub paid_at: Option<Ms>,
    pub metadata: serde_json::Value,
}

impl PaymentInfo {
    pub(crate) fn from_row(reservation_id: Ulid, p: &Payment) -> Self {
        Self {
            id: p.id,
            reservation_id,
            method: p.method,
            amount: p.amount,
            status: p.status,
            slip_ref: p.slip_ref.clone(),
            paid_at: p.paid_at,
            metadata: p.metadata.clone(),
        }
    }
}

// ── Pagination ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct PageRequest {
    pub offset: usize,
    pub limit: usize,
}

impl PageRequest {
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.limit == 0 {
            return Err(LedgerError::InvalidFilter("page limit must be positive"));
        }
        if self.limit > MAX_PAGE_SIZE {
            return Err(LedgerError::InvalidFilter("page limit too large"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
}

impl<T> Page<T> {
    /// Paginate AFTER filtering — overlap filtering is not expressible as
    /// a storage range scan, so the full filtered set is cut here.
    pub fn slice(mut all: Vec<T>, req: PageRequest) -> Self {
        let total = all.len();
        let items: Vec<T> = if req.offset >= total {
            Vec::new()
        } else {
            all.drain(req.offset..(req.offset + req.limit).min(total))
                .collect()
        };
        Self {
            items,
            total,
            offset: req.offset,
            limit: req.limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn t(s: &str) -> NaiveTime {
        s.parse().unwrap()
    }

    #[test]
    fn span_overlap_half_open() {
        let a = Span::new(100, 200);
        let b = Span::new(150, 250);
        let c = Span::new(200, 300);
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c)); // adjacent, not overlapping
        assert!(!c.overlaps(&a));
    }

    #[test]
    fn nights_window_is_utc_midnight_to_midnight() {
        let w = BookingWindow::nights(d("2025-08-20"), d("2025-08-22")).unwrap();
        let span = w.span();
        // 2025-08-20T00:00:00Z
        assert_eq!(span.start, 1_755_648_000_000);
        assert_eq!(span.duration_ms(), 2 * 24 * 3_600_000);
    }

    #[test]
    fn nights_checkout_exclusive_means_back_to_back_ok() {
        let first = BookingWindow::nights(d("2025-08-20"), d("2025-08-22")).unwrap();
        let second = BookingWindow::nights(d("2025-08-22"), d("2025-08-24")).unwrap();
        assert!(!first.span().overlaps(&second.span()));
    }

    #[test]
    fn inverted_windows_rejected() {
        assert!(matches!(
            BookingWindow::nights(d("2025-08-22"), d("2025-08-22")),
            Err(LedgerError::InvalidInterval(_))
        ));
        assert!(matches!(
            BookingWindow::hall_slot(d("2025-08-22"), t("18:00:00"), t("18:00:00")),
            Err(LedgerError::InvalidInterval(_))
        ));
        assert!(matches!(
            BookingWindow::hall_slot(d("2025-08-22"), t("18:00:00"), t("12:00:00")),
            Err(LedgerError::InvalidInterval(_))
        ));
    }

    #[test]
    fn overlong_stay_rejected() {
        let result = BookingWindow::nights(d("2025-01-01"), d("2027-01-01"));
        assert!(matches!(result, Err(LedgerError::LimitExceeded(_))));
    }

    #[test]
    fn hall_slots_same_day_disjoint_times() {
        let lunch = BookingWindow::hall_slot(d("2025-08-22"), t("11:00:00"), t("14:00:00")).unwrap();
        let dinner = BookingWindow::hall_slot(d("2025-08-22"), t("18:00:00"), t("22:00:00")).unwrap();
        assert!(!lunch.span().overlaps(&dinner.span()));
        let clash = BookingWindow::hall_slot(d("2025-08-22"), t("13:00:00"), t("19:00:00")).unwrap();
        assert!(lunch.span().overlaps(&clash.span()));
        assert!(dinner.span().overlaps(&clash.span()));
    }

    #[test]
    fn constructed_windows_always_span_forward() {
        // The constructors are the only way to build a window, so every
        // span an overlap check sees is non-empty and forward.
        let w = BookingWindow::nights(d("2025-08-20"), d("2025-08-21")).unwrap();
        assert!(w.span().start < w.span().end);
        let h = BookingWindow::hall_slot(d("2025-08-22"), t("09:00:00"), t("12:00:00")).unwrap();
        assert!(h.span().start < h.span().end);
    }

    #[test]
    fn resource_kind_metric_labels() {
        assert_eq!(ResourceKind::Room.label(), "room");
        assert_eq!(ResourceKind::BanquetHall.label(), "banquet_hall");
    }

    #[test]
    fn window_kind_mapping() {
        let w = BookingWindow::nights(d("2025-08-20"), d("2025-08-21")).unwrap();
        assert_eq!(w.kind(), ResourceKind::Room);
        let h = BookingWindow::hall_slot(d("2025-08-22"), t("09:00:00"), t("12:00:00")).unwrap();
        assert_eq!(h.kind(), ResourceKind::BanquetHall);
    }

    #[test]
    fn code_mint_shape_and_normalize() {
        let code = ReservationCode::mint();
        assert_eq!(code.as_str().len(), CODE_LENGTH);
        assert!(code.as_str().bytes().all(|b| CODE_ALPHABET.contains(&b)));
        let lowered = code.as_str().to_ascii_lowercase();
        assert_eq!(ReservationCode::normalize(&lowered), code.as_str());
        assert_eq!(ReservationCode::normalize("  ab2c  "), "AB2C");
    }

    #[test]
    fn hold_lapse() {
        assert!(!Hold::None.lapsed(1000));
        assert!(Hold::Active(999).lapsed(1000));
        assert!(!Hold::Active(1000).lapsed(1000));
    }

    #[test]
    fn reservation_ordering_and_overlap_scan() {
        let mut rs = ResourceState::new(
            Ulid::new(),
            ResourceKind::Room,
            1,
            CatalogStatus::Available,
            Decimal::ZERO,
        );
        for (a, b) in [(300, 400), (100, 200), (200, 300)] {
            rs.insert_reservation(test_reservation(rs.id, a, b));
        }
        assert_eq!(rs.reservations[0].span.start, 100);
        assert_eq!(rs.reservations[1].span.start, 200);
        assert_eq!(rs.reservations[2].span.start, 300);

        let hits: Vec<_> = rs.overlapping(&Span::new(250, 350)).collect();
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn overlapping_adjacent_not_included() {
        let mut rs = ResourceState::new(
            Ulid::new(),
            ResourceKind::Room,
            1,
            CatalogStatus::Available,
            Decimal::ZERO,
        );
        rs.insert_reservation(test_reservation(rs.id, 100, 200));
        assert_eq!(rs.overlapping(&Span::new(200, 300)).count(), 0);
        assert_eq!(rs.overlapping(&Span::new(0, 100)).count(), 0);
    }

    #[test]
    fn extend_hold_is_monotonic() {
        let mut r = test_reservation(Ulid::new(), 0, 100);
        r.hold = Hold::Active(5_000);
        assert_eq!(r.extend_hold(3_000, 1), 5_000); // never shortened
        assert_eq!(r.extend_hold(9_000, 2), 9_000);
        assert_eq!(r.hold, Hold::Active(9_000));
    }

    #[test]
    fn confirm_and_cancel_clear_hold() {
        let mut r = test_reservation(Ulid::new(), 0, 100);
        r.hold = Hold::Active(5_000);
        r.confirm(42);
        assert_eq!(r.status, ReservationStatus::Confirmed);
        assert_eq!(r.hold, Hold::None);

        let mut r2 = test_reservation(Ulid::new(), 0, 100);
        r2.hold = Hold::Active(5_000);
        r2.cancel(42);
        assert_eq!(r2.status, ReservationStatus::Cancelled);
        assert_eq!(r2.hold, Hold::None);
    }

    #[test]
    fn page_slice_after_filtering() {
        let all: Vec<u32> = (0..7).collect();
        let page = Page::slice(all.clone(), PageRequest { offset: 5, limit: 5 });
        assert_eq!(page.items, vec![5, 6]);
        assert_eq!(page.total, 7);

        let past_end = Page::slice(all, PageRequest { offset: 10, limit: 5 });
        assert!(past_end.items.is_empty());
        assert_eq!(past_end.total, 7);
    }

    #[test]
    fn event_serialization_roundtrip() {
        let event = Event::ReservationCreated {
            id: Ulid::new(),
            resource_id: Ulid::new(),
            code: "AB2CD3EF".into(),
            window: BookingWindow::nights(d("2025-08-20"), d("2025-08-22")).unwrap(),
            customer: "cust-1".into(),
            status: ReservationStatus::Pending,
            expires_at: Some(1_755_649_800_000),
            at: 1_755_648_000_000,
        };
        let bytes = bincode::serialize(&event).unwrap();
        let decoded: Event = bincode::deserialize(&bytes).unwrap();
        assert_eq!(event, decoded);
    }

    #[test]
    fn payment_event_with_decimal_roundtrip() {
        let event = Event::PaymentRecorded {
            id: Ulid::new(),
            reservation_id: Ulid::new(),
            resource_id: Ulid::new(),
            method: PaymentMethod::BankTransfer,
            amount: "2000.50".parse().unwrap(),
            status: PaymentStatus::Pending,
            slip_ref: Some("slips/abc.jpg".into()),
            paid_at: None,
            metadata_json: r#"{"bank":"KBANK"}"#.into(),
            extend_hold_to: Some(99),
            at: 1,
        };
        let bytes = bincode::serialize(&event).unwrap();
        let decoded: Event = bincode::deserialize(&bytes).unwrap();
        assert_eq!(event, decoded);
    }

    fn test_reservation(resource_id: Ulid, start: Ms, end: Ms) -> Reservation {
        Reservation {
            id: Ulid::new(),
            code: ReservationCode::mint(),
            resource_id,
            kind: ResourceKind::Room,
            window: BookingWindow::nights(d("2025-01-01"), d("2025-01-02")).unwrap(),
            span: Span::new(start, end),
            customer: "cust".into(),
            status: ReservationStatus::Pending,
            hold: Hold::None,
            created_at: 0,
            updated_at: 0,
            payments: Vec::new(),
        }
    }
}
