//! Point lookups and listings. All read locks, no mutation.

use ulid::Ulid;

use crate::model::*;

use super::{Engine, LedgerError};

impl Engine {
    pub async fn reservation(&self, id: &Ulid) -> Result<ReservationInfo, LedgerError> {
        let resource_id = self
            .resource_for_entity(id)
            .ok_or(LedgerError::NotFound(*id))?;
        let rs = self
            .get_resource(&resource_id)
            .ok_or(LedgerError::NotFound(resource_id))?;
        let guard = rs.read().await;
        let row = guard.reservation(id).ok_or(LedgerError::NotFound(*id))?;
        Ok(ReservationInfo::from_row(row))
    }

    /// Code lookup is case-insensitive: codes are minted uppercase and the
    /// index is keyed on the normalized form.
    pub async fn find_by_code(&self, code: &str) -> Result<ReservationInfo, LedgerError> {
        let normalized = ReservationCode::normalize(code);
        let id = *self
            .codes
            .get(&normalized)
            .ok_or(LedgerError::UnknownCode(normalized))?
            .value();
        self.reservation(&id).await
    }

    /// Every payment on a reservation, in submission order.
    pub async fn payments(&self, reservation_id: &Ulid) -> Result<Vec<PaymentInfo>, LedgerError> {
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
        Ok(row
            .payments
            .iter()
            .map(|p| PaymentInfo::from_row(row.id, p))
            .collect())
    }

    pub async fn resource_info(&self, id: &Ulid) -> Result<ResourceInfo, LedgerError> {
        let rs = self.get_resource(id).ok_or(LedgerError::NotFound(*id))?;
        let guard = rs.read().await;
        Ok(ResourceInfo::from_state(&guard))
    }

    /// Catalog listing, optionally narrowed to one kind. Ordered by id for
    /// stable pages.
    pub async fn list_resources(
        &self,
        kind: Option<ResourceKind>,
        page: PageRequest,
    ) -> Result<Page<ResourceInfo>, LedgerError> {
        page.validate()?;

        let ids: Vec<Ulid> = self.state.iter().map(|e| *e.key()).collect();
        let mut out = Vec::new();
        for id in ids {
            let Some(rs) = self.get_resource(&id) else { continue };
            let guard = rs.read().await;
            if matches!(kind, Some(k) if guard.kind != k) {
                continue;
            }
            out.push(ResourceInfo::from_state(&guard));
        }
        out.sort_by_key(|r| r.id);
        Ok(Page::slice(out, page))
    }

    /// Reservations on one resource, in span order (the order the state
    /// itself maintains).
    pub async fn reservations_for_resource(
        &self,
        resource_id: &Ulid,
        page: PageRequest,
    ) -> Result<Page<ReservationInfo>, LedgerError> {
        page.validate()?;
        let rs = self
            .get_resource(resource_id)
            .ok_or(LedgerError::NotFound(*resource_id))?;
        let guard = rs.read().await;
        let all: Vec<ReservationInfo> = guard
            .reservations
            .iter()
            .map(ReservationInfo::from_row)
            .collect();
        Ok(Page::slice(all, page))
    }
}
