//! Read-only availability queries. Answers are snapshots: a slot reported
//! free can be taken by the time a booking lands, which is why
//! `create_reservation` re-checks under the write lock.

use rust_decimal::Decimal;
use ulid::Ulid;

use crate::model::*;

use super::{overlap, Engine, LedgerError};

/// Optional catalog predicates for free-resource listings. Catalog
/// predicates are applied before the interval scan.
#[derive(Debug, Clone, Default)]
pub struct FreeFilter {
    pub min_capacity: Option<u32>,
    pub max_price: Option<Decimal>,
}

impl FreeFilter {
    fn validate(&self) -> Result<(), LedgerError> {
        if matches!(self.max_price, Some(p) if p < Decimal::ZERO) {
            return Err(LedgerError::InvalidFilter("max_price must not be negative"));
        }
        Ok(())
    }

    fn admits(&self, rs: &ResourceState) -> bool {
        if matches!(self.min_capacity, Some(min) if rs.capacity < min) {
            return false;
        }
        if matches!(self.max_price, Some(max) if rs.price > max) {
            return false;
        }
        true
    }
}

impl Engine {
    /// Whether `window` can currently be booked on this resource.
    ///
    /// A resource whose catalog status is not `Available` is never free,
    /// regardless of its reservation list.
    pub async fn is_resource_free(
        &self,
        resource_id: &Ulid,
        window: &BookingWindow,
    ) -> Result<bool, LedgerError> {
        let rs = self
            .get_resource(resource_id)
            .ok_or(LedgerError::NotFound(*resource_id))?;
        let guard = rs.read().await;

        if guard.kind != window.kind() {
            return Err(LedgerError::KindMismatch {
                expected: window.kind(),
                got: guard.kind,
            });
        }
        if guard.catalog_status != CatalogStatus::Available {
            return Ok(false);
        }

        let span = window.span();
        let blocking = self.policy.blocking_for(guard.kind);
        Ok(overlap::find_blocking_conflict(&guard, &span, blocking).is_none())
    }

    /// All resources of the window's kind that are free for it, after
    /// catalog filtering. Paginated post-filter; ordered by resource id so
    /// pages are stable across calls.
    pub async fn list_free_resources(
        &self,
        window: &BookingWindow,
        filter: &FreeFilter,
        page: PageRequest,
    ) -> Result<Page<ResourceInfo>, LedgerError> {
        page.validate()?;
        filter.validate()?;

        let kind = window.kind();
        let span = window.span();
        let blocking = self.policy.blocking_for(kind);

        let ids: Vec<Ulid> = self.state.iter().map(|e| *e.key()).collect();
        let mut free = Vec::new();
        for id in ids {
            let Some(rs) = self.get_resource(&id) else { continue };
            let guard = rs.read().await;
            if guard.kind != kind || guard.catalog_status != CatalogStatus::Available {
                continue;
            }
            if !filter.admits(&guard) {
                continue;
            }
            if overlap::find_blocking_conflict(&guard, &span, blocking).is_some() {
                continue;
            }
            free.push(ResourceInfo::from_state(&guard));
        }
        free.sort_by_key(|r| r.id);
        Ok(Page::slice(free, page))
    }
}
