//! Shared, swappable catalog.

use std::sync::{Arc, PoisonError, RwLock};

use super::{Catalog, CatalogResult, CatalogSource};

/// Holder for the active catalog.
///
/// Readers take an `Arc` snapshot and keep using it for the whole call.
/// `replace` swaps the entire catalog at once, so no reader ever sees a mix
/// of old and new entries.
#[derive(Debug)]
pub struct CatalogHandle {
    current: RwLock<Arc<Catalog>>,
}

impl CatalogHandle {
    pub fn new(catalog: Catalog) -> Self {
        Self::from_arc(Arc::new(catalog))
    }

    pub fn from_arc(catalog: Arc<Catalog>) -> Self {
        Self {
            current: RwLock::new(catalog),
        }
    }

    /// Snapshot of the active catalog.
    pub fn current(&self) -> Arc<Catalog> {
        // The slot only ever holds a complete Arc, so a poisoned lock is still usable.
        self.current.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Install `catalog`, returning the one it replaced.
    pub fn replace(&self, catalog: Catalog) -> Arc<Catalog> {
        let next = Arc::new(catalog);
        let mut slot = self.current.write().unwrap_or_else(PoisonError::into_inner);
        tracing::info!(
            from = %slot.fingerprint(),
            to = %next.fingerprint(),
            "reference catalog replaced"
        );
        std::mem::replace(&mut *slot, next)
    }

    /// Load from `source` and install it. On error the active catalog is kept.
    pub fn reload(&self, source: &CatalogSource) -> CatalogResult<Arc<Catalog>> {
        let catalog = Catalog::load(source)?;
        self.replace(catalog);
        Ok(self.current())
    }
}
