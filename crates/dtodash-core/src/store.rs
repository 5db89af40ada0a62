//! Latest-snapshot cache over a [`CatalogSource`].
//!
//! The store keeps the last successfully fetched catalog and publishes every
//! state change on a [`watch`] channel. A failed refresh records the error but
//! leaves the previous catalog in place, so the display never blanks on a
//! transient failure.

use std::sync::Arc;

use tokio::sync::watch;

use crate::catalog::{Catalog, CatalogSource, format_catalog};
use crate::CoreError;

/// What consumers of the store observe.
#[derive(Debug, Clone)]
pub struct CatalogState {
    pub catalog: Arc<Catalog>,
    pub loading: bool,
    pub error: Option<Arc<CoreError>>,
}

impl Default for CatalogState {
    fn default() -> Self {
        Self {
            catalog: Arc::new(Catalog::default()),
            loading: true,
            error: None,
        }
    }
}

pub struct CatalogStore<C> {
    source: C,
    state: watch::Sender<CatalogState>,
}

impl<C: CatalogSource> CatalogStore<C> {
    /// Create a store in the loading state with an empty catalog.
    pub fn new(source: C) -> Self {
        let (state, _) = watch::channel(CatalogState::default());
        Self { source, state }
    }

    pub fn source(&self) -> &C {
        &self.source
    }

    pub fn snapshot(&self) -> CatalogState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<CatalogState> {
        self.state.subscribe()
    }

    /// Fetch the catalog and replace the cached snapshot on success.
    ///
    /// Concurrent calls are not deduplicated; the last one to finish wins.
    pub async fn load(&self) {
        self.state.send_modify(|s| {
            s.loading = true;
            s.error = None;
        });

        match self.source.fetch_items().await {
            Ok(items) => {
                let catalog = Arc::new(format_catalog(items));
                log::info!("catalog refreshed: {} records", catalog.len());
                self.state.send_modify(|s| {
                    s.catalog = catalog;
                    s.loading = false;
                });
            }
            Err(err) => {
                log::error!("catalog refresh failed: {err}");
                self.state.send_modify(|s| {
                    s.error = Some(Arc::new(err));
                    s.loading = false;
                });
            }
        }
    }

    pub async fn refetch(&self) {
        self.load().await;
    }
}
