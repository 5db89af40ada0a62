use std::sync::Arc;

use dtodash_core::{Catalog, CatalogState, DisplayRow, RowStats, map_rows};

/// Catalog-derived state of the dashboard screen.
#[derive(Debug, Clone)]
pub struct DashboardState {
    pub catalog: Arc<Catalog>,
    /// Rows newest first.
    pub rows: Vec<DisplayRow>,
    pub stats: RowStats,
    pub loading: bool,
    pub error: Option<String>,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self::from_state(&CatalogState::default())
    }
}

impl DashboardState {
    pub fn from_state(state: &CatalogState) -> Self {
        let rows = map_rows(state.catalog.as_ref());
        let stats = RowStats::from_rows(&rows);
        Self {
            catalog: state.catalog.clone(),
            rows,
            stats,
            loading: state.loading,
            error: state.error.as_ref().map(|e| e.to_string()),
        }
    }

    /// The table shows the loading line only until the first rows arrive.
    pub fn show_loading(&self) -> bool {
        self.loading && self.rows.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
