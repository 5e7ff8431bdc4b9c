//! Static grid geometry table for binder pages.
//!
//! Every binder page is a fixed `columns × rows` grid of card slots. Geometry is
//! looked up by a literal identifier stored on the binder's settings; an unknown
//! identifier falls back to the default 3×3 grid so a corrupt or legacy setting
//! never prevents a binder from rendering.

use serde::Serialize;
use thiserror::Error;
use tracing::warn;

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

/// Geometry of one physical card page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GridConfig {
    pub id: &'static str,
    pub columns: u32,
    pub rows: u32,
    /// Always `columns * rows`.
    pub slots_per_page: u32,
}

impl GridConfig {
    const fn new(id: &'static str, columns: u32, rows: u32) -> Self {
        Self {
            id,
            columns,
            rows,
            slots_per_page: columns * rows,
        }
    }

    pub fn slots(&self) -> usize {
        self.slots_per_page as usize
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    #[error("Unknown grid size '{0}'")]
    InvalidGridSize(String),
}

// ────────────────────────────────────────────────────────────────────────────
// Lookup table
// ────────────────────────────────────────────────────────────────────────────

pub const DEFAULT_GRID_ID: &str = "3x3";

/// Small, medium, wide and large pocket pages, ordered by capacity.
pub static GRID_SIZES: [GridConfig; 4] = [
    GridConfig::new("2x2", 2, 2),
    GridConfig::new("3x3", 3, 3),
    GridConfig::new("4x3", 4, 3),
    GridConfig::new("4x4", 4, 4),
];

/// Looks up a grid geometry, failing on unrecognised ids.
pub fn try_resolve(grid_size_id: &str) -> Result<GridConfig, GridError> {
    GRID_SIZES
        .iter()
        .find(|g| g.id == grid_size_id.trim())
        .copied()
        .ok_or_else(|| GridError::InvalidGridSize(grid_size_id.to_string()))
}

/// Looks up a grid geometry, falling back to the default 3×3 grid for unknown ids.
///
/// The fallback is non-fatal: it is logged and the caller proceeds with the default.
pub fn resolve(grid_size_id: &str) -> GridConfig {
    try_resolve(grid_size_id).unwrap_or_else(|e| {
        warn!(grid_size = grid_size_id, "{e}; falling back to {DEFAULT_GRID_ID}");
        default_grid()
    })
}

pub fn default_grid() -> GridConfig {
    GRID_SIZES[1]
}

/// Grids holding strictly more slots per page than `current`, smallest first.
pub fn larger_than(current: &GridConfig) -> impl Iterator<Item = &'static GridConfig> + '_ {
    GRID_SIZES
        .iter()
        .filter(move |g| g.slots_per_page > current.slots_per_page)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_grids_resolve() {
        assert_eq!(resolve("2x2").slots_per_page, 4);
        assert_eq!(resolve("3x3").slots_per_page, 9);
        assert_eq!(resolve("4x3").slots_per_page, 12);
        let large = resolve("4x4");
        assert_eq!((large.columns, large.rows, large.slots_per_page), (4, 4, 16));
    }

    #[test]
    fn test_unknown_grid_falls_back_to_default() {
        let grid = resolve("9x9");
        assert_eq!(grid, default_grid());
        assert_eq!(grid.id, DEFAULT_GRID_ID);
    }

    #[test]
    fn test_try_resolve_reports_invalid_grid_size() {
        assert_eq!(
            try_resolve(""),
            Err(GridError::InvalidGridSize(String::new()))
        );
    }

    #[test]
    fn test_slots_are_columns_times_rows() {
        for grid in &GRID_SIZES {
            assert_eq!(grid.slots_per_page, grid.columns * grid.rows);
        }
    }

    #[test]
    fn test_larger_than_excludes_current_and_smaller() {
        let ids: Vec<_> = larger_than(&resolve("3x3")).map(|g| g.id).collect();
        assert_eq!(ids, vec!["4x3", "4x4"]);
        assert_eq!(larger_than(&resolve("4x4")).count(), 0);
    }
}
