//! Page arithmetic: occupancy, page counts and the on-screen page pair.
//!
//! A binder opens on logical page 0: the cover on the left, physical card page 0
//! on the right. Every later logical page is a left/right pair of physical card
//! pages, so logical page `n > 0` shows physical pages `2n - 1` and `2n`.
//!
//! Everything here is pure and synchronous.

use serde::Serialize;

use crate::binder::models::{BinderSettings, CardEntry};
use crate::binder::store::PositionStore;
use crate::layout::grid::{self, GridConfig};

// ────────────────────────────────────────────────────────────────────────────
// Page counting
// ────────────────────────────────────────────────────────────────────────────

/// Number of physical card pages in a binder of `stored_page_count` logical pages.
///
/// Page 0 holds a single card page; every other logical page holds two.
pub fn physical_card_page_count(stored_page_count: u32) -> u32 {
    if stored_page_count <= 1 {
        1
    } else {
        (stored_page_count - 1).saturating_mul(2).saturating_add(1)
    }
}

/// Physical card pages needed to hold every slot up to `max_occupied_position`.
pub fn required_physical_pages(max_occupied_position: Option<usize>, slots_per_page: usize) -> usize {
    max_occupied_position.map_or(0, |max| max / slots_per_page.max(1) + 1)
}

/// Logical pages needed to show `required_physical_pages` card pages.
///
/// Saturates at `u32::MAX`, which no binder's `max_pages` can satisfy.
pub fn required_logical_pages(required_physical_pages: usize) -> u32 {
    if required_physical_pages <= 1 {
        1
    } else {
        u32::try_from((required_physical_pages - 1).div_ceil(2))
            .map_or(u32::MAX, |pairs| pairs.saturating_add(1))
    }
}

/// Logical pages the binder actually has: never fewer than occupancy needs,
/// the stored page count, or the configured minimum.
pub fn total_logical_pages(required_logical_pages: u32, stored_page_count: u32, min_pages: u32) -> u32 {
    required_logical_pages.max(stored_page_count).max(min_pages)
}

// ────────────────────────────────────────────────────────────────────────────
// Snapshot of a binder's layout
// ────────────────────────────────────────────────────────────────────────────

/// Derived page and capacity figures for one binder state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LayoutMetrics {
    pub grid: GridConfig,
    pub occupancy: usize,
    pub max_occupied_position: Option<usize>,
    pub required_physical_pages: usize,
    pub required_logical_pages: u32,
    pub total_logical_pages: u32,
    pub physical_pages: u32,
    pub capacity: usize,
    pub remaining: usize,
}

impl LayoutMetrics {
    pub fn compute(store: &PositionStore, settings: &BinderSettings) -> Self {
        Self::with_grid(store, settings, grid::resolve(&settings.grid_size))
    }

    pub fn with_grid(store: &PositionStore, settings: &BinderSettings, grid: GridConfig) -> Self {
        let max_occupied_position = store.max_occupied_position();
        let required_physical = required_physical_pages(max_occupied_position, grid.slots());
        let required_logical = required_logical_pages(required_physical);
        let total = total_logical_pages(required_logical, settings.page_count, settings.min_pages);
        let physical_pages = physical_card_page_count(total);
        let capacity = (physical_pages as usize).saturating_mul(grid.slots());
        let occupancy = store.len();

        Self {
            grid,
            occupancy,
            max_occupied_position,
            required_physical_pages: required_physical,
            required_logical_pages: required_logical,
            total_logical_pages: total,
            physical_pages,
            capacity,
            remaining: capacity.saturating_sub(occupancy),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Page pairs and slices
// ────────────────────────────────────────────────────────────────────────────

/// What one side of an open binder shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageSide {
    Cover,
    Cards { physical_index: usize },
}

impl PageSide {
    pub fn physical_index(&self) -> Option<usize> {
        match self {
            PageSide::Cover => None,
            PageSide::Cards { physical_index } => Some(*physical_index),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageSpread {
    pub left: PageSide,
    pub right: PageSide,
}

/// Physical pages shown when the binder is open at `logical_page_index`.
pub fn page_config(logical_page_index: usize) -> PageSpread {
    if logical_page_index == 0 {
        PageSpread {
            left: PageSide::Cover,
            right: PageSide::Cards { physical_index: 0 },
        }
    } else {
        PageSpread {
            left: PageSide::Cards {
                physical_index: 2 * logical_page_index - 1,
            },
            right: PageSide::Cards {
                physical_index: 2 * logical_page_index,
            },
        }
    }
}

/// The `slots_per_page` slots of one physical page, in order, `None` for empty pockets.
pub fn slice_for_physical_page(
    store: &PositionStore,
    physical_index: usize,
    slots_per_page: usize,
) -> Vec<Option<&CardEntry>> {
    let start = physical_index.saturating_mul(slots_per_page);
    (0..slots_per_page)
        .map(|offset| start.checked_add(offset).and_then(|p| store.get(p)))
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
