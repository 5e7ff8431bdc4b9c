//! Capacity remedies for a binder that cannot take the cards being added.
//!
//! The engine only reports what is feasible; the caller picks an option and
//! hands it back with the retried operation.

use serde::{Deserialize, Serialize};

use crate::binder::error::PlacementError;
use crate::binder::models::BinderSettings;
use crate::layout::grid;
use crate::layout::pages::{physical_card_page_count, LayoutMetrics};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExpansionAction {
    /// Switch every page to a larger pocket grid.
    SwitchGrid { grid_size: String },
    /// Append logical pages (each adds two physical card pages).
    AddPages { pages: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpansionOption {
    pub action: ExpansionAction,
    pub new_capacity: usize,
    pub additional_slots: usize,
    /// False when the option helps but is capped by the binder's page limit.
    pub covers_shortfall: bool,
}

/// Lists ways to make room for `needed_slots` more cards. Empty when they already fit.
pub fn compute_expansion_options(
    metrics: &LayoutMetrics,
    settings: &BinderSettings,
    needed_slots: usize,
) -> Vec<ExpansionOption> {
    let shortfall = needed_slots.saturating_sub(metrics.remaining);
    if shortfall == 0 {
        return Vec::new();
    }

    let mut options = Vec::new();

    for larger in grid::larger_than(&metrics.grid) {
        let new_capacity = (metrics.physical_pages as usize).saturating_mul(larger.slots());
        let additional_slots = new_capacity.saturating_sub(metrics.capacity);
        if additional_slots >= shortfall {
            options.push(ExpansionOption {
                action: ExpansionAction::SwitchGrid {
                    grid_size: larger.id.to_string(),
                },
                new_capacity,
                additional_slots,
                covers_shortfall: true,
            });
        }
    }

    let slots_per_logical_page = metrics.grid.slots() * 2;
    let wanted = u32::try_from(shortfall.div_ceil(slots_per_logical_page)).unwrap_or(u32::MAX);
    let allowed = settings.max_pages.saturating_sub(metrics.total_logical_pages);
    let pages = wanted.min(allowed);
    if pages > 0 {
        let new_capacity = (physical_card_page_count(metrics.total_logical_pages + pages) as usize)
            .saturating_mul(metrics.grid.slots());
        options.push(ExpansionOption {
            action: ExpansionAction::AddPages { pages },
            new_capacity,
            additional_slots: new_capacity.saturating_sub(metrics.capacity),
            covers_shortfall: pages == wanted,
        });
    }

    options
}

/// Applies a chosen expansion to `settings`. Only ever grows capacity.
pub fn apply_expansion(
    settings: &mut BinderSettings,
    metrics: &LayoutMetrics,
    action: &ExpansionAction,
) -> Result<(), PlacementError> {
    match action {
        ExpansionAction::SwitchGrid { grid_size } => {
            let target = grid::try_resolve(grid_size)
                .map_err(|e| PlacementError::InvalidExpansion(e.to_string()))?;
            if target.slots_per_page <= metrics.grid.slots_per_page {
                return Err(PlacementError::InvalidExpansion(format!(
                    "grid '{}' is not larger than '{}'",
                    target.id, metrics.grid.id
                )));
            }
            settings.grid_size = target.id.to_string();
            // Pin the page count so the capacity reported for this option holds.
            settings.page_count = metrics.total_logical_pages;
        }
        ExpansionAction::AddPages { pages } => {
            if *pages == 0 {
                return Err(PlacementError::InvalidExpansion(
                    "page count must be positive".to_string(),
                ));
            }
            let new_total = metrics.total_logical_pages.saturating_add(*pages);
            if new_total > settings.max_pages {
                return Err(PlacementError::PageLimitExceeded {
                    required: new_total,
                    max_pages: settings.max_pages,
                });
            }
            settings.page_count = new_total;
        }
    }
    Ok(())
}
