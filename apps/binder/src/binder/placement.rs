//! Placement engine: add, move, remove and clear cards in one binder.
//!
//! Every operation is planned against a private copy of the binder document. The
//! returned [`Plan`] holds the complete target document; nothing observable
//! changes until the caller commits that target in a single write. A failed
//! operation therefore never leaves a partially shifted or partially filled binder.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::binder::error::PlacementError;
use crate::binder::expansion::{apply_expansion, compute_expansion_options, ExpansionAction, ExpansionOption};
use crate::binder::models::{BinderDocument, CardEntry, NewCard};
use crate::binder::reverse_holo::with_reverse_holos;
use crate::layout::pages::LayoutMetrics;

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AddOptions {
    /// The binder's current contents are discarded and replaced by the new cards.
    #[serde(default)]
    pub is_replacement: bool,
    /// Follow every eligible card with a reverse-holo copy.
    #[serde(default)]
    pub reverse_holo: bool,
    /// Capacity expansion chosen by the caller, applied before the capacity check.
    #[serde(default)]
    pub expansion: Option<ExpansionAction>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardMove {
    pub from_position: usize,
    pub to_position: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlacedCard {
    pub position: usize,
    pub entry: CardEntry,
}

#[derive(Debug, Clone, Serialize)]
pub struct AddOutcome {
    pub accepted: Vec<PlacedCard>,
    pub start_position: usize,
    /// Existing cards pushed forward to make room.
    pub shifted: usize,
    /// Cards discarded by a replacement.
    pub replaced: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct MoveOutcome {
    /// Moves in the order they were applied.
    pub applied: Vec<CardMove>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClearOutcome {
    pub count: usize,
    pub reason: String,
}

/// The binder as it will look once an operation is committed, plus what the
/// operation did.
#[derive(Debug, Clone)]
pub struct Plan<T> {
    pub target: BinderDocument,
    pub outcome: T,
}

// ────────────────────────────────────────────────────────────────────────────
// Engine
// ────────────────────────────────────────────────────────────────────────────

pub struct PlacementEngine<'a> {
    current: &'a BinderDocument,
}

impl<'a> PlacementEngine<'a> {
    pub fn new(current: &'a BinderDocument) -> Self {
        Self { current }
    }

    pub fn metrics(&self) -> LayoutMetrics {
        LayoutMetrics::compute(&self.current.cards, &self.current.settings)
    }

    /// Places `items` starting at `start_position`, or after the last occupied
    /// slot when none is given.
    ///
    /// If any slot the new cards need is taken, every card at or after
    /// `start_position` is pushed forward by the number of cards inserted.
    /// Fails with `LimitExceeded` when the cards (reverse-holo copies included)
    /// do not fit in the binder's capacity.
    pub fn add_cards(
        &self,
        items: Vec<NewCard>,
        start_position: Option<usize>,
        options: &AddOptions,
        added_by: &str,
    ) -> Result<Plan<AddOutcome>, PlacementError> {
        let mut target = self.current.clone();

        if let Some(action) = &options.expansion {
            let metrics = LayoutMetrics::compute(&target.cards, &target.settings);
            apply_expansion(&mut target.settings, &metrics, action)?;
        }

        let now = Utc::now();
        let mut entries: Vec<CardEntry> = items
            .into_iter()
            .map(|item| CardEntry::new(item, added_by, now))
            .collect();
        if options.reverse_holo {
            entries = with_reverse_holos(entries);
        }

        let mut replaced = 0;
        if options.is_replacement {
            replaced = target.cards.clear();
            target.missing.clear();
            target.generation += 1;
        }

        let metrics = LayoutMetrics::compute(&target.cards, &target.settings);
        if entries.len() > metrics.remaining {
            return Err(PlacementError::LimitExceeded {
                requested: entries.len(),
                remaining: metrics.remaining,
            });
        }

        let count = entries.len();
        let start = start_position.unwrap_or_else(|| target.cards.next_free_position());
        let end = start
            .checked_add(count)
            .ok_or_else(|| unreachable_page(&target))?;
        let mut shifted = 0;
        if start_position.is_some() && target.cards.any_occupied_in(start..end) {
            let last = target.cards.max_occupied_position().unwrap_or(start);
            if last.checked_add(count).is_none() {
                return Err(unreachable_page(&target));
            }
            shifted = target.cards.shift_from(start, count).inspect_err(report_defect)?;
        }

        let mut accepted = Vec::with_capacity(count);
        for (position, entry) in (start..end).zip(entries) {
            target
                .cards
                .insert(position, entry.clone())
                .inspect_err(report_defect)?;
            accepted.push(PlacedCard { position, entry });
        }

        grow_page_count(&mut target)?;

        debug!(
            binder_id = %self.current.id,
            start,
            count,
            shifted,
            replaced,
            "Planned card addition"
        );

        Ok(Plan {
            target,
            outcome: AddOutcome {
                accepted,
                start_position: start,
                shifted,
                replaced,
            },
        })
    }

    /// Relocates cards. Targets must be empty or vacated by another move in the
    /// same batch, so swaps and rotations are allowed.
    ///
    /// Moves toward higher positions are applied in descending target order,
    /// moves toward lower positions in ascending target order.
    pub fn move_cards(&self, moves: &[CardMove]) -> Result<Plan<MoveOutcome>, PlacementError> {
        let mut target = self.current.clone();
        let ordered = order_moves(&target, moves)?;

        // Lift every moving card before dropping any, so no slot ever holds two.
        let mut lifted = Vec::with_capacity(ordered.len());
        for m in &ordered {
            let entry = target
                .cards
                .remove(m.from_position)
                .ok_or(PlacementError::EmptyPosition(m.from_position))?;
            lifted.push((m.to_position, entry));
        }
        for (to, entry) in lifted {
            target.cards.insert(to, entry).inspect_err(report_defect)?;
        }

        grow_page_count(&mut target)?;

        debug!(binder_id = %self.current.id, moves = ordered.len(), "Planned card moves");

        Ok(Plan {
            target,
            outcome: MoveOutcome { applied: ordered },
        })
    }

    /// Empties one slot. Nothing else moves.
    pub fn remove_card(&self, position: usize) -> Plan<Option<CardEntry>> {
        let mut target = self.current.clone();
        let removed = target.cards.remove(position);
        if removed.is_some() && !target.missing.is_empty() {
            target.missing.prune(&target.cards);
        }
        Plan {
            target,
            outcome: removed,
        }
    }

    /// Empties the whole binder. Settings are kept.
    pub fn clear_all(&self, reason: &str) -> Plan<ClearOutcome> {
        let mut target = self.current.clone();
        let count = target.cards.clear();
        target.missing.clear();
        target.generation += 1;
        Plan {
            target,
            outcome: ClearOutcome {
                count,
                reason: reason.to_string(),
            },
        }
    }

    pub fn compute_expansion_options(&self, needed_slots: usize) -> Vec<ExpansionOption> {
        compute_expansion_options(&self.metrics(), &self.current.settings, needed_slots)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Internal helpers
// ────────────────────────────────────────────────────────────────────────────

/// Validates a batch of moves and puts it in application order.
fn order_moves(doc: &BinderDocument, moves: &[CardMove]) -> Result<Vec<CardMove>, PlacementError> {
    let moves: Vec<CardMove> = moves
        .iter()
        .copied()
        .filter(|m| m.from_position != m.to_position)
        .collect();

    let mut sources = std::collections::HashSet::new();
    let mut targets = std::collections::HashSet::new();
    for m in &moves {
        if !doc.cards.is_occupied(m.from_position) {
            return Err(PlacementError::EmptyPosition(m.from_position));
        }
        if !sources.insert(m.from_position) {
            return Err(PlacementError::InvalidMove(format!(
                "slot {} is moved more than once",
                m.from_position
            )));
        }
        if !targets.insert(m.to_position) {
            return Err(PlacementError::InvalidMove(format!(
                "slot {} is the target of more than one move",
                m.to_position
            )));
        }
    }
    for m in &moves {
        if doc.cards.is_occupied(m.to_position) && !sources.contains(&m.to_position) {
            return Err(PlacementError::InvalidMove(format!(
                "slot {} is occupied",
                m.to_position
            )));
        }
    }

    let (mut forward, mut backward): (Vec<CardMove>, Vec<CardMove>) =
        moves.into_iter().partition(|m| m.to_position > m.from_position);
    forward.sort_by(|a, b| b.to_position.cmp(&a.to_position));
    backward.sort_by_key(|m| m.to_position);
    forward.extend(backward);
    Ok(forward)
}

/// Raises the stored page count to what occupancy now needs, within `max_pages`.
fn grow_page_count(doc: &mut BinderDocument) -> Result<(), PlacementError> {
    let metrics = LayoutMetrics::compute(&doc.cards, &doc.settings);
    if metrics.required_logical_pages > doc.settings.max_pages {
        return Err(PlacementError::PageLimitExceeded {
            required: metrics.required_logical_pages,
            max_pages: doc.settings.max_pages,
        });
    }
    doc.settings.page_count = doc.settings.page_count.max(metrics.required_logical_pages);
    Ok(())
}

/// A position so far out that no page count could reach it.
fn unreachable_page(doc: &BinderDocument) -> PlacementError {
    PlacementError::PageLimitExceeded {
        required: u32::MAX,
        max_pages: doc.settings.max_pages,
    }
}

fn report_defect(e: &PlacementError) {
    error!("Placement invariant violated: {e}");
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
