//! Sparse slot map from position to placed card.
//!
//! Positions are flat, zero-based slot indices across the whole binder. Gaps are
//! meaningful (an empty pocket the user left on purpose) and are never compacted:
//! removing a card leaves its slot empty and every other card where it was.

use std::collections::BTreeMap;
use std::ops::RangeBounds;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::binder::error::PlacementError;
use crate::binder::models::CardEntry;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PositionStore {
    slots: BTreeMap<usize, CardEntry>,
}

impl PositionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&CardEntry> {
        self.slots.get(&position)
    }

    pub fn is_occupied(&self, position: usize) -> bool {
        self.slots.contains_key(&position)
    }

    pub fn max_occupied_position(&self) -> Option<usize> {
        self.slots.keys().next_back().copied()
    }

    /// First slot after the last occupied one (0 for an empty binder).
    pub fn next_free_position(&self) -> usize {
        self.max_occupied_position().map_or(0, |p| p.saturating_add(1))
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (usize, &CardEntry)> {
        self.slots.iter().map(|(p, e)| (*p, e))
    }

    pub fn any_occupied_in<R: RangeBounds<usize>>(&self, range: R) -> bool {
        self.slots.range(range).next().is_some()
    }

    pub fn position_of(&self, instance_id: Uuid) -> Option<usize> {
        self.iter()
            .find(|(_, e)| e.instance_id == instance_id)
            .map(|(p, _)| p)
    }

    pub fn contains_instance(&self, instance_id: Uuid) -> bool {
        self.position_of(instance_id).is_some()
    }

    /// Places an entry in an empty slot. Never overwrites.
    pub fn insert(&mut self, position: usize, entry: CardEntry) -> Result<(), PlacementError> {
        if self.slots.contains_key(&position) {
            return Err(PlacementError::PositionConflict { position });
        }
        self.slots.insert(position, entry);
        Ok(())
    }

    /// Removes the entry at `position`, leaving the slot empty.
    pub fn remove(&mut self, position: usize) -> Option<CardEntry> {
        self.slots.remove(&position)
    }

    /// Moves the entry at `from` into the empty slot `to`.
    pub fn relocate(&mut self, from: usize, to: usize) -> Result<(), PlacementError> {
        if from == to {
            return if self.is_occupied(from) {
                Ok(())
            } else {
                Err(PlacementError::EmptyPosition(from))
            };
        }
        if self.slots.contains_key(&to) {
            return Err(PlacementError::PositionConflict { position: to });
        }
        let entry = self
            .slots
            .remove(&from)
            .ok_or(PlacementError::EmptyPosition(from))?;
        self.slots.insert(to, entry);
        Ok(())
    }

    /// Shifts every entry at or after `start` forward by `by` slots.
    ///
    /// Entries are relocated highest position first, so no entry ever lands on a
    /// slot that is still occupied, and an overflow is caught before anything
    /// moves. Returns the number of entries moved.
    pub fn shift_from(&mut self, start: usize, by: usize) -> Result<usize, PlacementError> {
        if by == 0 {
            return Ok(0);
        }
        let to_shift: Vec<usize> = self.slots.range(start..).rev().map(|(p, _)| *p).collect();
        for &position in &to_shift {
            let to = position
                .checked_add(by)
                .ok_or(PlacementError::PositionOverflow { position, by })?;
            self.relocate(position, to)?;
        }
        Ok(to_shift.len())
    }

    /// Empties the store, returning how many entries were removed.
    pub fn clear(&mut self) -> usize {
        let count = self.slots.len();
        self.slots.clear();
        count
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
