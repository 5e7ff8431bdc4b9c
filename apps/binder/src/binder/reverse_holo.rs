//! Reverse-holo duplication.
//!
//! Cards of the common print rarities also exist as a reverse-holo print. When a
//! binder is filled in reverse-holo mode, every eligible card is followed by a
//! synthesized copy that occupies its own slot.

use serde::Serialize;

use crate::binder::models::{CardData, CardEntry};

/// Rarities printed with a reverse-holo variant. Compared case-insensitively.
pub const ELIGIBLE_RARITIES: [&str; 4] = ["common", "uncommon", "rare", "rare holo"];

/// Share of a set assumed eligible before rarity data is fetched.
const ESTIMATED_ELIGIBLE_SHARE: f64 = 0.6;

pub fn is_eligible(card: &CardData) -> bool {
    card.rarity().is_some_and(|rarity| {
        let rarity = rarity.trim();
        ELIGIBLE_RARITIES
            .iter()
            .any(|eligible| eligible.eq_ignore_ascii_case(rarity))
    })
}

/// Inserts a reverse-holo copy directly after every eligible entry.
pub fn with_reverse_holos(entries: Vec<CardEntry>) -> Vec<CardEntry> {
    let mut expanded = Vec::with_capacity(entries.len() * 2);
    for entry in entries {
        let copy = is_eligible(&entry.card_data).then(|| entry.reverse_holo_copy());
        expanded.push(entry);
        expanded.extend(copy);
    }
    expanded
}

/// Rough count of reverse-holo copies a set of `set_size` cards will add.
///
/// This is a heuristic for warnings shown before the set is fetched, not a count:
/// the real number depends on the set's rarity mix.
pub fn estimate_reverse_holo_count(set_size: usize) -> usize {
    (set_size as f64 * ESTIMATED_ELIGIBLE_SHARE).ceil() as usize
}

/// Pre-fetch capacity check for adding a whole set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SetEstimate {
    pub set_id: String,
    pub set_size: usize,
    /// Estimated, see [`estimate_reverse_holo_count`].
    pub estimated_reverse_holos: usize,
    pub estimated_total: usize,
    pub remaining: usize,
    pub fits: bool,
}

impl SetEstimate {
    /// `remaining` is the free slot count the set would be added into (the full
    /// capacity when the set replaces the binder's contents).
    pub fn new(set_id: &str, set_size: usize, reverse_holo: bool, remaining: usize) -> Self {
        let estimated_reverse_holos = if reverse_holo {
            estimate_reverse_holo_count(set_size)
        } else {
            0
        };
        let estimated_total = set_size + estimated_reverse_holos;
        Self {
            set_id: set_id.to_string(),
            set_size,
            estimated_reverse_holos,
            estimated_total,
            remaining,
            fits: estimated_total <= remaining,
        }
    }
}
