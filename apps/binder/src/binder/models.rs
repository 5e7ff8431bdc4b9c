use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::binder::overlay::MissingOverlay;
use crate::binder::store::PositionStore;

// ────────────────────────────────────────────────────────────────────────────
// Card payload
// ────────────────────────────────────────────────────────────────────────────

/// Opaque card identity/display payload supplied by the card-data source.
///
/// The placement engine only reads `id` (identity) and `rarity`; everything else
/// is carried through untouched for the display layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardData(pub Value);

impl CardData {
    pub fn id(&self) -> Option<&str> {
        self.0.get("id").and_then(|v| v.as_str())
    }

    pub fn rarity(&self) -> Option<&str> {
        self.0.get("rarity").and_then(|v| v.as_str())
    }

    /// Collector number, e.g. "12", "12a", "TG05".
    pub fn number(&self) -> Option<&str> {
        self.0.get("number").and_then(|v| v.as_str())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Placed entries
// ────────────────────────────────────────────────────────────────────────────

/// Whether an entry is a card as added, or a reverse-holo copy synthesized from one.
///
/// `derived_from` is the original card's identity, used for lookup only; the
/// derived entry owns its own payload and instance id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CardVariant {
    #[default]
    Original,
    ReverseHolo { derived_from: String },
}

/// One placed copy of a card, owned by the slot that holds it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardEntry {
    pub card_data: CardData,
    pub instance_id: Uuid,
    pub added_at: DateTime<Utc>,
    pub added_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub is_protected: bool,
    #[serde(default)]
    pub variant: CardVariant,
}

impl CardEntry {
    pub fn new(card: NewCard, added_by: &str, added_at: DateTime<Utc>) -> Self {
        Self {
            card_data: card.card_data,
            instance_id: Uuid::new_v4(),
            added_at,
            added_by: added_by.to_string(),
            notes: card.notes,
            condition: card.condition,
            quantity: card.quantity,
            is_protected: card.is_protected,
            variant: CardVariant::Original,
        }
    }

    /// Synthesizes the reverse-holo copy of this entry with a fresh instance id.
    ///
    /// Personal metadata (notes, condition, quantity) stays with the original.
    pub fn reverse_holo_copy(&self) -> Self {
        Self {
            card_data: self.card_data.clone(),
            instance_id: Uuid::new_v4(),
            added_at: self.added_at,
            added_by: self.added_by.clone(),
            notes: None,
            condition: None,
            quantity: None,
            is_protected: false,
            variant: CardVariant::ReverseHolo {
                derived_from: self.card_data.id().unwrap_or_default().to_string(),
            },
        }
    }

    pub fn is_reverse_holo(&self) -> bool {
        matches!(self.variant, CardVariant::ReverseHolo { .. })
    }
}

/// A card as submitted by a caller, before it is given an instance id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCard {
    pub card_data: CardData,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub is_protected: bool,
}

impl From<CardData> for NewCard {
    fn from(card_data: CardData) -> Self {
        Self {
            card_data,
            notes: None,
            condition: None,
            quantity: None,
            is_protected: false,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Binder
// ────────────────────────────────────────────────────────────────────────────

/// Layout settings stored with a binder.
///
/// `page_count` is a stored hint: capacity decisions always use
/// `max(occupancy-derived pages, page_count, min_pages)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinderSettings {
    pub grid_size: String,
    pub page_count: u32,
    pub min_pages: u32,
    pub max_pages: u32,
}

impl BinderSettings {
    pub fn new(grid_size: impl Into<String>, min_pages: u32, max_pages: u32) -> Self {
        Self {
            grid_size: grid_size.into(),
            page_count: min_pages.max(1),
            min_pages,
            max_pages,
        }
    }
}

/// The full stored state of one binder.
///
/// `version` is bumped by every committed write. `generation` is bumped only by
/// writes that discard the binder's contents (clear, replace).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinderDocument {
    pub id: Uuid,
    pub name: String,
    pub owner: String,
    pub settings: BinderSettings,
    pub cards: PositionStore,
    #[serde(default)]
    pub missing: MissingOverlay,
    pub version: u64,
    pub generation: u64,
    pub updated_at: DateTime<Utc>,
}

impl BinderDocument {
    pub fn new(name: &str, owner: &str, settings: BinderSettings) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            owner: owner.to_string(),
            settings,
            cards: PositionStore::new(),
            missing: MissingOverlay::new(),
            version: 0,
            generation: 0,
            updated_at: Utc::now(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_card_data_accessors() {
        let card = CardData(json!({"id": "sv1-12", "rarity": "Common", "number": "12"}));
        assert_eq!(card.id(), Some("sv1-12"));
        assert_eq!(card.rarity(), Some("Common"));
        assert_eq!(card.number(), Some("12"));
    }

    #[test]
    fn test_reverse_holo_copy_has_fresh_identity() {
        let original = CardEntry::new(
            NewCard {
                notes: Some("first edition".to_string()),
                ..NewCard::from(CardData(json!({"id": "sv1-12"})))
            },
            "ash",
            Utc::now(),
        );
        let copy = original.reverse_holo_copy();

        assert_ne!(copy.instance_id, original.instance_id);
        assert!(copy.is_reverse_holo());
        assert!(!original.is_reverse_holo());
        assert_eq!(
            copy.variant,
            CardVariant::ReverseHolo {
                derived_from: "sv1-12".to_string()
            }
        );
        assert_eq!(copy.notes, None);
    }

    #[test]
    fn test_entry_without_variant_deserializes_as_original() {
        let raw = json!({
            "card_data": {"id": "base1-4"},
            "instance_id": Uuid::new_v4(),
            "added_at": "2024-01-01T00:00:00Z",
            "added_by": "misty"
        });
        let entry: CardEntry = serde_json::from_value(raw).unwrap();
        assert_eq!(entry.variant, CardVariant::Original);
        assert!(!entry.is_protected);
    }
}
