//! Read models for the display layer: binder summary and open-page view.

use serde::Serialize;
use uuid::Uuid;

use crate::binder::models::{BinderDocument, BinderSettings, CardEntry};
use crate::layout::pages::{page_config, slice_for_physical_page, LayoutMetrics, PageSide};

#[derive(Debug, Clone, Serialize)]
pub struct BinderSummary {
    pub id: Uuid,
    pub name: String,
    pub owner: String,
    pub settings: BinderSettings,
    pub version: u64,
    pub layout: LayoutMetrics,
    pub missing_count: usize,
}

impl BinderSummary {
    pub fn of(doc: &BinderDocument) -> Self {
        Self {
            id: doc.id,
            name: doc.name.clone(),
            owner: doc.owner.clone(),
            settings: doc.settings.clone(),
            version: doc.version,
            layout: LayoutMetrics::compute(&doc.cards, &doc.settings),
            missing_count: doc.missing.len(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SlotView {
    pub position: usize,
    pub entry: Option<CardEntry>,
    pub missing: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageSideView {
    Cover { title: String },
    Cards { physical_index: usize, slots: Vec<SlotView> },
}

#[derive(Debug, Clone, Serialize)]
pub struct PageView {
    pub logical_index: usize,
    pub total_pages: u32,
    pub left: PageSideView,
    pub right: PageSideView,
}

impl PageView {
    /// The two sides shown with the binder open at `logical_index`, or `None`
    /// past the last page.
    pub fn of(doc: &BinderDocument, logical_index: usize) -> Option<Self> {
        let metrics = LayoutMetrics::compute(&doc.cards, &doc.settings);
        if logical_index >= metrics.total_logical_pages as usize {
            return None;
        }
        let spread = page_config(logical_index);
        Some(Self {
            logical_index,
            total_pages: metrics.total_logical_pages,
            left: side_view(doc, spread.left, metrics.grid.slots()),
            right: side_view(doc, spread.right, metrics.grid.slots()),
        })
    }
}

fn side_view(doc: &BinderDocument, side: PageSide, slots_per_page: usize) -> PageSideView {
    let Some(physical_index) = side.physical_index() else {
        return PageSideView::Cover {
            title: doc.name.clone(),
        };
    };
    let first = physical_index.saturating_mul(slots_per_page);
    let slots = slice_for_physical_page(&doc.cards, physical_index, slots_per_page)
        .into_iter()
        .enumerate()
        .map(|(offset, entry)| SlotView {
            position: first.saturating_add(offset),
            missing: entry.is_some_and(|e| doc.missing.is_missing(e.instance_id)),
            entry: entry.cloned(),
        })
        .collect();
    PageSideView::Cards {
        physical_index,
        slots,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::store::tests::store_with;

    fn doc_with(positions: impl IntoIterator<Item = usize>) -> BinderDocument {
        let mut doc = BinderDocument::new("Evolving Skies", "tester", BinderSettings::new("2x2", 1, 10));
        doc.cards = store_with(positions);
        doc
    }

    #[test]
    fn test_cover_page_view() {
        let doc = doc_with([0, 2]);
        let view = PageView::of(&doc, 0).unwrap();
        assert!(matches!(view.left, PageSideView::Cover { ref title } if title == "Evolving Skies"));
        match view.right {
            PageSideView::Cards { physical_index, slots } => {
                assert_eq!(physical_index, 0);
                assert_eq!(slots.len(), 4);
                assert!(slots[0].entry.is_some());
                assert!(slots[1].entry.is_none());
                assert_eq!(slots[3].position, 3);
            }
            other => panic!("expected cards, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_flag_in_slots() {
        let mut doc = doc_with([5]);
        let id = doc.cards.get(5).unwrap().instance_id;
        doc.missing.mark_missing(id);

        let view = PageView::of(&doc, 1).unwrap();
        let PageSideView::Cards { slots, .. } = view.left else {
            panic!("expected cards on the left");
        };
        assert_eq!(slots[1].position, 5);
        assert!(slots[1].missing);
        assert!(!slots[0].missing);
    }

    #[test]
    fn test_page_past_end_is_none() {
        let doc = doc_with([0]);
        assert!(PageView::of(&doc, 1).is_none());
    }

    #[test]
    fn test_summary_reports_layout() {
        let doc = doc_with(0..5);
        let summary = BinderSummary::of(&doc);
        assert_eq!(summary.layout.occupancy, 5);
        assert_eq!(summary.layout.total_logical_pages, 2);
        assert_eq!(summary.layout.capacity, 12);
    }
}
