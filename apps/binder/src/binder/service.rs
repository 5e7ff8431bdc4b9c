//! Binder service: serializes operations per binder and commits engine plans.
//!
//! Every mutating call follows the same shape:
//! 1. take the binder's lock
//! 2. load the current document
//! 3. let the `PlacementEngine` plan the full target document
//! 4. issue one repository write, conditional on the loaded version
//!
//! A write that loses a version race is discarded, never retried or merged.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::binder::error::PlacementError;
use crate::binder::expansion::{apply_expansion, ExpansionAction, ExpansionOption};
use crate::binder::locks::BinderLocks;
use crate::binder::models::{BinderDocument, BinderSettings, CardEntry, NewCard};
use crate::binder::persistence::{BinderRepository, Commit};
use crate::binder::placement::{AddOptions, AddOutcome, CardMove, ClearOutcome, MoveOutcome, PlacementEngine};
use crate::binder::reverse_holo::SetEstimate;
use crate::binder::view::{BinderSummary, PageView};
use crate::card_source::CardSource;
use crate::errors::AppError;
use crate::layout::grid;
use crate::layout::pages::{physical_card_page_count, total_logical_pages, LayoutMetrics};

// ────────────────────────────────────────────────────────────────────────────
// Requests and outcomes
// ────────────────────────────────────────────────────────────────────────────

/// Result of a mutating operation. `Discarded` means a conflicting write
/// committed first and this operation's result was dropped.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome<T> {
    Applied { version: u64, result: T },
    Discarded,
}

impl<T> Outcome<T> {
    #[cfg(test)]
    pub fn applied(self) -> Option<T> {
        match self {
            Outcome::Applied { result, .. } => Some(result),
            Outcome::Discarded => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBinderRequest {
    pub name: String,
    pub owner: String,
    #[serde(default)]
    pub grid_size: Option<String>,
    #[serde(default)]
    pub min_pages: Option<u32>,
    #[serde(default)]
    pub max_pages: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddCardsRequest {
    pub cards: Vec<NewCard>,
    #[serde(default)]
    pub start_position: Option<usize>,
    #[serde(default)]
    pub options: AddOptions,
    pub added_by: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddSetRequest {
    pub set_id: String,
    #[serde(default)]
    pub start_position: Option<usize>,
    /// Replace the binder's contents with the set.
    #[serde(default)]
    pub replace: bool,
    #[serde(default)]
    pub reverse_holo: bool,
    #[serde(default)]
    pub expansion: Option<ExpansionAction>,
    pub added_by: String,
}

/// Partial settings change. Absent fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateBinderRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub grid_size: Option<String>,
    #[serde(default)]
    pub page_count: Option<u32>,
    #[serde(default)]
    pub min_pages: Option<u32>,
    #[serde(default)]
    pub max_pages: Option<u32>,
}

/// Page-bound defaults for newly created binders.
#[derive(Debug, Clone)]
pub struct BinderDefaults {
    pub grid_size: String,
    pub min_pages: u32,
    pub max_pages: u32,
}

// ────────────────────────────────────────────────────────────────────────────
// Service
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct BinderService {
    repo: Arc<dyn BinderRepository>,
    cards: Arc<dyn CardSource>,
    locks: BinderLocks,
    defaults: BinderDefaults,
}

impl BinderService {
    pub fn new(
        repo: Arc<dyn BinderRepository>,
        cards: Arc<dyn CardSource>,
        defaults: BinderDefaults,
    ) -> Self {
        Self {
            repo,
            cards,
            locks: BinderLocks::new(),
            defaults,
        }
    }

    pub async fn create_binder(&self, req: CreateBinderRequest) -> Result<BinderSummary, AppError> {
        let grid = req
            .grid_size
            .as_deref()
            .map_or_else(|| grid::try_resolve(&self.defaults.grid_size), grid::try_resolve)
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let min_pages = req.min_pages.unwrap_or(self.defaults.min_pages);
        let max_pages = req.max_pages.unwrap_or(self.defaults.max_pages);
        if max_pages == 0 || min_pages > max_pages {
            return Err(AppError::Validation(format!(
                "invalid page bounds: min {min_pages}, max {max_pages}"
            )));
        }
        if req.name.trim().is_empty() {
            return Err(AppError::Validation("binder name is required".to_string()));
        }

        let doc = BinderDocument::new(
            req.name.trim(),
            &req.owner,
            BinderSettings::new(grid.id, min_pages, max_pages),
        );
        self.repo.create(&doc).await?;
        info!(binder_id = %doc.id, owner = %doc.owner, "Binder created");
        Ok(BinderSummary::of(&doc))
    }

    pub async fn summary(&self, binder_id: Uuid) -> Result<BinderSummary, AppError> {
        Ok(BinderSummary::of(&self.repo.load(binder_id).await?))
    }

    pub async fn page_view(&self, binder_id: Uuid, logical_index: usize) -> Result<PageView, AppError> {
        let doc = self.repo.load(binder_id).await?;
        PageView::of(&doc, logical_index).ok_or_else(|| {
            AppError::NotFound(format!("Binder {binder_id} has no page {logical_index}"))
        })
    }

    pub async fn add_cards(
        &self,
        binder_id: Uuid,
        req: AddCardsRequest,
    ) -> Result<Outcome<AddOutcome>, AppError> {
        if req.cards.is_empty() {
            return Err(AppError::Validation("no cards to add".to_string()));
        }
        let _guard = self.locks.acquire(binder_id).await;
        let current = self.repo.load(binder_id).await?;
        self.commit_add(&current, req.cards, req.start_position, &req.options, &req.added_by)
            .await
    }

    /// Fetches a whole set and adds it.
    ///
    /// The fetch runs without holding the binder lock. If the binder was cleared
    /// or replaced while the set was loading, the fetched cards are dropped.
    pub async fn add_set(
        &self,
        binder_id: Uuid,
        req: AddSetRequest,
    ) -> Result<Outcome<AddOutcome>, AppError> {
        let generation = self.repo.load(binder_id).await?.generation;

        let set_cards = self.cards.fetch_set(&req.set_id).await?;
        info!(binder_id = %binder_id, set_id = %req.set_id, cards = set_cards.len(), "Set fetched");

        let _guard = self.locks.acquire(binder_id).await;
        let current = self.repo.load(binder_id).await?;
        if current.generation != generation {
            info!(
                binder_id = %binder_id,
                set_id = %req.set_id,
                "Binder was cleared while the set loaded; discarding fetched set"
            );
            return Ok(Outcome::Discarded);
        }

        let options = AddOptions {
            is_replacement: req.replace,
            reverse_holo: req.reverse_holo,
            expansion: req.expansion,
        };
        let items = set_cards.into_iter().map(NewCard::from).collect();
        self.commit_add(&current, items, req.start_position, &options, &req.added_by)
            .await
    }

    /// Pre-fetch capacity check for adding a set; reverse-holo counts are estimated.
    pub async fn estimate_set(
        &self,
        binder_id: Uuid,
        set_id: &str,
        reverse_holo: bool,
        replace: bool,
    ) -> Result<SetEstimate, AppError> {
        let doc = self.repo.load(binder_id).await?;
        let set_size = self.cards.set_size(set_id).await?;
        let metrics = LayoutMetrics::compute(&doc.cards, &doc.settings);
        let remaining = if replace {
            let total = total_logical_pages(1, doc.settings.page_count, doc.settings.min_pages);
            (physical_card_page_count(total) as usize).saturating_mul(metrics.grid.slots())
        } else {
            metrics.remaining
        };
        Ok(SetEstimate::new(set_id, set_size, reverse_holo, remaining))
    }

    pub async fn move_cards(
        &self,
        binder_id: Uuid,
        moves: &[CardMove],
    ) -> Result<Outcome<MoveOutcome>, AppError> {
        let _guard = self.locks.acquire(binder_id).await;
        let current = self.repo.load(binder_id).await?;
        let plan = PlacementEngine::new(&current).move_cards(moves)?;
        let write = self
            .repo
            .move_cards(&plan.outcome.applied, Commit::new(&current, &plan.target))
            .await;
        settle(binder_id, "move", write, plan.outcome)
    }

    pub async fn remove_card(
        &self,
        binder_id: Uuid,
        position: usize,
    ) -> Result<Outcome<CardEntry>, AppError> {
        let _guard = self.locks.acquire(binder_id).await;
        let current = self.repo.load(binder_id).await?;
        let plan = PlacementEngine::new(&current).remove_card(position);
        let removed = plan.outcome.ok_or(PlacementError::EmptyPosition(position))?;
        let write = self
            .repo
            .remove(position, Commit::new(&current, &plan.target))
            .await;
        settle(binder_id, "remove", write, removed)
    }

    pub async fn clear(&self, binder_id: Uuid, reason: &str) -> Result<Outcome<ClearOutcome>, AppError> {
        let _guard = self.locks.acquire(binder_id).await;
        let current = self.repo.load(binder_id).await?;
        let plan = PlacementEngine::new(&current).clear_all(reason);
        let write = self
            .repo
            .clear(reason, Commit::new(&current, &plan.target))
            .await;
        let outcome = settle(binder_id, "clear", write, plan.outcome)?;
        if let Outcome::Applied { result, .. } = &outcome {
            info!(binder_id = %binder_id, count = result.count, reason, "Binder cleared");
        }
        Ok(outcome)
    }

    pub async fn expansion_options(
        &self,
        binder_id: Uuid,
        needed_slots: usize,
    ) -> Result<Vec<ExpansionOption>, AppError> {
        let doc = self.repo.load(binder_id).await?;
        Ok(PlacementEngine::new(&doc).compute_expansion_options(needed_slots))
    }

    pub async fn apply_expansion(
        &self,
        binder_id: Uuid,
        action: &ExpansionAction,
    ) -> Result<Outcome<BinderSummary>, AppError> {
        let _guard = self.locks.acquire(binder_id).await;
        let current = self.repo.load(binder_id).await?;
        let mut target = current.clone();
        let metrics = LayoutMetrics::compute(&current.cards, &current.settings);
        apply_expansion(&mut target.settings, &metrics, action)?;

        let write = self
            .repo
            .update_settings(Commit::new(&current, &target))
            .await
            .map(|stored| {
                let summary = BinderSummary::of(&stored);
                (stored, summary)
            });
        match write {
            Ok((stored, summary)) => Ok(Outcome::Applied {
                version: stored.version,
                result: summary,
            }),
            Err(e) => discard_if_stale(binder_id, "expansion", e),
        }
    }

    /// Changes name, grid or page bounds.
    ///
    /// Refuses any change that would leave an occupied position outside the
    /// binder's new page range. Placed cards never move.
    pub async fn update_settings(
        &self,
        binder_id: Uuid,
        req: UpdateBinderRequest,
    ) -> Result<Outcome<BinderSummary>, AppError> {
        let _guard = self.locks.acquire(binder_id).await;
        let current = self.repo.load(binder_id).await?;
        let mut target = current.clone();

        if let Some(name) = req.name {
            if name.trim().is_empty() {
                return Err(AppError::Validation("binder name is required".to_string()));
            }
            target.name = name.trim().to_string();
        }
        if let Some(grid_size) = req.grid_size {
            let grid = grid::try_resolve(&grid_size).map_err(|e| AppError::Validation(e.to_string()))?;
            target.settings.grid_size = grid.id.to_string();
        }
        let settings = &mut target.settings;
        settings.min_pages = req.min_pages.unwrap_or(settings.min_pages);
        settings.max_pages = req.max_pages.unwrap_or(settings.max_pages);
        settings.page_count = req.page_count.unwrap_or(settings.page_count).max(settings.min_pages);
        if settings.max_pages == 0 || settings.min_pages > settings.max_pages {
            return Err(AppError::Validation(format!(
                "invalid page bounds: min {}, max {}",
                settings.min_pages, settings.max_pages
            )));
        }
        if settings.page_count > settings.max_pages {
            return Err(AppError::Validation(format!(
                "page count {} exceeds maximum {}",
                settings.page_count, settings.max_pages
            )));
        }

        let metrics = LayoutMetrics::compute(&target.cards, &target.settings);
        if metrics.required_logical_pages > target.settings.max_pages {
            return Err(AppError::Validation(format!(
                "occupied positions need {} pages with grid {}, maximum is {}",
                metrics.required_logical_pages, metrics.grid.id, target.settings.max_pages
            )));
        }
        // Lowering the page count below what the cards occupy keeps them reachable.
        target.settings.page_count = target.settings.page_count.max(metrics.required_logical_pages);

        let write = self
            .repo
            .update_settings(Commit::new(&current, &target))
            .await;
        match write {
            Ok(stored) => Ok(Outcome::Applied {
                version: stored.version,
                result: BinderSummary::of(&stored),
            }),
            Err(e) => discard_if_stale(binder_id, "settings", e),
        }
    }

    /// Marks or unmarks a placed card as missing. Returns the new state.
    pub async fn set_missing(
        &self,
        binder_id: Uuid,
        instance_id: Uuid,
        missing: bool,
    ) -> Result<Outcome<bool>, AppError> {
        let _guard = self.locks.acquire(binder_id).await;
        let current = self.repo.load(binder_id).await?;
        if !current.cards.contains_instance(instance_id) {
            return Err(AppError::NotFound(format!(
                "Card instance {instance_id} is not in binder {binder_id}"
            )));
        }
        if current.missing.is_missing(instance_id) == missing {
            return Ok(Outcome::Applied {
                version: current.version,
                result: missing,
            });
        }

        let mut target = current.clone();
        if missing {
            target.missing.mark_missing(instance_id);
        } else {
            target.missing.unmark(instance_id);
        }
        let write = self
            .repo
            .update_overlay(Commit::new(&current, &target))
            .await;
        settle(binder_id, "overlay", write, missing)
    }

    async fn commit_add(
        &self,
        current: &BinderDocument,
        items: Vec<NewCard>,
        start_position: Option<usize>,
        options: &AddOptions,
        added_by: &str,
    ) -> Result<Outcome<AddOutcome>, AppError> {
        let plan = PlacementEngine::new(current).add_cards(items, start_position, options, added_by)?;
        let write = self
            .repo
            .add(
                &plan.outcome.accepted,
                plan.outcome.start_position,
                options,
                Commit::new(current, &plan.target),
            )
            .await;
        settle(current.id, "add", write, plan.outcome)
    }
}

/// Maps a repository write to an outcome, discarding results that lost a version race.
fn settle<T>(
    binder_id: Uuid,
    op: &str,
    write: Result<BinderDocument, AppError>,
    result: T,
) -> Result<Outcome<T>, AppError> {
    match write {
        Ok(stored) => Ok(Outcome::Applied {
            version: stored.version,
            result,
        }),
        Err(e) => discard_if_stale(binder_id, op, e),
    }
}

fn discard_if_stale<T>(binder_id: Uuid, op: &str, e: AppError) -> Result<Outcome<T>, AppError> {
    match e {
        AppError::Placement(PlacementError::StaleOperation { expected, found }) => {
            info!(binder_id = %binder_id, op, expected, found, "Discarding stale operation");
            Ok(Outcome::Discarded)
        }
        other => Err(other),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use serde_json::json;
    use tokio::sync::Notify;

    use crate::binder::models::CardData;
    use crate::binder::persistence::MemoryBinderRepository;
    use crate::card_source::CardSourceError;

    fn set_cards(n: usize) -> Vec<CardData> {
        (0..n)
            .map(|i| {
                let rarity = if i % 2 == 0 { "Common" } else { "Rare Ultra" };
                CardData(json!({"id": format!("sv1-{i}"), "number": i.to_string(), "rarity": rarity}))
            })
            .collect()
    }

    struct FixedSource {
        cards: Vec<CardData>,
    }

    #[async_trait]
    impl CardSource for FixedSource {
        async fn fetch_set(&self, set_id: &str) -> Result<Vec<CardData>, CardSourceError> {
            if set_id == "sv1" {
                Ok(self.cards.clone())
            } else {
                Err(CardSourceError::SetNotFound(set_id.to_string()))
            }
        }

        async fn set_size(&self, _set_id: &str) -> Result<usize, CardSourceError> {
            Ok(self.cards.len())
        }
    }

    /// Signals when a fetch starts, then waits to be released.
    struct GatedSource {
        cards: Vec<CardData>,
        started: Arc<Notify>,
        release: Arc<Notify>,
    }

    #[async_trait]
    impl CardSource for GatedSource {
        async fn fetch_set(&self, _set_id: &str) -> Result<Vec<CardData>, CardSourceError> {
            self.started.notify_one();
            self.release.notified().await;
            Ok(self.cards.clone())
        }

        async fn set_size(&self, _set_id: &str) -> Result<usize, CardSourceError> {
            Ok(self.cards.len())
        }
    }

    /// Commits one competing rename between the service's load and its write.
    #[derive(Default)]
    struct RivalWriteRepository {
        inner: MemoryBinderRepository,
        armed: AtomicBool,
    }

    #[async_trait]
    impl BinderRepository for RivalWriteRepository {
        async fn create(&self, doc: &BinderDocument) -> Result<(), AppError> {
            self.inner.create(doc).await
        }

        async fn load(&self, binder_id: Uuid) -> Result<BinderDocument, AppError> {
            self.inner.load(binder_id).await
        }

        async fn write(&self, op: &'static str, commit: Commit<'_>) -> Result<BinderDocument, AppError> {
            if self.armed.swap(false, Ordering::SeqCst) {
                let current = self.inner.load(commit.target.id).await?;
                let mut renamed = current.clone();
                renamed.name = "Renamed elsewhere".to_string();
                self.inner.write("rename", Commit::new(&current, &renamed)).await?;
            }
            self.inner.write(op, commit).await
        }
    }

    fn defaults() -> BinderDefaults {
        BinderDefaults {
            grid_size: "3x3".to_string(),
            min_pages: 1,
            max_pages: 20,
        }
    }

    fn service_with(source: Arc<dyn CardSource>) -> BinderService {
        BinderService::new(Arc::new(MemoryBinderRepository::new()), source, defaults())
    }

    fn service() -> BinderService {
        service_with(Arc::new(FixedSource { cards: set_cards(12) }))
    }

    async fn create(svc: &BinderService, pages: u32) -> Uuid {
        let summary = svc
            .create_binder(CreateBinderRequest {
                name: "Scarlet & Violet".to_string(),
                owner: "nemona".to_string(),
                grid_size: None,
                min_pages: Some(pages),
                max_pages: None,
            })
            .await
            .unwrap();
        summary.id
    }

    fn add_request(n: usize, start_position: Option<usize>) -> AddCardsRequest {
        AddCardsRequest {
            cards: set_cards(n).into_iter().map(NewCard::from).collect(),
            start_position,
            options: AddOptions::default(),
            added_by: "nemona".to_string(),
        }
    }

    // ── create / read ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_create_rejects_unknown_grid() {
        let svc = service();
        let err = svc
            .create_binder(CreateBinderRequest {
                name: "Odd".to_string(),
                owner: "nemona".to_string(),
                grid_size: Some("5x5".to_string()),
                min_pages: None,
                max_pages: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_page_view_past_end_not_found() {
        let svc = service();
        let id = create(&svc, 1).await;
        assert!(svc.page_view(id, 0).await.is_ok());
        assert!(matches!(svc.page_view(id, 1).await, Err(AppError::NotFound(_))));
    }

    // ── add ─────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_add_over_capacity_changes_nothing() {
        let svc = service();
        let id = create(&svc, 1).await;

        let err = svc.add_cards(id, add_request(10, None)).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Placement(PlacementError::LimitExceeded { remaining: 9, .. })
        ));
        let summary = svc.summary(id).await.unwrap();
        assert_eq!(summary.layout.occupancy, 0);
        assert_eq!(summary.version, 0);
    }

    #[tokio::test]
    async fn test_add_then_insert_shifts() {
        let svc = service();
        let id = create(&svc, 2).await;
        svc.add_cards(id, add_request(4, None)).await.unwrap();

        let outcome = svc.add_cards(id, add_request(2, Some(1))).await.unwrap();
        let result = outcome.applied().unwrap();
        assert_eq!(result.shifted, 3);

        let summary = svc.summary(id).await.unwrap();
        assert_eq!(summary.layout.occupancy, 6);
        assert_eq!(summary.layout.max_occupied_position, Some(5));
        assert_eq!(summary.version, 2);
    }

    #[tokio::test]
    async fn test_add_set_with_reverse_holos() {
        let svc = service();
        let id = create(&svc, 2).await;
        let outcome = svc
            .add_set(
                id,
                AddSetRequest {
                    set_id: "sv1".to_string(),
                    start_position: None,
                    replace: false,
                    reverse_holo: true,
                    expansion: None,
                    added_by: "nemona".to_string(),
                },
            )
            .await
            .unwrap();
        // 12 cards, 6 of them Common → 18 entries.
        assert_eq!(outcome.applied().unwrap().accepted.len(), 18);
    }

    #[tokio::test]
    async fn test_replace_set_after_clear_leaves_only_set() {
        let svc = service();
        let id = create(&svc, 2).await;
        svc.add_cards(id, add_request(7, None)).await.unwrap();
        let cleared = svc.clear(id, "replace with set").await.unwrap().applied().unwrap();
        assert_eq!(cleared.count, 7);

        svc.add_set(
            id,
            AddSetRequest {
                set_id: "sv1".to_string(),
                start_position: None,
                replace: true,
                reverse_holo: false,
                expansion: None,
                added_by: "nemona".to_string(),
            },
        )
        .await
        .unwrap();

        let page = svc.page_view(id, 0).await.unwrap();
        let crate::binder::view::PageSideView::Cards { slots, .. } = page.right else {
            panic!("expected cards");
        };
        let ids: Vec<_> = slots
            .iter()
            .map(|s| s.entry.as_ref().and_then(|e| e.card_data.id()).map(str::to_string))
            .collect();
        let expected: Vec<_> = (0..9).map(|i| Some(format!("sv1-{i}"))).collect();
        assert_eq!(ids, expected);
        assert_eq!(svc.summary(id).await.unwrap().layout.occupancy, 12);
    }

    #[tokio::test]
    async fn test_add_unknown_set_surfaces_error() {
        let svc = service();
        let id = create(&svc, 1).await;
        let err = svc
            .add_set(
                id,
                AddSetRequest {
                    set_id: "nope".to_string(),
                    start_position: None,
                    replace: false,
                    reverse_holo: false,
                    expansion: None,
                    added_by: "nemona".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::CardSource(CardSourceError::SetNotFound(_))));
    }

    #[tokio::test]
    async fn test_set_fetch_superseded_by_clear_is_discarded() {
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let svc = service_with(Arc::new(GatedSource {
            cards: set_cards(3),
            started: started.clone(),
            release: release.clone(),
        }));
        let id = create(&svc, 1).await;
        svc.add_cards(id, add_request(2, None)).await.unwrap();

        let pending = tokio::spawn({
            let svc = svc.clone();
            async move {
                svc.add_set(
                    id,
                    AddSetRequest {
                        set_id: "sv1".to_string(),
                        start_position: None,
                        replace: false,
                        reverse_holo: false,
                        expansion: None,
                        added_by: "nemona".to_string(),
                    },
                )
                .await
            }
        });

        started.notified().await;
        svc.clear(id, "start over").await.unwrap();
        release.notify_one();

        let outcome = pending.await.unwrap().unwrap();
        assert!(matches!(outcome, Outcome::Discarded));
        assert_eq!(svc.summary(id).await.unwrap().layout.occupancy, 0);
    }

    #[tokio::test]
    async fn test_estimate_set_uses_reverse_holo_heuristic() {
        let svc = service();
        let id = create(&svc, 1).await;
        let estimate = svc.estimate_set(id, "sv1", true, false).await.unwrap();
        assert_eq!(estimate.set_size, 12);
        assert_eq!(estimate.estimated_reverse_holos, 8);
        assert_eq!(estimate.remaining, 9);
        assert!(!estimate.fits);
    }

    // ── move / remove / missing ─────────────────────────────────────────────

    #[tokio::test]
    async fn test_move_and_remove() {
        let svc = service();
        let id = create(&svc, 1).await;
        svc.add_cards(id, add_request(3, None)).await.unwrap();

        svc.move_cards(id, &[CardMove { from_position: 0, to_position: 8 }])
            .await
            .unwrap();
        let removed = svc.remove_card(id, 8).await.unwrap().applied().unwrap();
        assert_eq!(removed.card_data.id(), Some("sv1-0"));

        let err = svc.remove_card(id, 8).await.unwrap_err();
        assert!(matches!(err, AppError::Placement(PlacementError::EmptyPosition(8))));
        assert_eq!(svc.summary(id).await.unwrap().layout.max_occupied_position, Some(2));
    }

    #[tokio::test]
    async fn test_write_losing_version_race_is_discarded() {
        let repo = Arc::new(RivalWriteRepository::default());
        let svc = BinderService::new(
            repo.clone(),
            Arc::new(FixedSource { cards: set_cards(12) }),
            defaults(),
        );
        let id = create(&svc, 1).await;
        svc.add_cards(id, add_request(3, None)).await.unwrap();
        let before = repo.load(id).await.unwrap();

        repo.armed.store(true, Ordering::SeqCst);
        let outcome = svc
            .move_cards(id, &[CardMove { from_position: 0, to_position: 5 }])
            .await
            .unwrap();
        assert!(matches!(outcome, Outcome::Discarded));

        let after = repo.load(id).await.unwrap();
        assert_eq!(after.name, "Renamed elsewhere");
        assert_eq!(after.version, before.version + 1);
        assert_eq!(after.cards, before.cards);
    }

    #[tokio::test]
    async fn test_unknown_binder_leaves_no_lock_behind() {
        let svc = service();
        for _ in 0..10 {
            let err = svc.remove_card(Uuid::new_v4(), 0).await.unwrap_err();
            assert!(matches!(err, AppError::NotFound(_)));
        }
        assert_eq!(svc.locks.tracked(), 0);
    }

    #[tokio::test]
    async fn test_missing_mark_is_pruned_on_remove() {
        let svc = service();
        let id = create(&svc, 1).await;
        let added = svc.add_cards(id, add_request(2, None)).await.unwrap();
        let instance = added.applied().unwrap().accepted[1].entry.instance_id;

        assert_eq!(svc.set_missing(id, instance, true).await.unwrap().applied(), Some(true));
        assert_eq!(svc.summary(id).await.unwrap().missing_count, 1);

        svc.remove_card(id, 1).await.unwrap();
        assert_eq!(svc.summary(id).await.unwrap().missing_count, 0);
        assert!(matches!(
            svc.set_missing(id, instance, true).await,
            Err(AppError::NotFound(_))
        ));
    }

    // ── expansion ───────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_expansion_options_then_apply() {
        let svc = service();
        let id = create(&svc, 1).await;
        let options = svc.expansion_options(id, 12).await.unwrap();
        assert!(!options.is_empty());

        let pages = options
            .iter()
            .find(|o| matches!(o.action, ExpansionAction::AddPages { .. }))
            .unwrap();
        let summary = svc
            .apply_expansion(id, &pages.action)
            .await
            .unwrap()
            .applied()
            .unwrap();
        assert_eq!(summary.layout.capacity, pages.new_capacity);

        svc.add_cards(id, add_request(12, None)).await.unwrap();
    }

    // ── settings ────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_update_settings_refuses_stranding_cards() {
        let svc = service();
        let id = create(&svc, 2).await;
        svc.add_cards(id, add_request(12, None)).await.unwrap();

        let err = svc
            .update_settings(
                id,
                UpdateBinderRequest {
                    grid_size: Some("2x2".to_string()),
                    page_count: Some(1),
                    min_pages: Some(1),
                    max_pages: Some(1),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(svc.summary(id).await.unwrap().settings.grid_size, "3x3");
    }

    #[tokio::test]
    async fn test_update_settings_keeps_occupied_pages() {
        let svc = service();
        let id = create(&svc, 1).await;
        svc.add_cards(id, add_request(9, None)).await.unwrap();

        let summary = svc
            .update_settings(
                id,
                UpdateBinderRequest {
                    name: Some("  Paldea  ".to_string()),
                    grid_size: Some(" 2x2 ".to_string()),
                    page_count: Some(1),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .applied()
            .unwrap();
        assert_eq!(summary.name, "Paldea");
        assert_eq!(summary.settings.grid_size, "2x2");
        // 9 cards on 4-slot pages need 3 physical pages, i.e. 2 logical pages.
        assert_eq!(summary.settings.page_count, 2);
        assert_eq!(summary.layout.occupancy, 9);
    }
}
