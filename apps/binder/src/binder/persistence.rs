//! Binder persistence: the system of record behind the placement engine.
//!
//! The engine plans a complete target document; the repository writes it in one
//! conditional update. A write planned against a version that is no longer
//! current fails with `StaleOperation` and changes nothing.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use sqlx::PgPool;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::binder::error::PlacementError;
use crate::binder::models::BinderDocument;
use crate::binder::placement::{AddOptions, CardMove, PlacedCard};
use crate::errors::AppError;
use crate::models::binder::BinderRow;

/// One consolidated write: the full target document and the version it was
/// planned against.
#[derive(Debug, Clone, Copy)]
pub struct Commit<'a> {
    pub base_version: u64,
    pub target: &'a BinderDocument,
}

impl<'a> Commit<'a> {
    pub fn new(base: &BinderDocument, target: &'a BinderDocument) -> Self {
        Self {
            base_version: base.version,
            target,
        }
    }
}

/// System of record for binder documents.
///
/// Each operation-named write (`add`, `move_cards`, `remove`, `clear`, ...) is
/// one consolidated `write`: the `Commit` target already holds the complete
/// result, and the extra arguments only describe the operation for the log.
/// Operation results such as the cleared count come from the engine's `Plan`,
/// not from storage.
#[async_trait]
pub trait BinderRepository: Send + Sync {
    async fn create(&self, doc: &BinderDocument) -> Result<(), AppError>;

    async fn load(&self, binder_id: Uuid) -> Result<BinderDocument, AppError>;

    /// Stores `commit.target` if the stored version still equals
    /// `commit.base_version`, bumping the version. Returns the stored document.
    async fn write(&self, op: &'static str, commit: Commit<'_>) -> Result<BinderDocument, AppError>;

    async fn add(
        &self,
        entries: &[PlacedCard],
        start_position: usize,
        options: &AddOptions,
        commit: Commit<'_>,
    ) -> Result<BinderDocument, AppError> {
        debug!(
            binder_id = %commit.target.id,
            count = entries.len(),
            start_position,
            replacement = options.is_replacement,
            "Committing card addition"
        );
        self.write("add", commit).await
    }

    async fn move_cards(&self, moves: &[CardMove], commit: Commit<'_>) -> Result<BinderDocument, AppError> {
        debug!(binder_id = %commit.target.id, moves = moves.len(), "Committing card moves");
        self.write("move", commit).await
    }

    async fn remove(&self, position: usize, commit: Commit<'_>) -> Result<BinderDocument, AppError> {
        debug!(binder_id = %commit.target.id, position, "Committing card removal");
        self.write("remove", commit).await
    }

    async fn clear(&self, reason: &str, commit: Commit<'_>) -> Result<BinderDocument, AppError> {
        debug!(binder_id = %commit.target.id, reason, "Committing binder clear");
        self.write("clear", commit).await
    }

    async fn update_overlay(&self, commit: Commit<'_>) -> Result<BinderDocument, AppError> {
        self.write("overlay", commit).await
    }

    async fn update_settings(&self, commit: Commit<'_>) -> Result<BinderDocument, AppError> {
        self.write("settings", commit).await
    }
}

// ────────────────────────────────────────────────────────────────────────────
// PostgreSQL
// ────────────────────────────────────────────────────────────────────────────

/// Stores each binder as one row with JSONB document columns.
#[derive(Clone)]
pub struct PgBinderRepository {
    pool: PgPool,
}

impl PgBinderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BinderRepository for PgBinderRepository {
    async fn create(&self, doc: &BinderDocument) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO binders
                (id, name, owner, settings, cards, missing, version, generation, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(doc.id)
        .bind(&doc.name)
        .bind(&doc.owner)
        .bind(Json(&doc.settings))
        .bind(Json(&doc.cards))
        .bind(Json(&doc.missing))
        .bind(doc.version as i64)
        .bind(doc.generation as i64)
        .bind(doc.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn load(&self, binder_id: Uuid) -> Result<BinderDocument, AppError> {
        let row: Option<BinderRow> = sqlx::query_as("SELECT * FROM binders WHERE id = $1")
            .bind(binder_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(BinderDocument::from)
            .ok_or_else(|| AppError::NotFound(format!("Binder {binder_id} not found")))
    }

    async fn write(&self, op: &'static str, commit: Commit<'_>) -> Result<BinderDocument, AppError> {
        let target = commit.target;
        let row: Option<BinderRow> = sqlx::query_as(
            r#"
            UPDATE binders
            SET name = $3, settings = $4, cards = $5, missing = $6,
                generation = $7, version = version + 1, updated_at = now()
            WHERE id = $1 AND version = $2
            RETURNING *
            "#,
        )
        .bind(target.id)
        .bind(commit.base_version as i64)
        .bind(&target.name)
        .bind(Json(&target.settings))
        .bind(Json(&target.cards))
        .bind(Json(&target.missing))
        .bind(target.generation as i64)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            debug!(binder_id = %target.id, op, version = row.version, "Binder written");
            return Ok(row.into());
        }

        let found: Option<i64> = sqlx::query_scalar("SELECT version FROM binders WHERE id = $1")
            .bind(target.id)
            .fetch_optional(&self.pool)
            .await?;
        match found {
            Some(found) => Err(PlacementError::StaleOperation {
                expected: commit.base_version,
                found: found.max(0) as u64,
            }
            .into()),
            None => Err(AppError::NotFound(format!("Binder {} not found", target.id))),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory
// ────────────────────────────────────────────────────────────────────────────

/// Process-local repository with the same versioning rules as the database.
#[derive(Default)]
pub struct MemoryBinderRepository {
    binders: RwLock<HashMap<Uuid, BinderDocument>>,
}

impl MemoryBinderRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BinderRepository for MemoryBinderRepository {
    async fn create(&self, doc: &BinderDocument) -> Result<(), AppError> {
        let mut binders = self.binders.write().await;
        if binders.contains_key(&doc.id) {
            return Err(AppError::Validation(format!("Binder {} already exists", doc.id)));
        }
        binders.insert(doc.id, doc.clone());
        Ok(())
    }

    async fn load(&self, binder_id: Uuid) -> Result<BinderDocument, AppError> {
        self.binders
            .read()
            .await
            .get(&binder_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Binder {binder_id} not found")))
    }

    async fn write(&self, op: &'static str, commit: Commit<'_>) -> Result<BinderDocument, AppError> {
        let mut binders = self.binders.write().await;
        let stored = binders
            .get_mut(&commit.target.id)
            .ok_or_else(|| AppError::NotFound(format!("Binder {} not found", commit.target.id)))?;

        if stored.version != commit.base_version {
            return Err(PlacementError::StaleOperation {
                expected: commit.base_version,
                found: stored.version,
            }
            .into());
        }

        let mut next = commit.target.clone();
        next.version = stored.version + 1;
        next.updated_at = Utc::now();
        *stored = next.clone();
        debug!(binder_id = %next.id, op, version = next.version, "Binder written");
        Ok(next)
    }
}
