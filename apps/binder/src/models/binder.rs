use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::binder::models::{BinderDocument, BinderSettings};
use crate::binder::overlay::MissingOverlay;
use crate::binder::store::PositionStore;

#[derive(Debug, Clone, FromRow)]
pub struct BinderRow {
    pub id: Uuid,
    pub name: String,
    pub owner: String,
    pub settings: Json<BinderSettings>,
    pub cards: Json<PositionStore>,
    pub missing: Json<MissingOverlay>,
    pub version: i64,
    pub generation: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<BinderRow> for BinderDocument {
    fn from(row: BinderRow) -> Self {
        BinderDocument {
            id: row.id,
            name: row.name,
            owner: row.owner,
            settings: row.settings.0,
            cards: row.cards.0,
            missing: row.missing.0,
            version: row.version.max(0) as u64,
            generation: row.generation.max(0) as u64,
            updated_at: row.updated_at,
        }
    }
}
