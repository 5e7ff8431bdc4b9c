pub mod health;

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::binder::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/binders", post(handlers::handle_create_binder))
        .route(
            "/api/v1/binders/:id",
            get(handlers::handle_get_binder).patch(handlers::handle_update_binder),
        )
        .route(
            "/api/v1/binders/:id/pages/:index",
            get(handlers::handle_get_page),
        )
        .route("/api/v1/binders/:id/cards", post(handlers::handle_add_cards))
        .route(
            "/api/v1/binders/:id/cards/move",
            post(handlers::handle_move_cards),
        )
        .route(
            "/api/v1/binders/:id/cards/:position",
            delete(handlers::handle_remove_card),
        )
        .route("/api/v1/binders/:id/clear", post(handlers::handle_clear))
        .route("/api/v1/binders/:id/sets", post(handlers::handle_add_set))
        .route(
            "/api/v1/binders/:id/sets/:set_id/estimate",
            get(handlers::handle_estimate_set),
        )
        .route(
            "/api/v1/binders/:id/expansion-options",
            get(handlers::handle_expansion_options),
        )
        .route(
            "/api/v1/binders/:id/expansion",
            post(handlers::handle_apply_expansion),
        )
        .route(
            "/api/v1/binders/:id/missing/:instance_id",
            put(handlers::handle_set_missing),
        )
        .with_state(state)
}
