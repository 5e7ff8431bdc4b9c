use crate::binder::service::BinderService;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Placement operations, serialized per binder.
    pub binders: BinderService,
}
