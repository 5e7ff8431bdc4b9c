// Binder placement: sparse slot map, missing overlay, placement engine,
// persistence, and the service that serializes and commits operations.

pub mod error;
pub mod expansion;
pub mod handlers;
pub mod locks;
pub mod models;
pub mod overlay;
pub mod persistence;
pub mod placement;
pub mod reverse_holo;
pub mod service;
pub mod store;
pub mod view;
