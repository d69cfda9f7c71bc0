//! HTTP exposure: handlers, router and shared state

pub mod handlers;
pub mod router;

pub use handlers::AppState;
pub use router::build_router;
