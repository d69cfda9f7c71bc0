//! # Homestead
//!
//! Backend service for rental property listings. Two pieces carry the
//! weight:
//!
//! - **Search**: optional filter parameters are compiled into a single
//!   safe, parameterized geospatial query (PostGIS geodesic distance
//!   for the proximity filter).
//! - **Ingestion**: listing creation geocodes the address (primary
//!   provider with fallback), uploads photos to object storage
//!   (concurrent, order-preserving, all-or-nothing) and persists the
//!   location + property pair in one transaction.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use homestead::prelude::*;
//!
//! let store = Arc::new(InMemoryPropertyStore::new(50_000.0));
//! let uploader = MediaUploader::new(Arc::new(MemoryObjectStore::new()), 4, 2);
//! let resolver = Arc::new(GeocodingResolver::new(providers, timeout));
//! let orchestrator = IngestionOrchestrator::new(store.clone(), uploader, resolver);
//! let app = build_router(AppState { store, orchestrator });
//! ```

pub mod config;
pub mod core;
pub mod geocode;
pub mod ingest;
pub mod media;
pub mod server;
pub mod storage;

/// Re-exports of commonly used types
pub mod prelude {
    pub use crate::config::AppConfig;
    pub use crate::core::error::{HomesteadError, HomesteadResult};
    pub use crate::core::filter::{FilterCriteria, SearchQuery};
    pub use crate::core::geo::Coordinates;
    pub use crate::core::model::{
        Location, NewLocation, NewProperty, Property, PropertyType, PropertyWithLocation,
    };
    pub use crate::core::service::PropertyStore;
    pub use crate::geocode::{GeocodingResolver, GoogleGeocoder, NominatimGeocoder};
    pub use crate::ingest::IngestionOrchestrator;
    pub use crate::media::{MediaUploader, MemoryObjectStore, S3ObjectStore};
    pub use crate::server::{build_router, AppState};
    pub use crate::storage::{InMemoryPropertyStore, PgPropertyStore};

    pub use std::sync::Arc;
}
