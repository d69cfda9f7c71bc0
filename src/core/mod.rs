//! Core module: domain types, filter compilation and the storage trait

pub mod error;
pub mod filter;
pub mod geo;
pub mod model;
pub mod service;

pub use error::{HomesteadError, HomesteadResult};
pub use filter::{CompiledPredicate, FilterCriteria, SearchQuery};
pub use geo::Coordinates;
pub use model::{
    Lease, LeaseWithTenant, Location, NewLocation, NewProperty, Property, PropertyType,
    PropertyWithLocation, Tenant,
};
pub use service::PropertyStore;
