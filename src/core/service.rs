//! Storage service trait for property persistence
//!
//! The rest of the crate is agnostic to the backing store: handlers and
//! the ingestion pipeline only see [`PropertyStore`]. The PostgreSQL
//! implementation lives in `crate::storage::postgres`; an in-memory
//! implementation backs development and the integration tests.

use async_trait::async_trait;

use crate::core::error::StorageError;
use crate::core::filter::FilterCriteria;
use crate::core::model::{LeaseWithTenant, NewLocation, NewProperty, PropertyWithLocation};

/// Persistence operations for properties and their locations.
#[async_trait]
pub trait PropertyStore: Send + Sync {
    /// Execute a search as one read query.
    ///
    /// The criteria are compiled to a single AND-folded predicate;
    /// every returned row carries its denormalized location with
    /// decoded numeric coordinates.
    async fn search(
        &self,
        criteria: &FilterCriteria,
    ) -> Result<Vec<PropertyWithLocation>, StorageError>;

    /// Fetch one property with its location.
    ///
    /// Returns `StorageError::NotFound` when no row matches.
    async fn get(&self, id: i32) -> Result<PropertyWithLocation, StorageError>;

    /// Atomically insert a location and its owning property.
    ///
    /// Both inserts happen in one transaction: a failure after the
    /// location insert rolls the location back, so a location row
    /// never exists without an owning property.
    async fn create_with_location(
        &self,
        location: NewLocation,
        property: NewProperty,
    ) -> Result<PropertyWithLocation, StorageError>;

    /// Leases for a property, each with its tenant embedded.
    ///
    /// A property without leases yields an empty vector, not an error.
    async fn leases_for_property(
        &self,
        property_id: i32,
    ) -> Result<Vec<LeaseWithTenant>, StorageError>;
}
