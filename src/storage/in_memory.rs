//! In-memory implementation of PropertyStore for testing and development
//!
//! Filter semantics mirror the PostgreSQL backend: inclusive numeric
//! bounds, amenity-superset containment, a correlated lease-existence
//! check for availability, and geodesic (haversine) proximity with the
//! configured radius.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Arc, RwLock};

use crate::core::error::StorageError;
use crate::core::filter::FilterCriteria;
use crate::core::geo::haversine_meters;
use crate::core::model::{
    Lease, LeaseWithTenant, Location, NewLocation, NewProperty, Property, PropertyWithLocation,
    Tenant,
};
use crate::core::service::PropertyStore;

#[derive(Default)]
struct StoreState {
    next_id: i32,
    next_lease_id: i32,
    properties: Vec<PropertyWithLocation>,
    leases: Vec<LeaseWithTenant>,
}

/// Thread-safe in-memory property store.
#[derive(Clone)]
pub struct InMemoryPropertyStore {
    state: Arc<RwLock<StoreState>>,
    radius_meters: f64,
    fail_writes: bool,
}

impl InMemoryPropertyStore {
    pub fn new(radius_meters: f64) -> Self {
        Self {
            state: Arc::new(RwLock::new(StoreState::default())),
            radius_meters,
            fail_writes: false,
        }
    }

    /// Make every write fail with a transaction error. Lets tests walk
    /// the storage-failure paths without a database.
    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    pub fn property_count(&self) -> usize {
        self.state.read().expect("store lock poisoned").properties.len()
    }

    /// Locations are owned 1:1 by properties, so the counts always
    /// move together; both are exposed for tests asserting that a
    /// failed ingestion leaves nothing behind.
    pub fn location_count(&self) -> usize {
        self.property_count()
    }

    /// Attach a lease (with its tenant) to a property.
    pub fn add_lease(
        &self,
        property_id: i32,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
        rent: f64,
        tenant: Tenant,
    ) -> Lease {
        let mut state = self.state.write().expect("store lock poisoned");
        state.next_lease_id += 1;
        let lease = Lease {
            id: state.next_lease_id,
            start_date,
            end_date,
            rent,
            deposit: rent,
            property_id,
            tenant_id: tenant.id,
        };
        state.leases.push(LeaseWithTenant {
            lease: lease.clone(),
            tenant,
        });
        lease
    }
}

fn matches(
    criteria: &FilterCriteria,
    entry: &PropertyWithLocation,
    leases: &[LeaseWithTenant],
    radius_meters: f64,
) -> bool {
    let p = &entry.property;

    if let Some(ids) = &criteria.favorite_ids {
        if !ids.contains(&p.id) {
            return false;
        }
    }
    if let Some(min) = criteria.price_min {
        if p.price_per_month < min {
            return false;
        }
    }
    if let Some(max) = criteria.price_max {
        if p.price_per_month > max {
            return false;
        }
    }
    if let Some(min) = criteria.beds_min {
        if p.beds < min {
            return false;
        }
    }
    if let Some(min) = criteria.baths_min {
        if p.baths < min {
            return false;
        }
    }
    if let Some(min) = criteria.square_feet_min {
        if p.square_feet < min {
            return false;
        }
    }
    if let Some(max) = criteria.square_feet_max {
        if p.square_feet > max {
            return false;
        }
    }
    if let Some(ty) = criteria.property_type {
        if p.property_type != ty {
            return false;
        }
    }
    if let Some(required) = &criteria.amenities {
        if !required.iter().all(|tag| p.amenities.contains(tag)) {
            return false;
        }
    }
    if let Some(date) = criteria.available_from {
        let has_lease = leases
            .iter()
            .any(|l| l.lease.property_id == p.id && l.lease.start_date.date_naive() <= date);
        if !has_lease {
            return false;
        }
    }
    if let Some(center) = criteria.center {
        if haversine_meters(center, entry.location.coordinates) > radius_meters {
            return false;
        }
    }

    true
}

#[async_trait]
impl PropertyStore for InMemoryPropertyStore {
    async fn search(
        &self,
        criteria: &FilterCriteria,
    ) -> Result<Vec<PropertyWithLocation>, StorageError> {
        let state = self.state.read().map_err(|_| StorageError::QueryFailed {
            message: "store lock poisoned".to_string(),
        })?;

        Ok(state
            .properties
            .iter()
            .filter(|entry| matches(criteria, entry, &state.leases, self.radius_meters))
            .cloned()
            .collect())
    }

    async fn get(&self, id: i32) -> Result<PropertyWithLocation, StorageError> {
        let state = self.state.read().map_err(|_| StorageError::QueryFailed {
            message: "store lock poisoned".to_string(),
        })?;

        state
            .properties
            .iter()
            .find(|entry| entry.property.id == id)
            .cloned()
            .ok_or(StorageError::NotFound {
                entity: "property",
                id,
            })
    }

    async fn create_with_location(
        &self,
        location: NewLocation,
        property: NewProperty,
    ) -> Result<PropertyWithLocation, StorageError> {
        if self.fail_writes {
            return Err(StorageError::TransactionFailed {
                message: "simulated write failure".to_string(),
            });
        }

        let mut state = self.state.write().map_err(|_| StorageError::QueryFailed {
            message: "store lock poisoned".to_string(),
        })?;

        state.next_id += 1;
        let id = state.next_id;

        let entry = PropertyWithLocation {
            property: Property {
                id,
                name: property.name,
                description: property.description,
                price_per_month: property.price_per_month,
                security_deposit: property.security_deposit,
                application_fee: property.application_fee,
                photo_urls: property.photo_urls,
                amenities: property.amenities,
                highlights: property.highlights,
                is_pets_allowed: property.is_pets_allowed,
                is_parking_included: property.is_parking_included,
                beds: property.beds,
                baths: property.baths,
                square_feet: property.square_feet,
                property_type: property.property_type,
                posted_date: Utc::now(),
                location_id: id,
                manager_id: property.manager_id,
            },
            location: Location {
                id,
                address: location.address,
                city: location.city,
                state: location.state,
                country: location.country,
                postal_code: location.postal_code,
                coordinates: location.coordinates,
            },
        };

        state.properties.push(entry.clone());
        Ok(entry)
    }

    async fn leases_for_property(
        &self,
        property_id: i32,
    ) -> Result<Vec<LeaseWithTenant>, StorageError> {
        let state = self.state.read().map_err(|_| StorageError::QueryFailed {
            message: "store lock poisoned".to_string(),
        })?;

        Ok(state
            .leases
            .iter()
            .filter(|l| l.lease.property_id == property_id)
            .cloned()
            .collect())
    }
}
