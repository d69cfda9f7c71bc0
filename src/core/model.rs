//! Domain types for listings, locations, leases and tenants
//!
//! Wire field names are camelCase to match the public JSON contract.
//! Identifiers are `i32` serial ids assigned by the database; the
//! object-storage layer uses UUIDs for photo keys instead.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

use crate::core::geo::Coordinates;

/// Closed enumeration of listing categories.
///
/// Search filters naming a value outside this set are rejected before
/// compilation; the raw string is never embedded into a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyType {
    Rooms,
    Tinyhouse,
    Apartment,
    Villa,
    Townhouse,
    Cottage,
}

impl PropertyType {
    pub const ALL: [PropertyType; 6] = [
        PropertyType::Rooms,
        PropertyType::Tinyhouse,
        PropertyType::Apartment,
        PropertyType::Villa,
        PropertyType::Townhouse,
        PropertyType::Cottage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::Rooms => "Rooms",
            PropertyType::Tinyhouse => "Tinyhouse",
            PropertyType::Apartment => "Apartment",
            PropertyType::Villa => "Villa",
            PropertyType::Townhouse => "Townhouse",
            PropertyType::Cottage => "Cottage",
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropertyType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PropertyType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or(())
    }
}

/// A postal address with decoded point coordinates.
///
/// Owned 1:1 by a property; the storage layer guarantees a location row
/// never outlives its owning property. Coordinates equal to the (0,0)
/// sentinel mean geocoding failed for this address.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: i32,
    pub address: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub postal_code: String,
    pub coordinates: Coordinates,
}

/// A persisted rental listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub price_per_month: f64,
    pub security_deposit: f64,
    pub application_fee: f64,
    /// Photo URLs in upload order
    pub photo_urls: Vec<String>,
    /// De-duplicated amenity tags
    pub amenities: Vec<String>,
    /// De-duplicated highlight tags
    pub highlights: Vec<String>,
    pub is_pets_allowed: bool,
    pub is_parking_included: bool,
    pub beds: i32,
    pub baths: f64,
    pub square_feet: i32,
    pub property_type: PropertyType,
    pub posted_date: DateTime<Utc>,
    pub location_id: i32,
    pub manager_id: String,
}

/// A property joined with its location, as returned by every read path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyWithLocation {
    #[serde(flatten)]
    pub property: Property,
    pub location: Location,
}

/// A lease on a property.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lease {
    pub id: i32,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub rent: f64,
    pub deposit: f64,
    pub property_id: i32,
    pub tenant_id: i32,
}

/// A tenant. Identity lives in the external auth service; `external_id`
/// is the opaque reference it hands us.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: i32,
    pub external_id: String,
    pub name: String,
    pub email: String,
    pub phone_number: String,
}

/// A lease with its tenant embedded, as served by the leases endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaseWithTenant {
    #[serde(flatten)]
    pub lease: Lease,
    pub tenant: Tenant,
}

/// Attributes for a location row about to be inserted.
#[derive(Debug, Clone)]
pub struct NewLocation {
    pub address: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub postal_code: String,
    pub coordinates: Coordinates,
}

/// Attributes for a property row about to be inserted.
///
/// Numeric attributes are validated non-negative before any external
/// call is made; tag lists arrive already de-duplicated from the
/// normalization step.
#[derive(Debug, Clone, Validate)]
pub struct NewProperty {
    pub name: String,
    pub description: String,
    #[validate(range(min = 0.0))]
    pub price_per_month: f64,
    #[validate(range(min = 0.0))]
    pub security_deposit: f64,
    #[validate(range(min = 0.0))]
    pub application_fee: f64,
    pub photo_urls: Vec<String>,
    pub amenities: Vec<String>,
    pub highlights: Vec<String>,
    pub is_pets_allowed: bool,
    pub is_parking_included: bool,
    #[validate(range(min = 0))]
    pub beds: i32,
    #[validate(range(min = 0.0))]
    pub baths: f64,
    #[validate(range(min = 0))]
    pub square_feet: i32,
    pub property_type: PropertyType,
    pub manager_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_type_round_trip() {
        for ty in PropertyType::ALL {
            let parsed: PropertyType = ty.as_str().parse().unwrap();
            assert_eq!(parsed, ty);
        }
    }

    #[test]
    fn test_property_type_parse_is_case_insensitive() {
        let parsed: PropertyType = "apartment".parse().unwrap();
        assert_eq!(parsed, PropertyType::Apartment);
    }

    #[test]
    fn test_property_type_rejects_unknown() {
        assert!("Castle".parse::<PropertyType>().is_err());
        assert!("".parse::<PropertyType>().is_err());
    }

    #[test]
    fn test_new_property_rejects_negative_price() {
        let prop = NewProperty {
            name: "Test".to_string(),
            description: String::new(),
            price_per_month: -100.0,
            security_deposit: 0.0,
            application_fee: 0.0,
            photo_urls: vec![],
            amenities: vec![],
            highlights: vec![],
            is_pets_allowed: false,
            is_parking_included: false,
            beds: 1,
            baths: 1.0,
            square_feet: 400,
            property_type: PropertyType::Apartment,
            manager_id: "mgr-1".to_string(),
        };
        assert!(prop.validate().is_err());
    }

    #[test]
    fn test_property_serializes_camel_case() {
        let json = serde_json::to_value(Property {
            id: 1,
            name: "Loft".to_string(),
            description: String::new(),
            price_per_month: 1500.0,
            security_deposit: 500.0,
            application_fee: 25.0,
            photo_urls: vec![],
            amenities: vec![],
            highlights: vec![],
            is_pets_allowed: true,
            is_parking_included: false,
            beds: 1,
            baths: 1.0,
            square_feet: 600,
            property_type: PropertyType::Apartment,
            posted_date: Utc::now(),
            location_id: 1,
            manager_id: "mgr-1".to_string(),
        })
        .unwrap();
        assert!(json.get("pricePerMonth").is_some());
        assert!(json.get("isPetsAllowed").is_some());
        assert_eq!(json["propertyType"], "Apartment");
    }
}
