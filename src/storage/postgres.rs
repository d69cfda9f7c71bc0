//! PostgreSQL storage backend
//!
//! Requires the PostGIS extension: location points are stored as
//! `geography(Point, 4326)` and decoded to numeric longitude/latitude
//! on every read via `ST_X`/`ST_Y`. Search executes the compiled
//! predicate as one parameterized query; creation runs the two-table
//! insert inside a single transaction.

use async_trait::async_trait;
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, Row};

use crate::core::error::StorageError;
use crate::core::filter::{self, BindValue, CompileContext, FilterCriteria};
use crate::core::geo::Coordinates;
use crate::core::model::{
    Lease, LeaseWithTenant, Location, NewLocation, NewProperty, Property, PropertyWithLocation,
    Tenant,
};
use crate::core::service::PropertyStore;

/// Columns selected by every property read, with the location joined
/// in and its point decoded.
const PROPERTY_COLUMNS: &str = "\
    p.id, p.name, p.description, p.price_per_month, p.security_deposit, p.application_fee, \
    p.photo_urls, p.amenities, p.highlights, p.is_pets_allowed, p.is_parking_included, \
    p.beds, p.baths, p.square_feet, p.property_type, p.posted_date, p.location_id, p.manager_id, \
    l.address, l.city, l.state, l.country, l.postal_code, \
    ST_X(l.coordinates::geometry) AS longitude, ST_Y(l.coordinates::geometry) AS latitude";

#[derive(Clone)]
pub struct PgPropertyStore {
    pool: PgPool,
    /// Proximity search radius in meters (configured constant).
    radius_meters: f64,
}

impl PgPropertyStore {
    pub fn new(pool: PgPool, radius_meters: f64) -> Self {
        Self {
            pool,
            radius_meters,
        }
    }
}

/// Attach one typed parameter to a query. Values are always bound,
/// never rendered into the SQL text.
fn bind_value(
    query: Query<'_, Postgres, PgArguments>,
    value: BindValue,
) -> Query<'_, Postgres, PgArguments> {
    match value {
        BindValue::Int(v) => query.bind(v),
        BindValue::Float(v) => query.bind(v),
        BindValue::Text(v) => query.bind(v),
        BindValue::TextArray(v) => query.bind(v),
        BindValue::IntArray(v) => query.bind(v),
        BindValue::Date(v) => query.bind(v),
    }
}

fn row_to_property(row: &sqlx::postgres::PgRow) -> Result<PropertyWithLocation, StorageError> {
    let type_raw: String = row.get("property_type");
    let property_type = type_raw
        .parse()
        .map_err(|_| StorageError::QueryFailed {
            message: format!("unknown property type '{}' in row", type_raw),
        })?;

    Ok(PropertyWithLocation {
        property: Property {
            id: row.get("id"),
            name: row.get("name"),
            description: row.get("description"),
            price_per_month: row.get("price_per_month"),
            security_deposit: row.get("security_deposit"),
            application_fee: row.get("application_fee"),
            photo_urls: row.get("photo_urls"),
            amenities: row.get("amenities"),
            highlights: row.get("highlights"),
            is_pets_allowed: row.get("is_pets_allowed"),
            is_parking_included: row.get("is_parking_included"),
            beds: row.get("beds"),
            baths: row.get("baths"),
            square_feet: row.get("square_feet"),
            property_type,
            posted_date: row.get("posted_date"),
            location_id: row.get("location_id"),
            manager_id: row.get("manager_id"),
        },
        location: Location {
            id: row.get("location_id"),
            address: row.get("address"),
            city: row.get("city"),
            state: row.get("state"),
            country: row.get("country"),
            postal_code: row.get("postal_code"),
            coordinates: Coordinates::new(row.get("longitude"), row.get("latitude")),
        },
    })
}

#[async_trait]
impl PropertyStore for PgPropertyStore {
    async fn search(
        &self,
        criteria: &FilterCriteria,
    ) -> Result<Vec<PropertyWithLocation>, StorageError> {
        let predicate = filter::compile(
            criteria,
            &CompileContext {
                radius_meters: self.radius_meters,
            },
        );

        let mut sql = format!(
            "SELECT {} FROM properties p JOIN locations l ON p.location_id = l.id",
            PROPERTY_COLUMNS
        );
        if let Some(where_clause) = predicate.where_clause() {
            sql.push_str(" WHERE ");
            sql.push_str(&where_clause);
        }
        sql.push_str(" ORDER BY p.id");

        let mut query = sqlx::query(&sql);
        for value in predicate.binds().iter().cloned() {
            query = bind_value(query, value);
        }

        let rows = query.fetch_all(&self.pool).await.map_err(StorageError::from)?;
        rows.iter().map(row_to_property).collect()
    }

    async fn get(&self, id: i32) -> Result<PropertyWithLocation, StorageError> {
        let sql = format!(
            "SELECT {} FROM properties p JOIN locations l ON p.location_id = l.id WHERE p.id = $1",
            PROPERTY_COLUMNS
        );

        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;

        match row {
            Some(row) => row_to_property(&row),
            None => Err(StorageError::NotFound {
                entity: "property",
                id,
            }),
        }
    }

    async fn create_with_location(
        &self,
        location: NewLocation,
        property: NewProperty,
    ) -> Result<PropertyWithLocation, StorageError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::TransactionFailed {
                message: e.to_string(),
            })?;

        // Dropping `tx` on any early return rolls the location insert
        // back; a location row must never outlive this function without
        // its owning property.
        let location_row = sqlx::query(
            "INSERT INTO locations (address, city, state, country, postal_code, coordinates) \
             VALUES ($1, $2, $3, $4, $5, ST_SetSRID(ST_MakePoint($6, $7), 4326)::geography) \
             RETURNING id",
        )
        .bind(&location.address)
        .bind(&location.city)
        .bind(&location.state)
        .bind(&location.country)
        .bind(&location.postal_code)
        .bind(location.coordinates.longitude)
        .bind(location.coordinates.latitude)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| StorageError::TransactionFailed {
            message: e.to_string(),
        })?;
        let location_id: i32 = location_row.get("id");

        let property_row = sqlx::query(
            "INSERT INTO properties (name, description, price_per_month, security_deposit, \
             application_fee, photo_urls, amenities, highlights, is_pets_allowed, \
             is_parking_included, beds, baths, square_feet, property_type, location_id, \
             manager_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16) \
             RETURNING id, posted_date",
        )
        .bind(&property.name)
        .bind(&property.description)
        .bind(property.price_per_month)
        .bind(property.security_deposit)
        .bind(property.application_fee)
        .bind(&property.photo_urls)
        .bind(&property.amenities)
        .bind(&property.highlights)
        .bind(property.is_pets_allowed)
        .bind(property.is_parking_included)
        .bind(property.beds)
        .bind(property.baths)
        .bind(property.square_feet)
        .bind(property.property_type.as_str())
        .bind(location_id)
        .bind(&property.manager_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| StorageError::TransactionFailed {
            message: e.to_string(),
        })?;

        tx.commit()
            .await
            .map_err(|e| StorageError::TransactionFailed {
                message: e.to_string(),
            })?;

        Ok(PropertyWithLocation {
            property: Property {
                id: property_row.get("id"),
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
                posted_date: property_row.get("posted_date"),
                location_id,
                manager_id: property.manager_id,
            },
            location: Location {
                id: location_id,
                address: location.address,
                city: location.city,
                state: location.state,
                country: location.country,
                postal_code: location.postal_code,
                coordinates: location.coordinates,
            },
        })
    }

    async fn leases_for_property(
        &self,
        property_id: i32,
    ) -> Result<Vec<LeaseWithTenant>, StorageError> {
        let rows = sqlx::query(
            "SELECT ls.id AS lease_id, ls.start_date, ls.end_date, ls.rent, ls.deposit, \
             ls.property_id, ls.tenant_id, \
             t.external_id, t.name, t.email, t.phone_number \
             FROM leases ls JOIN tenants t ON ls.tenant_id = t.id \
             WHERE ls.property_id = $1 \
             ORDER BY ls.start_date",
        )
        .bind(property_id)
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::from)?;

        Ok(rows
            .iter()
            .map(|row| LeaseWithTenant {
                lease: Lease {
                    id: row.get("lease_id"),
                    start_date: row.get("start_date"),
                    end_date: row.get("end_date"),
                    rent: row.get("rent"),
                    deposit: row.get("deposit"),
                    property_id: row.get("property_id"),
                    tenant_id: row.get("tenant_id"),
                },
                tenant: Tenant {
                    id: row.get("tenant_id"),
                    external_id: row.get("external_id"),
                    name: row.get("name"),
                    email: row.get("email"),
                    phone_number: row.get("phone_number"),
                },
            })
            .collect())
    }
}
