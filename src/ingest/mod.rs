//! Listing ingestion pipeline
//!
//! Creating a listing combines three external dependencies with
//! different failure policies:
//!
//! 1. Validation and normalization run first: a malformed attribute is
//!    reported before any upload or geocoding call is made.
//! 2. Photo upload and geocoding then run concurrently. Upload failure
//!    aborts the whole request (and cancels the still-pending geocode,
//!    whose result would be discarded). Geocoding failure never aborts:
//!    it only degrades the location to sentinel coordinates.
//! 3. The location and property rows are written in one transaction,
//!    so a storage failure leaves nothing behind.

pub mod normalize;

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::core::error::HomesteadResult;
use crate::core::model::{NewLocation, PropertyWithLocation};
use crate::core::service::PropertyStore;
use crate::geocode::{GeocodeResult, GeocodingResolver};
use crate::media::{MediaUploader, PhotoUpload};

/// Raw multipart submission: text fields (possibly repeated) plus the
/// photo parts in the order they appeared.
#[derive(Debug, Default)]
pub struct ListingForm {
    fields: HashMap<String, Vec<String>>,
    pub photos: Vec<PhotoUpload>,
}

impl ListingForm {
    pub fn push_field(&mut self, name: &str, value: &str) {
        self.fields
            .entry(name.to_string())
            .or_default()
            .push(value.to_string());
    }

    pub fn first(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn all(&self, name: &str) -> &[String] {
        self.fields.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    #[cfg(test)]
    pub fn set_field(&mut self, name: &str, value: &str) {
        self.fields.insert(name.to_string(), vec![value.to_string()]);
    }

    #[cfg(test)]
    pub fn remove_field(&mut self, name: &str) {
        self.fields.remove(name);
    }
}

/// A freshly persisted listing plus the non-fatal geocoding signal.
#[derive(Debug)]
pub struct CreatedListing {
    pub listing: PropertyWithLocation,
    /// True when both geocoding providers failed and the location
    /// carries sentinel coordinates.
    pub geocoding_degraded: bool,
}

/// Sequences geocoding, photo upload and the atomic write.
#[derive(Clone)]
pub struct IngestionOrchestrator {
    store: Arc<dyn PropertyStore>,
    uploader: MediaUploader,
    resolver: Arc<GeocodingResolver>,
}

impl IngestionOrchestrator {
    pub fn new(
        store: Arc<dyn PropertyStore>,
        uploader: MediaUploader,
        resolver: Arc<GeocodingResolver>,
    ) -> Self {
        Self {
            store,
            uploader,
            resolver,
        }
    }

    pub async fn create_listing(&self, form: ListingForm) -> HomesteadResult<CreatedListing> {
        let (address, mut property) = normalize::listing_from_form(&form)?;

        // Geocoding and uploads are independent; run both while the
        // request waits. The geocode runs on its own task so it can be
        // dropped the moment the upload fails.
        let resolver = self.resolver.clone();
        let geocode_address = address.clone();
        let geocode =
            tokio::spawn(async move { resolver.resolve(&geocode_address).await });

        let photo_urls = match self.uploader.upload_all(form.photos).await {
            Ok(urls) => urls,
            Err(err) => {
                geocode.abort();
                return Err(err.into());
            }
        };

        let geocode_result = geocode.await.unwrap_or_else(|join_err| {
            warn!(error = %join_err, "geocoding task aborted, using sentinel coordinates");
            GeocodeResult::failed()
        });
        let geocoding_degraded = geocode_result.is_degraded();
        if geocoding_degraded {
            warn!(
                street = %address.street,
                city = %address.city,
                "geocoding degraded, persisting listing with sentinel coordinates"
            );
        }

        property.photo_urls = photo_urls;
        let location = NewLocation {
            address: address.street,
            city: address.city,
            state: address.state,
            country: address.country,
            postal_code: address.postal_code,
            coordinates: geocode_result.coordinates,
        };

        let listing = self.store.create_with_location(location, property).await?;
        info!(
            property_id = listing.property.id,
            photos = listing.property.photo_urls.len(),
            degraded = geocoding_degraded,
            "listing created"
        );

        Ok(CreatedListing {
            listing,
            geocoding_degraded,
        })
    }
}
