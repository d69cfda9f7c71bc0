//! HTTP handlers for property search, retrieval and creation

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;
use tracing::error;

use crate::core::error::{HomesteadError, IngestError};
use crate::core::filter::{FilterCriteria, SearchQuery};
use crate::core::model::{LeaseWithTenant, PropertyWithLocation};
use crate::core::service::PropertyStore;
use crate::ingest::{IngestionOrchestrator, ListingForm};
use crate::media::PhotoUpload;

/// Application state shared across handlers.
///
/// Everything inside is pooled and request-agnostic: the store wraps a
/// connection pool, the orchestrator wraps the shared object-storage
/// and geocoding clients.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PropertyStore>,
    pub orchestrator: IngestionOrchestrator,
}

/// Creation response: the persisted listing plus the non-fatal
/// geocoding signal.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedListingResponse {
    #[serde(flatten)]
    pub listing: PropertyWithLocation,
    pub geocoding_degraded: bool,
}

/// GET /properties
pub async fn search_properties(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<PropertyWithLocation>>, HomesteadError> {
    let criteria = FilterCriteria::from_query(&query)?;
    let listings = state.store.search(&criteria).await?;
    Ok(Json(listings))
}

/// GET /properties/{id}
pub async fn get_property(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<PropertyWithLocation>, HomesteadError> {
    let listing = state.store.get(id).await?;
    Ok(Json(listing))
}

/// GET /properties/{id}/leases
pub async fn get_property_leases(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<LeaseWithTenant>>, HomesteadError> {
    let leases = state.store.leases_for_property(id).await?;
    Ok(Json(leases))
}

/// POST /properties (multipart form)
pub async fn create_property(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<CreatedListingResponse>), HomesteadError> {
    let form = collect_form(multipart).await?;
    let created = state
        .orchestrator
        .create_listing(form)
        .await
        .inspect_err(|err| error!(error = %err, "listing creation failed"))?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedListingResponse {
            listing: created.listing,
            geocoding_degraded: created.geocoding_degraded,
        }),
    ))
}

/// GET /healthz
pub async fn healthz() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Decode the multipart stream into text fields and photo parts,
/// keeping photos in arrival order.
async fn collect_form(mut multipart: Multipart) -> Result<ListingForm, HomesteadError> {
    let mut form = ListingForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| malformed_form(e.to_string()))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if name == "photos" {
            let file_name = field
                .file_name()
                .unwrap_or("photo")
                .to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| malformed_form(e.to_string()))?;
            form.photos.push(PhotoUpload {
                file_name,
                content_type,
                data: data.to_vec(),
            });
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| malformed_form(e.to_string()))?;
            form.push_field(&name, &value);
        }
    }

    Ok(form)
}

fn malformed_form(message: String) -> HomesteadError {
    IngestError::InvalidPropertyData {
        field: "multipart",
        value: message,
    }
    .into()
}
