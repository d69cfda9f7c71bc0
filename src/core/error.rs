//! Typed error handling for the homestead service
//!
//! Every externally-visible failure carries a stable machine-readable
//! code and a human-readable message. Variants are grouped by the
//! pipeline stage that produces them:
//!
//! - [`FilterError`]: search-predicate compilation failures (detected
//!   before any query reaches the database)
//! - [`IngestError`]: listing-ingestion failures (attribute coercion,
//!   photo uploads)
//! - [`StorageError`]: database and transaction failures
//! - [`ConfigError`]: configuration loading failures
//!
//! Geocoding failure is deliberately absent here: both providers failing
//! degrades a listing's coordinates to the (0,0) sentinel but never
//! fails a request (see `crate::geocode`).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

/// The main error type for the homestead service
#[derive(Debug)]
pub enum HomesteadError {
    /// Search filter compilation errors
    Filter(FilterError),

    /// Listing ingestion errors
    Ingest(IngestError),

    /// Storage backend errors
    Storage(StorageError),

    /// Configuration errors
    Config(ConfigError),

    /// Internal errors (should not happen in normal operation)
    Internal(String),
}

impl fmt::Display for HomesteadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HomesteadError::Filter(e) => write!(f, "{}", e),
            HomesteadError::Ingest(e) => write!(f, "{}", e),
            HomesteadError::Storage(e) => write!(f, "{}", e),
            HomesteadError::Config(e) => write!(f, "{}", e),
            HomesteadError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for HomesteadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HomesteadError::Filter(e) => Some(e),
            HomesteadError::Ingest(e) => Some(e),
            HomesteadError::Storage(e) => Some(e),
            HomesteadError::Config(e) => Some(e),
            HomesteadError::Internal(_) => None,
        }
    }
}

/// Controls whether error responses include diagnostic details.
///
/// Off in production deployments; `main` sets this from the loaded
/// configuration before the server starts accepting requests.
static EXPOSE_DETAILS: AtomicBool = AtomicBool::new(false);

/// Enable or disable diagnostic detail in HTTP error responses.
pub fn set_detail_exposure(expose: bool) {
    EXPOSE_DETAILS.store(expose, Ordering::Relaxed);
}

fn details_exposed() -> bool {
    EXPOSE_DETAILS.load(Ordering::Relaxed)
}

/// Error response structure for HTTP responses
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional diagnostic details (suppressed in production)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl HomesteadError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            HomesteadError::Filter(_) => StatusCode::BAD_REQUEST,
            HomesteadError::Ingest(e) => e.status_code(),
            HomesteadError::Storage(e) => e.status_code(),
            HomesteadError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            HomesteadError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the stable error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            HomesteadError::Filter(_) => "INVALID_FILTER",
            HomesteadError::Ingest(e) => e.error_code(),
            HomesteadError::Storage(e) => e.error_code(),
            HomesteadError::Config(_) => "CONFIG_ERROR",
            HomesteadError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Convert to an error response
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
            details: if details_exposed() {
                self.details()
            } else {
                None
            },
        }
    }

    /// Get diagnostic details for the error
    fn details(&self) -> Option<serde_json::Value> {
        match self {
            HomesteadError::Filter(FilterError::InvalidValue { field, value }) => {
                Some(serde_json::json!({ "field": field, "value": value }))
            }
            HomesteadError::Ingest(IngestError::InvalidPropertyData { field, value }) => {
                Some(serde_json::json!({ "field": field, "value": value }))
            }
            HomesteadError::Ingest(IngestError::MediaUploadFailed { file_name, message }) => {
                Some(serde_json::json!({ "file": file_name, "cause": message }))
            }
            HomesteadError::Storage(StorageError::NotFound { entity, id }) => {
                Some(serde_json::json!({ "entity": entity, "id": id }))
            }
            _ => None,
        }
    }
}

impl IntoResponse for HomesteadError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self.to_response());
        (status, body).into_response()
    }
}

// =============================================================================
// Filter Errors
// =============================================================================

/// Errors raised while compiling search filters.
///
/// These are detected before any query is sent to the database.
#[derive(Debug)]
pub enum FilterError {
    /// A filter parameter could not be parsed as its expected type
    InvalidValue { field: &'static str, value: String },

    /// The property-type filter names a value outside the enumeration
    UnknownPropertyType { value: String },

    /// Latitude/longitude is not a finite coordinate
    InvalidCoordinate { field: &'static str, value: String },
}

impl fmt::Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterError::InvalidValue { field, value } => {
                write!(f, "Invalid value '{}' for filter '{}'", value, field)
            }
            FilterError::UnknownPropertyType { value } => {
                write!(f, "Unknown property type '{}'", value)
            }
            FilterError::InvalidCoordinate { field, value } => {
                write!(f, "Invalid coordinate '{}' for '{}'", value, field)
            }
        }
    }
}

impl std::error::Error for FilterError {}

impl From<FilterError> for HomesteadError {
    fn from(err: FilterError) -> Self {
        HomesteadError::Filter(err)
    }
}

// =============================================================================
// Ingest Errors
// =============================================================================

/// Errors raised by the listing-ingestion pipeline
#[derive(Debug)]
pub enum IngestError {
    /// A listing attribute could not be coerced to its expected type
    InvalidPropertyData { field: &'static str, value: String },

    /// A listing attribute violated a value constraint
    ConstraintViolation { message: String },

    /// A photo failed to persist after its retry budget was exhausted
    MediaUploadFailed { file_name: String, message: String },
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestError::InvalidPropertyData { field, value } => {
                write!(f, "Invalid value '{}' for property field '{}'", value, field)
            }
            IngestError::ConstraintViolation { message } => {
                write!(f, "Property data constraint violated: {}", message)
            }
            IngestError::MediaUploadFailed { file_name, message } => {
                write!(f, "Failed to upload photo '{}': {}", file_name, message)
            }
        }
    }
}

impl std::error::Error for IngestError {}

impl IngestError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            IngestError::InvalidPropertyData { .. } => StatusCode::BAD_REQUEST,
            IngestError::ConstraintViolation { .. } => StatusCode::BAD_REQUEST,
            IngestError::MediaUploadFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            IngestError::InvalidPropertyData { .. } => "INVALID_PROPERTY_DATA",
            IngestError::ConstraintViolation { .. } => "INVALID_PROPERTY_DATA",
            IngestError::MediaUploadFailed { .. } => "MEDIA_UPLOAD_FAILED",
        }
    }
}

impl From<IngestError> for HomesteadError {
    fn from(err: IngestError) -> Self {
        HomesteadError::Ingest(err)
    }
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Errors related to the relational store
#[derive(Debug)]
pub enum StorageError {
    /// Lookup by id matched no row
    NotFound { entity: &'static str, id: i32 },

    /// Query execution failed
    QueryFailed { message: String },

    /// The two-table write transaction failed (both inserts rolled back)
    TransactionFailed { message: String },

    /// Could not obtain a connection from the pool
    ConnectionFailed { message: String },
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::NotFound { entity, id } => {
                write!(f, "{} with id {} not found", entity, id)
            }
            StorageError::QueryFailed { message } => {
                write!(f, "Query failed: {}", message)
            }
            StorageError::TransactionFailed { message } => {
                write!(f, "Transaction failed: {}", message)
            }
            StorageError::ConnectionFailed { message } => {
                write!(f, "Database connection failed: {}", message)
            }
        }
    }
}

impl std::error::Error for StorageError {}

impl StorageError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            StorageError::NotFound { .. } => StatusCode::NOT_FOUND,
            StorageError::QueryFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            StorageError::TransactionFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            StorageError::ConnectionFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            StorageError::NotFound { .. } => "NOT_FOUND",
            StorageError::QueryFailed { .. } => "STORAGE_FAILURE",
            StorageError::TransactionFailed { .. } => "STORAGE_FAILURE",
            StorageError::ConnectionFailed { .. } => "STORAGE_FAILURE",
        }
    }
}

impl From<StorageError> for HomesteadError {
    fn from(err: StorageError) -> Self {
        HomesteadError::Storage(err)
    }
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                StorageError::ConnectionFailed {
                    message: err.to_string(),
                }
            }
            other => StorageError::QueryFailed {
                message: other.to_string(),
            },
        }
    }
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors related to configuration loading
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to parse configuration
    ParseError {
        file: Option<String>,
        message: String,
    },

    /// Invalid value in configuration
    InvalidValue {
        field: String,
        value: String,
        message: String,
    },

    /// IO error while reading configuration
    IoError { message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ParseError { file, message } => {
                if let Some(file) = file {
                    write!(f, "Failed to parse config file '{}': {}", file, message)
                } else {
                    write!(f, "Failed to parse config: {}", message)
                }
            }
            ConfigError::InvalidValue {
                field,
                value,
                message,
            } => {
                write!(
                    f,
                    "Invalid value '{}' for field '{}': {}",
                    value, field, message
                )
            }
            ConfigError::IoError { message } => {
                write!(f, "IO error: {}", message)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for HomesteadError {
    fn from(err: ConfigError) -> Self {
        HomesteadError::Config(err)
    }
}

impl From<std::io::Error> for HomesteadError {
    fn from(err: std::io::Error) -> Self {
        HomesteadError::Config(ConfigError::IoError {
            message: err.to_string(),
        })
    }
}

impl From<serde_yaml::Error> for HomesteadError {
    fn from(err: serde_yaml::Error) -> Self {
        HomesteadError::Config(ConfigError::ParseError {
            file: None,
            message: err.to_string(),
        })
    }
}

// =============================================================================
// Result type alias
// =============================================================================

/// A specialized Result type for homestead operations
pub type HomesteadResult<T> = Result<T, HomesteadError>;

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_error_display() {
        let err = FilterError::InvalidValue {
            field: "priceMin",
            value: "abc".to_string(),
        };
        assert!(err.to_string().contains("priceMin"));
        assert!(err.to_string().contains("abc"));
    }

    #[test]
    fn test_filter_error_maps_to_bad_request() {
        let err: HomesteadError = FilterError::UnknownPropertyType {
            value: "Castle".to_string(),
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_code(), "INVALID_FILTER");
    }

    #[test]
    fn test_not_found_maps_to_404() {
        let err: HomesteadError = StorageError::NotFound {
            entity: "property",
            id: 42,
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.error_code(), "NOT_FOUND");
        assert!(err.to_string().contains("42"));
    }

    #[test]
    fn test_media_upload_failed_code() {
        let err: HomesteadError = IngestError::MediaUploadFailed {
            file_name: "front.jpg".to_string(),
            message: "connection reset".to_string(),
        }
        .into();
        assert_eq!(err.error_code(), "MEDIA_UPLOAD_FAILED");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_transaction_failure_is_storage_failure() {
        let err: HomesteadError = StorageError::TransactionFailed {
            message: "deadlock detected".to_string(),
        }
        .into();
        assert_eq!(err.error_code(), "STORAGE_FAILURE");
    }

    #[test]
    fn test_details_suppressed_by_default() {
        set_detail_exposure(false);
        let err: HomesteadError = IngestError::InvalidPropertyData {
            field: "beds",
            value: "many".to_string(),
        }
        .into();
        let response = err.to_response();
        assert_eq!(response.code, "INVALID_PROPERTY_DATA");
        assert!(response.details.is_none());
    }

    #[test]
    fn test_sqlx_pool_error_maps_to_connection_failed() {
        let err: StorageError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, StorageError::ConnectionFailed { .. }));
    }
}
