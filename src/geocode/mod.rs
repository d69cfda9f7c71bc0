//! Address geocoding with ordered provider fallback
//!
//! Resolution walks an ordered chain of providers behind a uniform
//! [`GeocodeProvider`] trait: each provider gets exactly one attempt
//! under a bounded timeout, and a timeout, error, or empty answer all
//! mean the same thing: try the next provider. When the whole chain
//! comes up empty the resolver returns the (0,0) sentinel tagged as
//! failed instead of an error: geocoding can degrade a listing's
//! location accuracy but must never block its creation.
//!
//! Adding a third provider means appending to the chain, not new
//! branching.

pub mod google;
pub mod nominatim;

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::core::geo::Coordinates;

pub use google::GoogleGeocoder;
pub use nominatim::NominatimGeocoder;

/// A structured postal address to resolve.
#[derive(Debug, Clone)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

impl Address {
    /// Single-line rendering for providers that take free text.
    pub fn single_line(&self) -> String {
        format!(
            "{}, {}, {}, {}, {}",
            self.street, self.city, self.state, self.postal_code, self.country
        )
    }
}

/// Failure of a single provider call. Never escapes the resolver; it
/// only drives fallback to the next provider in the chain.
#[derive(Debug)]
pub enum GeocodeError {
    /// Transport-level failure (connect, TLS, non-success status)
    Http(String),
    /// The provider answered with a body we could not interpret
    Malformed(String),
}

impl fmt::Display for GeocodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeocodeError::Http(msg) => write!(f, "HTTP error: {}", msg),
            GeocodeError::Malformed(msg) => write!(f, "Malformed response: {}", msg),
        }
    }
}

impl std::error::Error for GeocodeError {}

/// A single geocoding backend.
///
/// `Ok(None)` means the provider answered but had no match for the
/// address; the resolver treats it the same as an error or a timeout.
#[async_trait]
pub trait GeocodeProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn resolve(&self, address: &Address) -> Result<Option<Coordinates>, GeocodeError>;
}

/// Outcome of a resolution attempt: coordinates plus the provider that
/// produced them, or the sentinel point when every provider failed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeocodeResult {
    pub coordinates: Coordinates,
    pub provider: Option<&'static str>,
}

impl GeocodeResult {
    pub fn resolved(provider: &'static str, coordinates: Coordinates) -> Self {
        Self {
            coordinates,
            provider: Some(provider),
        }
    }

    /// The degraded outcome: sentinel coordinates, no provider.
    pub fn failed() -> Self {
        Self {
            coordinates: Coordinates::SENTINEL,
            provider: None,
        }
    }

    /// Whether resolution fell through the whole provider chain.
    pub fn is_degraded(&self) -> bool {
        self.provider.is_none()
    }
}

/// Walks the provider chain in order until one yields coordinates.
pub struct GeocodingResolver {
    providers: Vec<Arc<dyn GeocodeProvider>>,
    timeout: Duration,
}

impl GeocodingResolver {
    pub fn new(providers: Vec<Arc<dyn GeocodeProvider>>, timeout: Duration) -> Self {
        Self { providers, timeout }
    }

    /// Resolve an address, never failing.
    ///
    /// Each provider gets one attempt bounded by the configured
    /// timeout. There is no same-provider retry: recovery is always
    /// fallback to the next provider.
    pub async fn resolve(&self, address: &Address) -> GeocodeResult {
        for provider in &self.providers {
            match tokio::time::timeout(self.timeout, provider.resolve(address)).await {
                Ok(Ok(Some(coordinates))) => {
                    info!(provider = provider.name(), "address geocoded");
                    return GeocodeResult::resolved(provider.name(), coordinates);
                }
                Ok(Ok(None)) => {
                    debug!(provider = provider.name(), "no geocoding match");
                }
                Ok(Err(err)) => {
                    warn!(provider = provider.name(), error = %err, "geocoding call failed");
                }
                Err(_) => {
                    warn!(
                        provider = provider.name(),
                        timeout_ms = self.timeout.as_millis() as u64,
                        "geocoding call timed out"
                    );
                }
            }
        }

        warn!("all geocoding providers failed, using sentinel coordinates");
        GeocodeResult::failed()
    }
}
