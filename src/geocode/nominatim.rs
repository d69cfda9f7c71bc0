//! OpenStreetMap Nominatim provider (fallback)
//!
//! Nominatim requires an identifying User-Agent; the value comes from
//! configuration so deployments identify themselves correctly.

use async_trait::async_trait;
use serde::Deserialize;

use crate::core::geo::Coordinates;
use crate::geocode::{Address, GeocodeError, GeocodeProvider};

const DEFAULT_ENDPOINT: &str = "https://nominatim.openstreetmap.org/search";

pub struct NominatimGeocoder {
    client: reqwest::Client,
    endpoint: String,
    user_agent: String,
}

impl NominatimGeocoder {
    pub fn new(client: reqwest::Client, user_agent: String) -> Self {
        Self {
            client,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            user_agent,
        }
    }

    /// Point the provider at a different endpoint (local stubs).
    pub fn with_endpoint(mut self, endpoint: String) -> Self {
        self.endpoint = endpoint;
        self
    }
}

/// Nominatim serializes coordinates as strings.
#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
}

#[async_trait]
impl GeocodeProvider for NominatimGeocoder {
    fn name(&self) -> &'static str {
        "nominatim"
    }

    async fn resolve(&self, address: &Address) -> Result<Option<Coordinates>, GeocodeError> {
        let response = self
            .client
            .get(&self.endpoint)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .query(&[
                ("street", address.street.as_str()),
                ("city", address.city.as_str()),
                ("country", address.country.as_str()),
                ("postalcode", address.postal_code.as_str()),
                ("format", "json"),
                ("limit", "1"),
            ])
            .send()
            .await
            .map_err(|e| GeocodeError::Http(e.to_string()))?
            .error_for_status()
            .map_err(|e| GeocodeError::Http(e.to_string()))?;

        let places: Vec<Place> = response
            .json()
            .await
            .map_err(|e| GeocodeError::Malformed(e.to_string()))?;

        let Some(place) = places.first() else {
            return Ok(None);
        };

        let latitude = place
            .lat
            .parse::<f64>()
            .map_err(|_| GeocodeError::Malformed(format!("non-numeric lat '{}'", place.lat)))?;
        let longitude = place
            .lon
            .parse::<f64>()
            .map_err(|_| GeocodeError::Malformed(format!("non-numeric lon '{}'", place.lon)))?;

        Ok(Some(Coordinates::new(longitude, latitude)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_place_payload() {
        let places: Vec<Place> = serde_json::from_str(
            r#"[
                {
                    "place_id": 12345,
                    "lat": "37.7936",
                    "lon": "-122.3952",
                    "display_name": "1, Market Street, San Francisco"
                }
            ]"#,
        )
        .unwrap();
        assert_eq!(places[0].lat, "37.7936");
        assert_eq!(places[0].lon, "-122.3952");
    }

    #[test]
    fn test_parses_empty_payload() {
        let places: Vec<Place> = serde_json::from_str("[]").unwrap();
        assert!(places.is_empty());
    }
}
