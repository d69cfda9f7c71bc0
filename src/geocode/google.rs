//! Google Maps Geocoding API provider (primary)

use async_trait::async_trait;
use serde::Deserialize;

use crate::core::geo::Coordinates;
use crate::geocode::{Address, GeocodeError, GeocodeProvider};

const DEFAULT_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/geocode/json";

pub struct GoogleGeocoder {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl GoogleGeocoder {
    pub fn new(client: reqwest::Client, api_key: String) -> Self {
        Self {
            client,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key,
        }
    }

    /// Point the provider at a different endpoint (local stubs).
    pub fn with_endpoint(mut self, endpoint: String) -> Self {
        self.endpoint = endpoint;
        self
    }
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    results: Vec<GeocodeEntry>,
}

#[derive(Debug, Deserialize)]
struct GeocodeEntry {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

#[async_trait]
impl GeocodeProvider for GoogleGeocoder {
    fn name(&self) -> &'static str {
        "google"
    }

    async fn resolve(&self, address: &Address) -> Result<Option<Coordinates>, GeocodeError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("address", address.single_line().as_str()),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| GeocodeError::Http(e.to_string()))?
            .error_for_status()
            .map_err(|e| GeocodeError::Http(e.to_string()))?;

        let body: GeocodeResponse = response
            .json()
            .await
            .map_err(|e| GeocodeError::Malformed(e.to_string()))?;

        Ok(body
            .results
            .first()
            .map(|entry| Coordinates::new(entry.geometry.location.lng, entry.geometry.location.lat)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_result_payload() {
        let body: GeocodeResponse = serde_json::from_str(
            r#"{
                "results": [
                    {
                        "formatted_address": "1 Market St, San Francisco, CA 94105, USA",
                        "geometry": {
                            "location": { "lat": 37.7936, "lng": -122.3952 },
                            "location_type": "ROOFTOP"
                        }
                    }
                ],
                "status": "OK"
            }"#,
        )
        .unwrap();
        let first = &body.results[0];
        assert_eq!(first.geometry.location.lat, 37.7936);
        assert_eq!(first.geometry.location.lng, -122.3952);
    }

    #[test]
    fn test_parses_zero_results_payload() {
        let body: GeocodeResponse =
            serde_json::from_str(r#"{ "results": [], "status": "ZERO_RESULTS" }"#).unwrap();
        assert!(body.results.is_empty());
    }
}
