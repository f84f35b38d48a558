//! Geocoder collaborator: trait, Geoapify HTTP client and an offline implementation.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

/// Default Geoapify forward-geocoding endpoint.
pub const DEFAULT_GEOCODER_URL: &str = "https://api.geoapify.com/v1/geocode/search";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("geocoder request failed: {0}")]
    Request(String),

    #[error("geocoder returned status {0}")]
    Status(u16),

    #[error("no location found for '{0}'")]
    NoResults(String),

    #[error("malformed geocoder response: {0}")]
    Malformed(String),
}

/// Turns a normalized address string into coordinates.
///
/// Failures are surfaced to the caller; implementations do not retry.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, address: &str) -> Result<Coordinates, GeocodeError>;
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    /// GeoJSON order: longitude first.
    coordinates: Vec<f64>,
}

/// Geoapify forward geocoder over HTTP.
#[derive(Clone, Debug)]
pub struct HttpGeocoder {
    http_client: Client,
    base_url: String,
    api_key: String,
}

impl HttpGeocoder {
    /// Builds a client whose every request is bounded by `timeout`.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GeocodeError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GeocodeError::Request(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl Geocoder for HttpGeocoder {
    #[tracing::instrument(skip(self))]
    async fn geocode(&self, address: &str) -> Result<Coordinates, GeocodeError> {
        let response = self
            .http_client
            .get(&self.base_url)
            .query(&[("text", address), ("apiKey", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| GeocodeError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_body = response.text().await.unwrap_or_default();
            tracing::error!(status, "Geocoder request failed: {}", error_body);
            return Err(GeocodeError::Status(status));
        }

        let collection: FeatureCollection = response
            .json()
            .await
            .map_err(|e| GeocodeError::Malformed(e.to_string()))?;

        let feature = collection
            .features
            .into_iter()
            .next()
            .ok_or_else(|| GeocodeError::NoResults(address.to_string()))?;

        match feature.geometry.coordinates.as_slice() {
            [longitude, latitude, ..] => Ok(Coordinates {
                latitude: *latitude,
                longitude: *longitude,
            }),
            _ => Err(GeocodeError::Malformed(
                "expected [longitude, latitude] pair".to_string(),
            )),
        }
    }
}

#[derive(Debug, Default)]
struct InMemoryGeocoderState {
    known: HashMap<String, Coordinates>,
    calls: usize,
    fail: bool,
}

/// Offline geocoder for tests and local development.
///
/// Known addresses resolve to their registered coordinates; anything else
/// resolves to a point derived from a stable hash of the string.
#[derive(Debug, Clone, Default)]
pub struct InMemoryGeocoder {
    state: Arc<RwLock<InMemoryGeocoderState>>,
}

impl InMemoryGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers fixed coordinates for an address.
    pub fn with_location(self, address: impl Into<String>, coordinates: Coordinates) -> Self {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .known
            .insert(address.into(), coordinates);
        self
    }

    /// Configures the geocoder to fail every call until reset.
    pub fn set_fail(&self, fail: bool) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .fail = fail;
    }

    /// Number of geocode calls received, failed ones included.
    pub fn call_count(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .calls
    }
}

/// FNV-1a; stable across runs and platforms.
fn stable_hash(input: &str) -> u64 {
    input.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
    })
}

#[async_trait]
impl Geocoder for InMemoryGeocoder {
    async fn geocode(&self, address: &str) -> Result<Coordinates, GeocodeError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.calls += 1;

        if state.fail {
            return Err(GeocodeError::Request("geocoder unavailable".to_string()));
        }
        if let Some(coordinates) = state.known.get(address) {
            return Ok(*coordinates);
        }

        let hash = stable_hash(address);
        let latitude = ((hash & 0xffff_ffff) as f64 / u32::MAX as f64) * 180.0 - 90.0;
        let longitude = ((hash >> 32) as f64 / u32::MAX as f64) * 360.0 - 180.0;
        Ok(Coordinates {
            latitude: (latitude * 1e6).round() / 1e6,
            longitude: (longitude * 1e6).round() / 1e6,
        })
    }
}
