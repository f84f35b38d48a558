//! Address Resolver: deduplicates event locations by normalized string and
//! calls the geocoder only when a string is seen for the first time.

mod geocoder;

use std::sync::Arc;

use store::{Address, AddressSource, NewAddress, RegistrationStore};

use crate::error::{DomainError, Result};

pub use geocoder::{
    Coordinates, DEFAULT_GEOCODER_URL, GeocodeError, Geocoder, HttpGeocoder, InMemoryGeocoder,
};

/// Submitted address fields, in normalization order.
#[derive(Debug, Clone, Copy)]
pub struct AddressParts<'a> {
    pub street: &'a str,
    pub city: &'a str,
    pub state: &'a str,
    pub postal_code: &'a str,
    pub country: &'a str,
}

impl AddressParts<'_> {
    /// Joins the non-empty parts with single spaces.
    ///
    /// Landmark is not part of the key: it lives on the event, so two events
    /// differing only by landmark share one address row.
    pub fn normalize(&self) -> String {
        [
            self.street,
            self.city,
            self.state,
            self.postal_code,
            self.country,
        ]
        .iter()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
    }
}

/// Resolves normalized address strings to stored addresses.
pub struct AddressResolver<S: RegistrationStore> {
    store: S,
    geocoder: Arc<dyn Geocoder>,
}

impl<S: RegistrationStore> AddressResolver<S> {
    pub fn new(store: S, geocoder: Arc<dyn Geocoder>) -> Self {
        Self { store, geocoder }
    }

    /// Returns the stored address for `normalized`, geocoding and inserting it
    /// on first sight. Losing an insert race yields the winner's row.
    #[tracing::instrument(skip(self))]
    pub async fn resolve(&self, normalized: &str) -> Result<Address> {
        match self.locate(normalized).await? {
            AddressSource::Existing(address) => Ok(address),
            AddressSource::Geocoded(new_address) => {
                Ok(self.store.insert_address(new_address).await?)
            }
        }
    }

    /// Like [`resolve`](Self::resolve) but leaves a freshly geocoded address
    /// unsaved, so it can be written in the same transaction as its event.
    #[tracing::instrument(skip(self))]
    pub async fn locate(&self, normalized: &str) -> Result<AddressSource> {
        if normalized.is_empty() {
            return Err(DomainError::validation("address", "must not be empty"));
        }

        if let Some(address) = self.store.find_address(normalized).await? {
            tracing::debug!(address_id = %address.address_id, "Address cache hit");
            return Ok(AddressSource::Existing(address));
        }

        let coordinates = match self.geocoder.geocode(normalized).await {
            Ok(coordinates) => {
                metrics::counter!("geocoder_requests_total", "outcome" => "success").increment(1);
                coordinates
            }
            Err(e) => {
                metrics::counter!("geocoder_requests_total", "outcome" => "failure").increment(1);
                tracing::error!(error = %e, "Address resolution failed");
                return Err(DomainError::UpstreamFailure(format!(
                    "address resolution failed: {e}"
                )));
            }
        };

        tracing::info!(
            latitude = coordinates.latitude,
            longitude = coordinates.longitude,
            "Address geocoded"
        );

        Ok(AddressSource::Geocoded(NewAddress {
            full_address: normalized.to_string(),
            latitude: coordinates.latitude,
            longitude: coordinates.longitude,
        }))
    }
}
