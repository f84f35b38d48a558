use std::sync::Arc;

use store::RegistrationStore;

use crate::address::{AddressResolver, Geocoder};
use crate::booking::BookingEngine;
use crate::capacity::CapacityLedger;
use crate::category::CategoryCatalog;
use crate::clock::Clock;
use crate::event::EventManager;

/// Every registration component, constructed once and shared by reference.
pub struct RegistrationServices<S: RegistrationStore> {
    pub addresses: Arc<AddressResolver<S>>,
    pub categories: Arc<CategoryCatalog<S>>,
    pub ledger: CapacityLedger<S>,
    pub bookings: Arc<BookingEngine<S>>,
    pub events: EventManager<S>,
}

impl<S: RegistrationStore + Clone> RegistrationServices<S> {
    pub fn new(store: S, geocoder: Arc<dyn Geocoder>, clock: Arc<dyn Clock>) -> Self {
        let ledger = CapacityLedger::new(store.clone());
        let addresses = Arc::new(AddressResolver::new(store.clone(), geocoder));
        let categories = Arc::new(CategoryCatalog::new(store.clone()));
        let bookings = Arc::new(BookingEngine::new(
            store.clone(),
            ledger.clone(),
            clock.clone(),
        ));
        let events = EventManager::new(
            store,
            addresses.clone(),
            categories.clone(),
            bookings.clone(),
            ledger.clone(),
            clock,
        );

        Self {
            addresses,
            categories,
            ledger,
            bookings,
            events,
        }
    }
}
