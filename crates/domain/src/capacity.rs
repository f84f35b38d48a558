//! Capacity Ledger: remaining tickets, always recomputed from live bookings.

use common::EventId;
use store::RegistrationStore;

use crate::error::Result;

/// Snapshot of an event's capacity at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityReading {
    pub total_tickets: u32,
    pub confirmed: u64,
    /// Never negative; clamped to zero when oversold.
    pub remaining: u32,
    /// More confirmed bookings than tickets. Structurally impossible unless
    /// storage or concurrency control is broken.
    pub oversold: bool,
}

impl CapacityReading {
    pub fn compute(total_tickets: u32, confirmed: u64) -> Self {
        let oversold = confirmed > u64::from(total_tickets);
        let remaining = if oversold {
            0
        } else {
            // confirmed <= total_tickets here, so the difference fits
            (u64::from(total_tickets) - confirmed) as u32
        };

        Self {
            total_tickets,
            confirmed,
            remaining,
            oversold,
        }
    }

    /// Like [`compute`](Self::compute), reporting an oversold reading as an
    /// invariant violation.
    pub fn observe(event_id: EventId, total_tickets: u32, confirmed: u64) -> Self {
        let reading = Self::compute(total_tickets, confirmed);
        if reading.oversold {
            metrics::counter!("capacity_invariant_violations_total").increment(1);
            tracing::error!(
                %event_id,
                total_tickets,
                confirmed,
                "Confirmed bookings exceed total tickets"
            );
        }
        reading
    }

    pub fn is_sold_out(&self) -> bool {
        self.remaining == 0
    }
}

/// Derives remaining capacity from confirmed bookings.
#[derive(Clone)]
pub struct CapacityLedger<S: RegistrationStore> {
    store: S,
}

impl<S: RegistrationStore> CapacityLedger<S> {
    /// Creates a new capacity ledger with the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Counts confirmed bookings now. No caching.
    pub async fn reading(&self, event_id: EventId, total_tickets: u32) -> Result<CapacityReading> {
        let confirmed = self.store.count_confirmed_bookings(event_id).await?;
        Ok(CapacityReading::observe(event_id, total_tickets, confirmed))
    }

    /// Tickets still available, never below zero.
    pub async fn remaining(&self, event_id: EventId, total_tickets: u32) -> Result<u32> {
        Ok(self.reading(event_id, total_tickets).await?.remaining)
    }
}
