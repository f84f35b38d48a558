use chrono::{DateTime, Utc};
use common::{CategoryId, UserId};

/// Ordering applied to event listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventOrder {
    /// Stable insertion order.
    #[default]
    Created,
    StartTimeAscending,
    StartTimeDescending,
}

/// Builder for constructing event listing queries.
///
/// Filters combine with AND. An empty query lists every event.
#[derive(Debug, Clone, Default)]
pub struct EventQuery {
    /// Only events whose start time is strictly after this instant.
    pub starts_after: Option<DateTime<Utc>>,

    /// Only events created by this identity.
    pub creator_id: Option<UserId>,

    /// Only events in this category.
    pub category_id: Option<CategoryId>,

    pub order: EventOrder,

    /// Maximum number of events to return.
    pub limit: Option<usize>,

    /// Number of events to skip.
    pub offset: Option<usize>,
}

impl EventQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events that have not started yet at `now`.
    pub fn upcoming(now: DateTime<Utc>) -> Self {
        Self {
            starts_after: Some(now),
            ..Default::default()
        }
    }

    /// Events created by `creator_id`, latest start first.
    pub fn created_by(creator_id: UserId) -> Self {
        Self {
            creator_id: Some(creator_id),
            order: EventOrder::StartTimeDescending,
            ..Default::default()
        }
    }

    pub fn starts_after(mut self, instant: DateTime<Utc>) -> Self {
        self.starts_after = Some(instant);
        self
    }

    pub fn category(mut self, category_id: CategoryId) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn order(mut self, order: EventOrder) -> Self {
        self.order = order;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }
}
