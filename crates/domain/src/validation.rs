//! Payload validation for event creation, event updates and categories.
//!
//! Strings are trimmed before any rule is applied. Every failing field is
//! collected so one response can list all problems; nothing here touches
//! storage.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use common::{CategoryId, Money, ParticipantType, TicketType};
use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use store::{EventChanges, NewCategory};

use crate::address::AddressParts;
use crate::error::{DomainError, Result, ValidationErrors};

static IMAGE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(http|https)://.*\.(jpg|jpeg|png|gif)$").expect("image URL pattern is valid")
});

/// Largest ticket count and participant count the schema stores.
const MAX_COUNT: i64 = i32::MAX as i64;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressInput {
    pub street_address: String,
    #[serde(default)]
    pub landmark: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketInput {
    pub ticket_type: String,
    /// Decimal amount with at most two fractional digits, sent as a JSON
    /// number or string.
    #[serde(default)]
    pub ticket_fare: Option<Decimal>,
    pub total_tickets: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantInput {
    pub participant_type: String,
    #[serde(default)]
    pub participant_count: Option<i64>,
}

/// Event creation payload as submitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEventRequest {
    pub name: String,
    pub description: String,
    pub image_url: String,
    pub agenda: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub category_id: i64,
    pub address: AddressInput,
    pub ticket_details: TicketInput,
    pub participant_details: ParticipantInput,
}

/// Event update payload: any subset of the descriptive fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateEventRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub agenda: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRequest {
    pub name: String,
    pub image_url: String,
}

/// A creation payload that passed every field rule.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedEvent {
    pub name: String,
    pub description: String,
    pub agenda: String,
    pub image_url: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub landmark: Option<String>,
    pub category_id: CategoryId,
    pub full_address: String,
    pub ticket_type: TicketType,
    pub ticket_fare: Option<Money>,
    pub total_tickets: u32,
    pub participant_type: ParticipantType,
    pub participant_count: u32,
}

fn check_length(
    errors: &mut ValidationErrors,
    field: &str,
    value: &str,
    min: usize,
    max: Option<usize>,
) {
    let len = value.chars().count();
    if len < min {
        errors.push(field, format!("must be at least {min} characters"));
    } else if let Some(max) = max
        && len > max
    {
        errors.push(field, format!("must be at most {max} characters"));
    }
}

fn check_image_url(errors: &mut ValidationErrors, field: &str, value: &str) {
    if !IMAGE_URL.is_match(value) {
        errors.push(
            field,
            "must be an http(s) URL ending in .jpg, .jpeg, .png or .gif",
        );
    }
}

fn trimmed(value: &str) -> String {
    value.trim().to_string()
}

/// Converts a decimal fare to cents, rejecting sub-cent precision.
fn fare_to_money(fare: Decimal) -> std::result::Result<Money, &'static str> {
    let fare = fare.normalize();
    if fare.scale() > 2 {
        return Err("must have at most 2 decimal places");
    }
    if fare > Decimal::new(Money::MAX.cents(), 2) {
        return Err("must have at most 10 digits");
    }
    (fare * Decimal::ONE_HUNDRED)
        .to_i64()
        .map(Money::from_cents)
        .ok_or("must have at most 10 digits")
}

impl CreateEventRequest {
    /// Checks every field rule against `now` and returns the normalized event.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<ValidatedEvent> {
        let mut errors = ValidationErrors::new();

        let name = trimmed(&self.name);
        let description = trimmed(&self.description);
        let agenda = trimmed(&self.agenda);
        let image_url = trimmed(&self.image_url);
        check_length(&mut errors, "name", &name, 3, Some(100));
        check_length(&mut errors, "description", &description, 10, Some(1000));
        check_length(&mut errors, "agenda", &agenda, 5, None);
        check_image_url(&mut errors, "image_url", &image_url);

        if self.start_time <= now {
            errors.push("start_time", "must be in the future");
        }
        if self.end_time <= now {
            errors.push("end_time", "must be in the future");
        }
        if self.start_time >= self.end_time {
            errors.push("end_time", "must be after start_time");
        }

        if self.category_id <= 0 {
            errors.push("category_id", "must be a positive integer");
        }

        let street = trimmed(&self.address.street_address);
        let city = trimmed(&self.address.city);
        let state = trimmed(&self.address.state);
        let postal_code = trimmed(&self.address.postal_code);
        let country = trimmed(&self.address.country);
        check_length(&mut errors, "address.street_address", &street, 5, Some(255));
        check_length(&mut errors, "address.city", &city, 2, Some(100));
        check_length(&mut errors, "address.state", &state, 2, Some(100));
        check_length(&mut errors, "address.postal_code", &postal_code, 4, Some(10));
        check_length(&mut errors, "address.country", &country, 2, Some(100));

        let landmark = self
            .address
            .landmark
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string);
        if let Some(landmark) = &landmark {
            check_length(&mut errors, "address.landmark", landmark, 0, Some(100));
        }

        let ticket_type = match self.ticket_details.ticket_type.parse::<TicketType>() {
            Ok(ticket_type) => Some(ticket_type),
            Err(_) => {
                errors.push("ticket_details.ticket_type", "must be 'free' or 'paid'");
                None
            }
        };

        let ticket_fare = match (ticket_type, self.ticket_details.ticket_fare) {
            (Some(TicketType::Paid), None) => {
                errors.push("ticket_details.ticket_fare", "is required for paid events");
                None
            }
            (Some(TicketType::Paid), Some(fare)) => match fare_to_money(fare) {
                Ok(money) if money.is_positive() => Some(money),
                Ok(_) => {
                    errors.push("ticket_details.ticket_fare", "must be greater than 0");
                    None
                }
                Err(message) => {
                    errors.push("ticket_details.ticket_fare", message);
                    None
                }
            },
            // A zero fare on a free event carries no information
            (Some(TicketType::Free), Some(fare)) if !fare.is_zero() => {
                errors.push(
                    "ticket_details.ticket_fare",
                    "must not be set for free events",
                );
                None
            }
            _ => None,
        };

        let total_tickets = self.ticket_details.total_tickets;
        if total_tickets <= 0 {
            errors.push("ticket_details.total_tickets", "must be greater than 0");
        } else if total_tickets > MAX_COUNT {
            errors.push(
                "ticket_details.total_tickets",
                format!("must be at most {MAX_COUNT}"),
            );
        }

        let participant_type = match self
            .participant_details
            .participant_type
            .parse::<ParticipantType>()
        {
            Ok(participant_type) => Some(participant_type),
            Err(_) => {
                errors.push(
                    "participant_details.participant_type",
                    "must be 'individual' or 'group'",
                );
                None
            }
        };

        let participant_count = match (participant_type, self.participant_details.participant_count) {
            (Some(ParticipantType::Individual), _) => 1,
            (Some(ParticipantType::Group), Some(count)) if count > 1 && count <= MAX_COUNT => {
                count
            }
            (Some(ParticipantType::Group), Some(count)) if count > MAX_COUNT => {
                errors.push(
                    "participant_details.participant_count",
                    format!("must be at most {MAX_COUNT}"),
                );
                0
            }
            (Some(ParticipantType::Group), _) => {
                errors.push(
                    "participant_details.participant_count",
                    "must be greater than 1 for group events",
                );
                0
            }
            (None, _) => 0,
        };

        errors.into_result()?;

        let full_address = AddressParts {
            street: &street,
            city: &city,
            state: &state,
            postal_code: &postal_code,
            country: &country,
        }
        .normalize();

        // Every branch that leaves these unset has pushed an error above
        let (Some(ticket_type), Some(participant_type)) = (ticket_type, participant_type) else {
            return Err(DomainError::InvariantViolation(
                "validated event without ticket or participant type".to_string(),
            ));
        };

        Ok(ValidatedEvent {
            name,
            description,
            agenda,
            image_url,
            start_time: self.start_time,
            end_time: self.end_time,
            landmark,
            category_id: CategoryId::new(self.category_id),
            full_address,
            ticket_type,
            ticket_fare,
            total_tickets: total_tickets as u32,
            participant_type,
            participant_count: participant_count as u32,
        })
    }
}

impl UpdateEventRequest {
    /// Validates the present fields. At least one field must be supplied.
    pub fn validate(&self) -> Result<EventChanges> {
        let present = |field: &Option<String>| field.as_deref().map(trimmed);
        let changes = EventChanges {
            name: present(&self.name),
            description: present(&self.description),
            agenda: present(&self.agenda),
            image_url: present(&self.image_url),
        };

        if changes.is_empty() {
            return Err(DomainError::validation(
                "body",
                "at least one of name, description, agenda or image_url is required",
            ));
        }

        let mut errors = ValidationErrors::new();
        if let Some(name) = &changes.name {
            check_length(&mut errors, "name", name, 3, Some(100));
        }
        if let Some(description) = &changes.description {
            check_length(&mut errors, "description", description, 10, Some(1000));
        }
        if let Some(agenda) = &changes.agenda {
            check_length(&mut errors, "agenda", agenda, 5, None);
        }
        if let Some(image_url) = &changes.image_url {
            check_image_url(&mut errors, "image_url", image_url);
        }

        errors.into_result()?;
        Ok(changes)
    }
}

/// Validates a batch of categories, including name clashes within the batch.
pub fn validate_categories(requests: &[CategoryRequest]) -> Result<Vec<NewCategory>> {
    let mut errors = ValidationErrors::new();

    if requests.is_empty() {
        errors.push("categories", "at least one category is required");
    }

    let mut validated: Vec<NewCategory> = Vec::with_capacity(requests.len());
    for (i, request) in requests.iter().enumerate() {
        let name = trimmed(&request.name);
        let image_url = trimmed(&request.image_url);
        check_length(&mut errors, &format!("categories[{i}].name"), &name, 3, Some(30));
        check_image_url(&mut errors, &format!("categories[{i}].image_url"), &image_url);
        if validated.iter().any(|c| c.name == name) {
            errors.push(format!("categories[{i}].name"), "is repeated in the batch");
        }
        validated.push(NewCategory { name, image_url });
    }

    errors.into_result()?;
    Ok(validated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn fare(amount: &str) -> Decimal {
        amount.parse().unwrap()
    }

    fn request(now: DateTime<Utc>) -> CreateEventRequest {
        CreateEventRequest {
            name: "  Rust Meetup  ".to_string(),
            description: "Monthly gathering of rustaceans".to_string(),
            image_url: "https://img.example.com/meetup.jpg".to_string(),
            agenda: "Talks and pizza".to_string(),
            start_time: now + Duration::days(2),
            end_time: now + Duration::days(2) + Duration::hours(3),
            category_id: 1,
            address: AddressInput {
                street_address: "123, Gandhi Street".to_string(),
                landmark: Some("Near Bus Stand".to_string()),
                city: "Kallakurichi".to_string(),
                state: "Tamil Nadu".to_string(),
                postal_code: "606202".to_string(),
                country: "India".to_string(),
            },
            ticket_details: TicketInput {
                ticket_type: "FREE".to_string(),
                ticket_fare: None,
                total_tickets: 100,
            },
            participant_details: ParticipantInput {
                participant_type: "Individual".to_string(),
                participant_count: Some(7),
            },
        }
    }

    fn field_errors(err: DomainError) -> ValidationErrors {
        match err {
            DomainError::Validation(errors) => errors,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn valid_request_is_normalized() {
        let now = Utc::now();
        let event = request(now).validate(now).unwrap();

        assert_eq!(event.name, "Rust Meetup");
        assert_eq!(event.ticket_type, TicketType::Free);
        assert_eq!(event.participant_count, 1);
        assert_eq!(
            event.full_address,
            "123, Gandhi Street Kallakurichi Tamil Nadu 606202 India"
        );
        assert_eq!(event.landmark.as_deref(), Some("Near Bus Stand"));
    }

    #[test]
    fn paid_event_without_fare_is_rejected() {
        let now = Utc::now();
        let mut req = request(now);
        req.ticket_details.ticket_type = "paid".to_string();

        let errors = field_errors(req.validate(now).unwrap_err());
        assert!(errors.contains("ticket_details.ticket_fare"));
    }

    #[test]
    fn paid_fare_is_held_in_cents() {
        let now = Utc::now();
        let mut req = request(now);
        req.ticket_details.ticket_type = "paid".to_string();
        req.ticket_details.ticket_fare = Some(fare("499.99"));

        let event = req.validate(now).unwrap();
        assert_eq!(event.ticket_fare, Some(Money::from_cents(49_999)));
    }

    #[test]
    fn fare_precision_and_magnitude_are_bounded() {
        let now = Utc::now();
        let mut req = request(now);
        req.ticket_details.ticket_type = "paid".to_string();

        req.ticket_details.ticket_fare = Some(fare("10.005"));
        assert!(field_errors(req.validate(now).unwrap_err()).contains("ticket_details.ticket_fare"));

        req.ticket_details.ticket_fare = Some(fare("100000000.00"));
        assert!(field_errors(req.validate(now).unwrap_err()).contains("ticket_details.ticket_fare"));

        req.ticket_details.ticket_fare = Some(fare("-5"));
        assert!(field_errors(req.validate(now).unwrap_err()).contains("ticket_details.ticket_fare"));
    }

    #[test]
    fn fare_just_past_two_decimals_is_rejected() {
        let now = Utc::now();
        let mut req = request(now);
        req.ticket_details.ticket_type = "paid".to_string();

        req.ticket_details.ticket_fare = Some(fare("10.000000001"));
        let errors = field_errors(req.validate(now).unwrap_err());
        assert!(errors.contains("ticket_details.ticket_fare"));

        req.ticket_details.ticket_fare = Some(fare("10.001"));
        assert!(req.validate(now).is_err());
    }

    #[test]
    fn fare_trailing_zeros_and_upper_bound_are_accepted() {
        let now = Utc::now();
        let mut req = request(now);
        req.ticket_details.ticket_type = "paid".to_string();

        req.ticket_details.ticket_fare = Some(fare("12.5000"));
        assert_eq!(
            req.validate(now).unwrap().ticket_fare,
            Some(Money::from_cents(1_250))
        );

        req.ticket_details.ticket_fare = Some(fare("99999999.99"));
        assert_eq!(req.validate(now).unwrap().ticket_fare, Some(Money::MAX));
    }

    #[test]
    fn fare_deserializes_from_number_or_string() {
        let from_number: TicketInput = serde_json::from_str(
            r#"{"ticket_type": "paid", "ticket_fare": 19.99, "total_tickets": 5}"#,
        )
        .unwrap();
        let from_string: TicketInput = serde_json::from_str(
            r#"{"ticket_type": "paid", "ticket_fare": "19.99", "total_tickets": 5}"#,
        )
        .unwrap();

        assert_eq!(from_number.ticket_fare, Some(fare("19.99")));
        assert_eq!(from_string.ticket_fare, Some(fare("19.99")));
    }

    #[test]
    fn free_event_rejects_positive_fare_but_accepts_zero() {
        let now = Utc::now();
        let mut req = request(now);

        req.ticket_details.ticket_fare = Some(fare("10"));
        assert!(field_errors(req.validate(now).unwrap_err()).contains("ticket_details.ticket_fare"));

        req.ticket_details.ticket_fare = Some(fare("0.00"));
        assert_eq!(req.validate(now).unwrap().ticket_fare, None);
    }

    #[test]
    fn group_requires_more_than_one_participant() {
        let now = Utc::now();
        let mut req = request(now);
        req.participant_details.participant_type = "group".to_string();

        req.participant_details.participant_count = Some(1);
        assert!(
            field_errors(req.validate(now).unwrap_err())
                .contains("participant_details.participant_count")
        );

        req.participant_details.participant_count = None;
        assert!(req.validate(now).is_err());

        req.participant_details.participant_count = Some(6);
        assert_eq!(req.validate(now).unwrap().participant_count, 6);
    }

    #[test]
    fn time_window_must_be_future_and_ordered() {
        let now = Utc::now();
        let mut req = request(now);
        req.start_time = now - Duration::minutes(1);
        req.end_time = now - Duration::minutes(2);

        let errors = field_errors(req.validate(now).unwrap_err());
        assert!(errors.contains("start_time"));
        assert!(errors.contains("end_time"));

        let mut req = request(now);
        req.end_time = req.start_time;
        assert!(field_errors(req.validate(now).unwrap_err()).contains("end_time"));
    }

    #[test]
    fn all_failing_fields_are_reported_together() {
        let now = Utc::now();
        let mut req = request(now);
        req.name = "ab".to_string();
        req.image_url = "ftp://img.example.com/a.bmp".to_string();
        req.category_id = 0;
        req.address.postal_code = "12".to_string();
        req.ticket_details.total_tickets = 0;

        let errors = field_errors(req.validate(now).unwrap_err());
        assert_eq!(errors.len(), 5);
    }

    #[test]
    fn empty_update_is_rejected() {
        let errors = field_errors(UpdateEventRequest::default().validate().unwrap_err());
        assert!(errors.contains("body"));
    }

    #[test]
    fn update_trims_and_checks_present_fields() {
        let changes = UpdateEventRequest {
            description: Some("   A brand new description   ".to_string()),
            ..Default::default()
        }
        .validate()
        .unwrap();

        assert_eq!(
            changes.description.as_deref(),
            Some("A brand new description")
        );
        assert!(changes.name.is_none());

        let bad = UpdateEventRequest {
            image_url: Some("https://img.example.com/a.svg".to_string()),
            ..Default::default()
        };
        assert!(field_errors(bad.validate().unwrap_err()).contains("image_url"));
    }

    #[test]
    fn category_batch_rules() {
        let ok = validate_categories(&[CategoryRequest {
            name: " Music ".to_string(),
            image_url: "http://img.example.com/music.png".to_string(),
        }])
        .unwrap();
        assert_eq!(ok[0].name, "Music");

        let errors = field_errors(
            validate_categories(&[
                CategoryRequest {
                    name: "Art".to_string(),
                    image_url: "http://img.example.com/art.png".to_string(),
                },
                CategoryRequest {
                    name: "Art".to_string(),
                    image_url: "http://img.example.com/art2.png".to_string(),
                },
                CategoryRequest {
                    name: "X".to_string(),
                    image_url: "not a url".to_string(),
                },
            ])
            .unwrap_err(),
        );
        assert!(errors.contains("categories[1].name"));
        assert!(errors.contains("categories[2].name"));
        assert!(errors.contains("categories[2].image_url"));

        assert!(validate_categories(&[]).is_err());
    }
}
