//! Ticket and participant policy value types.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Returned when a policy enum is parsed from an unknown string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// How tickets for an event are sold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketType {
    Free,
    Paid,
}

impl TicketType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketType::Free => "free",
            TicketType::Paid => "paid",
        }
    }
}

impl std::fmt::Display for TicketType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsing is case-insensitive: `"FREE"`, `"Free"` and `"free"` are equal.
impl FromStr for TicketType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(TicketType::Free),
            "paid" => Ok(TicketType::Paid),
            _ => Err(ParseEnumError {
                kind: "ticket type",
                value: s.to_string(),
            }),
        }
    }
}

/// Whether one ticket admits a single person or a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantType {
    Individual,
    Group,
}

impl ParticipantType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipantType::Individual => "individual",
            ParticipantType::Group => "group",
        }
    }
}

impl std::fmt::Display for ParticipantType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParticipantType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "individual" => Ok(ParticipantType::Individual),
            "group" => Ok(ParticipantType::Group),
            _ => Err(ParseEnumError {
                kind: "participant type",
                value: s.to_string(),
            }),
        }
    }
}

/// Money amount represented in minor units (cents) to avoid floating point issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money {
    cents: i64,
}

impl Money {
    /// Largest fare the schema admits: ten digits with two decimals.
    pub const MAX: Money = Money {
        cents: 9_999_999_999,
    };

    pub fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    pub fn zero() -> Self {
        Self { cents: 0 }
    }

    pub fn cents(&self) -> i64 {
        self.cents
    }

    pub fn is_positive(&self) -> bool {
        self.cents > 0
    }

    pub fn is_zero(&self) -> bool {
        self.cents == 0
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.cents < 0 { "-" } else { "" };
        let abs = self.cents.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticket_type_parses_case_insensitively() {
        assert_eq!("FREE".parse::<TicketType>().unwrap(), TicketType::Free);
        assert_eq!("Paid".parse::<TicketType>().unwrap(), TicketType::Paid);
        assert!("donation".parse::<TicketType>().is_err());
    }

    #[test]
    fn participant_type_parses_case_insensitively() {
        assert_eq!(
            "Individual".parse::<ParticipantType>().unwrap(),
            ParticipantType::Individual
        );
        assert_eq!(
            "GROUP".parse::<ParticipantType>().unwrap(),
            ParticipantType::Group
        );
    }

    #[test]
    fn policy_enums_serialize_lowercase() {
        assert_eq!(serde_json::to_string(&TicketType::Paid).unwrap(), "\"paid\"");
        assert_eq!(
            serde_json::to_string(&ParticipantType::Group).unwrap(),
            "\"group\""
        );
    }

    #[test]
    fn money_display() {
        assert_eq!(Money::from_cents(1234).to_string(), "12.34");
        assert_eq!(Money::from_cents(5).to_string(), "0.05");
        assert_eq!(Money::from_cents(-250).to_string(), "-2.50");
    }

    #[test]
    fn money_predicates() {
        assert!(Money::from_cents(1).is_positive());
        assert!(Money::zero().is_zero());
        assert!(!Money::from_cents(-1).is_positive());
    }
}
