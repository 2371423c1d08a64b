use serde::Deserialize;

use crate::value::{HackleValue, ValueType};

/// A set of conditions gating rule applicability. A target matches iff all of its
/// conditions match.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Target {
    pub conditions: Vec<Condition>,
}

/// A single (key, match) pair inside a [Target].
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Condition {
    pub key: TargetKey,
    pub r#match: Match,
}

/// What a condition is keyed on: the key type selects the condition matcher, the name
/// selects the value within that matcher's domain (property name, experiment key, ...).
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct TargetKey {
    #[serde(rename = "type")]
    pub key_type: KeyType,
    pub name: String,
}

/// The closed set of condition key types.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KeyType {
    UserId,
    UserProperty,
    HackleProperty,
    EventProperty,
    Segment,
    AbTest,
    FeatureFlag,
    Cohort,
    NumberOfEventsInDays,
    NumberOfEventsWithPropertyInDays,
}

/// An operator, value type, candidate list and polarity, applied to a resolved user value.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    #[serde(rename = "type")]
    pub match_type: MatchType,
    pub operator: Operator,
    pub value_type: ValueType,
    pub values: Vec<HackleValue>,
}

/// Polarity of a [Match].
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchType {
    Match,
    NotMatch,
}

impl MatchType {
    /// Apply the polarity to a raw match result.
    pub fn apply(&self, matched: bool) -> bool {
        match self {
            MatchType::Match => matched,
            MatchType::NotMatch => !matched,
        }
    }
}

/// The closed set of comparison operators.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operator {
    In,
    Contains,
    StartsWith,
    EndsWith,
    Gt,
    Gte,
    Lt,
    Lte,
    Exists,
}

/// Decoded key-name payload of a `NUMBER_OF_EVENTS_IN_DAYS` condition. The key name itself
/// carries a JSON document describing the aggregation.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NumberOfEventsInDays {
    pub event_key: String,
    pub days: u32,
}

/// Decoded key-name payload of a `NUMBER_OF_EVENTS_WITH_PROPERTY_IN_DAYS` condition.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NumberOfEventsWithPropertyInDays {
    pub event_key: String,
    pub days: u32,
    pub property_filter: Condition,
}
