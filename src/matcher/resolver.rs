use crate::eval::{EvaluationError, Result};
use crate::target::{KeyType, TargetKey};
use crate::user::{HackleUser, UserEvent};
use crate::value::HackleValue;

/// Extract the concrete value a condition key refers to from the user record.
///
/// Resolution is independent of matching: a missing identifier or property is simply None.
pub(crate) fn resolve_user_value(user: &HackleUser, key: &TargetKey) -> Result<Option<HackleValue>> {
    match key.key_type {
        KeyType::UserId => Ok(user
            .identifier(&key.name)
            .map(|identifier| HackleValue::String(identifier.to_string()))),
        KeyType::UserProperty => Ok(user.property(&key.name).cloned()),
        KeyType::HackleProperty => Ok(user.hackle_property(&key.name).cloned()),
        KeyType::EventProperty
        | KeyType::Segment
        | KeyType::AbTest
        | KeyType::FeatureFlag
        | KeyType::Cohort
        | KeyType::NumberOfEventsInDays
        | KeyType::NumberOfEventsWithPropertyInDays => {
            Err(EvaluationError::UnsupportedKeyType { key_type: key.key_type })
        }
    }
}

/// Extract a property value from an in-flight event.
pub(crate) fn resolve_event_value(event: &UserEvent, key: &TargetKey) -> Result<Option<HackleValue>> {
    match key.key_type {
        KeyType::EventProperty => Ok(event.properties().get(&key.name).cloned()),
        KeyType::UserId
        | KeyType::UserProperty
        | KeyType::HackleProperty
        | KeyType::Segment
        | KeyType::AbTest
        | KeyType::FeatureFlag
        | KeyType::Cohort
        | KeyType::NumberOfEventsInDays
        | KeyType::NumberOfEventsWithPropertyInDays => {
            Err(EvaluationError::UnsupportedKeyType { key_type: key.key_type })
        }
    }
}
