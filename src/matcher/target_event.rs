use chrono::{DateTime, Days, Duration, NaiveDate, Utc};
use log::warn;

use super::value_operator;
use crate::eval::{EvaluationError, EvaluatorRequest, Result};
use crate::target::{
    Condition, KeyType, NumberOfEventsInDays, NumberOfEventsWithPropertyInDays,
};
use crate::user::{EventProperty, TargetEvent};
use crate::value::HackleValue;

// Day boundaries for event statistics are fixed to UTC+9 regardless of device timezone.
const DAY_BOUNDARY_OFFSET_HOURS: i64 = 9;

/// Match an event-count condition against the user's synced event statistics.
///
/// The key name carries a JSON payload describing the aggregation; counts of all
/// qualifying stats inside the trailing window are summed and the sum is compared through
/// the value-operator matcher. Zero qualifying events is still a valid operand, so a
/// threshold like `<= 0` can succeed on total absence of activity.
pub(crate) fn matches(request: &EvaluatorRequest<'_>, condition: &Condition) -> Result<bool> {
    let target_events = request.user().target_events();
    let requested_at = request.requested_at();

    match condition.key.key_type {
        KeyType::NumberOfEventsInDays => {
            let payload: NumberOfEventsInDays = parse_key_name(&condition.key.name)?;
            let count = count_events(
                target_events,
                &payload.event_key,
                payload.days,
                None,
                requested_at,
            );
            Ok(value_operator::matches(Some(&HackleValue::Int(count)), &condition.r#match))
        }
        KeyType::NumberOfEventsWithPropertyInDays => {
            let payload: NumberOfEventsWithPropertyInDays = parse_key_name(&condition.key.name)?;
            let count = count_events(
                target_events,
                &payload.event_key,
                payload.days,
                Some(&payload.property_filter),
                requested_at,
            );
            Ok(value_operator::matches(Some(&HackleValue::Int(count)), &condition.r#match))
        }
        KeyType::UserId
        | KeyType::UserProperty
        | KeyType::HackleProperty
        | KeyType::EventProperty
        | KeyType::Segment
        | KeyType::AbTest
        | KeyType::FeatureFlag
        | KeyType::Cohort => {
            Err(EvaluationError::UnsupportedKeyType { key_type: condition.key.key_type })
        }
    }
}

fn parse_key_name<'de, T: serde::Deserialize<'de>>(name: &'de str) -> Result<T> {
    serde_json::from_str(name)
        .map_err(|_| EvaluationError::InvalidTargetKey { name: name.to_string() })
}

/// Sum the in-window stats of every qualifying entry.
///
/// Without a filter only un-narrowed entries contribute; property-narrowed entries overlap
/// them and would double-count. With a filter only entries whose property passes it
/// contribute, and entries lacking a property never do.
fn count_events(
    target_events: &[TargetEvent],
    event_key: &str,
    days: u32,
    property_filter: Option<&Condition>,
    requested_at: DateTime<Utc>,
) -> i64 {
    let threshold = window_start(requested_at, days);

    target_events
        .iter()
        .filter(|event| event.event_key == event_key)
        .filter(|event| match property_filter {
            None => event.property.is_none(),
            Some(filter) => event
                .property
                .as_ref()
                .map(|property| property_matches(property, filter))
                .unwrap_or(false),
        })
        .flat_map(|event| &event.stats)
        .filter(|stat| stat_date(stat.date).map(|date| date >= threshold).unwrap_or(false))
        .map(|stat| stat.count)
        .sum()
}

fn property_matches(property: &EventProperty, filter: &Condition) -> bool {
    property.key == filter.key.name
        && value_operator::matches(Some(&property.value), &filter.r#match)
}

/// The first day (UTC+9) that still counts: `days` whole days before the request's
/// current day-start. A stat dated exactly `days` days ago is inside the window; the
/// partial current day only contributes if the sync collaborator has already written a
/// stat for it.
fn window_start(requested_at: DateTime<Utc>, days: u32) -> NaiveDate {
    let today = (requested_at + Duration::hours(DAY_BOUNDARY_OFFSET_HOURS)).date_naive();
    today.checked_sub_days(Days::new(u64::from(days))).unwrap_or(NaiveDate::MIN)
}

/// Stat dates arrive as `yyyyMMdd` integers.
fn stat_date(date: i64) -> Option<NaiveDate> {
    let year = i32::try_from(date / 10_000).ok()?;
    let month = u32::try_from(date / 100 % 100).ok()?;
    let day = u32::try_from(date % 100).ok()?;
    let parsed = NaiveDate::from_ymd_opt(year, month, day);
    if parsed.is_none() {
        warn!("ignoring malformed event stat date {}", date);
    }
    parsed
}
