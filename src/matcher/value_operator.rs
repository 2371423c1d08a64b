use super::{operator, value::ValueMatcher};
use crate::target::Match;
use crate::value::HackleValue;

/// Apply a full [Match] (operator + value type + candidates + polarity) to a resolved user
/// value.
///
/// An array user value matches when any element matches; an empty array never matches (the
/// NOT_MATCH polarity still inverts that, so NOT_MATCH over an empty array is true).
pub(crate) fn matches(user_value: Option<&HackleValue>, r#match: &Match) -> bool {
    let matched = match user_value {
        Some(HackleValue::Array(elements)) => elements
            .iter()
            .any(|element| single_matches(Some(element), r#match)),
        other => single_matches(other, r#match),
    };
    r#match.match_type.apply(matched)
}

fn single_matches(user_value: Option<&HackleValue>, r#match: &Match) -> bool {
    operator::matches(
        r#match.operator,
        ValueMatcher::of(r#match.value_type),
        user_value,
        &r#match.values,
    )
}
