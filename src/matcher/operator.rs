use super::value::ValueMatcher;
use crate::target::Operator;
use crate::value::HackleValue;

/// Apply one operator to a single (non-array) user value against the candidate list.
///
/// Every operator except EXISTS matches when any candidate value satisfies the primitive
/// comparison; EXISTS only cares that the user value is present.
pub(crate) fn matches(
    operator: Operator,
    value_matcher: ValueMatcher,
    user_value: Option<&HackleValue>,
    match_values: &[HackleValue],
) -> bool {
    let user_value = match user_value {
        Some(value) if !value.is_null() => value,
        _ => return false,
    };

    match operator {
        Operator::In => match_values.iter().any(|it| value_matcher.equals(user_value, it)),
        Operator::Contains => match_values.iter().any(|it| value_matcher.contains(user_value, it)),
        Operator::StartsWith => {
            match_values.iter().any(|it| value_matcher.starts_with(user_value, it))
        }
        Operator::EndsWith => {
            match_values.iter().any(|it| value_matcher.ends_with(user_value, it))
        }
        Operator::Gt => match_values.iter().any(|it| value_matcher.greater_than(user_value, it)),
        Operator::Gte => {
            match_values.iter().any(|it| value_matcher.greater_than_or_equal(user_value, it))
        }
        Operator::Lt => match_values.iter().any(|it| value_matcher.less_than(user_value, it)),
        Operator::Lte => {
            match_values.iter().any(|it| value_matcher.less_than_or_equal(user_value, it))
        }
        // The user value is present; candidates are irrelevant.
        Operator::Exists => true,
    }
}
