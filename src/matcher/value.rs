use crate::value::{HackleValue, ValueType};
use crate::version::Version;

/// Per-value-type primitive comparison. The declared value type of a condition decides
/// which matcher runs; a value that does not coerce to that type never matches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ValueMatcher {
    String,
    Number,
    Bool,
    Version,
    None,
}

impl ValueMatcher {
    pub(crate) fn of(value_type: ValueType) -> ValueMatcher {
        match value_type {
            ValueType::String | ValueType::Json => ValueMatcher::String,
            ValueType::Number => ValueMatcher::Number,
            ValueType::Boolean => ValueMatcher::Bool,
            ValueType::Version => ValueMatcher::Version,
            ValueType::Null => ValueMatcher::None,
        }
    }

    pub(crate) fn equals(&self, user_value: &HackleValue, match_value: &HackleValue) -> bool {
        match self {
            ValueMatcher::String => string_op(user_value, match_value, |l, r| l == r),
            ValueMatcher::Number => number_op(user_value, match_value, |l, r| l == r),
            ValueMatcher::Bool => match (user_value.as_bool(), match_value.as_bool()) {
                (Some(l), Some(r)) => l == r,
                _ => false,
            },
            ValueMatcher::Version => version_op(user_value, match_value, |l, r| l == r),
            ValueMatcher::None => false,
        }
    }

    pub(crate) fn contains(&self, user_value: &HackleValue, match_value: &HackleValue) -> bool {
        match self {
            ValueMatcher::String => string_op(user_value, match_value, |l, r| l.contains(r)),
            _ => false,
        }
    }

    pub(crate) fn starts_with(&self, user_value: &HackleValue, match_value: &HackleValue) -> bool {
        match self {
            ValueMatcher::String => string_op(user_value, match_value, |l, r| l.starts_with(r)),
            _ => false,
        }
    }

    pub(crate) fn ends_with(&self, user_value: &HackleValue, match_value: &HackleValue) -> bool {
        match self {
            ValueMatcher::String => string_op(user_value, match_value, |l, r| l.ends_with(r)),
            _ => false,
        }
    }

    pub(crate) fn greater_than(&self, user_value: &HackleValue, match_value: &HackleValue) -> bool {
        self.ordering_op(user_value, match_value, |l, r| l > r, |l, r| l > r, |l, r| l > r)
    }

    pub(crate) fn greater_than_or_equal(
        &self,
        user_value: &HackleValue,
        match_value: &HackleValue,
    ) -> bool {
        self.ordering_op(user_value, match_value, |l, r| l >= r, |l, r| l >= r, |l, r| l >= r)
    }

    pub(crate) fn less_than(&self, user_value: &HackleValue, match_value: &HackleValue) -> bool {
        self.ordering_op(user_value, match_value, |l, r| l < r, |l, r| l < r, |l, r| l < r)
    }

    pub(crate) fn less_than_or_equal(
        &self,
        user_value: &HackleValue,
        match_value: &HackleValue,
    ) -> bool {
        self.ordering_op(user_value, match_value, |l, r| l <= r, |l, r| l <= r, |l, r| l <= r)
    }

    /// Ordering is defined for strings (byte-wise), numbers and versions, never for
    /// booleans.
    fn ordering_op(
        &self,
        user_value: &HackleValue,
        match_value: &HackleValue,
        string_cmp: impl Fn(&str, &str) -> bool,
        number_cmp: impl Fn(f64, f64) -> bool,
        version_cmp: impl Fn(&Version, &Version) -> bool,
    ) -> bool {
        match self {
            ValueMatcher::String => string_op(user_value, match_value, |l, r| string_cmp(l, r)),
            ValueMatcher::Number => number_op(user_value, match_value, number_cmp),
            ValueMatcher::Version => version_op(user_value, match_value, |l, r| version_cmp(&l, &r)),
            ValueMatcher::Bool | ValueMatcher::None => false,
        }
    }
}

fn string_op<F: Fn(&str, &str) -> bool>(
    user_value: &HackleValue,
    match_value: &HackleValue,
    f: F,
) -> bool {
    match (user_value.as_string(), match_value.as_string()) {
        (Some(l), Some(r)) => f(&l, &r),
        _ => false,
    }
}

fn number_op<F: Fn(f64, f64) -> bool>(
    user_value: &HackleValue,
    match_value: &HackleValue,
    f: F,
) -> bool {
    match (user_value.as_number(), match_value.as_number()) {
        (Some(l), Some(r)) => f(l, r),
        _ => false,
    }
}

fn version_op<F: Fn(Version, Version) -> bool>(
    user_value: &HackleValue,
    match_value: &HackleValue,
    f: F,
) -> bool {
    match (user_value.as_version(), match_value.as_version()) {
        (Some(l), Some(r)) => f(l, r),
        _ => false,
    }
}
