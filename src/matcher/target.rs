use super::condition;
use crate::eval::{EvaluatorContext, EvaluatorRequest, Result};
use crate::target::Target;

/// A target matches iff all of its conditions match.
pub(crate) fn matches<'a>(
    request: &EvaluatorRequest<'a>,
    context: &mut EvaluatorContext<'a>,
    target: &Target,
) -> Result<bool> {
    for condition in &target.conditions {
        if !condition::matches(request, context, condition)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// A target list matches iff any target matches. An empty list places no restriction and
/// always matches.
pub(crate) fn any_matches<'a>(
    request: &EvaluatorRequest<'a>,
    context: &mut EvaluatorContext<'a>,
    targets: &[Target],
) -> Result<bool> {
    if targets.is_empty() {
        return Ok(true);
    }
    for target in targets {
        if matches(request, context, target)? {
            return Ok(true);
        }
    }
    Ok(false)
}
