use super::{resolver, target, target_event, value_operator};
use crate::eval::{
    self, DecisionReason, EvaluationError, EvaluatorContext, EvaluatorRequest,
    ExperimentEvaluation, ExperimentRequest, Result,
};
use crate::experiment::{Experiment, ExperimentKey};
use crate::target::{Condition, KeyType};
use crate::value::HackleValue;

/// Dispatch a condition to the matcher for its key type.
///
/// Every key type is handled here; a matcher receiving a key type it does not support (via
/// the resolvers) is a configuration error, not a non-match.
pub(crate) fn matches<'a>(
    request: &EvaluatorRequest<'a>,
    context: &mut EvaluatorContext<'a>,
    condition: &Condition,
) -> Result<bool> {
    match condition.key.key_type {
        KeyType::UserId | KeyType::UserProperty | KeyType::HackleProperty => {
            let user_value = resolver::resolve_user_value(request.user(), &condition.key)?;
            Ok(value_operator::matches(user_value.as_ref(), &condition.r#match))
        }
        KeyType::EventProperty => {
            let event = request.event().ok_or(EvaluationError::UnsupportedEventCondition)?;
            let event_value = resolver::resolve_event_value(event, &condition.key)?;
            Ok(value_operator::matches(event_value.as_ref(), &condition.r#match))
        }
        KeyType::Segment => segment_matches(request, context, condition),
        KeyType::AbTest => ab_test_matches(request, context, condition),
        KeyType::FeatureFlag => feature_flag_matches(request, context, condition),
        KeyType::Cohort => {
            let cohorts = HackleValue::Array(
                request.user().cohorts().iter().map(|id| HackleValue::Int(*id)).collect(),
            );
            Ok(value_operator::matches(Some(&cohorts), &condition.r#match))
        }
        KeyType::NumberOfEventsInDays | KeyType::NumberOfEventsWithPropertyInDays => {
            target_event::matches(request, condition)
        }
    }
}

/// Candidate values name segments; the condition matches when the user belongs to any of
/// them, with the usual polarity applied afterwards. Segments are workspace-internal
/// references, so a missing or non-string key is a configuration error.
fn segment_matches<'a>(
    request: &EvaluatorRequest<'a>,
    context: &mut EvaluatorContext<'a>,
    condition: &Condition,
) -> Result<bool> {
    let mut matched = false;
    for value in &condition.r#match.values {
        let segment_key = match value {
            HackleValue::String(segment_key) => segment_key,
            other => return Err(EvaluationError::InvalidSegmentKey { value: other.clone() }),
        };
        let segment = request.workspace().segment(segment_key).ok_or_else(|| {
            EvaluationError::SegmentNotFound { key: segment_key.clone() }
        })?;
        if target::any_matches(request, context, &segment.targets)? {
            matched = true;
            break;
        }
    }
    Ok(condition.r#match.match_type.apply(matched))
}

// Reasons under which a nested A/B test decision counts as a real assignment.
const AB_TEST_MATCHED_REASONS: [DecisionReason; 4] = [
    DecisionReason::Overridden,
    DecisionReason::TrafficAllocated,
    DecisionReason::TrafficAllocatedByTargeting,
    DecisionReason::ExperimentCompleted,
];

fn ab_test_matches<'a>(
    request: &EvaluatorRequest<'a>,
    context: &mut EvaluatorContext<'a>,
    condition: &Condition,
) -> Result<bool> {
    let experiment_key = parse_experiment_key(condition)?;
    let experiment = match request.workspace().experiment(experiment_key) {
        Some(experiment) => experiment,
        // A dangling reference may simply be stale; not an error.
        None => return Ok(false),
    };

    let evaluation = evaluate_memoized(request, context, experiment, true)?;
    if !AB_TEST_MATCHED_REASONS.contains(&evaluation.reason) {
        return Ok(false);
    }

    let variation_key = HackleValue::String(evaluation.variation_key.to_string());
    Ok(value_operator::matches(Some(&variation_key), &condition.r#match))
}

fn feature_flag_matches<'a>(
    request: &EvaluatorRequest<'a>,
    context: &mut EvaluatorContext<'a>,
    condition: &Condition,
) -> Result<bool> {
    let feature_key = parse_experiment_key(condition)?;
    let feature_flag = match request.workspace().feature_flag(feature_key) {
        Some(feature_flag) => feature_flag,
        None => return Ok(false),
    };

    let evaluation = evaluate_memoized(request, context, feature_flag, false)?;
    let on = HackleValue::Bool(evaluation.variation_key != "A");
    Ok(value_operator::matches(Some(&on), &condition.r#match))
}

fn parse_experiment_key(condition: &Condition) -> Result<ExperimentKey> {
    condition.key.name.parse().map_err(|_| EvaluationError::InvalidTargetKey {
        name: condition.key.name.clone(),
    })
}

/// Nested dependencies are evaluated at most once per call tree: the context memo is
/// consulted first, and a fresh evaluation is recorded there before use so every sibling
/// and descendant sees the same result.
fn evaluate_memoized<'a>(
    request: &EvaluatorRequest<'a>,
    context: &mut EvaluatorContext<'a>,
    experiment: &'a Experiment,
    allocated_by_targeting: bool,
) -> Result<ExperimentEvaluation<'a>> {
    if let Some(existing) = context.evaluation_of(experiment.id) {
        return Ok(existing.clone());
    }

    let nested_request = ExperimentRequest {
        workspace: request.workspace(),
        user: request.user(),
        experiment,
        default_variation_key: "A",
        requested_at: request.requested_at(),
    };
    let evaluation = eval::evaluate_experiment_in_context(nested_request, context)?;

    // A traffic allocation performed to satisfy another experiment's targeting is stamped
    // as such, so exposure events can tell the two apart.
    let evaluation = if allocated_by_targeting
        && matches!(request, EvaluatorRequest::Experiment(_))
        && evaluation.reason == DecisionReason::TrafficAllocated
    {
        evaluation.with_reason(DecisionReason::TrafficAllocatedByTargeting)
    } else {
        evaluation
    };

    context.add_evaluation(evaluation.clone());
    Ok(evaluation)
}
