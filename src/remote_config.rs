use serde::Deserialize;

use crate::bucket;
use crate::eval::{
    DecisionReason, EvaluationError, EvaluatorContext, EvaluatorRequest, ExperimentEvaluation,
    RemoteConfigRequest, Result,
};
use crate::experiment::BucketId;
use crate::matcher::target;
use crate::target::Target;
use crate::value::{HackleValue, ValueType};

/// A remote config parameter: a typed value with ordered target rules, decided per user.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteConfigParameter {
    pub id: i64,
    pub key: String,
    #[serde(rename = "type")]
    pub value_type: ValueType,
    #[serde(default = "default_identifier_type")]
    pub identifier_type: String,
    #[serde(default)]
    pub target_rules: Vec<RemoteConfigTargetRule>,
    pub default_value: RemoteConfigValue,
}

fn default_identifier_type() -> String {
    crate::user::IDENTIFIER_TYPE_ID.to_string()
}

/// One ordered rule of a parameter: the target must match and the user must land in a slot
/// of the rule's bucket.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteConfigTargetRule {
    pub key: String,
    pub name: String,
    pub target: Target,
    pub bucket_id: BucketId,
    pub value: RemoteConfigValue,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct RemoteConfigValue {
    pub id: i64,
    pub value: HackleValue,
}

/// The outcome of deciding one remote config parameter for one user.
#[derive(Clone, Debug, PartialEq)]
pub struct RemoteConfigEvaluation<'a> {
    pub reason: DecisionReason,
    pub target_evaluations: Vec<ExperimentEvaluation<'a>>,
    pub parameter: &'a RemoteConfigParameter,
    /// None when the caller-supplied default was returned.
    pub value_id: Option<i64>,
    pub value: HackleValue,
}

impl<'a> RemoteConfigEvaluation<'a> {
    fn of_default(
        request: RemoteConfigRequest<'a>,
        context: &EvaluatorContext<'a>,
        reason: DecisionReason,
    ) -> RemoteConfigEvaluation<'a> {
        RemoteConfigEvaluation {
            reason,
            target_evaluations: context.evaluations().to_vec(),
            parameter: request.parameter,
            value_id: None,
            value: request.default_value.clone(),
        }
    }
}

/// Decide a remote config parameter value for a user.
pub fn evaluate_remote_config<'a>(
    request: RemoteConfigRequest<'a>,
) -> Result<RemoteConfigEvaluation<'a>> {
    let mut context = EvaluatorContext::default();
    evaluate_remote_config_in_context(request, &mut context)
}

pub(crate) fn evaluate_remote_config_in_context<'a>(
    request: RemoteConfigRequest<'a>,
    context: &mut EvaluatorContext<'a>,
) -> Result<RemoteConfigEvaluation<'a>> {
    let key = request.key();
    if context.contains(key) {
        return Err(EvaluationError::CircularEvaluation { key });
    }
    context.push(key);
    let result = evaluate_internal(request, context);
    context.pop(key);
    result
}

fn evaluate_internal<'a>(
    request: RemoteConfigRequest<'a>,
    context: &mut EvaluatorContext<'a>,
) -> Result<RemoteConfigEvaluation<'a>> {
    if request
        .user
        .identifier(&request.parameter.identifier_type)
        .is_none()
    {
        return Ok(RemoteConfigEvaluation::of_default(
            request,
            context,
            DecisionReason::IdentifierNotFound,
        ));
    }

    if let Some(target_rule) = determine_target_rule(request, context)? {
        return Ok(evaluation(
            request,
            context,
            &target_rule.value,
            DecisionReason::TargetRuleMatch,
        ));
    }

    Ok(evaluation(
        request,
        context,
        &request.parameter.default_value,
        DecisionReason::DefaultRule,
    ))
}

fn determine_target_rule<'a>(
    request: RemoteConfigRequest<'a>,
    context: &mut EvaluatorContext<'a>,
) -> Result<Option<&'a RemoteConfigTargetRule>> {
    for target_rule in &request.parameter.target_rules {
        if matches_target_rule(request, context, target_rule)? {
            return Ok(Some(target_rule));
        }
    }
    Ok(None)
}

fn matches_target_rule<'a>(
    request: RemoteConfigRequest<'a>,
    context: &mut EvaluatorContext<'a>,
    target_rule: &RemoteConfigTargetRule,
) -> Result<bool> {
    if !target::matches(
        &EvaluatorRequest::RemoteConfig(request),
        context,
        &target_rule.target,
    )? {
        return Ok(false);
    }

    let identifier = match request.user.identifier(&request.parameter.identifier_type) {
        Some(identifier) => identifier,
        None => return Ok(false),
    };

    let bucket = request
        .workspace
        .bucket(target_rule.bucket_id)
        .ok_or(EvaluationError::BucketNotFound { bucket_id: target_rule.bucket_id })?;

    Ok(bucket::bucketing(bucket, identifier).is_some())
}

fn evaluation<'a>(
    request: RemoteConfigRequest<'a>,
    context: &EvaluatorContext<'a>,
    parameter_value: &RemoteConfigValue,
    reason: DecisionReason,
) -> RemoteConfigEvaluation<'a> {
    // The decided value must agree with the type of the caller-supplied default.
    if parameter_value.value.value_type() != request.default_value.value_type() {
        return RemoteConfigEvaluation::of_default(request, context, DecisionReason::TypeMismatch);
    }
    RemoteConfigEvaluation {
        reason,
        target_evaluations: context.evaluations().to_vec(),
        parameter: request.parameter,
        value_id: Some(parameter_value.id),
        value: parameter_value.value.clone(),
    }
}
