use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::experiment::{BucketId, Experiment, ExperimentId, VariationId, Variation};
use crate::flow;
use crate::in_app_message::InAppMessage;
use crate::remote_config::RemoteConfigParameter;
use crate::target::KeyType;
use crate::user::{HackleUser, UserEvent};
use crate::value::HackleValue;
use crate::workspace::{ParameterConfiguration, Workspace};

/// Result of engine operations that can fail on inconsistent workspace configuration.
pub type Result<T> = std::result::Result<T, EvaluationError>;

/// Configuration/schema errors: the delivered workspace or condition is internally
/// inconsistent, and the caller should fall back to its default value.
///
/// Expected non-matches (stale experiment references, absent user attributes, unparseable
/// versions) are ordinary `false` results, never errors.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum EvaluationError {
    /// A condition key type reached a matcher that does not support it, indicating a
    /// client/server schema mismatch.
    #[error("unsupported target key type [{key_type:?}]")]
    UnsupportedKeyType { key_type: KeyType },

    /// An event-property condition was evaluated outside an in-flight-event request.
    #[error("event property conditions require an event request")]
    UnsupportedEventCondition,

    /// A condition key name could not be decoded (non-integer experiment key, malformed
    /// event-aggregation payload).
    #[error("invalid target key [{name}]")]
    InvalidTargetKey { name: String },

    /// A segment condition carried a non-string candidate value.
    #[error("segment key must be a string [{value:?}]")]
    InvalidSegmentKey { value: HackleValue },

    /// A segment referenced by a condition is missing from the workspace. Segments are
    /// workspace-internal references, so absence is an inconsistency, not staleness.
    #[error("segment not found [{key}]")]
    SegmentNotFound { key: String },

    /// An action or container referenced a bucket missing from the workspace.
    #[error("bucket not found [{bucket_id}]")]
    BucketNotFound { bucket_id: BucketId },

    /// An experiment referenced a container missing from the workspace.
    #[error("container not found [{container_id}]")]
    ContainerNotFound { container_id: i64 },

    /// A container slot pointed at a group the container does not declare.
    #[error("container group not found [{group_id}]")]
    ContainerGroupNotFound { group_id: i64 },

    /// An action referenced a variation the experiment does not have.
    #[error("variation not found [{variation_id}]")]
    VariationNotFound { variation_id: VariationId },

    /// A variation referenced a parameter configuration missing from the workspace.
    #[error("parameter configuration not found [{parameter_configuration_id}]")]
    ParameterConfigurationNotFound { parameter_configuration_id: i64 },

    /// A running feature flag failed to decide a variation.
    #[error("feature flag must decide a variation [{experiment_id}]")]
    VariationResolutionFailed { experiment_id: ExperimentId },

    /// A first-visit circular dependency between evaluations. Repeated references within
    /// one call tree are served from the context memo and never reach this.
    #[error("circular evaluation [{key:?}]")]
    CircularEvaluation { key: EvaluatorKey },
}

/// The kind of a request, part of the memoization identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EvaluatorType {
    Experiment,
    RemoteConfig,
    InAppMessage,
}

/// Memoization/cycle-guard identity of a request: `(kind, entity id)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EvaluatorKey {
    pub evaluator_type: EvaluatorType,
    pub id: i64,
}

/// A request to evaluate one experiment (A/B test or feature flag) for one user against one
/// workspace snapshot.
///
/// `requested_at` is the evaluation instant, stamped by the caller; the engine never reads
/// a clock.
#[derive(Clone, Copy, Debug)]
pub struct ExperimentRequest<'a> {
    pub workspace: &'a Workspace,
    pub user: &'a HackleUser,
    pub experiment: &'a Experiment,
    pub default_variation_key: &'a str,
    pub requested_at: DateTime<Utc>,
}

impl ExperimentRequest<'_> {
    pub(crate) fn key(&self) -> EvaluatorKey {
        EvaluatorKey {
            evaluator_type: EvaluatorType::Experiment,
            id: self.experiment.id,
        }
    }
}

/// A request to evaluate one remote config parameter.
#[derive(Clone, Copy, Debug)]
pub struct RemoteConfigRequest<'a> {
    pub workspace: &'a Workspace,
    pub user: &'a HackleUser,
    pub parameter: &'a RemoteConfigParameter,
    pub default_value: &'a HackleValue,
    pub requested_at: DateTime<Utc>,
}

impl RemoteConfigRequest<'_> {
    pub(crate) fn key(&self) -> EvaluatorKey {
        EvaluatorKey {
            evaluator_type: EvaluatorType::RemoteConfig,
            id: self.parameter.id,
        }
    }
}

/// A request to decide in-app message eligibility, optionally carrying the in-flight event
/// that triggered it.
#[derive(Clone, Copy, Debug)]
pub struct InAppMessageRequest<'a> {
    pub workspace: &'a Workspace,
    pub user: &'a HackleUser,
    pub in_app_message: &'a InAppMessage,
    pub event: Option<&'a UserEvent>,
    pub requested_at: DateTime<Utc>,
}

impl InAppMessageRequest<'_> {
    pub(crate) fn key(&self) -> EvaluatorKey {
        EvaluatorKey {
            evaluator_type: EvaluatorType::InAppMessage,
            id: self.in_app_message.id,
        }
    }
}

/// The request kinds the engine evaluates, as seen by condition matchers.
#[derive(Clone, Copy, Debug)]
pub enum EvaluatorRequest<'a> {
    Experiment(ExperimentRequest<'a>),
    RemoteConfig(RemoteConfigRequest<'a>),
    InAppMessage(InAppMessageRequest<'a>),
}

impl<'a> EvaluatorRequest<'a> {
    pub(crate) fn workspace(&self) -> &'a Workspace {
        match self {
            EvaluatorRequest::Experiment(request) => request.workspace,
            EvaluatorRequest::RemoteConfig(request) => request.workspace,
            EvaluatorRequest::InAppMessage(request) => request.workspace,
        }
    }

    pub(crate) fn user(&self) -> &'a HackleUser {
        match self {
            EvaluatorRequest::Experiment(request) => request.user,
            EvaluatorRequest::RemoteConfig(request) => request.user,
            EvaluatorRequest::InAppMessage(request) => request.user,
        }
    }

    pub(crate) fn requested_at(&self) -> DateTime<Utc> {
        match self {
            EvaluatorRequest::Experiment(request) => request.requested_at,
            EvaluatorRequest::RemoteConfig(request) => request.requested_at,
            EvaluatorRequest::InAppMessage(request) => request.requested_at,
        }
    }

    /// The in-flight event, present only for event-triggered requests.
    pub(crate) fn event(&self) -> Option<&'a UserEvent> {
        match self {
            EvaluatorRequest::InAppMessage(request) => request.event,
            EvaluatorRequest::Experiment(_) | EvaluatorRequest::RemoteConfig(_) => None,
        }
    }
}

/// Per-call-tree evaluation state: the request stack guarding against first-visit cycles,
/// and the memo of nested experiment evaluations.
///
/// A context is created fresh for each top-level request, owned by that call tree, and
/// discarded afterwards. It is never shared across threads or retained between requests,
/// which is why no locking exists anywhere in the engine.
#[derive(Debug, Default)]
pub struct EvaluatorContext<'a> {
    stack: Vec<EvaluatorKey>,
    evaluations: Vec<ExperimentEvaluation<'a>>,
}

impl<'a> EvaluatorContext<'a> {
    pub(crate) fn contains(&self, key: EvaluatorKey) -> bool {
        self.stack.contains(&key)
    }

    pub(crate) fn push(&mut self, key: EvaluatorKey) {
        self.stack.push(key);
    }

    pub(crate) fn pop(&mut self, key: EvaluatorKey) {
        self.stack.retain(|it| *it != key);
    }

    /// The evaluation already produced for this experiment within the current call tree.
    pub(crate) fn evaluation_of(&self, experiment_id: ExperimentId) -> Option<&ExperimentEvaluation<'a>> {
        self.evaluations
            .iter()
            .find(|evaluation| evaluation.experiment.id == experiment_id)
    }

    pub(crate) fn add_evaluation(&mut self, evaluation: ExperimentEvaluation<'a>) {
        self.evaluations.push(evaluation);
    }

    pub(crate) fn evaluations(&self) -> &[ExperimentEvaluation<'a>] {
        &self.evaluations
    }
}

/// Why an evaluation produced its result. Serialized names are consumed verbatim by the
/// event-emission collaborator when stamping exposure events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionReason {
    ExperimentDraft,
    ExperimentPaused,
    ExperimentCompleted,
    Overridden,
    TrafficNotAllocated,
    TrafficAllocated,
    TrafficAllocatedByTargeting,
    NotInMutualExclusionExperiment,
    IdentifierNotFound,
    VariationDropped,
    NotInExperimentTarget,
    FeatureFlagInactive,
    IndividualTargetMatch,
    TargetRuleMatch,
    DefaultRule,
    TypeMismatch,
    InAppMessageDraft,
    InAppMessagePaused,
    InAppMessageTarget,
    NotInInAppMessagePeriod,
    NotInInAppMessageTarget,
}

impl DecisionReason {
    /// The wire name of this reason.
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionReason::ExperimentDraft => "EXPERIMENT_DRAFT",
            DecisionReason::ExperimentPaused => "EXPERIMENT_PAUSED",
            DecisionReason::ExperimentCompleted => "EXPERIMENT_COMPLETED",
            DecisionReason::Overridden => "OVERRIDDEN",
            DecisionReason::TrafficNotAllocated => "TRAFFIC_NOT_ALLOCATED",
            DecisionReason::TrafficAllocated => "TRAFFIC_ALLOCATED",
            DecisionReason::TrafficAllocatedByTargeting => "TRAFFIC_ALLOCATED_BY_TARGETING",
            DecisionReason::NotInMutualExclusionExperiment => "NOT_IN_MUTUAL_EXCLUSION_EXPERIMENT",
            DecisionReason::IdentifierNotFound => "IDENTIFIER_NOT_FOUND",
            DecisionReason::VariationDropped => "VARIATION_DROPPED",
            DecisionReason::NotInExperimentTarget => "NOT_IN_EXPERIMENT_TARGET",
            DecisionReason::FeatureFlagInactive => "FEATURE_FLAG_INACTIVE",
            DecisionReason::IndividualTargetMatch => "INDIVIDUAL_TARGET_MATCH",
            DecisionReason::TargetRuleMatch => "TARGET_RULE_MATCH",
            DecisionReason::DefaultRule => "DEFAULT_RULE",
            DecisionReason::TypeMismatch => "TYPE_MISMATCH",
            DecisionReason::InAppMessageDraft => "IN_APP_MESSAGE_DRAFT",
            DecisionReason::InAppMessagePaused => "IN_APP_MESSAGE_PAUSED",
            DecisionReason::InAppMessageTarget => "IN_APP_MESSAGE_TARGET",
            DecisionReason::NotInInAppMessagePeriod => "NOT_IN_IN_APP_MESSAGE_PERIOD",
            DecisionReason::NotInInAppMessageTarget => "NOT_IN_IN_APP_MESSAGE_TARGET",
        }
    }
}

impl std::fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome of evaluating one experiment for one user.
///
/// Borrows from the workspace snapshot it was evaluated against, so it cannot outlive the
/// snapshot — callers that need to retain results copy the fields they care about.
#[derive(Clone, Debug, PartialEq)]
pub struct ExperimentEvaluation<'a> {
    pub reason: DecisionReason,
    /// Evaluations of nested experiment dependencies performed within this call tree.
    pub target_evaluations: Vec<ExperimentEvaluation<'a>>,
    pub experiment: &'a Experiment,
    /// None when the decision fell back to the caller-supplied default variation key and
    /// that key is not one of the experiment's variations.
    pub variation_id: Option<VariationId>,
    pub variation_key: &'a str,
    /// The parameter configuration attached to the decided variation, if any.
    pub config: Option<&'a ParameterConfiguration>,
}

impl<'a> ExperimentEvaluation<'a> {
    pub(crate) fn of(
        request: ExperimentRequest<'a>,
        context: &EvaluatorContext<'a>,
        variation: &'a Variation,
        reason: DecisionReason,
    ) -> Result<ExperimentEvaluation<'a>> {
        let config = match variation.parameter_configuration_id {
            Some(id) => Some(request.workspace.parameter_configuration(id).ok_or(
                EvaluationError::ParameterConfigurationNotFound {
                    parameter_configuration_id: id,
                },
            )?),
            None => None,
        };
        Ok(ExperimentEvaluation {
            reason,
            target_evaluations: context.evaluations().to_vec(),
            experiment: request.experiment,
            variation_id: Some(variation.id),
            variation_key: &variation.key,
            config,
        })
    }

    pub(crate) fn of_default(
        request: ExperimentRequest<'a>,
        context: &EvaluatorContext<'a>,
        reason: DecisionReason,
    ) -> Result<ExperimentEvaluation<'a>> {
        match request.experiment.variation_by_key(request.default_variation_key) {
            Some(variation) => ExperimentEvaluation::of(request, context, variation, reason),
            None => Ok(ExperimentEvaluation {
                reason,
                target_evaluations: context.evaluations().to_vec(),
                experiment: request.experiment,
                variation_id: None,
                variation_key: request.default_variation_key,
                config: None,
            }),
        }
    }

    pub(crate) fn with_reason(mut self, reason: DecisionReason) -> ExperimentEvaluation<'a> {
        self.reason = reason;
        self
    }
}

/// Evaluate an experiment or feature flag.
///
/// This is the single re-entrant entry point for experiment decisions: nested
/// experiment-dependency conditions recurse through the same machinery, sharing the
/// per-call-tree [EvaluatorContext] created here.
pub fn evaluate_experiment<'a>(
    request: ExperimentRequest<'a>,
) -> Result<ExperimentEvaluation<'a>> {
    let mut context = EvaluatorContext::default();
    evaluate_experiment_in_context(request, &mut context)
}

pub(crate) fn evaluate_experiment_in_context<'a>(
    request: ExperimentRequest<'a>,
    context: &mut EvaluatorContext<'a>,
) -> Result<ExperimentEvaluation<'a>> {
    let key = request.key();
    if context.contains(key) {
        return Err(EvaluationError::CircularEvaluation { key });
    }
    context.push(key);
    let result = flow::evaluate(request, context);
    context.pop(key);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_common::*;
    use assert_json_diff::assert_json_eq;
    use serde_json::json;
    use spectral::prelude::*;

    #[test]
    fn reasons_serialize_to_wire_names() {
        let reasons = vec![
            DecisionReason::TrafficAllocated,
            DecisionReason::DefaultRule,
            DecisionReason::TargetRuleMatch,
            DecisionReason::Overridden,
            DecisionReason::ExperimentDraft,
            DecisionReason::ExperimentPaused,
            DecisionReason::ExperimentCompleted,
            DecisionReason::NotInInAppMessagePeriod,
        ];
        assert_json_eq!(
            serde_json::to_value(&reasons).unwrap(),
            json!([
                "TRAFFIC_ALLOCATED",
                "DEFAULT_RULE",
                "TARGET_RULE_MATCH",
                "OVERRIDDEN",
                "EXPERIMENT_DRAFT",
                "EXPERIMENT_PAUSED",
                "EXPERIMENT_COMPLETED",
                "NOT_IN_IN_APP_MESSAGE_PERIOD"
            ])
        );
    }

    #[test]
    fn reason_display_matches_serialization() {
        for reason in [
            DecisionReason::TrafficAllocatedByTargeting,
            DecisionReason::NotInMutualExclusionExperiment,
            DecisionReason::IdentifierNotFound,
            DecisionReason::VariationDropped,
        ] {
            let serialized = serde_json::to_value(reason).unwrap();
            assert_eq!(serialized, serde_json::Value::String(reason.to_string()));
        }
    }

    #[test]
    fn context_records_and_finds_evaluations() {
        let workspace = workspace_builder().experiment(ab_test(42).build()).build();
        let experiment = workspace.experiment(42).unwrap();
        let user = HackleUser::with_id("user");
        let request = experiment_request(&workspace, &user, experiment);

        let mut context = EvaluatorContext::default();
        assert_that!(context.evaluation_of(experiment.id)).is_none();

        let evaluation =
            ExperimentEvaluation::of_default(request, &context, DecisionReason::ExperimentDraft)
                .unwrap();
        context.add_evaluation(evaluation);

        let found = context.evaluation_of(experiment.id).unwrap();
        assert_eq!(found.reason, DecisionReason::ExperimentDraft);
        assert_that!(context.evaluation_of(99999)).is_none();
    }

    #[test]
    fn context_stack_guards_reentry() {
        let key = EvaluatorKey { evaluator_type: EvaluatorType::Experiment, id: 1 };
        let other = EvaluatorKey { evaluator_type: EvaluatorType::RemoteConfig, id: 1 };

        let mut context = EvaluatorContext::default();
        context.push(key);
        assert_that!(context.contains(key)).is_true();
        // Same id, different kind: a distinct identity.
        assert_that!(context.contains(other)).is_false();
        context.pop(key);
        assert_that!(context.contains(key)).is_false();
    }
}
