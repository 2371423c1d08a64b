use crate::bucket;
use crate::container::Container;
use crate::eval::{
    DecisionReason, EvaluationError, EvaluatorContext, EvaluatorRequest, ExperimentEvaluation,
    ExperimentRequest, Result,
};
use crate::experiment::{Action, ExperimentType, TargetRule, Variation};
use crate::matcher::target;
use crate::target::Target;

/// Evaluate one experiment request: overrides first, then lifecycle-state dispatch.
pub(crate) fn evaluate<'a>(
    request: ExperimentRequest<'a>,
    context: &mut EvaluatorContext<'a>,
) -> Result<ExperimentEvaluation<'a>> {
    use crate::experiment::ExperimentState::*;

    // Explicit overrides apply in every lifecycle state.
    if let Some(variation) = resolve_override(request, context)? {
        let reason = match request.experiment.experiment_type {
            ExperimentType::AbTest => DecisionReason::Overridden,
            ExperimentType::FeatureFlag => DecisionReason::IndividualTargetMatch,
        };
        return ExperimentEvaluation::of(request, context, variation, reason);
    }

    match &request.experiment.state {
        Draft => {
            ExperimentEvaluation::of_default(request, context, DecisionReason::ExperimentDraft)
        }
        Paused => {
            let reason = match request.experiment.experiment_type {
                ExperimentType::AbTest => DecisionReason::ExperimentPaused,
                ExperimentType::FeatureFlag => DecisionReason::FeatureFlagInactive,
            };
            ExperimentEvaluation::of_default(request, context, reason)
        }
        Completed { winner_variation_id } => {
            // The winner is fixed; no audience or rule evaluation, no bucket consumed.
            let winner = request.experiment.variation(*winner_variation_id).ok_or(
                EvaluationError::VariationNotFound { variation_id: *winner_variation_id },
            )?;
            ExperimentEvaluation::of(request, context, winner, DecisionReason::ExperimentCompleted)
        }
        Running { target_audiences, target_rules, default_rule } => {
            match request.experiment.experiment_type {
                ExperimentType::AbTest => {
                    evaluate_ab_test(request, context, target_audiences, default_rule)
                }
                ExperimentType::FeatureFlag => {
                    evaluate_feature_flag(request, context, target_rules, default_rule)
                }
            }
        }
    }
}

fn evaluate_ab_test<'a>(
    request: ExperimentRequest<'a>,
    context: &mut EvaluatorContext<'a>,
    target_audiences: &'a [Target],
    default_rule: &'a Action,
) -> Result<ExperimentEvaluation<'a>> {
    if request.user.identifier(&request.experiment.identifier_type).is_none() {
        return ExperimentEvaluation::of_default(
            request,
            context,
            DecisionReason::IdentifierNotFound,
        );
    }

    if let Some(container_id) = request.experiment.container_id {
        let container = request
            .workspace
            .container(container_id)
            .ok_or(EvaluationError::ContainerNotFound { container_id })?;
        if !user_in_container_group(request, container)? {
            return ExperimentEvaluation::of_default(
                request,
                context,
                DecisionReason::NotInMutualExclusionExperiment,
            );
        }
    }

    // The audience gate decides before any bucket slot is consumed.
    if !target::any_matches(&EvaluatorRequest::Experiment(request), context, target_audiences)? {
        return ExperimentEvaluation::of_default(
            request,
            context,
            DecisionReason::NotInExperimentTarget,
        );
    }

    match resolve_action(request, default_rule)? {
        None => ExperimentEvaluation::of_default(
            request,
            context,
            DecisionReason::TrafficNotAllocated,
        ),
        Some(variation) if variation.is_dropped => ExperimentEvaluation::of_default(
            request,
            context,
            DecisionReason::VariationDropped,
        ),
        Some(variation) => {
            ExperimentEvaluation::of(request, context, variation, DecisionReason::TrafficAllocated)
        }
    }
}

fn evaluate_feature_flag<'a>(
    request: ExperimentRequest<'a>,
    context: &mut EvaluatorContext<'a>,
    target_rules: &'a [TargetRule],
    default_rule: &'a Action,
) -> Result<ExperimentEvaluation<'a>> {
    if request.user.identifier(&request.experiment.identifier_type).is_none() {
        return ExperimentEvaluation::of_default(request, context, DecisionReason::DefaultRule);
    }

    if let Some(target_rule) = determine_target_rule(request, context, target_rules)? {
        let variation = resolve_action(request, &target_rule.action)?.ok_or(
            EvaluationError::VariationResolutionFailed { experiment_id: request.experiment.id },
        )?;
        return ExperimentEvaluation::of(
            request,
            context,
            variation,
            DecisionReason::TargetRuleMatch,
        );
    }

    let variation = resolve_action(request, default_rule)?.ok_or(
        EvaluationError::VariationResolutionFailed { experiment_id: request.experiment.id },
    )?;
    ExperimentEvaluation::of(request, context, variation, DecisionReason::DefaultRule)
}

/// First matching rule wins, in declaration order.
fn determine_target_rule<'a>(
    request: ExperimentRequest<'a>,
    context: &mut EvaluatorContext<'a>,
    target_rules: &'a [TargetRule],
) -> Result<Option<&'a TargetRule>> {
    for target_rule in target_rules {
        if target::matches(&EvaluatorRequest::Experiment(request), context, &target_rule.target)? {
            return Ok(Some(target_rule));
        }
    }
    Ok(None)
}

/// Manual per-identifier assignments, then ordered segment-override rules.
fn resolve_override<'a>(
    request: ExperimentRequest<'a>,
    context: &mut EvaluatorContext<'a>,
) -> Result<Option<&'a Variation>> {
    let experiment = request.experiment;

    if let Some(identifier) = request.user.identifier(&experiment.identifier_type) {
        if let Some(variation_id) = experiment.user_overrides.get(identifier) {
            // A stale override pointing at a removed variation is ignored.
            if let Some(variation) = experiment.variation(*variation_id) {
                return Ok(Some(variation));
            }
        }
    }

    for override_rule in &experiment.segment_overrides {
        if target::matches(&EvaluatorRequest::Experiment(request), context, &override_rule.target)? {
            return resolve_action(request, &override_rule.action);
        }
    }

    Ok(None)
}

/// Resolve an action to a variation. A bucket action yielding no slot (or a slot pointing
/// at a variation the experiment no longer has) is None; a variation action pointing at a
/// missing variation is a configuration error.
fn resolve_action<'a>(
    request: ExperimentRequest<'a>,
    action: &Action,
) -> Result<Option<&'a Variation>> {
    match action {
        Action::Variation { variation_id } => request
            .experiment
            .variation(*variation_id)
            .map(Some)
            .ok_or(EvaluationError::VariationNotFound { variation_id: *variation_id }),
        Action::Bucket { bucket_id } => {
            let bucket = request
                .workspace
                .bucket(*bucket_id)
                .ok_or(EvaluationError::BucketNotFound { bucket_id: *bucket_id })?;
            let identifier = match request.user.identifier(&request.experiment.identifier_type) {
                Some(identifier) => identifier,
                None => return Ok(None),
            };
            Ok(bucket::bucketing(bucket, identifier)
                .and_then(|slot| request.experiment.variation(slot.variation_id)))
        }
    }
}

/// The container's bucket assigns the user to a group; the experiment participates only
/// if that group lists it.
fn user_in_container_group(
    request: ExperimentRequest<'_>,
    container: &Container,
) -> Result<bool> {
    let bucket = request
        .workspace
        .bucket(container.bucket_id)
        .ok_or(EvaluationError::BucketNotFound { bucket_id: container.bucket_id })?;

    let identifier = match request.user.identifier(&request.experiment.identifier_type) {
        Some(identifier) => identifier,
        None => return Ok(false),
    };

    let slot = match bucket::bucketing(bucket, identifier) {
        Some(slot) => slot,
        None => return Ok(false),
    };

    let group = container
        .group(slot.variation_id)
        .ok_or(EvaluationError::ContainerGroupNotFound { group_id: slot.variation_id })?;

    Ok(group.experiments.contains(&request.experiment.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::ContainerGroup;
    use crate::eval::{evaluate_experiment, DecisionReason};
    use crate::target::{Condition, KeyType, Match, MatchType, Operator, Target, TargetKey};
    use crate::test_common::*;
    use crate::user::HackleUser;
    use crate::value::{HackleValue, ValueType};
    use crate::workspace::ParameterConfiguration;
    use maplit::hashmap;
    use spectral::prelude::*;

    fn user() -> HackleUser {
        HackleUser::with_id("user")
    }

    #[test]
    fn draft_experiment_returns_default_variation() {
        let workspace = workspace_builder().experiment(ab_test(1).build()).build();
        let experiment = workspace.experiment(1).unwrap();
        let user = user();

        let evaluation =
            evaluate_experiment(experiment_request(&workspace, &user, experiment)).unwrap();

        assert_eq!(evaluation.reason, DecisionReason::ExperimentDraft);
        assert_eq!(evaluation.variation_key, "A");
        assert_eq!(evaluation.variation_id, Some(1));
    }

    #[test]
    fn draft_experiment_with_unknown_default_key_has_no_variation_id() {
        let workspace = workspace_builder().experiment(ab_test(1).build()).build();
        let experiment = workspace.experiment(1).unwrap();
        let user = user();

        let mut request = experiment_request(&workspace, &user, experiment);
        request.default_variation_key = "Z";
        let evaluation = evaluate_experiment(request).unwrap();

        assert_eq!(evaluation.reason, DecisionReason::ExperimentDraft);
        assert_eq!(evaluation.variation_key, "Z");
        assert_that!(evaluation.variation_id).is_none();
    }

    #[test]
    fn paused_reasons_differ_by_experiment_type() {
        let workspace = workspace_builder()
            .experiment(ab_test(1).paused().build())
            .experiment(feature_flag(2).paused().build())
            .build();
        let user = user();

        let ab = workspace.experiment(1).unwrap();
        let evaluation = evaluate_experiment(experiment_request(&workspace, &user, ab)).unwrap();
        assert_eq!(evaluation.reason, DecisionReason::ExperimentPaused);

        let flag = workspace.feature_flag(2).unwrap();
        let evaluation = evaluate_experiment(experiment_request(&workspace, &user, flag)).unwrap();
        assert_eq!(evaluation.reason, DecisionReason::FeatureFlagInactive);
    }

    #[test]
    fn completed_experiment_always_returns_the_winner() {
        let workspace = workspace_builder()
            .experiment(
                ab_test(1)
                    .variations(vec![variation(1, "A"), variation(7, "G")])
                    .completed(7)
                    .build(),
            )
            .build();
        let experiment = workspace.experiment(1).unwrap();

        for id in ["user-a", "user-b", "user-c"] {
            let user = HackleUser::builder()
                .identifier(crate::user::IDENTIFIER_TYPE_ID, id)
                .property("age", 1i64)
                .build();
            let evaluation =
                evaluate_experiment(experiment_request(&workspace, &user, experiment)).unwrap();
            assert_eq!(evaluation.reason, DecisionReason::ExperimentCompleted);
            assert_eq!(evaluation.variation_id, Some(7));
            assert_eq!(evaluation.variation_key, "G");
        }
    }

    #[test]
    fn user_override_applies_even_when_paused() {
        let workspace = workspace_builder()
            .experiment(ab_test(1).user_override("user", 2).paused().build())
            .experiment(feature_flag(2).user_override("user", 2).paused().build())
            .build();
        let user = user();

        let ab = workspace.experiment(1).unwrap();
        let evaluation = evaluate_experiment(experiment_request(&workspace, &user, ab)).unwrap();
        assert_eq!(evaluation.reason, DecisionReason::Overridden);
        assert_eq!(evaluation.variation_key, "B");

        let flag = workspace.feature_flag(2).unwrap();
        let evaluation = evaluate_experiment(experiment_request(&workspace, &user, flag)).unwrap();
        assert_eq!(evaluation.reason, DecisionReason::IndividualTargetMatch);
        assert_eq!(evaluation.variation_key, "B");
    }

    #[test]
    fn stale_user_override_is_ignored() {
        let workspace = workspace_builder()
            .experiment(ab_test(1).user_override("user", 404).build())
            .build();
        let experiment = workspace.experiment(1).unwrap();
        let user = user();

        let evaluation =
            evaluate_experiment(experiment_request(&workspace, &user, experiment)).unwrap();
        assert_eq!(evaluation.reason, DecisionReason::ExperimentDraft);
    }

    #[test]
    fn segment_override_rule_assigns_its_action() {
        let workspace = workspace_builder()
            .experiment(
                ab_test(1)
                    .segment_override(TargetRule {
                        target: target_with_user_property("grade", "GOLD"),
                        action: Action::Variation { variation_id: 2 },
                    })
                    .build(),
            )
            .build();
        let experiment = workspace.experiment(1).unwrap();

        let gold = HackleUser::builder()
            .identifier(crate::user::IDENTIFIER_TYPE_ID, "user")
            .property("grade", "GOLD")
            .build();
        let evaluation =
            evaluate_experiment(experiment_request(&workspace, &gold, experiment)).unwrap();
        assert_eq!(evaluation.reason, DecisionReason::Overridden);
        assert_eq!(evaluation.variation_key, "B");

        let plain = user();
        let evaluation =
            evaluate_experiment(experiment_request(&workspace, &plain, experiment)).unwrap();
        assert_eq!(evaluation.reason, DecisionReason::ExperimentDraft);
    }

    #[test]
    fn running_ab_test_requires_the_identifier() {
        let workspace = workspace_builder()
            .bucket(full_bucket(500, 2))
            .experiment(
                ab_test(1)
                    .identifier_type("$deviceId")
                    .running(Action::Bucket { bucket_id: 500 })
                    .build(),
            )
            .build();
        let experiment = workspace.experiment(1).unwrap();
        let user = user();

        let evaluation =
            evaluate_experiment(experiment_request(&workspace, &user, experiment)).unwrap();
        assert_eq!(evaluation.reason, DecisionReason::IdentifierNotFound);
    }

    #[test]
    fn audience_gate_blocks_before_any_allocation() {
        let workspace = workspace_builder()
            .bucket(full_bucket(500, 2))
            .experiment(
                ab_test(1)
                    .running_with(
                        vec![target_with_user_property("grade", "GOLD")],
                        vec![],
                        Action::Bucket { bucket_id: 500 },
                    )
                    .build(),
            )
            .build();
        let experiment = workspace.experiment(1).unwrap();

        let outsider = user();
        let evaluation =
            evaluate_experiment(experiment_request(&workspace, &outsider, experiment)).unwrap();
        assert_eq!(evaluation.reason, DecisionReason::NotInExperimentTarget);
        assert_eq!(evaluation.variation_key, "A");

        let gold = HackleUser::builder()
            .identifier(crate::user::IDENTIFIER_TYPE_ID, "user")
            .property("grade", "GOLD")
            .build();
        let evaluation =
            evaluate_experiment(experiment_request(&workspace, &gold, experiment)).unwrap();
        assert_eq!(evaluation.reason, DecisionReason::TrafficAllocated);
        assert_eq!(evaluation.variation_key, "B");
    }

    #[test]
    fn traffic_allocation_outcomes() {
        let workspace = workspace_builder()
            .bucket(full_bucket(500, 2))
            .bucket(empty_bucket(501))
            .bucket(full_bucket(502, 3))
            .experiment(ab_test(1).running(Action::Bucket { bucket_id: 500 }).build())
            .experiment(ab_test(2).running(Action::Bucket { bucket_id: 501 }).build())
            .experiment(
                ab_test(3)
                    .variations(vec![variation(1, "A"), dropped_variation(3, "C")])
                    .running(Action::Bucket { bucket_id: 502 })
                    .build(),
            )
            .build();
        let user = user();

        let allocated = workspace.experiment(1).unwrap();
        let evaluation =
            evaluate_experiment(experiment_request(&workspace, &user, allocated)).unwrap();
        assert_eq!(evaluation.reason, DecisionReason::TrafficAllocated);
        assert_eq!(evaluation.variation_id, Some(2));

        let unallocated = workspace.experiment(2).unwrap();
        let evaluation =
            evaluate_experiment(experiment_request(&workspace, &user, unallocated)).unwrap();
        assert_eq!(evaluation.reason, DecisionReason::TrafficNotAllocated);

        let dropped = workspace.experiment(3).unwrap();
        let evaluation =
            evaluate_experiment(experiment_request(&workspace, &user, dropped)).unwrap();
        assert_eq!(evaluation.reason, DecisionReason::VariationDropped);
    }

    #[test]
    fn allocation_is_deterministic_across_calls() {
        let workspace = workspace_builder()
            .bucket(full_bucket(500, 2))
            .experiment(ab_test(1).running(Action::Bucket { bucket_id: 500 }).build())
            .build();
        let experiment = workspace.experiment(1).unwrap();
        let user = user();

        let first =
            evaluate_experiment(experiment_request(&workspace, &user, experiment)).unwrap();
        for _ in 0..10 {
            let again =
                evaluate_experiment(experiment_request(&workspace, &user, experiment)).unwrap();
            assert_eq!(again.variation_id, first.variation_id);
            assert_eq!(again.reason, first.reason);
        }
    }

    #[test]
    fn container_gate() {
        let workspace = workspace_builder()
            .bucket(full_bucket(500, 2))
            .bucket(full_bucket(600, 77))
            .container(Container {
                id: 10,
                bucket_id: 600,
                groups: vec![ContainerGroup { id: 77, experiments: vec![1] }],
            })
            .experiment(
                ab_test(1).container_id(10).running(Action::Bucket { bucket_id: 500 }).build(),
            )
            .experiment(
                ab_test(2)
                    .container_id(10)
                    .running(Action::Bucket { bucket_id: 500 })
                    .build(),
            )
            .build();
        let user = user();

        // Experiment 1 is in the user's container group.
        let inside = workspace.experiment(1).unwrap();
        let evaluation =
            evaluate_experiment(experiment_request(&workspace, &user, inside)).unwrap();
        assert_eq!(evaluation.reason, DecisionReason::TrafficAllocated);

        // Experiment 2 shares the container but is not in the group.
        let outside = workspace.experiment(2).unwrap();
        let evaluation =
            evaluate_experiment(experiment_request(&workspace, &user, outside)).unwrap();
        assert_eq!(evaluation.reason, DecisionReason::NotInMutualExclusionExperiment);
    }

    #[test]
    fn missing_container_is_a_configuration_error() {
        let workspace = workspace_builder()
            .bucket(full_bucket(500, 2))
            .experiment(
                ab_test(1).container_id(404).running(Action::Bucket { bucket_id: 500 }).build(),
            )
            .build();
        let experiment = workspace.experiment(1).unwrap();
        let user = user();

        let result = evaluate_experiment(experiment_request(&workspace, &user, experiment));
        assert_eq!(result, Err(EvaluationError::ContainerNotFound { container_id: 404 }));
    }

    #[test]
    fn feature_flag_target_rules_win_over_the_default_rule() {
        let workspace = workspace_builder()
            .experiment(
                feature_flag(1)
                    .running_with(
                        vec![],
                        vec![TargetRule {
                            target: target_with_user_property("grade", "GOLD"),
                            action: Action::Variation { variation_id: 2 },
                        }],
                        Action::Variation { variation_id: 1 },
                    )
                    .build(),
            )
            .build();
        let flag = workspace.feature_flag(1).unwrap();

        let gold = HackleUser::builder()
            .identifier(crate::user::IDENTIFIER_TYPE_ID, "user")
            .property("grade", "GOLD")
            .build();
        let evaluation = evaluate_experiment(experiment_request(&workspace, &gold, flag)).unwrap();
        assert_eq!(evaluation.reason, DecisionReason::TargetRuleMatch);
        assert_eq!(evaluation.variation_key, "B");

        let plain = user();
        let evaluation =
            evaluate_experiment(experiment_request(&workspace, &plain, flag)).unwrap();
        assert_eq!(evaluation.reason, DecisionReason::DefaultRule);
        assert_eq!(evaluation.variation_key, "A");
    }

    #[test]
    fn feature_flag_without_identifier_falls_to_default_variation() {
        let workspace = workspace_builder()
            .experiment(
                feature_flag(1)
                    .identifier_type("$deviceId")
                    .running(Action::Variation { variation_id: 2 })
                    .build(),
            )
            .build();
        let flag = workspace.feature_flag(1).unwrap();
        let user = user();

        let evaluation = evaluate_experiment(experiment_request(&workspace, &user, flag)).unwrap();
        assert_eq!(evaluation.reason, DecisionReason::DefaultRule);
        // The rule is never consulted; the caller default applies.
        assert_eq!(evaluation.variation_key, "A");
    }

    fn ab_test_condition(experiment_key: &str, variation_key: &str) -> Condition {
        Condition {
            key: TargetKey { key_type: KeyType::AbTest, name: experiment_key.to_string() },
            r#match: Match {
                match_type: MatchType::Match,
                operator: Operator::In,
                value_type: ValueType::String,
                values: vec![HackleValue::String(variation_key.to_string())],
            },
        }
    }

    #[test]
    fn nested_dependency_is_evaluated_once_and_shared() {
        // Two audience conditions both depend on experiment 5.
        let workspace = workspace_builder()
            .bucket(full_bucket(500, 2))
            .experiment(ab_test(5).running(Action::Bucket { bucket_id: 500 }).build())
            .experiment(
                ab_test(1)
                    .running_with(
                        vec![Target {
                            conditions: vec![
                                ab_test_condition("5", "B"),
                                ab_test_condition("5", "B"),
                            ],
                        }],
                        vec![],
                        Action::Bucket { bucket_id: 500 },
                    )
                    .build(),
            )
            .build();
        let experiment = workspace.experiment(1).unwrap();
        let user = user();

        let evaluation =
            evaluate_experiment(experiment_request(&workspace, &user, experiment)).unwrap();

        assert_eq!(evaluation.reason, DecisionReason::TrafficAllocated);
        // The nested experiment was evaluated once and its evaluation travels with the
        // result for exposure tracking.
        assert_that!(evaluation.target_evaluations).has_length(1);
        assert_eq!(evaluation.target_evaluations[0].experiment.id, 5);
        assert_eq!(
            evaluation.target_evaluations[0].reason,
            DecisionReason::TrafficAllocatedByTargeting
        );
    }

    #[test]
    fn self_referential_experiment_is_a_configuration_error() {
        let workspace = workspace_builder()
            .bucket(full_bucket(500, 2))
            .experiment(
                ab_test(1)
                    .running_with(
                        vec![Target { conditions: vec![ab_test_condition("1", "B")] }],
                        vec![],
                        Action::Bucket { bucket_id: 500 },
                    )
                    .build(),
            )
            .build();
        let experiment = workspace.experiment(1).unwrap();
        let user = user();

        let result = evaluate_experiment(experiment_request(&workspace, &user, experiment));
        assert_that!(result.is_err()).is_true();
        assert!(matches!(result, Err(EvaluationError::CircularEvaluation { .. })));
    }

    #[test]
    fn decided_variation_carries_its_parameter_configuration() {
        let config = ParameterConfiguration::new(
            7,
            hashmap! {"title".to_string() => HackleValue::String("hello".to_string())},
        );
        let configured = Variation {
            id: 2,
            key: "B".to_string(),
            is_dropped: false,
            parameter_configuration_id: Some(7),
        };
        let workspace = workspace_builder()
            .parameter_configuration(config)
            .experiment(
                feature_flag(1)
                    .variations(vec![variation(1, "A"), configured])
                    .running(Action::Variation { variation_id: 2 })
                    .build(),
            )
            .build();
        let flag = workspace.feature_flag(1).unwrap();
        let user = user();

        let evaluation = evaluate_experiment(experiment_request(&workspace, &user, flag)).unwrap();
        assert_eq!(
            evaluation.config.unwrap().parameter("title"),
            Some(&HackleValue::String("hello".to_string()))
        );
    }

    #[test]
    fn missing_parameter_configuration_is_a_configuration_error() {
        let configured = Variation {
            id: 2,
            key: "B".to_string(),
            is_dropped: false,
            parameter_configuration_id: Some(7),
        };
        let workspace = workspace_builder()
            .experiment(
                feature_flag(1)
                    .variations(vec![variation(1, "A"), configured])
                    .running(Action::Variation { variation_id: 2 })
                    .build(),
            )
            .build();
        let flag = workspace.feature_flag(1).unwrap();
        let user = user();

        let result = evaluate_experiment(experiment_request(&workspace, &user, flag));
        assert_eq!(
            result,
            Err(EvaluationError::ParameterConfigurationNotFound {
                parameter_configuration_id: 7
            })
        );
    }

    #[test]
    fn audience_condition_on_user_property_number() {
        let condition = Condition {
            key: TargetKey {
                key_type: KeyType::UserProperty,
                name: "age".to_string(),
            },
            r#match: Match {
                match_type: MatchType::Match,
                operator: Operator::In,
                value_type: ValueType::Number,
                values: vec![HackleValue::Int(42)],
            },
        };
        let workspace = workspace_builder()
            .bucket(full_bucket(500, 2))
            .experiment(
                ab_test(1)
                    .running_with(
                        vec![Target { conditions: vec![condition] }],
                        vec![],
                        Action::Bucket { bucket_id: 500 },
                    )
                    .build(),
            )
            .build();
        let experiment = workspace.experiment(1).unwrap();

        let forty_two = HackleUser::builder()
            .identifier(crate::user::IDENTIFIER_TYPE_ID, "user")
            .property("age", 42i64)
            .build();
        let evaluation =
            evaluate_experiment(experiment_request(&workspace, &forty_two, experiment)).unwrap();
        assert_eq!(evaluation.reason, DecisionReason::TrafficAllocated);

        let forty_three = HackleUser::builder()
            .identifier(crate::user::IDENTIFIER_TYPE_ID, "user")
            .property("age", 43i64)
            .build();
        let evaluation =
            evaluate_experiment(experiment_request(&workspace, &forty_three, experiment))
                .unwrap();
        assert_eq!(evaluation.reason, DecisionReason::NotInExperimentTarget);
    }
}
