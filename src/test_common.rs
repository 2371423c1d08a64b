use std::collections::HashMap;

use chrono::{DateTime, TimeZone, Utc};

use crate::bucket::{Bucket, Slot};
use crate::container::Container;
use crate::eval::{ExperimentRequest, InAppMessageRequest, RemoteConfigRequest};
use crate::experiment::{
    Action, BucketId, Experiment, ExperimentState, ExperimentType, TargetRule, Variation,
    VariationId,
};
use crate::in_app_message::{InAppMessage, InAppMessageStatus, Period};
use crate::remote_config::{RemoteConfigParameter, RemoteConfigTargetRule, RemoteConfigValue};
use crate::segment::Segment;
use crate::target::{Condition, Match, MatchType, Operator, Target, TargetKey};
use crate::user::HackleUser;
use crate::value::{HackleValue, ValueType};
use crate::workspace::{ParameterConfiguration, Workspace};

pub(crate) fn requested_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 8, 7, 10, 0, 0).unwrap()
}

pub(crate) fn experiment_request<'a>(
    workspace: &'a Workspace,
    user: &'a HackleUser,
    experiment: &'a Experiment,
) -> ExperimentRequest<'a> {
    ExperimentRequest {
        workspace,
        user,
        experiment,
        default_variation_key: "A",
        requested_at: requested_at(),
    }
}

pub(crate) fn remote_config_request<'a>(
    workspace: &'a Workspace,
    user: &'a HackleUser,
    parameter: &'a RemoteConfigParameter,
    default_value: &'a HackleValue,
) -> RemoteConfigRequest<'a> {
    RemoteConfigRequest { workspace, user, parameter, default_value, requested_at: requested_at() }
}

pub(crate) fn in_app_message_request<'a>(
    workspace: &'a Workspace,
    user: &'a HackleUser,
    in_app_message: &'a InAppMessage,
) -> InAppMessageRequest<'a> {
    InAppMessageRequest {
        workspace,
        user,
        in_app_message,
        event: None,
        requested_at: requested_at(),
    }
}

#[derive(Default)]
pub(crate) struct WorkspaceBuilder {
    workspace: Workspace,
}

pub(crate) fn workspace_builder() -> WorkspaceBuilder {
    WorkspaceBuilder::default()
}

impl WorkspaceBuilder {
    pub(crate) fn experiment(mut self, experiment: Experiment) -> Self {
        match experiment.experiment_type {
            ExperimentType::AbTest => {
                self.workspace.experiments.insert(experiment.key, experiment);
            }
            ExperimentType::FeatureFlag => {
                self.workspace.feature_flags.insert(experiment.key, experiment);
            }
        }
        self
    }

    pub(crate) fn bucket(mut self, bucket: Bucket) -> Self {
        self.workspace.buckets.insert(bucket.id, bucket);
        self
    }

    pub(crate) fn segment(mut self, segment: Segment) -> Self {
        self.workspace.segments.insert(segment.key.clone(), segment);
        self
    }

    pub(crate) fn container(mut self, container: Container) -> Self {
        self.workspace.containers.insert(container.id, container);
        self
    }

    pub(crate) fn parameter_configuration(mut self, config: ParameterConfiguration) -> Self {
        self.workspace.parameter_configurations.insert(config.id, config);
        self
    }

    pub(crate) fn build(self) -> Workspace {
        self.workspace
    }
}

pub(crate) struct ExperimentBuilder {
    experiment: Experiment,
}

pub(crate) fn ab_test(key: i64) -> ExperimentBuilder {
    ExperimentBuilder::new(key, ExperimentType::AbTest)
}

pub(crate) fn feature_flag(key: i64) -> ExperimentBuilder {
    ExperimentBuilder::new(key, ExperimentType::FeatureFlag)
}

impl ExperimentBuilder {
    fn new(key: i64, experiment_type: ExperimentType) -> ExperimentBuilder {
        ExperimentBuilder {
            experiment: Experiment {
                id: key,
                key,
                experiment_type,
                identifier_type: crate::user::IDENTIFIER_TYPE_ID.to_string(),
                container_id: None,
                variations: vec![variation(1, "A"), variation(2, "B")],
                user_overrides: HashMap::new(),
                segment_overrides: vec![],
                state: ExperimentState::Draft,
            },
        }
    }

    pub(crate) fn identifier_type(mut self, identifier_type: &str) -> Self {
        self.experiment.identifier_type = identifier_type.to_string();
        self
    }

    pub(crate) fn container_id(mut self, container_id: i64) -> Self {
        self.experiment.container_id = Some(container_id);
        self
    }

    pub(crate) fn variations(mut self, variations: Vec<Variation>) -> Self {
        self.experiment.variations = variations;
        self
    }

    pub(crate) fn user_override(mut self, identifier: &str, variation_id: VariationId) -> Self {
        self.experiment.user_overrides.insert(identifier.to_string(), variation_id);
        self
    }

    pub(crate) fn segment_override(mut self, target_rule: TargetRule) -> Self {
        self.experiment.segment_overrides.push(target_rule);
        self
    }

    pub(crate) fn paused(mut self) -> Self {
        self.experiment.state = ExperimentState::Paused;
        self
    }

    pub(crate) fn completed(mut self, winner_variation_id: VariationId) -> Self {
        self.experiment.state = ExperimentState::Completed { winner_variation_id };
        self
    }

    pub(crate) fn running(self, default_rule: Action) -> Self {
        self.running_with(vec![], vec![], default_rule)
    }

    pub(crate) fn running_with(
        mut self,
        target_audiences: Vec<Target>,
        target_rules: Vec<TargetRule>,
        default_rule: Action,
    ) -> Self {
        self.experiment.state =
            ExperimentState::Running { target_audiences, target_rules, default_rule };
        self
    }

    pub(crate) fn build(self) -> Experiment {
        self.experiment
    }
}

pub(crate) fn variation(id: VariationId, key: &str) -> Variation {
    Variation { id, key: key.to_string(), is_dropped: false, parameter_configuration_id: None }
}

pub(crate) fn dropped_variation(id: VariationId, key: &str) -> Variation {
    Variation { id, key: key.to_string(), is_dropped: true, parameter_configuration_id: None }
}

/// A bucket whose single slot spans the whole space, so every identifier allocates to
/// `variation_id`.
pub(crate) fn full_bucket(id: BucketId, variation_id: VariationId) -> Bucket {
    Bucket {
        id,
        seed: 875_758_774,
        slot_size: 10_000,
        slots: vec![Slot { start_inclusive: 0, end_exclusive: 10_000, variation_id }],
    }
}

/// A bucket with no slots, so no identifier ever allocates.
pub(crate) fn empty_bucket(id: BucketId) -> Bucket {
    Bucket { id, seed: 875_758_774, slot_size: 10_000, slots: vec![] }
}

pub(crate) fn user_property_in(name: &str, value: &str) -> Condition {
    Condition {
        key: TargetKey { key_type: crate::target::KeyType::UserProperty, name: name.to_string() },
        r#match: Match {
            match_type: MatchType::Match,
            operator: Operator::In,
            value_type: ValueType::String,
            values: vec![HackleValue::String(value.to_string())],
        },
    }
}

pub(crate) fn target_with_user_property(name: &str, value: &str) -> Target {
    Target { conditions: vec![user_property_in(name, value)] }
}

pub(crate) fn string_parameter(
    id: i64,
    key: &str,
    default_value: &str,
    target_rules: Vec<RemoteConfigTargetRule>,
) -> RemoteConfigParameter {
    RemoteConfigParameter {
        id,
        key: key.to_string(),
        value_type: ValueType::String,
        identifier_type: crate::user::IDENTIFIER_TYPE_ID.to_string(),
        target_rules,
        default_value: RemoteConfigValue {
            id: 1000,
            value: HackleValue::String(default_value.to_string()),
        },
    }
}

pub(crate) fn always_on_message(id: i64) -> InAppMessage {
    InAppMessage {
        id,
        key: id,
        status: InAppMessageStatus::Active,
        period: Period::Always,
        user_overrides: vec![],
        target_audiences: vec![],
    }
}
