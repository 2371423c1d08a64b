use std::collections::HashMap;

use log::warn;
use serde::Deserialize;
use serde_with::{serde_as, VecSkipError};

use crate::bucket::Bucket;
use crate::container::Container;
use crate::experiment::{
    Action, BucketId, Experiment, ExperimentKey, ExperimentState, ExperimentType, TargetRule,
    Variation, VariationId,
};
use crate::in_app_message::{InAppMessage, InAppMessageDto};
use crate::remote_config::RemoteConfigParameter;
use crate::segment::Segment;
use crate::target::Target;
use crate::value::HackleValue;

/// A named event the workspace knows about.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct EventType {
    pub id: i64,
    pub key: String,
}

/// A bag of parameters attached to a variation.
#[derive(Clone, Debug, PartialEq)]
pub struct ParameterConfiguration {
    pub id: i64,
    parameters: HashMap<String, HackleValue>,
}

impl ParameterConfiguration {
    pub fn new(id: i64, parameters: HashMap<String, HackleValue>) -> ParameterConfiguration {
        ParameterConfiguration { id, parameters }
    }

    pub fn parameter(&self, key: &str) -> Option<&HackleValue> {
        self.parameters.get(key)
    }
}

/// An immutable snapshot of everything the server delivered: experiments, feature flags,
/// buckets, segments, event types, containers, parameter configurations, remote config
/// parameters and in-app messages, all looked up by key or id.
///
/// Absence of an entry is a valid "not found" outcome for callers; it never raises. A new
/// snapshot wholesale replaces the old one — nothing in here ever mutates.
#[derive(Clone, Debug, Default)]
pub struct Workspace {
    pub id: i64,
    pub environment_id: i64,
    pub(crate) experiments: HashMap<ExperimentKey, Experiment>,
    pub(crate) feature_flags: HashMap<ExperimentKey, Experiment>,
    pub(crate) buckets: HashMap<BucketId, Bucket>,
    pub(crate) event_types: HashMap<String, EventType>,
    pub(crate) segments: HashMap<String, Segment>,
    pub(crate) containers: HashMap<i64, Container>,
    pub(crate) parameter_configurations: HashMap<i64, ParameterConfiguration>,
    pub(crate) remote_config_parameters: HashMap<String, RemoteConfigParameter>,
    pub(crate) in_app_messages: HashMap<i64, InAppMessage>,
}

impl Workspace {
    /// Decode a workspace payload.
    ///
    /// Entries that fail to decode or reference unknown statuses are dropped with a
    /// warning rather than failing the snapshot; only a structurally broken payload is an
    /// error.
    pub fn from_json(json: &str) -> Result<Workspace, serde_json::Error> {
        let dto: WorkspaceDto = serde_json::from_str(json)?;
        Ok(dto.into_workspace())
    }

    pub fn experiment(&self, experiment_key: ExperimentKey) -> Option<&Experiment> {
        self.experiments.get(&experiment_key)
    }

    pub fn feature_flag(&self, feature_key: ExperimentKey) -> Option<&Experiment> {
        self.feature_flags.get(&feature_key)
    }

    pub fn bucket(&self, bucket_id: BucketId) -> Option<&Bucket> {
        self.buckets.get(&bucket_id)
    }

    pub fn event_type(&self, event_type_key: &str) -> Option<&EventType> {
        self.event_types.get(event_type_key)
    }

    pub fn segment(&self, segment_key: &str) -> Option<&Segment> {
        self.segments.get(segment_key)
    }

    pub fn container(&self, container_id: i64) -> Option<&Container> {
        self.containers.get(&container_id)
    }

    pub fn parameter_configuration(
        &self,
        parameter_configuration_id: i64,
    ) -> Option<&ParameterConfiguration> {
        self.parameter_configurations.get(&parameter_configuration_id)
    }

    pub fn remote_config_parameter(&self, parameter_key: &str) -> Option<&RemoteConfigParameter> {
        self.remote_config_parameters.get(parameter_key)
    }

    pub fn in_app_message(&self, in_app_message_key: i64) -> Option<&InAppMessage> {
        self.in_app_messages.get(&in_app_message_key)
    }
}

#[serde_as]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorkspaceDto {
    #[serde(default)]
    workspace_id: i64,
    #[serde(default)]
    environment_id: i64,
    #[serde_as(as = "VecSkipError<_>")]
    #[serde(default)]
    experiments: Vec<ExperimentDto>,
    #[serde_as(as = "VecSkipError<_>")]
    #[serde(default)]
    feature_flags: Vec<ExperimentDto>,
    #[serde_as(as = "VecSkipError<_>")]
    #[serde(default)]
    buckets: Vec<Bucket>,
    #[serde_as(as = "VecSkipError<_>")]
    #[serde(default)]
    event_types: Vec<EventType>,
    #[serde_as(as = "VecSkipError<_>")]
    #[serde(default)]
    segments: Vec<Segment>,
    #[serde_as(as = "VecSkipError<_>")]
    #[serde(default)]
    containers: Vec<Container>,
    #[serde_as(as = "VecSkipError<_>")]
    #[serde(default)]
    parameter_configurations: Vec<ParameterConfigurationDto>,
    #[serde_as(as = "VecSkipError<_>")]
    #[serde(default)]
    remote_config_parameters: Vec<RemoteConfigParameter>,
    #[serde_as(as = "VecSkipError<_>")]
    #[serde(default)]
    in_app_messages: Vec<InAppMessageDto>,
}

impl WorkspaceDto {
    fn into_workspace(self) -> Workspace {
        let experiments = self
            .experiments
            .into_iter()
            .filter_map(|dto| dto.into_experiment(ExperimentType::AbTest))
            .map(|experiment| (experiment.key, experiment))
            .collect();
        let feature_flags = self
            .feature_flags
            .into_iter()
            .filter_map(|dto| dto.into_experiment(ExperimentType::FeatureFlag))
            .map(|experiment| (experiment.key, experiment))
            .collect();
        let in_app_messages = self
            .in_app_messages
            .into_iter()
            .filter_map(InAppMessageDto::into_in_app_message)
            .map(|message| (message.key, message))
            .collect();

        Workspace {
            id: self.workspace_id,
            environment_id: self.environment_id,
            experiments,
            feature_flags,
            buckets: self.buckets.into_iter().map(|it| (it.id, it)).collect(),
            event_types: self.event_types.into_iter().map(|it| (it.key.clone(), it)).collect(),
            segments: self.segments.into_iter().map(|it| (it.key.clone(), it)).collect(),
            containers: self.containers.into_iter().map(|it| (it.id, it)).collect(),
            parameter_configurations: self
                .parameter_configurations
                .into_iter()
                .map(ParameterConfigurationDto::into_parameter_configuration)
                .map(|it| (it.id, it))
                .collect(),
            remote_config_parameters: self
                .remote_config_parameters
                .into_iter()
                .map(|it| (it.key.clone(), it))
                .collect(),
            in_app_messages,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExperimentDto {
    id: i64,
    key: i64,
    status: String,
    #[serde(default = "default_identifier_type")]
    identifier_type: String,
    #[serde(default)]
    container_id: Option<i64>,
    variations: Vec<Variation>,
    #[serde(default)]
    user_overrides: Vec<UserOverrideDto>,
    #[serde(default)]
    segment_overrides: Vec<TargetRule>,
    #[serde(default)]
    target_audiences: Vec<Target>,
    #[serde(default)]
    target_rules: Vec<TargetRule>,
    #[serde(default)]
    default_rule: Option<Action>,
    #[serde(default)]
    winner_variation_id: Option<VariationId>,
}

fn default_identifier_type() -> String {
    crate::user::IDENTIFIER_TYPE_ID.to_string()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserOverrideDto {
    user_id: String,
    variation_id: VariationId,
}

impl ExperimentDto {
    /// Build the experiment, assigning its lifecycle state from the raw status string.
    /// Unknown statuses and running experiments without a default rule are dropped.
    fn into_experiment(self, experiment_type: ExperimentType) -> Option<Experiment> {
        let state = match self.status.as_str() {
            "DRAFT" => ExperimentState::Draft,
            "PAUSED" => ExperimentState::Paused,
            "RUNNING" => {
                let default_rule = match self.default_rule {
                    Some(default_rule) => default_rule,
                    None => {
                        warn!("running experiment {} has no default rule", self.id);
                        return None;
                    }
                };
                ExperimentState::Running {
                    target_audiences: self.target_audiences,
                    target_rules: self.target_rules,
                    default_rule,
                }
            }
            "COMPLETED" => {
                let winner_variation_id = match self.winner_variation_id {
                    Some(winner_variation_id) => winner_variation_id,
                    None => {
                        warn!("completed experiment {} has no winner variation", self.id);
                        return None;
                    }
                };
                ExperimentState::Completed { winner_variation_id }
            }
            unknown => {
                warn!("experiment {} has unsupported status {}", self.id, unknown);
                return None;
            }
        };

        Some(Experiment {
            id: self.id,
            key: self.key,
            experiment_type,
            identifier_type: self.identifier_type,
            container_id: self.container_id,
            variations: self.variations,
            user_overrides: self
                .user_overrides
                .into_iter()
                .map(|it| (it.user_id, it.variation_id))
                .collect(),
            segment_overrides: self.segment_overrides,
            state,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ParameterConfigurationDto {
    id: i64,
    parameters: Vec<ParameterDto>,
}

#[derive(Debug, Deserialize)]
struct ParameterDto {
    key: String,
    value: HackleValue,
}

impl ParameterConfigurationDto {
    fn into_parameter_configuration(self) -> ParameterConfiguration {
        ParameterConfiguration::new(
            self.id,
            self.parameters.into_iter().map(|it| (it.key, it.value)).collect(),
        )
    }
}
