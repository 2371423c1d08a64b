use std::collections::HashMap;

use serde::Deserialize;

use crate::target::Target;

pub type ExperimentId = i64;
pub type ExperimentKey = i64;
pub type VariationId = i64;
pub type BucketId = i64;

/// An experiment or feature flag as delivered in the workspace snapshot.
///
/// The lifecycle state is assigned once when the snapshot is decoded and never transitions
/// in place; a refreshed snapshot replaces the whole experiment.
#[derive(Clone, Debug, PartialEq)]
pub struct Experiment {
    pub id: ExperimentId,
    pub key: ExperimentKey,
    pub experiment_type: ExperimentType,
    /// Which user identifier this experiment buckets and overrides by.
    pub identifier_type: String,
    /// Mutual-exclusion container this experiment participates in, if any.
    pub container_id: Option<i64>,
    pub variations: Vec<Variation>,
    /// Per-identifier manual variation assignments.
    pub user_overrides: HashMap<String, VariationId>,
    /// Ordered override rules matched before any lifecycle handling.
    pub segment_overrides: Vec<TargetRule>,
    pub state: ExperimentState,
}

/// Lifecycle state, carrying exactly the data that state can use.
#[derive(Clone, Debug, PartialEq)]
pub enum ExperimentState {
    /// Not yet running; only explicit overrides apply.
    Draft,
    /// Serving traffic.
    Running {
        /// Audience gate: the user must match at least one target (an empty list passes).
        target_audiences: Vec<Target>,
        /// Ordered rules; the first whose target matches decides the action.
        target_rules: Vec<TargetRule>,
        /// Applied when no target rule matches.
        default_rule: Action,
    },
    /// Temporarily stopped; only explicit overrides apply.
    Paused,
    /// Finished with a decided winner.
    Completed { winner_variation_id: VariationId },
}

impl Experiment {
    pub fn variation(&self, variation_id: VariationId) -> Option<&Variation> {
        self.variations.iter().find(|v| v.id == variation_id)
    }

    pub fn variation_by_key(&self, variation_key: &str) -> Option<&Variation> {
        self.variations.iter().find(|v| v.key == variation_key)
    }
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExperimentType {
    AbTest,
    FeatureFlag,
}

/// One arm of an experiment.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Variation {
    pub id: VariationId,
    pub key: String,
    #[serde(default, rename = "status", deserialize_with = "dropped_from_status")]
    pub is_dropped: bool,
    #[serde(default)]
    pub parameter_configuration_id: Option<i64>,
}

// Variation status arrives as a raw string; anything other than ACTIVE means the
// variation was dropped from the experiment.
fn dropped_from_status<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let status = String::deserialize(deserializer)?;
    Ok(status != "ACTIVE")
}

/// A (target, action) pair: when the target matches, the action decides the variation.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct TargetRule {
    pub target: Target,
    pub action: Action,
}

/// How a matched rule resolves to a variation: either directly, or by delegating slot
/// assignment to a bucket.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    #[serde(rename_all = "camelCase")]
    Variation { variation_id: VariationId },
    #[serde(rename_all = "camelCase")]
    Bucket { bucket_id: BucketId },
}
