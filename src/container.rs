use serde::Deserialize;

use crate::experiment::{BucketId, ExperimentId};

/// A mutual-exclusion group: experiments in the same container share one bucket, and a user
/// only participates in the experiments of the group their slot falls into.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    pub id: i64,
    pub bucket_id: BucketId,
    pub groups: Vec<ContainerGroup>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ContainerGroup {
    pub id: i64,
    pub experiments: Vec<ExperimentId>,
}

impl Container {
    pub fn group(&self, group_id: i64) -> Option<&ContainerGroup> {
        self.groups.iter().find(|group| group.id == group_id)
    }
}
