use serde::Deserialize;

use crate::target::Target;

/// A reusable audience definition referenced from conditions by key.
///
/// A user belongs to the segment when any of its targets matches (and all conditions
/// within that target match).
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub id: i64,
    pub key: String,
    #[serde(rename = "type")]
    pub segment_type: SegmentType,
    pub targets: Vec<Target>,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SegmentType {
    UserId,
    UserProperty,
}
