use std::collections::HashMap;

use serde::Deserialize;

use crate::value::HackleValue;

/// Identifier type of the default user id.
pub const IDENTIFIER_TYPE_ID: &str = "$id";
/// Identifier type of the application-provided user id.
pub const IDENTIFIER_TYPE_USER: &str = "$userId";
/// Identifier type of the device id.
pub const IDENTIFIER_TYPE_DEVICE: &str = "$deviceId";

/// A fully resolved user, prepared outside this engine.
///
/// The engine never touches raw platform state: identifiers, properties, computed hackle
/// properties, cohort memberships and target-event statistics all arrive pre-resolved from
/// the user-sync collaborator. Instances are immutable value objects; build them with
/// [HackleUser::builder].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HackleUser {
    identifiers: HashMap<String, String>,
    properties: HashMap<String, HackleValue>,
    hackle_properties: HashMap<String, HackleValue>,
    cohorts: Vec<i64>,
    target_events: Vec<TargetEvent>,
}

impl HackleUser {
    /// Create a new [HackleUserBuilder].
    pub fn builder() -> HackleUserBuilder {
        HackleUserBuilder::default()
    }

    /// Convenience constructor for a user with only the default id identifier.
    pub fn with_id(id: impl Into<String>) -> HackleUser {
        HackleUser::builder().identifier(IDENTIFIER_TYPE_ID, id).build()
    }

    /// Look up an identifier by its identifier type (e.g. `"$id"`).
    pub fn identifier(&self, identifier_type: &str) -> Option<&str> {
        self.identifiers.get(identifier_type).map(String::as_str)
    }

    /// Look up a user property by name.
    pub fn property(&self, name: &str) -> Option<&HackleValue> {
        self.properties.get(name)
    }

    /// Look up a hackle-computed property (os name, app version, ...) by name.
    pub fn hackle_property(&self, name: &str) -> Option<&HackleValue> {
        self.hackle_properties.get(name)
    }

    /// The cohort ids this user belongs to.
    pub fn cohorts(&self) -> &[i64] {
        &self.cohorts
    }

    /// Historical event statistics supplied by the user-sync collaborator.
    pub fn target_events(&self) -> &[TargetEvent] {
        &self.target_events
    }
}

/// Builder for [HackleUser].
#[derive(Debug, Default)]
pub struct HackleUserBuilder {
    user: HackleUser,
}

impl HackleUserBuilder {
    /// Add an identifier of the given type.
    pub fn identifier(
        mut self,
        identifier_type: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.user.identifiers.insert(identifier_type.into(), value.into());
        self
    }

    /// Add a user property.
    pub fn property(mut self, name: impl Into<String>, value: impl Into<HackleValue>) -> Self {
        self.user.properties.insert(name.into(), value.into());
        self
    }

    /// Add a hackle-computed property.
    pub fn hackle_property(
        mut self,
        name: impl Into<String>,
        value: impl Into<HackleValue>,
    ) -> Self {
        self.user.hackle_properties.insert(name.into(), value.into());
        self
    }

    /// Add a cohort membership.
    pub fn cohort(mut self, cohort_id: i64) -> Self {
        self.user.cohorts.push(cohort_id);
        self
    }

    /// Add a target-event statistic entry.
    pub fn target_event(mut self, target_event: TargetEvent) -> Self {
        self.user.target_events.push(target_event);
        self
    }

    pub fn build(self) -> HackleUser {
        self.user
    }
}

/// Historical occurrence counts of one event for one user, optionally narrowed to a single
/// property value, as delivered by the user-sync collaborator.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TargetEvent {
    pub event_key: String,
    pub stats: Vec<EventStat>,
    #[serde(default)]
    pub property: Option<EventProperty>,
}

/// One day's occurrence count. `date` is the day in `yyyyMMdd` integer form.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
pub struct EventStat {
    pub date: i64,
    pub count: i64,
}

/// The property value a [TargetEvent] is narrowed to.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct EventProperty {
    pub key: String,
    #[serde(rename = "type")]
    pub property_type: String,
    pub value: HackleValue,
}

/// An in-flight user event being evaluated, used by event-property conditions.
///
/// Track, exposure and remote-config events each expose their properties differently at the
/// pipeline level; by the time they reach the engine only the property bag matters.
#[derive(Clone, Debug, PartialEq)]
pub enum UserEvent {
    /// An application track event.
    Track {
        event_type_key: String,
        properties: HashMap<String, HackleValue>,
    },
    /// An experiment exposure event.
    Exposure {
        properties: HashMap<String, HackleValue>,
    },
    /// A remote config parameter decision event.
    RemoteConfig {
        properties: HashMap<String, HackleValue>,
    },
}

impl UserEvent {
    pub(crate) fn properties(&self) -> &HashMap<String, HackleValue> {
        match self {
            UserEvent::Track { properties, .. }
            | UserEvent::Exposure { properties }
            | UserEvent::RemoteConfig { properties } => properties,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spectral::prelude::*;

    #[test]
    fn builder_collects_all_sync_state() {
        let user = HackleUser::builder()
            .identifier(IDENTIFIER_TYPE_ID, "id-1")
            .identifier(IDENTIFIER_TYPE_USER, "user-1")
            .property("age", 42i64)
            .hackle_property("osName", "iOS")
            .cohort(100)
            .cohort(200)
            .target_event(TargetEvent {
                event_key: "purchase".to_string(),
                stats: vec![EventStat { date: 20250801, count: 3 }],
                property: None,
            })
            .build();

        assert_that!(user.identifier(IDENTIFIER_TYPE_ID)).contains_value("id-1");
        assert_that!(user.identifier(IDENTIFIER_TYPE_USER)).contains_value("user-1");
        assert_that!(user.identifier(IDENTIFIER_TYPE_DEVICE)).is_none();
        assert_eq!(user.property("age"), Some(&HackleValue::Int(42)));
        assert_eq!(
            user.hackle_property("osName"),
            Some(&HackleValue::String("iOS".to_string()))
        );
        assert_eq!(user.cohorts(), &[100, 200]);
        assert_eq!(user.target_events().len(), 1);
    }

    #[test]
    fn target_event_deserialization() {
        let event: TargetEvent = serde_json::from_str(
            r#"{
                "eventKey": "purchase",
                "stats": [{"date": 20250730, "count": 2}],
                "property": {"key": "productName", "type": "EVENT_PROPERTY", "value": "milk"}
            }"#,
        )
        .unwrap();

        assert_eq!(event.event_key, "purchase");
        assert_eq!(event.stats, vec![EventStat { date: 20250730, count: 2 }]);
        let property = event.property.unwrap();
        assert_eq!(property.key, "productName");
        assert_eq!(property.value, HackleValue::String("milk".to_string()));
    }

    #[test]
    fn event_property_bags() {
        let mut properties = HashMap::new();
        properties.insert("amount".to_string(), HackleValue::Int(4200));

        let track = UserEvent::Track {
            event_type_key: "purchase".to_string(),
            properties: properties.clone(),
        };
        let exposure = UserEvent::Exposure { properties: properties.clone() };

        assert_eq!(track.properties(), &properties);
        assert_eq!(exposure.properties(), &properties);
    }
}
