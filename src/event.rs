use chrono::Utc;
use serde::Serialize;

use crate::{AttributeValue, Attributes, Timestamp};

/// A behavioral event emitted by the host application.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Event name, e.g. `"Purchase"`.
    pub name: String,
    /// Optional namespace separating host events from SDK-generated ones.
    pub namespace: Option<String>,
    /// Event attributes evaluated by `EventAttributes` trigger filters.
    pub attributes: Attributes,
    /// When the event was observed.
    pub timestamp: Timestamp,
}

impl Event {
    /// Create an event without namespace and attributes, observed now.
    ///
    /// ```
    /// # use campaign_engine::Event;
    /// let event = Event::new("Purchase").with_attribute("amount", 42.0);
    /// assert_eq!(event.name, "Purchase");
    /// ```
    pub fn new(name: impl Into<String>) -> Self {
        Event {
            name: name.into(),
            namespace: None,
            attributes: Attributes::new(),
            timestamp: Utc::now(),
        }
    }

    /// Set the event namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Add a single attribute.
    pub fn with_attribute(
        mut self,
        key: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Set the observation time.
    pub fn with_timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// A snapshot of the current device and user state.
///
/// The engine treats it as an opaque attribute mapping evaluated by device segment predicates.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DeviceSnapshot {
    attributes: Attributes,
}

impl DeviceSnapshot {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        DeviceSnapshot::default()
    }

    /// Add a single attribute.
    pub fn with_attribute(
        mut self,
        key: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Snapshot attributes.
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }
}

impl From<Attributes> for DeviceSnapshot {
    fn from(attributes: Attributes) -> Self {
        DeviceSnapshot { attributes }
    }
}

impl FromIterator<(String, AttributeValue)> for DeviceSnapshot {
    fn from_iter<T: IntoIterator<Item = (String, AttributeValue)>>(iter: T) -> Self {
        DeviceSnapshot {
            attributes: iter.into_iter().collect(),
        }
    }
}
