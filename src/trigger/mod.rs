//! Event triggers and the filters gating them.
mod eval;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::{date_time::DateTimeComponents, predicate::Predicate, DeviceSnapshot, Event, Timestamp};

pub(crate) use eval::{local_weekday, seconds_since_midnight, LogMalformed};

/// Event identity plus optional filters gating whether a campaign is a candidate for an event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTrigger {
    /// Name the event must have.
    pub event_name: String,
    /// Namespace the event must have. `None` only matches events without namespace.
    #[serde(default)]
    pub event_namespace: Option<String>,
    /// Filters attached to the trigger. At most one filter of each kind is meaningful; the first
    /// one of a kind is used and an absent kind imposes no constraint.
    #[serde(default)]
    pub filters: Vec<TriggerFilter>,
}

/// A filter attached to an [`EventTrigger`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TriggerFilter {
    #[allow(missing_docs)]
    DayOfWeek(DayOfWeekFilter),
    #[allow(missing_docs)]
    TimeOfDay(TimeOfDayFilter),
    #[allow(missing_docs)]
    Scheduled(ScheduledFilter),
    #[allow(missing_docs)]
    EventAttributes(EventAttributesFilter),
}

/// Days of the week, in the device zone, on which the trigger may fire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[allow(missing_docs)]
pub struct DayOfWeekFilter {
    pub monday: bool,
    pub tuesday: bool,
    pub wednesday: bool,
    pub thursday: bool,
    pub friday: bool,
    pub saturday: bool,
    pub sunday: bool,
}

/// Half-open window `[start_time, end_time)` of the local day, in seconds since midnight.
///
/// The window does not wrap around midnight: `start_time > end_time` never matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeOfDayFilter {
    #[allow(missing_docs)]
    pub start_time: i64,
    #[allow(missing_docs)]
    pub end_time: i64,
}

/// Absolute window in which the trigger may fire. Both bounds are exclusive and optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledFilter {
    #[serde(default, rename = "startDateTime")]
    #[allow(missing_docs)]
    pub start: Option<DateTimeComponents>,
    #[serde(default, rename = "endDateTime")]
    #[allow(missing_docs)]
    pub end: Option<DateTimeComponents>,
}

/// Predicate over the attributes of the triggering event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventAttributesFilter {
    #[allow(missing_docs)]
    pub predicate: Predicate,
}

/// Everything a filter is evaluated against.
#[derive(Debug, Clone, Copy)]
pub struct FilterContext<'a> {
    /// The triggering event.
    pub event: &'a Event,
    /// Current device state.
    pub device: &'a DeviceSnapshot,
    /// The instant the match is evaluated at.
    pub today: Timestamp,
    /// Zone in which days and times of day are computed.
    pub time_zone: Tz,
}

impl EventTrigger {
    /// Create a trigger without filters.
    pub fn new(event_name: impl Into<String>, event_namespace: Option<String>) -> Self {
        EventTrigger {
            event_name: event_name.into(),
            event_namespace,
            filters: Vec::new(),
        }
    }

    /// Add a filter.
    pub fn with_filter(mut self, filter: impl Into<TriggerFilter>) -> Self {
        self.filters.push(filter.into());
        self
    }

    #[allow(missing_docs)]
    pub fn day_of_week_filter(&self) -> Option<&DayOfWeekFilter> {
        self.filters.iter().find_map(|filter| match filter {
            TriggerFilter::DayOfWeek(f) => Some(f),
            _ => None,
        })
    }

    #[allow(missing_docs)]
    pub fn time_of_day_filter(&self) -> Option<&TimeOfDayFilter> {
        self.filters.iter().find_map(|filter| match filter {
            TriggerFilter::TimeOfDay(f) => Some(f),
            _ => None,
        })
    }

    #[allow(missing_docs)]
    pub fn scheduled_filter(&self) -> Option<&ScheduledFilter> {
        self.filters.iter().find_map(|filter| match filter {
            TriggerFilter::Scheduled(f) => Some(f),
            _ => None,
        })
    }

    #[allow(missing_docs)]
    pub fn event_attributes_filter(&self) -> Option<&EventAttributesFilter> {
        self.filters.iter().find_map(|filter| match filter {
            TriggerFilter::EventAttributes(f) => Some(f),
            _ => None,
        })
    }
}

impl From<DayOfWeekFilter> for TriggerFilter {
    fn from(value: DayOfWeekFilter) -> Self {
        TriggerFilter::DayOfWeek(value)
    }
}

impl From<TimeOfDayFilter> for TriggerFilter {
    fn from(value: TimeOfDayFilter) -> Self {
        TriggerFilter::TimeOfDay(value)
    }
}

impl From<ScheduledFilter> for TriggerFilter {
    fn from(value: ScheduledFilter) -> Self {
        TriggerFilter::Scheduled(value)
    }
}

impl From<EventAttributesFilter> for TriggerFilter {
    fn from(value: EventAttributesFilter) -> Self {
        TriggerFilter::EventAttributes(value)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{DayOfWeekFilter, EventTrigger, TimeOfDayFilter, TriggerFilter};

    #[test]
    fn parses_filters() {
        let trigger: EventTrigger = serde_json::from_value(json!({
            "eventName": "Purchase",
            "filters": [
                { "type": "dayOfWeek", "saturday": true, "sunday": true },
                { "type": "timeOfDay", "startTime": 32400, "endTime": 61200 },
                {
                    "type": "scheduled",
                    "startDateTime": { "date": "2024-01-01", "time": 0, "timeZone": "UTC" }
                },
                {
                    "type": "eventAttributes",
                    "predicate": {
                        "predicateType": "comparison",
                        "predicate": { "keyPath": "amount", "operator": "greaterThan", "numberValue": 10 }
                    }
                }
            ]
        }))
        .unwrap();

        assert_eq!(trigger.event_namespace, None);
        assert_eq!(
            trigger.day_of_week_filter(),
            Some(&DayOfWeekFilter {
                saturday: true,
                sunday: true,
                ..Default::default()
            })
        );
        assert_eq!(
            trigger.time_of_day_filter(),
            Some(&TimeOfDayFilter {
                start_time: 32400,
                end_time: 61200
            })
        );
        let scheduled = trigger.scheduled_filter().unwrap();
        assert!(scheduled.start.is_some());
        assert!(scheduled.end.is_none());
        assert!(trigger.event_attributes_filter().is_some());
    }

    #[test]
    fn first_filter_of_a_kind_wins() {
        let trigger = EventTrigger::new("Purchase", None)
            .with_filter(TimeOfDayFilter {
                start_time: 0,
                end_time: 10,
            })
            .with_filter(TimeOfDayFilter {
                start_time: 20,
                end_time: 30,
            });
        assert_eq!(trigger.time_of_day_filter().map(|f| f.start_time), Some(0));
        assert!(matches!(trigger.filters[1], TriggerFilter::TimeOfDay(_)));
    }

    #[test]
    fn rejects_unknown_filter_type() {
        let result = serde_json::from_value::<EventTrigger>(json!({
            "eventName": "Purchase",
            "filters": [{ "type": "moonPhase" }]
        }));
        assert!(result.is_err());
    }
}
