//! Automated campaigns as loaded from the local cache.
mod set;

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::{predicate::Predicate, trigger::EventTrigger};

pub use set::{CampaignSet, TryParse};

/// A stored marketing rule: a trigger plus optional device targeting.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    id: String,
    trigger: EventTrigger,
    #[serde(default)]
    device_segment: Option<Predicate>,
    #[serde(default)]
    frequency_limits: Vec<FrequencyLimit>,
}

/// At most `count` deliveries per `interval_seconds`.
///
/// The matcher does not enforce limits. They are exposed on matched campaigns for the delivery
/// layer to consult.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrequencyLimit {
    #[allow(missing_docs)]
    pub count: u32,
    #[allow(missing_docs)]
    pub interval_seconds: f64,
}

impl Campaign {
    #[allow(missing_docs)]
    pub fn new(id: impl Into<String>, trigger: EventTrigger) -> Campaign {
        Campaign {
            id: id.into(),
            trigger,
            device_segment: None,
            frequency_limits: Vec::new(),
        }
    }

    /// Restrict the campaign to devices whose snapshot satisfies `predicate`.
    pub fn with_device_segment(mut self, predicate: Predicate) -> Campaign {
        self.device_segment = Some(predicate);
        self
    }

    #[allow(missing_docs)]
    pub fn with_frequency_limit(mut self, limit: FrequencyLimit) -> Campaign {
        self.frequency_limits.push(limit);
        self
    }

    #[allow(missing_docs)]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[allow(missing_docs)]
    pub fn trigger(&self) -> &EventTrigger {
        &self.trigger
    }

    #[allow(missing_docs)]
    pub fn device_segment(&self) -> Option<&Predicate> {
        self.device_segment.as_ref()
    }

    #[allow(missing_docs)]
    pub fn frequency_limits(&self) -> &[FrequencyLimit] {
        &self.frequency_limits
    }
}

impl FrequencyLimit {
    #[allow(missing_docs)]
    pub fn new(count: u32, interval_seconds: f64) -> FrequencyLimit {
        FrequencyLimit {
            count,
            interval_seconds,
        }
    }

    /// Interval as a duration, rounded to milliseconds. Negative or NaN intervals are zero and
    /// intervals beyond the representable range saturate.
    pub fn interval(&self) -> TimeDelta {
        let millis = (self.interval_seconds.max(0.0) * 1000.0).round() as i64;
        TimeDelta::try_milliseconds(millis).unwrap_or(TimeDelta::MAX)
    }
}
