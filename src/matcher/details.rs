use std::fmt;

use serde::Serialize;

use crate::{
    campaign::Campaign,
    date_time::ScheduleError,
    predicate::{Comparison, ComparisonOperator, EvalVisitor, MalformedComparison},
    trigger::{FilterContext, LogMalformed},
    Timestamp,
};

use super::MatchVisitor;

/// How a match request was evaluated.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct MatchDetails {
    pub event_name: String,
    pub event_namespace: Option<String>,
    pub timestamp: Timestamp,
    pub time_zone: String,
    /// Candidates returned by the repository pre-filter, in repository order.
    pub candidates: Vec<CandidateDetails>,
}

/// Evaluation of a single pre-filtered candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct CandidateDetails {
    pub campaign_id: String,
    pub outcome: MatchOutcome,
    /// Why the scheduled filter could not be resolved, for `ScheduleUnresolvable`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule_error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub malformed_comparisons: Vec<MalformedComparisonDetails>,
}

/// First stage a candidate failed, or `Matched`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub enum MatchOutcome {
    Matched,
    ScheduleNotActive,
    ScheduleUnresolvable,
    DeviceSegmentMismatch,
    EventAttributesMismatch,
}

/// A comparison that evaluated to `false` because the data did not have the expected shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct MalformedComparisonDetails {
    pub key_path: String,
    pub operator: ComparisonOperator,
    #[serde(flatten)]
    pub reason: MalformedComparison,
}

pub(crate) struct MatchDetailsBuilder {
    details: MatchDetails,
    current: Option<CandidateDetails>,
}

impl MatchDetailsBuilder {
    pub fn new(context: &FilterContext<'_>) -> MatchDetailsBuilder {
        MatchDetailsBuilder {
            details: MatchDetails {
                event_name: context.event.name.clone(),
                event_namespace: context.event.namespace.clone(),
                timestamp: context.today,
                time_zone: context.time_zone.name().to_owned(),
                candidates: Vec::new(),
            },
            current: None,
        }
    }

    pub fn build(self) -> MatchDetails {
        self.details
    }
}

impl EvalVisitor for MatchDetailsBuilder {
    fn on_malformed(&mut self, comparison: &Comparison, reason: MalformedComparison) {
        LogMalformed.on_malformed(comparison, reason);
        if let Some(current) = &mut self.current {
            current.malformed_comparisons.push(MalformedComparisonDetails {
                key_path: comparison.key_path().to_owned(),
                operator: comparison.operator(),
                reason,
            });
        }
    }
}

impl MatchVisitor for MatchDetailsBuilder {
    fn on_candidate(&mut self, campaign: &Campaign) {
        self.current = Some(CandidateDetails {
            campaign_id: campaign.id().to_owned(),
            outcome: MatchOutcome::Matched,
            schedule_error: None,
            malformed_comparisons: Vec::new(),
        });
    }

    fn on_schedule_error(&mut self, error: &ScheduleError) {
        if let Some(current) = &mut self.current {
            current.schedule_error = Some(error.to_string());
        }
    }

    fn on_outcome(&mut self, _campaign: &Campaign, outcome: MatchOutcome) {
        if let Some(mut current) = self.current.take() {
            current.outcome = outcome;
            self.details.candidates.push(current);
        }
    }
}

impl fmt::Display for MatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MatchOutcome::Matched => "matched",
            MatchOutcome::ScheduleNotActive => "schedule not active",
            MatchOutcome::ScheduleUnresolvable => "schedule unresolvable",
            MatchOutcome::DeviceSegmentMismatch => "device segment mismatch",
            MatchOutcome::EventAttributesMismatch => "event attributes mismatch",
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use crate::{
        campaign::Campaign,
        predicate::{Comparison, ComparisonOperator, EvalVisitor, MalformedComparison, Modifier},
        trigger::{EventTrigger, FilterContext},
        DeviceSnapshot, Event,
    };

    use super::{MatchDetailsBuilder, MatchOutcome, MatchVisitor};

    #[test]
    fn serializes_report() {
        let event = Event::new("Purchase").with_namespace("shop");
        let device = DeviceSnapshot::new();
        let context = FilterContext {
            event: &event,
            device: &device,
            today: Utc.with_ymd_and_hms(2024, 6, 4, 12, 0, 0).unwrap(),
            time_zone: chrono_tz::Europe::Paris,
        };
        let campaign = Campaign::new("bounded", EventTrigger::new("Purchase", None));
        let comparison = Comparison::new(
            "amount",
            Modifier::Direct,
            ComparisonOperator::Between,
            vec![1.0, 2.0, 3.0],
        )
        .unwrap();

        let mut builder = MatchDetailsBuilder::new(&context);
        builder.on_candidate(&campaign);
        builder.on_malformed(&comparison, MalformedComparison::BetweenArity { found: 3 });
        builder.on_outcome(&campaign, MatchOutcome::EventAttributesMismatch);

        assert_eq!(
            serde_json::to_value(builder.build()).unwrap(),
            json!({
                "eventName": "Purchase",
                "eventNamespace": "shop",
                "timestamp": "2024-06-04T12:00:00Z",
                "timeZone": "Europe/Paris",
                "candidates": [{
                    "campaignId": "bounded",
                    "outcome": "eventAttributesMismatch",
                    "malformedComparisons": [{
                        "keyPath": "amount",
                        "operator": "between",
                        "reason": "betweenArity",
                        "found": 3
                    }]
                }]
            })
        );
    }
}
