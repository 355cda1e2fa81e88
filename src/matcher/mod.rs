//! Matching events against the campaign cache.
mod details;

use std::sync::Arc;

use chrono::Utc;
use chrono_tz::Tz;

use crate::{
    campaign::Campaign,
    date_time::ScheduleError,
    predicate::EvalVisitor,
    repository::{CampaignRepository, PreFilter},
    trigger::{FilterContext, LogMalformed},
    DeviceSnapshot, Event, Result, Timestamp,
};

pub use details::{CandidateDetails, MalformedComparisonDetails, MatchDetails, MatchOutcome};

use details::MatchDetailsBuilder;

/// Configuration for [`CampaignMatcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatcherConfig {
    pub(crate) time_zone: Tz,
}

impl MatcherConfig {
    /// Create a configuration using the device zone.
    ///
    /// The device zone is the operating system's IANA zone. When it cannot be determined, the
    /// `TZ` environment variable is used, then UTC.
    pub fn new() -> Self {
        MatcherConfig {
            time_zone: device_time_zone(),
        }
    }

    /// Override the zone in which days, times of day and zone-less schedule bounds are evaluated.
    ///
    /// ```
    /// # use campaign_engine::MatcherConfig;
    /// let config = MatcherConfig::new().time_zone(chrono_tz::Europe::Paris);
    /// ```
    pub fn time_zone(mut self, time_zone: Tz) -> Self {
        self.time_zone = time_zone;
        self
    }

    /// Create a [`CampaignMatcher`] over `repository` using this configuration.
    pub fn to_matcher<R: CampaignRepository>(self, repository: R) -> CampaignMatcher<R> {
        CampaignMatcher::new(repository, self)
    }
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn device_time_zone() -> Tz {
    device_time_zone_from(
        || iana_time_zone::get_timezone().ok(),
        || std::env::var("TZ").ok(),
    )
}

/// Pick the first known zone among the operating system zone and the `TZ` variable.
fn device_time_zone_from(
    system: impl FnOnce() -> Option<String>,
    env: impl FnOnce() -> Option<String>,
) -> Tz {
    let parse = |name: &str, source: &str| {
        let name = name.trim_start_matches(':');
        let parsed = name.parse::<Tz>();
        if parsed.is_err() {
            log::warn!(target: "campaign_engine", time_zone = name, source = source;
                "unknown device time zone");
        }
        parsed.ok()
    };

    system()
        .and_then(|name| parse(&name, "system"))
        .or_else(|| env().and_then(|name| parse(&name, "TZ")))
        .unwrap_or(Tz::UTC)
}

/// Decides which cached campaigns fire for an event.
///
/// The matcher is stateless: each call asks the repository for pre-filtered candidates, then
/// applies, in order, the scheduled window, the device segment and the event attribute
/// predicate. A candidate is dropped at its first failing stage. Surviving campaigns are returned
/// in repository order.
///
/// ```
/// # use campaign_engine::{
/// #     Campaign, CampaignMatcher, DeviceSnapshot, Event, EventTrigger,
/// #     InMemoryCampaignRepository, MatcherConfig,
/// # };
/// let repository = InMemoryCampaignRepository::with_campaigns([Campaign::new(
///     "welcome",
///     EventTrigger::new("AppOpen", None),
/// )]);
/// let matcher = MatcherConfig::new().to_matcher(repository);
///
/// let matched = matcher.match_event(&Event::new("AppOpen"), &DeviceSnapshot::new())?;
/// assert_eq!(matched[0].id(), "welcome");
/// # Ok::<(), campaign_engine::Error>(())
/// ```
pub struct CampaignMatcher<R> {
    repository: R,
    config: MatcherConfig,
}

/// Matched campaigns together with a report of how every candidate was evaluated.
#[derive(Debug, Clone)]
pub struct MatchResultWithDetails {
    /// Campaigns that matched, in repository order.
    pub campaigns: Vec<Arc<Campaign>>,
    #[allow(missing_docs)]
    pub details: MatchDetails,
}

/// Observes the matcher pipeline.
pub(crate) trait MatchVisitor: EvalVisitor {
    #[allow(unused_variables)]
    fn on_candidate(&mut self, campaign: &Campaign) {}

    #[allow(unused_variables)]
    fn on_schedule_error(&mut self, error: &ScheduleError) {}

    #[allow(unused_variables)]
    fn on_outcome(&mut self, campaign: &Campaign, outcome: MatchOutcome) {}
}

impl MatchVisitor for LogMalformed {}

impl<R: CampaignRepository> CampaignMatcher<R> {
    #[allow(missing_docs)]
    pub fn new(repository: R, config: MatcherConfig) -> Self {
        CampaignMatcher { repository, config }
    }

    /// Zone used by [`match_event`](Self::match_event).
    pub fn time_zone(&self) -> Tz {
        self.config.time_zone
    }

    #[allow(missing_docs)]
    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Match `event` now, in the configured zone.
    ///
    /// Fails only if the repository fails.
    pub fn match_event(
        &self,
        event: &Event,
        device: &DeviceSnapshot,
    ) -> Result<Vec<Arc<Campaign>>> {
        self.match_event_at(event, device, Utc::now(), self.config.time_zone)
    }

    /// Match `event` as of `today`, computing days and times of day in `time_zone`.
    pub fn match_event_at(
        &self,
        event: &Event,
        device: &DeviceSnapshot,
        today: Timestamp,
        time_zone: Tz,
    ) -> Result<Vec<Arc<Campaign>>> {
        let context = FilterContext {
            event,
            device,
            today,
            time_zone,
        };
        self.run(&context, &mut LogMalformed)
    }

    /// Like [`match_event_at`](Self::match_event_at), but also reports the outcome of every
    /// candidate returned by the repository.
    pub fn match_event_details(
        &self,
        event: &Event,
        device: &DeviceSnapshot,
        today: Timestamp,
        time_zone: Tz,
    ) -> Result<MatchResultWithDetails> {
        let context = FilterContext {
            event,
            device,
            today,
            time_zone,
        };
        let mut builder = MatchDetailsBuilder::new(&context);
        let campaigns = self.run(&context, &mut builder)?;
        Ok(MatchResultWithDetails {
            campaigns,
            details: builder.build(),
        })
    }

    fn run<V: MatchVisitor>(
        &self,
        context: &FilterContext<'_>,
        visitor: &mut V,
    ) -> Result<Vec<Arc<Campaign>>> {
        let query = PreFilter::for_event(context.event, context.today, context.time_zone);
        let candidates = self.repository.pre_filter(&query).map_err(|err| {
            log::warn!(target: "campaign_engine", event_name = context.event.name.as_str();
                "campaign repository failed: {err}");
            err
        })?;

        let mut matched = Vec::with_capacity(candidates.len());
        for campaign in candidates {
            visitor.on_candidate(&campaign);
            let outcome = evaluate_candidate(&campaign, context, visitor);
            visitor.on_outcome(&campaign, outcome);
            if outcome == MatchOutcome::Matched {
                matched.push(campaign);
            } else {
                log::trace!(target: "campaign_engine",
                    campaign_id = campaign.id(), outcome:display = outcome;
                    "campaign did not match");
            }
        }

        log::trace!(target: "campaign_engine",
            event_name = context.event.name.as_str(), matched = matched.len();
            "matched campaigns");
        Ok(matched)
    }
}

fn evaluate_candidate<V: MatchVisitor>(
    campaign: &Campaign,
    context: &FilterContext<'_>,
    visitor: &mut V,
) -> MatchOutcome {
    let trigger = campaign.trigger();

    if let Some(schedule) = trigger.scheduled_filter() {
        match schedule.check(context.today, context.time_zone) {
            Ok(true) => {}
            Ok(false) => return MatchOutcome::ScheduleNotActive,
            Err(err) => {
                log::warn!(target: "campaign_engine", campaign_id = campaign.id();
                    "scheduled filter cannot be resolved: {err}");
                visitor.on_schedule_error(&err);
                return MatchOutcome::ScheduleUnresolvable;
            }
        }
    }

    if let Some(segment) = campaign.device_segment() {
        if !segment.evaluate_with_visitor(context.device.attributes(), visitor) {
            return MatchOutcome::DeviceSegmentMismatch;
        }
    }

    if let Some(filter) = trigger.event_attributes_filter() {
        if !filter.matches_with_visitor(context.event, visitor) {
            return MatchOutcome::EventAttributesMismatch;
        }
    }

    MatchOutcome::Matched
}
