//! The campaign repository: the only storage the matcher talks to.
//!
//! A repository answers the *pre-filter* query: campaigns whose trigger names the event and whose
//! day-of-week and time-of-day filters are either absent or satisfied. Those two filter kinds are
//! flattened into plain columns ([`IndexedTrigger`]) so that a store can evaluate them without
//! loading whole campaigns. For each column group the truth table is "no constraint OR literal
//! match", the same as evaluating the filters directly.
use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use chrono::Weekday;
use chrono_tz::Tz;

use crate::{
    campaign::Campaign,
    trigger::{local_weekday, seconds_since_midnight, EventTrigger},
    Event, Result, Timestamp,
};

/// Source of candidate campaigns for an event.
///
/// Implementations must be safe to call concurrently. The call may block; the matcher performs no
/// retries and propagates failures to its caller.
pub trait CampaignRepository {
    /// Return campaigns satisfying `query`, in the order the matcher should report them.
    fn pre_filter(&self, query: &PreFilter<'_>) -> Result<Vec<Arc<Campaign>>>;
}

impl<R: CampaignRepository + ?Sized> CampaignRepository for &R {
    fn pre_filter(&self, query: &PreFilter<'_>) -> Result<Vec<Arc<Campaign>>> {
        (**self).pre_filter(query)
    }
}

impl<R: CampaignRepository + ?Sized> CampaignRepository for Arc<R> {
    fn pre_filter(&self, query: &PreFilter<'_>) -> Result<Vec<Arc<Campaign>>> {
        (**self).pre_filter(query)
    }
}

/// The indexable part of a match request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreFilter<'a> {
    #[allow(missing_docs)]
    pub event_name: &'a str,
    #[allow(missing_docs)]
    pub event_namespace: Option<&'a str>,
    /// The instant the match is evaluated at.
    pub today: Timestamp,
    /// Zone in which the day of week and time of day are computed.
    pub time_zone: Tz,
}

impl<'a> PreFilter<'a> {
    /// Build the query for `event`.
    pub fn for_event(event: &'a Event, today: Timestamp, time_zone: Tz) -> PreFilter<'a> {
        PreFilter {
            event_name: &event.name,
            event_namespace: event.namespace.as_deref(),
            today,
            time_zone,
        }
    }

    /// Day of the week of `today` in the query zone.
    pub fn weekday(&self) -> Weekday {
        local_weekday(self.today, self.time_zone)
    }

    /// Seconds since local midnight of `today` in the query zone.
    pub fn seconds_since_midnight(&self) -> i64 {
        seconds_since_midnight(self.today, self.time_zone)
    }
}

/// Trigger flattened into the columns the pre-filter runs on.
///
/// Filters that cannot be expressed as columns (scheduled windows and predicates) are left to the
/// matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct IndexedTrigger {
    pub event_name: String,
    pub event_namespace: Option<String>,
    pub has_day_of_week_filter: bool,
    pub monday: bool,
    pub tuesday: bool,
    pub wednesday: bool,
    pub thursday: bool,
    pub friday: bool,
    pub saturday: bool,
    pub sunday: bool,
    pub has_time_of_day_filter: bool,
    pub start_time: i64,
    pub end_time: i64,
}

impl IndexedTrigger {
    /// Flatten `trigger`. Only the first filter of each kind is indexed.
    pub fn new(trigger: &EventTrigger) -> IndexedTrigger {
        let days = trigger.day_of_week_filter().copied().unwrap_or_default();
        let time_of_day = trigger.time_of_day_filter();
        IndexedTrigger {
            event_name: trigger.event_name.clone(),
            event_namespace: trigger.event_namespace.clone(),
            has_day_of_week_filter: trigger.day_of_week_filter().is_some(),
            monday: days.monday,
            tuesday: days.tuesday,
            wednesday: days.wednesday,
            thursday: days.thursday,
            friday: days.friday,
            saturday: days.saturday,
            sunday: days.sunday,
            has_time_of_day_filter: time_of_day.is_some(),
            start_time: time_of_day.map_or(0, |f| f.start_time),
            end_time: time_of_day.map_or(0, |f| f.end_time),
        }
    }

    /// Evaluate the pre-filter truth table on the flattened columns.
    pub fn satisfies(&self, query: &PreFilter<'_>) -> bool {
        self.event_name == query.event_name
            && self.event_namespace.as_deref() == query.event_namespace
            && (!self.has_day_of_week_filter || self.day_column(query.weekday()))
            && (!self.has_time_of_day_filter || {
                let seconds = query.seconds_since_midnight();
                self.start_time <= seconds && seconds < self.end_time
            })
    }

    fn day_column(&self, weekday: Weekday) -> bool {
        match weekday {
            Weekday::Mon => self.monday,
            Weekday::Tue => self.tuesday,
            Weekday::Wed => self.wednesday,
            Weekday::Thu => self.thursday,
            Weekday::Fri => self.friday,
            Weekday::Sat => self.saturday,
            Weekday::Sun => self.sunday,
        }
    }
}

/// `InMemoryCampaignRepository` keeps the local campaign cache in memory and allows concurrent
/// access for readers and writers.
///
/// Campaigns are indexed by event name and namespace when they are set. The sync layer replaces
/// the whole set at once with [`set_campaigns`](Self::set_campaigns); in-flight queries keep
/// seeing the previous snapshot.
#[derive(Default)]
pub struct InMemoryCampaignRepository {
    snapshot: RwLock<Arc<Snapshot>>,
}

#[derive(Default)]
struct Snapshot {
    by_event: HashMap<EventKey, Vec<IndexedCampaign>>,
    len: usize,
}

type EventKey = (String, Option<String>);

struct IndexedCampaign {
    trigger: IndexedTrigger,
    campaign: Arc<Campaign>,
}

impl InMemoryCampaignRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a repository holding `campaigns`.
    pub fn with_campaigns(campaigns: impl IntoIterator<Item = Campaign>) -> Self {
        let repository = Self::new();
        repository.set_campaigns(campaigns);
        repository
    }

    /// Replace all campaigns. Order within the same event is preserved in query results.
    pub fn set_campaigns(&self, campaigns: impl IntoIterator<Item = Campaign>) {
        // Build the new snapshot before taking the lock to minimize lock span.
        let snapshot = Arc::new(Snapshot::new(campaigns));
        log::debug!(target: "campaign_engine", campaigns = snapshot.len;
            "replacing campaign snapshot");

        let mut slot = self
            .snapshot
            .write()
            .expect("thread holding campaign snapshot lock should not panic");
        *slot = snapshot;
    }

    /// Number of stored campaigns.
    pub fn len(&self) -> usize {
        self.current().len
    }

    #[allow(missing_docs)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn current(&self) -> Arc<Snapshot> {
        self.snapshot
            .read()
            .expect("thread holding campaign snapshot lock should not panic")
            .clone()
    }
}

impl Snapshot {
    fn new(campaigns: impl IntoIterator<Item = Campaign>) -> Snapshot {
        let mut by_event: HashMap<EventKey, Vec<IndexedCampaign>> = HashMap::new();
        let mut len = 0;
        for campaign in campaigns {
            let trigger = IndexedTrigger::new(campaign.trigger());
            let key = (trigger.event_name.clone(), trigger.event_namespace.clone());
            by_event.entry(key).or_default().push(IndexedCampaign {
                trigger,
                campaign: Arc::new(campaign),
            });
            len += 1;
        }
        Snapshot { by_event, len }
    }
}

impl CampaignRepository for InMemoryCampaignRepository {
    fn pre_filter(&self, query: &PreFilter<'_>) -> Result<Vec<Arc<Campaign>>> {
        let snapshot = self.current();
        let key = (
            query.event_name.to_owned(),
            query.event_namespace.map(str::to_owned),
        );
        let Some(candidates) = snapshot.by_event.get(&key) else {
            return Ok(Vec::new());
        };

        Ok(candidates
            .iter()
            .filter(|indexed| indexed.trigger.satisfies(query))
            .map(|indexed| indexed.campaign.clone())
            .collect())
    }
}
