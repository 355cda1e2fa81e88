use chrono::{Datelike, Timelike, Weekday};
use chrono_tz::Tz;

use crate::{
    date_time::ScheduleError,
    predicate::{Comparison, EvalVisitor, MalformedComparison, NoopEvalVisitor},
    Event, Timestamp,
};

use super::{
    DayOfWeekFilter, EventAttributesFilter, EventTrigger, FilterContext, ScheduledFilter,
    TimeOfDayFilter, TriggerFilter,
};

/// Day of the week of `today` in `tz`.
pub(crate) fn local_weekday(today: Timestamp, tz: Tz) -> Weekday {
    today.with_timezone(&tz).weekday()
}

/// Wall-clock seconds elapsed since local midnight of `today` in `tz`.
pub(crate) fn seconds_since_midnight(today: Timestamp, tz: Tz) -> i64 {
    i64::from(today.with_timezone(&tz).num_seconds_from_midnight())
}

impl EventTrigger {
    /// Return `true` if the event identity matches and the first filter of each kind accepts
    /// `context`.
    ///
    /// This evaluates the whole trigger directly. The matcher splits the same work between the
    /// repository pre-filter and its own pipeline.
    pub fn matches(&self, context: &FilterContext<'_>) -> bool {
        let (today, tz) = (context.today, context.time_zone);
        self.matches_event(context.event)
            && self.day_of_week_filter().map_or(true, |f| f.matches_at(today, tz))
            && self.time_of_day_filter().map_or(true, |f| f.matches_at(today, tz))
            && self.scheduled_filter().map_or(true, |f| f.matches_at(today, tz))
            && self.event_attributes_filter().map_or(true, |f| {
                f.matches_with_visitor(context.event, &mut LogMalformed)
            })
    }

    /// Return `true` if the event name and namespace equal the trigger's.
    pub fn matches_event(&self, event: &Event) -> bool {
        self.event_name == event.name && self.event_namespace == event.namespace
    }
}

impl TriggerFilter {
    /// Evaluate the filter, logging malformed comparisons.
    pub fn matches(&self, context: &FilterContext<'_>) -> bool {
        self.matches_with_visitor(context, &mut LogMalformed)
    }

    /// Evaluate the filter, reporting malformed comparisons to `visitor`.
    pub fn matches_with_visitor<V: EvalVisitor>(
        &self,
        context: &FilterContext<'_>,
        visitor: &mut V,
    ) -> bool {
        match self {
            TriggerFilter::DayOfWeek(filter) => filter.matches_at(context.today, context.time_zone),
            TriggerFilter::TimeOfDay(filter) => filter.matches_at(context.today, context.time_zone),
            TriggerFilter::Scheduled(filter) => filter.matches_at(context.today, context.time_zone),
            TriggerFilter::EventAttributes(filter) => {
                filter.matches_with_visitor(context.event, visitor)
            }
        }
    }
}

impl DayOfWeekFilter {
    /// Whether `weekday` is enabled.
    pub fn includes(&self, weekday: Weekday) -> bool {
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

    #[allow(missing_docs)]
    pub fn matches_at(&self, today: Timestamp, tz: Tz) -> bool {
        self.includes(local_weekday(today, tz))
    }
}

impl TimeOfDayFilter {
    /// Whether `seconds` since local midnight fall in `[start_time, end_time)`.
    pub fn contains(&self, seconds: i64) -> bool {
        self.start_time <= seconds && seconds < self.end_time
    }

    #[allow(missing_docs)]
    pub fn matches_at(&self, today: Timestamp, tz: Tz) -> bool {
        self.contains(seconds_since_midnight(today, tz))
    }
}

impl ScheduledFilter {
    /// Check whether `today` lies strictly after the start and strictly before the end.
    ///
    /// Bounds without their own zone are interpreted in `tz`. An absent bound imposes no
    /// constraint. A bound that cannot be resolved is an error.
    pub fn check(&self, today: Timestamp, tz: Tz) -> Result<bool, ScheduleError> {
        if let Some(start) = &self.start {
            if today <= start.try_resolve(tz)? {
                return Ok(false);
            }
        }
        if let Some(end) = &self.end {
            if today >= end.try_resolve(tz)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Like [`check`](Self::check), but an unresolvable bound is logged and fails closed.
    pub fn matches_at(&self, today: Timestamp, tz: Tz) -> bool {
        self.check(today, tz).unwrap_or_else(|err| {
            log::warn!(target: "campaign_engine", time_zone:display = tz;
                "scheduled filter cannot be resolved: {err}");
            false
        })
    }
}

impl EventAttributesFilter {
    /// Evaluate the predicate over the event attributes.
    pub fn matches(&self, event: &Event) -> bool {
        self.matches_with_visitor(event, &mut NoopEvalVisitor)
    }

    #[allow(missing_docs)]
    pub fn matches_with_visitor<V: EvalVisitor>(&self, event: &Event, visitor: &mut V) -> bool {
        self.predicate.evaluate_with_visitor(&event.attributes, visitor)
    }
}

/// Logs malformed comparisons as warnings.
pub(crate) struct LogMalformed;

impl EvalVisitor for LogMalformed {
    fn on_malformed(&mut self, comparison: &Comparison, reason: MalformedComparison) {
        log::warn!(target: "campaign_engine",
            key_path = comparison.key_path(), operator:debug = comparison.operator();
            "malformed comparison evaluated to false: {reason}");
    }
}
