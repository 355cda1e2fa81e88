//! Civil date/time points and their resolution to absolute instants.
use std::fmt;

use chrono::{
    LocalResult, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeDelta, TimeZone, Utc,
};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::Timestamp;

/// A civil-time point: a calendar date, an offset into that day and an optional zone.
///
/// It only becomes an absolute instant once a zone is known, see [`DateTimeComponents::resolve`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateTimeComponents {
    /// Calendar date formatted as `YYYY-MM-DD`.
    pub date: String,
    /// Wall-clock offset into the day, in seconds.
    #[serde(rename = "time")]
    pub seconds_past_midnight: i64,
    /// IANA zone name. When absent, the caller-supplied fallback zone is used.
    #[serde(default)]
    pub time_zone: Option<String>,
}

/// Reason a [`DateTimeComponents`] could not be resolved.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ScheduleError {
    /// The date is not a valid `YYYY-MM-DD` calendar date.
    #[error("invalid date {0:?}")]
    InvalidDate(String),
    /// The zone name is not a known IANA zone.
    #[error("unknown time zone {0:?}")]
    UnknownTimeZone(String),
    /// The offset moves the point outside the representable range.
    #[error("time {0} seconds past midnight is out of range")]
    OutOfRange(i64),
}

impl DateTimeComponents {
    /// Create components without their own zone.
    pub fn new(date: impl Into<String>, seconds_past_midnight: i64) -> Self {
        DateTimeComponents {
            date: date.into(),
            seconds_past_midnight,
            time_zone: None,
        }
    }

    /// Set the zone the components are expressed in.
    pub fn with_time_zone(mut self, time_zone: impl Into<String>) -> Self {
        self.time_zone = Some(time_zone.into());
        self
    }

    /// Resolve to an absolute instant, interpreting the date in the components' own zone or in
    /// `fallback` when none is set. Returns `None` if the components are invalid.
    pub fn resolve(&self, fallback: Tz) -> Option<Timestamp> {
        self.try_resolve(fallback).ok()
    }

    /// Like [`resolve`](Self::resolve), but reports why resolution failed.
    ///
    /// The offset is applied to the wall clock, not as an elapsed duration: `7200` always means
    /// 2:00 local time, whatever transitions happen earlier that day. Wall-clock times skipped by
    /// a forward transition resolve past the gap (2:30 on a spring-forward night becomes 3:30);
    /// times repeated by a backward transition resolve to their first occurrence.
    ///
    /// ```
    /// # use campaign_engine::DateTimeComponents;
    /// let start = DateTimeComponents::new("2024-03-10", 7200).with_time_zone("America/New_York");
    /// let instant = start.try_resolve(chrono_tz::UTC).unwrap();
    /// assert_eq!(instant.to_rfc3339(), "2024-03-10T07:00:00+00:00");
    /// ```
    pub fn try_resolve(&self, fallback: Tz) -> Result<Timestamp, ScheduleError> {
        let tz = match &self.time_zone {
            Some(name) => name
                .parse::<Tz>()
                .map_err(|_| ScheduleError::UnknownTimeZone(name.clone()))?,
            None => fallback,
        };

        let date = NaiveDate::parse_from_str(&self.date, "%Y-%m-%d")
            .map_err(|_| ScheduleError::InvalidDate(self.date.clone()))?;

        let local = TimeDelta::try_seconds(self.seconds_past_midnight)
            .and_then(|offset| date.and_hms_opt(0, 0, 0)?.checked_add_signed(offset))
            .ok_or(ScheduleError::OutOfRange(self.seconds_past_midnight))?;

        local_to_instant(tz, local).ok_or(ScheduleError::OutOfRange(self.seconds_past_midnight))
    }
}

fn local_to_instant(tz: Tz, local: NaiveDateTime) -> Option<Timestamp> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(instant) => Some(instant.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
        LocalResult::None => {
            // Skipped by a forward transition. Interpreting the wall clock with the offset in
            // effect before the gap lands the same distance past the transition.
            let before = tz
                .offset_from_utc_datetime(&local.checked_sub_signed(TimeDelta::days(1))?)
                .fix();
            let utc =
                local.checked_sub_signed(TimeDelta::seconds(before.local_minus_utc().into()))?;
            Some(Utc.from_utc_datetime(&utc))
        }
    }
}

impl fmt::Display for DateTimeComponents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let time = u32::try_from(self.seconds_past_midnight)
            .ok()
            .and_then(|seconds| NaiveTime::from_num_seconds_from_midnight_opt(seconds, 0));
        match time {
            Some(time) => write!(f, "{} {}", self.date, time.format("%H:%M:%S"))?,
            // Offsets outside the day are kept as-is.
            None => write!(f, "{} {:+}s", self.date, self.seconds_past_midnight)?,
        }
        if let Some(time_zone) = &self.time_zone {
            write!(f, " {time_zone}")?;
        }
        Ok(())
    }
}
