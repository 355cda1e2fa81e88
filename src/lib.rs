//! Matching engine for automated marketing campaigns.
//!
//! # Overview
//!
//! Campaigns are locally cached marketing rules. Each one has an [`EventTrigger`] naming the
//! event it reacts to, optional [trigger filters](TriggerFilter) and an optional device segment
//! [`Predicate`]. When the host application emits an [`Event`], a [`CampaignMatcher`] decides
//! which campaigns should fire given the event and the current [`DeviceSnapshot`].
//!
//! Matching runs in two phases. A [`CampaignRepository`] first answers an indexable pre-filter
//! (event identity, day of week and time of day). The matcher then applies the filters that need
//! whole objects, in order: scheduled window, device segment, event attributes.
//!
//! [`InMemoryCampaignRepository`] is a ready-to-use repository; other stores implement
//! [`CampaignRepository`] and translate the pre-filter truth table into their own query language
//! (see [`IndexedTrigger`]).
//!
//! # Error Handling
//!
//! Evaluation never fails. Missing attributes, malformed comparisons and unresolvable schedule
//! bounds make the affected campaign not match. Errors are represented by the [`Error`] enum and
//! are only returned by the repository call and by campaign decoding.
//!
//! # Logging
//!
//! The package uses the [`log`](https://docs.rs/log/latest/log/) crate for logging
//! messages, under the `campaign_engine` target. Data-integrity problems are logged as warnings.
//! Consider integrating a `log`-compatible logger implementation for better visibility into
//! matching.

#![warn(rustdoc::missing_crate_level_docs)]
#![warn(missing_docs)]

mod attributes;
mod campaign;
mod date_time;
mod error;
mod event;
mod matcher;
mod repository;
mod trigger;
mod value;

pub mod predicate;

pub use attributes::{AttributeValue, Attributes};
pub use campaign::{Campaign, CampaignSet, FrequencyLimit, TryParse};
pub use date_time::{DateTimeComponents, ScheduleError};
pub use error::{Error, Result};
pub use event::{DeviceSnapshot, Event};
pub use matcher::{
    CampaignMatcher, CandidateDetails, MalformedComparisonDetails, MatchDetails, MatchOutcome,
    MatchResultWithDetails, MatcherConfig,
};
pub use predicate::Predicate;
pub use repository::{CampaignRepository, InMemoryCampaignRepository, IndexedTrigger, PreFilter};
pub use trigger::{
    DayOfWeekFilter, EventAttributesFilter, EventTrigger, FilterContext, ScheduledFilter,
    TimeOfDayFilter, TriggerFilter,
};
pub use value::{Array, OperandShape, Timestamp, Value, ValueKind};
