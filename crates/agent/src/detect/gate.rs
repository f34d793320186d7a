//! Condition gate.
//!
//! An external validator decides whether detection should run at this
//! instant (schedules, external triggers). Detection is disabled only when
//! the validator answers inactive *and* supplies a reason; every other
//! combination proceeds. The polarity is intentional and pending product
//! review (see DESIGN.md).

use chrono::{DateTime, Datelike, Timelike, Utc};
use chrono_tz::Tz;
use tracing::debug;

use crate::config::Config;

/// Validator answer: an activity flag plus an optional explanation.
#[derive(Debug, Default)]
pub struct Verdict {
    pub active: bool,
    pub reason: Option<String>,
}

impl Verdict {
    pub fn active() -> Self {
        Self {
            active: true,
            reason: None,
        }
    }

    pub fn inactive(reason: impl Into<String>) -> Self {
        Self {
            active: false,
            reason: Some(reason.into()),
        }
    }
}

/// External predicate consulted once per frame with the local wall clock.
pub trait ConditionValidator: Send {
    fn validate(&self, now: DateTime<Tz>, config: &Config) -> Verdict;
}

/// Thin wrapper applying the gate polarity and logging skipped frames.
pub struct ConditionGate {
    validator: Box<dyn ConditionValidator>,
    tz: Tz,
}

impl ConditionGate {
    pub fn new(validator: Box<dyn ConditionValidator>, tz: Tz) -> Self {
        Self { validator, tz }
    }

    /// Whether detection runs for the current frame.
    pub fn is_active(&self, config: &Config) -> bool {
        let now = Utc::now().with_timezone(&self.tz);
        self.decide(self.validator.validate(now, config))
    }

    fn decide(&self, verdict: Verdict) -> bool {
        match verdict {
            Verdict {
                active: false,
                reason: Some(reason),
            } => {
                debug!("detection disabled: {reason}");
                false
            }
            _ => true,
        }
    }
}

/// Default validator honouring the configured weekly timetable.
///
/// With no timetable configured, detection is always active. Otherwise the
/// current time of day (in the agent's timezone) must fall inside one of the
/// weekday's intervals.
pub struct ScheduleValidator;

impl ConditionValidator for ScheduleValidator {
    fn validate(&self, now: DateTime<Tz>, config: &Config) -> Verdict {
        let Some(timetable) = config.timetable.as_ref().filter(|t| !t.is_empty()) else {
            return Verdict::active();
        };

        let weekday = now.weekday().num_days_from_sunday() as usize;
        let Some(window) = timetable.get(weekday) else {
            return Verdict::inactive(format!("no timetable entry for weekday {weekday}"));
        };

        let seconds = now.num_seconds_from_midnight();
        if window.contains(seconds) {
            Verdict::active()
        } else {
            Verdict::inactive("time of day outside the configured timetable")
        }
    }
}
