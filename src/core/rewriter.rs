use crate::core::expander::ScheduleExpander;
use crate::domain::model::{ExpandedEvent, RewriteOutcome};
use crate::utils::error::Result;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use icalendar::{
    Calendar, CalendarComponent, CalendarDateTime, Component, DatePerhapsTime, EventLike,
};
use serde::{Deserialize, Serialize};

const DAY_TITLE_PREFIX: &str = "Day";

/// What to do with a "Day ..." event whose title has no rotation entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnmatchedDayPolicy {
    /// Remove the source event and add nothing.
    #[default]
    Drop,
    /// Leave the source event where it was.
    Keep,
}

impl std::str::FromStr for UnmatchedDayPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "drop" => Ok(UnmatchedDayPolicy::Drop),
            "keep" => Ok(UnmatchedDayPolicy::Keep),
            other => Err(format!("unknown unmatched-day policy '{}'", other)),
        }
    }
}

/// How a top-level component of the source feed is treated.
#[derive(Debug, Clone, PartialEq, Eq)]
enum FeedEntry {
    PassThrough,
    DayCandidate { day_id: String, date: NaiveDate },
}

impl FeedEntry {
    fn classify(component: &CalendarComponent, current_year: i32) -> Self {
        let CalendarComponent::Event(event) = component else {
            return FeedEntry::PassThrough;
        };
        let (Some(title), Some(start)) = (event.get_summary(), event.get_start()) else {
            return FeedEntry::PassThrough;
        };
        let date = local_date(&start);
        let in_range = date.year() == current_year || date.year() == current_year + 1;

        if in_range && title.starts_with(DAY_TITLE_PREFIX) {
            FeedEntry::DayCandidate {
                day_id: title.to_string(),
                date,
            }
        } else {
            FeedEntry::PassThrough
        }
    }
}

/// Calendar date the event starts on. Date-only and floating values are read
/// as civil-local; zoned and UTC values keep their own calendar date.
fn local_date(start: &DatePerhapsTime) -> NaiveDate {
    match start {
        DatePerhapsTime::Date(date) => *date,
        DatePerhapsTime::DateTime(CalendarDateTime::Floating(naive)) => naive.date(),
        DatePerhapsTime::DateTime(CalendarDateTime::Utc(instant)) => instant.date_naive(),
        DatePerhapsTime::DateTime(CalendarDateTime::WithTimezone { date_time, .. }) => {
            date_time.date()
        }
    }
}

enum Planned {
    Keep,
    Replace(Vec<ExpandedEvent>),
}

/// Replaces placeholder "Day N" events with their detailed schedules.
#[derive(Debug, Clone, Default)]
pub struct FeedRewriter {
    expander: ScheduleExpander,
    unmatched_day: UnmatchedDayPolicy,
}

impl FeedRewriter {
    pub fn new(expander: ScheduleExpander, unmatched_day: UnmatchedDayPolicy) -> Self {
        Self {
            expander,
            unmatched_day,
        }
    }

    pub fn expander(&self) -> &ScheduleExpander {
        &self.expander
    }

    pub fn rewrite(&self, source: &Calendar) -> Result<RewriteOutcome> {
        let generated_at = Utc::now();
        let current_year = generated_at
            .with_timezone(&self.expander.timezone())
            .year();
        self.rewrite_for_year(source, current_year, generated_at)
    }

    /// Kept events stay in their original relative order; expansions are
    /// appended after them in source order.
    pub fn rewrite_for_year(
        &self,
        source: &Calendar,
        current_year: i32,
        generated_at: DateTime<Utc>,
    ) -> Result<RewriteOutcome> {
        tracing::info!(
            "Processing events for years: {} and {}",
            current_year,
            current_year + 1
        );

        // 第一階段：分類並計算展開結果
        let mut plan = Vec::with_capacity(source.components.len());
        let mut unmatched_days = Vec::new();
        for component in &source.components {
            let planned = match FeedEntry::classify(component, current_year) {
                FeedEntry::PassThrough => Planned::Keep,
                FeedEntry::DayCandidate { day_id, date } => {
                    let expanded = self.expander.expand_at(&day_id, date, generated_at)?;
                    if expanded.is_empty() {
                        tracing::warn!(
                            "⚠️ No rotation entry for '{}' on {} (policy: {:?})",
                            day_id,
                            date,
                            self.unmatched_day
                        );
                        unmatched_days.push(day_id);
                        match self.unmatched_day {
                            UnmatchedDayPolicy::Drop => Planned::Replace(Vec::new()),
                            UnmatchedDayPolicy::Keep => Planned::Keep,
                        }
                    } else {
                        Planned::Replace(expanded)
                    }
                }
            };
            plan.push(planned);
        }

        // 第二階段：建立新的元件列表
        let mut kept = Vec::with_capacity(source.components.len());
        let mut additions = Vec::new();
        let mut events_replaced = 0;
        for (component, planned) in source.components.iter().zip(plan) {
            match planned {
                Planned::Keep => kept.push(component.clone()),
                Planned::Replace(events) => {
                    events_replaced += 1;
                    additions.extend(events);
                }
            }
        }

        let events_added = additions.len();
        kept.extend(
            additions
                .iter()
                .map(|event| CalendarComponent::Event(event.to_ical_event())),
        );

        let mut calendar = source.clone();
        calendar.components = kept;

        tracing::info!(
            events_replaced,
            events_added,
            "Updated calendar: replaced {} events, added {} detailed events",
            events_replaced,
            events_added
        );

        Ok(RewriteOutcome {
            calendar,
            events_replaced,
            events_added,
            unmatched_days,
        })
    }
}
