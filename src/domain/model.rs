use chrono::{DateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use icalendar::{CalendarDateTime, Component, DatePerhapsTime, EventLike};
use serde::{Deserialize, Serialize};

const CLASS_PERIOD_PREFIX: &str = "Period";

/// What a slot label denotes, decided once when the slot is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    /// Homeroom, Break, Lunch and the like; always titled by its label.
    Marker,
    /// A class period whose title comes from the rotation entry.
    ClassPeriod,
}

impl SlotKind {
    pub fn classify(label: &str) -> Self {
        if label.starts_with(CLASS_PERIOD_PREFIX) {
            SlotKind::ClassPeriod
        } else {
            SlotKind::Marker
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodSlot {
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub label: String,
    pub kind: SlotKind,
}

impl PeriodSlot {
    pub fn new(start: NaiveTime, end: NaiveTime, label: impl Into<String>) -> Self {
        let label = label.into();
        let kind = SlotKind::classify(&label);
        Self {
            start,
            end,
            label,
            kind,
        }
    }

    pub fn is_class_period(&self) -> bool {
        self.kind == SlotKind::ClassPeriod
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeTableVariant {
    Regular,
    Reduced,
}

/// One concrete event produced by expanding a day.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandedEvent {
    pub title: String,
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
    pub uid: String,
    pub created_at: DateTime<Utc>,
}

impl ExpandedEvent {
    /// Builds the VEVENT, keeping wall-clock times qualified by the zone's TZID.
    pub fn to_ical_event(&self) -> icalendar::Event {
        icalendar::Event::new()
            .uid(&self.uid)
            .summary(&self.title)
            .starts(zoned(&self.start))
            .ends(zoned(&self.end))
            .timestamp(self.created_at)
            .done()
    }
}

fn zoned(instant: &DateTime<Tz>) -> DatePerhapsTime {
    DatePerhapsTime::DateTime(CalendarDateTime::WithTimezone {
        date_time: instant.naive_local(),
        tzid: instant.timezone().name().to_string(),
    })
}

/// Result of rewriting a source calendar.
#[derive(Debug, Clone)]
pub struct RewriteOutcome {
    pub calendar: icalendar::Calendar,
    pub events_replaced: usize,
    pub events_added: usize,
    /// Day titles that started with "Day" but had no rotation entry.
    pub unmatched_days: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishReport {
    pub history_key: String,
    pub latest_key: String,
    pub bytes_written: usize,
    pub webcal_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub events_replaced: usize,
    pub events_added: usize,
    pub unmatched_days: Vec<String>,
    pub publish: PublishReport,
}

impl RunReport {
    pub fn to_json(&self) -> crate::utils::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_slot_classification() {
        let t = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap();
        assert!(PeriodSlot::new(t(8, 15), t(8, 55), "Period 1A").is_class_period());
        assert!(!PeriodSlot::new(t(8, 0), t(8, 10), "Homeroom").is_class_period());
        assert_eq!(SlotKind::classify("Professional Development"), SlotKind::Marker);
        // prefix match is case-sensitive
        assert_eq!(SlotKind::classify("period 2"), SlotKind::Marker);
    }

    #[test]
    fn test_to_ical_event_uses_tzid() {
        let tz = chrono_tz::Asia::Shanghai;
        let start = tz.with_ymd_and_hms(2024, 9, 2, 8, 15, 0).unwrap();
        let event = ExpandedEvent {
            title: "Theatre 7 (ART073.103)".to_string(),
            start,
            end: start + chrono::Duration::minutes(40),
            uid: "abc@yourdomain.com".to_string(),
            created_at: Utc::now(),
        };

        let ical = event.to_ical_event();
        assert_eq!(ical.get_summary(), Some("Theatre 7 (ART073.103)"));
        assert_eq!(ical.get_uid(), Some("abc@yourdomain.com"));
        match ical.get_start() {
            Some(DatePerhapsTime::DateTime(CalendarDateTime::WithTimezone { date_time, tzid })) => {
                assert_eq!(tzid, "Asia/Shanghai");
                assert_eq!(date_time, start.naive_local());
            }
            other => panic!("unexpected DTSTART: {:?}", other),
        }
    }

    #[test]
    fn test_run_report_json() {
        let report = RunReport {
            events_replaced: 2,
            events_added: 24,
            unmatched_days: vec![],
            publish: PublishReport {
                history_key: "history/generated_calendar_20240902_070000.ics".to_string(),
                latest_key: "generated_calendar.ics".to_string(),
                bytes_written: 1024,
                webcal_url: None,
            },
        };

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["events_added"], 24);
        assert_eq!(json["publish"]["latest_key"], "generated_calendar.ics");
        assert!(json["publish"]["webcal_url"].is_null());
    }
}
