use crate::domain::model::ExpandedEvent;
use crate::domain::rotation::ClassRotationRegistry;
use crate::domain::timetable::TimeTableRegistry;
use crate::utils::error::{FeedError, Result};
use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UidStrategy {
    /// Fresh v4 UUID per event on every run.
    #[default]
    Random,
    /// v5 UUID derived from day, date and slot position; stable across runs.
    Deterministic,
}

impl std::str::FromStr for UidStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "random" => Ok(UidStrategy::Random),
            "deterministic" => Ok(UidStrategy::Deterministic),
            other => Err(format!("unknown uid strategy '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExpanderSettings {
    pub timezone: Tz,
    pub marker_time: NaiveTime,
    pub uid_strategy: UidStrategy,
    pub uid_domain: String,
}

impl Default for ExpanderSettings {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::Asia::Shanghai,
            marker_time: NaiveTime::from_hms_opt(7, 59, 0).unwrap_or(NaiveTime::MIN),
            uid_strategy: UidStrategy::Random,
            uid_domain: "yourdomain.com".to_string(),
        }
    }
}

/// Turns a rotation day on a date into concrete, localized events.
#[derive(Debug, Clone, Default)]
pub struct ScheduleExpander {
    timetable: TimeTableRegistry,
    rotation: ClassRotationRegistry,
    settings: ExpanderSettings,
}

impl ScheduleExpander {
    pub fn new(
        timetable: TimeTableRegistry,
        rotation: ClassRotationRegistry,
        settings: ExpanderSettings,
    ) -> Self {
        Self {
            timetable,
            rotation,
            settings,
        }
    }

    pub fn timetable(&self) -> &TimeTableRegistry {
        &self.timetable
    }

    pub fn timezone(&self) -> Tz {
        self.settings.timezone
    }

    pub fn expand(&self, day_id: &str, date: NaiveDate) -> Result<Vec<ExpandedEvent>> {
        self.expand_at(day_id, date, Utc::now())
    }

    /// Marker event first, then one event per slot in table order. Unknown
    /// day identifiers expand to nothing.
    pub fn expand_at(
        &self,
        day_id: &str,
        date: NaiveDate,
        generated_at: DateTime<Utc>,
    ) -> Result<Vec<ExpandedEvent>> {
        let Some(entry) = self.rotation.entry_for(day_id) else {
            tracing::info!("Day type '{}' not found in class rotation", day_id);
            return Ok(Vec::new());
        };

        let variant = self.timetable.variant_for(date);
        let slots = self.timetable.slots(variant);
        tracing::debug!(day_id, %date, ?variant, slots = slots.len(), "Expanding day");

        let mut events = Vec::with_capacity(slots.len() + 1);

        let marker_start = self.localize(date, self.settings.marker_time)?;
        events.push(ExpandedEvent {
            title: day_id.to_string(),
            start: marker_start,
            end: marker_start + Duration::minutes(1),
            uid: self.uid_for(day_id, date, 0),
            created_at: generated_at,
        });

        for (index, slot) in slots.iter().enumerate() {
            let start = self.localize(date, slot.start)?;
            let end = self.localize(date, slot.end)?;
            let title = entry.title_for(slot);
            tracing::debug!("Creating event: {} | Start: {} | End: {}", title, start, end);

            events.push(ExpandedEvent {
                title,
                start,
                end,
                uid: self.uid_for(day_id, date, index + 1),
                created_at: generated_at,
            });
        }

        Ok(events)
    }

    fn localize(&self, date: NaiveDate, time: NaiveTime) -> Result<DateTime<Tz>> {
        let tz = self.settings.timezone;
        match tz.from_local_datetime(&date.and_time(time)) {
            LocalResult::Single(instant) => Ok(instant),
            // fall-back hour: first occurrence
            LocalResult::Ambiguous(earliest, _) => Ok(earliest),
            LocalResult::None => Err(FeedError::LocalizationError {
                date,
                time,
                timezone: tz.name().to_string(),
            }),
        }
    }

    fn uid_for(&self, day_id: &str, date: NaiveDate, index: usize) -> String {
        let id = match self.settings.uid_strategy {
            UidStrategy::Random => Uuid::new_v4(),
            UidStrategy::Deterministic => {
                let name = format!("{}|{}|{}", day_id, date, index);
                Uuid::new_v5(&Uuid::NAMESPACE_URL, name.as_bytes())
            }
        };
        format!("{}@{}", id, self.settings.uid_domain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::TimeTableVariant;
    use chrono::Timelike;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn hhmm(event: &ExpandedEvent) -> String {
        format!("{:02}:{:02}", event.start.hour(), event.start.minute())
    }

    #[test]
    fn test_day3_regular_scenario() {
        let expander = ScheduleExpander::default();
        // Monday
        let events = expander.expand("Day 3", date(2024, 9, 2)).unwrap();

        let got: Vec<(String, &str)> = events
            .iter()
            .map(|e| (hhmm(e), e.title.as_str()))
            .collect();
        let expected = vec![
            ("07:59", "Day 3"),
            ("08:00", "Homeroom"),
            ("08:15", "Theatre 7 (ART073.103)"),
            ("08:55", "Theatre 7 (ART073.104)"),
            ("09:35", "Break"),
            ("09:55", "Period 2 - Free"),
            ("11:22", "Period 3A - Free"),
            ("12:10", "Lunch"),
            ("13:05", "Period 3B- Free"),
            ("13:55", "Period 4A - Free"),
            ("14:35", "Period 4B- Free"),
        ];
        let expected: Vec<(String, &str)> = expected
            .into_iter()
            .map(|(t, title)| (t.to_string(), title))
            .collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn test_day3_reduced_scenario_keeps_parallel_halves() {
        let expander = ScheduleExpander::default();
        // Wednesday
        let events = expander.expand("Day 3", date(2024, 9, 4)).unwrap();
        assert_eq!(events.len(), 13);

        let at_0815: Vec<&str> = events
            .iter()
            .filter(|e| hhmm(e) == "08:15")
            .map(|e| e.title.as_str())
            .collect();
        assert_eq!(at_0815, vec!["Theatre 7 (ART073.103)", "Theatre 7 (ART073.104)"]);
        assert_eq!(events.last().unwrap().title, "Professional Development");
    }

    #[test]
    fn test_event_count_matches_variant_for_every_weekday() {
        let expander = ScheduleExpander::default();
        let mut day = date(2025, 1, 1);
        for _ in 0..14 {
            let expected = 1 + expander.timetable().slots_for(day).len();
            for day_id in ["Day 1", "Day 4", "Day 6"] {
                let events = expander.expand(day_id, day).unwrap();
                assert_eq!(events.len(), expected);
                assert_eq!(events[0].title, day_id);
            }
            day = day.succ_opt().unwrap();
        }
    }

    #[test]
    fn test_marker_is_one_minute_at_0759_local() {
        let expander = ScheduleExpander::default();
        let events = expander.expand("Day 1", date(2024, 9, 2)).unwrap();
        let marker = &events[0];

        assert_eq!(hhmm(marker), "07:59");
        assert_eq!(marker.end - marker.start, Duration::minutes(1));
        assert_eq!(marker.start.timezone(), chrono_tz::Asia::Shanghai);
        // Shanghai is UTC+8 year round
        assert_eq!(marker.start.with_timezone(&Utc).hour(), 23);
    }

    #[test]
    fn test_every_event_ends_after_it_starts() {
        let expander = ScheduleExpander::default();
        for d in [date(2024, 9, 2), date(2024, 9, 4)] {
            for event in expander.expand("Day 2", d).unwrap() {
                assert!(event.end > event.start, "{}", event.title);
            }
        }
    }

    #[test]
    fn test_unknown_day_expands_to_nothing() {
        let expander = ScheduleExpander::default();
        assert!(expander.expand("Day 7", date(2024, 9, 2)).unwrap().is_empty());
        assert!(expander.expand("Day Off", date(2024, 9, 4)).unwrap().is_empty());
    }

    #[test]
    fn test_marker_slots_keep_literal_label() {
        let expander = ScheduleExpander::default();
        let d = date(2024, 9, 4);
        assert_eq!(expander.timetable().variant_for(d), TimeTableVariant::Reduced);

        let titles: Vec<String> = expander
            .expand("Day 1", d)
            .unwrap()
            .into_iter()
            .map(|e| e.title)
            .collect();
        let markers = [
            "Homeroom",
            "Extended Homeroom",
            "Break",
            "Lunch",
            "Professional Development",
        ];
        for marker in markers {
            assert!(titles.iter().any(|t| t == marker), "missing {}", marker);
        }
    }

    #[test]
    fn test_random_uids_differ_between_runs() {
        let expander = ScheduleExpander::default();
        let d = date(2024, 9, 2);
        let first = expander.expand("Day 5", d).unwrap();
        let second = expander.expand("Day 5", d).unwrap();

        assert!(first.iter().all(|e| e.uid.ends_with("@yourdomain.com")));
        assert_ne!(first[0].uid, second[0].uid);
        let titles = |events: &[ExpandedEvent]| -> Vec<String> {
            events.iter().map(|e| e.title.clone()).collect()
        };
        assert_eq!(titles(&first), titles(&second));
    }

    #[test]
    fn test_deterministic_uids_are_stable() {
        let expander = ScheduleExpander::new(
            TimeTableRegistry::default(),
            ClassRotationRegistry::default(),
            ExpanderSettings {
                uid_strategy: UidStrategy::Deterministic,
                uid_domain: "school.example".to_string(),
                ..ExpanderSettings::default()
            },
        );
        let d = date(2024, 9, 4);
        let uids = || -> Vec<String> {
            expander
                .expand("Day 3", d)
                .unwrap()
                .into_iter()
                .map(|e| e.uid)
                .collect()
        };
        let first = uids();
        let second = uids();

        assert_eq!(first, second);
        // parallel halves still get distinct ids
        let unique: std::collections::HashSet<&String> = first.iter().collect();
        assert_eq!(unique.len(), first.len());
        assert!(first[0].ends_with("@school.example"));
    }

    #[test]
    fn test_created_at_is_generation_instant() {
        let expander = ScheduleExpander::default();
        let generated_at = Utc::now();
        let events = expander
            .expand_at("Day 1", date(2023, 5, 8), generated_at)
            .unwrap();
        assert!(events.iter().all(|e| e.created_at == generated_at));
    }

    #[test]
    fn test_nonexistent_local_time_is_an_error() {
        let expander = ScheduleExpander::new(
            TimeTableRegistry::default(),
            ClassRotationRegistry::default(),
            ExpanderSettings {
                timezone: chrono_tz::America::New_York,
                marker_time: NaiveTime::from_hms_opt(2, 30, 0).unwrap(),
                ..ExpanderSettings::default()
            },
        );
        // 2024-03-10 02:30 does not exist in New York
        let err = expander.expand("Day 1", date(2024, 3, 10)).unwrap_err();
        assert!(matches!(err, FeedError::LocalizationError { .. }));
    }

    #[test]
    fn test_uid_strategy_from_str() {
        assert_eq!("random".parse::<UidStrategy>().unwrap(), UidStrategy::Random);
        assert_eq!(
            "Deterministic".parse::<UidStrategy>().unwrap(),
            UidStrategy::Deterministic
        );
        assert!("sequential".parse::<UidStrategy>().is_err());
    }
}
