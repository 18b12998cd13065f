use crate::domain::model::{PeriodSlot, SlotKind};
use crate::domain::timetable::TimeTableRegistry;
use crate::utils::error::{FeedError, Result};
use std::collections::BTreeMap;

/// Period label -> what actually happens in that period on one rotation day.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassRotationEntry {
    classes: BTreeMap<String, String>,
}

impl ClassRotationEntry {
    pub fn new(classes: BTreeMap<String, String>) -> Result<Self> {
        if let Some(label) = classes
            .keys()
            .find(|label| SlotKind::classify(label) != SlotKind::ClassPeriod)
        {
            return Err(FeedError::InvalidConfigValueError {
                field: "schedule.rotation".to_string(),
                value: label.clone(),
                reason: "rotation entries may only name class periods (\"Period ...\")".to_string(),
            });
        }
        Ok(Self { classes })
    }

    pub fn description(&self, period_label: &str) -> Option<&str> {
        self.classes.get(period_label).map(String::as_str)
    }

    /// Event title for `slot` on this rotation day. Marker slots and periods
    /// without an entry keep their label.
    pub fn title_for(&self, slot: &PeriodSlot) -> String {
        match slot.kind {
            SlotKind::ClassPeriod => match self.description(&slot.label) {
                Some(description) => description.to_string(),
                None => slot.label.clone(),
            },
            SlotKind::Marker => slot.label.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClassRotationRegistry {
    entries: BTreeMap<String, ClassRotationEntry>,
}

impl ClassRotationRegistry {
    pub fn new(entries: BTreeMap<String, ClassRotationEntry>) -> Self {
        Self { entries }
    }

    /// `None` for day identifiers outside the rotation.
    pub fn entry_for(&self, day_id: &str) -> Option<&ClassRotationEntry> {
        self.entries.get(day_id)
    }

    pub fn day_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// (day, period) pairs where a class period of either time table has no
    /// description. Such periods fall back to their raw label when expanded.
    pub fn coverage_gaps(&self, timetable: &TimeTableRegistry) -> Vec<(String, String)> {
        let labels = timetable.class_period_labels();
        let mut gaps = Vec::new();
        for (day_id, entry) in &self.entries {
            for label in &labels {
                if entry.description(label).is_none() {
                    gaps.push((day_id.clone(), label.to_string()));
                }
            }
        }
        gaps
    }
}

impl Default for ClassRotationRegistry {
    fn default() -> Self {
        let entries = DEFAULT_ROTATION
            .iter()
            .map(|(day_id, classes)| {
                let classes = classes
                    .iter()
                    .map(|(period, description)| (period.to_string(), description.to_string()))
                    .collect();
                (day_id.to_string(), ClassRotationEntry { classes })
            })
            .collect();
        Self { entries }
    }
}

const THEATRE_DAY: &[(&str, &str)] = &[
    ("Period 1A", "Period 1A - Free"),
    ("Period 1B", "Period 1B - Free"),
    ("Period 2", "Improv Theatre (ART229.101)"),
    ("Period 3A", "Theatre 8 (ART083.101)"),
    ("Period 3B", "Theatre 8 (ART083.101) continued"),
    ("Period 4A", "Theatre 6 (ART063.103)"),
    ("Period 4B", "Theatre 6 (ART063.104)"),
];

const FREE_DAY: &[(&str, &str)] = &[
    ("Period 1A", "Period 1A - Free"),
    ("Period 1B", "Period 1B - Free"),
    ("Period 2", "Period 2 - Free"),
    ("Period 3A", "Period 3A - Free"),
    ("Period 3B", "Period 3B- Free"),
    ("Period 4A", "Period 4A - Free"),
    ("Period 4B", "Period 4B- Free"),
];

const MORNING_THEATRE_DAY: &[(&str, &str)] = &[
    ("Period 1A", "Theatre 7 (ART073.103)"),
    ("Period 1B", "Theatre 7 (ART073.104)"),
    ("Period 2", "Period 2 - Free"),
    ("Period 3A", "Period 3A - Free"),
    ("Period 3B", "Period 3B- Free"),
    ("Period 4A", "Period 4A - Free"),
    ("Period 4B", "Period 4B- Free"),
];

const DEFAULT_ROTATION: &[(&str, &[(&str, &str)])] = &[
    ("Day 1", THEATRE_DAY),
    ("Day 2", FREE_DAY),
    ("Day 3", MORNING_THEATRE_DAY),
    ("Day 4", THEATRE_DAY),
    ("Day 5", FREE_DAY),
    ("Day 6", MORNING_THEATRE_DAY),
];
