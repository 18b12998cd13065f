use crate::domain::model::{PeriodSlot, TimeTableVariant};
use crate::utils::error::{FeedError, Result};
use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};

/// Period boundaries for the two kinds of school day.
#[derive(Debug, Clone)]
pub struct TimeTableRegistry {
    regular: Vec<PeriodSlot>,
    reduced: Vec<PeriodSlot>,
    reduced_weekday: Weekday,
}

impl TimeTableRegistry {
    /// Rejects tables whose slots go backwards in start time or have `end <= start`.
    pub fn new(
        regular: Vec<PeriodSlot>,
        reduced: Vec<PeriodSlot>,
        reduced_weekday: Weekday,
    ) -> Result<Self> {
        check_slots("regular", &regular)?;
        check_slots("reduced", &reduced)?;
        Ok(Self {
            regular,
            reduced,
            reduced_weekday,
        })
    }

    pub fn variant_for(&self, date: NaiveDate) -> TimeTableVariant {
        if date.weekday() == self.reduced_weekday {
            TimeTableVariant::Reduced
        } else {
            TimeTableVariant::Regular
        }
    }

    pub fn slots(&self, variant: TimeTableVariant) -> &[PeriodSlot] {
        match variant {
            TimeTableVariant::Regular => &self.regular,
            TimeTableVariant::Reduced => &self.reduced,
        }
    }

    pub fn slots_for(&self, date: NaiveDate) -> &[PeriodSlot] {
        self.slots(self.variant_for(date))
    }

    pub fn reduced_weekday(&self) -> Weekday {
        self.reduced_weekday
    }

    /// Every class-period label appearing in either variant, in first-seen order.
    pub fn class_period_labels(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = Vec::new();
        for slot in self.regular.iter().chain(self.reduced.iter()) {
            if slot.is_class_period() && !labels.contains(&slot.label.as_str()) {
                labels.push(&slot.label);
            }
        }
        labels
    }
}

impl Default for TimeTableRegistry {
    fn default() -> Self {
        Self {
            regular: build_slots(REGULAR_DAY),
            reduced: build_slots(REDUCED_DAY),
            reduced_weekday: Weekday::Wed,
        }
    }
}

fn check_slots(variant: &str, slots: &[PeriodSlot]) -> Result<()> {
    for (index, slot) in slots.iter().enumerate() {
        if slot.end <= slot.start {
            return Err(FeedError::ConfigValidationError {
                field: format!("schedule.{}[{}]", variant, index),
                message: format!("'{}' must end after it starts", slot.label),
            });
        }
        if index > 0 && slot.start < slots[index - 1].start {
            return Err(FeedError::ConfigValidationError {
                field: format!("schedule.{}[{}]", variant, index),
                message: format!(
                    "'{}' starts before the preceding slot '{}'",
                    slot.label,
                    slots[index - 1].label
                ),
            });
        }
    }
    Ok(())
}

type SlotSpec = ((u32, u32), (u32, u32), &'static str);

const REGULAR_DAY: &[SlotSpec] = &[
    ((8, 0), (8, 10), "Homeroom"),
    ((8, 15), (8, 55), "Period 1A"),
    ((8, 55), (9, 35), "Period 1B"),
    ((9, 35), (9, 50), "Break"),
    ((9, 55), (11, 15), "Period 2"),
    ((11, 22), (12, 5), "Period 3A"),
    ((12, 10), (13, 0), "Lunch"),
    ((13, 5), (13, 48), "Period 3B"),
    ((13, 55), (14, 35), "Period 4A"),
    ((14, 35), (15, 15), "Period 4B"),
];

// 1A/1B and 4A/4B run in parallel on reduced days.
const REDUCED_DAY: &[SlotSpec] = &[
    ((8, 0), (8, 10), "Homeroom"),
    ((8, 15), (8, 55), "Period 1A"),
    ((8, 15), (8, 55), "Period 1B"),
    ((9, 2), (9, 42), "Period 2"),
    ((9, 47), (10, 27), "Extended Homeroom"),
    ((10, 27), (10, 40), "Break"),
    ((10, 45), (11, 25), "Period 3A"),
    ((11, 30), (12, 10), "Period 3B"),
    ((12, 15), (12, 55), "Lunch"),
    ((13, 0), (13, 40), "Period 4A"),
    ((13, 0), (13, 40), "Period 4B"),
    ((13, 40), (17, 0), "Professional Development"),
];

fn hm((hour, minute): (u32, u32)) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

fn build_slots(specs: &[SlotSpec]) -> Vec<PeriodSlot> {
    specs
        .iter()
        .map(|&(start, end, label)| PeriodSlot::new(hm(start), hm(end), label))
        .collect()
}
