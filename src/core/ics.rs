use icalendar::{Calendar, CalendarComponent, Component};

/// Which of UID / DTSTAMP a component lacks. `icalendar` fills both in with
/// fresh values when writing, so those lines must be dropped again.
#[derive(Debug, Clone, Copy, Default)]
struct Missing {
    uid: bool,
    dtstamp: bool,
}

impl Missing {
    fn of<C: Component>(component: &C) -> Self {
        Self {
            uid: !component.properties().contains_key("UID"),
            dtstamp: !component.properties().contains_key("DTSTAMP"),
        }
    }
}

/// Serializes `calendar` writing only the properties each component carries.
///
/// Components taken over from the source feed (VTIMEZONE and its
/// STANDARD/DAYLIGHT children, events without a UID, ...) come out as they
/// went in.
pub fn render_calendar(calendar: &Calendar) -> String {
    let raw = calendar.to_string();

    // 依文件順序 (pre-order) 記錄每個元件缺少的屬性
    let mut missing = Vec::new();
    for component in &calendar.components {
        let known = match component {
            CalendarComponent::Event(event) => collect(event, &mut missing),
            CalendarComponent::Todo(todo) => collect(todo, &mut missing),
            CalendarComponent::Venue(venue) => collect(venue, &mut missing),
            CalendarComponent::Other(other) => collect(other, &mut missing),
            _ => false,
        };
        if !known {
            tracing::warn!("⚠️ Unknown calendar component kind, writing it as-is");
            return raw;
        }
    }

    strip_injected(&raw, &missing)
}

fn collect<C: Component>(component: &C, out: &mut Vec<Missing>) -> bool {
    out.push(Missing::of(component));
    component
        .components()
        .iter()
        .all(|child| collect(child, out))
}

fn strip_injected(raw: &str, missing: &[Missing]) -> String {
    let mut out = String::with_capacity(raw.len());
    // None: the VCALENDAR itself
    let mut stack: Vec<Option<Missing>> = Vec::new();
    let mut next = 0;

    for line in raw.split_terminator("\r\n") {
        let current = stack.last().copied().flatten();
        let skip = match current {
            Some(m) => {
                (m.uid && line.starts_with("UID:")) || (m.dtstamp && line.starts_with("DTSTAMP:"))
            }
            None => false,
        };

        if line == "BEGIN:VCALENDAR" {
            stack.push(None);
        } else if line.starts_with("BEGIN:") {
            stack.push(Some(missing.get(next).copied().unwrap_or_default()));
            next += 1;
        } else if line.starts_with("END:") {
            stack.pop();
        }

        if !skip {
            out.push_str(line);
            out.push_str("\r\n");
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use icalendar::{Event, EventLike};

    const ZONED_FEED: &str = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:-//Schoology//Calendar//EN\r\n\
BEGIN:VTIMEZONE\r\n\
TZID:Asia/Shanghai\r\n\
BEGIN:STANDARD\r\n\
DTSTART:19700101T000000\r\n\
TZNAME:CST\r\n\
TZOFFSETFROM:+0800\r\n\
TZOFFSETTO:+0800\r\n\
END:STANDARD\r\n\
END:VTIMEZONE\r\n\
BEGIN:VEVENT\r\n\
UID:assembly@schoology\r\n\
DTSTAMP:20240801T000000Z\r\n\
SUMMARY:Whole School Assembly\r\n\
DTSTART;TZID=Asia/Shanghai:20240902T090000\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

    fn block<'a>(text: &'a str, kind: &str) -> &'a str {
        let begin = format!("BEGIN:{}\r\n", kind);
        let end = format!("END:{}\r\n", kind);
        let start = text.find(&begin).unwrap();
        let stop = text[start..].find(&end).unwrap() + start + end.len();
        &text[start..stop]
    }

    #[test]
    fn test_timezone_block_is_written_unchanged() {
        let calendar: Calendar = ZONED_FEED.parse().unwrap();
        let written = render_calendar(&calendar);

        let timezone = block(&written, "VTIMEZONE");
        assert!(!timezone.contains("UID"), "{}", timezone);
        assert!(!timezone.contains("DTSTAMP"), "{}", timezone);
        assert_eq!(timezone, block(ZONED_FEED, "VTIMEZONE"));
    }

    #[test]
    fn test_rendering_is_stable_across_calls() {
        let calendar: Calendar = ZONED_FEED.parse().unwrap();
        assert_eq!(render_calendar(&calendar), render_calendar(&calendar));
    }

    #[test]
    fn test_event_properties_are_kept() {
        let mut calendar: Calendar = ZONED_FEED.parse().unwrap();
        calendar.push(Event::new().summary("Parents Evening").done());
        let written = render_calendar(&calendar);

        assert!(written.contains("UID:assembly@schoology\r\n"));
        assert!(written.contains("DTSTAMP:20240801T000000Z\r\n"));

        // 沒有 UID 的事件也不會被補上
        let added = &written[written.find("SUMMARY:Parents Evening").unwrap()..];
        let added = &added[..added.find("END:VEVENT").unwrap()];
        assert!(!added.contains("UID:"));

        let reparsed: Calendar = written.parse().unwrap();
        assert_eq!(reparsed.components.len(), 3);
    }
}
