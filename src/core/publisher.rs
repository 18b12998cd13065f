use crate::core::ics::render_calendar;
use crate::domain::model::PublishReport;
use crate::domain::ports::Storage;
use crate::utils::error::Result;
use chrono::DateTime;
use chrono_tz::Tz;
use icalendar::Calendar;

pub const CALENDAR_CONTENT_TYPE: &str = "text/calendar";
pub const LATEST_FILE_NAME: &str = "generated_calendar.ics";

/// Destination keys for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectKeys {
    pub history: String,
    pub latest: String,
}

impl ObjectKeys {
    /// `generated_at` should already be in the civil timezone; the history
    /// timestamp is its wall-clock time.
    pub fn for_run(prefix: &str, generated_at: &DateTime<Tz>) -> Self {
        let prefix = normalize_prefix(prefix);
        Self {
            history: format!(
                "{}history/generated_calendar_{}.ics",
                prefix,
                generated_at.format("%Y%m%d_%H%M%S")
            ),
            latest: format!("{}{}", prefix, LATEST_FILE_NAME),
        }
    }
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{}/", trimmed)
    }
}

/// Subscription address for `key` under `public_base`, e.g.
/// `https://s3.amazonaws.com/bucket` -> `webcal://s3.amazonaws.com/bucket/<key>`.
pub fn webcal_url(public_base: &str, key: &str) -> String {
    let without_scheme = public_base
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(public_base);
    format!("webcal://{}/{}", without_scheme.trim_end_matches('/'), key)
}

pub struct Publisher<S: Storage> {
    storage: S,
    prefix: String,
    public_base_url: Option<String>,
}

impl<S: Storage> Publisher<S> {
    pub fn new(storage: S, prefix: impl Into<String>, public_base_url: Option<String>) -> Self {
        Self {
            storage,
            prefix: prefix.into(),
            public_base_url,
        }
    }

    /// Writes the history snapshot, then the canonical latest object. A failed
    /// second write does not undo the first.
    pub async fn publish(
        &self,
        calendar: &Calendar,
        generated_at: &DateTime<Tz>,
    ) -> Result<PublishReport> {
        let body = render_calendar(calendar).into_bytes();
        let keys = ObjectKeys::for_run(&self.prefix, generated_at);

        self.storage
            .write_file(&keys.history, &body, CALENDAR_CONTENT_TYPE)
            .await
            .inspect_err(|e| tracing::error!("❌ Failed to save history snapshot: {}", e))?;
        tracing::info!("✅ Saved timestamped calendar: {}", keys.history);

        self.storage
            .write_file(&keys.latest, &body, CALENDAR_CONTENT_TYPE)
            .await
            .inspect_err(|e| {
                tracing::error!(
                    "❌ Failed to save main calendar (history snapshot {} was kept): {}",
                    keys.history,
                    e
                )
            })?;
        tracing::info!("✅ Saved main calendar: {}", keys.latest);

        let webcal_url = self
            .public_base_url
            .as_deref()
            .map(|base| webcal_url(base, &keys.latest));

        Ok(PublishReport {
            history_key: keys.history,
            latest_key: keys.latest,
            bytes_written: body.len(),
            webcal_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::FeedError;
    use icalendar::Component;
    use chrono::TimeZone;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone, Default)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, (Vec<u8>, String)>>>,
        order: Arc<Mutex<Vec<String>>>,
        fail_on: Option<String>,
    }

    impl MockStorage {
        fn failing_on(key: &str) -> Self {
            Self {
                fail_on: Some(key.to_string()),
                ..Self::default()
            }
        }
    }

    impl Storage for MockStorage {
        async fn write_file(&self, path: &str, data: &[u8], content_type: &str) -> Result<()> {
            if self.fail_on.as_deref() == Some(path) {
                return Err(FeedError::StorageError {
                    key: path.to_string(),
                    message: "access denied".to_string(),
                });
            }
            self.order.lock().await.push(path.to_string());
            self.files
                .lock()
                .await
                .insert(path.to_string(), (data.to_vec(), content_type.to_string()));
            Ok(())
        }
    }

    fn run_time() -> DateTime<Tz> {
        chrono_tz::Asia::Shanghai
            .with_ymd_and_hms(2024, 9, 2, 7, 5, 9)
            .unwrap()
    }

    fn calendar() -> Calendar {
        let mut cal = Calendar::new();
        cal.push(icalendar::Event::new().summary("Day 1").uid("x@test").done());
        cal.done()
    }

    #[test]
    fn test_object_keys() {
        let keys = ObjectKeys::for_run("", &run_time());
        assert_eq!(keys.history, "history/generated_calendar_20240902_070509.ics");
        assert_eq!(keys.latest, "generated_calendar.ics");

        let prefixed = ObjectKeys::for_run("/feeds/josh/", &run_time());
        assert_eq!(
            prefixed.history,
            "feeds/josh/history/generated_calendar_20240902_070509.ics"
        );
        assert_eq!(prefixed.latest, "feeds/josh/generated_calendar.ics");
    }

    #[test]
    fn test_webcal_url() {
        assert_eq!(
            webcal_url("https://s3.amazonaws.com/josh-this-2425", "generated_calendar.ics"),
            "webcal://s3.amazonaws.com/josh-this-2425/generated_calendar.ics"
        );
        assert_eq!(
            webcal_url("cdn.example.com/", "a/generated_calendar.ics"),
            "webcal://cdn.example.com/a/generated_calendar.ics"
        );
    }

    #[tokio::test]
    async fn test_publish_writes_history_then_latest() {
        let storage = MockStorage::default();
        let publisher = Publisher::new(
            storage.clone(),
            "",
            Some("https://s3.amazonaws.com/bucket".to_string()),
        );

        let report = publisher.publish(&calendar(), &run_time()).await.unwrap();

        let order = storage.order.lock().await.clone();
        assert_eq!(order, vec![report.history_key.clone(), report.latest_key.clone()]);

        let files = storage.files.lock().await;
        let (latest, content_type) = files.get("generated_calendar.ics").unwrap();
        assert_eq!(content_type, "text/calendar");
        assert_eq!(latest.len(), report.bytes_written);
        assert!(String::from_utf8_lossy(latest).contains("SUMMARY:Day 1"));
        assert_eq!(files.get(&report.history_key).unwrap().0, *latest);
        assert_eq!(
            report.webcal_url.as_deref(),
            Some("webcal://s3.amazonaws.com/bucket/generated_calendar.ics")
        );
    }

    #[tokio::test]
    async fn test_failed_latest_write_keeps_history() {
        let storage = MockStorage::failing_on("generated_calendar.ics");
        let publisher = Publisher::new(storage.clone(), "", None);

        let result = publisher.publish(&calendar(), &run_time()).await;

        assert!(matches!(result, Err(FeedError::StorageError { .. })));
        let files = storage.files.lock().await;
        assert!(files.contains_key("history/generated_calendar_20240902_070509.ics"));
        assert!(!files.contains_key("generated_calendar.ics"));
    }

    #[tokio::test]
    async fn test_failed_history_write_stops_before_latest() {
        let storage = MockStorage::failing_on("history/generated_calendar_20240902_070509.ics");
        let publisher = Publisher::new(storage.clone(), "", None);

        assert!(publisher.publish(&calendar(), &run_time()).await.is_err());
        assert!(storage.files.lock().await.is_empty());
    }
}
