use crate::utils::error::{FeedError, Result};
use icalendar::Calendar;
use reqwest::Client;
use std::time::Duration;

/// Downloads the source iCalendar feed.
#[derive(Debug, Clone)]
pub struct FeedClient {
    client: Client,
}

impl FeedClient {
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    pub async fn fetch(&self, url: &str) -> Result<String> {
        let url = http_url(url);
        tracing::info!("Fetching calendar from URL: {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        tracing::debug!("Feed response status: {}", status);

        if !status.is_success() {
            return Err(FeedError::FeedStatusError {
                url,
                status: status.as_u16(),
            });
        }

        Ok(response.text().await?)
    }
}

/// `webcal://` is only a subscription hint; the document is served over https.
pub fn http_url(url: &str) -> String {
    match url.strip_prefix("webcal://") {
        Some(rest) => format!("https://{}", rest),
        None => url.to_string(),
    }
}

pub fn parse_calendar(text: &str) -> Result<Calendar> {
    if !text.contains("BEGIN:VCALENDAR") {
        return Err(FeedError::IcsParseError {
            message: "response is not an iCalendar document (no BEGIN:VCALENDAR)".to_string(),
        });
    }

    text.parse::<Calendar>()
        .map_err(|e| FeedError::IcsParseError {
            message: e.to_string(),
        })
}
