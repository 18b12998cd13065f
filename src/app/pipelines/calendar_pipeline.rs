use crate::adapters::feed::{self, FeedClient};
use crate::core::publisher::Publisher;
use crate::core::rewriter::FeedRewriter;
use crate::core::{ConfigProvider, Pipeline, PublishReport, RewriteOutcome, Storage};
use crate::utils::error::Result;
use chrono::Utc;
use icalendar::Calendar;

/// Fetch the school feed, expand rotation days, publish the result.
pub struct CalendarPipeline<S: Storage, C: ConfigProvider> {
    publisher: Publisher<S>,
    config: C,
    feed: FeedClient,
    rewriter: FeedRewriter,
}

impl<S: Storage, C: ConfigProvider> CalendarPipeline<S, C> {
    pub fn new(storage: S, config: C, rewriter: FeedRewriter) -> Result<Self> {
        let feed = FeedClient::new(config.request_timeout())?;
        let publisher = Publisher::new(storage, config.key_prefix(), config.public_base_url());
        Ok(Self {
            publisher,
            config,
            feed,
            rewriter,
        })
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for CalendarPipeline<S, C> {
    async fn extract(&self) -> Result<Calendar> {
        let body = self.feed.fetch(self.config.feed_url()).await?;
        tracing::debug!("Feed body is {} bytes", body.len());
        feed::parse_calendar(&body)
    }

    async fn transform(&self, source: Calendar) -> Result<RewriteOutcome> {
        self.rewriter.rewrite(&source)
    }

    async fn load(&self, outcome: RewriteOutcome) -> Result<PublishReport> {
        let generated_at = Utc::now().with_timezone(&self.rewriter.expander().timezone());
        self.publisher.publish(&outcome.calendar, &generated_at).await
    }
}
