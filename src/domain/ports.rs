use crate::domain::model::{PublishReport, RewriteOutcome};
use crate::utils::error::Result;
use async_trait::async_trait;
use icalendar::Calendar;
use std::time::Duration;

pub trait Storage: Send + Sync {
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
        content_type: &str,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn feed_url(&self) -> &str;
    fn key_prefix(&self) -> &str;
    fn request_timeout(&self) -> Option<Duration>;
    /// Public base the latest object is served from, if it is served at all.
    fn public_base_url(&self) -> Option<String>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Calendar>;
    async fn transform(&self, source: Calendar) -> Result<RewriteOutcome>;
    async fn load(&self, outcome: RewriteOutcome) -> Result<PublishReport>;
}
