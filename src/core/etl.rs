use crate::core::Pipeline;
use crate::domain::model::{RewriteOutcome, RunReport};
use crate::utils::error::Result;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub async fn run(&self) -> Result<RunReport> {
        tracing::info!("Starting calendar update...");

        let outcome = self.extract_and_transform().await?;
        let events_replaced = outcome.events_replaced;
        let events_added = outcome.events_added;
        let unmatched_days = outcome.unmatched_days.clone();

        // Load
        tracing::info!("Publishing calendar...");
        let publish = self.pipeline.load(outcome).await?;
        tracing::info!("📁 Latest calendar: {}", publish.latest_key);

        Ok(RunReport {
            events_replaced,
            events_added,
            unmatched_days,
            publish,
        })
    }

    /// Extract and transform only; nothing is written.
    pub async fn dry_run(&self) -> Result<RewriteOutcome> {
        tracing::info!("Starting calendar update (dry run)...");
        self.extract_and_transform().await
    }

    async fn extract_and_transform(&self) -> Result<RewriteOutcome> {
        // Extract
        tracing::info!("Fetching source calendar...");
        let source = self.pipeline.extract().await?;
        tracing::info!("Fetched {} calendar components", source.components.len());

        // Transform
        tracing::info!("Expanding rotation days...");
        let outcome = self.pipeline.transform(source).await?;
        tracing::info!(
            "Rewritten calendar has {} components",
            outcome.calendar.components.len()
        );

        Ok(outcome)
    }
}
