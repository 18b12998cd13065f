use anyhow::Context;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use serde::{Deserialize, Serialize};
use timetable_feed::core::RunReport;
use timetable_feed::utils::logger::{self, LogBuffer};
use timetable_feed::utils::validation::Validate;
use timetable_feed::{CalendarPipeline, EtlEngine, LambdaConfig, S3Storage};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Request {
    pub feed_url: Option<String>,
    pub s3_bucket: Option<String>,
    pub s3_prefix: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Response {
    pub message: String,
    pub history_key: String,
    pub latest_key: String,
    pub events_replaced: usize,
    pub events_added: usize,
    pub unmatched_days: Vec<String>,
    pub webcal_url: Option<String>,
    /// Plain-text log of this invocation.
    pub logs: String,
}

async fn process(request: Request) -> anyhow::Result<RunReport> {
    // 事件中的值覆蓋環境變數
    let mut lambda_config = LambdaConfig::from_env();
    if request.feed_url.is_some() {
        lambda_config.feed_url = request.feed_url;
    }
    if request.s3_bucket.is_some() {
        lambda_config.s3_bucket = request.s3_bucket;
    }
    if request.s3_prefix.is_some() {
        lambda_config.s3_prefix = request.s3_prefix;
    }

    let config = lambda_config
        .resolve()
        .context("failed to resolve Lambda configuration")?;
    config.validate().context("invalid configuration")?;
    let rewriter = config.build_rewriter()?;

    let storage = S3Storage::connect(&config.publish)
        .await
        .context("failed to create S3 client")?;
    let pipeline = CalendarPipeline::new(storage, config, rewriter)?;

    let report = EtlEngine::new(pipeline)
        .run()
        .await
        .context("calendar update failed")?;
    Ok(report)
}

async fn function_handler(event: LambdaEvent<Request>, logs: LogBuffer) -> Result<Response, Error> {
    // 清除上一次呼叫留下的日誌
    logs.take();
    tracing::info!("Starting calendar update Lambda function");

    let report = process(event.payload)
        .await
        .inspect_err(|e| tracing::error!("❌ {:#}", e))?;

    tracing::info!("✅ Calendar update Lambda function completed successfully");
    Ok(Response {
        message: "Calendar updated successfully".to_string(),
        history_key: report.publish.history_key,
        latest_key: report.publish.latest_key,
        events_replaced: report.events_replaced,
        events_added: report.events_added,
        unmatched_days: report.unmatched_days,
        webcal_url: report.publish.webcal_url,
        logs: logs.take(),
    })
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let logs = LogBuffer::new();
    logger::init_lambda_logger(logs.clone());

    run(service_fn(move |event: LambdaEvent<Request>| {
        let logs = logs.clone();
        async move { function_handler(event, logs).await }
    }))
    .await
}
