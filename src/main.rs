use clap::Parser;
use timetable_feed::core::{RunReport, Storage};
use timetable_feed::utils::error::{ErrorSeverity, FeedError, Result};
use timetable_feed::utils::{logger, validation::Validate};
use timetable_feed::{
    CalendarPipeline, CliConfig, EtlEngine, FeedRewriter, LocalStorage, TomlConfig,
};

#[cfg(feature = "s3")]
use timetable_feed::S3Storage;

enum Target {
    Local(LocalStorage),
    #[cfg(feature = "s3")]
    S3(S3Storage),
}

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    // 初始化日誌
    logger::init_cli_logger(cli.verbose);

    tracing::info!("Starting timetable-feed CLI");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    if let Err(e) = run(&cli).await {
        // 記錄詳細錯誤信息
        tracing::error!(
            "❌ Calendar update failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 建議: {}", e.recovery_suggestion());

        // 根據錯誤嚴重程度決定退出碼
        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }
}

async fn run(cli: &CliConfig) -> Result<()> {
    let config = cli.load()?;

    // 驗證配置
    config
        .validate()
        .inspect_err(|e| tracing::error!("❌ Configuration validation failed: {}", e))?;
    let rewriter = config.build_rewriter()?;

    if cli.dry_run {
        return dry_run(config, rewriter).await;
    }

    match select_target(&config).await? {
        Target::Local(storage) => execute(storage, config, rewriter).await,
        #[cfg(feature = "s3")]
        Target::S3(storage) => execute(storage, config, rewriter).await,
    }
}

async fn select_target(config: &TomlConfig) -> Result<Target> {
    if let Some(path) = &config.publish.output_path {
        tracing::info!("📁 Publishing to local directory: {}", path);
        return Ok(Target::Local(LocalStorage::new(path.clone())));
    }

    #[cfg(feature = "s3")]
    {
        if config.publish.bucket.is_some() {
            let storage = S3Storage::connect(&config.publish).await?;
            tracing::info!("📁 Publishing to bucket: {}", storage.bucket());
            return Ok(Target::S3(storage));
        }
    }

    Err(FeedError::MissingConfigError {
        field: "publish.output_path or publish.bucket".to_string(),
    })
}

async fn dry_run(config: TomlConfig, rewriter: FeedRewriter) -> Result<()> {
    // 不會寫入任何檔案
    let storage = LocalStorage::new(config.publish.output_path.clone().unwrap_or_default());
    let engine = EtlEngine::new(CalendarPipeline::new(storage, config, rewriter)?);
    let outcome = engine.dry_run().await?;

    println!("✅ Dry run completed, nothing was published");
    println!(
        "   replaced {} events, added {} detailed events",
        outcome.events_replaced, outcome.events_added
    );
    if !outcome.unmatched_days.is_empty() {
        println!("⚠️ Unmatched days: {}", outcome.unmatched_days.join(", "));
    }
    Ok(())
}

async fn execute<S: Storage>(storage: S, config: TomlConfig, rewriter: FeedRewriter) -> Result<()> {
    let interval = config.interval();
    let engine = EtlEngine::new(CalendarPipeline::new(storage, config, rewriter)?);

    let Some(period) = interval else {
        let report = engine.run().await?;
        print_report(&report);
        return Ok(());
    };

    tracing::info!("Re-running every {} minutes (Ctrl-C to stop)", period.as_secs() / 60);
    let mut ticker = tokio::time::interval(period);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match engine.run().await {
                    Ok(report) => print_report(&report),
                    Err(e) => {
                        tracing::error!("❌ Calendar update failed: {}", e);
                        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received Ctrl-C, stopping");
                return Ok(());
            }
        }
    }
}

fn print_report(report: &RunReport) {
    tracing::info!("✅ Calendar update completed successfully!");
    match report.to_json() {
        Ok(json) => tracing::debug!("Run report: {}", json),
        Err(e) => tracing::warn!("⚠️ Could not encode run report: {}", e),
    }
    println!("✅ Calendar update completed successfully!");
    println!(
        "   replaced {} events, added {} detailed events",
        report.events_replaced, report.events_added
    );
    println!("📁 History snapshot: {}", report.publish.history_key);
    println!("📁 Latest calendar: {}", report.publish.latest_key);
    if let Some(url) = &report.publish.webcal_url {
        println!("📅 Subscribe: {}", url);
    }
}
