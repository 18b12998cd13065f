use crate::config::toml_config::TomlConfig;
use crate::core::expander::UidStrategy;
use crate::core::rewriter::UnmatchedDayPolicy;
use crate::utils::error::Result;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "timetable-feed")]
#[command(
    about = "Expand rotation-day placeholders in a school calendar feed and publish the result"
)]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Source iCalendar feed (http, https or webcal)
    #[arg(long)]
    pub feed_url: Option<String>,

    /// Publish into this local directory
    #[arg(long)]
    pub output_path: Option<String>,

    /// Publish into this S3 bucket
    #[arg(long)]
    pub bucket: Option<String>,

    #[arg(long)]
    pub key_prefix: Option<String>,

    /// What to do with "Day" events that have no rotation entry (drop or keep)
    #[arg(long)]
    pub unmatched_day: Option<UnmatchedDayPolicy>,

    /// Event UID generation (random or deterministic)
    #[arg(long)]
    pub uid_strategy: Option<UidStrategy>,

    /// Re-run every N minutes instead of exiting after one run
    #[arg(long, value_name = "MINUTES")]
    pub every: Option<u64>,

    /// Fetch and expand without publishing
    #[arg(long)]
    pub dry_run: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl CliConfig {
    /// Loads the config file (or defaults) and applies flag overrides.
    pub fn load(&self) -> Result<TomlConfig> {
        let mut config = match &self.config {
            Some(path) => {
                tracing::info!("📁 Loading configuration from: {}", path.display());
                TomlConfig::from_file(path)?
            }
            None => TomlConfig::default(),
        };
        self.apply_overrides(&mut config);
        Ok(config)
    }

    // 應用命令列覆蓋設定
    pub fn apply_overrides(&self, config: &mut TomlConfig) {
        if let Some(url) = &self.feed_url {
            config.source.url = url.clone();
        }
        if let Some(output_path) = &self.output_path {
            config.publish.output_path = Some(output_path.clone());
        }
        if let Some(bucket) = &self.bucket {
            config.publish.bucket = Some(bucket.clone());
        }
        if let Some(prefix) = &self.key_prefix {
            config.publish.key_prefix = prefix.clone();
        }
        if let Some(policy) = self.unmatched_day {
            config.schedule.unmatched_day = policy;
        }
        if let Some(strategy) = self.uid_strategy {
            config.schedule.uid_strategy = strategy;
        }
        if let Some(minutes) = self.every {
            config.source.interval_minutes = Some(minutes);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_file_values() {
        let cli = CliConfig::parse_from([
            "timetable-feed",
            "--feed-url",
            "https://example.com/ical.ics",
            "--bucket",
            "josh-this-2425",
            "--unmatched-day",
            "keep",
            "--uid-strategy",
            "deterministic",
            "--every",
            "60",
        ]);

        let mut config = TomlConfig::from_toml_str(
            "[source]\nurl = \"https://old.example.com/a.ics\"\n\
             [publish]\nbucket = \"old-bucket\"\n",
        )
        .unwrap();
        cli.apply_overrides(&mut config);

        assert_eq!(config.source.url, "https://example.com/ical.ics");
        assert_eq!(config.publish.bucket.as_deref(), Some("josh-this-2425"));
        assert_eq!(config.schedule.unmatched_day, UnmatchedDayPolicy::Keep);
        assert_eq!(config.schedule.uid_strategy, UidStrategy::Deterministic);
        assert_eq!(config.source.interval_minutes, Some(60));
    }

    #[test]
    fn test_defaults_without_config_file() {
        let cli = CliConfig::parse_from(["timetable-feed", "--dry-run"]);
        let config = cli.load().unwrap();

        assert!(cli.dry_run);
        assert!(config.source.url.is_empty());
        assert_eq!(config.schedule.unmatched_day, UnmatchedDayPolicy::Drop);
    }

    #[test]
    fn test_rejects_unknown_policy_flag() {
        let result = CliConfig::try_parse_from(["timetable-feed", "--unmatched-day", "ignore"]);
        assert!(result.is_err());
    }
}
