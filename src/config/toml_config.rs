use crate::core::expander::{ExpanderSettings, ScheduleExpander, UidStrategy};
use crate::core::rewriter::{FeedRewriter, UnmatchedDayPolicy};
use crate::core::ConfigProvider;
use crate::domain::model::{PeriodSlot, TimeTableVariant};
use crate::domain::rotation::{ClassRotationEntry, ClassRotationRegistry};
use crate::domain::timetable::TimeTableRegistry;
use crate::utils::error::{FeedError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub source: SourceConfig,
    pub schedule: ScheduleConfig,
    pub publish: PublishConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub url: String,
    pub timeout_seconds: Option<u64>,
    /// Desired re-run interval. Only honoured by the CLI loop.
    pub interval_minutes: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub timezone: String,
    pub reduced_weekday: String,
    pub marker_time: String,
    pub uid_domain: String,
    pub uid_strategy: UidStrategy,
    pub unmatched_day: UnmatchedDayPolicy,
    pub regular: Option<Vec<SlotConfig>>,
    pub reduced: Option<Vec<SlotConfig>>,
    pub rotation: Option<BTreeMap<String, BTreeMap<String, String>>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotConfig {
    pub start: String,
    pub end: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    /// Local directory target.
    pub output_path: Option<String>,
    /// S3 bucket target.
    pub bucket: Option<String>,
    pub region: String,
    pub key_prefix: String,
    pub endpoint_url: Option<String>,
    pub force_path_style: bool,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub public_base_url: Option<String>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            timezone: "Asia/Shanghai".to_string(),
            reduced_weekday: "Wednesday".to_string(),
            marker_time: "07:59".to_string(),
            uid_domain: "yourdomain.com".to_string(),
            uid_strategy: UidStrategy::default(),
            unmatched_day: UnmatchedDayPolicy::default(),
            regular: None,
            reduced: None,
            rotation: None,
        }
    }
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            output_path: None,
            bucket: None,
            region: "us-east-1".to_string(),
            key_prefix: String::new(),
            endpoint_url: None,
            force_path_style: false,
            access_key: None,
            secret_key: None,
            public_base_url: None,
        }
    }
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(FeedError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| FeedError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${S3_ACCESS_KEY})；未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| FeedError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn interval(&self) -> Option<Duration> {
        self.source
            .interval_minutes
            .map(|minutes| Duration::from_secs(minutes * 60))
    }

    pub fn build_rewriter(&self) -> Result<FeedRewriter> {
        self.schedule.build_rewriter()
    }
}

impl ScheduleConfig {
    pub fn expander_settings(&self) -> Result<ExpanderSettings> {
        Ok(ExpanderSettings {
            timezone: validation::parse_timezone("schedule.timezone", &self.timezone)?,
            marker_time: validation::parse_time_of_day("schedule.marker_time", &self.marker_time)?,
            uid_strategy: self.uid_strategy,
            uid_domain: self.uid_domain.clone(),
        })
    }

    pub fn timetable(&self) -> Result<TimeTableRegistry> {
        let reduced_weekday =
            validation::parse_weekday("schedule.reduced_weekday", &self.reduced_weekday)?;
        let defaults = TimeTableRegistry::default();

        let regular = match &self.regular {
            Some(slots) => parse_slots("schedule.regular", slots)?,
            None => defaults.slots(TimeTableVariant::Regular).to_vec(),
        };
        let reduced = match &self.reduced {
            Some(slots) => parse_slots("schedule.reduced", slots)?,
            None => defaults.slots(TimeTableVariant::Reduced).to_vec(),
        };

        TimeTableRegistry::new(regular, reduced, reduced_weekday)
    }

    pub fn rotation(&self) -> Result<ClassRotationRegistry> {
        let Some(rotation) = &self.rotation else {
            return Ok(ClassRotationRegistry::default());
        };

        let mut entries = BTreeMap::new();
        for (day_id, classes) in rotation {
            entries.insert(day_id.clone(), ClassRotationEntry::new(classes.clone())?);
        }
        Ok(ClassRotationRegistry::new(entries))
    }

    pub fn build_rewriter(&self) -> Result<FeedRewriter> {
        let timetable = self.timetable()?;
        let rotation = self.rotation()?;

        for (day_id, period) in rotation.coverage_gaps(&timetable) {
            tracing::warn!(
                "⚠️ {} has no class for {}; the raw period label will be used",
                day_id,
                period
            );
        }

        let expander = ScheduleExpander::new(timetable, rotation, self.expander_settings()?);
        Ok(FeedRewriter::new(expander, self.unmatched_day))
    }
}

fn parse_slots(field: &str, slots: &[SlotConfig]) -> Result<Vec<PeriodSlot>> {
    slots
        .iter()
        .enumerate()
        .map(|(index, slot)| {
            let field = format!("{}[{}]", field, index);
            Ok(PeriodSlot::new(
                validation::parse_time_of_day(&format!("{}.start", field), &slot.start)?,
                validation::parse_time_of_day(&format!("{}.end", field), &slot.end)?,
                slot.label.clone(),
            ))
        })
        .collect()
}

fn reject_unresolved(field: &str, value: &Option<String>) -> Result<()> {
    match value {
        Some(v) if v.contains("${") => Err(FeedError::MissingConfigError {
            field: format!("{} (environment variable in '{}' is not set)", field, v),
        }),
        _ => Ok(()),
    }
}

impl ConfigProvider for TomlConfig {
    fn feed_url(&self) -> &str {
        &self.source.url
    }

    fn key_prefix(&self) -> &str {
        &self.publish.key_prefix
    }

    fn request_timeout(&self) -> Option<Duration> {
        self.source.timeout_seconds.map(Duration::from_secs)
    }

    fn public_base_url(&self) -> Option<String> {
        self.publish.public_base_url.clone().or_else(|| {
            self.publish
                .bucket
                .as_ref()
                .map(|bucket| format!("https://s3.amazonaws.com/{}", bucket))
        })
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_url("source.url", &self.source.url)?;
        if let Some(timeout) = self.source.timeout_seconds {
            validation::validate_range("source.timeout_seconds", timeout, 1, 300)?;
        }
        if let Some(minutes) = self.source.interval_minutes {
            validation::validate_positive_number("source.interval_minutes", minutes, 1)?;
        }

        // 排程設定在建立時就會完整驗證
        self.schedule.expander_settings()?;
        self.schedule.timetable()?;
        self.schedule.rotation()?;
        validation::validate_non_empty_string("schedule.uid_domain", &self.schedule.uid_domain)?;

        if let Some(output_path) = &self.publish.output_path {
            validation::validate_path("publish.output_path", output_path)?;
        }
        if let Some(bucket) = &self.publish.bucket {
            validation::validate_s3_bucket_name("publish.bucket", bucket)?;
            validation::validate_aws_region("publish.region", &self.publish.region)?;
        }
        if let Some(endpoint) = &self.publish.endpoint_url {
            validation::validate_url("publish.endpoint_url", endpoint)?;
        }
        reject_unresolved("publish.access_key", &self.publish.access_key)?;
        reject_unresolved("publish.secret_key", &self.publish.secret_key)?;
        if self.publish.access_key.is_some() != self.publish.secret_key.is_some() {
            return Err(FeedError::ConfigValidationError {
                field: "publish.access_key".to_string(),
                message: "access_key and secret_key must be given together".to_string(),
            });
        }

        tracing::debug!("✅ Configuration validation passed");
        Ok(())
    }
}
