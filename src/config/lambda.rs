use crate::config::toml_config::TomlConfig;
use crate::core::expander::UidStrategy;
use crate::core::rewriter::UnmatchedDayPolicy;
use crate::utils::error::{FeedError, Result};
use std::env;

/// Lambda settings come from the function environment, optionally on top of
/// a bundled TOML file named by `CONFIG_PATH`.
#[derive(Debug, Clone, Default)]
pub struct LambdaConfig {
    pub config_path: Option<String>,
    pub feed_url: Option<String>,
    pub s3_bucket: Option<String>,
    pub s3_prefix: Option<String>,
    pub s3_region: Option<String>,
    pub s3_access_key: Option<String>,
    pub s3_secret_key: Option<String>,
    pub s3_endpoint_url: Option<String>,
    pub public_base_url: Option<String>,
    pub unmatched_day: Option<String>,
    pub uid_strategy: Option<String>,
}

impl LambdaConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            config_path: lookup("CONFIG_PATH"),
            feed_url: lookup("FEED_URL"),
            s3_bucket: lookup("S3_BUCKET"),
            s3_prefix: lookup("S3_PREFIX"),
            s3_region: lookup("S3_REGION"),
            s3_access_key: lookup("S3_ACCESS_KEY"),
            s3_secret_key: lookup("S3_SECRET_KEY"),
            s3_endpoint_url: lookup("S3_ENDPOINT_URL"),
            public_base_url: lookup("PUBLIC_BASE_URL"),
            unmatched_day: lookup("UNMATCHED_DAY"),
            uid_strategy: lookup("UID_STRATEGY"),
        }
    }

    /// Merges the environment over the bundled file. A bucket is required.
    pub fn resolve(&self) -> Result<TomlConfig> {
        let mut config = match &self.config_path {
            Some(path) => TomlConfig::from_file(path)?,
            None => TomlConfig::default(),
        };

        if let Some(url) = &self.feed_url {
            config.source.url = url.clone();
        }
        if let Some(bucket) = &self.s3_bucket {
            config.publish.bucket = Some(bucket.clone());
        }
        if let Some(prefix) = &self.s3_prefix {
            config.publish.key_prefix = prefix.clone();
        }
        if let Some(region) = &self.s3_region {
            config.publish.region = region.clone();
        }
        if self.s3_access_key.is_some() {
            config.publish.access_key = self.s3_access_key.clone();
        }
        if self.s3_secret_key.is_some() {
            config.publish.secret_key = self.s3_secret_key.clone();
        }
        if self.s3_endpoint_url.is_some() {
            config.publish.endpoint_url = self.s3_endpoint_url.clone();
            config.publish.force_path_style = true;
        }
        if self.public_base_url.is_some() {
            config.publish.public_base_url = self.public_base_url.clone();
        }
        if let Some(policy) = &self.unmatched_day {
            config.schedule.unmatched_day =
                policy
                    .parse::<UnmatchedDayPolicy>()
                    .map_err(|reason| FeedError::InvalidConfigValueError {
                        field: "UNMATCHED_DAY".to_string(),
                        value: policy.clone(),
                        reason,
                    })?;
        }
        if let Some(strategy) = &self.uid_strategy {
            config.schedule.uid_strategy =
                strategy
                    .parse::<UidStrategy>()
                    .map_err(|reason| FeedError::InvalidConfigValueError {
                        field: "UID_STRATEGY".to_string(),
                        value: strategy.clone(),
                        reason,
                    })?;
        }

        if config.publish.bucket.is_none() {
            return Err(FeedError::ConfigError {
                message: "S3_BUCKET environment variable is required".to_string(),
            });
        }

        Ok(config)
    }
}
