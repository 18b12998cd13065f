use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Feed request failed: {0}")]
    FetchError(#[from] reqwest::Error),

    #[error("Feed returned HTTP {status} for {url}")]
    FeedStatusError { url: String, status: u16 },

    #[error("Calendar parse error: {message}")]
    IcsParseError { message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Failed to write '{key}' to storage: {message}")]
    StorageError { key: String, message: String },

    #[error("Cannot place {date} {time} in timezone {timezone}")]
    LocalizationError {
        date: chrono::NaiveDate,
        time: chrono::NaiveTime,
        timezone: String,
    },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },
}

pub type Result<T> = std::result::Result<T, FeedError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Data,
    Storage,
    Configuration,
    Processing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl FeedError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            FeedError::FetchError(_) | FeedError::FeedStatusError { .. } => ErrorCategory::Network,
            FeedError::IcsParseError { .. } | FeedError::SerializationError(_) => {
                ErrorCategory::Data
            }
            FeedError::IoError(_) | FeedError::StorageError { .. } => ErrorCategory::Storage,
            FeedError::ConfigError { .. }
            | FeedError::InvalidConfigValueError { .. }
            | FeedError::MissingConfigError { .. }
            | FeedError::ConfigValidationError { .. } => ErrorCategory::Configuration,
            FeedError::LocalizationError { .. } => ErrorCategory::Processing,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            // 網路問題通常重試即可
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Data | ErrorCategory::Processing => ErrorSeverity::High,
            ErrorCategory::Storage => ErrorSeverity::High,
            ErrorCategory::Configuration => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            FeedError::FetchError(_) => {
                "Check network connectivity and the feed URL, then run again"
            }
            FeedError::FeedStatusError { .. } => {
                "Verify the feed URL is still valid; private feed links can expire"
            }
            FeedError::IcsParseError { .. } => {
                "Open the feed URL in a browser and confirm it returns an iCalendar document"
            }
            FeedError::IoError(_) => "Check that the output directory exists and is writable",
            FeedError::SerializationError(_) => {
                "Report this run; the generated data could not be encoded"
            }
            FeedError::StorageError { .. } => {
                "Check bucket name, region and access keys; the history snapshot may already exist"
            }
            FeedError::LocalizationError { .. } => {
                "Move the affected slot out of the timezone's daylight-saving gap"
            }
            FeedError::ConfigError { .. }
            | FeedError::InvalidConfigValueError { .. }
            | FeedError::ConfigValidationError { .. } => {
                "Fix the configuration file or flags and retry"
            }
            FeedError::MissingConfigError { .. } => {
                "Provide the missing value via the config file, a flag or the environment"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network => format!("Could not download the source calendar: {}", self),
            ErrorCategory::Data => format!("The source calendar could not be read: {}", self),
            ErrorCategory::Storage => format!("Publishing the calendar failed: {}", self),
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Processing => format!("Schedule expansion failed: {}", self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_errors_are_critical() {
        let err = FeedError::MissingConfigError {
            field: "source.url".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert!(err.user_friendly_message().contains("source.url"));
    }

    #[test]
    fn test_feed_status_is_retryable_network_error() {
        let err = FeedError::FeedStatusError {
            url: "https://example.com/feed.ics".to_string(),
            status: 503,
        };
        assert_eq!(err.category(), ErrorCategory::Network);
        assert_eq!(err.severity(), ErrorSeverity::Medium);
        assert_eq!(
            err.to_string(),
            "Feed returned HTTP 503 for https://example.com/feed.ics"
        );
    }

    #[test]
    fn test_storage_error_mentions_key() {
        let err = FeedError::StorageError {
            key: "generated_calendar.ics".to_string(),
            message: "access denied".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert!(err.to_string().contains("generated_calendar.ics"));
    }
}
