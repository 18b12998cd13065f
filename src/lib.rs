pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::{FeedClient, LocalStorage};
#[cfg(feature = "s3")]
pub use adapters::S3Storage;
pub use app::pipelines::CalendarPipeline;
#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::{LambdaConfig, TomlConfig};
pub use core::etl::EtlEngine;
pub use core::rewriter::FeedRewriter;
pub use utils::error::{FeedError, Result};
