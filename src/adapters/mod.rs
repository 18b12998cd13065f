// Adapters layer: concrete implementations for external systems (feed http, storage).

pub mod feed;
pub mod local;
#[cfg(feature = "s3")]
pub mod s3;

pub use feed::FeedClient;
pub use local::LocalStorage;
#[cfg(feature = "s3")]
pub use s3::S3Storage;
