pub mod etl;
pub mod expander;
pub mod ics;
pub mod publisher;
pub mod rewriter;

pub use crate::domain::model::{PublishReport, RewriteOutcome, RunReport};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
