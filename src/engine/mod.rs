//! Run orchestration: concurrent fetch, timeouts, retry.

pub mod orchestrator;
pub mod retry;

pub use orchestrator::SentimentOrchestrator;
pub use retry::{with_retry, RetryPolicy};
