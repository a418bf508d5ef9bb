pub mod cache_key;
pub mod model;
pub mod retry;
pub mod service;

pub use cache_key::cache_key;
pub use model::{LineOutcome, LineStatus, PendingLine, PrefetchReport, PrefetchSettings};
pub use retry::{BackoffStrategy, RetryDecision, RetryPolicy, RetryState};
pub use service::PrefetchService;
