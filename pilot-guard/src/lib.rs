pub mod rate_limit;
pub mod sensitive;
pub mod url_filter;

// Re-export key types for convenience.
pub use rate_limit::{RATE_WINDOW, RateLimiter, RateLimits};
pub use sensitive::SensitiveActionClassifier;
pub use url_filter::{UrlDecision, UrlGuard};
