pub mod http;
pub mod rate_limit;

pub use rate_limit::AdaptiveRateLimiter;
