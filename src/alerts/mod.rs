/// Alert sinks and rate limiting
pub mod alert_sink;
pub mod rate_limiter;

pub use alert_sink::{sink_from_config, AlertSink, CommandSink, LogSink, ThrottledSink};
pub use rate_limiter::RateLimiter;
