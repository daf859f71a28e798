//! System commands: liveness and monitoring.

mod metrics;
mod ping;

pub use metrics::MetricsCommand;
pub use ping::PingCommand;
