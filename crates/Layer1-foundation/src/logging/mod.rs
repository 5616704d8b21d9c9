//! Logging - 로그 싱크와 tracing 초기화
//!
//! ```ignore
//! use plane_foundation::logging::{init_tracing, MemorySink};
//! use plane_foundation::LoggingConfig;
//!
//! init_tracing(&LoggingConfig::default());
//!
//! let sink = Arc::new(MemorySink::new());
//! let ctx = SyncContext::new().with_logger(sink.clone());
//! ```

pub mod sink;

pub use sink::{default_sink, HasLogger, LogLevel, LogRecord, LogSink, MemorySink, TracingSink};

use crate::config::LoggingConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// 전역 tracing subscriber 설치
///
/// `RUST_LOG`가 있으면 우선합니다. 이미 설치되어 있으면 `false`.
pub fn init_tracing(config: &LoggingConfig) -> bool {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.level)),
        )
        .with(tracing_subscriber::fmt::layer().with_target(config.with_target))
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_idempotent() {
        let config = LoggingConfig::default();
        let _ = init_tracing(&config);
        assert!(!init_tracing(&config));
    }
}
