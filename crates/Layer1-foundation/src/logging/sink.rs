//! Log Sink - 코어 컴포넌트가 사용하는 로깅 경계
//!
//! 모든 컴포넌트는 생성 시 `LogSink`를 주입받습니다. 전역 로거는 없습니다.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

// ============================================================================
// LogLevel
// ============================================================================

/// 로그 레벨
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Info,
    Debug,
    Error,
    Warn,
    Notice,
    Success,
    Fatal,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Notice => "notice",
            Self::Success => "success",
            Self::Fatal => "fatal",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// LogSink Trait
// ============================================================================

/// 로그 싱크
///
/// Fire-and-forget. 코어는 일부 경로에서 락을 잡은 채 호출하므로
/// 구현체는 절대 무기한 블로킹하면 안 됩니다.
pub trait LogSink: Send + Sync {
    fn log(&self, level: LogLevel, message: &str, context: &Value);
}

/// 로거를 노출하는 컴포넌트 (리플렉션 대신 명시적 capability)
pub trait HasLogger {
    fn logger(&self) -> Arc<dyn LogSink>;
}

/// 기본 싱크 생성
pub fn default_sink() -> Arc<dyn LogSink> {
    Arc::new(TracingSink::new())
}

// ============================================================================
// TracingSink
// ============================================================================

/// `tracing` 매크로로 전달하는 싱크
#[derive(Debug, Clone, Default)]
pub struct TracingSink {
    component: Option<String>,
}

impl TracingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// 컴포넌트 이름을 모든 이벤트에 붙임
    pub fn with_component(component: impl Into<String>) -> Self {
        Self {
            component: Some(component.into()),
        }
    }
}

impl LogSink for TracingSink {
    fn log(&self, level: LogLevel, message: &str, context: &Value) {
        let component = self.component.as_deref().unwrap_or("plane");
        match level {
            LogLevel::Debug => debug!(component, context = %context, "{}", message),
            LogLevel::Info => info!(component, context = %context, "{}", message),
            LogLevel::Notice | LogLevel::Success => {
                info!(component, severity = level.as_str(), context = %context, "{}", message)
            }
            LogLevel::Warn => warn!(component, context = %context, "{}", message),
            LogLevel::Error => error!(component, context = %context, "{}", message),
            LogLevel::Fatal => {
                error!(component, severity = level.as_str(), context = %context, "{}", message)
            }
        }
    }
}

// ============================================================================
// MemorySink
// ============================================================================

/// 기록된 로그 항목
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRecord {
    pub level: LogLevel,
    pub message: String,
    pub context: Value,
}

/// 메모리에 로그를 쌓는 싱크 (테스트/임베딩용)
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<LogRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    /// 특정 레벨의 항목 수
    pub fn count(&self, level: LogLevel) -> usize {
        self.records.lock().iter().filter(|r| r.level == level).count()
    }

    /// 메시지에 `needle`을 포함하는 항목이 있는지
    pub fn contains(&self, needle: &str) -> bool {
        self.records.lock().iter().any(|r| r.message.contains(needle))
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl LogSink for MemorySink {
    fn log(&self, level: LogLevel, message: &str, context: &Value) {
        self.records.lock().push(LogRecord {
            level,
            message: message.to_string(),
            context: context.clone(),
        });
    }
}
