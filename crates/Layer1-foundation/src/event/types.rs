//! Event Types - 리스너/필터 종류와 핸들러 타입

use crate::validation::ValidationResult;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ============================================================================
// Handler / Filter
// ============================================================================

/// 리스너 및 전역 핸들러
pub type Handler = Arc<dyn Fn(Arc<ValidationResult>) + Send + Sync>;

/// 디스패치 거부 게이트 (`false`면 veto)
pub type Filter = Arc<dyn Fn(&ValidationResult) -> bool + Send + Sync>;

/// 클로저로 `Handler` 생성
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(Arc<ValidationResult>) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// 이름이 붙은 전역 핸들러
#[derive(Clone)]
pub struct NamedHandler {
    pub name: String,
    pub handler: Handler,
}

impl std::fmt::Debug for NamedHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamedHandler").field("name", &self.name).finish()
    }
}

// ============================================================================
// ListenerKind
// ============================================================================

/// 리스너 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListenerKind {
    /// 검증 전
    Before,
    /// 검증 후
    After,
    /// 검증 에러
    Error,
    /// 검증 성공
    Success,
    /// `register_listener` 기본값
    Default,
}

impl ListenerKind {
    pub const ALL: [ListenerKind; 5] = [
        Self::Before,
        Self::After,
        Self::Error,
        Self::Success,
        Self::Default,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Before => "before",
            Self::After => "after",
            Self::Error => "error",
            Self::Success => "success",
            Self::Default => "default",
        }
    }
}

impl std::fmt::Display for ListenerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// FilterKind
// ============================================================================

/// 필터 종류 (종류당 하나)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    Event,
    Listener,
    Result,
}

impl FilterKind {
    pub const ALL: [FilterKind; 3] = [Self::Event, Self::Listener, Self::Result];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Event => "event",
            Self::Listener => "listener",
            Self::Result => "result",
        }
    }
}

impl std::fmt::Display for FilterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_strings() {
        let names: Vec<_> = ListenerKind::ALL.iter().map(|k| k.as_str()).collect();
        assert_eq!(names, vec!["before", "after", "error", "success", "default"]);
        assert_eq!(FilterKind::Result.to_string(), "result");
    }

    #[test]
    fn test_kind_serde() {
        assert_eq!(serde_json::to_string(&ListenerKind::After).unwrap(), "\"after\"");
        let kind: FilterKind = serde_json::from_str("\"listener\"").unwrap();
        assert_eq!(kind, FilterKind::Listener);
    }
}
