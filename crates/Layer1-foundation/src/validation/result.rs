//! ValidationResult - 검증 결과 레코드
//!
//! 여러 소비자가 `Arc`로 공유합니다. 읽기는 공유 락, 메타데이터 변경은
//! 배타 락 아래에서만 일어납니다.

use crate::core::{Metadata, Reference, Value};
use crate::logging::{HasLogger, LogLevel, LogSink};
use crate::sync::SyncContext;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

/// 메타데이터 전체를 교체하는 예약 키
pub const METADATA_ALL: &str = "all";

/// 결과 콜백
pub type ResultCallback = Arc<dyn Fn(&Arc<ValidationResult>) + Send + Sync>;

struct ResultState {
    reference: Reference,
    is_valid: bool,
    message: String,
    error: Option<Arc<anyhow::Error>>,
    metadata: Metadata,
    callback: Option<ResultCallback>,
}

pub struct ValidationResult {
    state: SyncContext<ResultState>,
    created_at: DateTime<Utc>,
}

impl ValidationResult {
    /// 새 결과 생성 (`metadata`가 없으면 빈 맵)
    pub fn new(
        is_valid: bool,
        message: impl Into<String>,
        metadata: Option<Metadata>,
        error: Option<anyhow::Error>,
    ) -> Self {
        Self::from_parts(is_valid, message.into(), metadata, error.map(Arc::new))
    }

    pub fn valid(message: impl Into<String>) -> Self {
        Self::new(true, message, None, None)
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(false, message, None, None)
    }

    /// 에러로부터 실패 결과 생성 (메시지 = 에러 텍스트)
    pub fn failed(error: anyhow::Error) -> Self {
        let message = error.to_string();
        Self::new(false, message, None, Some(error))
    }

    pub(crate) fn from_parts(
        is_valid: bool,
        message: String,
        metadata: Option<Metadata>,
        error: Option<Arc<anyhow::Error>>,
    ) -> Self {
        Self {
            state: SyncContext::with_state(ResultState {
                reference: Reference::new("ValidationResult"),
                is_valid,
                message,
                error,
                metadata: metadata.unwrap_or_default(),
                callback: None,
            }),
            created_at: Utc::now(),
        }
    }

    pub fn with_logger(mut self, logger: Arc<dyn LogSink>) -> Self {
        self.state = self.state.with_logger(logger);
        self
    }

    /// 메타데이터 한 항목을 추가한 채로 반환 (빌더)
    pub fn with_metadata(self, key: &str, value: impl Into<Value>) -> Self {
        self.set_metadata(key, value);
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn id(&self) -> Uuid {
        self.state.read().reference.id()
    }

    pub fn name(&self) -> String {
        self.state.read().reference.name().to_string()
    }

    pub fn set_name(&self, name: impl Into<String>) {
        self.state.lock().reference.set_name(name);
    }

    pub fn reference(&self) -> Reference {
        self.state.read().reference.clone()
    }

    pub fn is_valid(&self) -> bool {
        self.state.read().is_valid
    }

    pub fn message(&self) -> String {
        self.state.read().message.clone()
    }

    pub fn error(&self) -> Option<Arc<anyhow::Error>> {
        self.state.read().error.clone()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    // ========================================================================
    // Metadata
    // ========================================================================

    /// 빈 키는 전체 맵을 `Value::Map`으로 반환
    pub fn metadata(&self, key: &str) -> Option<Value> {
        let state = self.state.read();
        if key.is_empty() {
            return Some(Value::Map(state.metadata.clone()));
        }
        state.metadata.get(key).cloned()
    }

    /// 메타데이터 설정
    ///
    /// - 빈 키, `Value::Null`, 자기 자신을 가리키는 `Value::Result`: 무시
    /// - `"all"` + `Value::Map` / `Value::Result`: 맵 전체 교체
    /// - 그 외: 단일 항목 삽입/덮어쓰기
    pub fn set_metadata(&self, key: &str, value: impl Into<Value>) {
        let value = value.into();
        if key.is_empty() || value.is_null() {
            return;
        }
        if let Value::Result(other) = &value {
            if std::ptr::eq(Arc::as_ptr(other), self) {
                if key != METADATA_ALL {
                    self.state.logger().log(
                        LogLevel::Warn,
                        "Result cannot contain itself",
                        &json!({ "key": key }),
                    );
                }
                return;
            }
        }

        if key == METADATA_ALL {
            match value {
                Value::Map(map) => {
                    self.state.lock().metadata = map;
                    return;
                }
                Value::Result(other) => {
                    // 상대 락을 먼저 풀고 나서 자기 락을 잡음
                    let map = other.metadata_map();
                    self.state.lock().metadata = map;
                    return;
                }
                other => {
                    self.state.lock().metadata.insert(key.to_string(), other);
                    return;
                }
            }
        }

        self.state.lock().metadata.insert(key.to_string(), value);
    }

    pub fn metadata_keys(&self) -> Vec<String> {
        self.state.read().metadata.keys().cloned().collect()
    }

    fn metadata_map(&self) -> Metadata {
        self.state.read().metadata.clone()
    }

    // ========================================================================
    // Callback
    // ========================================================================

    pub fn set_callback<F>(&self, callback: F)
    where
        F: Fn(&Arc<ValidationResult>) + Send + Sync + 'static,
    {
        self.state.lock().callback = Some(Arc::new(callback));
    }

    pub fn has_callback(&self) -> bool {
        self.state.read().callback.is_some()
    }

    /// 콜백이 있으면 호출하고 `true` (락 밖에서 실행)
    pub fn run_callback(self: &Arc<Self>) -> bool {
        let callback = self.state.read().callback.clone();
        match callback {
            Some(cb) => {
                cb(self);
                true
            }
            None => false,
        }
    }

    /// 직렬화 가능한 사본
    pub fn snapshot(&self) -> ResultSnapshot {
        let mut visiting = HashSet::from([self as *const Self as usize]);
        self.snapshot_visiting(&mut visiting)
    }

    /// 락을 푼 뒤에 메타데이터를 펼침 (중첩 결과가 자기 락을 다시 잡음)
    pub(crate) fn snapshot_visiting(&self, visiting: &mut HashSet<usize>) -> ResultSnapshot {
        let (id, name, is_valid, message, error, metadata) = {
            let state = self.state.read();
            (
                state.reference.id(),
                state.reference.name().to_string(),
                state.is_valid,
                state.message.clone(),
                state.error.as_ref().map(|e| e.to_string()),
                state.metadata.clone(),
            )
        };

        ResultSnapshot {
            id,
            name,
            is_valid,
            message,
            error,
            metadata: Value::Map(metadata).to_json_visiting(visiting),
            created_at: self.created_at,
        }
    }
}

impl Clone for ValidationResult {
    /// 같은 Reference를 가진 독립 사본
    fn clone(&self) -> Self {
        let state = self.state.read();
        Self {
            state: SyncContext::with_state(ResultState {
                reference: state.reference.clone(),
                is_valid: state.is_valid,
                message: state.message.clone(),
                error: state.error.clone(),
                metadata: state.metadata.clone(),
                callback: state.callback.clone(),
            })
            .with_logger(self.state.logger()),
            created_at: self.created_at,
        }
    }
}

impl HasLogger for ValidationResult {
    fn logger(&self) -> Arc<dyn LogSink> {
        self.state.logger()
    }
}

impl std::fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        if state.is_valid {
            return f.write_str("Validation is valid");
        }
        match &state.error {
            Some(e) => write!(f, "Validation is invalid: {}", e),
            None => write!(f, "Validation is invalid: {}", state.message),
        }
    }
}

impl std::fmt::Debug for ValidationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("ValidationResult")
            .field("reference", &state.reference)
            .field("is_valid", &state.is_valid)
            .field("message", &state.message)
            .field("error", &state.error.as_ref().map(|e| e.to_string()))
            .field("metadata_keys", &state.metadata.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// `ValidationResult::snapshot()`의 직렬화 형태
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultSnapshot {
    pub id: Uuid,
    pub name: String,
    pub is_valid: bool,
    pub message: String,
    pub error: Option<String>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn test_display() {
        assert_eq!(ValidationResult::valid("ok").to_string(), "Validation is valid");
        assert_eq!(
            ValidationResult::invalid("too short").to_string(),
            "Validation is invalid: too short"
        );
        let failed = ValidationResult::new(
            false,
            "message",
            None,
            Some(anyhow::anyhow!("boom")),
        );
        assert_eq!(failed.to_string(), "Validation is invalid: boom");
    }

    #[test]
    fn test_defaults() {
        let r = ValidationResult::invalid("nope");
        assert_eq!(r.name(), "ValidationResult");
        assert!(!r.is_valid());
        assert!(r.error().is_none());
        assert_eq!(r.metadata(""), Some(Value::Map(Metadata::new())));
        assert!(r.metadata_keys().is_empty());
    }

    #[test]
    fn test_failed_uses_error_text() {
        let r = ValidationResult::failed(anyhow::anyhow!("bad format"));
        assert_eq!(r.message(), "bad format");
        assert_eq!(r.error().unwrap().to_string(), "bad format");
    }

    #[test]
    fn test_set_metadata_rules() {
        let r = ValidationResult::valid("ok");
        r.set_metadata("", 1);
        r.set_metadata("ignored", Value::Null);
        assert!(r.metadata_keys().is_empty());

        r.set_metadata("field", "email");
        r.set_metadata("field", "phone");
        assert_eq!(r.metadata("field"), Some(Value::from("phone")));
        assert_eq!(r.metadata("missing"), None);
    }

    #[test]
    fn test_all_replaces_with_map() {
        let r = ValidationResult::valid("ok").with_metadata("old", 1);

        let mut replacement = Metadata::new();
        replacement.insert("new".into(), Value::from(2));
        r.set_metadata(METADATA_ALL, replacement);

        assert_eq!(r.metadata_keys(), vec!["new".to_string()]);
    }

    #[test]
    fn test_all_replaces_with_other_result() {
        let source = Arc::new(ValidationResult::valid("src").with_metadata("copied", true));
        let target = ValidationResult::valid("dst").with_metadata("old", 1);

        target.set_metadata(METADATA_ALL, source.clone());
        assert_eq!(target.metadata("copied"), Some(Value::Bool(true)));
        assert_eq!(target.metadata("old"), None);
    }

    #[test]
    fn test_all_with_scalar_is_plain_insert() {
        let r = ValidationResult::valid("ok").with_metadata("keep", 1);
        r.set_metadata(METADATA_ALL, "scalar");
        assert_eq!(r.metadata("all"), Some(Value::from("scalar")));
        assert_eq!(r.metadata("keep"), Some(Value::from(1)));
    }

    #[test]
    fn test_all_replacement_is_atomic_for_readers() {
        let r = Arc::new(ValidationResult::valid("ok"));
        let mut a = Metadata::new();
        let mut b = Metadata::new();
        for i in 0..16 {
            a.insert(format!("a{}", i), Value::from(i));
            b.insert(format!("b{}", i), Value::from(i));
        }

        let writer = {
            let r = r.clone();
            thread::spawn(move || {
                for n in 0..500 {
                    let next = if n % 2 == 0 { a.clone() } else { b.clone() };
                    r.set_metadata(METADATA_ALL, next);
                }
            })
        };

        for _ in 0..500 {
            let keys = r.metadata_keys();
            let from_a = keys.iter().filter(|k| k.starts_with('a')).count();
            let from_b = keys.iter().filter(|k| k.starts_with('b')).count();
            assert!(from_a == 0 || from_b == 0, "mixed metadata observed");
        }
        writer.join().unwrap();
    }

    #[test]
    fn test_callback() {
        let r = Arc::new(ValidationResult::invalid("x"));
        assert!(!r.run_callback());

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        r.set_callback(move |res| {
            assert!(!res.is_valid());
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert!(r.has_callback());
        assert!(r.run_callback());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_clone_keeps_reference_and_detaches_metadata() {
        let original = ValidationResult::valid("ok").with_metadata("k", 1);
        let copy = original.clone();
        copy.set_metadata("k", 2);

        assert_eq!(copy.id(), original.id());
        assert_eq!(original.metadata("k"), Some(Value::from(1)));
    }

    #[test]
    fn test_snapshot_serializes() {
        let r = ValidationResult::new(false, "too short", None, Some(anyhow::anyhow!("len < 3")))
            .with_metadata("min", 3);
        let json = serde_json::to_value(r.snapshot()).unwrap();

        assert_eq!(json["is_valid"], false);
        assert_eq!(json["error"], "len < 3");
        assert_eq!(json["metadata"]["min"], 3);
        assert_eq!(json["name"], "ValidationResult");
    }

    #[test]
    fn test_self_reference_is_ignored() {
        let sink = Arc::new(crate::logging::MemorySink::new());
        let r = Arc::new(ValidationResult::valid("ok").with_logger(sink.clone()));
        r.set_metadata("parent", r.clone());

        assert!(r.metadata("parent").is_none());
        assert_eq!(Arc::strong_count(&r), 1);
        assert!(sink.contains("cannot contain itself"));

        let json = serde_json::to_value(r.snapshot()).unwrap();
        assert_eq!(json["metadata"], serde_json::json!({}));
    }

    #[test]
    fn test_snapshot_renders_cycle_as_id() {
        let a = Arc::new(ValidationResult::valid("a"));
        let b = Arc::new(ValidationResult::invalid("b"));
        a.set_metadata("child", b.clone());
        b.set_metadata("parent", a.clone());

        let json = serde_json::to_value(a.snapshot()).unwrap();
        assert_eq!(json["metadata"]["child"]["message"], "b");
        assert_eq!(json["metadata"]["child"]["metadata"]["parent"], a.id().to_string());

        // 순환 해제
        b.set_metadata(METADATA_ALL, Metadata::new());
    }
}
