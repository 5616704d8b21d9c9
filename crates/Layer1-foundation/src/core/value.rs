//! Value - 공유 컨텍스트 / 메타데이터 / validator 인자용 태그 타입
//!
//! 임의 타입 대신 실제로 저장되는 종류만 열거합니다.

use crate::validation::ValidationResult;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// 메타데이터 맵
pub type Metadata = HashMap<String, Value>;

#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(Metadata),
    /// 중첩된 검증 결과
    Result(Arc<ValidationResult>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Metadata> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_result(&self) -> Option<&Arc<ValidationResult>> {
        match self {
            Value::Result(r) => Some(r),
            _ => None,
        }
    }

    /// JSON 표현 (로그 컨텍스트, 스냅샷용)
    ///
    /// 중첩 결과는 스냅샷으로 펼칩니다. 이미 펼치는 중인 결과(순환)는 id 문자열로 남습니다.
    pub fn to_json(&self) -> serde_json::Value {
        self.to_json_visiting(&mut HashSet::new())
    }

    /// `visiting`: 현재 경로에서 펼치는 중인 결과의 포인터
    pub(crate) fn to_json_visiting(&self, visiting: &mut HashSet<usize>) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(i) => Json::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::Str(s) => Json::String(s.clone()),
            Value::List(items) => Json::Array(items.iter().map(|v| v.to_json_visiting(visiting)).collect()),
            Value::Map(m) => Json::Object(
                m.iter()
                    .map(|(k, v)| (k.clone(), v.to_json_visiting(visiting)))
                    .collect(),
            ),
            Value::Result(r) => {
                let key = Arc::as_ptr(r) as usize;
                if !visiting.insert(key) {
                    return Json::String(r.id().to_string());
                }
                let json = serde_json::to_value(r.snapshot_visiting(visiting)).unwrap_or(Json::Null);
                visiting.remove(&key);
                json
            }
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            // 결과는 동일 인스턴스일 때만 같음
            (Value::Result(a), Value::Result(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

// ============================================================================
// From 구현
// ============================================================================

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<usize> for Value {
    fn from(i: usize) -> Self {
        Value::Int(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<Metadata> for Value {
    fn from(m: Metadata) -> Self {
        Value::Map(m)
    }
}

impl From<Arc<ValidationResult>> for Value {
    fn from(r: Arc<ValidationResult>) -> Self {
        Value::Result(r)
    }
}

impl From<ValidationResult> for Value {
    fn from(r: ValidationResult) -> Self {
        Value::Result(Arc::new(r))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_accessors() {
        assert_eq!(Value::from(3).as_i64(), Some(3));
        assert_eq!(Value::from(3).as_f64(), Some(3.0));
        assert_eq!(Value::from("x").as_str(), Some("x"));
        assert_eq!(Value::from(true).as_bool(), Some(true));
        assert!(Value::default().is_null());
        assert!(Value::from("x").as_i64().is_none());
    }

    #[test]
    fn test_to_json() {
        let mut map = Metadata::new();
        map.insert("n".into(), Value::from(1));
        map.insert("tags".into(), Value::from(vec![Value::from("a"), Value::Null]));

        assert_eq!(Value::Map(map).to_json(), json!({"n": 1, "tags": ["a", null]}));
        assert_eq!(Value::Float(f64::NAN).to_json(), json!(null));
    }

    #[test]
    fn test_result_equality_is_identity() {
        let r = Arc::new(ValidationResult::valid("ok"));
        let a = Value::Result(r.clone());
        let b = Value::Result(r);
        let c = Value::from(ValidationResult::valid("ok"));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
