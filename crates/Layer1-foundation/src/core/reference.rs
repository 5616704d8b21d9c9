//! Reference - 소유 엔티티의 고유 식별자
//!
//! 리스너 맵의 키로도 쓰이므로 동등성/해시는 id만 기준으로 합니다.

use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use std::panic::Location;
use uuid::Uuid;

/// 고유 id + 사람이 읽을 수 있는 이름
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reference {
    id: Uuid,
    name: String,
}

impl Reference {
    /// 새 Reference 생성
    ///
    /// 이름이 비어 있으면 호출 위치(`file:line`)로 채웁니다.
    #[track_caller]
    pub fn new(name: impl Into<String>) -> Self {
        let mut name = name.into();
        if name.is_empty() {
            let caller = Location::caller();
            name = format!("{}:{}", caller.file(), caller.line());
        }
        Self {
            id: Uuid::new_v4(),
            name,
        }
    }

    /// 알려진 id로 생성
    #[track_caller]
    pub fn with_id(id: Uuid, name: impl Into<String>) -> Self {
        let mut reference = Self::new(name);
        reference.id = id;
        reference
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }
}

impl PartialEq for Reference {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Reference {}

impl Hash for Reference {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl std::fmt::Display for Reference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ID: {}, Name: {}", self.id, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_reference_ids_unique() {
        let a = Reference::new("orderCreated");
        let b = Reference::new("orderCreated");
        assert_ne!(a, b);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_empty_name_uses_call_site() {
        let r = Reference::new("");
        assert!(r.name().contains("reference.rs:"), "got {}", r.name());
    }

    #[test]
    fn test_display_format() {
        let id = Uuid::new_v4();
        let r = Reference::with_id(id, "svc");
        assert_eq!(r.to_string(), format!("ID: {}, Name: svc", id));
    }

    #[test]
    fn test_rename_keeps_map_identity() {
        let mut r = Reference::new("before");
        let mut map = HashMap::new();
        map.insert(r.clone(), 1);

        r.set_name("after");
        assert_eq!(r.name(), "after");
        assert_eq!(map.get(&r), Some(&1));
    }
}
