//! Core Module - 공용 식별자와 값 타입
//!
//! - `reference.rs`: 엔티티 식별자 (Reference)
//! - `value.rs`: 공유 컨텍스트/메타데이터 값 (Value, Metadata)

pub mod reference;
pub mod value;

pub use reference::Reference;
pub use value::{Metadata, Value};
