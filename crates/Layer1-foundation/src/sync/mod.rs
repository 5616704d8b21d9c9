//! Sync - 동기화 프리미티브
//!
//! - `context.rs`: SyncContext (락, 조건 변수, predicate, wait-group)
//! - `wait_group.rs`: WaitGroup (복제 가능한 카운터 핸들)
//!
//! 모든 상태는 프로세스 메모리 안에만 존재합니다.

pub mod context;
pub mod wait_group;

pub use context::{SharedPredicate, SyncContext};
pub use wait_group::{WaitGroup, WaitGroupGuard};
