//! Event System - 검증 결과 발행/구독
//!
//! ## 아키텍처
//!
//! ```text
//! ┌──────────────────────── ListenerRegistry ─────────────────────────┐
//! │  listeners: Reference ──► { ListenerKind ──► Handler }             │
//! │  filters:   FilterKind ──► Filter   (AND, 하나라도 false면 veto)    │
//! │  handlers:  전역 핸들러 (모든 trigger에 전달)                         │
//! └───────────────────────────────┬───────────────────────────────────┘
//!                                 │ trigger(event, result)
//!                                 ▼
//!                  Spawner (RayonSpawner | TokioSpawner)
//!                                 │
//!                                 ▼
//!                          DispatchHandle
//! ```
//!
//! ## 사용법
//!
//! ```ignore
//! use plane_foundation::event::{handler, FilterKind, ListenerRegistry};
//!
//! let registry = ListenerRegistry::new()?;
//! registry.register_listener(Reference::new("orderCreated"), handler(|r| {
//!     tracing::info!("order validated: {}", r.is_valid());
//! }));
//! registry.add_filter(FilterKind::Event, |r| r.is_valid());
//!
//! registry.trigger("orderCreated", result)?.wait();
//! ```

pub mod registry;
pub mod spawner;
pub mod types;

// Re-exports
pub use registry::{DispatchHandle, ListenerRegistry};
pub use spawner::{Job, RayonSpawner, Spawner, TokioSpawner};
pub use types::{handler, Filter, FilterKind, Handler, ListenerKind, NamedHandler};
