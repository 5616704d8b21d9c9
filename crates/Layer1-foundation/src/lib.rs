//! # plane-foundation
//!
//! Validation and event plane:
//! - Sync: SyncContext (락 + 조건 변수 + predicate + wait-group)
//! - Validation: priority 키 ValidatorChain과 ValidationResult
//! - Event: 필터가 붙은 ListenerRegistry와 Spawner
//! - Logging: 주입 가능한 LogSink (tracing 연동)
//! - Config: TOML 설정 (FoundationConfig)
//!
//! ## 아키텍처
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  ValidatorChain<T>                                       │
//! │  ├── ValidatorEntry (priority 0)                         │
//! │  ├── ValidatorEntry (priority 1)                         │
//! │  └── ...                  │                              │
//! │                           ▼                              │
//! │              집계 ValidationResult                        │
//! │                           │                              │
//! │                           ▼                              │
//! │   ListenerRegistry ── filters ── Spawner (rayon/tokio)   │
//! │                           │                              │
//! │          ┌────────────────┼────────────────┐             │
//! │          ▼                ▼                ▼             │
//! │     Listener 1       Listener N      Global handler      │
//! └─────────────────────────────────────────────────────────┘
//!
//!   공통 기반: SyncContext, Reference, Value, LogSink
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod event;
pub mod logging;
pub mod sync;
pub mod validation;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Core (식별자 및 값 타입)
// ============================================================================
pub use core::{Metadata, Reference, Value};

// ============================================================================
// Config (설정)
// ============================================================================
pub use config::{ChainConfig, DispatchConfig, FoundationConfig, LoggingConfig};

// ============================================================================
// Logging (로그 싱크)
// ============================================================================
pub use logging::{
    default_sink,
    init_tracing,
    HasLogger,
    LogLevel,
    LogRecord,
    LogSink,
    MemorySink,
    TracingSink,
};

// ============================================================================
// Sync (동기화)
// ============================================================================
pub use sync::{SharedPredicate, SyncContext, WaitGroup, WaitGroupGuard};

// ============================================================================
// Validation (검증)
// ============================================================================
pub use validation::{
    // Result
    ResultCallback,
    ResultSnapshot,
    ValidationResult,
    METADATA_ALL,
    // Chain
    ValidatorChain,
    ValidatorEntry,
    ValidatorFn,
    METADATA_CANCELLED,
    METADATA_EVALUATED,
    METADATA_RESULTS,
};

// ============================================================================
// Event (리스너 레지스트리)
// ============================================================================
pub use event::{
    // Types
    handler,
    Filter,
    FilterKind,
    Handler,
    ListenerKind,
    NamedHandler,
    // Registry
    DispatchHandle,
    ListenerRegistry,
    // Spawner
    Job,
    RayonSpawner,
    Spawner,
    TokioSpawner,
};

// Re-export for consumers that pass cancellation tokens
pub use tokio_util::sync::CancellationToken;
