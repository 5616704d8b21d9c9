//! Validation - validator chain과 검증 결과
//!
//! ```text
//! candidate ──► ValidatorChain<T>
//!                 ├── priority 0 ──► ValidationResult
//!                 ├── priority 1 ──► ValidationResult (invalid → 중단)
//!                 └── priority 2     (실행 안 됨)
//!                        │
//!                        ▼
//!               집계 ValidationResult ──► ListenerRegistry::trigger
//! ```

pub mod chain;
pub mod entry;
pub mod result;

pub use chain::{ValidatorChain, METADATA_CANCELLED, METADATA_EVALUATED, METADATA_RESULTS};
pub use entry::{ValidatorEntry, ValidatorFn};
pub use result::{ResultCallback, ResultSnapshot, ValidationResult, METADATA_ALL};
