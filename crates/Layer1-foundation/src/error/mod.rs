//! Error types for plane-foundation
//!
//! 전제 조건 위반은 모두 여기서 typed error로 반환합니다.
//! 검증 실패 자체는 에러가 아니라 `ValidationResult`로 전달됩니다.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// plane-foundation 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Validator chain 관련
    // ========================================================================
    #[error("value is nil")]
    MissingCandidate,

    #[error("validation has no validators")]
    NoValidators,

    #[error("validator function is nil")]
    MissingValidatorFunction,

    #[error("priority must be greater than or equal to 0 (got {0})")]
    NegativePriority(i64),

    #[error("validator with priority {0} already exists")]
    DuplicatePriority(i64),

    #[error("validator with priority {0} does not exist")]
    ValidatorNotFound(i64),

    // ========================================================================
    // Listener registry 관련
    // ========================================================================
    #[error("event name is empty")]
    EmptyEventName,

    #[error("validation result is nil")]
    MissingResult,

    // ========================================================================
    // 실행 관련
    // ========================================================================
    #[error("Cancelled")]
    Cancelled,

    // ========================================================================
    // 설정 / 외부 에러 변환
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// 호출자 인자/상태로 인한 전제 조건 위반인지 확인
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Error::MissingCandidate
                | Error::NoValidators
                | Error::MissingValidatorFunction
                | Error::NegativePriority(_)
                | Error::DuplicatePriority(_)
                | Error::ValidatorNotFound(_)
                | Error::EmptyEventName
                | Error::MissingResult
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precondition_classification() {
        assert!(Error::DuplicatePriority(3).is_precondition());
        assert!(Error::EmptyEventName.is_precondition());
        assert!(!Error::Cancelled.is_precondition());
        assert!(!Error::Config("bad".into()).is_precondition());
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            Error::DuplicatePriority(2).to_string(),
            "validator with priority 2 already exists"
        );
        assert_eq!(Error::NoValidators.to_string(), "validation has no validators");
    }
}
