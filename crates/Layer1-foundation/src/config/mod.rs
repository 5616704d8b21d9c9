//! Configuration - 파운데이션 설정
//!
//! TOML 파일 또는 문자열에서 로드합니다. 모든 필드는 기본값이 있어
//! 부분 설정도 허용됩니다.
//!
//! ```toml
//! [dispatch]
//! worker_threads = 4
//! thread_name_prefix = "plane-dispatch"
//!
//! [chain]
//! sort_results = true
//!
//! [logging]
//! level = "debug"
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 통합 설정
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FoundationConfig {
    pub dispatch: DispatchConfig,
    pub chain: ChainConfig,
    pub logging: LoggingConfig,
}

impl FoundationConfig {
    /// TOML 문자열에서 로드
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// TOML 파일에서 로드
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// TOML 문자열로 직렬화
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }
}

/// 리스너 디스패치 워커 풀 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// 워커 스레드 수 (0 = rayon 기본값)
    pub worker_threads: usize,
    /// 워커 스레드 이름 접두사
    pub thread_name_prefix: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            worker_threads: 0,
            thread_name_prefix: "plane-dispatch".to_string(),
        }
    }
}

/// Validator chain 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// 수집된 결과를 메시지 순으로 정렬 (표시용)
    pub sort_results: bool,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self { sort_results: true }
    }
}

/// tracing subscriber 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` 지시어 (`RUST_LOG`가 있으면 무시됨)
    pub level: String,
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            with_target: false,
        }
    }
}
