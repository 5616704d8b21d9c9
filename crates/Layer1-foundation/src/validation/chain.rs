//! ValidatorChain - priority 키 validator 레지스트리
//!
//! ## 사용법
//!
//! ```ignore
//! use plane_foundation::{ValidatorChain, ValidatorEntry, ValidationResult};
//!
//! let chain = ValidatorChain::<String>::new();
//! chain.add_validator(ValidatorEntry::new(1, |v: &String, _| {
//!     if v.len() >= 3 {
//!         ValidationResult::valid("length ok")
//!     } else {
//!         ValidationResult::invalid("too short")
//!     }
//! }))?;
//!
//! let result = chain.validate(&"ab".to_string(), &[])?;
//! assert!(!result.is_valid());
//! ```
//!
//! Validator는 chain의 배타 락 안에서 실행되므로 같은 chain에 재진입하면 안 됩니다.

use super::entry::{ValidatorEntry, ValidatorFn};
use super::result::ValidationResult;
use crate::config::ChainConfig;
use crate::core::{Metadata, Value};
use crate::event::ListenerRegistry;
use crate::logging::{HasLogger, LogLevel, LogSink};
use crate::sync::SyncContext;
use crate::{Error, Result};
use serde_json::json;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::{Arc, Weak};
use tokio_util::sync::CancellationToken;

/// 집계 결과의 메타데이터 키
pub const METADATA_RESULTS: &str = "results";
pub const METADATA_EVALUATED: &str = "evaluated";
pub const METADATA_CANCELLED: &str = "cancelled";

struct ChainState<T> {
    entries: BTreeMap<i64, ValidatorEntry<T>>,
    has_validators: bool,
    is_valid: bool,
}

impl<T> ChainState<T> {
    fn refresh(&mut self) -> bool {
        self.has_validators = !self.entries.is_empty();
        self.has_validators
    }
}

/// 검증 결과를 자동으로 전달할 레지스트리 바인딩
struct ListenerBinding {
    registry: Arc<ListenerRegistry>,
    event: String,
}

pub struct ValidatorChain<T> {
    state: SyncContext<ChainState<T>>,
    config: ChainConfig,
    binding: Option<ListenerBinding>,
}

impl<T: 'static> ValidatorChain<T> {
    pub fn new() -> Self {
        Self::with_config(ChainConfig::default())
    }

    pub fn with_config(config: ChainConfig) -> Self {
        Self {
            state: SyncContext::with_state(ChainState {
                entries: BTreeMap::new(),
                has_validators: false,
                is_valid: false,
            }),
            config,
            binding: None,
        }
    }

    pub fn with_logger(mut self, logger: Arc<dyn LogSink>) -> Self {
        self.state = self.state.with_logger(logger);
        self
    }

    /// `validate` 성공 시마다 `event`로 집계 결과를 trigger
    pub fn with_listeners(mut self, registry: Arc<ListenerRegistry>, event: impl Into<String>) -> Self {
        self.binding = Some(ListenerBinding {
            registry,
            event: event.into(),
        });
        self
    }

    fn log(&self, level: LogLevel, message: &str, context: serde_json::Value) {
        self.state.logger().log(level, message, &context);
    }

    // ========================================================================
    // 등록 / 해제
    // ========================================================================

    /// validator 등록 (중복 priority는 거부, 검사와 삽입은 한 번의 락 안에서)
    pub fn add_validator(&self, entry: ValidatorEntry<T>) -> Result<()> {
        let mut state = self.state.lock();
        state.refresh();

        if entry.function().is_none() {
            return Err(Error::MissingValidatorFunction);
        }
        let priority = entry.priority();
        if priority < 0 {
            return Err(Error::NegativePriority(priority));
        }

        match state.entries.entry(priority) {
            Entry::Occupied(_) => return Err(Error::DuplicatePriority(priority)),
            Entry::Vacant(slot) => {
                slot.insert(entry);
            }
        }
        state.refresh();
        state.is_valid = false;
        drop(state);

        self.log(LogLevel::Debug, "Validator registered", json!({ "priority": priority }));
        Ok(())
    }

    /// 해당 priority의 validator를 제거하고 반환
    pub fn remove_validator(&self, priority: i64) -> Result<ValidatorEntry<T>> {
        let mut state = self.state.lock();
        let removed = state
            .entries
            .remove(&priority)
            .ok_or(Error::ValidatorNotFound(priority))?;
        state.refresh();
        state.is_valid = false;
        drop(state);

        self.log(LogLevel::Debug, "Validator removed", json!({ "priority": priority }));
        Ok(removed)
    }

    // ========================================================================
    // 조회
    // ========================================================================

    /// validator가 하나라도 있는지 (캐시 플래그를 갱신)
    pub fn check_if_will_validate(&self) -> bool {
        self.state.lock().refresh()
    }

    pub fn validator(&self, priority: i64) -> Result<ValidatorEntry<T>> {
        let state = self.state.read();
        if !state.has_validators {
            return Err(Error::NoValidators);
        }
        state
            .entries
            .get(&priority)
            .cloned()
            .ok_or(Error::ValidatorNotFound(priority))
    }

    /// 등록된 validator 스냅샷
    pub fn validators(&self) -> BTreeMap<i64, ValidatorEntry<T>> {
        self.state.read().entries.clone()
    }

    /// 각 validator의 마지막 결과 스냅샷
    pub fn results(&self) -> BTreeMap<i64, Option<Arc<ValidationResult>>> {
        self.state
            .read()
            .entries
            .iter()
            .map(|(priority, entry)| (*priority, entry.last_result()))
            .collect()
    }

    /// 항목은 유지하고 마지막 결과만 비움
    pub fn clear_results(&self) {
        let mut state = self.state.lock();
        for entry in state.entries.values_mut() {
            entry.set_last_result(None);
        }
    }

    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 마지막 `validate`의 집계 결과
    ///
    /// validator가 없거나, 마지막 실행 이후 등록/해제가 있었으면 `false`
    pub fn is_valid(&self) -> bool {
        let state = self.state.read();
        state.has_validators && state.is_valid
    }

    // ========================================================================
    // 검증
    // ========================================================================

    /// 등록된 모든 validator로 후보를 검증
    ///
    /// 전제 조건 위반만 `Err`입니다. 검증 실패는 반환된 결과의 `is_valid()`로 전달됩니다.
    pub fn validate<'a>(
        &self,
        candidate: impl Into<Option<&'a T>>,
        args: &[Value],
    ) -> Result<Arc<ValidationResult>> {
        self.run(candidate.into(), args, None)
    }

    /// 각 validator 실행 전에 토큰을 확인
    pub fn validate_with_cancel<'a>(
        &self,
        candidate: impl Into<Option<&'a T>>,
        args: &[Value],
        cancel: &CancellationToken,
    ) -> Result<Arc<ValidationResult>> {
        self.run(candidate.into(), args, Some(cancel))
    }

    fn run(
        &self,
        candidate: Option<&T>,
        args: &[Value],
        cancel: Option<&CancellationToken>,
    ) -> Result<Arc<ValidationResult>> {
        let candidate = candidate.ok_or(Error::MissingCandidate)?;
        if cancel.is_some_and(|t| t.is_cancelled()) {
            return Err(Error::Cancelled);
        }

        let (aggregate, collected) = {
            let mut state = self.state.lock();
            if !state.has_validators {
                return Err(Error::NoValidators);
            }

            // 이번 실행에서 도달하지 못한 항목은 None으로 남음
            for entry in state.entries.values_mut() {
                entry.set_last_result(None);
            }

            let mut collected: Vec<Arc<ValidationResult>> = Vec::with_capacity(state.entries.len());
            let mut cancelled = false;
            for entry in state.entries.values_mut() {
                if cancel.is_some_and(|t| t.is_cancelled()) {
                    cancelled = true;
                    break;
                }
                let Some(result) = entry.run(candidate, args) else {
                    continue;
                };
                let passed = result.is_valid();
                collected.push(result);
                if !passed {
                    break;
                }
            }

            // 표시용 정렬
            if self.config.sort_results {
                collected.sort_by_cached_key(|r| r.message());
            }

            let all_valid = !cancelled && collected.iter().all(|r| r.is_valid());
            state.is_valid = all_valid;

            (Arc::new(build_aggregate(all_valid, cancelled, &collected)), collected)
        };

        self.log(
            LogLevel::Debug,
            "Validation finished",
            json!({
                "valid": aggregate.is_valid(),
                "evaluated": collected.len(),
            }),
        );

        for result in &collected {
            result.run_callback();
        }

        if let Some(binding) = &self.binding {
            if let Err(e) = binding.registry.trigger(&binding.event, aggregate.clone()) {
                self.log(
                    LogLevel::Warn,
                    "Failed to forward validation result",
                    json!({ "event": binding.event, "error": e.to_string() }),
                );
            }
        }

        Ok(aggregate)
    }

    /// 이 chain을 다른 chain에 넣을 수 있는 validator 함수로 변환
    ///
    /// chain에 대한 약한 참조만 가지므로 chain이 drop되면 실패 결과를 반환합니다.
    pub fn into_validator_fn(self: &Arc<Self>) -> ValidatorFn<T> {
        let chain: Weak<Self> = Arc::downgrade(self);
        Arc::new(move |value: &T, args: &[Value]| {
            let Some(chain) = chain.upgrade() else {
                return ValidationResult::failed(anyhow::anyhow!("validation is nil"));
            };
            match chain.validate(value, args) {
                Ok(result) => (*result).clone(),
                Err(e) => ValidationResult::failed(anyhow::Error::new(e)),
            }
        })
    }
}

impl<T: 'static> Default for ValidatorChain<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> HasLogger for ValidatorChain<T> {
    fn logger(&self) -> Arc<dyn LogSink> {
        self.state.logger()
    }
}

/// 수집된 결과로 집계 결과 생성
fn build_aggregate(all_valid: bool, cancelled: bool, collected: &[Arc<ValidationResult>]) -> ValidationResult {
    let failing = collected.iter().find(|r| !r.is_valid());

    let message = if cancelled {
        "validation cancelled".to_string()
    } else if let Some(failing) = failing {
        failing.message()
    } else {
        "validation is valid".to_string()
    };

    let mut metadata = Metadata::new();
    metadata.insert(
        METADATA_RESULTS.to_string(),
        Value::List(collected.iter().cloned().map(Value::Result).collect()),
    );
    metadata.insert(METADATA_EVALUATED.to_string(), Value::from(collected.len()));
    if cancelled {
        metadata.insert(METADATA_CANCELLED.to_string(), Value::Bool(true));
    }

    ValidationResult::from_parts(
        all_valid,
        message,
        Some(metadata),
        failing.and_then(|r| r.error()),
    )
}
