//! ValidatorEntry - priority 키로 등록되는 validator 항목

use super::result::ValidationResult;
use crate::core::Value;
use std::sync::Arc;

/// 후보 값과 보조 인자를 받아 결과를 만드는 validator 함수
pub type ValidatorFn<T> = Arc<dyn Fn(&T, &[Value]) -> ValidationResult + Send + Sync>;

/// Validator 항목
///
/// priority는 정렬 힌트이자 chain 안의 고유 키입니다.
pub struct ValidatorEntry<T> {
    priority: i64,
    function: Option<ValidatorFn<T>>,
    last_result: Option<Arc<ValidationResult>>,
}

impl<T> ValidatorEntry<T> {
    pub fn new<F>(priority: i64, function: F) -> Self
    where
        F: Fn(&T, &[Value]) -> ValidationResult + Send + Sync + 'static,
    {
        Self::from_fn(priority, Arc::new(function))
    }

    pub fn from_fn(priority: i64, function: ValidatorFn<T>) -> Self {
        Self {
            priority,
            function: Some(function),
            last_result: None,
        }
    }

    /// 함수 없이 생성 (`set_function` 전에는 chain에 등록 불가)
    pub fn empty(priority: i64) -> Self {
        Self {
            priority,
            function: None,
            last_result: None,
        }
    }

    pub fn priority(&self) -> i64 {
        self.priority
    }

    pub fn set_priority(&mut self, priority: i64) {
        self.priority = priority;
    }

    pub fn function(&self) -> Option<ValidatorFn<T>> {
        self.function.clone()
    }

    pub fn set_function<F>(&mut self, function: F)
    where
        F: Fn(&T, &[Value]) -> ValidationResult + Send + Sync + 'static,
    {
        self.function = Some(Arc::new(function));
    }

    pub fn last_result(&self) -> Option<Arc<ValidationResult>> {
        self.last_result.clone()
    }

    pub fn set_last_result(&mut self, result: Option<Arc<ValidationResult>>) {
        self.last_result = result;
    }

    /// 함수를 실행하고 결과를 `last_result`에 기록
    pub(crate) fn run(&mut self, candidate: &T, args: &[Value]) -> Option<Arc<ValidationResult>> {
        let function = self.function.as_ref()?;
        let result = Arc::new(function(candidate, args));
        self.last_result = Some(result.clone());
        Some(result)
    }
}

impl<T> Clone for ValidatorEntry<T> {
    fn clone(&self) -> Self {
        Self {
            priority: self.priority,
            function: self.function.clone(),
            last_result: self.last_result.clone(),
        }
    }
}

impl<T> std::fmt::Debug for ValidatorEntry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatorEntry")
            .field("priority", &self.priority)
            .field("has_function", &self.function.is_some())
            .field("last_result", &self.last_result)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_records_last_result() {
        let mut entry = ValidatorEntry::new(1, |v: &String, _args: &[Value]| {
            if v.is_empty() {
                ValidationResult::invalid("empty")
            } else {
                ValidationResult::valid("non-empty")
            }
        });

        assert!(entry.last_result().is_none());
        let result = entry.run(&String::new(), &[]).unwrap();
        assert!(!result.is_valid());
        assert_eq!(entry.last_result().unwrap().message(), "empty");
    }

    #[test]
    fn test_empty_entry_has_no_function() {
        let mut entry = ValidatorEntry::<u32>::empty(4);
        assert!(entry.function().is_none());
        assert!(entry.run(&1, &[]).is_none());

        entry.set_function(|v: &u32, _: &[Value]| ValidationResult::new(*v > 0, "positive", None, None));
        assert!(entry.run(&1, &[]).unwrap().is_valid());
    }

    #[test]
    fn test_args_are_forwarded() {
        let mut entry = ValidatorEntry::new(0, |v: &i64, args: &[Value]| {
            let max = args.first().and_then(Value::as_i64).unwrap_or(i64::MAX);
            ValidationResult::new(*v <= max, "max check", None, None)
        });
        assert!(!entry.run(&10, &[Value::from(5)]).unwrap().is_valid());
        assert!(entry.run(&10, &[]).unwrap().is_valid());
    }
}
