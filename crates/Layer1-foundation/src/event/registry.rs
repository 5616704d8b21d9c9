//! ListenerRegistry - 필터가 붙은 검증 결과 발행/구독
//!
//! ## 디스패치 흐름
//!
//! ```text
//! trigger(event, result)
//!   │
//!   ├── 공유 락: event 이름의 리스너 + 필터 + 전역 핸들러 스냅샷
//!   │
//!   ├── 필터 AND 평가 ── 거부 ──► vetoed handle
//!   │
//!   ├── 리스너별 필터 재평가 ── 거부 ──► 해당 리스너만 skip
//!   │
//!   └── Spawner ──► listener task × N, handler task × M
//! ```
//!
//! 리스너/필터/핸들러는 레지스트리 락을 잡지 않은 상태에서만 호출됩니다.

use super::spawner::{Job, RayonSpawner, Spawner};
use super::types::{Filter, FilterKind, Handler, ListenerKind, NamedHandler};
use crate::config::DispatchConfig;
use crate::core::Reference;
use crate::logging::{default_sink, HasLogger, LogLevel, LogSink};
use crate::sync::{SyncContext, WaitGroup};
use crate::validation::ValidationResult;
use crate::{Error, Result};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

// ============================================================================
// DispatchHandle
// ============================================================================

/// 한 번의 `trigger`로 제출된 태스크들의 join 핸들
#[derive(Debug, Clone)]
pub struct DispatchHandle {
    dispatched: usize,
    vetoed: bool,
    group: WaitGroup,
}

impl DispatchHandle {
    fn empty() -> Self {
        Self {
            dispatched: 0,
            vetoed: false,
            group: WaitGroup::new(),
        }
    }

    fn vetoed() -> Self {
        Self {
            vetoed: true,
            ..Self::empty()
        }
    }

    /// 제출된 태스크 수 (리스너 + 전역 핸들러)
    pub fn dispatched(&self) -> usize {
        self.dispatched
    }

    /// 필터가 이벤트 전체를 거부했는지
    pub fn is_vetoed(&self) -> bool {
        self.vetoed
    }

    pub fn is_finished(&self) -> bool {
        self.group.count() == 0
    }

    /// 제출된 태스크가 모두 끝날 때까지 대기
    pub fn wait(&self) {
        self.group.wait();
    }

    /// 타임아웃 전에 모두 끝났으면 `true`
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.group.wait_timeout(timeout)
    }
}

// ============================================================================
// ListenerRegistry
// ============================================================================

#[derive(Default)]
struct RegistryState {
    listeners: HashMap<Reference, HashMap<ListenerKind, Handler>>,
    filters: HashMap<FilterKind, Filter>,
    handlers: Vec<NamedHandler>,
}

/// 락 밖에서 실행할 디스패치 대상
struct Snapshot {
    listeners: Vec<(Reference, ListenerKind, Handler)>,
    filters: Vec<Filter>,
    handlers: Vec<Handler>,
}

/// 리스너 레지스트리
///
/// ## 사용법
///
/// ```ignore
/// use plane_foundation::event::{handler, ListenerKind, ListenerRegistry};
/// use plane_foundation::{Reference, ValidationResult};
///
/// let registry = ListenerRegistry::new()?;
/// registry.add_listener(Reference::new("orderCreated"), ListenerKind::After, handler(|r| {
///     println!("{}", r);
/// }));
///
/// let handle = registry.trigger("orderCreated", Arc::new(ValidationResult::valid("ok")))?;
/// handle.wait();
/// ```
pub struct ListenerRegistry {
    sync: SyncContext<RegistryState>,
    spawner: Arc<dyn Spawner>,
    /// 받아들여진 trigger 수
    trigger_count: AtomicU64,
}

impl ListenerRegistry {
    /// 기본 rayon 풀로 생성
    pub fn new() -> Result<Self> {
        Self::with_config(&DispatchConfig::default())
    }

    pub fn with_config(config: &DispatchConfig) -> Result<Self> {
        let spawner = RayonSpawner::new(config, default_sink())?;
        Ok(Self::with_spawner(Arc::new(spawner)))
    }

    /// 임의의 spawner로 생성 (예: `TokioSpawner`)
    pub fn with_spawner(spawner: Arc<dyn Spawner>) -> Self {
        Self {
            sync: SyncContext::with_state(RegistryState::default()),
            spawner,
            trigger_count: AtomicU64::new(0),
        }
    }

    /// 로그 싱크 주입 (spawner의 패닉 로그는 spawner 생성 시 지정)
    pub fn with_logger(mut self, logger: Arc<dyn LogSink>) -> Self {
        self.sync = self.sync.with_logger(logger);
        self
    }

    pub fn spawner_name(&self) -> &str {
        self.spawner.name()
    }

    fn log(&self, level: LogLevel, message: &str, context: serde_json::Value) {
        self.sync.logger().log(level, message, &context);
    }

    // ========================================================================
    // 필터
    // ========================================================================

    /// 필터 등록 (같은 종류는 교체)
    pub fn add_filter<F>(&self, kind: FilterKind, filter: F)
    where
        F: Fn(&ValidationResult) -> bool + Send + Sync + 'static,
    {
        self.sync.lock().filters.insert(kind, Arc::new(filter));
    }

    pub fn remove_filter(&self, kind: FilterKind) -> Option<Filter> {
        self.sync.lock().filters.remove(&kind)
    }

    pub fn filters(&self) -> HashMap<FilterKind, Filter> {
        self.sync.read().filters.clone()
    }

    // ========================================================================
    // 전역 핸들러
    // ========================================================================

    /// 이름 없는 전역 핸들러 등록
    pub fn add_handler(&self, handler: Handler) {
        self.add_named_handler("", handler);
    }

    pub fn add_named_handler(&self, name: impl Into<String>, handler: Handler) {
        self.sync.lock().handlers.push(NamedHandler {
            name: name.into(),
            handler,
        });
    }

    /// `Arc` 포인터가 같은 핸들러를 모두 제거, 제거된 수 반환
    pub fn remove_handler(&self, handler: &Handler) -> usize {
        let mut state = self.sync.lock();
        let before = state.handlers.len();
        state.handlers.retain(|h| !Arc::ptr_eq(&h.handler, handler));
        before - state.handlers.len()
    }

    pub fn handlers(&self) -> Vec<Handler> {
        self.sync.read().handlers.iter().map(|h| h.handler.clone()).collect()
    }

    pub fn handlers_by_name(&self, name: &str) -> Vec<Handler> {
        if name.is_empty() {
            self.log(LogLevel::Error, "Handler name is empty", json!({}));
            return Vec::new();
        }

        self.sync
            .read()
            .handlers
            .iter()
            .filter(|h| h.name == name)
            .map(|h| h.handler.clone())
            .collect()
    }

    // ========================================================================
    // 리스너
    // ========================================================================

    /// 리스너 등록 (같은 reference/kind는 교체)
    pub fn add_listener(&self, reference: Reference, kind: ListenerKind, handler: Handler) {
        let name = reference.name().to_string();
        self.sync
            .lock()
            .listeners
            .entry(reference)
            .or_default()
            .insert(kind, handler);

        self.log(
            LogLevel::Debug,
            "Listener added",
            json!({ "name": name, "kind": kind.as_str() }),
        );
    }

    /// `ListenerKind::Default`로 등록
    pub fn register_listener(&self, reference: Reference, handler: Handler) {
        self.add_listener(reference, ListenerKind::Default, handler);
    }

    /// 리스너 제거 (마지막 종류가 빠지면 reference 항목도 삭제)
    pub fn remove_listener(&self, reference: &Reference, kind: ListenerKind) -> Option<Handler> {
        let mut state = self.sync.lock();
        let kinds = state.listeners.get_mut(reference)?;
        let removed = kinds.remove(&kind);
        if kinds.is_empty() {
            state.listeners.remove(reference);
        }
        removed
    }

    pub fn listeners(&self) -> HashMap<Reference, HashMap<ListenerKind, Handler>> {
        self.sync.read().listeners.clone()
    }

    /// 이름이 같은 모든 reference의 종류를 병합
    pub fn listeners_by_name(&self, name: &str) -> HashMap<ListenerKind, Handler> {
        let state = self.sync.read();
        let mut merged = HashMap::new();
        for (reference, kinds) in state.listeners.iter() {
            if reference.name() == name {
                merged.extend(kinds.iter().map(|(k, h)| (*k, h.clone())));
            }
        }
        merged
    }

    pub fn listener_keys(&self) -> Vec<Reference> {
        self.sync.read().listeners.keys().cloned().collect()
    }

    // ========================================================================
    // 디스패치
    // ========================================================================

    /// `event` 이름의 리스너와 전역 핸들러에 결과 전달
    ///
    /// 이름이 일치하는 리스너가 없으면 전역 핸들러도 호출되지 않고 빈 핸들을 반환합니다.
    pub fn trigger(
        &self,
        event: &str,
        result: impl Into<Option<Arc<ValidationResult>>>,
    ) -> Result<DispatchHandle> {
        self.dispatch(event, result.into(), None)
    }

    /// 태스크 시작 시점에 `cancel`이 취소되어 있으면 해당 태스크는 건너뜀
    pub fn trigger_with_cancel(
        &self,
        event: &str,
        result: impl Into<Option<Arc<ValidationResult>>>,
        cancel: &CancellationToken,
    ) -> Result<DispatchHandle> {
        self.dispatch(event, result.into(), Some(cancel.clone()))
    }

    fn dispatch(
        &self,
        event: &str,
        result: Option<Arc<ValidationResult>>,
        cancel: Option<CancellationToken>,
    ) -> Result<DispatchHandle> {
        if event.is_empty() {
            self.log(LogLevel::Error, "Event name is empty", json!({}));
            return Err(Error::EmptyEventName);
        }
        let Some(result) = result else {
            self.log(LogLevel::Error, "Result is nil", json!({ "event": event }));
            return Err(Error::MissingResult);
        };

        let snapshot = self.snapshot(event);
        if snapshot.listeners.is_empty() {
            return Ok(DispatchHandle::empty());
        }

        if !snapshot.filters.iter().all(|f| f(&*result)) {
            self.log(LogLevel::Info, "Event vetoed by filter", json!({ "event": event }));
            return Ok(DispatchHandle::vetoed());
        }

        self.trigger_count.fetch_add(1, Ordering::Relaxed);

        let mut jobs: Vec<Handler> = Vec::with_capacity(snapshot.listeners.len() + snapshot.handlers.len());
        for (reference, kind, handler) in snapshot.listeners {
            if snapshot.filters.iter().all(|f| f(&*result)) {
                jobs.push(handler);
            } else {
                self.log(
                    LogLevel::Debug,
                    "Listener skipped by filter",
                    json!({ "listener": reference.to_string(), "kind": kind.as_str() }),
                );
            }
        }
        jobs.extend(snapshot.handlers);

        let group = WaitGroup::new();
        let dispatched = jobs.len();
        for handler in jobs {
            group.add(1);
            self.sync.add(1);
            let local = group.guard();
            let global = self.sync.wait_group().guard();
            let result = result.clone();
            let cancel = cancel.clone();
            let logger = self.sync.logger();
            let event = event.to_string();

            let job: Job = Box::new(move || {
                let _local = local;
                let _global = global;
                if cancel.as_ref().is_some_and(|c| c.is_cancelled()) {
                    logger.log(LogLevel::Debug, "Listener task cancelled", &json!({ "event": event }));
                    return;
                }
                handler(result);
            });
            self.spawner.spawn(job);
        }

        self.log(
            LogLevel::Debug,
            "Event dispatched",
            json!({ "event": event, "tasks": dispatched }),
        );

        Ok(DispatchHandle {
            dispatched,
            vetoed: false,
            group,
        })
    }

    fn snapshot(&self, event: &str) -> Snapshot {
        let state = self.sync.read();
        let listeners = state
            .listeners
            .iter()
            .filter(|(reference, _)| reference.name() == event)
            .flat_map(|(reference, kinds)| {
                kinds
                    .iter()
                    .map(move |(kind, h)| (reference.clone(), *kind, h.clone()))
            })
            .collect();

        Snapshot {
            listeners,
            filters: state.filters.values().cloned().collect(),
            handlers: state.handlers.iter().map(|h| h.handler.clone()).collect(),
        }
    }

    // ========================================================================
    // 상태
    // ========================================================================

    /// 모든 trigger의 태스크가 끝날 때까지 대기
    pub fn wait_idle(&self) {
        self.sync.wait();
    }

    pub fn wait_idle_timeout(&self, timeout: Duration) -> bool {
        self.sync.wait_timeout(timeout)
    }

    /// 아직 끝나지 않은 태스크 수
    pub fn in_flight(&self) -> usize {
        self.sync.wait_group().count()
    }

    pub fn trigger_count(&self) -> u64 {
        self.trigger_count.load(Ordering::Relaxed)
    }
}

impl HasLogger for ListenerRegistry {
    fn logger(&self) -> Arc<dyn LogSink> {
        self.sync.logger()
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.sync.read();
        f.debug_struct("ListenerRegistry")
            .field("listeners", &state.listeners.len())
            .field("filters", &state.filters.len())
            .field("handlers", &state.handlers.len())
            .field("spawner", &self.spawner.name())
            .finish()
    }
}
