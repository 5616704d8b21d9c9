//! SyncContext - 락 + 조건 변수 + wait-group 번들
//!
//! ## 구성
//!
//! ```text
//! ┌──────────────────────────── SyncContext<S, C> ─────────────────────────┐
//! │  state:  RwLock<S>            lock()/read()/try_lock()/try_read()      │
//! │  shared: Mutex<Shared<C>>  ◄── cond: Condvar (같은 mutex에 바인딩)       │
//! │          ├── context: Option<C>                                         │
//! │          ├── predicate: signal 게이트                                   │
//! │          └── waiters / pending / epoch                                  │
//! │  wait_group: WaitGroup        add()/done()/wait()                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `signal()`은 best-effort 입니다. predicate가 거부하거나 에러를 내면
//! warn 로그만 남기고 아무도 깨우지 않습니다. `broadcast()`는 항상 성공합니다.

use super::wait_group::WaitGroup;
use crate::core::Value;
use crate::logging::{default_sink, HasLogger, LogLevel, LogSink};
use parking_lot::{Condvar, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// 공유 컨텍스트 검증 함수
///
/// 컨텍스트 mutex를 잡은 상태로 호출되므로 같은 `SyncContext`에 재진입하면 안 됩니다.
pub type SharedPredicate<C> = Arc<dyn Fn(Option<&C>) -> anyhow::Result<bool> + Send + Sync>;

struct Shared<C> {
    context: Option<C>,
    predicate: Option<SharedPredicate<C>>,
    /// 현재 epoch에서 대기 중인 수
    waiters: usize,
    /// signal로 발급되었지만 아직 소비되지 않은 wake 수 (항상 <= waiters)
    pending: usize,
    /// broadcast마다 증가
    epoch: u64,
}

impl<C> Shared<C> {
    /// 대기자가 깨어날 자격이 있으면 소비하고 `true`
    fn take_wake(&mut self, epoch: u64) -> bool {
        if self.epoch != epoch {
            return true;
        }
        if self.pending > 0 {
            self.pending -= 1;
            self.waiters -= 1;
            return true;
        }
        false
    }
}

pub struct SyncContext<S = (), C = Value> {
    state: RwLock<S>,
    shared: Mutex<Shared<C>>,
    cond: Condvar,
    wait_group: WaitGroup,
    logger: Arc<dyn LogSink>,
}

impl SyncContext {
    /// 보호 상태 없이 생성
    pub fn new() -> Self {
        Self::with_state(())
    }
}

impl Default for SyncContext {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, C> SyncContext<S, C> {
    /// `state`를 배타/공유 락으로 보호하는 컨텍스트 생성
    pub fn with_state(state: S) -> Self {
        Self {
            state: RwLock::new(state),
            shared: Mutex::new(Shared {
                context: None,
                predicate: None,
                waiters: 0,
                pending: 0,
                epoch: 0,
            }),
            cond: Condvar::new(),
            wait_group: WaitGroup::new(),
            logger: default_sink(),
        }
    }

    /// 로그 싱크 주입
    pub fn with_logger(mut self, logger: Arc<dyn LogSink>) -> Self {
        self.logger = logger;
        self
    }

    // ========================================================================
    // 배타 / 공유 락
    // ========================================================================

    pub fn lock(&self) -> RwLockWriteGuard<'_, S> {
        self.state.write()
    }

    pub fn read(&self) -> RwLockReadGuard<'_, S> {
        self.state.read()
    }

    /// 블로킹하지 않음. 획득 실패 시 `None`
    pub fn try_lock(&self) -> Option<RwLockWriteGuard<'_, S>> {
        self.state.try_write()
    }

    /// 블로킹하지 않음. 획득 실패 시 `None`
    pub fn try_read(&self) -> Option<RwLockReadGuard<'_, S>> {
        self.state.try_read()
    }

    pub fn get_mut(&mut self) -> &mut S {
        self.state.get_mut()
    }

    // ========================================================================
    // 조건 변수
    // ========================================================================

    /// signal 또는 broadcast가 올 때까지 블로킹
    ///
    /// `state` 락을 잡은 채 호출하면 signaler와 교착될 수 있습니다.
    pub fn wait_cond(&self) {
        let mut shared = self.shared.lock();
        let epoch = shared.epoch;
        shared.waiters += 1;
        loop {
            self.cond.wait(&mut shared);
            if shared.take_wake(epoch) {
                return;
            }
        }
    }

    /// 타임아웃 전에 깨어나면 `true`, 시간이 다 되면 `false`
    pub fn wait_cond_with_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut shared = self.shared.lock();
        let epoch = shared.epoch;
        shared.waiters += 1;
        loop {
            let timed_out = self.cond.wait_until(&mut shared, deadline).timed_out();
            if shared.take_wake(epoch) {
                return true;
            }
            if timed_out {
                shared.waiters -= 1;
                return false;
            }
        }
    }

    /// predicate를 통과하면 대기자 하나를 깨움
    ///
    /// 게이트를 통과했으면 `true`. 대기자가 없으면 wake는 유실됩니다.
    pub fn signal(&self) -> bool {
        let mut shared = self.shared.lock();

        if let Some(predicate) = shared.predicate.clone() {
            match predicate(shared.context.as_ref()) {
                Ok(true) => {}
                Ok(false) => {
                    self.logger.log(
                        LogLevel::Warn,
                        "Condition signal aborted due to validation failure",
                        &json!({ "waiters": shared.waiters }),
                    );
                    return false;
                }
                Err(e) => {
                    self.logger.log(
                        LogLevel::Warn,
                        "Condition signal aborted due to validation failure",
                        &json!({ "waiters": shared.waiters, "error": e.to_string() }),
                    );
                    return false;
                }
            }
        }

        self.logger.log(
            LogLevel::Debug,
            "Signaling condition variable",
            &json!({ "waiters": shared.waiters }),
        );
        if shared.waiters > shared.pending {
            shared.pending += 1;
        }
        self.cond.notify_one();
        true
    }

    /// predicate 검사 없이 현재 대기자 전부를 깨움
    pub fn broadcast(&self) {
        let mut shared = self.shared.lock();
        shared.epoch = shared.epoch.wrapping_add(1);
        shared.waiters = 0;
        shared.pending = 0;
        self.cond.notify_all();
    }

    /// 현재 조건 변수에서 대기 중인 수
    pub fn waiter_count(&self) -> usize {
        let shared = self.shared.lock();
        shared.waiters - shared.pending
    }

    // ========================================================================
    // 공유 컨텍스트 / predicate
    // ========================================================================

    pub fn shared_context(&self) -> Option<C>
    where
        C: Clone,
    {
        self.shared.lock().context.clone()
    }

    pub fn set_shared_context(&self, context: C) {
        self.shared.lock().context = Some(context);
    }

    pub fn clear_shared_context(&self) -> Option<C> {
        self.shared.lock().context.take()
    }

    pub fn predicate(&self) -> Option<SharedPredicate<C>> {
        self.shared.lock().predicate.clone()
    }

    pub fn set_predicate<F>(&self, predicate: F)
    where
        F: Fn(Option<&C>) -> anyhow::Result<bool> + Send + Sync + 'static,
    {
        self.shared.lock().predicate = Some(Arc::new(predicate));
    }

    pub fn clear_predicate(&self) {
        self.shared.lock().predicate = None;
    }

    // ========================================================================
    // Wait group
    // ========================================================================

    pub fn add(&self, n: usize) {
        self.wait_group.add(n);
    }

    /// `add()`보다 많이 호출하면 안 됩니다 (초과분은 무시되고 에러 로그)
    pub fn done(&self) {
        if !self.wait_group.done() {
            self.logger.log(
                LogLevel::Error,
                "WaitGroup done() called more times than add()",
                &serde_json::Value::Null,
            );
        }
    }

    pub fn wait(&self) {
        self.wait_group.wait();
    }

    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.wait_group.wait_timeout(timeout)
    }

    /// 다른 태스크로 넘길 수 있는 wait-group 핸들
    pub fn wait_group(&self) -> WaitGroup {
        self.wait_group.clone()
    }
}

impl<S, C> HasLogger for SyncContext<S, C> {
    fn logger(&self) -> Arc<dyn LogSink> {
        self.logger.clone()
    }
}

impl<S, C> std::fmt::Debug for SyncContext<S, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncContext")
            .field("waiters", &self.waiter_count())
            .field("pending_tasks", &self.wait_group.count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::MemorySink;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    fn wait_for_waiters<S, C>(ctx: &SyncContext<S, C>, n: usize) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while ctx.waiter_count() < n {
            assert!(Instant::now() < deadline, "waiters never arrived");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_try_lock_does_not_block() {
        let ctx: SyncContext<u32> = SyncContext::with_state(5u32);
        let guard = ctx.lock();
        assert!(ctx.try_lock().is_none());
        assert!(ctx.try_read().is_none());
        drop(guard);

        let r1 = ctx.read();
        assert!(ctx.try_read().is_some());
        assert!(ctx.try_lock().is_none());
        assert_eq!(*r1, 5);
    }

    #[test]
    fn test_lock_mutates_state() {
        let ctx: SyncContext<Vec<i32>> = SyncContext::with_state(Vec::<i32>::new());
        ctx.lock().push(1);
        ctx.lock().push(2);
        assert_eq!(*ctx.read(), vec![1, 2]);
    }

    #[test]
    fn test_shared_context_roundtrip() {
        let ctx = SyncContext::new();
        assert!(ctx.shared_context().is_none());
        ctx.set_shared_context(Value::from("ready"));
        assert_eq!(ctx.shared_context(), Some(Value::from("ready")));
        assert_eq!(ctx.clear_shared_context(), Some(Value::from("ready")));
        assert!(ctx.shared_context().is_none());
    }

    #[test]
    fn test_wait_timeout_without_signal() {
        let ctx = SyncContext::new();
        let start = Instant::now();
        assert!(!ctx.wait_cond_with_timeout(Duration::from_millis(30)));
        assert!(start.elapsed() >= Duration::from_millis(30));
        assert_eq!(ctx.waiter_count(), 0);
    }

    #[test]
    fn test_signal_wakes_waiter_before_timeout() {
        let ctx = Arc::new(SyncContext::new());
        let waiter = {
            let ctx = ctx.clone();
            thread::spawn(move || ctx.wait_cond_with_timeout(Duration::from_secs(5)))
        };

        wait_for_waiters(&ctx, 1);
        assert!(ctx.signal());
        assert!(waiter.join().unwrap());
    }

    #[test]
    fn test_signal_suppressed_by_predicate() {
        let sink = Arc::new(MemorySink::new());
        let ctx = Arc::new(SyncContext::new().with_logger(sink.clone()));
        ctx.set_predicate(|_ctx: Option<&Value>| Ok(false));

        let waiter = {
            let ctx = ctx.clone();
            thread::spawn(move || ctx.wait_cond_with_timeout(Duration::from_millis(150)))
        };

        wait_for_waiters(&ctx, 1);
        assert!(!ctx.signal());
        assert!(!waiter.join().unwrap());
        assert_eq!(sink.count(LogLevel::Warn), 1);
    }

    #[test]
    fn test_signal_predicate_error_is_logged() {
        let sink = Arc::new(MemorySink::new());
        let ctx = SyncContext::new().with_logger(sink.clone());
        ctx.set_predicate(|_ctx: Option<&Value>| Err(anyhow::anyhow!("context unavailable")));

        assert!(!ctx.signal());
        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].context["error"], "context unavailable");
    }

    #[test]
    fn test_predicate_sees_shared_context() {
        let ctx = Arc::new(SyncContext::new());
        ctx.set_predicate(|c: Option<&Value>| {
            Ok(c.and_then(Value::as_str) == Some("ready"))
        });

        assert!(!ctx.signal());
        ctx.set_shared_context(Value::from("ready"));

        let waiter = {
            let ctx = ctx.clone();
            thread::spawn(move || ctx.wait_cond_with_timeout(Duration::from_secs(5)))
        };
        wait_for_waiters(&ctx, 1);
        assert!(ctx.signal());
        assert!(waiter.join().unwrap());
    }

    #[test]
    fn test_signal_wakes_only_one() {
        let ctx = Arc::new(SyncContext::new());
        let woke = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..3)
            .map(|_| {
                let ctx = ctx.clone();
                let woke = woke.clone();
                thread::spawn(move || {
                    if ctx.wait_cond_with_timeout(Duration::from_millis(300)) {
                        woke.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        wait_for_waiters(&ctx, 3);
        ctx.signal();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(woke.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_broadcast_ignores_predicate_and_wakes_all() {
        let ctx = Arc::new(SyncContext::new());
        ctx.set_predicate(|_c: Option<&Value>| Ok(false));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let ctx = ctx.clone();
                thread::spawn(move || ctx.wait_cond_with_timeout(Duration::from_secs(5)))
            })
            .collect();

        wait_for_waiters(&ctx, 4);
        ctx.broadcast();
        for h in handles {
            assert!(h.join().unwrap());
        }
        assert_eq!(ctx.waiter_count(), 0);
    }

    #[test]
    fn test_wait_cond_blocks_until_broadcast() {
        let ctx = Arc::new(SyncContext::new());
        let waiter = {
            let ctx = ctx.clone();
            thread::spawn(move || ctx.wait_cond())
        };
        wait_for_waiters(&ctx, 1);
        ctx.broadcast();
        waiter.join().unwrap();
    }

    #[test]
    fn test_wait_group_through_context() {
        let sink = Arc::new(MemorySink::new());
        let ctx = Arc::new(SyncContext::new().with_logger(sink.clone()));
        ctx.add(2);
        for _ in 0..2 {
            let ctx = ctx.clone();
            thread::spawn(move || ctx.done());
        }
        ctx.wait();

        ctx.done();
        assert_eq!(sink.count(LogLevel::Error), 1);
    }
}
