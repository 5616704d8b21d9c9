//! WaitGroup - 카운터가 0이 될 때까지 대기

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct Inner {
    count: Mutex<usize>,
    drained: Condvar,
}

/// 복제 가능한 wait-group 핸들
///
/// `done()`을 `add()`보다 많이 호출하는 것은 호출자 계약 위반입니다.
/// 카운터는 0에서 멈추고 `done()`이 `false`를 반환합니다.
#[derive(Debug, Clone, Default)]
pub struct WaitGroup {
    inner: Arc<Inner>,
}

impl WaitGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, n: usize) {
        *self.inner.count.lock() += n;
    }

    /// 카운터 1 감소. 이미 0이면 `false`
    pub fn done(&self) -> bool {
        let mut count = self.inner.count.lock();
        if *count == 0 {
            return false;
        }
        *count -= 1;
        if *count == 0 {
            self.inner.drained.notify_all();
        }
        true
    }

    /// 현재 카운터 값
    pub fn count(&self) -> usize {
        *self.inner.count.lock()
    }

    /// 카운터가 0이 될 때까지 블로킹
    pub fn wait(&self) {
        let mut count = self.inner.count.lock();
        while *count > 0 {
            self.inner.drained.wait(&mut count);
        }
    }

    /// 타임아웃 안에 0이 되면 `true`
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut count = self.inner.count.lock();
        while *count > 0 {
            if self.inner.drained.wait_until(&mut count, deadline).timed_out() {
                return *count == 0;
            }
        }
        true
    }

    /// drop 시 `done()`을 호출하는 가드 (패닉 경로 포함)
    pub fn guard(&self) -> WaitGroupGuard {
        WaitGroupGuard { group: self.clone() }
    }
}

/// `WaitGroup::guard()`가 반환하는 RAII 가드
#[derive(Debug)]
pub struct WaitGroupGuard {
    group: WaitGroup,
}

impl Drop for WaitGroupGuard {
    fn drop(&mut self) {
        self.group.done();
    }
}
