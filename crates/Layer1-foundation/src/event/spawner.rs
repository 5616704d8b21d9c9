//! Spawner - 리스너 디스패치 태스크 제출
//!
//! `trigger`는 리스너마다 독립 태스크를 하나씩 제출합니다. 태스크 사이의
//! 실행 순서는 보장하지 않습니다.

use crate::config::DispatchConfig;
use crate::logging::{LogLevel, LogSink};
use crate::{Error, Result};
use serde_json::json;
use std::any::Any;
use std::sync::Arc;

/// 제출 단위
pub type Job = Box<dyn FnOnce() + Send + 'static>;

pub trait Spawner: Send + Sync {
    /// 태스크 제출 (fire-and-forget)
    fn spawn(&self, job: Job);

    fn name(&self) -> &str;
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

// ============================================================================
// RayonSpawner
// ============================================================================

/// 크기가 제한된 rayon 워커 풀
///
/// 핸들러 패닉은 풀의 panic handler가 로그로 남기고 워커는 계속 동작합니다.
pub struct RayonSpawner {
    pool: rayon::ThreadPool,
}

impl RayonSpawner {
    pub fn new(config: &DispatchConfig, logger: Arc<dyn LogSink>) -> Result<Self> {
        let prefix = config.thread_name_prefix.clone();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.worker_threads)
            .thread_name(move |i| format!("{}-{}", prefix, i))
            .panic_handler(move |payload| {
                logger.log(
                    LogLevel::Error,
                    "Listener task panicked",
                    &json!({ "panic": panic_message(payload.as_ref()) }),
                );
            })
            .build()
            .map_err(|e| Error::Config(format!("dispatch pool: {}", e)))?;

        Ok(Self { pool })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

impl Spawner for RayonSpawner {
    fn spawn(&self, job: Job) {
        self.pool.spawn(job);
    }

    fn name(&self) -> &str {
        "rayon"
    }
}

// ============================================================================
// TokioSpawner
// ============================================================================

/// tokio 런타임의 blocking 풀로 제출
///
/// 핸들러는 동기 함수이므로 `spawn_blocking`을 사용합니다.
#[derive(Debug, Clone)]
pub struct TokioSpawner {
    handle: tokio::runtime::Handle,
}

impl TokioSpawner {
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// 현재 런타임 컨텍스트에서 생성 (런타임 밖이면 `None`)
    pub fn current() -> Option<Self> {
        tokio::runtime::Handle::try_current().ok().map(Self::new)
    }
}

impl Spawner for TokioSpawner {
    fn spawn(&self, job: Job) {
        drop(self.handle.spawn_blocking(job));
    }

    fn name(&self) -> &str {
        "tokio"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::MemorySink;
    use crate::sync::WaitGroup;
    use std::time::Duration;

    #[test]
    fn test_rayon_spawner_runs_jobs() {
        let config = DispatchConfig {
            worker_threads: 2,
            ..Default::default()
        };
        let spawner = RayonSpawner::new(&config, Arc::new(MemorySink::new())).unwrap();
        assert_eq!(spawner.threads(), 2);

        let wg = WaitGroup::new();
        wg.add(4);
        for _ in 0..4 {
            let guard = wg.guard();
            spawner.spawn(Box::new(move || drop(guard)));
        }
        assert!(wg.wait_timeout(Duration::from_secs(2)));
    }

    #[test]
    fn test_rayon_panic_is_logged() {
        let sink = Arc::new(MemorySink::new());
        let spawner = RayonSpawner::new(&DispatchConfig::default(), sink.clone()).unwrap();

        let wg = WaitGroup::new();
        wg.add(1);
        let guard = wg.guard();
        spawner.spawn(Box::new(move || {
            let _guard = guard;
            panic!("handler exploded");
        }));

        assert!(wg.wait_timeout(Duration::from_secs(2)));
        // panic handler는 unwind 이후에 호출됨
        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while !sink.contains("panicked") && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(sink.records().iter().any(|r| r.context["panic"] == "handler exploded"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_tokio_spawner_runs_jobs() {
        let spawner = TokioSpawner::current().expect("inside runtime");
        let (tx, rx) = tokio::sync::oneshot::channel();
        spawner.spawn(Box::new(move || {
            let _ = tx.send(42);
        }));
        assert_eq!(rx.await.unwrap(), 42);
    }

    #[test]
    fn test_tokio_spawner_outside_runtime() {
        assert!(TokioSpawner::current().is_none());
    }
}
