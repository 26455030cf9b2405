//! 请求节流 - 业务能力层
//!
//! 保证两次直接调用改写服务之间至少间隔 `min_delay`。
//! 上一次调用时间由节流器自己持有（互斥锁保护），时钟可注入以便测试。

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// 时钟
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// 基于 tokio 的时钟（测试中可配合 `tokio::time::pause` 使用）
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// 最小请求间隔节流器
pub struct RequestThrottle {
    min_delay: Duration,
    last_request: Mutex<Option<Instant>>,
    clock: Arc<dyn Clock>,
}

impl RequestThrottle {
    pub fn new(min_delay: Duration) -> Self {
        Self::with_clock(min_delay, Arc::new(TokioClock))
    }

    pub fn with_clock(min_delay: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            min_delay,
            last_request: Mutex::new(None),
            clock,
        }
    }

    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }

    /// 等待直到允许发出下一次请求，并记录本次请求时间
    ///
    /// 等待期间持有锁，后来的调用者排队等待。
    pub async fn acquire(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(previous) = *last {
            let elapsed = self.clock.now().saturating_duration_since(previous);
            if elapsed < self.min_delay {
                let delay = self.min_delay - elapsed;
                debug!("请求节流: 等待 {:.2}s", delay.as_secs_f64());
                tokio::time::sleep(delay).await;
            }
        }

        *last = Some(self.clock.now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// 手动推进的时钟，`sleep` 时不会自动前进
    struct ManualClock {
        base: Instant,
        offset_ms: AtomicU64,
    }

    impl ManualClock {
        fn advance(&self, ms: u64) {
            self.offset_ms.fetch_add(ms, Ordering::SeqCst);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            self.base + Duration::from_millis(self.offset_ms.load(Ordering::SeqCst))
        }
    }

    #[tokio::test]
    async fn test_first_request_is_not_delayed() {
        let throttle = RequestThrottle::new(Duration::from_secs(30));
        let started = std::time::Instant::now();
        throttle.acquire().await;
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_consecutive_requests_are_spaced() {
        let throttle = RequestThrottle::new(Duration::from_millis(500));
        let started = Instant::now();
        throttle.acquire().await;
        assert_eq!(started.elapsed(), Duration::ZERO);

        throttle.acquire().await;
        throttle.acquire().await;
        // 虚拟时间：恰好两个间隔
        assert!(started.elapsed() >= Duration::from_millis(1000));
        assert!(started.elapsed() < Duration::from_millis(1100));
    }

    #[tokio::test]
    async fn test_injected_clock_skips_wait_when_floor_met() {
        let clock = Arc::new(ManualClock {
            base: Instant::now(),
            offset_ms: AtomicU64::new(0),
        });
        let throttle = RequestThrottle::with_clock(Duration::from_secs(60), clock.clone());

        throttle.acquire().await;
        clock.advance(61_000);

        let started = std::time::Instant::now();
        throttle.acquire().await;
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
