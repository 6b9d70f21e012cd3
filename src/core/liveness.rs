//! 连通性监测
//!
//! LivenessHandle 是进程级共享的三态连通标志（watch 通道封装）；
//! 三个写入点（探测、分析成功、归档结果）之间 last-write-wins，不保证顺序，
//! 读端需容忍抖动。ConnectionMonitor 周期性探测服务根地址，
//! 轮询任务由 PollGuard 持有的 CancellationToken 管理，drop 即回收。

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::api::AnalysisBackend;

/// 服务连通状态三态
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Liveness {
    /// 尚未探测过
    Unknown,
    Online,
    Offline,
}

/// 连通标志的共享句柄：get / set / subscribe
///
/// 显式传入各组件而非环境全局，便于测试注入与观察。
#[derive(Clone)]
pub struct LivenessHandle {
    tx: Arc<watch::Sender<Liveness>>,
}

impl LivenessHandle {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Liveness::Unknown);
        Self { tx: Arc::new(tx) }
    }

    pub fn get(&self) -> Liveness {
        *self.tx.borrow()
    }

    pub fn set(&self, next: Liveness) {
        let prev = self.tx.send_replace(next);
        if prev != next {
            tracing::debug!("liveness {:?} -> {:?}", prev, next);
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Liveness> {
        self.tx.subscribe()
    }
}

impl Default for LivenessHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// 连通性监测器：单次探测与周期轮询
#[derive(Clone)]
pub struct ConnectionMonitor {
    backend: Arc<dyn AnalysisBackend>,
    liveness: LivenessHandle,
}

impl ConnectionMonitor {
    pub fn new(backend: Arc<dyn AnalysisBackend>, liveness: LivenessHandle) -> Self {
        Self { backend, liveness }
    }

    /// 探测一次并更新共享状态；任何失败吸收为 Offline，从不上抛
    pub async fn probe(&self) -> Liveness {
        let next = match self.backend.probe().await {
            Ok(()) => Liveness::Online,
            Err(e) => {
                tracing::debug!("probe failed: {}", e);
                Liveness::Offline
            }
        };
        self.liveness.set(next);
        next
    }

    /// 启动周期轮询；首个滴答立即触发。每次探测彼此独立，不做退避。
    /// 返回的 PollGuard 被 drop 或调用 stop() 时轮询任务退出。
    pub fn start_polling(self, interval: Duration) -> PollGuard {
        let token = CancellationToken::new();
        let task_token = token.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = task_token.cancelled() => break,
                    _ = ticker.tick() => {
                        self.probe().await;
                    }
                }
            }
            tracing::debug!("liveness polling stopped");
        });
        PollGuard { token }
    }
}

/// 轮询任务的作用域句柄；所有退出路径（显式 stop 或 drop）都会取消任务
pub struct PollGuard {
    token: CancellationToken,
}

impl PollGuard {
    pub fn stop(&self) {
        self.token.cancel();
    }
}

impl Drop for PollGuard {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockBackend;

    #[tokio::test]
    async fn test_failed_probes_yield_offline_then_success_restores_online() {
        let backend = Arc::new(MockBackend::new());
        let liveness = LivenessHandle::new();
        let monitor = ConnectionMonitor::new(backend.clone(), liveness.clone());

        assert_eq!(liveness.get(), Liveness::Unknown);

        backend.set_probe_ok(false);
        for _ in 0..3 {
            assert_eq!(monitor.probe().await, Liveness::Offline);
        }
        assert_eq!(liveness.get(), Liveness::Offline);

        backend.set_probe_ok(true);
        assert_eq!(monitor.probe().await, Liveness::Online);
        assert_eq!(liveness.get(), Liveness::Online);
    }

    #[tokio::test]
    async fn test_poll_guard_drop_cancels_polling() {
        let backend = Arc::new(MockBackend::new());
        let liveness = LivenessHandle::new();
        let monitor = ConnectionMonitor::new(backend, liveness);

        let guard = monitor.start_polling(Duration::from_secs(60));
        let token = guard.token.clone();
        assert!(!token.is_cancelled());
        drop(guard);
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let liveness = LivenessHandle::new();
        liveness.set(Liveness::Online);
        liveness.set(Liveness::Offline);
        liveness.set(Liveness::Online);
        assert_eq!(liveness.get(), Liveness::Online);
    }
}
