//! 报告增量渲染（打字机式逐字揭示）
//!
//! 纯展示层的时间变换：full_text 从不改动，消费端任何时刻都能拿到完整原文。
//! 每次 present 先取消上一段展示（协作式取消，旧的续延成为 no-op），
//! 再以固定滴答逐字推进 visible_chars，推进到末尾后序列终止。

use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// 一帧展示状态，不变式 0 <= visible_chars <= 字符总数
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct RenderState {
    pub full_text: String,
    /// 已揭示的字符数（按码点计）
    pub visible_chars: usize,
}

impl RenderState {
    pub fn new(full_text: impl Into<String>) -> Self {
        Self {
            full_text: full_text.into(),
            visible_chars: 0,
        }
    }

    pub fn total_chars(&self) -> usize {
        self.full_text.chars().count()
    }

    pub fn is_complete(&self) -> bool {
        self.visible_chars >= self.total_chars()
    }

    /// 当前可见前缀（保证落在字符边界上）
    pub fn visible_text(&self) -> &str {
        match self.full_text.char_indices().nth(self.visible_chars) {
            Some((idx, _)) => &self.full_text[..idx],
            None => &self.full_text,
        }
    }
}

/// 揭示器：同一时刻至多一段在途展示，新 present 自动取消旧的
pub struct Revealer {
    tick: Duration,
    current: Option<CancellationToken>,
}

impl Revealer {
    pub fn new(tick: Duration) -> Self {
        Self { tick, current: None }
    }

    /// 开始展示一段新文本，返回有限的 RenderState 序列：
    /// 从 0 开始、每滴答 +1、到字符总数为止，随后通道关闭。
    /// 空文本立即产生单个终态。
    pub fn present(&mut self, full_text: String) -> mpsc::UnboundedReceiver<RenderState> {
        self.cancel();

        let token = CancellationToken::new();
        self.current = Some(token.clone());

        let (tx, rx) = mpsc::unbounded_channel();
        let tick = self.tick;
        tokio::spawn(async move {
            let mut state = RenderState::new(full_text);
            let total = state.total_chars();
            if tx.send(state.clone()).is_err() {
                return;
            }
            while state.visible_chars < total {
                // 每个续延调度前先查取消标志，避免陈旧任务继续推进
                tokio::select! {
                    biased;
                    _ = token.cancelled() => return,
                    _ = tokio::time::sleep(tick) => {}
                }
                state.visible_chars += 1;
                if tx.send(state.clone()).is_err() {
                    return;
                }
            }
        });
        rx
    }

    /// 取消在途展示（若有）；full_text 保留在消费端手里，不受影响
    pub fn cancel(&mut self) {
        if let Some(token) = self.current.take() {
            token.cancel();
        }
    }
}
