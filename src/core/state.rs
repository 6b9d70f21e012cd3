//! 状态定义：UiState 投影
//!
//! UI 只持有轻量投影（阶段、连通、状态文本、报告视图、归档列表）；
//! 完整状态由控制器维护，跨组件只传不可变快照。

use serde::Serialize;

use crate::core::archive::HistoryRecord;
use crate::core::liveness::Liveness;
use crate::core::reveal::RenderState;

/// UI 看到的「投影」状态，轻量且易于渲染
#[derive(Clone, Debug, Serialize)]
pub struct UiState {
    pub phase: SessionPhase,
    pub liveness: Liveness,
    pub tab: Tab,
    /// 瞬态状态文本（如「分析中」或服务返回的 db_status）
    pub status: Option<String>,
    /// 错误文本；UI 必须与瞬态状态区分渲染
    pub error_message: Option<String>,
    /// 当前报告视图（全文 + 已揭示前缀长度）
    pub report: Option<RenderState>,
    pub history: Vec<HistoryRecord>,
    pub loading_history: bool,
    /// 在途请求期间锁定输入（同一时刻至多一个提交）
    pub input_locked: bool,
    /// 归档编号方向约定（来自配置，见 [archive].newest_first）
    pub newest_first: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            phase: SessionPhase::Idle,
            liveness: Liveness::Unknown,
            tab: Tab::Audit,
            status: None,
            error_message: None,
            report: None,
            history: Vec::new(),
            loading_history: false,
            input_locked: false,
            newest_first: true,
        }
    }
}

/// 会话阶段（UI 投影用）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum SessionPhase {
    Idle,
    Analyzing,
    Revealing,
    Error,
}

/// 视图页签
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Tab {
    Audit,
    Archive,
}
