//! 审计服务后端抽象
//!
//! 所有后端（HTTP / Mock）实现 AnalysisBackend：probe（连通性探测）、
//! analyze（提交代码）、fetch_history（拉取归档）。传输层失败以 Err(String)
//! 返回；能拿到 HTTP 响应时一律包成 RawResponse，语义分类交给 core 层。

use async_trait::async_trait;
use serde_json::Value;

/// 一次 HTTP 往返的原始结果：状态码 + 已解析的 JSON 体
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    /// 2xx 为 true
    pub ok: bool,
    pub body: Value,
}

impl RawResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self {
            status,
            ok: (200..300).contains(&status),
            body,
        }
    }
}

/// 审计服务客户端 trait：探测、提交分析、拉取归档
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    /// 对服务根地址做一次轻量探测；任何失败（网络 / 非成功状态）返回 Err
    async fn probe(&self) -> Result<(), String>;

    /// POST /analyze，body 为 {"code": ...}；Err 表示请求本身失败（DNS / 超时 / 连接重置 / 响应体解析失败）
    async fn analyze(&self, code: &str) -> Result<RawResponse, String>;

    /// GET /history；Err 同上
    async fn fetch_history(&self) -> Result<RawResponse, String>;
}
