//! 错误分类
//!
//! 每种错误对其触发调用都是终态：核心层不做任何自动重试，
//! 一律以类型化结果上抛。NetworkError 与 ArchiveUnavailable 额外把连通状态降为 Offline。

use thiserror::Error;

/// 会话与归档操作可能出现的错误（分类见各调用点）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    /// 空提交，在任何 I/O 之前拦截
    #[error("Input required: paste source code before running an audit")]
    InvalidInput,

    /// 远端明确报告的语义性失败（响应体 error 字段）
    #[error("Service error: {0}")]
    ServiceError(String),

    /// 框架层错误（响应体 detail 字段），非语义性
    #[error("Transport error: {0}")]
    TransportError(String),

    /// 响应形状无法识别
    #[error("Engine returned an unrecognized format")]
    MalformedResponse,

    /// 传输层失败：不可达、超时、连接重置、响应体解析失败
    #[error("Network error: {0}")]
    NetworkError(String),

    /// 归档拉取失败
    #[error("Archive unavailable: {0}")]
    ArchiveUnavailable(String),
}
