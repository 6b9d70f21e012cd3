//! CodeGuard - 代码安全审计 TUI 客户端
//!
//! 模块划分：
//! - **api**: 远端审计服务客户端抽象与实现（HTTP / Mock）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 会话编排：连通监测、分析会话、增量渲染、归档同步、主控循环
//! - **ui**: Ratatui TUI 界面

pub mod api;
pub mod config;
pub mod core;
pub mod ui;
