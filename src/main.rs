//! CodeGuard - 代码安全审计 TUI 客户端
//!
//! 入口：初始化日志、装配会话控制器与 TUI，并运行主循环。

use anyhow::Context;
use codeguard::config::{load_config, AppConfig};
use codeguard::core::{create_backend, spawn_controller};
use codeguard::ui::run_app;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 日志：默认 info，可通过 RUST_LOG 覆盖
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .with(fmt::layer())
        .init();

    let cfg = load_config(None).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        AppConfig::default()
    });

    let backend = create_backend(&cfg);
    let seed_snippet = cfg.app.seed_snippet.clone();

    // 控制器：返回命令发送端与状态接收端，后台任务驱动会话
    let (cmd_tx, state_rx) = spawn_controller(cfg, backend);

    // 启动 TUI 主循环（消费 state，向 cmd_tx 发送用户命令）
    run_app(state_rx, cmd_tx, seed_snippet)
        .await
        .context("App run failed")?;

    Ok(())
}
