//! 会话控制器：主控循环（组合根）
//!
//! 负责：装配后端 / 监测 / 会话 / 揭示器 / 归档同步，建立 cmd/state 双通道，
//! 在后台任务中消费用户命令（Submit/OpenArchive/SelectRecord/...），
//! 按连通状态做提交门禁，把成功结果接入揭示器并投影到 UiState。
//! 轮询以作用域句柄持有，循环退出即回收。

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};

use crate::api::{AnalysisBackend, HttpBackend, MockBackend};
use crate::config::AppConfig;
use crate::core::archive::ArchiveSync;
use crate::core::liveness::{ConnectionMonitor, Liveness, LivenessHandle};
use crate::core::reveal::{RenderState, Revealer};
use crate::core::session::{AnalysisRequest, AnalysisSession};
use crate::core::state::{SessionPhase, Tab, UiState};

/// 从 UI 发往控制器的用户命令
#[derive(Debug, Clone)]
pub enum Command {
    /// 提交编辑器内容，触发一次分析
    Submit(String),
    /// 切到审计页签
    OpenAudit,
    /// 切到归档页签（切入时恰好触发一次拉取）
    OpenArchive,
    /// 手动刷新归档
    RefreshArchive,
    /// 从归档中选中一条记录，重新展示其报告
    SelectRecord(String),
    /// 清空当前报告与状态文本
    Clear,
    /// 退出应用
    Quit,
}

/// 根据配置选择后端（base_url = "mock" 时走内置 Mock，便于无服务演示）
pub fn create_backend(cfg: &AppConfig) -> Arc<dyn AnalysisBackend> {
    if cfg.server.base_url == "mock" {
        tracing::warn!("base_url is \"mock\", using in-process mock backend");
        Arc::new(MockBackend::new())
    } else {
        tracing::info!("using analysis service at {}", cfg.server.base_url);
        Arc::new(HttpBackend::new(
            &cfg.server.base_url,
            cfg.server.request_timeout_secs,
        ))
    }
}

/// 启动控制器：返回命令发送端与状态接收端；后台任务消费命令并投影 UiState
pub fn spawn_controller(
    cfg: AppConfig,
    backend: Arc<dyn AnalysisBackend>,
) -> (mpsc::UnboundedSender<Command>, watch::Receiver<UiState>) {
    let liveness = LivenessHandle::new();
    let monitor = ConnectionMonitor::new(backend.clone(), liveness.clone());
    let session = AnalysisSession::new(backend.clone(), liveness.clone());
    let mut archive = ArchiveSync::new(backend, liveness.clone());
    let mut revealer = Revealer::new(Duration::from_millis(cfg.ui.reveal_tick_ms));

    let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel::<Command>();
    let initial = UiState {
        newest_first: cfg.archive.newest_first,
        ..UiState::default()
    };
    let (state_tx, state_rx) = watch::channel(initial.clone());

    let probe_interval = Duration::from_secs(cfg.server.probe_interval_secs);
    let mut liveness_rx = liveness.subscribe();

    tokio::spawn(async move {
        // 激活即开始轮询；_poll 在任务退出时 drop，轮询随之取消
        let _poll = monitor.start_polling(probe_interval);

        let mut ui = initial;
        let mut reveal_rx: Option<mpsc::UnboundedReceiver<RenderState>> = None;

        loop {
            tokio::select! {
                maybe_cmd = cmd_rx.recv() => {
                    let Some(cmd) = maybe_cmd else { break };
                    match cmd {
                        Command::Submit(raw) => {
                            if ui.input_locked {
                                continue;
                            }
                            // 门禁直接读共享句柄，UiState 里的值可能滞后一拍
                            if liveness.get() == Liveness::Offline {
                                ui.error_message = Some(
                                    "Service offline: submission disabled until the link recovers"
                                        .to_string(),
                                );
                                let _ = state_tx.send(ui.clone());
                                continue;
                            }
                            let request = match AnalysisRequest::new(raw) {
                                Ok(request) => request,
                                Err(e) => {
                                    ui.error_message = Some(e.to_string());
                                    let _ = state_tx.send(ui.clone());
                                    continue;
                                }
                            };

                            revealer.cancel();
                            reveal_rx = None;
                            ui.phase = SessionPhase::Analyzing;
                            ui.input_locked = true;
                            ui.status = Some("Analyzing heuristics...".to_string());
                            ui.error_message = None;
                            ui.report = None;
                            let _ = state_tx.send(ui.clone());

                            // 在循环内就地等待：天然保证同一时刻至多一个在途提交
                            match session.submit(&request).await {
                                Ok(success) => {
                                    ui.phase = SessionPhase::Revealing;
                                    ui.input_locked = false;
                                    ui.status = Some(success.status_text);
                                    ui.report = Some(RenderState::new(success.report_text.clone()));
                                    reveal_rx = Some(revealer.present(success.report_text));
                                }
                                Err(e) => {
                                    tracing::warn!("analysis failed: {}", e);
                                    ui.phase = SessionPhase::Error;
                                    ui.input_locked = false;
                                    ui.status = None;
                                    ui.error_message = Some(e.to_string());
                                }
                            }
                            ui.liveness = liveness.get();
                            let _ = state_tx.send(ui.clone());
                        }
                        Command::OpenAudit => {
                            if ui.tab != Tab::Audit {
                                ui.tab = Tab::Audit;
                                let _ = state_tx.send(ui.clone());
                            }
                        }
                        Command::OpenArchive => {
                            // 只在切入时拉取一次，重复的 OpenArchive 是 no-op
                            if ui.tab != Tab::Archive {
                                ui.tab = Tab::Archive;
                                refresh_archive(&mut archive, &mut ui, &state_tx, &liveness).await;
                            }
                        }
                        Command::RefreshArchive => {
                            refresh_archive(&mut archive, &mut ui, &state_tx, &liveness).await;
                        }
                        Command::SelectRecord(id) => {
                            let Some(record) = ui.history.iter().find(|r| r.id == id).cloned()
                            else {
                                continue;
                            };
                            revealer.cancel();
                            ui.tab = Tab::Audit;
                            ui.phase = SessionPhase::Revealing;
                            ui.status = None;
                            ui.error_message = None;
                            ui.report = Some(RenderState::new(record.report_text.clone()));
                            reveal_rx = Some(revealer.present(record.report_text));
                            let _ = state_tx.send(ui.clone());
                        }
                        Command::Clear => {
                            revealer.cancel();
                            reveal_rx = None;
                            ui.phase = SessionPhase::Idle;
                            ui.status = None;
                            ui.error_message = None;
                            ui.report = None;
                            let _ = state_tx.send(ui.clone());
                        }
                        Command::Quit => break,
                    }
                }
                Ok(()) = liveness_rx.changed() => {
                    ui.liveness = *liveness_rx.borrow_and_update();
                    let _ = state_tx.send(ui.clone());
                }
                step = recv_reveal(&mut reveal_rx) => {
                    match step {
                        Some(state) => {
                            let complete = state.is_complete();
                            ui.report = Some(state);
                            if complete {
                                reveal_rx = None;
                                if ui.phase == SessionPhase::Revealing {
                                    ui.phase = SessionPhase::Idle;
                                }
                            }
                            let _ = state_tx.send(ui.clone());
                        }
                        None => reveal_rx = None,
                    }
                }
            }
        }
    });

    (cmd_tx, state_rx)
}

/// 无在途展示时永远挂起，让 select 的其余分支接管
async fn recv_reveal(
    rx: &mut Option<mpsc::UnboundedReceiver<RenderState>>,
) -> Option<RenderState> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// 拉取归档并投影；错误与连通降级由 ArchiveSync 内部处理
async fn refresh_archive(
    archive: &mut ArchiveSync,
    ui: &mut UiState,
    state_tx: &watch::Sender<UiState>,
    liveness: &LivenessHandle,
) {
    ui.loading_history = true;
    let _ = state_tx.send(ui.clone());

    match archive.fetch_history().await {
        Ok(records) => {
            ui.history = records.to_vec();
            ui.error_message = None;
        }
        Err(e) => {
            tracing::warn!("archive fetch failed: {}", e);
            ui.error_message = Some(e.to_string());
        }
    }

    ui.loading_history = false;
    ui.liveness = liveness.get();
    let _ = state_tx.send(ui.clone());
}
