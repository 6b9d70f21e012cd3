//! 会话编排集成测试：控制器 + Mock 后端走通完整流程

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::watch;

use codeguard::api::{MockBackend, RawResponse};
use codeguard::config::AppConfig;
use codeguard::core::{spawn_controller, Command, Liveness, SessionPhase, UiState};

/// 等待状态满足谓词（带超时，基于 watch 版本号不会漏更新）
async fn wait_for(
    rx: &mut watch::Receiver<UiState>,
    pred: impl Fn(&UiState) -> bool,
) -> UiState {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            {
                let state = rx.borrow_and_update();
                if pred(&state) {
                    return state.clone();
                }
            }
            rx.changed().await.expect("controller task ended");
        }
    })
    .await
    .expect("timed out waiting for state")
}

#[tokio::test]
async fn test_submit_reveals_full_report_and_sets_online() {
    let backend = Arc::new(MockBackend::new());
    backend.push_analyze(Ok(RawResponse::new(
        200,
        json!({ "audit_report": "No issues found.", "db_status": "Analysis Finalized" }),
    )));

    let (cmd_tx, mut state_rx) = spawn_controller(AppConfig::default(), backend.clone());
    cmd_tx
        .send(Command::Submit("def f(): pass".to_string()))
        .unwrap();

    let state = wait_for(&mut state_rx, |s| {
        s.phase == SessionPhase::Idle
            && s.report
                .as_ref()
                .map(|r| r.is_complete() && r.full_text == "No issues found.")
                .unwrap_or(false)
    })
    .await;

    assert_eq!(state.status.as_deref(), Some("Analysis Finalized"));
    assert_eq!(state.liveness, Liveness::Online);
    assert!(state.error_message.is_none());
    assert!(!state.input_locked);
    assert_eq!(backend.analyze_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_whitespace_submit_fails_locally_without_network() {
    let backend = Arc::new(MockBackend::new());
    let (cmd_tx, mut state_rx) = spawn_controller(AppConfig::default(), backend.clone());

    cmd_tx.send(Command::Submit("   \n\t ".to_string())).unwrap();

    let state = wait_for(&mut state_rx, |s| s.error_message.is_some()).await;
    assert!(state
        .error_message
        .unwrap()
        .starts_with("Input required"));
    assert_eq!(backend.analyze_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_archive_tab_switch_fetches_exactly_once() {
    let backend = Arc::new(MockBackend::new());
    backend.push_history(Ok(RawResponse::new(
        200,
        json!({ "history": [
            { "audit_report": "x", "code_submitted": "y" },
        ]}),
    )));

    let (cmd_tx, mut state_rx) = spawn_controller(AppConfig::default(), backend.clone());

    cmd_tx.send(Command::OpenArchive).unwrap();
    let state = wait_for(&mut state_rx, |s| {
        !s.loading_history && s.history.len() == 1
    })
    .await;

    // 旧存储模式字段按回退链归一化
    assert_eq!(state.history[0].report_text, "x");
    assert_eq!(state.history[0].source_code, "y");
    assert_eq!(state.history[0].id, "0");
    assert_eq!(state.liveness, Liveness::Online);
    assert_eq!(backend.history_calls.load(Ordering::SeqCst), 1);

    // 已在归档页签时重复 OpenArchive 不再触发拉取
    cmd_tx.send(Command::OpenArchive).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(backend.history_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_offline_gates_submission() {
    let backend = Arc::new(MockBackend::new());
    backend.set_probe_ok(false);

    let (cmd_tx, mut state_rx) = spawn_controller(AppConfig::default(), backend.clone());

    // 首个探测滴答立即触发，很快观察到 Offline
    wait_for(&mut state_rx, |s| s.liveness == Liveness::Offline).await;

    cmd_tx
        .send(Command::Submit("def f(): pass".to_string()))
        .unwrap();
    let state = wait_for(&mut state_rx, |s| s.error_message.is_some()).await;
    assert!(state.error_message.unwrap().contains("offline"));
    assert_eq!(backend.analyze_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_select_record_re_presents_stored_report() {
    let backend = Arc::new(MockBackend::new());
    backend.push_history(Ok(RawResponse::new(
        200,
        json!({ "history": [
            { "id": "a1", "report": "Stored report.", "code": "x = 1" },
        ]}),
    )));

    let (cmd_tx, mut state_rx) = spawn_controller(AppConfig::default(), backend.clone());

    cmd_tx.send(Command::OpenArchive).unwrap();
    wait_for(&mut state_rx, |s| s.history.len() == 1).await;

    cmd_tx.send(Command::SelectRecord("a1".to_string())).unwrap();
    let state = wait_for(&mut state_rx, |s| {
        s.report
            .as_ref()
            .map(|r| r.is_complete() && r.full_text == "Stored report.")
            .unwrap_or(false)
    })
    .await;
    assert_eq!(state.phase, SessionPhase::Idle);
}
