//! Mock 后端（用于测试与无服务演示）
//!
//! 默认探测成功、analyze 回显一份固定格式的审计报告、history 为空列表；
//! 测试可用 push_* 预置脚本化响应，并通过计数器断言调用次数。

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;

use crate::api::{AnalysisBackend, RawResponse};

/// Mock 客户端：脚本化响应队列 + 调用计数
#[derive(Default)]
pub struct MockBackend {
    probe_ok: AtomicBool,
    analyze_script: Mutex<VecDeque<Result<RawResponse, String>>>,
    history_script: Mutex<VecDeque<Result<RawResponse, String>>>,
    pub probe_calls: AtomicUsize,
    pub analyze_calls: AtomicUsize,
    pub history_calls: AtomicUsize,
}

impl MockBackend {
    pub fn new() -> Self {
        let mock = Self::default();
        mock.probe_ok.store(true, Ordering::SeqCst);
        mock
    }

    pub fn set_probe_ok(&self, ok: bool) {
        self.probe_ok.store(ok, Ordering::SeqCst);
    }

    /// 预置下一次 analyze 的返回值（队列，先进先出）
    pub fn push_analyze(&self, response: Result<RawResponse, String>) {
        self.analyze_script.lock().unwrap().push_back(response);
    }

    /// 预置下一次 fetch_history 的返回值
    pub fn push_history(&self, response: Result<RawResponse, String>) {
        self.history_script.lock().unwrap().push_back(response);
    }
}

#[async_trait]
impl AnalysisBackend for MockBackend {
    async fn probe(&self) -> Result<(), String> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        if self.probe_ok.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err("connection refused".to_string())
        }
    }

    async fn analyze(&self, code: &str) -> Result<RawResponse, String> {
        self.analyze_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(scripted) = self.analyze_script.lock().unwrap().pop_front() {
            return scripted;
        }
        Ok(RawResponse::new(
            200,
            json!({
                "audit_report": format!(
                    "## Mock Audit\n\nReviewed {} bytes of input. No issues found.",
                    code.len()
                ),
                "db_status": "Mock analysis complete",
            }),
        ))
    }

    async fn fetch_history(&self) -> Result<RawResponse, String> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(scripted) = self.history_script.lock().unwrap().pop_front() {
            return scripted;
        }
        Ok(RawResponse::new(200, json!({ "history": [] })))
    }
}
