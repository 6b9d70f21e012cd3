//! 分析会话：一次代码提交 → 报告取回的生命周期
//!
//! 校验在任何 I/O 之前完成；响应分类按严格优先级（error 字段 > detail 字段 >
//! 成功 + 报告字段 > 无法识别），同一响应可能满足多个形状时以先匹配者为准。
//! 本层不重试：一次 submit，一个结果。

use std::sync::Arc;

use serde_json::Value;

use crate::api::{AnalysisBackend, RawResponse};
use crate::core::error::AnalysisError;
use crate::core::liveness::{Liveness, LivenessHandle};

/// 报告字段缺省状态文本
pub const DEFAULT_STATUS: &str = "Analysis Finalized";

/// 后端模型缺失时的可操作提示；只改消息文本，不改错误类别
const MODEL_NOT_FOUND_HINT: &str =
    "Model not found: the analysis engine references a missing model. \
     Update the backend model configuration and redeploy.";

/// 经过校验的提交请求；一旦构造成功即不可变
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    source_code: String,
}

impl AnalysisRequest {
    /// 空白输入在此拦截（InvalidInput），不发起任何网络调用
    pub fn new(raw: impl Into<String>) -> Result<Self, AnalysisError> {
        let source_code: String = raw.into();
        if source_code.trim().is_empty() {
            return Err(AnalysisError::InvalidInput);
        }
        Ok(Self { source_code })
    }

    pub fn source_code(&self) -> &str {
        &self.source_code
    }
}

/// 成功分类的结果：报告全文 + 状态文本
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisSuccess {
    pub report_text: String,
    pub status_text: String,
}

/// 分析会话：同一时刻至多一个在途请求（由控制器锁定输入保证）
pub struct AnalysisSession {
    backend: Arc<dyn AnalysisBackend>,
    liveness: LivenessHandle,
}

impl AnalysisSession {
    pub fn new(backend: Arc<dyn AnalysisBackend>, liveness: LivenessHandle) -> Self {
        Self { backend, liveness }
    }

    /// 提交一次分析并分类结果
    ///
    /// 成功会把连通状态乐观地置为 Online（一次完整往返本身就是连通信号）；
    /// NetworkError 降为 Offline。ServiceError 不降级：服务给出了语义错误，
    /// 恰恰证明它可达。
    pub async fn submit(&self, request: &AnalysisRequest) -> Result<AnalysisSuccess, AnalysisError> {
        let raw = match self.backend.analyze(request.source_code()).await {
            Ok(raw) => raw,
            Err(message) => {
                self.liveness.set(Liveness::Offline);
                return Err(remap_model_not_found(AnalysisError::NetworkError(message)));
            }
        };

        match classify(&raw) {
            Ok(success) => {
                self.liveness.set(Liveness::Online);
                Ok(success)
            }
            Err(e) => Err(remap_model_not_found(e)),
        }
    }
}

/// 取字段并按 JSX 式真值语义过滤：null 与空字符串视同缺失
fn present<'a>(body: &'a Value, key: &str) -> Option<&'a Value> {
    body.get(key)
        .filter(|v| !v.is_null())
        .filter(|v| v.as_str().map(|s| !s.is_empty()).unwrap_or(true))
}

/// 字符串字段取原文，结构化字段序列化为 JSON 文本
fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// 响应分类，优先级从高到低：
/// 1. error 字段 → ServiceError
/// 2. detail 字段 → TransportError
/// 3. HTTP 成功且 audit_report 非空 → 成功（db_status 缺省为固定文本）
/// 4. 其余 → MalformedResponse
pub fn classify(raw: &RawResponse) -> Result<AnalysisSuccess, AnalysisError> {
    if let Some(err) = present(&raw.body, "error") {
        return Err(AnalysisError::ServiceError(stringify(err)));
    }

    if let Some(detail) = present(&raw.body, "detail") {
        return Err(AnalysisError::TransportError(stringify(detail)));
    }

    if raw.ok {
        if let Some(report) = present(&raw.body, "audit_report").and_then(Value::as_str) {
            let status_text = raw
                .body
                .get("db_status")
                .and_then(Value::as_str)
                .unwrap_or(DEFAULT_STATUS)
                .to_string();
            return Ok(AnalysisSuccess {
                report_text: report.to_string(),
                status_text,
            });
        }
    }

    Err(AnalysisError::MalformedResponse)
}

/// 「模型缺失」特判：消息同时含 "404" 与 "models/"（不分大小写）时替换为
/// 可操作提示。只是措辞改写，错误类别保持不变。
fn remap_model_not_found(err: AnalysisError) -> AnalysisError {
    fn matches_pattern(message: &str) -> bool {
        message.contains("404") && message.to_ascii_lowercase().contains("models/")
    }

    match err {
        AnalysisError::NetworkError(m) if matches_pattern(&m) => {
            AnalysisError::NetworkError(MODEL_NOT_FOUND_HINT.to_string())
        }
        AnalysisError::TransportError(m) if matches_pattern(&m) => {
            AnalysisError::TransportError(MODEL_NOT_FOUND_HINT.to_string())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_and_whitespace_input_rejected() {
        assert_eq!(
            AnalysisRequest::new("").unwrap_err(),
            AnalysisError::InvalidInput
        );
        assert_eq!(
            AnalysisRequest::new("   \n\t  ").unwrap_err(),
            AnalysisError::InvalidInput
        );
        assert!(AnalysisRequest::new("def f(): pass").is_ok());
    }

    #[test]
    fn test_classify_success_with_status() {
        let raw = RawResponse::new(
            200,
            json!({ "audit_report": "No issues found.", "db_status": "Analysis Finalized" }),
        );
        let success = classify(&raw).unwrap();
        assert_eq!(success.report_text, "No issues found.");
        assert_eq!(success.status_text, "Analysis Finalized");
    }

    #[test]
    fn test_classify_success_default_status() {
        let raw = RawResponse::new(200, json!({ "audit_report": "Clean." }));
        let success = classify(&raw).unwrap();
        assert_eq!(success.status_text, DEFAULT_STATUS);
    }

    #[test]
    fn test_error_field_wins_over_report() {
        let raw = RawResponse::new(
            200,
            json!({ "error": "quota exceeded", "audit_report": "No issues found." }),
        );
        assert_eq!(
            classify(&raw).unwrap_err(),
            AnalysisError::ServiceError("quota exceeded".to_string())
        );
    }

    #[test]
    fn test_detail_field_maps_to_transport_error() {
        let raw = RawResponse::new(200, json!({ "detail": "Invalid model" }));
        assert_eq!(
            classify(&raw).unwrap_err(),
            AnalysisError::TransportError("Invalid model".to_string())
        );
    }

    #[test]
    fn test_structured_detail_is_stringified() {
        let raw = RawResponse::new(422, json!({ "detail": [{"loc": ["body", "code"]}] }));
        match classify(&raw).unwrap_err() {
            AnalysisError::TransportError(m) => assert!(m.contains("loc")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_unrecognized_shape_is_malformed() {
        let raw = RawResponse::new(200, json!({ "something": 1 }));
        assert_eq!(classify(&raw).unwrap_err(), AnalysisError::MalformedResponse);

        // 非成功状态下即使带报告字段也不算成功
        let raw = RawResponse::new(500, json!({ "audit_report": "x" }));
        assert_eq!(classify(&raw).unwrap_err(), AnalysisError::MalformedResponse);

        // 空报告字段同样无法识别
        let raw = RawResponse::new(200, json!({ "audit_report": "" }));
        assert_eq!(classify(&raw).unwrap_err(), AnalysisError::MalformedResponse);
    }

    #[test]
    fn test_null_error_field_is_ignored() {
        let raw = RawResponse::new(200, json!({ "error": null, "audit_report": "ok" }));
        assert!(classify(&raw).is_ok());
    }

    #[test]
    fn test_model_not_found_remap_keeps_kind() {
        let remapped = remap_model_not_found(AnalysisError::NetworkError(
            "404 Not Found: MODELS/gemini-pro is not available".to_string(),
        ));
        match remapped {
            AnalysisError::NetworkError(m) => assert!(m.starts_with("Model not found")),
            other => panic!("kind changed: {:?}", other),
        }

        // 不匹配的消息原样保留
        let untouched =
            remap_model_not_found(AnalysisError::NetworkError("connection reset".to_string()));
        assert_eq!(
            untouched,
            AnalysisError::NetworkError("connection reset".to_string())
        );
    }

    #[tokio::test]
    async fn test_submit_success_sets_online_and_network_error_sets_offline() {
        use crate::api::MockBackend;

        let backend = Arc::new(MockBackend::new());
        let liveness = LivenessHandle::new();
        let session = AnalysisSession::new(backend.clone(), liveness.clone());
        let request = AnalysisRequest::new("def f(): pass").unwrap();

        backend.push_analyze(Ok(RawResponse::new(
            200,
            json!({ "audit_report": "No issues found.", "db_status": "Analysis Finalized" }),
        )));
        let success = session.submit(&request).await.unwrap();
        assert_eq!(success.report_text, "No issues found.");
        assert_eq!(liveness.get(), Liveness::Online);

        backend.push_analyze(Err("dns lookup failed".to_string()));
        let err = session.submit(&request).await.unwrap_err();
        assert_eq!(
            err,
            AnalysisError::NetworkError("dns lookup failed".to_string())
        );
        assert_eq!(liveness.get(), Liveness::Offline);
    }

    #[tokio::test]
    async fn test_service_error_does_not_demote_liveness() {
        use crate::api::MockBackend;

        let backend = Arc::new(MockBackend::new());
        let liveness = LivenessHandle::new();
        liveness.set(Liveness::Online);
        let session = AnalysisSession::new(backend.clone(), liveness.clone());

        backend.push_analyze(Ok(RawResponse::new(200, json!({ "error": "boom" }))));
        let request = AnalysisRequest::new("x = 1").unwrap();
        assert!(session.submit(&request).await.is_err());
        assert_eq!(liveness.get(), Liveness::Online);
    }
}
