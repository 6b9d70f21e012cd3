//! HTTP 后端：reqwest 访问远端审计服务
//!
//! 单个共享 Client，带统一超时与 User-Agent；端点固定为
//! GET /（探测）、POST /analyze、GET /history。

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::api::{AnalysisBackend, RawResponse};

const USER_AGENT: &str = concat!("codeguard/", env!("CARGO_PKG_VERSION"));

/// HTTP 客户端：持有 Client 与服务基地址
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// 读状态码并解析 JSON 体；体解析失败视为传输层失败
    async fn into_raw(response: reqwest::Response) -> Result<RawResponse, String> {
        let status = response.status().as_u16();
        let body: Value = response.json().await.map_err(|e| e.to_string())?;
        Ok(RawResponse::new(status, body))
    }
}

#[async_trait]
impl AnalysisBackend for HttpBackend {
    async fn probe(&self) -> Result<(), String> {
        let response = self
            .client
            .get(self.endpoint("/"))
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(format!("probe returned status {}", response.status()))
        }
    }

    async fn analyze(&self, code: &str) -> Result<RawResponse, String> {
        let response = self
            .client
            .post(self.endpoint("/analyze"))
            .json(&json!({ "code": code }))
            .send()
            .await
            .map_err(|e| e.to_string())?;
        Self::into_raw(response).await
    }

    async fn fetch_history(&self) -> Result<RawResponse, String> {
        let response = self
            .client
            .get(self.endpoint("/history"))
            .send()
            .await
            .map_err(|e| e.to_string())?;
        Self::into_raw(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_without_double_slash() {
        let backend = HttpBackend::new("http://127.0.0.1:8000/", 5);
        assert_eq!(backend.endpoint("/analyze"), "http://127.0.0.1:8000/analyze");
    }
}
