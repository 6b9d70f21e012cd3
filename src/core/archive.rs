//! 归档同步：拉取远端历史并归一化为统一记录形状
//!
//! 远端存在两代存储模式（新字段 id/report/code/time 与旧字段
//! _id/audit_report/code_submitted），归一化函数按显式回退链逐字段取值。
//! 输出顺序保持远端返回顺序，本层不排序；最新在前只是显示约定（配置项）。

use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::api::AnalysisBackend;
use crate::core::error::AnalysisError;
use crate::core::liveness::{Liveness, LivenessHandle};

/// 归一化后的历史记录
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct HistoryRecord {
    pub id: String,
    pub report_text: String,
    pub source_code: String,
    pub timestamp: DateTime<Utc>,
}

/// 标量字段统一转字符串；null 视为缺失，结构化值序列化为 JSON 文本
fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

/// 按主字段 → 旧字段的顺序取值
fn field_with_fallback(item: &Value, primary: &str, legacy: &str) -> Option<String> {
    item.get(primary)
        .and_then(scalar_to_string)
        .or_else(|| item.get(legacy).and_then(scalar_to_string))
}

/// 时间字段：兼容带时区的 RFC3339 与后端 isoformat() 产生的无时区形式
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// 归一化单条远端记录
///
/// id: id → _id → 位置下标；报告与代码各有一个旧字段回退，双双缺失时取空串；
/// 时间缺失回退为「现在」，代价是无时间戳的记录在显示上与全新记录无法区分
/// （已接受的有损归一化取舍）。
pub fn normalize_record(item: &Value, index: usize) -> HistoryRecord {
    HistoryRecord {
        id: field_with_fallback(item, "id", "_id").unwrap_or_else(|| index.to_string()),
        report_text: field_with_fallback(item, "report", "audit_report").unwrap_or_default(),
        source_code: field_with_fallback(item, "code", "code_submitted").unwrap_or_default(),
        timestamp: item
            .get("time")
            .and_then(Value::as_str)
            .and_then(parse_timestamp)
            .unwrap_or_else(Utc::now),
    }
}

/// 归档同步器：持有当前归一化列表，按连通状态决定是否发起拉取
pub struct ArchiveSync {
    backend: Arc<dyn AnalysisBackend>,
    liveness: LivenessHandle,
    records: Vec<HistoryRecord>,
}

impl ArchiveSync {
    pub fn new(backend: Arc<dyn AnalysisBackend>, liveness: LivenessHandle) -> Self {
        Self {
            backend,
            liveness,
            records: Vec::new(),
        }
    }

    pub fn records(&self) -> &[HistoryRecord] {
        &self.records
    }

    /// 拉取并归一化历史列表
    ///
    /// 已知 Offline 时跳过网络调用、原样返回上次的列表（不去敲已知宕机的服务）；
    /// 非成功状态或请求失败 → ArchiveUnavailable 并降为 Offline；
    /// 成功拉取（包括空列表）→ Online。
    pub async fn fetch_history(&mut self) -> Result<&[HistoryRecord], AnalysisError> {
        if self.liveness.get() == Liveness::Offline {
            tracing::debug!("archive fetch skipped: service known offline");
            return Ok(&self.records);
        }

        let raw = match self.backend.fetch_history().await {
            Ok(raw) => raw,
            Err(message) => {
                self.liveness.set(Liveness::Offline);
                return Err(AnalysisError::ArchiveUnavailable(message));
            }
        };

        if !raw.ok {
            self.liveness.set(Liveness::Offline);
            return Err(AnalysisError::ArchiveUnavailable(format!(
                "history endpoint returned status {}",
                raw.status
            )));
        }

        // 服务应答但列表字段缺失：不算连通性失败，不降级
        let Some(list) = raw.body.get("history").and_then(Value::as_array) else {
            return Err(AnalysisError::ArchiveUnavailable(
                "history payload missing list field".to_string(),
            ));
        };

        self.records = list
            .iter()
            .enumerate()
            .map(|(idx, item)| normalize_record(item, idx))
            .collect();
        self.liveness.set(Liveness::Online);
        tracing::debug!("archive synced: {} records", self.records.len());
        Ok(&self.records)
    }
}
