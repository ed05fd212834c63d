//! 变更事件模型 - 数据层 change-capture 推送的入站事件
//!
//! 上游触发器对业务记录（案件、任务、预约等）的每次写入都会产生一个
//! ChangeEvent。本模块只定义数据结构和字段访问，不做任何持久化。

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 记录变更操作类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    #[serde(rename = "INSERT")]
    Insert,
    #[serde(rename = "UPDATE")]
    Update,
    #[serde(rename = "DELETE")]
    Delete,
}

impl Operation {
    /// Lowercase form, used in dedup keys and notification kinds.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Insert => "insert",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }

    /// Past-tense verb for generic message templates.
    pub fn verb(&self) -> &'static str {
        match self {
            Operation::Insert => "created",
            Operation::Update => "updated",
            Operation::Delete => "deleted",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 入站变更事件
///
/// 入站 JSON 格式：`{ "table": "...", "eventType": "INSERT|UPDATE|DELETE",
/// "record": {...}, "oldRecord": {...}|null }`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    /// 业务表名（cases / tasks / appointments / ...）
    pub table: String,
    /// 操作类型
    pub event_type: Operation,
    /// 变更后的记录
    pub record: Value,
    /// 变更前的记录（INSERT 时为 null）
    #[serde(default)]
    pub old_record: Option<Value>,
}

impl ChangeEvent {
    /// 创建新的变更事件
    pub fn new(table: impl Into<String>, event_type: Operation, record: Value) -> Self {
        Self {
            table: table.into(),
            event_type,
            record,
            old_record: None,
        }
    }

    /// 设置变更前记录（链式调用）
    pub fn with_old_record(mut self, old_record: Value) -> Self {
        self.old_record = Some(old_record);
        self
    }

    /// 记录主键，string 和 number 两种形式都接受
    pub fn record_id(&self) -> Option<String> {
        field_as_string(&self.record, "id")
    }

    /// 便于日志输出的事件摘要
    pub fn describe(&self) -> String {
        format!(
            "{} {} (id={})",
            self.table,
            self.event_type,
            self.record_id().unwrap_or_else(|| "?".to_string())
        )
    }
}

/// 读取记录字段并归一化为 String
///
/// Upstream rows come through as loose JSON, so an id may arrive as a
/// string or a number. Empty and whitespace-only strings count as absent.
pub fn field_as_string(record: &Value, key: &str) -> Option<String> {
    match record.get(key) {
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// 读取字段，缺失时回退到占位符
pub fn field_or(record: &Value, key: &str, fallback: &str) -> String {
    field_as_string(record, key).unwrap_or_else(|| fallback.to_string())
}

/// 检测新旧记录在某字段上是否发生变化
///
/// Returns `Some((old, new))` only when both sides are present and differ.
pub fn field_transition(record: &Value, old_record: Option<&Value>, key: &str) -> Option<(String, String)> {
    let new_value = field_as_string(record, key)?;
    let old_value = field_as_string(old_record?, key)?;
    if old_value != new_value {
        Some((old_value, new_value))
    } else {
        None
    }
}
