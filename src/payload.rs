//! 通知载荷 - Message Builder 的输出，尚未持久化
//!
//! 每个事件构建一个 payload，经偏好引擎判定后才落库。
//! `suppress = true` 表示业务规则主动放弃本次通知（例如日历同步产生的
//! 预约更新事件），调用方应以 skipped 结束而不是报错。

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::category::{Category, Priority};

/// 通知载荷
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPayload {
    /// 机器可读的事件名（case_status_changed / task_completed / ...），
    /// 落库时作为 notification_type
    pub kind: String,
    /// 标题
    pub subject: String,
    /// 正文
    pub body: String,
    /// 分类标签
    pub category: Category,
    /// 优先级
    pub priority: Priority,
    /// 结构化附加数据
    pub metadata: Map<String, Value>,
    /// 点击跳转地址
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_url: Option<String>,
    /// 业务规则主动抑制
    #[serde(default)]
    pub suppress: bool,
}

impl NotificationPayload {
    /// 创建新的载荷，优先级默认 normal
    pub fn new(
        kind: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
        category: Category,
    ) -> Self {
        Self {
            kind: kind.into(),
            subject: subject.into(),
            body: body.into(),
            category,
            priority: Priority::Normal,
            metadata: Map::new(),
            action_url: None,
            suppress: false,
        }
    }

    /// 创建抑制载荷（kind 标明抑制来源，便于日志排查）
    pub fn suppressed(kind: impl Into<String>, category: Category) -> Self {
        let mut payload = Self::new(kind, "", "", category);
        payload.suppress = true;
        payload
    }

    /// 设置优先级
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// 设置跳转地址
    pub fn with_action_url(mut self, url: impl Into<String>) -> Self {
        self.action_url = Some(url.into());
        self
    }

    /// 追加一项 metadata
    pub fn with_meta(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}
