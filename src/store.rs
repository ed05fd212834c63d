//! 通知存储 - 本地 JSONL 文件读写
//!
//! 通知表在本引擎内是 insert-only 的：投递路由每个合格收件人追加一行，
//! 已读状态、摘要汇总、静默期满的补投都由外部任务消费 pending 行完成。

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::category::{Category, Priority};
use crate::preferences::DeliveryChannels;

/// 投递状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    /// 即时送达
    Delivered,
    /// 延后（静默时段或摘要模式），由外部任务补投
    Pending,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::Pending => "pending",
        }
    }
}

/// 通知记录（JSONL 格式，每行一条）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRecord {
    /// 通知 id
    pub id: String,
    /// 收件人
    pub recipient_id: String,
    /// 机器可读的事件名（payload.kind）
    pub notification_type: String,
    /// 标题
    pub title: String,
    /// 正文
    pub message: String,
    /// 触发记录的主键
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<String>,
    /// 分类
    pub category: Category,
    /// 优先级
    pub priority: Priority,
    /// 跳转地址
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_url: Option<String>,
    /// 结构化附加数据
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// 收件人当时的渠道开关
    pub delivery_channels: DeliveryChannels,
    /// 投递状态
    pub delivery_status: DeliveryStatus,
    /// 已读标记（引擎只写 false，读侧翻转）
    #[serde(default)]
    pub read: bool,
    /// 静默期满时刻（pending + 静默时段时设置）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snoozed_until: Option<DateTime<Utc>>,
    /// 摘要批次键（pending + 摘要模式时设置）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest_batch_id: Option<String>,
    /// 创建时刻
    pub created_at: DateTime<Utc>,
}

static NOTIFICATION_ID_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// 生成通知 id
pub fn generate_notification_id() -> String {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let counter = NOTIFICATION_ID_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("ntf-{}-{}", timestamp, counter)
}

/// 通知存储
pub struct NotificationStore {
    path: PathBuf,
}

impl NotificationStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            path: data_dir.into().join("notifications.jsonl"),
        }
    }

    /// 追加一条通知（带文件锁）
    pub fn append(&self, record: &NotificationRecord) -> Result<()> {
        use fs2::FileExt;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        file.lock_exclusive()?;
        let mut file = file;
        writeln!(file, "{}", serde_json::to_string(record)?)?;
        file.unlock()?;

        Ok(())
    }

    /// 读取最近 N 条通知（按创建时刻排序）
    pub fn read_recent(&self, n: usize) -> Vec<NotificationRecord> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(_) => return Vec::new(),
        };

        let reader = BufReader::new(file);
        let records: Vec<NotificationRecord> = reader
            .lines()
            .filter_map(|line| line.ok())
            .filter_map(|line| serde_json::from_str(&line).ok())
            .collect();

        let start = records.len().saturating_sub(n);
        let mut recent = records[start..].to_vec();
        recent.sort_by_key(|r| r.created_at);
        recent
    }

    /// 某收件人的全部通知（测试和运维工具用）
    pub fn read_for_recipient(&self, recipient_id: &str) -> Vec<NotificationRecord> {
        self.read_recent(usize::MAX)
            .into_iter()
            .filter(|r| r.recipient_id == recipient_id)
            .collect()
    }
}
