//! 投递路由 - 唯一对通知存储有副作用的组件
//!
//! 路由顺序：
//! 1. 配置了服务商凭证 → 单次批量触发，成功即返回（扇出归服务商）
//! 2. 服务商缺席 / 报错 / 超时 → 直写回退：逐收件人过偏好引擎，
//!    合格者各落一行通知
//!
//! 单个收件人的落库失败只记日志不中断循环，其余收件人照常投递；
//! 每行都是独立写入，不跨收件人使用事务。

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::engine::{Decision, PreferenceEngine};
use crate::payload::NotificationPayload;
use crate::provider::PushProviderClient;
use crate::store::{generate_notification_id, NotificationRecord, NotificationStore};

/// 实际走通的投递路径
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMethod {
    Provider,
    Direct,
}

impl DeliveryMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryMethod::Provider => "provider",
            DeliveryMethod::Direct => "direct",
        }
    }
}

/// 投递结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub method: DeliveryMethod,
    /// provider 路径：收件人总数；direct 路径：实际落库行数
    pub count: usize,
}

/// 投递路由器
pub struct DeliveryRouter {
    engine: PreferenceEngine,
    store: NotificationStore,
    provider: Option<PushProviderClient>,
    dry_run: bool,
}

impl DeliveryRouter {
    pub fn new(engine: PreferenceEngine, store: NotificationStore) -> Self {
        Self {
            engine,
            store,
            provider: None,
            dry_run: false,
        }
    }

    /// 配置推送服务商（None 表示仅直写）
    pub fn with_provider(mut self, provider: Option<PushProviderClient>) -> Self {
        self.provider = provider;
        self
    }

    /// 设置 dry-run 模式
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// 对一批收件人投递一个载荷
    pub async fn deliver(
        &self,
        recipients: &BTreeSet<String>,
        payload: &NotificationPayload,
        reference_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Delivery {
        let recipient_list: Vec<String> = recipients.iter().cloned().collect();

        if let Some(provider) = &self.provider {
            if self.dry_run {
                eprintln!(
                    "[DRY-RUN] Would trigger push provider for {} recipient(s)",
                    recipient_list.len()
                );
            } else {
                match provider.trigger(&recipient_list, payload).await {
                    Ok(()) => {
                        info!(
                            kind = %payload.kind,
                            recipients = recipient_list.len(),
                            "Delivered via push provider"
                        );
                        return Delivery {
                            method: DeliveryMethod::Provider,
                            count: recipient_list.len(),
                        };
                    }
                    Err(e) => {
                        // 回退是常规路径，不上抛
                        warn!(error = %e, "Push provider failed, falling back to direct store writes");
                    }
                }
            }
        }

        let mut written = 0;
        for recipient in &recipient_list {
            match self.engine.decide(recipient, payload, now) {
                Decision::Skip(reason) => {
                    debug!(
                        recipient = %recipient,
                        kind = %payload.kind,
                        reason = reason.as_str(),
                        "Recipient skipped"
                    );
                }
                Decision::Deliver(plan) => {
                    if self.dry_run {
                        eprintln!(
                            "[DRY-RUN] Would write notification for {}: {} ({})",
                            recipient,
                            payload.kind,
                            plan.delivery_status.as_str()
                        );
                        written += 1;
                        continue;
                    }

                    let record = NotificationRecord {
                        id: generate_notification_id(),
                        recipient_id: recipient.clone(),
                        notification_type: payload.kind.clone(),
                        title: payload.subject.clone(),
                        message: payload.body.clone(),
                        reference_id: reference_id.map(|s| s.to_string()),
                        category: payload.category,
                        priority: payload.priority,
                        action_url: payload.action_url.clone(),
                        metadata: payload.metadata.clone(),
                        delivery_channels: plan.delivery_channels,
                        delivery_status: plan.delivery_status,
                        read: false,
                        snoozed_until: plan.snoozed_until,
                        digest_batch_id: plan.digest_batch_id,
                        created_at: now,
                    };

                    match self.store.append(&record) {
                        Ok(()) => {
                            debug!(
                                recipient = %recipient,
                                id = %record.id,
                                status = record.delivery_status.as_str(),
                                "Notification written"
                            );
                            written += 1;
                        }
                        Err(e) => {
                            // 部分失败：跳过该收件人，其余继续
                            warn!(
                                recipient = %recipient,
                                error = %e,
                                "Failed to write notification, skipping recipient"
                            );
                        }
                    }
                }
            }
        }

        Delivery {
            method: DeliveryMethod::Direct,
            count: written,
        }
    }
}
