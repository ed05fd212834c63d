//! 分发处理器 - 事件进入引擎的唯一入口
//!
//! 流程：去重 → 构建消息（抑制即跳过）→ 解析收件人（为空即跳过）→
//! 投递路由。重复事件、业务抑制、无收件人都是预期内的成功结束，
//! 只有入站 JSON 畸形这类真正的异常才返回错误响应；上游会重投，
//! 幂等去重保证重投安全。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::Config;
use crate::dedup::{Admission, DedupGuard};
use crate::directory::Directory;
use crate::engine::PreferenceEngine;
use crate::entity::get_adapter;
use crate::event::ChangeEvent;
use crate::preferences::PreferenceStore;
use crate::provider::PushProviderClient;
use crate::router::DeliveryRouter;
use crate::store::NotificationStore;

/// 出站响应
///
/// 成功：`{"status": "ok", "recipientCount": 2, "method": "direct"}` 或
/// `{"status": "skipped", "reason": "..."}`；异常：`{"error": "..."}`。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DispatchResponse {
    pub fn ok(method: &str, recipient_count: usize) -> Self {
        Self {
            status: Some("ok".to_string()),
            reason: None,
            recipient_count: Some(recipient_count),
            method: Some(method.to_string()),
            error: None,
        }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            status: Some("skipped".to_string()),
            reason: Some(reason.into()),
            recipient_count: None,
            method: None,
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: None,
            reason: None,
            recipient_count: None,
            method: None,
            error: Some(message.into()),
        }
    }

    /// 是否属于错误响应类（对应 HTTP 5xx / 非零退出码）
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// 分发处理器
///
/// 无状态：每次调用之间不保留内存状态，全部状态在数据目录里
/// （dedup 目录、偏好文件、通知文件）。
pub struct DispatchHandler {
    guard: DedupGuard,
    directory: Directory,
    router: DeliveryRouter,
}

impl DispatchHandler {
    /// 按配置组装处理器
    pub fn new(config: &Config) -> Self {
        let provider = config.provider.clone().and_then(|provider_config| {
            match PushProviderClient::new(provider_config) {
                Ok(client) => Some(client),
                Err(e) => {
                    // 凭证不完整等配置问题降级为直写，不阻塞分发
                    warn!(error = %e, "Push provider misconfigured, using direct writes only");
                    None
                }
            }
        });

        let router = DeliveryRouter::new(
            PreferenceEngine::new(PreferenceStore::new(&config.data_dir)),
            NotificationStore::new(&config.data_dir),
        )
        .with_provider(provider)
        .with_dry_run(config.dry_run);

        Self {
            guard: DedupGuard::new(&config.data_dir),
            directory: Directory::new(&config.data_dir),
            router,
        }
    }

    /// 创建用于测试的处理器（独立数据目录，无服务商）
    pub fn new_for_test(data_dir: impl Into<std::path::PathBuf>) -> Self {
        let data_dir = data_dir.into();
        let config = Config {
            data_dir,
            provider: None,
            dry_run: false,
        };
        Self::new(&config)
    }

    /// 处理一个入站 JSON body
    pub async fn handle_json(&self, body: &str) -> DispatchResponse {
        match serde_json::from_str::<ChangeEvent>(body) {
            Ok(event) => self.handle(event).await,
            Err(e) => {
                warn!(error = %e, "Malformed change event");
                DispatchResponse::error(format!("malformed change event: {}", e))
            }
        }
    }

    /// 处理一个变更事件
    pub async fn handle(&self, event: ChangeEvent) -> DispatchResponse {
        self.handle_at(event, Utc::now()).await
    }

    /// 处理一个变更事件，时钟由调用方提供（测试用）
    pub async fn handle_at(&self, event: ChangeEvent, now: DateTime<Utc>) -> DispatchResponse {
        // 1. 去重：重复投递是预期情况，成功返回避免上游无限重投
        if self.guard.admit(&event) == Admission::Duplicate {
            info!(event = %event.describe(), "Duplicate event skipped");
            return DispatchResponse::skipped("duplicate event");
        }

        let adapter = get_adapter(&event.table);

        // 2. 构建消息：业务规则可以主动抑制
        let payload = adapter.build(&event, &self.directory);
        if payload.suppress {
            info!(event = %event.describe(), kind = %payload.kind, "Event suppressed by business rule");
            return DispatchResponse::skipped("suppressed");
        }

        // 3. 解析收件人：空集合合法，跳过而非报错
        let recipients = adapter.recipients(&event.record, &self.directory);
        if recipients.is_empty() {
            info!(event = %event.describe(), "No recipients resolved");
            return DispatchResponse::skipped("no recipients");
        }

        // 4. 投递
        let reference_id = event.record_id();
        let delivery = self
            .router
            .deliver(&recipients, &payload, reference_id.as_deref(), now)
            .await;

        info!(
            event = %event.describe(),
            method = delivery.method.as_str(),
            count = delivery.count,
            "Event dispatched"
        );
        DispatchResponse::ok(delivery.method.as_str(), delivery.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Operation;
    use serde_json::json;

    fn handler() -> (tempfile::TempDir, DispatchHandler) {
        let tmp = tempfile::tempdir().unwrap();
        let handler = DispatchHandler::new_for_test(tmp.path());
        (tmp, handler)
    }

    #[tokio::test]
    async fn test_malformed_body_is_error() {
        let (_tmp, handler) = handler();
        let response = handler.handle_json("{not json").await;
        assert!(response.is_error());
        assert!(response.status.is_none());
    }

    #[tokio::test]
    async fn test_unknown_operation_is_error() {
        let (_tmp, handler) = handler();
        let response = handler
            .handle_json(r#"{"table": "tasks", "eventType": "TRUNCATE", "record": {}}"#)
            .await;
        assert!(response.is_error());
    }

    #[tokio::test]
    async fn test_no_recipients_is_skipped() {
        let (_tmp, handler) = handler();
        let event = ChangeEvent::new("tasks", Operation::Insert, json!({"id": "t1"}));
        let response = handler.handle(event).await;
        assert_eq!(response.status.as_deref(), Some("skipped"));
        assert_eq!(response.reason.as_deref(), Some("no recipients"));
    }

    #[tokio::test]
    async fn test_suppressed_event_is_skipped() {
        let (_tmp, handler) = handler();
        let event = ChangeEvent::new(
            "appointments",
            Operation::Update,
            json!({"id": "a1", "assigned_lawyer_id": "U1"}),
        );
        let response = handler.handle(event).await;
        assert_eq!(response.reason.as_deref(), Some("suppressed"));
    }

    #[tokio::test]
    async fn test_duplicate_event_is_skipped() {
        let (_tmp, handler) = handler();
        let event = ChangeEvent::new(
            "tasks",
            Operation::Insert,
            json!({"id": "t1", "assigned_to": "U1"}),
        );
        let first = handler.handle(event.clone()).await;
        assert_eq!(first.status.as_deref(), Some("ok"));

        let second = handler.handle(event).await;
        assert_eq!(second.status.as_deref(), Some("skipped"));
        assert_eq!(second.reason.as_deref(), Some("duplicate event"));
    }

    #[tokio::test]
    async fn test_ok_response_serialization() {
        let response = DispatchResponse::ok("direct", 2);
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains(r#""status":"ok""#));
        assert!(json.contains(r#""recipientCount":2"#));
        assert!(json.contains(r#""method":"direct""#));
        assert!(!json.contains("error"));
    }

    #[tokio::test]
    async fn test_skipped_response_serialization() {
        let json = serde_json::to_string(&DispatchResponse::skipped("duplicate event")).unwrap();
        assert!(json.contains(r#""status":"skipped""#));
        assert!(json.contains(r#""reason":"duplicate event""#));
        assert!(!json.contains("recipientCount"));
    }
}
