//! 推送服务商客户端
//!
//! 外部推送服务商持有投递与扇出逻辑：单次批量调用带上完整收件人
//! 列表，成功即视为投递完成，引擎侧不再逐人落库。调用设置了较短的
//! 超时：服务商不及时响应就走直写回退，绝不无限等待。

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::payload::NotificationPayload;

/// 服务商配置
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// API base URL
    pub base_url: String,
    /// Workflow key（trigger 路径的一段）
    pub workflow_key: String,
    /// Bearer 凭证，配置了凭证才视为服务商可用
    pub api_token: String,
    /// 超时时间（秒）
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9080".to_string(),
            workflow_key: "record-change".to_string(),
            api_token: String::new(),
            timeout_secs: 5,
        }
    }
}

/// 批量触发请求载荷
#[derive(Debug, Serialize)]
struct TriggerPayload {
    recipients: Vec<TriggerRecipient>,
    data: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct TriggerRecipient {
    id: String,
}

/// 服务商响应（仅用于日志，状态码才决定成败）
#[derive(Debug, Deserialize)]
pub struct TriggerResponse {
    #[serde(default)]
    pub acknowledged: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// 推送服务商客户端
#[derive(Debug)]
pub struct PushProviderClient {
    client: Client,
    config: ProviderConfig,
}

impl PushProviderClient {
    /// 创建新的客户端；凭证为空视为配置错误
    pub fn new(config: ProviderConfig) -> Result<Self, String> {
        if config.api_token.is_empty() {
            return Err("api_token is required".to_string());
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| format!("Failed to create HTTP client: {}", e))?;

        Ok(Self { client, config })
    }

    /// 单次批量触发
    ///
    /// 任何非 2xx 响应或网络失败都作为 Err 返回，调用方据此回退到
    /// 直写路径；错误从不上抛给入站调用者。
    pub async fn trigger(
        &self,
        recipients: &[String],
        payload: &NotificationPayload,
    ) -> Result<(), String> {
        let url = format!(
            "{}/workflows/{}/trigger",
            self.config.base_url.trim_end_matches('/'),
            self.config.workflow_key
        );

        let mut data = serde_json::Map::new();
        data.insert("subject".to_string(), payload.subject.clone().into());
        data.insert("body".to_string(), payload.body.clone().into());
        data.insert("category".to_string(), payload.category.as_str().into());
        data.insert("priority".to_string(), payload.priority.as_str().into());
        if let Some(url) = &payload.action_url {
            data.insert("action_url".to_string(), url.clone().into());
        }
        for (key, value) in &payload.metadata {
            data.entry(key.clone()).or_insert_with(|| value.clone());
        }

        let body = TriggerPayload {
            recipients: recipients
                .iter()
                .map(|id| TriggerRecipient { id: id.clone() })
                .collect(),
            data: serde_json::Value::Object(data),
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_token))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("HTTP request failed: {}", e))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let detail = response
                .json::<TriggerResponse>()
                .await
                .ok()
                .and_then(|r| r.error)
                .unwrap_or_else(|| "no error detail".to_string());
            Err(format!("provider returned {}: {}", status, detail))
        }
    }
}
