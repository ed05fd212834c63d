//! 运行配置
//!
//! 数据目录与服务商凭证都从环境变量读取；凭证存在与否决定投递
//! 路由是否尝试服务商路径。

use std::env;
use std::path::PathBuf;

use crate::provider::ProviderConfig;

/// 引擎配置
#[derive(Debug, Clone)]
pub struct Config {
    /// 数据目录（dedup/、preferences.json、notifications.jsonl、directory/）
    pub data_dir: PathBuf,
    /// 推送服务商；None 表示仅直写
    pub provider: Option<ProviderConfig>,
    /// dry-run 模式
    pub dry_run: bool,
}

impl Config {
    /// 从环境变量构建配置
    ///
    /// - `PRACTICE_NOTIFY_DATA_DIR` 覆盖数据目录，默认 `~/.config/practice-notify`
    /// - `PRACTICE_NOTIFY_PROVIDER_TOKEN` 存在时启用服务商路径
    /// - `PRACTICE_NOTIFY_PROVIDER_URL` / `PRACTICE_NOTIFY_PROVIDER_KEY` /
    ///   `PRACTICE_NOTIFY_PROVIDER_TIMEOUT_SECS` 细化服务商配置
    pub fn from_env() -> Self {
        let data_dir = env::var("PRACTICE_NOTIFY_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::default_data_dir());

        // 凭证是服务商可用性的开关
        let provider = env::var("PRACTICE_NOTIFY_PROVIDER_TOKEN")
            .ok()
            .filter(|token| !token.trim().is_empty())
            .map(|api_token| {
                let defaults = ProviderConfig::default();
                ProviderConfig {
                    base_url: env::var("PRACTICE_NOTIFY_PROVIDER_URL")
                        .unwrap_or(defaults.base_url),
                    workflow_key: env::var("PRACTICE_NOTIFY_PROVIDER_KEY")
                        .unwrap_or(defaults.workflow_key),
                    api_token,
                    timeout_secs: env::var("PRACTICE_NOTIFY_PROVIDER_TIMEOUT_SECS")
                        .ok()
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(defaults.timeout_secs),
                }
            });

        Self {
            data_dir,
            provider,
            dry_run: false,
        }
    }

    /// 默认数据目录
    pub fn default_data_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("practice-notify")
    }

    /// 覆盖数据目录（链式调用）
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    /// 设置 dry-run 模式
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_data_dir_under_config() {
        let dir = Config::default_data_dir();
        assert!(dir.ends_with(".config/practice-notify") || dir.ends_with("practice-notify"));
    }

    #[test]
    fn test_builder_chain() {
        let config = Config {
            data_dir: PathBuf::from("/tmp/x"),
            provider: None,
            dry_run: false,
        }
        .with_data_dir("/tmp/y")
        .with_dry_run(true);

        assert_eq!(config.data_dir, PathBuf::from("/tmp/y"));
        assert!(config.dry_run);
    }
}
