//! 用户通知偏好 - 模型与存储
//!
//! 每个用户一份偏好：全局开关、静默时段、按分类的开关/频率/优先级
//! 过滤、投递渠道。偏好由外部设置界面维护，本引擎只读；缺失的行为
//! 等同于默认行为（启用、无静默时段、即时、全部优先级）。

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::category::{Category, PriorityFilter};

/// 投递频率
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Instant,
    Digest,
    Off,
}

impl Default for Frequency {
    fn default() -> Self {
        Frequency::Instant
    }
}

/// 静默时段（每日循环的时刻窗口，允许跨午夜）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuietHours {
    #[serde(default)]
    pub enabled: bool,
    /// "HH:MM" 格式
    #[serde(default = "default_quiet_start")]
    pub start_time: String,
    #[serde(default = "default_quiet_end")]
    pub end_time: String,
}

fn default_quiet_start() -> String {
    "22:00".to_string()
}

fn default_quiet_end() -> String {
    "07:00".to_string()
}

impl Default for QuietHours {
    fn default() -> Self {
        Self {
            enabled: false,
            start_time: default_quiet_start(),
            end_time: default_quiet_end(),
        }
    }
}

impl QuietHours {
    /// 解析后的窗口；未启用或时刻非法时返回 None（等同无静默时段）
    pub fn window(&self) -> Option<(NaiveTime, NaiveTime)> {
        if !self.enabled {
            return None;
        }
        let start = parse_time_of_day(&self.start_time)?;
        let end = parse_time_of_day(&self.end_time)?;
        Some((start, end))
    }
}

/// "HH:MM" 或 "HH:MM:SS" 解析为时刻
pub fn parse_time_of_day(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s.trim(), "%H:%M:%S"))
        .ok()
}

/// 单个分类的偏好
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryPreference {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub frequency: Frequency,
    #[serde(default)]
    pub priority_filter: PriorityFilter,
}

fn default_true() -> bool {
    true
}

impl Default for CategoryPreference {
    fn default() -> Self {
        Self {
            enabled: true,
            frequency: Frequency::Instant,
            priority_filter: PriorityFilter::All,
        }
    }
}

/// 投递渠道开关（原样落到通知行上，由展示层消费）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryChannels {
    #[serde(default = "default_true")]
    pub in_app: bool,
    #[serde(default)]
    pub email: bool,
    #[serde(default)]
    pub browser: bool,
    #[serde(default)]
    pub sound: bool,
}

impl Default for DeliveryChannels {
    fn default() -> Self {
        Self {
            in_app: true,
            email: false,
            browser: false,
            sound: false,
        }
    }
}

/// 用户通知偏好
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
    #[serde(default = "default_true")]
    pub global_enabled: bool,
    #[serde(default)]
    pub quiet_hours: QuietHours,
    #[serde(default)]
    pub categories: HashMap<Category, CategoryPreference>,
    #[serde(default)]
    pub delivery_channels: DeliveryChannels,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            global_enabled: true,
            quiet_hours: QuietHours::default(),
            categories: HashMap::new(),
            delivery_channels: DeliveryChannels::default(),
        }
    }
}

impl UserPreferences {
    /// 取某分类的偏好，未显式配置时返回默认值
    pub fn category_pref(&self, category: Category) -> CategoryPreference {
        self.categories
            .get(&category)
            .cloned()
            .unwrap_or_default()
    }
}

/// 偏好存储 - data dir 下单个 JSON map 文件（user id → 偏好）
pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            path: data_dir.into().join("preferences.json"),
        }
    }

    fn read_all(&self) -> HashMap<String, UserPreferences> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(_) => return HashMap::new(),
        };
        match serde_json::from_str(&content) {
            Ok(map) => map,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Preferences file unreadable, using defaults");
                HashMap::new()
            }
        }
    }

    /// 读取某用户的偏好；缺失、文件不存在、解析失败都回落到默认偏好
    pub fn load(&self, user_id: &str) -> UserPreferences {
        self.read_all().remove(user_id).unwrap_or_default()
    }

    /// 写入某用户的偏好
    ///
    /// 写路径属于外部设置界面；引擎自身只在测试和运维工具里用到。
    pub fn put(&self, user_id: &str, prefs: &UserPreferences) -> Result<()> {
        use fs2::FileExt;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        // 锁住主文件本身，read-modify-write 期间排他
        let lock = OpenOptions::new()
            .create(true)
            .write(true)
            .open(&self.path)?;
        lock.lock_exclusive()?;

        let mut all = self.read_all();
        all.insert(user_id.to_string(), prefs.clone());

        let temp_path = self.path.with_extension("tmp");
        {
            let mut temp = fs::File::create(&temp_path)?;
            temp.write_all(serde_json::to_string_pretty(&all)?.as_bytes())?;
        }
        fs::rename(&temp_path, &self.path)?;

        lock.unlock()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_enable_everything_instant() {
        let prefs = UserPreferences::default();
        assert!(prefs.global_enabled);
        assert!(!prefs.quiet_hours.enabled);
        assert!(prefs.delivery_channels.in_app);

        let cat = prefs.category_pref(Category::Task);
        assert!(cat.enabled);
        assert_eq!(cat.frequency, Frequency::Instant);
        assert_eq!(cat.priority_filter, PriorityFilter::All);
    }

    #[test]
    fn test_missing_row_equals_default_row() {
        let tmp = tempfile::tempdir().unwrap();
        let store = PreferenceStore::new(tmp.path());
        assert_eq!(store.load("U1"), UserPreferences::default());
    }

    #[test]
    fn test_put_then_load_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let store = PreferenceStore::new(tmp.path());

        let mut prefs = UserPreferences::default();
        prefs.quiet_hours = QuietHours {
            enabled: true,
            start_time: "22:00".to_string(),
            end_time: "08:00".to_string(),
        };
        prefs.categories.insert(
            Category::Task,
            CategoryPreference {
                enabled: false,
                frequency: Frequency::Digest,
                priority_filter: PriorityFilter::High,
            },
        );
        store.put("U1", &prefs).unwrap();

        let loaded = store.load("U1");
        assert_eq!(loaded, prefs);
        // 其他用户不受影响
        assert_eq!(store.load("U2"), UserPreferences::default());
    }

    #[test]
    fn test_corrupt_file_falls_back_to_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("preferences.json"), "not json {").unwrap();
        let store = PreferenceStore::new(tmp.path());
        assert_eq!(store.load("U1"), UserPreferences::default());
    }

    #[test]
    fn test_partial_json_applies_field_defaults() {
        // 旧版设置界面只写了部分字段，其余字段走 serde default
        let tmp = tempfile::tempdir().unwrap();
        fs::write(
            tmp.path().join("preferences.json"),
            r#"{"U1": {"quiet_hours": {"enabled": true}}}"#,
        )
        .unwrap();
        let store = PreferenceStore::new(tmp.path());
        let prefs = store.load("U1");
        assert!(prefs.global_enabled);
        assert!(prefs.quiet_hours.enabled);
        assert_eq!(prefs.quiet_hours.start_time, "22:00");
    }

    #[test]
    fn test_quiet_hours_window_parsing() {
        let quiet = QuietHours {
            enabled: true,
            start_time: "22:00".to_string(),
            end_time: "08:00".to_string(),
        };
        let (start, end) = quiet.window().unwrap();
        assert_eq!(start, NaiveTime::from_hms_opt(22, 0, 0).unwrap());
        assert_eq!(end, NaiveTime::from_hms_opt(8, 0, 0).unwrap());

        // 未启用时没有窗口
        let disabled = QuietHours::default();
        assert!(disabled.window().is_none());

        // 非法时刻视同无窗口
        let broken = QuietHours {
            enabled: true,
            start_time: "25:99".to_string(),
            end_time: "08:00".to_string(),
        };
        assert!(broken.window().is_none());
    }

    #[test]
    fn test_parse_time_of_day_formats() {
        assert_eq!(
            parse_time_of_day("09:30"),
            NaiveTime::from_hms_opt(9, 30, 0)
        );
        assert_eq!(
            parse_time_of_day("09:30:15"),
            NaiveTime::from_hms_opt(9, 30, 15)
        );
        assert_eq!(parse_time_of_day("midnight"), None);
    }
}
