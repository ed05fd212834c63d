//! 偏好引擎 - 单个收件人的投递判定
//!
//! 判定序列（每步短路）：
//! 1. 读偏好（缺失即默认）
//! 2. 全局开关
//! 3. 分类开关
//! 4. 静默时段（允许跨午夜）→ pending + 静默期满时刻
//! 5. 频率：digest → pending + 当日批次键；off → 不投；instant → delivered
//! 6. 优先级过滤，最后执行：静默/摘要延后的通知同样受过滤约束
//!
//! 判定是全函数：任何输入都不会 panic，偏好读失败等同默认偏好。
//! `now` 作为显式参数传入，窗口计算可测试。

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use tracing::debug;

use crate::category::priority_meets_filter;
use crate::dedup::hash_content;
use crate::payload::NotificationPayload;
use crate::preferences::{DeliveryChannels, Frequency, PreferenceStore, UserPreferences};
use crate::store::DeliveryStatus;

/// 不投递的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    GloballyDisabled,
    CategoryDisabled,
    FrequencyOff,
    BelowPriorityFilter,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::GloballyDisabled => "globally disabled",
            SkipReason::CategoryDisabled => "category disabled",
            SkipReason::FrequencyOff => "frequency off",
            SkipReason::BelowPriorityFilter => "below priority filter",
        }
    }
}

/// 投递计划：状态、延后参数，以及收件人当时的渠道开关
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryPlan {
    pub delivery_status: DeliveryStatus,
    pub snoozed_until: Option<DateTime<Utc>>,
    pub digest_batch_id: Option<String>,
    pub delivery_channels: DeliveryChannels,
}

impl DeliveryPlan {
    fn instant(channels: DeliveryChannels) -> Self {
        Self {
            delivery_status: DeliveryStatus::Delivered,
            snoozed_until: None,
            digest_batch_id: None,
            delivery_channels: channels,
        }
    }

    fn snoozed(until: DateTime<Utc>, channels: DeliveryChannels) -> Self {
        Self {
            delivery_status: DeliveryStatus::Pending,
            snoozed_until: Some(until),
            digest_batch_id: None,
            delivery_channels: channels,
        }
    }

    fn digest(batch_id: String, channels: DeliveryChannels) -> Self {
        Self {
            delivery_status: DeliveryStatus::Pending,
            snoozed_until: None,
            digest_batch_id: Some(batch_id),
            delivery_channels: channels,
        }
    }
}

/// 判定结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Skip(SkipReason),
    Deliver(DeliveryPlan),
}

/// 时刻是否落在窗口内（窗口允许跨午夜）
///
/// `start < end`: in-window iff `start <= now < end`.
/// `start >= end`: the window wraps midnight, in-window iff
/// `now >= start || now < end`.
pub fn in_quiet_window(now: NaiveTime, start: NaiveTime, end: NaiveTime) -> bool {
    if start < end {
        start <= now && now < end
    } else {
        now >= start || now < end
    }
}

/// 下一次窗口结束时刻，严格晚于 now
///
/// 当天的 end 时刻已过（或恰好等于 now）时滚动到次日。
pub fn next_window_end(now: DateTime<Utc>, end: NaiveTime) -> DateTime<Utc> {
    let candidate = now.date_naive().and_time(end).and_utc();
    if candidate > now {
        candidate
    } else {
        candidate + Duration::days(1)
    }
}

/// 摘要批次键：每用户每个自然日一个批次
pub fn digest_batch_id(user_id: &str, date: NaiveDate) -> String {
    format!(
        "{:016x}",
        hash_content(&format!("{}:{}", user_id, date.format("%Y-%m-%d")))
    )
}

/// 偏好引擎
pub struct PreferenceEngine {
    store: PreferenceStore,
}

impl PreferenceEngine {
    pub fn new(store: PreferenceStore) -> Self {
        Self { store }
    }

    /// 对单个收件人做投递判定
    pub fn decide(&self, user_id: &str, payload: &NotificationPayload, now: DateTime<Utc>) -> Decision {
        let prefs = self.store.load(user_id);
        let decision = Self::decide_with(&prefs, user_id, payload, now);
        if let Decision::Skip(reason) = &decision {
            debug!(
                user_id = %user_id,
                kind = %payload.kind,
                reason = reason.as_str(),
                "Notification skipped by preferences"
            );
        }
        decision
    }

    /// 纯判定逻辑，偏好由调用方提供
    pub fn decide_with(
        prefs: &UserPreferences,
        user_id: &str,
        payload: &NotificationPayload,
        now: DateTime<Utc>,
    ) -> Decision {
        if !prefs.global_enabled {
            return Decision::Skip(SkipReason::GloballyDisabled);
        }

        let cat = prefs.category_pref(payload.category);
        if !cat.enabled {
            return Decision::Skip(SkipReason::CategoryDisabled);
        }

        let channels = prefs.delivery_channels;
        let plan = match prefs.quiet_hours.window() {
            Some((start, end)) if in_quiet_window(now.time(), start, end) => {
                DeliveryPlan::snoozed(next_window_end(now, end), channels)
            }
            _ => match cat.frequency {
                Frequency::Digest => {
                    DeliveryPlan::digest(digest_batch_id(user_id, now.date_naive()), channels)
                }
                Frequency::Off => return Decision::Skip(SkipReason::FrequencyOff),
                Frequency::Instant => DeliveryPlan::instant(channels),
            },
        };

        // 过滤最后执行：延后中的通知同样可能被优先级过滤掉
        if !priority_meets_filter(payload.priority, cat.priority_filter) {
            return Decision::Skip(SkipReason::BelowPriorityFilter);
        }

        Decision::Deliver(plan)
    }
}
