//! Practice Notify - 律所业务系统的通知分发引擎
//!
//! 业务记录（案件、客户、预约、任务、文档、笔记、庭审、法院命令）的
//! 变更事件从这里进入：去重 → 构建消息 → 解析收件人 → 偏好判定 →
//! 投递路由 → 落库。CRUD 界面、聊天、账单、court 数据抓取和通知
//! 设置界面都是外部协作方。

pub mod category;
pub mod config;
pub mod dedup;
pub mod directory;
pub mod engine;
pub mod entity;
pub mod event;
pub mod handler;
pub mod payload;
pub mod preferences;
pub mod provider;
pub mod router;
pub mod store;

pub use category::{priority_meets_filter, Category, Priority, PriorityFilter};
pub use config::Config;
pub use dedup::{dedup_key, Admission, DedupGuard};
pub use directory::Directory;
pub use engine::{Decision, DeliveryPlan, PreferenceEngine, SkipReason};
pub use entity::{get_adapter, EntityAdapter};
pub use event::{ChangeEvent, Operation};
pub use handler::{DispatchHandler, DispatchResponse};
pub use payload::NotificationPayload;
pub use preferences::{
    CategoryPreference, DeliveryChannels, Frequency, PreferenceStore, QuietHours, UserPreferences,
};
pub use provider::{ProviderConfig, PushProviderClient};
pub use router::{Delivery, DeliveryMethod, DeliveryRouter};
pub use store::{DeliveryStatus, NotificationRecord, NotificationStore};
