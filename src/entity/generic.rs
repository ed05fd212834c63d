//! 通用适配器
//!
//! 用于未知业务表：套用命名表名和操作的通用模板，收件人取所有
//! 可能的 owner 字段并集。保证处理器对任何 entityType 都不会抛错。

use std::collections::BTreeSet;

use serde_json::{json, Value};

use super::{owner_union, EntityAdapter};
use crate::category::{priority_from_record, Category};
use crate::directory::Directory;
use crate::event::{field_or, ChangeEvent};
use crate::payload::NotificationPayload;

/// 通用适配器，用于未知业务表
pub struct GenericAdapter {
    table: String,
}

impl GenericAdapter {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
        }
    }
}

impl EntityAdapter for GenericAdapter {
    fn category(&self) -> Category {
        Category::System
    }

    fn build(&self, event: &ChangeEvent, _directory: &Directory) -> NotificationPayload {
        let record = &event.record;
        let record_id = field_or(record, "id", "?");
        let verb = event.event_type.verb();

        NotificationPayload::new(
            format!("{}_{}", self.table, event.event_type.as_str()),
            format!("Record {} in {}", verb, self.table),
            format!("Record {} in \"{}\" was {}", record_id, self.table, verb),
            Category::System,
        )
        .with_priority(priority_from_record(record))
        .with_meta("table", json!(self.table))
        .with_meta("record_id", json!(record_id))
    }

    fn recipients(&self, record: &Value, _directory: &Directory) -> BTreeSet<String> {
        owner_union(record)
    }
}
