//! 实体适配器模块
//!
//! 提供统一的抽象层：每种业务表一个适配器，负责两件事 -
//! 把变更事件渲染成通知载荷（Message Builder），以及解析应当收到
//! 通知的用户集合（Recipient Resolver）。未知表使用 generic 适配器，
//! 保证分发流程对任何表名都不会失败。

use std::collections::BTreeSet;

use serde_json::Value;

use crate::category::Category;
use crate::directory::Directory;
use crate::event::{field_as_string, ChangeEvent};
use crate::payload::NotificationPayload;

/// 实体适配器 trait
pub trait EntityAdapter: Send + Sync {
    /// 该实体的通知分类
    fn category(&self) -> Category;

    /// 渲染通知载荷
    fn build(&self, event: &ChangeEvent, directory: &Directory) -> NotificationPayload;

    /// 解析收件人集合
    ///
    /// 返回集合已去重且不含空值；空集合是合法结果，调用方应跳过投递。
    fn recipients(&self, record: &Value, directory: &Directory) -> BTreeSet<String>;
}

/// 获取适配器
pub fn get_adapter(table: &str) -> Box<dyn EntityAdapter> {
    match table {
        "cases" => Box::new(cases::CaseAdapter),
        "tasks" => Box::new(tasks::TaskAdapter),
        "appointments" => Box::new(appointments::AppointmentAdapter),
        "clients" => Box::new(clients::ClientAdapter),
        "documents" => Box::new(documents::DocumentAdapter),
        "hearings" => Box::new(hearings::HearingAdapter),
        "case_orders" => Box::new(case_orders::CaseOrderAdapter),
        "notes" => Box::new(notes::NoteAdapter),
        _ => Box::new(generic::GenericAdapter::new(table)),
    }
}

/// 按固定优先序取第一个非空的指派字段
///
/// Direct-assignment entities notify a single owner; the first populated
/// field in `fields` wins.
pub(crate) fn first_assignee(record: &Value, fields: &[&str]) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    for field in fields {
        if let Some(id) = field_as_string(record, field) {
            out.insert(id);
            break;
        }
    }
    out
}

/// 收集 `assigned_users` 数组里的非空成员
pub(crate) fn collect_assigned_users(record: &Value, out: &mut BTreeSet<String>) {
    if let Some(users) = record.get("assigned_users").and_then(|v| v.as_array()) {
        for user in users {
            match user {
                Value::String(s) => {
                    let trimmed = s.trim();
                    if !trimmed.is_empty() {
                        out.insert(trimmed.to_string());
                    }
                }
                Value::Number(n) => {
                    out.insert(n.to_string());
                }
                _ => {}
            }
        }
    }
}

/// 案件记录上的完整团队：主办律师、协办人、co-assigned 列表
pub(crate) fn case_team(case_record: &Value) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    for field in ["assigned_lawyer_id", "assigned_to"] {
        if let Some(id) = field_as_string(case_record, field) {
            out.insert(id);
        }
    }
    collect_assigned_users(case_record, &mut out);
    out
}

/// 关系型实体：沿 case_id 外键取父案件的团队
pub(crate) fn via_parent_case(record: &Value, directory: &Directory) -> BTreeSet<String> {
    match field_as_string(record, "case_id") {
        Some(case_id) => directory
            .case_record(&case_id)
            .map(|case| case_team(&case))
            .unwrap_or_default(),
        None => BTreeSet::new(),
    }
}

/// 未知实体：所有可能的 owner 字段取并集
pub(crate) fn owner_union(record: &Value) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    for field in ["assigned_to", "lawyer_id", "assigned_lawyer_id", "uploaded_by"] {
        if let Some(id) = field_as_string(record, field) {
            out.insert(id);
        }
    }
    collect_assigned_users(record, &mut out);
    out
}

pub mod appointments;
pub mod case_orders;
pub mod cases;
pub mod clients;
pub mod documents;
pub mod generic;
pub mod hearings;
pub mod notes;
pub mod tasks;
