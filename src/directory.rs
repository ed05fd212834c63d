//! 目录查询 - 只读的辅助查找
//!
//! 消息构建需要把 user id 渲染成显示名、把 case id 渲染成案件标题；
//! 关系型实体（documents / hearings / case_orders）的收件人解析还要
//! 取回父案件记录。数据由上游 CRUD 层维护，这里只读。

use std::fs;
use std::path::PathBuf;

use serde_json::Value;

use crate::event::field_as_string;

/// 目录查询句柄
///
/// Lookups read `directory/users.json` (id → display name) and
/// `directory/cases.json` (id → case record) under the data dir. Every
/// lookup degrades to the raw id when the file or the entry is missing,
/// so message building never fails on directory gaps.
#[derive(Debug, Clone)]
pub struct Directory {
    data_dir: PathBuf,
}

impl Directory {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    fn read_map(&self, file: &str) -> Option<Value> {
        let path = self.data_dir.join("directory").join(file);
        let content = fs::read_to_string(path).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// user id → 显示名，找不到时回退到 id 本身
    pub fn user_name(&self, user_id: &str) -> String {
        if let Some(users) = self.read_map("users.json") {
            if let Some(name) = users.get(user_id).and_then(|v| v.as_str()) {
                let name = name.trim();
                if !name.is_empty() {
                    return name.to_string();
                }
            }
        }
        user_id.to_string()
    }

    /// case id → 案件记录
    pub fn case_record(&self, case_id: &str) -> Option<Value> {
        self.read_map("cases.json")?.get(case_id).cloned()
    }

    /// case id → 案件标题，依次尝试 title / case_number，最后回退到 id
    pub fn case_title(&self, case_id: &str) -> String {
        if let Some(record) = self.case_record(case_id) {
            if let Some(title) = field_as_string(&record, "title") {
                return title;
            }
            if let Some(number) = field_as_string(&record, "case_number") {
                return number;
            }
        }
        case_id.to_string()
    }
}
