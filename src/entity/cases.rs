//! 案件适配器
//!
//! 状态流转检测优先于普通更新：old.status != new.status 时必须产出
//! "status changed" 消息，即使本次更新还改了其他字段。

use std::collections::BTreeSet;

use serde_json::{json, Value};

use super::{case_team, EntityAdapter};
use crate::category::{priority_from_record, Category};
use crate::directory::Directory;
use crate::event::{field_or, field_transition, ChangeEvent, Operation};
use crate::payload::NotificationPayload;

pub struct CaseAdapter;

impl CaseAdapter {
    fn title(record: &Value) -> String {
        crate::event::field_as_string(record, "title")
            .or_else(|| crate::event::field_as_string(record, "case_number"))
            .unwrap_or_else(|| "case".to_string())
    }
}

impl EntityAdapter for CaseAdapter {
    fn category(&self) -> Category {
        Category::Case
    }

    fn build(&self, event: &ChangeEvent, directory: &Directory) -> NotificationPayload {
        let record = &event.record;
        let title = Self::title(record);
        let case_id = field_or(record, "id", "?");

        let payload = match event.event_type {
            Operation::Insert => {
                let creator = directory.user_name(&field_or(record, "created_by", "someone"));
                NotificationPayload::new(
                    "case_created",
                    "New case created",
                    format!("Case \"{}\" has been created by {}", title, creator),
                    Category::Case,
                )
            }
            Operation::Update => {
                // 状态流转优先，普通字段更新退居其次
                if let Some((old_status, new_status)) =
                    field_transition(record, event.old_record.as_ref(), "status")
                {
                    NotificationPayload::new(
                        "case_status_changed",
                        "Case status updated",
                        format!(
                            "Case \"{}\" moved from {} to {}",
                            title, old_status, new_status
                        ),
                        Category::Case,
                    )
                    .with_meta("old_status", json!(old_status))
                    .with_meta("new_status", json!(new_status))
                } else {
                    NotificationPayload::new(
                        "case_updated",
                        "Case updated",
                        format!("Case \"{}\" has been updated", title),
                        Category::Case,
                    )
                }
            }
            Operation::Delete => NotificationPayload::new(
                "case_deleted",
                "Case removed",
                format!("Case \"{}\" has been removed", title),
                Category::Case,
            ),
        };

        payload
            .with_priority(priority_from_record(record))
            .with_action_url(format!("/cases/{}", case_id))
            .with_meta("case_id", json!(case_id))
    }

    fn recipients(&self, record: &Value, _directory: &Directory) -> BTreeSet<String> {
        case_team(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory() -> (tempfile::TempDir, Directory) {
        let tmp = tempfile::tempdir().unwrap();
        let dir = Directory::new(tmp.path());
        (tmp, dir)
    }

    #[test]
    fn test_case_insert_message() {
        let (_tmp, dir) = directory();
        let event = ChangeEvent::new(
            "cases",
            Operation::Insert,
            json!({"id": "C1", "title": "Sharma v. State", "created_by": "U1"}),
        );
        let payload = CaseAdapter.build(&event, &dir);
        assert_eq!(payload.kind, "case_created");
        assert!(payload.body.contains("Sharma v. State"));
        assert_eq!(payload.action_url, Some("/cases/C1".to_string()));
        assert!(!payload.suppress);
    }

    #[test]
    fn test_status_transition_takes_precedence_over_generic_update() {
        let (_tmp, dir) = directory();
        // 状态和其他字段同时变化，仍然必须产出 status changed 消息
        let event = ChangeEvent::new(
            "cases",
            Operation::Update,
            json!({"id": "C1", "title": "Sharma v. State", "status": "closed", "court": "HC"}),
        )
        .with_old_record(json!({"id": "C1", "title": "Sharma v. State", "status": "open", "court": "DC"}));

        let payload = CaseAdapter.build(&event, &dir);
        assert_eq!(payload.kind, "case_status_changed");
        assert!(payload.body.contains("from open to closed"));
        assert_eq!(payload.metadata["old_status"], json!("open"));
    }

    #[test]
    fn test_update_without_status_change_is_generic() {
        let (_tmp, dir) = directory();
        let event = ChangeEvent::new(
            "cases",
            Operation::Update,
            json!({"id": "C1", "title": "Sharma v. State", "status": "open"}),
        )
        .with_old_record(json!({"id": "C1", "title": "Old title", "status": "open"}));

        let payload = CaseAdapter.build(&event, &dir);
        assert_eq!(payload.kind, "case_updated");
    }

    #[test]
    fn test_priority_read_from_record() {
        let (_tmp, dir) = directory();
        let event = ChangeEvent::new(
            "cases",
            Operation::Insert,
            json!({"id": "C1", "title": "T", "priority": "urgent"}),
        );
        let payload = CaseAdapter.build(&event, &dir);
        assert_eq!(payload.priority, crate::category::Priority::Urgent);
    }

    #[test]
    fn test_case_recipients_are_own_team() {
        let (_tmp, dir) = directory();
        let record = json!({
            "id": "C1",
            "assigned_lawyer_id": "U1",
            "assigned_users": ["U2", "U1"]
        });
        let recipients = CaseAdapter.recipients(&record, &dir);
        assert_eq!(recipients.len(), 2);
    }
}
