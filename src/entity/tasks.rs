//! 任务适配器
//!
//! 完成检测：状态流转到 completed 时产出专门的完成消息，
//! 其他状态流转产出状态更新消息。

use std::collections::BTreeSet;

use serde_json::{json, Value};

use super::{first_assignee, EntityAdapter};
use crate::category::{priority_from_record, Category};
use crate::directory::Directory;
use crate::event::{field_or, field_transition, ChangeEvent, Operation};
use crate::payload::NotificationPayload;

pub struct TaskAdapter;

impl EntityAdapter for TaskAdapter {
    fn category(&self) -> Category {
        Category::Task
    }

    fn build(&self, event: &ChangeEvent, directory: &Directory) -> NotificationPayload {
        let record = &event.record;
        let title = field_or(record, "title", "task");
        let task_id = field_or(record, "id", "?");

        let payload = match event.event_type {
            Operation::Insert => NotificationPayload::new(
                "task_assigned",
                "New task assigned",
                format!("Task \"{}\" has been assigned to you", title),
                Category::Task,
            ),
            Operation::Update => {
                match field_transition(record, event.old_record.as_ref(), "status") {
                    Some((_, new_status)) if new_status == "completed" => {
                        let completer = directory
                            .user_name(&field_or(record, "completed_by", "a team member"));
                        NotificationPayload::new(
                            "task_completed",
                            "Task completed",
                            format!("Task \"{}\" was marked completed by {}", title, completer),
                            Category::Task,
                        )
                    }
                    Some((old_status, new_status)) => NotificationPayload::new(
                        "task_status_changed",
                        "Task status updated",
                        format!(
                            "Task \"{}\" moved from {} to {}",
                            title, old_status, new_status
                        ),
                        Category::Task,
                    ),
                    None => NotificationPayload::new(
                        "task_updated",
                        "Task updated",
                        format!("Task \"{}\" has been updated", title),
                        Category::Task,
                    ),
                }
            }
            Operation::Delete => NotificationPayload::new(
                "task_removed",
                "Task removed",
                format!("Task \"{}\" has been removed", title),
                Category::Task,
            ),
        };

        payload
            .with_priority(priority_from_record(record))
            .with_action_url(format!("/tasks/{}", task_id))
            .with_meta("task_id", json!(task_id))
    }

    fn recipients(&self, record: &Value, _directory: &Directory) -> BTreeSet<String> {
        first_assignee(record, &["assigned_to", "assigned_lawyer_id"])
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
    fn test_task_insert() {
        let (_tmp, dir) = directory();
        let event = ChangeEvent::new(
            "tasks",
            Operation::Insert,
            json!({"id": "t1", "title": "File reply", "assigned_to": "U1"}),
        );
        let payload = TaskAdapter.build(&event, &dir);
        assert_eq!(payload.kind, "task_assigned");
        assert!(payload.body.contains("File reply"));
    }

    #[test]
    fn test_task_completion_detection() {
        let (_tmp, dir) = directory();
        let event = ChangeEvent::new(
            "tasks",
            Operation::Update,
            json!({"id": "t1", "title": "File reply", "status": "completed"}),
        )
        .with_old_record(json!({"id": "t1", "title": "File reply", "status": "in_progress"}));

        let payload = TaskAdapter.build(&event, &dir);
        assert_eq!(payload.kind, "task_completed");
        assert!(payload.body.contains("marked completed"));
    }

    #[test]
    fn test_task_other_status_transition() {
        let (_tmp, dir) = directory();
        let event = ChangeEvent::new(
            "tasks",
            Operation::Update,
            json!({"id": "t1", "title": "File reply", "status": "in_progress"}),
        )
        .with_old_record(json!({"id": "t1", "title": "File reply", "status": "pending"}));

        let payload = TaskAdapter.build(&event, &dir);
        assert_eq!(payload.kind, "task_status_changed");
        assert!(payload.body.contains("from pending to in_progress"));
    }

    #[test]
    fn test_task_update_without_status_change() {
        let (_tmp, dir) = directory();
        let event = ChangeEvent::new(
            "tasks",
            Operation::Update,
            json!({"id": "t1", "title": "New title", "status": "pending"}),
        )
        .with_old_record(json!({"id": "t1", "title": "Old title", "status": "pending"}));

        let payload = TaskAdapter.build(&event, &dir);
        assert_eq!(payload.kind, "task_updated");
    }

    #[test]
    fn test_task_recipient_field_priority() {
        let (_tmp, dir) = directory();
        let record = json!({"assigned_to": "U1", "assigned_lawyer_id": "U2"});
        let recipients = TaskAdapter.recipients(&record, &dir);
        assert_eq!(recipients.into_iter().collect::<Vec<_>>(), vec!["U1"]);
    }
}
