//! 法院命令适配器 - 关系型实体，归入 case 分类

use std::collections::BTreeSet;

use serde_json::{json, Value};

use super::{via_parent_case, EntityAdapter};
use crate::category::{priority_from_record, Category};
use crate::directory::Directory;
use crate::event::{field_as_string, field_or, ChangeEvent, Operation};
use crate::payload::NotificationPayload;

pub struct CaseOrderAdapter;

impl EntityAdapter for CaseOrderAdapter {
    fn category(&self) -> Category {
        Category::Case
    }

    fn build(&self, event: &ChangeEvent, directory: &Directory) -> NotificationPayload {
        let record = &event.record;
        let order_id = field_or(record, "id", "?");
        let case_label = field_as_string(record, "case_id")
            .map(|case_id| directory.case_title(&case_id))
            .unwrap_or_else(|| "a case".to_string());

        let payload = match event.event_type {
            Operation::Insert => {
                let order_date = field_as_string(record, "order_date");
                let body = match &order_date {
                    Some(date) => format!(
                        "A new court order dated {} is available in \"{}\"",
                        date, case_label
                    ),
                    None => format!("A new court order is available in \"{}\"", case_label),
                };
                NotificationPayload::new("order_published", "New court order", body, Category::Case)
            }
            Operation::Update => NotificationPayload::new(
                "order_updated",
                "Court order updated",
                format!("A court order in \"{}\" has been updated", case_label),
                Category::Case,
            ),
            Operation::Delete => NotificationPayload::new(
                "order_removed",
                "Court order removed",
                format!("A court order in \"{}\" has been removed", case_label),
                Category::Case,
            ),
        };

        payload
            .with_priority(priority_from_record(record))
            .with_action_url(format!("/orders/{}", order_id))
            .with_meta("order_id", json!(order_id))
    }

    fn recipients(&self, record: &Value, directory: &Directory) -> BTreeSet<String> {
        via_parent_case(record, directory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_order_insert_names_case() {
        let tmp = tempfile::tempdir().unwrap();
        let dir_path = tmp.path().join("directory");
        fs::create_dir_all(&dir_path).unwrap();
        fs::write(
            dir_path.join("cases.json"),
            serde_json::to_string(&json!({
                "C1": {"title": "Sharma v. State", "assigned_lawyer_id": "U1", "assigned_users": ["U2"]}
            }))
            .unwrap(),
        )
        .unwrap();
        let directory = Directory::new(tmp.path());

        let event = ChangeEvent::new(
            "case_orders",
            Operation::Insert,
            json!({"id": "o1", "case_id": "C1", "order_date": "2026-08-01"}),
        );
        let payload = CaseOrderAdapter.build(&event, &directory);
        assert_eq!(payload.kind, "order_published");
        assert!(payload.body.contains("Sharma v. State"));
        assert!(payload.body.contains("2026-08-01"));

        let recipients = CaseOrderAdapter.recipients(&event.record, &directory);
        assert_eq!(recipients.len(), 2);
    }
}
