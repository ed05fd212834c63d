//! 文档适配器 - 关系型实体，收件人沿 case_id 解析到父案件团队

use std::collections::BTreeSet;

use serde_json::{json, Value};

use super::{via_parent_case, EntityAdapter};
use crate::category::{priority_from_record, Category};
use crate::directory::Directory;
use crate::event::{field_as_string, field_or, ChangeEvent, Operation};
use crate::payload::NotificationPayload;

pub struct DocumentAdapter;

impl EntityAdapter for DocumentAdapter {
    fn category(&self) -> Category {
        Category::Document
    }

    fn build(&self, event: &ChangeEvent, directory: &Directory) -> NotificationPayload {
        let record = &event.record;
        let name = field_or(record, "name", "document");
        let document_id = field_or(record, "id", "?");
        let case_part = field_as_string(record, "case_id")
            .map(|case_id| format!(" in case \"{}\"", directory.case_title(&case_id)));

        let payload = match event.event_type {
            Operation::Insert => {
                let uploader = directory.user_name(&field_or(record, "uploaded_by", "someone"));
                NotificationPayload::new(
                    "document_uploaded",
                    "New document",
                    format!(
                        "Document \"{}\" was uploaded{} by {}",
                        name,
                        case_part.as_deref().unwrap_or(""),
                        uploader
                    ),
                    Category::Document,
                )
            }
            Operation::Update => NotificationPayload::new(
                "document_updated",
                "Document updated",
                format!(
                    "Document \"{}\"{} has been updated",
                    name,
                    case_part.as_deref().unwrap_or("")
                ),
                Category::Document,
            ),
            Operation::Delete => NotificationPayload::new(
                "document_removed",
                "Document removed",
                format!(
                    "Document \"{}\"{} has been removed",
                    name,
                    case_part.as_deref().unwrap_or("")
                ),
                Category::Document,
            ),
        };

        payload
            .with_priority(priority_from_record(record))
            .with_action_url(format!("/documents/{}", document_id))
            .with_meta("document_id", json!(document_id))
    }

    fn recipients(&self, record: &Value, directory: &Directory) -> BTreeSet<String> {
        via_parent_case(record, directory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn directory_with_case() -> (tempfile::TempDir, Directory) {
        let tmp = tempfile::tempdir().unwrap();
        let dir_path = tmp.path().join("directory");
        fs::create_dir_all(&dir_path).unwrap();
        fs::write(
            dir_path.join("cases.json"),
            serde_json::to_string(&json!({
                "C1": {
                    "title": "Sharma v. State",
                    "assigned_lawyer_id": "U1",
                    "assigned_to": "U2",
                    "assigned_users": ["U3"]
                }
            }))
            .unwrap(),
        )
        .unwrap();
        fs::write(
            dir_path.join("users.json"),
            serde_json::to_string(&json!({"U4": "Meera Nair"})).unwrap(),
        )
        .unwrap();
        let directory = Directory::new(tmp.path());
        (tmp, directory)
    }

    #[test]
    fn test_document_insert_names_case_and_uploader() {
        let (_tmp, dir) = directory_with_case();
        let event = ChangeEvent::new(
            "documents",
            Operation::Insert,
            json!({"id": "d1", "name": "rejoinder.pdf", "case_id": "C1", "uploaded_by": "U4"}),
        );
        let payload = DocumentAdapter.build(&event, &dir);
        assert_eq!(payload.kind, "document_uploaded");
        assert!(payload.body.contains("Sharma v. State"));
        assert!(payload.body.contains("Meera Nair"));
    }

    #[test]
    fn test_document_recipients_follow_parent_case() {
        let (_tmp, dir) = directory_with_case();
        let record = json!({"id": "d1", "case_id": "C1"});
        let recipients = DocumentAdapter.recipients(&record, &dir);
        assert_eq!(
            recipients.into_iter().collect::<Vec<_>>(),
            vec!["U1", "U2", "U3"]
        );
    }

    #[test]
    fn test_document_without_case_has_no_recipients() {
        let (_tmp, dir) = directory_with_case();
        let record = json!({"id": "d1"});
        assert!(DocumentAdapter.recipients(&record, &dir).is_empty());
    }
}
