//! 笔记适配器

use std::collections::BTreeSet;

use serde_json::{json, Value};

use super::{owner_union, EntityAdapter};
use crate::category::{priority_from_record, Category};
use crate::directory::Directory;
use crate::event::{field_as_string, field_or, ChangeEvent, Operation};
use crate::payload::NotificationPayload;

pub struct NoteAdapter;

impl EntityAdapter for NoteAdapter {
    fn category(&self) -> Category {
        Category::Note
    }

    fn build(&self, event: &ChangeEvent, directory: &Directory) -> NotificationPayload {
        let record = &event.record;
        let note_id = field_or(record, "id", "?");
        let author = directory.user_name(&field_or(record, "created_by", "someone"));
        let case_part = field_as_string(record, "case_id")
            .map(|case_id| format!(" on \"{}\"", directory.case_title(&case_id)))
            .unwrap_or_default();

        let payload = match event.event_type {
            Operation::Insert => NotificationPayload::new(
                "note_added",
                "New note",
                format!("{} added a note{}", author, case_part),
                Category::Note,
            ),
            Operation::Update => NotificationPayload::new(
                "note_updated",
                "Note updated",
                format!("A note{} has been updated", case_part),
                Category::Note,
            ),
            Operation::Delete => NotificationPayload::new(
                "note_removed",
                "Note removed",
                format!("A note{} has been removed", case_part),
                Category::Note,
            ),
        };

        payload
            .with_priority(priority_from_record(record))
            .with_meta("note_id", json!(note_id))
    }

    fn recipients(&self, record: &Value, _directory: &Directory) -> BTreeSet<String> {
        owner_union(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_insert() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = Directory::new(tmp.path());
        let event = ChangeEvent::new(
            "notes",
            Operation::Insert,
            json!({"id": "n1", "created_by": "U1", "assigned_to": "U2"}),
        );
        let payload = NoteAdapter.build(&event, &dir);
        assert_eq!(payload.kind, "note_added");
        // 目录为空时作者回退到 id
        assert!(payload.body.contains("U1"));

        let recipients = NoteAdapter.recipients(&event.record, &dir);
        assert_eq!(recipients.into_iter().collect::<Vec<_>>(), vec!["U2"]);
    }
}
