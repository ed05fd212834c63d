//! 客户适配器

use std::collections::BTreeSet;

use serde_json::{json, Value};

use super::{first_assignee, EntityAdapter};
use crate::category::{priority_from_record, Category};
use crate::directory::Directory;
use crate::event::{field_or, ChangeEvent, Operation};
use crate::payload::NotificationPayload;

pub struct ClientAdapter;

impl EntityAdapter for ClientAdapter {
    fn category(&self) -> Category {
        Category::Client
    }

    fn build(&self, event: &ChangeEvent, _directory: &Directory) -> NotificationPayload {
        let record = &event.record;
        let name = field_or(record, "name", "client");
        let client_id = field_or(record, "id", "?");

        let payload = match event.event_type {
            Operation::Insert => NotificationPayload::new(
                "client_added",
                "New client",
                format!("Client \"{}\" has been added to your practice", name),
                Category::Client,
            ),
            Operation::Update => NotificationPayload::new(
                "client_updated",
                "Client updated",
                format!("Client \"{}\" details have been updated", name),
                Category::Client,
            ),
            Operation::Delete => NotificationPayload::new(
                "client_removed",
                "Client removed",
                format!("Client \"{}\" has been removed", name),
                Category::Client,
            ),
        };

        payload
            .with_priority(priority_from_record(record))
            .with_action_url(format!("/clients/{}", client_id))
            .with_meta("client_id", json!(client_id))
    }

    fn recipients(&self, record: &Value, _directory: &Directory) -> BTreeSet<String> {
        first_assignee(record, &["assigned_lawyer_id", "lawyer_id"])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_insert() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = Directory::new(tmp.path());
        let event = ChangeEvent::new(
            "clients",
            Operation::Insert,
            json!({"id": "cl1", "name": "Acme Traders", "lawyer_id": "U1"}),
        );
        let payload = ClientAdapter.build(&event, &dir);
        assert_eq!(payload.kind, "client_added");
        assert!(payload.body.contains("Acme Traders"));
        assert_eq!(payload.action_url, Some("/clients/cl1".to_string()));
    }

    #[test]
    fn test_client_recipient() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = Directory::new(tmp.path());
        let record = json!({"lawyer_id": "U3"});
        let recipients = ClientAdapter.recipients(&record, &dir);
        assert_eq!(recipients.into_iter().collect::<Vec<_>>(), vec!["U3"]);
    }
}
