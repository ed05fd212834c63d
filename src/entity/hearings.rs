//! 庭审适配器 - 关系型实体
//!
//! 改期检测：hearing_date 变化时产出专门的改期消息，与案件状态
//! 流转检测同构。

use std::collections::BTreeSet;

use serde_json::{json, Value};

use super::{via_parent_case, EntityAdapter};
use crate::category::{priority_from_record, Category};
use crate::directory::Directory;
use crate::event::{field_as_string, field_or, field_transition, ChangeEvent, Operation};
use crate::payload::NotificationPayload;

pub struct HearingAdapter;

impl HearingAdapter {
    fn case_label(record: &Value, directory: &Directory) -> String {
        field_as_string(record, "case_id")
            .map(|case_id| directory.case_title(&case_id))
            .unwrap_or_else(|| "a case".to_string())
    }
}

impl EntityAdapter for HearingAdapter {
    fn category(&self) -> Category {
        Category::Hearing
    }

    fn build(&self, event: &ChangeEvent, directory: &Directory) -> NotificationPayload {
        let record = &event.record;
        let hearing_id = field_or(record, "id", "?");
        let case_label = Self::case_label(record, directory);

        let payload = match event.event_type {
            Operation::Insert => {
                let date = field_or(record, "hearing_date", "an upcoming date");
                NotificationPayload::new(
                    "hearing_scheduled",
                    "Hearing scheduled",
                    format!("Hearing for \"{}\" scheduled on {}", case_label, date),
                    Category::Hearing,
                )
                .with_meta("hearing_date", json!(date))
            }
            Operation::Update => {
                if let Some((old_date, new_date)) =
                    field_transition(record, event.old_record.as_ref(), "hearing_date")
                {
                    NotificationPayload::new(
                        "hearing_rescheduled",
                        "Hearing rescheduled",
                        format!(
                            "Hearing for \"{}\" moved from {} to {}",
                            case_label, old_date, new_date
                        ),
                        Category::Hearing,
                    )
                    .with_meta("old_date", json!(old_date))
                    .with_meta("new_date", json!(new_date))
                } else {
                    NotificationPayload::new(
                        "hearing_updated",
                        "Hearing updated",
                        format!("Hearing details for \"{}\" have been updated", case_label),
                        Category::Hearing,
                    )
                }
            }
            Operation::Delete => NotificationPayload::new(
                "hearing_removed",
                "Hearing removed",
                format!("A hearing for \"{}\" has been removed", case_label),
                Category::Hearing,
            ),
        };

        payload
            .with_priority(priority_from_record(record))
            .with_action_url(format!("/hearings/{}", hearing_id))
            .with_meta("hearing_id", json!(hearing_id))
    }

    fn recipients(&self, record: &Value, directory: &Directory) -> BTreeSet<String> {
        via_parent_case(record, directory)
    }
}
