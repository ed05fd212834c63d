//! 预约适配器
//!
//! UPDATE 一律抑制：预约更新由外部日历同步高频驱动，
//! 只有创建（和取消）才通知。

use std::collections::BTreeSet;

use serde_json::{json, Value};

use super::{first_assignee, EntityAdapter};
use crate::category::{priority_from_record, Category};
use crate::directory::Directory;
use crate::event::{field_or, ChangeEvent, Operation};
use crate::payload::NotificationPayload;

pub struct AppointmentAdapter;

impl EntityAdapter for AppointmentAdapter {
    fn category(&self) -> Category {
        Category::Appointment
    }

    fn build(&self, event: &ChangeEvent, _directory: &Directory) -> NotificationPayload {
        let record = &event.record;
        let title = field_or(record, "title", "appointment");
        let appointment_id = field_or(record, "id", "?");

        let payload = match event.event_type {
            Operation::Insert => {
                let mut p = NotificationPayload::new(
                    "appointment_scheduled",
                    "New appointment",
                    format!("Appointment \"{}\" has been scheduled", title),
                    Category::Appointment,
                );
                if let Some(start) = crate::event::field_as_string(record, "start_time") {
                    p.body = format!("Appointment \"{}\" scheduled for {}", title, start);
                    p = p.with_meta("start_time", json!(start));
                }
                p
            }
            // 日历同步会反复触发 UPDATE，无条件抑制
            Operation::Update => {
                return NotificationPayload::suppressed(
                    "appointment_sync_update",
                    Category::Appointment,
                );
            }
            Operation::Delete => NotificationPayload::new(
                "appointment_cancelled",
                "Appointment cancelled",
                format!("Appointment \"{}\" has been cancelled", title),
                Category::Appointment,
            ),
        };

        payload
            .with_priority(priority_from_record(record))
            .with_action_url(format!("/appointments/{}", appointment_id))
            .with_meta("appointment_id", json!(appointment_id))
    }

    fn recipients(&self, record: &Value, _directory: &Directory) -> BTreeSet<String> {
        first_assignee(record, &["assigned_lawyer_id", "lawyer_id"])
    }
}
