//! Category and priority classification for notifications
//!
//! Every payload carries a category tag (which preference bucket it falls
//! into) and a priority. The priority is matched against each recipient's
//! per-category filter:
//! - ALL: everything passes
//! - NORMAL / HIGH / URGENT: only priorities at or above the named rank pass

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::event::field_as_string;

/// Notification category, one bucket per preference toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Case,
    Hearing,
    Appointment,
    Task,
    Document,
    Client,
    Note,
    System,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Case => "case",
            Category::Hearing => "hearing",
            Category::Appointment => "appointment",
            Category::Task => "task",
            Category::Document => "document",
            Category::Client => "client",
            Category::Note => "note",
            Category::System => "system",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Notification priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Normal,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Priority::Low => 0,
            Priority::Normal => 1,
            Priority::High => 2,
            Priority::Urgent => 3,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-category priority filter from user preferences
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorityFilter {
    All,
    Normal,
    High,
    Urgent,
}

impl Default for PriorityFilter {
    fn default() -> Self {
        PriorityFilter::All
    }
}

/// Check whether a payload priority satisfies a recipient's filter
///
/// Mirrors the urgency threshold: a filter names the minimum rank that may
/// still be delivered.
pub fn priority_meets_filter(priority: Priority, filter: PriorityFilter) -> bool {
    match filter {
        PriorityFilter::All => true,
        PriorityFilter::Normal => priority.rank() >= Priority::Normal.rank(),
        PriorityFilter::High => priority.rank() >= Priority::High.rank(),
        PriorityFilter::Urgent => priority.rank() >= Priority::Urgent.rank(),
    }
}

/// Read a record's own `priority` field, defaulting to normal
///
/// Upstream rows are free-form; "medium" shows up as a synonym of normal in
/// older task rows.
pub fn priority_from_record(record: &Value) -> Priority {
    match field_as_string(record, "priority").as_deref() {
        Some("low") => Priority::Low,
        Some("high") => Priority::High,
        Some("urgent") => Priority::Urgent,
        Some("normal") | Some("medium") => Priority::Normal,
        _ => Priority::Normal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_priority_meets_filter() {
        // ALL passes everything
        assert!(priority_meets_filter(Priority::Low, PriorityFilter::All));
        assert!(priority_meets_filter(Priority::Urgent, PriorityFilter::All));

        // NORMAL blocks only low
        assert!(!priority_meets_filter(Priority::Low, PriorityFilter::Normal));
        assert!(priority_meets_filter(Priority::Normal, PriorityFilter::Normal));

        // HIGH blocks low and normal
        assert!(!priority_meets_filter(Priority::Normal, PriorityFilter::High));
        assert!(priority_meets_filter(Priority::High, PriorityFilter::High));
        assert!(priority_meets_filter(Priority::Urgent, PriorityFilter::High));

        // URGENT only passes urgent
        assert!(!priority_meets_filter(Priority::High, PriorityFilter::Urgent));
        assert!(priority_meets_filter(Priority::Urgent, PriorityFilter::Urgent));
    }

    #[test]
    fn test_priority_from_record() {
        assert_eq!(priority_from_record(&json!({"priority": "urgent"})), Priority::Urgent);
        assert_eq!(priority_from_record(&json!({"priority": "high"})), Priority::High);
        assert_eq!(priority_from_record(&json!({"priority": "medium"})), Priority::Normal);
        assert_eq!(priority_from_record(&json!({"priority": "low"})), Priority::Low);
        // 缺失或未知值回退到 normal
        assert_eq!(priority_from_record(&json!({})), Priority::Normal);
        assert_eq!(priority_from_record(&json!({"priority": "??"})), Priority::Normal);
    }

    #[test]
    fn test_category_serialization() {
        assert_eq!(serde_json::to_string(&Category::Hearing).unwrap(), r#""hearing""#);
        let cat: Category = serde_json::from_str(r#""case""#).unwrap();
        assert_eq!(cat, Category::Case);
    }

    #[test]
    fn test_category_as_map_key() {
        // preferences 以 category 为 map key，序列化必须落到字符串
        let mut map = std::collections::HashMap::new();
        map.insert(Category::Task, 1u8);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"task":1}"#);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Category::Document), "document");
        assert_eq!(format!("{}", Priority::Urgent), "urgent");
    }
}
