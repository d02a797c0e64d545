use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::datetime::iso_millis_serde;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(into = "u8", try_from = "u8")]
pub enum Status {
    Todo,
    InProgress,
    Done,
    Cancelled,
    Archived,
}

impl Status {
    pub fn is_closed(self) -> bool {
        matches!(self, Status::Done | Status::Cancelled | Status::Archived)
    }

    pub fn name(self) -> &'static str {
        match self {
            Status::Todo => "todo",
            Status::InProgress => "in-progress",
            Status::Done => "done",
            Status::Cancelled => "cancelled",
            Status::Archived => "archived",
        }
    }

    pub fn parse_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "todo" => Some(Status::Todo),
            "in-progress" | "inprogress" | "doing" => Some(Status::InProgress),
            "done" => Some(Status::Done),
            "cancelled" | "canceled" => Some(Status::Cancelled),
            "archived" => Some(Status::Archived),
            _ => None,
        }
    }
}

impl From<Status> for u8 {
    fn from(status: Status) -> u8 {
        match status {
            Status::Todo => 0,
            Status::InProgress => 1,
            Status::Done => 2,
            Status::Cancelled => 3,
            Status::Archived => 4,
        }
    }
}

impl TryFrom<u8> for Status {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Status::Todo),
            1 => Ok(Status::InProgress),
            2 => Ok(Status::Done),
            3 => Ok(Status::Cancelled),
            4 => Ok(Status::Archived),
            other => Err(format!("unknown status code: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(into = "u8", try_from = "u8")]
pub enum Tag {
    Work,
    Personal,
    Urgent,
    LowPriority,
}

impl Tag {
    pub fn name(self) -> &'static str {
        match self {
            Tag::Work => "work",
            Tag::Personal => "personal",
            Tag::Urgent => "urgent",
            Tag::LowPriority => "low-priority",
        }
    }

    pub fn parse_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "work" => Some(Tag::Work),
            "personal" => Some(Tag::Personal),
            "urgent" => Some(Tag::Urgent),
            "low-priority" | "lowpriority" | "low" => Some(Tag::LowPriority),
            _ => None,
        }
    }
}

impl From<Tag> for u8 {
    fn from(tag: Tag) -> u8 {
        match tag {
            Tag::Work => 0,
            Tag::Personal => 1,
            Tag::Urgent => 2,
            Tag::LowPriority => 3,
        }
    }
}

impl TryFrom<u8> for Tag {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Tag::Work),
            1 => Ok(Tag::Personal),
            2 => Ok(Tag::Urgent),
            3 => Ok(Tag::LowPriority),
            other => Err(format!("unknown tag code: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: String,

    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub status: Status,

    #[serde(rename = "createdAt", with = "iso_millis_serde")]
    pub created_at: DateTime<Utc>,

    #[serde(rename = "updatedAt", with = "iso_millis_serde")]
    pub updated_at: DateTime<Utc>,

    #[serde(
        default,
        with = "iso_millis_serde::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub deadline: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

impl Task {
    pub fn new(title: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title,
            description: None,
            status: Status::Todo,
            created_at: now,
            updated_at: now,
            deadline: None,
            tags: vec![],
        }
    }

    pub fn set_status(&mut self, status: Status, now: DateTime<Utc>) {
        self.status = status;
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::Value;

    use super::{Status, Tag, Task};

    #[test]
    fn status_and_tag_codes_round_trip() {
        for code in 0u8..=4 {
            let status = Status::try_from(code).expect("valid status code");
            assert_eq!(u8::from(status), code);
        }
        for code in 0u8..=3 {
            let tag = Tag::try_from(code).expect("valid tag code");
            assert_eq!(u8::from(tag), code);
        }
        assert!(Status::try_from(5).is_err());
        assert!(Tag::try_from(4).is_err());
    }

    #[test]
    fn wire_shape_uses_integer_codes_and_iso_dates() {
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 9, 30, 0).unwrap();
        let mut task = Task::new("Ship release".to_string(), now);
        task.status = Status::InProgress;
        task.tags = vec![Tag::Work, Tag::Urgent];
        task.deadline = Some(now + chrono::Duration::days(2));

        let value: Value =
            serde_json::from_str(&serde_json::to_string(&task).expect("serialize task"))
                .expect("parse serialized task");

        assert_eq!(value["status"], Value::from(1));
        assert_eq!(value["tags"], serde_json::json!([0, 2]));
        assert_eq!(value["createdAt"], Value::from("2026-03-02T09:30:00.000Z"));
        assert_eq!(value["updatedAt"], value["createdAt"]);
        assert_eq!(value["deadline"], Value::from("2026-03-04T09:30:00.000Z"));
        assert!(value.get("description").is_none());
    }

    #[test]
    fn optional_fields_absent_round_trip_as_absent() {
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 9, 30, 0).unwrap();
        let task = Task::new("Bare".to_string(), now);

        let raw = serde_json::to_string(&task).expect("serialize task");
        assert!(!raw.contains("deadline"));
        assert!(!raw.contains("tags"));

        let back: Task = serde_json::from_str(&raw).expect("deserialize task");
        assert_eq!(back, task);
        assert!(back.deadline.is_none());
        assert!(back.tags.is_empty());
    }

    #[test]
    fn duplicate_tags_survive_the_wire() {
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 9, 30, 0).unwrap();
        let mut task = Task::new("Tagged twice".to_string(), now);
        task.tags = vec![Tag::Work, Tag::Work];

        let raw = serde_json::to_string(&task).expect("serialize task");
        let back: Task = serde_json::from_str(&raw).expect("deserialize task");
        assert_eq!(back.tags, vec![Tag::Work, Tag::Work]);
    }
}
