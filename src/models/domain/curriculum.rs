use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Class {
    pub id: String,
    pub name: String,
    pub grade_level: i32,
    pub year: String,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Class {
    pub fn new(name: &str, grade_level: i32, year: &str) -> Self {
        Class {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            grade_level,
            year: year.to_string(),
            is_active: true,
            created_at: Some(Utc::now()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Subject {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Subject {
    pub fn new(name: &str) -> Self {
        Subject {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            created_at: Some(Utc::now()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Topic {
    pub id: String,
    pub subject_id: String,
    pub name: String,
    pub grade_level: i32,
    pub order: i32,
}

impl Topic {
    pub fn new(subject_id: &str, name: &str, grade_level: i32, order: i32) -> Self {
        Topic {
            id: Uuid::new_v4().to_string(),
            subject_id: subject_id.to_string(),
            name: name.trim().to_string(),
            grade_level,
            order,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageStatus {
    #[default]
    Planned,
    InProgress,
    Completed,
}

/// Progress of one class through one topic.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct TopicCoverage {
    pub id: String,
    pub class_id: String,
    pub subject_id: String,
    pub topic_id: String,
    pub status: CoverageStatus,
    pub note: Option<String>,
    pub updated_by: Option<String>,
}

impl TopicCoverage {
    pub fn new(class_id: &str, subject_id: &str, topic_id: &str, status: CoverageStatus) -> Self {
        TopicCoverage {
            id: Uuid::new_v4().to_string(),
            class_id: class_id.to_string(),
            subject_id: subject_id.to_string(),
            topic_id: topic_id.to_string(),
            status,
            note: None,
            updated_by: None,
        }
    }
}
