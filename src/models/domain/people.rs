use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Teacher,
    #[default]
    Student,
    Parent,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Teacher => "teacher",
            UserRole::Student => "student",
            UserRole::Parent => "parent",
        }
    }
}

/// Login account shared by every role.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(name: &str, email: &str, role: UserRole) -> Self {
        User {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            email: email.trim().to_lowercase(),
            role,
            created_at: Some(Utc::now()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Student {
    pub id: String,
    pub user_id: String,
    pub class_id: String,
    #[serde(default)]
    pub parent_ids: Vec<String>,
}

impl Student {
    pub fn new(user_id: &str, class_id: &str) -> Self {
        Student {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            class_id: class_id.to_string(),
            parent_ids: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct TeacherProfile {
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub branches: Vec<String>,
}

impl TeacherProfile {
    pub fn new(user_id: &str, branches: Vec<String>) -> Self {
        TeacherProfile {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            branches,
        }
    }
}

/// A teacher giving one subject to one class for some weekly hours.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct TeacherAssignment {
    pub id: String,
    pub class_id: String,
    pub subject_id: String,
    pub teacher_id: String,
    pub weekly_hours: u32,
}

impl TeacherAssignment {
    pub fn new(class_id: &str, subject_id: &str, teacher_id: &str, weekly_hours: u32) -> Self {
        TeacherAssignment {
            id: Uuid::new_v4().to_string(),
            class_id: class_id.to_string(),
            subject_id: subject_id.to_string(),
            teacher_id: teacher_id.to_string(),
            weekly_hours,
        }
    }
}
