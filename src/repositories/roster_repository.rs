use std::collections::HashMap;

use mongodb::bson::doc;

use crate::{
    db::StoreSession,
    errors::AppResult,
    models::domain::{Class, Student, Subject, User, UserRole},
    repositories::{self, field_in},
};

/// Outcome of resolving a bulk-import row to an enrolled student.
#[derive(Debug, Clone, PartialEq)]
pub enum StudentLookup {
    Found(Student),
    UnknownEmail,
    NotInClass,
}

pub async fn find_class(session: &mut dyn StoreSession, class_id: &str) -> AppResult<Option<Class>> {
    repositories::find_by_id(session, class_id).await
}

pub async fn find_student(
    session: &mut dyn StoreSession,
    student_id: &str,
) -> AppResult<Option<Student>> {
    repositories::find_by_id(session, student_id).await
}

pub async fn find_student_in_class_by_email(
    session: &mut dyn StoreSession,
    email: &str,
    class_id: &str,
) -> AppResult<StudentLookup> {
    let email = email.trim().to_lowercase();
    let user: Option<User> = repositories::find_one_where(
        session,
        doc! { "email": email.as_str(), "role": UserRole::Student.as_str() },
    )
    .await?;

    let Some(user) = user else {
        return Ok(StudentLookup::UnknownEmail);
    };

    let student: Option<Student> = repositories::find_one_where(
        session,
        doc! { "user_id": user.id.as_str(), "class_id": class_id },
    )
    .await?;

    Ok(match student {
        Some(student) => StudentLookup::Found(student),
        None => StudentLookup::NotInClass,
    })
}

/// Subjects keyed by id. Unknown ids are simply absent from the map.
pub async fn subjects_by_ids(
    session: &mut dyn StoreSession,
    ids: &[String],
) -> AppResult<HashMap<String, Subject>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let subjects: Vec<Subject> = repositories::find_where(session, field_in("id", ids)).await?;
    Ok(subjects.into_iter().map(|s| (s.id.clone(), s)).collect())
}
