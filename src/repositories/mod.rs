pub mod exam_repository;
pub mod roster_repository;

use mongodb::bson::{doc, Document};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    db::{Collection, StoreSession},
    errors::AppResult,
    models::domain::{
        AnalysisReport, Class, Exam, ExamResult, Student, Subject, TeacherAssignment,
        TeacherProfile, Topic, TopicCoverage, User,
    },
};

/// A document type stored in exactly one collection, keyed by `id`.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync {
    const COLLECTION: Collection;
}

macro_rules! entity {
    ($($ty:ty => $collection:expr),* $(,)?) => {
        $(impl Entity for $ty {
            const COLLECTION: Collection = $collection;
        })*
    };
}

entity! {
    Class => Collection::Classes,
    Subject => Collection::Subjects,
    Topic => Collection::Topics,
    TopicCoverage => Collection::TopicCoverages,
    TeacherAssignment => Collection::TeacherAssignments,
    TeacherProfile => Collection::TeacherProfiles,
    User => Collection::Users,
    Student => Collection::Students,
    Exam => Collection::Exams,
    ExamResult => Collection::ExamResults,
    AnalysisReport => Collection::AnalysisReports,
}

pub fn to_document<T: Serialize>(value: &T) -> AppResult<Document> {
    Ok(mongodb::bson::to_document(value)?)
}

pub fn from_document<T: DeserializeOwned>(document: Document) -> AppResult<T> {
    Ok(mongodb::bson::from_document(document)?)
}

pub async fn find_by_id<T: Entity>(
    session: &mut dyn StoreSession,
    id: &str,
) -> AppResult<Option<T>> {
    find_one_where(session, doc! { "id": id }).await
}

pub async fn find_one_where<T: Entity>(
    session: &mut dyn StoreSession,
    filter: Document,
) -> AppResult<Option<T>> {
    session
        .find_one(T::COLLECTION, filter)
        .await?
        .map(from_document)
        .transpose()
}

pub async fn find_where<T: Entity>(
    session: &mut dyn StoreSession,
    filter: Document,
) -> AppResult<Vec<T>> {
    session
        .find(T::COLLECTION, filter)
        .await?
        .into_iter()
        .map(from_document)
        .collect()
}

pub async fn insert<T: Entity>(session: &mut dyn StoreSession, entity: &T) -> AppResult<()> {
    session.insert_one(T::COLLECTION, to_document(entity)?).await
}

/// Equality filter on a single field.
pub fn field_eq(field: &str, value: &str) -> Document {
    let mut filter = Document::new();
    filter.insert(field, value);
    filter
}

/// Membership filter on a single field.
pub fn field_in(field: &str, values: &[String]) -> Document {
    let mut filter = Document::new();
    filter.insert(field, doc! { "$in": values.to_vec() });
    filter
}
