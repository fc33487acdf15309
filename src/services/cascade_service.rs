//! Referential integrity for deletions. Each deletable entity has a static
//! policy: guards that block the delete, dependent collections removed with
//! it (recursively), and documents it owns through a reference field.

use std::{collections::BTreeMap, sync::Arc};

use futures::future::{BoxFuture, FutureExt};
use mongodb::bson::Document;

use crate::{
    db::{finish, Collection, EntityStore, StoreSession},
    errors::{AppError, AppResult},
    models::dto::CascadeReport,
    repositories::{field_eq, field_in},
    services::retry_on_conflict,
};

/// Documents of `collection` whose `field` holds a parent id, removed along
/// with the parent. `children` hang off these documents' own ids.
#[derive(Debug)]
pub struct Edge {
    pub collection: Collection,
    pub field: &'static str,
    pub children: &'static [Edge],
}

/// The delete is refused while any document of `collection` has `field`
/// equal to the root id.
#[derive(Debug)]
pub struct Guard {
    pub collection: Collection,
    pub field: &'static str,
    pub reason: &'static str,
}

/// A document referenced by the root through `field`, removed with the root.
#[derive(Debug)]
pub struct Owned {
    pub collection: Collection,
    pub field: &'static str,
}

#[derive(Debug)]
pub struct DeletionPolicy {
    pub entity: &'static str,
    pub root: Collection,
    pub guards: &'static [Guard],
    pub dependents: &'static [Edge],
    pub owned: &'static [Owned],
}

const fn leaf(collection: Collection, field: &'static str) -> Edge {
    Edge {
        collection,
        field,
        children: &[],
    }
}

const EXAM_DEPENDENTS: &[Edge] = &[
    leaf(Collection::ExamResults, "exam_id"),
    leaf(Collection::AnalysisReports, "exam_id"),
];

pub static CLASS_POLICY: DeletionPolicy = DeletionPolicy {
    entity: "class",
    root: Collection::Classes,
    guards: &[Guard {
        collection: Collection::Students,
        field: "class_id",
        reason: "enrolled students",
    }],
    dependents: &[
        leaf(Collection::TopicCoverages, "class_id"),
        Edge {
            collection: Collection::Exams,
            field: "class_id",
            children: EXAM_DEPENDENTS,
        },
        leaf(Collection::TeacherAssignments, "class_id"),
    ],
    owned: &[],
};

// Subjects and topics are taxonomy: they have no guards, and historical
// results keep their own copy of the subject label.
pub static SUBJECT_POLICY: DeletionPolicy = DeletionPolicy {
    entity: "subject",
    root: Collection::Subjects,
    guards: &[],
    dependents: &[
        leaf(Collection::TopicCoverages, "subject_id"),
        Edge {
            collection: Collection::Topics,
            field: "subject_id",
            children: &[leaf(Collection::TopicCoverages, "topic_id")],
        },
    ],
    owned: &[],
};

pub static TOPIC_POLICY: DeletionPolicy = DeletionPolicy {
    entity: "topic",
    root: Collection::Topics,
    guards: &[],
    dependents: &[leaf(Collection::TopicCoverages, "topic_id")],
    owned: &[],
};

pub static TEACHER_POLICY: DeletionPolicy = DeletionPolicy {
    entity: "teacher",
    root: Collection::TeacherProfiles,
    guards: &[Guard {
        collection: Collection::TeacherAssignments,
        field: "teacher_id",
        reason: "class assignments",
    }],
    dependents: &[],
    owned: &[Owned {
        collection: Collection::Users,
        field: "user_id",
    }],
};

pub static EXAM_POLICY: DeletionPolicy = DeletionPolicy {
    entity: "exam",
    root: Collection::Exams,
    guards: &[],
    dependents: EXAM_DEPENDENTS,
    owned: &[],
};

/// Cascade Manager. Every delete runs in one transaction; any failure rolls
/// the whole graph back.
pub struct CascadeService {
    store: Arc<dyn EntityStore>,
}

impl CascadeService {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    pub async fn delete_class(&self, id: &str) -> AppResult<CascadeReport> {
        self.delete(&CLASS_POLICY, id).await
    }

    pub async fn delete_subject(&self, id: &str) -> AppResult<CascadeReport> {
        self.delete(&SUBJECT_POLICY, id).await
    }

    pub async fn delete_topic(&self, id: &str) -> AppResult<CascadeReport> {
        self.delete(&TOPIC_POLICY, id).await
    }

    /// `id` is the teacher profile id. The linked user account goes too.
    pub async fn delete_teacher(&self, id: &str) -> AppResult<CascadeReport> {
        self.delete(&TEACHER_POLICY, id).await
    }

    pub async fn delete_exam(&self, id: &str) -> AppResult<CascadeReport> {
        self.delete(&EXAM_POLICY, id).await
    }

    pub async fn delete(&self, policy: &'static DeletionPolicy, id: &str) -> AppResult<CascadeReport> {
        let store = &self.store;
        let report = retry_on_conflict("Cascading delete", move || async move {
            let mut session = store.begin().await?;
            let outcome = apply_policy(session.as_mut(), policy, id).await;
            finish(session, outcome).await
        })
        .await?;

        log::info!(
            "Deleted {} '{}' with dependents {:?}",
            report.entity,
            report.deleted_id,
            report.deleted
        );
        Ok(report)
    }
}

/// Applies `policy` to the root `id` inside an open session.
pub async fn apply_policy(
    session: &mut dyn StoreSession,
    policy: &'static DeletionPolicy,
    id: &str,
) -> AppResult<CascadeReport> {
    let root = session
        .find_one(policy.root, field_eq("id", id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} with id '{}' not found", policy.entity, id)))?;

    for guard in policy.guards {
        let blocking = session
            .count(guard.collection, field_eq(guard.field, id))
            .await?;
        if blocking > 0 {
            return Err(AppError::HasDependents(format!(
                "Cannot delete {} '{}': it still has {} {}",
                policy.entity, id, blocking, guard.reason
            )));
        }
    }

    let mut deleted = BTreeMap::new();
    register_edges(policy.dependents, &mut deleted);
    for owned in policy.owned {
        deleted.entry(owned.collection.to_string()).or_insert(0);
    }

    remove_dependents(session, policy.dependents, vec![id.to_string()], &mut deleted).await?;

    for owned in policy.owned {
        let owned_id = string_field(&root, owned.field)?;
        let removed = session
            .delete_many(owned.collection, field_eq("id", &owned_id))
            .await?;
        *deleted.entry(owned.collection.to_string()).or_insert(0) += removed;
    }

    let removed = session.delete_many(policy.root, field_eq("id", id)).await?;
    if removed != 1 {
        return Err(AppError::InternalError(format!(
            "Expected to delete one {} '{}', deleted {}",
            policy.entity, id, removed
        )));
    }

    Ok(CascadeReport {
        entity: policy.entity.to_string(),
        deleted_id: id.to_string(),
        deleted,
    })
}

fn register_edges(edges: &'static [Edge], deleted: &mut BTreeMap<String, u64>) {
    for edge in edges {
        deleted.entry(edge.collection.to_string()).or_insert(0);
        register_edges(edge.children, deleted);
    }
}

/// Removes everything hanging off `parent_ids`, deepest level first.
fn remove_dependents<'a>(
    session: &'a mut dyn StoreSession,
    edges: &'static [Edge],
    parent_ids: Vec<String>,
    deleted: &'a mut BTreeMap<String, u64>,
) -> BoxFuture<'a, AppResult<()>> {
    async move {
        if parent_ids.is_empty() {
            return Ok(());
        }

        for edge in edges {
            let filter = field_in(edge.field, &parent_ids);

            if !edge.children.is_empty() {
                let child_ids = session
                    .find(edge.collection, filter.clone())
                    .await?
                    .iter()
                    .map(|doc| string_field(doc, "id"))
                    .collect::<AppResult<Vec<String>>>()?;
                remove_dependents(&mut *session, edge.children, child_ids, &mut *deleted).await?;
            }

            let removed = session.delete_many(edge.collection, filter).await?;
            *deleted.entry(edge.collection.to_string()).or_insert(0) += removed;
        }
        Ok(())
    }
    .boxed()
}

fn string_field(document: &Document, field: &str) -> AppResult<String> {
    document
        .get_str(field)
        .map(str::to_string)
        .map_err(|e| AppError::InternalError(format!("Document field '{}' unreadable: {}", field, e)))
}
