use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use async_trait::async_trait;
use mongodb::bson::{Bson, Document};
use serde::Serialize;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    db::{Collection, EntityStore, StoreSession},
    errors::{AppError, AppResult},
};

#[derive(Clone, Debug, Default)]
struct Tables {
    collections: HashMap<Collection, Vec<Document>>,
}

impl Tables {
    fn table(&self, collection: Collection) -> &[Document] {
        self.collections
            .get(&collection)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn table_mut(&mut self, collection: Collection) -> &mut Vec<Document> {
        self.collections.entry(collection).or_default()
    }
}

/// Process-local store with the same transactional and unique-key behaviour
/// as the MongoDB store. A session holds the store lock for its whole
/// lifetime and works on a private copy, so transactions are serializable
/// and an aborted or dropped session leaves no trace. Because of that lock,
/// sessions on unrelated exams also wait for each other; use it for tests
/// and local runs only.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
    failing_deletes: Arc<Mutex<HashSet<Collection>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts one document outside of any service operation.
    pub async fn seed<T: Serialize>(&self, collection: Collection, entity: &T) -> AppResult<()> {
        let document = mongodb::bson::to_document(entity)?;
        let mut session = self.begin().await?;
        session.insert_one(collection, document).await?;
        session.commit().await
    }

    pub async fn count(&self, collection: Collection) -> usize {
        self.tables.lock().await.table(collection).len()
    }

    pub async fn documents(&self, collection: Collection) -> Vec<Document> {
        self.tables.lock().await.table(collection).to_vec()
    }

    /// Makes every later `delete_many` against `collection` fail, for
    /// exercising rollback paths.
    pub async fn fail_deletes_on(&self, collection: Collection) {
        self.failing_deletes.lock().await.insert(collection);
    }
}

#[async_trait]
impl EntityStore for InMemoryStore {
    async fn begin(&self) -> AppResult<Box<dyn StoreSession>> {
        let failing_deletes = self.failing_deletes.lock().await.clone();
        let guard = self.tables.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(InMemorySession {
            guard,
            working,
            failing_deletes,
        }))
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        Ok(())
    }

    async fn health_check(&self) -> AppResult<()> {
        Ok(())
    }
}

struct InMemorySession {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
    failing_deletes: HashSet<Collection>,
}

#[async_trait]
impl StoreSession for InMemorySession {
    async fn find_one(
        &mut self,
        collection: Collection,
        filter: Document,
    ) -> AppResult<Option<Document>> {
        Ok(self
            .working
            .table(collection)
            .iter()
            .find(|document| matches(document, &filter))
            .cloned())
    }

    async fn find(
        &mut self,
        collection: Collection,
        filter: Document,
    ) -> AppResult<Vec<Document>> {
        Ok(self
            .working
            .table(collection)
            .iter()
            .filter(|document| matches(document, &filter))
            .cloned()
            .collect())
    }

    async fn count(&mut self, collection: Collection, filter: Document) -> AppResult<u64> {
        Ok(self
            .working
            .table(collection)
            .iter()
            .filter(|document| matches(document, &filter))
            .count() as u64)
    }

    async fn insert_one(&mut self, collection: Collection, document: Document) -> AppResult<()> {
        let table = self.working.table_mut(collection);
        if let Some(violation) = unique_violation(collection, table, &document, None) {
            return Err(AppError::AlreadyExists(violation));
        }
        table.push(document);
        Ok(())
    }

    async fn replace_one(
        &mut self,
        collection: Collection,
        filter: Document,
        replacement: Document,
        upsert: bool,
    ) -> AppResult<u64> {
        let table = self.working.table_mut(collection);
        let position = table.iter().position(|document| matches(document, &filter));

        match position {
            Some(index) => {
                if let Some(violation) = unique_violation(collection, table, &replacement, Some(index)) {
                    return Err(AppError::AlreadyExists(violation));
                }
                table[index] = replacement;
                Ok(1)
            }
            None if upsert => {
                if let Some(violation) = unique_violation(collection, table, &replacement, None) {
                    return Err(AppError::AlreadyExists(violation));
                }
                table.push(replacement);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete_many(&mut self, collection: Collection, filter: Document) -> AppResult<u64> {
        if self.failing_deletes.contains(&collection) {
            return Err(AppError::DatabaseError(format!(
                "delete on {} rejected by store",
                collection
            )));
        }

        let table = self.working.table_mut(collection);
        let before = table.len();
        table.retain(|document| !matches(document, &filter));
        Ok((before - table.len()) as u64)
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let InMemorySession {
            mut guard, working, ..
        } = *self;
        *guard = working;
        Ok(())
    }

    async fn abort(self: Box<Self>) -> AppResult<()> {
        Ok(())
    }
}

fn matches(document: &Document, filter: &Document) -> bool {
    filter.iter().all(|(field, condition)| {
        let value = document.get(field);
        match condition {
            Bson::Document(operators) if is_operator_document(operators) => {
                operators.iter().all(|(operator, operand)| match operator.as_str() {
                    "$in" => match operand {
                        Bson::Array(candidates) => value.is_some_and(|v| candidates.contains(v)),
                        _ => false,
                    },
                    "$ne" => value != Some(operand),
                    _ => false,
                })
            }
            expected => value == Some(expected),
        }
    })
}

fn is_operator_document(document: &Document) -> bool {
    !document.is_empty() && document.keys().all(|key| key.starts_with('$'))
}

fn unique_violation(
    collection: Collection,
    table: &[Document],
    candidate: &Document,
    skip: Option<usize>,
) -> Option<String> {
    let id_key: &[&str] = &["id"];
    std::iter::once(id_key)
        .chain(collection.unique_keys().iter().copied())
        .find(|key| {
            table.iter().enumerate().any(|(index, existing)| {
                Some(index) != skip
                    && key
                        .iter()
                        .all(|field| existing.get(*field) == candidate.get(*field))
            })
        })
        .map(|key| format!("{} unique key ({}) violated", collection, key.join(", ")))
}
