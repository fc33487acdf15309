use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Document},
    options::IndexOptions,
    ClientSession, IndexModel,
};

use crate::{
    db::{Collection, Database, EntityStore, StoreSession},
    errors::AppResult,
};

/// MongoDB-backed store. Sessions are multi-document transactions, which
/// require the server to run as a replica set.
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn index_models(collection: Collection) -> Vec<IndexModel> {
        let mut models = vec![IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build()];

        for key in collection.unique_keys() {
            let mut keys = Document::new();
            for field in key.iter() {
                keys.insert(*field, 1);
            }
            models.push(
                IndexModel::builder()
                    .keys(keys)
                    .options(
                        IndexOptions::builder()
                            .unique(true)
                            .name(format!("{}_unique", key.join("_")))
                            .build(),
                    )
                    .build(),
            );
        }

        for field in collection.lookup_keys() {
            let mut keys = Document::new();
            keys.insert(*field, 1);
            models.push(
                IndexModel::builder()
                    .keys(keys)
                    .options(IndexOptions::builder().name(field.to_string()).build())
                    .build(),
            );
        }

        models
    }
}

#[async_trait]
impl EntityStore for MongoStore {
    async fn begin(&self) -> AppResult<Box<dyn StoreSession>> {
        let mut session = self.db.client().start_session().await?;
        session.start_transaction().await?;
        Ok(Box::new(MongoSession {
            db: self.db.clone(),
            session,
        }))
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        for collection in Collection::ALL {
            log::info!("Creating indexes for {} collection", collection);
            let handle = self.db.get_collection::<Document>(collection);
            for model in Self::index_models(collection) {
                handle.create_index(model).await?;
            }
        }
        log::info!("Successfully created indexes for all collections");
        Ok(())
    }

    async fn health_check(&self) -> AppResult<()> {
        self.db.health_check().await
    }
}

struct MongoSession {
    db: Database,
    session: ClientSession,
}

impl MongoSession {
    fn collection(&self, collection: Collection) -> mongodb::Collection<Document> {
        self.db.get_collection(collection)
    }
}

#[async_trait]
impl StoreSession for MongoSession {
    async fn find_one(
        &mut self,
        collection: Collection,
        filter: Document,
    ) -> AppResult<Option<Document>> {
        let document = self
            .collection(collection)
            .find_one(filter)
            .session(&mut self.session)
            .await?;
        Ok(document)
    }

    async fn find(
        &mut self,
        collection: Collection,
        filter: Document,
    ) -> AppResult<Vec<Document>> {
        let mut cursor = self
            .collection(collection)
            .find(filter)
            .session(&mut self.session)
            .await?;
        let documents: Vec<Document> = cursor.stream(&mut self.session).try_collect().await?;
        Ok(documents)
    }

    async fn count(&mut self, collection: Collection, filter: Document) -> AppResult<u64> {
        let count = self
            .collection(collection)
            .count_documents(filter)
            .session(&mut self.session)
            .await?;
        Ok(count)
    }

    async fn insert_one(&mut self, collection: Collection, document: Document) -> AppResult<()> {
        self.collection(collection)
            .insert_one(document)
            .session(&mut self.session)
            .await?;
        Ok(())
    }

    async fn replace_one(
        &mut self,
        collection: Collection,
        filter: Document,
        replacement: Document,
        upsert: bool,
    ) -> AppResult<u64> {
        let result = self
            .collection(collection)
            .replace_one(filter, replacement)
            .upsert(upsert)
            .session(&mut self.session)
            .await?;
        Ok(result.matched_count + u64::from(result.upserted_id.is_some()))
    }

    async fn delete_many(&mut self, collection: Collection, filter: Document) -> AppResult<u64> {
        let result = self
            .collection(collection)
            .delete_many(filter)
            .session(&mut self.session)
            .await?;
        Ok(result.deleted_count)
    }

    async fn commit(mut self: Box<Self>) -> AppResult<()> {
        self.session.commit_transaction().await?;
        Ok(())
    }

    async fn abort(mut self: Box<Self>) -> AppResult<()> {
        self.session.abort_transaction().await?;
        Ok(())
    }
}
