use async_trait::async_trait;
use mongodb::bson::Document;

use crate::{db::Collection, errors::AppResult};

/// A transactional entity store. Each public operation opens one session,
/// performs all its reads and writes through it and then commits or aborts.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn begin(&self) -> AppResult<Box<dyn StoreSession>>;
    async fn ensure_indexes(&self) -> AppResult<()>;
    async fn health_check(&self) -> AppResult<()>;
}

/// One open transaction. Filters use equality on top-level fields, plus
/// `{"$in": [...]}` and `{"$ne": value}`. Dropping a session without
/// committing discards its writes.
#[async_trait]
pub trait StoreSession: Send {
    async fn find_one(
        &mut self,
        collection: Collection,
        filter: Document,
    ) -> AppResult<Option<Document>>;

    async fn find(&mut self, collection: Collection, filter: Document)
        -> AppResult<Vec<Document>>;

    async fn count(&mut self, collection: Collection, filter: Document) -> AppResult<u64>;

    /// Fails with `AlreadyExists` on a unique key violation.
    async fn insert_one(&mut self, collection: Collection, document: Document) -> AppResult<()>;

    /// Returns the number of documents matched or inserted.
    async fn replace_one(
        &mut self,
        collection: Collection,
        filter: Document,
        replacement: Document,
        upsert: bool,
    ) -> AppResult<u64>;

    async fn delete_many(&mut self, collection: Collection, filter: Document) -> AppResult<u64>;

    async fn commit(self: Box<Self>) -> AppResult<()>;

    async fn abort(self: Box<Self>) -> AppResult<()>;
}

/// Commits the session when `outcome` is `Ok`, aborts it otherwise.
pub async fn finish<T>(session: Box<dyn StoreSession>, outcome: AppResult<T>) -> AppResult<T> {
    match outcome {
        Ok(value) => {
            session.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(abort_err) = session.abort().await {
                log::warn!("Failed to abort transaction after '{}': {}", err, abort_err);
            }
            Err(err)
        }
    }
}
