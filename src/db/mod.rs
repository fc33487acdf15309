pub mod collections;
pub mod memory_store;
pub mod mongo_store;
pub mod session;

pub use collections::Collection;
pub use memory_store::InMemoryStore;
pub use mongo_store::MongoStore;
pub use session::{finish, EntityStore, StoreSession};

use mongodb::{
    bson::doc,
    options::{ClientOptions, ServerApi, ServerApiVersion},
    Client,
};
use std::time::Duration;

use crate::{config::Config, errors::AppResult};

/// Connection pool headroom on top of the analysis fan-out, which opens one
/// short session per student in flight.
const BASE_POOL_SIZE: u32 = 8;

#[derive(Clone)]
pub struct Database {
    client: Client,
    db_name: String,
}

impl Database {
    pub async fn connect(config: &Config) -> AppResult<Self> {
        let client = Client::with_options(Self::client_options(config).await?)?;

        let db = Self {
            client,
            db_name: config.mongo_db_name.clone(),
        };
        db.health_check().await?;

        log::info!("Connected to MongoDB database '{}'", db.db_name);
        Ok(db)
    }

    async fn client_options(config: &Config) -> AppResult<ClientOptions> {
        let mut options = ClientOptions::parse(&config.mongo_conn_string).await?;

        options.server_api = Some(ServerApi::builder().version(ServerApiVersion::V1).build());
        options.max_pool_size = Some(BASE_POOL_SIZE + config.analysis_concurrency as u32);
        options.min_pool_size = Some(2);
        options.connect_timeout = Some(Duration::from_secs(5));
        options.server_selection_timeout = Some(Duration::from_secs(5));

        if options.repl_set_name.is_none() && options.load_balanced != Some(true) {
            log::warn!(
                "MONGO_CONN_STRING names no replica set; exam writes need multi-document transactions"
            );
        }
        Ok(options)
    }

    pub fn get_collection<T>(&self, collection: Collection) -> mongodb::Collection<T>
    where
        T: Send + Sync,
    {
        self.client
            .database(&self.db_name)
            .collection(collection.as_str())
    }

    pub async fn health_check(&self) -> AppResult<()> {
        self.client
            .database(&self.db_name)
            .run_command(doc! { "ping": 1 })
            .await?;
        Ok(())
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_structure() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Database>();
    }

    #[tokio::test]
    async fn test_pool_grows_with_analysis_concurrency() {
        let mut config = Config::test_config();
        config.analysis_concurrency = 6;

        let options = Database::client_options(&config).await.expect("options");

        assert_eq!(options.max_pool_size, Some(BASE_POOL_SIZE + 6));
        assert_eq!(options.repl_set_name.as_deref(), Some("rs0"));
    }
}
