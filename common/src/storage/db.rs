use std::ops::Deref;

use surrealdb::{
    engine::any::{connect, Any},
    opt::auth::Root,
    Error, Surreal,
};

use crate::error::AppError;

use super::types::StoredObject;

#[derive(Clone)]
pub struct SurrealDbClient {
    pub client: Surreal<Any>,
}

impl SurrealDbClient {
    pub async fn new(
        address: &str,
        username: &str,
        password: &str,
        namespace: &str,
        database: &str,
    ) -> Result<Self, Error> {
        let db = connect(address).await?;

        // Sign in to database
        db.signin(Root { username, password }).await?;

        // Set namespace
        db.use_ns(namespace).use_db(database).await?;

        Ok(SurrealDbClient { client: db })
    }

    /// Runs the idempotent schema setup. Call once at startup, before any
    /// request touches the store; the chunk index dimension must match the
    /// configured embedding provider.
    pub async fn ensure_initialized(&self, embedding_dimension: usize) -> Result<(), AppError> {
        self.build_indexes(embedding_dimension).await?;
        Ok(())
    }

    pub async fn build_indexes(&self, embedding_dimension: usize) -> Result<(), Error> {
        self.client
            .query(format!(
                "DEFINE INDEX IF NOT EXISTS idx_chunk_embedding ON index_chunk FIELDS embedding HNSW DIMENSION {embedding_dimension} DIST COSINE"
            ))
            .await?;
        self.client
            .query("DEFINE INDEX IF NOT EXISTS idx_chunk_index_id ON index_chunk FIELDS index_id")
            .await?;
        self.client
            .query("DEFINE INDEX IF NOT EXISTS idx_document_created ON document FIELDS created_at")
            .await?;

        Ok(())
    }

    /// Stores an object under its own id, requires the struct to implement `StoredObject`
    ///
    /// # Arguments
    /// * `item` - The item to be stored
    ///
    /// # Returns
    /// * `Result` - Item or Error
    pub async fn store_item<T>(&self, item: T) -> Result<Option<T>, Error>
    where
        T: StoredObject + Send + Sync + 'static,
    {
        self.client
            .create((T::table_name(), item.get_id()))
            .content(item)
            .await
    }

    /// Retrieves a single object by its ID, requires the struct to implement `StoredObject`
    ///
    /// # Arguments
    /// * `id` - The ID of the item to retrieve
    ///
    /// # Returns
    /// * `Result<Option<T>, Error>` - The found item or Error
    pub async fn get_item<T>(&self, id: &str) -> Result<Option<T>, Error>
    where
        T: for<'de> StoredObject,
    {
        self.client.select((T::table_name(), id)).await
    }
}

impl Deref for SurrealDbClient {
    type Target = Surreal<Any>;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl SurrealDbClient {
    /// Create an in-memory SurrealDB client for testing.
    pub async fn memory(namespace: &str, database: &str) -> Result<Self, Error> {
        let db = connect("mem://").await?;

        db.use_ns(namespace).use_db(database).await?;

        Ok(SurrealDbClient { client: db })
    }
}
