//! Ephemeral schema cache.

use super::SchemaCache;
use crate::domain::Schema;
use crate::error::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;

/// Schema cache held in memory and lost when the process exits.
#[derive(Debug, Default)]
pub struct InMemorySchemaStore {
    snapshot: Mutex<Option<Schema>>,
}

impl InMemorySchemaStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `schema`.
    #[must_use]
    pub fn with_snapshot(schema: Schema) -> Self {
        Self {
            snapshot: Mutex::new(Some(schema)),
        }
    }
}

#[async_trait]
impl SchemaCache for InMemorySchemaStore {
    async fn load(&self) -> Option<Schema> {
        self.snapshot.lock().await.clone()
    }

    async fn save(&self, schema: &Schema) -> Result<()> {
        *self.snapshot.lock().await = Some(schema.clone());
        Ok(())
    }
}
