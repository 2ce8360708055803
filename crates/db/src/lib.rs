//! MongoDB connection lifecycle for the Library API.
//!
//! One [`Database`] handle is created at process start and shut down at
//! process stop. Modules never see the raw client; they reach the store
//! through named collections only.

use anyhow::Context;
use mongodb::{options::ClientOptions, Client, Collection};

use library_kernel::settings::DatabaseSettings;

/// Process-wide MongoDB handle bound to a single logical database.
#[derive(Debug, Clone)]
pub struct Database {
    client: Client,
    database: String,
}

impl Database {
    /// Establish the connection described by the database settings.
    pub async fn connect(settings: &DatabaseSettings) -> anyhow::Result<Self> {
        let options = ClientOptions::parse(&settings.url)
            .await
            .with_context(|| format!("failed to parse MongoDB url '{}'", settings.url))?;

        let client = Client::with_options(options)
            .with_context(|| "failed to create MongoDB client")?;

        tracing::info!(database = %settings.database, "MongoDB connected");

        Ok(Self {
            client,
            database: settings.database.clone(),
        })
    }

    /// Named collection within the configured database.
    pub fn collection<T>(&self, name: &str) -> Collection<T>
    where
        T: Send + Sync,
    {
        self.client.database(&self.database).collection(name)
    }

    /// Release the client and its connection pool.
    pub async fn shutdown(self) {
        self.client.shutdown().await;
        tracing::info!("database disconnected");
    }
}
