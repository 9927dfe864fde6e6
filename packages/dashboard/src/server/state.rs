//! Shared application state.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use job_list::{
    ChangeFeed, ControllerDeps, CrawlService, JobQueryClient, JobStore, MemoryJobStore, OwnerId,
    PostgresJobStore,
};

/// Store handles acting on behalf of one user.
#[derive(Clone)]
pub struct SessionStores {
    pub store: Arc<dyn JobStore>,
    pub feed: Arc<dyn ChangeFeed>,
}

/// Hands out per-user views of the job store.
#[async_trait]
pub trait StoreProvider: Send + Sync {
    fn for_owner(&self, owner: OwnerId) -> SessionStores;

    /// Round-trip to the backing store.
    async fn ping(&self) -> job_list::Result<()> {
        Ok(())
    }
}

#[async_trait]
impl StoreProvider for PostgresJobStore {
    fn for_owner(&self, owner: OwnerId) -> SessionStores {
        let scoped = Arc::new(self.with_session(owner));
        SessionStores {
            store: scoped.clone(),
            feed: scoped,
        }
    }

    async fn ping(&self) -> job_list::Result<()> {
        sqlx::query("SELECT 1").execute(self.pool()).await?;
        Ok(())
    }
}

#[async_trait]
impl StoreProvider for MemoryJobStore {
    fn for_owner(&self, owner: OwnerId) -> SessionStores {
        let scoped = Arc::new(self.with_session(owner));
        SessionStores {
            store: scoped.clone(),
            feed: scoped,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub stores: Arc<dyn StoreProvider>,
    pub crawl_service: Arc<dyn CrawlService>,
    pub page_size: u32,
    pub poll_interval: Option<Duration>,
}

impl AppState {
    pub fn query_client(&self, owner: OwnerId) -> JobQueryClient {
        JobQueryClient::new(self.stores.for_owner(owner).store)
    }

    pub fn controller_deps(&self, owner: OwnerId) -> ControllerDeps {
        let SessionStores { store, feed } = self.stores.for_owner(owner);
        ControllerDeps {
            store,
            feed,
            crawl_service: Arc::clone(&self.crawl_service),
        }
    }
}
