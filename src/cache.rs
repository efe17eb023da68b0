//! Locally cached theme and word collections kept in sync with the catalog.
//!
//! Background sync runs once on mount and then on a fixed interval. A failed
//! fetch leaves the cache untouched; the next tick simply tries again.

use crate::catalog::{Catalog, CatalogResult};
use crate::reconcile::{reconcile, Entity};
use crate::store::Store;
use crate::types::*;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

#[derive(Debug, Clone, PartialEq)]
pub struct CacheSnapshot<T> {
    pub items: Vec<T>,
    pub last_synced: Option<DateTime<Utc>>,
}

impl<T> Default for CacheSnapshot<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            last_synced: None,
        }
    }
}

/// Summary of one reconciliation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
    pub changed: bool,
}

#[derive(Debug)]
pub struct CollectionCache<T> {
    name: &'static str,
    store: Store<CacheSnapshot<T>>,
}

impl<T> Clone for CollectionCache<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            store: self.store.clone(),
        }
    }
}

pub type ThemeCache = CollectionCache<Theme>;
pub type WordCache = CollectionCache<Word>;

impl<T: Entity> CollectionCache<T> {
    /// Empty, never-synced cache; `name` only shows up in logs
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            store: Store::new(CacheSnapshot::default()),
        }
    }

    /// Current collection, sorted by id
    pub fn items(&self) -> Vec<T> {
        self.store.get().items
    }

    /// Time of the last successful fetch, changed or not
    pub fn last_synced(&self) -> Option<DateTime<Utc>> {
        self.store.get().last_synced
    }

    /// Notified whenever the visible collection changes
    pub fn subscribe(&self) -> watch::Receiver<CacheSnapshot<T>> {
        self.store.subscribe()
    }

    /// Merge a fetched collection. Subscribers are only woken on real changes.
    pub fn apply_remote(&self, remote: &[T]) -> SyncReport {
        let mut report = SyncReport::default();
        self.store.update(|snapshot| {
            let result = reconcile(&snapshot.items, remote);
            snapshot.last_synced = Some(Utc::now());

            report = SyncReport {
                added: result.added.len(),
                updated: result.updated.len(),
                removed: result.removed.len(),
                changed: result.has_changes(),
            };
            if report.changed {
                snapshot.items = result.merged;
            }
            report.changed
        });

        if report.changed {
            tracing::debug!(
                "Synced {}: {} added, {} updated, {} removed",
                self.name,
                report.added,
                report.updated,
                report.removed
            );
        }
        report
    }

    /// Optimistically add an entry the server has not echoed yet
    pub fn insert_local(&self, mut item: T) {
        item.set_local_only(true);
        self.store.update(|snapshot| {
            snapshot.items.retain(|e| e.id() != item.id());
            snapshot.items.push(item);
            snapshot.items.sort_by_key(Entity::id);
            true
        });
    }

    /// Swap in an edited entry; false if the id is not cached
    pub fn replace_local(&self, item: T) -> bool {
        self.store.update(|snapshot| {
            match snapshot.items.iter_mut().find(|e| e.id() == item.id()) {
                Some(existing) => {
                    *existing = item;
                    true
                }
                None => false,
            }
        })
    }

    pub fn remove_local(&self, id: EntityId) -> bool {
        self.store.update(|snapshot| {
            let before = snapshot.items.len();
            snapshot.items.retain(|e| e.id() != id);
            snapshot.items.len() != before
        })
    }

    /// Fetch and merge once; on error the cache is left as it was
    pub async fn refresh<F>(&self, fetch: F) -> CatalogResult<SyncReport>
    where
        F: Future<Output = CatalogResult<Vec<T>>>,
    {
        match fetch.await {
            Ok(remote) => Ok(self.apply_remote(&remote)),
            Err(e) => {
                tracing::warn!("Failed to sync {}: {}, keeping cached copy", self.name, e);
                Err(e)
            }
        }
    }
}

impl ThemeCache {
    pub fn themes() -> Self {
        Self::new("themes")
    }

    pub async fn refresh_from(&self, catalog: &dyn Catalog) -> CatalogResult<SyncReport> {
        self.refresh(catalog.fetch_themes()).await
    }

    /// Create through the catalog, then show it right away
    pub async fn create(&self, catalog: &dyn Catalog, theme: NewTheme) -> CatalogResult<Theme> {
        let created = catalog.create_theme(theme).await?;
        self.insert_local(created.clone());
        tracing::info!("Created theme {} ({})", created.name, created.id);
        Ok(created)
    }
}

impl WordCache {
    pub fn words() -> Self {
        Self::new("words")
    }

    pub async fn refresh_from(
        &self,
        catalog: &dyn Catalog,
        theme_id: ThemeId,
    ) -> CatalogResult<SyncReport> {
        self.refresh(catalog.fetch_words_by_theme(theme_id)).await
    }

    pub async fn create(&self, catalog: &dyn Catalog, word: NewWord) -> CatalogResult<Word> {
        let created = catalog.create_word(word).await?;
        self.insert_local(created.clone());
        Ok(created)
    }

    pub async fn update(
        &self,
        catalog: &dyn Catalog,
        word_id: WordId,
        text: String,
    ) -> CatalogResult<Word> {
        let updated = catalog.update_word(word_id, text).await?;
        if !self.replace_local(updated.clone()) {
            self.insert_local(updated.clone());
        }
        Ok(updated)
    }

    pub async fn delete(&self, catalog: &dyn Catalog, word_id: WordId) -> CatalogResult<()> {
        catalog.delete_word(word_id).await?;
        self.remove_local(word_id);
        Ok(())
    }
}

/// Background sync task; aborted when dropped
pub struct SyncHandle {
    task: JoinHandle<()>,
}

impl SyncHandle {
    /// Stop syncing; the cache keeps whatever it last received
    pub fn stop(self) {
        self.task.abort();
    }
}

impl Drop for SyncHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn spawn_sync<T, F, Fut>(cache: CollectionCache<T>, every: Duration, fetch: F) -> SyncHandle
where
    T: Entity + Send + Sync + 'static,
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = CatalogResult<Vec<T>>> + Send,
{
    let task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            // First tick completes immediately: the on-mount fetch
            interval.tick().await;
            let _ = cache.refresh(fetch()).await;
        }
    });

    SyncHandle { task }
}

pub fn spawn_theme_sync(
    cache: ThemeCache,
    catalog: Arc<dyn Catalog>,
    every: Duration,
) -> SyncHandle {
    spawn_sync(cache, every, move || {
        let catalog = catalog.clone();
        async move { catalog.fetch_themes().await }
    })
}

pub fn spawn_word_sync(
    cache: WordCache,
    catalog: Arc<dyn Catalog>,
    theme_id: ThemeId,
    every: Duration,
) -> SyncHandle {
    spawn_sync(cache, every, move || {
        let catalog = catalog.clone();
        async move { catalog.fetch_words_by_theme(theme_id).await }
    })
}
