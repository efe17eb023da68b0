//! Theme/word service the engine reads word pools from.

mod http;
mod memory;

use crate::types::*;
use async_trait::async_trait;

pub use http::HttpCatalog;
pub use memory::{CatalogSeed, MemoryCatalog};

pub type CatalogResult<T> = Result<T, CatalogError>;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Service responded with status {0}")]
    Status(u16),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    Invalid(String),

    #[error("Catalog file error: {0}")]
    File(String),
}

/// Fetch-by-theme / create / update / delete contract of the theme service
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn fetch_themes(&self) -> CatalogResult<Vec<Theme>>;

    async fn create_theme(&self, theme: NewTheme) -> CatalogResult<Theme>;

    async fn fetch_words_by_theme(&self, theme_id: ThemeId) -> CatalogResult<Vec<Word>>;

    async fn create_word(&self, word: NewWord) -> CatalogResult<Word>;

    async fn update_word(&self, word_id: WordId, text: String) -> CatalogResult<Word>;

    async fn delete_word(&self, word_id: WordId) -> CatalogResult<()>;

    /// Plain word texts of a theme, as used for role assignment
    async fn fetch_words_for_theme(&self, theme_id: ThemeId) -> CatalogResult<Vec<String>> {
        let words = self.fetch_words_by_theme(theme_id).await?;
        Ok(words
            .into_iter()
            .map(|w| w.word.trim().to_string())
            .filter(|w| !w.is_empty())
            .collect())
    }
}

fn validate_text(kind: &str, text: &str) -> CatalogResult<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(CatalogError::Invalid(format!("{} cannot be empty", kind)));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::sync::Notify;

    /// Memory catalog whose reads can be switched off to simulate an outage,
    /// or held open to simulate a slow service
    pub(crate) struct FlakyCatalog {
        inner: MemoryCatalog,
        failing: AtomicBool,
        held: AtomicBool,
        release: Notify,
        pub(crate) fetches: AtomicUsize,
    }

    impl FlakyCatalog {
        pub(crate) fn new(inner: MemoryCatalog) -> Self {
            Self {
                inner,
                failing: AtomicBool::new(false),
                held: AtomicBool::new(false),
                release: Notify::new(),
                fetches: AtomicUsize::new(0),
            }
        }

        pub(crate) fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        /// Word fetches wait until `release_fetches` is called
        pub(crate) fn hold_fetches(&self) {
            self.held.store(true, Ordering::SeqCst);
        }

        pub(crate) fn release_fetches(&self) {
            self.held.store(false, Ordering::SeqCst);
            self.release.notify_waiters();
        }

        fn check(&self) -> CatalogResult<()> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                return Err(CatalogError::Request("connection refused".to_string()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl Catalog for FlakyCatalog {
        async fn fetch_themes(&self) -> CatalogResult<Vec<Theme>> {
            self.check()?;
            self.inner.fetch_themes().await
        }

        async fn create_theme(&self, theme: NewTheme) -> CatalogResult<Theme> {
            self.inner.create_theme(theme).await
        }

        async fn fetch_words_by_theme(&self, theme_id: ThemeId) -> CatalogResult<Vec<Word>> {
            self.check()?;
            let released = self.release.notified();
            if self.held.load(Ordering::SeqCst) {
                released.await;
            }
            self.inner.fetch_words_by_theme(theme_id).await
        }

        async fn create_word(&self, word: NewWord) -> CatalogResult<Word> {
            self.inner.create_word(word).await
        }

        async fn update_word(&self, word_id: WordId, text: String) -> CatalogResult<Word> {
            self.inner.update_word(word_id, text).await
        }

        async fn delete_word(&self, word_id: WordId) -> CatalogResult<()> {
            self.inner.delete_word(word_id).await
        }
    }

    #[tokio::test]
    async fn test_fetch_words_for_theme_trims_and_skips_blank() {
        let catalog = MemoryCatalog::from_seed(CatalogSeed {
            themes: vec![Theme {
                id: 1,
                name: "Food".to_string(),
                theme_type: "words".to_string(),
                local_only: false,
            }],
            words: vec![
                Word {
                    id: 2,
                    theme_id: 1,
                    word: " Pizza ".to_string(),
                    local_only: false,
                },
                Word {
                    id: 3,
                    theme_id: 1,
                    word: "   ".to_string(),
                    local_only: false,
                },
            ],
        });

        let words = catalog.fetch_words_for_theme(1).await.unwrap();
        assert_eq!(words, vec!["Pizza".to_string()]);
    }
}
