use super::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::sync::RwLock;

/// Contents of a catalog seed file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogSeed {
    #[serde(default)]
    pub themes: Vec<Theme>,
    #[serde(default)]
    pub words: Vec<Word>,
}

#[derive(Debug, Default)]
struct Tables {
    themes: Vec<Theme>,
    words: Vec<Word>,
    next_id: EntityId,
}

impl Tables {
    fn allocate_id(&mut self) -> EntityId {
        self.next_id += 1;
        self.next_id
    }
}

/// In-process catalog used when no theme service is configured
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    tables: RwLock<Tables>,
}

const DEFAULT_THEMES: &[(&str, &[&str])] = &[
    (
        "Food",
        &["Pizza", "Sushi", "Tacos", "Ramen", "Croissant", "Burger", "Paella"],
    ),
    (
        "Places",
        &["Beach", "Library", "Airport", "Hospital", "Museum", "Casino", "Zoo"],
    ),
    (
        "Animals",
        &["Penguin", "Giraffe", "Octopus", "Kangaroo", "Owl", "Camel", "Dolphin"],
    ),
    (
        "Jobs",
        &["Firefighter", "Chef", "Pilot", "Dentist", "Librarian", "Astronaut"],
    ),
];

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: CatalogSeed) -> Self {
        let next_id = seed
            .themes
            .iter()
            .map(|t| t.id)
            .chain(seed.words.iter().map(|w| w.id))
            .max()
            .unwrap_or(0);

        Self {
            tables: RwLock::new(Tables {
                themes: seed.themes,
                words: seed.words,
                next_id,
            }),
        }
    }

    /// Catalog pre-filled with a handful of playable themes
    pub fn with_defaults() -> Self {
        let mut tables = Tables::default();
        for (name, words) in DEFAULT_THEMES {
            let theme_id = tables.allocate_id();
            tables.themes.push(Theme {
                id: theme_id,
                name: name.to_string(),
                theme_type: "words".to_string(),
                local_only: false,
            });
            for word in words.iter() {
                let id = tables.allocate_id();
                tables.words.push(Word {
                    id,
                    theme_id,
                    word: word.to_string(),
                    local_only: false,
                });
            }
        }

        Self {
            tables: RwLock::new(tables),
        }
    }

    /// Read a JSON seed file such as the one named by `CATALOG_FILE`
    pub async fn load(path: impl AsRef<Path>) -> CatalogResult<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| CatalogError::File(format!("{}: {}", path.display(), e)))?;
        let seed: CatalogSeed = serde_json::from_str(&raw)
            .map_err(|e| CatalogError::File(format!("{}: {}", path.display(), e)))?;

        tracing::info!(
            "Loaded catalog from {} ({} themes, {} words)",
            path.display(),
            seed.themes.len(),
            seed.words.len()
        );
        Ok(Self::from_seed(seed))
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn fetch_themes(&self) -> CatalogResult<Vec<Theme>> {
        Ok(self.tables.read().await.themes.clone())
    }

    async fn create_theme(&self, theme: NewTheme) -> CatalogResult<Theme> {
        let name = validate_text("Theme name", &theme.name)?;
        let mut tables = self.tables.write().await;

        let theme = Theme {
            id: tables.allocate_id(),
            name,
            theme_type: theme.theme_type,
            local_only: false,
        };
        tables.themes.push(theme.clone());
        Ok(theme)
    }

    async fn fetch_words_by_theme(&self, theme_id: ThemeId) -> CatalogResult<Vec<Word>> {
        let tables = self.tables.read().await;
        if !tables.themes.iter().any(|t| t.id == theme_id) {
            return Err(CatalogError::NotFound(format!("theme {}", theme_id)));
        }

        Ok(tables
            .words
            .iter()
            .filter(|w| w.theme_id == theme_id)
            .cloned()
            .collect())
    }

    async fn create_word(&self, word: NewWord) -> CatalogResult<Word> {
        let text = validate_text("Word", &word.word)?;
        let mut tables = self.tables.write().await;
        if !tables.themes.iter().any(|t| t.id == word.theme_id) {
            return Err(CatalogError::NotFound(format!("theme {}", word.theme_id)));
        }

        let word = Word {
            id: tables.allocate_id(),
            theme_id: word.theme_id,
            word: text,
            local_only: false,
        };
        tables.words.push(word.clone());
        Ok(word)
    }

    async fn update_word(&self, word_id: WordId, text: String) -> CatalogResult<Word> {
        let text = validate_text("Word", &text)?;
        let mut tables = self.tables.write().await;
        let word = tables
            .words
            .iter_mut()
            .find(|w| w.id == word_id)
            .ok_or_else(|| CatalogError::NotFound(format!("word {}", word_id)))?;
        word.word = text;
        Ok(word.clone())
    }

    async fn delete_word(&self, word_id: WordId) -> CatalogResult<()> {
        let mut tables = self.tables.write().await;
        let before = tables.words.len();
        tables.words.retain(|w| w.id != word_id);
        if tables.words.len() == before {
            return Err(CatalogError::NotFound(format!("word {}", word_id)));
        }
        Ok(())
    }
}
