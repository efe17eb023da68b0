use super::*;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// JSON client for a remote theme/word service
///
/// Routes, relative to the base URL:
/// - `GET /themes`, `POST /themes`
/// - `GET /themes/{id}/words`
/// - `POST /words`, `PATCH /words/{id}`, `DELETE /words/{id}`
pub struct HttpCatalog {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct UpdateWordRequest<'a> {
    word: &'a str,
}

impl HttpCatalog {
    pub fn new(base_url: impl Into<String>) -> CatalogResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| CatalogError::Request(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> CatalogResult<T> {
        let response = self.send_raw(request).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| CatalogError::Request(format!("Failed to parse response: {}", e)))
    }

    async fn send_raw(&self, request: reqwest::RequestBuilder) -> CatalogResult<reqwest::Response> {
        let response = request
            .send()
            .await
            .map_err(|e| CatalogError::Request(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound(response.url().path().to_string()));
        }
        if !status.is_success() {
            return Err(CatalogError::Status(status.as_u16()));
        }
        Ok(response)
    }
}

#[async_trait]
impl Catalog for HttpCatalog {
    async fn fetch_themes(&self) -> CatalogResult<Vec<Theme>> {
        self.send(self.client.get(self.url("themes"))).await
    }

    async fn create_theme(&self, theme: NewTheme) -> CatalogResult<Theme> {
        validate_text("Theme name", &theme.name)?;
        self.send(self.client.post(self.url("themes")).json(&theme))
            .await
    }

    async fn fetch_words_by_theme(&self, theme_id: ThemeId) -> CatalogResult<Vec<Word>> {
        self.send(
            self.client
                .get(self.url(&format!("themes/{}/words", theme_id))),
        )
        .await
    }

    async fn create_word(&self, word: NewWord) -> CatalogResult<Word> {
        validate_text("Word", &word.word)?;
        self.send(self.client.post(self.url("words")).json(&word))
            .await
    }

    async fn update_word(&self, word_id: WordId, text: String) -> CatalogResult<Word> {
        let text = validate_text("Word", &text)?;
        self.send(
            self.client
                .patch(self.url(&format!("words/{}", word_id)))
                .json(&UpdateWordRequest { word: &text }),
        )
        .await
    }

    async fn delete_word(&self, word_id: WordId) -> CatalogResult<()> {
        self.send_raw(self.client.delete(self.url(&format!("words/{}", word_id))))
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joining() {
        let catalog = HttpCatalog::new("http://localhost:3000/api/").unwrap();
        assert_eq!(catalog.url("themes"), "http://localhost:3000/api/themes");
        assert_eq!(
            catalog.url("/themes/3/words"),
            "http://localhost:3000/api/themes/3/words"
        );
    }

    #[tokio::test]
    async fn test_blank_word_rejected_before_request() {
        // Nothing listens here; validation must fail first
        let catalog = HttpCatalog::new("http://127.0.0.1:9").unwrap();
        let result = catalog.update_word(1, "  ".to_string()).await;
        assert!(matches!(result, Err(CatalogError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_request_error() {
        let catalog = HttpCatalog::new("http://127.0.0.1:9").unwrap();
        let result = catalog.fetch_themes().await;
        assert!(matches!(result, Err(CatalogError::Request(_))));
    }
}
