use async_trait::async_trait;
use std::time::Duration;

use harf_core::WordOracle;

const SEARCH_ENDPOINT: &str = "https://ar.wikipedia.org/w/api.php";

/// Existence oracle backed by the Arabic Wikipedia search API. A word
/// counts as existing when a full-text search for it returns at least
/// one hit. Used only for words the local dictionary does not know.
pub struct WikipediaOracle {
    client: reqwest::Client,
    endpoint: String,
}

impl WikipediaOracle {
    pub fn new() -> Self {
        Self::with_endpoint(SEARCH_ENDPOINT.to_string())
    }

    pub fn with_endpoint(endpoint: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { client, endpoint }
    }
}

impl Default for WikipediaOracle {
    fn default() -> Self {
        Self::new()
    }
}

fn search_has_hits(body: &serde_json::Value) -> bool {
    body.get("query")
        .and_then(|query| query.get("search"))
        .and_then(|search| search.as_array())
        .map(|hits| !hits.is_empty())
        .unwrap_or(false)
}

#[async_trait]
impl WordOracle for WikipediaOracle {
    async fn word_exists(&self, word: &str) -> anyhow::Result<bool> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", word),
                ("format", "json"),
                ("origin", "*"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("wikipedia search returned {}", response.status());
        }

        let body: serde_json::Value = response.json().await?;
        Ok(search_has_hits(&body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_search_results_mean_the_word_exists() {
        let body = json!({
            "query": {
                "search": [{"title": "قطة", "pageid": 1}]
            }
        });
        assert!(search_has_hits(&body));
    }

    #[test]
    fn test_empty_results_mean_the_word_does_not_exist() {
        let body = json!({"query": {"search": []}});
        assert!(!search_has_hits(&body));
    }

    #[test]
    fn test_malformed_bodies_read_as_no_hits() {
        for body in [json!({}), json!({"query": {}}), json!({"query": {"search": "x"}})] {
            assert!(!search_has_hits(&body));
        }
    }
}
