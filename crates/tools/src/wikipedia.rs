//! Wikipedia lookup tool: title search, then intro extracts.

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use toolchat_config::WikipediaConfig;
use toolchat_core::error::ToolError;
use toolchat_core::tool::{Tool, ToolResult};
use tracing::{debug, warn};

pub const NAME: &str = "wikipedia";

const NO_RESULT: &str = "No good Wikipedia Search Result was found";

pub struct WikipediaTool {
    client: reqwest::Client,
    api_url: String,
    top_k_results: usize,
    doc_content_chars_max: usize,
}

impl WikipediaTool {
    pub fn new(config: &WikipediaConfig) -> Self {
        Self {
            client: crate::http_client(),
            api_url: format!("https://{}.wikipedia.org/w/api.php", config.lang),
            top_k_results: config.top_k_results,
            doc_content_chars_max: config.doc_content_chars_max,
        }
    }

    /// Point the tool at another MediaWiki endpoint.
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    async fn get<T: DeserializeOwned>(
        &self,
        params: &[(&str, &str)],
    ) -> Result<T, ToolError> {
        self.client
            .get(&self.api_url)
            .query(params)
            .query(&[("format", "json"), ("formatversion", "2")])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| crate::request_failed(NAME, e))?
            .json()
            .await
            .map_err(|e| crate::request_failed(NAME, e))
    }

    async fn search_titles(&self, query: &str) -> Result<Vec<String>, ToolError> {
        let limit = self.top_k_results.to_string();
        let response: SearchResponse = self
            .get(&[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", query),
                ("srlimit", limit.as_str()),
            ])
            .await?;
        Ok(response.titles(self.top_k_results))
    }

    async fn summary(&self, title: &str) -> Result<Option<Page>, ToolError> {
        let response: ExtractResponse = self
            .get(&[
                ("action", "query"),
                ("prop", "extracts"),
                ("exintro", "1"),
                ("explaintext", "1"),
                ("redirects", "1"),
                ("titles", title),
            ])
            .await?;
        Ok(response.into_page())
    }
}

#[async_trait]
impl Tool for WikipediaTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "A wrapper around Wikipedia. Useful for when you need to answer general questions about people, places, companies, facts, historical events, or other subjects. Input should be a search query."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        crate::query_schema()
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let query = crate::query_argument(&arguments)?;
        debug!(query, "Searching Wikipedia");

        let mut pages = Vec::new();
        for title in self.search_titles(query).await? {
            match self.summary(&title).await? {
                Some(page) => pages.push(page),
                None => warn!(title = %title, "Wikipedia page had no extract"),
            }
        }

        Ok(ToolResult {
            call_id: String::new(),
            success: true,
            output: render(&pages, self.doc_content_chars_max),
        })
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    query: Option<SearchQuery>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
}

impl SearchResponse {
    fn titles(self, limit: usize) -> Vec<String> {
        self.query
            .map(|q| q.search.into_iter().take(limit).map(|h| h.title).collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct ExtractResponse {
    #[serde(default)]
    query: Option<ExtractQuery>,
}

#[derive(Debug, Deserialize)]
struct ExtractQuery {
    #[serde(default)]
    pages: Vec<Page>,
}

#[derive(Debug, Clone, Deserialize)]
struct Page {
    title: String,
    #[serde(default)]
    extract: String,
    #[serde(default)]
    missing: bool,
}

impl ExtractResponse {
    fn into_page(self) -> Option<Page> {
        self.query?
            .pages
            .into_iter()
            .find(|p| !p.missing && !p.extract.trim().is_empty())
    }
}

fn render(pages: &[Page], chars_max: usize) -> String {
    if pages.is_empty() {
        return NO_RESULT.to_string();
    }
    let joined = pages
        .iter()
        .map(|p| format!("Page: {}\nSummary: {}", p.title, p.extract.trim()))
        .collect::<Vec<_>>()
        .join("\n\n");

    match joined.char_indices().nth(chars_max) {
        Some((cut, _)) => joined[..cut].to_string(),
        None => joined,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(title: &str, extract: &str) -> Page {
        Page {
            title: title.into(),
            extract: extract.into(),
            missing: false,
        }
    }

    #[test]
    fn search_titles_respect_limit() {
        let response: SearchResponse = serde_json::from_str(
            r#"{"batchcomplete": true, "query": {"searchinfo": {"totalhits": 3},
                "search": [{"ns": 0, "title": "Kyoto"}, {"ns": 0, "title": "Kyoto Station"}, {"ns": 0, "title": "Kyoto Protocol"}]}}"#,
        )
        .unwrap();
        assert_eq!(response.titles(2), vec!["Kyoto", "Kyoto Station"]);
    }

    #[test]
    fn search_without_query_block_is_empty() {
        let response: SearchResponse = serde_json::from_str(r#"{"batchcomplete": true}"#).unwrap();
        assert!(response.titles(3).is_empty());
    }

    #[test]
    fn extract_skips_missing_pages() {
        let missing: ExtractResponse = serde_json::from_str(
            r#"{"query": {"pages": [{"ns": 0, "title": "Nowhere", "missing": true}]}}"#,
        )
        .unwrap();
        assert!(missing.into_page().is_none());

        let found: ExtractResponse = serde_json::from_str(
            r#"{"query": {"pages": [{"pageid": 1, "title": "Kyoto", "extract": "Kyoto is a city in Japan."}]}}"#,
        )
        .unwrap();
        let page = found.into_page().unwrap();
        assert_eq!(page.title, "Kyoto");
        assert_eq!(page.extract, "Kyoto is a city in Japan.");
    }

    #[test]
    fn render_formats_pages() {
        let out = render(
            &[page("Kyoto", "A city."), page("Osaka", "Another city.")],
            4000,
        );
        assert_eq!(
            out,
            "Page: Kyoto\nSummary: A city.\n\nPage: Osaka\nSummary: Another city."
        );
    }

    #[test]
    fn render_truncates_on_char_boundary() {
        let out = render(&[page("東京", "日本の首都")], 12);
        assert_eq!(out.chars().count(), 12);
        assert_eq!(out, "Page: 東京\nSum");
    }

    #[test]
    fn render_without_pages_reports_no_result() {
        assert_eq!(render(&[], 4000), NO_RESULT);
    }

    #[test]
    fn api_url_follows_language() {
        let tool = WikipediaTool::new(&WikipediaConfig {
            lang: "ja".into(),
            top_k_results: 3,
            doc_content_chars_max: 4000,
        });
        assert_eq!(tool.api_url, "https://ja.wikipedia.org/w/api.php");
    }

    #[tokio::test]
    async fn missing_query_returns_error() {
        let tool = WikipediaTool::new(&WikipediaConfig::default());
        let result = tool.execute(serde_json::json!({"q": "typo"})).await;
        assert!(matches!(result, Err(ToolError::InvalidArguments(_))));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_execution_failure() {
        let tool = WikipediaTool::new(&WikipediaConfig::default())
            .with_api_url("http://127.0.0.1:9/w/api.php");
        let result = tool.execute(serde_json::json!({"query": "Kyoto"})).await;
        assert!(matches!(result, Err(ToolError::ExecutionFailed { .. })));
    }
}
