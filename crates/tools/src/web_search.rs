//! DuckDuckGo search tool, backed by the HTML results page.
//!
//! The page needs no API key. Each organic result carries a snippet; ads are
//! skipped.

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use toolchat_config::SearchConfig;
use toolchat_core::error::ToolError;
use toolchat_core::tool::{Tool, ToolResult};
use tracing::debug;

pub const NAME: &str = "duckduckgo_search";

const NO_RESULT: &str = "No good DuckDuckGo Search Result was found";

const SNIPPET_SELECTOR: &str = ".result:not(.result--ad) .result__snippet";

pub struct DuckDuckGoSearchTool {
    client: reqwest::Client,
    base_url: String,
    max_results: usize,
}

impl DuckDuckGoSearchTool {
    pub fn new(config: &SearchConfig) -> Self {
        Self {
            client: crate::http_client(),
            base_url: config.base_url.clone(),
            max_results: config.max_results,
        }
    }

    async fn fetch(&self, query: &str) -> Result<String, ToolError> {
        self.client
            .get(&self.base_url)
            .query(&[("q", query)])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| crate::request_failed(NAME, e))?
            .text()
            .await
            .map_err(|e| crate::request_failed(NAME, e))
    }
}

#[async_trait]
impl Tool for DuckDuckGoSearchTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "A wrapper around DuckDuckGo Search. Useful for when you need to answer questions about current events. Input should be a search query."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        crate::query_schema()
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let query = crate::query_argument(&arguments)?;
        debug!(query, "Searching DuckDuckGo");

        let page = self.fetch(query).await?;
        let snippets = parse_snippets(&page, self.max_results)?;
        debug!(query, results = snippets.len(), "DuckDuckGo answered");

        Ok(ToolResult {
            call_id: String::new(),
            success: true,
            output: render(&snippets),
        })
    }
}

/// Snippet text of the first `max_results` organic results, in page order.
fn parse_snippets(page: &str, max_results: usize) -> Result<Vec<String>, ToolError> {
    let selector = Selector::parse(SNIPPET_SELECTOR).map_err(|e| ToolError::ExecutionFailed {
        tool_name: NAME.into(),
        reason: format!("invalid selector: {e}"),
    })?;

    let document = Html::parse_document(page);
    Ok(document
        .select(&selector)
        .map(element_text)
        .filter(|s| !s.is_empty())
        .take(max_results)
        .collect())
}

/// Visible text with whitespace runs collapsed; highlights like `<b>` are
/// flattened into the surrounding text.
fn element_text(element: ElementRef<'_>) -> String {
    let text: String = element.text().collect();
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn render(snippets: &[String]) -> String {
    if snippets.is_empty() {
        NO_RESULT.to_string()
    } else {
        snippets.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESULTS_PAGE: &str = include_str!("../tests/fixtures/ddg_results.html");
    const EMPTY_PAGE: &str = include_str!("../tests/fixtures/ddg_no_results.html");

    #[test]
    fn snippets_come_from_organic_results() {
        let snippets = parse_snippets(RESULTS_PAGE, 4).unwrap();
        assert_eq!(
            snippets,
            vec![
                "Rust 1.85.0 stabilises the 2024 edition, the largest edition release so far.",
                "The Rust 2024 edition is now stable. It brings async closures and RPIT lifetime capture rules.",
                "Rust is a general-purpose programming language emphasizing performance, type safety, and concurrency.",
                "A language empowering everyone to build reliable and efficient software.",
            ]
        );
        assert!(snippets.iter().all(|s| !s.contains("Sponsored")));
    }

    #[test]
    fn results_are_capped_and_joined() {
        let snippets = parse_snippets(RESULTS_PAGE, 2).unwrap();
        assert_eq!(
            render(&snippets),
            "Rust 1.85.0 stabilises the 2024 edition, the largest edition release so far. \
             The Rust 2024 edition is now stable. It brings async closures and RPIT lifetime capture rules."
        );
    }

    #[test]
    fn empty_page_reports_no_result() {
        let snippets = parse_snippets(EMPTY_PAGE, 4).unwrap();
        assert!(snippets.is_empty());
        assert_eq!(render(&snippets), NO_RESULT);
        assert_eq!(render(&parse_snippets("", 4).unwrap()), NO_RESULT);
    }

    #[tokio::test]
    async fn missing_query_returns_error() {
        let tool = DuckDuckGoSearchTool::new(&SearchConfig::default());
        let result = tool.execute(serde_json::json!({})).await;
        assert!(matches!(result, Err(ToolError::InvalidArguments(_))));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_execution_failure() {
        let tool = DuckDuckGoSearchTool::new(&SearchConfig {
            base_url: "http://127.0.0.1:9/".into(),
            max_results: 4,
        });
        let result = tool.execute(serde_json::json!({"query": "rust"})).await;
        assert!(matches!(result, Err(ToolError::ExecutionFailed { ref tool_name, .. }) if tool_name == NAME));
    }

    #[test]
    fn tool_definition() {
        let tool = DuckDuckGoSearchTool::new(&SearchConfig::default());
        let def = tool.to_definition();
        assert_eq!(def.name, "duckduckgo_search");
        assert!(def.description.contains("current events"));
        assert_eq!(def.parameters["required"][0], "query");
    }
}
