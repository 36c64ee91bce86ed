//! Web 搜索工具（tool_browser）
//!
//! 通过 DuckDuckGo 的 HTML 端点检索，用 html2text 提取可读文本；
//! 响应超过 max_result_chars 时截断并追加 ...[truncated]。

use std::time::Duration;

use async_trait::async_trait;
use html2text::from_read;
use reqwest::Client;
use serde_json::{Map, Value};

use crate::config::SearchSection;
use crate::tools::registry::{required_str, single_string_schema};
use crate::tools::Tool;

pub const WEB_SEARCH_TOOL: &str = "tool_browser";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// 按字符截断，超出时追加标记
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        text.chars().take(max_chars).collect::<String>() + "\n...[truncated]"
    } else {
        text.to_string()
    }
}

/// 去掉 html2text 输出中的空行，压缩结果
fn compact_lines(text: &str) -> String {
    text.lines()
        .map(str::trim_end)
        .filter(|l| !l.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

pub struct WebSearchTool {
    client: Client,
    endpoint: String,
    max_result_chars: usize,
}

impl WebSearchTool {
    pub fn new(cfg: &SearchSection) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            endpoint: cfg.endpoint.clone(),
            max_result_chars: cfg.max_result_chars,
        }
    }

    fn html_to_text(html: &str) -> String {
        match from_read(html.as_bytes(), 120) {
            Ok(text) => compact_lines(&text),
            Err(e) => {
                tracing::debug!(error = %e, "html2text failed, returning raw body");
                html.to_string()
            }
        }
    }

    async fn search(&self, query: &str) -> Result<String, String> {
        let resp = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query)])
            .send()
            .await
            .map_err(|e| format!("Request failed: {}", e))?;
        if !resp.status().is_success() {
            return Err(format!("HTTP {}", resp.status()));
        }
        let body = resp
            .text()
            .await
            .map_err(|e| format!("Read body: {}", e))?;
        let text = Self::html_to_text(body.trim_start_matches('\u{FEFF}'));
        if text.trim().is_empty() {
            return Ok(format!("No web results for `{}`", query));
        }
        Ok(truncate_chars(&text, self.max_result_chars))
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        WEB_SEARCH_TOOL
    }

    fn description(&self) -> &str {
        "Search the web for general and up-to-date information. Args: {\"query\": \"...\"}."
    }

    fn parameters_schema(&self) -> Value {
        single_string_schema("query", "free-text search query")
    }

    async fn invoke(&self, args: &Map<String, Value>) -> Result<String, String> {
        let query = required_str(args, "query")?;
        tracing::info!(query = %query, "web search");
        self.search(query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("abc", 5), "abc");
        assert_eq!(truncate_chars("abcdef", 3), "abc\n...[truncated]");
        // 按字符而非字节
        assert_eq!(truncate_chars("维基百科", 2), "维基\n...[truncated]");
    }

    #[test]
    fn test_html_to_text_drops_markup() {
        let text = WebSearchTool::html_to_text(
            "<html><body><h2>Rust</h2>\n\n<p>A systems language</p></body></html>",
        );
        assert!(text.contains("Rust"));
        assert!(text.contains("A systems language"));
        assert!(!text.contains("<p>"));
    }

    #[tokio::test]
    async fn test_missing_query_is_error() {
        let tool = WebSearchTool::new(&SearchSection::default());
        let err = tool.invoke(&Map::new()).await.unwrap_err();
        assert!(err.contains("query"));
    }
}
