//! 百科检索工具（tool_wikipedia）
//!
//! 两步调用 MediaWiki API：先 list=search 取前 top_k 个标题，再 prop=extracts 取纯文本摘要。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::config::WikipediaSection;
use crate::tools::registry::{required_str, single_string_schema};
use crate::tools::search::truncate_chars;
use crate::tools::Tool;

pub const WIKIPEDIA_TOOL: &str = "tool_wikipedia";

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

#[derive(Debug, Deserialize)]
struct ExtractResponse {
    #[serde(default)]
    query: Option<ExtractQuery>,
}

#[derive(Debug, Deserialize)]
struct ExtractQuery {
    #[serde(default)]
    pages: Map<String, Value>,
}

pub struct WikipediaTool {
    client: Client,
    api_url: String,
    top_k: usize,
    max_result_chars: usize,
}

impl WikipediaTool {
    pub fn new(cfg: &WikipediaSection) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .user_agent(concat!("duet/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self {
            client,
            api_url: format!("https://{}.wikipedia.org/w/api.php", cfg.language),
            top_k: cfg.top_k.max(1),
            max_result_chars: cfg.max_result_chars,
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        params: &[(&str, &str)],
    ) -> Result<T, String> {
        let resp = self
            .client
            .get(&self.api_url)
            .query(params)
            .send()
            .await
            .map_err(|e| format!("Request failed: {}", e))?;
        if !resp.status().is_success() {
            return Err(format!("HTTP {}", resp.status()));
        }
        resp.json::<T>()
            .await
            .map_err(|e| format!("Invalid response: {}", e))
    }

    async fn lookup(&self, query: &str) -> Result<String, String> {
        let limit = self.top_k.to_string();
        let found: SearchResponse = self
            .get_json(&[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", query),
                ("srlimit", &limit),
                ("format", "json"),
            ])
            .await?;
        let titles: Vec<String> = found
            .query
            .map(|q| q.search.into_iter().map(|h| h.title).collect())
            .unwrap_or_default();
        if titles.is_empty() {
            return Ok(format!("No Wikipedia articles found for `{}`", query));
        }

        let joined = titles.join("|");
        let extracts: ExtractResponse = self
            .get_json(&[
                ("action", "query"),
                ("prop", "extracts"),
                ("explaintext", "1"),
                ("exintro", "1"),
                ("redirects", "1"),
                ("titles", &joined),
                ("format", "json"),
            ])
            .await?;
        let pages = extracts.query.map(|q| q.pages).unwrap_or_default();
        Ok(truncate_chars(
            &render_pages(&titles, &pages),
            self.max_result_chars,
        ))
    }
}

/// 按搜索排名输出 `## 标题` + 摘要；缺少摘要的词条跳过
fn render_pages(titles: &[String], pages: &Map<String, Value>) -> String {
    let mut sections = Vec::new();
    for title in titles {
        let extract = pages.values().find_map(|page| {
            let same = page.get("title").and_then(Value::as_str) == Some(title.as_str());
            same.then(|| page.get("extract").and_then(Value::as_str))
                .flatten()
        });
        if let Some(text) = extract.map(str::trim).filter(|t| !t.is_empty()) {
            sections.push(format!("## {}\n{}", title, text));
        }
    }
    if sections.is_empty() {
        // 重定向后标题可能变化，退回到页面自带的顺序
        for page in pages.values() {
            if let (Some(title), Some(text)) = (
                page.get("title").and_then(Value::as_str),
                page.get("extract").and_then(Value::as_str),
            ) {
                if !text.trim().is_empty() {
                    sections.push(format!("## {}\n{}", title, text.trim()));
                }
            }
        }
    }
    sections.join("\n\n")
}

#[async_trait]
impl Tool for WikipediaTool {
    fn name(&self) -> &str {
        WIKIPEDIA_TOOL
    }

    fn description(&self) -> &str {
        "Look up encyclopedic background on Wikipedia. Use a short keyword as the query. Args: {\"query\": \"...\"}."
    }

    fn parameters_schema(&self) -> Value {
        single_string_schema("query", "short keyword, e.g. an entity name")
    }

    async fn invoke(&self, args: &Map<String, Value>) -> Result<String, String> {
        let query = required_str(args, "query")?;
        tracing::info!(query = %query, "wikipedia lookup");
        self.lookup(query).await
    }
}
