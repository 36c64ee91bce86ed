//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `DUET__*` 覆盖（双下划线表示嵌套，如 `DUET__LLM__PROVIDER=groq`）。
//! API Key 不进配置文件，启动时由 dotenvy 从 .env 载入环境变量。

use std::path::PathBuf;

use serde::Deserialize;

use crate::memory::MemoryLimits;
use crate::workflow::EnrichmentPolicy;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub agent: AgentSection,
    pub tools: ToolsSection,
    pub memory: MemorySection,
}

/// [app] 段
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSection {
    /// CLI 作为 chat_history 传入图的最近轮数（每轮 user + assistant）
    pub history_turns: usize,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            history_turns: 5,
        }
    }
}

/// [llm] 段：后端选择与超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// ollama / openai / groq / gemini / mock
    pub provider: String,
    /// 未设置时使用各 provider 的默认模型
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub timeouts: LlmTimeoutsSection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: None,
            base_url: None,
            timeouts: LlmTimeoutsSection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmTimeoutsSection {
    /// 单次模型调用超时（秒）
    pub request: u64,
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self { request: 120 }
    }
}

/// [agent] 段：迭代上限、补充检索策略、提示词目录
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentSection {
    /// 每次运行允许的 AgentNode 调用次数
    pub max_agent_turns: usize,
    pub enrichment: EnrichmentPolicy,
    /// SecondaryAgent 被要求使用的补充检索工具
    pub enrichment_tool: String,
    /// heuristic 策略使用的不确定性标记（大小写不敏感子串匹配）
    pub uncertainty_markers: Vec<String>,
    /// primary.md / secondary.md 所在目录
    pub prompts_dir: PathBuf,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            max_agent_turns: 8,
            enrichment: EnrichmentPolicy::default(),
            enrichment_tool: "tool_wikipedia".to_string(),
            uncertainty_markers: default_uncertainty_markers(),
            prompts_dir: PathBuf::from("config/prompts"),
        }
    }
}

pub fn default_uncertainty_markers() -> Vec<String> {
    [
        "I'm not sure",
        "not sure",
        "might be",
        "could be",
        "possibly",
        "I don't have enough information",
        "need more details",
        "cannot find",
        "unclear",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// [tools] 段：工具超时与各检索工具参数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsSection {
    /// 单次工具调用超时（秒）
    pub tool_timeout_secs: u64,
    pub search: SearchSection,
    pub wikipedia: WikipediaSection,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            tool_timeout_secs: 30,
            search: SearchSection::default(),
            wikipedia: WikipediaSection::default(),
        }
    }
}

/// [tools.search] 段：DuckDuckGo HTML 端点、HTTP 超时、结果最大字符数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchSection {
    pub endpoint: String,
    pub timeout_secs: u64,
    pub max_result_chars: usize,
}

impl Default for SearchSection {
    fn default() -> Self {
        Self {
            endpoint: "https://html.duckduckgo.com/html/".to_string(),
            timeout_secs: 15,
            max_result_chars: 4000,
        }
    }
}

/// [tools.wikipedia] 段：语言、取前几条词条、超时、结果最大字符数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WikipediaSection {
    pub language: String,
    pub top_k: usize,
    pub timeout_secs: u64,
    pub max_result_chars: usize,
}

impl Default for WikipediaSection {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            top_k: 3,
            timeout_secs: 15,
            max_result_chars: 4000,
        }
    }
}

/// [memory] 段：滚动窗口、检索数量、持久化路径
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MemorySection {
    pub window: usize,
    pub hysteresis: usize,
    pub recent: usize,
    pub max_relevant: usize,
    /// 未设置则不持久化
    pub persist_path: Option<PathBuf>,
}

impl Default for MemorySection {
    fn default() -> Self {
        let limits = MemoryLimits::default();
        Self {
            window: limits.window,
            hysteresis: limits.hysteresis,
            recent: limits.recent,
            max_relevant: limits.max_relevant,
            persist_path: Some(PathBuf::from("workspace/memory.json")),
        }
    }
}

impl MemorySection {
    pub fn limits(&self) -> MemoryLimits {
        MemoryLimits {
            window: self.window,
            hysteresis: self.hysteresis,
            recent: self.recent,
            max_relevant: self.max_relevant,
        }
    }
}

/// 从 config 目录加载配置，环境变量 DUET__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 DUET__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("DUET")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
