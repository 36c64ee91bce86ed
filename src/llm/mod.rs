//! LLM 层：客户端抽象与实现（Ollama / OpenAI 兼容 / Mock）

pub mod mock;
pub mod ollama;
pub mod openai;
pub mod provider;
pub mod traits;

pub use mock::{MockLlmClient, ScriptedLlmClient};
pub use ollama::{OllamaClient, OLLAMA_BASE_URL, OLLAMA_DEFAULT_MODEL};
pub use openai::{OpenAiClient, GEMINI_BASE_URL, GROQ_BASE_URL, OPENAI_BASE_URL};
pub use provider::create_llm_from_config;
pub use traits::{LlmClient, LlmError, ResponseFormat};
