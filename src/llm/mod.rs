//! LLM 层：客户端抽象与实现（OpenAI 兼容 / Ollama / Mock）

pub mod mock;
pub mod ollama;
pub mod openai;
pub mod traits;

use std::sync::Arc;

pub use mock::{MockLlmClient, ScriptedLlmClient};
pub use ollama::{create_ollama_client, OLLAMA_BASE_URL};
pub use openai::{OpenAiClient, TokenUsage};
pub use traits::{LlmClient, LlmError, Message, Role};

use crate::config::AppConfig;

/// 根据配置与环境变量选择 LLM 后端（Ollama / OpenAI 兼容 / Mock）
pub fn create_llm_from_config(cfg: &AppConfig) -> Arc<dyn LlmClient> {
    let provider = cfg.llm.provider.to_lowercase();

    if provider == "ollama" {
        let model = cfg
            .llm
            .ollama
            .model
            .clone()
            .unwrap_or_else(|| cfg.llm.model.clone());
        tracing::info!("Using Ollama LLM ({})", model);
        Arc::new(create_ollama_client(
            cfg.llm.base_url.as_deref(),
            Some(&model),
        ))
    } else if provider == "openai" && std::env::var("OPENAI_API_KEY").is_ok() {
        let model = cfg
            .llm
            .openai
            .model
            .clone()
            .unwrap_or_else(|| cfg.llm.model.clone());
        tracing::info!("Using OpenAI LLM ({})", model);
        Arc::new(OpenAiClient::new(
            cfg.llm.base_url.as_deref(),
            &model,
            std::env::var("OPENAI_API_KEY").ok().as_deref(),
        ))
    } else {
        tracing::warn!("No usable LLM provider configured, using Mock LLM");
        Arc::new(MockLlmClient)
    }
}
