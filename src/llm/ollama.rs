//! Ollama 客户端（OpenAI 兼容格式）
//!
//! Ollama 在 `/v1` 路径下提供与 OpenAI 兼容的 Chat API，无需真实 API Key。
//! - 默认端点: http://localhost:11434

use crate::llm::OpenAiClient;

/// Ollama 默认端点
pub const OLLAMA_BASE_URL: &str = "http://localhost:11434";

/// 创建 Ollama 客户端
///
/// - 端点可通过 `base_url` 参数或环境变量 `OLLAMA_BASE_URL` 指定
/// - 模型可通过 `model` 参数或 `OLLAMA_MODEL` 环境变量指定
pub fn create_ollama_client(base_url: Option<&str>, model: Option<&str>) -> OpenAiClient {
    let base = base_url
        .map(String::from)
        .or_else(|| std::env::var("OLLAMA_BASE_URL").ok())
        .unwrap_or_else(|| OLLAMA_BASE_URL.to_string());

    let model = model
        .map(String::from)
        .or_else(|| std::env::var("OLLAMA_MODEL").ok())
        .unwrap_or_else(|| "deepseek-v3.1:671b-cloud".to_string());

    // Ollama 不校验 Key，但 OpenAI 兼容层要求非空
    let api_base = format!("{}/v1", base.trim_end_matches('/'));
    OpenAiClient::new(Some(&api_base), &model, Some("ollama"))
}
