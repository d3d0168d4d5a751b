//! Supervisor 错误类型
//!
//! 所有在分类 / 分发 / Agent 执行过程中可能出现的错误；
//! execute_task 是唯一边界，在那里统一转为失败的 TaskResult。

use thiserror::Error;

use crate::llm::LlmError;

/// 任务编排过程中可能出现的错误（LLM、工具、解析、非法 Agent 类型）
#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("JSON parse error: {0}")]
    JsonParse(String),

    #[error("Tool execution failed: {0}")]
    ToolExecutionFailed(String),

    #[error("Hallucinated tool: {0}")]
    HallucinatedTool(String),

    #[error("Unknown agent kind: {0}")]
    UnknownAgentKind(String),
}
