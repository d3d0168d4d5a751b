//! Agent 执行器：意图规划与 Tool Call 解析
//!
//! 每个 Agent 绑定一份 system prompt 与一组工具，构造后无状态；
//! invoke 驱动 计划 -> 工具 -> 观察 的循环：LLM 输出 JSON Tool Call 则执行
//! 工具并把结果写回对话，输出普通文本则作为最终回复。工具选择完全由
//! LLM 决定，本层只做转发与解析。

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SupervisorError;
use crate::llm::{LlmClient, Message};
use crate::tools::ToolRegistry;

/// LLM 返回的 Tool Call（简化 JSON：{"tool": "amap_poi_search", "args": {...}}）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub tool: String,
    #[serde(default)]
    pub args: Value,
}

/// 单轮 LLM 输出的解析结果
#[derive(Debug, Clone)]
pub enum AgentOutput {
    /// 直接回复用户
    Response(String),
    /// 需要执行工具
    ToolCall(ToolCall),
}

/// 解析 LLM 输出：若含有效 JSON 且 tool 非空则为 ToolCall，否则为 Response
pub fn parse_agent_output(output: &str) -> Result<AgentOutput, SupervisorError> {
    let trimmed = output.trim();

    // 尝试提取 JSON 块（```json ... ``` 或纯 JSON）
    let json_str = if let Some(start) = trimmed.find("```json") {
        let rest = &trimmed[start + 7..];
        rest.find("```")
            .map(|end| rest[..end].trim())
            .unwrap_or(rest.trim())
    } else if let Some(start) = trimmed.find('{') {
        if let Some(end) = trimmed.rfind('}') {
            &trimmed[start..=end]
        } else {
            trimmed
        }
    } else {
        return Ok(AgentOutput::Response(trimmed.to_string()));
    };

    match serde_json::from_str::<ToolCall>(json_str) {
        Ok(call) if !call.tool.is_empty() => Ok(AgentOutput::ToolCall(call)),
        Ok(_) => Ok(AgentOutput::Response(trimmed.to_string())),
        // 普通回答里也可能出现花括号；仅当形似工具调用时按解析错误处理
        Err(e) if json_str.contains("\"tool\"") => Err(SupervisorError::JsonParse(format!(
            "{}: {}",
            e, json_str
        ))),
        Err(_) => Ok(AgentOutput::Response(trimmed.to_string())),
    }
}

/// Agent 调用结果：完整对话消息列表，最后一条为最终回复
#[derive(Debug, Clone)]
pub struct AgentReply {
    pub messages: Vec<Message>,
}

impl AgentReply {
    /// 最后一条消息的内容；列表为空时返回 None
    pub fn final_content(&self) -> Option<&str> {
        self.messages.last().map(|m| m.content.as_str())
    }
}

/// Agent 执行器：持有 LLM、工具集与 system prompt
pub struct AgentExecutor {
    name: String,
    llm: Arc<dyn LlmClient>,
    tools: ToolRegistry,
    system_prompt: String,
    max_steps: usize,
}

impl AgentExecutor {
    pub fn new(
        name: impl Into<String>,
        llm: Arc<dyn LlmClient>,
        tools: ToolRegistry,
        system_prompt: impl Into<String>,
        max_steps: usize,
    ) -> Self {
        Self {
            name: name.into(),
            llm,
            tools,
            system_prompt: system_prompt.into(),
            max_steps,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.tool_names()
    }

    /// 拼接 system prompt：基础提示词 + 可用工具列表 + 调用协议
    fn compose_system(&self) -> String {
        if self.tools.is_empty() {
            return self.system_prompt.clone();
        }
        format!(
            "{}\n\n可用工具:\n{}\n\n调用工具时只输出一个 JSON 对象：{{\"tool\": \"工具名\", \"args\": {{...}}}}，不要附加其他文字。\n拿到所需信息后，直接用自然语言回复最终结果。",
            self.system_prompt,
            self.tools.prompt_section()
        )
    }

    /// 执行一次 Agent 调用：循环直到 LLM 给出普通文本回复或达到步数上限。
    /// 工具失败与未知工具直接上抛，由 Supervisor 统一转为失败结果。
    pub async fn invoke(&self, conversation: &[Message]) -> Result<AgentReply, SupervisorError> {
        let system = self.compose_system();
        let mut messages = conversation.to_vec();
        let mut last_output = String::new();

        for _step in 0..self.max_steps {
            let mut full = vec![Message::system(system.clone())];
            full.extend(messages.iter().cloned());

            let output = self.llm.complete(&full).await?;
            last_output = output.clone();

            match parse_agent_output(&output)? {
                AgentOutput::Response(resp) => {
                    messages.push(Message::assistant(resp));
                    return Ok(AgentReply { messages });
                }
                AgentOutput::ToolCall(tc) => {
                    if self.tools.get(&tc.tool).is_none() {
                        tracing::warn!(agent = %self.name, tool = %tc.tool, "工具不存在");
                        return Err(SupervisorError::HallucinatedTool(tc.tool));
                    }

                    tracing::info!(agent = %self.name, tool = %tc.tool, "调用工具");
                    let observation = self
                        .tools
                        .execute(&tc.tool, tc.args.clone())
                        .await
                        .map_err(SupervisorError::ToolExecutionFailed)?;

                    // 将工具调用与结果写回对话，供下一轮使用
                    messages.push(Message::assistant(format!(
                        "Tool call: {} | Result: {}",
                        tc.tool, observation
                    )));
                    messages.push(Message::user(format!(
                        "Observation from {}: {}",
                        tc.tool, observation
                    )));
                }
            }
        }

        // 达到步数上限：以最后一次输出收尾，避免死循环
        messages.push(Message::assistant(format!(
            "达到最大步数限制 ({})，最后输出：\n{}",
            self.max_steps, last_output
        )));
        Ok(AgentReply { messages })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedLlmClient;
    use crate::tools::EchoTool;

    fn executor_with_echo(llm: Arc<dyn LlmClient>) -> AgentExecutor {
        let mut tools = ToolRegistry::new();
        tools.register(EchoTool);
        AgentExecutor::new("test", llm, tools, "你是测试助手。", 4)
    }

    #[test]
    fn parse_plain_text_is_response() {
        let out = parse_agent_output("你好，有什么可以帮你？").unwrap();
        assert!(matches!(out, AgentOutput::Response(_)));
    }

    #[test]
    fn parse_fenced_json_is_tool_call() {
        let out =
            parse_agent_output("```json\n{\"tool\": \"echo\", \"args\": {\"text\": \"hi\"}}\n```")
                .unwrap();
        match out {
            AgentOutput::ToolCall(tc) => assert_eq!(tc.tool, "echo"),
            other => panic!("expected tool call, got {:?}", other),
        }
    }

    #[test]
    fn parse_braces_without_tool_key_is_response() {
        let out = parse_agent_output("示例输出形如 {a: 1} 的结构").unwrap();
        assert!(matches!(out, AgentOutput::Response(_)));
    }

    #[test]
    fn parse_malformed_tool_json_is_error() {
        let err = parse_agent_output("{\"tool\": \"echo\", \"args\": }").unwrap_err();
        assert!(matches!(err, SupervisorError::JsonParse(_)));
    }

    #[tokio::test]
    async fn invoke_returns_plain_reply() {
        let llm = Arc::new(ScriptedLlmClient::new(vec!["直接回答"]));
        let agent = executor_with_echo(llm);
        let reply = agent.invoke(&[Message::user("你好")]).await.unwrap();
        assert_eq!(reply.final_content(), Some("直接回答"));
    }

    #[tokio::test]
    async fn invoke_runs_tool_then_replies() {
        let llm = Arc::new(ScriptedLlmClient::new(vec![
            r#"{"tool": "echo", "args": {"text": "ok"}}"#,
            "完成",
        ]));
        let agent = executor_with_echo(llm);
        let reply = agent.invoke(&[Message::user("请回显 ok")]).await.unwrap();
        assert_eq!(reply.final_content(), Some("完成"));
        assert!(reply
            .messages
            .iter()
            .any(|m| m.content.contains("Observation from echo")));
    }

    #[tokio::test]
    async fn invoke_rejects_hallucinated_tool() {
        let llm = Arc::new(ScriptedLlmClient::new(vec![
            r#"{"tool": "teleport", "args": {}}"#,
        ]));
        let agent = executor_with_echo(llm);
        let err = agent.invoke(&[Message::user("x")]).await.unwrap_err();
        assert!(matches!(err, SupervisorError::HallucinatedTool(t) if t == "teleport"));
    }

    #[tokio::test]
    async fn invoke_propagates_llm_failure() {
        let llm = Arc::new(ScriptedLlmClient::new(vec![]));
        let agent = executor_with_echo(llm);
        let err = agent.invoke(&[Message::user("x")]).await.unwrap_err();
        assert!(matches!(err, SupervisorError::Llm(_)));
    }

    #[tokio::test]
    async fn invoke_stops_at_max_steps() {
        // 每一步都只发工具调用，永不收尾
        let llm = Arc::new(ScriptedLlmClient::new(vec![
            r#"{"tool": "echo", "args": {"text": "1"}}"#,
            r#"{"tool": "echo", "args": {"text": "2"}}"#,
            r#"{"tool": "echo", "args": {"text": "3"}}"#,
            r#"{"tool": "echo", "args": {"text": "4"}}"#,
        ]));
        let agent = executor_with_echo(llm);
        let reply = agent.invoke(&[Message::user("loop")]).await.unwrap();
        assert!(reply.final_content().unwrap().contains("最大步数"));
    }
}
