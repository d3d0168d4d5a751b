//! 工具注册表
//!
//! 所有工具实现 Tool trait（name / description / execute），由 ToolRegistry
//! 按名注册与查找；Agent 执行器在调用处统一转 SupervisorError。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

/// 工具 trait：名称、描述（供 LLM 理解）、异步执行（args 为 JSON）
#[async_trait]
pub trait Tool: Send + Sync {
    /// 工具名称（用于 JSON 中的 "tool" 字段）
    fn name(&self) -> &str;

    /// 工具描述（供 LLM 理解功能与参数格式）
    fn description(&self) -> &str;

    /// 执行工具
    async fn execute(&self, args: Value) -> Result<String, String>;
}

/// 工具注册表：按名称存储 Arc<dyn Tool>，支持 register / get / execute / tool_names
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: impl Tool + 'static) {
        let name = tool.name().to_string();
        self.tools.insert(name, Arc::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub async fn execute(&self, name: &str, args: Value) -> Result<String, String> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| format!("Unknown tool: {name}"))?;
        tool.execute(args).await
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// 渲染「可用工具」段落（name: description 列表），拼入 system prompt
    pub fn prompt_section(&self) -> String {
        let mut names: Vec<&String> = self.tools.keys().collect();
        names.sort();
        names
            .iter()
            .map(|name| format!("- {}: {}", name, self.tools[*name].description()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::EchoTool;

    #[tokio::test]
    async fn registry_executes_registered_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);

        let out = registry
            .execute("echo", serde_json::json!({"text": "hi"}))
            .await
            .expect("echo execute");
        assert_eq!(out, "hi");
    }

    #[tokio::test]
    async fn registry_rejects_unknown_tool() {
        let registry = ToolRegistry::new();
        let err = registry.execute("nope", Value::Null).await.unwrap_err();
        assert!(err.contains("Unknown tool"));
    }

    #[test]
    fn prompt_section_lists_tools() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);
        let section = registry.prompt_section();
        assert!(section.contains("- echo:"));
    }
}
