//! Mock LLM 客户端（用于测试，无需 API）
//!
//! MockLlmClient 回显最后一条 User 消息；ScriptedLlmClient 按脚本依次
//! 返回固定回复并计数调用次数，脚本耗尽后返回错误（可模拟 LLM 故障）。

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{LlmClient, LlmError, Message, Role};

/// Mock 客户端：回显用户最后一条消息
#[derive(Debug, Default)]
pub struct MockLlmClient;

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        let last_user = messages
            .iter()
            .rev()
            .find(|m| matches!(m.role, Role::User))
            .map(|m| m.content.as_str())
            .unwrap_or("(no input)");

        Ok(format!("Echo from Mock: {}", last_user))
    }
}

/// 脚本化客户端：按序弹出预设回复，耗尽后返回 ApiError
///
/// 用于测试路由与失败路径：空脚本即「总是失败」的 LLM。
pub struct ScriptedLlmClient {
    replies: Mutex<VecDeque<String>>,
    calls: AtomicUsize,
}

impl ScriptedLlmClient {
    pub fn new(replies: Vec<&str>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(String::from).collect()),
            calls: AtomicUsize::new(0),
        }
    }

    /// 已发生的 complete 调用次数（含脚本耗尽后的失败调用）
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn complete(&self, _messages: &[Message]) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.replies
            .lock()
            .expect("scripted replies lock")
            .pop_front()
            .ok_or_else(|| LlmError::ApiError("scripted replies exhausted".to_string()))
    }
}
