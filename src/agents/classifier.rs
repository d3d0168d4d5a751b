//! 意图分类器
//!
//! 单次 LLM 调用把自由文本映射到封闭标签集 {map, music, general}；
//! 任何调用失败或无法识别的标签一律回退为 general（fail-open），
//! 绝不向调用方抛错，也不重试。

use std::sync::Arc;

use crate::agents::AgentKind;
use crate::llm::{LlmClient, Message};

/// 意图分类器：持有共享 LLM 客户端
pub struct IntentClassifier {
    llm: Arc<dyn LlmClient>,
}

impl IntentClassifier {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    fn classification_prompt(user_input: &str) -> String {
        format!(
            "你是一个任务分类助手。根据用户的输入，判断应该使用哪个专业Agent来处理。\n\n\
             可用的Agent类型：\n\
             - map: 地图相关任务，包括POI搜索、路径规划、地点查询、导航等\n\
             - music: 音乐相关任务，包括搜索歌曲、播放音乐、音乐平台操作等\n\
             - general: 其他一般性对话或无法分类的任务\n\n\
             用户输入: {}\n\n\
             请只返回Agent类型（map/music/general），不要返回其他内容。\n",
            user_input
        )
    }

    /// 分析用户意图，决定使用哪个 Agent；失败与未知标签均回退为 General
    pub async fn classify(&self, user_input: &str) -> AgentKind {
        tracing::info!("开始分析用户意图: {}", user_input);

        let prompt = Self::classification_prompt(user_input);
        match self.llm.complete(&[Message::user(prompt)]).await {
            Ok(reply) => {
                let label = reply.trim().to_lowercase();
                match AgentKind::from_label(&label) {
                    Some(kind) => {
                        tracing::info!("意图分析结果: {}", kind);
                        kind
                    }
                    None => {
                        tracing::warn!("LLM返回了未知的Agent类型: {}，默认使用general", label);
                        AgentKind::General
                    }
                }
            }
            Err(e) => {
                tracing::error!("意图分析失败: {}", e);
                AgentKind::General
            }
        }
    }
}
