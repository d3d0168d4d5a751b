//! 主路由 Supervisor：任务分析、分发与结果回收
//!
//! 接收用户输入，必要时调用意图分类器，按类型分发到子 Agent 或直接由
//! LLM 回答，把结果包装为标准化 TaskResult，并更新历史与可观测数据。
//! execute_task 是唯一错误边界：任何失败都转为 success=false 的结果，
//! 不向调用方抛错；成败两条路径都恰好留下一条历史记录与一对追踪 span。

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::agents::classifier::IntentClassifier;
use crate::agents::executor::AgentExecutor;
use crate::agents::history::{Statistics, TaskHistory, TaskRecord};
use crate::agents::{create_map_agent, create_music_agent};
use crate::config::AppConfig;
use crate::error::SupervisorError;
use crate::llm::{LlmClient, Message};
use crate::observability::Observability;

/// Agent 类型（封闭集合）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    Map,
    Music,
    General,
    /// 仅在分类完成前就失败的任务上出现，不可由文本解码得到
    Unknown,
}

impl AgentKind {
    /// 从文本解码，仅接受 map / music / general
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "map" => Some(Self::Map),
            "music" => Some(Self::Music),
            "general" => Some(Self::General),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Map => "map",
            Self::Music => "music",
            Self::General => "general",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AgentKind {
    type Err = SupervisorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_label(s).ok_or_else(|| SupervisorError::UnknownAgentKind(s.to_string()))
    }
}

/// 任务执行结果的标准化包装
///
/// 不变量：error 有值当且仅当 success 为 false。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    pub success: bool,
    pub agent: AgentKind,
    pub content: String,
    pub metadata: Map<String, Value>,
    pub error: Option<String>,
}

/// 主路由 Supervisor：持有共享 LLM、分类器、子 Agent 与历史账本
pub struct Supervisor {
    llm: Arc<dyn LlmClient>,
    classifier: IntentClassifier,
    executors: HashMap<AgentKind, AgentExecutor>,
    observability: Arc<Observability>,
    history: TaskHistory,
}

impl Supervisor {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        observability: Arc<Observability>,
        cfg: &AppConfig,
    ) -> Self {
        let mut executors = HashMap::new();
        executors.insert(AgentKind::Map, create_map_agent(llm.clone(), cfg));
        executors.insert(AgentKind::Music, create_music_agent(llm.clone(), cfg));
        tracing::info!("已加载 {} 个子Agent", executors.len());

        Self {
            classifier: IntentClassifier::new(llm.clone()),
            llm,
            executors,
            observability,
            history: TaskHistory::new(),
        }
    }

    /// 执行任务；agent 为 None 时自动分析意图
    pub async fn execute_task(&self, user_input: &str, agent: Option<AgentKind>) -> TaskResult {
        let start = Instant::now();
        let task_id = Uuid::new_v4().to_string()[..8].to_string();
        tracing::info!("[任务 {}] 用户输入: {}", task_id, user_input);

        let trace_id = self.observability.start_trace(
            &format!("execute_task.{}", task_id),
            json!({ "user_input": user_input }),
        );

        let (kind, outcome) = self.dispatch(user_input, agent, &task_id).await;
        let execution_time = start.elapsed().as_secs_f64();

        match outcome {
            Ok(content) => {
                let result = TaskResult {
                    success: true,
                    agent: kind,
                    content,
                    metadata: self.metadata(&task_id, execution_time, user_input, &trace_id),
                    error: None,
                };
                self.record_task(&task_id, user_input, kind, &result, execution_time);
                self.observability.end_trace(
                    &trace_id,
                    json!({ "success": true, "execution_time_secs": execution_time }),
                );
                self.observability
                    .record_metric(&format!("agent.{}.execution_time", kind), execution_time);
                self.observability
                    .record_metric(&format!("agent.{}.success", kind), 1.0);
                tracing::info!("[任务 {}] 执行成功，耗时: {:.2}秒", task_id, execution_time);
                result
            }
            Err(e) => {
                let message = e.to_string();
                tracing::error!("[任务 {}] 执行失败: {}", task_id, message);
                let result = TaskResult {
                    success: false,
                    agent: kind,
                    content: format!("任务执行失败: {}", message),
                    metadata: self.metadata(&task_id, execution_time, user_input, &trace_id),
                    error: Some(message.clone()),
                };
                self.record_task(&task_id, user_input, kind, &result, execution_time);
                self.observability
                    .end_trace(&trace_id, json!({ "success": false, "error": message }));
                self.observability
                    .record_metric(&format!("agent.{}.failure", kind), 1.0);
                result
            }
        }
    }

    /// 解析 Agent 类型并分发执行；返回已解析的类型与执行结果。
    /// 显式指定类型时完全跳过分类器。
    async fn dispatch(
        &self,
        user_input: &str,
        explicit: Option<AgentKind>,
        task_id: &str,
    ) -> (AgentKind, Result<String, SupervisorError>) {
        let kind = match explicit {
            Some(kind) => kind,
            None => {
                self.observability
                    .record_event("intent_analysis", json!({ "task_id": task_id }));
                self.classifier.classify(user_input).await
            }
        };
        self.observability.record_event(
            "agent_selection",
            json!({ "task_id": task_id, "agent": kind.as_str() }),
        );

        let outcome = match kind {
            AgentKind::General => {
                // 一般性对话，直接用 LLM 回复
                self.llm
                    .complete(&[Message::user(user_input)])
                    .await
                    .map_err(SupervisorError::from)
            }
            AgentKind::Map | AgentKind::Music => match self.executors.get(&kind) {
                Some(agent) => {
                    tracing::info!("[任务 {}] 调用 {} Agent", task_id, kind);
                    self.observability.record_event(
                        "agent_invocation",
                        json!({ "task_id": task_id, "agent": kind.as_str() }),
                    );
                    agent.invoke(&[Message::user(user_input)]).await.map(|reply| {
                        reply
                            .final_content()
                            .unwrap_or("(Agent未返回内容)")
                            .to_string()
                    })
                }
                None => Err(SupervisorError::UnknownAgentKind(kind.to_string())),
            },
            AgentKind::Unknown => Err(SupervisorError::UnknownAgentKind(kind.to_string())),
        };

        (kind, outcome)
    }

    fn metadata(
        &self,
        task_id: &str,
        execution_time: f64,
        user_input: &str,
        trace_id: &str,
    ) -> Map<String, Value> {
        let mut metadata = Map::new();
        metadata.insert("task_id".into(), json!(task_id));
        metadata.insert("execution_time_secs".into(), json!(execution_time));
        metadata.insert("user_input".into(), json!(user_input));
        metadata.insert("trace_id".into(), json!(trace_id));
        metadata
    }

    fn record_task(
        &self,
        task_id: &str,
        user_input: &str,
        kind: AgentKind,
        result: &TaskResult,
        execution_time: f64,
    ) {
        self.history.record(TaskRecord {
            task_id: task_id.to_string(),
            timestamp: Local::now(),
            user_input: user_input.to_string(),
            agent: kind,
            success: result.success,
            execution_time_secs: execution_time,
            result: result.clone(),
        });
    }

    /// 最近 limit 条任务记录（最新在最后）
    pub fn task_history(&self, limit: usize) -> Vec<TaskRecord> {
        self.history.recent(limit)
    }

    /// 聚合统计；历史为空时全部为零
    pub fn statistics(&self) -> Statistics {
        self.history.statistics()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_label_accepts_closed_set_only() {
        assert_eq!(AgentKind::from_label("map"), Some(AgentKind::Map));
        assert_eq!(AgentKind::from_label("music"), Some(AgentKind::Music));
        assert_eq!(AgentKind::from_label("general"), Some(AgentKind::General));
        assert_eq!(AgentKind::from_label("unknown"), None);
        assert_eq!(AgentKind::from_label("Map"), None);
        assert_eq!(AgentKind::from_label(""), None);
    }

    #[test]
    fn from_str_rejects_invalid_label() {
        let err = "weather".parse::<AgentKind>().unwrap_err();
        assert!(err.to_string().contains("weather"));
    }

    #[test]
    fn display_matches_labels() {
        assert_eq!(AgentKind::Map.to_string(), "map");
        assert_eq!(AgentKind::Unknown.to_string(), "unknown");
    }
}
