//! Supervisor 集成测试：路由、失败路径、历史与统计、可观测数据

use std::sync::Arc;

use magpie::agents::{AgentKind, Supervisor, MAX_HISTORY};
use magpie::config::AppConfig;
use magpie::llm::{LlmClient, MockLlmClient, ScriptedLlmClient};
use magpie::observability::Observability;

fn supervisor_with(llm: Arc<dyn LlmClient>) -> (Supervisor, Arc<Observability>) {
    let obs = Arc::new(Observability::new());
    let supervisor = Supervisor::new(llm, obs.clone(), &AppConfig::default());
    (supervisor, obs)
}

#[tokio::test]
async fn explicit_general_bypasses_classifier() {
    let llm = Arc::new(ScriptedLlmClient::new(vec!["你好！"]));
    let (supervisor, _obs) = supervisor_with(llm.clone());

    let result = supervisor
        .execute_task("hello", Some(AgentKind::General))
        .await;

    assert!(result.success);
    assert_eq!(result.agent, AgentKind::General);
    assert_eq!(result.content, "你好！");
    assert!(result.error.is_none());
    // 仅一次 LLM 调用：直接回答，无分类调用
    assert_eq!(llm.call_count(), 1);
}

#[tokio::test]
async fn auto_classification_routes_to_general() {
    let llm = Arc::new(ScriptedLlmClient::new(vec!["general", "直接回答"]));
    let (supervisor, _obs) = supervisor_with(llm.clone());

    let result = supervisor.execute_task("hello", None).await;

    assert!(result.success);
    assert_eq!(result.agent, AgentKind::General);
    assert_eq!(result.content, "直接回答");
    // 分类 + 回答各一次
    assert_eq!(llm.call_count(), 2);
}

#[tokio::test]
async fn garbage_classification_falls_back_to_general() {
    let llm = Arc::new(ScriptedLlmClient::new(vec!["我建议用地图", "好的"]));
    let (supervisor, _obs) = supervisor_with(llm);

    let result = supervisor.execute_task("随便聊聊", None).await;

    assert!(result.success);
    assert_eq!(result.agent, AgentKind::General);
}

#[tokio::test]
async fn explicit_map_returns_agent_answer() {
    // map Agent 的 LLM 直接给出最终回复（不触发工具调用）
    let llm = Arc::new(ScriptedLlmClient::new(vec!["found POI X"]));
    let (supervisor, _obs) = supervisor_with(llm);

    let result = supervisor
        .execute_task("查询北京天安门", Some(AgentKind::Map))
        .await;

    assert!(result.success);
    assert_eq!(result.agent, AgentKind::Map);
    assert_eq!(result.content, "found POI X");
    for key in ["task_id", "execution_time_secs", "user_input", "trace_id"] {
        assert!(result.metadata.contains_key(key), "missing metadata {}", key);
    }
    assert_eq!(result.metadata["user_input"], "查询北京天安门");
}

#[tokio::test]
async fn executor_failure_yields_failed_result() {
    // 空脚本：Agent 内部 LLM 调用必然失败
    let llm = Arc::new(ScriptedLlmClient::new(vec![]));
    let (supervisor, obs) = supervisor_with(llm);

    let result = supervisor
        .execute_task("查询北京天安门", Some(AgentKind::Map))
        .await;

    assert!(!result.success);
    assert!(result.content.starts_with("任务执行失败: "));
    let error = result.error.as_deref().expect("error set on failure");
    assert!(result.content.ends_with(error));
    assert_eq!(result.agent, AgentKind::Map);

    // 失败同样入账：一条失败历史 + 失败计数指标
    let history = supervisor.task_history(10);
    assert_eq!(history.len(), 1);
    assert!(!history[0].success);
    let metrics = obs.metrics(Some("agent.map.failure"));
    assert_eq!(metrics["agent.map.failure"].len(), 1);
}

#[tokio::test]
async fn unknown_explicit_kind_is_failed_result() {
    let llm = Arc::new(MockLlmClient);
    let (supervisor, _obs) = supervisor_with(llm);

    let result = supervisor.execute_task("hello", Some(AgentKind::Unknown)).await;

    assert!(!result.success);
    assert_eq!(result.agent, AgentKind::Unknown);
    assert!(result
        .error
        .as_deref()
        .unwrap()
        .contains("Unknown agent kind"));
}

#[tokio::test]
async fn every_task_leaves_one_record_and_trace_pair() {
    let llm = Arc::new(MockLlmClient);
    let (supervisor, obs) = supervisor_with(llm);

    let ok = supervisor.execute_task("hi", Some(AgentKind::General)).await;
    let failed = supervisor
        .execute_task("hi", Some(AgentKind::Unknown))
        .await;
    assert!(ok.success && !failed.success);

    assert_eq!(supervisor.task_history(10).len(), 2);

    // 每个任务恰好一对 start / end span
    for result in [&ok, &failed] {
        let trace_id = result.metadata["trace_id"].as_str().unwrap();
        let spans = obs.traces(Some(trace_id), 100);
        assert_eq!(spans.len(), 2);
        assert!(spans[0].span_name.ends_with(".start"));
        assert_eq!(spans[1].span_name, "end");
    }

    // 成败均记录 agent_selection 事件
    assert_eq!(obs.events(Some("agent_selection"), 100).len(), 2);
}

#[tokio::test]
async fn success_iff_error_absent_over_mixed_batch() {
    let llm = Arc::new(MockLlmClient);
    let (supervisor, _obs) = supervisor_with(llm);

    let kinds = [
        Some(AgentKind::General),
        Some(AgentKind::Unknown),
        None,
        Some(AgentKind::General),
        Some(AgentKind::Unknown),
    ];
    for kind in kinds {
        let result = supervisor.execute_task("输入", kind).await;
        assert_eq!(result.success, result.error.is_none());
    }
}

#[tokio::test]
async fn history_is_ring_of_most_recent_100() {
    let llm = Arc::new(MockLlmClient);
    let (supervisor, _obs) = supervisor_with(llm);

    for i in 0..MAX_HISTORY + 1 {
        supervisor
            .execute_task(&format!("task-{}", i), Some(AgentKind::General))
            .await;
    }

    let history = supervisor.task_history(MAX_HISTORY + 10);
    assert_eq!(history.len(), MAX_HISTORY);
    assert_eq!(history.first().unwrap().user_input, "task-1");
    assert_eq!(
        history.last().unwrap().user_input,
        format!("task-{}", MAX_HISTORY)
    );
}

#[tokio::test]
async fn statistics_reflect_successes_and_failures() {
    let llm = Arc::new(MockLlmClient);
    let (supervisor, _obs) = supervisor_with(llm);

    for _ in 0..3 {
        supervisor.execute_task("ok", Some(AgentKind::General)).await;
    }
    for _ in 0..2 {
        supervisor
            .execute_task("bad", Some(AgentKind::Unknown))
            .await;
    }

    let stats = supervisor.statistics();
    assert_eq!(stats.total_tasks, 5);
    assert!((stats.success_rate - 0.6).abs() < 1e-9);
    assert_eq!(stats.agent_usage.get("general"), Some(&3));
    assert_eq!(stats.agent_usage.get("unknown"), Some(&2));
    assert!(stats.avg_execution_time_secs >= 0.0);
}

#[tokio::test]
async fn empty_statistics_are_zero() {
    let llm = Arc::new(MockLlmClient);
    let (supervisor, _obs) = supervisor_with(llm);

    let stats = supervisor.statistics();
    assert_eq!(stats.total_tasks, 0);
    assert_eq!(stats.success_rate, 0.0);
    assert_eq!(stats.avg_execution_time_secs, 0.0);
    assert!(stats.agent_usage.is_empty());
}

#[tokio::test]
async fn task_ids_are_unique_per_attempt() {
    let llm = Arc::new(MockLlmClient);
    let (supervisor, _obs) = supervisor_with(llm);

    for _ in 0..20 {
        supervisor.execute_task("同样的输入", Some(AgentKind::General)).await;
    }

    let history = supervisor.task_history(20);
    let mut ids: Vec<&str> = history.iter().map(|r| r.task_id.as_str()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 20);
}
