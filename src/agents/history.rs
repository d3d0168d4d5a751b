//! 任务历史与统计
//!
//! 有界内存账本：每次 execute_task（无论成败）追加一条记录，仅保留最近
//! MAX_HISTORY 条（先进先出）。统计信息由当前留存记录推导，历史为空时
//! 全部为零，不做除零。

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::agents::{AgentKind, TaskResult};

/// 历史记录保留上限
pub const MAX_HISTORY: usize = 100;

/// 单次任务的历史快照
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub task_id: String,
    pub timestamp: DateTime<Local>,
    pub user_input: String,
    pub agent: AgentKind,
    pub success: bool,
    pub execution_time_secs: f64,
    pub result: TaskResult,
}

/// 聚合统计
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub total_tasks: usize,
    pub success_rate: f64,
    pub avg_execution_time_secs: f64,
    pub agent_usage: HashMap<String, usize>,
}

impl Statistics {
    fn empty() -> Self {
        Self {
            total_tasks: 0,
            success_rate: 0.0,
            avg_execution_time_secs: 0.0,
            agent_usage: HashMap::new(),
        }
    }
}

/// 有界任务历史：追加与淘汰在同一把锁内完成
#[derive(Default)]
pub struct TaskHistory {
    records: Mutex<VecDeque<TaskRecord>>,
}

impl TaskHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一条记录；超出上限时丢弃最旧的
    pub fn record(&self, record: TaskRecord) {
        let mut records = self.records.lock().expect("task history lock");
        records.push_back(record);
        while records.len() > MAX_HISTORY {
            records.pop_front();
        }
    }

    /// 最近 limit 条记录，按插入顺序（最新在最后）
    pub fn recent(&self, limit: usize) -> Vec<TaskRecord> {
        let records = self.records.lock().expect("task history lock");
        let skip = records.len().saturating_sub(limit);
        records.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().expect("task history lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 基于当前留存记录的聚合统计；历史为空时全部为零
    pub fn statistics(&self) -> Statistics {
        let records = self.records.lock().expect("task history lock");
        if records.is_empty() {
            return Statistics::empty();
        }

        let total = records.len();
        let success_count = records.iter().filter(|r| r.success).count();
        let total_time: f64 = records.iter().map(|r| r.execution_time_secs).sum();

        let mut agent_usage: HashMap<String, usize> = HashMap::new();
        for record in records.iter() {
            *agent_usage.entry(record.agent.to_string()).or_insert(0) += 1;
        }

        Statistics {
            total_tasks: total,
            success_rate: success_count as f64 / total as f64,
            avg_execution_time_secs: total_time / total as f64,
            agent_usage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn record(i: usize, agent: AgentKind, success: bool) -> TaskRecord {
        TaskRecord {
            task_id: format!("task-{}", i),
            timestamp: Local::now(),
            user_input: format!("input-{}", i),
            agent,
            success,
            execution_time_secs: 0.5,
            result: TaskResult {
                success,
                agent,
                content: String::new(),
                metadata: Map::new(),
                error: if success { None } else { Some("boom".into()) },
            },
        }
    }

    #[test]
    fn empty_history_statistics_are_zero() {
        let history = TaskHistory::new();
        let stats = history.statistics();
        assert_eq!(stats.total_tasks, 0);
        assert_eq!(stats.success_rate, 0.0);
        assert_eq!(stats.avg_execution_time_secs, 0.0);
        assert!(stats.agent_usage.is_empty());
    }

    #[test]
    fn history_is_bounded_fifo() {
        let history = TaskHistory::new();
        for i in 0..MAX_HISTORY + 1 {
            history.record(record(i, AgentKind::General, true));
        }
        assert_eq!(history.len(), MAX_HISTORY);
        // 第 0 条被淘汰，留下 1..=100
        let recent = history.recent(MAX_HISTORY);
        assert_eq!(recent.first().unwrap().task_id, "task-1");
        assert_eq!(recent.last().unwrap().task_id, format!("task-{}", MAX_HISTORY));
    }

    #[test]
    fn recent_returns_tail_in_order() {
        let history = TaskHistory::new();
        for i in 0..10 {
            history.record(record(i, AgentKind::Map, true));
        }
        let recent = history.recent(3);
        let ids: Vec<&str> = recent.iter().map(|r| r.task_id.as_str()).collect();
        assert_eq!(ids, vec!["task-7", "task-8", "task-9"]);
    }

    #[test]
    fn success_rate_matches_generated_sequences() {
        // 线性同余发生器产生可复现的成败序列
        let mut seed: u64 = 0x5eed;
        for round in 0..20 {
            let history = TaskHistory::new();
            let total = 1 + (round * 7) % 90;
            let mut successes = 0usize;
            for i in 0..total {
                seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                let success = seed >> 33 & 1 == 0;
                successes += success as usize;
                history.record(record(i, AgentKind::General, success));
            }
            let stats = history.statistics();
            assert_eq!(stats.total_tasks, total);
            assert!((stats.success_rate - successes as f64 / total as f64).abs() < 1e-9);
        }
    }

    #[test]
    fn agent_usage_counts_by_kind() {
        let history = TaskHistory::new();
        history.record(record(0, AgentKind::Map, true));
        history.record(record(1, AgentKind::Map, false));
        history.record(record(2, AgentKind::Music, true));
        let stats = history.statistics();
        assert_eq!(stats.agent_usage.get("map"), Some(&2));
        assert_eq!(stats.agent_usage.get("music"), Some(&1));
    }
}
