//! 可观测性：日志初始化与追踪 / 指标 / 事件存储
//!
//! Observability 是显式构造、显式传递的共享实例（main 与测试各自持有一份），
//! 而非进程级全局。三组缓冲均为有界先进先出，追加与淘汰在同一把锁内完成；
//! 数据只驻留内存，按需一次性导出为 JSON 文件。
//!
//! 注意：span 上限是跨 trace 的全局值，高流量下尚未结束的 trace 的早期
//! span 也可能被淘汰；导出仅用于诊断，不承诺因果完整性。

use std::collections::{HashMap, VecDeque};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;

/// 追踪 span 保留上限（跨 trace 全局）
pub const MAX_TRACES: usize = 1000;
/// 事件保留上限
pub const MAX_EVENTS: usize = 1000;
/// 每个指标序列的采样点上限
pub const MAX_METRIC_SAMPLES: usize = 1000;

/// 日志：默认 info，可通过 RUST_LOG 覆盖
pub fn init() {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .with(fmt::layer())
        .init();
}

/// 单条追踪 span；同一 trace 的 span 仅靠 trace_id 关联，无父子结构
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceSpan {
    pub trace_id: String,
    pub span_name: String,
    pub timestamp: DateTime<Local>,
    pub metadata: Value,
}

/// 单条事件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub event_type: String,
    pub timestamp: DateTime<Local>,
    pub data: Value,
}

/// 单个指标序列的摘要
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

/// 存储现状摘要
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityStatistics {
    pub total_traces: usize,
    pub total_events: usize,
    pub metrics_count: usize,
    pub metric_summary: HashMap<String, MetricSummary>,
}

#[derive(Default)]
struct Buffers {
    traces: VecDeque<TraceSpan>,
    metrics: HashMap<String, VecDeque<f64>>,
    events: VecDeque<Event>,
}

impl Buffers {
    fn statistics(&self) -> ObservabilityStatistics {
        let mut metric_summary = HashMap::new();
        for (name, values) in &self.metrics {
            if values.is_empty() {
                continue;
            }
            let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let sum: f64 = values.iter().sum();
            metric_summary.insert(
                name.clone(),
                MetricSummary {
                    count: values.len(),
                    min,
                    max,
                    avg: sum / values.len() as f64,
                },
            );
        }

        ObservabilityStatistics {
            total_traces: self.traces.len(),
            total_events: self.events.len(),
            metrics_count: self.metrics.len(),
            metric_summary,
        }
    }
}

/// 追踪 / 指标 / 事件存储，进程内共享一个实例
#[derive(Default)]
pub struct Observability {
    buffers: Mutex<Buffers>,
}

impl Observability {
    pub fn new() -> Self {
        Self::default()
    }

    /// 开始一个新的追踪，返回 trace_id；记录 `<span_name>.start` span
    pub fn start_trace(&self, span_name: &str, metadata: Value) -> String {
        let trace_id = Uuid::new_v4().to_string()[..8].to_string();
        self.push_span(TraceSpan {
            trace_id: trace_id.clone(),
            span_name: format!("{}.start", span_name),
            timestamp: Local::now(),
            metadata,
        });
        trace_id
    }

    /// 记录中间 span
    pub fn trace(&self, trace_id: &str, span_name: &str, metadata: Value) {
        self.push_span(TraceSpan {
            trace_id: trace_id.to_string(),
            span_name: span_name.to_string(),
            timestamp: Local::now(),
            metadata,
        });
    }

    /// 结束追踪；记录 `end` span
    pub fn end_trace(&self, trace_id: &str, metadata: Value) {
        self.push_span(TraceSpan {
            trace_id: trace_id.to_string(),
            span_name: "end".to_string(),
            timestamp: Local::now(),
            metadata,
        });
    }

    fn push_span(&self, span: TraceSpan) {
        let mut buffers = self.buffers.lock().expect("observability lock");
        buffers.traces.push_back(span);
        while buffers.traces.len() > MAX_TRACES {
            buffers.traces.pop_front();
        }
    }

    /// 记录指标采样点；每个序列独立限长
    pub fn record_metric(&self, name: &str, value: f64) {
        let mut buffers = self.buffers.lock().expect("observability lock");
        let series = buffers.metrics.entry(name.to_string()).or_default();
        series.push_back(value);
        while series.len() > MAX_METRIC_SAMPLES {
            series.pop_front();
        }
    }

    /// 记录事件
    pub fn record_event(&self, event_type: &str, data: Value) {
        tracing::info!("事件记录: {} - {}", event_type, data);
        let mut buffers = self.buffers.lock().expect("observability lock");
        buffers.events.push_back(Event {
            event_type: event_type.to_string(),
            timestamp: Local::now(),
            data,
        });
        while buffers.events.len() > MAX_EVENTS {
            buffers.events.pop_front();
        }
    }

    /// 获取追踪记录（可按 trace_id 过滤），最新在最后
    pub fn traces(&self, trace_id: Option<&str>, limit: usize) -> Vec<TraceSpan> {
        let buffers = self.buffers.lock().expect("observability lock");
        let filtered: Vec<TraceSpan> = buffers
            .traces
            .iter()
            .filter(|t| trace_id.map_or(true, |id| t.trace_id == id))
            .cloned()
            .collect();
        let skip = filtered.len().saturating_sub(limit);
        filtered.into_iter().skip(skip).collect()
    }

    /// 获取指标数据；指定名称时总是返回该名称的条目（可能为空序列）
    pub fn metrics(&self, name: Option<&str>) -> HashMap<String, Vec<f64>> {
        let buffers = self.buffers.lock().expect("observability lock");
        match name {
            Some(n) => {
                let values = buffers
                    .metrics
                    .get(n)
                    .map(|v| v.iter().cloned().collect())
                    .unwrap_or_default();
                HashMap::from([(n.to_string(), values)])
            }
            None => buffers
                .metrics
                .iter()
                .map(|(k, v)| (k.clone(), v.iter().cloned().collect()))
                .collect(),
        }
    }

    /// 获取事件记录（可按类型过滤），最新在最后
    pub fn events(&self, event_type: Option<&str>, limit: usize) -> Vec<Event> {
        let buffers = self.buffers.lock().expect("observability lock");
        let filtered: Vec<Event> = buffers
            .events
            .iter()
            .filter(|e| event_type.map_or(true, |t| e.event_type == t))
            .cloned()
            .collect();
        let skip = filtered.len().saturating_sub(limit);
        filtered.into_iter().skip(skip).collect()
    }

    /// 存储现状摘要（总量与每个指标的 count/min/max/avg）
    pub fn statistics(&self) -> ObservabilityStatistics {
        self.buffers.lock().expect("observability lock").statistics()
    }

    /// 导出全部可观测数据到 JSON 文件；文件名缺省为带时间戳的
    /// observability_YYYYMMDD_HHMMSS.json
    pub fn export_to_file(&self, dir: &Path, filename: Option<&str>) -> io::Result<PathBuf> {
        let filename = filename.map(String::from).unwrap_or_else(|| {
            format!("observability_{}.json", Local::now().format("%Y%m%d_%H%M%S"))
        });
        fs::create_dir_all(dir)?;
        let path = dir.join(filename);

        let payload = {
            let buffers = self.buffers.lock().expect("observability lock");
            json!({
                "exported_at": Local::now(),
                "traces": buffers.traces,
                "events": buffers.events,
                "metrics": buffers.metrics,
                "statistics": buffers.statistics(),
            })
        };

        let file = fs::File::create(&path)?;
        serde_json::to_writer_pretty(file, &payload)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

        tracing::info!("可观测数据已导出到: {}", path.display());
        Ok(path)
    }
}
