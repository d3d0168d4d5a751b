//! Magpie - Rust 任务路由智能体系统
//!
//! 模块划分：
//! - **agents**: 意图分类、子 Agent 执行器（map / music）与主路由 Supervisor
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **error**: 编排层错误类型
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Ollama / Mock）
//! - **observability**: 日志初始化与追踪 / 指标 / 事件存储、JSON 导出
//! - **tools**: 工具箱（高德 POI / 路径规划、音乐平台、echo）与注册表

pub mod agents;
pub mod config;
pub mod error;
pub mod llm;
pub mod observability;
pub mod tools;
