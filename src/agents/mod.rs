//! Agent 层：意图分类、子 Agent 执行器与主路由 Supervisor

pub mod classifier;
pub mod executor;
pub mod history;
pub mod map;
pub mod music;
pub mod supervisor;

pub use classifier::IntentClassifier;
pub use executor::{parse_agent_output, AgentExecutor, AgentOutput, AgentReply, ToolCall};
pub use history::{Statistics, TaskHistory, TaskRecord, MAX_HISTORY};
pub use map::create_map_agent;
pub use music::create_music_agent;
pub use supervisor::{AgentKind, Supervisor, TaskResult};
