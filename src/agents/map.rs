//! 地图 Agent：POI 搜索与路径规划

use std::sync::Arc;

use crate::agents::executor::AgentExecutor;
use crate::config::AppConfig;
use crate::llm::LlmClient;
use crate::tools::{PoiSearchTool, RoutePlannerTool, ToolRegistry};

pub const MAP_SYSTEM_PROMPT: &str = "你是 AgentMap，一个专业的地图和行程规划助理。\n\n\
工作流程:\n\
1. 分析用户意图 (搜索POI还是规划路径)。\n\
2. 若需要地点经纬度，必须先调用 amap_poi_search。\n\
3. 获得经纬度后，如用户需要路径，调用 amap_route_planner。\n\
4. 最终基于工具返回数据与常识给出行程建议(里程/时长/附近推荐)。\n";

/// 创建地图 Agent
pub fn create_map_agent(llm: Arc<dyn LlmClient>, cfg: &AppConfig) -> AgentExecutor {
    tracing::info!("创建地图 Agent...");

    let mut tools = ToolRegistry::new();
    tools.register(PoiSearchTool::new(&cfg.tools.amap));
    tools.register(RoutePlannerTool::new(&cfg.tools.amap));
    tracing::info!("已加载 {} 个工具: {:?}", tools.len(), tools.tool_names());

    AgentExecutor::new(
        "map",
        llm,
        tools,
        MAP_SYSTEM_PROMPT,
        cfg.app.max_agent_steps,
    )
}
