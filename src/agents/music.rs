//! 音乐 Agent：音乐搜索与播放控制（QQ 音乐 / 网易云音乐）
//!
//! 播放工具通过 Headless Chrome 驱动网页端，需启用 feature "browser"；
//! 未启用时工具集为空，Agent 退化为仅靠 LLM 回答。

use std::sync::Arc;

use crate::agents::executor::AgentExecutor;
use crate::config::AppConfig;
use crate::llm::LlmClient;
use crate::tools::{MusicPlatform, ToolRegistry};

/// 创建音乐 Agent；平台由配置决定（qq / netease，未知值回退 qq）
pub fn create_music_agent(llm: Arc<dyn LlmClient>, cfg: &AppConfig) -> AgentExecutor {
    tracing::info!("创建音乐 Agent...");

    let platform = MusicPlatform::from_name(&cfg.tools.music.platform);
    tracing::info!("已配置音乐平台: {}", platform);

    let system_prompt = format!(
        "你是 AgentMusic，一个专业的音乐播放助理。\n\n\
         当前音乐平台: {} ({})\n\n\
         流程:\n\
         1. 理解用户给出的歌曲/歌手名。\n\
         2. 先调用 music_search 搜索歌曲，获取定位链接。\n\
         3. 再调用 music_play 播放。\n\
         4. 回复用户播放状态。\n",
        platform,
        platform.base_url()
    );

    #[allow(unused_mut)]
    let mut tools = ToolRegistry::new();

    #[cfg(feature = "browser")]
    {
        use std::sync::RwLock;

        use crate::tools::{MusicPlayTool, MusicSearchTool};

        // 搜索与播放共享同一个浏览器实例
        let browser = Arc::new(RwLock::new(None));
        tools.register(MusicSearchTool::new(platform, browser.clone()));
        tools.register(MusicPlayTool::new(platform, browser));
    }

    tracing::info!("已加载 {} 个工具: {:?}", tools.len(), tools.tool_names());

    AgentExecutor::new(
        "music",
        llm,
        tools,
        system_prompt,
        cfg.app.max_agent_steps,
    )
}
