//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `MAGPIE__*` 覆盖
//! （双下划线表示嵌套，如 `MAGPIE__LLM__PROVIDER=openai`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub tools: ToolsSection,
    #[serde(default)]
    pub observability: ObservabilitySection,
}

/// [app] 段：应用名、Agent 步数上限
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSection {
    pub name: Option<String>,
    /// 单次 Agent 调用内最大工具步数
    #[serde(default = "default_max_agent_steps")]
    pub max_agent_steps: usize,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: None,
            max_agent_steps: default_max_agent_steps(),
        }
    }
}

fn default_max_agent_steps() -> usize {
    8
}

/// [llm] 段：后端选择与端点
#[derive(Debug, Clone, Deserialize, Default)]
pub struct LlmSection {
    /// 后端：ollama / openai
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    pub base_url: Option<String>,
    #[serde(default)]
    pub ollama: LlmOllamaSection,
    #[serde(default)]
    pub openai: LlmOpenAiSection,
}

fn default_provider() -> String {
    "ollama".to_string()
}

fn default_model() -> String {
    "deepseek-v3.1:671b-cloud".to_string()
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LlmOllamaSection {
    pub model: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LlmOpenAiSection {
    pub model: Option<String>,
}

/// [tools] 段：高德与音乐平台工具配置
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ToolsSection {
    #[serde(default)]
    pub amap: AmapSection,
    #[serde(default)]
    pub music: MusicSection,
}

/// [tools.amap] 段：高德开放平台 Key 与请求参数
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AmapSection {
    /// 建议通过环境变量 AMAP_API_KEY 注入，此处仅作覆盖
    pub api_key: Option<String>,
    #[serde(default = "default_amap_timeout_secs")]
    pub timeout_secs: u64,
    /// POI 搜索返回的最大条数
    #[serde(default = "default_max_pois")]
    pub max_pois: usize,
}

fn default_amap_timeout_secs() -> u64 {
    10
}

fn default_max_pois() -> usize {
    5
}

/// [tools.music] 段：音乐平台选择
#[derive(Debug, Clone, Deserialize, Default)]
pub struct MusicSection {
    /// qq / netease；未知值回退为 qq
    #[serde(default = "default_music_platform")]
    pub platform: String,
}

fn default_music_platform() -> String {
    "qq".to_string()
}

/// [observability] 段：导出目录
#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilitySection {
    #[serde(default = "default_export_dir")]
    pub export_dir: PathBuf,
}

fn default_export_dir() -> PathBuf {
    PathBuf::from("logs")
}

impl Default for ObservabilitySection {
    fn default() -> Self {
        Self {
            export_dir: default_export_dir(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app: AppSection::default(),
            llm: LlmSection::default(),
            tools: ToolsSection::default(),
            observability: ObservabilitySection::default(),
        }
    }
}

/// 从 config 目录加载配置，环境变量 MAGPIE__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 MAGPIE__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("MAGPIE")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
