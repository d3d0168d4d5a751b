//! 高德地图工具：POI 搜索与路径规划
//!
//! 两个工具均调用高德开放平台 REST API，Key 来自配置或环境变量
//! AMAP_API_KEY；请求带超时，失败返回 Err（由上层转为任务失败），
//! 查询成功但无结果时返回说明文本（"未找到结果" / "未找到路径"）。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::config::AmapSection;
use crate::tools::Tool;

const POI_SEARCH_URL: &str = "https://restapi.amap.com/v3/place/text";
const DRIVING_ROUTE_URL: &str = "https://restapi.amap.com/v5/direction/driving";
const WALKING_ROUTE_URL: &str = "https://restapi.amap.com/v3/direction/walking";

/// 从配置与环境变量解析高德 Key（配置优先）
fn resolve_api_key(cfg: &AmapSection) -> Option<String> {
    cfg.api_key
        .clone()
        .filter(|k| !k.is_empty())
        .or_else(|| std::env::var("AMAP_API_KEY").ok().filter(|k| !k.is_empty()))
}

fn build_client(timeout_secs: u64) -> Client {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .unwrap_or_default()
}

async fn amap_get(client: &Client, url: &str, params: &[(&str, &str)]) -> Result<Value, String> {
    let resp = client
        .get(url)
        .query(params)
        .send()
        .await
        .map_err(|e| format!("请求失败: {}", e))?;
    if !resp.status().is_success() {
        return Err(format!("HTTP {}", resp.status()));
    }
    resp.json::<Value>()
        .await
        .map_err(|e| format!("响应解析失败: {}", e))
}

/// POI 搜索工具：关键词（可选城市）→ 名称 / 地址 / 经纬度列表
pub struct PoiSearchTool {
    client: Client,
    api_key: Option<String>,
    max_pois: usize,
}

impl PoiSearchTool {
    pub fn new(cfg: &AmapSection) -> Self {
        Self {
            client: build_client(cfg.timeout_secs),
            api_key: resolve_api_key(cfg),
            max_pois: cfg.max_pois,
        }
    }
}

#[async_trait]
impl Tool for PoiSearchTool {
    fn name(&self) -> &str {
        "amap_poi_search"
    }

    fn description(&self) -> &str {
        "根据关键词（可选城市）搜索POI，返回名称、地址与经纬度。Args: {\"keyword\": \"东方明珠\", \"city\": \"上海\"}"
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let keyword = args
            .get("keyword")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .trim();
        if keyword.is_empty() {
            return Err("Missing keyword".to_string());
        }
        let city = args.get("city").and_then(|v| v.as_str()).unwrap_or("");

        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| "未配置 AMAP_API_KEY".to_string())?;

        tracing::info!(keyword = %keyword, city = %city, "POI 搜索");

        let offset = self.max_pois.to_string();
        let mut params = vec![
            ("keywords", keyword),
            ("key", api_key),
            ("extensions", "base"),
            ("offset", offset.as_str()),
            ("page", "1"),
        ];
        if !city.is_empty() {
            params.push(("city", city));
        }

        let data = amap_get(&self.client, POI_SEARCH_URL, &params).await?;

        let pois = data
            .get("pois")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();
        if pois.is_empty() {
            tracing::warn!(keyword = %keyword, "未找到 POI");
            return Ok("未找到结果".to_string());
        }

        let simplified: Vec<Value> = pois
            .iter()
            .take(self.max_pois)
            .map(|p| {
                json!({
                    "name": p.get("name"),
                    "address": p.get("address"),
                    "location": p.get("location"), // 'lng,lat'
                    "type": p.get("type"),
                })
            })
            .collect();

        tracing::info!("找到 {} 个 POI", simplified.len());
        serde_json::to_string(&simplified).map_err(|e| e.to_string())
    }
}

/// 路径规划工具：起终点经纬度与出行方式 → 距离、耗时与导航要点
pub struct RoutePlannerTool {
    client: Client,
    api_key: Option<String>,
}

impl RoutePlannerTool {
    pub fn new(cfg: &AmapSection) -> Self {
        Self {
            client: build_client(cfg.timeout_secs),
            api_key: resolve_api_key(cfg),
        }
    }
}

#[async_trait]
impl Tool for RoutePlannerTool {
    fn name(&self) -> &str {
        "amap_route_planner"
    }

    fn description(&self) -> &str {
        "根据起终点经纬度规划路径，返回距离与预计耗时。Args: {\"origin\": \"lng,lat\", \"destination\": \"lng,lat\", \"mode\": \"driving|walking\"}"
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let origin = args
            .get("origin")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .trim();
        let destination = args
            .get("destination")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .trim();
        if origin.is_empty() || destination.is_empty() {
            return Err("Missing origin or destination".to_string());
        }

        let mut mode = args
            .get("mode")
            .and_then(|v| v.as_str())
            .unwrap_or("driving");
        // transit 需要更复杂参数，这里仅支持驾车与步行
        if mode != "driving" && mode != "walking" {
            tracing::warn!(mode = %mode, "不支持的模式，使用 driving");
            mode = "driving";
        }

        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| "未配置 AMAP_API_KEY".to_string())?;

        tracing::info!(origin = %origin, destination = %destination, mode = %mode, "路径规划");

        let url = if mode == "driving" {
            DRIVING_ROUTE_URL
        } else {
            WALKING_ROUTE_URL
        };
        let params = [
            ("key", api_key),
            ("origin", origin),
            ("destination", destination),
        ];

        let data = amap_get(&self.client, url, &params).await?;

        let paths = data
            .get("route")
            .and_then(|r| r.get("paths"))
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();
        if paths.is_empty() {
            tracing::warn!(origin = %origin, destination = %destination, "未找到路径");
            return Ok("未找到路径".to_string());
        }

        let path = &paths[0];
        let steps: Vec<Value> = path
            .get("steps")
            .and_then(|v| v.as_array())
            .map(|steps| {
                steps
                    .iter()
                    .filter_map(|s| s.get("instruction").cloned())
                    .take(10)
                    .collect()
            })
            .unwrap_or_default();

        let result = json!({
            "mode": mode,
            "distance_m": path.get("distance"),
            "duration_s": path.get("duration"),
            "steps": steps,
        });

        tracing::info!("找到路径");
        serde_json::to_string(&result).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyless_section() -> AmapSection {
        AmapSection {
            api_key: Some(String::new()),
            timeout_secs: 1,
            max_pois: 5,
        }
    }

    #[tokio::test]
    async fn poi_search_requires_keyword() {
        let tool = PoiSearchTool::new(&keyless_section());
        let err = tool.execute(json!({})).await.unwrap_err();
        assert!(err.contains("keyword"));
    }

    #[tokio::test]
    async fn poi_search_requires_api_key() {
        // 空串 Key 视为未配置（环境变量兜底同样为空时）
        let tool = PoiSearchTool {
            client: build_client(1),
            api_key: None,
            max_pois: 5,
        };
        let err = tool.execute(json!({"keyword": "外滩"})).await.unwrap_err();
        assert!(err.contains("AMAP_API_KEY"));
    }

    #[tokio::test]
    async fn route_planner_requires_endpoints() {
        let tool = RoutePlannerTool {
            client: build_client(1),
            api_key: None,
        };
        let err = tool
            .execute(json!({"origin": "116.39,39.9"}))
            .await
            .unwrap_err();
        assert!(err.contains("origin or destination"));
    }
}
