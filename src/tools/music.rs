//! 音乐平台工具：Headless Chrome 搜索与播放（QQ 音乐 / 网易云音乐）
//!
//! 需启用 feature "browser" 且系统已安装 Chrome/Chromium。
//! music_search 打开平台搜索页并提取第一条结果的标题与定位链接；
//! music_play 打开定位链接并尝试点击播放按钮。浏览器实例跨调用复用。

use std::fmt;

/// 支持的音乐平台
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MusicPlatform {
    Qq,
    Netease,
}

impl MusicPlatform {
    /// 平台名解析；未知值回退为 QQ 音乐
    pub fn from_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "qq" => Self::Qq,
            "netease" => Self::Netease,
            other => {
                tracing::warn!("未知的音乐平台: {}，使用默认平台QQ音乐", other);
                Self::Qq
            }
        }
    }

    pub fn base_url(&self) -> &'static str {
        match self {
            Self::Qq => "https://y.qq.com/",
            Self::Netease => "https://music.163.com/",
        }
    }

    /// 平台搜索页 URL（query 已编码）
    pub fn search_url(&self, query: &str) -> String {
        let q = encode_query(query);
        match self {
            Self::Qq => format!("https://y.qq.com/n/ryqq/search?w={}&t=song", q),
            Self::Netease => format!("https://music.163.com/#/search/m/?s={}&type=1", q),
        }
    }
}

impl fmt::Display for MusicPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Qq => write!(f, "QQ音乐"),
            Self::Netease => write!(f, "网易云音乐"),
        }
    }
}

/// URL query 百分号编码（仅保留非保留字符）
fn encode_query(s: &str) -> String {
    let mut out = String::with_capacity(s.len() * 3);
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}

#[cfg(feature = "browser")]
pub use browser_tools::{MusicPlayTool, MusicSearchTool};

#[cfg(feature = "browser")]
mod browser_tools {
    use std::sync::{Arc, RwLock};

    use async_trait::async_trait;
    use headless_chrome::Browser;
    use serde_json::Value;

    use super::MusicPlatform;
    use crate::tools::Tool;

    /// 跨调用复用的浏览器句柄；首次使用时启动
    type SharedBrowser = Arc<RwLock<Option<Browser>>>;

    fn with_browser<T>(
        shared: &SharedBrowser,
        f: impl FnOnce(&Browser) -> Result<T, String>,
    ) -> Result<T, String> {
        let mut guard = shared.write().map_err(|e| e.to_string())?;
        if guard.is_none() {
            let browser = Browser::default().map_err(|e| format!("Chrome launch failed: {}", e))?;
            *guard = Some(browser);
        }
        f(guard.as_ref().unwrap())
    }

    /// 提取第一条搜索结果的 JS（标题与定位链接）
    fn first_hit_js(platform: MusicPlatform) -> &'static str {
        match platform {
            MusicPlatform::Qq => {
                r#"(function() {
                    const a = document.querySelector('a.songlist__songname_txt, a.songlist__item_title');
                    if (!a) return '';
                    return JSON.stringify({ title: a.textContent.trim(), locator: a.href });
                })()"#
            }
            MusicPlatform::Netease => {
                r#"(function() {
                    const frame = document.querySelector('iframe#g_iframe');
                    const doc = frame ? frame.contentDocument : document;
                    const a = doc.querySelector('div.srchsongst a[href*="/song?id="], a[href*="/song?id="]');
                    if (!a) return '';
                    return JSON.stringify({ title: a.textContent.trim(), locator: a.href });
                })()"#
            }
        }
    }

    /// 点击播放按钮的 JS；返回状态字符串
    fn click_play_js(platform: MusicPlatform) -> &'static str {
        match platform {
            MusicPlatform::Qq => {
                r#"(function() {
                    const btn = document.querySelector('a.mod_btn_green, i.mod_play_btn, a[class*="play"]');
                    if (!btn) return 'not_found';
                    btn.click();
                    return 'clicked';
                })()"#
            }
            MusicPlatform::Netease => {
                r#"(function() {
                    const frame = document.querySelector('iframe#g_iframe');
                    const doc = frame ? frame.contentDocument : document;
                    const btn = doc.querySelector('a[data-res-action="play"], a.u-btni-addply, a[class*="ply"]');
                    if (!btn) return 'not_found';
                    btn.click();
                    return 'clicked';
                })()"#
            }
        }
    }

    /// 音乐搜索工具：打开平台搜索页，返回第一条结果的标题与定位链接
    pub struct MusicSearchTool {
        platform: MusicPlatform,
        browser: SharedBrowser,
    }

    impl MusicSearchTool {
        pub fn new(platform: MusicPlatform, browser: SharedBrowser) -> Self {
            Self { platform, browser }
        }
    }

    #[async_trait]
    impl Tool for MusicSearchTool {
        fn name(&self) -> &str {
            "music_search"
        }

        fn description(&self) -> &str {
            "在音乐平台搜索歌曲，返回第一条结果的标题与定位链接。Args: {\"song_name\": \"晴天\"}"
        }

        async fn execute(&self, args: Value) -> Result<String, String> {
            let song_name = args
                .get("song_name")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .trim()
                .to_string();
            if song_name.is_empty() {
                return Err("Missing song_name".to_string());
            }

            let platform = self.platform;
            let url = platform.search_url(&song_name);
            let browser = Arc::clone(&self.browser);

            tracing::info!(platform = %platform, song = %song_name, "音乐搜索");

            tokio::task::spawn_blocking(move || {
                with_browser(&browser, |b| {
                    let tab = b.new_tab().map_err(|e| format!("Browser tab failed: {}", e))?;
                    tab.navigate_to(&url)
                        .map_err(|e| format!("Navigate failed: {}", e))?;
                    tab.wait_for_element("body")
                        .map_err(|e| format!("Page load failed: {}", e))?;

                    // 搜索结果由前端脚本渲染，留出渲染时间
                    std::thread::sleep(std::time::Duration::from_secs(3));

                    let result = tab
                        .evaluate(first_hit_js(platform), false)
                        .map_err(|e| format!("搜索失败: {}", e))?;
                    let hit = result
                        .value
                        .as_ref()
                        .and_then(|v| v.as_str())
                        .unwrap_or("")
                        .to_string();

                    if hit.is_empty() {
                        Ok("未找到歌曲".to_string())
                    } else {
                        Ok(hit)
                    }
                })
            })
            .await
            .map_err(|e| format!("Task join: {}", e))?
        }
    }

    /// 音乐播放工具：打开定位链接并点击播放按钮
    pub struct MusicPlayTool {
        platform: MusicPlatform,
        browser: SharedBrowser,
    }

    impl MusicPlayTool {
        pub fn new(platform: MusicPlatform, browser: SharedBrowser) -> Self {
            Self { platform, browser }
        }
    }

    #[async_trait]
    impl Tool for MusicPlayTool {
        fn name(&self) -> &str {
            "music_play"
        }

        fn description(&self) -> &str {
            "根据搜索返回的定位链接打开歌曲页面并尝试播放。Args: {\"locator\": \"https://...\"}"
        }

        async fn execute(&self, args: Value) -> Result<String, String> {
            let locator = args
                .get("locator")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .trim()
                .to_string();
            if locator.is_empty() {
                return Err("Missing locator".to_string());
            }

            let platform = self.platform;
            let browser = Arc::clone(&self.browser);

            tracing::info!(platform = %platform, locator = %locator, "音乐播放");

            tokio::task::spawn_blocking(move || {
                with_browser(&browser, |b| {
                    let tab = b.new_tab().map_err(|e| format!("Browser tab failed: {}", e))?;
                    tab.navigate_to(&locator)
                        .map_err(|e| format!("Navigate failed: {}", e))?;
                    tab.wait_for_element("body")
                        .map_err(|e| format!("Page load failed: {}", e))?;

                    std::thread::sleep(std::time::Duration::from_secs(3));

                    let result = tab
                        .evaluate(click_play_js(platform), false)
                        .map_err(|e| format!("播放失败: {}", e))?;
                    let status = result.value.as_ref().and_then(|v| v.as_str()).unwrap_or("");

                    match status {
                        "clicked" => Ok("已点击播放".to_string()),
                        _ => Ok("未找到播放按钮".to_string()),
                    }
                })
            })
            .await
            .map_err(|e| format!("Task join: {}", e))?
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_from_name_falls_back_to_qq() {
        assert_eq!(MusicPlatform::from_name("qq"), MusicPlatform::Qq);
        assert_eq!(MusicPlatform::from_name("NETEASE"), MusicPlatform::Netease);
        assert_eq!(MusicPlatform::from_name("spotify"), MusicPlatform::Qq);
    }

    #[test]
    fn search_url_encodes_query() {
        let url = MusicPlatform::Qq.search_url("青花瓷 周杰伦");
        assert!(url.starts_with("https://y.qq.com/"));
        assert!(!url.contains(' '));
        assert!(url.contains("%20") || url.contains("%E9"));
    }
}
