//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `CODEGUARD__*` 覆盖
//! （双下划线表示嵌套，如 `CODEGUARD__SERVER__BASE_URL=https://...`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub ui: UiSection,
    #[serde(default)]
    pub archive: ArchiveSection,
}

/// [app] 段：应用名与编辑器初始示例代码
#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
    pub name: Option<String>,
    /// 启动时填入编辑器的示例片段，设为空字符串可关闭
    #[serde(default = "default_seed_snippet")]
    pub seed_snippet: String,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: None,
            seed_snippet: default_seed_snippet(),
        }
    }
}

fn default_seed_snippet() -> String {
    "def example_vulnerability():\n    # Hardcoded credentials\n    secret_key = \"AI_CORE_7782\"\n    return secret_key".to_string()
}

/// [server] 段：服务地址、请求超时、探测周期
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    /// 审计服务基地址；本地开发默认回环地址，部署时用环境变量覆盖。
    /// 设为 "mock" 时使用内置 Mock 后端（无需服务即可跑通界面）。
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// 单次 HTTP 请求超时（秒）
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// 连通性探测周期（秒）
    #[serde(default = "default_probe_interval")]
    pub probe_interval_secs: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
            probe_interval_secs: default_probe_interval(),
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_request_timeout() -> u64 {
    60
}

fn default_probe_interval() -> u64 {
    15
}

/// [ui] 段：报告逐字显示的步进间隔
#[derive(Debug, Clone, Deserialize)]
pub struct UiSection {
    /// 每个滴答揭示一个字符（毫秒）
    #[serde(default = "default_reveal_tick")]
    pub reveal_tick_ms: u64,
}

impl Default for UiSection {
    fn default() -> Self {
        Self {
            reveal_tick_ms: default_reveal_tick(),
        }
    }
}

fn default_reveal_tick() -> u64 {
    5
}

/// [archive] 段：归档显示约定
#[derive(Debug, Clone, Deserialize)]
pub struct ArchiveSection {
    /// 远端列表是否按最新在前返回；决定记录编号方向（倒数 / 顺数）。
    /// 远端顺序本身从不改动。
    #[serde(default = "default_newest_first")]
    pub newest_first: bool,
}

impl Default for ArchiveSection {
    fn default() -> Self {
        Self {
            newest_first: default_newest_first(),
        }
    }
}

fn default_newest_first() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app: AppSection::default(),
            server: ServerSection::default(),
            ui: UiSection::default(),
            archive: ArchiveSection::default(),
        }
    }
}

/// 从 config 目录加载配置，环境变量 CODEGUARD__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 CODEGUARD__*（双下划线表示嵌套键）
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
        config::Environment::with_prefix("CODEGUARD")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.server.base_url, "http://127.0.0.1:8000");
        assert_eq!(cfg.server.probe_interval_secs, 15);
        assert_eq!(cfg.ui.reveal_tick_ms, 5);
        assert!(cfg.archive.newest_first);
        assert!(cfg.app.seed_snippet.contains("example_vulnerability"));
    }
}
