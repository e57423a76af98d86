//! # Config 模块
//!
//! CLI 配置管理。
//!
//! ## 配置优先级
//!
//! 1. 命令行参数（最高）
//! 2. 配置文件 (crispr.json)
//! 3. 默认值（最低）

use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// 默认配置文件名
pub const DEFAULT_CONFIG_FILE: &str = "crispr.json";

/// CLI 配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliConfig {
    /// 离线客户端报告的链 ID
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,

    /// 离线客户端报告的已连接账户
    #[serde(default = "default_account")]
    pub account: String,

    /// 日志级别（error/warn/info/debug/trace）
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_chain_id() -> u64 {
    1
}

fn default_account() -> String {
    "0x0000000000000000000000000000000000000000".to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            chain_id: default_chain_id(),
            account: default_account(),
            log_level: default_log_level(),
        }
    }
}

impl CliConfig {
    /// 加载配置文件
    ///
    /// 文件不存在时返回默认配置；存在但无法解析时报错。
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content =
            fs::read_to_string(path).with_context(|| format!("failed to read config {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("failed to parse config {}", path.display()))
    }

    /// 日志级别，无法识别时为 `warn`
    pub fn level(&self) -> tracing::Level {
        self.log_level.parse().unwrap_or(tracing::Level::WARN)
    }
}
