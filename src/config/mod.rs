//! 配置管理模块
//!
//! 使用 TOML 文件存储配置，遵循 XDG 规范：
//! - Linux: ~/.config/dipole/Dipole/config.toml
//! - macOS: ~/Library/Application Support/com.dipole.Dipole/config.toml
//! - Windows: %APPDATA%\dipole\Dipole\config.toml

use anyhow::{anyhow, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

pub use crate::ai::vlm::VlmConfig;

/// API 密钥环境变量，优先于配置文件
pub const API_KEY_ENV: &str = "DIPOLE_API_KEY";

/// 应用配置（顶层结构）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// VLM 视觉模型配置
    #[serde(default)]
    pub vlm: VlmConfig,
}

impl AppConfig {
    /// 获取配置目录路径
    pub fn config_dir() -> Result<PathBuf> {
        if let Some(proj_dirs) = ProjectDirs::from("com", "dipole", "Dipole") {
            Ok(proj_dirs.config_dir().to_path_buf())
        } else {
            // 回退到 ~/.dipole
            let home = dirs::home_dir().ok_or_else(|| anyhow!("Cannot find home directory"))?;
            Ok(home.join(".dipole"))
        }
    }

    /// 获取配置文件完整路径
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// 从文件加载配置
    ///
    /// 如果文件不存在，返回默认配置并创建文件
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        debug!("Loading config from: {}", path.display());

        if path.exists() {
            let content = fs::read_to_string(&path)?;
            let config: Self = toml::from_str(&content)?;
            info!("Config loaded from: {}", path.display());
            Ok(config)
        } else {
            info!("Config file not found, creating default at: {}", path.display());
            let config = Self::default();
            config.save()?;
            Ok(config)
        }
    }

    /// 保存配置到文件
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        let dir = path.parent().ok_or_else(|| anyhow!("Invalid config path"))?;

        // 确保目录存在
        if !dir.exists() {
            fs::create_dir_all(dir)?;
            debug!("Created config directory: {}", dir.display());
        }

        // 序列化为 TOML
        let content = toml::to_string_pretty(self)?;

        // 写入文件
        fs::write(&path, &content)?;

        // 设置文件权限 (Unix only) - 仅用户可读写
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(&path)?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&path, perms)?;
        }

        info!("Config saved to: {}", path.display());
        Ok(())
    }

    /// 解析远端 API 密钥
    ///
    /// 环境变量优先，其次配置文件。两处都没有视为启动失败，
    /// 调用方应在任何交互开始前终止进程。
    pub fn resolve_api_key(&self) -> Result<String> {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                return Ok(key);
            }
        }

        if let Some(ref key) = self.vlm.api_key {
            if !key.trim().is_empty() {
                return Ok(key.clone());
            }
        }

        Err(anyhow!(
            "API key is not set: export {} or set [vlm].api_key in the config file",
            API_KEY_ENV
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.vlm.model, "qwen3-vl:4b");
        assert!(config.vlm.api_key.is_none());
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[vlm]"));

        // 反序列化回来
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.vlm.endpoint, config.vlm.endpoint);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: AppConfig = toml::from_str(
            r#"
            [vlm]
            endpoint = "https://api.openai.com/v1"
            model = "gpt-4o"
            "#,
        )
        .unwrap();

        assert_eq!(parsed.vlm.model, "gpt-4o");
        assert_eq!(parsed.vlm.max_tokens, 512);
    }

    #[test]
    fn test_resolve_api_key() {
        std::env::remove_var(API_KEY_ENV);

        let mut config = AppConfig::default();
        assert!(config.resolve_api_key().is_err());

        config.vlm.api_key = Some("file-key".to_string());
        assert_eq!(config.resolve_api_key().unwrap(), "file-key");

        std::env::set_var(API_KEY_ENV, "env-key");
        assert_eq!(config.resolve_api_key().unwrap(), "env-key");
        std::env::remove_var(API_KEY_ENV);
    }
}
