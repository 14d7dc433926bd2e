//! # 配置管理器
//!
//! 加载 TOML 配置文件、应用 `AI_ADMIN_*` 环境变量覆盖，并在启动时安装加密密钥

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::{AppConfig, ConfigCrypto, crypto::ENCRYPTION_KEY_ENV};
use crate::error::{AdminError, Result};
use crate::linfo;
use crate::logging::{LogComponent, LogStage};

/// 指定配置文件路径的环境变量
pub const CONFIG_PATH_ENV: &str = "AI_ADMIN_CONFIG_PATH";
const ENV_PREFIX: &str = "AI_ADMIN_";

/// 配置管理器
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: AppConfig,
    source: Option<PathBuf>,
}

impl ConfigManager {
    /// 按约定位置加载配置
    ///
    /// `AI_ADMIN_CONFIG_PATH` 指定的文件必须存在；否则读取 `config/config.{RUST_ENV}.toml`，
    /// 该文件不存在时使用默认配置。
    pub fn load() -> Result<Self> {
        if let Ok(path) = env::var(CONFIG_PATH_ENV) {
            return Self::from_file(path);
        }

        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        let default_path = PathBuf::from(format!("config/config.{env_name}.toml"));
        if default_path.exists() {
            Self::from_file(default_path)
        } else {
            warn!("配置文件不存在: {}, 使用默认配置", default_path.display());
            Self::from_config(AppConfig::default(), None)
        }
    }

    /// 从指定文件创建配置管理器
    pub fn from_file(config_path: impl AsRef<Path>) -> Result<Self> {
        let config_path = config_path.as_ref();
        let config = Self::load_config_file(config_path)?;
        Self::from_config(config, Some(config_path.to_path_buf()))
    }

    /// 在给定配置上应用环境变量覆盖并校验
    pub fn from_config(mut config: AppConfig, source: Option<PathBuf>) -> Result<Self> {
        let overrides = Self::build_env_overrides();
        Self::apply_overrides(&mut config, &overrides)?;
        config.validate().map_err(AdminError::config)?;

        let origin = source
            .as_deref()
            .map_or_else(|| "默认配置".to_string(), |p| p.display().to_string());
        linfo!(
            "system",
            LogStage::Configuration,
            LogComponent::Config,
            "config_loaded",
            "配置加载完成",
            source = %origin,
            overrides = overrides.len()
        );

        Ok(Self { config, source })
    }

    /// 当前配置
    #[must_use]
    pub const fn config(&self) -> &AppConfig {
        &self.config
    }

    /// 配置文件路径
    #[must_use]
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// 安装进程级加密器
    ///
    /// 密钥优先取 `AI_ADMIN_ENCRYPTION_KEY`，其次取 `crypto.encryption_key`。
    /// 两者都未配置时返回 `false`，此时读写服务商密钥会报加密错误。
    pub fn install_crypto(&self) -> Result<bool> {
        let crypto = match ConfigCrypto::from_env()? {
            Some(crypto) => Some(crypto),
            None => self
                .config
                .crypto
                .encryption_key
                .as_deref()
                .map(ConfigCrypto::from_hex)
                .transpose()?,
        };

        match crypto {
            Some(crypto) => {
                crypto.install_global()?;
                Ok(true)
            }
            None => {
                warn!("未配置加密密钥 ({ENCRYPTION_KEY_ENV})，服务商密钥读写将不可用");
                Ok(false)
            }
        }
    }

    /// 加载配置文件
    fn load_config_file(path: &Path) -> Result<AppConfig> {
        if !path.exists() {
            return Err(AdminError::config(format!(
                "配置文件不存在: {}",
                path.display()
            )));
        }

        let config_content = std::fs::read_to_string(path).map_err(|e| {
            AdminError::config_with_source(format!("读取配置文件失败: {}", path.display()), e)
        })?;

        toml::from_str(&config_content).map_err(|e| {
            AdminError::config_with_source(
                format!("TOML解析失败 - 配置文件: {}, 详细错误: {e}", path.display()),
                e,
            )
        })
    }

    /// 构建环境变量覆盖映射
    ///
    /// 例如 `AI_ADMIN_DATABASE_URL` -> `database_url`
    fn build_env_overrides() -> HashMap<String, String> {
        let overrides: HashMap<String, String> = env::vars()
            .filter_map(|(key, value)| {
                key.strip_prefix(ENV_PREFIX)
                    .map(|config_key| (config_key.to_lowercase(), value))
            })
            .collect();

        debug!("发现 {} 个环境变量覆盖", overrides.len());
        overrides
    }

    /// 将覆盖映射应用到配置对象，未知键被忽略
    pub fn apply_overrides(
        config: &mut AppConfig,
        overrides: &HashMap<String, String>,
    ) -> Result<()> {
        for (key, value) in overrides {
            debug!(
                "应用环境变量覆盖: {} = {}",
                key,
                if key.contains("key") { "***" } else { value }
            );

            match key.as_str() {
                "app_name" => config.app.name.clone_from(value),
                "app_url" => config.app.url.clone_from(value),
                "database_url" => config.database.url.clone_from(value),
                "database_max_connections" => {
                    config.database.max_connections = value.parse().map_err(|e| {
                        AdminError::config_with_source(format!("无效的最大连接数: {value}"), e)
                    })?;
                }
                "database_connect_timeout" => {
                    config.database.connect_timeout = value.parse().map_err(|e| {
                        AdminError::config_with_source(format!("无效的连接超时: {value}"), e)
                    })?;
                }
                "usage_dashboard_top_n" => {
                    config.usage.dashboard_top_n = value.parse().map_err(|e| {
                        AdminError::config_with_source(format!("无效的排行条目数: {value}"), e)
                    })?;
                }
                "mail_default_language" => config.mail.default_language.clone_from(value),
                // 密钥与配置路径在别处读取
                "encryption_key" | "config_path" => {}
                other => debug!("忽略未知的环境变量覆盖: {}", other),
            }
        }
        Ok(())
    }
}
