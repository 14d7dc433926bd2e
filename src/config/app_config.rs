//! # 应用配置结构定义

use serde::{Deserialize, Serialize};

/// 应用主配置结构
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// 应用信息（用于邮件占位符等）
    #[serde(default)]
    pub app: AppSection,
    /// 数据库配置
    #[serde(default)]
    pub database: super::DatabaseConfig,
    /// 加密配置
    #[serde(default)]
    pub crypto: CryptoConfig,
    /// 用量统计配置
    #[serde(default)]
    pub usage: UsageConfig,
    /// 邮件配置
    #[serde(default)]
    pub mail: MailConfig,
}

/// 应用基本信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSection {
    /// 应用名称
    pub name: String,
    /// 应用对外访问地址
    pub url: String,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: "AI Admin".to_string(),
            url: "http://localhost".to_string(),
        }
    }
}

/// 加密配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CryptoConfig {
    /// 64 位十六进制的 AES-256 密钥；优先使用环境变量 `AI_ADMIN_ENCRYPTION_KEY`
    #[serde(default, skip_serializing)]
    pub encryption_key: Option<String>,
}

/// 用量统计配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageConfig {
    /// 仪表盘中服务商/模型排行保留的条目数
    pub dashboard_top_n: usize,
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self { dashboard_top_n: 5 }
    }
}

/// 邮件配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    /// 模板默认语言，找不到时回退到 `en`
    pub default_language: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            default_language: "en".to_string(),
        }
    }
}

impl AppConfig {
    /// 验证配置的有效性
    pub fn validate(&self) -> Result<(), String> {
        if self.app.name.trim().is_empty() {
            return Err("app.name cannot be empty".to_string());
        }
        url::Url::parse(&self.app.url)
            .map_err(|e| format!("app.url is not a valid URL ({}): {e}", self.app.url))?;

        if self.database.url.is_empty() {
            return Err("Database URL cannot be empty".to_string());
        }
        if self.database.max_connections == 0 {
            return Err("Database max_connections must be greater than 0".to_string());
        }

        if let Some(key) = self.crypto.encryption_key.as_deref() {
            if key.len() != 64 || !key.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err("crypto.encryption_key must be 64 hex characters".to_string());
            }
        }

        if self.usage.dashboard_top_n == 0 {
            return Err("usage.dashboard_top_n must be greater than 0".to_string());
        }
        if self.mail.default_language.trim().is_empty() {
            return Err("mail.default_language cannot be empty".to_string());
        }

        Ok(())
    }

    /// 去掉末尾斜杠的应用地址
    #[must_use]
    pub fn app_url(&self) -> &str {
        self.app.url.trim_end_matches('/')
    }
}
