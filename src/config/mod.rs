//! # 配置管理模块
//!
//! 处理应用配置加载、验证和密钥加密

mod app_config;
mod crypto;
mod database;
mod manager;

pub use app_config::{AppConfig, AppSection, CryptoConfig, MailConfig, UsageConfig};
pub use crypto::{ConfigCrypto, ENCRYPTION_KEY_ENV, EncryptedValue, decrypt_secret, encrypt_secret};
pub use database::DatabaseConfig;
pub use manager::{CONFIG_PATH_ENV, ConfigManager};
