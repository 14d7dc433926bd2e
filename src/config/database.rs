//! # 数据库配置

use crate::error::{AdminError, Result};
use crate::{linfo, logging::{LogComponent, LogStage}};
use sea_orm::ConnectOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// 数据库URL
    pub url: String,
    /// 最大连接数
    pub max_connections: u32,
    /// 连接超时时间（秒）
    pub connect_timeout: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://./data/ai_admin.db".to_string(),
            max_connections: 10,
            connect_timeout: 30,
        }
    }
}

impl DatabaseConfig {
    /// 确保数据库路径存在（仅对SQLite文件数据库）
    pub fn ensure_database_path(&self) -> Result<()> {
        let Some(path_str) = self.sqlite_file_path() else {
            return Ok(());
        };
        let db_path = Path::new(path_str);

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    AdminError::config_with_source(
                        format!("无法创建数据库目录: {}", parent.display()),
                        e,
                    )
                })?;

                linfo!(
                    "system",
                    LogStage::Startup,
                    LogComponent::Database,
                    "create_db_dir",
                    &format!("创建数据库目录: {}", parent.display())
                );
            }
        }

        if !db_path.exists() {
            std::fs::File::create(db_path).map_err(|e| {
                AdminError::config_with_source(
                    format!("无法创建数据库文件: {}", db_path.display()),
                    e,
                )
            })?;
            linfo!(
                "system",
                LogStage::Startup,
                LogComponent::Database,
                "create_db_file",
                &format!("创建数据库文件: {}", db_path.display())
            );
        }

        Ok(())
    }

    /// SQLite 文件路径（去掉协议前缀和查询参数）；内存库或其他数据库返回 `None`
    #[must_use]
    pub fn sqlite_file_path(&self) -> Option<&str> {
        if !self.is_sqlite() || self.is_memory_database() {
            return None;
        }
        let rest = self
            .url
            .strip_prefix("sqlite://")
            .or_else(|| self.url.strip_prefix("sqlite:"))?;
        rest.split('?').next().filter(|path| !path.is_empty())
    }

    /// 检查是否为内存数据库
    #[must_use]
    pub fn is_memory_database(&self) -> bool {
        self.url.contains(":memory:")
    }

    /// 检查是否为SQLite数据库
    #[must_use]
    pub fn is_sqlite(&self) -> bool {
        self.url.starts_with("sqlite:")
    }

    /// 构建 Sea-ORM 连接参数
    #[must_use]
    pub fn connect_options(&self) -> ConnectOptions {
        let mut options = ConnectOptions::new(self.url.clone());
        options
            .max_connections(self.max_connections)
            .connect_timeout(Duration::from_secs(self.connect_timeout))
            .sqlx_logging(false);
        options
    }
}
