//! # AI Admin Library
//!
//! AI 平台管理后台核心库：服务商端点解析、模型目录同步、用量汇总与仪表盘、邮件模板和公告

pub mod announcement;
pub mod assistant;
pub mod config;
pub mod database;
pub mod error;
pub mod logging;
pub mod mail;
pub mod provider;
pub mod usage;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{AdminError, Result};
