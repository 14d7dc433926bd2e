//! # 日志配置模块
//!
//! 结构化日志宏与日志系统初始化。每条日志都带上 `request_id`、阶段、组件和操作名，
//! 便于按维度过滤：
//!
//! ```ignore
//! linfo!("system", LogStage::Aggregation, LogComponent::Usage, "day_done", "日汇总完成", inserted = 3);
//! ```

use std::env;
use std::fmt;
use tracing_subscriber::{EnvFilter, fmt as tracing_fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// 处理阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStage {
    Startup,
    Shutdown,
    Configuration,
    Db,
    Seeding,
    Resolution,
    ExternalApi,
    Aggregation,
    Dashboard,
    Rendering,
    Internal,
    Error,
}

impl LogStage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Startup => "startup",
            Self::Shutdown => "shutdown",
            Self::Configuration => "configuration",
            Self::Db => "db",
            Self::Seeding => "seeding",
            Self::Resolution => "resolution",
            Self::ExternalApi => "external_api",
            Self::Aggregation => "aggregation",
            Self::Dashboard => "dashboard",
            Self::Rendering => "rendering",
            Self::Internal => "internal",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for LogStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 产生日志的组件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogComponent {
    Main,
    Config,
    Crypto,
    Database,
    Resolver,
    ProviderAuth,
    ProviderStatus,
    Catalog,
    Assistant,
    Usage,
    Dashboard,
    Mail,
    Announcement,
}

impl LogComponent {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Config => "config",
            Self::Crypto => "crypto",
            Self::Database => "database",
            Self::Resolver => "resolver",
            Self::ProviderAuth => "provider_auth",
            Self::ProviderStatus => "provider_status",
            Self::Catalog => "catalog",
            Self::Assistant => "assistant",
            Self::Usage => "usage",
            Self::Dashboard => "dashboard",
            Self::Mail => "mail",
            Self::Announcement => "announcement",
        }
    }
}

impl fmt::Display for LogComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[doc(hidden)]
#[macro_export]
macro_rules! __structured_log {
    ($level:ident, $request_id:expr, $stage:expr, $component:expr, $operation:expr, $message:expr $(, $($fields:tt)+)?) => {
        ::tracing::$level!(
            request_id = %$request_id,
            stage = %$stage,
            component = %$component,
            operation = $operation,
            $($($fields)+ ,)?
            "{}",
            $message
        )
    };
}

/// 结构化 info 日志
#[macro_export]
macro_rules! linfo {
    ($($args:tt)+) => {
        $crate::__structured_log!(info, $($args)+)
    };
}

/// 结构化 warn 日志
#[macro_export]
macro_rules! lwarn {
    ($($args:tt)+) => {
        $crate::__structured_log!(warn, $($args)+)
    };
}

/// 结构化 error 日志
#[macro_export]
macro_rules! lerror {
    ($($args:tt)+) => {
        $crate::__structured_log!(error, $($args)+)
    };
}

/// 结构化 debug 日志
#[macro_export]
macro_rules! ldebug {
    ($($args:tt)+) => {
        $crate::__structured_log!(debug, $($args)+)
    };
}

/// 默认过滤规则：关闭 SQL 语句级别的噪音
#[must_use]
pub fn default_filter(level: &str) -> String {
    format!("{level},ai_admin=debug,sqlx::query=off,sea_orm::query=warn,sqlx=warn")
}

/// 初始化日志系统
///
/// `RUST_LOG` 优先于 `log_level` 参数。
pub fn init_logging(log_level: Option<&str>) {
    let level = log_level.unwrap_or("info");
    let log_filter = env::var("RUST_LOG").unwrap_or_else(|_| default_filter(level));

    let initialized = tracing_subscriber::registry()
        .with(EnvFilter::try_new(&log_filter).unwrap_or_else(|_| EnvFilter::new(default_filter(level))))
        .with(
            tracing_fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(false)
                .with_thread_names(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .try_init()
        .is_ok();

    if initialized && env::var("RUST_LOG").is_ok_and(|v| v.contains("sqlx::query=debug")) {
        tracing::info!("🔍 SQLx database query logging enabled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_and_component_display() {
        assert_eq!(LogStage::Aggregation.to_string(), "aggregation");
        assert_eq!(LogComponent::ProviderAuth.to_string(), "provider_auth");
    }

    #[test]
    fn test_default_filter_silences_sql() {
        let filter = default_filter("warn");
        assert!(filter.starts_with("warn,"));
        assert!(filter.contains("sqlx::query=off"));
    }

    #[test]
    fn test_macros_expand_with_fields() {
        let count = 3;
        linfo!(
            "test",
            LogStage::Internal,
            LogComponent::Main,
            "macro_check",
            "宏展开检查",
            count = count
        );
        lwarn!("test", LogStage::Error, LogComponent::Main, "macro_check", &format!("n={count}"));
    }
}
