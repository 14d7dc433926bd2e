//! # 错误处理测试

use crate::error::{AdminError, Context, ErrorCategory};
use std::error::Error;

#[test]
fn test_config_error_creation() {
    let err = AdminError::config("测试配置错误");
    assert!(matches!(err, AdminError::Config { .. }));
    assert_eq!(err.to_string(), "配置错误: 测试配置错误");
}

#[test]
fn test_config_error_with_source() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "文件不存在");
    let err = AdminError::config_with_source("配置文件加载失败", io_err);

    assert!(err.to_string().contains("配置错误: 配置文件加载失败"));
    assert!(err.source().is_some());
}

#[test]
fn test_error_macro_builds_variant() {
    let err = crate::error!(Database, "aggregate_failed");
    assert!(matches!(err, AdminError::Database { source: None, .. }));
    assert_eq!(err.to_string(), "数据库错误: aggregate_failed");
}

#[test]
fn test_context_wraps_and_keeps_root() {
    let result: Result<(), sea_orm::DbErr> = Err(sea_orm::DbErr::Custom("boom".to_string()));
    let err = result.context("加载服务商失败").unwrap_err();

    assert_eq!(err.to_string(), "加载服务商失败");
    assert!(matches!(err.root(), AdminError::Database { .. }));
    assert_eq!(err.category(), ErrorCategory::Server);
}

#[test]
fn test_not_found_user_message() {
    let err = AdminError::not_found("Template", "welcome");
    assert_eq!(err.user_message(), "Template 'welcome' not found");
    assert_eq!(err.category(), ErrorCategory::Client);
    assert_eq!(err.category().exit_code(), 2);

    let wrapped = crate::error::context_error::<()>(err, "渲染邮件失败").unwrap_err();
    assert_eq!(wrapped.user_message(), "Template 'welcome' not found");
}

#[test]
fn test_ensure_validation_macro() {
    fn check(days: u32) -> crate::error::Result<u32> {
        crate::ensure_validation!(days > 0, "回填天数必须大于0, 实际: {}", days);
        Ok(days)
    }

    assert_eq!(check(3).unwrap(), 3);
    assert!(matches!(check(0), Err(AdminError::Validation { .. })));
}

#[test]
fn test_auto_conversion_from_io_error() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "文件不存在");
    let err: AdminError = io_err.into();
    assert!(matches!(err, AdminError::Io { .. }));
}
