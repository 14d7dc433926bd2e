//! # 错误处理宏

/// 按变体名快速创建带消息、无来源的错误
///
/// ```ignore
/// crate::error!(Database, format!("query_failed: {err}"))
/// ```
#[macro_export]
macro_rules! error {
    ($kind:ident, $msg:expr) => {
        $crate::error::AdminError::$kind {
            message: ::std::convert::Into::<String>::into($msg),
            source: None,
        }
    };
}

/// 快速创建配置错误的宏
#[macro_export]
macro_rules! config_error {
    ($msg:expr) => {
        $crate::error::AdminError::config($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::AdminError::config(format!($fmt, $($arg)*))
    };
}

/// 快速创建数据库错误的宏
#[macro_export]
macro_rules! database_error {
    ($msg:expr) => {
        $crate::error::AdminError::database($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::AdminError::database(format!($fmt, $($arg)*))
    };
}

/// 快速创建校验错误的宏
#[macro_export]
macro_rules! validation_error {
    ($msg:expr) => {
        $crate::error::AdminError::validation($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::AdminError::validation(format!($fmt, $($arg)*))
    };
}

/// 确保条件成立，否则返回配置错误
#[macro_export]
macro_rules! ensure_config {
    ($cond:expr, $msg:expr) => {
        if !($cond) {
            return Err($crate::config_error!($msg));
        }
    };
    ($cond:expr, $fmt:expr, $($arg:tt)*) => {
        if !($cond) {
            return Err($crate::config_error!($fmt, $($arg)*));
        }
    };
}

/// 确保条件成立，否则返回校验错误
#[macro_export]
macro_rules! ensure_validation {
    ($cond:expr, $msg:expr) => {
        if !($cond) {
            return Err($crate::validation_error!($msg));
        }
    };
    ($cond:expr, $fmt:expr, $($arg:tt)*) => {
        if !($cond) {
            return Err($crate::validation_error!($fmt, $($arg)*));
        }
    };
}
