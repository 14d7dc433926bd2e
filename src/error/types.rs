//! # 错误类型定义

use thiserror::Error;

/// 应用主要错误类型
#[derive(Debug, Error)]
pub enum AdminError {
    /// 配置相关错误
    #[error("配置错误: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 数据库相关错误
    #[error("数据库错误: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 加解密错误
    #[error("加密错误: {message}")]
    Crypto {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 网络通信错误
    #[error("网络错误: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 输入校验错误
    #[error("校验错误: {message}")]
    Validation {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 模板处理错误
    #[error("模板错误: {message}")]
    Template {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 资源未找到
    #[error("资源未找到: {resource} '{identifier}'")]
    NotFound {
        resource: String,
        identifier: String,
    },

    /// 系统内部错误
    #[error("内部错误: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// IO相关错误
    #[error("IO错误: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// 序列化/反序列化错误
    #[error("序列化错误: {message}")]
    Serialization {
        message: String,
        #[source]
        source: anyhow::Error,
    },

    /// 附加了上下文的错误
    #[error("{context}")]
    Context {
        context: String,
        #[source]
        source: Box<AdminError>,
    },
}

impl AdminError {
    /// 创建配置错误
    pub fn config<T: Into<String>>(message: T) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    /// 创建带来源的配置错误
    pub fn config_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 创建数据库错误
    pub fn database<T: Into<String>>(message: T) -> Self {
        Self::Database {
            message: message.into(),
            source: None,
        }
    }

    /// 创建带来源的数据库错误
    pub fn database_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Database {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 创建加密错误
    pub fn crypto<T: Into<String>>(message: T) -> Self {
        Self::Crypto {
            message: message.into(),
            source: None,
        }
    }

    /// 创建带来源的加密错误
    pub fn crypto_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Crypto {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 创建网络错误
    pub fn network<T: Into<String>>(message: T) -> Self {
        Self::Network {
            message: message.into(),
            source: None,
        }
    }

    /// 创建带来源的网络错误
    pub fn network_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Network {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 创建校验错误
    pub fn validation<T: Into<String>>(message: T) -> Self {
        Self::Validation {
            message: message.into(),
            source: None,
        }
    }

    /// 创建模板错误
    pub fn template<T: Into<String>>(message: T) -> Self {
        Self::Template {
            message: message.into(),
            source: None,
        }
    }

    /// 创建资源未找到错误
    pub fn not_found<R: Into<String>, I: Into<String>>(resource: R, identifier: I) -> Self {
        Self::NotFound {
            resource: resource.into(),
            identifier: identifier.into(),
        }
    }

    /// 创建内部错误
    pub fn internal<T: Into<String>>(message: T) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// 创建带来源的内部错误
    pub fn internal_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 去掉上下文包装后的根错误
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::Context { source, .. } => source.root(),
            other => other,
        }
    }

    /// 错误分类，用于决定退出码和提示方式
    #[must_use]
    pub fn category(&self) -> super::ErrorCategory {
        match self.root() {
            Self::Config { .. } | Self::Validation { .. } | Self::NotFound { .. } => {
                super::ErrorCategory::Client
            }
            _ => super::ErrorCategory::Server,
        }
    }

    /// 面向操作者的简短提示
    ///
    /// 资源未找到时返回 `Template 'welcome' not found` 这样的英文短句，
    /// 其余错误返回完整的错误描述。
    #[must_use]
    pub fn user_message(&self) -> String {
        match self.root() {
            Self::NotFound {
                resource,
                identifier,
            } => format!("{resource} '{identifier}' not found"),
            _ => self.to_string(),
        }
    }
}

impl From<std::io::Error> for AdminError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: "文件操作失败".to_string(),
            source: err,
        }
    }
}

impl From<toml::de::Error> for AdminError {
    fn from(err: toml::de::Error) -> Self {
        Self::config_with_source("TOML解析失败", err)
    }
}

impl From<serde_json::Error> for AdminError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: "JSON处理失败".to_string(),
            source: err.into(),
        }
    }
}

impl From<sea_orm::error::DbErr> for AdminError {
    fn from(err: sea_orm::error::DbErr) -> Self {
        Self::database_with_source("数据库操作失败", err)
    }
}

impl From<reqwest::Error> for AdminError {
    fn from(err: reqwest::Error) -> Self {
        Self::network_with_source("HTTP请求失败", err)
    }
}

impl From<url::ParseError> for AdminError {
    fn from(err: url::ParseError) -> Self {
        Self::Validation {
            message: format!("URL格式错误: {err}"),
            source: Some(err.into()),
        }
    }
}
