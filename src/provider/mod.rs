//! # 服务商模块
//!
//! API 格式端点解析、认证方式、配置检查、模型目录同步和密钥管理

pub mod auth;
pub mod catalog;
pub mod resolver;
pub mod service;
pub mod status;

pub use auth::AuthStyle;
pub use catalog::{
    CatalogModel, ConnectionTestResult, HttpModelSource, ModelCatalogService, ModelSource,
    SourceResponse, SyncStats, extract_model, normalize_payload,
};
pub use resolver::{EndpointResolver, join_endpoint_url};
pub use service::{NewProvider, ProviderService};
pub use status::{ProviderHealth, ProviderStatusService};
