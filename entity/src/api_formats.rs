//! # API 格式实体定义
//!
//! 描述一类请求/响应约定（例如 `openai-api`），由多个服务商共享

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// API 格式实体
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "api_formats")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub unique_name: String,
    pub display_name: String,
    pub base_url: Option<String>,
    pub metadata: Option<String>, // JSON 字符串，例如 {"auth_type": "bearer"}
    pub provider_class: Option<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::api_format_endpoints::Entity")]
    ApiFormatEndpoints,
    #[sea_orm(has_many = "super::api_providers::Entity")]
    ApiProviders,
}

impl Related<super::api_format_endpoints::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ApiFormatEndpoints.def()
    }
}

impl Related<super::api_providers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ApiProviders.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// 解析元数据 JSON，格式错误时返回空对象
    #[must_use]
    pub fn metadata_json(&self) -> serde_json::Value {
        self.metadata
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_else(|| serde_json::Value::Object(serde_json::Map::new()))
    }

    /// 元数据中声明的认证类型
    #[must_use]
    pub fn auth_type(&self) -> Option<String> {
        self.metadata_json()
            .get("auth_type")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string)
    }
}
