//! # AI 服务商实体定义
//!
//! `api_key` 列保存的是加密后的信封（JSON），明文只在服务层解密后出现

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// AI 服务商实体
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "api_providers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub provider_name: String,
    #[sea_orm(unique)]
    pub unique_name: String,
    pub api_format_id: Option<i32>,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub is_active: bool,
    pub display_order: i32,
    pub additional_settings: Option<String>, // JSON 字符串
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::api_formats::Entity",
        from = "Column::ApiFormatId",
        to = "super::api_formats::Column::Id"
    )]
    ApiFormats,
    #[sea_orm(has_many = "super::ai_models::Entity")]
    AiModels,
}

impl Related<super::api_formats::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ApiFormats.def()
    }
}

impl Related<super::ai_models::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AiModels.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// 附加设置 JSON，缺失或格式错误时返回空对象
    #[must_use]
    pub fn settings_json(&self) -> serde_json::Value {
        self.additional_settings
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_else(|| serde_json::Value::Object(serde_json::Map::new()))
    }

    /// `additional_settings.headers` 中配置的额外请求头
    #[must_use]
    pub fn extra_headers(&self) -> Vec<(String, String)> {
        let settings = self.settings_json();
        let Some(headers) = settings.get("headers").and_then(serde_json::Value::as_object) else {
            return Vec::new();
        };

        headers
            .iter()
            .filter_map(|(name, value)| value.as_str().map(|v| (name.clone(), v.to_string())))
            .collect()
    }

    /// 解析后的基础地址；为空或无法解析时返回 `None`
    #[must_use]
    pub fn parsed_base_url(&self) -> Option<url::Url> {
        self.base_url
            .as_deref()
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
            .and_then(|raw| url::Url::parse(raw).ok())
    }

    /// 是否配置了（加密后的）API 密钥
    #[must_use]
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|key| !key.is_empty())
    }
}
