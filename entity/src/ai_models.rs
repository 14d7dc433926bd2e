//! # AI 模型实体定义
//!
//! `model_id` 由服务商分配，可跨服务商重复；`system_id` 是全局唯一的 UUID

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// AI 模型实体
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "ai_models")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub system_id: String,
    pub model_id: String,
    pub label: String,
    pub provider_id: i32,
    pub is_active: bool,
    pub streamable: bool,
    pub is_visible: bool,
    pub display_order: i32,
    pub information: Option<String>, // JSON 字符串
    pub settings: Option<String>,    // JSON 字符串
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::api_providers::Entity",
        from = "Column::ProviderId",
        to = "super::api_providers::Column::Id"
    )]
    ApiProviders,
    #[sea_orm(has_many = "super::ai_assistants::Entity")]
    AiAssistants,
}

impl Related<super::api_providers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ApiProviders.def()
    }
}

impl Related<super::ai_assistants::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AiAssistants.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// 解析 information JSON
    #[must_use]
    pub fn information_json(&self) -> serde_json::Value {
        self.information
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_else(|| serde_json::Value::Object(serde_json::Map::new()))
    }
}
