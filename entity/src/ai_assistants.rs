//! # AI 助手实体定义
//!
//! 助手通过 `ai_model`（模型的 `system_id`）引用模型，通过标题引用提示词

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// AI 助手实体
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "ai_assistants")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub key: String,
    pub name: String,
    pub description: Option<String>,
    pub status: AssistantStatus,
    pub visibility: AssistantVisibility,
    pub org_id: Option<i32>,
    pub owner_id: Option<i32>,
    pub ai_model: Option<String>,
    pub prompt: Option<String>,
    pub tools: Option<String>, // JSON 字符串
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::ai_models::Entity",
        from = "Column::AiModel",
        to = "super::ai_models::Column::SystemId"
    )]
    AiModels,
}

impl Related<super::ai_models::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AiModels.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// 助手生命周期状态
#[derive(
    Eq, PartialEq, Copy, Clone, Debug, EnumIter, DeriveActiveEnum, Default, Hash, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum AssistantStatus {
    #[default]
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "archived")]
    Archived,
}

/// 助手可见范围，从私有到公开逐级放宽
#[derive(
    Eq, PartialEq, Copy, Clone, Debug, EnumIter, DeriveActiveEnum, Default, Hash, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum AssistantVisibility {
    #[default]
    #[sea_orm(string_value = "private")]
    Private,
    #[sea_orm(string_value = "org")]
    Org,
    #[sea_orm(string_value = "public")]
    Public,
}

impl AssistantVisibility {
    /// 可见级别序号：private < org < public
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Private => 0,
            Self::Org => 1,
            Self::Public => 2,
        }
    }

    /// 至少达到给定级别的所有可见范围
    #[must_use]
    pub fn at_least(level: Self) -> Vec<Self> {
        [Self::Private, Self::Org, Self::Public]
            .into_iter()
            .filter(|candidate| candidate.rank() >= level.rank())
            .collect()
    }
}
