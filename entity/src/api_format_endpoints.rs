//! # API 格式端点实体定义
//!
//! 每个端点是 API 格式下一个具名能力（例如 `models.list`），`(api_format_id, name)` 唯一

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// API 格式端点实体
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "api_format_endpoints")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub api_format_id: i32,
    pub name: String,
    pub path: String,
    pub method: String,
    pub is_active: bool,
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
}

impl Related<super::api_formats::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ApiFormats.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
