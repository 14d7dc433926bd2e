//! # 公告译文实体定义

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 公告译文，`(announcement_id, locale)` 唯一
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "announcement_translations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub announcement_id: i32,
    pub locale: String,
    pub content: String, // Markdown
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::announcements::Entity",
        from = "Column::AnnouncementId",
        to = "super::announcements::Column::Id"
    )]
    Announcements,
}

impl Related<super::announcements::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Announcements.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
