//! # 公告实体定义
//!
//! 公告正文按语言存放在 `announcement_translations`，`view` 是公告的稳定标识

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 公告实体
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "announcements")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub title: String,
    pub view: String,
    #[sea_orm(column_name = "type")]
    pub announcement_type: AnnouncementType,
    pub is_published: bool,
    pub is_forced: bool,
    pub is_global: bool,
    pub target_roles: Option<String>, // JSON 数组，例如 ["admin","staff"]
    pub anchor: Option<String>,
    pub starts_at: Option<DateTime>,
    pub expires_at: Option<DateTime>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::announcement_translations::Entity")]
    AnnouncementTranslations,
}

impl Related<super::announcement_translations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AnnouncementTranslations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// 目标角色列表，格式错误时为空
    #[must_use]
    pub fn target_role_list(&self) -> Vec<String> {
        self.target_roles
            .as_deref()
            .and_then(|raw| serde_json::from_str::<Vec<String>>(raw).ok())
            .unwrap_or_default()
    }

    /// 指定时间是否处于生效窗口内（两端均包含）
    #[must_use]
    pub fn is_active_at(&self, now: DateTime) -> bool {
        self.starts_at.is_none_or(|start| start <= now)
            && self.expires_at.is_none_or(|expires| expires >= now)
    }
}

/// 公告类型
#[derive(
    Eq, PartialEq, Copy, Clone, Debug, EnumIter, DeriveActiveEnum, Default, Hash, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum AnnouncementType {
    #[sea_orm(string_value = "policy")]
    Policy,
    #[sea_orm(string_value = "news")]
    News,
    /// 系统公告不可取消发布
    #[sea_orm(string_value = "system")]
    System,
    #[sea_orm(string_value = "event")]
    Event,
    #[default]
    #[sea_orm(string_value = "info")]
    Info,
}
