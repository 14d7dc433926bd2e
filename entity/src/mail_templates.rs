//! # 邮件模板实体定义

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 邮件模板实体，`(type, language)` 唯一
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "mail_templates")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(column_name = "type")]
    pub template_type: String,
    pub language: String,
    pub description: Option<String>,
    pub subject: String,
    pub body: String,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
