//! # 用量记录实体定义
//!
//! 每次 AI 请求一行，记录 token 消耗、工具调用与请求结果

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 用量记录实体
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "usage_records")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: Option<i32>,
    pub room_id: Option<i32>,
    #[sea_orm(column_name = "type")]
    pub record_type: String,
    pub api_provider: Option<String>,
    pub model: String,
    pub prompt_tokens: Option<i32>,
    pub completion_tokens: Option<i32>,
    pub cache_read_input_tokens: Option<i32>,
    pub cache_creation_input_tokens: Option<i32>,
    pub reasoning_tokens: Option<i32>,
    pub audio_input_tokens: Option<i32>,
    pub audio_output_tokens: Option<i32>,
    pub server_tool_use: Option<String>, // JSON 字符串
    pub status: Option<UsageStatus>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// 请求结果状态
#[derive(
    Eq, PartialEq, Copy, Clone, Debug, EnumIter, DeriveActiveEnum, Hash, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum UsageStatus {
    #[sea_orm(string_value = "success")]
    Success,
    #[sea_orm(string_value = "failed")]
    Failed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}
