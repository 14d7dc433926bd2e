//! # 用户日用量汇总实体定义
//!
//! 按 `(user_id, date, api_provider, model)` 预聚合的 `usage_records`

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 用户日用量汇总实体
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "usage_users_daily")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub date: Date,
    pub api_provider: String,
    pub model: String,
    pub api_requests: i64,
    pub successful_requests: i64,
    pub failed_requests: i64,
    pub cancelled_requests: i64,
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub total_tokens: i64,
    pub cache_read_input_tokens: i64,
    pub cache_creation_input_tokens: i64,
    pub reasoning_tokens: i64,
    pub audio_input_tokens: i64,
    pub audio_output_tokens: i64,
    pub server_tool_use: Option<String>, // JSON 字符串，按键求和后的工具调用次数
    pub spend: f64,
    // 价格快照
    pub input_price: Option<f64>,
    pub output_price: Option<f64>,
    pub cache_read_price: Option<f64>,
    pub cache_write_price: Option<f64>,
    pub currency: Option<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
