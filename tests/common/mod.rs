//! 集成测试公共辅助函数

#![allow(dead_code)]

use ai_admin::config::ConfigCrypto;
use ai_admin::database;
use ai_admin::provider::{NewProvider, ProviderService};
use chrono::{NaiveDate, NaiveDateTime};
use entity::{
    api_formats, api_providers,
    usage_records::{self, UsageStatus},
};
use migration::{Migrator, MigratorTrait};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Database, DatabaseConnection, EntityTrait, QueryFilter, Set,
};

pub const TEST_ENCRYPTION_KEY: &str =
    "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

pub async fn setup_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("connect test db");
    Migrator::up(&db, None).await.expect("run migrations");
    db
}

/// 迁移后写入默认格式、端点和邮件模板
pub async fn seeded_db() -> DatabaseConnection {
    let db = setup_test_db().await;
    database::ensure_default_data(&db)
        .await
        .expect("seed default data");
    db
}

/// 安装进程级加密器，重复调用返回同一实例
pub fn install_crypto() -> &'static ConfigCrypto {
    if let Ok(crypto) = ConfigCrypto::global() {
        return crypto;
    }
    ConfigCrypto::from_hex(TEST_ENCRYPTION_KEY)
        .and_then(ConfigCrypto::install_global)
        .expect("install test crypto")
}

pub async fn format_id(db: &DatabaseConnection, unique_name: &str) -> i32 {
    api_formats::Entity::find()
        .filter(api_formats::Column::UniqueName.eq(unique_name))
        .one(db)
        .await
        .expect("query format")
        .expect("seeded format")
        .id
}

pub async fn create_provider(
    db: &DatabaseConnection,
    unique_name: &str,
    format: Option<&str>,
    base_url: Option<&str>,
    api_key: Option<&str>,
) -> api_providers::Model {
    let api_format_id = match format {
        Some(name) => Some(format_id(db, name).await),
        None => None,
    };
    if api_key.is_some() {
        install_crypto();
    }

    ProviderService::new(db)
        .create(NewProvider {
            provider_name: unique_name.to_string(),
            unique_name: unique_name.to_string(),
            api_format_id,
            api_key: api_key.map(str::to_string),
            base_url: base_url.map(str::to_string),
            is_active: true,
            display_order: 0,
            additional_settings: None,
        })
        .await
        .expect("create provider")
}

pub fn at(date: NaiveDate, hour: u32) -> NaiveDateTime {
    date.and_hms_opt(hour, 15, 0).expect("valid time")
}

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

/// 用量记录构建参数
pub struct Usage<'a> {
    pub user_id: Option<i32>,
    pub provider: Option<&'a str>,
    pub model: &'a str,
    pub created_at: NaiveDateTime,
    pub prompt_tokens: Option<i32>,
    pub completion_tokens: Option<i32>,
    pub tool_use: Option<serde_json::Value>,
    pub status: Option<UsageStatus>,
}

impl<'a> Usage<'a> {
    pub const fn new(user_id: Option<i32>, created_at: NaiveDateTime) -> Self {
        Self {
            user_id,
            provider: Some("openai"),
            model: "gpt-4o",
            created_at,
            prompt_tokens: Some(100),
            completion_tokens: Some(50),
            tool_use: None,
            status: Some(UsageStatus::Success),
        }
    }

    pub const fn provider(mut self, provider: Option<&'a str>, model: &'a str) -> Self {
        self.provider = provider;
        self.model = model;
        self
    }

    pub fn tool_use(mut self, tool_use: serde_json::Value) -> Self {
        self.tool_use = Some(tool_use);
        self
    }

    pub const fn status(mut self, status: Option<UsageStatus>) -> Self {
        self.status = status;
        self
    }

    pub async fn insert(self, db: &DatabaseConnection) -> usage_records::Model {
        usage_records::ActiveModel {
            user_id: Set(self.user_id),
            room_id: Set(None),
            record_type: Set("private".to_string()),
            api_provider: Set(self.provider.map(str::to_string)),
            model: Set(self.model.to_string()),
            prompt_tokens: Set(self.prompt_tokens),
            completion_tokens: Set(self.completion_tokens),
            cache_read_input_tokens: Set(None),
            cache_creation_input_tokens: Set(None),
            reasoning_tokens: Set(None),
            audio_input_tokens: Set(None),
            audio_output_tokens: Set(None),
            server_tool_use: Set(self.tool_use.map(|v| v.to_string())),
            status: Set(self.status),
            created_at: Set(self.created_at),
            updated_at: Set(self.created_at),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("insert usage record")
    }
}
