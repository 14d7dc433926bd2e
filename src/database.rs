//! # 数据库模块
//!
//! 数据库连接、迁移管理和默认数据初始化

use chrono::Utc;
use entity::{api_format_endpoints, api_formats, mail_templates};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Database, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, Set, TransactionTrait,
};
use sea_orm_migration::MigratorTrait;
use serde::Deserialize;

use crate::config::DatabaseConfig;
use crate::error::{AdminError, Context, Result};
use crate::logging::{LogComponent, LogStage};
use crate::{ldebug, lerror, linfo, lwarn};

const API_FORMAT_SEED: &str = include_str!("../config/seeds/api_formats.json");
const MAIL_TEMPLATE_SEED: &str = include_str!("../config/seeds/mail_templates.json");

/// 初始化数据库连接
pub async fn init_database(config: &DatabaseConfig) -> Result<DatabaseConnection> {
    linfo!(
        "system",
        LogStage::Startup,
        LogComponent::Database,
        "connect",
        &format!(
            "正在连接数据库: {}",
            config.url.chars().take(50).collect::<String>()
        )
    );

    config.ensure_database_path()?;

    let db = Database::connect(config.connect_options())
        .await
        .map_err(|e| AdminError::database_with_source("数据库连接失败", e))?;

    linfo!(
        "system",
        LogStage::Startup,
        LogComponent::Database,
        "connected",
        "数据库连接成功"
    );
    Ok(db)
}

/// 运行数据库迁移
pub async fn run_migrations(db: &DatabaseConnection) -> Result<()> {
    linfo!(
        "system",
        LogStage::Db,
        LogComponent::Database,
        "migrate",
        "开始运行数据库迁移..."
    );

    match ::migration::Migrator::up(db, None).await {
        Ok(()) => {
            linfo!(
                "system",
                LogStage::Db,
                LogComponent::Database,
                "migrate_done",
                "数据库迁移完成"
            );
            Ok(())
        }
        Err(e) => {
            lerror!(
                "system",
                LogStage::Db,
                LogComponent::Database,
                "migrate_failed",
                &format!("数据库迁移失败: {e}")
            );
            Err(AdminError::database_with_source("数据库迁移失败", e))
        }
    }
}

/// 检查数据库状态，返回待应用的迁移数量
pub async fn check_database_status(db: &DatabaseConnection) -> Result<usize> {
    let pending = ::migration::Migrator::get_pending_migrations(db)
        .await
        .context("查询迁移状态失败")?;

    if pending.is_empty() {
        linfo!(
            "system",
            LogStage::Db,
            LogComponent::Database,
            "migration_status",
            "所有迁移都已应用"
        );
    } else {
        lwarn!(
            "system",
            LogStage::Db,
            LogComponent::Database,
            "migration_status",
            &format!("有 {} 个待应用的迁移", pending.len())
        );
    }

    Ok(pending.len())
}

/// 种子数据写入结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    /// 新增的 API 格式数
    pub api_formats: usize,
    /// 新增的端点数
    pub endpoints: usize,
    /// 新增的邮件模板数
    pub mail_templates: usize,
}

/// 确保默认数据存在（可重复执行）
pub async fn ensure_default_data(db: &DatabaseConnection) -> Result<SeedReport> {
    let (api_formats, endpoints) = ensure_api_format_data(db).await?;
    let mail_templates = ensure_mail_template_data(db).await?;

    Ok(SeedReport {
        api_formats,
        endpoints,
        mail_templates,
    })
}

#[derive(Debug, Deserialize)]
struct FormatSeed {
    unique_name: String,
    display_name: String,
    base_url: Option<String>,
    provider_class: Option<String>,
    #[serde(default)]
    metadata: serde_json::Value,
    #[serde(default)]
    endpoints: Vec<EndpointSeed>,
}

#[derive(Debug, Deserialize)]
struct EndpointSeed {
    name: String,
    path: String,
    #[serde(default = "default_method")]
    method: String,
}

fn default_method() -> String {
    "POST".to_string()
}

#[derive(Debug, Deserialize)]
struct MailTemplateSeed {
    #[serde(rename = "type")]
    template_type: String,
    language: String,
    description: Option<String>,
    subject: String,
    body: String,
}

/// 确保 API 格式及其端点存在
///
/// 仅在 `api_formats` 表为空时写入，返回 (格式数, 端点数)。
pub async fn ensure_api_format_data(db: &DatabaseConnection) -> Result<(usize, usize)> {
    let existing = api_formats::Entity::find()
        .count(db)
        .await
        .context("查询 API 格式数据失败")?;

    if existing > 0 {
        linfo!(
            "system",
            LogStage::Seeding,
            LogComponent::Database,
            "api_formats_present",
            &format!("API 格式数据已存在 ({existing} 条记录)")
        );
        return Ok((0, 0));
    }

    let seeds: Vec<FormatSeed> =
        serde_json::from_str(API_FORMAT_SEED).context("解析 API 格式种子数据失败")?;

    let now = Utc::now().naive_utc();
    let txn = db.begin().await.context("开启事务失败")?;
    let mut endpoint_count = 0;

    for seed in &seeds {
        let metadata = if seed.metadata.is_null() {
            None
        } else {
            Some(seed.metadata.to_string())
        };

        let format = api_formats::ActiveModel {
            unique_name: Set(seed.unique_name.clone()),
            display_name: Set(seed.display_name.clone()),
            base_url: Set(seed.base_url.clone()),
            metadata: Set(metadata),
            provider_class: Set(seed.provider_class.clone()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .with_context(|| format!("插入 API 格式失败: {}", seed.unique_name))?;

        for endpoint in &seed.endpoints {
            api_format_endpoints::ActiveModel {
                api_format_id: Set(format.id),
                name: Set(endpoint.name.clone()),
                path: Set(endpoint.path.clone()),
                method: Set(endpoint.method.to_uppercase()),
                is_active: Set(true),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(&txn)
            .await
            .with_context(|| format!("插入端点失败: {} {}", seed.unique_name, endpoint.name))?;
            endpoint_count += 1;
        }

        ldebug!(
            "system",
            LogStage::Seeding,
            LogComponent::Database,
            "api_format_seeded",
            &format!("写入 API 格式: {}", seed.unique_name),
            endpoints = seed.endpoints.len()
        );
    }

    txn.commit().await.context("提交事务失败")?;

    linfo!(
        "system",
        LogStage::Seeding,
        LogComponent::Database,
        "api_formats_seeded",
        &format!(
            "API 格式初始化完成: {} 个格式, {} 个端点",
            seeds.len(),
            endpoint_count
        )
    );
    Ok((seeds.len(), endpoint_count))
}

/// 确保默认邮件模板存在，只补齐缺失的 (type, language)
pub async fn ensure_mail_template_data(db: &DatabaseConnection) -> Result<usize> {
    let seeds: Vec<MailTemplateSeed> =
        serde_json::from_str(MAIL_TEMPLATE_SEED).context("解析邮件模板种子数据失败")?;

    let now = Utc::now().naive_utc();
    let mut inserted = 0;

    for seed in seeds {
        let exists = mail_templates::Entity::find()
            .filter(mail_templates::Column::TemplateType.eq(seed.template_type.as_str()))
            .filter(mail_templates::Column::Language.eq(seed.language.as_str()))
            .count(db)
            .await
            .context("查询邮件模板失败")?
            > 0;
        if exists {
            continue;
        }

        mail_templates::ActiveModel {
            template_type: Set(seed.template_type.clone()),
            language: Set(seed.language.clone()),
            description: Set(seed.description),
            subject: Set(seed.subject),
            body: Set(seed.body),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
        .with_context(|| {
            format!(
                "插入邮件模板失败: {}/{}",
                seed.template_type, seed.language
            )
        })?;
        inserted += 1;
    }

    linfo!(
        "system",
        LogStage::Seeding,
        LogComponent::Database,
        "mail_templates_seeded",
        &format!("邮件模板初始化完成, 新增 {inserted} 条")
    );
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_files_parse() {
        let formats: Vec<FormatSeed> = serde_json::from_str(API_FORMAT_SEED).unwrap();
        let names: Vec<_> = formats.iter().map(|f| f.unique_name.as_str()).collect();
        assert_eq!(
            names,
            vec!["openai-api", "ollama-api", "google-api", "anthropic-api"]
        );

        let templates: Vec<MailTemplateSeed> = serde_json::from_str(MAIL_TEMPLATE_SEED).unwrap();
        assert_eq!(templates.len(), 10);
        assert!(
            templates
                .iter()
                .all(|t| t.language == "en" || t.language == "de")
        );
    }

    #[tokio::test]
    async fn test_seeding_is_idempotent() {
        let db = crate::testing::create_test_db().await.unwrap();

        let first = ensure_default_data(&db).await.unwrap();
        assert_eq!(first.api_formats, 4);
        assert_eq!(first.endpoints, 13);
        assert_eq!(first.mail_templates, 10);

        let second = ensure_default_data(&db).await.unwrap();
        assert_eq!(second, SeedReport::default());
    }
}
