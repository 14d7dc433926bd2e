//! # 测试辅助函数
//!
//! 提供通用的测试工具和辅助函数

use sea_orm::{ActiveModelTrait, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use std::sync::Once;
use tempfile::TempDir;
use tracing::Level;

use crate::config::ConfigCrypto;
use crate::error::{AdminError, Result};
use crate::testing::fixtures::{
    ApiFormatFixture, EndpointFixture, ModelFixture, ProviderFixture, UsageRecordFixture,
};

static INIT: Once = Once::new();

/// 测试用固定密钥（64 位十六进制）
pub const TEST_ENCRYPTION_KEY: &str =
    "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

/// 初始化测试日志
pub fn init_test_env() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(Level::DEBUG)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// 创建内存数据库连接并运行迁移
pub async fn create_test_db() -> Result<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

/// 创建临时数据库文件
pub async fn create_temp_db() -> Result<(DatabaseConnection, TempDir)> {
    let temp_dir = tempfile::tempdir()
        .map_err(|e| AdminError::internal_with_source("创建临时目录失败", e))?;

    let db_path = temp_dir.path().join("test.db");
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());

    let db = Database::connect(&db_url).await?;
    migration::Migrator::up(&db, None).await?;

    Ok((db, temp_dir))
}

/// 安装测试用全局加密器（进程内只生效一次，重复调用无副作用）
pub fn install_test_crypto() -> &'static ConfigCrypto {
    if let Ok(crypto) = ConfigCrypto::global() {
        return crypto;
    }
    ConfigCrypto::from_hex(TEST_ENCRYPTION_KEY)
        .and_then(ConfigCrypto::install_global)
        .expect("安装测试加密器失败")
}

/// 断言错误类型
#[macro_export]
macro_rules! assert_error_type {
    ($result:expr, $error_type:pat) => {
        match $result {
            Err($error_type) => (),
            Err(other) => panic!("Expected error type, got: {:?}", other),
            Ok(val) => panic!("Expected error, got Ok: {:?}", val),
        }
    };
}

/// 断言包含文本
#[macro_export]
macro_rules! assert_contains {
    ($text:expr, $substring:expr) => {
        assert!(
            $text.contains($substring),
            "Text '{}' does not contain '{}'",
            $text,
            $substring
        );
    };
}

/// 带迁移的测试数据库，附带常用插入方法
pub struct TestDatabase {
    pub db: DatabaseConnection,
}

impl TestDatabase {
    /// 创建新的测试数据库
    pub async fn new() -> Result<Self> {
        let db = create_test_db().await?;
        Ok(Self { db })
    }

    /// 获取数据库连接引用
    pub const fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// 插入 API 格式及其端点
    pub async fn insert_format(
        &self,
        format: ApiFormatFixture,
        endpoints: &[EndpointFixture],
    ) -> Result<entity::api_formats::Model> {
        let format = format.to_active_model().insert(&self.db).await?;
        for endpoint in endpoints {
            endpoint
                .clone()
                .to_active_model(format.id)
                .insert(&self.db)
                .await?;
        }
        Ok(format)
    }

    /// 插入服务商
    pub async fn insert_provider(
        &self,
        fixture: ProviderFixture,
    ) -> Result<entity::api_providers::Model> {
        Ok(fixture.to_active_model().insert(&self.db).await?)
    }

    /// 插入模型
    pub async fn insert_model(&self, fixture: ModelFixture) -> Result<entity::ai_models::Model> {
        Ok(fixture.to_active_model().insert(&self.db).await?)
    }

    /// 插入用量记录
    pub async fn insert_usage(
        &self,
        fixture: UsageRecordFixture,
    ) -> Result<entity::usage_records::Model> {
        Ok(fixture.to_active_model().insert(&self.db).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{ConnectionTrait, EntityTrait, PaginatorTrait};

    #[tokio::test]
    async fn test_create_test_db() {
        init_test_env();
        let db = create_test_db().await.unwrap();
        assert_eq!(
            db.get_database_backend(),
            sea_orm::DatabaseBackend::Sqlite
        );
    }

    #[tokio::test]
    async fn test_create_temp_db() {
        let (db, temp_dir) = create_temp_db().await.unwrap();
        assert!(temp_dir.path().join("test.db").exists());
        let count = entity::ApiFormats::find().count(&db).await.unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_database_wrapper_inserts() {
        let tdb = TestDatabase::new().await.unwrap();
        let format = tdb
            .insert_format(
                ApiFormatFixture::openai(),
                &[EndpointFixture::new("models.list", "/models")],
            )
            .await
            .unwrap();
        let provider = tdb
            .insert_provider(ProviderFixture::new("openai").format(format.id))
            .await
            .unwrap();
        assert_eq!(provider.api_format_id, Some(format.id));
    }

    #[test]
    fn test_install_test_crypto_is_reentrant() {
        let first = install_test_crypto() as *const ConfigCrypto;
        let second = install_test_crypto() as *const ConfigCrypto;
        assert_eq!(first, second);
    }

    #[test]
    fn test_assert_macros() {
        assert_contains!("hello world", "world");

        let result: Result<()> = Err(AdminError::config("test"));
        assert_error_type!(result, AdminError::Config { .. });
    }
}
