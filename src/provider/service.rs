//! # 服务商服务
//!
//! 服务商查询与 API 密钥的加密存取。`api_key` 列只写入密文。

use chrono::Utc;
use entity::{api_format_endpoints, api_formats, api_providers};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};
use serde::Deserialize;

use super::auth::AuthStyle;
use super::resolver::db_error;
use crate::config::{decrypt_secret, encrypt_secret};
use crate::error::{AdminError, Result};
use crate::logging::{LogComponent, LogStage};
use crate::{ensure_validation, linfo};

/// 新建服务商参数
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewProvider {
    pub provider_name: String,
    pub unique_name: String,
    pub api_format_id: Option<i32>,
    /// 明文密钥，写入前加密
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub is_active: bool,
    pub display_order: i32,
    pub additional_settings: Option<serde_json::Value>,
}

/// 服务商服务
pub struct ProviderService<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> ProviderService<'a> {
    #[must_use]
    pub const fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// 创建服务商，密钥加密后保存
    pub async fn create(&self, input: NewProvider) -> Result<api_providers::Model> {
        ensure_validation!(
            !input.unique_name.trim().is_empty(),
            "服务商 unique_name 不能为空"
        );
        ensure_validation!(
            self.find_by_unique_name(&input.unique_name).await?.is_none(),
            "服务商 unique_name 已存在: {}",
            input.unique_name
        );

        let api_key = input
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .map(encrypt_secret)
            .transpose()?;

        let now = Utc::now().naive_utc();
        let provider = api_providers::ActiveModel {
            provider_name: Set(input.provider_name),
            unique_name: Set(input.unique_name),
            api_format_id: Set(input.api_format_id),
            api_key: Set(api_key),
            base_url: Set(input.base_url),
            is_active: Set(input.is_active),
            display_order: Set(input.display_order),
            additional_settings: Set(input.additional_settings.map(|s| s.to_string())),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(self.db)
        .await
        .map_err(|err| db_error("创建服务商失败", &err))?;

        linfo!(
            "system",
            LogStage::Db,
            LogComponent::Resolver,
            "provider_created",
            &format!("创建服务商: {}", provider.unique_name),
            has_api_key = provider.has_api_key()
        );
        Ok(provider)
    }

    /// 更新服务商密钥；传入空串时清除
    pub async fn set_api_key(
        &self,
        provider: api_providers::Model,
        api_key: &str,
    ) -> Result<api_providers::Model> {
        let stored = if api_key.is_empty() {
            None
        } else {
            Some(encrypt_secret(api_key)?)
        };

        let unique_name = provider.unique_name.clone();
        let mut active = provider.into_active_model();
        active.api_key = Set(stored);
        active.updated_at = Set(Utc::now().naive_utc());
        let updated = active
            .update(self.db)
            .await
            .map_err(|err| db_error("更新服务商密钥失败", &err))?;

        linfo!(
            "system",
            LogStage::Db,
            LogComponent::Crypto,
            "provider_key_updated",
            &format!("服务商密钥已更新: {unique_name}")
        );
        Ok(updated)
    }

    /// 解密后的服务商密钥
    pub fn api_key(provider: &api_providers::Model) -> Result<Option<String>> {
        provider
            .api_key
            .as_deref()
            .filter(|stored| !stored.is_empty())
            .map(decrypt_secret)
            .transpose()
    }

    /// 服务商所属格式
    pub async fn format_of(
        &self,
        provider: &api_providers::Model,
    ) -> Result<Option<api_formats::Model>> {
        let Some(format_id) = provider.api_format_id else {
            return Ok(None);
        };
        api_formats::Entity::find_by_id(format_id)
            .one(self.db)
            .await
            .map_err(|err| db_error("查询 API 格式失败", &err))
    }

    /// 服务商使用的认证方式
    pub async fn auth_style(&self, provider: &api_providers::Model) -> Result<AuthStyle> {
        let format = self.format_of(provider).await?;
        Ok(AuthStyle::for_format(
            format.as_ref().map(|f| f.unique_name.as_str()),
        ))
    }

    /// 格式中定义了指定端点的启用服务商
    pub async fn providers_with_endpoint(
        &self,
        endpoint_name: &str,
    ) -> Result<Vec<api_providers::Model>> {
        let format_ids: Vec<i32> = api_format_endpoints::Entity::find()
            .filter(api_format_endpoints::Column::Name.eq(endpoint_name))
            .filter(api_format_endpoints::Column::IsActive.eq(true))
            .all(self.db)
            .await
            .map_err(|err| db_error("查询格式端点失败", &err))?
            .into_iter()
            .map(|endpoint| endpoint.api_format_id)
            .collect();

        if format_ids.is_empty() {
            return Ok(Vec::new());
        }

        api_providers::Entity::find()
            .filter(api_providers::Column::IsActive.eq(true))
            .filter(api_providers::Column::ApiFormatId.is_in(format_ids))
            .order_by_asc(api_providers::Column::DisplayOrder)
            .order_by_asc(api_providers::Column::ProviderName)
            .all(self.db)
            .await
            .map_err(|err| db_error("查询服务商失败", &err))
    }

    /// 按名称查找启用的服务商
    pub async fn find_active_by_name(
        &self,
        provider_name: &str,
    ) -> Result<Option<api_providers::Model>> {
        api_providers::Entity::find()
            .filter(api_providers::Column::ProviderName.eq(provider_name))
            .filter(api_providers::Column::IsActive.eq(true))
            .order_by_asc(api_providers::Column::DisplayOrder)
            .one(self.db)
            .await
            .map_err(|err| db_error("查询服务商失败", &err))
    }

    /// 按唯一名查找服务商
    pub async fn find_by_unique_name(
        &self,
        unique_name: &str,
    ) -> Result<Option<api_providers::Model>> {
        api_providers::Entity::find()
            .filter(api_providers::Column::UniqueName.eq(unique_name))
            .one(self.db)
            .await
            .map_err(|err| db_error("查询服务商失败", &err))
    }

    /// 按唯一名查找服务商，不存在时返回 `NotFound`
    pub async fn get_by_unique_name(&self, unique_name: &str) -> Result<api_providers::Model> {
        self.find_by_unique_name(unique_name)
            .await?
            .ok_or_else(|| AdminError::not_found("Provider", unique_name))
    }

    /// 按 `display_order`、`provider_name` 排序的全部服务商
    pub async fn list_ordered(&self) -> Result<Vec<api_providers::Model>> {
        api_providers::Entity::find()
            .order_by_asc(api_providers::Column::DisplayOrder)
            .order_by_asc(api_providers::Column::ProviderName)
            .all(self.db)
            .await
            .map_err(|err| db_error("查询服务商列表失败", &err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ApiFormatFixture, ProviderFixture, TestDatabase};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_list_ordered_and_active_lookup() {
        let tdb = TestDatabase::new().await.unwrap();
        tdb.insert_provider(ProviderFixture::new("beta").name("Beta").order(1))
            .await
            .unwrap();
        tdb.insert_provider(ProviderFixture::new("zeta").name("Zeta"))
            .await
            .unwrap();
        tdb.insert_provider(ProviderFixture::new("alpha").name("Alpha").inactive())
            .await
            .unwrap();

        let service = ProviderService::new(tdb.db());
        let names: Vec<String> = service
            .list_ordered()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.unique_name)
            .collect();
        assert_eq!(names, vec!["alpha", "zeta", "beta"]);

        assert!(service.find_active_by_name("Alpha").await.unwrap().is_none());
        let beta = service.find_active_by_name("Beta").await.unwrap().unwrap();
        assert_eq!(beta.unique_name, "beta");
    }

    #[tokio::test]
    async fn test_auth_style_follows_format() {
        let tdb = TestDatabase::new().await.unwrap();
        let google = tdb
            .insert_format(ApiFormatFixture::google(), &[])
            .await
            .unwrap();
        let keyed = tdb
            .insert_provider(
                ProviderFixture::new("gemini")
                    .format(google.id)
                    .settings(serde_json::json!({"headers": {"X-Goog-User-Project": "p1"}})),
            )
            .await
            .unwrap();
        let bare = tdb
            .insert_provider(ProviderFixture::new("legacy"))
            .await
            .unwrap();

        let service = ProviderService::new(tdb.db());
        assert_eq!(
            service.auth_style(&keyed).await.unwrap(),
            AuthStyle::GoogleQueryKey
        );
        assert_eq!(service.auth_style(&bare).await.unwrap(), AuthStyle::Bearer);
        assert!(service.format_of(&bare).await.unwrap().is_none());
        assert_eq!(
            keyed.extra_headers(),
            vec![("X-Goog-User-Project".to_string(), "p1".to_string())]
        );
    }

    #[tokio::test]
    async fn test_get_by_unique_name_not_found() {
        let tdb = TestDatabase::new().await.unwrap();
        let err = ProviderService::new(tdb.db())
            .get_by_unique_name("missing")
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "Provider 'missing' not found");
    }
}
