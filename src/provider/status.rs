//! # 服务商配置状态
//!
//! 配置缺失只产生警告，不作为错误返回

use entity::{api_format_endpoints, api_providers};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::Serialize;

use super::auth::AuthStyle;
use super::resolver::{CHAT_ENDPOINTS, EndpointResolver, MODELS_LIST, db_error};
use super::service::ProviderService;
use crate::error::Result;
use crate::logging::{LogComponent, LogStage};
use crate::lwarn;

/// 服务商配置健康度
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderHealth {
    pub unique_name: String,
    pub auth_style: String,
    pub has_format: bool,
    pub has_base_url: bool,
    pub has_api_key: bool,
    /// 能解析出地址的启用端点数
    pub available_endpoints: usize,
    /// 格式下的端点总数
    pub total_endpoints: usize,
    pub warnings: Vec<String>,
}

/// 服务商配置检查
pub struct ProviderStatusService<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> ProviderStatusService<'a> {
    #[must_use]
    pub const fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// 汇总服务商的配置状态
    pub async fn health(&self, provider: &api_providers::Model) -> Result<ProviderHealth> {
        let total_endpoints = match provider.api_format_id {
            Some(format_id) => api_format_endpoints::Entity::find()
                .filter(api_format_endpoints::Column::ApiFormatId.eq(format_id))
                .all(self.db)
                .await
                .map_err(|err| db_error("查询格式端点失败", &err))?
                .len(),
            None => 0,
        };

        let resolver = EndpointResolver::new(self.db);
        let available_endpoints = resolver.all_endpoint_urls(provider).await?.len();
        let auth_style = ProviderService::new(self.db).auth_style(provider).await?;
        let warnings = self
            .configuration_warnings_with(provider, &resolver, auth_style)
            .await?;

        Ok(ProviderHealth {
            unique_name: provider.unique_name.clone(),
            auth_style: auth_style.to_string(),
            has_format: provider.api_format_id.is_some(),
            has_base_url: provider.parsed_base_url().is_some(),
            has_api_key: provider.has_api_key(),
            available_endpoints,
            total_endpoints,
            warnings,
        })
    }

    /// 面向管理员的配置警告
    pub async fn configuration_warnings(
        &self,
        provider: &api_providers::Model,
    ) -> Result<Vec<String>> {
        let resolver = EndpointResolver::new(self.db);
        let auth_style = ProviderService::new(self.db).auth_style(provider).await?;
        self.configuration_warnings_with(provider, &resolver, auth_style)
            .await
    }

    async fn configuration_warnings_with(
        &self,
        provider: &api_providers::Model,
        resolver: &EndpointResolver<'_>,
        auth_style: AuthStyle,
    ) -> Result<Vec<String>> {
        let mut warnings = Vec::new();

        if provider.api_format_id.is_none() {
            warnings.push("No API format assigned; no endpoints can be resolved".to_string());
        }
        if provider.parsed_base_url().is_none() {
            warnings.push("Base URL is missing or invalid".to_string());
        }
        if auth_style.requires_api_key() && !provider.has_api_key() {
            warnings.push("API key is not configured".to_string());
        }

        if provider.api_format_id.is_some() {
            if !resolver.has_endpoint(provider, MODELS_LIST).await? {
                warnings.push(format!(
                    "API format has no '{MODELS_LIST}' endpoint; model sync is unavailable"
                ));
            }

            let mut has_chat = false;
            for name in CHAT_ENDPOINTS {
                if resolver.has_endpoint(provider, name).await? {
                    has_chat = true;
                    break;
                }
            }
            if !has_chat {
                warnings.push("API format has no chat endpoint".to_string());
            }
        }

        if !warnings.is_empty() {
            lwarn!(
                "system",
                LogStage::Internal,
                LogComponent::ProviderStatus,
                "configuration_warnings",
                &format!(
                    "服务商 {} 存在 {} 条配置警告",
                    provider.unique_name,
                    warnings.len()
                )
            );
        }

        Ok(warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ApiFormatFixture, EndpointFixture, ProviderFixture, TestDatabase};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_health_counts_endpoints() {
        let tdb = TestDatabase::new().await.unwrap();
        let format = tdb
            .insert_format(
                ApiFormatFixture::openai(),
                &[
                    EndpointFixture::new("models.list", "/models"),
                    EndpointFixture::new("chat.create", "/chat/completions"),
                    EndpointFixture::new("embeddings.create", "/embeddings").inactive(),
                ],
            )
            .await
            .unwrap();
        let provider = tdb
            .insert_provider(
                ProviderFixture::new("openai")
                    .format(format.id)
                    .stored_key("ciphertext"),
            )
            .await
            .unwrap();

        let health = ProviderStatusService::new(tdb.db())
            .health(&provider)
            .await
            .unwrap();
        assert_eq!(health.available_endpoints, 2);
        assert_eq!(health.total_endpoints, 3);
        assert!(health.has_format && health.has_base_url && health.has_api_key);
        assert!(health.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_warnings_for_bare_provider() {
        let tdb = TestDatabase::new().await.unwrap();
        let provider = tdb
            .insert_provider(ProviderFixture::new("bare").base_url(None))
            .await
            .unwrap();

        let warnings = ProviderStatusService::new(tdb.db())
            .configuration_warnings(&provider)
            .await
            .unwrap();
        assert_eq!(
            warnings,
            vec![
                "No API format assigned; no endpoints can be resolved",
                "Base URL is missing or invalid",
                "API key is not configured",
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_chat_endpoint_warns() {
        let tdb = TestDatabase::new().await.unwrap();
        let format = tdb
            .insert_format(
                ApiFormatFixture::new("ollama-api"),
                &[EndpointFixture::new("models.list", "/api/tags")],
            )
            .await
            .unwrap();
        let provider = tdb
            .insert_provider(ProviderFixture::new("ollama").format(format.id))
            .await
            .unwrap();

        let warnings = ProviderStatusService::new(tdb.db())
            .configuration_warnings(&provider)
            .await
            .unwrap();
        assert_eq!(warnings, vec!["API format has no chat endpoint"]);
    }
}
