//! # 端点地址解析
//!
//! 服务商 `base_url` 与格式端点 `path` 拼接成完整请求地址。解析结果只在单个
//! [`EndpointResolver`] 生命周期内缓存，键里带上服务商的 `updated_at`，
//! 服务商被修改后不会命中旧地址。

use chrono::NaiveDateTime;
use dashmap::DashMap;
use entity::{api_format_endpoints, api_providers};
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder};
use std::collections::BTreeMap;

use crate::error::{AdminError, Result};
use crate::logging::{LogComponent, LogStage};
use crate::{ldebug, lerror};

/// 模型列表端点
pub const MODELS_LIST: &str = "models.list";
/// 向量化端点
pub const EMBEDDINGS_CREATE: &str = "embeddings.create";
/// 对话端点，按优先级排列
pub const CHAT_ENDPOINTS: [&str; 3] = ["chat.create", "responses.create", "completions.create"];

/// 拼接基础地址与端点路径，保证中间恰好一个斜杠
///
/// 基础地址为空时返回 `None`；路径为空时返回去掉尾部斜杠的基础地址。
#[must_use]
pub fn join_endpoint_url(base: &str, path: &str) -> Option<String> {
    let base = base.trim().trim_end_matches('/');
    if base.is_empty() {
        return None;
    }

    let path = path.trim().trim_start_matches('/');
    if path.is_empty() {
        return Some(base.to_string());
    }

    Some(format!("{base}/{path}"))
}

type MemoKey = (i32, NaiveDateTime, String);

/// 端点解析器
pub struct EndpointResolver<'a> {
    db: &'a DatabaseConnection,
    memo: DashMap<MemoKey, Option<String>>,
}

impl<'a> EndpointResolver<'a> {
    #[must_use]
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self {
            db,
            memo: DashMap::new(),
        }
    }

    /// 解析指定能力的完整地址；格式未定义该端点时返回 `None`
    pub async fn resolve_url(
        &self,
        provider: &api_providers::Model,
        endpoint_name: &str,
    ) -> Result<Option<String>> {
        let key = (provider.id, provider.updated_at, endpoint_name.to_string());
        if let Some(cached) = self.memo.get(&key) {
            return Ok(cached.clone());
        }

        let resolved = self.lookup(provider, endpoint_name).await?;
        ldebug!(
            "system",
            LogStage::Resolution,
            LogComponent::Resolver,
            "resolve_url",
            &format!(
                "解析端点 {}::{} -> {}",
                provider.unique_name,
                endpoint_name,
                resolved.as_deref().unwrap_or("<none>")
            )
        );

        self.memo.insert(key, resolved.clone());
        Ok(resolved)
    }

    async fn lookup(
        &self,
        provider: &api_providers::Model,
        endpoint_name: &str,
    ) -> Result<Option<String>> {
        let (Some(format_id), Some(base_url)) = (provider.api_format_id, provider.base_url.as_deref())
        else {
            return Ok(None);
        };

        let endpoint = api_format_endpoints::Entity::find()
            .filter(api_format_endpoints::Column::ApiFormatId.eq(format_id))
            .filter(api_format_endpoints::Column::Name.eq(endpoint_name))
            .filter(api_format_endpoints::Column::IsActive.eq(true))
            .one(self.db)
            .await
            .map_err(|err| db_error("查询格式端点失败", &err))?;

        Ok(endpoint.and_then(|endpoint| join_endpoint_url(base_url, &endpoint.path)))
    }

    /// 模型列表地址
    pub async fn models_url(&self, provider: &api_providers::Model) -> Result<Option<String>> {
        self.resolve_url(provider, MODELS_LIST).await
    }

    /// 对话地址：依次尝试 `chat.create`、`responses.create`、`completions.create`
    pub async fn chat_url(&self, provider: &api_providers::Model) -> Result<Option<String>> {
        for name in CHAT_ENDPOINTS {
            if let Some(url) = self.resolve_url(provider, name).await? {
                return Ok(Some(url));
            }
        }
        Ok(None)
    }

    /// 向量化地址
    pub async fn embeddings_url(&self, provider: &api_providers::Model) -> Result<Option<String>> {
        self.resolve_url(provider, EMBEDDINGS_CREATE).await
    }

    /// 服务商格式下所有启用端点的地址
    pub async fn all_endpoint_urls(
        &self,
        provider: &api_providers::Model,
    ) -> Result<BTreeMap<String, String>> {
        let mut urls = BTreeMap::new();
        let (Some(format_id), Some(base_url)) = (provider.api_format_id, provider.base_url.as_deref())
        else {
            return Ok(urls);
        };

        let endpoints = api_format_endpoints::Entity::find()
            .filter(api_format_endpoints::Column::ApiFormatId.eq(format_id))
            .filter(api_format_endpoints::Column::IsActive.eq(true))
            .order_by_asc(api_format_endpoints::Column::Name)
            .all(self.db)
            .await
            .map_err(|err| db_error("查询格式端点失败", &err))?;

        for endpoint in endpoints {
            let url = join_endpoint_url(base_url, &endpoint.path);
            self.memo.insert(
                (provider.id, provider.updated_at, endpoint.name.clone()),
                url.clone(),
            );
            if let Some(url) = url {
                urls.insert(endpoint.name, url);
            }
        }

        Ok(urls)
    }

    /// 服务商格式是否定义了启用的同名端点
    pub async fn has_endpoint(
        &self,
        provider: &api_providers::Model,
        endpoint_name: &str,
    ) -> Result<bool> {
        let Some(format_id) = provider.api_format_id else {
            return Ok(false);
        };

        let found = api_format_endpoints::Entity::find()
            .filter(api_format_endpoints::Column::ApiFormatId.eq(format_id))
            .filter(api_format_endpoints::Column::Name.eq(endpoint_name))
            .filter(api_format_endpoints::Column::IsActive.eq(true))
            .one(self.db)
            .await
            .map_err(|err| db_error("查询格式端点失败", &err))?;
        Ok(found.is_some())
    }

    /// 当前缓存的解析结果数
    #[must_use]
    pub fn cached_entries(&self) -> usize {
        self.memo.len()
    }
}

pub(crate) fn db_error(message: &str, err: &DbErr) -> AdminError {
    lerror!(
        "system",
        LogStage::Db,
        LogComponent::Resolver,
        "provider_db_error",
        &format!("{message}: {err}")
    );
    crate::error!(Database, format!("{message}: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case("https://api.openai.com/v1", "/models", "https://api.openai.com/v1/models")]
    #[case("https://api.openai.com/v1/", "models", "https://api.openai.com/v1/models")]
    #[case("https://api.openai.com/v1//", "//chat/completions", "https://api.openai.com/v1/chat/completions")]
    #[case("http://localhost:11434", "/api/tags", "http://localhost:11434/api/tags")]
    #[case(
        "https://generativelanguage.googleapis.com/v1beta",
        "/models/{model}:generateContent",
        "https://generativelanguage.googleapis.com/v1beta/models/{model}:generateContent"
    )]
    fn test_join_endpoint_url(#[case] base: &str, #[case] path: &str, #[case] expected: &str) {
        assert_eq!(join_endpoint_url(base, path).as_deref(), Some(expected));
    }

    #[test]
    fn test_join_endpoint_url_blank_parts() {
        assert_eq!(join_endpoint_url("", "/models"), None);
        assert_eq!(join_endpoint_url("  / ", "/models"), None);
        assert_eq!(
            join_endpoint_url("https://x.test/v1/", ""),
            Some("https://x.test/v1".to_string())
        );
    }

    proptest! {
        #[test]
        fn joined_url_has_exactly_one_separator(
            base in "https://[a-z]{1,12}\\.test(/[a-z0-9]{1,6}){0,2}",
            base_slashes in 0usize..3,
            path in "[a-z0-9]{1,8}(/[a-z0-9]{1,8}){0,2}",
            path_slashes in 0usize..3,
        ) {
            let full_base = format!("{base}{}", "/".repeat(base_slashes));
            let full_path = format!("{}{path}", "/".repeat(path_slashes));
            let joined = join_endpoint_url(&full_base, &full_path).unwrap();

            prop_assert_eq!(&joined, &format!("{base}/{path}"));
            prop_assert!(!joined["https://".len()..].contains("//"));
        }
    }
}
