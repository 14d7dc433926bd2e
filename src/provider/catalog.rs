//! # 模型目录同步
//!
//! 从服务商的模型列表接口拉取模型并写入 `ai_models`。已存在的模型只刷新
//! `display_order` 与 `information`，管理员修改过的名称和开关保持不变；
//! 新模型默认停用且不可见。

use async_trait::async_trait;
use chrono::Utc;
use entity::{ai_models, api_providers};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    Set,
};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::time::Duration;

use super::resolver::{EndpointResolver, db_error, join_endpoint_url};
use super::service::ProviderService;
use crate::error::{AdminError, Result};
use crate::logging::{LogComponent, LogStage};
use crate::{ldebug, linfo, lwarn};

/// 模型列表接口的原始响应
#[derive(Debug, Clone, PartialEq)]
pub struct SourceResponse {
    pub status: u16,
    /// 非 JSON 响应体以字符串保存
    pub body: Value,
}

impl SourceResponse {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// 模型列表来源
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ModelSource: Send + Sync {
    /// 以 GET 请求拉取模型列表
    async fn fetch(&self, url: &str, headers: &BTreeMap<String, String>) -> Result<SourceResponse>;
}

/// 基于 reqwest 的模型列表来源
#[derive(Debug, Clone)]
pub struct HttpModelSource {
    http_client: reqwest::Client,
}

impl HttpModelSource {
    #[must_use]
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(30))
    }

    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("ai-admin/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        Self {
            http_client: client,
        }
    }
}

impl Default for HttpModelSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModelSource for HttpModelSource {
    async fn fetch(&self, url: &str, headers: &BTreeMap<String, String>) -> Result<SourceResponse> {
        let mut request = self.http_client.get(url);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| AdminError::network_with_source(format!("请求失败: {url}"), e))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| AdminError::network_with_source(format!("读取响应失败: {url}"), e))?;

        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
        Ok(SourceResponse { status, body })
    }
}

/// 连接测试结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionTestResult {
    pub success: bool,
    pub message: String,
    pub endpoint: Option<String>,
    pub status_code: Option<u16>,
}

/// 从接口数据中提取的模型
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogModel {
    pub model_id: String,
    pub label: String,
    pub information: Map<String, Value>,
}

/// 同步统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    pub total: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
}

/// 将不同服务商的响应统一为模型数组
///
/// 支持 `{"models": [...]}`、`{"data": [...]}`、单个模型对象和数组。
#[must_use]
pub fn normalize_payload(payload: Value) -> Vec<Value> {
    match payload {
        Value::Array(models) => models,
        Value::Object(mut object) => {
            if let Some(Value::Array(models)) = object.remove("models") {
                return models;
            }
            if let Some(Value::Array(models)) = object.remove("data") {
                return models;
            }
            if object.contains_key("id") || object.contains_key("name") {
                vec![Value::Object(object)]
            } else {
                Vec::new()
            }
        }
        _ => Vec::new(),
    }
}

fn clean_model_id(raw: &str) -> &str {
    raw.strip_prefix("models/").unwrap_or(raw)
}

/// 从单条原始数据提取模型；没有可用 id 时返回 `None`
#[must_use]
pub fn extract_model(raw: &Value) -> Option<CatalogModel> {
    let mut information = Map::new();
    information.insert("source".to_string(), Value::String("direct_http".to_string()));

    match raw {
        Value::String(id) => {
            let model_id = clean_model_id(id.trim());
            if model_id.is_empty() {
                return None;
            }
            Some(CatalogModel {
                model_id: model_id.to_string(),
                label: model_id.to_string(),
                information,
            })
        }
        Value::Object(object) => {
            let field = |key: &str| {
                object
                    .get(key)
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|value| !value.is_empty())
            };

            let raw_id = field("id").or_else(|| field("name")).or_else(|| field("model"))?;
            let model_id = clean_model_id(raw_id);
            if model_id.is_empty() {
                return None;
            }
            let label = field("displayName")
                .or_else(|| field("display_name"))
                .or_else(|| field("name"))
                .or_else(|| field("id"))
                .unwrap_or(model_id);

            let mut merged = object.clone();
            merged.extend(information);
            Some(CatalogModel {
                model_id: model_id.to_string(),
                label: label.to_string(),
                information: merged,
            })
        }
        _ => None,
    }
}

/// 模型目录服务
pub struct ModelCatalogService<'a, S: ModelSource> {
    db: &'a DatabaseConnection,
    source: S,
}

impl<'a, S: ModelSource> ModelCatalogService<'a, S> {
    pub const fn new(db: &'a DatabaseConnection, source: S) -> Self {
        Self { db, source }
    }

    /// 模型列表地址与请求头；未定义 `models.list` 时回退到 `base_url + /models`
    async fn models_request(
        &self,
        provider: &api_providers::Model,
    ) -> Result<Option<(String, BTreeMap<String, String>)>> {
        let resolver = EndpointResolver::new(self.db);
        let url = match resolver.models_url(provider).await? {
            Some(url) => url,
            None => match provider
                .base_url
                .as_deref()
                .and_then(|base| join_endpoint_url(base, "/models"))
            {
                Some(url) => url,
                None => return Ok(None),
            },
        };

        let providers = ProviderService::new(self.db);
        let auth_style = providers.auth_style(provider).await?;
        let api_key = ProviderService::api_key(provider)?;

        let url = auth_style.apply_to_url(&url, api_key.as_deref())?;
        let headers = auth_style.build_headers(api_key.as_deref(), &provider.extra_headers());
        Ok(Some((url, headers)))
    }

    /// 测试服务商连通性与认证
    pub async fn test_connection(
        &self,
        provider: &api_providers::Model,
    ) -> Result<ConnectionTestResult> {
        if !provider.is_active {
            return Ok(ConnectionTestResult {
                success: false,
                message: "Provider is inactive".to_string(),
                endpoint: None,
                status_code: None,
            });
        }

        let Some((url, headers)) = self.models_request(provider).await? else {
            return Ok(ConnectionTestResult {
                success: false,
                message: "No base URL configured".to_string(),
                endpoint: None,
                status_code: None,
            });
        };

        let endpoint = Some(redact_key(&url));
        let result = match self.source.fetch(&url, &headers).await {
            Ok(response) if response.is_success() => ConnectionTestResult {
                success: true,
                message: "Connection successful".to_string(),
                endpoint,
                status_code: Some(response.status),
            },
            Ok(response) => ConnectionTestResult {
                success: false,
                message: format!("HTTP {}", response.status),
                endpoint,
                status_code: Some(response.status),
            },
            Err(err) => ConnectionTestResult {
                success: false,
                message: err.to_string(),
                endpoint,
                status_code: None,
            },
        };

        linfo!(
            "system",
            LogStage::ExternalApi,
            LogComponent::Catalog,
            "test_connection",
            &format!(
                "连接测试 {}: {}",
                provider.unique_name,
                if result.success { "成功" } else { "失败" }
            ),
            status_code = result.status_code.unwrap_or(0)
        );
        Ok(result)
    }

    /// 拉取服务商的模型列表（未入库）
    pub async fn fetch_models(&self, provider: &api_providers::Model) -> Result<Vec<Value>> {
        if !provider.is_active {
            return Err(AdminError::validation(format!(
                "Provider is inactive: {}",
                provider.unique_name
            )));
        }

        let (url, headers) = self
            .models_request(provider)
            .await?
            .ok_or_else(|| AdminError::config("No base URL configured"))?;

        let response = self.source.fetch(&url, &headers).await?;
        if !response.is_success() {
            return Err(AdminError::network(format!(
                "Provider returned HTTP {} for {}",
                response.status,
                redact_key(&url)
            )));
        }

        let models = normalize_payload(response.body);
        ldebug!(
            "system",
            LogStage::ExternalApi,
            LogComponent::Catalog,
            "fetch_models",
            &format!("服务商 {} 返回 {} 个模型", provider.unique_name, models.len())
        );
        Ok(models)
    }

    /// 拉取并同步模型
    pub async fn sync_provider(&self, provider: &api_providers::Model) -> Result<SyncStats> {
        let models = self.fetch_models(provider).await?;
        self.sync_models(provider, &models).await
    }

    /// 将模型列表写入数据库
    pub async fn sync_models(
        &self,
        provider: &api_providers::Model,
        models: &[Value],
    ) -> Result<SyncStats> {
        let mut stats = SyncStats {
            total: models.len(),
            ..SyncStats::default()
        };
        let now = Utc::now().naive_utc();
        let last_sync = Value::String(Utc::now().to_rfc3339());

        for (index, raw) in models.iter().enumerate() {
            let Some(model) = extract_model(raw) else {
                lwarn!(
                    "system",
                    LogStage::ExternalApi,
                    LogComponent::Catalog,
                    "skip_model",
                    &format!("跳过无 id 的模型数据: {}", provider.unique_name)
                );
                stats.skipped += 1;
                continue;
            };
            let display_order = i32::try_from(index).unwrap_or(i32::MAX);

            let existing = ai_models::Entity::find()
                .filter(ai_models::Column::ProviderId.eq(provider.id))
                .filter(ai_models::Column::ModelId.eq(model.model_id.as_str()))
                .one(self.db)
                .await
                .map_err(|err| db_error("查询模型失败", &err))?;

            if let Some(existing) = existing {
                let mut information = match existing.information_json() {
                    Value::Object(map) => map,
                    _ => Map::new(),
                };
                information.extend(model.information);
                information.insert("last_sync".to_string(), last_sync.clone());
                information.insert(
                    "original_api_label".to_string(),
                    Value::String(model.label),
                );

                let mut active = existing.into_active_model();
                active.display_order = Set(display_order);
                active.information = Set(Some(Value::Object(information).to_string()));
                active.updated_at = Set(now);
                active
                    .update(self.db)
                    .await
                    .map_err(|err| db_error("更新模型失败", &err))?;
                stats.updated += 1;
            } else {
                let mut information = model.information;
                information.insert("last_sync".to_string(), last_sync.clone());
                information.insert(
                    "original_api_label".to_string(),
                    Value::String(model.label.clone()),
                );

                ai_models::ActiveModel {
                    system_id: Set(uuid::Uuid::new_v4().to_string()),
                    model_id: Set(model.model_id),
                    label: Set(model.label),
                    provider_id: Set(provider.id),
                    is_active: Set(false),
                    streamable: Set(true),
                    is_visible: Set(false),
                    display_order: Set(display_order),
                    information: Set(Some(Value::Object(information).to_string())),
                    settings: Set(None),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                }
                .insert(self.db)
                .await
                .map_err(|err| db_error("创建模型失败", &err))?;
                stats.created += 1;
            }
        }

        linfo!(
            "system",
            LogStage::Db,
            LogComponent::Catalog,
            "sync_models",
            &format!("服务商 {} 模型同步完成", provider.unique_name),
            total = stats.total,
            created = stats.created,
            updated = stats.updated,
            skipped = stats.skipped
        );
        Ok(stats)
    }
}

/// 隐去地址中的 `key` 查询参数
fn redact_key(url: &str) -> String {
    let Ok(mut parsed) = url::Url::parse(url) else {
        return url.to_string();
    };
    if !parsed.query_pairs().any(|(name, _)| name == "key") {
        return url.to_string();
    }

    let pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .map(|(name, value)| {
            let value = if name == "key" { "***".to_string() } else { value.into_owned() };
            (name.into_owned(), value)
        })
        .collect();
    parsed.query_pairs_mut().clear().extend_pairs(pairs);
    parsed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_normalize_payload_shapes() {
        assert_eq!(normalize_payload(json!({"data": [{"id": "a"}, {"id": "b"}]})).len(), 2);
        assert_eq!(normalize_payload(json!({"models": [{"name": "models/x"}]})).len(), 1);
        assert_eq!(normalize_payload(json!([{"id": "a"}])).len(), 1);
        assert_eq!(normalize_payload(json!({"id": "single"})).len(), 1);
        assert!(normalize_payload(json!({"object": "list"})).is_empty());
        assert!(normalize_payload(json!("text")).is_empty());
    }

    #[test]
    fn test_extract_model_google_shape() {
        let model = extract_model(&json!({
            "name": "models/gemini-1.5-pro",
            "displayName": "Gemini 1.5 Pro",
            "inputTokenLimit": 1_048_576
        }))
        .unwrap();

        assert_eq!(model.model_id, "gemini-1.5-pro");
        assert_eq!(model.label, "Gemini 1.5 Pro");
        assert_eq!(model.information.get("source"), Some(&json!("direct_http")));
        assert_eq!(model.information.get("inputTokenLimit"), Some(&json!(1_048_576)));
    }

    #[test]
    fn test_extract_model_fallbacks() {
        let openai = extract_model(&json!({"id": "gpt-4o", "owned_by": "openai"})).unwrap();
        assert_eq!(openai.model_id, "gpt-4o");
        assert_eq!(openai.label, "gpt-4o");

        let ollama = extract_model(&json!({"model": "llama3:8b", "name": "Llama 3"})).unwrap();
        assert_eq!(ollama.model_id, "Llama 3");

        let plain = extract_model(&json!("models/text-embedding-004")).unwrap();
        assert_eq!(plain.model_id, "text-embedding-004");

        assert!(extract_model(&json!({"object": "model"})).is_none());
        assert!(extract_model(&json!(42)).is_none());
    }

    #[test]
    fn test_redact_key() {
        assert_eq!(
            redact_key("https://x.test/models?key=secret"),
            "https://x.test/models?key=***"
        );
        assert_eq!(redact_key("https://x.test/models"), "https://x.test/models");
    }

    #[tokio::test]
    async fn test_fetch_models_with_mock_source() {
        let tdb = crate::testing::TestDatabase::new().await.unwrap();
        let format = tdb
            .insert_format(
                crate::testing::ApiFormatFixture::new("ollama-api"),
                &[crate::testing::EndpointFixture::new("models.list", "/api/tags")],
            )
            .await
            .unwrap();
        let provider = tdb
            .insert_provider(
                crate::testing::ProviderFixture::new("ollama")
                    .format(format.id)
                    .base_url(Some("http://localhost:11434/")),
            )
            .await
            .unwrap();

        let mut source = MockModelSource::new();
        source
            .expect_fetch()
            .withf(|url, headers| {
                url == "http://localhost:11434/api/tags" && !headers.contains_key("authorization")
            })
            .times(1)
            .returning(|_, _| {
                Ok(SourceResponse {
                    status: 200,
                    body: json!({"models": [{"name": "llama3"}, {"name": "mistral"}]}),
                })
            });

        let service = ModelCatalogService::new(tdb.db(), source);
        let models = service.fetch_models(&provider).await.unwrap();
        assert_eq!(models.len(), 2);
    }

    #[tokio::test]
    async fn test_inactive_provider_connection() {
        let tdb = crate::testing::TestDatabase::new().await.unwrap();
        let provider = tdb
            .insert_provider(crate::testing::ProviderFixture::new("off").inactive())
            .await
            .unwrap();

        let mut source = MockModelSource::new();
        source.expect_fetch().never();

        let service = ModelCatalogService::new(tdb.db(), source);
        let result = service.test_connection(&provider).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.message, "Provider is inactive");
        assert!(service.fetch_models(&provider).await.is_err());
    }

    #[tokio::test]
    async fn test_sync_over_http_bearer() {
        let crypto = crate::testing::install_test_crypto();
        let server = crate::testing::MockProviderServer::start().await;
        server
            .mock_models_bearer(
                "/v1/models",
                "sk-test",
                json!({"data": [{"id": "gpt-4o"}, {"id": "gpt-4o-mini"}]}),
            )
            .await;

        let tdb = crate::testing::TestDatabase::new().await.unwrap();
        let format = tdb
            .insert_format(
                crate::testing::ApiFormatFixture::openai(),
                &[crate::testing::EndpointFixture::new("models.list", "/models")],
            )
            .await
            .unwrap();
        let base_url = format!("{}/v1", server.uri());
        let provider = tdb
            .insert_provider(
                crate::testing::ProviderFixture::new("openai")
                    .format(format.id)
                    .base_url(Some(&base_url))
                    .stored_key(&crypto.seal("sk-test").unwrap()),
            )
            .await
            .unwrap();
        tdb.insert_model(
            crate::testing::ModelFixture::new(provider.id, "gpt-4o").label("Edited GPT-4o"),
        )
        .await
        .unwrap();

        let service = ModelCatalogService::new(tdb.db(), HttpModelSource::new());
        let stats = service.sync_provider(&provider).await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.created, 1);
        assert_eq!(stats.updated, 1);

        let edited = ai_models::Entity::find()
            .filter(ai_models::Column::ModelId.eq("gpt-4o"))
            .one(tdb.db())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(edited.label, "Edited GPT-4o");
        assert_eq!(
            edited.information_json().get("original_api_label"),
            Some(&json!("gpt-4o"))
        );

        let requests = server.received_requests().await;
        assert_eq!(requests.len(), 1);
    }

    #[tokio::test]
    async fn test_google_key_in_query() {
        let crypto = crate::testing::install_test_crypto();
        let server = crate::testing::MockProviderServer::start().await;
        server
            .mock_models_query_key(
                "/v1beta/models",
                "g-key",
                json!({"models": [{"name": "models/gemini-1.5-pro"}]}),
            )
            .await;

        let tdb = crate::testing::TestDatabase::new().await.unwrap();
        let format = tdb
            .insert_format(
                crate::testing::ApiFormatFixture::google(),
                &[crate::testing::EndpointFixture::new("models.list", "/models")],
            )
            .await
            .unwrap();
        let base_url = format!("{}/v1beta", server.uri());
        let provider = tdb
            .insert_provider(
                crate::testing::ProviderFixture::new("google")
                    .format(format.id)
                    .base_url(Some(&base_url))
                    .stored_key(&crypto.seal("g-key").unwrap()),
            )
            .await
            .unwrap();

        let service = ModelCatalogService::new(tdb.db(), HttpModelSource::new());
        let result = service.test_connection(&provider).await.unwrap();
        assert!(result.success, "{}", result.message);
        assert_eq!(result.status_code, Some(200));
        assert!(result.endpoint.unwrap().contains("key=***"));

        let requests = server.received_requests().await;
        assert!(
            requests
                .iter()
                .all(|request| !request.headers.contains_key("authorization"))
        );
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let server = crate::testing::MockProviderServer::start().await;
        server.mock_error("/models", 401, "invalid api key").await;

        let tdb = crate::testing::TestDatabase::new().await.unwrap();
        let provider = tdb
            .insert_provider(
                crate::testing::ProviderFixture::new("broken").base_url(Some(&server.uri())),
            )
            .await
            .unwrap();

        let service = ModelCatalogService::new(tdb.db(), HttpModelSource::new());
        let result = service.test_connection(&provider).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.status_code, Some(401));

        let err = service.fetch_models(&provider).await.unwrap_err();
        crate::assert_contains!(err.to_string(), "HTTP 401");
    }
}
