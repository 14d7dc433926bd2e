//! # 外部服务 Mock
//!
//! 基于 wiremock 的服务商模型目录模拟服务器

use serde_json::Value;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// 模拟服务商 HTTP 服务
pub struct MockProviderServer {
    server: MockServer,
}

impl MockProviderServer {
    /// 启动模拟服务器
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// 服务器基础地址
    #[must_use]
    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// 以 Bearer 认证返回模型列表
    pub async fn mock_models_bearer(&self, models_path: &str, api_key: &str, body: Value) {
        Mock::given(method("GET"))
            .and(path(models_path))
            .and(header("authorization", format!("Bearer {api_key}").as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// 以查询参数 `key` 认证返回模型列表
    pub async fn mock_models_query_key(&self, models_path: &str, api_key: &str, body: Value) {
        Mock::given(method("GET"))
            .and(path(models_path))
            .and(query_param("key", api_key))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// 返回错误状态
    pub async fn mock_error(&self, request_path: &str, status: u16, error_message: &str) {
        Mock::given(path(request_path))
            .respond_with(
                ResponseTemplate::new(status)
                    .set_body_json(serde_json::json!({"error": {"message": error_message}})),
            )
            .mount(&self.server)
            .await;
    }

    /// 已收到的请求
    pub async fn received_requests(&self) -> Vec<wiremock::Request> {
        self.server.received_requests().await.unwrap_or_default()
    }
}
