//! 模型目录同步集成测试（wiremock 模拟服务商）

mod common;

use ai_admin::provider::{HttpModelSource, ModelCatalogService};
use common::{create_provider, seeded_db};
use entity::ai_models;
use pretty_assertions::assert_eq;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, Set,
};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn anthropic_server(models: serde_json::Value) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .and(header("x-api-key", "sk-ant-test"))
        .and(header("anthropic-version", "2023-06-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(models))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn sync_creates_hidden_models_then_preserves_admin_edits() {
    let server = anthropic_server(json!({
        "data": [
            {"id": "claude-sonnet-4", "display_name": "Claude Sonnet 4"},
            {"id": "claude-haiku-3-5", "display_name": "Claude Haiku 3.5"}
        ]
    }))
    .await;

    let db = seeded_db().await;
    let base_url = format!("{}/v1", server.uri());
    let provider = create_provider(
        &db,
        "anthropic",
        Some("anthropic-api"),
        Some(&base_url),
        Some("sk-ant-test"),
    )
    .await;

    let catalog = ModelCatalogService::new(&db, HttpModelSource::new());
    let first = catalog.sync_provider(&provider).await.unwrap();
    assert_eq!((first.total, first.created, first.updated), (2, 2, 0));

    let created = ai_models::Entity::find()
        .filter(ai_models::Column::ProviderId.eq(provider.id))
        .order_by_asc(ai_models::Column::DisplayOrder)
        .all(&db)
        .await
        .unwrap();
    assert_eq!(created.len(), 2);
    assert_eq!(created[0].model_id, "claude-sonnet-4");
    assert_eq!(created[0].label, "Claude Sonnet 4");
    assert!(!created[0].is_active);
    assert!(!created[0].is_visible);
    assert_ne!(created[0].system_id, created[1].system_id);

    // 管理员修改标签和开关
    let mut edited = created[0].clone().into_active_model();
    edited.label = Set("Sonnet (default)".to_string());
    edited.is_active = Set(true);
    edited.is_visible = Set(true);
    edited.update(&db).await.unwrap();

    let second = catalog.sync_provider(&provider).await.unwrap();
    assert_eq!((second.total, second.created, second.updated), (2, 0, 2));

    let after = ai_models::Entity::find_by_id(created[0].id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.label, "Sonnet (default)");
    assert!(after.is_active);
    assert!(after.is_visible);
    assert_eq!(after.system_id, created[0].system_id);

    let information = after.information_json();
    assert_eq!(information["original_api_label"], json!("Claude Sonnet 4"));
    assert_eq!(information["source"], json!("direct_http"));
    assert!(information["last_sync"].is_string());
}

#[tokio::test]
async fn connection_test_reports_auth_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "unauthorized"})))
        .mount(&server)
        .await;

    let db = seeded_db().await;
    let base_url = format!("{}/v1", server.uri());
    let provider = create_provider(
        &db,
        "openai",
        Some("openai-api"),
        Some(&base_url),
        Some("sk-wrong"),
    )
    .await;

    let catalog = ModelCatalogService::new(&db, HttpModelSource::new());
    let result = catalog.test_connection(&provider).await.unwrap();
    assert!(!result.success);
    assert_eq!(result.status_code, Some(401));
    assert_eq!(result.message, "HTTP 401");

    let requests = server.received_requests().await.unwrap();
    assert_eq!(
        requests[0].headers.get("authorization").unwrap(),
        "Bearer sk-wrong"
    );
}

#[tokio::test]
async fn ollama_tags_sync_without_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [{"name": "llama3:8b"}, {"name": "mistral:7b"}, {"size": 1}]
        })))
        .mount(&server)
        .await;

    let db = seeded_db().await;
    let provider =
        create_provider(&db, "ollama", Some("ollama-api"), Some(&server.uri()), None).await;

    let stats = ModelCatalogService::new(&db, HttpModelSource::new())
        .sync_provider(&provider)
        .await
        .unwrap();
    assert_eq!((stats.total, stats.created, stats.skipped), (3, 2, 1));
}
