//! 服务商密钥加密存储集成测试

mod common;

use ai_admin::provider::ProviderService;
use common::{create_provider, install_crypto, seeded_db};
use entity::api_providers;
use pretty_assertions::assert_eq;
use sea_orm::EntityTrait;

const PLAINTEXT: &str = "sk-live-0123456789abcdef";

#[tokio::test]
async fn stored_key_never_contains_plaintext() {
    let db = seeded_db().await;
    let provider = create_provider(
        &db,
        "openai",
        Some("openai-api"),
        Some("https://api.openai.com/v1"),
        Some(PLAINTEXT),
    )
    .await;

    let row = api_providers::Entity::find_by_id(provider.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    let stored = row.api_key.clone().unwrap();
    assert!(!stored.contains(PLAINTEXT));
    assert_ne!(stored, PLAINTEXT);

    let decrypted = ProviderService::api_key(&row).unwrap();
    assert_eq!(decrypted.as_deref(), Some(PLAINTEXT));
}

#[tokio::test]
async fn set_api_key_replaces_and_clears() {
    let crypto = install_crypto();
    let db = seeded_db().await;
    let provider = create_provider(&db, "anthropic", Some("anthropic-api"), None, None).await;
    assert!(!provider.has_api_key());
    assert_eq!(ProviderService::api_key(&provider).unwrap(), None);

    let service = ProviderService::new(&db);
    let updated = service.set_api_key(provider, "sk-ant-1").await.unwrap();
    let stored = updated.api_key.clone().unwrap();
    assert_eq!(crypto.open(&stored).unwrap(), "sk-ant-1");

    // 同一明文两次加密得到不同密文
    let again = service.set_api_key(updated, "sk-ant-1").await.unwrap();
    assert_ne!(again.api_key.clone().unwrap(), stored);

    let cleared = service.set_api_key(again, "").await.unwrap();
    assert!(!cleared.has_api_key());
    assert_eq!(ProviderService::api_key(&cleared).unwrap(), None);
}

#[tokio::test]
async fn duplicate_unique_name_is_rejected() {
    let db = seeded_db().await;
    create_provider(&db, "dup", None, None, None).await;

    let err = ProviderService::new(&db)
        .create(ai_admin::provider::NewProvider {
            provider_name: "Dup".to_string(),
            unique_name: "dup".to_string(),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ai_admin::AdminError::Validation { .. }));
}
