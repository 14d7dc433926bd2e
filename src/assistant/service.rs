//! # 助手查询服务
//!
//! 可见性按 private < org < public 递增，`visible_to(level)` 返回可见性不低于该级别的助手

use entity::{
    ai_assistants::{self, AssistantStatus, AssistantVisibility},
    ai_models, api_providers,
};
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
};
use serde::Serialize;

use crate::error::{AdminError, Result};
use crate::logging::{LogComponent, LogStage};
use crate::{ldebug, lerror};

/// 助手引用的模型及其服务商
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedModel {
    pub model: ai_models::Model,
    pub provider: api_providers::Model,
}

/// 助手服务
pub struct AssistantService<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> AssistantService<'a> {
    #[must_use]
    pub const fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// 状态为 active 的助手
    pub async fn active(&self) -> Result<Vec<ai_assistants::Model>> {
        ai_assistants::Entity::find()
            .filter(ai_assistants::Column::Status.eq(AssistantStatus::Active))
            .order_by_asc(ai_assistants::Column::Name)
            .all(self.db)
            .await
            .map_err(|err| db_error("查询启用助手失败", &err))
    }

    /// 可见性不低于 `level` 的助手
    pub async fn visible_to(
        &self,
        level: AssistantVisibility,
    ) -> Result<Vec<ai_assistants::Model>> {
        ai_assistants::Entity::find()
            .filter(ai_assistants::Column::Visibility.is_in(AssistantVisibility::at_least(level)))
            .order_by_asc(ai_assistants::Column::Name)
            .all(self.db)
            .await
            .map_err(|err| db_error("按可见性查询助手失败", &err))
    }

    /// 指定用户拥有的助手（含草稿和归档）
    pub async fn owned_by(&self, user_id: i32) -> Result<Vec<ai_assistants::Model>> {
        ai_assistants::Entity::find()
            .filter(ai_assistants::Column::OwnerId.eq(user_id))
            .order_by_asc(ai_assistants::Column::Name)
            .all(self.db)
            .await
            .map_err(|err| db_error("查询用户助手失败", &err))
    }

    /// 按 key 查找助手
    pub async fn find_by_key(&self, key: &str) -> Result<Option<ai_assistants::Model>> {
        ai_assistants::Entity::find()
            .filter(ai_assistants::Column::Key.eq(key))
            .one(self.db)
            .await
            .map_err(|err| db_error("查询助手失败", &err))
    }

    /// 解析助手引用的模型；引用为空或悬空时返回 `None`
    pub async fn resolve_model(
        &self,
        assistant: &ai_assistants::Model,
    ) -> Result<Option<ResolvedModel>> {
        let Some(system_id) = assistant.ai_model.as_deref() else {
            return Ok(None);
        };

        let found = ai_models::Entity::find()
            .filter(ai_models::Column::SystemId.eq(system_id))
            .find_also_related(api_providers::Entity)
            .one(self.db)
            .await
            .map_err(|err| db_error("查询助手模型失败", &err))?;

        match found {
            Some((model, Some(provider))) => Ok(Some(ResolvedModel { model, provider })),
            _ => {
                ldebug!(
                    "system",
                    LogStage::Resolution,
                    LogComponent::Assistant,
                    "dangling_model",
                    &format!("助手 {} 引用的模型不存在: {system_id}", assistant.key)
                );
                Ok(None)
            }
        }
    }
}

fn db_error(message: &str, err: &DbErr) -> AdminError {
    lerror!(
        "system",
        LogStage::Db,
        LogComponent::Assistant,
        "assistant_db_error",
        &format!("{message}: {err}")
    );
    crate::error!(Database, format!("{message}: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{AssistantFixture, ModelFixture, ProviderFixture, TestDatabase};
    use pretty_assertions::assert_eq;
    use sea_orm::ActiveModelTrait;

    async fn insert(tdb: &TestDatabase, fixture: AssistantFixture) -> ai_assistants::Model {
        fixture.to_active_model().insert(tdb.db()).await.unwrap()
    }

    fn keys(assistants: &[ai_assistants::Model]) -> Vec<&str> {
        assistants.iter().map(|a| a.key.as_str()).collect()
    }

    #[tokio::test]
    async fn test_visibility_ladder() {
        let tdb = TestDatabase::new().await.unwrap();
        insert(&tdb, AssistantFixture::new("a_private").visibility(AssistantVisibility::Private)).await;
        insert(&tdb, AssistantFixture::new("b_org").visibility(AssistantVisibility::Org)).await;
        insert(&tdb, AssistantFixture::new("c_public")).await;

        let service = AssistantService::new(tdb.db());
        assert_eq!(
            keys(&service.visible_to(AssistantVisibility::Private).await.unwrap()),
            vec!["a_private", "b_org", "c_public"]
        );
        assert_eq!(
            keys(&service.visible_to(AssistantVisibility::Org).await.unwrap()),
            vec!["b_org", "c_public"]
        );
        assert_eq!(
            keys(&service.visible_to(AssistantVisibility::Public).await.unwrap()),
            vec!["c_public"]
        );
    }

    #[tokio::test]
    async fn test_active_and_owned() {
        let tdb = TestDatabase::new().await.unwrap();
        insert(&tdb, AssistantFixture::new("live").owner(7)).await;
        insert(
            &tdb,
            AssistantFixture::new("draft")
                .status(AssistantStatus::Draft)
                .owner(7),
        )
        .await;
        insert(
            &tdb,
            AssistantFixture::new("old").status(AssistantStatus::Archived),
        )
        .await;

        let service = AssistantService::new(tdb.db());
        assert_eq!(keys(&service.active().await.unwrap()), vec!["live"]);
        assert_eq!(keys(&service.owned_by(7).await.unwrap()), vec!["draft", "live"]);
        assert!(service.find_by_key("old").await.unwrap().is_some());
        assert!(service.find_by_key("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_resolve_model() {
        let tdb = TestDatabase::new().await.unwrap();
        let provider = tdb
            .insert_provider(ProviderFixture::new("openai"))
            .await
            .unwrap();
        tdb.insert_model(ModelFixture::new(provider.id, "gpt-4o").system_id("sys-gpt-4o"))
            .await
            .unwrap();

        tdb.insert_model(ModelFixture::new(provider.id, "gpt-3.5").system_id("sys-gpt-3.5"))
            .await
            .unwrap();

        let linked = insert(&tdb, AssistantFixture::new("linked").model("sys-gpt-4o")).await;
        let retired = insert(&tdb, AssistantFixture::new("retired").model("sys-gpt-3.5")).await;
        let bare = insert(&tdb, AssistantFixture::new("bare")).await;

        ai_models::Entity::delete_many()
            .filter(ai_models::Column::SystemId.eq("sys-gpt-3.5"))
            .exec(tdb.db())
            .await
            .unwrap();

        let service = AssistantService::new(tdb.db());
        let resolved = service.resolve_model(&linked).await.unwrap().unwrap();
        assert_eq!(resolved.model.model_id, "gpt-4o");
        assert_eq!(resolved.provider.unique_name, "openai");

        // 已读取的助手仍引用被删除的模型
        assert_eq!(retired.ai_model.as_deref(), Some("sys-gpt-3.5"));
        assert!(service.resolve_model(&retired).await.unwrap().is_none());

        // 删除模型后数据库中的引用被置空
        let reloaded = service.find_by_key("retired").await.unwrap().unwrap();
        assert_eq!(reloaded.ai_model, None);
        assert!(service.resolve_model(&reloaded).await.unwrap().is_none());
        assert!(service.resolve_model(&bare).await.unwrap().is_none());
    }
}
