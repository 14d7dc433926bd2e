//! # 公告服务
//!
//! 生效窗口两端都包含；`starts_at`/`expires_at` 为空表示不限

use chrono::{NaiveDateTime, Utc};
use entity::announcements::{self, AnnouncementType};
use entity::announcement_translations;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;

use crate::error::{AdminError, Result};
use crate::logging::{LogComponent, LogStage};
use crate::{ensure_validation, ldebug, lerror, linfo};

/// 找不到请求语言的译文时使用的语言
pub const FALLBACK_LOCALE: &str = "en_US";
/// 没有任何译文时的正文
pub const MISSING_CONTENT: &str =
    "# Content not available\n\nNo translation found for this announcement.";
/// 新闻列表每页条数
pub const NEWS_PAGE_SIZE: u64 = 10;

/// 新建公告参数
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewAnnouncement {
    pub title: String,
    pub view: String,
    #[serde(rename = "type", default)]
    pub announcement_type: AnnouncementType,
    #[serde(default)]
    pub is_forced: bool,
    #[serde(default = "default_global")]
    pub is_global: bool,
    /// 非全局公告的目标角色
    #[serde(default)]
    pub target_roles: Vec<String>,
    #[serde(default)]
    pub anchor: Option<String>,
    #[serde(default)]
    pub starts_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub expires_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub is_published: bool,
}

const fn default_global() -> bool {
    true
}

/// 全局公告对所有人可见；其余公告要求至少命中一个目标角色
#[must_use]
pub fn is_visible_to(announcement: &announcements::Model, roles: &[String]) -> bool {
    if announcement.is_global {
        return true;
    }
    let targets = announcement.target_role_list();
    roles.iter().any(|role| targets.contains(role))
}

/// 公告服务
pub struct AnnouncementService<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> AnnouncementService<'a> {
    #[must_use]
    pub const fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// 创建公告
    pub async fn create(&self, input: NewAnnouncement) -> Result<announcements::Model> {
        ensure_validation!(!input.title.trim().is_empty(), "公告标题不能为空");
        ensure_validation!(!input.view.trim().is_empty(), "公告 view 不能为空");
        if let (Some(starts_at), Some(expires_at)) = (input.starts_at, input.expires_at) {
            ensure_validation!(
                expires_at >= starts_at,
                "公告过期时间 {} 早于开始时间 {}",
                expires_at,
                starts_at
            );
        }

        // 全局公告不保存目标角色
        let target_roles = if input.is_global || input.target_roles.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&input.target_roles)?)
        };

        let now = Utc::now().naive_utc();
        let created = announcements::ActiveModel {
            title: Set(input.title),
            view: Set(input.view),
            announcement_type: Set(input.announcement_type),
            is_published: Set(input.is_published),
            is_forced: Set(input.is_forced),
            is_global: Set(input.is_global),
            target_roles: Set(target_roles),
            anchor: Set(input.anchor.filter(|anchor| !anchor.trim().is_empty())),
            starts_at: Set(input.starts_at),
            expires_at: Set(input.expires_at),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(self.db)
        .await
        .map_err(|err| db_error("创建公告失败", &err))?;

        linfo!(
            "system",
            LogStage::Db,
            LogComponent::Announcement,
            "announcement_created",
            &format!("公告已创建: {} ({})", created.view, created.id),
            published = created.is_published
        );
        Ok(created)
    }

    /// 按 ID 查找公告，不存在时返回 `NotFound`
    pub async fn find(&self, id: i32) -> Result<announcements::Model> {
        announcements::Entity::find_by_id(id)
            .one(self.db)
            .await
            .map_err(|err| db_error("查询公告失败", &err))?
            .ok_or_else(|| AdminError::not_found("Announcement", id.to_string()))
    }

    /// 按 ID 排序的全部公告
    pub async fn list(&self) -> Result<Vec<announcements::Model>> {
        announcements::Entity::find()
            .order_by_asc(announcements::Column::Id)
            .all(self.db)
            .await
            .map_err(|err| db_error("查询公告列表失败", &err))
    }

    /// 在 `now` 时处于生效窗口内的公告（不区分是否已发布）
    pub async fn active_at(&self, now: NaiveDateTime) -> Result<Vec<announcements::Model>> {
        announcements::Entity::find()
            .filter(
                Condition::any()
                    .add(announcements::Column::StartsAt.is_null())
                    .add(announcements::Column::StartsAt.lte(now)),
            )
            .filter(
                Condition::any()
                    .add(announcements::Column::ExpiresAt.is_null())
                    .add(announcements::Column::ExpiresAt.gte(now)),
            )
            .order_by_asc(announcements::Column::Id)
            .all(self.db)
            .await
            .map_err(|err| db_error("查询生效公告失败", &err))
    }

    /// 已发布、生效且对给定角色可见的公告
    pub async fn published_for_roles(
        &self,
        now: NaiveDateTime,
        roles: &[String],
    ) -> Result<Vec<announcements::Model>> {
        Ok(self
            .active_at(now)
            .await?
            .into_iter()
            .filter(|announcement| announcement.is_published && is_visible_to(announcement, roles))
            .collect())
    }

    /// 最新的生效政策公告
    pub async fn latest_policy(&self, now: NaiveDateTime) -> Result<announcements::Model> {
        let mut policies: Vec<_> = self
            .active_at(now)
            .await?
            .into_iter()
            .filter(|announcement| announcement.announcement_type == AnnouncementType::Policy)
            .collect();
        policies.sort_by(|a, b| b.starts_at.cmp(&a.starts_at).then(b.id.cmp(&a.id)));
        policies
            .into_iter()
            .next()
            .ok_or_else(|| AdminError::not_found("Announcement", "policy"))
    }

    /// 已发布的新闻，按开始时间倒序分页，`page` 从 0 开始
    pub async fn news(&self, page: u64) -> Result<Vec<announcements::Model>> {
        announcements::Entity::find()
            .filter(announcements::Column::AnnouncementType.eq(AnnouncementType::News))
            .filter(announcements::Column::IsPublished.eq(true))
            .order_by_desc(announcements::Column::StartsAt)
            .order_by_desc(announcements::Column::Id)
            .paginate(self.db, NEWS_PAGE_SIZE)
            .fetch_page(page)
            .await
            .map_err(|err| db_error("查询新闻失败", &err))
    }

    /// 发布公告
    pub async fn publish(&self, id: i32) -> Result<announcements::Model> {
        self.set_published(id, true).await
    }

    /// 取消发布；系统公告不可取消发布
    pub async fn unpublish(&self, id: i32) -> Result<announcements::Model> {
        self.set_published(id, false).await
    }

    async fn set_published(&self, id: i32, published: bool) -> Result<announcements::Model> {
        let announcement = self.find(id).await?;
        ensure_validation!(
            published || announcement.announcement_type != AnnouncementType::System,
            "System announcements cannot be unpublished"
        );

        let mut active = announcement.into_active_model();
        active.is_published = Set(published);
        active.updated_at = Set(Utc::now().naive_utc());
        let updated = active
            .update(self.db)
            .await
            .map_err(|err| db_error("更新公告发布状态失败", &err))?;

        linfo!(
            "system",
            LogStage::Db,
            LogComponent::Announcement,
            "announcement_publish_state",
            &format!("公告 {} 发布状态: {published}", updated.id)
        );
        Ok(updated)
    }

    /// 新建或替换某种语言的译文
    pub async fn set_translation(
        &self,
        announcement_id: i32,
        locale: &str,
        content: &str,
    ) -> Result<announcement_translations::Model> {
        ensure_validation!(!locale.trim().is_empty(), "译文语言不能为空");
        self.find(announcement_id).await?;

        let now = Utc::now().naive_utc();
        let saved = match self.translation(announcement_id, locale).await? {
            Some(existing) => {
                let mut active = existing.into_active_model();
                active.content = Set(content.to_string());
                active.updated_at = Set(now);
                active.update(self.db).await
            }
            None => {
                announcement_translations::ActiveModel {
                    announcement_id: Set(announcement_id),
                    locale: Set(locale.to_string()),
                    content: Set(content.to_string()),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                }
                .insert(self.db)
                .await
            }
        }
        .map_err(|err| db_error("保存公告译文失败", &err))?;
        Ok(saved)
    }

    async fn translation(
        &self,
        announcement_id: i32,
        locale: &str,
    ) -> Result<Option<announcement_translations::Model>> {
        announcement_translations::Entity::find()
            .filter(announcement_translations::Column::AnnouncementId.eq(announcement_id))
            .filter(announcement_translations::Column::Locale.eq(locale))
            .one(self.db)
            .await
            .map_err(|err| db_error("查询公告译文失败", &err))
    }

    /// 按语言取公告正文，依次回退到 `en_US` 和固定提示
    pub async fn render(&self, announcement: &announcements::Model, locale: &str) -> Result<String> {
        if let Some(translation) = self.translation(announcement.id, locale).await? {
            return Ok(translation.content);
        }

        if locale != FALLBACK_LOCALE {
            if let Some(translation) = self.translation(announcement.id, FALLBACK_LOCALE).await? {
                ldebug!(
                    "system",
                    LogStage::Rendering,
                    LogComponent::Announcement,
                    "translation_fallback",
                    &format!("公告 {} 没有 {locale} 译文，使用 {FALLBACK_LOCALE}", announcement.view)
                );
                return Ok(translation.content);
            }
        }

        ldebug!(
            "system",
            LogStage::Rendering,
            LogComponent::Announcement,
            "translation_missing",
            &format!("公告 {} 没有任何译文", announcement.view)
        );
        Ok(MISSING_CONTENT.to_string())
    }
}

fn db_error(message: &str, err: &DbErr) -> AdminError {
    lerror!(
        "system",
        LogStage::Db,
        LogComponent::Announcement,
        "announcement_db_error",
        &format!("{message}: {err}")
    );
    crate::error!(Database, format!("{message}: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::create_test_db;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn input(view: &str, announcement_type: AnnouncementType) -> NewAnnouncement {
        NewAnnouncement {
            title: format!("{view} title"),
            view: view.to_string(),
            announcement_type,
            is_global: true,
            ..Default::default()
        }
    }

    fn roles(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| (*name).to_string()).collect()
    }

    #[tokio::test]
    async fn test_create_validates_window() {
        let db = create_test_db().await.unwrap();
        let service = AnnouncementService::new(&db);

        let mut reversed = input("terms", AnnouncementType::Policy);
        reversed.starts_at = Some(at(10, 12));
        reversed.expires_at = Some(at(10, 8));
        let err = service.create(reversed).await.unwrap_err();
        assert!(matches!(err, AdminError::Validation { .. }));

        let err = service
            .create(input(" ", AnnouncementType::Info))
            .await
            .unwrap_err();
        assert!(matches!(err, AdminError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_active_window_and_visibility() {
        let db = create_test_db().await.unwrap();
        let service = AnnouncementService::new(&db);

        let mut open = input("open", AnnouncementType::Info);
        open.is_published = true;
        service.create(open).await.unwrap();

        let mut staff = input("staff", AnnouncementType::Event);
        staff.is_global = false;
        staff.target_roles = roles(&["staff"]);
        staff.is_published = true;
        staff.starts_at = Some(at(10, 8));
        staff.expires_at = Some(at(12, 8));
        service.create(staff).await.unwrap();

        let mut draft = input("draft", AnnouncementType::News);
        draft.starts_at = Some(at(1, 0));
        service.create(draft).await.unwrap();

        let mut expired = input("expired", AnnouncementType::Info);
        expired.expires_at = Some(at(5, 0));
        service.create(expired).await.unwrap();

        let views = |list: Vec<announcements::Model>| -> Vec<String> {
            list.into_iter().map(|a| a.view).collect()
        };

        assert_eq!(
            views(service.active_at(at(10, 8)).await.unwrap()),
            vec!["open", "staff", "draft"]
        );
        assert_eq!(
            views(service.active_at(at(12, 9)).await.unwrap()),
            vec!["open", "draft"]
        );

        assert_eq!(
            views(
                service
                    .published_for_roles(at(11, 0), &roles(&["staff"]))
                    .await
                    .unwrap()
            ),
            vec!["open", "staff"]
        );
        assert_eq!(
            views(
                service
                    .published_for_roles(at(11, 0), &roles(&["student"]))
                    .await
                    .unwrap()
            ),
            vec!["open"]
        );
    }

    #[tokio::test]
    async fn test_latest_policy() {
        let db = create_test_db().await.unwrap();
        let service = AnnouncementService::new(&db);

        let err = service.latest_policy(at(10, 0)).await.unwrap_err();
        assert_eq!(err.user_message(), "Announcement 'policy' not found");

        let mut old = input("terms_v1", AnnouncementType::Policy);
        old.starts_at = Some(at(1, 0));
        service.create(old).await.unwrap();
        let mut new = input("terms_v2", AnnouncementType::Policy);
        new.starts_at = Some(at(9, 0));
        service.create(new).await.unwrap();
        let mut future = input("terms_v3", AnnouncementType::Policy);
        future.starts_at = Some(at(20, 0));
        service.create(future).await.unwrap();

        assert_eq!(service.latest_policy(at(10, 0)).await.unwrap().view, "terms_v2");
    }

    #[tokio::test]
    async fn test_system_announcement_stays_published() {
        let db = create_test_db().await.unwrap();
        let service = AnnouncementService::new(&db);

        let system = service
            .create(input("maintenance", AnnouncementType::System))
            .await
            .unwrap();
        assert!(service.publish(system.id).await.unwrap().is_published);
        let err = service.unpublish(system.id).await.unwrap_err();
        assert!(matches!(err, AdminError::Validation { .. }));

        let info = service
            .create(input("hello", AnnouncementType::Info))
            .await
            .unwrap();
        service.publish(info.id).await.unwrap();
        assert!(!service.unpublish(info.id).await.unwrap().is_published);

        assert!(matches!(
            service.publish(999).await.unwrap_err(),
            AdminError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_news_is_published_only() {
        let db = create_test_db().await.unwrap();
        let service = AnnouncementService::new(&db);

        for day in 1..=12 {
            let mut news = input(&format!("news_{day:02}"), AnnouncementType::News);
            news.starts_at = Some(at(day, 0));
            news.is_published = day != 12;
            service.create(news).await.unwrap();
        }

        let first = service.news(0).await.unwrap();
        assert_eq!(first.len(), 10);
        assert_eq!(first[0].view, "news_11");
        let second = service.news(1).await.unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].view, "news_01");
    }

    #[tokio::test]
    async fn test_render_falls_back_to_english() {
        let db = create_test_db().await.unwrap();
        let service = AnnouncementService::new(&db);
        let announcement = service
            .create(input("terms", AnnouncementType::Policy))
            .await
            .unwrap();

        assert_eq!(
            service.render(&announcement, "de_DE").await.unwrap(),
            MISSING_CONTENT
        );

        service
            .set_translation(announcement.id, "en_US", "# Terms")
            .await
            .unwrap();
        service
            .set_translation(announcement.id, "de_DE", "# AGB")
            .await
            .unwrap();
        service
            .set_translation(announcement.id, "de_DE", "# Nutzungsbedingungen")
            .await
            .unwrap();

        assert_eq!(
            service.render(&announcement, "de_DE").await.unwrap(),
            "# Nutzungsbedingungen"
        );
        assert_eq!(
            service.render(&announcement, "fr_FR").await.unwrap(),
            "# Terms"
        );
    }

    #[test]
    fn test_global_ignores_roles() {
        let now = Utc::now().naive_utc();
        let mut model = announcements::Model {
            id: 1,
            title: "t".to_string(),
            view: "v".to_string(),
            announcement_type: AnnouncementType::Info,
            is_published: true,
            is_forced: false,
            is_global: true,
            target_roles: None,
            anchor: None,
            starts_at: None,
            expires_at: None,
            created_at: now,
            updated_at: now,
        };
        assert!(is_visible_to(&model, &[]));

        model.is_global = false;
        assert!(!is_visible_to(&model, &roles(&["admin"])));
        model.target_roles = Some(r#"["admin"]"#.to_string());
        assert!(is_visible_to(&model, &roles(&["staff", "admin"])));
    }
}
