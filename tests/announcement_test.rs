//! 公告集成测试

mod common;

use ai_admin::AdminError;
use ai_admin::announcement::{AnnouncementService, MISSING_CONTENT, NewAnnouncement};
use common::{at, day, setup_test_db};
use entity::announcement_translations;
use entity::announcements::{self, AnnouncementType};
use pretty_assertions::assert_eq;
use sea_orm::{ActiveModelTrait, EntityTrait, PaginatorTrait, Set};

fn policy(view: &str) -> NewAnnouncement {
    NewAnnouncement {
        title: "Terms of use".to_string(),
        view: view.to_string(),
        announcement_type: AnnouncementType::Policy,
        is_forced: true,
        is_global: true,
        is_published: true,
        ..Default::default()
    }
}

#[tokio::test]
async fn policy_lifecycle_with_translations() {
    let db = setup_test_db().await;
    let service = AnnouncementService::new(&db);

    let mut input = policy("terms_2025");
    input.starts_at = Some(at(day(2025, 3, 1), 0));
    input.expires_at = Some(at(day(2025, 3, 31), 23));
    let created = service.create(input).await.unwrap();
    assert!(created.is_forced);
    assert_eq!(created.target_roles, None);

    service
        .set_translation(created.id, "en_US", "# Terms\n\nBe nice.")
        .await
        .unwrap();
    service
        .set_translation(created.id, "de_DE", "# Nutzungsbedingungen")
        .await
        .unwrap();

    let latest = service.latest_policy(at(day(2025, 3, 15), 12)).await.unwrap();
    assert_eq!(latest.id, created.id);
    assert_eq!(
        service.render(&latest, "de_DE").await.unwrap(),
        "# Nutzungsbedingungen"
    );
    assert_eq!(
        service.render(&latest, "it_IT").await.unwrap(),
        "# Terms\n\nBe nice."
    );

    // 过期后不再生效
    let err = service
        .latest_policy(at(day(2025, 4, 1), 0))
        .await
        .unwrap_err();
    assert!(matches!(err, AdminError::NotFound { .. }));
}

#[tokio::test]
async fn translations_are_unique_per_locale() {
    let db = setup_test_db().await;
    let service = AnnouncementService::new(&db);
    let created = service.create(policy("terms")).await.unwrap();

    service
        .set_translation(created.id, "en_US", "v1")
        .await
        .unwrap();
    service
        .set_translation(created.id, "en_US", "v2")
        .await
        .unwrap();
    assert_eq!(
        announcement_translations::Entity::find().count(&db).await.unwrap(),
        1
    );
    assert_eq!(service.render(&created, "en_US").await.unwrap(), "v2");

    let now = at(day(2025, 3, 1), 0);
    let duplicate = announcement_translations::ActiveModel {
        announcement_id: Set(created.id),
        locale: Set("en_US".to_string()),
        content: Set("v3".to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&db)
    .await;
    assert!(duplicate.is_err());

    let err = service
        .set_translation(404, "en_US", "orphan")
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "Announcement '404' not found");
}

#[tokio::test]
async fn deleting_announcement_removes_translations() {
    let db = setup_test_db().await;
    let service = AnnouncementService::new(&db);
    let created = service.create(policy("terms")).await.unwrap();
    service
        .set_translation(created.id, "en_US", "# Terms")
        .await
        .unwrap();

    announcements::Entity::delete_by_id(created.id)
        .exec(&db)
        .await
        .unwrap();

    assert_eq!(
        announcement_translations::Entity::find().count(&db).await.unwrap(),
        0
    );
}

#[tokio::test]
async fn role_targeted_announcements() {
    let db = setup_test_db().await;
    let service = AnnouncementService::new(&db);

    let mut staff_only = NewAnnouncement {
        title: "Staff meeting".to_string(),
        view: "staff_meeting".to_string(),
        announcement_type: AnnouncementType::Event,
        is_global: false,
        target_roles: vec!["staff".to_string()],
        anchor: Some("meeting".to_string()),
        ..Default::default()
    };
    staff_only.starts_at = Some(at(day(2025, 3, 10), 9));
    let created = service.create(staff_only).await.unwrap();
    assert_eq!(created.target_role_list(), vec!["staff".to_string()]);

    let now = at(day(2025, 3, 10), 10);
    let staff = vec!["staff".to_string()];
    assert!(service.published_for_roles(now, &staff).await.unwrap().is_empty());

    service.publish(created.id).await.unwrap();
    assert_eq!(service.published_for_roles(now, &staff).await.unwrap().len(), 1);
    assert!(
        service
            .published_for_roles(now, &["student".to_string()])
            .await
            .unwrap()
            .is_empty()
    );

    let reloaded = service.find(created.id).await.unwrap();
    assert_eq!(service.render(&reloaded, "en_US").await.unwrap(), MISSING_CONTENT);
}
