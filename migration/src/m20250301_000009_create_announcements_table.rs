use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Announcements::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Announcements::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Announcements::Title).string_len(255).not_null())
                    .col(ColumnDef::new(Announcements::View).string_len(255).not_null())
                    .col(
                        ColumnDef::new(Announcements::Type)
                            .string_len(20)
                            .not_null()
                            .default("info"),
                    )
                    .col(
                        ColumnDef::new(Announcements::IsPublished)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Announcements::IsForced)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Announcements::IsGlobal)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Announcements::TargetRoles).text())
                    .col(ColumnDef::new(Announcements::Anchor).string_len(100))
                    .col(ColumnDef::new(Announcements::StartsAt).timestamp())
                    .col(ColumnDef::new(Announcements::ExpiresAt).timestamp())
                    .col(
                        ColumnDef::new(Announcements::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Announcements::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_announcements_window")
                    .table(Announcements::Table)
                    .col(Announcements::StartsAt)
                    .col(Announcements::ExpiresAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AnnouncementTranslations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AnnouncementTranslations::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(AnnouncementTranslations::AnnouncementId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AnnouncementTranslations::Locale)
                            .string_len(10)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AnnouncementTranslations::Content)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AnnouncementTranslations::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(AnnouncementTranslations::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_announcement_translations_announcement_id")
                            .from(
                                AnnouncementTranslations::Table,
                                AnnouncementTranslations::AnnouncementId,
                            )
                            .to(Announcements::Table, Announcements::Id)
                            .on_update(ForeignKeyAction::Cascade)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // 每条公告每种语言一份译文
        manager
            .create_index(
                Index::create()
                    .name("idx_announcement_translations_locale_unique")
                    .table(AnnouncementTranslations::Table)
                    .col(AnnouncementTranslations::AnnouncementId)
                    .col(AnnouncementTranslations::Locale)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(AnnouncementTranslations::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(Announcements::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Announcements {
    Table,
    Id,
    Title,
    View,
    Type,
    IsPublished,
    IsForced,
    IsGlobal,
    TargetRoles,
    Anchor,
    StartsAt,
    ExpiresAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum AnnouncementTranslations {
    Table,
    Id,
    AnnouncementId,
    Locale,
    Content,
    CreatedAt,
    UpdatedAt,
}
