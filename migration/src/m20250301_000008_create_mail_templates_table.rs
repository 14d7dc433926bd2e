use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MailTemplates::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MailTemplates::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(MailTemplates::Type).string_len(50).not_null())
                    .col(
                        ColumnDef::new(MailTemplates::Language)
                            .string_len(10)
                            .not_null()
                            .default("en"),
                    )
                    .col(ColumnDef::new(MailTemplates::Description).string_len(500))
                    .col(ColumnDef::new(MailTemplates::Subject).string_len(500).not_null())
                    .col(ColumnDef::new(MailTemplates::Body).text().not_null())
                    .col(
                        ColumnDef::new(MailTemplates::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(MailTemplates::UpdatedAt)
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
                    .name("idx_mail_templates_type_language_unique")
                    .table(MailTemplates::Table)
                    .col(MailTemplates::Type)
                    .col(MailTemplates::Language)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MailTemplates::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum MailTemplates {
    Table,
    Id,
    Type,
    Language,
    Description,
    Subject,
    Body,
    CreatedAt,
    UpdatedAt,
}
