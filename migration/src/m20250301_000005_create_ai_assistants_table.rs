use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AiAssistants::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AiAssistants::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(AiAssistants::Key)
                            .string_len(100)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(AiAssistants::Name).string_len(200).not_null())
                    .col(ColumnDef::new(AiAssistants::Description).text())
                    .col(
                        ColumnDef::new(AiAssistants::Status)
                            .string_len(20)
                            .not_null()
                            .default("draft"),
                    )
                    .col(
                        ColumnDef::new(AiAssistants::Visibility)
                            .string_len(20)
                            .not_null()
                            .default("private"),
                    )
                    .col(ColumnDef::new(AiAssistants::OrgId).integer())
                    .col(ColumnDef::new(AiAssistants::OwnerId).integer())
                    .col(ColumnDef::new(AiAssistants::AiModel).string_len(36))
                    .col(ColumnDef::new(AiAssistants::Prompt).string_len(200))
                    .col(ColumnDef::new(AiAssistants::Tools).text())
                    .col(
                        ColumnDef::new(AiAssistants::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(AiAssistants::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ai_assistants_ai_model")
                            .from(AiAssistants::Table, AiAssistants::AiModel)
                            .to(AiModels::Table, AiModels::SystemId)
                            .on_update(ForeignKeyAction::Cascade)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_ai_assistants_status_visibility")
                    .table(AiAssistants::Table)
                    .col(AiAssistants::Status)
                    .col(AiAssistants::Visibility)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AiAssistants::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum AiAssistants {
    Table,
    Id,
    Key,
    Name,
    Description,
    Status,
    Visibility,
    OrgId,
    OwnerId,
    AiModel,
    Prompt,
    Tools,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum AiModels {
    Table,
    SystemId,
}
