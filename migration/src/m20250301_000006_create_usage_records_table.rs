use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UsageRecords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UsageRecords::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(UsageRecords::UserId).integer())
                    .col(ColumnDef::new(UsageRecords::RoomId).integer())
                    .col(
                        ColumnDef::new(UsageRecords::Type)
                            .string_len(50)
                            .not_null()
                            .default("private"),
                    )
                    .col(ColumnDef::new(UsageRecords::ApiProvider).string_len(100))
                    .col(ColumnDef::new(UsageRecords::Model).string_len(200).not_null())
                    .col(ColumnDef::new(UsageRecords::PromptTokens).integer())
                    .col(ColumnDef::new(UsageRecords::CompletionTokens).integer())
                    .col(ColumnDef::new(UsageRecords::CacheReadInputTokens).integer())
                    .col(ColumnDef::new(UsageRecords::CacheCreationInputTokens).integer())
                    .col(ColumnDef::new(UsageRecords::ReasoningTokens).integer())
                    .col(ColumnDef::new(UsageRecords::AudioInputTokens).integer())
                    .col(ColumnDef::new(UsageRecords::AudioOutputTokens).integer())
                    .col(ColumnDef::new(UsageRecords::ServerToolUse).text())
                    .col(ColumnDef::new(UsageRecords::Status).string_len(20))
                    .col(
                        ColumnDef::new(UsageRecords::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(UsageRecords::UpdatedAt)
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
                    .name("idx_usage_records_created_at")
                    .table(UsageRecords::Table)
                    .col(UsageRecords::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_usage_records_user_created")
                    .table(UsageRecords::Table)
                    .col(UsageRecords::UserId)
                    .col(UsageRecords::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UsageRecords::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum UsageRecords {
    Table,
    Id,
    UserId,
    RoomId,
    Type,
    ApiProvider,
    Model,
    PromptTokens,
    CompletionTokens,
    CacheReadInputTokens,
    CacheCreationInputTokens,
    ReasoningTokens,
    AudioInputTokens,
    AudioOutputTokens,
    ServerToolUse,
    Status,
    CreatedAt,
    UpdatedAt,
}
