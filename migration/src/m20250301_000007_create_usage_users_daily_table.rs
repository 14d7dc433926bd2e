use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UsageUsersDaily::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UsageUsersDaily::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(UsageUsersDaily::UserId).integer().not_null())
                    .col(ColumnDef::new(UsageUsersDaily::Date).date().not_null())
                    .col(
                        ColumnDef::new(UsageUsersDaily::ApiProvider)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(UsageUsersDaily::Model)
                            .string_len(200)
                            .not_null(),
                    )
                    .col(counter(UsageUsersDaily::ApiRequests))
                    .col(counter(UsageUsersDaily::SuccessfulRequests))
                    .col(counter(UsageUsersDaily::FailedRequests))
                    .col(counter(UsageUsersDaily::CancelledRequests))
                    .col(counter(UsageUsersDaily::PromptTokens))
                    .col(counter(UsageUsersDaily::CompletionTokens))
                    .col(counter(UsageUsersDaily::TotalTokens))
                    .col(counter(UsageUsersDaily::CacheReadInputTokens))
                    .col(counter(UsageUsersDaily::CacheCreationInputTokens))
                    .col(counter(UsageUsersDaily::ReasoningTokens))
                    .col(counter(UsageUsersDaily::AudioInputTokens))
                    .col(counter(UsageUsersDaily::AudioOutputTokens))
                    .col(ColumnDef::new(UsageUsersDaily::ServerToolUse).text())
                    .col(
                        ColumnDef::new(UsageUsersDaily::Spend)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(ColumnDef::new(UsageUsersDaily::InputPrice).double())
                    .col(ColumnDef::new(UsageUsersDaily::OutputPrice).double())
                    .col(ColumnDef::new(UsageUsersDaily::CacheReadPrice).double())
                    .col(ColumnDef::new(UsageUsersDaily::CacheWritePrice).double())
                    .col(ColumnDef::new(UsageUsersDaily::Currency).string_len(10))
                    .col(
                        ColumnDef::new(UsageUsersDaily::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(UsageUsersDaily::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // 聚合幂等所依赖的唯一键
        manager
            .create_index(
                Index::create()
                    .name("idx_usage_users_daily_unique")
                    .table(UsageUsersDaily::Table)
                    .col(UsageUsersDaily::UserId)
                    .col(UsageUsersDaily::Date)
                    .col(UsageUsersDaily::ApiProvider)
                    .col(UsageUsersDaily::Model)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_usage_users_daily_user_date")
                    .table(UsageUsersDaily::Table)
                    .col(UsageUsersDaily::UserId)
                    .col(UsageUsersDaily::Date)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_usage_users_daily_date_model")
                    .table(UsageUsersDaily::Table)
                    .col(UsageUsersDaily::Date)
                    .col(UsageUsersDaily::Model)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_usage_users_daily_date")
                    .table(UsageUsersDaily::Table)
                    .col(UsageUsersDaily::Date)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UsageUsersDaily::Table).to_owned())
            .await
    }
}

fn counter(column: UsageUsersDaily) -> ColumnDef {
    ColumnDef::new(column)
        .big_integer()
        .not_null()
        .default(0)
        .to_owned()
}

#[derive(DeriveIden)]
enum UsageUsersDaily {
    Table,
    Id,
    UserId,
    Date,
    ApiProvider,
    Model,
    ApiRequests,
    SuccessfulRequests,
    FailedRequests,
    CancelledRequests,
    PromptTokens,
    CompletionTokens,
    TotalTokens,
    CacheReadInputTokens,
    CacheCreationInputTokens,
    ReasoningTokens,
    AudioInputTokens,
    AudioOutputTokens,
    ServerToolUse,
    Spend,
    InputPrice,
    OutputPrice,
    CacheReadPrice,
    CacheWritePrice,
    Currency,
    CreatedAt,
    UpdatedAt,
}
