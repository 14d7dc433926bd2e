use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ApiProviders::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ApiProviders::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ApiProviders::ProviderName)
                            .string_len(200)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ApiProviders::UniqueName)
                            .string_len(100)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(ApiProviders::ApiFormatId).integer())
                    // 加密后的密钥信封
                    .col(ColumnDef::new(ApiProviders::ApiKey).text())
                    .col(ColumnDef::new(ApiProviders::BaseUrl).string_len(500))
                    .col(
                        ColumnDef::new(ApiProviders::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(ApiProviders::DisplayOrder)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(ApiProviders::AdditionalSettings).text())
                    .col(
                        ColumnDef::new(ApiProviders::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ApiProviders::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_api_providers_api_format_id")
                            .from(ApiProviders::Table, ApiProviders::ApiFormatId)
                            .to(ApiFormats::Table, ApiFormats::Id)
                            .on_update(ForeignKeyAction::Cascade)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_api_providers_display_order")
                    .table(ApiProviders::Table)
                    .col(ApiProviders::DisplayOrder)
                    .col(ApiProviders::ProviderName)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ApiProviders::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ApiProviders {
    Table,
    Id,
    ProviderName,
    UniqueName,
    ApiFormatId,
    ApiKey,
    BaseUrl,
    IsActive,
    DisplayOrder,
    AdditionalSettings,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ApiFormats {
    Table,
    Id,
}
