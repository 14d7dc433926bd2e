use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ApiFormats::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ApiFormats::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ApiFormats::UniqueName)
                            .string_len(100)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(ApiFormats::DisplayName)
                            .string_len(200)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ApiFormats::BaseUrl).string_len(500))
                    .col(ColumnDef::new(ApiFormats::Metadata).text())
                    .col(ColumnDef::new(ApiFormats::ProviderClass).string_len(200))
                    .col(
                        ColumnDef::new(ApiFormats::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ApiFormats::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ApiFormats::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ApiFormats {
    Table,
    Id,
    UniqueName,
    DisplayName,
    BaseUrl,
    Metadata,
    ProviderClass,
    CreatedAt,
    UpdatedAt,
}
