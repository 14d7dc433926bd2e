use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ApiFormatEndpoints::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ApiFormatEndpoints::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ApiFormatEndpoints::ApiFormatId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ApiFormatEndpoints::Name)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ApiFormatEndpoints::Path)
                            .string_len(500)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ApiFormatEndpoints::Method)
                            .string_len(10)
                            .not_null()
                            .default("GET"),
                    )
                    .col(
                        ColumnDef::new(ApiFormatEndpoints::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(ApiFormatEndpoints::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ApiFormatEndpoints::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_api_format_endpoints_api_format_id")
                            .from(ApiFormatEndpoints::Table, ApiFormatEndpoints::ApiFormatId)
                            .to(ApiFormats::Table, ApiFormats::Id)
                            .on_update(ForeignKeyAction::Cascade)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // 同一格式下端点名唯一
        manager
            .create_index(
                Index::create()
                    .name("idx_api_format_endpoints_format_name_unique")
                    .table(ApiFormatEndpoints::Table)
                    .col(ApiFormatEndpoints::ApiFormatId)
                    .col(ApiFormatEndpoints::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ApiFormatEndpoints::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ApiFormatEndpoints {
    Table,
    Id,
    ApiFormatId,
    Name,
    Path,
    Method,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ApiFormats {
    Table,
    Id,
}
