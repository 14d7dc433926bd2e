use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AiModels::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AiModels::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(AiModels::SystemId)
                            .string_len(36)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(AiModels::ModelId).string_len(200).not_null())
                    .col(ColumnDef::new(AiModels::Label).string_len(200).not_null())
                    .col(ColumnDef::new(AiModels::ProviderId).integer().not_null())
                    .col(
                        ColumnDef::new(AiModels::IsActive)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(AiModels::Streamable)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(AiModels::IsVisible)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(AiModels::DisplayOrder)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(AiModels::Information).text())
                    .col(ColumnDef::new(AiModels::Settings).text())
                    .col(
                        ColumnDef::new(AiModels::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(AiModels::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ai_models_provider_id")
                            .from(AiModels::Table, AiModels::ProviderId)
                            .to(ApiProviders::Table, ApiProviders::Id)
                            .on_update(ForeignKeyAction::Cascade)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // model_id 只在同一服务商内唯一
        manager
            .create_index(
                Index::create()
                    .name("idx_ai_models_provider_model_unique")
                    .table(AiModels::Table)
                    .col(AiModels::ProviderId)
                    .col(AiModels::ModelId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AiModels::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum AiModels {
    Table,
    Id,
    SystemId,
    ModelId,
    Label,
    ProviderId,
    IsActive,
    Streamable,
    IsVisible,
    DisplayOrder,
    Information,
    Settings,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ApiProviders {
    Table,
    Id,
}
